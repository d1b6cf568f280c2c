mod delete;
mod init;
mod list;
mod load;
mod save;
mod search;
mod settings;

pub use delete::*;
pub use init::*;
pub use list::*;
pub use load::*;
pub use save::*;
pub use search::*;
pub use settings::*;

use std::convert::Infallible;
use std::str::FromStr;

use anyhow::Result;
use clap::ValueEnum;

use crate::config::Opts;
use crate::db::{ImageRecord, SearchHit};
use crate::utils::truncate;

pub trait SubCommandExtend {
    fn run(&self, opts: &Opts) -> impl std::future::Future<Output = anyhow::Result<()>> + Send;
}

#[derive(ValueEnum, Debug, Clone, Copy)]
pub enum OutputFormat {
    Json,
    Table,
}

impl FromStr for OutputFormat {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "json" => Ok(Self::Json),
            _ => Ok(Self::Table),
        }
    }
}

const DESCRIPTION_WIDTH: usize = 60;

fn print_hits(hits: &[SearchHit], format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(hits)?)
        }
        OutputFormat::Table => {
            for hit in hits {
                println!(
                    "{}\t{:.4}\t{}\t{}\t{}",
                    hit.rank,
                    hit.distance,
                    hit.record.created_at.format("%Y-%m-%d %H:%M"),
                    hit.record.path.display(),
                    truncate(&hit.record.description, DESCRIPTION_WIDTH)
                );
            }
        }
    }
    Ok(())
}

fn print_records(records: &[ImageRecord], format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(records)?)
        }
        OutputFormat::Table => {
            for record in records {
                println!(
                    "{}\t{}\t{}",
                    record.created_at.format("%Y-%m-%d %H:%M"),
                    record.file_hash,
                    truncate(&record.description, DESCRIPTION_WIDTH)
                );
            }
        }
    }
    Ok(())
}
