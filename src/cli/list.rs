use anyhow::Result;
use clap::Parser;

use super::{OutputFormat, print_records};
use crate::cli::SubCommandExtend;
use crate::config::{Opts, Settings};
use crate::ImageDBBuilder;

#[derive(Parser, Debug, Clone)]
pub struct ListCommand {
    /// 输出格式
    #[arg(long, value_name = "FORMAT", default_value = "table")]
    pub output_format: OutputFormat,
}

impl SubCommandExtend for ListCommand {
    async fn run(&self, opts: &Opts) -> Result<()> {
        let settings = Settings::load_optional(&opts.config_path()?)?;
        let db = ImageDBBuilder::new(opts.data_dir(&settings)?).open().await?;
        let records = db.list().await?;
        print_records(&records, self.output_format)
    }
}
