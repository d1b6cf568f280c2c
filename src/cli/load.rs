use anyhow::Result;
use clap::Parser;
use log::info;

use super::{OutputFormat, print_hits};
use crate::cli::SubCommandExtend;
use crate::clipboard::{Clipboard, SystemClipboard};
use crate::config::{Opts, Settings};
use crate::db::SearchHit;
use crate::error::Error;
use crate::utils::{read_line, spinner};
use crate::vision::OpenRouter;
use crate::ImageDBBuilder;

#[derive(Parser, Debug, Clone)]
pub struct LoadCommand {
    /// 搜索文本
    pub query: String,
    /// 候选结果数量，为 1 时直接使用最佳结果，否则交互式选择
    #[arg(short = 'n', long, value_name = "COUNT", default_value_t = 1, value_parser = clap::value_parser!(u32).range(1..))]
    pub count: u32,
}

impl SubCommandExtend for LoadCommand {
    async fn run(&self, opts: &Opts) -> Result<()> {
        let settings = Settings::load(&opts.config_path()?)?;
        let service = OpenRouter::new(&settings)?;
        let db = ImageDBBuilder::new(opts.data_dir(&settings)?).open().await?;

        let pb = spinner("正在搜索……");
        let hits = db.query(&self.query, self.count as usize, &service).await;
        pb.finish_and_clear();
        let hits = hits?;

        let hit = match hits.len() {
            0 => return Err(Error::NoResults.into()),
            1 => &hits[0],
            _ => {
                print_hits(&hits, OutputFormat::Table)?;
                match select(&hits)? {
                    Some(hit) => hit,
                    None => {
                        println!("Cancelled.");
                        return Ok(());
                    }
                }
            }
        };

        info!("选中 #{} (distance = {:.4})", hit.rank, hit.distance);
        let path = db.resolve(&hit.record)?;
        SystemClipboard.write_image(&path).await?;
        println!("Copied image to clipboard from {}", path.display());
        Ok(())
    }
}

/// 交互式选择结果，输入为空时取消
fn select(hits: &[SearchHit]) -> Result<Option<&SearchHit>> {
    loop {
        let input = read_line(&format!("Select an image [1-{}] (empty to cancel): ", hits.len()))?;
        if input.is_empty() {
            return Ok(None);
        }
        match input.parse::<usize>() {
            Ok(rank) if (1..=hits.len()).contains(&rank) => return Ok(Some(&hits[rank - 1])),
            _ => println!("Invalid selection: {input}"),
        }
    }
}
