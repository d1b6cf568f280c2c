use anyhow::Result;
use clap::Parser;

use super::{OutputFormat, print_hits};
use crate::cli::SubCommandExtend;
use crate::config::{Opts, Settings};
use crate::error::Error;
use crate::utils::spinner;
use crate::vision::OpenRouter;
use crate::ImageDBBuilder;

#[derive(Parser, Debug, Clone)]
pub struct SearchCommand {
    /// 搜索文本
    pub query: String,
    /// 显示的结果数量
    #[arg(short = 'n', long, value_name = "COUNT", default_value_t = 5, value_parser = clap::value_parser!(u32).range(1..))]
    pub count: u32,
    /// 输出格式
    #[arg(long, value_name = "FORMAT", default_value = "table")]
    pub output_format: OutputFormat,
}

impl SubCommandExtend for SearchCommand {
    async fn run(&self, opts: &Opts) -> Result<()> {
        let settings = Settings::load(&opts.config_path()?)?;
        let service = OpenRouter::new(&settings)?;
        let db = ImageDBBuilder::new(opts.data_dir(&settings)?).open().await?;

        let pb = spinner("正在搜索……");
        let hits = db.query(&self.query, self.count as usize, &service).await;
        pb.finish_and_clear();
        let hits = hits?;

        if hits.is_empty() {
            return Err(Error::NoResults.into());
        }
        print_hits(&hits, self.output_format)
    }
}
