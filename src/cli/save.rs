use std::path::PathBuf;

use anyhow::{Result, bail};
use clap::Parser;

use crate::cli::SubCommandExtend;
use crate::clipboard::{Clipboard, SystemClipboard};
use crate::config::{Opts, Settings};
use crate::imdb::{BlobStatus, DuplicatePolicy, RecordStatus};
use crate::utils::spinner;
use crate::vision::OpenRouter;
use crate::ImageDBBuilder;

const PNG_SIGNATURE: &[u8] = b"\x89PNG\r\n\x1a\n";

#[derive(Parser, Debug, Clone)]
pub struct SaveCommand {
    /// 补充信息（如人名、地点），帮助模型生成描述
    pub context: Option<String>,
    /// 从 PNG 文件读取图片，而不是剪贴板
    #[arg(short, long, value_name = "PATH")]
    pub file: Option<PathBuf>,
    /// 图片已记录时跳过，不重新生成描述
    #[arg(long)]
    pub skip_existing: bool,
}

impl SubCommandExtend for SaveCommand {
    async fn run(&self, opts: &Opts) -> Result<()> {
        let settings = Settings::load(&opts.config_path()?)?;
        let service = OpenRouter::new(&settings)?;

        let (bytes, filename) = match &self.file {
            Some(path) => {
                let bytes = tokio::fs::read(path).await?;
                if !bytes.starts_with(PNG_SIGNATURE) {
                    bail!("{} is not a PNG file", path.display());
                }
                (bytes, path.file_name().map(|name| name.to_string_lossy().into_owned()))
            }
            None => (SystemClipboard.read_image().await?, None),
        };

        let db = ImageDBBuilder::new(opts.data_dir(&settings)?).open().await?;
        let policy = match self.skip_existing {
            true => DuplicatePolicy::Skip,
            false => DuplicatePolicy::Update,
        };

        let pb = spinner("正在生成描述……");
        let outcome = db.ingest(&bytes, filename, self.context.as_deref(), &service, policy).await;
        pb.finish_and_clear();
        let outcome = outcome?;

        let path = outcome.record.path.display();
        match outcome.blob {
            BlobStatus::Written => println!("Saved image to {path}"),
            BlobStatus::AlreadyPresent => println!("Image already saved at {path}"),
        }
        match outcome.status {
            RecordStatus::Inserted => println!("Stored metadata and embedding in the database."),
            RecordStatus::Updated => println!("Updated existing metadata and embedding."),
            RecordStatus::Skipped => println!("Image already recorded, skipped."),
        }
        println!("Hash: {}", outcome.record.file_hash);
        println!("Description: {}", outcome.record.description);
        Ok(())
    }
}
