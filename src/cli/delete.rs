use anyhow::Result;
use clap::Parser;
use log::info;

use crate::cli::SubCommandExtend;
use crate::config::{Opts, Settings};
use crate::error::Error;
use crate::ImageDBBuilder;

#[derive(Parser, Debug, Clone)]
pub struct DeleteCommand {
    /// 图片的 sha256 哈希
    pub hash: String,
}

impl SubCommandExtend for DeleteCommand {
    async fn run(&self, opts: &Opts) -> Result<()> {
        let settings = Settings::load_optional(&opts.config_path()?)?;
        let db = ImageDBBuilder::new(opts.data_dir(&settings)?).open().await?;

        let hash = self.hash.trim().to_ascii_lowercase();
        let outcome = db.delete(&hash).await?;
        info!("删除 {}: {:?}", hash, outcome);

        if !outcome.found() {
            return Err(Error::ImageNotFound(hash).into());
        }
        if outcome.record_removed {
            println!("Removed metadata for {hash}");
        }
        if outcome.blob_removed {
            println!("Removed image file {}", db.blobs().path_for(&hash).display());
        }
        Ok(())
    }
}
