use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;

use crate::cli::SubCommandExtend;
use crate::config::{Opts, Settings};

#[derive(Parser, Debug, Clone)]
pub struct ConfigCommand {
    /// 设置新的 API key
    #[arg(long, value_name = "KEY")]
    pub api_key: Option<String>,
    /// 设置新的视觉模型
    #[arg(long, value_name = "MODEL")]
    pub vision_model: Option<String>,
    /// 设置新的嵌入模型，更换后已有记录的向量不再可比
    #[arg(long, value_name = "MODEL")]
    pub embedding_model: Option<String>,
    /// 设置默认数据目录
    #[arg(long = "set-data-dir", value_name = "DIR")]
    pub new_data_dir: Option<PathBuf>,
    /// 只显示当前配置
    #[arg(long)]
    pub show: bool,
}

impl ConfigCommand {
    fn has_changes(&self) -> bool {
        self.api_key.is_some()
            || self.vision_model.is_some()
            || self.embedding_model.is_some()
            || self.new_data_dir.is_some()
    }
}

impl SubCommandExtend for ConfigCommand {
    async fn run(&self, opts: &Opts) -> Result<()> {
        let path = opts.config_path()?;
        let mut settings = Settings::load(&path)?;

        if self.show || !self.has_changes() {
            print!("{}", serde_yaml::to_string(&settings.masked())?);
            return Ok(());
        }

        if let Some(key) = &self.api_key {
            settings.api_key = key.trim().to_string();
        }
        if let Some(model) = &self.vision_model {
            settings.vision_model = model.clone();
        }
        if let Some(model) = &self.embedding_model {
            settings.embedding_model = model.clone();
        }
        if let Some(dir) = &self.new_data_dir {
            settings.data_dir = Some(std::path::absolute(dir)?);
        }

        settings.save(&path)?;
        println!("Updated config at {}", path.display());
        Ok(())
    }
}
