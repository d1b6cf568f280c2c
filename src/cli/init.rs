use anyhow::{Result, bail};
use clap::Parser;

use crate::cli::SubCommandExtend;
use crate::config::{Opts, Settings};
use crate::utils::{read_line, read_secret};

#[derive(Parser, Debug, Clone)]
pub struct InitCommand {
    /// OpenRouter API key，不填则交互式输入
    #[arg(long, value_name = "KEY")]
    pub api_key: Option<String>,
    /// 视觉模型，不填则交互式输入
    #[arg(long, value_name = "MODEL")]
    pub vision_model: Option<String>,
}

impl SubCommandExtend for InitCommand {
    async fn run(&self, opts: &Opts) -> Result<()> {
        let path = opts.config_path()?;
        let existing = Settings::load_optional(&path)?;

        let api_key = match &self.api_key {
            Some(key) => key.trim().to_string(),
            None => read_secret("Enter your OpenRouter API key")?,
        };
        if api_key.is_empty() {
            bail!("API key must not be empty");
        }

        let vision_model = match &self.vision_model {
            Some(model) => model.trim().to_string(),
            None => {
                let model = read_line(&format!("Vision model to use [{}]: ", existing.vision_model))?;
                if model.is_empty() { existing.vision_model.clone() } else { model }
            }
        };

        let settings = Settings { api_key, vision_model, ..existing };
        settings.save(&path)?;
        println!("Config saved to {}", path.display());
        Ok(())
    }
}
