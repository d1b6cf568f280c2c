use std::convert::Infallible;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use clap::{Parser, Subcommand};
use directories::ProjectDirs;
use log::debug;
use serde::{Deserialize, Serialize};

use crate::cli::*;
use crate::error::{Error, Result};

pub const DEFAULT_VISION_MODEL: &str = "google/gemini-2.0-flash-lite-001";
pub const DEFAULT_EMBEDDING_MODEL: &str = "qwen/qwen3-embedding-8b";
pub const DEFAULT_API_BASE: &str = "https://openrouter.ai/api/v1";

fn project_dirs() -> Result<ProjectDirs> {
    ProjectDirs::from("", "", "imagedb")
        .ok_or_else(|| Error::Config("failed to determine the home directory".to_string()))
}

#[derive(Parser, Debug, Clone)]
#[command(name = "imagedb", version, about = "剪贴板图片数据库，支持按文字描述搜索")]
pub struct Opts {
    #[command(subcommand)]
    pub subcmd: SubCommand,
    /// 配置文件路径，默认为用户配置目录下的 config.yaml
    #[arg(short, long, value_name = "FILE", global = true)]
    pub config: Option<PathBuf>,
    /// 数据目录，优先于配置文件中的 data_dir
    #[arg(short, long, value_name = "DIR", global = true)]
    pub data_dir: Option<DataDir>,
}

#[derive(Subcommand, Debug, Clone)]
pub enum SubCommand {
    /// 交互式初始化配置
    Init(InitCommand),
    /// 查看或修改配置
    Config(ConfigCommand),
    /// 将剪贴板中的图片保存到数据库
    Save(SaveCommand),
    /// 按文字搜索图片，并将最佳结果复制到剪贴板
    Load(LoadCommand),
    /// 按文字搜索图片，只输出结果
    Search(SearchCommand),
    /// 按哈希删除图片
    Delete(DeleteCommand),
    /// 列出所有图片
    List(ListCommand),
}

impl Opts {
    /// 配置文件路径
    pub fn config_path(&self) -> Result<PathBuf> {
        match &self.config {
            Some(path) => Ok(path.clone()),
            None => Ok(project_dirs()?.config_dir().join("config.yaml")),
        }
    }

    /// 数据目录：命令行参数 > 配置文件 > 系统默认数据目录
    pub fn data_dir(&self, settings: &Settings) -> Result<DataDir> {
        if let Some(dir) = &self.data_dir {
            return Ok(dir.clone());
        }
        if let Some(dir) = &settings.data_dir {
            return Ok(DataDir::new(dir.clone()));
        }
        Ok(DataDir::new(project_dirs()?.data_dir().to_path_buf()))
    }
}

/// 数据目录布局
#[derive(Debug, Clone)]
pub struct DataDir {
    path: PathBuf,
}

impl DataDir {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Path {
        self.path.as_path()
    }

    /// 返回数据库文件的路径
    pub fn database(&self) -> PathBuf {
        self.path.join("index.db")
    }

    /// 返回图片目录的路径
    pub fn images(&self) -> PathBuf {
        self.path.join("images")
    }
}

impl FromStr for DataDir {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self { path: PathBuf::from(s) })
    }
}

/// 持久化的用户配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_vision_model")]
    pub vision_model: String,
    #[serde(default = "default_embedding_model")]
    pub embedding_model: String,
    #[serde(default = "default_api_base")]
    pub api_base: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_dir: Option<PathBuf>,
}

fn default_vision_model() -> String {
    DEFAULT_VISION_MODEL.to_string()
}

fn default_embedding_model() -> String {
    DEFAULT_EMBEDDING_MODEL.to_string()
}

fn default_api_base() -> String {
    DEFAULT_API_BASE.to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            vision_model: default_vision_model(),
            embedding_model: default_embedding_model(),
            api_base: default_api_base(),
            data_dir: None,
        }
    }
}

impl Settings {
    /// 读取配置，文件不存在或缺少 api_key 时报错
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(Error::Config(format!(
                "config not found at {}, run `imagedb init`",
                path.display()
            )));
        }
        let settings = Self::read(path)?;
        if settings.api_key.trim().is_empty() {
            return Err(Error::Config("config missing 'api_key', run `imagedb init`".to_string()));
        }
        Ok(settings)
    }

    /// 读取配置，文件不存在时返回默认值
    pub fn load_optional(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!("配置文件不存在，使用默认配置: {}", path.display());
            return Ok(Self::default());
        }
        Self::read(path)
    }

    fn read(path: &Path) -> Result<Self> {
        debug!("读取配置文件: {}", path.display());
        let content = fs::read_to_string(path)?;
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        let mut settings: Self = serde_yaml::from_str(&content)?;
        if settings.vision_model.trim().is_empty() {
            settings.vision_model = default_vision_model();
        }
        if settings.embedding_model.trim().is_empty() {
            settings.embedding_model = default_embedding_model();
        }
        if settings.api_base.trim().is_empty() {
            settings.api_base = default_api_base();
        }
        Ok(settings)
    }

    /// 写入配置文件，自动创建所在目录
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, serde_yaml::to_string(self)?)?;
        Ok(())
    }

    /// 用于展示的配置，隐藏 api_key
    pub fn masked(&self) -> Self {
        let visible: String = self.api_key.chars().take(4).collect();
        let api_key = match self.api_key.chars().count() {
            0 => String::new(),
            n if n <= 8 => "****".to_string(),
            _ => format!("{visible}****"),
        };
        Self { api_key, ..self.clone() }
    }
}
