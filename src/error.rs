use std::path::PathBuf;

use thiserror::Error;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("no image with hash {0}")]
    ImageNotFound(String),
    #[error("no results found")]
    NoResults,
    #[error("image file missing at {}", .0.display())]
    FileMissing(PathBuf),
    #[error("no image data found in clipboard")]
    NoClipboardImage,

    #[error("{0}")]
    Config(String),

    #[error("{0}")]
    Collaborator(String),
    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("clipboard: {0}")]
    Clipboard(String),

    #[error("storage engine: {0}")]
    Storage(#[from] sqlx::Error),
    #[error("database migration: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),
    #[error("corrupted database: {0}")]
    Corrupted(String),
    #[error("vector has {actual} dimensions, table expects {expected}")]
    DimensionMismatch { expected: usize, actual: usize },
    #[error("vector must not be empty")]
    EmptyVector,
    #[error("search limit must be at least 1")]
    InvalidLimit,

    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("invalid config file: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl Error {
    /// 信息性的"未找到"结果，而不是硬性失败
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::ImageNotFound(_) | Self::NoResults | Self::FileMissing(_) | Self::NoClipboardImage
        )
    }
}
