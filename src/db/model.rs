use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::vector;
use crate::error::{Error, Result};

/// 来源文件名未知时使用的默认值
pub const DEFAULT_FILENAME: &str = "clipboard.png";

/// 图片记录
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImageRecord {
    /// 描述文本的嵌入向量，维数在整张表中一致
    #[serde(skip)]
    pub vector: Vec<f32>,
    /// 原始文件名
    pub filename: String,
    /// 图片 sha256 哈希
    pub file_hash: String,
    /// 视觉模型给出的描述
    pub description: String,
    /// 插入时间
    pub created_at: DateTime<Utc>,
    /// 图片文件的绝对路径
    pub path: PathBuf,
}

impl ImageRecord {
    pub fn new(
        vector: Vec<f32>,
        filename: Option<String>,
        file_hash: String,
        description: String,
        path: PathBuf,
    ) -> Self {
        Self {
            vector,
            filename: filename.unwrap_or_else(|| DEFAULT_FILENAME.to_string()),
            file_hash,
            description,
            created_at: Utc::now(),
            path,
        }
    }
}

/// 搜索结果，`rank` 从 1 开始
#[derive(Debug, Clone, Serialize)]
pub struct SearchHit {
    pub rank: usize,
    /// 与查询向量的 L2² 距离，越小越相似
    pub distance: f32,
    #[serde(flatten)]
    pub record: ImageRecord,
}

/// `images` 表中的一行
#[derive(Debug, sqlx::FromRow)]
pub(crate) struct ImageRow {
    pub id: i64,
    pub vector: Vec<u8>,
    pub filename: String,
    pub file_hash: String,
    pub description: String,
    pub created_at: DateTime<Utc>,
    pub path: String,
}

impl TryFrom<ImageRow> for ImageRecord {
    type Error = Error;

    fn try_from(row: ImageRow) -> Result<Self> {
        let vector = vector::from_bytes(&row.vector).ok_or_else(|| {
            Error::Corrupted(format!(
                "row {} has a vector blob of {} bytes",
                row.id,
                row.vector.len()
            ))
        })?;
        Ok(Self {
            vector,
            filename: row.filename,
            file_hash: row.file_hash,
            description: row.description,
            created_at: row.created_at,
            path: PathBuf::from(row.path),
        })
    }
}
