use std::io::ErrorKind;
use std::path::PathBuf;

use log::{debug, info};

use crate::blob::BlobStore;
use crate::config::DataDir;
use crate::db::{ImageRecord, RecordStore, SearchHit};
use crate::error::{Error, Result};
use crate::utils::{hash_bytes, is_hash};
use crate::vision::VisionService;

pub struct ImageDBBuilder {
    data_dir: DataDir,
    dimension: Option<usize>,
}

impl ImageDBBuilder {
    pub fn new(data_dir: DataDir) -> Self {
        Self { data_dir, dimension: None }
    }

    /// 固定向量维数，不指定时由第一次插入决定
    pub fn dimension(mut self, dimension: usize) -> Self {
        self.dimension = Some(dimension);
        self
    }

    /// 打开数据库，数据目录、图片目录和记录表不存在时自动创建
    pub async fn open(self) -> Result<ImageDB> {
        std::fs::create_dir_all(self.data_dir.path())?;
        let blobs = BlobStore::open(self.data_dir.images())?;
        let records = RecordStore::open(self.data_dir.database(), self.dimension).await?;
        Ok(ImageDB { blobs, records })
    }
}

/// 已记录的哈希再次添加时的处理方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DuplicatePolicy {
    /// 重新生成描述和向量，替换旧记录，保留原始的 created_at
    #[default]
    Update,
    /// 保留旧记录，不调用视觉服务
    Skip,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlobStatus {
    Written,
    AlreadyPresent,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordStatus {
    Inserted,
    Updated,
    Skipped,
}

#[derive(Debug, Clone)]
pub struct IngestOutcome {
    pub blob: BlobStatus,
    pub status: RecordStatus,
    /// 数据库中当前的记录
    pub record: ImageRecord,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeleteOutcome {
    pub record_removed: bool,
    pub blob_removed: bool,
}

impl DeleteOutcome {
    /// 数据库或磁盘上任意一处存在即视为找到
    pub fn found(&self) -> bool {
        self.record_removed || self.blob_removed
    }
}

/// 图片文件目录与记录表的组合
///
/// 写入图片与插入记录不在同一事务中：两步之间崩溃会留下没有记录的图片，
/// 重新添加或删除同一哈希都能使两者恢复一致。
pub struct ImageDB {
    blobs: BlobStore,
    records: RecordStore,
}

impl ImageDB {
    pub fn blobs(&self) -> &BlobStore {
        &self.blobs
    }

    pub fn records(&self) -> &RecordStore {
        &self.records
    }

    /// 添加图片到数据库
    ///
    /// # Arguments
    ///
    /// * `bytes` - PNG 图片内容
    /// * `filename` - 原始文件名，未知时使用默认值
    /// * `context` - 传给视觉模型的补充信息
    /// * `service` - 描述与嵌入服务
    /// * `policy` - 哈希已有记录时的处理方式
    pub async fn ingest<V: VisionService>(
        &self,
        bytes: &[u8],
        filename: Option<String>,
        context: Option<&str>,
        service: &V,
        policy: DuplicatePolicy,
    ) -> Result<IngestOutcome> {
        let hash = hash_bytes(bytes);
        let path = self.blobs.path_for(&hash);
        debug!("图片哈希: {}", hash);

        let blob = if self.blobs.exists(&hash) {
            BlobStatus::AlreadyPresent
        } else {
            match self.blobs.write(&hash, bytes) {
                Ok(()) => BlobStatus::Written,
                Err(e) if e.kind() == ErrorKind::AlreadyExists => BlobStatus::AlreadyPresent,
                Err(e) => return Err(e.into()),
            }
        };

        let existing = self.records.find_by_hash(&hash).await?;
        if let (Some(record), DuplicatePolicy::Skip) = (&existing, policy) {
            info!("图片已记录，跳过: {}", hash);
            return Ok(IngestOutcome { blob, status: RecordStatus::Skipped, record: record.clone() });
        }

        let description = service.describe(bytes, context).await?;
        let vector = service.embed(&description).await?;
        let mut record = ImageRecord::new(vector, filename, hash, description, path);

        let status = match existing {
            Some(old) => {
                record.created_at = old.created_at;
                self.records.replace(&record).await?;
                RecordStatus::Updated
            }
            None => {
                self.records.insert(&record).await?;
                RecordStatus::Inserted
            }
        };

        Ok(IngestOutcome { blob, status, record })
    }

    /// 删除记录和图片文件
    ///
    /// 两步都会执行，任意一处存在即视为找到，因此也能清理没有记录的孤立图片。
    pub async fn delete(&self, hash: &str) -> Result<DeleteOutcome> {
        if !is_hash(hash) {
            debug!("不是合法的哈希: {}", hash);
            return Ok(DeleteOutcome { record_removed: false, blob_removed: false });
        }
        let record_removed = self.records.delete_by_hash(hash).await?;
        let blob_removed = self.blobs.delete(hash)?;
        Ok(DeleteOutcome { record_removed, blob_removed })
    }

    /// 按文字搜索图片，返回按距离排序的结果，没有结果时为空
    pub async fn query<V: VisionService>(
        &self,
        text: &str,
        limit: usize,
        service: &V,
    ) -> Result<Vec<SearchHit>> {
        if limit == 0 {
            return Err(Error::InvalidLimit);
        }
        let vector = service.embed(text).await?;
        let hits = self.records.search(&vector, limit).await?;

        Ok(hits
            .into_iter()
            .enumerate()
            .map(|(i, (record, distance))| SearchHit { rank: i + 1, distance, record })
            .collect())
    }

    /// 返回记录对应的图片路径，文件已不存在时报错
    pub fn resolve(&self, record: &ImageRecord) -> Result<PathBuf> {
        if record.path.is_file() {
            Ok(record.path.clone())
        } else {
            Err(Error::FileMissing(record.path.clone()))
        }
    }

    pub async fn list(&self) -> Result<Vec<ImageRecord>> {
        self.records.list().await
    }
}
