use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::path::Path;

use futures::TryStreamExt;
use log::{debug, info, warn};
use sqlx::sqlite::*;
use sqlx::{SqliteConnection, SqlitePool};

pub mod crud;
pub mod model;
pub mod vector;

pub use model::*;
use model::ImageRow;

use crate::error::{Error, Result};

pub type Database = SqlitePool;

pub async fn init_db(filename: impl AsRef<Path>) -> Result<Database> {
    let filename = filename.as_ref();
    info!("初始化数据库连接: {}", filename.display());

    let options = SqliteConnectOptions::new()
        .journal_mode(SqliteJournalMode::Wal)
        .synchronous(SqliteSynchronous::Normal)
        .filename(filename)
        .create_if_missing(true);

    let pool = SqlitePool::connect_with(options).await?;

    debug!("检查数据库迁移");
    sqlx::migrate!().run(&pool).await?;

    Ok(pool)
}

/// 图片记录表
///
/// 表本身不对 `file_hash` 做唯一约束，按哈希去重由上层的 [`crate::ImageDB`] 负责。
/// 所有记录的向量维数必须一致，维数在打开时指定，或由第一次插入决定。
pub struct RecordStore {
    pool: Database,
}

impl RecordStore {
    /// 打开或创建记录表，可重复调用
    ///
    /// # Arguments
    ///
    /// * `filename` - 数据库文件路径
    /// * `dimension` - 向量维数，与已记录的维数不一致时报错
    pub async fn open(filename: impl AsRef<Path>, dimension: Option<usize>) -> Result<Self> {
        let pool = init_db(filename).await?;
        if let Some(dimension) = dimension {
            let mut conn = pool.acquire().await?;
            ensure_dimension(&mut conn, dimension).await?;
        }
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &Database {
        &self.pool
    }

    /// 返回表的向量维数，空表且未指定维数时为 None
    pub async fn dimension(&self) -> Result<Option<usize>> {
        let mut conn = self.pool.acquire().await?;
        read_dimension(&mut conn).await
    }

    /// 追加一条记录
    pub async fn insert(&self, record: &ImageRecord) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        ensure_dimension(&mut tx, record.vector.len()).await?;
        let id = crud::add_image(&mut *tx, record).await?;
        tx.commit().await?;

        debug!("插入记录 {} (hash = {})", id, record.file_hash);
        Ok(())
    }

    /// 在同一事务中删除该哈希的所有记录并插入新记录，返回被替换的行数
    pub async fn replace(&self, record: &ImageRecord) -> Result<u64> {
        let mut tx = self.pool.begin().await?;
        ensure_dimension(&mut tx, record.vector.len()).await?;
        let removed = crud::delete_images_by_hash(&mut *tx, &record.file_hash).await?;
        crud::add_image(&mut *tx, record).await?;
        tx.commit().await?;

        if removed > 1 {
            warn!("哈希 {} 存在 {} 条重复记录，已合并", record.file_hash, removed);
        }
        Ok(removed)
    }

    /// 最近邻搜索，按 L2² 距离从小到大返回至多 `limit` 条记录
    ///
    /// 距离相同时先插入的记录在前。空表返回空列表。
    pub async fn search(&self, query: &[f32], limit: usize) -> Result<Vec<(ImageRecord, f32)>> {
        if limit == 0 {
            return Err(Error::InvalidLimit);
        }
        // 空表总是返回空结果，维数只在有记录时检查
        let expected = self.dimension().await?;

        let mut heap = BinaryHeap::with_capacity(limit + 1);
        let mut rows = sqlx::query_as::<_, ImageRow>(
            r#"
            SELECT id, vector, filename, file_hash, description, created_at, path
            FROM images
            "#,
        )
        .fetch(&self.pool);

        while let Some(row) = rows.try_next().await? {
            if let Some(expected) = expected {
                if expected != query.len() {
                    return Err(Error::DimensionMismatch { expected, actual: query.len() });
                }
            }
            let id = row.id;
            let record = ImageRecord::try_from(row)?;
            if record.vector.len() != query.len() {
                return Err(Error::Corrupted(format!(
                    "row {} has {} dimensions, expected {}",
                    id,
                    record.vector.len(),
                    query.len()
                )));
            }
            let distance = vector::l2_squared(query, &record.vector);
            heap.push(Candidate { distance, id, record });
            if heap.len() > limit {
                heap.pop();
            }
        }

        debug!("搜索完成，返回 {} 条结果", heap.len());

        Ok(heap.into_sorted_vec().into_iter().map(|c| (c.record, c.distance)).collect())
    }

    /// 按哈希精确查找，存在重复记录时返回最早的一条
    pub async fn find_by_hash(&self, hash: &str) -> Result<Option<ImageRecord>> {
        let rows = crud::find_images_by_hash(&self.pool, hash).await?;
        rows.into_iter().next().map(ImageRecord::try_from).transpose()
    }

    /// 删除该哈希的所有记录，返回删除前是否存在
    pub async fn delete_by_hash(&self, hash: &str) -> Result<bool> {
        let removed = crud::delete_images_by_hash(&self.pool, hash).await?;
        debug!("删除记录 hash = {}: {} 行", hash, removed);
        Ok(removed > 0)
    }

    pub async fn list(&self) -> Result<Vec<ImageRecord>> {
        crud::list_images(&self.pool)
            .await?
            .into_iter()
            .map(ImageRecord::try_from)
            .collect()
    }

    pub async fn count(&self) -> Result<u64> {
        Ok(crud::count_images(&self.pool).await? as u64)
    }
}

async fn read_dimension(conn: &mut SqliteConnection) -> Result<Option<usize>> {
    match crud::get_dimension(conn).await? {
        Some(value) => value
            .parse()
            .map(Some)
            .map_err(|_| Error::Corrupted(format!("invalid vector dimension {value:?}"))),
        None => Ok(None),
    }
}

/// 检查向量维数，表中尚未记录维数时写入
async fn ensure_dimension(conn: &mut SqliteConnection, actual: usize) -> Result<()> {
    if actual == 0 {
        return Err(Error::EmptyVector);
    }
    match read_dimension(&mut *conn).await? {
        Some(expected) if expected != actual => Err(Error::DimensionMismatch { expected, actual }),
        Some(_) => Ok(()),
        None => {
            info!("向量维数设为 {}", actual);
            crud::set_dimension(conn, actual).await?;
            Ok(())
        }
    }
}

/// 搜索时的候选项，按 (距离, id) 排序
struct Candidate {
    distance: f32,
    id: i64,
    record: ImageRecord,
}

impl Ord for Candidate {
    fn cmp(&self, other: &Self) -> Ordering {
        self.distance.total_cmp(&other.distance).then(self.id.cmp(&other.id))
    }
}

impl PartialOrd for Candidate {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Candidate {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Candidate {}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;

    fn record(hash: &str, vector: Vec<f32>) -> ImageRecord {
        ImageRecord::new(
            vector,
            None,
            hash.to_string(),
            format!("image {hash}"),
            PathBuf::from(format!("/tmp/{hash}.png")),
        )
    }

    async fn open(dir: &tempfile::TempDir) -> Result<RecordStore> {
        RecordStore::open(dir.path().join("index.db"), None).await
    }

    #[tokio::test]
    async fn open_is_idempotent() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let store = open(&dir).await?;
        store.insert(&record("a", vec![1., 0.])).await?;
        drop(store);

        let store = open(&dir).await?;
        assert_eq!(store.count().await?, 1);
        assert_eq!(store.dimension().await?, Some(2));
        Ok(())
    }

    #[tokio::test]
    async fn search_empty_table() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let store = open(&dir).await?;
        assert!(store.search(&[1., 0., 0.], 5).await?.is_empty());
        assert!(matches!(store.search(&[1., 0., 0.], 0).await, Err(Error::InvalidLimit)));
        Ok(())
    }

    #[tokio::test]
    async fn search_orders_by_distance() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let store = open(&dir).await?;
        store.insert(&record("far", vec![0., 0., 1.])).await?;
        store.insert(&record("near", vec![1., 0., 0.])).await?;
        store.insert(&record("mid", vec![0.5, 0.5, 0.])).await?;

        let hits = store.search(&[1., 0., 0.01], 2).await?;
        let hashes: Vec<_> = hits.iter().map(|(r, _)| r.file_hash.as_str()).collect();
        assert_eq!(hashes, ["near", "mid"]);
        assert!(hits[0].1 <= hits[1].1);

        let hits = store.search(&[1., 0., 0.01], 10).await?;
        assert_eq!(hits.len(), 3);
        assert_eq!(hits[2].0.file_hash, "far");
        Ok(())
    }

    #[tokio::test]
    async fn equal_distance_keeps_insert_order() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let store = open(&dir).await?;
        store.insert(&record("first", vec![0., 1.])).await?;
        store.insert(&record("second", vec![0., 1.])).await?;

        let hits = store.search(&[0., 1.], 1).await?;
        assert_eq!(hits[0].0.file_hash, "first");
        Ok(())
    }

    #[tokio::test]
    async fn dimension_is_fixed() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let store = RecordStore::open(dir.path().join("index.db"), Some(3)).await?;
        assert_eq!(store.dimension().await?, Some(3));

        let err = store.insert(&record("a", vec![1., 0.])).await.unwrap_err();
        assert!(matches!(err, Error::DimensionMismatch { expected: 3, actual: 2 }));
        assert!(store.search(&[1., 0.], 1).await?.is_empty());
        assert!(matches!(store.insert(&record("b", vec![])).await, Err(Error::EmptyVector)));
        assert_eq!(store.count().await?, 0);

        drop(store);
        let reopened = RecordStore::open(dir.path().join("index.db"), Some(4)).await;
        assert!(matches!(reopened, Err(Error::DimensionMismatch { expected: 3, actual: 4 })));
        Ok(())
    }

    #[tokio::test]
    async fn search_checks_dimension_only_with_rows() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let store = open(&dir).await?;
        store.insert(&record("a", vec![1., 0., 0.])).await?;

        let err = store.search(&[1., 0.], 1).await.unwrap_err();
        assert!(matches!(err, Error::DimensionMismatch { expected: 3, actual: 2 }));

        assert!(store.delete_by_hash("a").await?);
        assert_eq!(store.count().await?, 0);
        assert_eq!(store.dimension().await?, Some(3));
        assert!(store.search(&[1., 0.], 1).await?.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn delete_removes_duplicates() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let store = open(&dir).await?;
        store.insert(&record("dup", vec![1., 0.])).await?;
        store.insert(&record("dup", vec![0., 1.])).await?;
        store.insert(&record("other", vec![1., 1.])).await?;

        assert!(store.delete_by_hash("dup").await?);
        assert!(store.find_by_hash("dup").await?.is_none());
        assert!(!store.delete_by_hash("dup").await?);
        assert!(store.find_by_hash("other").await?.is_some());
        Ok(())
    }

    #[tokio::test]
    async fn replace_collapses_rows() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let store = open(&dir).await?;
        store.insert(&record("dup", vec![1., 0.])).await?;
        store.insert(&record("dup", vec![1., 0.])).await?;

        let mut updated = record("dup", vec![0., 1.]);
        updated.description = "updated".to_string();
        assert_eq!(store.replace(&updated).await?, 2);

        assert_eq!(store.count().await?, 1);
        let found = store.find_by_hash("dup").await?.unwrap();
        assert_eq!(found.description, "updated");
        assert_eq!(found.vector, vec![0., 1.]);
        Ok(())
    }

    #[tokio::test]
    async fn corrupted_vector_is_an_error() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let store = open(&dir).await?;
        store.insert(&record("ok", vec![1., 0.])).await?;
        sqlx::query("UPDATE images SET vector = ? WHERE file_hash = 'ok'")
            .bind(vec![1u8, 2, 3])
            .execute(store.pool())
            .await?;

        assert!(matches!(store.find_by_hash("ok").await, Err(Error::Corrupted(_))));
        assert!(matches!(store.search(&[1., 0.], 1).await, Err(Error::Corrupted(_))));
        Ok(())
    }
}
