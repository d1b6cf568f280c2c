use sqlx::{Executor, Result, Sqlite};

use super::model::{ImageRecord, ImageRow};
use super::vector;

const DIMENSION_KEY: &str = "dimension";

/// 添加图片记录
pub async fn add_image<'c, E>(executor: E, record: &ImageRecord) -> Result<i64>
where
    E: Executor<'c, Database = Sqlite>,
{
    let id = sqlx::query_scalar(
        r#"
        INSERT INTO images (vector, filename, file_hash, description, created_at, path)
        VALUES (?, ?, ?, ?, ?, ?)
        RETURNING id
        "#,
    )
    .bind(vector::to_bytes(&record.vector))
    .bind(&record.filename)
    .bind(&record.file_hash)
    .bind(&record.description)
    .bind(record.created_at)
    .bind(record.path.to_string_lossy().into_owned())
    .fetch_one(executor)
    .await?;

    Ok(id)
}

/// 按哈希查找图片记录，按插入顺序排列
pub(crate) async fn find_images_by_hash<'c, E>(executor: E, hash: &str) -> Result<Vec<ImageRow>>
where
    E: Executor<'c, Database = Sqlite>,
{
    sqlx::query_as(
        r#"
        SELECT id, vector, filename, file_hash, description, created_at, path
        FROM images WHERE file_hash = ? ORDER BY id ASC
        "#,
    )
    .bind(hash)
    .fetch_all(executor)
    .await
}

/// 删除某个哈希的所有记录，返回删除的行数
pub async fn delete_images_by_hash<'c, E>(executor: E, hash: &str) -> Result<u64>
where
    E: Executor<'c, Database = Sqlite>,
{
    let result = sqlx::query("DELETE FROM images WHERE file_hash = ?")
        .bind(hash)
        .execute(executor)
        .await?;

    Ok(result.rows_affected())
}

/// 所有图片记录，新的在前
pub(crate) async fn list_images<'c, E>(executor: E) -> Result<Vec<ImageRow>>
where
    E: Executor<'c, Database = Sqlite>,
{
    sqlx::query_as(
        r#"
        SELECT id, vector, filename, file_hash, description, created_at, path
        FROM images ORDER BY created_at DESC, id DESC
        "#,
    )
    .fetch_all(executor)
    .await
}

pub async fn count_images<'c, E>(executor: E) -> Result<i64>
where
    E: Executor<'c, Database = Sqlite>,
{
    sqlx::query_scalar("SELECT COUNT(*) FROM images").fetch_one(executor).await
}

/// 读取向量维数，未设置时返回 None
pub async fn get_dimension<'c, E>(executor: E) -> Result<Option<String>>
where
    E: Executor<'c, Database = Sqlite>,
{
    sqlx::query_scalar("SELECT value FROM meta WHERE key = ?")
        .bind(DIMENSION_KEY)
        .fetch_optional(executor)
        .await
}

pub async fn set_dimension<'c, E>(executor: E, dimension: usize) -> Result<()>
where
    E: Executor<'c, Database = Sqlite>,
{
    sqlx::query("INSERT INTO meta (key, value) VALUES (?, ?)")
        .bind(DIMENSION_KEY)
        .bind(dimension.to_string())
        .execute(executor)
        .await?;

    Ok(())
}
