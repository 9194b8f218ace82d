use serde::{Deserialize, Serialize};
use sqlx::SqliteConnection;

pub use crate::db_pool::{create_db_pool, create_in_memory_pool, DbPool};

/// An uploaded photo. Rows are created on upload and only ever removed afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Photo {
    pub id: i64,
    pub filename: String,
    pub name: Option<String>,
}

impl Photo {
    pub async fn create(
        pool: &DbPool,
        filename: &str,
        name: Option<&str>,
    ) -> Result<Photo, sqlx::Error> {
        let result = sqlx::query("INSERT INTO photos (filename, name) VALUES (?, ?)")
            .bind(filename)
            .bind(name)
            .execute(pool)
            .await?;

        Ok(Photo {
            id: result.last_insert_rowid(),
            filename: filename.to_string(),
            name: name.map(str::to_string),
        })
    }

    pub async fn find_by_id(pool: &DbPool, id: i64) -> Result<Option<Photo>, sqlx::Error> {
        sqlx::query_as::<_, Photo>("SELECT id, filename, name FROM photos WHERE id = ?")
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    pub async fn exists(pool: &DbPool, id: i64) -> Result<bool, sqlx::Error> {
        let found: Option<i64> = sqlx::query_scalar("SELECT 1 FROM photos WHERE id = ?")
            .bind(id)
            .fetch_optional(pool)
            .await?;
        Ok(found.is_some())
    }

    /// Removes the photo row through `conn`. Returns false when no such photo exists.
    pub async fn delete(conn: &mut SqliteConnection, id: i64) -> Result<bool, sqlx::Error> {
        let removed = sqlx::query("DELETE FROM photos WHERE id = ?")
            .bind(id)
            .execute(conn)
            .await?
            .rows_affected();
        Ok(removed > 0)
    }
}
