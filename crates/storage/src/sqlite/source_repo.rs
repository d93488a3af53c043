use quiz_core::model::{Source, SourceId};

use super::{
    SqliteRepository,
    mapping::{db_err, id_i64, map_source_row},
};
use crate::repository::{SourceRepository, StorageError};

#[async_trait::async_trait]
impl SourceRepository for SqliteRepository {
    async fn upsert_source(&self, source: &Source) -> Result<(), StorageError> {
        sqlx::query(
            r"
            INSERT INTO sources (id, title, url, created_at)
            VALUES (?1, ?2, ?3, ?4)
            ON CONFLICT(id) DO UPDATE SET
                -- created_at orders unseen questions; never rewrite it
                title = excluded.title,
                url = excluded.url
            ",
        )
        .bind(id_i64("source_id", source.id.value())?)
        .bind(&source.title)
        .bind(source.url.as_deref())
        .bind(source.created_at)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;

        Ok(())
    }

    async fn get_source(&self, id: SourceId) -> Result<Source, StorageError> {
        let row = sqlx::query("SELECT id, title, url, created_at FROM sources WHERE id = ?1")
            .bind(id_i64("source_id", id.value())?)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?
            .ok_or(StorageError::NotFound)?;

        map_source_row(&row)
    }

    async fn list_sources(&self) -> Result<Vec<Source>, StorageError> {
        let rows = sqlx::query(
            "SELECT id, title, url, created_at FROM sources ORDER BY created_at DESC, id DESC",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        rows.iter().map(map_source_row).collect()
    }
}
