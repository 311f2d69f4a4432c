//! Media reference database operations
//!
//! Object-store keys are referenced from `cards.audio_key`, `cards.image_key`
//! and `content_items.cover_key`. Bulk media migrations rename objects and
//! then rewrite those references here.

use super::Database;

/// Extension trait for media reference operations
pub trait MediaRefOps {
    fn rewrite_media_key(&self, old_key: &str, new_key: &str) -> impl std::future::Future<Output = Result<u64, sqlx::Error>> + Send;
    fn count_media_references(&self, key: &str) -> impl std::future::Future<Output = Result<i64, sqlx::Error>> + Send;
}

impl MediaRefOps for Database {
    /// Point every reference to `old_key` at `new_key`; returns rows changed
    async fn rewrite_media_key(&self, old_key: &str, new_key: &str) -> Result<u64, sqlx::Error> {
        let mut tx = self.pool().begin().await?;

        let audio = sqlx::query("UPDATE cards SET audio_key = ? WHERE audio_key = ?")
            .bind(new_key)
            .bind(old_key)
            .execute(&mut *tx)
            .await?;
        let image = sqlx::query("UPDATE cards SET image_key = ? WHERE image_key = ?")
            .bind(new_key)
            .bind(old_key)
            .execute(&mut *tx)
            .await?;
        let cover = sqlx::query("UPDATE content_items SET cover_key = ? WHERE cover_key = ?")
            .bind(new_key)
            .bind(old_key)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        Ok(audio.rows_affected() + image.rows_affected() + cover.rows_affected())
    }

    async fn count_media_references(&self, key: &str) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar(
            r#"
            SELECT
                (SELECT COUNT(*) FROM cards WHERE audio_key = ?1)
              + (SELECT COUNT(*) FROM cards WHERE image_key = ?1)
              + (SELECT COUNT(*) FROM content_items WHERE cover_key = ?1)
            "#
        )
        .bind(key)
        .fetch_one(self.pool())
        .await
    }
}
