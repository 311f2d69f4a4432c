//! Like database operations
//!
//! Per-user likes of content items and the denormalized per-item counter.

use super::models::LikeToggle;
use super::Database;

/// Extension trait for like-related database operations
pub trait LikeOps {
    fn toggle_like(&self, user_id: &str, content_item_id: &str) -> impl std::future::Future<Output = Result<LikeToggle, sqlx::Error>> + Send;
    fn get_like_count(&self, content_item_id: &str) -> impl std::future::Future<Output = Result<i64, sqlx::Error>> + Send;
    fn has_liked(&self, user_id: &str, content_item_id: &str) -> impl std::future::Future<Output = Result<bool, sqlx::Error>> + Send;
    fn count_like_rows(&self, content_item_id: &str) -> impl std::future::Future<Output = Result<i64, sqlx::Error>> + Send;
}

impl LikeOps for Database {
    /// Flip the user's like on a content item and return the durable counter.
    ///
    /// The counter row is upserted first inside the transaction: that both
    /// creates it lazily (the primary key makes concurrent first likes safe)
    /// and takes the write lock before the like row is inspected.
    async fn toggle_like(&self, user_id: &str, content_item_id: &str) -> Result<LikeToggle, sqlx::Error> {
        let now = super::now_millis();
        let mut tx = self.pool().begin().await?;

        sqlx::query(
            r#"
            INSERT INTO content_like_counts (content_item_id, like_count, updated_at)
            VALUES (?, 0, ?)
            ON CONFLICT(content_item_id) DO UPDATE SET updated_at = excluded.updated_at
            "#
        )
        .bind(content_item_id)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        let removed = sqlx::query("DELETE FROM likes WHERE user_id = ? AND content_item_id = ?")
            .bind(user_id)
            .bind(content_item_id)
            .execute(&mut *tx)
            .await?;

        let liked = if removed.rows_affected() > 0 {
            sqlx::query(
                "UPDATE content_like_counts SET like_count = MAX(like_count - 1, 0), updated_at = ? WHERE content_item_id = ?"
            )
            .bind(now)
            .bind(content_item_id)
            .execute(&mut *tx)
            .await?;
            false
        } else {
            sqlx::query("INSERT INTO likes (user_id, content_item_id, created_at) VALUES (?, ?, ?)")
                .bind(user_id)
                .bind(content_item_id)
                .bind(now)
                .execute(&mut *tx)
                .await?;
            sqlx::query(
                "UPDATE content_like_counts SET like_count = like_count + 1, updated_at = ? WHERE content_item_id = ?"
            )
            .bind(now)
            .bind(content_item_id)
            .execute(&mut *tx)
            .await?;
            true
        };

        let like_count: i64 = sqlx::query_scalar(
            "SELECT like_count FROM content_like_counts WHERE content_item_id = ?"
        )
        .bind(content_item_id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        tracing::debug!(user_id, content_item_id, liked, like_count, "Toggled like");

        Ok(LikeToggle { liked, like_count })
    }

    /// Counter value, or 0 when the item has never been liked
    async fn get_like_count(&self, content_item_id: &str) -> Result<i64, sqlx::Error> {
        let count: Option<i64> = sqlx::query_scalar(
            "SELECT like_count FROM content_like_counts WHERE content_item_id = ?"
        )
        .bind(content_item_id)
        .fetch_optional(self.pool())
        .await?;

        Ok(count.unwrap_or(0))
    }

    async fn has_liked(&self, user_id: &str, content_item_id: &str) -> Result<bool, sqlx::Error> {
        let exists: Option<i64> = sqlx::query_scalar(
            "SELECT 1 FROM likes WHERE user_id = ? AND content_item_id = ?"
        )
        .bind(user_id)
        .bind(content_item_id)
        .fetch_optional(self.pool())
        .await?;

        Ok(exists.is_some())
    }

    /// Number of like rows, computed without the denormalized counter
    async fn count_like_rows(&self, content_item_id: &str) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar("SELECT COUNT(*) FROM likes WHERE content_item_id = ?")
            .bind(content_item_id)
            .fetch_one(self.pool())
            .await
    }
}
