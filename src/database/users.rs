//! User database operations

use super::models::UserRecord;
use super::Database;

/// Extension trait for user database operations
pub trait UserOps {
    fn upsert_user(&self, user: &UserRecord) -> impl std::future::Future<Output = Result<(), sqlx::Error>> + Send;
    fn get_user(&self, id: &str) -> impl std::future::Future<Output = Result<Option<UserRecord>, sqlx::Error>> + Send;
}

impl UserOps for Database {
    async fn upsert_user(&self, user: &UserRecord) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            INSERT INTO users (id, display_name, avatar_url, created_at)
            VALUES (?, ?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                display_name = excluded.display_name,
                avatar_url = excluded.avatar_url
            "#
        )
        .bind(&user.id)
        .bind(&user.display_name)
        .bind(&user.avatar_url)
        .bind(user.created_at)
        .execute(self.pool())
        .await?;
        Ok(())
    }

    async fn get_user(&self, id: &str) -> Result<Option<UserRecord>, sqlx::Error> {
        sqlx::query_as::<_, UserRecord>("SELECT * FROM users WHERE id = ?")
            .bind(id)
            .fetch_optional(self.pool())
            .await
    }
}
