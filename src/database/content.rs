//! Catalog database operations
//!
//! Content items, their episodes, and the cards inside each episode.
//! Content items and episodes are addressed by slug from the HTTP surface;
//! the resolvers here map slugs to records.

use super::models::{CardRecord, ContentItemRecord, EpisodeRecord};
use super::Database;

/// Extension trait for catalog database operations
pub trait ContentOps {
    // Content items
    fn create_content_item(&self, item: &ContentItemRecord) -> impl std::future::Future<Output = Result<(), sqlx::Error>> + Send;
    fn get_content_item_by_slug(&self, slug: &str) -> impl std::future::Future<Output = Result<Option<ContentItemRecord>, sqlx::Error>> + Send;
    fn list_content_items(&self) -> impl std::future::Future<Output = Result<Vec<ContentItemRecord>, sqlx::Error>> + Send;

    // Episodes
    fn create_episode(&self, episode: &EpisodeRecord) -> impl std::future::Future<Output = Result<(), sqlx::Error>> + Send;
    fn get_episode_by_slug(&self, content_item_id: &str, slug: &str) -> impl std::future::Future<Output = Result<Option<EpisodeRecord>, sqlx::Error>> + Send;
    fn list_episodes(&self, content_item_id: &str) -> impl std::future::Future<Output = Result<Vec<EpisodeRecord>, sqlx::Error>> + Send;

    // Cards
    fn create_card(&self, card: &CardRecord) -> impl std::future::Future<Output = Result<(), sqlx::Error>> + Send;
    fn get_card(&self, id: &str) -> impl std::future::Future<Output = Result<Option<CardRecord>, sqlx::Error>> + Send;
    fn list_episode_cards(&self, episode_id: &str) -> impl std::future::Future<Output = Result<Vec<CardRecord>, sqlx::Error>> + Send;
    fn get_card_content_slug(&self, card_id: &str) -> impl std::future::Future<Output = Result<Option<String>, sqlx::Error>> + Send;
}

impl ContentOps for Database {
    // =========================================================================
    // Content Item Operations
    // =========================================================================

    async fn create_content_item(&self, item: &ContentItemRecord) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            INSERT INTO content_items (id, slug, title, content_type, cover_key, created_at)
            VALUES (?, ?, ?, ?, ?, ?)
            "#
        )
        .bind(&item.id)
        .bind(&item.slug)
        .bind(&item.title)
        .bind(&item.content_type)
        .bind(&item.cover_key)
        .bind(item.created_at)
        .execute(self.pool())
        .await?;
        Ok(())
    }

    async fn get_content_item_by_slug(&self, slug: &str) -> Result<Option<ContentItemRecord>, sqlx::Error> {
        sqlx::query_as::<_, ContentItemRecord>(
            "SELECT * FROM content_items WHERE slug = ?"
        )
        .bind(slug)
        .fetch_optional(self.pool())
        .await
    }

    async fn list_content_items(&self) -> Result<Vec<ContentItemRecord>, sqlx::Error> {
        sqlx::query_as::<_, ContentItemRecord>(
            "SELECT * FROM content_items ORDER BY title ASC"
        )
        .fetch_all(self.pool())
        .await
    }

    // =========================================================================
    // Episode Operations
    // =========================================================================

    async fn create_episode(&self, episode: &EpisodeRecord) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            INSERT INTO episodes (id, content_item_id, slug, episode_number, title, created_at)
            VALUES (?, ?, ?, ?, ?, ?)
            "#
        )
        .bind(&episode.id)
        .bind(&episode.content_item_id)
        .bind(&episode.slug)
        .bind(episode.episode_number)
        .bind(&episode.title)
        .bind(episode.created_at)
        .execute(self.pool())
        .await?;
        Ok(())
    }

    /// Episode slugs are only unique within their content item
    async fn get_episode_by_slug(&self, content_item_id: &str, slug: &str) -> Result<Option<EpisodeRecord>, sqlx::Error> {
        sqlx::query_as::<_, EpisodeRecord>(
            "SELECT * FROM episodes WHERE content_item_id = ? AND slug = ?"
        )
        .bind(content_item_id)
        .bind(slug)
        .fetch_optional(self.pool())
        .await
    }

    async fn list_episodes(&self, content_item_id: &str) -> Result<Vec<EpisodeRecord>, sqlx::Error> {
        sqlx::query_as::<_, EpisodeRecord>(
            "SELECT * FROM episodes WHERE content_item_id = ? ORDER BY episode_number ASC"
        )
        .bind(content_item_id)
        .fetch_all(self.pool())
        .await
    }

    // =========================================================================
    // Card Operations
    // =========================================================================

    async fn create_card(&self, card: &CardRecord) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            INSERT INTO cards (id, episode_id, card_index, start_ms, end_ms, audio_key, image_key, subtitles, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#
        )
        .bind(&card.id)
        .bind(&card.episode_id)
        .bind(card.card_index)
        .bind(card.start_ms)
        .bind(card.end_ms)
        .bind(&card.audio_key)
        .bind(&card.image_key)
        .bind(&card.subtitles)
        .bind(card.created_at)
        .execute(self.pool())
        .await?;
        Ok(())
    }

    async fn get_card(&self, id: &str) -> Result<Option<CardRecord>, sqlx::Error> {
        sqlx::query_as::<_, CardRecord>("SELECT * FROM cards WHERE id = ?")
            .bind(id)
            .fetch_optional(self.pool())
            .await
    }

    async fn list_episode_cards(&self, episode_id: &str) -> Result<Vec<CardRecord>, sqlx::Error> {
        sqlx::query_as::<_, CardRecord>(
            "SELECT * FROM cards WHERE episode_id = ? ORDER BY card_index ASC"
        )
        .bind(episode_id)
        .fetch_all(self.pool())
        .await
    }

    /// Slug of the content item a card belongs to
    async fn get_card_content_slug(&self, card_id: &str) -> Result<Option<String>, sqlx::Error> {
        sqlx::query_scalar(
            r#"
            SELECT ci.slug
            FROM cards c
            JOIN episodes e ON e.id = c.episode_id
            JOIN content_items ci ON ci.id = e.content_item_id
            WHERE c.id = ?
            "#
        )
        .bind(card_id)
        .fetch_optional(self.pool())
        .await
    }
}
