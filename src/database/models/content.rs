//! Catalog Records
//!
//! Content items, episodes, cards and users.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;

/// Subtitle text keyed by language code (`"ja"`, `"en"`, ...).
///
/// Stored as a JSON object in `cards.subtitles` and decoded once at the
/// datastore boundary.
pub type Subtitles = BTreeMap<String, String>;

// ============================================================================
// Content Item Record
// ============================================================================

/// A top-level work (film, series, book) addressed by its slug
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ContentItemRecord {
    pub id: String,
    pub slug: String,
    pub title: String,
    pub content_type: String, // "movie", "series", "book", "video"
    pub cover_key: Option<String>,
    pub created_at: i64,
}

impl ContentItemRecord {
    pub fn new(slug: impl Into<String>, title: impl Into<String>, content_type: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            slug: slug.into(),
            title: title.into(),
            content_type: content_type.into(),
            cover_key: None,
            created_at: crate::database::now_millis(),
        }
    }
}

// ============================================================================
// Episode Record
// ============================================================================

/// A unit within a content item; its slug is unique per content item only
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct EpisodeRecord {
    pub id: String,
    pub content_item_id: String,
    pub slug: String,
    pub episode_number: i64,
    pub title: Option<String>,
    pub created_at: i64,
}

impl EpisodeRecord {
    pub fn new(content_item_id: impl Into<String>, slug: impl Into<String>, episode_number: i64) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            content_item_id: content_item_id.into(),
            slug: slug.into(),
            episode_number,
            title: None,
            created_at: crate::database::now_millis(),
        }
    }
}

// ============================================================================
// Card Record
// ============================================================================

/// A short audio/image/subtitle snippet belonging to an episode
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct CardRecord {
    pub id: String,
    pub episode_id: String,
    pub card_index: i64,
    pub start_ms: i64,
    pub end_ms: i64,
    pub audio_key: Option<String>,
    pub image_key: Option<String>,
    pub subtitles: Json<Subtitles>,
    pub created_at: i64,
}

impl CardRecord {
    pub fn new(episode_id: impl Into<String>, card_index: i64, start_ms: i64, end_ms: i64) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            episode_id: episode_id.into(),
            card_index,
            start_ms,
            end_ms,
            audio_key: None,
            image_key: None,
            subtitles: Json(Subtitles::new()),
            created_at: crate::database::now_millis(),
        }
    }
}

// ============================================================================
// User Record
// ============================================================================

/// Author display data joined onto comments
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct UserRecord {
    pub id: String,
    pub display_name: String,
    pub avatar_url: Option<String>,
    pub created_at: i64,
}
