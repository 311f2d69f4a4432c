//! Social Records
//!
//! Comments, vote outcomes, likes and spaced-repetition card states.

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::core::voting::VoteType;

// ============================================================================
// Comment Records
// ============================================================================

/// Comment database record
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct CommentRecord {
    pub id: String,
    pub episode_id: String,
    pub user_id: String,
    pub text: String,
    pub upvotes: i64,
    pub downvotes: i64,
    pub score: i64,
    pub created_at: i64,
    pub updated_at: i64,
}

impl CommentRecord {
    /// A fresh comment with zeroed counters. `text` is stored as given.
    pub fn new(episode_id: impl Into<String>, user_id: impl Into<String>, text: impl Into<String>) -> Self {
        let now = crate::database::now_millis();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            episode_id: episode_id.into(),
            user_id: user_id.into(),
            text: text.into(),
            upvotes: 0,
            downvotes: 0,
            score: 0,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Comment joined with its author's display fields.
///
/// Authors without a `users` row come back with `display_name = None`.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct CommentWithAuthor {
    pub id: String,
    pub episode_id: String,
    pub user_id: String,
    pub text: String,
    pub upvotes: i64,
    pub downvotes: i64,
    pub score: i64,
    pub created_at: i64,
    pub updated_at: i64,
    pub display_name: Option<String>,
    pub avatar_url: Option<String>,
}

/// Counters after a vote cast, plus the caller's resulting vote
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct VoteOutcome {
    pub upvotes: i64,
    pub downvotes: i64,
    pub score: i64,
    pub user_vote: Option<VoteType>,
}

// ============================================================================
// Likes
// ============================================================================

/// Result of a like toggle; `like_count` is read back from the counter row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LikeToggle {
    pub liked: bool,
    pub like_count: i64,
}

// ============================================================================
// Card States
// ============================================================================

/// Spaced-repetition state of a (user, card) pair. `None` means "not saved".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SrsState {
    None,
    New,
    Learning,
    Review,
    Mastered,
}

impl SrsState {
    pub fn as_str(&self) -> &'static str {
        match self {
            SrsState::None => "none",
            SrsState::New => "new",
            SrsState::Learning => "learning",
            SrsState::Review => "review",
            SrsState::Mastered => "mastered",
        }
    }

    /// A card counts as saved in every state except `none`
    pub fn is_saved(&self) -> bool {
        !matches!(self, SrsState::None)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown SRS state: {0}")]
pub struct UnknownSrsState(pub String);

impl FromStr for SrsState {
    type Err = UnknownSrsState;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "none" => Ok(SrsState::None),
            "new" => Ok(SrsState::New),
            "learning" => Ok(SrsState::Learning),
            "review" => Ok(SrsState::Review),
            "mastered" => Ok(SrsState::Mastered),
            other => Err(UnknownSrsState(other.to_string())),
        }
    }
}

impl TryFrom<String> for SrsState {
    type Error = UnknownSrsState;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

/// Per-user card state record
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct CardStateRecord {
    pub user_id: String,
    pub card_id: String,
    pub film_id: String,
    #[sqlx(try_from = "String")]
    pub srs_state: SrsState,
    pub updated_at: i64,
}
