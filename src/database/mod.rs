//! SQLite Database Module
//!
//! Structured storage for the card catalog (content items, episodes, cards),
//! users, comments and votes, likes, and per-user card states.
//!
//! Operations are grouped into extension traits implemented on [`Database`]:
//! [`ContentOps`], [`UserOps`], [`CommentOps`], [`LikeOps`], [`CardStateOps`]
//! and [`MediaRefOps`].

mod card_states;
mod comments;
mod content;
mod likes;
mod media;
mod migrations;
mod models;
mod users;

pub use card_states::CardStateOps;
pub use comments::CommentOps;
pub use content::ContentOps;
pub use likes::LikeOps;
pub use media::MediaRefOps;
pub use migrations::run_migrations;
pub use models::*;
pub use users::UserOps;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Database file name inside the data directory
pub const DATABASE_FILE: &str = "clipdeck.db";

/// Database connection pool
#[derive(Clone)]
pub struct Database {
    pool: SqlitePool,
    path: PathBuf,
}

impl Database {
    /// Open (or create) the database in `data_dir` and run pending migrations.
    pub async fn new(data_dir: &Path) -> Result<Self, sqlx::Error> {
        let db_path = data_dir.join(DATABASE_FILE);

        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent).ok();
        }

        let options = SqliteConnectOptions::from_str(&format!("sqlite:{}?mode=rwc", db_path.display()))?
            .create_if_missing(true)
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
            .synchronous(sqlx::sqlite::SqliteSynchronous::Normal)
            .foreign_keys(true)
            .busy_timeout(std::time::Duration::from_secs(30));

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .min_connections(1)
            .connect_with(options)
            .await?;

        let db = Self { pool, path: db_path };

        migrations::run_migrations(&db.pool).await?;

        Ok(db)
    }

    /// Get the underlying pool for direct queries
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Get database file path
    pub fn path(&self) -> &PathBuf {
        &self.path
    }
}

/// Current time as epoch milliseconds, the unit of every stored timestamp.
pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
