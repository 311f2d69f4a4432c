//! Database Migrations
//!
//! Handles schema creation and versioned migrations.

use sqlx::sqlite::SqlitePool;
use sqlx::Row;
use tracing::{info, warn};

/// Current database schema version
const SCHEMA_VERSION: i32 = 3;

/// Run all pending migrations
pub async fn run_migrations(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS _migrations (
            version INTEGER PRIMARY KEY,
            name TEXT NOT NULL,
            applied_at TEXT NOT NULL DEFAULT (datetime('now'))
        )
        "#
    )
    .execute(pool)
    .await?;

    let current_version = get_current_version(pool).await?;

    info!(current_version, target_version = SCHEMA_VERSION, "Checking database migrations");

    if current_version < SCHEMA_VERSION {
        info!("Running database migrations from v{} to v{}", current_version, SCHEMA_VERSION);

        for version in (current_version + 1)..=SCHEMA_VERSION {
            run_migration(pool, version).await?;
        }

        info!("Database migrations completed successfully");
    }

    Ok(())
}

/// Get the current schema version
async fn get_current_version(pool: &SqlitePool) -> Result<i32, sqlx::Error> {
    let result = sqlx::query("SELECT MAX(version) as version FROM _migrations")
        .fetch_optional(pool)
        .await?;

    Ok(result
        .and_then(|row| row.try_get::<i32, _>("version").ok())
        .unwrap_or(0))
}

/// Run a specific migration version inside its own transaction
async fn run_migration(pool: &SqlitePool, version: i32) -> Result<(), sqlx::Error> {
    let (name, sql) = match version {
        1 => ("catalog", MIGRATION_V1),
        2 => ("comments_and_likes", MIGRATION_V2),
        3 => ("user_card_states", MIGRATION_V3),
        _ => {
            warn!("Unknown migration version: {}", version);
            return Ok(());
        }
    };

    info!("Applying migration v{}: {}", version, name);

    let mut tx = pool.begin().await?;

    for statement in sql.split(';').filter(|s| !s.trim().is_empty()) {
        sqlx::query(statement.trim())
            .execute(&mut *tx)
            .await?;
    }

    sqlx::query("INSERT INTO _migrations (version, name) VALUES (?, ?)")
        .bind(version)
        .bind(name)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;
    Ok(())
}

/// Migration v1: users and the card catalog
const MIGRATION_V1: &str = r#"
CREATE TABLE IF NOT EXISTS users (
    id TEXT PRIMARY KEY,
    display_name TEXT NOT NULL,
    avatar_url TEXT,
    created_at INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS content_items (
    id TEXT PRIMARY KEY,
    slug TEXT NOT NULL UNIQUE,
    title TEXT NOT NULL,
    content_type TEXT NOT NULL DEFAULT 'movie',
    cover_key TEXT,
    created_at INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS episodes (
    id TEXT PRIMARY KEY,
    content_item_id TEXT NOT NULL REFERENCES content_items(id) ON DELETE CASCADE,
    slug TEXT NOT NULL,
    episode_number INTEGER NOT NULL DEFAULT 1,
    title TEXT,
    created_at INTEGER NOT NULL,
    UNIQUE (content_item_id, slug)
);

CREATE TABLE IF NOT EXISTS cards (
    id TEXT PRIMARY KEY,
    episode_id TEXT NOT NULL REFERENCES episodes(id) ON DELETE CASCADE,
    card_index INTEGER NOT NULL,
    start_ms INTEGER NOT NULL,
    end_ms INTEGER NOT NULL,
    audio_key TEXT,
    image_key TEXT,
    subtitles TEXT NOT NULL DEFAULT '{}',
    created_at INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_cards_episode ON cards(episode_id, card_index);
CREATE INDEX IF NOT EXISTS idx_cards_audio_key ON cards(audio_key);
CREATE INDEX IF NOT EXISTS idx_cards_image_key ON cards(image_key)
"#;

/// Migration v2: comments, comment votes, likes and the denormalized like counter
const MIGRATION_V2: &str = r#"
CREATE TABLE IF NOT EXISTS comments (
    id TEXT PRIMARY KEY,
    episode_id TEXT NOT NULL REFERENCES episodes(id) ON DELETE CASCADE,
    user_id TEXT NOT NULL,
    text TEXT NOT NULL,
    upvotes INTEGER NOT NULL DEFAULT 0 CHECK (upvotes >= 0),
    downvotes INTEGER NOT NULL DEFAULT 0 CHECK (downvotes >= 0),
    score INTEGER NOT NULL DEFAULT 0,
    created_at INTEGER NOT NULL,
    updated_at INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_comments_episode_rank ON comments(episode_id, score DESC, created_at DESC);

CREATE TABLE IF NOT EXISTS comment_votes (
    user_id TEXT NOT NULL,
    comment_id TEXT NOT NULL REFERENCES comments(id) ON DELETE CASCADE,
    vote_type INTEGER NOT NULL CHECK (vote_type IN (1, -1)),
    updated_at INTEGER NOT NULL,
    PRIMARY KEY (user_id, comment_id)
);

CREATE INDEX IF NOT EXISTS idx_comment_votes_comment ON comment_votes(comment_id);

CREATE TABLE IF NOT EXISTS likes (
    user_id TEXT NOT NULL,
    content_item_id TEXT NOT NULL REFERENCES content_items(id) ON DELETE CASCADE,
    created_at INTEGER NOT NULL,
    PRIMARY KEY (user_id, content_item_id)
);

CREATE TABLE IF NOT EXISTS content_like_counts (
    content_item_id TEXT PRIMARY KEY REFERENCES content_items(id) ON DELETE CASCADE,
    like_count INTEGER NOT NULL DEFAULT 0 CHECK (like_count >= 0),
    updated_at INTEGER NOT NULL
)
"#;

/// Migration v3: per-user spaced-repetition card states
const MIGRATION_V3: &str = r#"
CREATE TABLE IF NOT EXISTS user_card_states (
    user_id TEXT NOT NULL,
    card_id TEXT NOT NULL REFERENCES cards(id) ON DELETE CASCADE,
    film_id TEXT NOT NULL,
    srs_state TEXT NOT NULL DEFAULT 'none',
    updated_at INTEGER NOT NULL,
    PRIMARY KEY (user_id, card_id)
);

CREATE INDEX IF NOT EXISTS idx_user_card_states_film ON user_card_states(user_id, film_id, srs_state)
"#;
