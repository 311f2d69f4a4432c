//! Comment database operations
//!
//! Comments on episodes and the per-user votes that drive their counters.

use std::collections::HashMap;

use sqlx::{QueryBuilder, Row, Sqlite};

use super::models::{CommentRecord, CommentWithAuthor, VoteOutcome};
use super::Database;
use crate::core::voting::{VoteRowAction, VoteState, VoteType};

const COMMENT_WITH_AUTHOR_COLUMNS: &str = r#"
    c.id, c.episode_id, c.user_id, c.text, c.upvotes, c.downvotes, c.score,
    c.created_at, c.updated_at, u.display_name, u.avatar_url
"#;

/// Extension trait for comment-related database operations
pub trait CommentOps {
    fn insert_comment(&self, comment: &CommentRecord) -> impl std::future::Future<Output = Result<(), sqlx::Error>> + Send;
    fn get_comment(&self, id: &str) -> impl std::future::Future<Output = Result<Option<CommentWithAuthor>, sqlx::Error>> + Send;
    fn list_episode_comments(&self, episode_id: &str) -> impl std::future::Future<Output = Result<Vec<CommentWithAuthor>, sqlx::Error>> + Send;

    // Votes
    fn cast_vote(&self, user_id: &str, comment_id: &str, vote: VoteType) -> impl std::future::Future<Output = Result<Option<VoteOutcome>, sqlx::Error>> + Send;
    fn get_vote(&self, user_id: &str, comment_id: &str) -> impl std::future::Future<Output = Result<Option<VoteType>, sqlx::Error>> + Send;
    fn get_user_votes(&self, user_id: &str, comment_ids: &[String]) -> impl std::future::Future<Output = Result<HashMap<String, VoteType>, sqlx::Error>> + Send;
    fn count_vote_rows(&self, comment_id: &str) -> impl std::future::Future<Output = Result<(i64, i64), sqlx::Error>> + Send;
}

impl CommentOps for Database {
    // =========================================================================
    // Comment Operations
    // =========================================================================

    async fn insert_comment(&self, comment: &CommentRecord) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            INSERT INTO comments (id, episode_id, user_id, text, upvotes, downvotes, score, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#
        )
        .bind(&comment.id)
        .bind(&comment.episode_id)
        .bind(&comment.user_id)
        .bind(&comment.text)
        .bind(comment.upvotes)
        .bind(comment.downvotes)
        .bind(comment.score)
        .bind(comment.created_at)
        .bind(comment.updated_at)
        .execute(self.pool())
        .await?;
        Ok(())
    }

    async fn get_comment(&self, id: &str) -> Result<Option<CommentWithAuthor>, sqlx::Error> {
        sqlx::query_as::<_, CommentWithAuthor>(&format!(
            "SELECT {COMMENT_WITH_AUTHOR_COLUMNS} FROM comments c LEFT JOIN users u ON u.id = c.user_id WHERE c.id = ?"
        ))
        .bind(id)
        .fetch_optional(self.pool())
        .await
    }

    async fn list_episode_comments(&self, episode_id: &str) -> Result<Vec<CommentWithAuthor>, sqlx::Error> {
        sqlx::query_as::<_, CommentWithAuthor>(&format!(
            r#"
            SELECT {COMMENT_WITH_AUTHOR_COLUMNS}
            FROM comments c
            LEFT JOIN users u ON u.id = c.user_id
            WHERE c.episode_id = ?
            ORDER BY c.score DESC, c.created_at DESC
            "#
        ))
        .bind(episode_id)
        .fetch_all(self.pool())
        .await
    }

    // =========================================================================
    // Vote Operations
    // =========================================================================

    /// Apply a vote cast and return the comment's new counters.
    ///
    /// Returns `Ok(None)` when the comment does not exist; nothing is written
    /// in that case. The whole read-branch-write sequence runs in a single
    /// transaction whose first statement is a write on the comment row, so
    /// concurrent casts on the same comment are serialized by the write lock.
    async fn cast_vote(&self, user_id: &str, comment_id: &str, vote: VoteType) -> Result<Option<VoteOutcome>, sqlx::Error> {
        let now = super::now_millis();
        let mut tx = self.pool().begin().await?;

        let touched = sqlx::query("UPDATE comments SET updated_at = ? WHERE id = ?")
            .bind(now)
            .bind(comment_id)
            .execute(&mut *tx)
            .await?;
        if touched.rows_affected() == 0 {
            tx.rollback().await?;
            return Ok(None);
        }

        let existing: Option<i64> = sqlx::query_scalar(
            "SELECT vote_type FROM comment_votes WHERE user_id = ? AND comment_id = ?"
        )
        .bind(user_id)
        .bind(comment_id)
        .fetch_optional(&mut *tx)
        .await?;

        let current = VoteState::from_vote(existing.and_then(|v| VoteType::try_from(v).ok()));
        let transition = current.transition(vote);

        match transition.action {
            VoteRowAction::Insert(v) => {
                sqlx::query(
                    "INSERT INTO comment_votes (user_id, comment_id, vote_type, updated_at) VALUES (?, ?, ?, ?)"
                )
                .bind(user_id)
                .bind(comment_id)
                .bind(v.as_i64())
                .bind(now)
                .execute(&mut *tx)
                .await?;
            }
            VoteRowAction::Update(v) => {
                sqlx::query(
                    "UPDATE comment_votes SET vote_type = ?, updated_at = ? WHERE user_id = ? AND comment_id = ?"
                )
                .bind(v.as_i64())
                .bind(now)
                .bind(user_id)
                .bind(comment_id)
                .execute(&mut *tx)
                .await?;
            }
            VoteRowAction::Delete => {
                sqlx::query("DELETE FROM comment_votes WHERE user_id = ? AND comment_id = ?")
                    .bind(user_id)
                    .bind(comment_id)
                    .execute(&mut *tx)
                    .await?;
            }
        }

        // SET expressions see the pre-update row, so score is derived from
        // the same floored values written to upvotes/downvotes.
        let row = sqlx::query(
            r#"
            UPDATE comments
            SET upvotes = MAX(upvotes + ?, 0),
                downvotes = MAX(downvotes + ?, 0),
                score = MAX(upvotes + ?, 0) - MAX(downvotes + ?, 0),
                updated_at = ?
            WHERE id = ?
            RETURNING upvotes, downvotes, score
            "#
        )
        .bind(transition.upvote_delta)
        .bind(transition.downvote_delta)
        .bind(transition.upvote_delta)
        .bind(transition.downvote_delta)
        .bind(now)
        .bind(comment_id)
        .fetch_one(&mut *tx)
        .await?;

        let outcome = VoteOutcome {
            upvotes: row.try_get("upvotes")?,
            downvotes: row.try_get("downvotes")?,
            score: row.try_get("score")?,
            user_vote: transition.next.vote(),
        };

        tx.commit().await?;

        tracing::debug!(
            comment_id,
            user_id,
            from = ?current,
            to = ?transition.next,
            score = outcome.score,
            "Applied comment vote"
        );

        Ok(Some(outcome))
    }

    async fn get_vote(&self, user_id: &str, comment_id: &str) -> Result<Option<VoteType>, sqlx::Error> {
        let stored: Option<i64> = sqlx::query_scalar(
            "SELECT vote_type FROM comment_votes WHERE user_id = ? AND comment_id = ?"
        )
        .bind(user_id)
        .bind(comment_id)
        .fetch_optional(self.pool())
        .await?;

        Ok(stored.and_then(|v| VoteType::try_from(v).ok()))
    }

    /// Votes the user has cast on any of `comment_ids`; unvoted ids are absent.
    async fn get_user_votes(&self, user_id: &str, comment_ids: &[String]) -> Result<HashMap<String, VoteType>, sqlx::Error> {
        if comment_ids.is_empty() {
            return Ok(HashMap::new());
        }

        let mut builder: QueryBuilder<Sqlite> = QueryBuilder::new(
            "SELECT comment_id, vote_type FROM comment_votes WHERE user_id = "
        );
        builder.push_bind(user_id);
        builder.push(" AND comment_id IN (");
        let mut separated = builder.separated(", ");
        for id in comment_ids {
            separated.push_bind(id);
        }
        separated.push_unseparated(")");

        let rows = builder.build().fetch_all(self.pool()).await?;

        let mut votes = HashMap::with_capacity(rows.len());
        for row in rows {
            let comment_id: String = row.try_get("comment_id")?;
            let vote_type: i64 = row.try_get("vote_type")?;
            if let Ok(vote) = VoteType::try_from(vote_type) {
                votes.insert(comment_id, vote);
            }
        }
        Ok(votes)
    }

    /// Count of (up, down) vote rows for a comment, independent of the
    /// denormalized counters.
    async fn count_vote_rows(&self, comment_id: &str) -> Result<(i64, i64), sqlx::Error> {
        let row = sqlx::query(
            r#"
            SELECT
                COALESCE(SUM(CASE WHEN vote_type = 1 THEN 1 ELSE 0 END), 0) AS up,
                COALESCE(SUM(CASE WHEN vote_type = -1 THEN 1 ELSE 0 END), 0) AS down
            FROM comment_votes
            WHERE comment_id = ?
            "#
        )
        .bind(comment_id)
        .fetch_one(self.pool())
        .await?;

        Ok((row.try_get("up")?, row.try_get("down")?))
    }
}
