//! Card state database operations
//!
//! Per-user spaced-repetition state of cards. A card is "saved" whenever its
//! state is anything other than `none`.

use super::models::{CardStateRecord, SrsState};
use super::Database;

/// Extension trait for card state database operations
pub trait CardStateOps {
    fn set_card_state(&self, user_id: &str, card_id: &str, film_id: &str, state: SrsState) -> impl std::future::Future<Output = Result<CardStateRecord, sqlx::Error>> + Send;
    fn get_card_state(&self, user_id: &str, card_id: &str) -> impl std::future::Future<Output = Result<Option<CardStateRecord>, sqlx::Error>> + Send;
    fn count_saved_cards(&self, user_id: &str, film_id: &str) -> impl std::future::Future<Output = Result<i64, sqlx::Error>> + Send;
    fn list_saved_cards(&self, user_id: &str, film_id: &str) -> impl std::future::Future<Output = Result<Vec<CardStateRecord>, sqlx::Error>> + Send;
}

impl CardStateOps for Database {
    async fn set_card_state(&self, user_id: &str, card_id: &str, film_id: &str, state: SrsState) -> Result<CardStateRecord, sqlx::Error> {
        sqlx::query_as::<_, CardStateRecord>(
            r#"
            INSERT INTO user_card_states (user_id, card_id, film_id, srs_state, updated_at)
            VALUES (?, ?, ?, ?, ?)
            ON CONFLICT(user_id, card_id) DO UPDATE SET
                film_id = excluded.film_id,
                srs_state = excluded.srs_state,
                updated_at = excluded.updated_at
            RETURNING user_id, card_id, film_id, srs_state, updated_at
            "#
        )
        .bind(user_id)
        .bind(card_id)
        .bind(film_id)
        .bind(state.as_str())
        .bind(super::now_millis())
        .fetch_one(self.pool())
        .await
    }

    async fn get_card_state(&self, user_id: &str, card_id: &str) -> Result<Option<CardStateRecord>, sqlx::Error> {
        sqlx::query_as::<_, CardStateRecord>(
            "SELECT * FROM user_card_states WHERE user_id = ? AND card_id = ?"
        )
        .bind(user_id)
        .bind(card_id)
        .fetch_optional(self.pool())
        .await
    }

    async fn count_saved_cards(&self, user_id: &str, film_id: &str) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar(
            "SELECT COUNT(*) FROM user_card_states WHERE user_id = ? AND film_id = ? AND srs_state != 'none'"
        )
        .bind(user_id)
        .bind(film_id)
        .fetch_one(self.pool())
        .await
    }

    async fn list_saved_cards(&self, user_id: &str, film_id: &str) -> Result<Vec<CardStateRecord>, sqlx::Error> {
        sqlx::query_as::<_, CardStateRecord>(
            r#"
            SELECT * FROM user_card_states
            WHERE user_id = ? AND film_id = ? AND srs_state != 'none'
            ORDER BY updated_at DESC
            "#
        )
        .bind(user_id)
        .bind(film_id)
        .fetch_all(self.pool())
        .await
    }
}
