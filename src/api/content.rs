//! Content catalog, likes and saved cards.
//!
//! `film_id` parameters carry the content item's slug.

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};

use super::error::{ApiError, ApiResult};
use super::{resolve_content, resolve_episode, AppState};
use crate::core::validation::required;
use crate::database::{
    CardRecord, CardStateOps, CardStateRecord, ContentItemRecord, ContentOps, EpisodeRecord, LikeOps, LikeToggle,
    SrsState,
};

#[derive(Debug, Deserialize)]
pub struct FilmQuery {
    pub user_id: Option<String>,
    pub film_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LikeRequest {
    pub user_id: Option<String>,
    pub film_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CardStateRequest {
    pub user_id: Option<String>,
    pub card_id: Option<String>,
    pub srs_state: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CardsQuery {
    pub episode_slug: Option<String>,
    pub film_slug: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CountResponse {
    pub count: i64,
}

#[derive(Debug, Serialize)]
pub struct LikeStatusResponse {
    pub liked: bool,
}

// ============================================================================
// Catalog
// ============================================================================

pub async fn list_content(State(state): State<AppState>) -> ApiResult<Json<Vec<ContentItemRecord>>> {
    Ok(Json(state.db.list_content_items().await?))
}

pub async fn list_episodes(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> ApiResult<Json<Vec<EpisodeRecord>>> {
    let item = resolve_content(&state.db, &slug).await?;
    Ok(Json(state.db.list_episodes(&item.id).await?))
}

pub async fn list_cards(
    State(state): State<AppState>,
    query: Result<Query<CardsQuery>, QueryRejection>,
) -> ApiResult<Json<Vec<CardRecord>>> {
    let Query(query) = query?;
    let episode_slug = required("episode_slug", query.episode_slug)?;
    let film_slug = required("film_slug", query.film_slug)?;

    let episode = resolve_episode(&state.db, &film_slug, &episode_slug).await?;
    Ok(Json(state.db.list_episode_cards(&episode.id).await?))
}

// ============================================================================
// Likes
// ============================================================================

pub async fn toggle_like(
    State(state): State<AppState>,
    payload: Result<Json<LikeRequest>, JsonRejection>,
) -> ApiResult<Json<LikeToggle>> {
    let Json(req) = payload?;
    let user_id = required("user_id", req.user_id)?;
    let film_id = required("film_id", req.film_id)?;

    let item = resolve_content(&state.db, &film_id).await?;
    let toggle = state.db.toggle_like(&user_id, &item.id).await?;
    tracing::debug!(content_item_id = %item.id, liked = toggle.liked, like_count = toggle.like_count, "Like toggled");
    Ok(Json(toggle))
}

/// Unknown content counts as zero likes
pub async fn like_count(
    State(state): State<AppState>,
    query: Result<Query<FilmQuery>, QueryRejection>,
) -> ApiResult<Json<CountResponse>> {
    let Query(query) = query?;
    let film_id = required("film_id", query.film_id)?;

    let count = match state.db.get_content_item_by_slug(&film_id).await? {
        Some(item) => state.db.get_like_count(&item.id).await?,
        None => 0,
    };
    Ok(Json(CountResponse { count }))
}

pub async fn like_status(
    State(state): State<AppState>,
    query: Result<Query<FilmQuery>, QueryRejection>,
) -> ApiResult<Json<LikeStatusResponse>> {
    let Query(query) = query?;
    let user_id = required("user_id", query.user_id)?;
    let film_id = required("film_id", query.film_id)?;

    let liked = match state.db.get_content_item_by_slug(&film_id).await? {
        Some(item) => state.db.has_liked(&user_id, &item.id).await?,
        None => false,
    };
    Ok(Json(LikeStatusResponse { liked }))
}

// ============================================================================
// Saved cards
// ============================================================================

pub async fn saved_cards_count(
    State(state): State<AppState>,
    query: Result<Query<FilmQuery>, QueryRejection>,
) -> ApiResult<Json<CountResponse>> {
    let Query(query) = query?;
    let user_id = required("user_id", query.user_id)?;
    let film_id = required("film_id", query.film_id)?;

    let count = state.db.count_saved_cards(&user_id, &film_id).await?;
    Ok(Json(CountResponse { count }))
}

pub async fn set_card_state(
    State(state): State<AppState>,
    payload: Result<Json<CardStateRequest>, JsonRejection>,
) -> ApiResult<Json<CardStateRecord>> {
    let Json(req) = payload?;
    let user_id = required("user_id", req.user_id)?;
    let card_id = required("card_id", req.card_id)?;
    let srs_state: SrsState = required("srs_state", req.srs_state)?.parse()?;

    let film_id = state
        .db
        .get_card_content_slug(&card_id)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("Card '{card_id}'")))?;

    let record = state.db.set_card_state(&user_id, &card_id, &film_id, srs_state).await?;
    Ok(Json(record))
}

pub async fn list_card_states(
    State(state): State<AppState>,
    query: Result<Query<FilmQuery>, QueryRejection>,
) -> ApiResult<Json<Vec<CardStateRecord>>> {
    let Query(query) = query?;
    let user_id = required("user_id", query.user_id)?;
    let film_id = required("film_id", query.film_id)?;

    Ok(Json(state.db.list_saved_cards(&user_id, &film_id).await?))
}
