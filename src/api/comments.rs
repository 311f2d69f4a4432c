//! Episode comments and comment votes.

use std::collections::HashMap;

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};

use super::error::{ApiError, ApiResult};
use super::{resolve_episode, AppState};
use crate::core::validation::{self, required};
use crate::core::voting::VoteType;
use crate::database::{CommentOps, CommentRecord, CommentWithAuthor};

#[derive(Debug, Deserialize)]
pub struct EpisodeQuery {
    pub episode_slug: Option<String>,
    pub film_slug: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CreateCommentRequest {
    pub user_id: Option<String>,
    pub episode_slug: Option<String>,
    pub film_slug: Option<String>,
    pub text: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct VoteRequest {
    pub user_id: Option<String>,
    pub comment_id: Option<String>,
    pub vote_type: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct VoteResponse {
    pub success: bool,
    pub upvotes: i64,
    pub downvotes: i64,
    pub score: i64,
    pub user_vote: Option<VoteType>,
}

#[derive(Debug, Deserialize)]
pub struct VoteStatusQuery {
    pub user_id: Option<String>,
    pub comment_ids: Option<String>,
}

pub async fn list_comments(
    State(state): State<AppState>,
    query: Result<Query<EpisodeQuery>, QueryRejection>,
) -> ApiResult<Json<Vec<CommentWithAuthor>>> {
    let Query(query) = query?;
    let episode_slug = required("episode_slug", query.episode_slug)?;
    let film_slug = required("film_slug", query.film_slug)?;

    let episode = resolve_episode(&state.db, &film_slug, &episode_slug).await?;
    let comments = state.db.list_episode_comments(&episode.id).await?;
    Ok(Json(comments))
}

pub async fn create_comment(
    State(state): State<AppState>,
    payload: Result<Json<CreateCommentRequest>, JsonRejection>,
) -> ApiResult<Json<CommentWithAuthor>> {
    let Json(req) = payload?;
    let user_id = required("user_id", req.user_id)?;
    let episode_slug = required("episode_slug", req.episode_slug)?;
    let film_slug = required("film_slug", req.film_slug)?;
    let text = validation::comment_text(&required("text", req.text)?)?;

    let episode = resolve_episode(&state.db, &film_slug, &episode_slug).await?;

    let comment = CommentRecord::new(&episode.id, &user_id, text);
    state.db.insert_comment(&comment).await?;
    tracing::info!(comment_id = %comment.id, episode_id = %episode.id, "Comment created");

    let created = state
        .db
        .get_comment(&comment.id)
        .await?
        .ok_or_else(|| ApiError::Internal(format!("comment {} missing after insert", comment.id)))?;
    Ok(Json(created))
}

pub async fn cast_vote(
    State(state): State<AppState>,
    payload: Result<Json<VoteRequest>, JsonRejection>,
) -> ApiResult<Json<VoteResponse>> {
    let Json(req) = payload?;
    let user_id = required("user_id", req.user_id)?;
    let comment_id = required("comment_id", req.comment_id)?;
    let vote = VoteType::try_from(req.vote_type.ok_or(validation::ValidationError::Missing("vote_type"))?)?;

    let outcome = state
        .db
        .cast_vote(&user_id, &comment_id, vote)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("Comment '{comment_id}'")))?;

    Ok(Json(VoteResponse {
        success: true,
        upvotes: outcome.upvotes,
        downvotes: outcome.downvotes,
        score: outcome.score,
        user_vote: outcome.user_vote,
    }))
}

/// Votes the user has on the listed comments; unvoted ids are absent.
///
/// `comment_ids` must be present, but an empty list answers `{}`.
pub async fn vote_status(
    State(state): State<AppState>,
    query: Result<Query<VoteStatusQuery>, QueryRejection>,
) -> ApiResult<Json<HashMap<String, VoteType>>> {
    let Query(query) = query?;
    let user_id = required("user_id", query.user_id)?;

    let raw_ids = query.comment_ids.ok_or(validation::ValidationError::Missing("comment_ids"))?;

    let ids = validation::id_list(&raw_ids);
    if ids.is_empty() {
        return Ok(Json(HashMap::new()));
    }

    let votes = state.db.get_user_votes(&user_id, &ids).await?;
    Ok(Json(votes))
}
