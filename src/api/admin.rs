//! Admin media endpoints: reference usage and bulk migrations.

use std::collections::BTreeMap;

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::error::{ApiError, ApiResult};
use super::AppState;
use crate::core::media::{JobStatus, MigrationOptions};
use crate::core::validation::{id_list, required, ValidationError};
use crate::database::MediaRefOps;

#[derive(Debug, Deserialize)]
pub struct UsageQuery {
    pub keys: Option<String>,
}

/// Migration parameters; omitted fields take the server defaults
#[derive(Debug, Default, Deserialize)]
pub struct MigrationRequest {
    pub prefix: Option<String>,
    pub source_suffix: Option<String>,
    pub target_suffix: Option<String>,
    pub concurrency: Option<usize>,
    pub dry_run: Option<bool>,
    pub rewrite_references: Option<bool>,
    pub delete_original: Option<bool>,
    pub log_every: Option<usize>,
    pub max_objects: Option<usize>,
}

impl MigrationRequest {
    pub fn apply(self, defaults: &MigrationOptions) -> MigrationOptions {
        let defaults = defaults.clone();
        MigrationOptions {
            prefix: self.prefix.unwrap_or(defaults.prefix),
            source_suffix: self.source_suffix.unwrap_or(defaults.source_suffix),
            target_suffix: self.target_suffix.unwrap_or(defaults.target_suffix),
            concurrency: self.concurrency.unwrap_or(defaults.concurrency),
            dry_run: self.dry_run.unwrap_or(defaults.dry_run),
            rewrite_references: self.rewrite_references.unwrap_or(defaults.rewrite_references),
            delete_original: self.delete_original.unwrap_or(defaults.delete_original),
            log_every: self.log_every.unwrap_or(defaults.log_every),
            max_objects: self.max_objects.unwrap_or(defaults.max_objects),
            ..defaults
        }
    }
}

#[derive(Debug, Serialize)]
pub struct StartMigrationResponse {
    pub job_id: Uuid,
}

/// Reference count per key. Lookups that fail count as zero.
pub async fn media_usage(
    State(state): State<AppState>,
    query: Result<Query<UsageQuery>, QueryRejection>,
) -> ApiResult<Json<BTreeMap<String, i64>>> {
    let Query(query) = query?;
    let keys = id_list(&required("keys", query.keys)?);
    if keys.is_empty() {
        return Err(ValidationError::Missing("keys").into());
    }

    let mut usage = BTreeMap::new();
    for key in keys {
        let count = match state.db.count_media_references(&key).await {
            Ok(count) => count,
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "Media usage lookup failed");
                0
            }
        };
        usage.insert(key, count);
    }

    Ok(Json(usage))
}

pub async fn start_migration(
    State(state): State<AppState>,
    payload: Result<Json<MigrationRequest>, JsonRejection>,
) -> ApiResult<Json<StartMigrationResponse>> {
    let Json(req) = payload?;
    let options = req.apply(&state.migration_defaults);
    let job_id = state.jobs.start(options).await?;
    Ok(Json(StartMigrationResponse { job_id }))
}

pub async fn list_migrations(State(state): State<AppState>) -> Json<Vec<JobStatus>> {
    Json(state.jobs.list().await)
}

pub async fn migration_status(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<JobStatus>> {
    let id = parse_job_id(&id)?;
    state
        .jobs
        .status(id)
        .await
        .map(Json)
        .ok_or_else(|| ApiError::not_found(format!("Migration '{id}'")))
}

pub async fn cancel_migration(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<JobStatus>> {
    let id = parse_job_id(&id)?;
    state
        .jobs
        .cancel(id)
        .await
        .map(Json)
        .ok_or_else(|| ApiError::not_found(format!("Migration '{id}'")))
}

fn parse_job_id(raw: &str) -> ApiResult<Uuid> {
    Uuid::parse_str(raw).map_err(|_| ApiError::not_found(format!("Migration '{raw}'")))
}
