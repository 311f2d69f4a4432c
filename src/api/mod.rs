//! HTTP API
//!
//! JSON endpoints for comments and votes, likes, saved cards, the content
//! catalog, and admin media management. Handlers validate their parameters,
//! touch the datastore and answer with JSON; failures go through [`ApiError`].

mod admin;
mod comments;
mod content;
mod error;

pub use admin::MigrationRequest;
pub use error::{ApiError, ApiResult};

use std::net::SocketAddr;
use std::sync::Arc;

use axum::http::HeaderValue;
use axum::routing::{get, post};
use axum::{Json, Router};
use tokio::net::TcpListener;
use tower_http::cors::{AllowMethods, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::core::media::{MigrationJobs, MigrationOptions};
use crate::database::{ContentItemRecord, ContentOps, Database, EpisodeRecord};

/// Shared handler state
#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub jobs: Arc<MigrationJobs>,
    /// Applied to migration requests for every field they leave out
    pub migration_defaults: MigrationOptions,
}

pub fn router(state: AppState, cors_origins: &[String]) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/api/content", get(content::list_content))
        .route("/api/content/:slug/episodes", get(content::list_episodes))
        .route("/api/content/like", post(content::toggle_like))
        .route("/api/content/like-count", get(content::like_count))
        .route("/api/content/like-status", get(content::like_status))
        .route("/api/content/saved-cards-count", get(content::saved_cards_count))
        .route("/api/content/card-state", post(content::set_card_state))
        .route("/api/content/card-states", get(content::list_card_states))
        .route("/api/episodes/cards", get(content::list_cards))
        .route(
            "/api/episodes/comments",
            get(comments::list_comments).post(comments::create_comment),
        )
        .route("/api/episodes/comments/vote", post(comments::cast_vote))
        .route("/api/episodes/comments/votes", get(comments::vote_status))
        .route("/api/admin/media/usage", get(admin::media_usage))
        .route(
            "/api/admin/media/migrations",
            get(admin::list_migrations).post(admin::start_migration),
        )
        .route("/api/admin/media/migrations/:id", get(admin::migration_status))
        .route("/api/admin/media/migrations/:id/cancel", post(admin::cancel_migration))
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer(cors_origins))
        .with_state(state)
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let list: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|s| HeaderValue::from_str(s.trim()).ok())
        .collect();

    if list.is_empty() {
        CorsLayer::new().allow_origin(Any).allow_methods(AllowMethods::any()).allow_headers(Any)
    } else {
        CorsLayer::new().allow_origin(list).allow_methods(AllowMethods::any()).allow_headers(Any)
    }
}

/// Bind `addr` and serve until Ctrl-C or SIGTERM
pub async fn serve(state: AppState, addr: SocketAddr, cors_origins: &[String]) -> std::io::Result<()> {
    let app = router(state, cors_origins);
    let listener = TcpListener::bind(addr).await?;
    info!(%addr, "HTTP server listening");

    axum::serve(listener, app).with_graceful_shutdown(shutdown_signal()).await?;

    info!("HTTP server stopped");
    Ok(())
}

pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
        info!("Received Ctrl+C, shutting down");
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
                info!("Received terminate signal, shutting down");
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install signal handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

async fn health_check() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "name": crate::NAME,
        "version": crate::VERSION,
    }))
}

// ============================================================================
// Lookup helpers
// ============================================================================

async fn resolve_content(db: &Database, slug: &str) -> ApiResult<ContentItemRecord> {
    db.get_content_item_by_slug(slug)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("Content '{slug}'")))
}

async fn resolve_episode(db: &Database, film_slug: &str, episode_slug: &str) -> ApiResult<EpisodeRecord> {
    let item = resolve_content(db, film_slug).await?;
    db.get_episode_by_slug(&item.id, episode_slug)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("Episode '{episode_slug}'")))
}
