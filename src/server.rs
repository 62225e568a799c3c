//! HTTP API and background sync timer
//!
//! Thin axum adapters over the sync engine and vector index. Every handler
//! returns JSON; uncaught errors become a 500 with the error's string form.

use crate::config::Config;
use crate::error::{Error, Result};
use crate::store::VectorIndex;
use crate::sync::SyncEngine;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{delete, get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::{signal, sync::watch};
use tracing::{error, info};

/// Shared state for all handlers
pub struct AppState {
    pub engine: SyncEngine,
    pub index: Arc<VectorIndex>,
    pub config: Config,
}

/// Wraps crate errors so handlers can use `?`
struct HttpError(Error);

impl IntoResponse for HttpError {
    fn into_response(self) -> Response {
        error!("{}", self.0);
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": self.0.to_string() })),
        )
            .into_response()
    }
}

impl<E> From<E> for HttpError
where
    E: Into<Error>,
{
    fn from(err: E) -> Self {
        Self(err.into())
    }
}

/// Build the API router
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/search", get(search))
        .route("/sync", post(sync_all))
        .route("/sync/incremental", post(sync_incremental))
        .route("/sync/bookmark/:id", post(sync_bookmark))
        .route("/bookmark/:id", delete(delete_bookmark))
        .route("/clear", post(clear))
        .route("/stats", get(stats))
        .layer(
            tower_http::trace::TraceLayer::new_for_http()
                .make_span_with(
                    tower_http::trace::DefaultMakeSpan::new().level(tracing::Level::INFO),
                )
                .on_response(
                    tower_http::trace::DefaultOnResponse::new().level(tracing::Level::INFO),
                ),
        )
        .with_state(state)
}

/// Run the server and the periodic incremental-sync task until shutdown
pub async fn serve(state: Arc<AppState>) -> Result<()> {
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let sync_task = tokio::spawn(background_sync(state.clone(), shutdown_rx));

    let app = router(state.clone());
    let addr = format!("0.0.0.0:{}", state.config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            shutdown_signal().await;
            info!("Shutting down");
            let _ = shutdown_tx.send(true);
        })
        .await?;

    let _ = sync_task.await;
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

/// Initial full sync, then an incremental sync every configured interval.
/// Failed passes are logged and the timer keeps running.
async fn background_sync(state: Arc<AppState>, mut shutdown: watch::Receiver<bool>) {
    let interval_minutes = state.config.sync.interval_minutes;
    info!("Starting background sync every {} minutes", interval_minutes);

    if let Err(e) = state.engine.sync_all().await {
        error!("Initial sync failed: {}", e);
    }

    let period = Duration::from_secs(interval_minutes * 60);
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    // The first tick fires immediately; the initial full sync covered it
    ticker.tick().await;

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                if let Err(e) = state.engine.sync_incremental().await {
                    error!("Background sync failed: {}", e);
                }
            }
            _ = shutdown.changed() => {
                info!("Background sync stopped");
                return;
            }
        }
    }
}

async fn health(State(state): State<Arc<AppState>>) -> Response {
    match state.index.count().await {
        Ok(count) => Json(json!({
            "status": "ok",
            "vector_count": count,
            "bookmarks_url": state.config.bookmarks.url,
        }))
        .into_response(),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "status": "error", "error": e.to_string() })),
        )
            .into_response(),
    }
}

#[derive(Debug, Deserialize)]
struct SearchParams {
    q: Option<String>,
    limit: Option<usize>,
}

async fn search(
    State(state): State<Arc<AppState>>,
    Query(params): Query<SearchParams>,
) -> std::result::Result<Response, HttpError> {
    let Some(query) = params.q.filter(|q| !q.is_empty()) else {
        return Ok((
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "Query parameter 'q' is required" })),
        )
            .into_response());
    };
    let limit = params.limit.unwrap_or(10);

    let start = Instant::now();
    let results = state.index.search(&query, limit).await?;

    Ok(Json(json!({
        "results": results,
        "query": query,
        "limit": limit,
        "took_ms": start.elapsed().as_millis() as u64,
    }))
    .into_response())
}

async fn sync_all(
    State(state): State<Arc<AppState>>,
) -> std::result::Result<Response, HttpError> {
    let result = state.engine.sync_all().await?;
    Ok(Json(result).into_response())
}

async fn sync_incremental(
    State(state): State<Arc<AppState>>,
) -> std::result::Result<Response, HttpError> {
    let result = state.engine.sync_incremental().await?;
    Ok(Json(result).into_response())
}

async fn sync_bookmark(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> std::result::Result<Response, HttpError> {
    state.engine.sync_one(&id).await?;
    Ok(Json(json!({ "success": true, "bookmark_id": id })).into_response())
}

async fn delete_bookmark(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> std::result::Result<Response, HttpError> {
    state.engine.delete_one(&id).await?;
    Ok(Json(json!({ "success": true, "bookmark_id": id })).into_response())
}

async fn clear(State(state): State<Arc<AppState>>) -> std::result::Result<Response, HttpError> {
    state.index.clear().await?;
    Ok(Json(json!({ "success": true })).into_response())
}

async fn stats(State(state): State<Arc<AppState>>) -> std::result::Result<Response, HttpError> {
    let count = state.index.count().await?;
    Ok(Json(json!({
        "vector_count": count,
        "sync_interval_minutes": state.config.sync.interval_minutes,
    }))
    .into_response())
}
