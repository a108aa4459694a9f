//! Stats dashboard — read-only JSON endpoints over the bot counters.

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use serde::Deserialize;
use tower_http::cors::CorsLayer;

use crate::stats::{Stats, StatsSnapshot};

#[derive(Clone)]
struct DashboardState {
    stats: Arc<Stats>,
    access_key: Option<String>,
}

#[derive(Deserialize)]
struct StatsQuery {
    key: Option<String>,
}

/// Build the dashboard router.
pub fn router(stats: Arc<Stats>, access_key: Option<String>) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/api/stats", get(stats_handler))
        .layer(CorsLayer::permissive())
        .with_state(DashboardState { stats, access_key })
}

/// Spawn the dashboard server on the given port.
pub fn spawn(stats: Arc<Stats>, port: u16, access_key: Option<String>) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let app = router(stats, access_key);
        let listener = match tokio::net::TcpListener::bind(format!("0.0.0.0:{port}")).await {
            Ok(l) => l,
            Err(e) => {
                tracing::error!(port, error = %e, "Failed to bind dashboard port");
                return;
            }
        };
        tracing::info!(port, "Stats dashboard started");
        axum::serve(listener, app).await.ok();
    })
}

async fn root() -> &'static str {
    "partybot is running"
}

async fn stats_handler(
    State(state): State<DashboardState>,
    Query(query): Query<StatsQuery>,
) -> Result<Json<StatsSnapshot>, StatusCode> {
    if !authorized(state.access_key.as_deref(), query.key.as_deref()) {
        return Err(StatusCode::UNAUTHORIZED);
    }
    Ok(Json(state.stats.snapshot().await))
}

fn authorized(required: Option<&str>, provided: Option<&str>) -> bool {
    match required {
        None => true,
        Some(required) => provided == Some(required),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn open_when_no_key_configured() {
        assert!(authorized(None, None));
        assert!(authorized(None, Some("anything")));
    }

    #[test]
    fn key_must_match_exactly() {
        assert!(authorized(Some("s3cret"), Some("s3cret")));
        assert!(!authorized(Some("s3cret"), Some("S3CRET")));
        assert!(!authorized(Some("s3cret"), Some("")));
        assert!(!authorized(Some("s3cret"), None));
    }

    #[test]
    fn router_builds() {
        let _ = router(Arc::new(Stats::new()), Some("k".into()));
    }
}
