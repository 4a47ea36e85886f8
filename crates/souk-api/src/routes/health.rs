//! Health check endpoint for load balancers and container probes.

use std::sync::{Arc, LazyLock};
use std::time::Instant;

use axum::{extract::State, routing::get, Json, Router};
use serde::Serialize;

use crate::AppState;

static STARTED: LazyLock<Instant> = LazyLock::new(Instant::now);

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
    database: bool,
    uptime_secs: u64,
}

pub fn router() -> Router<Arc<AppState>> {
    LazyLock::force(&STARTED);
    Router::new().route("/health", get(health_check))
}

/// GET /api/v0/health
async fn health_check(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let database = state.db.health_check().await;
    Json(HealthResponse {
        status: if database { "healthy" } else { "degraded" },
        version: env!("CARGO_PKG_VERSION"),
        database,
        uptime_secs: STARTED.elapsed().as_secs(),
    })
}
