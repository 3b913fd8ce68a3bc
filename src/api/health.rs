//! Health probes.
//!
//! `/health` reports every dependency and never fails; `/health/ready` is the
//! orchestrator probe and answers 503 while the database is unreachable.

use axum::{
    Json,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use std::sync::Arc;

use super::{ApiResponse, AppState};
use crate::cache::CacheStats;

#[derive(Debug, Serialize)]
pub struct DatabaseHealth {
    pub status: &'static str,
}

#[derive(Debug, Serialize)]
pub struct RateLimitHealth {
    pub enabled: bool,
    pub requests_per_window: u32,
    pub window_seconds: u64,
    pub tracked_clients: usize,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub environment: String,
    pub timestamp: String,
    pub uptime_seconds: u64,
    pub database: DatabaseHealth,
    pub cache: CacheStats,
    pub rate_limiting: RateLimitHealth,
}

#[derive(Debug, Serialize)]
pub struct HealthReadyResponse {
    pub ready: bool,
    pub database: bool,
    pub timestamp: String,
}

#[derive(Debug, Serialize)]
pub struct HealthLiveResponse {
    pub status: &'static str,
    pub timestamp: String,
}

fn now() -> String {
    chrono::Utc::now().to_rfc3339()
}

async fn database_ok(state: &AppState) -> bool {
    match state.store().ping().await {
        Ok(()) => true,
        Err(e) => {
            tracing::error!(error = %e, "Database health check failed");
            false
        }
    }
}

/// `GET /health`
pub async fn health(State(state): State<Arc<AppState>>) -> Json<ApiResponse<HealthResponse>> {
    let db_ok = database_ok(&state).await;
    let limiter = state.rate_limiter();

    Json(ApiResponse::success(HealthResponse {
        status: if db_ok { "healthy" } else { "degraded" },
        version: env!("CARGO_PKG_VERSION"),
        environment: state.config().general.environment.clone(),
        timestamp: now(),
        uptime_seconds: state.start_time.elapsed().as_secs(),
        database: DatabaseHealth {
            status: if db_ok { "healthy" } else { "unhealthy" },
        },
        cache: state.cache().stats().await,
        rate_limiting: RateLimitHealth {
            enabled: limiter.is_enabled(),
            requests_per_window: limiter.limit(),
            window_seconds: limiter.window().as_secs(),
            tracked_clients: limiter.tracked_clients(),
        },
    }))
}

/// `GET /health/ready`
pub async fn health_ready(State(state): State<Arc<AppState>>) -> Response {
    let ready = database_ok(&state).await;
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (
        status,
        Json(ApiResponse::success(HealthReadyResponse {
            ready,
            database: ready,
            timestamp: now(),
        })),
    )
        .into_response()
}

/// `GET /health/live`
pub async fn health_live() -> impl IntoResponse {
    Json(ApiResponse::success(HealthLiveResponse {
        status: "alive",
        timestamp: now(),
    }))
}
