/*!
 * # Health Check Module
 *
 * Endpoints for monitoring the marketplace API:
 *
 * - Liveness (`/health`) - process is up, no dependencies touched
 * - Readiness (`/health/ready`) - database answers a ping
 * - Version (`/health/version`) - build information
 */

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::get,
    Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::HashMap;
use std::time::{Duration, SystemTime};
use tracing::{debug, error};
use utoipa::ToSchema;

use crate::AppState;

/// Basic health status
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Up,
    Down,
    Degraded,
}

/// Health check detail
#[derive(Serialize, Deserialize, Debug, Clone, ToSchema)]
pub struct HealthDetail {
    pub status: HealthStatus,
    pub message: Option<String>,
    pub timestamp: DateTime<Utc>,
}

/// Overall health information
#[derive(Serialize, Deserialize, Debug, Clone, ToSchema)]
pub struct HealthInfo {
    pub status: HealthStatus,
    pub version: String,
    pub timestamp: DateTime<Utc>,
    pub uptime_seconds: u64,
    pub details: HashMap<String, HealthDetail>,
}

impl HealthInfo {
    fn from_details(started_at: SystemTime, details: HashMap<String, HealthDetail>) -> Self {
        let status = overall_status(details.values().map(|detail| &detail.status));
        Self {
            status,
            version: env!("CARGO_PKG_VERSION").to_string(),
            timestamp: Utc::now(),
            uptime_seconds: uptime(started_at),
            details,
        }
    }
}

fn uptime(started_at: SystemTime) -> u64 {
    SystemTime::now()
        .duration_since(started_at)
        .unwrap_or(Duration::from_secs(0))
        .as_secs()
}

/// Any component down makes the whole service down; otherwise degraded wins over up.
pub fn overall_status<'a>(statuses: impl IntoIterator<Item = &'a HealthStatus>) -> HealthStatus {
    let mut overall = HealthStatus::Up;
    for status in statuses {
        match status {
            HealthStatus::Down => return HealthStatus::Down,
            HealthStatus::Degraded => overall = HealthStatus::Degraded,
            HealthStatus::Up => {}
        }
    }
    overall
}

fn status_code(status: &HealthStatus) -> StatusCode {
    match status {
        HealthStatus::Up | HealthStatus::Degraded => StatusCode::OK,
        HealthStatus::Down => StatusCode::SERVICE_UNAVAILABLE,
    }
}

/// Returns build and version information
pub async fn version_info() -> impl IntoResponse {
    Json(json!({
        "version": env!("CARGO_PKG_VERSION"),
        "commit": option_env!("GIT_HASH").unwrap_or("unknown"),
        "built": option_env!("BUILD_TIME").unwrap_or("unknown"),
    }))
}

/// Liveness check
pub async fn liveness_check(State(state): State<AppState>) -> impl IntoResponse {
    debug!("Liveness check endpoint called");

    (
        StatusCode::OK,
        Json(json!({
            "status": HealthStatus::Up,
            "version": env!("CARGO_PKG_VERSION"),
            "uptime_seconds": uptime(state.started_at),
            "timestamp": Utc::now(),
        })),
    )
}

/// Readiness check with database verification
pub async fn readiness_check(State(state): State<AppState>) -> impl IntoResponse {
    debug!("Readiness check endpoint called");

    let database = match state.db.ping().await {
        Ok(()) => HealthDetail {
            status: HealthStatus::Up,
            message: None,
            timestamp: Utc::now(),
        },
        Err(e) => {
            error!("Database health check failed: {}", e);
            HealthDetail {
                status: HealthStatus::Down,
                message: Some("database unreachable".to_string()),
                timestamp: Utc::now(),
            }
        }
    };

    let mut details = HashMap::new();
    details.insert("database".to_string(), database);

    let health = HealthInfo::from_details(state.started_at, details);
    (status_code(&health.status), Json(health))
}

/// Creates router with health check endpoints
pub fn health_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(liveness_check))
        .route("/ready", get(readiness_check))
        .route("/version", get(version_info))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn down_component_wins() {
        let statuses = [HealthStatus::Up, HealthStatus::Degraded, HealthStatus::Down];
        assert_eq!(overall_status(&statuses), HealthStatus::Down);
    }

    #[test]
    fn degraded_without_down_is_degraded() {
        let statuses = [HealthStatus::Up, HealthStatus::Degraded];
        assert_eq!(overall_status(&statuses), HealthStatus::Degraded);
        assert_eq!(overall_status(&[]), HealthStatus::Up);
    }

    #[test]
    fn degraded_still_serves_traffic() {
        assert_eq!(status_code(&HealthStatus::Degraded), StatusCode::OK);
        assert_eq!(
            status_code(&HealthStatus::Down),
            StatusCode::SERVICE_UNAVAILABLE
        );
    }
}
