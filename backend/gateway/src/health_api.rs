//! Gateway Health API

use axum::{Json, extract::State};
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::server::GatewayState;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthReport {
    pub status: String,
    pub environment: String,
    pub model: String,
    pub api_key_configured: bool,
    pub uptime_seconds: u64,
    pub timestamp: DateTime<Utc>,
    pub version: String,
}

/// Handler for `GET /api/health`
pub async fn get_health(State(state): State<GatewayState>) -> Json<HealthReport> {
    let info = &state.info;
    Json(HealthReport {
        status: "ok".into(),
        environment: info.environment.clone(),
        model: info.model.clone(),
        api_key_configured: info.api_key_configured,
        uptime_seconds: info.started_at.elapsed().as_secs(),
        timestamp: Utc::now(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}
