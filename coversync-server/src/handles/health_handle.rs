use std::sync::Arc;

use anyhow::anyhow;
use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use coversync_api::HealthResponse;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

use crate::errors::ApiError;
use crate::services::{ActorRegistry, EventBus, LiveUpdates};

#[derive(Clone)]
pub struct HealthState {
    pub registry: Arc<ActorRegistry>,
    pub live_updates: Arc<LiveUpdates>,
    pub events: Arc<EventBus>,
}

pub fn health_router(state: HealthState) -> Router {
    Router::new()
        .route("/api/health", get(health_check))
        .with_state(state)
}

#[utoipa::path(
    get,
    path = "/api/health",
    tag = "health",
    responses(
        (status = 200, description = "Service is up", body = HealthResponse),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn health_check(
    State(state): State<HealthState>,
) -> Result<Json<HealthResponse>, ApiError> {
    let timestamp = OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .map_err(|e| anyhow!("Failed to format timestamp: {}", e))?;

    Ok(Json(HealthResponse {
        status: "ok".to_string(),
        actors: state.registry.len().await,
        sse_clients: state.live_updates.client_count(),
        dropped_events: state.events.dropped(),
        timestamp,
    }))
}
