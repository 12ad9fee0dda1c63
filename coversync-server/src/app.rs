use std::sync::Arc;

use axum::routing::get;
use axum::{Json, Router};
use coversync_api::{
    ActorStatus, CommandResponse, DeviceType, GroupInfo, HealthResponse, PositionRequest,
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;

use crate::handles::*;
use crate::services::{ActorRegistry, CommandDispatcher, EventBus, LiveUpdates};

#[derive(OpenApi)]
#[openapi(
    paths(
        get_actors,
        get_actor,
        set_actor_position,
        tilt_actor,
        set_actor_slat,
        get_groups,
        set_group_position,
        tilt_group,
        set_group_slat,
        health_check,
        sse_handler,
    ),
    components(schemas(
        ActorStatus,
        CommandResponse,
        DeviceType,
        GroupInfo,
        HealthResponse,
        PositionRequest
    )),
    tags(
        (name = "actor", description = "Single covers, or every cover through `all`"),
        (name = "group", description = "Covers sharing a group ID"),
        (name = "event", description = "Live state updates"),
        (name = "health", description = "Service status"),
    )
)]
pub struct ApiDoc;

/// Shared services behind the HTTP layer.
#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<ActorRegistry>,
    pub dispatcher: Arc<CommandDispatcher>,
    pub live_updates: Arc<LiveUpdates>,
    pub events: Arc<EventBus>,
}

impl AppState {
    pub fn new(registry: Arc<ActorRegistry>, events: Arc<EventBus>) -> Self {
        Self {
            dispatcher: Arc::new(CommandDispatcher::new(registry.clone())),
            live_updates: Arc::new(LiveUpdates::new(registry.clone())),
            registry,
            events,
        }
    }
}

pub fn create_app(state: &AppState) -> Router {
    let control = ControlState {
        registry: state.registry.clone(),
        dispatcher: state.dispatcher.clone(),
        live_updates: state.live_updates.clone(),
    };

    let health = HealthState {
        registry: state.registry.clone(),
        live_updates: state.live_updates.clone(),
        events: state.events.clone(),
    };

    let sse = Router::new()
        .route("/api/events", get(sse_handler))
        .route("/events", get(sse_handler))
        .with_state(SseState {
            live_updates: state.live_updates.clone(),
        });

    Router::new()
        .merge(health_router(health))
        .merge(actor_router(control.clone()))
        .merge(group_router(control))
        .merge(sse)
        .route("/api/openapi.json", get(openapi))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

async fn openapi() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}
