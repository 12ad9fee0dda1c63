use axum::extract::{Path, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use coversync_api::{Action, ActorStatus, CommandResponse, PositionRequest};

use crate::errors::{ApiError, DispatchError};
use crate::handles::ControlState;
use crate::services::Target;
use crate::services::live_updates::{actor_status, all_actor_states};

const ALL_ACTORS: &str = "all";

pub fn actor_router(state: ControlState) -> Router {
    Router::new()
        .route("/api/actors", get(get_actors))
        .route("/api/actors/:name", get(get_actor))
        .route("/api/actors/:name/position", post(set_actor_position))
        .route("/api/actors/:name/tilt", post(tilt_actor))
        .route("/api/actors/:name/slat", post(set_actor_slat))
        .with_state(state)
}

#[utoipa::path(
    get,
    path = "/api/actors",
    tag = "actor",
    responses(
        (status = 200, description = "All actors ordered by rank", body = [ActorStatus])
    )
)]
pub async fn get_actors(State(state): State<ControlState>) -> Json<Vec<ActorStatus>> {
    Json(all_actor_states(&state.registry).await)
}

#[utoipa::path(
    get,
    path = "/api/actors/{name}",
    tag = "actor",
    params(
        ("name" = String, Path, description = "Actor name, case insensitive")
    ),
    responses(
        (status = 200, description = "Actor found", body = ActorStatus),
        (status = 404, description = "Actor not found")
    )
)]
pub async fn get_actor(
    State(state): State<ControlState>,
    Path(name): Path<String>,
) -> Result<Json<ActorStatus>, ApiError> {
    let actor = state
        .registry
        .get_actor(&name)
        .await
        .ok_or_else(|| DispatchError::ActorNotFound(name.clone()))?;

    Ok(Json(actor_status(&actor).await))
}

#[utoipa::path(
    post,
    path = "/api/actors/{name}/position",
    tag = "actor",
    params(
        ("name" = String, Path, description = "Actor name, or `all` for every actor")
    ),
    request_body = PositionRequest,
    responses(
        (status = 200, description = "Command dispatched", body = CommandResponse),
        (status = 400, description = "Position outside of 0..=100"),
        (status = 404, description = "Actor not found")
    )
)]
pub async fn set_actor_position(
    State(state): State<ControlState>,
    Path(name): Path<String>,
    Json(body): Json<PositionRequest>,
) -> Result<Json<CommandResponse>, ApiError> {
    command_actor(&state, name, Action::Set, body.position).await
}

#[utoipa::path(
    post,
    path = "/api/actors/{name}/tilt",
    tag = "actor",
    params(
        ("name" = String, Path, description = "Actor name, or `all` for every actor")
    ),
    request_body = PositionRequest,
    responses(
        (status = 200, description = "Command dispatched", body = CommandResponse),
        (status = 400, description = "Position outside of 0..=100"),
        (status = 404, description = "Actor not found")
    )
)]
pub async fn tilt_actor(
    State(state): State<ControlState>,
    Path(name): Path<String>,
    Json(body): Json<PositionRequest>,
) -> Result<Json<CommandResponse>, ApiError> {
    command_actor(&state, name, Action::Tilt, body.position).await
}

#[utoipa::path(
    post,
    path = "/api/actors/{name}/slat",
    tag = "actor",
    params(
        ("name" = String, Path, description = "Actor name, or `all` for every actor")
    ),
    request_body = PositionRequest,
    responses(
        (status = 200, description = "Command dispatched", body = CommandResponse),
        (status = 400, description = "Position outside of 0..=100"),
        (status = 404, description = "Actor not found")
    )
)]
pub async fn set_actor_slat(
    State(state): State<ControlState>,
    Path(name): Path<String>,
    Json(body): Json<PositionRequest>,
) -> Result<Json<CommandResponse>, ApiError> {
    command_actor(&state, name, Action::Slat, body.position).await
}

async fn command_actor(
    state: &ControlState,
    name: String,
    action: Action,
    position: i32,
) -> Result<Json<CommandResponse>, ApiError> {
    if name.eq_ignore_ascii_case(ALL_ACTORS) {
        let count = state.send(&Target::All, action, position).await?;
        tracing::info!("Applied {} {} to {} actors", action, position, count);

        return Ok(Json(CommandResponse::success().with_count(count)));
    }

    state.send(&Target::Actor(name.clone()), action, position).await?;
    tracing::info!(actor = %name, "Applied {} {}", action, position);

    Ok(Json(CommandResponse::success()))
}
