use axum::extract::{Path, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use coversync_api::{Action, CommandResponse, GroupInfo, PositionRequest};

use crate::errors::ApiError;
use crate::handles::ControlState;
use crate::services::Target;
use crate::services::live_updates::all_group_infos;

pub fn group_router(state: ControlState) -> Router {
    Router::new()
        .route("/api/groups", get(get_groups))
        .route("/api/groups/:group_id/position", post(set_group_position))
        .route("/api/groups/:group_id/tilt", post(tilt_group))
        .route("/api/groups/:group_id/slat", post(set_group_slat))
        .with_state(state)
}

#[utoipa::path(
    get,
    path = "/api/groups",
    tag = "group",
    responses(
        (status = 200, description = "Every group with at least one actor", body = [GroupInfo])
    )
)]
pub async fn get_groups(State(state): State<ControlState>) -> Json<Vec<GroupInfo>> {
    Json(all_group_infos(&state.registry).await)
}

#[utoipa::path(
    post,
    path = "/api/groups/{group_id}/position",
    tag = "group",
    params(
        ("group_id" = String, Path, description = "Group ID")
    ),
    request_body = PositionRequest,
    responses(
        (status = 200, description = "Command dispatched to the group", body = CommandResponse),
        (status = 400, description = "Position outside of 0..=100"),
        (status = 404, description = "No actors in this group")
    )
)]
pub async fn set_group_position(
    State(state): State<ControlState>,
    Path(group_id): Path<String>,
    Json(body): Json<PositionRequest>,
) -> Result<Json<CommandResponse>, ApiError> {
    command_group(&state, group_id, Action::Set, body.position).await
}

#[utoipa::path(
    post,
    path = "/api/groups/{group_id}/tilt",
    tag = "group",
    params(
        ("group_id" = String, Path, description = "Group ID")
    ),
    request_body = PositionRequest,
    responses(
        (status = 200, description = "Command dispatched to the group", body = CommandResponse),
        (status = 400, description = "Position outside of 0..=100"),
        (status = 404, description = "No actors in this group")
    )
)]
pub async fn tilt_group(
    State(state): State<ControlState>,
    Path(group_id): Path<String>,
    Json(body): Json<PositionRequest>,
) -> Result<Json<CommandResponse>, ApiError> {
    command_group(&state, group_id, Action::Tilt, body.position).await
}

#[utoipa::path(
    post,
    path = "/api/groups/{group_id}/slat",
    tag = "group",
    params(
        ("group_id" = String, Path, description = "Group ID")
    ),
    request_body = PositionRequest,
    responses(
        (status = 200, description = "Command dispatched to the group", body = CommandResponse),
        (status = 400, description = "Position outside of 0..=100"),
        (status = 404, description = "No actors in this group")
    )
)]
pub async fn set_group_slat(
    State(state): State<ControlState>,
    Path(group_id): Path<String>,
    Json(body): Json<PositionRequest>,
) -> Result<Json<CommandResponse>, ApiError> {
    command_group(&state, group_id, Action::Slat, body.position).await
}

async fn command_group(
    state: &ControlState,
    group_id: String,
    action: Action,
    position: i32,
) -> Result<Json<CommandResponse>, ApiError> {
    let count = state
        .send(&Target::Group(group_id.clone()), action, position)
        .await?;

    tracing::info!(group = %group_id, "Applied {} {} to {} actors", action, position, count);

    Ok(Json(CommandResponse::success().with_count(count).with_group(group_id)))
}
