pub mod actor;
pub mod api;
pub mod dispatch;
pub mod transport;

pub use actor::ActorError;
pub use api::ApiError;
pub use dispatch::DispatchError;
pub use transport::TransportError;

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use uuid::Uuid;

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_message, error_id) = match self {
            ApiError::ActorError(e) => match e {
                ActorError::InvalidPosition(_) => (StatusCode::BAD_REQUEST, e.to_string(), None),
                e => internal_error(&e),
            },
            ApiError::DispatchError(e) => (e.status_code(), e.to_string(), None),
            ApiError::InternalError(e) => internal_error(&e),
        };

        let mut error_obj = json!({
            "code": status.as_u16(),
            "message": error_message
        });

        if let Some(error_id) = error_id {
            error_obj["error_id"] = json!(error_id);
        }

        let body = Json(json!({
            "error": error_obj
        }));

        (status, body).into_response()
    }
}

fn internal_error(e: &dyn std::fmt::Display) -> (StatusCode, String, Option<String>) {
    let error_id = Uuid::new_v4();
    tracing::error!(error_id = ?error_id, "Internal error: {}", e);

    (
        StatusCode::INTERNAL_SERVER_ERROR,
        "Internal server error".to_string(),
        Some(error_id.to_string()),
    )
}
