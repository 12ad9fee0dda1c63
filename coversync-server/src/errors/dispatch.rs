use axum::http::StatusCode;
use coversync_api::CommandError;

#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("Actor '{0}' not found")]
    ActorNotFound(String),

    #[error("No actors found for group '{0}'")]
    GroupNotFound(String),

    #[error("Topic '{0}' is not a command topic")]
    InvalidTopic(String),

    #[error("Invalid command: {0}")]
    InvalidCommand(#[from] CommandError),
}

impl DispatchError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            DispatchError::ActorNotFound(_) => StatusCode::NOT_FOUND,
            DispatchError::GroupNotFound(_) => StatusCode::NOT_FOUND,
            DispatchError::InvalidTopic(_) => StatusCode::BAD_REQUEST,
            DispatchError::InvalidCommand(_) => StatusCode::BAD_REQUEST,
        }
    }
}
