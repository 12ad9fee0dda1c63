use super::{ActorError, DispatchError};

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Actor error: {0}")]
    ActorError(#[from] ActorError),

    #[error("Dispatch error: {0}")]
    DispatchError(#[from] DispatchError),

    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}
