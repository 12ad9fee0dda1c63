use super::TransportError;

#[derive(Debug, thiserror::Error)]
pub enum ActorError {
    #[error("Invalid position {0}, expected a value in 0..=100")]
    InvalidPosition(i32),

    #[error("Actor state is busy")]
    StateBusy,

    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),
}
