use serde::{Deserialize, Serialize};

/// Emitted whenever a cover reports a new status.
#[cfg_attr(feature = "docs", derive(utoipa::ToSchema))]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PositionChangeEvent {
    pub actor_name: String,
    pub position: u8,
    pub slat_position: u8,
}
