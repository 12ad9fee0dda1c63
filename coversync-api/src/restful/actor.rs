use serde::{Deserialize, Serialize};

use crate::models::DeviceType;

#[cfg_attr(feature = "docs", derive(utoipa::ToSchema))]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActorStatus {
    pub name: String,
    pub display_name: String,
    /// Topic base of the device, kept under its historical name
    pub ip: String,
    pub serial: String,
    pub position: u8,
    pub tilted: bool,
    pub tilt_position: u8,
    pub device_type: DeviceType,
    pub rank: i32,
    /// First resolved group, empty when the actor belongs to none
    pub group_id: String,
    pub group_ids: Vec<String>,
}
