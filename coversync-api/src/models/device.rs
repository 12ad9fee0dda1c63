use std::fmt;

use serde::{Deserialize, Serialize};

#[cfg_attr(feature = "docs", derive(utoipa::ToSchema))]
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceType {
    /// Venetian blinds with adjustable slats
    #[default]
    Blinds,
    /// Shutter without slats, tilt and slat commands do not apply
    RollerShutter,
}

impl fmt::Display for DeviceType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            DeviceType::Blinds => write!(f, "blinds"),
            DeviceType::RollerShutter => write!(f, "roller_shutter"),
        }
    }
}
