use serde::{Deserialize, Serialize};

/// Status pushed by the cover on `<topic_base>/status/cover:0`.
///
/// Only the position fields are read, everything else the device reports is ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoverStatus {
    pub current_pos: i32,
    /// Roller shutters do not report a slat angle
    #[serde(default)]
    pub slat_pos: i32,
}

impl CoverStatus {
    pub fn parse(payload: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(payload)
    }
}
