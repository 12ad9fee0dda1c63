use std::fmt;

use coversync_api::DeviceType;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BlindsConfig {
    /// Slat angle applied at the end of a tilt sequence
    #[serde(default)]
    pub tilt_percentage: i32,
}

/// A configured cover, immutable once loaded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Device {
    pub name: String,
    pub topic_base: String,
    #[serde(default)]
    pub device_type: DeviceType,
    #[serde(default)]
    pub serial: String,
    #[serde(default)]
    pub rank: i32,
    /// Legacy single group field
    #[serde(default)]
    pub group_id: Option<String>,
    #[serde(default)]
    pub group_ids: Vec<String>,
    #[serde(default)]
    pub blinds_config: BlindsConfig,
}

impl Device {
    pub fn new(
        name: impl Into<String>,
        topic_base: impl Into<String>,
        device_type: DeviceType,
    ) -> Self {
        Self {
            name: name.into(),
            topic_base: topic_base.into(),
            device_type,
            serial: String::new(),
            rank: 0,
            group_id: None,
            group_ids: Vec::new(),
            blinds_config: BlindsConfig::default(),
        }
    }

    /// Legacy group followed by the group list, without blanks or duplicates.
    pub fn group_ids(&self) -> Vec<String> {
        let mut groups: Vec<String> = Vec::new();

        for group in self.group_id.iter().chain(self.group_ids.iter()) {
            let group = group.trim();
            if !group.is_empty() && !groups.iter().any(|g| g == group) {
                groups.push(group.to_string());
            }
        }

        groups
    }

    pub fn in_group(&self, group_id: &str) -> bool {
        self.group_ids().iter().any(|g| g == group_id)
    }
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Device{{name: {}; base: {}}}", self.name, self.topic_base)
    }
}
