use std::env;

use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};

use crate::models::Device;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Server {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Logger {
    pub level: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Gateway {
    pub host: String,
    pub port: u16,
    pub client_id: String,
    /// Prefix of the command topics, `<topic>/<actor>/set`
    pub topic: String,
    #[serde(default = "default_keep_alive")]
    pub keep_alive_secs: u64,
    pub credentials: Option<Credentials>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Shelly {
    /// Skip tilt sequences for covers already tilted at the requested position
    #[serde(default = "default_true")]
    pub optimize_tilt: bool,
    #[serde(default)]
    pub devices: Vec<Device>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Web {
    #[serde(default = "default_true")]
    pub enabled: bool,
}

impl Default for Web {
    fn default() -> Self {
        Self { enabled: true }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    pub server: Server,
    pub logger: Logger,
    pub gateway: Gateway,
    pub shelly: Shelly,
    #[serde(default)]
    pub web: Web,
}

fn default_true() -> bool {
    true
}

fn default_keep_alive() -> u64 {
    5
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        Self::with_default_file(None)
    }

    /// Loads the layered settings, replacing `configs/default` with `path` when given.
    pub fn with_default_file(path: Option<&str>) -> Result<Self, ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or("development".into());

        let settings: Settings = Config::builder()
            .add_source(File::with_name(path.unwrap_or("configs/default")))
            .add_source(File::with_name(&format!("configs/{run_mode}")).required(false))
            .add_source(Environment::default().separator("__"))
            .build()?
            .try_deserialize()?;

        settings.validate()?;

        Ok(settings)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        for device in &self.shelly.devices {
            if device.name.trim().is_empty() {
                return Err(ConfigError::Message(format!(
                    "Device with topic base '{}' has no name",
                    device.topic_base
                )));
            }

            let tilt = device.blinds_config.tilt_percentage;
            if !coversync_api::is_valid_position(tilt) {
                return Err(ConfigError::Message(format!(
                    "Device '{}' has tilt percentage {} outside of 0..=100",
                    device.name, tilt
                )));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use config::FileFormat;

    use super::*;

    const SAMPLE: &str = r#"
        [server]
        host = "0.0.0.0"
        port = 3000

        [logger]
        level = "debug"

        [gateway]
        host = "localhost"
        port = 1883
        client_id = "coversync"
        topic = "home/covers"

        [shelly]
        optimize_tilt = false

        [[shelly.devices]]
        name = "Kitchen"
        topic_base = "shellies/kitchen"
        device_type = "blinds"
        rank = 1
        group_id = "west"
        group_ids = ["west", "patio"]
        blinds_config = { tilt_percentage = 35 }

        [[shelly.devices]]
        name = "Garage"
        topic_base = "shellies/garage"
        device_type = "roller_shutter"
    "#;

    fn parse(source: &str) -> Result<Settings, ConfigError> {
        let settings: Settings = Config::builder()
            .add_source(File::from_str(source, FileFormat::Toml))
            .build()?
            .try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    #[test]
    fn test_parse_settings() {
        let settings = parse(SAMPLE).unwrap();

        assert!(!settings.shelly.optimize_tilt);
        assert!(settings.web.enabled);
        assert_eq!(settings.gateway.keep_alive_secs, 5);
        assert_eq!(settings.shelly.devices.len(), 2);

        let kitchen = &settings.shelly.devices[0];
        assert_eq!(kitchen.blinds_config.tilt_percentage, 35);
        assert_eq!(kitchen.group_ids(), vec!["west".to_string(), "patio".to_string()]);

        let garage = &settings.shelly.devices[1];
        assert!(garage.group_ids().is_empty());
        assert_eq!(garage.rank, 0);
    }

    #[test]
    fn test_reject_invalid_tilt_percentage() {
        let source = SAMPLE.replace("tilt_percentage = 35", "tilt_percentage = 135");
        assert!(parse(&source).is_err());
    }
}
