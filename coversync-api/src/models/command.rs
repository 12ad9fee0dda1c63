use std::fmt;

use serde::{Deserialize, Serialize};

use super::is_valid_position;

#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    #[error("Malformed command payload: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("Position {0} is outside of 0..=100")]
    InvalidPosition(i32),
}

#[cfg_attr(feature = "docs", derive(utoipa::ToSchema))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    /// Move to an absolute position
    Set,
    /// Move to an absolute position, then angle the slats
    Tilt,
    /// Change the slat angle only
    Slat,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Action::Set => write!(f, "set"),
            Action::Tilt => write!(f, "tilt"),
            Action::Slat => write!(f, "slat"),
        }
    }
}

/// A high level intent for a single cover.
#[cfg_attr(feature = "docs", derive(utoipa::ToSchema))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Command {
    pub action: Action,
    /// Percentage in 0..=100
    pub position: i32,
}

impl Command {
    pub fn new(action: Action, position: i32) -> Self {
        Self { action, position }
    }

    pub fn set(position: i32) -> Self {
        Self::new(Action::Set, position)
    }

    pub fn tilt(position: i32) -> Self {
        Self::new(Action::Tilt, position)
    }

    pub fn slat(position: i32) -> Self {
        Self::new(Action::Slat, position)
    }

    /// Decodes a JSON command payload such as `{"action":"tilt","position":40}`.
    pub fn parse(payload: &[u8]) -> Result<Self, CommandError> {
        let command: Command = serde_json::from_slice(payload)?;
        command.validate()?;

        Ok(command)
    }

    pub fn validate(&self) -> Result<(), CommandError> {
        if is_valid_position(self.position) {
            Ok(())
        } else {
            Err(CommandError::InvalidPosition(self.position))
        }
    }
}
