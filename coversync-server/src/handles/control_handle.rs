use std::sync::Arc;

use coversync_api::{Action, Command};

use crate::errors::ApiError;
use crate::services::{ActorRegistry, CommandDispatcher, LiveUpdates, Target};

#[derive(Clone)]
pub struct ControlState {
    pub registry: Arc<ActorRegistry>,
    pub dispatcher: Arc<CommandDispatcher>,
    pub live_updates: Arc<LiveUpdates>,
}

impl ControlState {
    /// Dispatches without waiting and schedules a state broadcast.
    ///
    /// Returns the number of actors the command went to.
    pub(crate) async fn send(
        &self,
        target: &Target,
        action: Action,
        position: i32,
    ) -> Result<usize, ApiError> {
        let tasks = self
            .dispatcher
            .dispatch(target, Command::new(action, position))
            .await?;

        self.live_updates.schedule_broadcast();

        Ok(tasks.len())
    }
}
