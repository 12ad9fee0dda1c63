use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use coversync_api::{
    Action, Command, CoverStatus, DeviceType, PositionChangeEvent, is_valid_position,
};
use tokio::sync::{Mutex, watch};
use tokio::task::JoinHandle;
use tokio::time::Instant;

use crate::errors::ActorError;
use crate::models::Device;
use crate::services::event_bus::EventBus;
use crate::services::retry;
use crate::services::transport::Transport;

/// Interval between position checks while waiting for a cover to arrive.
pub const POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Minimum pause the motor needs between a move and a slat adjustment.
pub const SETTLE_DELAY: Duration = Duration::from_millis(500);

/// Upper bound for the move that precedes a tilt.
pub const TILT_WAIT_TIMEOUT: Duration = Duration::from_secs(60);

const POSITION_READ_ATTEMPTS: usize = 3;
const POSITION_READ_BACKOFF: Duration = Duration::from_millis(10);

/// Last confirmed state of a cover.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CoverState {
    pub position: u8,
    pub tilt_position: u8,
    pub tilted: bool,
}

#[derive(Debug, Clone, Copy)]
pub struct ActorOptions {
    /// Skip tilt sequences when the cover is already tilted at the requested position
    pub optimize_tilt: bool,
}

impl Default for ActorOptions {
    fn default() -> Self {
        Self { optimize_tilt: true }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitOutcome {
    Reached,
    TimedOut,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TiltOutcome {
    /// Already tilted at the requested position
    Skipped,
    Completed,
}

/// Handle on a background position wait. Dropping it leaves the wait running detached.
pub struct PositionWait {
    handle: JoinHandle<WaitOutcome>,
}

impl PositionWait {
    pub async fn join(self) -> WaitOutcome {
        match self.handle.await {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::error!("Position wait aborted: {}", e);
                WaitOutcome::Failed
            }
        }
    }
}

/// Owns the state of one cover and turns intents into device commands.
pub struct CoverActor {
    device: Device,
    options: ActorOptions,
    transport: Arc<dyn Transport>,
    events: Arc<EventBus>,
    state: Mutex<CoverState>,
    snapshot: watch::Sender<CoverState>,
}

impl CoverActor {
    pub fn new(
        device: Device,
        options: ActorOptions,
        transport: Arc<dyn Transport>,
        events: Arc<EventBus>,
    ) -> Self {
        let (snapshot, _) = watch::channel(CoverState::default());

        Self {
            device,
            options,
            transport,
            events,
            state: Mutex::new(CoverState::default()),
            snapshot,
        }
    }

    pub fn name(&self) -> &str {
        &self.device.name
    }

    pub fn display_name(&self) -> &str {
        &self.device.name
    }

    pub fn topic_base(&self) -> &str {
        &self.device.topic_base
    }

    pub fn serial(&self) -> &str {
        &self.device.serial
    }

    pub fn rank(&self) -> i32 {
        self.device.rank
    }

    pub fn device_type(&self) -> DeviceType {
        self.device.device_type
    }

    pub fn device(&self) -> &Device {
        &self.device
    }

    pub fn groups(&self) -> Vec<String> {
        self.device.group_ids()
    }

    pub fn is_roller_shutter(&self) -> bool {
        self.device.device_type == DeviceType::RollerShutter
    }

    pub fn is_blinds(&self) -> bool {
        self.device.device_type == DeviceType::Blinds
    }

    /// Last published state, read without taking the actor lock. Display only.
    pub fn snapshot(&self) -> CoverState {
        *self.snapshot.borrow()
    }

    /// State read under the actor lock.
    pub async fn state(&self) -> CoverState {
        *self.state.lock().await
    }

    fn command_topic(&self) -> String {
        format!("{}/command/cover:0", self.device.topic_base)
    }

    fn status_topic(&self) -> String {
        format!("{}/status/cover:0", self.device.topic_base)
    }

    /// Subscribes to the status topic and asks the cover for an initial status push.
    pub async fn start(self: &Arc<Self>) -> Result<JoinHandle<()>, ActorError> {
        let mut statuses = self.transport.subscribe(&self.status_topic()).await?;

        let actor = Arc::clone(self);
        let handle = tokio::spawn(async move {
            while let Some(message) = statuses.recv().await {
                tracing::debug!(
                    actor = %actor.name(),
                    "Received status on {}: {}",
                    message.topic,
                    String::from_utf8_lossy(&message.payload)
                );
                actor.handle_status(&message.payload).await;
            }

            tracing::debug!(actor = %actor.name(), "Status subscription closed");
        });

        self.transport
            .publish(&self.command_topic(), "status_update", false)
            .await?;

        tracing::info!(actor = %self.name(), topic_base = %self.topic_base(), "Actor started");

        Ok(handle)
    }

    /// Applies a status pushed by the cover. Returns whether the state was updated.
    pub async fn handle_status(&self, payload: &[u8]) -> bool {
        let status = match CoverStatus::parse(payload) {
            Ok(status) => status,
            Err(e) => {
                tracing::error!(actor = %self.name(), "Failed to parse status: {}", e);
                return false;
            }
        };

        let (Ok(position), Ok(slat_position)) = (
            checked_position(status.current_pos),
            checked_position(status.slat_pos),
        ) else {
            tracing::warn!(
                actor = %self.name(),
                current_pos = status.current_pos,
                slat_pos = status.slat_pos,
                "Ignoring status with out of range position"
            );
            return false;
        };

        let previous = self
            .update_state(|state| {
                state.position = position;
                state.tilt_position = slat_position;
                state.tilted = slat_position != 0;
            })
            .await;

        tracing::debug!(
            actor = %self.name(),
            "Position updated from {} to {}, tilt from {} to {}",
            previous.position,
            position,
            previous.tilt_position,
            slat_position
        );

        let event = PositionChangeEvent {
            actor_name: self.device.name.clone(),
            position,
            slat_position,
        };

        if self.events.publish(event) {
            tracing::debug!(actor = %self.name(), position, "Position change event sent");
        }

        true
    }

    /// Mutates the state under the lock and republishes the snapshot, returns the previous state.
    async fn update_state<F>(&self, mutate: F) -> CoverState
    where
        F: FnOnce(&mut CoverState),
    {
        let mut state = self.state.lock().await;
        let previous = *state;

        mutate(&mut state);
        self.snapshot.send_replace(*state);

        previous
    }

    pub async fn position(&self) -> Result<u8, ActorError> {
        retry::times(POSITION_READ_ATTEMPTS, POSITION_READ_BACKOFF, move || async move {
            self.read_position()
        })
        .await
    }

    fn read_position(&self) -> Result<u8, ActorError> {
        self.state
            .try_lock()
            .map(|state| state.position)
            .map_err(|_| ActorError::StateBusy)
    }

    /// Publishes the move command. Delivery is not awaited.
    pub async fn set_position(&self, position: i32) -> Result<(), ActorError> {
        let payload = match checked_position(position)? {
            0 => "close".to_string(),
            100 => "open".to_string(),
            position => format!("pos,{position}"),
        };

        self.transport
            .publish(&self.command_topic(), &payload, false)
            .await?;

        Ok(())
    }

    pub async fn set_slat_position(&self, position: i32) -> Result<(), ActorError> {
        let position = checked_position(position)?;

        self.transport
            .publish(&self.command_topic(), &format!("slat_pos,{position}"), false)
            .await?;

        Ok(())
    }

    /// Starts a background wait for `target`, re-checking on every state change and
    /// at least every [`POLL_INTERVAL`] until the position is reached or `timeout` elapses.
    pub fn wait_for_position(
        self: &Arc<Self>,
        target: i32,
        timeout: Duration,
    ) -> Result<PositionWait, ActorError> {
        let target = checked_position(target)?;
        let changes = self.snapshot.subscribe();
        let actor = Arc::clone(self);

        let handle =
            tokio::spawn(async move { actor.poll_position(target, timeout, changes).await });

        Ok(PositionWait { handle })
    }

    async fn poll_position(
        &self,
        target: u8,
        timeout: Duration,
        mut changes: watch::Receiver<CoverState>,
    ) -> WaitOutcome {
        let started = Instant::now();

        loop {
            let current = match self.position().await {
                Ok(current) => current,
                Err(e) => {
                    tracing::error!(actor = %self.name(), "Failed to get position: {}", e);
                    return WaitOutcome::Failed;
                }
            };

            if current == target {
                tracing::debug!(actor = %self.name(), "Position {} reached", target);
                return WaitOutcome::Reached;
            }

            tracing::debug!(
                actor = %self.name(),
                "Waiting for position {} (current: {})",
                target,
                current
            );

            if started.elapsed() > timeout {
                tracing::error!(actor = %self.name(), "Timeout waiting for position {}", target);
                return WaitOutcome::TimedOut;
            }

            tokio::select! {
                _ = tokio::time::sleep(POLL_INTERVAL) => {}
                changed = changes.changed() => {
                    if changed.is_err() {
                        tokio::time::sleep(POLL_INTERVAL).await;
                    }
                }
            }
        }
    }

    pub async fn set_and_wait_for_position(
        self: &Arc<Self>,
        target: i32,
        timeout: Duration,
    ) -> Result<PositionWait, ActorError> {
        checked_position(target)?;
        self.set_position(target).await?;
        self.wait_for_position(target, timeout)
    }

    /// Entry point for commands. Errors are logged here and returned for the supervisor.
    pub async fn apply(self: &Arc<Self>, command: Command) -> Result<(), ActorError> {
        tracing::info!(
            actor = %self.name(),
            action = %command.action,
            position = command.position,
            device_type = %self.device_type(),
            "Applying command"
        );

        let result = match command.action {
            Action::Set => self.set_position(command.position).await.map(|_| {
                tracing::info!(
                    actor = %self.name(),
                    position = command.position,
                    "Set position command completed"
                );
            }),
            Action::Tilt if self.is_roller_shutter() => {
                tracing::info!(actor = %self.name(), "Ignoring tilt command for roller shutter");
                Ok(())
            }
            Action::Tilt => self.tilt(command.position).await.map(|_| ()),
            Action::Slat if self.is_roller_shutter() => {
                tracing::info!(actor = %self.name(), "Ignoring slat command for roller shutter");
                Ok(())
            }
            Action::Slat => self.slat_only(command.position).await,
        };

        if let Err(e) = &result {
            tracing::error!(
                actor = %self.name(),
                action = %command.action,
                "Command failed: {}",
                e
            );
        }

        tracing::debug!(
            actor = %self.name(),
            action = %command.action,
            "Command application finished"
        );

        result
    }

    /// Moves to `position`, waits for it, then angles the slats to the configured percentage.
    ///
    /// Unlike [`wait_for_position`](Self::wait_for_position) callers, the sequence joins the
    /// wait: the slats may only move once the cover has settled. A timed out wait is logged
    /// and the sequence carries on. A failed publish stops it without touching the state.
    pub async fn tilt(self: &Arc<Self>, position: i32) -> Result<TiltOutcome, ActorError> {
        tracing::info!(actor = %self.name(), position, "Tilt command started");

        let target = checked_position(position)?;

        if self.options.optimize_tilt {
            let state = self.state.lock().await;
            if state.tilted && state.tilt_position == target {
                tracing::info!(
                    actor = %self.name(),
                    tilt_position = state.tilt_position,
                    "Ignoring tilt command, already tilted correctly"
                );
                return Ok(TiltOutcome::Skipped);
            }
        }

        let wait = self.set_and_wait_for_position(position, TILT_WAIT_TIMEOUT).await?;

        match wait.join().await {
            WaitOutcome::Reached => {
                tracing::debug!(actor = %self.name(), "Position reached, setting slat position")
            }
            outcome => tracing::warn!(
                actor = %self.name(),
                ?outcome,
                "Position not confirmed, setting slat position anyway"
            ),
        }

        tokio::time::sleep(SETTLE_DELAY).await;

        let tilt_percentage = self.device.blinds_config.tilt_percentage;
        self.set_slat_position(tilt_percentage).await?;

        self.update_state(|state| {
            state.tilted = true;
            state.tilt_position = target;
        })
        .await;

        tracing::info!(actor = %self.name(), position, tilt_percentage, "Tilt command completed");

        Ok(TiltOutcome::Completed)
    }

    /// Sets the slat angle alone, re-zeroing first for any non-zero angle.
    pub async fn slat_only(&self, position: i32) -> Result<(), ActorError> {
        tracing::info!(actor = %self.name(), slat_position = position, "Slat-only command started");

        let slat_position = checked_position(position)?;

        if slat_position != 0 {
            self.set_slat_position(0).await?;
        }
        self.set_slat_position(position).await?;

        // The tilted flag only follows confirmed status.
        self.update_state(|state| state.tilt_position = slat_position).await;

        tracing::info!(actor = %self.name(), slat_position, "Slat-only command completed");

        Ok(())
    }
}

impl fmt::Display for CoverActor {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "CoverActor{{name: {}; topic_base: {}; type: {}}}",
            self.device.name, self.device.topic_base, self.device.device_type
        )
    }
}

fn checked_position(position: i32) -> Result<u8, ActorError> {
    if is_valid_position(position) {
        u8::try_from(position).map_err(|_| ActorError::InvalidPosition(position))
    } else {
        Err(ActorError::InvalidPosition(position))
    }
}
