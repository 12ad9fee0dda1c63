use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use coversync_api::{ActorStatus, GroupInfo, PositionChangeEvent};
use tokio::sync::{broadcast, mpsc, watch};
use tokio::task::JoinHandle;

use crate::services::actor::CoverActor;
use crate::services::registry::ActorRegistry;

pub const LIVE_UPDATE_CAPACITY: usize = 16;

/// Delay before the state is pushed after a command, giving covers time to report.
pub const REFRESH_DELAY: Duration = Duration::from_millis(500);

/// Presentation view of one actor.
///
/// The position comes from the lock when it can be had, otherwise from the last snapshot.
pub async fn actor_status(actor: &CoverActor) -> ActorStatus {
    let snapshot = actor.snapshot();
    let position = match actor.position().await {
        Ok(position) => position,
        Err(e) => {
            tracing::error!(actor = %actor.name(), "Failed to get position: {}", e);
            snapshot.position
        }
    };
    let group_ids = actor.groups();

    ActorStatus {
        name: actor.name().to_string(),
        display_name: actor.display_name().to_string(),
        ip: actor.topic_base().to_string(),
        serial: actor.serial().to_string(),
        position,
        tilted: snapshot.tilted,
        tilt_position: snapshot.tilt_position,
        device_type: actor.device_type(),
        rank: actor.rank(),
        group_id: group_ids.first().cloned().unwrap_or_default(),
        group_ids,
    }
}

pub async fn all_actor_states(registry: &ActorRegistry) -> Vec<ActorStatus> {
    let mut states = Vec::new();
    for actor in registry.get_all_actors().await {
        states.push(actor_status(&actor).await);
    }
    states
}

pub async fn all_group_infos(registry: &ActorRegistry) -> Vec<GroupInfo> {
    let mut groups = Vec::new();

    for (group_id, actors) in registry.get_all_groups().await {
        let mut states = Vec::with_capacity(actors.len());
        for actor in &actors {
            states.push(actor_status(actor).await);
        }

        groups.push(GroupInfo {
            name: group_id.clone(),
            group_id,
            actor_count: states.len(),
            actors: states,
        });
    }

    groups
}

/// Pushes the full actor state to every live client.
pub struct LiveUpdates {
    registry: Arc<ActorRegistry>,
    sender: broadcast::Sender<String>,
    shutdown: watch::Sender<bool>,
}

impl LiveUpdates {
    pub fn new(registry: Arc<ActorRegistry>) -> Self {
        let (sender, _) = broadcast::channel(LIVE_UPDATE_CAPACITY);
        let (shutdown, _) = watch::channel(false);

        Self {
            registry,
            sender,
            shutdown,
        }
    }

    /// Ends every live stream, current and future.
    pub fn shutdown(&self) {
        self.shutdown.send_replace(true);
    }

    /// Resolves once [`shutdown`](Self::shutdown) was called.
    pub fn closed(&self) -> impl Future<Output = ()> + Send + 'static + use<> {
        let mut shutdown = self.shutdown.subscribe();

        async move {
            if shutdown.wait_for(|closed| *closed).await.is_err() {
                tracing::debug!("Live updates dropped");
            }
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<String> {
        self.sender.subscribe()
    }

    pub fn client_count(&self) -> usize {
        self.sender.receiver_count()
    }

    /// Serialized state of every actor.
    pub async fn current_state(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(&all_actor_states(&self.registry).await)
    }

    pub async fn broadcast_state(&self) {
        let client_count = self.client_count();
        if client_count == 0 {
            return;
        }

        match self.current_state().await {
            Ok(message) => {
                if self.sender.send(message).is_ok() {
                    tracing::debug!("Broadcasted state change to {} clients", client_count);
                }
            }
            Err(e) => tracing::error!("Failed to serialize actor state: {}", e),
        }
    }

    /// Broadcasts the state once [`REFRESH_DELAY`] has passed.
    pub fn schedule_broadcast(self: &Arc<Self>) {
        let updates = Arc::clone(self);

        tokio::spawn(async move {
            tokio::time::sleep(REFRESH_DELAY).await;
            updates.broadcast_state().await;
        });
    }

    /// Drains the position change queue, broadcasting the state for every event.
    pub fn forward(
        self: Arc<Self>,
        mut events: mpsc::Receiver<PositionChangeEvent>,
    ) -> JoinHandle<()> {
        tokio::spawn(async move {
            while let Some(event) = events.recv().await {
                tracing::debug!(
                    actor = %event.actor_name,
                    position = event.position,
                    slat_position = event.slat_position,
                    "Position change received"
                );
                self.broadcast_state().await;
            }

            tracing::debug!("Position change queue closed");
        })
    }
}
