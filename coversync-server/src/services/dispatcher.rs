use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use coversync_api::Command;
use futures::FutureExt;
use tokio::task::JoinHandle;

use crate::errors::{ActorError, DispatchError, TransportError};
use crate::services::actor::CoverActor;
use crate::services::registry::ActorRegistry;
use crate::services::transport::Transport;

const ALL_ACTORS: &str = "all";
const GROUP_PREFIX: &str = "group:";
const COMMAND_SUFFIX: &str = "set";

/// Who a command is addressed to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    Actor(String),
    Group(String),
    All,
}

impl Target {
    /// Resolves `<prefix>/<actor>/set`, `<prefix>/group:<id>/set` and `<prefix>/all/set`.
    pub fn from_topic(prefix: &str, topic: &str) -> Result<Self, DispatchError> {
        let invalid = || DispatchError::InvalidTopic(topic.to_string());

        let name = topic
            .strip_prefix(prefix)
            .and_then(|rest| rest.strip_prefix('/'))
            .and_then(|rest| rest.strip_suffix(COMMAND_SUFFIX))
            .and_then(|rest| rest.strip_suffix('/'))
            .filter(|name| !name.is_empty() && !name.contains('/'))
            .ok_or_else(invalid)?;

        match Self::from_name(name) {
            Target::Group(id) if id.is_empty() => Err(invalid()),
            target => Ok(target),
        }
    }

    /// Interprets a path segment: `all`, `group:<id>` or an actor name.
    pub fn from_name(name: &str) -> Self {
        if name.eq_ignore_ascii_case(ALL_ACTORS) {
            Target::All
        } else if let Some(group_id) = name.strip_prefix(GROUP_PREFIX) {
            Target::Group(group_id.to_string())
        } else {
            Target::Actor(name.to_string())
        }
    }
}

#[derive(Debug)]
pub enum CommandOutcome {
    Completed,
    Failed(ActorError),
    Panicked(String),
}

impl CommandOutcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, CommandOutcome::Completed)
    }
}

/// Handle on one supervised command application.
pub type CommandTask = JoinHandle<CommandOutcome>;

/// Fans commands out to actors, one independent task per actor.
pub struct CommandDispatcher {
    registry: Arc<ActorRegistry>,
}

impl CommandDispatcher {
    pub fn new(registry: Arc<ActorRegistry>) -> Self {
        Self { registry }
    }

    pub async fn resolve(&self, target: &Target) -> Result<Vec<Arc<CoverActor>>, DispatchError> {
        match target {
            Target::Actor(name) => self
                .registry
                .get_actor(name)
                .await
                .map(|actor| vec![actor])
                .ok_or_else(|| DispatchError::ActorNotFound(name.clone())),
            Target::Group(group_id) => {
                let actors = self.registry.get_actors_by_group(group_id).await;
                if actors.is_empty() {
                    Err(DispatchError::GroupNotFound(group_id.clone()))
                } else {
                    Ok(actors)
                }
            }
            Target::All => Ok(self.registry.get_all_actors().await),
        }
    }

    /// Starts `command` on every actor of `target` and returns without waiting.
    ///
    /// The target is resolved before the command is validated.
    /// The returned handles may be dropped, the tasks keep running.
    pub async fn dispatch(
        &self,
        target: &Target,
        command: Command,
    ) -> Result<Vec<CommandTask>, DispatchError> {
        let actors = self.resolve(target).await?;
        command.validate()?;

        tracing::info!(
            destination = ?target,
            actor_count = actors.len(),
            action = %command.action,
            position = command.position,
            "Dispatching command"
        );

        Ok(actors
            .into_iter()
            .map(|actor| {
                let name = actor.name().to_string();
                supervise(name, async move { actor.apply(command).await })
            })
            .collect())
    }

    /// Handles a raw command message from the transport.
    pub async fn dispatch_message(
        &self,
        prefix: &str,
        topic: &str,
        payload: &[u8],
    ) -> Result<Vec<CommandTask>, DispatchError> {
        let target = Target::from_topic(prefix, topic)?;
        let command = Command::parse(payload)?;

        self.dispatch(&target, command).await
    }

    /// Subscribes to `<prefix>/+/set` and dispatches every command received there.
    pub async fn listen(
        self: Arc<Self>,
        transport: Arc<dyn Transport>,
        prefix: String,
    ) -> Result<JoinHandle<()>, TransportError> {
        let filter = format!("{prefix}/+/{COMMAND_SUFFIX}");
        let mut commands = transport.subscribe(&filter).await?;

        tracing::info!("Subscribed to commands on {}", filter);

        Ok(tokio::spawn(async move {
            while let Some(message) = commands.recv().await {
                tracing::debug!(
                    "Received command on {}: {}",
                    message.topic,
                    String::from_utf8_lossy(&message.payload)
                );

                let dispatched = self
                    .dispatch_message(&prefix, &message.topic, &message.payload)
                    .await;
                if let Err(e) = dispatched {
                    tracing::error!(topic = %message.topic, "Failed to dispatch command: {}", e);
                }
            }

            tracing::debug!("Command subscription closed");
        }))
    }
}

/// Runs one command application in its own task, turning errors and panics into an outcome.
pub fn supervise<F>(actor_name: String, work: F) -> CommandTask
where
    F: Future<Output = Result<(), ActorError>> + Send + 'static,
{
    tokio::spawn(async move {
        match AssertUnwindSafe(work).catch_unwind().await {
            Ok(Ok(())) => CommandOutcome::Completed,
            Ok(Err(e)) => CommandOutcome::Failed(e),
            Err(panic) => {
                let message = panic_message(panic.as_ref());
                tracing::error!(actor = %actor_name, "Panic in command processing: {}", message);
                CommandOutcome::Panicked(message)
            }
        }
    })
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use coversync_api::{CommandError, DeviceType};

    use crate::models::Device;
    use crate::services::actor::ActorOptions;
    use crate::services::event_bus::EventBus;
    use crate::services::transport::MockTransport;

    use super::*;

    async fn setup() -> (Arc<CommandDispatcher>, Arc<MockTransport>) {
        let transport = Arc::new(MockTransport::new());
        let events = Arc::new(EventBus::new());
        let registry = Arc::new(ActorRegistry::new());

        let devices = [
            ("Kitchen", vec!["west"]),
            ("Office", vec!["west", "east"]),
            ("Garage", vec![]),
        ];

        for (name, groups) in devices {
            let topic_base = format!("shellies/{}", name.to_lowercase());
            let mut device = Device::new(name, topic_base, DeviceType::Blinds);
            device.group_ids = groups.into_iter().map(String::from).collect();
            registry
                .add_actor(Arc::new(CoverActor::new(
                    device,
                    ActorOptions::default(),
                    transport.clone(),
                    events.clone(),
                )))
                .await;
        }

        (Arc::new(CommandDispatcher::new(registry)), transport)
    }

    async fn join_all(tasks: Vec<CommandTask>) -> Vec<CommandOutcome> {
        let mut outcomes = Vec::new();
        for task in tasks {
            outcomes.push(task.await.unwrap());
        }
        outcomes
    }

    #[test]
    fn test_target_from_topic() {
        assert_eq!(
            Target::from_topic("home/covers", "home/covers/Kitchen/set").unwrap(),
            Target::Actor("Kitchen".to_string())
        );
        assert_eq!(
            Target::from_topic("home/covers", "home/covers/group:west/set").unwrap(),
            Target::Group("west".to_string())
        );
        assert_eq!(Target::from_topic("home/covers", "home/covers/all/set").unwrap(), Target::All);

        for topic in [
            "home/covers/set",
            "home/covers//set",
            "home/covers/group:/set",
            "home/covers/kitchen/get",
            "other/kitchen/set",
        ] {
            assert!(matches!(
                Target::from_topic("home/covers", topic),
                Err(DispatchError::InvalidTopic(_))
            ));
        }
    }

    #[tokio::test]
    async fn test_dispatch_to_group() {
        let (dispatcher, transport) = setup().await;

        let tasks = dispatcher
            .dispatch(&Target::Group("west".to_string()), Command::set(30))
            .await
            .unwrap();
        assert_eq!(tasks.len(), 2);
        assert!(join_all(tasks).await.iter().all(CommandOutcome::is_completed));

        assert_eq!(transport.payloads("shellies/kitchen/command/cover:0").await, vec!["pos,30"]);
        assert_eq!(transport.payloads("shellies/office/command/cover:0").await, vec!["pos,30"]);
        assert!(transport.payloads("shellies/garage/command/cover:0").await.is_empty());
    }

    #[tokio::test]
    async fn test_dispatch_to_all() {
        let (dispatcher, transport) = setup().await;

        let tasks = dispatcher.dispatch(&Target::All, Command::set(100)).await.unwrap();
        join_all(tasks).await;

        assert_eq!(transport.published().await.len(), 3);
    }

    #[tokio::test]
    async fn test_unknown_targets_are_not_found() {
        let (dispatcher, transport) = setup().await;

        assert!(matches!(
            dispatcher.dispatch(&Target::Actor("attic".to_string()), Command::set(1)).await,
            Err(DispatchError::ActorNotFound(_))
        ));
        assert!(matches!(
            dispatcher.dispatch(&Target::Group("north".to_string()), Command::set(1)).await,
            Err(DispatchError::GroupNotFound(_))
        ));
        assert!(transport.published().await.is_empty());
    }

    #[tokio::test]
    async fn test_invalid_position_is_rejected_before_publishing() {
        let (dispatcher, transport) = setup().await;

        assert!(matches!(
            dispatcher.dispatch(&Target::All, Command::tilt(101)).await,
            Err(DispatchError::InvalidCommand(_))
        ));
        assert!(matches!(
            dispatcher.dispatch(&Target::Actor("attic".to_string()), Command::set(-1)).await,
            Err(DispatchError::ActorNotFound(_))
        ));
        assert!(transport.published().await.is_empty());
    }

    #[tokio::test]
    async fn test_bad_payloads_are_invalid_commands() {
        let (dispatcher, transport) = setup().await;
        let topic = "home/covers/kitchen/set";

        assert!(matches!(
            dispatcher.dispatch_message("home/covers", topic, b"garbage").await,
            Err(DispatchError::InvalidCommand(CommandError::Malformed(_)))
        ));
        assert!(matches!(
            dispatcher
                .dispatch_message("home/covers", topic, br#"{"action":"set","position":101}"#)
                .await,
            Err(DispatchError::InvalidCommand(CommandError::InvalidPosition(101)))
        ));
        assert!(transport.published().await.is_empty());
    }

    #[tokio::test]
    async fn test_failures_are_reported_per_task() {
        let (dispatcher, transport) = setup().await;
        transport.set_reject_publishes(true);

        let tasks = dispatcher.dispatch(&Target::All, Command::slat(20)).await.unwrap();
        let outcomes = join_all(tasks).await;

        assert_eq!(outcomes.len(), 3);
        assert!(outcomes
            .iter()
            .all(|outcome| matches!(outcome, CommandOutcome::Failed(ActorError::Transport(_)))));
    }

    #[tokio::test]
    async fn test_panics_are_contained() {
        let panicking = supervise("Kitchen".to_string(), async {
            let reading: Option<u8> = None;
            reading.expect("motor exploded");
            Ok(())
        });
        let sibling = supervise("Office".to_string(), async { Ok(()) });

        match panicking.await.unwrap() {
            CommandOutcome::Panicked(message) => assert_eq!(message, "motor exploded"),
            outcome => panic!("unexpected outcome {outcome:?}"),
        }
        assert!(sibling.await.unwrap().is_completed());
    }

    #[tokio::test]
    async fn test_listen_dispatches_transport_commands() {
        let (dispatcher, transport) = setup().await;
        dispatcher
            .clone()
            .listen(transport.clone(), "home/covers".to_string())
            .await
            .unwrap();

        transport
            .inject("home/covers/office/set", r#"{"action":"slat","position":0}"#)
            .await;
        transport.inject("home/covers/office/set", "garbage").await;

        let topic = "shellies/office/command/cover:0";
        for _ in 0..100 {
            if !transport.payloads(topic).await.is_empty() {
                break;
            }
            tokio::task::yield_now().await;
        }

        assert_eq!(transport.payloads(topic).await, vec!["slat_pos,0"]);
    }
}
