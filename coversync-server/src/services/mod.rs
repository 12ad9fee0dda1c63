pub mod actor;
pub mod dispatcher;
pub mod event_bus;
pub mod live_updates;
pub mod registry;
pub mod retry;
pub mod transport;

pub use actor::{ActorOptions, CoverActor, CoverState, TiltOutcome, WaitOutcome};
pub use dispatcher::{CommandDispatcher, CommandOutcome, CommandTask, Target};
pub use event_bus::EventBus;
pub use live_updates::LiveUpdates;
pub use registry::{normalize_name, ActorRegistry};
pub use transport::{MqttTransport, Transport, TransportMessage};
#[cfg(any(test, feature = "mock"))]
pub use transport::{MockTransport, PublishedMessage};
