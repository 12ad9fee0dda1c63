mod mqtt;
#[cfg(any(test, feature = "mock"))]
mod mock;

pub use mqtt::MqttTransport;
#[cfg(any(test, feature = "mock"))]
pub use mock::{MockTransport, PublishedMessage};

use async_trait::async_trait;
use tokio::sync::{RwLock, mpsc};

use crate::errors::TransportError;

const SUBSCRIPTION_CAPACITY: usize = 64;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportMessage {
    pub topic: String,
    pub payload: Vec<u8>,
}

/// Publish/subscribe transport the covers are reached through.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Delivers every message whose topic matches `filter` to the returned receiver.
    async fn subscribe(
        &self,
        filter: &str,
    ) -> Result<mpsc::Receiver<TransportMessage>, TransportError>;

    async fn publish(&self, topic: &str, payload: &str, retain: bool)
    -> Result<(), TransportError>;
}

struct Subscription {
    filter: String,
    sender: mpsc::Sender<TransportMessage>,
}

/// Filter table shared by the transport implementations.
#[derive(Default)]
pub(crate) struct Subscriptions {
    entries: RwLock<Vec<Subscription>>,
}

impl Subscriptions {
    pub(crate) async fn add(&self, filter: &str) -> mpsc::Receiver<TransportMessage> {
        let (sender, receiver) = mpsc::channel(SUBSCRIPTION_CAPACITY);

        self.entries.write().await.push(Subscription {
            filter: filter.to_string(),
            sender,
        });

        receiver
    }

    pub(crate) async fn filters(&self) -> Vec<String> {
        let entries = self.entries.read().await;
        let mut filters: Vec<String> = Vec::with_capacity(entries.len());

        for entry in entries.iter() {
            if !filters.contains(&entry.filter) {
                filters.push(entry.filter.clone());
            }
        }

        filters
    }

    /// Forwards `message` to every live subscription whose filter matches its topic.
    pub(crate) async fn route(&self, message: TransportMessage) -> usize {
        let senders: Vec<mpsc::Sender<TransportMessage>> = {
            let entries = self.entries.read().await;
            entries
                .iter()
                .filter(|entry| rumqttc::matches(&message.topic, &entry.filter))
                .map(|entry| entry.sender.clone())
                .collect()
        };

        let mut delivered = 0;
        for sender in senders {
            if sender.send(message.clone()).await.is_ok() {
                delivered += 1;
            } else {
                tracing::debug!("Subscriber for {} is gone", message.topic);
            }
        }

        delivered
    }
}
