use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use serde_json::json;
use tokio::sync::{Mutex, mpsc};

use crate::errors::TransportError;

use super::{Subscriptions, Transport, TransportMessage};

const COMMAND_SUFFIX: &str = "/command/cover:0";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishedMessage {
    pub topic: String,
    pub payload: String,
    pub retain: bool,
}

#[derive(Debug, Clone, Copy, Default)]
struct SimulatedCover {
    position: i32,
    slat_position: i32,
}

/// In-memory transport recording every publish.
///
/// With device simulation enabled every cover command is answered by a status push
/// on `<topic_base>/status/cover:0`, the way a cover reports after moving.
#[derive(Default)]
pub struct MockTransport {
    subscriptions: Subscriptions,
    published: Mutex<Vec<PublishedMessage>>,
    covers: Mutex<HashMap<String, SimulatedCover>>,
    simulate_devices: AtomicBool,
    reject_publishes: AtomicBool,
    publish_budget: Mutex<Option<usize>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn simulating_devices() -> Self {
        let transport = Self::default();
        transport.set_simulate_devices(true);
        transport
    }

    pub fn set_simulate_devices(&self, enabled: bool) {
        self.simulate_devices.store(enabled, Ordering::SeqCst);
    }

    pub fn set_reject_publishes(&self, enabled: bool) {
        self.reject_publishes.store(enabled, Ordering::SeqCst);
    }

    /// Lets `successful` more publishes through, then rejects every one after.
    pub async fn reject_after(&self, successful: usize) {
        *self.publish_budget.lock().await = Some(successful);
    }

    pub async fn published(&self) -> Vec<PublishedMessage> {
        self.published.lock().await.clone()
    }

    /// Payloads published to `topic`, in order.
    pub async fn payloads(&self, topic: &str) -> Vec<String> {
        self.published
            .lock()
            .await
            .iter()
            .filter(|message| message.topic == topic)
            .map(|message| message.payload.clone())
            .collect()
    }

    pub async fn clear(&self) {
        self.published.lock().await.clear();
    }

    /// Delivers an inbound message as if it came from the broker.
    pub async fn inject(&self, topic: &str, payload: &str) -> usize {
        self.subscriptions
            .route(TransportMessage {
                topic: topic.to_string(),
                payload: payload.as_bytes().to_vec(),
            })
            .await
    }

    /// Status pushes leave in the order the commands changed the cover.
    async fn simulate(&self, topic_base: &str, payload: &str) {
        let mut covers = self.covers.lock().await;
        let status = {
            let cover = covers.entry(topic_base.to_string()).or_default();

            match payload.split_once(',') {
                Some(("pos", value)) => cover.position = value.parse().unwrap_or(cover.position),
                Some(("slat_pos", value)) => {
                    cover.slat_position = value.parse().unwrap_or(cover.slat_position)
                }
                _ if payload == "open" => cover.position = 100,
                _ if payload == "close" => cover.position = 0,
                _ => {}
            }

            json!({
                "id": 0,
                "state": "stopped",
                "current_pos": cover.position,
                "slat_pos": cover.slat_position,
            })
            .to_string()
        };

        self.inject(&format!("{topic_base}/status/cover:0"), &status).await;
        drop(covers);
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn subscribe(
        &self,
        filter: &str,
    ) -> Result<mpsc::Receiver<TransportMessage>, TransportError> {
        Ok(self.subscriptions.add(filter).await)
    }

    async fn publish(
        &self,
        topic: &str,
        payload: &str,
        retain: bool,
    ) -> Result<(), TransportError> {
        if self.reject_publishes.load(Ordering::SeqCst) {
            return Err(TransportError::Rejected(format!("{topic} <- {payload}")));
        }

        if let Some(budget) = self.publish_budget.lock().await.as_mut() {
            if *budget == 0 {
                return Err(TransportError::Rejected(format!("{topic} <- {payload}")));
            }
            *budget -= 1;
        }

        self.published.lock().await.push(PublishedMessage {
            topic: topic.to_string(),
            payload: payload.to_string(),
            retain,
        });

        if self.simulate_devices.load(Ordering::SeqCst) {
            if let Some(topic_base) = topic.strip_suffix(COMMAND_SUFFIX) {
                self.simulate(topic_base, payload).await;
            }
        }

        Ok(())
    }
}
