use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use rumqttc::{AsyncClient, Event, EventLoop, MqttOptions, Packet, QoS};
use tokio::sync::mpsc;

use crate::configs::Gateway;
use crate::errors::TransportError;

use super::{Subscriptions, Transport, TransportMessage};

const REQUEST_CAPACITY: usize = 10;
const RECONNECT_DELAY: Duration = Duration::from_secs(1);

/// MQTT transport backed by a rumqttc client.
pub struct MqttTransport {
    client: AsyncClient,
    subscriptions: Arc<Subscriptions>,
}

impl MqttTransport {
    /// Creates the client and starts polling its event loop in the background.
    pub fn connect(gateway: &Gateway) -> Self {
        let mut options = MqttOptions::new(&gateway.client_id, &gateway.host, gateway.port);
        options.set_keep_alive(Duration::from_secs(gateway.keep_alive_secs));

        if let Some(credentials) = &gateway.credentials {
            options.set_credentials(&credentials.username, &credentials.password);
        }

        let (client, event_loop) = AsyncClient::new(options, REQUEST_CAPACITY);
        let subscriptions = Arc::new(Subscriptions::default());

        tokio::spawn(poll_event_loop(event_loop, client.clone(), subscriptions.clone()));

        tracing::info!("MQTT client connecting to {}:{}", gateway.host, gateway.port);

        Self {
            client,
            subscriptions,
        }
    }
}

#[async_trait]
impl Transport for MqttTransport {
    async fn subscribe(
        &self,
        filter: &str,
    ) -> Result<mpsc::Receiver<TransportMessage>, TransportError> {
        let receiver = self.subscriptions.add(filter).await;
        self.client.subscribe(filter, QoS::AtLeastOnce).await?;

        tracing::debug!("Subscribed to {}", filter);

        Ok(receiver)
    }

    async fn publish(
        &self,
        topic: &str,
        payload: &str,
        retain: bool,
    ) -> Result<(), TransportError> {
        tracing::debug!("Publish {} -> {}", topic, payload);

        self.client
            .publish(topic, QoS::AtLeastOnce, retain, payload.as_bytes().to_vec())
            .await?;

        Ok(())
    }
}

async fn poll_event_loop(
    mut event_loop: EventLoop,
    client: AsyncClient,
    subscriptions: Arc<Subscriptions>,
) {
    loop {
        match event_loop.poll().await {
            Ok(Event::Incoming(Packet::ConnAck(_))) => {
                tracing::info!("MQTT connection established");
                // The session may be fresh after a reconnect.
                let filters = subscriptions.filters().await;
                tokio::spawn(resubscribe(client.clone(), filters));
            }
            Ok(Event::Incoming(Packet::Publish(publish))) => {
                let message = TransportMessage {
                    topic: publish.topic.clone(),
                    payload: publish.payload.to_vec(),
                };

                if subscriptions.route(message).await == 0 {
                    tracing::debug!("No subscriber for {}", publish.topic);
                }
            }
            Ok(_) => {}
            Err(e) => {
                tracing::error!("MQTT error: {}", e);
                tokio::time::sleep(RECONNECT_DELAY).await;
            }
        }
    }
}

async fn resubscribe(client: AsyncClient, filters: Vec<String>) {
    for filter in filters {
        if let Err(e) = client.subscribe(&filter, QoS::AtLeastOnce).await {
            tracing::error!("Failed to resubscribe to {}: {}", filter, e);
        }
    }
}
