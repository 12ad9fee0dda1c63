use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use coversync_api::DeviceType;
use coversync_server::app::{AppState, create_app};
use coversync_server::build_registry;
use coversync_server::configs::Shelly;
use coversync_server::models::Device;
use coversync_server::services::{CoverActor, EventBus, MockTransport};

pub struct MockApp {
    pub transport: Arc<MockTransport>,
    pub state: AppState,
    pub router: Router,
}

impl MockApp {
    /// Kitchen and Office in group `west`, Office also in `east`, Garage is a roller shutter.
    pub async fn new() -> Self {
        let mut kitchen = Device::new("Kitchen", "shellies/kitchen", DeviceType::Blinds);
        kitchen.rank = 1;
        kitchen.group_ids = vec!["west".to_string()];
        kitchen.blinds_config.tilt_percentage = 60;

        let mut office = Device::new("Office", "shellies/office", DeviceType::Blinds);
        office.rank = 2;
        office.group_id = Some("west".to_string());
        office.group_ids = vec!["east".to_string()];

        let mut garage = Device::new("Garage", "shellies/garage", DeviceType::RollerShutter);
        garage.rank = 3;

        Self::with_devices(vec![kitchen, office, garage]).await
    }

    pub async fn with_devices(devices: Vec<Device>) -> Self {
        let transport = Arc::new(MockTransport::simulating_devices());
        let events = Arc::new(EventBus::new());
        let shelly = Shelly {
            optimize_tilt: true,
            devices,
        };

        let registry = build_registry(&shelly, transport.clone(), &events).await;
        for actor in registry.get_all_actors().await {
            actor.start().await.unwrap();
        }
        transport.clear().await;

        let state = AppState::new(registry, events.clone());
        if let Some(receiver) = events.take_receiver().await {
            state.live_updates.clone().forward(receiver);
        }
        let router = create_app(&state);

        Self {
            transport,
            state,
            router,
        }
    }

    pub async fn actor(&self, name: &str) -> Arc<CoverActor> {
        self.state.registry.get_actor(name).await.unwrap()
    }

    /// Waits until `count` payloads were published to `topic` and returns them.
    pub async fn wait_for_payloads(&self, topic: &str, count: usize) -> Vec<String> {
        tokio::time::timeout(Duration::from_secs(5), async {
            loop {
                let payloads = self.transport.payloads(topic).await;
                if payloads.len() >= count {
                    return payloads;
                }
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .unwrap()
    }
}
