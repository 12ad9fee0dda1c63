use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use tokio::sync::RwLock;

use crate::services::actor::CoverActor;

/// Key under which an actor name is stored and looked up.
pub fn normalize_name(name: &str) -> String {
    name.trim().to_lowercase()
}

/// Directory of every actor, keyed by normalized name.
///
/// The lock only guards the directory itself, never the state inside an actor.
#[derive(Default)]
pub struct ActorRegistry {
    actors: RwLock<HashMap<String, Arc<CoverActor>>>,
}

impl ActorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts `actor`, replacing any actor registered under the same name.
    pub async fn add_actor(&self, actor: Arc<CoverActor>) {
        let key = normalize_name(actor.name());

        if self.actors.write().await.insert(key.clone(), actor).is_some() {
            tracing::warn!(actor = %key, "Replaced an actor registered under the same name");
        }
    }

    pub async fn get_actor(&self, name: &str) -> Option<Arc<CoverActor>> {
        self.actors.read().await.get(&normalize_name(name)).cloned()
    }

    pub async fn get_actor_by_serial(&self, serial: &str) -> Option<Arc<CoverActor>> {
        self.actors
            .read()
            .await
            .values()
            .find(|actor| actor.serial() == serial)
            .cloned()
    }

    /// Copy of every actor, ordered by rank then name.
    pub async fn get_all_actors(&self) -> Vec<Arc<CoverActor>> {
        let mut actors: Vec<Arc<CoverActor>> = self.actors.read().await.values().cloned().collect();
        actors.sort_by(|a, b| a.rank().cmp(&b.rank()).then_with(|| a.name().cmp(b.name())));
        actors
    }

    /// Copy of the group membership, actors ordered like [`get_all_actors`](Self::get_all_actors).
    pub async fn get_all_groups(&self) -> BTreeMap<String, Vec<Arc<CoverActor>>> {
        let mut groups: BTreeMap<String, Vec<Arc<CoverActor>>> = BTreeMap::new();

        for actor in self.get_all_actors().await {
            for group in actor.groups() {
                groups.entry(group).or_default().push(Arc::clone(&actor));
            }
        }

        groups
    }

    pub async fn get_actors_by_group(&self, group_id: &str) -> Vec<Arc<CoverActor>> {
        self.get_all_actors()
            .await
            .into_iter()
            .filter(|actor| actor.device().in_group(group_id))
            .collect()
    }

    pub async fn len(&self) -> usize {
        self.actors.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.actors.read().await.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use coversync_api::DeviceType;

    use crate::models::Device;
    use crate::services::actor::ActorOptions;
    use crate::services::event_bus::EventBus;
    use crate::services::transport::MockTransport;

    use super::*;

    fn actor(device: Device) -> Arc<CoverActor> {
        Arc::new(CoverActor::new(
            device,
            ActorOptions::default(),
            Arc::new(MockTransport::new()),
            Arc::new(EventBus::new()),
        ))
    }

    fn named(name: &str) -> Arc<CoverActor> {
        actor(Device::new(name, format!("shellies/{}", name.to_lowercase()), DeviceType::Blinds))
    }

    #[tokio::test]
    async fn test_lookup_is_case_insensitive() {
        let registry = ActorRegistry::new();
        let kitchen = named("Kitchen");
        registry.add_actor(kitchen.clone()).await;

        let lower = registry.get_actor("kitchen").await.unwrap();
        let upper = registry.get_actor("KITCHEN").await.unwrap();

        assert!(Arc::ptr_eq(&lower, &kitchen));
        assert!(Arc::ptr_eq(&upper, &kitchen));
        assert!(registry.get_actor("garage").await.is_none());
    }

    #[tokio::test]
    async fn test_last_write_wins() {
        let registry = ActorRegistry::new();
        registry.add_actor(named("Kitchen")).await;
        let replacement = named("KITCHEN");
        registry.add_actor(replacement.clone()).await;

        assert_eq!(registry.len().await, 1);
        assert!(Arc::ptr_eq(&registry.get_actor("kitchen").await.unwrap(), &replacement));
    }

    #[tokio::test]
    async fn test_replacement_keyed_by_normalized_name() {
        let registry = ActorRegistry::new();
        assert!(registry.is_empty().await);

        registry.add_actor(named(" Kitchen ")).await;
        let replacement = named("kitchen");
        registry.add_actor(replacement.clone()).await;

        assert!(!registry.is_empty().await);
        assert_eq!(registry.len().await, 1);
        assert!(Arc::ptr_eq(&registry.get_actor("KITCHEN ").await.unwrap(), &replacement));
    }

    #[tokio::test]
    async fn test_lookup_by_serial() {
        let registry = ActorRegistry::new();
        let mut device = Device::new("Office", "shellies/office", DeviceType::Blinds);
        device.serial = "A8032AB12345".to_string();
        let office = actor(device);
        registry.add_actor(office.clone()).await;
        registry.add_actor(named("Kitchen")).await;

        assert!(Arc::ptr_eq(
            &registry.get_actor_by_serial("A8032AB12345").await.unwrap(),
            &office
        ));
        assert!(registry.get_actor_by_serial("unknown").await.is_none());
    }

    #[tokio::test]
    async fn test_group_membership_is_deduplicated() {
        let registry = ActorRegistry::new();
        let mut device = Device::new("Terrace", "shellies/terrace", DeviceType::Blinds);
        device.group_id = Some("west".to_string());
        device.group_ids = vec!["west".to_string(), "patio".to_string()];
        registry.add_actor(actor(device)).await;
        registry.add_actor(named("Kitchen")).await;

        let west = registry.get_actors_by_group("west").await;
        let patio = registry.get_actors_by_group("patio").await;

        assert_eq!(west.len(), 1);
        assert_eq!(patio.len(), 1);
        assert_eq!(west[0].name(), "Terrace");
        assert!(registry.get_actors_by_group("east").await.is_empty());

        let groups = registry.get_all_groups().await;
        assert_eq!(groups.keys().collect::<Vec<_>>(), vec!["patio", "west"]);
        assert_eq!(groups["west"].len(), 1);
    }

    #[tokio::test]
    async fn test_all_actors_sorted_by_rank() {
        let registry = ActorRegistry::new();
        for (name, rank) in [("Bath", 2), ("Attic", 2), ("Living", 1)] {
            let mut device = Device::new(name, format!("shellies/{name}"), DeviceType::Blinds);
            device.rank = rank;
            registry.add_actor(actor(device)).await;
        }

        let names: Vec<String> = registry
            .get_all_actors()
            .await
            .iter()
            .map(|actor| actor.name().to_string())
            .collect();

        assert_eq!(names, vec!["Living", "Attic", "Bath"]);
    }
}
