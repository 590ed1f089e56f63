//! # Service Instances
//!
//! Builds every service from `NodeConfig` against one shared peer feed and
//! registers them in a fixed order: the synchronizer first, then the
//! simulator when enabled.

use std::num::NonZeroU64;
use std::sync::Arc;

use shard_sync::{
    period_for_height, InMemoryShardStore, MockMainchain, Simulator, SimulatorError, Synchronizer,
};
use shared_bus::InMemoryPeerFeed;
use shared_types::{Collation, CollationHeader, CollationRecord};
use tracing::info;

use crate::container::config::NodeConfig;
use crate::registry::ServiceRegistry;

/// Central container holding all service instances.
pub struct ServiceContainer {
    /// Node configuration.
    pub config: NodeConfig,
    /// Peer feed shared by every service.
    pub feed: Arc<InMemoryPeerFeed>,
    /// Local collation store.
    pub store: Arc<InMemoryShardStore>,
    /// Main-chain view.
    pub mainchain: Arc<MockMainchain>,
    /// Collation body responder.
    pub synchronizer: Arc<Synchronizer>,
    /// Traffic simulator, present when enabled.
    pub simulator: Option<Arc<Simulator>>,
}

impl ServiceContainer {
    /// Build every service.
    pub fn new(config: NodeConfig) -> Result<Self, SimulatorError> {
        info!(
            shard_id = config.sharding.shard_id,
            "Building shard node services"
        );

        let feed = Arc::new(InMemoryPeerFeed::new());
        let store = Arc::new(InMemoryShardStore::new());
        let mainchain = Arc::new(MockMainchain::new(0));

        let synchronizer = Arc::new(Synchronizer::new(
            config.syncer(),
            feed.clone(),
            store.clone(),
        ));

        let simulator = if config.simulator.enabled {
            seed_dev_collation(&config, &store, &mainchain)?;
            Some(Arc::new(Simulator::new(
                config.simulator(),
                feed.clone(),
                mainchain.clone(),
                mainchain.clone(),
            )?))
        } else {
            None
        };

        Ok(Self {
            config,
            feed,
            store,
            mainchain,
            synchronizer,
            simulator,
        })
    }

    /// Register every service with `registry`.
    pub fn register_all(&self, registry: &ServiceRegistry) {
        registry.register(self.synchronizer.clone());
        if let Some(simulator) = &self.simulator {
            registry.register(simulator.clone());
        }
    }
}

/// Store a collation for the head's period and record it on the main chain,
/// so simulated notary requests have something to be answered with.
fn seed_dev_collation(
    config: &NodeConfig,
    store: &InMemoryShardStore,
    mainchain: &MockMainchain,
) -> Result<(), SimulatorError> {
    let period_length = NonZeroU64::new(config.sharding.period_length).ok_or_else(|| {
        SimulatorError::InvalidConfig("period_length must be non-zero".to_string())
    })?;
    let shard_id = config.sharding.shard_id;
    let period = period_for_height(mainchain.height(), period_length);

    let header = CollationHeader {
        shard_id,
        period,
        chunk_root: [0x5a; 32],
        proposer: [0x01; 20],
    };
    mainchain.add_record(
        shard_id,
        period,
        CollationRecord {
            chunk_root: header.chunk_root,
            proposer: header.proposer,
        },
    );
    store.insert(Collation::new(header, b"simulated collation body".to_vec()));

    info!(shard_id, period, "Seeded development collation for the simulator");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared_bus::Outbound;
    use shared_types::{MessageKind, Payload, Service};
    use std::time::Duration;
    use tokio::time::timeout;

    #[test]
    fn test_simulator_disabled_by_default() {
        let container = ServiceContainer::new(NodeConfig::default()).unwrap();
        let registry = ServiceRegistry::new();
        container.register_all(&registry);

        assert!(container.simulator.is_none());
        let names: Vec<_> = registry.statuses().into_iter().map(|(n, _)| n).collect();
        assert_eq!(names, vec!["syncer"]);
    }

    #[test]
    fn test_simulator_registered_after_syncer() {
        let mut config = NodeConfig::default();
        config.simulator.enabled = true;
        let container = ServiceContainer::new(config).unwrap();
        let registry = ServiceRegistry::new();
        container.register_all(&registry);

        let names: Vec<_> = registry.statuses().into_iter().map(|(n, _)| n).collect();
        assert_eq!(names, vec!["syncer", "simulator"]);
    }

    #[test]
    fn test_invalid_simulator_config_fails() {
        let mut config = NodeConfig::default();
        config.simulator.enabled = true;
        config.sharding.period_length = 0;

        assert!(matches!(
            ServiceContainer::new(config),
            Err(SimulatorError::InvalidConfig(_))
        ));
    }

    #[tokio::test]
    async fn test_simulator_requests_are_answered() {
        let mut config = NodeConfig::default();
        config.sharding.shard_id = 2;
        config.simulator.enabled = true;
        config.simulator.delay_ms = 10;
        let container = ServiceContainer::new(config).unwrap();
        assert_eq!(container.store.len(), 1);

        let mut outbound = container.feed.outbound();
        let simulator = container.simulator.clone().unwrap();
        container.synchronizer.start().await.unwrap();
        simulator.start().await.unwrap();

        let response = timeout(Duration::from_secs(2), async {
            loop {
                match outbound.recv().await {
                    Ok(Outbound::Direct {
                        payload: Payload::CollationBodyResponse(response),
                        ..
                    }) => return response,
                    Ok(_) => continue,
                    Err(e) => panic!("outbound closed: {e}"),
                }
            }
        })
        .await
        .expect("no response to a simulated request");

        simulator.stop().await.unwrap();
        container.synchronizer.stop().await.unwrap();

        assert_eq!(response.body, b"simulated collation body".to_vec());
        assert_eq!(
            container
                .feed
                .subscriber_count(MessageKind::CollationBodyRequest),
            0
        );
    }

    #[test]
    fn test_no_seed_without_simulator() {
        let container = ServiceContainer::new(NodeConfig::default()).unwrap();
        assert!(container.store.is_empty());
    }
}
