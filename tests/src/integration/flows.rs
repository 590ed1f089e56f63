//! # Integration Test Flows
//!
//! The simulator and the synchronizer working over one peer feed, and a
//! full node runtime answering remote peers until it is interrupted.
//!
//! ## Flows Tested:
//!
//! 1. **Simulator → Synchronizer**: a simulated notary request for the
//!    current period is answered with the stored collation body
//! 2. **Remote peer → Synchronizer**: the response goes to that peer only
//! 3. **Missing collation**: no response, one error observed
//! 4. **Runtime shutdown**: no request is answered after the node stops

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::sync::broadcast;
    use tokio::time::timeout;

    use node_runtime::container::RuntimeConfig;
    use node_runtime::{
        ChannelInterrupts, ForcedExit, NodeConfig, NodeRuntime, NodeState, ServiceContainer,
        ServiceRegistry,
    };
    use shard_sync::{
        InMemoryShardStore, MockMainchain, Simulator, SimulatorConfig, SyncError, SyncerConfig,
        Synchronizer,
    };
    use shared_bus::{InMemoryPeerFeed, Outbound, PeerFeed};
    use shared_types::{
        Collation, CollationBodyRequest, CollationHeader, CollationRecord, MessageKind, Payload,
        Peer, PeerId, PeerMessage, Service,
    };

    // =============================================================================
    // TEST FIXTURES
    // =============================================================================

    const SHARD: u64 = 1;

    fn collation(period: u64) -> Collation {
        Collation::new(
            CollationHeader {
                shard_id: SHARD,
                period,
                chunk_root: [period as u8; 32],
                proposer: [0xAB; 20],
            },
            format!("body of period {period}").into_bytes(),
        )
    }

    fn request_for(collation: &Collation, peer: Peer) -> PeerMessage {
        PeerMessage::new(
            peer,
            CollationBodyRequest {
                shard_id: collation.header.shard_id,
                period: collation.header.period,
                chunk_root: collation.header.chunk_root,
                proposer: collation.header.proposer,
            },
        )
    }

    fn remote_peer(byte: u8) -> Peer {
        Peer::new(PeerId([byte; 32]))
    }

    async fn next_outbound(rx: &mut broadcast::Receiver<Outbound>) -> Outbound {
        timeout(Duration::from_secs(2), rx.recv())
            .await
            .expect("no outbound message")
            .expect("outbound channel closed")
    }

    /// Next direct send, skipping simulated transaction broadcasts.
    async fn next_direct(rx: &mut broadcast::Receiver<Outbound>) -> (Peer, Payload) {
        loop {
            match next_outbound(rx).await {
                Outbound::Direct { peer, payload } => return (peer, payload),
                Outbound::Broadcast(Payload::TransactionBroadcast(_)) => continue,
                other => panic!("unexpected outbound message: {:?}", other),
            }
        }
    }

    struct NoExit;

    impl ForcedExit for NoExit {
        fn force_exit(&self) {}
    }

    // =============================================================================
    // SIMULATOR → SYNCHRONIZER
    // =============================================================================

    #[tokio::test]
    async fn test_simulated_request_is_answered() {
        let feed = Arc::new(InMemoryPeerFeed::new());
        let store = Arc::new(InMemoryShardStore::new());
        let chain = Arc::new(MockMainchain::new(1050));

        let stored = collation(10);
        store.insert(stored.clone());
        chain.add_record(
            SHARD,
            10,
            CollationRecord {
                chunk_root: stored.header.chunk_root,
                proposer: stored.header.proposer,
            },
        );

        let mut outbound = feed.outbound();
        let syncer = Synchronizer::new(
            SyncerConfig::for_testing(SHARD),
            feed.clone(),
            store.clone(),
        );
        let simulator = Simulator::new(
            SimulatorConfig::for_testing(SHARD, 100),
            feed.clone(),
            chain.clone(),
            chain.clone(),
        )
        .unwrap();

        syncer.start().await.unwrap();
        simulator.start().await.unwrap();

        let (peer, payload) = next_direct(&mut outbound).await;

        simulator.stop().await.unwrap();
        syncer.stop().await.unwrap();

        assert!(peer.is_anonymous());
        match payload {
            Payload::CollationBodyResponse(response) => {
                assert_eq!(response.header_hash, stored.header_hash());
                assert_eq!(response.body, stored.body);
            }
            other => panic!("Expected CollationBodyResponse, got {:?}", other),
        }
    }

    // =============================================================================
    // REMOTE PEER → SYNCHRONIZER
    // =============================================================================

    #[tokio::test]
    async fn test_response_goes_only_to_requesting_peer() {
        let feed = Arc::new(InMemoryPeerFeed::new());
        let store = Arc::new(InMemoryShardStore::new());
        let stored = collation(4);
        store.insert(stored.clone());

        let mut outbound = feed.outbound();
        let syncer = Synchronizer::new(
            SyncerConfig::for_testing(SHARD),
            feed.clone(),
            store.clone(),
        );
        syncer.start().await.unwrap();

        let asker = remote_peer(0x42);
        feed.publish(
            MessageKind::CollationBodyRequest,
            request_for(&stored, asker),
        )
        .await;

        let sent = next_outbound(&mut outbound).await;
        syncer.stop().await.unwrap();

        match sent {
            Outbound::Direct { peer, payload } => {
                assert_eq!(peer, asker);
                assert!(matches!(payload, Payload::CollationBodyResponse(_)));
            }
            Outbound::Broadcast(_) => panic!("response must not be broadcast"),
        }
        assert_eq!(feed.broadcasts(), 0);
        assert_eq!(feed.direct_sends(), 1);
    }

    #[tokio::test]
    async fn test_missing_collation_reports_error() {
        let feed = Arc::new(InMemoryPeerFeed::new());
        let store = Arc::new(InMemoryShardStore::new());
        let syncer = Synchronizer::new(
            SyncerConfig::for_testing(SHARD),
            feed.clone(),
            store.clone(),
        );
        let mut errors = syncer.subscribe_errors();
        syncer.start().await.unwrap();

        feed.publish(
            MessageKind::CollationBodyRequest,
            request_for(&collation(99), remote_peer(7)),
        )
        .await;

        let error = timeout(Duration::from_secs(1), errors.recv())
            .await
            .expect("no error reported")
            .unwrap();
        syncer.stop().await.unwrap();

        assert!(matches!(error, SyncError::ResponseConstruction(_)));
        assert_eq!(feed.direct_sends(), 0);
        assert!(errors.try_recv().is_err());
    }

    // =============================================================================
    // FULL RUNTIME
    // =============================================================================

    #[tokio::test]
    async fn test_runtime_answers_until_interrupted() {
        let mut config = NodeConfig::default();
        config.sharding.shard_id = SHARD;
        let container = ServiceContainer::new(config).unwrap();
        let registry = ServiceRegistry::new();
        container.register_all(&registry);

        let stored = collation(2);
        container.store.insert(stored.clone());
        let mut outbound = container.feed.outbound();

        let runtime = Arc::new(NodeRuntime::with_forced_exit(
            registry,
            RuntimeConfig::default(),
            Arc::new(NoExit),
        ));
        let (trigger, source) = ChannelInterrupts::new();
        let run = tokio::spawn({
            let runtime = runtime.clone();
            async move { runtime.start(Box::new(source)).await }
        });

        let mut state = runtime.subscribe_state();
        timeout(
            Duration::from_secs(1),
            state.wait_for(|s| *s == NodeState::Running),
        )
        .await
        .expect("runtime did not start")
        .unwrap();

        let asker = remote_peer(1);
        container
            .feed
            .publish(
                MessageKind::CollationBodyRequest,
                request_for(&stored, asker),
            )
            .await;
        let (peer, _) = next_direct(&mut outbound).await;
        assert_eq!(peer, asker);

        trigger.interrupt();
        timeout(Duration::from_secs(2), run)
            .await
            .expect("runtime did not stop")
            .unwrap()
            .unwrap();

        let delivered = container
            .feed
            .publish(
                MessageKind::CollationBodyRequest,
                request_for(&stored, remote_peer(2)),
            )
            .await;
        assert_eq!(delivered, 0);
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(container.feed.direct_sends(), 1);
    }
}
