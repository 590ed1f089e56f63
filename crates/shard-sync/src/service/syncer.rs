//! # Synchronizer Service
//!
//! Answers collation body requests from remote peers.
//!
//! ## Dispatch Loop
//!
//! ```text
//!        ┌──────────── cancelled ────────────→ exit
//!        │
//! select ┼──────────── subscription failed ──→ report SubscriptionFailed, exit
//!        │
//!        └──────────── inbound request
//!                          │
//!                   fetch (shard, period)
//!                    │               │
//!                  Err             Ok
//!                    │               │
//!        report ResponseConstruction  send_direct(response, requesting peer)
//! ```
//!
//! Cancellation always wins: it is polled first, raced against in-flight
//! lookups, and checked again before a response leaves the node.

use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use shared_bus::{Inbox, PeerFeed, SubscriptionHandle};
use shared_types::{
    CollationBodyResponse, MessageKind, Payload, PeerMessage, Service, ServiceError, ServiceStatus,
};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::adapters::ShardView;
use crate::config::SyncerConfig;
use crate::error::SyncError;
use crate::ports::CollationFetcher;
use crate::service::error_sink::{drain_errors, error_channel, ErrorSink};

const NAME: &str = "syncer";

/// Capacity of the error observer channel.
const OBSERVER_CAPACITY: usize = 64;

/// Handles held while the service is running.
struct Running {
    cancel: CancellationToken,
    subscription: Arc<SubscriptionHandle>,
    tasks: Vec<JoinHandle<()>>,
}

/// Synchronizer service.
///
/// Serves collation bodies of one shard to peers that request them.
pub struct Synchronizer {
    config: SyncerConfig,
    feed: Arc<dyn PeerFeed>,
    store: Arc<dyn CollationFetcher>,
    observers: broadcast::Sender<SyncError>,
    status: Arc<RwLock<ServiceStatus>>,
    running: Mutex<Option<Running>>,
}

impl Synchronizer {
    /// Create a synchronizer serving `config.shard_id` out of `store`.
    pub fn new(
        config: SyncerConfig,
        feed: Arc<dyn PeerFeed>,
        store: Arc<dyn CollationFetcher>,
    ) -> Self {
        let (observers, _) = broadcast::channel(OBSERVER_CAPACITY);
        Self {
            config,
            feed,
            store,
            observers,
            status: Arc::new(RwLock::new(ServiceStatus::Registered)),
            running: Mutex::new(None),
        }
    }

    /// Observe every error drained from the service's error queue.
    #[must_use]
    pub fn subscribe_errors(&self) -> broadcast::Receiver<SyncError> {
        self.observers.subscribe()
    }

    /// The shard this service serves.
    #[must_use]
    pub fn shard_id(&self) -> u64 {
        self.config.shard_id
    }
}

#[async_trait]
impl Service for Synchronizer {
    fn name(&self) -> &'static str {
        NAME
    }

    async fn start(&self) -> Result<(), ServiceError> {
        let mut running = self.running.lock();
        if running.is_some() {
            return Err(ServiceError::startup(NAME, "already running"));
        }

        info!("[{}] Starting sync service (shard {})", NAME, self.config.shard_id);

        let shard = ShardView::new(self.config.shard_id, Arc::clone(&self.store));
        let (inbox, subscription) = self
            .feed
            .subscribe(MessageKind::CollationBodyRequest, self.config.inbox_capacity)
            .map_err(|e| ServiceError::startup(NAME, e.to_string()))?;
        let subscription = Arc::new(subscription);

        let cancel = CancellationToken::new();
        let (sink, error_rx) = error_channel(self.config.error_capacity, cancel.clone());

        let dispatch = tokio::spawn(handle_collation_body_requests(Dispatch {
            inbox,
            subscription: Arc::clone(&subscription),
            fetcher: shard,
            feed: Arc::clone(&self.feed),
            sink,
            cancel: cancel.clone(),
            status: Arc::clone(&self.status),
        }));
        let drain = tokio::spawn(drain_errors(
            NAME,
            error_rx,
            cancel.clone(),
            self.observers.clone(),
        ));

        *running = Some(Running {
            cancel,
            subscription,
            tasks: vec![dispatch, drain],
        });
        *self.status.write() = ServiceStatus::Running;
        Ok(())
    }

    async fn stop(&self) -> Result<(), ServiceError> {
        let Some(running) = self.running.lock().take() else {
            debug!("[{}] Stop requested but service is not running", NAME);
            return Ok(());
        };

        info!("[{}] Stopping sync service", NAME);

        // Cancel first: tasks must observe it before their channels close.
        running.cancel.cancel();
        running.subscription.unsubscribe();

        let mut failures = Vec::new();
        for task in running.tasks {
            if let Err(e) = task.await {
                failures.push(e.to_string());
            }
        }

        if failures.is_empty() {
            *self.status.write() = ServiceStatus::Stopped;
            Ok(())
        } else {
            *self.status.write() = ServiceStatus::Failed;
            Err(ServiceError::shutdown(NAME, failures.join("; ")))
        }
    }

    fn status(&self) -> ServiceStatus {
        *self.status.read()
    }
}

/// Everything the dispatch loop owns.
struct Dispatch {
    inbox: Inbox,
    subscription: Arc<SubscriptionHandle>,
    fetcher: ShardView,
    feed: Arc<dyn PeerFeed>,
    sink: ErrorSink<SyncError>,
    cancel: CancellationToken,
    status: Arc<RwLock<ServiceStatus>>,
}

/// Serve requests from the inbox until cancelled or the subscription fails,
/// replying only to the peer that asked.
async fn handle_collation_body_requests(mut ctx: Dispatch) {
    loop {
        tokio::select! {
            biased;

            _ = ctx.cancel.cancelled() => break,

            signal = ctx.subscription.error_signal() => {
                if let Some(err) = signal {
                    warn!("[{}] Request subscription failed: {}", NAME, err);
                    *ctx.status.write() = ServiceStatus::Degraded;
                    ctx.sink.report(SyncError::SubscriptionFailed(err)).await;
                }
                break;
            }

            next = ctx.inbox.recv() => {
                let Some(request) = next else { break };
                if request.data.is_none() {
                    continue;
                }
                if !serve_request(&ctx, &request).await {
                    break;
                }
            }
        }
    }

    ctx.inbox.close();
    debug!("[{}] Dispatch loop exited", NAME);
}

/// Handle one request. Returns `false` if cancellation was observed.
async fn serve_request(ctx: &Dispatch, request: &PeerMessage) -> bool {
    info!("[{}] Received p2p request from peer {}", NAME, request.peer);

    let outcome = tokio::select! {
        biased;
        _ = ctx.cancel.cancelled() => return false,
        outcome = respond_collation_body(request, &ctx.fetcher) => outcome,
    };

    match outcome {
        Ok(response) => {
            if ctx.cancel.is_cancelled() {
                return false;
            }
            let header_hash = hex::encode(response.header_hash);
            ctx.feed
                .send_direct(Payload::CollationBodyResponse(response), &request.peer)
                .await;
            info!(
                header_hash = %header_hash,
                peer = %request.peer,
                "[{}] Responding to p2p request with collation",
                NAME
            );
        }
        Err(err) => {
            ctx.sink.report(err).await;
        }
    }
    true
}

/// Build the response to a collation body request by looking up the
/// collation for exactly the requested `(shard_id, period)`.
pub async fn respond_collation_body(
    request: &PeerMessage,
    fetcher: &dyn CollationFetcher,
) -> Result<CollationBodyResponse, SyncError> {
    let req = match &request.data {
        Some(Payload::CollationBodyRequest(req)) => req,
        Some(other) => return Err(SyncError::UnexpectedPayload(other.kind().name())),
        None => return Err(SyncError::UnexpectedPayload("empty")),
    };

    let collation = fetcher
        .fetch(req.shard_id, req.period)
        .await
        .map_err(SyncError::ResponseConstruction)?;

    Ok(CollationBodyResponse {
        header_hash: collation.header_hash(),
        body: collation.body,
    })
}
