//! # Simulator Service
//!
//! Simulates traffic a shard node would otherwise receive from remote
//! peers: notary requests for collation bodies, and transaction broadcasts.
//! Both run on their own timer and never treat a failed tick as fatal; the
//! next tick is the retry.

use std::num::NonZeroU64;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use rand::RngCore;
use shared_bus::PeerFeed;
use shared_types::{
    CollationBodyRequest, MessageKind, Payload, Peer, PeerMessage, Period, Service, ServiceError,
    ServiceStatus, ShardId, TransactionBroadcast,
};
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, Interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::config::SimulatorConfig;
use crate::error::SimulatorError;
use crate::ports::{ChainReader, CollationRecords};

const NAME: &str = "simulator";

/// Period containing main-chain block `height`.
#[must_use]
pub fn period_for_height(height: u64, period_length: NonZeroU64) -> Period {
    height / period_length.get()
}

/// Simulator service.
pub struct Simulator {
    config: SimulatorConfig,
    period_length: NonZeroU64,
    feed: Arc<dyn PeerFeed>,
    chain: Arc<dyn ChainReader>,
    records: Arc<dyn CollationRecords>,
    status: RwLock<ServiceStatus>,
    running: Mutex<Option<(CancellationToken, Vec<JoinHandle<()>>)>>,
}

impl Simulator {
    /// Create a simulator. Fails if the period length or delay is zero.
    pub fn new(
        config: SimulatorConfig,
        feed: Arc<dyn PeerFeed>,
        chain: Arc<dyn ChainReader>,
        records: Arc<dyn CollationRecords>,
    ) -> Result<Self, SimulatorError> {
        let period_length = NonZeroU64::new(config.period_length).ok_or_else(|| {
            SimulatorError::InvalidConfig("period_length must be non-zero".to_string())
        })?;
        if config.delay_ms == 0 {
            return Err(SimulatorError::InvalidConfig(
                "delay_ms must be non-zero".to_string(),
            ));
        }

        Ok(Self {
            config,
            period_length,
            feed,
            chain,
            records,
            status: RwLock::new(ServiceStatus::Registered),
            running: Mutex::new(None),
        })
    }

    /// Build the request a notary would send for the current period.
    ///
    /// Returns `Ok(None)` when no collation was recorded for the period.
    pub async fn collation_body_request(
        &self,
    ) -> Result<Option<CollationBodyRequest>, SimulatorError> {
        build_collation_body_request(
            self.chain.as_ref(),
            self.records.as_ref(),
            self.config.shard_id,
            self.period_length,
        )
        .await
    }
}

#[async_trait]
impl Service for Simulator {
    fn name(&self) -> &'static str {
        NAME
    }

    async fn start(&self) -> Result<(), ServiceError> {
        let mut running = self.running.lock();
        if running.is_some() {
            return Err(ServiceError::startup(NAME, "already running"));
        }

        info!("[{}] Starting simulator service", NAME);

        let cancel = CancellationToken::new();
        let delay = self.config.delay();

        let broadcaster = tokio::spawn(broadcast_transactions(
            Arc::clone(&self.feed),
            self.config.tx_payload_size,
            ticker(delay),
            cancel.clone(),
        ));
        let requester = tokio::spawn(simulate_notary_requests(
            NotaryContext {
                feed: Arc::clone(&self.feed),
                chain: Arc::clone(&self.chain),
                records: Arc::clone(&self.records),
                shard_id: self.config.shard_id,
                period_length: self.period_length,
            },
            ticker(delay),
            cancel.clone(),
        ));

        *running = Some((cancel, vec![broadcaster, requester]));
        *self.status.write() = ServiceStatus::Running;
        Ok(())
    }

    async fn stop(&self) -> Result<(), ServiceError> {
        let Some((cancel, tasks)) = self.running.lock().take() else {
            debug!("[{}] Stop requested but service is not running", NAME);
            return Ok(());
        };

        info!("[{}] Stopping simulator service", NAME);
        cancel.cancel();

        let mut failures = Vec::new();
        for task in tasks {
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

/// First tick fires one full `delay` after start.
fn ticker(delay: Duration) -> Interval {
    let mut interval = interval_at(Instant::now() + delay, delay);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    interval
}

async fn build_collation_body_request(
    chain: &dyn ChainReader,
    records: &dyn CollationRecords,
    shard_id: ShardId,
    period_length: NonZeroU64,
) -> Result<Option<CollationBodyRequest>, SimulatorError> {
    let head = chain.current_block().await?;
    let period = period_for_height(head.number, period_length);

    let Some(record) = records.collation_record(shard_id, period).await? else {
        return Ok(None);
    };

    Ok(Some(CollationBodyRequest {
        shard_id,
        period,
        chunk_root: record.chunk_root,
        proposer: record.proposer,
    }))
}

struct NotaryContext {
    feed: Arc<dyn PeerFeed>,
    chain: Arc<dyn ChainReader>,
    records: Arc<dyn CollationRecords>,
    shard_id: ShardId,
    period_length: NonZeroU64,
}

/// Publish a collation body request for the current period on every tick,
/// as a notary selected for the shard would.
async fn simulate_notary_requests(
    ctx: NotaryContext,
    mut ticks: Interval,
    cancel: CancellationToken,
) {
    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            _ = ticks.tick() => {}
        }

        let built = tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            built = build_collation_body_request(
                ctx.chain.as_ref(),
                ctx.records.as_ref(),
                ctx.shard_id,
                ctx.period_length,
            ) => built,
        };

        match built {
            Ok(Some(request)) => {
                let period = request.period;
                let message = PeerMessage::new(Peer::anonymous(), request);
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => break,
                    _ = ctx.feed.publish(MessageKind::CollationBodyRequest, message) => {}
                }
                info!(
                    shard_id = ctx.shard_id,
                    period,
                    "[{}] Sent request for collation body via the shard p2p feed",
                    NAME
                );
            }
            Ok(None) => {
                debug!(shard_id = ctx.shard_id, "[{}] No collation recorded for current period", NAME);
            }
            Err(e) => {
                error!("[{}] Error constructing collation body request: {}", NAME, e);
            }
        }
    }
    debug!("[{}] Request loop exited", NAME);
}

/// Broadcast a transaction with random payload bytes on every tick.
async fn broadcast_transactions(
    feed: Arc<dyn PeerFeed>,
    payload_size: usize,
    mut ticks: Interval,
    cancel: CancellationToken,
) {
    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            _ = ticks.tick() => {}
        }

        let tx = TransactionBroadcast {
            payload: random_payload(payload_size),
        };
        feed.broadcast(Payload::TransactionBroadcast(tx)).await;
        info!("[{}] Transaction broadcasted", NAME);
    }
    debug!("[{}] Broadcast loop exited", NAME);
}

fn random_payload(size: usize) -> Vec<u8> {
    let mut data = vec![0u8; size];
    rand::thread_rng().fill_bytes(&mut data);
    data
}
