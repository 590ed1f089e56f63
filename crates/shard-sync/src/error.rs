//! # Service Errors
//!
//! Errors produced by the background work of the shard sync services.
//! None of them unwinds past its owning task: the Synchronizer funnels them
//! into its error sink, the Simulator logs them and skips the tick.

use shared_bus::SubscriptionError;
use shared_types::FetchError;
use thiserror::Error;

/// Synchronizer error types.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SyncError {
    /// A request could not be turned into a response. The request is dropped.
    #[error("could not construct response: {0}")]
    ResponseConstruction(#[source] FetchError),

    /// A message on the request feed carried another payload.
    #[error("could not construct response: unexpected {0} payload")]
    UnexpectedPayload(&'static str),

    /// The feed reported the request subscription broken. Terminal for
    /// the dispatch loop.
    #[error("subscriber failed: {0}")]
    SubscriptionFailed(#[source] SubscriptionError),
}

impl SyncError {
    /// Whether this error ended the dispatch loop.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::SubscriptionFailed(_))
    }
}

/// Simulator error types.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SimulatorError {
    /// Reading the chain failed.
    #[error("chain lookup failed: {0}")]
    Fetch(#[from] FetchError),

    /// The configuration cannot drive the simulator.
    #[error("invalid simulator configuration: {0}")]
    InvalidConfig(String),
}
