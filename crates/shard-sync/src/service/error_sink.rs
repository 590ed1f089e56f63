//! # Error Sink
//!
//! Per-service queue carrying recoverable errors from background work to a
//! drain task that logs them and forwards them to observers.
//!
//! ## Overflow Policy
//!
//! The queue is bounded. A report waits for free capacity, unless the owning
//! service is cancelled first: then the report is abandoned, counted as
//! dropped, and `report` returns `false`. Background work therefore never
//! blocks shutdown on a full queue.

use std::fmt::Display;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::{broadcast, mpsc};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error};

/// Sending half of a service's error queue.
#[derive(Clone)]
pub struct ErrorSink<E> {
    sender: mpsc::Sender<E>,
    cancel: CancellationToken,
    dropped: Arc<AtomicU64>,
}

/// Create an error queue of `capacity` bound to the service token `cancel`.
pub fn error_channel<E>(
    capacity: usize,
    cancel: CancellationToken,
) -> (ErrorSink<E>, mpsc::Receiver<E>) {
    let (sender, receiver) = mpsc::channel(capacity.max(1));
    let sink = ErrorSink {
        sender,
        cancel,
        dropped: Arc::new(AtomicU64::new(0)),
    };
    (sink, receiver)
}

impl<E> ErrorSink<E> {
    /// Queue `err` for the drain task.
    ///
    /// Returns `false` if the error was dropped because the service was
    /// cancelled or the drain task is gone.
    pub async fn report(&self, err: E) -> bool {
        let queued = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => false,
            sent = self.sender.send(err) => sent.is_ok(),
        };
        if !queued {
            self.dropped.fetch_add(1, Ordering::Relaxed);
        }
        queued
    }

    /// Errors abandoned so far.
    #[must_use]
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

/// Drain `receiver` until `cancel` fires: log each error and forward it to
/// `observers`. Closes the queue on exit.
pub async fn drain_errors<E>(
    service: &'static str,
    mut receiver: mpsc::Receiver<E>,
    cancel: CancellationToken,
    observers: broadcast::Sender<E>,
) where
    E: Display + Clone,
{
    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            next = receiver.recv() => {
                let Some(err) = next else { break };
                error!("[{}] {}", service, err);
                // No observers attached is the normal case.
                let _ = observers.send(err);
            }
        }
    }
    receiver.close();
    debug!("[{}] Error drain exited", service);
}
