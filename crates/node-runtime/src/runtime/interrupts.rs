//! # Operator Interrupts
//!
//! The first interrupt starts a graceful shutdown. Every further interrupt
//! while the node is still shutting down spends one unit of the escalation
//! budget; once the budget is gone the process is terminated on the spot.

use std::io::Write;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tracing::{error, info, warn};

/// A stream of operator interrupt signals.
#[async_trait]
pub trait InterruptSource: Send {
    /// Wait for the next interrupt. `false` means no more will ever arrive.
    async fn recv(&mut self) -> bool;
}

/// Terminates the process when graceful shutdown is abandoned.
pub trait ForcedExit: Send + Sync {
    /// Flush diagnostics and end the process.
    fn force_exit(&self);
}

/// Interrupts from the operating system: SIGINT and SIGTERM on unix, Ctrl-C
/// elsewhere.
pub struct OsSignals {
    #[cfg(unix)]
    sigint: tokio::signal::unix::Signal,
    #[cfg(unix)]
    sigterm: tokio::signal::unix::Signal,
}

impl OsSignals {
    /// Install the signal handlers.
    pub fn new() -> std::io::Result<Self> {
        #[cfg(unix)]
        {
            use tokio::signal::unix::{signal, SignalKind};
            Ok(Self {
                sigint: signal(SignalKind::interrupt())?,
                sigterm: signal(SignalKind::terminate())?,
            })
        }
        #[cfg(not(unix))]
        {
            Ok(Self {})
        }
    }
}

#[async_trait]
impl InterruptSource for OsSignals {
    #[cfg(unix)]
    async fn recv(&mut self) -> bool {
        tokio::select! {
            received = self.sigint.recv() => received.is_some(),
            received = self.sigterm.recv() => received.is_some(),
        }
    }

    #[cfg(not(unix))]
    async fn recv(&mut self) -> bool {
        tokio::signal::ctrl_c().await.is_ok()
    }
}

/// Interrupts delivered through a channel, for tests and embedding.
pub struct ChannelInterrupts {
    receiver: mpsc::UnboundedReceiver<()>,
}

impl ChannelInterrupts {
    /// Create the source and the handle used to trigger interrupts.
    pub fn new() -> (InterruptTrigger, Self) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (InterruptTrigger { sender }, Self { receiver })
    }
}

#[async_trait]
impl InterruptSource for ChannelInterrupts {
    async fn recv(&mut self) -> bool {
        self.receiver.recv().await.is_some()
    }
}

/// Sends interrupts into a [`ChannelInterrupts`].
#[derive(Clone)]
pub struct InterruptTrigger {
    sender: mpsc::UnboundedSender<()>,
}

impl InterruptTrigger {
    /// Deliver one interrupt. Returns `false` if the listener is gone.
    pub fn interrupt(&self) -> bool {
        self.sender.send(()).is_ok()
    }
}

/// Flushes stdout/stderr and aborts the process.
pub struct AbortProcess;

impl ForcedExit for AbortProcess {
    fn force_exit(&self) {
        error!("Panic closing the shard node");
        let _ = std::io::stdout().flush();
        let _ = std::io::stderr().flush();
        std::process::abort();
    }
}

/// What the listener should do after an interrupt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Escalation {
    /// First interrupt: begin graceful shutdown.
    Shutdown,
    /// Already shutting down; this many interrupts remain before exit.
    Warn(u32),
    /// Budget exhausted.
    ForceExit,
}

/// Counts interrupts against the escalation budget.
#[derive(Debug)]
pub(crate) struct EscalationBudget {
    budget: u32,
    seen: u32,
}

impl EscalationBudget {
    pub(crate) fn new(budget: u32) -> Self {
        Self { budget, seen: 0 }
    }

    /// Record one interrupt.
    pub(crate) fn record(&mut self) -> Escalation {
        self.seen = self.seen.saturating_add(1);
        if self.seen == 1 {
            return Escalation::Shutdown;
        }

        let extra = self.seen - 1;
        if extra >= self.budget {
            Escalation::ForceExit
        } else {
            Escalation::Warn(self.budget - extra)
        }
    }

    /// Log the step and report whether the process must be terminated.
    pub(crate) fn log(step: Escalation) -> bool {
        match step {
            Escalation::Shutdown => {
                info!("Got interrupt, shutting down...");
                false
            }
            Escalation::Warn(remaining) => {
                warn!(
                    times = remaining,
                    "Already shutting down, interrupt more to panic."
                );
                false
            }
            Escalation::ForceExit => {
                error!("Interrupt budget exhausted, forcing exit");
                true
            }
        }
    }
}
