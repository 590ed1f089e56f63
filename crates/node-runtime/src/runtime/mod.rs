//! # Node Runtime
//!
//! Owns the service registry and the process-level shutdown gate.
//!
//! ## State Machine
//!
//! ```text
//! Created ──start()──► Running ──close()──► ShuttingDown ──► Stopped
//!    │                                                        ▲
//!    └──────────────────────close()───────────────────────────┘
//! ```
//!
//! `start()` blocks until the gate closes. `close()` may be called any number
//! of times from any task; only the first call that finds the node running
//! stops the services.

pub mod interrupts;

use std::sync::Arc;

use shared_types::ServiceError;
use thiserror::Error;
use tokio::sync::{watch, Mutex};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::container::RuntimeConfig;
use crate::registry::ServiceRegistry;

use interrupts::{AbortProcess, EscalationBudget, ForcedExit, InterruptSource};

/// Lifecycle state of the node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeState {
    /// Constructed, services not started.
    Created,
    /// Services running.
    Running,
    /// `close()` in progress.
    ShuttingDown,
    /// Terminal.
    Stopped,
}

/// Runtime lifecycle errors.
#[derive(Debug, Error)]
pub enum RuntimeError {
    /// `start()` was called on a runtime that is not in `Created`.
    #[error("node runtime already started (state: {0:?})")]
    AlreadyStarted(NodeState),

    /// One or more services failed to start. The node keeps running the
    /// others.
    #[error("{} service(s) failed to start", .0.len())]
    ServiceStartup(Vec<ServiceError>),
}

/// The main node runtime orchestrating all services.
pub struct NodeRuntime {
    registry: ServiceRegistry,
    config: RuntimeConfig,
    /// Serializes `start()` and `close()`.
    lifecycle: Mutex<NodeState>,
    state_tx: watch::Sender<NodeState>,
    /// Shutdown gate.
    shutdown: CancellationToken,
    forced_exit: Arc<dyn ForcedExit>,
}

impl NodeRuntime {
    /// Create a runtime that aborts the process when the interrupt budget
    /// runs out.
    pub fn new(registry: ServiceRegistry, config: RuntimeConfig) -> Self {
        Self::with_forced_exit(registry, config, Arc::new(AbortProcess))
    }

    /// Create a runtime with a custom forced-exit action.
    pub fn with_forced_exit(
        registry: ServiceRegistry,
        config: RuntimeConfig,
        forced_exit: Arc<dyn ForcedExit>,
    ) -> Self {
        let (state_tx, _) = watch::channel(NodeState::Created);
        Self {
            registry,
            config,
            lifecycle: Mutex::new(NodeState::Created),
            state_tx,
            shutdown: CancellationToken::new(),
            forced_exit,
        }
    }

    /// Start every service, listen for interrupts, and wait until the node
    /// has been closed.
    ///
    /// Service start failures are logged and the node keeps running; they
    /// are returned once the node has stopped.
    pub async fn start(
        self: &Arc<Self>,
        interrupts: Box<dyn InterruptSource>,
    ) -> Result<(), RuntimeError> {
        let startup = {
            let mut state = self.lifecycle.lock().await;
            if *state != NodeState::Created {
                return Err(RuntimeError::AlreadyStarted(*state));
            }

            info!("===========================================");
            info!("  Shard Node Runtime v{}", env!("CARGO_PKG_VERSION"));
            info!("===========================================");

            let startup = self.registry.start_all().await;
            if let Err(errors) = &startup {
                for e in errors {
                    error!("Service failed to start: {}", e);
                }
            }
            self.transition(&mut state, NodeState::Running);
            startup
        };

        self.registry.print_status();

        let listener = tokio::spawn(Arc::clone(self).listen(interrupts));

        self.shutdown.cancelled().await;
        listener.abort();

        debug!("Shutdown gate closed");
        startup.map_err(RuntimeError::ServiceStartup)
    }

    /// Stop every service and close the shutdown gate.
    ///
    /// Safe to call repeatedly and concurrently.
    pub async fn close(&self) {
        let mut state = self.lifecycle.lock().await;
        match *state {
            NodeState::Running => {}
            NodeState::Created => {
                self.transition(&mut state, NodeState::Stopped);
                self.shutdown.cancel();
                return;
            }
            NodeState::ShuttingDown | NodeState::Stopped => {
                debug!("Close requested but node is already {:?}", *state);
                return;
            }
        }

        self.transition(&mut state, NodeState::ShuttingDown);
        info!("Stopping shard node");

        if let Err(errors) = self.registry.stop_all().await {
            for e in errors {
                error!("Service failed to stop: {}", e);
            }
        }

        self.transition(&mut state, NodeState::Stopped);
        self.shutdown.cancel();
        info!("Shutdown complete");
    }

    /// Current lifecycle state.
    pub fn state(&self) -> NodeState {
        *self.state_tx.borrow()
    }

    /// Watch lifecycle transitions.
    pub fn subscribe_state(&self) -> watch::Receiver<NodeState> {
        self.state_tx.subscribe()
    }

    /// Whether the shutdown gate has closed.
    pub fn is_closed(&self) -> bool {
        self.shutdown.is_cancelled()
    }

    /// Token cancelled when the shutdown gate closes.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// The service registry.
    pub fn registry(&self) -> &ServiceRegistry {
        &self.registry
    }

    fn transition(&self, state: &mut NodeState, next: NodeState) {
        debug!("Node state {:?} -> {:?}", *state, next);
        *state = next;
        self.state_tx.send_replace(next);
    }

    async fn listen(self: Arc<Self>, mut interrupts: Box<dyn InterruptSource>) {
        let mut budget = EscalationBudget::new(self.config.interrupt_budget);

        loop {
            let received = tokio::select! {
                biased;
                _ = self.shutdown.cancelled() => return,
                received = interrupts.recv() => received,
            };
            if !received {
                debug!("Interrupt source closed");
                return;
            }

            let step = budget.record();
            if EscalationBudget::log(step) {
                self.forced_exit.force_exit();
                return;
            }
            if step == interrupts::Escalation::Shutdown {
                let runtime = Arc::clone(&self);
                tokio::spawn(async move { runtime.close().await });
            }
        }
    }
}
