//! # Shard Node
//!
//! Entry point for the shard node.
//!
//! ## Startup Sequence
//!
//! 1. Load configuration (defaults, `SHARD_NODE_CONFIG` file, env overrides)
//! 2. Initialize logging
//! 3. Build the peer feed, adapters and services
//! 4. Register services (synchronizer, then simulator when enabled)
//! 5. Start the runtime and block until shutdown

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{info, warn};

use node_runtime::logging::init_logging;
use node_runtime::{NodeConfig, NodeRuntime, OsSignals, RuntimeError, ServiceContainer, ServiceRegistry};

#[tokio::main]
async fn main() -> Result<()> {
    let config = NodeConfig::load().context("Failed to load configuration")?;
    init_logging(&config.logging).context("Failed to initialize logging")?;

    info!(
        shard_id = config.sharding.shard_id,
        period_length = config.sharding.period_length,
        simulator = config.simulator.enabled,
        "Configuration loaded"
    );

    let runtime_config = config.runtime.clone();
    let container = ServiceContainer::new(config).context("Failed to build services")?;
    let registry = ServiceRegistry::new();
    container.register_all(&registry);

    let runtime = Arc::new(NodeRuntime::new(registry, runtime_config));
    let signals = OsSignals::new().context("Failed to install signal handlers")?;

    info!("Node is running. Press Ctrl+C to stop.");
    match runtime.start(Box::new(signals)).await {
        Ok(()) => {}
        Err(RuntimeError::ServiceStartup(errors)) => {
            warn!("{} service(s) failed to start during this run", errors.len());
        }
        Err(e) => return Err(e).context("Node runtime failed"),
    }

    container.feed.close();
    Ok(())
}
