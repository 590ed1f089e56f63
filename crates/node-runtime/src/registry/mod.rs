//! # Service Registry
//!
//! Owns the node's long-lived services and starts/stops them as one unit.
//!
//! ## Ordering
//!
//! Services are kept in registration order. `start_all` and `stop_all` both
//! walk that order. Neither stops at the first failure: every service gets
//! its `start`/`stop` call and all errors are returned together.
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │               ServiceRegistry                │
//! │                                              │
//! │  [0] syncer ──► [1] simulator ──► [2] ...    │
//! │                                              │
//! │  start_all: 0, 1, 2 ...   stop_all: 0, 1 ... │
//! └──────────────────────────────────────────────┘
//! ```

use std::sync::Arc;

use parking_lot::RwLock;
use shared_types::{Service, ServiceError, ServiceStatus};
use tracing::{error, info};

struct Entry {
    service: Arc<dyn Service>,
    status: ServiceStatus,
}

/// The central service registry.
#[derive(Default)]
pub struct ServiceRegistry {
    entries: RwLock<Vec<Entry>>,
}

impl ServiceRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a service. It is not started until `start_all`.
    pub fn register(&self, service: Arc<dyn Service>) {
        info!("[Registry] Registering service: {}", service.name());
        self.entries.write().push(Entry {
            service,
            status: ServiceStatus::Registered,
        });
    }

    /// Number of registered services.
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Whether no service is registered.
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Start every service in registration order.
    pub async fn start_all(&self) -> Result<(), Vec<ServiceError>> {
        let mut errors = Vec::new();

        for (index, service) in self.snapshot().into_iter().enumerate() {
            info!("[Registry] Starting {}", service.name());

            let status = match service.start().await {
                Ok(()) => ServiceStatus::Running,
                Err(e) => {
                    error!("[Registry] Failed to start {}: {}", service.name(), e);
                    errors.push(e);
                    ServiceStatus::Failed
                }
            };
            self.set_status(index, status);
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// Stop every service in registration order.
    ///
    /// A failing `stop` is logged and collected; the remaining services are
    /// still stopped.
    pub async fn stop_all(&self) -> Result<(), Vec<ServiceError>> {
        let mut errors = Vec::new();

        for (index, service) in self.snapshot().into_iter().enumerate() {
            info!("[Registry] Stopping {}", service.name());

            let status = match service.stop().await {
                Ok(()) => ServiceStatus::Stopped,
                Err(e) => {
                    error!("[Registry] Failed to stop {}: {}", service.name(), e);
                    errors.push(e);
                    ServiceStatus::Failed
                }
            };
            self.set_status(index, status);
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// Status of every service, in registration order.
    ///
    /// A failure recorded by the registry wins; otherwise the service's own
    /// report is used, so a running service that lost its subscription shows
    /// up as `Degraded`.
    pub fn statuses(&self) -> Vec<(&'static str, ServiceStatus)> {
        self.entries
            .read()
            .iter()
            .map(|entry| {
                let status = match entry.status {
                    ServiceStatus::Failed => ServiceStatus::Failed,
                    _ => entry.service.status(),
                };
                (entry.service.name(), status)
            })
            .collect()
    }

    /// Print registry status.
    pub fn print_status(&self) {
        info!("===========================================");
        info!("  SERVICE REGISTRY STATUS");
        info!("===========================================");

        for (name, state) in self.statuses() {
            let icon = match state {
                ServiceStatus::Running => "✅",
                ServiceStatus::Degraded => "⚠️ ",
                ServiceStatus::Failed => "❌",
                ServiceStatus::Stopped => "⏹️ ",
                ServiceStatus::Registered => "⏳",
            };
            info!("  {} {:30} {:?}", icon, name, state);
        }

        info!("===========================================");
    }

    fn snapshot(&self) -> Vec<Arc<dyn Service>> {
        self.entries
            .read()
            .iter()
            .map(|entry| Arc::clone(&entry.service))
            .collect()
    }

    fn set_status(&self, index: usize, status: ServiceStatus) {
        if let Some(entry) = self.entries.write().get_mut(index) {
            entry.status = status;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use parking_lot::Mutex;

    /// Records every lifecycle call into a shared journal.
    struct Recording {
        name: &'static str,
        journal: Arc<Mutex<Vec<String>>>,
        fail_start: bool,
        fail_stop: bool,
        status: RwLock<ServiceStatus>,
    }

    impl Recording {
        fn new(name: &'static str, journal: &Arc<Mutex<Vec<String>>>) -> Self {
            Self {
                name,
                journal: Arc::clone(journal),
                fail_start: false,
                fail_stop: false,
                status: RwLock::new(ServiceStatus::Registered),
            }
        }
    }

    #[async_trait]
    impl Service for Recording {
        fn name(&self) -> &'static str {
            self.name
        }

        async fn start(&self) -> Result<(), ServiceError> {
            self.journal.lock().push(format!("start:{}", self.name));
            if self.fail_start {
                return Err(ServiceError::startup(self.name, "boom"));
            }
            *self.status.write() = ServiceStatus::Running;
            Ok(())
        }

        async fn stop(&self) -> Result<(), ServiceError> {
            self.journal.lock().push(format!("stop:{}", self.name));
            if self.fail_stop {
                return Err(ServiceError::shutdown(self.name, "stuck"));
            }
            *self.status.write() = ServiceStatus::Stopped;
            Ok(())
        }

        fn status(&self) -> ServiceStatus {
            *self.status.read()
        }
    }

    fn registry_of(services: Vec<Recording>) -> ServiceRegistry {
        let registry = ServiceRegistry::new();
        for service in services {
            registry.register(Arc::new(service));
        }
        registry
    }

    #[tokio::test]
    async fn test_start_and_stop_in_registration_order() {
        let journal = Arc::new(Mutex::new(Vec::new()));
        let registry = registry_of(vec![
            Recording::new("c", &journal),
            Recording::new("a", &journal),
            Recording::new("b", &journal),
        ]);

        registry.start_all().await.unwrap();
        registry.stop_all().await.unwrap();

        assert_eq!(
            *journal.lock(),
            vec!["start:c", "start:a", "start:b", "stop:c", "stop:a", "stop:b"]
        );
    }

    #[tokio::test]
    async fn test_stop_all_is_best_effort() {
        let journal = Arc::new(Mutex::new(Vec::new()));
        let mut first = Recording::new("first", &journal);
        first.fail_stop = true;
        let registry = registry_of(vec![first, Recording::new("second", &journal)]);

        registry.start_all().await.unwrap();
        let errors = registry.stop_all().await.unwrap_err();

        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].service, "first");
        assert_eq!(
            *journal.lock(),
            vec!["start:first", "start:second", "stop:first", "stop:second"]
        );
        assert_eq!(
            registry.statuses(),
            vec![
                ("first", ServiceStatus::Failed),
                ("second", ServiceStatus::Stopped)
            ]
        );
    }

    #[tokio::test]
    async fn test_start_all_collects_failures() {
        let journal = Arc::new(Mutex::new(Vec::new()));
        let mut broken = Recording::new("broken", &journal);
        broken.fail_start = true;
        let registry = registry_of(vec![broken, Recording::new("healthy", &journal)]);

        let errors = registry.start_all().await.unwrap_err();

        assert_eq!(errors.len(), 1);
        assert_eq!(
            registry.statuses(),
            vec![
                ("broken", ServiceStatus::Failed),
                ("healthy", ServiceStatus::Running)
            ]
        );
    }

    #[tokio::test]
    async fn test_empty_registry() {
        let registry = ServiceRegistry::new();
        assert!(registry.is_empty());
        assert!(registry.start_all().await.is_ok());
        assert!(registry.stop_all().await.is_ok());
        assert!(registry.statuses().is_empty());
    }

    #[test]
    fn test_register_keeps_order() {
        let journal = Arc::new(Mutex::new(Vec::new()));
        let registry = registry_of(vec![
            Recording::new("x", &journal),
            Recording::new("y", &journal),
        ]);

        assert_eq!(registry.len(), 2);
        let names: Vec<_> = registry.statuses().into_iter().map(|(n, _)| n).collect();
        assert_eq!(names, vec!["x", "y"]);
        assert!(journal.lock().is_empty());
    }
}
