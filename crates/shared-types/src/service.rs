//! # Service Trait
//!
//! Defines the contract every long-lived background unit of the node
//! implements so the registry can start and stop it.
//!
//! ## Lifecycle
//!
//! - `start()` returns as soon as background work has been spawned. It must
//!   never block the registry waiting for that work.
//! - `stop()` signals the background work to end and waits until it has
//!   acknowledged. Errors are reported to the registry, which keeps stopping
//!   the remaining services regardless.
//!
//! ## Example Implementation
//!
//! ```rust,ignore
//! use shared_types::{Service, ServiceError, ServiceStatus};
//! use async_trait::async_trait;
//!
//! pub struct Notary { /* ... */ }
//!
//! #[async_trait]
//! impl Service for Notary {
//!     fn name(&self) -> &'static str { "notary" }
//!     async fn start(&self) -> Result<(), ServiceError> { Ok(()) }
//!     async fn stop(&self) -> Result<(), ServiceError> { Ok(()) }
//!     fn status(&self) -> ServiceStatus { ServiceStatus::Running }
//! }
//! ```

use async_trait::async_trait;
use std::fmt;

/// Error type for service lifecycle operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceError {
    /// Name of the service that failed.
    pub service: &'static str,
    /// Error kind.
    pub kind: ServiceErrorKind,
    /// Human-readable error message.
    pub message: String,
}

impl ServiceError {
    /// Create a new error.
    pub fn new(service: &'static str, kind: ServiceErrorKind, message: impl Into<String>) -> Self {
        Self {
            service,
            kind,
            message: message.into(),
        }
    }

    /// Shorthand for a failed `start()`.
    pub fn startup(service: &'static str, message: impl Into<String>) -> Self {
        Self::new(service, ServiceErrorKind::StartupFailed, message)
    }

    /// Shorthand for a failed `stop()`.
    pub fn shutdown(service: &'static str, message: impl Into<String>) -> Self {
        Self::new(service, ServiceErrorKind::ShutdownFailed, message)
    }
}

impl fmt::Display for ServiceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.service, self.kind, self.message)
    }
}

impl std::error::Error for ServiceError {}

/// Categories of service errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceErrorKind {
    /// The service could not spawn its background work.
    StartupFailed,
    /// The service did not shut down cleanly.
    ShutdownFailed,
}

impl fmt::Display for ServiceErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::StartupFailed => write!(f, "StartupFailed"),
            Self::ShutdownFailed => write!(f, "ShutdownFailed"),
        }
    }
}

/// Status of a service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceStatus {
    /// Registered but not started.
    Registered,
    /// Background work is running.
    Running,
    /// Running, but part of its work has terminated (e.g. a lost subscription).
    Degraded,
    /// Stopped gracefully.
    Stopped,
    /// Start or stop failed.
    Failed,
}

/// The core trait that all node services implement.
#[async_trait]
pub trait Service: Send + Sync {
    /// Name used in logs and status reports.
    fn name(&self) -> &'static str;

    /// Spawn the service's background work and return immediately.
    async fn start(&self) -> Result<(), ServiceError>;

    /// Signal the background work to end and wait for it to acknowledge.
    async fn stop(&self) -> Result<(), ServiceError>;

    /// Current status as seen by the service itself.
    fn status(&self) -> ServiceStatus;
}
