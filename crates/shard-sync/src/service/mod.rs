//! # Services
//!
//! The Synchronizer and Simulator, plus the error sink both rely on.

pub mod error_sink;
pub mod simulator;
pub mod syncer;

pub use error_sink::{drain_errors, error_channel, ErrorSink};
pub use simulator::{period_for_height, Simulator};
pub use syncer::{respond_collation_body, Synchronizer};
