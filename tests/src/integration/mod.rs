//! # Integration Flows
//!
//! Scenarios that span the peer feed, the shard-sync services and the node
//! runtime.

pub mod flows;
