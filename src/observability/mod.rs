//! Observability
//!
//! Structured audit events for the compile lifecycle.

pub mod audit;
