//! Configuration
//!
//! Service configuration, the static compiler option set, and shared types.

pub mod config;
pub mod options;
pub mod types;
