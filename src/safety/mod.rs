//! Safety and cleanup
//!
//! Request-scoped workspaces with guaranteed best-effort release.

pub mod workspace;
