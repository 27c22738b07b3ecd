//! Compiler invocation.
//!
//! The service stays toolchain-agnostic behind [`backend::CompilerBackend`].
//! Language bindings under [`languages`] know how to run a concrete compiler
//! and turn its output into [`diagnostic::RawDiagnostic`] records.

pub mod backend;
pub mod diagnostic;
pub mod languages;

pub use backend::{CompilerBackend, Invocation};
pub use languages::typescript::TscBackend;
