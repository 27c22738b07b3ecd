//! snippetbox: one-shot TypeScript snippet transpilation
//! Compiles a single in-memory source blob through an external `tsc`
//! toolchain and returns either the emitted JavaScript or the diagnostics.
//!
//! # Architecture
//!
//! ## Workspaces ([`safety`])
//! - [`safety::workspace`]: exclusively reserved source/output file pairs,
//!   released on every exit path
//!
//! ## Compiler Invocation ([`compiler`])
//! - [`compiler::backend`]: backend contract (one file, one option set, one emit)
//! - [`compiler::diagnostic`]: raw diagnostic records with 0-based anchors
//! - [`compiler::languages`]: the `tsc` binding and its output parser
//!
//! ## Diagnostic Translation ([`translator`])
//! - position-annotated, flattened diagnostic strings
//!
//! ## Result Assembly ([`core`])
//! - [`core::compiler`]: per-request orchestration and the process-wide compiler
//!
//! ## Configuration ([`config`])
//! - [`config::config`]: `snippetbox.json` loading
//! - [`config::options`]: static compiler option set
//! - [`config::types`]: result and error types
//!
//! ## Observability ([`observability`])
//! - [`observability::audit`]: structured compile lifecycle events
//!
//! # Usage
//!
//! ```no_run
//! let result = snippetbox::compile_snippet("let x: number = 5;")?;
//! assert!(result.compilation_errors.is_empty());
//! # Ok::<(), snippetbox::SnippetError>(())
//! ```

// Request-scoped workspaces
pub mod safety;

// Compiler backends
pub mod compiler;

// Diagnostic rendering
pub mod translator;

// Result assembly
pub mod core;

// Configuration
pub mod config;

// Observability
pub mod observability;

// CLI entrypoint wiring for the snippetbox binary.
pub mod cli;

pub use config::types::*;
pub use crate::core::{compile_snippet, SnippetCompiler};
