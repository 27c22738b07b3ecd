//! Snippet compilation core.
//!
//! Orchestrates workspace staging, compiler invocation, diagnostic
//! translation, and result assembly for one request at a time.

pub mod compiler;

pub use compiler::{compile_snippet, global, init, SnippetCompiler};
