//! Core types shared across the snippetbox service
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

/// Outcome of one snippet compilation.
///
/// `compiled_code` is present if and only if `compilation_errors` is empty.
/// Construct through [`CompileResult::success`] or [`CompileResult::failure`]
/// so the pairing cannot drift.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompileResult {
    /// Human-readable diagnostics, in compiler order
    pub compilation_errors: Vec<String>,
    /// Emitted JavaScript, only when there were no diagnostics
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub compiled_code: Option<String>,
}

impl CompileResult {
    pub fn success(compiled_code: String) -> Self {
        Self {
            compilation_errors: Vec::new(),
            compiled_code: Some(compiled_code),
        }
    }

    /// Failure result; an empty diagnostic list is a caller bug.
    pub fn failure(compilation_errors: Vec<String>) -> Self {
        debug_assert!(!compilation_errors.is_empty());
        Self {
            compilation_errors,
            compiled_code: None,
        }
    }

    pub fn is_success(&self) -> bool {
        self.compilation_errors.is_empty()
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| SnippetError::Config(format!("Failed to serialize result: {}", e)))
    }
}

/// Result type for snippetbox operations
pub type Result<T> = std::result::Result<T, SnippetError>;

/// Errors that escape a compilation call.
///
/// Compiler diagnostics are not errors; they travel inside [`CompileResult`].
/// Cleanup failures never surface here either.
#[derive(Error, Debug)]
pub enum SnippetError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Failed to stage source at {path}: {source}")]
    WorkspaceWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Compiler error: {0}")]
    Compiler(String),

    #[error("Compiler reported no diagnostics but artifact {path} is unreadable: {source}")]
    ArtifactRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success_serializes_camel_case() {
        let result = CompileResult::success("var x = 5;\n".to_string());
        let value: serde_json::Value = serde_json::from_str(&result.to_json().unwrap()).unwrap();
        assert_eq!(value["compilationErrors"], serde_json::json!([]));
        assert_eq!(value["compiledCode"], "var x = 5;\n");
    }

    #[test]
    fn test_failure_omits_compiled_code() {
        let result = CompileResult::failure(vec!["boom".to_string()]);
        let json = result.to_json().unwrap();
        assert!(!json.contains("compiledCode"));
        assert!(!result.is_success());
    }
}
