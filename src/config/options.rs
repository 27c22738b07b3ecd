//! Static compiler option set
//!
//! Options come from a tsconfig-style JSON document and are handed to the
//! compiler backend untouched. The service never interprets individual option
//! semantics; it only knows how to load them.
use crate::config::types::{Result, SnippetError};
use serde::Deserialize;
use serde_json::{Map, Value};
use std::path::Path;

/// Default option set compiled into the binary
const BUILTIN_TSCONFIG: &str = include_str!("../../tsconfig.json");

#[derive(Debug, Deserialize)]
struct TsConfigDocument {
    #[serde(rename = "compilerOptions", default)]
    compiler_options: Map<String, Value>,
}

/// Read-only compiler options, shared by every request.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CompilerOptions {
    entries: Map<String, Value>,
}

impl CompilerOptions {
    /// Parse a tsconfig-style document; only `compilerOptions` is consumed.
    pub fn from_json_str(content: &str) -> Result<Self> {
        let document: TsConfigDocument = serde_json::from_str(content).map_err(|e| {
            SnippetError::Config(format!("Failed to parse compiler options JSON: {}", e))
        })?;

        Ok(Self {
            entries: document.compiler_options,
        })
    }

    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            SnippetError::Config(format!(
                "Failed to read compiler options file {}: {}",
                path.display(),
                e
            ))
        })?;

        let options = Self::from_json_str(&content)?;
        log::info!(
            "Loaded {} compiler options from {}",
            options.len(),
            path.display()
        );
        Ok(options)
    }

    /// Option set shipped with the crate
    pub fn builtin() -> Result<Self> {
        Self::from_json_str(BUILTIN_TSCONFIG)
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.entries.get(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_options_parse() {
        let options = CompilerOptions::builtin().unwrap();
        assert_eq!(options.get("target"), Some(&Value::from("es5")));
        assert_eq!(options.get("strict"), Some(&Value::Bool(true)));
    }

    #[test]
    fn test_missing_compiler_options_is_empty() {
        let options = CompilerOptions::from_json_str(r#"{"include": ["src"]}"#).unwrap();
        assert!(options.is_empty());
    }

    #[test]
    fn test_invalid_json_is_config_error() {
        let err = CompilerOptions::from_json_str("{ not json").unwrap_err();
        assert!(matches!(err, SnippetError::Config(_)));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tsconfig.json");
        std::fs::write(&path, r#"{"compilerOptions": {"target": "es2017"}}"#).unwrap();

        let options = CompilerOptions::load_from_file(&path).unwrap();
        assert_eq!(options.get("target"), Some(&Value::from("es2017")));
        assert_eq!(options.len(), 1);
    }

    #[test]
    fn test_load_missing_file_fails() {
        let err = CompilerOptions::load_from_file("/nonexistent/tsconfig.json").unwrap_err();
        assert!(err.to_string().contains("Failed to read compiler options file"));
    }
}
