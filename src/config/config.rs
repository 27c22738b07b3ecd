//! Service configuration loading from snippetbox.json
use crate::config::options::CompilerOptions;
use crate::config::types::{Result, SnippetError};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Name of the configuration file looked up in the current directory
pub const DEFAULT_CONFIG_FILE: &str = "snippetbox.json";

/// Full snippetbox.json structure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SnippetConfig {
    /// Directory holding per-request source/output file pairs
    pub workspace_dir: PathBuf,
    /// Compiler executable, resolved through PATH when not absolute
    pub compiler: String,
    /// tsconfig-style option file; the built-in set is used when absent
    pub compiler_options_file: Option<PathBuf>,
    /// Age after which orphaned workspace files may be swept
    pub stale_workspace_age_secs: u64,
}

impl Default for SnippetConfig {
    fn default() -> Self {
        Self {
            workspace_dir: Self::runtime_root_dir(),
            compiler: "tsc".to_string(),
            compiler_options_file: None,
            stale_workspace_age_secs: 3600,
        }
    }
}

impl SnippetConfig {
    /// UID-scoped default workspace root, so users never share temp files.
    pub fn runtime_root_dir() -> PathBuf {
        let euid = unsafe { libc::geteuid() };
        std::env::temp_dir().join(format!("snippetbox-uid-{}", euid))
    }

    /// Load configuration from a JSON file; missing fields take defaults.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let config_content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| SnippetError::Config(format!("Failed to read config file: {}", e)))?;

        let config: SnippetConfig = serde_json::from_str(&config_content)
            .map_err(|e| SnippetError::Config(format!("Failed to parse config JSON: {}", e)))?;

        Ok(config)
    }

    /// Load ./snippetbox.json when present, defaults otherwise
    pub fn load_default() -> Result<Self> {
        let config_path = std::env::current_dir()
            .map_err(|e| SnippetError::Config(format!("Failed to get current directory: {}", e)))?
            .join(DEFAULT_CONFIG_FILE);

        if !config_path.exists() {
            log::debug!("{} not found, using built-in defaults", DEFAULT_CONFIG_FILE);
            return Ok(Self::default());
        }

        Self::load_from_file(config_path)
    }

    /// Resolve the compiler option set this configuration points at
    pub fn compiler_options(&self) -> Result<CompilerOptions> {
        match &self.compiler_options_file {
            Some(path) => CompilerOptions::load_from_file(path),
            None => CompilerOptions::builtin(),
        }
    }

    pub fn stale_workspace_age(&self) -> Duration {
        Duration::from_secs(self.stale_workspace_age_secs)
    }
}
