//! Workspace management for request-scoped compiler files
//!
//! Each compilation stages its input and receives its output through a pair of
//! files named after a random identifier. The name is reserved with an
//! exclusive create, so two live requests can never share a workspace.
use crate::config::types::{Result, SnippetError};
use crate::observability::audit::events;
use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

/// Length of the random workspace identifier
pub const WORKSPACE_ID_LEN: usize = 20;

/// Fresh identifiers tried before giving up on a reservation
const MAX_RESERVE_ATTEMPTS: usize = 8;

/// Source/output file pair owned by one compilation.
///
/// Dropping the workspace releases it.
#[derive(Debug)]
pub struct Workspace {
    id: String,
    source_path: PathBuf,
    output_path: PathBuf,
    released: bool,
}

impl Workspace {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn source_path(&self) -> &Path {
        &self.source_path
    }

    pub fn output_path(&self) -> &Path {
        &self.output_path
    }

    /// Delete every file named after this workspace (idempotent, never fails)
    ///
    /// Besides the source/output pair this covers side outputs the compiler
    /// may write next to them, such as `<id>.js.map` or `<id>.d.ts`.
    pub fn release(&mut self) {
        if self.released {
            return;
        }
        self.released = true;

        remove_quietly(&self.id, &self.source_path);
        remove_quietly(&self.id, &self.output_path);
        self.remove_side_outputs();
    }

    fn remove_side_outputs(&self) {
        let Some(dir) = self.source_path.parent() else {
            return;
        };
        let entries = match fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(e) => {
                log::warn!("Failed to scan {} for side outputs: {}", dir.display(), e);
                return;
            }
        };

        let prefix = format!("{}.", self.id);
        for entry in entries.flatten() {
            let owned = entry
                .file_name()
                .to_str()
                .map(|name| name.starts_with(&prefix))
                .unwrap_or(false);
            if owned {
                remove_quietly(&self.id, &entry.path());
            }
        }
    }
}

impl Drop for Workspace {
    fn drop(&mut self) {
        self.release();
    }
}

fn remove_quietly(workspace_id: &str, path: &Path) {
    match fs::remove_file(path) {
        Ok(()) => log::trace!("Removed workspace file {}", path.display()),
        Err(e) if e.kind() == ErrorKind::NotFound => {}
        Err(e) => {
            log::warn!("Failed to remove workspace file {}: {}", path.display(), e);
            events::cleanup_failure(workspace_id, path, &e);
        }
    }
}

fn generate_id() -> String {
    std::iter::repeat_with(fastrand::alphanumeric)
        .take(WORKSPACE_ID_LEN)
        .collect()
}

/// Allocates workspaces under one base directory
#[derive(Debug, Clone)]
pub struct WorkspaceManager {
    base_dir: PathBuf,
    source_extension: &'static str,
    output_extension: &'static str,
}

impl WorkspaceManager {
    /// The base directory is created lazily on first allocation.
    pub fn new(
        base_dir: PathBuf,
        source_extension: &'static str,
        output_extension: &'static str,
    ) -> Self {
        Self {
            base_dir,
            source_extension,
            output_extension,
        }
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Reserve a workspace and write `source` verbatim into its source file
    pub fn allocate(&self, source: &str) -> Result<Workspace> {
        self.allocate_with(source, generate_id)
    }

    fn allocate_with(&self, source: &str, mut next_id: impl FnMut() -> String) -> Result<Workspace> {
        // create_dir_all tolerates a concurrent creator winning the race
        fs::create_dir_all(&self.base_dir).map_err(|e| SnippetError::WorkspaceWrite {
            path: self.base_dir.clone(),
            source: e,
        })?;

        for _ in 0..MAX_RESERVE_ATTEMPTS {
            let id = next_id();
            let source_path = self.path_for(&id, self.source_extension);

            let mut file = match OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&source_path)
            {
                Ok(file) => file,
                Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                    log::debug!("Workspace id {} already taken, drawing another", id);
                    continue;
                }
                Err(e) => {
                    return Err(SnippetError::WorkspaceWrite {
                        path: source_path,
                        source: e,
                    })
                }
            };

            let workspace = Workspace {
                output_path: self.path_for(&id, self.output_extension),
                id,
                source_path,
                released: false,
            };

            // Leftover artifact from a call that died before releasing
            if let Err(e) = fs::remove_file(&workspace.output_path) {
                if e.kind() != ErrorKind::NotFound {
                    log::warn!(
                        "Stale artifact {} cannot be removed ({}), drawing another id",
                        workspace.output_path.display(),
                        e
                    );
                    continue;
                }
            }

            file.write_all(source.as_bytes())
                .map_err(|e| SnippetError::WorkspaceWrite {
                    path: workspace.source_path.clone(),
                    source: e,
                })?;

            log::debug!("Allocated workspace {}", workspace.id);
            return Ok(workspace);
        }

        Err(SnippetError::WorkspaceWrite {
            path: self.base_dir.clone(),
            source: std::io::Error::new(
                ErrorKind::AlreadyExists,
                format!(
                    "no free workspace name after {} attempts",
                    MAX_RESERVE_ATTEMPTS
                ),
            ),
        })
    }

    fn path_for(&self, id: &str, extension: &str) -> PathBuf {
        self.base_dir.join(format!("{}.{}", id, extension))
    }

    /// `<id>.<anything>`, so side outputs like `<id>.js.map` count too
    fn is_workspace_file(&self, name: &str) -> bool {
        let Some((id, extension)) = name.split_once('.') else {
            return false;
        };

        !extension.is_empty()
            && id.len() == WORKSPACE_ID_LEN
            && id.chars().all(|c| c.is_ascii_alphanumeric())
    }

    /// Remove orphaned workspace files older than `max_age`
    pub fn sweep_stale(&self, max_age: Duration) -> Result<usize> {
        let mut cleaned = 0;
        let now = SystemTime::now();

        if !self.base_dir.exists() {
            return Ok(0);
        }

        let entries = fs::read_dir(&self.base_dir).map_err(|e| {
            SnippetError::Io(std::io::Error::new(
                e.kind(),
                format!(
                    "Failed to read workspace directory {}: {}",
                    self.base_dir.display(),
                    e
                ),
            ))
        })?;

        for entry in entries {
            let entry = match entry {
                Ok(e) => e,
                Err(e) => {
                    log::warn!("Failed to read directory entry: {}", e);
                    continue;
                }
            };

            let path = entry.path();
            let is_candidate = path
                .file_name()
                .and_then(|name| name.to_str())
                .map(|name| self.is_workspace_file(name))
                .unwrap_or(false);
            if !is_candidate || !path.is_file() {
                continue;
            }

            let modified = match entry.metadata().and_then(|m| m.modified()) {
                Ok(m) => m,
                Err(e) => {
                    log::warn!("Failed to get modified time for {}: {}", path.display(), e);
                    continue;
                }
            };

            let age = match now.duration_since(modified) {
                Ok(d) => d,
                Err(_) => continue, // Future timestamp, skip
            };

            if age >= max_age {
                match fs::remove_file(&path) {
                    Ok(()) => {
                        log::info!("Swept stale workspace file: {}", path.display());
                        cleaned += 1;
                    }
                    Err(e) => log::warn!("Failed to sweep {}: {}", path.display(), e),
                }
            }
        }

        events::stale_sweep(&self.base_dir, cleaned);
        Ok(cleaned)
    }
}
