//! Compile audit events
//!
//! Structured, JSON-serialized records of each compilation's lifecycle,
//! emitted through the `log` facade under the `snippetbox::audit` target so
//! operators can route them separately from diagnostic logging.
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::SystemTime;
use uuid::Uuid;

/// Log target for audit records
pub const AUDIT_TARGET: &str = "snippetbox::audit";

/// Audit event severity levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AuditSeverity {
    High,
    Medium,
    Low,
}

/// Types of events we record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CompileEventType {
    CompileStart,
    CompileEnd,
    CleanupFailure,
    StaleSweep,
}

impl CompileEventType {
    pub fn default_severity(&self) -> AuditSeverity {
        match self {
            CompileEventType::CompileStart => AuditSeverity::Low,
            CompileEventType::CompileEnd => AuditSeverity::Low,
            CompileEventType::CleanupFailure => AuditSeverity::High,
            CompileEventType::StaleSweep => AuditSeverity::Medium,
        }
    }
}

/// Correlation identifiers for one compilation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CorrelationIds {
    /// Unique request identifier
    pub request_id: String,
    /// Workspace identifier, once one has been allocated
    pub workspace_id: Option<String>,
}

impl CorrelationIds {
    pub fn new() -> Self {
        Self {
            request_id: Uuid::new_v4().to_string(),
            workspace_id: None,
        }
    }

    pub fn with_workspace(mut self, workspace_id: &str) -> Self {
        self.workspace_id = Some(workspace_id.to_string());
        self
    }
}

impl Default for CorrelationIds {
    fn default() -> Self {
        Self::new()
    }
}

/// One audit record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompileEvent {
    pub event_type: CompileEventType,
    pub severity: AuditSeverity,
    pub timestamp: SystemTime,
    pub correlation: Option<CorrelationIds>,
    pub message: String,
    #[serde(default, skip_serializing_if = "serde_json::Map::is_empty")]
    pub details: serde_json::Map<String, serde_json::Value>,
}

impl CompileEvent {
    pub fn new(event_type: CompileEventType, message: impl Into<String>) -> Self {
        Self {
            severity: event_type.default_severity(),
            event_type,
            timestamp: SystemTime::now(),
            correlation: None,
            message: message.into(),
            details: serde_json::Map::new(),
        }
    }

    pub fn with_correlation(mut self, correlation: &CorrelationIds) -> Self {
        self.correlation = Some(correlation.clone());
        self
    }

    pub fn with_detail(mut self, key: &str, value: impl Into<serde_json::Value>) -> Self {
        self.details.insert(key.to_string(), value.into());
        self
    }

    /// Write the event to the audit log target
    pub fn emit(&self) {
        let record = match serde_json::to_string(self) {
            Ok(json) => json,
            Err(e) => {
                log::error!(target: AUDIT_TARGET, "Failed to serialize audit event: {}", e);
                return;
            }
        };

        match self.severity {
            AuditSeverity::High => log::warn!(target: AUDIT_TARGET, "{}", record),
            AuditSeverity::Medium => log::info!(target: AUDIT_TARGET, "{}", record),
            AuditSeverity::Low => log::debug!(target: AUDIT_TARGET, "{}", record),
        }
    }
}

/// Convenience constructors for the events the service emits
pub mod events {
    use super::*;

    pub fn compile_start(correlation: &CorrelationIds, source_bytes: usize) {
        CompileEvent::new(CompileEventType::CompileStart, "Compilation started")
            .with_correlation(correlation)
            .with_detail("source_bytes", source_bytes)
            .emit();
    }

    pub fn compile_end(
        correlation: &CorrelationIds,
        diagnostic_count: usize,
        success: bool,
        elapsed_ms: u64,
    ) {
        CompileEvent::new(CompileEventType::CompileEnd, "Compilation finished")
            .with_correlation(correlation)
            .with_detail("diagnostic_count", diagnostic_count)
            .with_detail("success", success)
            .with_detail("elapsed_ms", elapsed_ms)
            .emit();
    }

    pub fn cleanup_failure(workspace_id: &str, path: &Path, error: &std::io::Error) {
        CompileEvent::new(
            CompileEventType::CleanupFailure,
            format!("Failed to remove {}", path.display()),
        )
        .with_detail("workspace_id", workspace_id)
        .with_detail("error", error.to_string())
        .emit();
    }

    pub fn stale_sweep(base_dir: &Path, removed: usize) {
        CompileEvent::new(CompileEventType::StaleSweep, "Swept stale workspace files")
            .with_detail("workspace_dir", base_dir.display().to_string())
            .with_detail("removed", removed)
            .emit();
    }
}
