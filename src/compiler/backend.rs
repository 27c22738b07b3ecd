use crate::compiler::diagnostic::RawDiagnostic;
use crate::config::options::CompilerOptions;
use crate::config::types::Result;
use std::path::Path;

/// What one compiler run produced
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Invocation {
    /// Pre-emit diagnostics first, then emit diagnostics
    pub diagnostics: Vec<RawDiagnostic>,
    /// Whether an artifact exists at the output path
    pub emitted: bool,
}

impl Invocation {
    /// Order diagnostics by phase, keeping compiler order within a phase.
    pub fn new(mut diagnostics: Vec<RawDiagnostic>, emitted: bool) -> Self {
        // sort_by_key is stable
        diagnostics.sort_by_key(|d| d.phase);
        Self {
            diagnostics,
            emitted,
        }
    }
}

/// Compiler binding contract.
///
/// A backend compiles exactly one file against one option set with one emit
/// pass. It reports diagnostics and whether the artifact landed on disk, but
/// never reads the artifact itself.
pub trait CompilerBackend: Send + Sync {
    fn name(&self) -> &'static str;
    fn source_extension(&self) -> &'static str;
    fn output_extension(&self) -> &'static str;
    fn invoke(
        &self,
        source_path: &Path,
        output_path: &Path,
        options: &CompilerOptions,
    ) -> Result<Invocation>;
}
