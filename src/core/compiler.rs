use crate::compiler::backend::CompilerBackend;
use crate::compiler::languages::typescript::TscBackend;
use crate::config::config::SnippetConfig;
use crate::config::options::CompilerOptions;
use crate::config::types::{CompileResult, Result, SnippetError};
use crate::observability::audit::{events, CorrelationIds};
use crate::safety::workspace::{Workspace, WorkspaceManager};
use crate::translator;
use std::path::PathBuf;
use std::sync::OnceLock;
use std::time::Instant;

/// One-shot snippet compiler.
///
/// Every call stages the source in a fresh workspace, runs the backend once,
/// and releases the workspace before returning, whatever the outcome. The
/// only state shared between calls is the immutable option set.
pub struct SnippetCompiler<B: CompilerBackend = TscBackend> {
    workspaces: WorkspaceManager,
    backend: B,
    options: CompilerOptions,
}

impl<B: CompilerBackend> SnippetCompiler<B> {
    pub fn new(backend: B, options: CompilerOptions, workspace_dir: PathBuf) -> Self {
        let workspaces = WorkspaceManager::new(
            workspace_dir,
            backend.source_extension(),
            backend.output_extension(),
        );
        Self {
            workspaces,
            backend,
            options,
        }
    }

    pub fn options(&self) -> &CompilerOptions {
        &self.options
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn workspaces(&self) -> &WorkspaceManager {
        &self.workspaces
    }

    /// Compile `source`. Diagnostics come back inside the result; only
    /// staging, launch, and artifact faults are errors.
    pub fn compile(&self, source: &str) -> Result<CompileResult> {
        let started = Instant::now();
        let correlation = CorrelationIds::new();

        // Released on drop if anything below returns early or panics
        let mut workspace = match self.workspaces.allocate(source) {
            Ok(workspace) => workspace,
            Err(e) => {
                log::error!(
                    "Compilation {} could not stage its source: {}",
                    correlation.request_id,
                    e
                );
                return Err(e);
            }
        };
        let correlation = correlation.with_workspace(workspace.id());
        events::compile_start(&correlation, source.len());

        let result = self.compile_in(&workspace);
        workspace.release();

        match &result {
            Ok(compiled) => events::compile_end(
                &correlation,
                compiled.compilation_errors.len(),
                compiled.is_success(),
                started.elapsed().as_millis() as u64,
            ),
            Err(e) => log::error!(
                "Compilation {} failed: {}",
                correlation.request_id,
                e
            ),
        }

        result
    }

    fn compile_in(&self, workspace: &Workspace) -> Result<CompileResult> {
        let invocation = self.backend.invoke(
            workspace.source_path(),
            workspace.output_path(),
            &self.options,
        )?;

        let compilation_errors = translator::translate_all(&invocation.diagnostics);
        if !compilation_errors.is_empty() {
            return Ok(CompileResult::failure(compilation_errors));
        }

        if !invocation.emitted {
            log::warn!(
                "{} reported no diagnostics and no artifact for workspace {}",
                self.backend.name(),
                workspace.id()
            );
        }

        let compiled_code = std::fs::read_to_string(workspace.output_path()).map_err(|e| {
            SnippetError::ArtifactRead {
                path: workspace.output_path().to_path_buf(),
                source: e,
            }
        })?;

        Ok(CompileResult::success(compiled_code))
    }
}

impl SnippetCompiler<TscBackend> {
    /// Build a tsc-backed compiler from service configuration
    pub fn from_config(config: &SnippetConfig) -> Result<Self> {
        let options = config.compiler_options()?;
        Ok(Self::new(
            TscBackend::new(config.compiler.clone()),
            options,
            config.workspace_dir.clone(),
        ))
    }
}

static GLOBAL_COMPILER: OnceLock<SnippetCompiler> = OnceLock::new();

/// Install the process-wide compiler. Fails if one is already installed.
pub fn init(config: &SnippetConfig) -> Result<&'static SnippetCompiler> {
    let compiler = SnippetCompiler::from_config(config)?;
    GLOBAL_COMPILER
        .set(compiler)
        .map_err(|_| SnippetError::Config("snippet compiler already initialized".to_string()))?;
    global()
}

/// Process-wide compiler, built from `SnippetConfig::load_default` if
/// [`init`] was never called.
pub fn global() -> Result<&'static SnippetCompiler> {
    if let Some(compiler) = GLOBAL_COMPILER.get() {
        return Ok(compiler);
    }

    let compiler = SnippetCompiler::from_config(&SnippetConfig::load_default()?)?;
    // A concurrent first caller may win; either instance is equivalent.
    let _ = GLOBAL_COMPILER.set(compiler);
    GLOBAL_COMPILER
        .get()
        .ok_or_else(|| SnippetError::Config("snippet compiler unavailable".to_string()))
}

/// Compile one snippet with the process-wide compiler
pub fn compile_snippet(source: &str) -> Result<CompileResult> {
    global()?.compile(source)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::backend::Invocation;
    use crate::compiler::diagnostic::{
        Anchor, DiagnosticCategory, MessageChain, Phase, RawDiagnostic,
    };
    use std::path::Path;
    use std::sync::Mutex;

    /// Compiles `let` to `var`; a line containing `!!` is a syntax error.
    #[derive(Default)]
    struct ScriptedBackend {
        seen: Mutex<Vec<PathBuf>>,
    }

    impl CompilerBackend for ScriptedBackend {
        fn name(&self) -> &'static str {
            "scripted"
        }

        fn source_extension(&self) -> &'static str {
            "ts"
        }

        fn output_extension(&self) -> &'static str {
            "js"
        }

        fn invoke(
            &self,
            source_path: &Path,
            output_path: &Path,
            _options: &CompilerOptions,
        ) -> Result<Invocation> {
            self.seen.lock().unwrap().push(source_path.to_path_buf());
            let source = std::fs::read_to_string(source_path)?;

            let diagnostics: Vec<RawDiagnostic> = source
                .lines()
                .enumerate()
                .filter_map(|(line, text)| {
                    text.find("!!").map(|col| RawDiagnostic {
                        category: DiagnosticCategory::Error,
                        code: 1005,
                        phase: Phase::PreEmit,
                        anchor: Some(Anchor {
                            file: source_path.to_path_buf(),
                            line: line as u32,
                            character: col as u32,
                        }),
                        message: MessageChain::new("';' expected."),
                    })
                })
                .collect();

            std::fs::write(output_path, source.replace("let ", "var "))?;
            Ok(Invocation::new(diagnostics, true))
        }
    }

    /// Reports success without writing anything
    struct SilentBackend;

    impl CompilerBackend for SilentBackend {
        fn name(&self) -> &'static str {
            "silent"
        }

        fn source_extension(&self) -> &'static str {
            "ts"
        }

        fn output_extension(&self) -> &'static str {
            "js"
        }

        fn invoke(&self, _: &Path, _: &Path, _: &CompilerOptions) -> Result<Invocation> {
            Ok(Invocation::new(Vec::new(), false))
        }
    }

    struct BrokenBackend;

    impl CompilerBackend for BrokenBackend {
        fn name(&self) -> &'static str {
            "broken"
        }

        fn source_extension(&self) -> &'static str {
            "ts"
        }

        fn output_extension(&self) -> &'static str {
            "js"
        }

        fn invoke(&self, _: &Path, output_path: &Path, _: &CompilerOptions) -> Result<Invocation> {
            std::fs::write(output_path, "partial")?;
            Err(SnippetError::Compiler("tsc crashed".to_string()))
        }
    }

    /// Leaves a non-empty directory where the artifact belongs, so release
    /// cannot delete it
    struct SquattingBackend;

    impl CompilerBackend for SquattingBackend {
        fn name(&self) -> &'static str {
            "squatting"
        }

        fn source_extension(&self) -> &'static str {
            "ts"
        }

        fn output_extension(&self) -> &'static str {
            "js"
        }

        fn invoke(&self, _: &Path, output_path: &Path, _: &CompilerOptions) -> Result<Invocation> {
            std::fs::create_dir_all(output_path)?;
            std::fs::write(output_path.join("lock"), "")?;
            let diagnostic = RawDiagnostic {
                category: DiagnosticCategory::Error,
                code: 2304,
                phase: Phase::PreEmit,
                anchor: None,
                message: MessageChain::new("Cannot find name 'y'."),
            };
            Ok(Invocation::new(vec![diagnostic], false))
        }
    }

    fn compiler<B: CompilerBackend>(backend: B, dir: &Path) -> SnippetCompiler<B> {
        SnippetCompiler::new(backend, CompilerOptions::default(), dir.join("ws"))
    }

    fn residual_files(compiler: &SnippetCompiler<impl CompilerBackend>) -> usize {
        std::fs::read_dir(compiler.workspaces().base_dir())
            .map(|entries| entries.count())
            .unwrap_or(0)
    }

    #[test]
    fn test_success_returns_artifact() {
        let dir = tempfile::tempdir().unwrap();
        let compiler = compiler(ScriptedBackend::default(), dir.path());

        let result = compiler.compile("let x = 5;").unwrap();
        assert!(result.compilation_errors.is_empty());
        assert_eq!(result.compiled_code.as_deref(), Some("var x = 5;"));
        assert_eq!(residual_files(&compiler), 0);
    }

    #[test]
    fn test_diagnostics_suppress_artifact() {
        let dir = tempfile::tempdir().unwrap();
        let compiler = compiler(ScriptedBackend::default(), dir.path());

        let result = compiler.compile("let x = 5;\nlet y !! 6;").unwrap();
        assert_eq!(
            result.compilation_errors,
            vec!["(on line 2, at position 7): ';' expected."]
        );
        assert!(result.compiled_code.is_none());
        assert_eq!(residual_files(&compiler), 0);
    }

    #[test]
    fn test_empty_source_compiles() {
        let dir = tempfile::tempdir().unwrap();
        let compiler = compiler(ScriptedBackend::default(), dir.path());

        let result = compiler.compile("").unwrap();
        assert_eq!(result, CompileResult::success(String::new()));
    }

    #[test]
    fn test_backend_sees_workspace_source() {
        let dir = tempfile::tempdir().unwrap();
        let compiler = compiler(ScriptedBackend::default(), dir.path());

        compiler.compile("let a = 1;").unwrap();
        let seen = compiler.backend().seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].parent(), Some(compiler.workspaces().base_dir()));
        assert!(!seen[0].exists());
    }

    #[test]
    fn test_missing_artifact_is_internal_fault() {
        let dir = tempfile::tempdir().unwrap();
        let compiler = compiler(SilentBackend, dir.path());

        let err = compiler.compile("let x = 5;").unwrap_err();
        assert!(matches!(err, SnippetError::ArtifactRead { .. }));
        assert_eq!(residual_files(&compiler), 0);
    }

    #[test]
    fn test_backend_error_propagates_and_cleans_up() {
        let dir = tempfile::tempdir().unwrap();
        let compiler = compiler(BrokenBackend, dir.path());

        let err = compiler.compile("let x = 5;").unwrap_err();
        assert!(matches!(err, SnippetError::Compiler(_)));
        assert_eq!(residual_files(&compiler), 0);
    }

    #[test]
    fn test_cleanup_failure_keeps_result() {
        let dir = tempfile::tempdir().unwrap();
        let compiler = compiler(SquattingBackend, dir.path());

        let result = compiler.compile("y;").unwrap();
        assert_eq!(result.compilation_errors, vec!["Cannot find name 'y'."]);
        assert!(result.compiled_code.is_none());

        // Only the undeletable directory survives; the source is gone
        let leftovers: Vec<PathBuf> = std::fs::read_dir(compiler.workspaces().base_dir())
            .unwrap()
            .map(|entry| entry.unwrap().path())
            .collect();
        assert_eq!(leftovers.len(), 1);
        assert!(leftovers[0].is_dir());
    }

    #[test]
    fn test_staging_failure_is_workspace_write() {
        let dir = tempfile::tempdir().unwrap();
        // A regular file where the workspace directory should go
        std::fs::write(dir.path().join("ws"), "").unwrap();
        let compiler = compiler(ScriptedBackend::default(), dir.path());

        let err = compiler.compile("let x = 5;").unwrap_err();
        assert!(matches!(err, SnippetError::WorkspaceWrite { .. }));
        assert!(compiler.backend().seen.lock().unwrap().is_empty());
    }

    #[test]
    fn test_identical_sources_compile_identically() {
        let dir = tempfile::tempdir().unwrap();
        let compiler = compiler(ScriptedBackend::default(), dir.path());

        let first = compiler.compile("let x = 5;\nlet y !! 1;").unwrap();
        let second = compiler.compile("let x = 5;\nlet y !! 1;").unwrap();
        assert_eq!(first, second);
        assert_eq!(compiler.backend().seen.lock().unwrap().len(), 2);
    }

    #[test]
    fn test_global_compiler_initializes_once() {
        let dir = tempfile::tempdir().unwrap();
        let config = SnippetConfig {
            workspace_dir: dir.path().join("global"),
            compiler: "/nonexistent/tsc".to_string(),
            ..SnippetConfig::default()
        };

        let installed = init(&config).unwrap();
        assert_eq!(installed.backend().executable(), "/nonexistent/tsc");
        assert!(std::ptr::eq(installed, global().unwrap()));

        let err = init(&config).err().unwrap();
        assert!(matches!(err, SnippetError::Config(_)));

        // Launch failure is fatal and leaves no files behind
        let err = compile_snippet("let x = 1;").unwrap_err();
        assert!(matches!(err, SnippetError::Compiler(_)));
        assert_eq!(std::fs::read_dir(dir.path().join("global")).unwrap().count(), 0);
    }

    #[test]
    fn test_concurrent_calls_stay_paired() {
        let dir = tempfile::tempdir().unwrap();
        let compiler = compiler(ScriptedBackend::default(), dir.path());

        std::thread::scope(|scope| {
            let handles: Vec<_> = (0..24)
                .map(|i| {
                    let compiler = &compiler;
                    scope.spawn(move || {
                        let source = if i % 3 == 0 {
                            format!("let v{} !! {};", i, i)
                        } else {
                            format!("let v{} = {};", i, i)
                        };
                        (i, compiler.compile(&source).unwrap())
                    })
                })
                .collect();

            for handle in handles {
                let (i, result) = handle.join().unwrap();
                if i % 3 == 0 {
                    assert_eq!(result.compilation_errors.len(), 1);
                    assert!(result.compiled_code.is_none());
                } else {
                    assert_eq!(
                        result.compiled_code,
                        Some(format!("var v{} = {};", i, i))
                    );
                }
            }
        });

        assert_eq!(residual_files(&compiler), 0);
    }
}
