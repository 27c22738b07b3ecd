use crate::compiler::backend::{CompilerBackend, Invocation};
use crate::compiler::languages::tsc_output;
use crate::config::options::CompilerOptions;
use crate::config::types::{Result, SnippetError};
use serde_json::Value;
use std::path::Path;
use std::process::{Command, Stdio};

/// Options that decide where artifacts land or switch tsc into project mode.
/// The workspace owns artifact placement, so these are never forwarded.
const WORKSPACE_MANAGED_OPTIONS: &[&str] = &[
    "outDir",
    "outFile",
    "out",
    "declarationDir",
    "project",
    "build",
    "watch",
    "incremental",
    "composite",
    "tsBuildInfoFile",
    "pretty",
];

/// Exit status when diagnostics were reported and emit was skipped
const EXIT_DIAGNOSTICS_OUTPUTS_SKIPPED: i32 = 1;
/// Exit status when diagnostics were reported and outputs were still written
const EXIT_DIAGNOSTICS_OUTPUTS_GENERATED: i32 = 2;

/// Runs the TypeScript compiler as an external process
#[derive(Debug, Clone)]
pub struct TscBackend {
    executable: String,
}

impl Default for TscBackend {
    fn default() -> Self {
        Self::new("tsc")
    }
}

impl TscBackend {
    pub fn new(executable: impl Into<String>) -> Self {
        Self {
            executable: executable.into(),
        }
    }

    pub fn executable(&self) -> &str {
        &self.executable
    }

    /// Render the option set as tsc command line flags
    pub fn option_flags(options: &CompilerOptions) -> Vec<String> {
        let mut flags = Vec::new();

        for (name, value) in options.iter() {
            if WORKSPACE_MANAGED_OPTIONS.contains(&name.as_str()) {
                log::warn!("Ignoring compiler option '{}': managed by the workspace", name);
                continue;
            }

            let flag = format!("--{}", name);
            match value {
                Value::Null => {}
                Value::Bool(true) => flags.push(flag),
                Value::Bool(false) => flags.extend([flag, "false".to_string()]),
                Value::String(s) => flags.extend([flag, s.clone()]),
                Value::Number(n) => flags.extend([flag, n.to_string()]),
                Value::Array(items) => {
                    let joined = items
                        .iter()
                        .map(|item| match item {
                            Value::String(s) => s.clone(),
                            other => other.to_string(),
                        })
                        .collect::<Vec<_>>()
                        .join(",");
                    flags.extend([flag, joined]);
                }
                Value::Object(_) => {
                    log::warn!(
                        "Ignoring compiler option '{}': object values have no command line form",
                        name
                    );
                }
            }
        }

        flags
    }

    /// Full argument list for compiling `source_path`
    pub fn command_args(&self, source_path: &Path, options: &CompilerOptions) -> Vec<String> {
        let mut args = Self::option_flags(options);
        args.extend(["--pretty".to_string(), "false".to_string()]);
        args.push(source_path.to_string_lossy().to_string());
        args
    }

    /// First line of `<tsc> --version`
    pub fn version(&self) -> Result<String> {
        let output = Command::new(&self.executable)
            .arg("--version")
            .stdin(Stdio::null())
            .output()
            .map_err(|e| {
                SnippetError::Compiler(format!("Failed to launch {}: {}", self.executable, e))
            })?;

        if !output.status.success() {
            return Err(SnippetError::Compiler(format!(
                "{} --version exited with {}",
                self.executable, output.status
            )));
        }

        Ok(String::from_utf8_lossy(&output.stdout)
            .lines()
            .next()
            .unwrap_or("")
            .trim()
            .to_string())
    }
}

impl CompilerBackend for TscBackend {
    fn name(&self) -> &'static str {
        "tsc"
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
        options: &CompilerOptions,
    ) -> Result<Invocation> {
        let args = self.command_args(source_path, options);
        log::debug!("Running {} {:?}", self.executable, args);

        let output = Command::new(&self.executable)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .map_err(|e| {
                SnippetError::Compiler(format!("Failed to launch {}: {}", self.executable, e))
            })?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        let diagnostics = tsc_output::parse_output(&stdout);

        let reported = matches!(
            output.status.code(),
            Some(EXIT_DIAGNOSTICS_OUTPUTS_SKIPPED) | Some(EXIT_DIAGNOSTICS_OUTPUTS_GENERATED)
        );
        if !output.status.success() && !(reported && !diagnostics.is_empty()) {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let detail = if stderr.trim().is_empty() {
                stdout.trim().to_string()
            } else {
                stderr.trim().to_string()
            };
            return Err(SnippetError::Compiler(format!(
                "{} exited with {} without diagnostics: {}",
                self.executable, output.status, detail
            )));
        }

        let emitted = output_path.is_file();
        log::debug!(
            "{} reported {} diagnostics, emitted: {}",
            self.executable,
            diagnostics.len(),
            emitted
        );

        Ok(Invocation::new(diagnostics, emitted))
    }
}
