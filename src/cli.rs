use crate::config::config::SnippetConfig;
use crate::config::types::CompileResult;
use crate::core::SnippetCompiler;
use crate::compiler::TscBackend;
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::io::Read;
use std::num::NonZeroUsize;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to snippetbox.json (defaults to ./snippetbox.json when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// tsconfig-style file providing compilerOptions
    #[arg(long, global = true)]
    tsconfig: Option<PathBuf>,
    /// Compiler executable
    #[arg(long, global = true)]
    compiler: Option<String>,
    /// Directory for per-request workspace files
    #[arg(long, global = true)]
    workspace_dir: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compile TypeScript snippets to JavaScript
    Compile {
        /// Source files; stdin is read when neither files nor --code are given
        files: Vec<PathBuf>,
        /// Source code as string
        #[arg(long, conflicts_with = "files")]
        code: Option<String>,
    },
    /// Check that the compiler toolchain is installed
    CheckDeps {
        /// Verbose output showing the resolved configuration
        #[arg(long)]
        verbose: bool,
    },
    /// Remove orphaned workspace files left by interrupted compilations
    Sweep {
        /// Minimum age in seconds (defaults to stale_workspace_age_secs)
        #[arg(long)]
        max_age_secs: Option<u64>,
    },
}

/// One labelled compile result in multi-input output
#[derive(Serialize)]
struct LabeledResult<'a> {
    input: &'a str,
    #[serde(flatten)]
    result: &'a CompileResult,
}

pub fn run() -> Result<()> {
    env_logger::init();

    let cli = Cli::parse();
    let config = resolve_config(&cli)?;

    match cli.command {
        Commands::Compile { files, code } => {
            let inputs = collect_inputs(files, code)?;
            let compiler = crate::core::init(&config)?;
            let results = compile_all(compiler, &inputs)?;

            if let [only] = results.as_slice() {
                println!("{}", only.to_json()?);
            } else {
                let labelled: Vec<LabeledResult> = inputs
                    .iter()
                    .zip(&results)
                    .map(|((label, _), result)| LabeledResult { input: label, result })
                    .collect();
                println!("{}", serde_json::to_string_pretty(&labelled)?);
            }

            if results.iter().any(|r| !r.is_success()) {
                std::process::exit(1);
            }
            Ok(())
        }
        Commands::CheckDeps { verbose } => check_compiler(&config, verbose),
        Commands::Sweep { max_age_secs } => {
            let max_age = max_age_secs
                .map(Duration::from_secs)
                .unwrap_or_else(|| config.stale_workspace_age());
            let compiler = SnippetCompiler::from_config(&config)?;
            let removed = compiler.workspaces().sweep_stale(max_age)?;
            eprintln!(
                "Removed {} stale workspace files from {}",
                removed,
                config.workspace_dir.display()
            );
            Ok(())
        }
    }
}

/// Config file first, then command line overrides
fn resolve_config(cli: &Cli) -> Result<SnippetConfig> {
    let mut config = match &cli.config {
        Some(path) => SnippetConfig::load_from_file(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => SnippetConfig::load_default()?,
    };

    if let Some(tsconfig) = &cli.tsconfig {
        config.compiler_options_file = Some(tsconfig.clone());
    }
    if let Some(compiler) = &cli.compiler {
        config.compiler = compiler.clone();
    }
    if let Some(workspace_dir) = &cli.workspace_dir {
        config.workspace_dir = workspace_dir.clone();
    }

    log::debug!("Resolved configuration: {:?}", config);
    Ok(config)
}

/// (label, source) pairs in command line order
fn collect_inputs(files: Vec<PathBuf>, code: Option<String>) -> Result<Vec<(String, String)>> {
    if let Some(code) = code {
        return Ok(vec![("<code>".to_string(), code)]);
    }

    if files.is_empty() {
        let mut source = String::new();
        std::io::stdin()
            .read_to_string(&mut source)
            .context("reading source from stdin")?;
        return Ok(vec![("<stdin>".to_string(), source)]);
    }

    files
        .into_iter()
        .map(|path| {
            let source = std::fs::read_to_string(&path)
                .with_context(|| format!("reading {}", path.display()))?;
            Ok((path.display().to_string(), source))
        })
        .collect()
}

/// Compile every input on a bounded worker pool; results come back in input order.
fn compile_all(
    compiler: &'static SnippetCompiler,
    inputs: &[(String, String)],
) -> Result<Vec<CompileResult>> {
    compile_batch(inputs, worker_count(inputs.len()), |source| {
        compiler.compile(source)
    })
}

/// One compiler process per available core, never more than there are inputs
fn worker_count(inputs: usize) -> usize {
    let cores = std::thread::available_parallelism()
        .map(NonZeroUsize::get)
        .unwrap_or(1);
    cores.min(inputs).max(1)
}

fn compile_batch<F>(
    inputs: &[(String, String)],
    workers: usize,
    compile: F,
) -> Result<Vec<CompileResult>>
where
    F: Fn(&str) -> crate::config::types::Result<CompileResult> + Sync,
{
    let (job_tx, job_rx) = crossbeam_channel::unbounded();
    let (result_tx, result_rx) = crossbeam_channel::unbounded();

    for job in inputs.iter().enumerate() {
        // Receiver is still held here, send cannot fail
        let _ = job_tx.send(job);
    }
    drop(job_tx);

    std::thread::scope(|scope| {
        for _ in 0..workers {
            let job_rx = job_rx.clone();
            let result_tx = result_tx.clone();
            let compile = &compile;
            scope.spawn(move || {
                for (index, (_, source)) in job_rx.iter() {
                    let _ = result_tx.send((index, compile(source)));
                }
            });
        }
    });
    drop(result_tx);

    let mut slots: Vec<Option<CompileResult>> = vec![None; inputs.len()];
    for (index, result) in result_rx.iter() {
        let result = result.with_context(|| format!("compiling {}", inputs[index].0))?;
        slots[index] = Some(result);
    }

    slots
        .into_iter()
        .enumerate()
        .map(|(index, slot)| {
            slot.ok_or_else(|| anyhow::anyhow!("no result for {}", inputs[index].0))
        })
        .collect()
}

/// Check that the configured compiler can be launched
fn check_compiler(config: &SnippetConfig, verbose: bool) -> Result<()> {
    println!("🔍 Checking compiler toolchain...");
    println!();

    let backend = TscBackend::new(config.compiler.clone());
    match backend.version() {
        Ok(version) => {
            println!("✅ TypeScript - OK");
            if verbose {
                println!("  {} -> {}", backend.executable(), version);
                println!("  workspace dir -> {}", config.workspace_dir.display());
                let options = config.compiler_options()?;
                println!(
                    "  compiler flags -> {}",
                    TscBackend::option_flags(&options).join(" ")
                );
                println!();
                println!("💡 Usage example:");
                println!("  snippetbox compile --code='let x: number = 5;'");
            }
            Ok(())
        }
        Err(e) => {
            println!("❌ TypeScript - MISSING");
            if verbose {
                println!("  {} -> {}", backend.executable(), e);
            }
            println!();
            println!("🔧 To install the compiler, run:");
            println!("  npm install -g typescript");
            std::process::exit(1);
        }
    }
}
