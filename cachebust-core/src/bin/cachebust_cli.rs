//! Cachebust CLI - Build-step interface
//!
//! Commands: run, plan, hash
//! Outputs JSON to stdout, progress to stderr
//! Returns 1 on configuration errors, 2 on pipeline failure

use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use cachebust_core::{
    discover_files, encode_base36, hashing::hex, sha256_file, ConsoleLogger, FingerprintPipeline,
    Importance, PipelineConfig, PipelineError,
};

#[derive(Parser)]
#[command(name = "cachebust-cli")]
#[command(about = "Cachebust CLI - Static Asset Fingerprinting", version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to the pipeline configuration (JSON)
    #[arg(short, long, global = true, default_value = "cachebust.json")]
    config: PathBuf,

    /// Discover files under the project directory when the config lists none
    #[arg(long, global = true)]
    scan: bool,

    /// Log per-file actions (-vv for digests as well)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Only print the JSON result
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Fingerprint, copy, rewrite and clean the output directory
    Run,

    /// Show the hashed outputs without writing anything
    Plan,

    /// Print the content token of one file
    Hash {
        /// File to hash
        file: PathBuf,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Commands::Hash { file } = &cli.command {
        return hash_file(file);
    }

    let config = match load_config(&cli.config, cli.scan) {
        Ok(c) => c,
        Err(e) => return report_error(&e),
    };

    let threshold = match cli.verbose {
        0 => Importance::High,
        1 => Importance::Normal,
        _ => Importance::Low,
    };
    let mut pipeline = FingerprintPipeline::new(config);
    if !cli.quiet {
        pipeline = pipeline.with_logger(Arc::new(ConsoleLogger::new(threshold)));
    }

    match cli.command {
        Commands::Run => match pipeline.run() {
            Ok(report) => print_json(&report),
            Err(e) => report_error(&e),
        },
        Commands::Plan => match pipeline.plan() {
            Ok(resources) => print_json(&serde_json::json!({
                "success": true,
                "resources": resources,
            })),
            Err(e) => report_error(&e),
        },
        Commands::Hash { .. } => ExitCode::SUCCESS,
    }
}

fn load_config(path: &Path, scan: bool) -> Result<PipelineConfig, PipelineError> {
    let mut config = PipelineConfig::load(path)?;
    if scan && config.content.is_empty() {
        config.validate()?;
        let root = config.project_root()?;
        let output_root = config.output_root()?;
        config.content = discover_files(&root, Some(&output_root))?;
    }
    Ok(config)
}

fn hash_file(file: &Path) -> ExitCode {
    match sha256_file(file) {
        Ok(digest) => print_json(&serde_json::json!({
            "path": file.display().to_string(),
            "sha256": hex::encode(digest),
            "token": encode_base36(&digest),
        })),
        Err(source) => report_error(&PipelineError::SourceRead {
            path: file.to_path_buf(),
            source,
        }),
    }
}

fn print_json(value: &impl serde::Serialize) -> ExitCode {
    match serde_json::to_string_pretty(value) {
        Ok(json) => {
            println!("{}", json);
            ExitCode::SUCCESS
        }
        Err(e) => report_error(&PipelineError::Serialization(e)),
    }
}

fn report_error(error: &PipelineError) -> ExitCode {
    let output = serde_json::json!({
        "success": false,
        "error": error.to_string(),
    });
    println!("{}", output);
    match error {
        PipelineError::InvalidArgument(_) | PipelineError::Serialization(_) => ExitCode::FAILURE,
        PipelineError::Filesystem { action, .. } if *action == "read config" => ExitCode::FAILURE,
        _ => ExitCode::from(2),
    }
}
