//! Binary entry point for the molt CLI.
//!
//! ```bash
//! # minify the program described by molt.json
//! molt molt.json
//!
//! # keep going when an asset fails, with debug logging
//! molt molt.json --ignore-errors -v
//! ```

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use molt::{Compiler, Registry, RunReport};
use molt_core::{MoltConfig, MoltResult};

/// Whole-program Python minifier.
///
/// Loads the bundles described by a JSON configuration file, applies the
/// configured shrinking transforms, and writes one output file per
/// module.
#[derive(Parser, Debug)]
#[command(name = "molt", version, about = "Whole-program Python minifier")]
struct Cli {
    /// Path to the JSON configuration file.
    config: PathBuf,

    /// Skip failed assets instead of aborting the run.
    #[arg(long)]
    ignore_errors: bool,

    /// Worker threads for the parallel transform lane (0 = one per core).
    #[arg(long)]
    workers: Option<usize>,

    /// Increase log verbosity (-v debug, -vv trace).
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(&cli) {
        Ok(report) => {
            for failure in &report.failed_assets {
                tracing::warn!(
                    module = %failure.module,
                    transformer = %failure.transformer,
                    "asset skipped: {}",
                    failure.message
                );
            }
            tracing::info!(files = report.files_written, "done");
            ExitCode::SUCCESS
        }
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::from(err.exit_status().code())
        }
    }
}

fn run(cli: &Cli) -> MoltResult<RunReport> {
    let mut config = MoltConfig::load(&cli.config)?;
    if cli.ignore_errors {
        config.ignore_errors = true;
    }
    if let Some(workers) = cli.workers {
        config.workers = workers;
    }
    let registry = Registry::with_builtin_components();
    Compiler::new(&config, &registry).run()
}

fn init_tracing(verbosity: u8) {
    let default = match verbosity {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
