//! Binary entry point for the tugdoc CLI.
//!
//! ## Usage
//!
//! ```bash
//! # Document every Python file under the current directory
//! tugdoc --repo
//!
//! # Document one file with NL descriptions, without a backup
//! tugdoc --file src/shop.py --nlp --no-backup
//!
//! # Machine-readable summary and logs
//! tugdoc --repo --root ~/project --output json --log-format json
//! ```

use std::io::{self, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{ArgGroup, Parser, ValueEnum};

use tugdoc::cli::{run, RunOptions, Target};
use tugdoc::config::Config;
use tugdoc::error::{OutputErrorCode, TugdocError};
use tugdoc::output::{emit_response, emit_response_compact, ErrorResponse, RunSummary};

// ============================================================================
// CLI Structure
// ============================================================================

/// Docstring templates for undocumented Python code.
///
/// Finds classes, functions and methods without a docstring and inserts a
/// Sphinx-style template into each one. Files are only written back when
/// they still parse.
#[derive(Parser, Debug)]
#[command(name = "tugdoc", version, about = "Docstring templates for undocumented Python code")]
#[command(group(ArgGroup::new("target").required(true).args(["repo", "file"])))]
struct Cli {
    /// Document every Python file under the root.
    #[arg(long)]
    repo: bool,

    /// Document a single Python file.
    #[arg(long, value_name = "FILE")]
    file: Option<PathBuf>,

    /// Root directory: holds tugdoc.toml and the backup (default: current directory).
    #[arg(long, default_value = ".")]
    root: PathBuf,

    /// Skip copying the root into the backup folder.
    #[arg(long)]
    no_backup: bool,

    /// Skip the code formatter.
    #[arg(long)]
    no_format: bool,

    /// Skip the import sorter.
    #[arg(long)]
    no_isort: bool,

    /// Describe elements with the NL toolkit instead of placeholders.
    #[arg(long)]
    nlp: bool,

    /// Number of files documented concurrently (overrides tugdoc.toml).
    #[arg(long)]
    workers: Option<usize>,

    /// Summary format on stdout.
    #[arg(long, value_enum, default_value = "text")]
    output: OutputFormat,

    /// Log level for tracing output.
    #[arg(long, value_enum, default_value = "info")]
    log_level: LogLevel,

    /// Log line format on stderr.
    #[arg(long, value_enum, default_value = "text")]
    log_format: LogFormat,
}

/// Log level for tracing output.
#[derive(Clone, Copy, Debug, ValueEnum)]
enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    fn to_tracing_level(self) -> tracing::Level {
        match self {
            LogLevel::Trace => tracing::Level::TRACE,
            LogLevel::Debug => tracing::Level::DEBUG,
            LogLevel::Info => tracing::Level::INFO,
            LogLevel::Warn => tracing::Level::WARN,
            LogLevel::Error => tracing::Level::ERROR,
        }
    }
}

/// Log line format.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

/// Summary format.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

impl Cli {
    fn run_options(&self) -> RunOptions {
        RunOptions {
            root: self.root.clone(),
            target: match &self.file {
                Some(path) => Target::File(path.clone()),
                None => Target::Repo,
            },
            backup: !self.no_backup,
            format: !self.no_format,
            sort_imports: !self.no_isort,
            nlp: self.nlp,
        }
    }
}

// ============================================================================
// Main Entry Point
// ============================================================================

fn main() -> ExitCode {
    let cli = Cli::parse();

    init_tracing(cli.log_level, cli.log_format);

    match execute(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            let error_code = OutputErrorCode::from(&err);
            let response = ErrorResponse::from_error(&err);

            // Errors go to stdout as one JSON line
            let _ = emit_response_compact(&response, &mut io::stdout());
            let _ = io::stdout().flush();

            ExitCode::from(error_code.code())
        }
    }
}

/// Initialize tracing subscriber.
fn init_tracing(level: LogLevel, format: LogFormat) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.to_tracing_level().to_string()));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr);
    match format {
        LogFormat::Text => builder.init(),
        LogFormat::Json => builder.json().init(),
    }
}

/// Execute one run and print its summary.
fn execute(cli: &Cli) -> Result<(), TugdocError> {
    if cli.workers == Some(0) {
        return Err(TugdocError::invalid_args("--workers must be at least 1"));
    }
    let config = Config::load_from_root(&cli.root).with_overrides(cli.workers);
    let options = cli.run_options();
    let summary = run(&options, &config)?;
    print_summary(&summary, cli.output)?;

    // Single-file runs report a validation failure through the exit code.
    if let (Target::File(_), Some(failed)) = (&options.target, summary.validation_failure()) {
        return Err(TugdocError::ValidationFailed {
            path: failed.path.display().to_string(),
        });
    }
    Ok(())
}

fn print_summary(summary: &RunSummary, format: OutputFormat) -> Result<(), TugdocError> {
    let mut stdout = io::stdout().lock();
    let written = match format {
        OutputFormat::Text => stdout.write_all(summary.render_text().as_bytes()),
        OutputFormat::Json => emit_response(summary, &mut stdout),
    };
    written
        .and_then(|()| stdout.flush())
        .map_err(|e| TugdocError::internal(format!("failed to write summary: {}", e)))
}

// ============================================================================
// Tests
// ============================================================================
