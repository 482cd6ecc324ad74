//! Run orchestration behind the `tugdoc` binary.
//!
//! [`run`] performs one documentation run:
//!
//! 1. back up the root (unless disabled), before any file is touched
//! 2. start the NL toolkit service when enrichment is requested
//! 3. collect the target files (discovery, or the single `--file`)
//! 4. document every file on a bounded worker pool
//! 5. format and import-sort the documented files, best-effort
//! 6. summarize
//!
//! ## Error Handling
//!
//! Only failures that stop the run as a whole are `TugdocError`s: bad
//! arguments, a missing root or file, a failed backup, an unusable
//! interpreter. Everything that goes wrong inside one file is recorded in
//! that file's [`FileOutcome`] and the run carries on.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use rayon::prelude::*;
use tracing::{info, warn};

use tugdoc_core::adapter::NlToolkit;
use tugdoc_core::backup::create_backup;
use tugdoc_core::config::Config;
use tugdoc_core::error::TugdocError;
use tugdoc_core::files::discover_python_files;
use tugdoc_python::format::CommandFormatter;
use tugdoc_python::nlp::NlpService;
use tugdoc_python::parser::{PythonAstParser, PYTHON_CONVENTIONS};
use tugdoc_python::pipeline::{FailureReason, FileOutcome, FilePipeline};

use crate::output::RunSummary;

// ============================================================================
// Options
// ============================================================================

/// What a run documents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    /// Every Python file under the root.
    Repo,
    /// One Python file.
    File(PathBuf),
}

/// Options of one run, as given on the command line.
#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Root of the tree; holds `tugdoc.toml` and the backup folder.
    pub root: PathBuf,
    pub target: Target,
    /// Copy the root into the backup folder first.
    pub backup: bool,
    /// Run the code formatter on documented files.
    pub format: bool,
    /// Run the import sorter on documented files.
    pub sort_imports: bool,
    /// Describe elements with the NL toolkit.
    pub nlp: bool,
}

impl RunOptions {
    /// Defaults for documenting the tree at `root`.
    pub fn repo(root: impl Into<PathBuf>) -> Self {
        RunOptions {
            root: root.into(),
            target: Target::Repo,
            backup: true,
            format: true,
            sort_imports: true,
            nlp: false,
        }
    }
}

// ============================================================================
// Run
// ============================================================================

/// Document the target of `options` with `config`.
pub fn run(options: &RunOptions, config: &Config) -> Result<RunSummary, TugdocError> {
    let started = SystemTime::now();
    let settings = &config.tugdoc;

    if !options.root.is_dir() {
        return Err(TugdocError::file_not_found(options.root.display().to_string()));
    }
    if let Target::File(path) = &options.target {
        check_single_file(path)?;
    }

    if options.backup {
        let backup = create_backup(&options.root, &settings.backup_folder).map_err(|e| {
            TugdocError::apply(
                format!("backup failed: {}", e),
                options.root.join(&settings.backup_folder).display().to_string(),
            )
        })?;
        info!(path = %backup.display(), "backup created");
    }

    let parser = PythonAstParser::new(&settings.python).map_err(|e| TugdocError::Config {
        message: format!("python interpreter '{}' is unusable: {}", settings.python, e),
    })?;

    let mut service = if options.nlp {
        match NlpService::start(&settings.python, &settings.nlp_module) {
            Ok(service) => Some(service),
            Err(err) => {
                warn!(error = %err, "NL toolkit unavailable, continuing without it");
                None
            }
        }
    } else {
        None
    };
    let client = service.as_ref().map(NlpService::client);
    let toolkit = client.as_ref().map(|c| c as &dyn NlToolkit);

    let files = match &options.target {
        Target::Repo => discover_python_files(&options.root, settings)?,
        Target::File(path) => vec![path.clone()],
    };
    info!(files = files.len(), workers = settings.workers, "documenting");

    let pipeline = FilePipeline::new(&parser, toolkit, config);
    let outcomes = document_all(&pipeline, &files, settings.workers)?;

    if let Some(service) = service.as_mut() {
        service.shutdown();
    }

    let mut summary = RunSummary::new(started, &outcomes);
    let documented: Vec<&Path> = outcomes
        .iter()
        .filter(|o| o.is_documented())
        .map(|o| o.path.as_path())
        .collect();
    if options.format {
        summary
            .formatting
            .extend(CommandFormatter::black(settings).run_best_effort(&documented));
    }
    if options.sort_imports {
        summary
            .formatting
            .extend(CommandFormatter::isort(settings).run_best_effort(&documented));
    }

    info!(
        documented = summary.documented,
        failed = summary.failed.len(),
        "run complete"
    );
    Ok(summary)
}

/// A single-file target must be an existing Python source file.
fn check_single_file(path: &Path) -> Result<(), TugdocError> {
    let is_python = path
        .extension()
        .is_some_and(|ext| ext == PYTHON_CONVENTIONS.extension);
    if !is_python {
        return Err(TugdocError::UnsupportedFileType {
            path: path.display().to_string(),
        });
    }
    if !path.is_file() {
        return Err(TugdocError::file_not_found(path.display().to_string()));
    }
    Ok(())
}

// ============================================================================
// Worker Pool
// ============================================================================

/// Document `files` on a pool of `workers` threads, in discovery order.
fn document_all(
    pipeline: &FilePipeline<'_>,
    files: &[PathBuf],
    workers: usize,
) -> Result<Vec<FileOutcome>, TugdocError> {
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(workers.max(1))
        .thread_name(|index| format!("tugdoc-worker-{}", index))
        .build()
        .map_err(|e| TugdocError::internal(format!("failed to start worker pool: {}", e)))?;

    Ok(pool.install(|| {
        files
            .par_iter()
            .map(|path| document_guarded(pipeline, path))
            .collect()
    }))
}

/// Run the pipeline on one file, turning a panic into a failure record.
fn document_guarded(pipeline: &FilePipeline<'_>, path: &Path) -> FileOutcome {
    match panic::catch_unwind(AssertUnwindSafe(|| pipeline.document_file(path))) {
        Ok(outcome) => outcome,
        Err(payload) => {
            let message = panic_message(&*payload);
            warn!(path = %path.display(), panic = %message, "worker panicked");
            FileOutcome::failed(path, FailureReason::Panicked(message))
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}

// ============================================================================
// Tests
// ============================================================================
