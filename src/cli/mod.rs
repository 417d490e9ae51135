//! Command-line surface shared by `validate_cards` and `compile_agents`.

pub mod args;
pub mod report;

use std::io::{self, Write};
use std::path::{Path, PathBuf};

pub use args::{CompileArgs, ValidateArgs};

use crate::config::Config;
use crate::engine::{load_corpus, Cancellation, CompileCoordinator, FailureKind, GitRevision};
use crate::error::CompileError;

/// Process exit codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ExitCode {
    Success = 0,
    /// Invalid cards, failed agents, drift, or a fatal run error.
    Failure = 1,
    /// The manifest or configuration is unusable; nothing was compiled.
    ConfigError = 2,
}

impl From<ExitCode> for i32 {
    fn from(code: ExitCode) -> Self {
        code as i32
    }
}

/// Validate one card file or a directory of cards.
pub fn validate(args: &ValidateArgs, out: &mut dyn Write) -> io::Result<ExitCode> {
    let load = match load_corpus(&args.path) {
        Ok(load) => load,
        Err(e) => {
            report::render_errors(out, std::slice::from_ref(&e))?;
            writeln!(out, "1 error(s)")?;
            return Ok(ExitCode::Failure);
        }
    };

    report::render_validation(out, &load, args.verbose)?;
    Ok(if load.is_clean() {
        ExitCode::Success
    } else {
        ExitCode::Failure
    })
}

/// Run the full compile pipeline and print the per-agent report.
pub async fn compile(
    args: &CompileArgs,
    config: &Config,
    cancel: &Cancellation,
    out: &mut dyn Write,
) -> io::Result<ExitCode> {
    let options = args.run_options(&config.compiler);
    let revision = GitRevision::new(revision_dir(&options.corpus_root));
    let coordinator = CompileCoordinator::new(options, &config.package, Box::new(revision));

    match coordinator.run(cancel).await {
        Ok(report) => {
            report::render_run(out, &report)?;
            Ok(if report.is_success() {
                ExitCode::Success
            } else {
                ExitCode::Failure
            })
        }
        Err(failure) => {
            report::render_failure(out, &failure)?;
            Ok(match failure.kind {
                FailureKind::Manifest => ExitCode::ConfigError,
                FailureKind::Aborted => ExitCode::Failure,
            })
        }
    }
}

/// Directory to run `git` in; falls back to the working directory when the
/// corpus root does not exist yet.
fn revision_dir(corpus_root: &Path) -> PathBuf {
    if corpus_root.is_dir() {
        corpus_root.to_path_buf()
    } else {
        PathBuf::from(".")
    }
}

/// Render a configuration failure that happened before any run started.
pub fn render_config_error(out: &mut dyn Write, error: &::config::ConfigError) -> io::Result<()> {
    let error = CompileError::manifest(format!("failed to load configuration: {error}"));
    writeln!(out, "ABORTED [{}] {}", error.code(), error)
}
