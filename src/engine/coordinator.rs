//! Compile Coordinator - orchestrates one compile run.
//!
//! Loads the manifest and corpus once, resolves every agent, then compiles
//! and writes each agent's package on its own blocking task. No mutable
//! state is shared between agents; results are gathered for the report.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::Utc;
use tokio::task::JoinSet;

use crate::config::{CompilerConfig, PackageConfig};
use crate::domain::{AgentDefinition, LoadedCard};
use crate::engine::{
    load_corpus, load_manifest, resolve, validate_manifest, IntegrityStamper, PackageCompiler,
    ResolveMode, RevisionSource,
};
use crate::error::CompileError;
use crate::storage::{DriftStatus, PackageWriter, WriteOutcome};

/// Inputs of one compile run.
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub corpus_root: PathBuf,
    pub manifest: PathBuf,
    pub output_dir: PathBuf,
    pub force: bool,
    pub strict: bool,
    /// Compare with existing packages instead of writing.
    pub check: bool,
}

impl RunOptions {
    pub fn from_config(config: &CompilerConfig) -> Self {
        Self {
            corpus_root: config.corpus_root.clone(),
            manifest: config.manifest.clone(),
            output_dir: config.output_dir.clone(),
            force: false,
            strict: config.strict,
            check: false,
        }
    }
}

/// Shared flag telling the run to stop launching agents.
#[derive(Debug, Clone, Default)]
pub struct Cancellation(Arc<AtomicBool>);

impl Cancellation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Final state of one agent.
#[derive(Debug)]
pub enum AgentStatus {
    Written(WriteOutcome),
    Checked(DriftStatus),
    Failed(CompileError),
    Cancelled,
}

#[derive(Debug)]
pub struct AgentReport {
    pub name: String,
    pub output_path: PathBuf,
    pub rules: usize,
    pub status: AgentStatus,
}

impl AgentReport {
    pub fn is_success(&self) -> bool {
        matches!(
            self.status,
            AgentStatus::Written(_) | AgentStatus::Checked(DriftStatus::UpToDate)
        )
    }
}

/// Outcome of a run that got as far as compiling agents.
#[derive(Debug, Default)]
pub struct RunReport {
    /// Card-level errors found while loading the corpus.
    pub card_errors: Vec<CompileError>,
    /// One entry per agent, in manifest order.
    pub agents: Vec<AgentReport>,
}

impl RunReport {
    pub fn succeeded(&self) -> usize {
        self.agents.iter().filter(|a| a.is_success()).count()
    }

    pub fn failed(&self) -> usize {
        self.agents.len() - self.succeeded()
    }

    pub fn is_success(&self) -> bool {
        self.agents.iter().all(AgentReport::is_success)
    }
}

/// Why a run stopped before producing a per-agent report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// The manifest itself is unusable; nothing was compiled.
    Manifest,
    /// Fatal error or strict-mode abort.
    Aborted,
}

#[derive(Debug)]
pub struct RunFailure {
    pub kind: FailureKind,
    pub error: CompileError,
    pub card_errors: Vec<CompileError>,
}

impl RunFailure {
    fn manifest(error: CompileError) -> Self {
        Self {
            kind: FailureKind::Manifest,
            error,
            card_errors: Vec::new(),
        }
    }

    fn aborted(error: CompileError, card_errors: Vec<CompileError>) -> Self {
        Self {
            kind: FailureKind::Aborted,
            error,
            card_errors,
        }
    }
}

/// Orchestrates the compile pipeline.
pub struct CompileCoordinator {
    options: RunOptions,
    compiler: PackageCompiler,
    base_version: String,
    revision: Box<dyn RevisionSource>,
}

impl CompileCoordinator {
    pub fn new(options: RunOptions, package: &PackageConfig, revision: Box<dyn RevisionSource>) -> Self {
        Self {
            options,
            compiler: PackageCompiler::new(package),
            base_version: package.base_version.clone(),
            revision,
        }
    }

    /// Run the pipeline:
    /// 1. Load and validate the manifest
    /// 2. Load the corpus
    /// 3. Resolve each agent's rule set
    /// 4. Stamp, compile and write each agent concurrently
    pub async fn run(&self, cancel: &Cancellation) -> Result<RunReport, RunFailure> {
        let opts = &self.options;
        let mode = if opts.strict {
            ResolveMode::Strict
        } else {
            ResolveMode::Lenient
        };

        let manifest = load_manifest(&opts.manifest).map_err(RunFailure::manifest)?;
        validate_manifest(&manifest).map_err(RunFailure::manifest)?;
        tracing::info!(
            manifest = %opts.manifest.display(),
            agents = manifest.agents.len(),
            "Manifest loaded"
        );

        let load = load_corpus(&opts.corpus_root).map_err(|e| RunFailure::aborted(e, Vec::new()))?;
        let card_errors = load.errors;
        let corpus = load.corpus;

        if mode == ResolveMode::Strict && !card_errors.is_empty() {
            let first = CompileError::manifest(format!(
                "{} invalid Rule Card(s) in corpus; strict mode aborts",
                card_errors.len()
            ));
            return Err(RunFailure::aborted(first, card_errors));
        }

        let resolutions = match resolve(&manifest, &corpus, mode) {
            Ok(r) => r,
            Err(e) => return Err(RunFailure::aborted(e, card_errors)),
        };

        let stamper = IntegrityStamper::for_run(&self.base_version, self.revision.as_ref(), Utc::now());
        let writer = PackageWriter::new(&opts.output_dir, opts.force);

        let mut reports: Vec<Option<AgentReport>> = Vec::with_capacity(resolutions.len());
        let mut tasks = JoinSet::new();

        for (index, resolution) in resolutions.into_iter().enumerate() {
            let output_path = writer.path_for(&resolution.agent.output_file);
            let name = resolution.agent.name.clone();

            let cards = match resolution.outcome {
                Ok(cards) => cards,
                Err(e) => {
                    reports.push(Some(AgentReport {
                        name,
                        output_path,
                        rules: 0,
                        status: AgentStatus::Failed(e),
                    }));
                    continue;
                }
            };

            if cancel.is_cancelled() {
                reports.push(Some(AgentReport {
                    name,
                    output_path,
                    rules: cards.len(),
                    status: AgentStatus::Cancelled,
                }));
                continue;
            }

            reports.push(None);
            let job = AgentJob {
                agent: resolution.agent,
                cards,
                compiler: self.compiler.clone(),
                stamper: stamper.clone(),
                writer: writer.clone(),
                check: opts.check,
                cancel: cancel.clone(),
            };
            tasks.spawn_blocking(move || (index, job.run(output_path)));
        }

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((index, report)) => reports[index] = Some(report),
                Err(e) => {
                    return Err(RunFailure::aborted(
                        CompileError::manifest(format!("agent worker failed: {e}")),
                        card_errors,
                    ))
                }
            }
        }

        let agents: Vec<AgentReport> = reports.into_iter().flatten().collect();
        tracing::info!(
            agents = agents.len(),
            failed = agents.iter().filter(|a| !a.is_success()).count(),
            "Compile run finished"
        );

        Ok(RunReport {
            card_errors,
            agents,
        })
    }
}

/// Owned inputs for one agent's compile-and-write task.
struct AgentJob {
    agent: AgentDefinition,
    cards: Vec<LoadedCard>,
    compiler: PackageCompiler,
    stamper: IntegrityStamper,
    writer: PackageWriter,
    check: bool,
    cancel: Cancellation,
}

impl AgentJob {
    fn run(self, output_path: PathBuf) -> AgentReport {
        let rules = self.cards.len();
        let report = |status| AgentReport {
            name: self.agent.name.clone(),
            output_path: output_path.clone(),
            rules,
            status,
        };

        if self.cancel.is_cancelled() {
            return report(AgentStatus::Cancelled);
        }

        let refs: Vec<&LoadedCard> = self.cards.iter().collect();
        let stamp = self.stamper.stamp(&refs);
        let package = self.compiler.compile(&self.agent, &self.cards, stamp);

        let status = if self.check {
            match self.writer.check(&package, &self.agent.output_file) {
                Ok(drift) => AgentStatus::Checked(drift),
                Err(e) => AgentStatus::Failed(e),
            }
        } else {
            match self.writer.write(&package, &self.agent.output_file) {
                Ok(outcome) => AgentStatus::Written(outcome),
                Err(e) => AgentStatus::Failed(e),
            }
        };

        if let AgentStatus::Failed(e) = &status {
            tracing::warn!(agent = %self.agent.name, error = %e, "Agent failed");
        }
        report(status)
    }
}
