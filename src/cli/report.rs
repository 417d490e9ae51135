//! Human-readable reports printed to stdout.

use std::io::{self, Write};

use crate::engine::{AgentStatus, CorpusLoad, RunFailure, RunReport};
use crate::error::CompileError;

/// One line per error, then the error count.
pub fn render_validation(out: &mut dyn Write, load: &CorpusLoad, verbose: bool) -> io::Result<()> {
    if verbose {
        for card in load.corpus.cards() {
            writeln!(out, "OK {} ({})", card.path.display(), card.id())?;
        }
    }
    render_errors(out, &load.errors)?;
    writeln!(out, "{} error(s)", load.errors.len())
}

pub fn render_errors(out: &mut dyn Write, errors: &[CompileError]) -> io::Result<()> {
    for error in errors {
        writeln!(out, "{}", error.report_line())?;
    }
    Ok(())
}

/// Per-agent status lines followed by a summary.
pub fn render_run(out: &mut dyn Write, report: &RunReport) -> io::Result<()> {
    if !report.card_errors.is_empty() {
        writeln!(out, "Invalid Rule Cards (excluded from every package):")?;
        render_errors(out, &report.card_errors)?;
    }

    for agent in &report.agents {
        let target = agent.output_path.display();
        match &agent.status {
            AgentStatus::Written(outcome) => writeln!(
                out,
                "ok      {} -> {} ({} rules, {})",
                agent.name, target, agent.rules, outcome
            )?,
            AgentStatus::Checked(drift) => writeln!(
                out,
                "check   {} -> {} ({} rules, {})",
                agent.name, target, agent.rules, drift
            )?,
            AgentStatus::Failed(error) => {
                writeln!(out, "FAILED  {}: [{}] {}", agent.name, error.code(), error)?
            }
            AgentStatus::Cancelled => writeln!(out, "SKIPPED {}: run interrupted", agent.name)?,
        }
    }

    writeln!(
        out,
        "{} of {} agent(s) succeeded, {} failed",
        report.succeeded(),
        report.agents.len(),
        report.failed()
    )
}

pub fn render_failure(out: &mut dyn Write, failure: &RunFailure) -> io::Result<()> {
    render_errors(out, &failure.card_errors)?;
    writeln!(out, "ABORTED [{}] {}", failure.error.code(), failure.error)
}
