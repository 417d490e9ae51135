//! Manifest Resolver - maps each agent's patterns to validated Rule Cards.

use std::collections::{BTreeMap, HashSet};
use std::path::{Component, Path, PathBuf};

use crate::domain::{AgentDefinition, AgentManifest, LoadedCard};
use crate::engine::guard::{check_relative, resolve_pattern};
use crate::engine::loader::Corpus;
use crate::error::{CompileError, CompileResult};

/// How agent-level failures affect the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResolveMode {
    /// A failing agent is reported; the others still compile.
    #[default]
    Lenient,
    /// The first failing agent aborts the run.
    Strict,
}

/// Resolution outcome for one agent.
#[derive(Debug)]
pub struct AgentResolution {
    pub agent: AgentDefinition,
    /// Member cards sorted by id, or the reason the agent cannot compile.
    pub outcome: CompileResult<Vec<LoadedCard>>,
}

/// Read and parse the manifest file.
pub fn load_manifest(path: &Path) -> CompileResult<AgentManifest> {
    let raw = std::fs::read_to_string(path).map_err(|e| CompileError::io(path, e))?;
    serde_yaml::from_str(&raw).map_err(|e| CompileError::Parse {
        file: path.to_path_buf(),
        line: e.location().map(|l| l.line()),
        message: e.to_string(),
    })
}

/// Check manifest-wide invariants.
///
/// Violations make the manifest unusable as a whole, so the first one is
/// returned immediately.
pub fn validate_manifest(manifest: &AgentManifest) -> CompileResult<()> {
    if manifest.agents.is_empty() {
        return Err(CompileError::manifest("manifest defines no agents"));
    }

    let mut names = HashSet::new();
    let mut outputs: BTreeMap<PathBuf, &str> = BTreeMap::new();

    for agent in &manifest.agents {
        if agent.name.trim().is_empty() {
            return Err(CompileError::manifest("agent with empty name"));
        }
        if !names.insert(agent.name.as_str()) {
            return Err(CompileError::agent_config(
                &agent.name,
                None,
                "duplicate agent name",
            ));
        }
        if agent.rule_cards.is_empty() {
            return Err(CompileError::agent_config(
                &agent.name,
                None,
                "rule_cards must list at least one pattern",
            ));
        }

        check_relative(&agent.output_file).map_err(|e| {
            CompileError::agent_config(
                &agent.name,
                None,
                format!("unsafe output_file: {e}"),
            )
        })?;

        if let Some(previous) = outputs.insert(output_key(&agent.output_file), agent.name.as_str()) {
            return Err(CompileError::agent_config(
                &agent.name,
                None,
                format!(
                    "output_file '{}' is already used by agent '{}'",
                    agent.output_file, previous
                ),
            ));
        }
    }
    Ok(())
}

/// Lexical identity of an `output_file`: `.` segments and repeated
/// separators do not make a different file.
fn output_key(output_file: &str) -> PathBuf {
    Path::new(output_file)
        .components()
        .filter(|c| !matches!(c, Component::CurDir))
        .collect()
}

/// Resolve every agent in manifest order.
///
/// In strict mode the first agent failure is returned as `Err`.
pub fn resolve(
    manifest: &AgentManifest,
    corpus: &Corpus,
    mode: ResolveMode,
) -> CompileResult<Vec<AgentResolution>> {
    validate_manifest(manifest)?;

    let mut resolutions = Vec::with_capacity(manifest.agents.len());
    for agent in &manifest.agents {
        let outcome = resolve_agent(agent, corpus);
        match &outcome {
            Ok(cards) => tracing::debug!(agent = %agent.name, rules = cards.len(), "Agent resolved"),
            Err(e) => {
                tracing::warn!(agent = %agent.name, error = %e, "Agent resolution failed");
            }
        }

        let outcome = match (mode, outcome) {
            (ResolveMode::Strict, Err(e)) => return Err(e),
            (_, outcome) => outcome,
        };
        resolutions.push(AgentResolution {
            agent: agent.clone(),
            outcome,
        });
    }
    Ok(resolutions)
}

/// Expand one agent's patterns into its deduplicated card set.
pub fn resolve_agent(agent: &AgentDefinition, corpus: &Corpus) -> CompileResult<Vec<LoadedCard>> {
    let mut by_id: BTreeMap<&str, &LoadedCard> = BTreeMap::new();

    for pattern in &agent.rule_cards {
        let paths =
            resolve_pattern(corpus.root(), pattern).map_err(|e| e.with_agent(&agent.name))?;

        let mut card_matches = 0usize;
        for path in &paths {
            if let Some(card) = corpus.get(path) {
                card_matches += 1;
                by_id.entry(card.id()).or_insert(card);
            } else if let Some(reason) = corpus.rejection(path) {
                return Err(CompileError::agent_config(
                    &agent.name,
                    Some(pattern),
                    format!("matches invalid Rule Card {}: {}", path.display(), reason),
                ));
            } else {
                tracing::debug!(
                    agent = %agent.name,
                    file = %path.display(),
                    "Ignoring non-card file"
                );
            }
        }

        if card_matches == 0 {
            return Err(CompileError::agent_config(
                &agent.name,
                Some(pattern),
                "pattern matched no Rule Cards",
            ));
        }
    }

    Ok(by_id.into_values().cloned().collect())
}
