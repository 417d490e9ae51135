//! Package Compiler - assembles the Compiled Agent Package.
//!
//! Combines manifest metadata, full card bodies, aggregated validation hooks
//! and the build stamp into the final self-contained artifact.

use std::collections::BTreeMap;

use crate::config::PackageConfig;
use crate::domain::{AgentDefinition, BuildStamp, CompiledAgentPackage, LoadedCard, PackagePolicy};
use crate::engine::hooks;

/// Configuration-driven package compiler.
#[derive(Debug, Clone)]
pub struct PackageCompiler {
    attribution: String,
    policy_defaults: BTreeMap<String, String>,
}

impl PackageCompiler {
    pub fn new(config: &PackageConfig) -> Self {
        Self {
            attribution: config.attribution.clone(),
            policy_defaults: config.policy_defaults.clone(),
        }
    }

    /// Build the package for `agent` from its resolved cards.
    pub fn compile(
        &self,
        agent: &AgentDefinition,
        cards: &[LoadedCard],
        stamp: BuildStamp,
    ) -> CompiledAgentPackage {
        let mut detail: Vec<_> = cards.iter().map(|c| c.card.clone()).collect();
        detail.sort_by(|a, b| a.id.cmp(&b.id));
        detail.dedup_by(|a, b| a.id == b.id);

        let rules = detail.iter().map(|c| c.id.clone()).collect();
        let validation_hooks = hooks::aggregate(&detail);

        tracing::debug!(
            agent = %agent.name,
            rules = detail.len(),
            tools = validation_hooks.len(),
            digest = %stamp.source_digest,
            "Package compiled"
        );

        CompiledAgentPackage {
            id: agent.slug(),
            name: agent.name.clone(),
            description: agent.description.clone(),
            version: stamp.version,
            build_date: stamp.build_date,
            source_digest: stamp.source_digest,
            attribution: self.attribution.clone(),
            policy: PackagePolicy {
                targets: agent.domains.clone(),
                defaults: self.policy_defaults.clone(),
            },
            rules,
            rules_detail: detail,
            validation_hooks,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::loader::{parse_card, tests::card_yaml};
    use std::path::{Path, PathBuf};

    fn loaded(id: &str, detect: &str, path: &str) -> LoadedCard {
        let raw = card_yaml(id, detect);
        LoadedCard {
            card: parse_card(Path::new(path), &raw).unwrap(),
            path: PathBuf::from(path),
            raw,
        }
    }

    fn stamp() -> BuildStamp {
        BuildStamp {
            source_digest: "d1g3st".to_string(),
            build_date: "2026-01-01T00:00:00Z".to_string(),
            version: "1.0.0+gabc".to_string(),
        }
    }

    fn agent() -> AgentDefinition {
        AgentDefinition {
            name: "Secrets Specialist".to_string(),
            description: "Credential handling guidance".to_string(),
            rule_cards: vec!["secrets/*.yml".to_string()],
            output_file: "secrets.json".to_string(),
            domains: vec!["secrets".to_string(), "config".to_string()],
        }
    }

    #[test]
    fn test_hook_merging_and_rule_order() {
        let compiler = PackageCompiler::new(&PackageConfig::default());
        let cards = vec![
            loaded("SECRETS-DB-002", "  semgrep: [ruleA, ruleB]", "/r/db.yml"),
            loaded("SECRETS-API-001", "  semgrep: [ruleA]", "/r/api.yml"),
        ];

        let package = compiler.compile(&agent(), &cards, stamp());
        assert_eq!(package.rules, vec!["SECRETS-API-001", "SECRETS-DB-002"]);
        assert_eq!(package.validation_hooks["semgrep"], vec!["ruleA", "ruleB"]);
        assert_eq!(package.rules_detail[0].id, "SECRETS-API-001");
        assert_eq!(package.rules_detail.len(), 2);
    }

    #[test]
    fn test_manifest_metadata_embedded() {
        let compiler = PackageCompiler::new(&PackageConfig::default());
        let cards = vec![loaded("SECRETS-API-001", "  gitleaks: [generic-api-key]", "/r/api.yml")];

        let package = compiler.compile(&agent(), &cards, stamp());
        assert_eq!(package.id, "secrets-specialist");
        assert_eq!(package.name, "Secrets Specialist");
        assert_eq!(package.policy.targets, vec!["secrets", "config"]);
        assert_eq!(package.source_digest, "d1g3st");
        assert_eq!(package.version, "1.0.0+gabc");
        assert!(!package.policy.defaults.is_empty());
        assert!(!package.attribution.is_empty());
    }
}
