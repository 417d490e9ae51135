//! Agent manifest domain types.
//!
//! The manifest maps glob-selected sets of Rule Cards to named output
//! packages.

use serde::{Deserialize, Serialize};

/// Ordered list of agent definitions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentManifest {
    pub agents: Vec<AgentDefinition>,
}

/// One output package to compile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentDefinition {
    /// Unique agent name.
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Glob patterns relative to the corpus root.
    pub rule_cards: Vec<String>,
    /// Package file name, relative to the output directory.
    pub output_file: String,
    #[serde(default)]
    pub domains: Vec<String>,
}

impl AgentDefinition {
    /// Stable identifier derived from the agent name.
    ///
    /// Lowercase ASCII alphanumerics; every other run of characters
    /// collapses to a single `-`.
    pub fn slug(&self) -> String {
        let mut slug = String::with_capacity(self.name.len());
        let mut pending_dash = false;
        for c in self.name.chars() {
            if c.is_ascii_alphanumeric() {
                if pending_dash && !slug.is_empty() {
                    slug.push('-');
                }
                pending_dash = false;
                slug.push(c.to_ascii_lowercase());
            } else {
                pending_dash = true;
            }
        }
        slug
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn agent(name: &str) -> AgentDefinition {
        AgentDefinition {
            name: name.to_string(),
            description: String::new(),
            rule_cards: vec!["*.yml".to_string()],
            output_file: "out.json".to_string(),
            domains: vec![],
        }
    }

    #[test]
    fn test_slug() {
        assert_eq!(agent("secrets-specialist").slug(), "secrets-specialist");
        assert_eq!(agent("Secrets Specialist").slug(), "secrets-specialist");
        assert_eq!(agent("  API / Auth__v2 ").slug(), "api-auth-v2");
    }

    #[test]
    fn test_manifest_defaults() {
        let yaml = "agents:\n  - name: a\n    rule_cards: ['x/*.yml']\n    output_file: a.json\n";
        let manifest: AgentManifest = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(manifest.agents.len(), 1);
        assert!(manifest.agents[0].domains.is_empty());
        assert!(manifest.agents[0].description.is_empty());
    }
}
