//! Compiled Agent Package domain types.
//!
//! The package layout is a contract with the CI scanner layer and the
//! guidance runtime; field names and nesting must not change.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::RuleCard;

/// Build metadata produced by the integrity stamper.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildStamp {
    /// Lowercase hex SHA-256 over the included card files.
    pub source_digest: String,
    /// ISO-8601 UTC timestamp.
    pub build_date: String,
    pub version: String,
}

/// Policy block of a package.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackagePolicy {
    /// Domains the agent covers.
    pub targets: Vec<String>,
    pub defaults: BTreeMap<String, String>,
}

/// Self-contained artifact for one agent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompiledAgentPackage {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub version: String,
    pub build_date: String,
    pub source_digest: String,
    pub attribution: String,
    pub policy: PackagePolicy,
    /// Sorted rule ids.
    pub rules: Vec<String>,
    /// Full card bodies, in `rules` order.
    pub rules_detail: Vec<RuleCard>,
    /// Tool name -> sorted, deduplicated scanner rule ids.
    pub validation_hooks: BTreeMap<String, Vec<String>>,
}

impl CompiledAgentPackage {
    /// Compare everything except the time-varying `build_date` and `version`.
    pub fn same_content(&self, other: &Self) -> bool {
        self.id == other.id
            && self.name == other.name
            && self.description == other.description
            && self.source_digest == other.source_digest
            && self.attribution == other.attribution
            && self.policy == other.policy
            && self.rules == other.rules
            && self.rules_detail == other.rules_detail
            && self.validation_hooks == other.validation_hooks
    }

    /// Pretty JSON with a trailing newline, as written to disk.
    pub fn to_json_bytes(&self) -> serde_json::Result<Vec<u8>> {
        let mut bytes = serde_json::to_vec_pretty(self)?;
        bytes.push(b'\n');
        Ok(bytes)
    }
}
