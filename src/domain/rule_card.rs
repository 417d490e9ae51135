//! Rule Card domain types.
//!
//! A Rule Card is one atomic security requirement with its remediation
//! guidance and scanner-detection metadata.

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Severity of a security requirement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Critical,
    High,
    Medium,
    Low,
}

impl Severity {
    /// Accepted spellings, in schema order.
    pub const ALLOWED: [&'static str; 4] = ["critical", "high", "medium", "low"];
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::Critical => write!(f, "critical"),
            Severity::High => write!(f, "high"),
            Severity::Medium => write!(f, "medium"),
            Severity::Low => write!(f, "low"),
        }
    }
}

impl std::str::FromStr for Severity {
    type Err = String;

    /// Case-sensitive; the schema only admits lowercase values.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "critical" => Ok(Severity::Critical),
            "high" => Ok(Severity::High),
            "medium" => Ok(Severity::Medium),
            "low" => Ok(Severity::Low),
            _ => Err(format!(
                "'{}' is not one of {}",
                s,
                Severity::ALLOWED.join(", ")
            )),
        }
    }
}

/// Verification guidance attached to a card.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Verify {
    pub tests: Vec<String>,
}

/// A validated Rule Card.
///
/// Serialized verbatim into `rules_detail`, so field names follow the
/// YAML schema exactly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleCard {
    /// Globally unique identifier, `DOMAIN-TOPIC-NNN`.
    pub id: String,
    pub title: String,
    pub severity: Severity,
    pub scope: String,
    pub requirement: String,
    /// Recommended practices, in authoring order.
    #[serde(rename = "do")]
    pub dos: Vec<String>,
    /// Practices to avoid, in authoring order.
    pub dont: Vec<String>,
    /// Scanner tool name -> scanner rule identifiers.
    pub detect: BTreeMap<String, Vec<String>>,
    pub verify: Verify,
    /// Standard name -> reference strings.
    pub refs: BTreeMap<String, Vec<String>>,
}

/// A Rule Card together with the file it was loaded from.
///
/// The raw content is kept so the source digest covers exactly the bytes
/// authors committed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadedCard {
    pub card: RuleCard,
    /// Canonical path of the source file.
    pub path: PathBuf,
    pub raw: String,
}

impl LoadedCard {
    pub fn id(&self) -> &str {
        &self.card.id
    }
}
