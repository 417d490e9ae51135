//! Integrity Stamper - computes build metadata for a package.

use std::path::PathBuf;
use std::process::Command;

use chrono::{DateTime, SecondsFormat, Utc};
use sha2::{Digest, Sha256};

use crate::domain::{BuildStamp, LoadedCard};

/// Source of the current source-control revision.
pub trait RevisionSource: Send + Sync {
    /// Short revision id, or `None` when unavailable.
    fn revision(&self) -> Option<String>;
}

/// Reads the revision with `git rev-parse` in a working directory.
pub struct GitRevision {
    workdir: PathBuf,
}

impl GitRevision {
    pub fn new(workdir: impl Into<PathBuf>) -> Self {
        Self {
            workdir: workdir.into(),
        }
    }
}

impl RevisionSource for GitRevision {
    fn revision(&self) -> Option<String> {
        let output = Command::new("git")
            .args(["rev-parse", "--short=12", "HEAD"])
            .current_dir(&self.workdir)
            .output();

        match output {
            Ok(out) if out.status.success() => {
                let rev = String::from_utf8_lossy(&out.stdout).trim().to_string();
                if !rev.is_empty() && rev.chars().all(|c| c.is_ascii_hexdigit()) {
                    Some(rev)
                } else {
                    tracing::debug!(output = %rev, "Unexpected git rev-parse output");
                    None
                }
            }
            Ok(out) => {
                tracing::debug!(
                    status = %out.status,
                    dir = %self.workdir.display(),
                    "Not a git checkout; using timestamp version"
                );
                None
            }
            Err(e) => {
                tracing::debug!(error = %e, "git unavailable; using timestamp version");
                None
            }
        }
    }
}

/// Stamps every package of one run with the same version and build date.
#[derive(Debug, Clone)]
pub struct IntegrityStamper {
    version: String,
    build_date: String,
}

impl IntegrityStamper {
    /// Resolve run-wide metadata. Never fails: a missing revision degrades
    /// to a timestamp-derived pseudo-version.
    pub fn for_run(base_version: &str, revision: &dyn RevisionSource, now: DateTime<Utc>) -> Self {
        let version = match revision.revision() {
            Some(rev) => format!("{base_version}+g{rev}"),
            None => format!("{}+t{}", base_version, now.format("%Y%m%d%H%M%S")),
        };
        let build_date = now.to_rfc3339_opts(SecondsFormat::Secs, true);

        tracing::debug!(%version, %build_date, "Build stamp resolved");
        Self {
            version,
            build_date,
        }
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    /// Stamp a rule set.
    pub fn stamp(&self, cards: &[&LoadedCard]) -> BuildStamp {
        BuildStamp {
            source_digest: source_digest(cards),
            build_date: self.build_date.clone(),
            version: self.version.clone(),
        }
    }
}

/// SHA-256 over the raw contents of `cards`, concatenated in path order.
pub fn source_digest(cards: &[&LoadedCard]) -> String {
    let mut ordered: Vec<&LoadedCard> = cards.to_vec();
    ordered.sort_by(|a, b| a.path.cmp(&b.path));

    let mut hasher = Sha256::new();
    for card in ordered {
        hasher.update(card.raw.as_bytes());
    }
    hex::encode(hasher.finalize())
}
