//! Error types for the Rule Card compiler.
//!
//! Defines a unified error type whose variants map to stable report codes.

use std::path::{Path, PathBuf};

use thiserror::Error;

/// Unified error type for compiler operations.
#[derive(Debug, Error)]
pub enum CompileError {
    #[error("{}: YAML parse error{}: {message}", file.display(), line.map(|l| format!(" at line {l}")).unwrap_or_default())]
    Parse {
        file: PathBuf,
        line: Option<usize>,
        message: String,
    },

    #[error("{}:{field}: {reason}", file.display())]
    Schema {
        file: PathBuf,
        field: String,
        reason: String,
    },

    #[error("Rejected pattern '{pattern}': {reason}")]
    Security { pattern: String, reason: String },

    #[error("Configuration error{}: {reason}", config_context(agent.as_deref(), pattern.as_deref()))]
    Config {
        agent: Option<String>,
        pattern: Option<String>,
        reason: String,
    },

    #[error("{} already exists with different content (use --force to overwrite)", path.display())]
    Exists { path: PathBuf },

    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

fn config_context(agent: Option<&str>, pattern: Option<&str>) -> String {
    match (agent, pattern) {
        (Some(a), Some(p)) => format!(" in agent '{a}' (pattern '{p}')"),
        (Some(a), None) => format!(" in agent '{a}'"),
        (None, Some(p)) => format!(" (pattern '{p}')"),
        (None, None) => String::new(),
    }
}

impl CompileError {
    /// Stable machine-readable code for reports.
    pub fn code(&self) -> &'static str {
        match self {
            CompileError::Parse { .. } => "PARSE_ERROR",
            CompileError::Schema { .. } => "SCHEMA_ERROR",
            CompileError::Security { .. } => "SECURITY_ERROR",
            CompileError::Config { .. } => "CONFIG_ERROR",
            CompileError::Exists { .. } => "EXISTS_ERROR",
            CompileError::Io { .. } => "IO_ERROR",
            CompileError::Serialization(_) => "SERIALIZATION_ERROR",
        }
    }

    pub fn schema(file: &Path, field: impl Into<String>, reason: impl Into<String>) -> Self {
        CompileError::Schema {
            file: file.to_path_buf(),
            field: field.into(),
            reason: reason.into(),
        }
    }

    pub fn security(pattern: impl Into<String>, reason: impl Into<String>) -> Self {
        CompileError::Security {
            pattern: pattern.into(),
            reason: reason.into(),
        }
    }

    /// Agent-scoped configuration error.
    pub fn agent_config(
        agent: impl Into<String>,
        pattern: Option<&str>,
        reason: impl Into<String>,
    ) -> Self {
        CompileError::Config {
            agent: Some(agent.into()),
            pattern: pattern.map(str::to_string),
            reason: reason.into(),
        }
    }

    /// Manifest-level configuration error, not tied to one agent.
    pub fn manifest(reason: impl Into<String>) -> Self {
        CompileError::Config {
            agent: None,
            pattern: None,
            reason: reason.into(),
        }
    }

    /// Attribute an unscoped configuration error to `name`.
    pub fn with_agent(self, name: &str) -> Self {
        match self {
            CompileError::Config {
                agent: None,
                pattern,
                reason,
            } => CompileError::Config {
                agent: Some(name.to_string()),
                pattern,
                reason,
            },
            other => other,
        }
    }

    pub fn io(path: &Path, source: std::io::Error) -> Self {
        CompileError::Io {
            path: path.to_path_buf(),
            source,
        }
    }

    /// One-line rendering used by `validate_cards`: `file:field — reason`.
    pub fn report_line(&self) -> String {
        match self {
            CompileError::Schema {
                file,
                field,
                reason,
            } => format!("{}:{} — {}", file.display(), field, reason),
            CompileError::Parse {
                file,
                line,
                message,
            } => match line {
                Some(l) => format!("{}:line {} — {}", file.display(), l, message),
                None => format!("{}: — {}", file.display(), message),
            },
            CompileError::Io { path, source } => format!("{}: — {}", path.display(), source),
            other => other.to_string(),
        }
    }
}

/// Result type alias for compiler operations.
pub type CompileResult<T> = Result<T, CompileError>;
