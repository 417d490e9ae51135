//! Configuration module for the Rule Card compiler.
//!
//! Loads configuration from YAML files and environment variables.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use config::{Config as ConfigLoader, ConfigError, Environment, File};
use serde::Deserialize;

/// Root configuration structure.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub compiler: CompilerConfig,
    pub package: PackageConfig,
    pub logging: LoggingConfig,
}

/// Input and output locations for a compile run.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CompilerConfig {
    /// Directory holding the Rule Card corpus; manifest patterns are relative to it.
    pub corpus_root: PathBuf,
    /// Agent manifest file.
    pub manifest: PathBuf,
    /// Directory receiving compiled packages.
    pub output_dir: PathBuf,
    /// Abort the whole run on the first card or agent failure.
    pub strict: bool,
}

/// Metadata stamped into every compiled package.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PackageConfig {
    /// Semantic version prefix; the VCS revision is appended as build metadata.
    pub base_version: String,
    pub attribution: String,
    /// Embedded verbatim as `policy.defaults`.
    pub policy_defaults: BTreeMap<String, String>,
}

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub format: LogFormat,
}

impl Config {
    /// Load configuration from files and environment.
    ///
    /// Priority (highest to lowest):
    /// 1. Environment variables (RULECARD__*)
    /// 2. `explicit` file, when given (must exist)
    /// 3. config/local.yaml (if exists)
    /// 4. config/default.yaml (if exists)
    /// 5. Built-in defaults
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        let mut builder = ConfigLoader::builder()
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name("config/local").required(false));

        if let Some(path) = explicit {
            builder = builder.add_source(File::from(path).required(true));
        }

        let config = builder
            .add_source(
                Environment::with_prefix("RULECARD")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }
}

impl Default for CompilerConfig {
    fn default() -> Self {
        Self {
            corpus_root: PathBuf::from("rules"),
            manifest: PathBuf::from("agents.yaml"),
            output_dir: PathBuf::from("dist/agents"),
            strict: false,
        }
    }
}

impl Default for PackageConfig {
    fn default() -> Self {
        let mut policy_defaults = BTreeMap::new();
        policy_defaults.insert("enforcement".to_string(), "advisory".to_string());
        policy_defaults.insert("min_severity".to_string(), "low".to_string());

        Self {
            base_version: "1.0.0".to_string(),
            attribution: "Compiled from version-controlled Rule Cards; do not edit by hand"
                .to_string(),
            policy_defaults,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_compiler_config() {
        let config = Config::default();
        assert_eq!(config.compiler.corpus_root, PathBuf::from("rules"));
        assert_eq!(config.compiler.manifest, PathBuf::from("agents.yaml"));
        assert!(!config.compiler.strict);
        assert_eq!(config.package.base_version, "1.0.0");
        assert_eq!(config.logging.format, LogFormat::Text);
        assert!(!config.package.policy_defaults.is_empty());
    }

    #[test]
    fn test_explicit_file_overrides_defaults() {
        let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        writeln!(
            file,
            "compiler:\n  strict: true\n  output_dir: out\npackage:\n  base_version: 2.3.0\nlogging:\n  format: json"
        )
        .unwrap();

        let config = Config::load(Some(file.path())).unwrap();
        assert!(config.compiler.strict);
        assert_eq!(config.compiler.output_dir, PathBuf::from("out"));
        assert_eq!(config.compiler.manifest, PathBuf::from("agents.yaml"));
        assert_eq!(config.package.base_version, "2.3.0");
        assert_eq!(config.logging.format, LogFormat::Json);
    }

    #[test]
    fn test_missing_explicit_file_is_an_error() {
        let result = Config::load(Some(Path::new("/nonexistent/rulecard-config.yaml")));
        assert!(result.is_err());
    }
}
