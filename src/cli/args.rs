//! Clap argument definitions for the two compiler binaries.

use std::path::PathBuf;

use clap::Parser;

use crate::config::CompilerConfig;
use crate::engine::RunOptions;

/// Validate Rule Card files
///
/// Checks one card file or every card under a directory, including id
/// uniqueness across the directory.
#[derive(Parser, Debug)]
#[command(name = "validate_cards", version)]
pub struct ValidateArgs {
    /// Rule Card file or directory tree
    pub path: PathBuf,

    /// Also list every valid card and enable debug logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Configuration file layered over config/default.yaml
    #[arg(long, env = "RULECARD_CONFIG")]
    pub config: Option<PathBuf>,
}

/// Compile agent packages from the Rule Card corpus
#[derive(Parser, Debug)]
#[command(name = "compile_agents", version)]
pub struct CompileArgs {
    /// Agent manifest (default: compiler.manifest from config)
    #[arg(long)]
    pub manifest: Option<PathBuf>,

    /// Rule Card corpus root (default: compiler.corpus_root from config)
    #[arg(long)]
    pub corpus: Option<PathBuf>,

    /// Output directory (default: compiler.output_dir from config)
    #[arg(long)]
    pub output: Option<PathBuf>,

    /// Overwrite packages whose content changed
    #[arg(long)]
    pub force: bool,

    /// Abort the whole run on any card or agent failure
    #[arg(long)]
    pub strict: bool,

    /// Report stale or missing packages without writing
    #[arg(long, conflicts_with = "force")]
    pub check: bool,

    /// Enable debug logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Configuration file layered over config/default.yaml
    #[arg(long, env = "RULECARD_CONFIG")]
    pub config: Option<PathBuf>,
}

impl CompileArgs {
    /// Merge flags over the configured defaults.
    pub fn run_options(&self, config: &CompilerConfig) -> RunOptions {
        let mut options = RunOptions::from_config(config);
        if let Some(manifest) = &self.manifest {
            options.manifest = manifest.clone();
        }
        if let Some(corpus) = &self.corpus {
            options.corpus_root = corpus.clone();
        }
        if let Some(output) = &self.output {
            options.output_dir = output.clone();
        }
        options.force = self.force;
        options.strict = options.strict || self.strict;
        options.check = self.check;
        options
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flags_override_config() {
        let args = CompileArgs::parse_from([
            "compile_agents",
            "--manifest",
            "m.yaml",
            "--output",
            "dist",
            "--force",
        ]);
        let options = args.run_options(&CompilerConfig::default());
        assert_eq!(options.manifest, PathBuf::from("m.yaml"));
        assert_eq!(options.output_dir, PathBuf::from("dist"));
        assert_eq!(options.corpus_root, PathBuf::from("rules"));
        assert!(options.force);
        assert!(!options.strict);
    }

    #[test]
    fn test_strict_from_config_is_kept() {
        let args = CompileArgs::parse_from(["compile_agents"]);
        let config = CompilerConfig {
            strict: true,
            ..CompilerConfig::default()
        };
        assert!(args.run_options(&config).strict);
    }

    #[test]
    fn test_check_conflicts_with_force() {
        let result = CompileArgs::try_parse_from(["compile_agents", "--check", "--force"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_validate_requires_path() {
        assert!(ValidateArgs::try_parse_from(["validate_cards"]).is_err());
        let args = ValidateArgs::try_parse_from(["validate_cards", "rules", "--verbose"]).unwrap();
        assert!(args.verbose);
    }
}
