use assert_cmd::Command;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Isolated workspace with a Rule Card corpus, a manifest and an output dir.
pub struct TestEnv {
    _tmp: TempDir,
    pub root: PathBuf,
}

impl TestEnv {
    pub fn new() -> Self {
        let tmp = TempDir::new().expect("create temp dir");
        let root = tmp.path().to_path_buf();
        fs::create_dir_all(root.join("rules")).expect("create corpus root");
        Self { _tmp: tmp, root }
    }

    pub fn rules(&self) -> PathBuf {
        self.root.join("rules")
    }

    pub fn out(&self) -> PathBuf {
        self.root.join("out")
    }

    pub fn manifest(&self) -> PathBuf {
        self.root.join("agents.yaml")
    }

    pub fn write_card(&self, rel: &str, content: &str) -> PathBuf {
        let path = self.rules().join(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("create card dir");
        }
        fs::write(&path, content).expect("write card");
        path
    }

    pub fn write_manifest(&self, content: &str) {
        fs::write(self.manifest(), content).expect("write manifest");
    }

    pub fn read_package(&self, name: &str) -> serde_json::Value {
        let bytes = fs::read(self.out().join(name)).expect("read package");
        serde_json::from_slice(&bytes).expect("package is JSON")
    }

    /// `compile_agents` pointed at this workspace.
    pub fn compile(&self) -> Command {
        let mut cmd = Command::cargo_bin("compile_agents").expect("compile_agents binary");
        cmd.current_dir(&self.root)
            .env_remove("RUST_LOG")
            .arg("--manifest")
            .arg(self.manifest())
            .arg("--corpus")
            .arg(self.rules())
            .arg("--output")
            .arg(self.out());
        cmd
    }

    pub fn validate(&self, path: &Path) -> Command {
        let mut cmd = Command::cargo_bin("validate_cards").expect("validate_cards binary");
        cmd.current_dir(&self.root).env_remove("RUST_LOG").arg(path);
        cmd
    }
}

pub fn card(id: &str, detect: &[(&str, &[&str])]) -> String {
    let mut detect_yaml = String::new();
    for (tool, ids) in detect {
        detect_yaml.push_str(&format!("  {}: [{}]\n", tool, ids.join(", ")));
    }
    format!(
        "id: {id}\n\
         title: Requirement {id}\n\
         severity: critical\n\
         scope: all services\n\
         requirement: Keep secrets out of source control.\n\
         do:\n  - Use the platform secret store\n\
         dont:\n  - Log credentials\n\
         detect:\n{detect_yaml}\
         verify:\n  tests:\n    - Scanner finds no secrets\n\
         refs:\n  owasp:\n    - A02:2021\n"
    )
}

pub const SECRETS_AND_EMPTY: &str = r#"
agents:
  - name: secrets-specialist
    description: Secrets handling guidance
    rule_cards:
      - "secrets/*.yml"
    output_file: secrets-specialist.json
    domains: [secrets]
  - name: crypto-specialist
    description: Cryptography guidance
    rule_cards:
      - "crypto/*.yml"
    output_file: crypto-specialist.json
    domains: [crypto]
"#;
