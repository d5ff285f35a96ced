#![allow(dead_code)]
use std::path::PathBuf;
use tempfile::TempDir;

pub struct TestProject {
    pub dir: TempDir,
    pub config_path: PathBuf,
}

impl TestProject {
    pub fn new(config_yaml: &str) -> Self {
        let dir = TempDir::new().unwrap();
        let config_path = dir.path().join("zapper.yml");
        std::fs::write(&config_path, config_yaml).unwrap();
        Self { dir, config_path }
    }

    /// A `zap` invocation rooted in this project.
    pub fn zap(&self) -> assert_cmd::Command {
        let mut cmd = assert_cmd::Command::cargo_bin("zap").unwrap();
        cmd.current_dir(self.dir.path());
        cmd
    }

    pub fn state_json(&self) -> Option<serde_json::Value> {
        let content = std::fs::read_to_string(self.dir.path().join(".zap/state.json")).ok()?;
        serde_json::from_str(&content).ok()
    }

    pub fn instance_json(&self) -> Option<serde_json::Value> {
        let content =
            std::fs::read_to_string(self.dir.path().join(".zap/instance.json")).ok()?;
        serde_json::from_str(&content).ok()
    }
}

pub const MINIMAL: &str = r#"
project: shop
native:
  api:
    cmd: "true"
"#;
