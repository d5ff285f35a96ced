pub mod context;
pub mod env;
pub mod model;
pub mod normalize;
pub mod resolve;
pub mod validate;

use std::path::Path;

use anyhow::{Context as _, Result};

use crate::config::context::Context;
use crate::config::model::{GitMethod, RawConfig};
use crate::error::ZapError;
use crate::state::StateStore;

/// CLI-level overrides applied on top of the config file.
#[derive(Debug, Clone, Copy, Default)]
pub struct CliOverrides {
    pub http: bool,
    pub ssh: bool,
}

impl CliOverrides {
    /// Translate the flag pair into a git method override. Supplying both
    /// is a contradiction and fails the load.
    pub fn git_method(&self) -> Result<Option<GitMethod>, ZapError> {
        match (self.http, self.ssh) {
            (true, true) => Err(ZapError::ConflictingGitMethod),
            (true, false) => Ok(Some(GitMethod::Http)),
            (false, true) => Ok(Some(GitMethod::Ssh)),
            (false, false) => Ok(None),
        }
    }
}

/// Load a config file into a normalized, validated Context.
///
/// Pipeline: read YAML → parse raw shapes → read persisted state →
/// normalize → validate → apply CLI overrides.
pub fn load_context(config_path: &Path, overrides: &CliOverrides) -> Result<Context> {
    let content = std::fs::read_to_string(config_path)
        .with_context(|| format!("reading config file {}", config_path.display()))?;
    let raw: RawConfig = serde_yaml::from_str(&content)
        .with_context(|| format!("parsing config file {}", config_path.display()))?;

    let project_root = config_path
        .parent()
        .unwrap_or_else(|| Path::new("."))
        .to_path_buf();
    let state = StateStore::new(&project_root).load();

    let mut ctx = normalize::normalize(raw, &project_root, state)?;
    validate::validate(&ctx)?;

    if let Some(method) = overrides.git_method()? {
        ctx.git_method = method;
    }

    Ok(ctx)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write_config(dir: &TempDir, yaml: &str) -> std::path::PathBuf {
        let path = dir.path().join("zapper.yml");
        std::fs::write(&path, yaml).unwrap();
        path
    }

    #[test]
    fn load_minimal_project() {
        let tmp = TempDir::new().unwrap();
        let path = write_config(&tmp, "project: shop\nnative:\n  api:\n    cmd: npm start\n");
        let ctx = load_context(&path, &CliOverrides::default()).unwrap();
        assert_eq!(ctx.project_name, "shop");
        assert_eq!(ctx.project_root, tmp.path());
    }

    #[test]
    fn conflicting_git_flags_rejected() {
        let tmp = TempDir::new().unwrap();
        let path = write_config(&tmp, "project: shop\n");
        let overrides = CliOverrides {
            http: true,
            ssh: true,
        };
        let err = load_context(&path, &overrides).unwrap_err();
        assert!(err
            .downcast_ref::<ZapError>()
            .is_some_and(|e| matches!(e, ZapError::ConflictingGitMethod)));
    }

    #[test]
    fn ssh_flag_overrides_config_method() {
        let tmp = TempDir::new().unwrap();
        let path = write_config(&tmp, "project: shop\ngit_method: http\n");
        let overrides = CliOverrides {
            http: false,
            ssh: true,
        };
        let ctx = load_context(&path, &overrides).unwrap();
        assert_eq!(ctx.git_method, GitMethod::Ssh);
    }

    #[test]
    fn active_state_feeds_normalization() {
        let tmp = TempDir::new().unwrap();
        let path = write_config(
            &tmp,
            "project: shop\nenv_files:\n  default: [.env]\n  staging: [.env.staging]\n",
        );
        std::fs::create_dir_all(tmp.path().join(".zap")).unwrap();
        std::fs::write(
            tmp.path().join(".zap/state.json"),
            r#"{"activeEnvironment":"staging"}"#,
        )
        .unwrap();

        let ctx = load_context(&path, &CliOverrides::default()).unwrap();
        assert!(ctx.env_files[0].ends_with(".env.staging"));
    }
}
