//! Instance resolution: decides whether this checkout runs in `normal` or
//! `isolate` mode, and mints/persists the instance id that keeps two working
//! copies of the same project (e.g. git worktrees) from colliding on
//! supervised names or container names.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::{Context, Result};
use rand::rngs::OsRng;
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::warn;

const INSTANCE_ID_LEN: usize = 6;
const INSTANCE_ID_ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InstanceMode {
    Normal,
    Isolate,
}

/// Persisted shape of `.zap/instance.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstanceConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instance_id: Option<String>,
    pub mode: InstanceMode,
}

/// The resolved instance for one invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Instance {
    pub mode: InstanceMode,
    pub id: Option<String>,
}

impl Instance {
    pub fn id_segment(&self) -> Option<&str> {
        match self.mode {
            InstanceMode::Isolate => self.id.as_deref(),
            InstanceMode::Normal => None,
        }
    }
}

fn instance_path(project_root: &Path) -> PathBuf {
    project_root.join(".zap").join("instance.json")
}

fn load_instance_config(project_root: &Path) -> Option<InstanceConfig> {
    let content = std::fs::read_to_string(instance_path(project_root)).ok()?;
    serde_json::from_str(&content).ok()
}

/// Resolve the instance for a project root.
///
/// An `instance.json` carrying an id always wins. Otherwise, a project root
/// sitting inside a git worktree resolves to normal mode but emits a one-time
/// warning urging the user to isolate, since supervised names would collide
/// with the primary checkout's.
pub fn resolve_instance(project_root: &Path, suppress_worktree_warning: bool) -> Instance {
    if let Some(config) = load_instance_config(project_root) {
        if let Some(id) = config.instance_id {
            return Instance {
                mode: InstanceMode::Isolate,
                id: Some(id),
            };
        }
    }

    if in_git_worktree(project_root) && !suppress_worktree_warning {
        static WARNED: AtomicBool = AtomicBool::new(false);
        if !WARNED.swap(true, Ordering::Relaxed) {
            warn!(
                "WORKTREE detected at {} -- service names will collide with the primary \
                 checkout; run `zap isolate` to give this copy its own namespace",
                project_root.display()
            );
        }
    }

    Instance {
        mode: InstanceMode::Normal,
        id: None,
    }
}

/// Switch a project root to isolate mode, persisting `.zap/instance.json`.
///
/// A requested id is persisted verbatim, overwriting any prior id. Without
/// one, an existing id is reused, otherwise a fresh six-character id is
/// minted from a cryptographic RNG. Returns the effective id.
pub fn isolate_project(project_root: &Path, requested_id: Option<&str>) -> Result<String> {
    let id = match requested_id {
        Some(id) => id.to_string(),
        None => match load_instance_config(project_root).and_then(|c| c.instance_id) {
            Some(existing) => existing,
            None => mint_instance_id(),
        },
    };

    let config = InstanceConfig {
        instance_id: Some(id.clone()),
        mode: InstanceMode::Isolate,
    };

    let path = instance_path(project_root);
    let dir = path.parent().expect("instance path has a parent");
    std::fs::create_dir_all(dir)
        .with_context(|| format!("creating state dir {}", dir.display()))?;
    let content = serde_json::to_string_pretty(&config)?;
    std::fs::write(&path, content)
        .with_context(|| format!("writing {}", path.display()))?;

    Ok(id)
}

fn mint_instance_id() -> String {
    let mut rng = OsRng;
    (0..INSTANCE_ID_LEN)
        .map(|_| {
            let idx = rng.gen_range(0..INSTANCE_ID_ALPHABET.len());
            INSTANCE_ID_ALPHABET[idx] as char
        })
        .collect()
}

/// A worktree checkout has a `.git` regular file (not a directory) whose
/// `gitdir:` line points into a `worktrees/` subtree of another repository.
fn in_git_worktree(project_root: &Path) -> bool {
    for dir in project_root.ancestors() {
        let git_entry = dir.join(".git");
        if git_entry.is_dir() {
            return false;
        }
        if git_entry.is_file() {
            let Ok(content) = std::fs::read_to_string(&git_entry) else {
                return false;
            };
            return content
                .lines()
                .find_map(|line| line.strip_prefix("gitdir:"))
                .map(|gitdir| {
                    Path::new(gitdir.trim())
                        .components()
                        .any(|c| c.as_os_str() == "worktrees")
                })
                .unwrap_or(false);
        }
    }
    false
}
