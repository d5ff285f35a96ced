//! Persisted runtime state under `<projectRoot>/.zap/state.json`.
//!
//! The store is crash tolerant: a missing or unparseable document loads as
//! defaults with a warning, and every save is a read-merge-write cycle under
//! an internal lock followed by an atomic rename.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::warn;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct State {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_updated: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active_profile: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active_environment: Option<String>,
    /// Keyed by canonical instance-qualified wire name.
    #[serde(default)]
    pub services: BTreeMap<String, ServiceRuntime>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct ServiceRuntime {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_pid: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_requested_at: Option<DateTime<Utc>>,
}

pub struct StateStore {
    path: PathBuf,
    // Serializes concurrent read-merge-write cycles from parallel actions.
    write_lock: Mutex<()>,
}

impl StateStore {
    pub fn new(project_root: &Path) -> Self {
        Self {
            path: project_root.join(".zap").join("state.json"),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the current document, tolerating absence and corruption.
    pub fn load(&self) -> State {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(_) => return State::default(),
        };
        match serde_json::from_str(&content) {
            Ok(state) => state,
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "unreadable state file, using defaults");
                State::default()
            }
        }
    }

    /// Re-read, apply `mutate`, stamp `lastUpdated`, and write atomically.
    pub async fn update(&self, mutate: impl FnOnce(&mut State)) -> Result<State> {
        let _guard = self.write_lock.lock().await;
        let mut state = self.load();
        mutate(&mut state);
        state.last_updated = Some(Utc::now());
        self.write(&state)?;
        Ok(state)
    }

    fn write(&self, state: &State) -> Result<()> {
        let dir = self.path.parent().expect("state path has a parent");
        std::fs::create_dir_all(dir)
            .with_context(|| format!("creating state dir {}", dir.display()))?;
        let content = serde_json::to_string_pretty(state)?;
        // Atomic write: write to tmp file then rename
        let tmp_path = self.path.with_extension("json.tmp");
        std::fs::write(&tmp_path, &content)?;
        std::fs::rename(&tmp_path, &self.path)?;
        Ok(())
    }

    pub async fn set_active_profile(&self, profile: Option<String>) -> Result<State> {
        self.update(|state| state.active_profile = profile).await
    }

    pub async fn set_active_environment(&self, environment: Option<String>) -> Result<State> {
        self.update(|state| state.active_environment = environment)
            .await
    }

    /// Record the async start of a container under its wire name.
    pub async fn record_start(&self, wire_name: &str, pid: u32) -> Result<State> {
        let wire_name = wire_name.to_string();
        self.update(move |state| {
            state.services.insert(
                wire_name,
                ServiceRuntime {
                    start_pid: Some(pid),
                    start_requested_at: Some(Utc::now()),
                },
            );
        })
        .await
    }

    pub async fn clear_start(&self, wire_name: &str) -> Result<State> {
        let wire_name = wire_name.to_string();
        self.update(move |state| {
            state.services.remove(&wire_name);
        })
        .await
    }

    /// Remove the persisted document entirely (used by `zap reset`).
    pub fn remove(&self) -> Result<()> {
        if self.path.exists() {
            std::fs::remove_file(&self.path)?;
        }
        Ok(())
    }
}
