//! Port over the external process supervisor.
//!
//! The core depends only on this interface; the production implementation
//! wraps the pm2 CLI. Tests substitute their own implementations, which is
//! what keeps wave execution deterministic under test.

pub mod pm2;
pub mod wrapper;

use std::collections::BTreeMap;
use std::path::PathBuf;

use crate::error::Result;

/// Supervisor-reported process status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProcStatus {
    Online,
    Stopped,
    Errored,
    Launching,
    WaitingRestart,
    Other(String),
}

impl ProcStatus {
    pub fn parse(s: &str) -> Self {
        match s {
            "online" => ProcStatus::Online,
            "stopped" => ProcStatus::Stopped,
            "errored" => ProcStatus::Errored,
            "launching" => ProcStatus::Launching,
            "waiting restart" | "waiting-restart" => ProcStatus::WaitingRestart,
            other => ProcStatus::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            ProcStatus::Online => "online",
            ProcStatus::Stopped => "stopped",
            ProcStatus::Errored => "errored",
            ProcStatus::Launching => "launching",
            ProcStatus::WaitingRestart => "waiting-restart",
            ProcStatus::Other(s) => s,
        }
    }
}

/// One row of the supervisor's process list.
#[derive(Debug, Clone)]
pub struct ProcessInfo {
    pub name: String,
    pub pid: Option<u32>,
    pub status: ProcStatus,
    pub uptime_ms: Option<u64>,
    pub memory_bytes: Option<u64>,
    pub cpu_percent: Option<f64>,
    pub restarts: Option<u32>,
    pub cwd: Option<PathBuf>,
}

/// Everything the supervisor needs to start one wrapped service.
#[derive(Debug, Clone)]
pub struct StartSpec {
    pub wire_name: String,
    /// Wrapper script to execute.
    pub script: PathBuf,
    pub interpreter: String,
    pub cwd: PathBuf,
    pub env: BTreeMap<String, String>,
    /// Merged stdout+stderr log destination.
    pub log_path: PathBuf,
}

pub trait SupervisorPort {
    fn list(&self) -> impl std::future::Future<Output = Result<Vec<ProcessInfo>>>;
    fn start(&self, spec: &StartSpec) -> impl std::future::Future<Output = Result<()>>;
    fn stop(&self, wire_name: &str) -> impl std::future::Future<Output = Result<()>>;
    fn delete(&self, wire_name: &str) -> impl std::future::Future<Output = Result<()>>;
    fn restart(&self, wire_name: &str) -> impl std::future::Future<Output = Result<()>>;
    fn logs(
        &self,
        wire_name: &str,
        follow: bool,
    ) -> impl std::future::Future<Output = Result<()>>;
}
