//! Production supervisor port: a stateless wrapper around the pm2 CLI.

use std::path::{Path, PathBuf};
use std::process::Output;
use std::time::Duration;

use serde::Deserialize;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tracing::{debug, warn};

use crate::error::{BackendKind, Result, ZapError};
use crate::naming::parse_service_name;
use crate::platform::kill_process_tree;
use crate::supervisor::wrapper::log_path;
use crate::supervisor::{ProcStatus, ProcessInfo, StartSpec, SupervisorPort};
use crate::ui::logs::strip_supervisor_prefix;

/// Contracts owed to the supervisor, not enforced by the core.
const MAX_RESTARTS: u32 = 2;
const MIN_UPTIME_MS: u64 = 4000;

/// pm2 reports this when its in-memory daemon no longer matches the
/// installed version; a daemon kill and one retry recovers it.
const OUT_OF_DATE_MARKER: &str = "out-of-date";
const DAEMON_RESET_DELAY: Duration = Duration::from_millis(500);

pub struct Pm2 {
    project_root: PathBuf,
}

impl Pm2 {
    pub fn new(project_root: &Path) -> Self {
        Self {
            project_root: project_root.to_path_buf(),
        }
    }

    async fn run_once(&self, args: &[&str]) -> Result<Output> {
        debug!(?args, "pm2");
        let output = Command::new("pm2")
            .args(args)
            .output()
            .await
            .map_err(|e| ZapError::backend(BackendKind::Supervisor, e.to_string()))?;
        if !output.status.success() {
            let mut stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            if stderr.is_empty() {
                stderr = String::from_utf8_lossy(&output.stdout).trim().to_string();
            }
            return Err(ZapError::backend(BackendKind::Supervisor, stderr));
        }
        Ok(output)
    }

    /// Run a pm2 command, recovering once from an out-of-date daemon by
    /// killing it, waiting, and retrying the same command.
    async fn run(&self, args: &[&str]) -> Result<Output> {
        match self.run_once(args).await {
            Err(ZapError::BackendFailure { stderr, .. }) if stderr.contains(OUT_OF_DATE_MARKER) => {
                warn!("supervisor daemon state out-of-date, resetting and retrying");
                let _ = Command::new("pm2").arg("kill").output().await;
                tokio::time::sleep(DAEMON_RESET_DELAY).await;
                self.run_once(args).await
            }
            other => other,
        }
    }

    async fn pid_of(&self, wire_name: &str) -> Option<u32> {
        let processes = self.list().await.ok()?;
        processes
            .into_iter()
            .find(|p| p.name == wire_name)
            .and_then(|p| p.pid)
    }

    fn log_path_for(&self, wire_name: &str) -> Option<PathBuf> {
        let parsed = parse_service_name(wire_name)?;
        Some(log_path(&self.project_root, &parsed.project, &parsed.service))
    }
}

impl SupervisorPort for Pm2 {
    async fn list(&self) -> Result<Vec<ProcessInfo>> {
        let output = self.run(&["jlist"]).await?;
        let stdout = String::from_utf8_lossy(&output.stdout);
        parse_jlist(&stdout)
    }

    async fn start(&self, spec: &StartSpec) -> Result<()> {
        let ecosystem = ecosystem_json(spec);
        let path = spec.script.with_extension("ecosystem.json");
        std::fs::write(&path, ecosystem.to_string())
            .map_err(|e| ZapError::backend(BackendKind::Supervisor, e.to_string()))?;

        let path_str = path.to_string_lossy();
        let result = self.run(&["start", path_str.as_ref()]).await;
        // The ecosystem spec is ephemeral; pm2 has read it once start returns.
        let _ = std::fs::remove_file(&path);
        result.map(|_| ())
    }

    async fn stop(&self, wire_name: &str) -> Result<()> {
        if let Some(pid) = self.pid_of(wire_name).await {
            kill_process_tree(pid).await;
        }
        self.run(&["stop", wire_name]).await.map(|_| ())
    }

    async fn delete(&self, wire_name: &str) -> Result<()> {
        self.run(&["delete", wire_name]).await.map(|_| ())
    }

    async fn restart(&self, wire_name: &str) -> Result<()> {
        if let Some(pid) = self.pid_of(wire_name).await {
            kill_process_tree(pid).await;
        }
        self.run(&["restart", wire_name]).await.map(|_| ())
    }

    async fn logs(&self, wire_name: &str, follow: bool) -> Result<()> {
        if !follow {
            let Some(path) = self.log_path_for(wire_name) else {
                return Ok(());
            };
            match std::fs::read_to_string(&path) {
                Ok(content) => print!("{content}"),
                Err(_) => warn!(path = %path.display(), "no log file yet"),
            }
            return Ok(());
        }

        let mut child = Command::new("pm2")
            .args(["logs", wire_name, "--raw"])
            .stdout(std::process::Stdio::piped())
            .spawn()
            .map_err(|e| ZapError::backend(BackendKind::Supervisor, e.to_string()))?;
        if let Some(stdout) = child.stdout.take() {
            let mut lines = BufReader::new(stdout).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                println!("{}", strip_supervisor_prefix(&line));
            }
        }
        let _ = child.wait().await;
        Ok(())
    }
}

fn ecosystem_json(spec: &StartSpec) -> serde_json::Value {
    serde_json::json!({
        "apps": [{
            "name": spec.wire_name,
            "script": spec.script,
            "interpreter": spec.interpreter,
            "cwd": spec.cwd,
            "env": spec.env,
            "out_file": spec.log_path,
            "error_file": spec.log_path,
            "merge_logs": true,
            "autorestart": true,
            "max_restarts": MAX_RESTARTS,
            "min_uptime": MIN_UPTIME_MS,
        }]
    })
}

#[derive(Debug, Deserialize)]
struct JlistEntry {
    name: String,
    #[serde(default)]
    pid: Option<u32>,
    pm2_env: JlistEnv,
    #[serde(default)]
    monit: Option<JlistMonit>,
}

#[derive(Debug, Deserialize)]
struct JlistEnv {
    status: String,
    #[serde(default)]
    pm_uptime: Option<u64>,
    #[serde(default)]
    restart_time: Option<u32>,
    #[serde(default)]
    pm_cwd: Option<String>,
}

#[derive(Debug, Deserialize)]
struct JlistMonit {
    #[serde(default)]
    memory: Option<u64>,
    #[serde(default)]
    cpu: Option<f64>,
}

fn parse_jlist(stdout: &str) -> Result<Vec<ProcessInfo>> {
    // pm2 prints "[PM2] ..." daemon chatter before the JSON array when the
    // daemon was just spawned; the array opens on the last line that starts
    // with a bracket and runs to the end of the output.
    let mut json_start = 0;
    let mut offset = 0;
    for line in stdout.lines() {
        if line.trim_start().starts_with('[') {
            json_start = offset;
        }
        offset += line.len() + 1;
    }
    let entries: Vec<JlistEntry> = serde_json::from_str(stdout[json_start..].trim())
        .map_err(|e| ZapError::backend(BackendKind::Supervisor, format!("unreadable jlist output: {e}")))?;

    Ok(entries
        .into_iter()
        .map(|entry| ProcessInfo {
            status: ProcStatus::parse(&entry.pm2_env.status),
            pid: entry.pid.filter(|&pid| pid != 0),
            uptime_ms: entry.pm2_env.pm_uptime,
            restarts: entry.pm2_env.restart_time,
            cwd: entry.pm2_env.pm_cwd.map(PathBuf::from),
            memory_bytes: entry.monit.as_ref().and_then(|m| m.memory),
            cpu_percent: entry.monit.as_ref().and_then(|m| m.cpu),
            name: entry.name,
        })
        .collect())
}
