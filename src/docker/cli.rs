//! Production container port: a stateless wrapper around the docker CLI.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use tokio::process::Command;
use tracing::debug;

use crate::docker::{ContainerInfo, ContainerPort, ContainerSpec, ContainerSummary};
use crate::error::{BackendKind, Result, ZapError};

pub struct DockerCli;

impl DockerCli {
    async fn run(&self, args: &[String]) -> Result<std::process::Output> {
        debug!(?args, "docker");
        let output = Command::new("docker")
            .args(args)
            .output()
            .await
            .map_err(|e| ZapError::backend(BackendKind::Docker, e.to_string()))?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            return Err(ZapError::backend(BackendKind::Docker, stderr));
        }
        Ok(output)
    }

    /// `rm -f` the name, swallowing the failure when nothing exists to remove.
    async fn remove_if_present(&self, wire_name: &str) {
        let _ = self
            .run(&["rm".into(), "-f".into(), wire_name.to_string()])
            .await;
    }
}

/// Build the full `docker run` argument list for one container.
fn run_args(wire_name: &str, spec: &ContainerSpec) -> Vec<String> {
    let mut args: Vec<String> = vec![
        "run".into(),
        "-d".into(),
        "--name".into(),
        wire_name.to_string(),
    ];
    for (key, value) in [
        ("com.docker.compose.project", &spec.project),
        ("com.docker.compose.service", &spec.service),
        ("com.zapper.project", &spec.project),
        ("com.zapper.service", &spec.service),
    ] {
        args.push("-l".into());
        args.push(format!("{key}={value}"));
    }
    for port in &spec.ports {
        args.push("-p".into());
        args.push(port.clone());
    }
    for (name, internal_dir) in &spec.volumes {
        args.push("-v".into());
        args.push(format!("{name}:{internal_dir}"));
    }
    for network in &spec.networks {
        args.push("--network".into());
        args.push(network.clone());
    }
    for (key, value) in &spec.env {
        args.push("-e".into());
        args.push(format!("{key}={value}"));
    }
    args.push(spec.image.clone());
    if let Some(command) = &spec.command {
        args.extend(command.split_whitespace().map(str::to_string));
    }
    args
}

impl ContainerPort for DockerCli {
    async fn start_container(&self, wire_name: &str, spec: &ContainerSpec) -> Result<()> {
        self.remove_if_present(wire_name).await;
        self.run(&run_args(wire_name, spec)).await.map(|_| ())
    }

    async fn start_container_async(&self, wire_name: &str, spec: &ContainerSpec) -> Result<u32> {
        self.remove_if_present(wire_name).await;
        let args = run_args(wire_name, spec);
        debug!(?args, "docker (async)");
        let child = Command::new("docker")
            .args(&args)
            .stdout(std::process::Stdio::null())
            .stderr(std::process::Stdio::null())
            .spawn()
            .map_err(|e| ZapError::backend(BackendKind::Docker, e.to_string()))?;
        child
            .id()
            .ok_or_else(|| ZapError::backend(BackendKind::Docker, "spawned docker run had no pid"))
    }

    async fn stop_container(&self, wire_name: &str) -> Result<()> {
        // Remove rather than stop, so the next start never hits a name conflict.
        self.run(&["rm".into(), "-f".into(), wire_name.to_string()])
            .await
            .map(|_| ())
    }

    async fn container_info(&self, wire_name: &str) -> Result<Option<ContainerInfo>> {
        let output = Command::new("docker")
            .args(["inspect", wire_name])
            .output()
            .await
            .map_err(|e| ZapError::backend(BackendKind::Docker, e.to_string()))?;
        if !output.status.success() {
            // inspect fails with "No such object" for unknown names.
            return Ok(None);
        }
        let stdout = String::from_utf8_lossy(&output.stdout);
        Ok(parse_inspect(&stdout))
    }

    async fn list_containers(&self) -> Result<Vec<ContainerSummary>> {
        let output = self
            .run(&[
                "ps".into(),
                "-a".into(),
                "--format".into(),
                "{{json .}}".into(),
            ])
            .await?;
        let stdout = String::from_utf8_lossy(&output.stdout);
        Ok(parse_ps_lines(&stdout))
    }

    async fn create_volume(&self, name: &str) -> Result<()> {
        // Volume creation is idempotent; an existing volume is fine.
        let _ = self
            .run(&["volume".into(), "create".into(), name.to_string()])
            .await;
        Ok(())
    }

    async fn show_logs(&self, wire_name: &str, follow: bool) -> Result<()> {
        let mut args = vec!["logs".to_string()];
        if follow {
            args.push("-f".into());
        }
        args.push(wire_name.to_string());
        let status = Command::new("docker")
            .args(&args)
            .status()
            .await
            .map_err(|e| ZapError::backend(BackendKind::Docker, e.to_string()))?;
        if !status.success() {
            return Err(ZapError::backend(
                BackendKind::Docker,
                format!("docker logs exited with {status}"),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct InspectEntry {
    id: String,
    name: String,
    created: Option<String>,
    state: Option<InspectState>,
    network_settings: Option<InspectNetworkSettings>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct InspectState {
    status: Option<String>,
    started_at: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct InspectNetworkSettings {
    networks: Option<std::collections::BTreeMap<String, serde_json::Value>>,
}

fn parse_timestamp(value: Option<&str>) -> Option<DateTime<Utc>> {
    // Docker reports zero timestamps for never-started containers.
    let value = value?;
    if value.starts_with("0001-") {
        return None;
    }
    DateTime::parse_from_rfc3339(value)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

fn parse_inspect(stdout: &str) -> Option<ContainerInfo> {
    let entries: Vec<InspectEntry> = serde_json::from_str(stdout.trim()).ok()?;
    let entry = entries.into_iter().next()?;
    Some(ContainerInfo {
        status: entry
            .state
            .as_ref()
            .and_then(|s| s.status.clone())
            .unwrap_or_default(),
        started_at: parse_timestamp(
            entry
                .state
                .as_ref()
                .and_then(|s| s.started_at.as_deref()),
        ),
        created: parse_timestamp(entry.created.as_deref()),
        networks: entry
            .network_settings
            .and_then(|n| n.networks)
            .map(|n| n.into_keys().collect())
            .unwrap_or_default(),
        // inspect names carry a leading slash
        name: entry.name.trim_start_matches('/').to_string(),
        id: entry.id,
    })
}

#[derive(Debug, Deserialize)]
struct PsEntry {
    #[serde(rename = "ID")]
    id: String,
    #[serde(rename = "Names")]
    names: String,
    #[serde(rename = "Image")]
    image: String,
    #[serde(rename = "Status")]
    status: String,
}

fn parse_ps_lines(stdout: &str) -> Vec<ContainerSummary> {
    stdout
        .lines()
        .filter(|line| !line.trim().is_empty())
        .filter_map(|line| serde_json::from_str::<PsEntry>(line).ok())
        .map(|entry| ContainerSummary {
            id: entry.id,
            name: entry.names,
            image: entry.image,
            status: entry.status,
        })
        .collect()
}
