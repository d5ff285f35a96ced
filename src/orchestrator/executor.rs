//! Executes an Action Plan wave by wave.
//!
//! Every action in a wave runs on its own concurrent task; the wave
//! completes only after every action and every health wait has finished.
//! The first failed action aborts the reconcile with no rollback.

use std::path::PathBuf;

use anyhow::{Context as _, Result};
use futures_util::future::join_all;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::config::context::{Context, ServiceKind};
use crate::docker::{ContainerPort, ContainerSpec};
use crate::naming::build_service_name;
use crate::orchestrator::health::wait_healthy;
use crate::orchestrator::planner::{Action, ActionPlan, ActionType, ExecutionWave};
use crate::state::StateStore;
use crate::supervisor::wrapper::{
    log_path, logs_dir, remove_log_file, remove_wrapper_scripts, write_wrapper_script,
};
use crate::supervisor::{StartSpec, SupervisorPort};

pub struct Executor<'a, S, C> {
    ctx: &'a Context,
    instance: Option<String>,
    supervisor: &'a S,
    containers: &'a C,
    state: &'a StateStore,
    cancel: CancellationToken,
}

impl<'a, S: SupervisorPort, C: ContainerPort> Executor<'a, S, C> {
    pub fn new(
        ctx: &'a Context,
        instance: Option<String>,
        supervisor: &'a S,
        containers: &'a C,
        state: &'a StateStore,
    ) -> Self {
        Self {
            ctx,
            instance,
            supervisor,
            containers,
            state,
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub async fn execute(&self, plan: &ActionPlan) -> Result<()> {
        for wave in &plan.waves {
            tokio::select! {
                _ = self.cancel.cancelled() => {
                    warn!("interrupted, aborting remaining waves");
                    anyhow::bail!("interrupted");
                }
                result = self.run_wave(wave) => result?,
            }
        }
        Ok(())
    }

    async fn run_wave(&self, wave: &ExecutionWave) -> Result<()> {
        let results = join_all(wave.actions.iter().map(|a| self.run_action(a))).await;
        for result in results {
            result?;
        }

        join_all(
            wave.actions
                .iter()
                .filter(|a| a.action == ActionType::Start)
                .map(|a| wait_healthy(&a.name, &a.health_check)),
        )
        .await;

        Ok(())
    }

    async fn run_action(&self, action: &Action) -> Result<()> {
        match (action.action, action.kind) {
            (ActionType::Start, ServiceKind::Native) => self.start_native(&action.name).await,
            (ActionType::Stop, ServiceKind::Native) => self.stop_native(&action.name).await,
            (ActionType::Start, ServiceKind::Docker) => self.start_docker(&action.name).await,
            (ActionType::Stop, ServiceKind::Docker) => self.stop_docker(&action.name).await,
        }
    }

    fn wire(&self, service: &str) -> String {
        build_service_name(
            &self.ctx.project_name,
            service,
            self.instance.as_deref(),
        )
    }

    async fn start_native(&self, name: &str) -> Result<()> {
        let process = self
            .ctx
            .process(name)
            .with_context(|| format!("no native service named {name}"))?;
        let wire = self.wire(name);

        // A stale supervised entry under the same wire name would shadow the
        // new spec; delete it, tolerating absence.
        if let Err(e) = self.supervisor.delete(&wire).await {
            tracing::debug!(service = name, "no prior supervised entry: {}", e);
        }

        let root = &self.ctx.project_root;
        std::fs::create_dir_all(logs_dir(root)).context("creating logs dir")?;
        let script = write_wrapper_script(
            root,
            &self.ctx.project_name,
            name,
            &process.cmd,
            process.source.as_deref(),
        )?;

        let cwd = resolve_cwd(name, process.cwd.clone(), root.clone());

        let spec = StartSpec {
            wire_name: wire.clone(),
            script,
            interpreter: "sh".to_string(),
            cwd,
            env: process.resolved_env.clone(),
            log_path: log_path(root, &self.ctx.project_name, name),
        };
        self.supervisor.start(&spec).await?;
        info!(service = name, wire = %wire, "started");
        Ok(())
    }

    async fn stop_native(&self, name: &str) -> Result<()> {
        let wire = self.wire(name);
        self.supervisor.stop(&wire).await?;
        let root = &self.ctx.project_root;
        remove_log_file(root, &self.ctx.project_name, name)?;
        remove_wrapper_scripts(root, &self.ctx.project_name, name)?;
        info!(service = name, wire = %wire, "stopped");
        Ok(())
    }

    async fn start_docker(&self, name: &str) -> Result<()> {
        let container = self
            .ctx
            .container(name)
            .with_context(|| format!("no container named {name}"))?;
        let wire = self.wire(name);

        for volume in &container.volumes {
            self.containers.create_volume(&volume.name).await?;
        }

        let spec = ContainerSpec {
            project: self.ctx.project_name.clone(),
            service: name.to_string(),
            image: container.image.clone(),
            ports: container.ports.clone(),
            volumes: container
                .volumes
                .iter()
                .map(|v| (v.name.clone(), v.internal_dir.clone()))
                .collect(),
            networks: container.networks.clone(),
            env: container.resolved_env.clone(),
            command: container.command.clone(),
        };

        let pid = self.containers.start_container_async(&wire, &spec).await?;
        self.state.record_start(&wire, pid).await?;
        info!(service = name, wire = %wire, pid, "container starting");
        Ok(())
    }

    async fn stop_docker(&self, name: &str) -> Result<()> {
        let wire = self.wire(name);
        self.containers.stop_container(&wire).await?;
        self.state.clear_start(&wire).await?;
        info!(service = name, wire = %wire, "container removed");
        Ok(())
    }
}

/// The requested cwd must exist; otherwise fall back to the project root
/// with a warning rather than failing the start.
fn resolve_cwd(name: &str, requested: Option<PathBuf>, project_root: PathBuf) -> PathBuf {
    match requested {
        Some(cwd) if cwd.is_dir() => cwd,
        Some(cwd) => {
            warn!(
                service = name,
                cwd = %cwd.display(),
                "requested cwd does not exist, falling back to project root"
            );
            project_root
        }
        None => project_root,
    }
}
