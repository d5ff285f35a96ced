//! The facade that wires configuration, state, planning, and execution
//! together and exposes the verbs the CLI layer calls.

pub mod executor;
pub mod graph;
pub mod health;
pub mod planner;

use std::collections::BTreeSet;
use std::path::Path;

use anyhow::Result;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::config::context::{Context, ServiceKind};
use crate::config::{load_context, CliOverrides};
use crate::docker::ContainerPort;
use crate::error::ZapError;
use crate::git;
use crate::instance::{resolve_instance, Instance};
use crate::naming::{build_service_name, parse_service_name};
use crate::state::StateStore;
use crate::supervisor::wrapper::{logs_dir, remove_log_file, remove_wrapper_scripts};
use crate::supervisor::{ProcStatus, SupervisorPort};
use crate::tasks;
use crate::ui::status::{print_links, print_status, StatusRow};

use executor::Executor;
use planner::{plan, Op};

pub struct Orchestrator<S, C> {
    ctx: Option<Context>,
    instance: Option<Instance>,
    state: Option<StateStore>,
    supervisor: S,
    containers: C,
    cancel: CancellationToken,
}

impl<S: SupervisorPort, C: ContainerPort> Orchestrator<S, C> {
    /// A facade with no context loaded; every verb fails with
    /// `ContextNotLoaded` until `load_config` runs.
    pub fn unloaded(supervisor: S, containers: C) -> Self {
        Self {
            ctx: None,
            instance: None,
            state: None,
            supervisor,
            containers,
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_context(ctx: Context, supervisor: S, containers: C) -> Self {
        let mut orchestrator = Self::unloaded(supervisor, containers);
        orchestrator.install_context(ctx);
        orchestrator
    }

    pub fn load_config(&mut self, config_path: &Path, overrides: &CliOverrides) -> Result<()> {
        let ctx = load_context(config_path, overrides)?;
        self.install_context(ctx);
        Ok(())
    }

    fn install_context(&mut self, ctx: Context) {
        self.instance = Some(resolve_instance(&ctx.project_root, false));
        self.state = Some(StateStore::new(&ctx.project_root));
        self.ctx = Some(ctx);
    }

    /// Token the CLI layer cancels on user interrupt; outstanding waves
    /// observe it between actions.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn context(&self) -> Result<&Context, ZapError> {
        self.ctx.as_ref().ok_or(ZapError::ContextNotLoaded)
    }

    fn state_store(&self) -> Result<&StateStore, ZapError> {
        self.state.as_ref().ok_or(ZapError::ContextNotLoaded)
    }

    fn instance_segment(&self) -> Option<&str> {
        self.instance.as_ref().and_then(|i| i.id_segment())
    }

    fn wire(&self, service: &str) -> Result<String, ZapError> {
        let ctx = self.context()?;
        Ok(build_service_name(
            &ctx.project_name,
            service,
            self.instance_segment(),
        ))
    }

    /// Map a wire name back to a canonical service name, when it belongs to
    /// this project and instance.
    fn canonical_of(&self, wire_name: &str) -> Option<String> {
        let ctx = self.ctx.as_ref()?;
        let parsed = parse_service_name(wire_name)?;
        (parsed.project == ctx.project_name
            && parsed.instance.as_deref() == self.instance_segment())
        .then_some(parsed.service)
    }

    /// Resolve user input (canonical name or alias) to a canonical name.
    pub fn resolve_service_name(&self, input: &str) -> Result<String, ZapError> {
        let ctx = self.context()?;
        ctx.alias_map().get(input).cloned().ok_or_else(|| {
            ZapError::service_not_found(vec![input.to_string()], ctx.service_names())
        })
    }

    fn resolve_targets(&self, names: &[String]) -> Result<Vec<String>, ZapError> {
        let ctx = self.context()?;
        let map = ctx.alias_map();
        let mut targets = Vec::new();
        let mut missing = Vec::new();
        for name in names {
            match map.get(name) {
                Some(canonical) => targets.push(canonical.clone()),
                None => missing.push(name.clone()),
            }
        }
        if !missing.is_empty() {
            return Err(ZapError::service_not_found(missing, ctx.service_names()));
        }
        Ok(targets)
    }

    /// Snapshot of canonical names currently live: native services the
    /// supervisor lists as online, containers whose status is running/up.
    async fn observed_running(&self) -> Result<BTreeSet<String>> {
        let mut running = BTreeSet::new();

        for process in self.supervisor.list().await? {
            if process.status != ProcStatus::Online {
                continue;
            }
            if let Some(name) = self.canonical_of(&process.name) {
                running.insert(name);
            }
        }

        for container in self.containers.list_containers().await? {
            let status = container.status.to_lowercase();
            if status != "running" && !status.contains("up") {
                continue;
            }
            if let Some(name) = self.canonical_of(&container.name) {
                running.insert(name);
            }
        }

        Ok(running)
    }

    async fn reconcile(&self, op: Op, names: &[String], force_start: bool) -> Result<()> {
        let ctx = self.context()?;
        if ctx.is_empty() {
            return Err(ZapError::NoServicesDefined.into());
        }
        let targets = self.resolve_targets(names)?;
        let running = self.observed_running().await?;

        let plan = plan(
            op,
            &targets,
            &ctx.service_nodes(),
            &running,
            force_start,
            ctx.state.active_profile.as_deref(),
        )?;

        if plan.is_empty() {
            info!("nothing to do");
            return Ok(());
        }

        let executor = Executor::new(
            ctx,
            self.instance_segment().map(str::to_string),
            &self.supervisor,
            &self.containers,
            self.state_store()?,
        )
        .with_cancellation(self.cancel.clone());
        executor.execute(&plan).await
    }

    pub async fn start_processes(&self, names: &[String], force: bool) -> Result<()> {
        self.reconcile(Op::Start, names, force).await
    }

    pub async fn stop_processes(&self, names: &[String]) -> Result<()> {
        self.reconcile(Op::Stop, names, false).await
    }

    pub async fn restart_processes(&self, names: &[String]) -> Result<()> {
        self.reconcile(Op::Restart, names, false).await
    }

    pub async fn show_logs(&self, name: &str, follow: bool) -> Result<()> {
        let canonical = self.resolve_service_name(name)?;
        let ctx = self.context()?;
        let wire = self.wire(&canonical)?;
        match ctx.service_kind(&canonical) {
            Some(ServiceKind::Native) => self.supervisor.logs(&wire, follow).await?,
            Some(ServiceKind::Docker) => self.containers.show_logs(&wire, follow).await?,
            None => unreachable!("resolve_service_name returned an unknown service"),
        }
        Ok(())
    }

    /// Merged status view across both backends, plus configured links.
    pub async fn status(&self) -> Result<()> {
        let ctx = self.context()?;
        let supervised = self.supervisor.list().await?;
        let containers = self.containers.list_containers().await?;

        let mut rows = Vec::new();
        for process in &ctx.processes {
            let observed = supervised
                .iter()
                .find(|p| self.canonical_of(&p.name).as_deref() == Some(process.name.as_str()));
            rows.push(StatusRow {
                name: process.name.clone(),
                kind: ServiceKind::Native,
                status: observed
                    .map(|p| p.status.as_str().to_string())
                    .unwrap_or_else(|| "-".to_string()),
                uptime_ms: observed.and_then(|p| p.uptime_ms),
                cpu_percent: observed.and_then(|p| p.cpu_percent),
                memory_bytes: observed.and_then(|p| p.memory_bytes),
            });
        }
        for container in &ctx.containers {
            let observed = containers
                .iter()
                .find(|c| self.canonical_of(&c.name).as_deref() == Some(container.name.as_str()));
            // Uptime comes from inspect, which only exists for observed containers.
            let uptime_ms = match observed {
                Some(_) => self
                    .containers
                    .container_info(&self.wire(&container.name)?)
                    .await?
                    .and_then(|info| info.started_at)
                    .map(|started| started.timestamp_millis() as u64),
                None => None,
            };
            rows.push(StatusRow {
                name: container.name.clone(),
                kind: ServiceKind::Docker,
                status: observed
                    .map(|c| c.status.clone())
                    .unwrap_or_else(|| "-".to_string()),
                uptime_ms,
                cpu_percent: None,
                memory_bytes: None,
            });
        }

        print_status(&ctx.project_name, &rows);
        print_links(&ctx.links);
        Ok(())
    }

    /// Stop everything, delete supervised entries and containers, and wipe
    /// runtime state. The instance document survives so an isolated checkout
    /// stays isolated.
    pub async fn reset(&self) -> Result<()> {
        let ctx = self.context()?;
        if !ctx.is_empty() {
            self.reconcile(Op::Stop, &[], false).await?;
        }

        for process in &ctx.processes {
            let wire = self.wire(&process.name)?;
            if let Err(e) = self.supervisor.delete(&wire).await {
                tracing::debug!(service = %process.name, "no supervised entry to delete: {}", e);
            }
            remove_log_file(&ctx.project_root, &ctx.project_name, &process.name)?;
            remove_wrapper_scripts(&ctx.project_root, &ctx.project_name, &process.name)?;
        }
        for container in &ctx.containers {
            let wire = self.wire(&container.name)?;
            if let Err(e) = self.containers.stop_container(&wire).await {
                tracing::debug!(service = %container.name, "no container to remove: {}", e);
            }
        }

        self.state_store()?.remove()?;
        let _ = std::fs::remove_dir_all(logs_dir(&ctx.project_root));
        info!("project reset");
        Ok(())
    }

    pub async fn run_task(&self, name: &str, args: &[(String, String)]) -> Result<()> {
        tasks::run_task(self.context()?, name, args).await
    }

    pub async fn clone_repos(&self, names: &[String]) -> Result<()> {
        let targets = if names.is_empty() {
            Vec::new()
        } else {
            self.resolve_targets(names)?
        };
        git::clone_repos(self.context()?, &targets).await
    }

    pub async fn git_checkout_all(&self, branch: &str) -> Result<()> {
        git::checkout_all(self.context()?, branch).await
    }

    pub async fn git_pull_all(&self) -> Result<()> {
        git::pull_all(self.context()?).await
    }

    pub async fn git_status_all(&self) -> Result<()> {
        git::status_all(self.context()?).await
    }

    pub async fn set_active_profile(&self, profile: Option<String>) -> Result<()> {
        if let Some(profile) = &profile {
            let ctx = self.context()?;
            if !ctx.profiles.contains(profile) {
                anyhow::bail!(
                    "unknown profile `{}` (available: {})",
                    profile,
                    ctx.profiles.join(", ")
                );
            }
        }
        self.state_store()?.set_active_profile(profile).await?;
        Ok(())
    }

    /// Print one service's resolved environment, sorted by key.
    pub fn show_env(&self, name: &str) -> Result<()> {
        let canonical = self.resolve_service_name(name)?;
        let ctx = self.context()?;
        let env = ctx
            .process(&canonical)
            .map(|p| &p.resolved_env)
            .or_else(|| ctx.container(&canonical).map(|c| &c.resolved_env))
            .expect("resolved name is a known service");
        for (key, value) in env {
            println!("{key}={value}");
        }
        Ok(())
    }

    pub async fn set_active_environment(&self, environment: Option<String>) -> Result<()> {
        if let Some(environment) = &environment {
            let ctx = self.context()?;
            if !ctx.environments.contains(environment) {
                return Err(ZapError::EnvironmentNotFound {
                    name: environment.clone(),
                    available: ctx.environments.iter().cloned().collect(),
                }
                .into());
            }
        }
        self.state_store()?
            .set_active_environment(environment)
            .await?;
        Ok(())
    }
}
