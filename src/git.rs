//! Git helpers fanned across the project's service repositories.
//!
//! `git_method` decides how remotes are addressed: `http` and `ssh` rewrite
//! clone URLs between the two forms, `cli` delegates cloning to the `gh`
//! CLI and leaves URLs untouched.

use std::path::{Path, PathBuf};

use anyhow::Result;
use tokio::process::Command;
use tracing::{info, warn};

use crate::config::context::{Context, Process};
use crate::config::model::GitMethod;
use crate::error::{BackendKind, ZapError};

/// Rewrite a repository URL to match the configured access method.
pub fn rewrite_url(url: &str, method: GitMethod) -> String {
    match method {
        GitMethod::Cli => url.to_string(),
        GitMethod::Http => {
            // git@host:org/repo(.git) -> https://host/org/repo(.git)
            if let Some(rest) = url.strip_prefix("git@") {
                if let Some((host, path)) = rest.split_once(':') {
                    return format!("https://{host}/{path}");
                }
            }
            url.to_string()
        }
        GitMethod::Ssh => {
            // https://host/org/repo(.git) -> git@host:org/repo(.git)
            for prefix in ["https://", "http://"] {
                if let Some(rest) = url.strip_prefix(prefix) {
                    if let Some((host, path)) = rest.split_once('/') {
                        return format!("git@{host}:{path}");
                    }
                }
            }
            url.to_string()
        }
    }
}

/// Where a service's checkout lives: its cwd when declared, else a
/// directory named after the service under the project root.
fn checkout_dir(ctx: &Context, process: &Process) -> PathBuf {
    process
        .cwd
        .clone()
        .unwrap_or_else(|| ctx.project_root.join(&process.name))
}

async fn run(kind: BackendKind, program: &str, args: &[&str], cwd: &Path) -> Result<String, ZapError> {
    let output = Command::new(program)
        .args(args)
        .current_dir(cwd)
        .output()
        .await
        .map_err(|e| ZapError::backend(kind, e.to_string()))?;
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        return Err(ZapError::backend(kind, stderr));
    }
    Ok(String::from_utf8_lossy(&output.stdout).to_string())
}

/// Clone every service repo (or just `targets` when non-empty). Existing
/// checkouts are skipped.
pub async fn clone_repos(ctx: &Context, targets: &[String]) -> Result<()> {
    let mut failures = Vec::new();
    for process in &ctx.processes {
        if !targets.is_empty() && !targets.contains(&process.name) {
            continue;
        }
        let Some(repo) = &process.repo else { continue };
        let dest = checkout_dir(ctx, process);
        if dest.exists() {
            info!(service = %process.name, dest = %dest.display(), "already cloned, skipping");
            continue;
        }

        let url = rewrite_url(repo, ctx.git_method);
        info!(service = %process.name, url = %url, "cloning");
        let dest_str = dest.to_string_lossy().to_string();
        let result = match ctx.git_method {
            GitMethod::Cli => {
                run(
                    BackendKind::Git,
                    "gh",
                    &["repo", "clone", &url, &dest_str],
                    &ctx.project_root,
                )
                .await
            }
            _ => {
                run(
                    BackendKind::Git,
                    "git",
                    &["clone", &url, &dest_str],
                    &ctx.project_root,
                )
                .await
            }
        };
        if let Err(e) = result {
            warn!(service = %process.name, "clone failed: {}", e);
            failures.push(process.name.clone());
        }
    }

    if failures.is_empty() {
        Ok(())
    } else {
        Err(ZapError::backend(
            BackendKind::Git,
            format!("clone failed for: {}", failures.join(", ")),
        )
        .into())
    }
}

/// The service checkouts that are git repositories right now.
fn git_checkouts(ctx: &Context) -> Vec<(String, PathBuf)> {
    ctx.processes
        .iter()
        .map(|p| (p.name.clone(), checkout_dir(ctx, p)))
        .filter(|(_, dir)| dir.join(".git").exists())
        .collect()
}

async fn fan_out(ctx: &Context, verb: &str, args: &[&str]) -> Result<()> {
    let checkouts = git_checkouts(ctx);
    if checkouts.is_empty() {
        warn!("no git checkouts found under this project");
        return Ok(());
    }

    let mut failures = Vec::new();
    for (name, dir) in checkouts {
        match run(BackendKind::Git, "git", args, &dir).await {
            Ok(stdout) => {
                println!("── {name} ──");
                let trimmed = stdout.trim();
                if !trimmed.is_empty() {
                    println!("{trimmed}");
                }
            }
            Err(e) => {
                warn!(service = %name, "{} failed: {}", verb, e);
                failures.push(name);
            }
        }
    }

    if failures.is_empty() {
        Ok(())
    } else {
        Err(ZapError::backend(
            BackendKind::Git,
            format!("{verb} failed for: {}", failures.join(", ")),
        )
        .into())
    }
}

pub async fn checkout_all(ctx: &Context, branch: &str) -> Result<()> {
    fan_out(ctx, "checkout", &["checkout", branch]).await
}

pub async fn pull_all(ctx: &Context) -> Result<()> {
    fan_out(ctx, "pull", &["pull", "--ff-only"]).await
}

pub async fn status_all(ctx: &Context) -> Result<()> {
    fan_out(ctx, "status", &["status", "--short", "--branch"]).await
}
