//! One-off task execution with templated parameters.

use std::collections::{BTreeMap, BTreeSet};

use anyhow::Result;
use tracing::info;

use crate::config::context::{Context, Task};
use crate::config::model::TaskCmd;
use crate::error::{BackendKind, ZapError};
use crate::platform::shell_command;

/// Run a task by name or alias. `args` are `key=value` parameter bindings
/// from the CLI; declared defaults fill the gaps and missing required
/// parameters abort before anything runs.
pub async fn run_task(ctx: &Context, name: &str, args: &[(String, String)]) -> Result<()> {
    let task = find_task(ctx, name)?;
    let params = resolve_params(task, args)?;
    let mut visited = BTreeSet::new();
    run_resolved(ctx, task, &params, &mut visited).await
}

fn find_task<'a>(ctx: &'a Context, name: &str) -> Result<&'a Task> {
    ctx.task(name).ok_or_else(|| {
        let advice = ctx
            .tasks
            .iter()
            .map(|t| (t.name.as_str(), strsim::jaro_winkler(name, &t.name)))
            .filter(|(_, score)| *score > 0.85)
            .max_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(candidate, _)| format!(" (did you mean `{candidate}`?)"))
            .unwrap_or_default();
        anyhow::anyhow!("no such task `{name}`{advice}")
    })
}

fn resolve_params(task: &Task, args: &[(String, String)]) -> Result<BTreeMap<String, String>> {
    let provided: BTreeMap<&str, &str> = args
        .iter()
        .map(|(k, v)| (k.as_str(), v.as_str()))
        .collect();

    let mut resolved = BTreeMap::new();
    let mut missing = Vec::new();
    for param in &task.params {
        match provided.get(param.name.as_str()) {
            Some(value) => {
                resolved.insert(param.name.clone(), value.to_string());
            }
            None => match &param.default {
                Some(default) => {
                    resolved.insert(param.name.clone(), default.clone());
                }
                None if param.required => missing.push(param.name.clone()),
                None => {}
            },
        }
    }
    if !missing.is_empty() {
        anyhow::bail!(
            "task `{}` is missing required parameter(s): {}",
            task.name,
            missing.join(", ")
        );
    }
    Ok(resolved)
}

async fn run_resolved(
    ctx: &Context,
    task: &Task,
    params: &BTreeMap<String, String>,
    visited: &mut BTreeSet<String>,
) -> Result<()> {
    if !visited.insert(task.name.clone()) {
        anyhow::bail!("task reference cycle involving `{}`", task.name);
    }

    for cmd in &task.cmds {
        match cmd {
            TaskCmd::TaskRef(reference) => {
                let target = find_task(ctx, reference)?;
                // Referenced tasks resolve their own defaults; caller
                // bindings carry through for shared parameter names.
                let bindings: Vec<(String, String)> =
                    params.iter().map(|(k, v)| (k.clone(), v.clone())).collect();
                let nested = resolve_params(target, &bindings)?;
                Box::pin(run_resolved(ctx, target, &nested, visited)).await?;
            }
            TaskCmd::Shell(template) => {
                let rendered = substitute(template, &ctx.task_delimiters, params);
                info!(task = %task.name, cmd = %rendered, "running");
                let mut command = shell_command(&rendered);
                command.current_dir(task.cwd.as_deref().unwrap_or(&ctx.project_root));
                command.envs(&task.resolved_env);
                let status = command
                    .status()
                    .await
                    .map_err(|e| ZapError::backend(BackendKind::Task, e.to_string()))?;
                if !status.success() {
                    return Err(ZapError::backend(
                        BackendKind::Task,
                        format!("`{rendered}` exited with {status}"),
                    )
                    .into());
                }
            }
        }
    }

    visited.remove(&task.name);
    Ok(())
}

/// Replace `<open>name<close>` placeholders (whitespace inside the
/// delimiters is tolerated). Unknown placeholders stay verbatim.
fn substitute(
    template: &str,
    delimiters: &(String, String),
    params: &BTreeMap<String, String>,
) -> String {
    let (open, close) = delimiters;
    let mut result = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(start) = rest.find(open.as_str()) {
        let after_open = &rest[start + open.len()..];
        let Some(end) = after_open.find(close.as_str()) else {
            break;
        };
        let key = after_open[..end].trim();
        match params.get(key) {
            Some(value) => {
                result.push_str(&rest[..start]);
                result.push_str(value);
            }
            None => {
                result.push_str(&rest[..start + open.len() + end + close.len()]);
            }
        }
        rest = &after_open[end + close.len()..];
    }
    result.push_str(rest);
    result
}
