//! Harmonizes the raw config's legacy dual shapes into one Context.
//!
//! Downstream code never sees map-or-list services or seq-or-map env_files;
//! it sees the single normalized shape produced here.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use crate::config::context::{Container, Context, Process, Task};
use crate::config::env::{load_env_files, resolve_env};
use crate::config::model::{EnvFiles, RawConfig, RawContainer, RawProcess, RawTask};
use crate::error::ZapError;
use crate::platform::expand_home;
use crate::state::State;

const DEFAULT_ENVIRONMENT: &str = "default";

pub fn normalize(raw: RawConfig, project_root: &Path, state: State) -> Result<Context, ZapError> {
    let (environments, env_files) =
        resolve_env_files(raw.env_files, project_root, state.active_environment.as_deref())?;
    let file_vars = load_env_files(&env_files);

    let mut processes = Vec::new();
    if let Some(native) = raw.native {
        for (key, entry) in native {
            processes.push(build_process(entry, Some(key), project_root, &file_vars)?);
        }
    }
    if let Some(legacy) = raw.processes {
        for entry in legacy {
            processes.push(build_process(entry, None, project_root, &file_vars)?);
        }
    }

    // `containers` is a legacy spelling, consulted only when `docker` is absent.
    let container_map = raw.docker.or(raw.containers).unwrap_or_default();
    let containers: Vec<Container> = container_map
        .into_iter()
        .map(|(name, entry)| build_container(name, entry, &file_vars))
        .collect();

    let tasks: Vec<Task> = raw
        .tasks
        .unwrap_or_default()
        .into_iter()
        .map(|(name, entry)| build_task(name, entry, project_root, &file_vars))
        .collect();

    let mut profiles: Vec<String> = processes
        .iter()
        .flat_map(|p| p.profiles.iter().cloned())
        .chain(containers.iter().flat_map(|c| c.profiles.iter().cloned()))
        .collect();
    profiles.sort();
    profiles.dedup();

    Ok(Context {
        project_name: raw.project,
        project_root: project_root.to_path_buf(),
        env_files,
        environments,
        git_method: raw.git_method.unwrap_or_default(),
        task_delimiters: raw
            .task_delimiters
            .map(|d| (d.0, d.1))
            .unwrap_or_else(|| ("{{".to_string(), "}}".to_string())),
        processes,
        containers,
        tasks,
        profiles,
        links: raw.links,
        state,
    })
}

/// Resolve the recognized environments and the env files that apply under
/// the active one. A sequence means a single unconditional `default`
/// environment; a mapping names its environments explicitly.
fn resolve_env_files(
    env_files: Option<EnvFiles>,
    project_root: &Path,
    active: Option<&str>,
) -> Result<(BTreeSet<String>, Vec<PathBuf>), ZapError> {
    match env_files {
        None => Ok((BTreeSet::new(), Vec::new())),
        Some(EnvFiles::Default(files)) => {
            if let Some(active) = active {
                if active != DEFAULT_ENVIRONMENT {
                    return Err(ZapError::EnvironmentNotFound {
                        name: active.to_string(),
                        available: vec![DEFAULT_ENVIRONMENT.to_string()],
                    });
                }
            }
            let environments = BTreeSet::from([DEFAULT_ENVIRONMENT.to_string()]);
            Ok((environments, resolve_paths(&files, project_root)))
        }
        Some(EnvFiles::Named(map)) => {
            let environments: BTreeSet<String> = map.keys().cloned().collect();
            let chosen = match active {
                Some(active) => {
                    if !map.contains_key(active) {
                        return Err(ZapError::EnvironmentNotFound {
                            name: active.to_string(),
                            available: environments.iter().cloned().collect(),
                        });
                    }
                    Some(active)
                }
                None if map.contains_key(DEFAULT_ENVIRONMENT) => Some(DEFAULT_ENVIRONMENT),
                None => None,
            };
            let files = chosen
                .and_then(|name| map.get(name))
                .map(|files| resolve_paths(files, project_root))
                .unwrap_or_default();
            Ok((environments, files))
        }
    }
}

fn resolve_paths(files: &[String], project_root: &Path) -> Vec<PathBuf> {
    files
        .iter()
        .map(|f| resolve_path(f, project_root))
        .collect()
}

/// Relative paths are joined to the project root; absolute paths pass through.
fn resolve_path(path: &str, project_root: &Path) -> PathBuf {
    let expanded = expand_home(path);
    let expanded = Path::new(&expanded);
    if expanded.is_absolute() {
        expanded.to_path_buf()
    } else {
        project_root.join(expanded)
    }
}

fn build_process(
    entry: RawProcess,
    map_key: Option<String>,
    project_root: &Path,
    file_vars: &BTreeMap<String, String>,
) -> Result<Process, ZapError> {
    // The map key names the service unless the entry carries its own name;
    // legacy list entries have no key to fall back on.
    let name = entry
        .name
        .or(map_key)
        .ok_or(ZapError::MissingServiceName)?;
    Ok(Process {
        name,
        aliases: entry.aliases,
        depends_on: entry.depends_on,
        profiles: entry.profiles.into_iter().collect(),
        health_check: entry.health_check.unwrap_or_default(),
        resolved_env: resolve_env(file_vars, &entry.inherit, &entry.env),
        cmd: entry.cmd,
        cwd: entry.cwd.map(|c| resolve_path(&c, project_root)),
        source: entry.source.map(|s| resolve_path(&s, project_root)),
        repo: entry.repo,
    })
}

fn build_container(
    name: String,
    entry: RawContainer,
    file_vars: &BTreeMap<String, String>,
) -> Container {
    Container {
        name,
        aliases: entry.aliases,
        depends_on: entry.depends_on,
        profiles: entry.profiles.into_iter().collect(),
        health_check: entry.health_check.unwrap_or_default(),
        resolved_env: resolve_env(file_vars, &entry.inherit, &entry.env),
        image: entry.image,
        ports: entry.ports,
        volumes: entry.volumes,
        networks: entry.networks,
        command: entry.command,
    }
}

fn build_task(
    name: String,
    entry: RawTask,
    project_root: &Path,
    file_vars: &BTreeMap<String, String>,
) -> Task {
    Task {
        name,
        aliases: entry.aliases,
        cwd: entry.cwd.map(|c| resolve_path(&c, project_root)),
        desc: entry.desc,
        cmds: entry.cmds,
        params: entry.params,
        resolved_env: resolve_env(file_vars, &entry.inherit, &entry.env),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::context::ServiceKind;
    use crate::config::model::HealthCheck;

    fn raw(yaml: &str) -> RawConfig {
        serde_yaml::from_str(yaml).unwrap()
    }

    fn normalize_at_root(yaml: &str, state: State) -> Result<Context, ZapError> {
        normalize(raw(yaml), Path::new("/proj"), state)
    }

    #[test]
    fn map_key_names_the_service() {
        let ctx = normalize_at_root(
            "project: shop\nnative:\n  api:\n    cmd: npm start\n",
            State::default(),
        )
        .unwrap();
        assert_eq!(ctx.processes[0].name, "api");
    }

    #[test]
    fn entry_name_overrides_map_key() {
        let ctx = normalize_at_root(
            "project: shop\nnative:\n  api:\n    name: backend\n    cmd: npm start\n",
            State::default(),
        )
        .unwrap();
        assert_eq!(ctx.processes[0].name, "backend");
    }

    #[test]
    fn legacy_list_requires_name() {
        let err = normalize_at_root(
            "project: shop\nprocesses:\n  - cmd: npm start\n",
            State::default(),
        )
        .unwrap_err();
        assert!(matches!(err, ZapError::MissingServiceName));
    }

    #[test]
    fn legacy_list_merges_with_map() {
        let ctx = normalize_at_root(
            "project: shop\nnative:\n  api:\n    cmd: a\nprocesses:\n  - name: worker\n    cmd: b\n",
            State::default(),
        )
        .unwrap();
        assert_eq!(ctx.processes.len(), 2);
        assert_eq!(ctx.service_kind("worker"), Some(ServiceKind::Native));
    }

    #[test]
    fn containers_key_used_when_docker_absent() {
        let ctx = normalize_at_root(
            "project: shop\ncontainers:\n  db:\n    image: postgres:16\n",
            State::default(),
        )
        .unwrap();
        assert_eq!(ctx.containers[0].name, "db");
    }

    #[test]
    fn docker_key_wins_over_containers() {
        let ctx = normalize_at_root(
            "project: shop\ndocker:\n  db:\n    image: a\ncontainers:\n  cache:\n    image: b\n",
            State::default(),
        )
        .unwrap();
        assert_eq!(ctx.containers.len(), 1);
        assert_eq!(ctx.containers[0].name, "db");
    }

    #[test]
    fn env_files_sequence_defines_default_environment() {
        let ctx = normalize_at_root(
            "project: shop\nenv_files: [.env]\nnative:\n  api:\n    cmd: a\n",
            State::default(),
        )
        .unwrap();
        assert_eq!(
            ctx.environments,
            BTreeSet::from(["default".to_string()])
        );
        assert_eq!(ctx.env_files, vec![PathBuf::from("/proj/.env")]);
    }

    #[test]
    fn env_files_sequence_rejects_non_default_active() {
        let state = State {
            active_environment: Some("staging".to_string()),
            ..State::default()
        };
        let err = normalize_at_root("project: shop\nenv_files: [.env]\n", state).unwrap_err();
        match err {
            ZapError::EnvironmentNotFound { name, available } => {
                assert_eq!(name, "staging");
                assert_eq!(available, vec!["default"]);
            }
            other => panic!("expected EnvironmentNotFound, got {:?}", other),
        }
    }

    #[test]
    fn env_files_mapping_selects_active_environment() {
        let state = State {
            active_environment: Some("staging".to_string()),
            ..State::default()
        };
        let ctx = normalize_at_root(
            "project: shop\nenv_files:\n  default: [.env]\n  staging: [.env.staging]\n",
            state,
        )
        .unwrap();
        assert_eq!(ctx.env_files, vec![PathBuf::from("/proj/.env.staging")]);
        assert_eq!(ctx.environments.len(), 2);
    }

    #[test]
    fn env_files_mapping_falls_back_to_default() {
        let ctx = normalize_at_root(
            "project: shop\nenv_files:\n  default: [.env]\n  staging: [.env.staging]\n",
            State::default(),
        )
        .unwrap();
        assert_eq!(ctx.env_files, vec![PathBuf::from("/proj/.env")]);
    }

    #[test]
    fn env_files_mapping_without_default_and_no_active() {
        let ctx = normalize_at_root(
            "project: shop\nenv_files:\n  staging: [.env.staging]\n",
            State::default(),
        )
        .unwrap();
        assert!(ctx.env_files.is_empty());
        assert!(ctx.environments.contains("staging"));
    }

    #[test]
    fn env_files_mapping_rejects_unknown_active() {
        let state = State {
            active_environment: Some("prod".to_string()),
            ..State::default()
        };
        let err = normalize_at_root(
            "project: shop\nenv_files:\n  default: [.env]\n  staging: [.env.staging]\n",
            state,
        )
        .unwrap_err();
        match err {
            ZapError::EnvironmentNotFound { name, available } => {
                assert_eq!(name, "prod");
                assert_eq!(available, vec!["default", "staging"]);
            }
            other => panic!("expected EnvironmentNotFound, got {:?}", other),
        }
    }

    #[test]
    fn absolute_env_file_path_passes_through() {
        let ctx = normalize_at_root(
            "project: shop\nenv_files: [/etc/shop/.env]\n",
            State::default(),
        )
        .unwrap();
        assert_eq!(ctx.env_files, vec![PathBuf::from("/etc/shop/.env")]);
    }

    #[test]
    fn profiles_sorted_and_deduplicated() {
        let ctx = normalize_at_root(
            r#"
project: shop
native:
  api:
    cmd: a
    profiles: [dev, prod]
  worker:
    cmd: b
    profiles: [prod]
docker:
  db:
    image: postgres:16
    profiles: [dev]
"#,
            State::default(),
        )
        .unwrap();
        assert_eq!(ctx.profiles, vec!["dev", "prod"]);
    }

    #[test]
    fn default_health_check_is_five_seconds() {
        let ctx = normalize_at_root(
            "project: shop\nnative:\n  api:\n    cmd: a\n",
            State::default(),
        )
        .unwrap();
        assert_eq!(ctx.processes[0].health_check, HealthCheck::Seconds(5));
    }

    #[test]
    fn relative_cwd_joined_to_project_root() {
        let ctx = normalize_at_root(
            "project: shop\nnative:\n  api:\n    cmd: a\n    cwd: ./api\n",
            State::default(),
        )
        .unwrap();
        assert_eq!(ctx.processes[0].cwd, Some(PathBuf::from("/proj/./api")));
    }

    #[test]
    fn default_task_delimiters() {
        let ctx = normalize_at_root("project: shop\n", State::default()).unwrap();
        assert_eq!(ctx.task_delimiters, ("{{".to_string(), "}}".to_string()));
    }
}
