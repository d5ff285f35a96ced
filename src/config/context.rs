use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;

use crate::config::model::{GitMethod, HealthCheck, Link, TaskCmd, TaskParam, VolumeSpec};
use crate::state::State;

/// Which kind of runtime backs a service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ServiceKind {
    Native,
    Docker,
}

impl std::fmt::Display for ServiceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ServiceKind::Native => write!(f, "native"),
            ServiceKind::Docker => write!(f, "docker"),
        }
    }
}

/// A supervised local process.
#[derive(Debug, Clone, PartialEq)]
pub struct Process {
    pub name: String,
    pub aliases: Vec<String>,
    pub depends_on: Vec<String>,
    pub profiles: BTreeSet<String>,
    pub health_check: HealthCheck,
    pub resolved_env: BTreeMap<String, String>,
    pub cmd: String,
    pub cwd: Option<PathBuf>,
    pub source: Option<PathBuf>,
    pub repo: Option<String>,
}

/// A local container.
#[derive(Debug, Clone, PartialEq)]
pub struct Container {
    pub name: String,
    pub aliases: Vec<String>,
    pub depends_on: Vec<String>,
    pub profiles: BTreeSet<String>,
    pub health_check: HealthCheck,
    pub resolved_env: BTreeMap<String, String>,
    pub image: String,
    pub ports: Vec<String>,
    pub volumes: Vec<VolumeSpec>,
    pub networks: Vec<String>,
    pub command: Option<String>,
}

/// A one-off named command.
#[derive(Debug, Clone, PartialEq)]
pub struct Task {
    pub name: String,
    pub aliases: Vec<String>,
    pub cwd: Option<PathBuf>,
    pub desc: Option<String>,
    pub cmds: Vec<TaskCmd>,
    pub params: Vec<TaskParam>,
    pub resolved_env: BTreeMap<String, String>,
}

/// What the dependency graph needs to know about a service; it never sees
/// the full Process/Container types.
#[derive(Debug, Clone, PartialEq)]
pub struct ServiceNode {
    pub name: String,
    pub kind: ServiceKind,
    pub health_check: HealthCheck,
    pub depends_on: Vec<String>,
    pub profiles: BTreeSet<String>,
}

/// The normalized, immutable view of one project. Created once per
/// invocation; never mutated during a reconcile.
#[derive(Debug, Clone)]
pub struct Context {
    pub project_name: String,
    pub project_root: PathBuf,
    /// Env files resolved for the active environment, absolute paths.
    pub env_files: Vec<PathBuf>,
    pub environments: BTreeSet<String>,
    pub git_method: GitMethod,
    pub task_delimiters: (String, String),
    pub processes: Vec<Process>,
    pub containers: Vec<Container>,
    pub tasks: Vec<Task>,
    /// Sorted, deduplicated profile tags across all services.
    pub profiles: Vec<String>,
    pub links: Vec<Link>,
    pub state: State,
}

impl Context {
    pub fn is_empty(&self) -> bool {
        self.processes.is_empty() && self.containers.is_empty()
    }

    pub fn process(&self, name: &str) -> Option<&Process> {
        self.processes.iter().find(|p| p.name == name)
    }

    pub fn container(&self, name: &str) -> Option<&Container> {
        self.containers.iter().find(|c| c.name == name)
    }

    pub fn service_kind(&self, name: &str) -> Option<ServiceKind> {
        if self.process(name).is_some() {
            Some(ServiceKind::Native)
        } else if self.container(name).is_some() {
            Some(ServiceKind::Docker)
        } else {
            None
        }
    }

    pub fn service_names(&self) -> impl Iterator<Item = &str> {
        self.processes
            .iter()
            .map(|p| p.name.as_str())
            .chain(self.containers.iter().map(|c| c.name.as_str()))
    }

    /// The per-service view the dependency graph and planner operate on.
    pub fn service_nodes(&self) -> Vec<ServiceNode> {
        let native = self.processes.iter().map(|p| ServiceNode {
            name: p.name.clone(),
            kind: ServiceKind::Native,
            health_check: p.health_check.clone(),
            depends_on: p.depends_on.clone(),
            profiles: p.profiles.clone(),
        });
        let docker = self.containers.iter().map(|c| ServiceNode {
            name: c.name.clone(),
            kind: ServiceKind::Docker,
            health_check: c.health_check.clone(),
            depends_on: c.depends_on.clone(),
            profiles: c.profiles.clone(),
        });
        native.chain(docker).collect()
    }

    /// Alias → canonical lookup covering processes and containers. Canonical
    /// names are entered too and always win over someone else's alias.
    pub fn alias_map(&self) -> BTreeMap<String, String> {
        let mut map = BTreeMap::new();
        for (name, aliases) in self
            .processes
            .iter()
            .map(|p| (&p.name, &p.aliases))
            .chain(self.containers.iter().map(|c| (&c.name, &c.aliases)))
        {
            for alias in aliases {
                map.entry(alias.clone()).or_insert_with(|| name.clone());
            }
        }
        for name in self.service_names() {
            map.insert(name.to_string(), name.to_string());
        }
        map
    }

    pub fn task(&self, name: &str) -> Option<&Task> {
        self.tasks
            .iter()
            .find(|t| t.name == name || t.aliases.iter().any(|a| a == name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn context_with(processes: Vec<Process>, containers: Vec<Container>) -> Context {
        Context {
            project_name: "shop".into(),
            project_root: PathBuf::from("/tmp/shop"),
            env_files: Vec::new(),
            environments: BTreeSet::new(),
            git_method: GitMethod::Http,
            task_delimiters: ("{{".into(), "}}".into()),
            processes,
            containers,
            tasks: Vec::new(),
            profiles: Vec::new(),
            links: Vec::new(),
            state: State::default(),
        }
    }

    fn process(name: &str, aliases: &[&str]) -> Process {
        Process {
            name: name.into(),
            aliases: aliases.iter().map(|s| s.to_string()).collect(),
            depends_on: Vec::new(),
            profiles: BTreeSet::new(),
            health_check: HealthCheck::default(),
            resolved_env: BTreeMap::new(),
            cmd: "true".into(),
            cwd: None,
            source: None,
            repo: None,
        }
    }

    fn container(name: &str, aliases: &[&str]) -> Container {
        Container {
            name: name.into(),
            aliases: aliases.iter().map(|s| s.to_string()).collect(),
            depends_on: Vec::new(),
            profiles: BTreeSet::new(),
            health_check: HealthCheck::default(),
            resolved_env: BTreeMap::new(),
            image: "img".into(),
            ports: Vec::new(),
            volumes: Vec::new(),
            networks: Vec::new(),
            command: None,
        }
    }

    #[test]
    fn alias_map_canonical_wins() {
        // A container aliased to an existing process name must not shadow it.
        let ctx = context_with(
            vec![process("api", &[])],
            vec![container("db", &["api", "pg"])],
        );
        let map = ctx.alias_map();
        assert_eq!(map["api"], "api");
        assert_eq!(map["pg"], "db");
        assert_eq!(map["db"], "db");
    }

    #[test]
    fn service_kind_dispatch() {
        let ctx = context_with(vec![process("api", &[])], vec![container("db", &[])]);
        assert_eq!(ctx.service_kind("api"), Some(ServiceKind::Native));
        assert_eq!(ctx.service_kind("db"), Some(ServiceKind::Docker));
        assert_eq!(ctx.service_kind("nope"), None);
    }

    #[test]
    fn service_nodes_cover_both_kinds() {
        let ctx = context_with(vec![process("api", &[])], vec![container("db", &[])]);
        let nodes = ctx.service_nodes();
        assert_eq!(nodes.len(), 2);
        assert!(nodes
            .iter()
            .any(|n| n.name == "db" && n.kind == ServiceKind::Docker));
    }
}
