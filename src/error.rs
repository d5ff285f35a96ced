use miette::Diagnostic;
use thiserror::Error;

/// Which external backend a failed command belonged to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    Supervisor,
    Docker,
    Git,
    Task,
}

impl std::fmt::Display for BackendKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            BackendKind::Supervisor => "supervisor",
            BackendKind::Docker => "docker",
            BackendKind::Git => "git",
            BackendKind::Task => "task",
        };
        write!(f, "{}", s)
    }
}

/// Every error the reconcile core can surface to the CLI layer.
///
/// All variants abort the current reconcile. State mutations already
/// committed are not rolled back; the next reconcile observes them.
#[derive(Debug, Error, Diagnostic)]
pub enum ZapError {
    #[error("no project configuration loaded")]
    #[diagnostic(code(zap::context_not_loaded))]
    ContextNotLoaded,

    #[error("no services defined in this project")]
    #[diagnostic(
        code(zap::no_services),
        help("declare at least one entry under `native` or `docker`")
    )]
    NoServicesDefined,

    #[error("no such service: {}", names.join(", "))]
    #[diagnostic(code(zap::service_not_found))]
    ServiceNotFound {
        names: Vec<String>,
        #[help]
        advice: Option<String>,
    },

    #[error("service `{service}` depends on `{dependency}`, which is not defined")]
    #[diagnostic(code(zap::unknown_dependency))]
    UnknownDependency { service: String, dependency: String },

    #[error("dependency cycle: {}", path.join(" -> "))]
    #[diagnostic(code(zap::circular_dependency))]
    CircularDependency { path: Vec<String> },

    #[error("dependency graph made no progress; the remaining services are all blocked")]
    #[diagnostic(code(zap::unresolvable_dependencies))]
    UnresolvableDependencies,

    #[error("environment `{name}` is not defined (available: {})", available.join(", "))]
    #[diagnostic(code(zap::environment_not_found))]
    EnvironmentNotFound { name: String, available: Vec<String> },

    #[error("a `processes` list entry is missing its `name` field")]
    #[diagnostic(code(zap::missing_service_name))]
    MissingServiceName,

    #[error("duplicate identifier `{0}` across service names and aliases")]
    #[diagnostic(code(zap::duplicate_identifier))]
    DuplicateIdentifier(String),

    #[error("--http and --ssh cannot be combined")]
    #[diagnostic(code(zap::conflicting_git_method))]
    ConflictingGitMethod,

    #[error("{kind} command failed: {stderr}")]
    #[diagnostic(code(zap::backend_failure))]
    BackendFailure { kind: BackendKind, stderr: String },
}

impl ZapError {
    pub fn backend(kind: BackendKind, stderr: impl Into<String>) -> Self {
        ZapError::BackendFailure {
            kind,
            stderr: stderr.into(),
        }
    }

    /// ServiceNotFound with a "did you mean" hint when a close match exists.
    pub fn service_not_found<'a>(
        names: Vec<String>,
        known: impl Iterator<Item = &'a str>,
    ) -> Self {
        let advice = names.first().and_then(|missing| {
            known
                .map(|candidate| (candidate, strsim::jaro_winkler(missing, candidate)))
                .filter(|(_, score)| *score > 0.85)
                .max_by(|a, b| a.1.total_cmp(&b.1))
                .map(|(candidate, _)| format!("did you mean `{}`?", candidate))
        });
        ZapError::ServiceNotFound { names, advice }
    }
}

pub type Result<T, E = ZapError> = std::result::Result<T, E>;
