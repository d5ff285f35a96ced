//! Structural checks the loader runs on every normalized Context.

use std::collections::BTreeSet;

use crate::config::context::Context;
use crate::error::ZapError;
use crate::orchestrator::graph::DependencyGraph;

/// Validate global name uniqueness and dependency references.
///
/// Name uniqueness spans every canonical name and alias of every kind
/// (processes, containers, tasks); the first collision is surfaced with the
/// offending identifier. Every `depends_on` entry must name a known service.
pub fn validate(ctx: &Context) -> Result<(), ZapError> {
    let mut seen = BTreeSet::new();
    let identifiers = ctx
        .processes
        .iter()
        .flat_map(|p| std::iter::once(&p.name).chain(p.aliases.iter()))
        .chain(
            ctx.containers
                .iter()
                .flat_map(|c| std::iter::once(&c.name).chain(c.aliases.iter())),
        )
        .chain(
            ctx.tasks
                .iter()
                .flat_map(|t| std::iter::once(&t.name).chain(t.aliases.iter())),
        );
    for identifier in identifiers {
        if !seen.insert(identifier.clone()) {
            return Err(ZapError::DuplicateIdentifier(identifier.clone()));
        }
    }

    let known: BTreeSet<&str> = ctx.service_names().collect();
    for node in ctx.service_nodes() {
        for dep in &node.depends_on {
            if !known.contains(dep.as_str()) {
                return Err(ZapError::UnknownDependency {
                    service: node.name.clone(),
                    dependency: dep.clone(),
                });
            }
        }
    }

    // Surface dependency cycles at load time instead of mid-reconcile.
    let graph = DependencyGraph::from_nodes(&ctx.service_nodes())?;
    graph.start_waves(&BTreeSet::new())?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::normalize::normalize;
    use crate::state::State;
    use std::path::Path;

    fn load(yaml: &str) -> Result<(), ZapError> {
        let raw = serde_yaml::from_str(yaml).unwrap();
        let ctx = normalize(raw, Path::new("/proj"), State::default())?;
        validate(&ctx)
    }

    #[test]
    fn unique_names_pass() {
        load(
            r#"
project: shop
native:
  api:
    cmd: a
    aliases: [backend]
docker:
  db:
    image: postgres:16
"#,
        )
        .unwrap();
    }

    #[test]
    fn alias_colliding_with_name_fails() {
        let err = load(
            r#"
project: shop
native:
  api:
    cmd: a
docker:
  db:
    image: postgres:16
    aliases: [api]
"#,
        )
        .unwrap_err();
        match err {
            ZapError::DuplicateIdentifier(name) => assert_eq!(name, "api"),
            other => panic!("expected DuplicateIdentifier, got {:?}", other),
        }
    }

    #[test]
    fn task_name_colliding_with_service_fails() {
        let err = load(
            r#"
project: shop
native:
  migrate:
    cmd: a
tasks:
  migrate:
    cmds: [./migrate.sh]
"#,
        )
        .unwrap_err();
        assert!(matches!(err, ZapError::DuplicateIdentifier(name) if name == "migrate"));
    }

    #[test]
    fn unknown_dependency_fails() {
        let err = load(
            r#"
project: shop
native:
  api:
    cmd: a
    depends_on: [db]
"#,
        )
        .unwrap_err();
        match err {
            ZapError::UnknownDependency {
                service,
                dependency,
            } => {
                assert_eq!(service, "api");
                assert_eq!(dependency, "db");
            }
            other => panic!("expected UnknownDependency, got {:?}", other),
        }
    }

    #[test]
    fn cross_kind_dependency_passes() {
        load(
            r#"
project: shop
native:
  api:
    cmd: a
    depends_on: [db]
docker:
  db:
    image: postgres:16
"#,
        )
        .unwrap();
    }

    #[test]
    fn cycle_caught_at_load_time() {
        let err = load(
            r#"
project: shop
native:
  a:
    cmd: x
    depends_on: [b]
  b:
    cmd: y
    depends_on: [a]
"#,
        )
        .unwrap_err();
        assert!(matches!(err, ZapError::CircularDependency { .. }));
    }

    #[test]
    fn dependency_on_alias_is_not_resolved() {
        // depends_on must use canonical names; aliases are a CLI-level nicety.
        let err = load(
            r#"
project: shop
native:
  api:
    cmd: a
    depends_on: [pg]
docker:
  db:
    image: postgres:16
    aliases: [pg]
"#,
        )
        .unwrap_err();
        assert!(matches!(err, ZapError::UnknownDependency { .. }));
    }
}
