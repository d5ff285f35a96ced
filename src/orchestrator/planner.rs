//! Diffs desired state against observed live state and composes the
//! dependency-ordered Action Plan a reconcile executes.

use std::collections::BTreeSet;

use crate::config::context::{ServiceKind, ServiceNode};
use crate::config::model::HealthCheck;
use crate::error::ZapError;
use crate::orchestrator::graph::DependencyGraph;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    Start,
    Stop,
    Restart,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionType {
    Start,
    Stop,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Action {
    pub action: ActionType,
    pub kind: ServiceKind,
    pub name: String,
    pub health_check: HealthCheck,
}

/// Actions safe to run in parallel: none depends on another in the set.
#[derive(Debug, Clone, PartialEq)]
pub struct ExecutionWave {
    pub actions: Vec<Action>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ActionPlan {
    pub waves: Vec<ExecutionWave>,
}

impl ActionPlan {
    pub fn is_empty(&self) -> bool {
        self.waves.is_empty()
    }

    pub fn actions(&self) -> impl Iterator<Item = &Action> {
        self.waves.iter().flat_map(|w| w.actions.iter())
    }
}

/// Compose a plan.
///
/// `targets` are canonical names; alias resolution happens a layer above.
/// Names matching no service are ignored here, yielding an empty plan the
/// facade turns into `ServiceNotFound` when the caller named them
/// explicitly. `running` is the observed set of canonical names currently
/// live.
pub fn plan(
    op: Op,
    targets: &[String],
    nodes: &[ServiceNode],
    running: &BTreeSet<String>,
    force_start: bool,
    active_profile: Option<&str>,
) -> Result<ActionPlan, ZapError> {
    match op {
        Op::Restart => {
            // Stop then force-start; the start proceeds even if the stop has
            // not been observed yet.
            let mut combined = plan(Op::Stop, targets, nodes, running, false, active_profile)?;
            let start = plan(Op::Start, targets, nodes, running, true, active_profile)?;
            combined.waves.extend(start.waves);
            Ok(combined)
        }
        Op::Start => plan_start(targets, nodes, running, force_start, active_profile),
        Op::Stop => plan_stop(targets, nodes, running),
    }
}

fn plan_start(
    targets: &[String],
    nodes: &[ServiceNode],
    running: &BTreeSet<String>,
    force_start: bool,
    active_profile: Option<&str>,
) -> Result<ActionPlan, ZapError> {
    let graph = DependencyGraph::from_nodes(nodes)?;
    let explicit = !targets.is_empty();

    let selected: Vec<&ServiceNode> = if explicit {
        // Explicit targets bypass the profile filter.
        nodes
            .iter()
            .filter(|n| targets.contains(&n.name))
            .collect()
    } else {
        nodes
            .iter()
            .filter(|n| profile_allows(n, active_profile))
            .collect()
    };

    let to_start: BTreeSet<String> = selected
        .iter()
        .filter(|n| force_start || !running.contains(&n.name))
        .map(|n| n.name.clone())
        .collect();

    let mut waves: Vec<ExecutionWave> = Vec::new();

    // Profile stops: a plain `zap up` under an active profile also brings
    // down running services the profile excludes, making start idempotent
    // with respect to profile changes.
    if !explicit && active_profile.is_some() {
        let mut excluded: Vec<&ServiceNode> = nodes
            .iter()
            .filter(|n| !profile_allows(n, active_profile) && running.contains(&n.name))
            .collect();
        excluded.sort_by(|a, b| a.name.cmp(&b.name));
        for node in excluded {
            waves.push(ExecutionWave {
                actions: vec![make_action(ActionType::Stop, node)],
            });
        }
    }

    for wave in graph.start_waves(&to_start)? {
        waves.push(to_wave(ActionType::Start, &wave, nodes));
    }

    Ok(elide_empty(waves))
}

fn plan_stop(
    targets: &[String],
    nodes: &[ServiceNode],
    running: &BTreeSet<String>,
) -> Result<ActionPlan, ZapError> {
    let graph = DependencyGraph::from_nodes(nodes)?;

    let selected: Vec<&ServiceNode> = if targets.is_empty() {
        nodes.iter().collect()
    } else {
        nodes
            .iter()
            .filter(|n| targets.contains(&n.name))
            .collect()
    };

    let to_stop: BTreeSet<String> = selected
        .iter()
        .filter(|n| running.contains(&n.name))
        .map(|n| n.name.clone())
        .collect();

    let waves = graph
        .stop_waves(&to_stop)?
        .iter()
        .map(|wave| to_wave(ActionType::Stop, wave, nodes))
        .collect();

    Ok(elide_empty(waves))
}

/// Under an active profile a service participates when its profile set is
/// empty or contains the profile; without one, everything participates.
fn profile_allows(node: &ServiceNode, active_profile: Option<&str>) -> bool {
    match active_profile {
        None => true,
        Some(profile) => node.profiles.is_empty() || node.profiles.contains(profile),
    }
}

fn make_action(action: ActionType, node: &ServiceNode) -> Action {
    Action {
        action,
        kind: node.kind,
        name: node.name.clone(),
        health_check: node.health_check.clone(),
    }
}

fn to_wave(action: ActionType, names: &[String], nodes: &[ServiceNode]) -> ExecutionWave {
    ExecutionWave {
        actions: names
            .iter()
            .filter_map(|name| nodes.iter().find(|n| &n.name == name))
            .map(|node| make_action(action, node))
            .collect(),
    }
}

fn elide_empty(waves: Vec<ExecutionWave>) -> ActionPlan {
    ActionPlan {
        waves: waves.into_iter().filter(|w| !w.actions.is_empty()).collect(),
    }
}
