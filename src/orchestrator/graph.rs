//! Topological scheduling of services into parallel execution waves.
//!
//! Edges point from dependency to dependent (if service B depends on
//! service A, the edge is A -> B). Start waves repeatedly peel off every
//! service whose dependencies are satisfied; stop waves walk the reverse
//! relation so dependents go down before what they depend on.

use std::collections::{BTreeMap, BTreeSet};

use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::Direction;

use crate::config::context::ServiceNode;
use crate::error::ZapError;

#[derive(Debug)]
pub struct DependencyGraph {
    graph: DiGraph<String, ()>,
    node_map: BTreeMap<String, NodeIndex>,
}

impl DependencyGraph {
    /// Build the graph, validating that every dependency names a known
    /// service. The graph is rebuilt for each reconcile; it holds no state
    /// across calls.
    pub fn from_nodes(nodes: &[ServiceNode]) -> Result<Self, ZapError> {
        let mut graph = DiGraph::new();
        let mut node_map = BTreeMap::new();

        for node in nodes {
            let idx = graph.add_node(node.name.clone());
            node_map.insert(node.name.clone(), idx);
        }

        for node in nodes {
            let dependent_idx = node_map[&node.name];
            for dep in &node.depends_on {
                let dep_idx = node_map.get(dep).ok_or_else(|| ZapError::UnknownDependency {
                    service: node.name.clone(),
                    dependency: dep.clone(),
                })?;
                graph.add_edge(*dep_idx, dependent_idx, ());
            }
        }

        Ok(Self { graph, node_map })
    }

    /// Waves for starting `to_start`: every wave contains the remaining
    /// services whose dependencies are already started or outside the set.
    pub fn start_waves(&self, to_start: &BTreeSet<String>) -> Result<Vec<Vec<String>>, ZapError> {
        self.detect_cycle()?;
        self.peel_waves(to_start, Direction::Incoming)
    }

    /// Waves for stopping `to_stop`: a service is ready to stop once every
    /// dependent is already stopped or outside the set.
    pub fn stop_waves(&self, to_stop: &BTreeSet<String>) -> Result<Vec<Vec<String>>, ZapError> {
        self.detect_cycle()?;
        self.peel_waves(to_stop, Direction::Outgoing)
    }

    fn peel_waves(
        &self,
        selection: &BTreeSet<String>,
        blocking: Direction,
    ) -> Result<Vec<Vec<String>>, ZapError> {
        let mut remaining: BTreeSet<String> = selection.clone();
        let mut done: BTreeSet<String> = BTreeSet::new();
        let mut waves = Vec::new();

        while !remaining.is_empty() {
            let ready: Vec<String> = remaining
                .iter()
                .filter(|name| {
                    self.blockers_of(name, blocking)
                        .all(|blocker| done.contains(&blocker) || !selection.contains(&blocker))
                })
                .cloned()
                .collect();

            if ready.is_empty() {
                return Err(ZapError::UnresolvableDependencies);
            }
            for name in &ready {
                remaining.remove(name);
                done.insert(name.clone());
            }
            waves.push(ready);
        }

        Ok(waves)
    }

    /// For starts the blockers are a service's dependencies (incoming edges);
    /// for stops its dependents (outgoing edges).
    fn blockers_of<'a>(
        &'a self,
        name: &str,
        direction: Direction,
    ) -> impl Iterator<Item = String> + 'a {
        self.node_map
            .get(name)
            .into_iter()
            .flat_map(move |&idx| self.graph.neighbors_directed(idx, direction))
            .map(|idx| self.graph[idx].clone())
    }

    /// Depth-first traversal with an explicit recursion stack. A back-edge
    /// produces the cycle path starting at the repeated service.
    fn detect_cycle(&self) -> Result<(), ZapError> {
        let mut visited: BTreeSet<NodeIndex> = BTreeSet::new();
        for (_, &start) in &self.node_map {
            if visited.contains(&start) {
                continue;
            }
            let mut stack: Vec<NodeIndex> = Vec::new();
            let mut on_stack: BTreeSet<NodeIndex> = BTreeSet::new();
            if let Some(path) = self.dfs(start, &mut visited, &mut stack, &mut on_stack) {
                return Err(ZapError::CircularDependency { path });
            }
        }
        Ok(())
    }

    fn dfs(
        &self,
        idx: NodeIndex,
        visited: &mut BTreeSet<NodeIndex>,
        stack: &mut Vec<NodeIndex>,
        on_stack: &mut BTreeSet<NodeIndex>,
    ) -> Option<Vec<String>> {
        visited.insert(idx);
        stack.push(idx);
        on_stack.insert(idx);

        // Walk dependency edges: from a service to what it depends on.
        for dep in self.graph.neighbors_directed(idx, Direction::Incoming) {
            if on_stack.contains(&dep) {
                let from = stack.iter().position(|&n| n == dep).unwrap_or(0);
                let mut path: Vec<String> =
                    stack[from..].iter().map(|&n| self.graph[n].clone()).collect();
                path.push(self.graph[dep].clone());
                return Some(path);
            }
            if !visited.contains(&dep) {
                if let Some(path) = self.dfs(dep, visited, stack, on_stack) {
                    return Some(path);
                }
            }
        }

        stack.pop();
        on_stack.remove(&idx);
        None
    }
}
