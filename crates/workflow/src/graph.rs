//! Dependency graph construction and validation.

use std::collections::{HashMap, HashSet, VecDeque};

use relay_core::ActionRef;

use crate::definition::WorkflowDefinition;
use crate::error::WorkflowError;

/// Adjacency view of a workflow definition, validated on construction.
///
/// Parents and children are deduplicated: two edges between the same pair of
/// refs (for example a success edge and an error edge) count as one
/// parent/child relation, matching how the scheduler aggregates edge
/// outcomes per parent.
#[derive(Debug, Clone)]
pub struct DependencyGraph {
    /// ref → distinct downstream refs, in first-edge order.
    downstream: HashMap<ActionRef, Vec<ActionRef>>,
    /// ref → distinct upstream refs, in first-edge order.
    upstream: HashMap<ActionRef, Vec<ActionRef>>,
    /// Refs with no incoming edges.
    entry_points: Vec<ActionRef>,
    /// Refs with more than one parent.
    join_points: HashSet<ActionRef>,
}

impl DependencyGraph {
    /// Build and validate the graph for a definition.
    ///
    /// Validation rejects: empty definitions, a missing entrypoint, edges or
    /// `dependsOn` entries naming unknown refs, input mappings pulling from
    /// refs outside `dependsOn`, and cycles.
    pub fn from_definition(definition: &WorkflowDefinition) -> Result<Self, WorkflowError> {
        if definition.actions.is_empty() {
            return Err(WorkflowError::Empty);
        }

        let known: HashSet<&ActionRef> =
            definition.actions.iter().map(|a| &a.action_ref).collect();

        if !known.contains(&definition.entrypoint.action_ref) {
            return Err(WorkflowError::MissingEntrypoint(
                definition.entrypoint.action_ref.clone(),
            ));
        }

        for action in &definition.actions {
            for dep in &action.depends_on {
                if !known.contains(dep) {
                    return Err(WorkflowError::UnknownDependency {
                        action_ref: action.action_ref.clone(),
                        dependency: dep.clone(),
                    });
                }
            }
            for (target_port, mapping) in &action.input_mappings {
                if !action.depends_on.contains(&mapping.source_ref) {
                    return Err(WorkflowError::UndeclaredMappingSource {
                        action_ref: action.action_ref.clone(),
                        target_port: target_port.clone(),
                        source_ref: mapping.source_ref.clone(),
                    });
                }
            }
        }

        let mut downstream: HashMap<ActionRef, Vec<ActionRef>> = HashMap::new();
        let mut upstream: HashMap<ActionRef, Vec<ActionRef>> = HashMap::new();
        for action in &definition.actions {
            downstream.entry(action.action_ref.clone()).or_default();
            upstream.entry(action.action_ref.clone()).or_default();
        }

        for edge in &definition.edges {
            for endpoint in [&edge.source_ref, &edge.target_ref] {
                if !known.contains(endpoint) {
                    return Err(WorkflowError::UnknownEdgeRef {
                        edge_id: edge.id.clone(),
                        action_ref: endpoint.clone(),
                    });
                }
            }
            let children = downstream.entry(edge.source_ref.clone()).or_default();
            if !children.contains(&edge.target_ref) {
                children.push(edge.target_ref.clone());
            }
            let parents = upstream.entry(edge.target_ref.clone()).or_default();
            if !parents.contains(&edge.source_ref) {
                parents.push(edge.source_ref.clone());
            }
        }

        let entry_points: Vec<ActionRef> = definition
            .actions
            .iter()
            .map(|a| &a.action_ref)
            .filter(|r| upstream.get(*r).is_none_or(Vec::is_empty))
            .cloned()
            .collect();

        let join_points: HashSet<ActionRef> = upstream
            .iter()
            .filter(|(_, parents)| parents.len() > 1)
            .map(|(r, _)| r.clone())
            .collect();

        let graph = Self {
            downstream,
            upstream,
            entry_points,
            join_points,
        };
        graph.reject_cycles()?;
        Ok(graph)
    }

    /// Kahn's algorithm; any refs left unprocessed form a cycle.
    fn reject_cycles(&self) -> Result<(), WorkflowError> {
        let mut indegree: HashMap<&ActionRef, usize> = self
            .upstream
            .iter()
            .map(|(r, parents)| (r, parents.len()))
            .collect();

        let mut queue: VecDeque<&ActionRef> = indegree
            .iter()
            .filter(|&(_, &n)| n == 0)
            .map(|(&r, _)| r)
            .collect();

        let mut processed = 0usize;
        while let Some(current) = queue.pop_front() {
            processed += 1;
            for child in self.downstream(current) {
                if let Some(n) = indegree.get_mut(child) {
                    *n -= 1;
                    if *n == 0 {
                        queue.push_back(child);
                    }
                }
            }
        }

        if processed == self.upstream.len() {
            Ok(())
        } else {
            let mut stuck: Vec<ActionRef> = indegree
                .into_iter()
                .filter(|(_, n)| *n > 0)
                .map(|(r, _)| r.clone())
                .collect();
            stuck.sort();
            Err(WorkflowError::Cycle(stuck))
        }
    }

    /// Distinct children of a ref.
    #[must_use]
    pub fn downstream(&self, action_ref: &ActionRef) -> &[ActionRef] {
        self.downstream
            .get(action_ref)
            .map_or(&[], Vec::as_slice)
    }

    /// Distinct parents of a ref.
    #[must_use]
    pub fn upstream(&self, action_ref: &ActionRef) -> &[ActionRef] {
        self.upstream.get(action_ref).map_or(&[], Vec::as_slice)
    }

    /// Refs with no incoming edges.
    #[must_use]
    pub fn entry_points(&self) -> &[ActionRef] {
        &self.entry_points
    }

    /// Whether a ref has more than one parent.
    #[must_use]
    pub fn is_join_point(&self, action_ref: &ActionRef) -> bool {
        self.join_points.contains(action_ref)
    }

    /// Number of actions in the graph.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.upstream.len()
    }
}
