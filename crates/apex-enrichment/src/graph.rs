// apex-enrichment/src/graph.rs
// ============================================================================
// Module: Dependency Ordering
// Description: Topological order over declared `depends-on` relationships,
//              with declaration-index tie-breaking and cycle detection.
//              Generalizes a single-tree validation walk into a full
//              dependency-graph traversal.
// ============================================================================

use std::collections::BTreeMap;
use std::collections::BTreeSet;

use crate::error::EnrichmentError;

/// One node's identity and its declared dependencies, as seen by the
/// ordering pass. The caller supplies the declaration index so ties
/// within a topological layer resolve to declaration order.
#[derive(Debug, Clone)]
pub struct Node {
    /// The node's unique id within this graph.
    pub id: String,
    /// Ids this node must run after.
    pub depends_on: Vec<String>,
    /// Position in the original declaration list.
    pub declaration_index: usize,
}

/// Computes a topological order over `nodes`: each node appears after
/// every id it depends on; nodes with no remaining dependencies are
/// emitted in ascending `declaration_index` order within each layer.
///
/// # Errors
/// Returns `EnrichmentError::DuplicateId` if two nodes share an id,
/// `EnrichmentError::UnknownDependency` if a `depends_on` entry names an
/// id not present in `nodes`, or `EnrichmentError::CycleDetected` if the
/// graph has a cycle.
pub fn topological_order(nodes: &[Node]) -> Result<Vec<String>, EnrichmentError> {
    let mut by_id: BTreeMap<&str, &Node> = BTreeMap::new();
    for node in nodes {
        if by_id.insert(node.id.as_str(), node).is_some() {
            return Err(EnrichmentError::DuplicateId { id: node.id.clone() });
        }
    }
    for node in nodes {
        for dependency in &node.depends_on {
            if !by_id.contains_key(dependency.as_str()) {
                return Err(EnrichmentError::UnknownDependency {
                    id: node.id.clone(),
                    dependency: dependency.clone(),
                });
            }
        }
    }

    let mut remaining_deps: BTreeMap<&str, BTreeSet<&str>> = nodes
        .iter()
        .map(|node| (node.id.as_str(), node.depends_on.iter().map(String::as_str).collect()))
        .collect();
    let mut ordered = Vec::with_capacity(nodes.len());

    while ordered.len() < nodes.len() {
        let mut ready: Vec<&Node> = remaining_deps
            .iter()
            .filter(|(_, deps)| deps.is_empty())
            .map(|(id, _)| by_id[id])
            .collect();
        if ready.is_empty() {
            let stuck: Vec<String> = remaining_deps.keys().map(ToString::to_string).collect();
            return Err(EnrichmentError::CycleDetected { ids: stuck });
        }
        ready.sort_by_key(|node| node.declaration_index);

        for node in ready {
            remaining_deps.remove(node.id.as_str());
            for deps in remaining_deps.values_mut() {
                deps.remove(node.id.as_str());
            }
            ordered.push(node.id.clone());
        }
    }

    Ok(ordered)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(id: &str, depends_on: &[&str], declaration_index: usize) -> Node {
        Node {
            id: id.to_string(),
            depends_on: depends_on.iter().map(ToString::to_string).collect(),
            declaration_index,
        }
    }

    #[test]
    fn independent_nodes_preserve_declaration_order() {
        let nodes = vec![node("b", &[], 1), node("a", &[], 0)];
        assert_eq!(topological_order(&nodes).expect("order"), vec!["a", "b"]);
    }

    #[test]
    fn dependent_node_runs_after_its_dependency() {
        let nodes = vec![node("a", &["b"], 0), node("b", &[], 1)];
        assert_eq!(topological_order(&nodes).expect("order"), vec!["b", "a"]);
    }

    #[test]
    fn cycle_is_rejected() {
        let nodes = vec![node("a", &["b"], 0), node("b", &["a"], 1)];
        let err = topological_order(&nodes).expect_err("cycle");
        assert!(matches!(err, EnrichmentError::CycleDetected { .. }));
    }

    #[test]
    fn unknown_dependency_is_rejected() {
        let nodes = vec![node("a", &["missing"], 0)];
        let err = topological_order(&nodes).expect_err("unknown dependency");
        assert!(matches!(err, EnrichmentError::UnknownDependency { .. }));
    }

    #[test]
    fn duplicate_id_is_rejected() {
        let nodes = vec![node("a", &[], 0), node("a", &[], 1)];
        let err = topological_order(&nodes).expect_err("duplicate");
        assert!(matches!(err, EnrichmentError::DuplicateId { .. }));
    }
}
