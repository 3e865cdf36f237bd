// apex-rules/src/ordering.rs
// ============================================================================
// Module: Rule Ordering
// Description: Topological ordering of one group's rules by `depends-on`,
//              tie-broken by ascending priority and then declaration order
//              (§4.7).
// ============================================================================

use std::collections::BTreeSet;

use crate::error::RuleError;

/// One rule's position in a group's dependency graph, for ordering
/// purposes only.
#[derive(Debug, Clone)]
pub struct RuleNode {
    /// The rule's id.
    pub id: String,
    /// Ids within the same group this rule depends on.
    pub depends_on: Vec<String>,
    /// Tie-break key, ascending.
    pub priority: i32,
    /// Position in the group's declared rule list; the final tie-break
    /// when priority is equal.
    pub declaration_index: usize,
}

/// Orders `nodes` by `depends-on`, breaking ties within a ready layer by
/// ascending priority and then declaration order.
///
/// This mirrors the enrichment pipeline's dependency ordering but keys
/// ties on `(priority, declaration_index)` rather than declaration order
/// alone, since rules additionally declare an explicit priority.
///
/// # Errors
/// Returns [`RuleError::DuplicateId`] or [`RuleError::UnknownDependency`]
/// if the declarations are malformed, or [`RuleError::CycleDetected`] if
/// no topological order exists.
pub fn order_rules(nodes: &[RuleNode]) -> Result<Vec<String>, RuleError> {
    let mut seen = BTreeSet::new();
    for node in nodes {
        if !seen.insert(node.id.as_str()) {
            return Err(RuleError::DuplicateId { id: node.id.clone() });
        }
    }

    let ids: BTreeSet<&str> = nodes.iter().map(|node| node.id.as_str()).collect();
    for node in nodes {
        for dependency in &node.depends_on {
            if !ids.contains(dependency.as_str()) {
                return Err(RuleError::UnknownDependency {
                    id: node.id.clone(),
                    dependency: dependency.clone(),
                });
            }
        }
    }

    let mut remaining: Vec<&RuleNode> = nodes.iter().collect();
    let mut ordered: Vec<String> = Vec::with_capacity(nodes.len());

    while !remaining.is_empty() {
        let mut ready: Vec<&RuleNode> = remaining
            .iter()
            .filter(|node| node.depends_on.iter().all(|dependency| ordered.contains(dependency)))
            .copied()
            .collect();

        if ready.is_empty() {
            let ids = remaining.iter().map(|node| node.id.clone()).collect();
            return Err(RuleError::CycleDetected { ids });
        }

        ready.sort_by_key(|node| (node.priority, node.declaration_index));
        for node in &ready {
            ordered.push(node.id.clone());
        }
        remaining.retain(|node| !ready.iter().any(|r| r.id == node.id));
    }

    Ok(ordered)
}
