// apex-rules/src/error.rs
// ============================================================================
// Module: Rule Ordering Errors
// Description: Failure modes of ordering a declared set of rules. A rule's
//              own condition throwing is not one of these: it is absorbed
//              into a Failed/Error outcome rather than propagated (§4.7).
// ============================================================================

use thiserror::Error;

/// Everything that can go wrong ordering a rule group's dependency graph.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RuleError {
    /// A `depends-on` reference names an id not declared in this group.
    #[error("rule '{id}' depends on undeclared id '{dependency}'")]
    UnknownDependency {
        /// The rule whose dependency is undeclared.
        id: String,
        /// The undeclared id it depends on.
        dependency: String,
    },
    /// The dependency graph has a cycle; the engine rejects the
    /// configuration rather than guessing an order.
    #[error("dependency cycle detected among rules: {}", .ids.join(" -> "))]
    CycleDetected {
        /// The ids participating in the detected cycle, in traversal order.
        ids: Vec<String>,
    },
    /// Two rules in the same group declared the same id.
    #[error("duplicate rule id: {id}")]
    DuplicateId {
        /// The duplicated id.
        id: String,
    },
}
