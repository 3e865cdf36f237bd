// apex-enrichment/src/error.rs
// ============================================================================
// Module: Enrichment Errors
// Description: Failure modes of ordering and running a declared set of
//              enrichments (§4.6).
// ============================================================================

use apex_core::ContextError;
use apex_expr::EvalError;
use apex_lookup::LookupError;
use thiserror::Error;

/// Everything that can go wrong building or running an enrichment
/// pipeline.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EnrichmentError {
    /// A `depends-on` reference names an id not declared in this graph.
    #[error("enrichment '{id}' depends on undeclared id '{dependency}'")]
    UnknownDependency {
        /// The enrichment whose dependency is undeclared.
        id: String,
        /// The undeclared id it depends on.
        dependency: String,
    },
    /// The dependency graph has a cycle; the engine rejects the
    /// configuration rather than guessing an order.
    #[error("dependency cycle detected among enrichments: {}", .ids.join(" -> "))]
    CycleDetected {
        /// The ids participating in the detected cycle, in traversal
        /// order.
        ids: Vec<String>,
    },
    /// Two enrichments in the same run declared the same id.
    #[error("duplicate enrichment id: {id}")]
    DuplicateId {
        /// The duplicated id.
        id: String,
    },
    /// A lookup enrichment (or a chain/batch stage wrapping one) failed.
    #[error(transparent)]
    Lookup(#[from] LookupError),
    /// A conditional-routing or batch-collection expression failed.
    #[error("expression evaluation failed: {0}")]
    Evaluation(#[from] EvalError),
    /// A batch enrichment's declared collection field is not a `List`.
    #[error("batch enrichment '{field}' expects a list but found {kind}")]
    NotACollection {
        /// The declared batch collection field.
        field: String,
        /// The actual value kind found there.
        kind: String,
    },
    /// Writing a batch result or a conditional-routing common mapping
    /// violated the no-shadow invariant.
    #[error(transparent)]
    ContextWrite(#[from] ContextError),
}
