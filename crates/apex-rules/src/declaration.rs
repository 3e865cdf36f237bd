// apex-rules/src/declaration.rs
// ============================================================================
// Module: Rule Declarations
// Description: A single rule's condition/message/severity, a rule group's
//              shared ordering and short-circuit policy, and per-category
//              aggregation policy (§4.7).
// ============================================================================

use apex_core::Severity;
use apex_expr::Expression;

/// One declared rule: a boolean condition, a message template rendered
/// against the final context, a severity, and an optional category.
#[derive(Debug, Clone)]
pub struct RuleDeclaration {
    /// Unique id within the enclosing group.
    pub id: String,
    /// Ids of rules in the same group that must run first.
    pub depends_on: Vec<String>,
    /// Breaks ties within a ready layer; ascending, lower runs first.
    pub priority: i32,
    /// The condition evaluated against the context.
    pub condition: Expression,
    /// Rendered against the context via `apex_expr::render_template` once
    /// the condition has been evaluated.
    pub message_template: String,
    /// Declared severity. A throwing condition upgrades the outcome's
    /// severity to `Error` regardless of this value.
    pub severity: Severity,
    /// Optional category, used for per-category aggregation policies.
    pub category: Option<String>,
    /// When false, the rule is never evaluated and reports `Skipped`.
    pub enabled: bool,
}

/// A named set of rules sharing a dependency graph and a short-circuit
/// policy.
#[derive(Debug, Clone)]
pub struct RuleGroup {
    /// Human-readable group name, surfaced in reports and logs.
    pub name: String,
    /// The rules in this group.
    pub rules: Vec<RuleDeclaration>,
    /// Stop evaluating this group's remaining rules after the first
    /// `Failed` outcome whose severity is `Error`. Warning/Info failures
    /// never short-circuit.
    pub stop_on_first_failure: bool,
}

/// Per-category aggregation policy.
#[derive(Debug, Clone)]
pub struct CategoryPolicy {
    /// The category this policy governs.
    pub category: String,
    /// Halt the entire run (all remaining groups) on the first
    /// `Error`-severity failure in this category.
    pub stop_on_error: bool,
}
