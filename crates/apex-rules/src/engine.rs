// apex-rules/src/engine.rs
// ============================================================================
// Module: Rule Engine
// Description: Evaluates rule groups in dependency+priority order,
//              accumulates outcomes, applies stop-on-first-failure and
//              per-category stop-on-error, and derives the approval
//              decision from running `#hasErrors`/`#hasWarnings` totals
//              (§4.7).
// ============================================================================

use std::collections::BTreeMap;
use std::time::Instant;

use apex_core::Decision;
use apex_core::EvaluationContext;
use apex_core::Outcome;
use apex_core::OutcomeStatus;
use apex_core::Report;
use apex_core::RuleId;
use apex_core::Severity;
use apex_core::Value;

use crate::declaration::CategoryPolicy;
use crate::declaration::RuleDeclaration;
use crate::declaration::RuleGroup;
use crate::error::RuleError;
use crate::ordering::RuleNode;
use crate::ordering::order_rules;

/// Evaluates a declared set of rule groups against a shared context.
///
/// Stateless: every piece of run state lives in the `EvaluationContext`
/// and the `Report` being built, so one engine instance evaluates many
/// records concurrently.
#[derive(Debug, Default)]
pub struct RuleEngine;

impl RuleEngine {
    /// Creates a new rule engine.
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Runs every group in `groups`, in order, against `ctx`.
    ///
    /// Each group's own rules run in dependency+priority order. After
    /// every rule, `#hasErrors`/`#hasWarnings` are rebound on `ctx` from
    /// the outcomes recorded so far, so a terminal rule declared later —
    /// in the same or a following group — can reference the running
    /// totals in its own condition or message. A group with
    /// `stop_on_first_failure` set halts its own remaining rules on the
    /// first `Error`-severity failure; a category whose policy declares
    /// `stop_on_error` halts the entire run (all remaining groups) on the
    /// first `Error`-severity failure tagged with that category.
    ///
    /// # Errors
    /// Returns [`RuleError`] if any group's dependency graph is malformed
    /// (duplicate id, unknown dependency, or a cycle). A rule's own
    /// condition throwing is not an error here: it is recorded as a
    /// `Failed` outcome with severity upgraded to `Error`.
    pub fn evaluate(
        &self,
        groups: &[RuleGroup],
        category_policies: &[CategoryPolicy],
        ctx: &mut EvaluationContext,
    ) -> Result<Report, RuleError> {
        let mut outcomes: Vec<Outcome> = Vec::new();
        let mut counts: BTreeMap<Severity, usize> = BTreeMap::new();

        'groups: for group in groups {
            let order = order_group(group)?;
            tracing::debug!(group = %group.name, rule_count = order.len(), "evaluating rule group");

            for id in order {
                let rule = group
                    .rules
                    .iter()
                    .find(|rule| rule.id == id)
                    .expect("order_rules only returns ids present in this group");

                let outcome = evaluate_rule(rule, ctx);
                let is_error_failure =
                    matches!(outcome.status, OutcomeStatus::Failed) && outcome.severity == Severity::Error;
                if matches!(outcome.status, OutcomeStatus::Failed) {
                    *counts.entry(outcome.severity).or_insert(0) += 1;
                }
                let category = outcome.category.clone();
                outcomes.push(outcome);
                rebind_decision_hints(ctx, &counts);

                if !is_error_failure {
                    continue;
                }
                let category_halts = category
                    .as_deref()
                    .and_then(|cat| category_policies.iter().find(|policy| policy.category == cat))
                    .is_some_and(|policy| policy.stop_on_error);
                if category_halts {
                    tracing::debug!(category = ?category, "category policy halted evaluation");
                    break 'groups;
                }
                if group.stop_on_first_failure {
                    break;
                }
            }
        }

        Ok(Report {
            outcomes,
            decision: Some(derive_decision(&counts)),
            counts_by_severity: counts,
            context_snapshot: Some(ctx.snapshot()),
            audit_events: Vec::new(),
        })
    }
}

fn order_group(group: &RuleGroup) -> Result<Vec<String>, RuleError> {
    let nodes: Vec<RuleNode> = group
        .rules
        .iter()
        .enumerate()
        .map(|(index, rule)| RuleNode {
            id: rule.id.clone(),
            depends_on: rule.depends_on.clone(),
            priority: rule.priority,
            declaration_index: index,
        })
        .collect();
    order_rules(&nodes)
}

fn evaluate_rule(rule: &RuleDeclaration, ctx: &EvaluationContext) -> Outcome {
    let started = Instant::now();
    if !rule.enabled {
        return Outcome {
            rule_id: RuleId::new(rule.id.clone()),
            status: OutcomeStatus::Skipped { reason: "rule is disabled".to_string() },
            message: apex_expr::render_template(&rule.message_template, ctx),
            severity: rule.severity,
            category: rule.category.clone(),
            elapsed: started.elapsed(),
        };
    }
    match rule.condition.evaluate(ctx) {
        Ok(value) => {
            let status = if value.is_truthy() { OutcomeStatus::Passed } else { OutcomeStatus::Failed };
            Outcome {
                rule_id: RuleId::new(rule.id.clone()),
                status,
                message: apex_expr::render_template(&rule.message_template, ctx),
                severity: rule.severity,
                category: rule.category.clone(),
                elapsed: started.elapsed(),
            }
        }
        Err(err) => Outcome {
            rule_id: RuleId::new(rule.id.clone()),
            status: OutcomeStatus::Failed,
            message: format!("rule condition failed to evaluate: {err}"),
            severity: Severity::Error,
            category: rule.category.clone(),
            elapsed: started.elapsed(),
        },
    }
}

fn rebind_decision_hints(ctx: &mut EvaluationContext, counts: &BTreeMap<Severity, usize>) {
    ctx.set_variable("hasErrors", Value::Bool(has_severity(counts, Severity::Error)));
    ctx.set_variable("hasWarnings", Value::Bool(has_severity(counts, Severity::Warning)));
}

fn derive_decision(counts: &BTreeMap<Severity, usize>) -> Decision {
    if has_severity(counts, Severity::Error) {
        Decision::Rejected
    } else if has_severity(counts, Severity::Warning) {
        Decision::ManualReview
    } else {
        Decision::AutoApproved
    }
}

fn has_severity(counts: &BTreeMap<Severity, usize>, severity: Severity) -> bool {
    counts.get(&severity).copied().unwrap_or(0) > 0
}
