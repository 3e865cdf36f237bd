// apex-core/src/outcome.rs
// ============================================================================
// Module: Outcomes & Reports
// Description: Per-rule outcome and aggregated report types produced by one
//              evaluation run.
// Purpose: Give the rule engine and engine API a shared, serializable result
//          shape instead of each crate inventing its own.
// Dependencies: crate::{identifiers, record}
// ============================================================================

//! ## Overview
//! A `Report` is the terminal artifact of `evaluate(program, record, options)`
//! (§6.2): an ordered list of rule `Outcome`s, counts by severity, the
//! enriched context snapshot, forwarded audit events, and the decision
//! derived from the terminal approval rule pattern, if one was declared.

use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

use serde::Deserialize;
use serde::Serialize;

use crate::identifiers::RuleId;
use crate::record::Record;

/// Severity taxonomy controlling short-circuit behavior and message
/// classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Informational; never short-circuits.
    Info,
    /// A soft failure; never short-circuits.
    Warning,
    /// A hard failure; short-circuits a `stop-on-first-failure` group.
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Info => "Info",
            Self::Warning => "Warning",
            Self::Error => "Error",
        };
        f.write_str(label)
    }
}

/// Whether a rule's condition ran to completion and what it produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", tag = "status")]
pub enum OutcomeStatus {
    /// The condition evaluated true.
    Passed,
    /// The condition evaluated false.
    Failed,
    /// The rule was not evaluated (disabled, or skipped by an upstream
    /// policy such as a missed dependency).
    Skipped {
        /// Human-readable reason the rule was skipped.
        reason: String,
    },
}

/// The recorded result of evaluating a single rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Outcome {
    /// The rule that produced this outcome.
    pub rule_id: RuleId,
    /// Pass/fail/skip status.
    pub status: OutcomeStatus,
    /// The rendered message template.
    pub message: String,
    /// The outcome's severity; upgraded to `Error` when the condition threw.
    pub severity: Severity,
    /// The rule's declared category, if any.
    pub category: Option<String>,
    /// Wall-clock time spent evaluating this rule's condition and message.
    #[serde(with = "duration_millis")]
    pub elapsed: Duration,
}

/// A single append-only audit record forwarded to the configured
/// `AuditSink` and retained on the `Report`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEvent {
    /// Milliseconds since the Unix epoch, per the injected `Clock`.
    pub timestamp_millis: i64,
    /// Optional actor identifier (request-scoped, not authenticated here).
    pub actor: Option<String>,
    /// A short, stable event-type tag, e.g. `"enrichment.lookup.miss"`.
    pub event_type: String,
    /// The subject the event concerns, e.g. an enrichment or rule id.
    pub subject: String,
    /// Free-form structured details.
    pub details: BTreeMap<String, String>,
}

/// The terminal artifact of one `evaluate` call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    /// Ordered outcomes, one per evaluated rule, in evaluation order.
    pub outcomes: Vec<Outcome>,
    /// Count of outcomes by severity, counting only `Failed` outcomes (a
    /// `Passed` rule's declared severity does not count toward the
    /// aggregate, since it did not fail).
    pub counts_by_severity: BTreeMap<Severity, usize>,
    /// The enriched context's root record, if snapshotting was requested.
    pub context_snapshot: Option<Record>,
    /// Audit events emitted during this run, in emission order.
    pub audit_events: Vec<AuditEvent>,
    /// The decision derived from the terminal approval rule pattern, if a
    /// rule populated it.
    pub decision: Option<Decision>,
}

impl Report {
    /// `true` if any outcome failed with `Severity::Error`.
    #[must_use]
    pub fn has_errors(&self) -> bool {
        self.counts_by_severity.get(&Severity::Error).copied().unwrap_or(0) > 0
    }

    /// `true` if any outcome failed with `Severity::Warning`.
    #[must_use]
    pub fn has_warnings(&self) -> bool {
        self.counts_by_severity.get(&Severity::Warning).copied().unwrap_or(0) > 0
    }
}

/// The approval-decision pattern's terminal classification (§4.7).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Decision {
    /// No error or warning outcomes were recorded.
    AutoApproved,
    /// Warning outcomes were recorded but no errors.
    ManualReview,
    /// At least one error outcome was recorded.
    Rejected,
}

mod duration_millis {
    use std::time::Duration;

    use serde::Deserialize;
    use serde::Deserializer;
    use serde::Serializer;

    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        #[allow(clippy::cast_possible_truncation)]
        serializer.serialize_u64(duration.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn report_has_errors_only_counts_failed_severity() {
        let mut counts = BTreeMap::new();
        counts.insert(Severity::Error, 1);
        let report = Report {
            outcomes: vec![],
            counts_by_severity: counts,
            context_snapshot: None,
            audit_events: vec![],
            decision: None,
        };
        assert!(report.has_errors());
        assert!(!report.has_warnings());
    }
}
