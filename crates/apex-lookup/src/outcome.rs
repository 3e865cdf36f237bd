// apex-lookup/src/outcome.rs
// ============================================================================
// Module: Lookup Outcome
// Description: What happened when one lookup enrichment ran, distinct from
//              `apex_core::outcome::Outcome` (which reports on rules, not
//              lookups). Consumed by the enrichment pipeline and by audit
//              reporting (§4.5, §4.9).
// ============================================================================

use std::time::Duration;

use apex_core::DataSourceId;

/// The result of evaluating one `LookupEnrichment`.
#[derive(Debug, Clone, PartialEq)]
pub enum LookupStatus {
    /// The condition evaluated to `false`; nothing was resolved.
    Skipped {
        /// Why the enrichment did not run.
        reason: String,
    },
    /// A record was found and its field mappings were applied.
    Resolved {
        /// The data source the record came from.
        data_source_id: DataSourceId,
        /// Whether the record was served from cache rather than the
        /// driver itself.
        cache_hit: bool,
    },
    /// No record was found and the missing-data policy determined what
    /// happened next.
    Missing {
        /// A human-readable name of the policy that was applied
        /// (`"fail"`, `"continue"`, `"defaults"`, `"fallback-source"`).
        policy_applied: String,
    },
}

/// One lookup enrichment's full outcome, including timing.
#[derive(Debug, Clone, PartialEq)]
pub struct LookupOutcome {
    /// What happened.
    pub status: LookupStatus,
    /// How long the enrichment took to evaluate, from condition check
    /// through the final field write.
    pub elapsed: Duration,
}

impl LookupOutcome {
    /// Builds a `Skipped` outcome.
    #[must_use]
    pub fn skipped(reason: impl Into<String>, elapsed: Duration) -> Self {
        Self { status: LookupStatus::Skipped { reason: reason.into() }, elapsed }
    }

    /// Builds a `Resolved` outcome.
    #[must_use]
    pub fn resolved(data_source_id: DataSourceId, cache_hit: bool, elapsed: Duration) -> Self {
        Self { status: LookupStatus::Resolved { data_source_id, cache_hit }, elapsed }
    }

    /// Builds a `Missing` outcome.
    #[must_use]
    pub fn missing(policy_applied: impl Into<String>, elapsed: Duration) -> Self {
        Self { status: LookupStatus::Missing { policy_applied: policy_applied.into() }, elapsed }
    }

    /// True if this enrichment produced a resolved record.
    #[must_use]
    pub fn was_resolved(&self) -> bool {
        matches!(self.status, LookupStatus::Resolved { .. })
    }
}
