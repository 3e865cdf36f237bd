// apex-core/src/collaborators.rs
// ============================================================================
// Module: Collaborator Contracts
// Description: The narrow, single-purpose traits every driver, cache, and
//              pipeline stage is handed rather than reaching for global
//              state (§6.3: Clock, SecretProvider, MetricsSink, AuditSink).
// Purpose: Shared at the `apex-core` level so drivers, the cache layer,
//          and the engine wiring can all depend on one definition without
//          a dependency cycle back through `apex-config`.
// Dependencies: none beyond std/chrono
// ============================================================================

use chrono::DateTime;
use chrono::Utc;
use thiserror::Error;

use crate::outcome::AuditEvent;

/// A source of the current instant, injected so tests can control time
/// deterministically (§6.3: "Clock: `now() → instant` for deterministic
/// testing").
pub trait Clock: Send + Sync {
    /// The current instant, as seen by this clock.
    fn now(&self) -> DateTime<Utc>;
}

/// The system clock. The default [`Clock`] for production wiring.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Failure resolving a secret reference.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SecretError {
    /// No secret is registered under this reference.
    #[error("secret '{reference}' not found")]
    NotFound {
        /// The reference that was looked up.
        reference: String,
    },
    /// The backing secret store could not be reached.
    #[error("secret store unavailable: {message}")]
    Unavailable {
        /// Description of the underlying failure.
        message: String,
    },
}

/// Resolves opaque secret references (API keys, passwords, bearer
/// tokens) named in driver configuration, so no secret value is ever
/// written into a YAML config file (§6.3).
pub trait SecretProvider: Send + Sync {
    /// Resolves `reference` to its current value.
    ///
    /// # Errors
    /// Returns `SecretError` if the reference is unknown or the backing
    /// store cannot be reached.
    fn get(&self, reference: &str) -> Result<String, SecretError>;
}

/// A metric observation emitted by the engine.
#[derive(Debug, Clone, PartialEq)]
pub enum Metric {
    /// A monotonically increasing counter, e.g. `lookup.cache.hits`.
    Counter {
        /// Dotted metric name.
        name: &'static str,
        /// Amount to add.
        value: u64,
    },
    /// A duration observation, e.g. `rule.execution`.
    Timer {
        /// Dotted metric name.
        name: &'static str,
        /// Observed duration, in milliseconds.
        millis: u64,
    },
    /// A point-in-time value, e.g. `connections.active`.
    Gauge {
        /// Dotted metric name.
        name: &'static str,
        /// Observed value.
        value: f64,
    },
}

/// An append-only sink for engine metrics. Implementations must not
/// apply backpressure on the hot path (§6.3).
pub trait MetricsSink: Send + Sync {
    /// Records a single observation.
    fn record(&self, metric: Metric);
}

/// A [`MetricsSink`] that discards every observation, used as the
/// default when no sink is wired.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullMetricsSink;

impl MetricsSink for NullMetricsSink {
    fn record(&self, _metric: Metric) {}
}

/// An append-only sink for audit events (§6.3).
pub trait AuditSink: Send + Sync {
    /// Appends a single event.
    fn append(&self, event: AuditEvent);
}

/// An [`AuditSink`] that discards every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullAuditSink;

impl AuditSink for NullAuditSink {
    fn append(&self, _event: AuditEvent) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn system_clock_advances() {
        let clock = SystemClock;
        let first = clock.now();
        let second = clock.now();
        assert!(second >= first);
    }

    #[test]
    fn null_sinks_accept_without_panicking() {
        NullMetricsSink.record(Metric::Counter { name: "lookup.cache.hits", value: 1 });
        NullAuditSink.append(AuditEvent {
            timestamp_millis: 0,
            actor: None,
            event_type: "test".to_string(),
            subject: "test".to_string(),
            details: std::collections::BTreeMap::new(),
        });
    }
}
