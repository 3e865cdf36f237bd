// apex-core/src/lib.rs
// ============================================================================
// Module: APEX Core
// Description: Typed Value tree, Record/EvaluationContext data model,
//              canonical identifiers, and shared result types.
// Purpose: The foundation every other APEX crate builds against; contains
//          no IO, no expression parsing, and no driver logic.
// Dependencies: bigdecimal, chrono, serde, sha2
// ============================================================================

//! ## Overview
//! `apex-core` owns the data model described in the engine's §3: the typed
//! `Value` union, `Record` (a dotted-path-addressable document), the
//! `EvaluationContext` a pipeline run writes into, the opaque identifier
//! types every config entity is named by, and the `Outcome`/`Report` result
//! shape the rule engine and engine API share. Nothing here talks to a
//! driver, parses YAML, or evaluates an expression; those live in
//! `apex-drivers`, `apex-config`, and `apex-expr` respectively.

#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used))]

pub mod collaborators;
pub mod context;
pub mod hashing;
pub mod identifiers;
pub mod outcome;
pub mod record;
pub mod value;

pub use collaborators::AuditSink;
pub use collaborators::Clock;
pub use collaborators::Metric;
pub use collaborators::MetricsSink;
pub use collaborators::NullAuditSink;
pub use collaborators::NullMetricsSink;
pub use collaborators::SecretError;
pub use collaborators::SecretProvider;
pub use collaborators::SystemClock;
pub use context::ContextError;
pub use context::EvaluationContext;
pub use hashing::HashingError;
pub use hashing::hash_canonical_json;
pub use identifiers::ConfigName;
pub use identifiers::DataSourceId;
pub use identifiers::DataTypeName;
pub use identifiers::EnrichmentId;
pub use identifiers::RuleChainId;
pub use identifiers::RuleGroupId;
pub use identifiers::RuleId;
pub use identifiers::ScenarioId;
pub use identifiers::VariableName;
pub use outcome::AuditEvent;
pub use outcome::Decision;
pub use outcome::Outcome;
pub use outcome::OutcomeStatus;
pub use outcome::Report;
pub use outcome::Severity;
pub use record::Record;
pub use record::RecordError;
pub use value::DEFAULT_DECIMAL_SCALE;
pub use value::Value;
pub use value::ValueDuration;
pub use value::ValueError;
pub use value::ValueKind;
