// apex-config/src/lib.rs
// ============================================================================
// Crate: apex-config
// Description: Loads YAML configuration (datasets, rule configs, scenarios,
//              the scenario registry, bootstrap files), classifies and
//              validates it, compiles it into the typed declarations
//              `apex-lookup`/`apex-enrichment`/`apex-rules` consume, and
//              wires the result into a routable, evaluatable `Engine`
//              (§4.8, §4.9, §6.2, §6.3, §6.4).
// Purpose: Give every embedding application one place to turn a directory
//          of hand-authored YAML into a running decision engine, without
//          any of the individual rule/lookup/enrichment crates knowing
//          anything about file formats.
// Dependencies: apex-cache, apex-core, apex-drivers, apex-enrichment,
//               apex-expr, apex-lookup, apex-rules, serde, serde_json,
//               serde_yaml, thiserror, tracing
// ============================================================================

//! ## Overview
//! [`classify::classify`] determines a parsed YAML document's kind;
//! [`metadata::validate_metadata`] enforces the universal and
//! per-kind-required metadata fields; [`schema`] holds the loose,
//! serde-deserializable raw shapes every document kind parses into;
//! [`compile`] turns those raw shapes into the typed declarations the
//! evaluation crates consume, compiling every embedded expression along
//! the way; [`env::expand`] resolves `${VAR}`/`${VAR:default}` references
//! in declared connection strings; [`loader::ConfigLoader`] drives the
//! whole per-file pipeline and aggregates everything loaded across a
//! directory, including eager dependency-graph validation; [`scenario`]
//! resolves a request to the rule configs it should run; [`engine`]
//! exposes the `Engine` applications actually construct and call.

#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used))]

pub mod classify;
pub mod compile;
pub mod engine;
pub mod env;
pub mod error;
pub mod loader;
pub mod metadata;
pub mod schema;
pub mod scenario;

pub use engine::Engine;
pub use engine::EngineDeps;
pub use engine::EvaluationResult;
pub use error::ConfigError;
pub use loader::CompiledRuleConfig;
pub use loader::ConfigLoader;
pub use metadata::ConfigKind;
pub use scenario::ResolvedProgram;
