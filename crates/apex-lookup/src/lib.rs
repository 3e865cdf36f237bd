// apex-lookup/src/lib.rs
// ============================================================================
// Module: APEX Lookup Executor
// Description: Evaluates declared lookup enrichments against a context:
//              condition, composite key, cache/driver/fallback resolution,
//              field mapping, and missing-data policy (§4.5).
// Purpose: Bridge a declarative lookup enrichment to the driver registry
//          and evaluation context without either of those knowing about
//          the other.
// Dependencies: apex-cache, apex-core, apex-drivers, apex-expr,
//               apex-resilience
// ============================================================================

//! ## Overview
//! `apex-lookup` owns the algorithm in §4.5: build a key from the current
//! context, resolve it against a configured data source (through a
//! [`apex_cache::Cache`] when one fronts that source), apply declared
//! field mappings with optional transforms and validation, and fall back
//! to a missing-data policy when nothing resolves. [`LookupExecutor`] is
//! the single entry point; everything else in this crate is the shape of
//! one declared lookup and its supporting error/outcome types.

#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used))]

pub mod declaration;
pub mod error;
pub mod executor;
pub mod key;
pub mod mapping;
pub mod outcome;
pub mod policy;

pub use declaration::FilterCondition;
pub use declaration::LookupEnrichment;
pub use error::LookupError;
pub use executor::LookupExecutor;
pub use key::KeyOutcome;
pub use key::LookupKey;
pub use mapping::FieldMapping;
pub use mapping::Validation;
pub use outcome::LookupOutcome;
pub use outcome::LookupStatus;
pub use policy::MissingDataPolicy;
