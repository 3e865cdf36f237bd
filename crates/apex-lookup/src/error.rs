// apex-lookup/src/error.rs
// ============================================================================
// Module: Lookup Errors
// Description: The failure modes a lookup enrichment can surface, beyond
//              the Skipped/Missing outcomes that are not errors (§4.5).
// ============================================================================

use apex_core::ContextError;
use apex_core::RecordError;
use apex_drivers::DriverError;
use apex_expr::EvalError;
use thiserror::Error;

/// Everything that can go wrong executing one lookup enrichment.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LookupError {
    /// The condition, key, or a field-mapping transform failed to
    /// evaluate.
    #[error("expression evaluation failed: {0}")]
    Evaluation(#[from] EvalError),
    /// A composite key component evaluated to `null` and
    /// `allow-null-components` was not set.
    #[error("composite key component '{component}' is null")]
    NullKeyComponent {
        /// The declared expression text of the offending component.
        component: String,
    },
    /// The configured driver returned more than one record for a key and
    /// no `ordering` expression was declared to pick one.
    #[error("data source '{dataset_ref}' returned multiple records for one key")]
    DuplicateKey {
        /// The dataset reference that produced more than one match.
        dataset_ref: String,
    },
    /// A field-mapping target path passes through a non-map value.
    #[error(transparent)]
    TypeConflict(#[from] RecordError),
    /// Writing a mapped field violated the no-shadow invariant.
    #[error(transparent)]
    ContextWrite(#[from] ContextError),
    /// A field-mapping validation rule rejected the resolved value.
    #[error("validation failed for field '{field}': {message}")]
    ValidationFailed {
        /// The target field that failed validation.
        field: String,
        /// Human-readable reason.
        message: String,
    },
    /// The driver call itself failed (connection, auth, timeout, parse).
    #[error(transparent)]
    Driver(#[from] DriverError),
    /// The enrichment's `missing-data` policy is `fail` and the key did
    /// not resolve.
    #[error("lookup for '{dataset_ref}' found no record and the missing-data policy is 'fail'")]
    MissingDataFailure {
        /// The dataset reference that produced no match.
        dataset_ref: String,
    },
}
