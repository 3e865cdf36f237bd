// apex-drivers/src/error.rs
// ============================================================================
// Module: Driver Errors
// Description: The closed error taxonomy every driver reports through
//              (§4.4: "Drivers report typed errors: ConnectionError,
//              AuthError, TimeoutError, NotFound, ParseError").
// ============================================================================

use apex_resilience::Retryable;
use thiserror::Error;

/// Every way a data source driver call can fail.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DriverError {
    /// The underlying transport (socket, process, file handle) failed.
    #[error("connection error: {message}")]
    ConnectionError {
        /// Description of the underlying failure.
        message: String,
    },
    /// Credentials were rejected or a secret reference could not be
    /// resolved.
    #[error("authentication error: {message}")]
    AuthError {
        /// Description of the underlying failure.
        message: String,
    },
    /// The call did not complete within its deadline.
    #[error("timeout after {millis}ms")]
    TimeoutError {
        /// The deadline that was exceeded, in milliseconds.
        millis: u64,
    },
    /// The referenced dataset, file, or endpoint does not exist at all
    /// (distinct from a resolve returning no matching record, which is
    /// `Ok(None)`, not an error).
    #[error("not found: {what}")]
    NotFound {
        /// What was not found (a path, endpoint, or table name).
        what: String,
    },
    /// The driver received data it could not parse into a `Record`.
    #[error("parse error: {message}")]
    ParseError {
        /// Description of the underlying failure.
        message: String,
    },
}

impl Retryable for DriverError {
    fn is_retryable(&self) -> bool {
        matches!(self, DriverError::ConnectionError { .. } | DriverError::TimeoutError { .. })
    }
}
