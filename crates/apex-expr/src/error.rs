// apex-expr/src/error.rs
// ============================================================================
// Module: Expression Errors
// Description: The closed failure-mode taxonomy for parsing and evaluating
//              expressions.
// Purpose: Give callers (enrichment pipeline, rule engine) one enum to match
//          on instead of propagating lexer/parser/evaluator-specific types.
// Dependencies: apex-core
// ============================================================================

use apex_core::ValueError;
use apex_core::ValueKind;
use thiserror::Error;

/// Every way an expression can fail to parse or evaluate (§4.1).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EvalError {
    /// The source text is not a syntactically valid expression.
    #[error("parse error at position {position}: {message}")]
    ParseError {
        /// Byte offset into the source text where the failure was detected.
        position: usize,
        /// Human-readable description of what was expected.
        message: String,
    },
    /// A member or root-field access found no such path, without
    /// safe-navigation to fall back to null.
    #[error("path not found: '{path}'")]
    PathNotFound {
        /// The path segment or dotted path that was missing.
        path: String,
    },
    /// An operator or function received operands of incompatible types.
    #[error("type mismatch: {message}")]
    TypeMismatch {
        /// Human-readable description of the incompatible types.
        message: String,
    },
    /// A list index was out of bounds.
    #[error("index {index} out of bounds for length {length}")]
    IndexOutOfBounds {
        /// The attempted index.
        index: i64,
        /// The collection's length.
        length: usize,
    },
    /// Integer or decimal division or modulo by zero.
    #[error("division by zero")]
    DivisionByZero,
    /// A whitelisted function raised an error while executing.
    #[error("function '{name}' failed: {message}")]
    FunctionError {
        /// The function name.
        name: String,
        /// The failure description.
        message: String,
    },
    /// A function was called with the wrong number of arguments.
    #[error("function '{name}' expected {expected} argument(s), got {got}")]
    ArityError {
        /// The function name.
        name: String,
        /// The expected argument count.
        expected: usize,
        /// The actual argument count.
        got: usize,
    },
    /// The function name is not in the whitelisted registry.
    #[error("unknown function '{name}'")]
    UnknownFunction {
        /// The unrecognized function name.
        name: String,
    },
    /// A `#name` variable was referenced but never bound.
    #[error("unknown variable '#{name}'")]
    UnknownVariable {
        /// The unrecognized variable name.
        name: String,
    },
}

impl From<ValueError> for EvalError {
    fn from(err: ValueError) -> Self {
        match err {
            ValueError::TypeMismatch { op, left, right } => EvalError::TypeMismatch {
                message: format!("cannot apply '{op}' to {left} and {right}"),
            },
            ValueError::DivisionByZero => EvalError::DivisionByZero,
        }
    }
}

/// Shorthand constructor for a type-mismatch error naming the offending kinds.
pub(crate) fn type_mismatch(op: &str, left: ValueKind, right: ValueKind) -> EvalError {
    EvalError::TypeMismatch {
        message: format!("cannot apply '{op}' to {left} and {right}"),
    }
}
