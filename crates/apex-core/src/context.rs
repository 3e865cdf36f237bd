// apex-core/src/context.rs
// ============================================================================
// Module: Evaluation Context
// Description: Mutable (root record, variables) pair a pipeline run writes
//              enrichment outputs into.
// Purpose: Enforce the monotonic-write / no-shadow invariant while giving
//          the enrichment pipeline and rule engine a single write surface.
// Dependencies: crate::{record, value}
// ============================================================================

//! ## Overview
//! An `EvaluationContext` is exclusively owned by one pipeline execution: it
//! is never shared across threads mid-evaluation (§5). Writes to declared
//! target fields are tracked so a field with `allow-overwrite: false` can be
//! written at most once, and a field that is re-written cannot silently
//! change type.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use thiserror::Error;

use crate::collaborators::Clock;
use crate::collaborators::SystemClock;
use crate::record::Record;
use crate::record::RecordError;
use crate::value::Value;
use crate::value::ValueKind;

/// Errors raised while writing enrichment output into an `EvaluationContext`.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ContextError {
    /// The target path was already written once and `allow-overwrite` is
    /// false on the enrichment attempting to write it again.
    #[error("field '{path}' was already written and does not allow overwrite")]
    FieldAlreadyWritten {
        /// The target path in conflict.
        path: String,
    },
    /// The target path was written before with a different `ValueKind`;
    /// overwriting is only allowed when the type is unchanged.
    #[error("field '{path}' was previously written as {previous}, cannot retype to {new}")]
    FieldRetyped {
        /// The target path in conflict.
        path: String,
        /// The type recorded on the first write.
        previous: ValueKind,
        /// The type of the value attempting to overwrite it.
        new: ValueKind,
    },
    /// The write would pass through a non-map value at an intermediate
    /// path segment.
    #[error(transparent)]
    TypeConflict(#[from] RecordError),
}

/// The mutable state one input evaluation writes enrichment results into:
/// the root input record (read-only in practice, but not enforced by the
/// type), a separate `variables` namespace addressed by `#name`, and the
/// injected [`Clock`] `now()`/`today()` resolve through (§6.3), so a run
/// stays a pure function of (program snapshot, record, clock, resolved
/// external data) rather than reaching for the system clock directly.
#[derive(Clone)]
pub struct EvaluationContext {
    root: Record,
    variables: BTreeMap<String, Value>,
    written_fields: BTreeMap<String, ValueKind>,
    clock: Arc<dyn Clock>,
}

impl fmt::Debug for EvaluationContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EvaluationContext")
            .field("root", &self.root)
            .field("variables", &self.variables)
            .field("written_fields", &self.written_fields)
            .finish_non_exhaustive()
    }
}

impl EvaluationContext {
    /// Creates a context rooted at the given input record, with no
    /// variables bound, no write history, and the system clock.
    #[must_use]
    pub fn new(root: Record) -> Self {
        Self::with_clock(root, Arc::new(SystemClock))
    }

    /// Creates a context rooted at the given input record, resolving
    /// `now()`/`today()` through `clock` instead of the system clock, so
    /// tests can fix the instant a record is evaluated against.
    #[must_use]
    pub fn with_clock(root: Record, clock: Arc<dyn Clock>) -> Self {
        Self {
            root,
            variables: BTreeMap::new(),
            written_fields: BTreeMap::new(),
            clock,
        }
    }

    /// Borrows the root record.
    #[must_use]
    pub fn root(&self) -> &Record {
        &self.root
    }

    /// Borrows the clock this context's functions resolve `now()`/`today()`
    /// through.
    #[must_use]
    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    /// Resolves a `#name` variable binding.
    #[must_use]
    pub fn variable(&self, name: &str) -> Option<&Value> {
        self.variables.get(name)
    }

    /// Binds (or rebinds) a `#name` variable. Variable bindings are not
    /// subject to the no-shadow invariant; only declared enrichment target
    /// fields are.
    pub fn set_variable(&mut self, name: impl Into<String>, value: Value) {
        self.variables.insert(name.into(), value);
    }

    /// Writes `value` at the declared target path, enforcing the no-shadow
    /// invariant: a field already written with `allow_overwrite: false` is
    /// rejected, and a field being retyped on overwrite is rejected even
    /// when overwrite is allowed.
    ///
    /// # Errors
    /// Returns `ContextError::FieldAlreadyWritten`, `ContextError::FieldRetyped`,
    /// or a wrapped `RecordError::TypeConflict` from the underlying path write.
    pub fn write_field(
        &mut self,
        target_path: &str,
        value: Value,
        allow_overwrite: bool,
    ) -> Result<(), ContextError> {
        let new_kind = value.kind();
        if let Some(&previous_kind) = self.written_fields.get(target_path) {
            if !allow_overwrite {
                return Err(ContextError::FieldAlreadyWritten {
                    path: target_path.to_string(),
                });
            }
            if previous_kind != new_kind {
                return Err(ContextError::FieldRetyped {
                    path: target_path.to_string(),
                    previous: previous_kind,
                    new: new_kind,
                });
            }
        }

        self.root.set_path(target_path, value)?;
        self.written_fields.insert(target_path.to_string(), new_kind);
        Ok(())
    }

    /// `true` if `target_path` has been written at least once in this
    /// context's lifetime.
    #[must_use]
    pub fn was_written(&self, target_path: &str) -> bool {
        self.written_fields.contains_key(target_path)
    }

    /// Takes a snapshot of the context's root record, suitable for
    /// embedding in a `Report`. Variables are not part of the snapshot: they
    /// are pipeline-internal bindings, not output fields.
    #[must_use]
    pub fn snapshot(&self) -> Record {
        self.root.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_write_without_overwrite_is_rejected() {
        let mut ctx = EvaluationContext::new(Record::new());
        ctx.write_field("currencyName", Value::String("US Dollar".into()), false)
            .expect("first write");
        let err = ctx
            .write_field("currencyName", Value::String("Other".into()), false)
            .expect_err("second write should fail");
        assert!(matches!(err, ContextError::FieldAlreadyWritten { .. }));
    }

    #[test]
    fn overwrite_allowed_same_type_succeeds() {
        let mut ctx = EvaluationContext::new(Record::new());
        ctx.write_field("tier", Value::String("GOLD".into()), true)
            .expect("first write");
        ctx.write_field("tier", Value::String("PLATINUM".into()), true)
            .expect("second write");
        assert_eq!(ctx.root().get("tier"), Some(&Value::String("PLATINUM".into())));
    }

    #[test]
    fn overwrite_with_different_type_is_rejected() {
        let mut ctx = EvaluationContext::new(Record::new());
        ctx.write_field("flag", Value::Bool(true), true).expect("first write");
        let err = ctx
            .write_field("flag", Value::Int64(1), true)
            .expect_err("retype should fail");
        assert!(matches!(err, ContextError::FieldRetyped { .. }));
    }

    #[test]
    fn variables_are_not_subject_to_no_shadow() {
        let mut ctx = EvaluationContext::new(Record::new());
        ctx.set_variable("hasErrors", Value::Bool(false));
        ctx.set_variable("hasErrors", Value::Bool(true));
        assert_eq!(ctx.variable("hasErrors"), Some(&Value::Bool(true)));
    }
}
