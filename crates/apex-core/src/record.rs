// apex-core/src/record.rs
// ============================================================================
// Module: Record
// Description: The root structured input/output document of an evaluation.
// Purpose: Provide dotted-path read/write access over a Value::Map, creating
//          intermediate maps on write and rejecting writes through
//          non-map intermediates.
// Dependencies: crate::value
// ============================================================================

//! ## Overview
//! A `Record` is a thin wrapper around `Value::Map` that understands dotted
//! paths (`a.b.c`). It backs both the immutable input record and the
//! enrichment-pipeline's write target.

use std::collections::BTreeMap;

use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

use crate::value::Value;

/// Errors raised while reading or writing a dotted path against a `Record`.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RecordError {
    /// An intermediate path segment already holds a non-map value, so a
    /// nested write cannot create a map there.
    #[error("path '{path}' has a non-map value at '{segment}', cannot write through it")]
    TypeConflict {
        /// The full path being written.
        path: String,
        /// The segment at which the conflict was found.
        segment: String,
    },
    /// The path contains no segments.
    #[error("path is empty")]
    EmptyPath,
}

/// A structured, string-keyed document: the root of an evaluation, or the
/// value written back by an enrichment's field mappings.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(transparent)]
pub struct Record(BTreeMap<String, Value>);

impl Record {
    /// Creates an empty record.
    #[must_use]
    pub fn new() -> Self {
        Self(BTreeMap::new())
    }

    /// Wraps an existing field map as a record.
    #[must_use]
    pub fn from_map(fields: BTreeMap<String, Value>) -> Self {
        Self(fields)
    }

    /// Builds a record from a loosely typed JSON object, as returned by
    /// drivers and CLI input. Non-object input produces an empty record.
    #[must_use]
    pub fn from_json(value: &serde_json::Value) -> Self {
        match value {
            serde_json::Value::Object(map) => {
                Self(map.iter().map(|(k, v)| (k.clone(), Value::from(v))).collect())
            }
            _ => Self::new(),
        }
    }

    /// Returns the top-level field map.
    #[must_use]
    pub fn fields(&self) -> &BTreeMap<String, Value> {
        &self.0
    }

    /// Returns a top-level field by name, without dotted-path traversal.
    #[must_use]
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field)
    }

    /// Resolves a dotted path (`a.b.c`) against this record. Returns `None`
    /// if any segment is missing; the caller decides whether that is a
    /// `PathNotFound` error or a safe-navigated `null`.
    #[must_use]
    pub fn get_path(&self, path: &str) -> Option<&Value> {
        let mut segments = path.split('.');
        let first = segments.next()?;
        let mut current = self.0.get(first)?;
        for segment in segments {
            current = match current {
                Value::Map(map) => map.get(segment)?,
                _ => return None,
            };
        }
        Some(current)
    }

    /// Writes `value` at a dotted path, creating intermediate `Value::Map`
    /// nodes as needed.
    ///
    /// # Errors
    /// Returns `RecordError::TypeConflict` if an intermediate segment
    /// already holds a non-map value, or `RecordError::EmptyPath` for an
    /// empty path.
    pub fn set_path(&mut self, path: &str, value: Value) -> Result<(), RecordError> {
        let segments: Vec<&str> = path.split('.').collect();
        let Some((last, init)) = segments.split_last() else {
            return Err(RecordError::EmptyPath);
        };

        let mut current = &mut self.0;
        for segment in init {
            let entry = current
                .entry((*segment).to_string())
                .or_insert_with(|| Value::Map(BTreeMap::new()));
            match entry {
                Value::Map(map) => current = map,
                _ => {
                    return Err(RecordError::TypeConflict {
                        path: path.to_string(),
                        segment: (*segment).to_string(),
                    });
                }
            }
        }
        current.insert((*last).to_string(), value);
        Ok(())
    }

    /// Consumes the record into its canonical `Value::Map` form.
    #[must_use]
    pub fn into_value(self) -> Value {
        Value::Map(self.0)
    }

    /// Borrows the record as a `Value::Map` reference.
    #[must_use]
    pub fn as_value(&self) -> Value {
        Value::Map(self.0.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_path_creates_intermediate_maps() {
        let mut record = Record::new();
        record.set_path("a.b.c", Value::Int64(1)).expect("write");
        assert_eq!(record.get_path("a.b.c"), Some(&Value::Int64(1)));
    }

    #[test]
    fn set_path_through_scalar_is_type_conflict() {
        let mut record = Record::new();
        record.set_path("a", Value::Int64(1)).expect("write");
        let err = record.set_path("a.b", Value::Int64(2)).expect_err("conflict");
        assert!(matches!(err, RecordError::TypeConflict { .. }));
    }

    #[test]
    fn get_path_missing_segment_is_none() {
        let record = Record::new();
        assert_eq!(record.get_path("missing.field"), None);
    }
}
