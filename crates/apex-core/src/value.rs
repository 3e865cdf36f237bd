// apex-core/src/value.rs
// ============================================================================
// Module: Value
// Description: Typed Value union at the heart of every APEX record and
//              evaluation context.
// Purpose: Give the expression evaluator and enrichment pipeline a closed,
//          serializable set of runtime types instead of reflection over
//          host-language objects.
// Dependencies: bigdecimal, chrono, serde
// ============================================================================

//! ## Overview
//! `Value` is a tagged union over the scalar and collection types APEX
//! expressions can produce: `Null`, `Bool`, `Int64`, `Float64`,
//! `Decimal`, `String`, `Timestamp`, `Date`, `Time`, `Duration`, `Bytes`,
//! `List`, and `Map`. Equality is structural per variant; ordering and
//! arithmetic are defined only where the data model spec requires them.
//! Mixed-type arithmetic/comparison across `Decimal` and `Float64` is
//! rejected rather than silently coerced, matching the numeric-mixing rules.

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;

use bigdecimal::BigDecimal;
use bigdecimal::FromPrimitive;
use bigdecimal::RoundingMode;
use chrono::DateTime;
use chrono::NaiveDate;
use chrono::NaiveTime;
use chrono::Utc;
use num_traits::Zero;
use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

/// Default rounding scale applied to decimal multiplication and division
/// results when the caller does not request a specific scale.
pub const DEFAULT_DECIMAL_SCALE: i64 = 10;

/// A duration of wall-clock time, stored as whole seconds plus a
/// sub-second nanosecond remainder so it round-trips through YAML/JSON
/// without floating-point drift.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ValueDuration {
    /// Whole seconds component. May be negative.
    pub seconds: i64,
    /// Sub-second nanosecond component, `0..1_000_000_000`.
    pub nanos: u32,
}

impl ValueDuration {
    /// Builds a duration from whole seconds.
    #[must_use]
    pub const fn from_seconds(seconds: i64) -> Self {
        Self { seconds, nanos: 0 }
    }
}

impl fmt::Display for ValueDuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.nanos == 0 {
            write!(f, "{}s", self.seconds)
        } else {
            write!(f, "{}.{:09}s", self.seconds, self.nanos)
        }
    }
}

/// The closed set of runtime value kinds, used by `instanceof` and by
/// diagnostics that need to name a type without holding an instance of it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueKind {
    /// Absence of a value.
    Null,
    /// Boolean.
    Bool,
    /// Signed 64-bit integer.
    Int64,
    /// IEEE-754 double.
    Float64,
    /// Arbitrary-precision decimal with tracked scale.
    Decimal,
    /// UTF-8 text.
    String,
    /// Timestamp with an optional source timezone label.
    Timestamp,
    /// Calendar date without a time component.
    Date,
    /// Time of day without a date component.
    Time,
    /// Elapsed-time duration.
    Duration,
    /// Raw bytes.
    Bytes,
    /// Ordered list of values.
    List,
    /// String-keyed map of values.
    Map,
}

impl ValueKind {
    /// Parses the named type used in `instanceof T(...)` expressions.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "Null" => Self::Null,
            "Bool" | "Boolean" => Self::Bool,
            "Int64" | "Integer" | "Int" => Self::Int64,
            "Float64" | "Float" | "Double" => Self::Float64,
            "Decimal" | "BigDecimal" => Self::Decimal,
            "String" => Self::String,
            "Timestamp" | "DateTime" => Self::Timestamp,
            "Date" => Self::Date,
            "Time" => Self::Time,
            "Duration" => Self::Duration,
            "Bytes" => Self::Bytes,
            "List" | "Array" => Self::List,
            "Map" | "Object" => Self::Map,
            _ => return None,
        })
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Null => "Null",
            Self::Bool => "Bool",
            Self::Int64 => "Int64",
            Self::Float64 => "Float64",
            Self::Decimal => "Decimal",
            Self::String => "String",
            Self::Timestamp => "Timestamp",
            Self::Date => "Date",
            Self::Time => "Time",
            Self::Duration => "Duration",
            Self::Bytes => "Bytes",
            Self::List => "List",
            Self::Map => "Map",
        };
        f.write_str(name)
    }
}

/// The runtime value type shared by records, evaluation contexts, and the
/// expression evaluator.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    /// Absence of a value.
    Null,
    /// Boolean.
    Bool(bool),
    /// Signed 64-bit integer.
    Int64(i64),
    /// IEEE-754 double.
    Float64(f64),
    /// Arbitrary-precision decimal; scale is whatever `BigDecimal` tracks.
    Decimal(BigDecimal),
    /// UTF-8 text.
    String(String),
    /// Instant in time plus the timezone label it was parsed under, if any.
    Timestamp(DateTime<Utc>, Option<String>),
    /// Calendar date.
    Date(NaiveDate),
    /// Time of day.
    Time(NaiveTime),
    /// Elapsed-time duration.
    Duration(ValueDuration),
    /// Raw bytes.
    Bytes(Vec<u8>),
    /// Ordered list of values.
    List(Vec<Value>),
    /// String-keyed map of values. Iteration order is insertion-irrelevant,
    /// so a `BTreeMap` is used to give deterministic, sorted iteration.
    Map(BTreeMap<String, Value>),
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        self.structural_eq(other)
    }
}

/// Errors raised by `Value`'s own arithmetic and comparison operations.
/// The expression evaluator wraps these into its own `EvalError` taxonomy.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValueError {
    /// The operands' types cannot be combined by the requested operation.
    #[error("type mismatch: cannot apply {op} to {left} and {right}")]
    TypeMismatch {
        /// Operator or function name that was attempted.
        op: &'static str,
        /// Left operand's type.
        left: ValueKind,
        /// Right operand's type.
        right: ValueKind,
    },
    /// Integer or decimal division/modulo by zero.
    #[error("division by zero")]
    DivisionByZero,
}

impl Value {
    /// Returns this value's `ValueKind`.
    #[must_use]
    pub fn kind(&self) -> ValueKind {
        match self {
            Self::Null => ValueKind::Null,
            Self::Bool(_) => ValueKind::Bool,
            Self::Int64(_) => ValueKind::Int64,
            Self::Float64(_) => ValueKind::Float64,
            Self::Decimal(_) => ValueKind::Decimal,
            Self::String(_) => ValueKind::String,
            Self::Timestamp(..) => ValueKind::Timestamp,
            Self::Date(_) => ValueKind::Date,
            Self::Time(_) => ValueKind::Time,
            Self::Duration(_) => ValueKind::Duration,
            Self::Bytes(_) => ValueKind::Bytes,
            Self::List(_) => ValueKind::List,
            Self::Map(_) => ValueKind::Map,
        }
    }

    /// `true` if this value is `Null`.
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Rule-engine truthiness: null is false, booleans are themselves,
    /// numbers are non-zero, strings/collections are non-empty, anything
    /// else non-null is true.
    #[must_use]
    pub fn is_truthy(&self) -> bool {
        match self {
            Self::Null => false,
            Self::Bool(b) => *b,
            Self::Int64(n) => *n != 0,
            Self::Float64(n) => *n != 0.0,
            Self::Decimal(d) => !d.is_zero(),
            Self::String(s) => !s.is_empty(),
            Self::List(items) => !items.is_empty(),
            Self::Map(entries) => !entries.is_empty(),
            Self::Timestamp(..) | Self::Date(_) | Self::Time(_) | Self::Duration(_) | Self::Bytes(_) => true,
        }
    }

    /// Renders the canonical text form used by template interpolation:
    /// decimals preserve trailing zeros by scale, dates/times use ISO-8601,
    /// and null renders as the empty string.
    #[must_use]
    pub fn render(&self) -> String {
        match self {
            Self::Null => String::new(),
            Self::Bool(b) => b.to_string(),
            Self::Int64(n) => n.to_string(),
            Self::Float64(n) => n.to_string(),
            Self::Decimal(d) => d.to_string(),
            Self::String(s) => s.clone(),
            Self::Timestamp(instant, _) => instant.to_rfc3339(),
            Self::Date(date) => date.format("%Y-%m-%d").to_string(),
            Self::Time(time) => time.format("%H:%M:%S%.f").to_string(),
            Self::Duration(d) => d.to_string(),
            Self::Bytes(bytes) => format!("0x{}", hex_encode(bytes)),
            Self::List(items) => {
                let rendered: Vec<String> = items.iter().map(Value::render).collect();
                format!("[{}]", rendered.join(", "))
            }
            Self::Map(entries) => {
                let rendered: Vec<String> = entries
                    .iter()
                    .map(|(k, v)| format!("{k}: {}", v.render()))
                    .collect();
                format!("{{{}}}", rendered.join(", "))
            }
        }
    }

    /// Structural equality across matching variants only; `Int64(1)` and
    /// `Float64(1.0)` are NOT raw-equal here (the expression evaluator's
    /// `==` operator applies mathematical-value equality separately, see
    /// `numeric_eq`).
    #[must_use]
    pub fn structural_eq(&self, other: &Value) -> bool {
        match (self, other) {
            (Self::Null, Self::Null) => true,
            (Self::Bool(a), Self::Bool(b)) => a == b,
            (Self::Int64(a), Self::Int64(b)) => a == b,
            (Self::Float64(a), Self::Float64(b)) => a == b,
            (Self::Decimal(a), Self::Decimal(b)) => a == b,
            (Self::String(a), Self::String(b)) => a == b,
            (Self::Timestamp(a, _), Self::Timestamp(b, _)) => a == b,
            (Self::Date(a), Self::Date(b)) => a == b,
            (Self::Time(a), Self::Time(b)) => a == b,
            (Self::Duration(a), Self::Duration(b)) => a == b,
            (Self::Bytes(a), Self::Bytes(b)) => a == b,
            (Self::List(a), Self::List(b)) => {
                a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.structural_eq(y))
            }
            (Self::Map(a), Self::Map(b)) => {
                a.len() == b.len()
                    && a.iter()
                        .all(|(k, v)| b.get(k).is_some_and(|other_v| v.structural_eq(other_v)))
            }
            _ => false,
        }
    }

    /// Mathematical-value equality across numeric kinds: `Int64(1)`,
    /// `Float64(1.0)`. Mixing `Decimal` with `Float64` is a `TypeMismatch`,
    /// per the numeric-mixing rule.
    ///
    /// # Errors
    /// Returns `ValueError::TypeMismatch` when comparing a `Decimal`
    /// against a `Float64`, or comparing non-numeric, non-structurally-equal
    /// kinds.
    pub fn numeric_eq(&self, other: &Value) -> Result<bool, ValueError> {
        use Value::{Decimal, Float64, Int64};
        match (self, other) {
            (Int64(a), Int64(b)) => Ok(a == b),
            (Float64(a), Float64(b)) => Ok(a == b),
            (Int64(a), Float64(b)) | (Float64(b), Int64(a)) => {
                Ok((*a as f64 - *b).abs() < f64::EPSILON)
            }
            (Decimal(a), Decimal(b)) => Ok(a == b),
            (Decimal(a), Int64(b)) | (Int64(b), Decimal(a)) => {
                Ok(BigDecimal::from_i64(*b).is_some_and(|b| &b == a))
            }
            (Decimal(_), Float64(_)) | (Float64(_), Decimal(_)) => Err(ValueError::TypeMismatch {
                op: "==",
                left: self.kind(),
                right: other.kind(),
            }),
            _ => Ok(self.structural_eq(other)),
        }
    }

    /// Orders two values of comparable kinds. Returns `None` when the kinds
    /// are not mutually orderable (maps, mixed types other than the
    /// int/float numeric tower, and `Decimal`/`Float64` mixing).
    #[must_use]
    pub fn compare(&self, other: &Value) -> Option<Ordering> {
        use Value::{Date, Decimal, Float64, Int64, String as VString, Time, Timestamp};
        match (self, other) {
            (Int64(a), Int64(b)) => a.partial_cmp(b),
            (Float64(a), Float64(b)) => a.partial_cmp(b),
            (Int64(a), Float64(b)) => (*a as f64).partial_cmp(b),
            (Float64(a), Int64(b)) => a.partial_cmp(&(*b as f64)),
            (Decimal(a), Decimal(b)) => a.partial_cmp(b),
            (Decimal(a), Int64(b)) => BigDecimal::from_i64(*b).and_then(|b| a.partial_cmp(&b)),
            (Int64(a), Decimal(b)) => BigDecimal::from_i64(*a).and_then(|a| a.partial_cmp(b)),
            (VString(a), VString(b)) => Some(a.cmp(b)),
            (Timestamp(a, _), Timestamp(b, _)) => Some(a.cmp(b)),
            (Date(a), Date(b)) => Some(a.cmp(b)),
            (Time(a), Time(b)) => Some(a.cmp(b)),
            _ => None,
        }
    }

    /// Addition; decimals preserve scale, int/float mixing promotes to
    /// float, decimal/float mixing is rejected.
    ///
    /// # Errors
    /// Returns `ValueError::TypeMismatch` for non-numeric or decimal/float
    /// operand pairs.
    pub fn add(&self, other: &Value) -> Result<Value, ValueError> {
        numeric_op(self, other, "+", |a, b| a + b, |a, b| a + b, |a, b| a + b)
    }

    /// Subtraction; see [`Value::add`] for numeric-mixing rules.
    ///
    /// # Errors
    /// Returns `ValueError::TypeMismatch` for non-numeric or decimal/float
    /// operand pairs.
    pub fn sub(&self, other: &Value) -> Result<Value, ValueError> {
        numeric_op(self, other, "-", |a, b| a - b, |a, b| a - b, |a, b| a - b)
    }

    /// Multiplication; decimal results are rounded to
    /// [`DEFAULT_DECIMAL_SCALE`] using banker's rounding (round-half-to-even).
    ///
    /// # Errors
    /// Returns `ValueError::TypeMismatch` for non-numeric or decimal/float
    /// operand pairs.
    pub fn mul(&self, other: &Value) -> Result<Value, ValueError> {
        let result = numeric_op(self, other, "*", |a, b| a * b, |a, b| a * b, |a, b| a * b)?;
        Ok(round_decimal_result(result))
    }

    /// Division; integer and decimal division by zero is an error, float
    /// division by zero follows IEEE-754 (`NaN`/`Inf`). Decimal results are
    /// rounded to [`DEFAULT_DECIMAL_SCALE`] using banker's rounding.
    ///
    /// # Errors
    /// Returns `ValueError::DivisionByZero` for integer/decimal division by
    /// a zero operand, or `ValueError::TypeMismatch` for non-numeric or
    /// decimal/float operand pairs.
    pub fn div(&self, other: &Value) -> Result<Value, ValueError> {
        use Value::{Decimal, Int64};
        if let Int64(b) = other {
            if *b == 0 {
                return Err(ValueError::DivisionByZero);
            }
        }
        if let Decimal(b) = other {
            if b.is_zero() {
                return Err(ValueError::DivisionByZero);
            }
        }
        let result = numeric_op(
            self,
            other,
            "/",
            |a, b| if b == 0 { 0 } else { a / b },
            |a, b| a / b,
            |a, b| a / b,
        )?;
        Ok(round_decimal_result(result))
    }

    /// Remainder; integer/decimal modulo by zero is an error.
    ///
    /// # Errors
    /// Returns `ValueError::DivisionByZero` for integer/decimal modulo by a
    /// zero operand, or `ValueError::TypeMismatch` for non-numeric or
    /// decimal/float operand pairs.
    pub fn rem(&self, other: &Value) -> Result<Value, ValueError> {
        use Value::{Decimal, Int64};
        if let Int64(b) = other {
            if *b == 0 {
                return Err(ValueError::DivisionByZero);
            }
        }
        if let Decimal(b) = other {
            if b.is_zero() {
                return Err(ValueError::DivisionByZero);
            }
        }
        numeric_op(self, other, "%", |a, b| a % b, |a, b| a % b, |a, b| a % b)
    }
}

fn round_decimal_result(value: Value) -> Value {
    match value {
        Value::Decimal(d) => Value::Decimal(d.with_scale_round(DEFAULT_DECIMAL_SCALE, RoundingMode::HalfEven)),
        other => other,
    }
}

fn numeric_op(
    left: &Value,
    right: &Value,
    op: &'static str,
    int_op: impl Fn(i64, i64) -> i64,
    float_op: impl Fn(f64, f64) -> f64,
    decimal_op: impl Fn(&BigDecimal, &BigDecimal) -> BigDecimal,
) -> Result<Value, ValueError> {
    use Value::{Decimal, Float64, Int64};
    match (left, right) {
        (Int64(a), Int64(b)) => Ok(Int64(int_op(*a, *b))),
        (Float64(a), Float64(b)) => Ok(Float64(float_op(*a, *b))),
        (Int64(a), Float64(b)) => Ok(Float64(float_op(*a as f64, *b))),
        (Float64(a), Int64(b)) => Ok(Float64(float_op(*a, *b as f64))),
        (Decimal(a), Decimal(b)) => Ok(Decimal(decimal_op(a, b))),
        (Decimal(a), Int64(b)) => {
            let b = BigDecimal::from_i64(*b).ok_or(ValueError::TypeMismatch {
                op,
                left: left.kind(),
                right: right.kind(),
            })?;
            Ok(Decimal(decimal_op(a, &b)))
        }
        (Int64(a), Decimal(b)) => {
            let a = BigDecimal::from_i64(*a).ok_or(ValueError::TypeMismatch {
                op,
                left: left.kind(),
                right: right.kind(),
            })?;
            Ok(Decimal(decimal_op(&a, b)))
        }
        _ => Err(ValueError::TypeMismatch {
            op,
            left: left.kind(),
            right: right.kind(),
        }),
    }
}

fn hex_encode(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() * 2);
    for byte in bytes {
        out.push_str(&format!("{byte:02x}"));
    }
    out
}

/// Converts a `Value` into a canonical `serde_json::Value` tree, used by
/// the config-fingerprint hasher and by drivers that hand back raw JSON.
impl From<&Value> for serde_json::Value {
    fn from(value: &Value) -> Self {
        match value {
            Value::Null => serde_json::Value::Null,
            Value::Bool(b) => serde_json::Value::Bool(*b),
            Value::Int64(n) => serde_json::Value::Number((*n).into()),
            Value::Float64(n) => serde_json::Number::from_f64(*n)
                .map_or(serde_json::Value::Null, serde_json::Value::Number),
            Value::Decimal(d) => serde_json::Value::String(d.to_string()),
            Value::String(s) => serde_json::Value::String(s.clone()),
            Value::Timestamp(instant, _) => serde_json::Value::String(instant.to_rfc3339()),
            Value::Date(date) => serde_json::Value::String(date.format("%Y-%m-%d").to_string()),
            Value::Time(time) => serde_json::Value::String(time.format("%H:%M:%S%.f").to_string()),
            Value::Duration(d) => serde_json::Value::String(d.to_string()),
            Value::Bytes(bytes) => serde_json::Value::String(hex_encode(bytes)),
            Value::List(items) => serde_json::Value::Array(items.iter().map(Into::into).collect()),
            Value::Map(entries) => serde_json::Value::Object(
                entries.iter().map(|(k, v)| (k.clone(), v.into())).collect(),
            ),
        }
    }
}

/// Converts a loosely typed `serde_json::Value` (as produced by YAML/JSON
/// drivers) into the canonical `Value` union. Numbers that fit `i64`
/// become `Int64`; all other numbers become `Float64`.
impl From<&serde_json::Value> for Value {
    fn from(value: &serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(*b),
            serde_json::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Value::Int64(i)
                } else {
                    Value::Float64(n.as_f64().unwrap_or(f64::NAN))
                }
            }
            serde_json::Value::String(s) => Value::String(s.clone()),
            serde_json::Value::Array(items) => Value::List(items.iter().map(Value::from).collect()),
            serde_json::Value::Object(entries) => {
                Value::Map(entries.iter().map(|(k, v)| (k.clone(), Value::from(v))).collect())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decimal_multiplication_rounds_half_even() {
        let a = Value::Decimal(BigDecimal::from_i64(5).expect("bigdecimal"));
        let b = Value::Decimal(BigDecimal::from_f64(0.1).expect("bigdecimal"));
        let result = a.mul(&b).expect("multiply");
        match result {
            Value::Decimal(d) => assert_eq!(d.to_string(), "0.5000000000"),
            other => panic!("expected decimal, got {other:?}"),
        }
    }

    #[test]
    fn decimal_and_float_mixing_is_type_mismatch() {
        let a = Value::Decimal(BigDecimal::from_i64(1).expect("bigdecimal"));
        let b = Value::Float64(1.0);
        assert!(matches!(a.add(&b), Err(ValueError::TypeMismatch { .. })));
    }

    #[test]
    fn integer_division_by_zero_errors() {
        let a = Value::Int64(10);
        let b = Value::Int64(0);
        assert_eq!(a.div(&b), Err(ValueError::DivisionByZero));
    }

    #[test]
    fn float_division_by_zero_yields_infinity() {
        let a = Value::Float64(1.0);
        let b = Value::Float64(0.0);
        let result = a.div(&b).expect("divide");
        assert!(matches!(result, Value::Float64(f) if f.is_infinite()));
    }

    #[test]
    fn truthiness_matches_rule_engine_spec() {
        assert!(!Value::Null.is_truthy());
        assert!(!Value::Int64(0).is_truthy());
        assert!(Value::Int64(-1).is_truthy());
        assert!(!Value::String(String::new()).is_truthy());
        assert!(Value::String("x".into()).is_truthy());
        assert!(!Value::List(vec![]).is_truthy());
    }

    #[test]
    fn render_preserves_decimal_scale_and_empty_null() {
        let d = Value::Decimal(BigDecimal::from_i64(5).expect("bigdecimal").with_scale(2));
        assert_eq!(d.render(), "5.00");
        assert_eq!(Value::Null.render(), "");
    }

    #[test]
    fn numeric_eq_crosses_int_and_float() {
        assert!(Value::Int64(2).numeric_eq(&Value::Float64(2.0)).expect("ok"));
    }
}
