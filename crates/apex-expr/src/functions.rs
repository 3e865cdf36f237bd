// apex-expr/src/functions.rs
// ============================================================================
// Module: Function Registry
// Description: The whitelisted, pure, total function table callable from
//              expressions (§4.1).
// Purpose: Replace SpEL's arbitrary method invocation with a closed,
//          name-to-function dispatch table (§9 redesign note).
// Dependencies: apex-core, chrono, regex, crate::error
// ============================================================================

use apex_core::Clock;
use apex_core::Value;
use chrono::NaiveDate;
use regex::Regex;

use crate::error::EvalError;

/// Dispatches a whitelisted function call by name. `now()`/`today()`
/// resolve through `clock` rather than the system clock directly, so a
/// program's evaluation stays a pure function of its inputs (§6.3, §8).
///
/// # Errors
/// Returns `EvalError::UnknownFunction` for any name not in this table,
/// `EvalError::ArityError` for a wrong argument count, and
/// `EvalError::FunctionError`/`EvalError::TypeMismatch` for argument values
/// the function cannot operate on.
pub fn call(name: &str, args: &[Value], clock: &dyn Clock) -> Result<Value, EvalError> {
    match name {
        "now" => {
            arity(name, args, 0)?;
            Ok(Value::Timestamp(clock.now(), None))
        }
        "today" => {
            arity(name, args, 0)?;
            Ok(Value::Date(clock.now().date_naive()))
        }
        "size" => {
            arity(name, args, 1)?;
            size(&args[0]).map(Value::Int64)
        }
        "contains" => {
            arity(name, args, 2)?;
            contains(&args[0], &args[1]).map(Value::Bool)
        }
        "startsWith" => {
            arity(name, args, 2)?;
            let (s, prefix) = (string_arg(name, &args[0])?, string_arg(name, &args[1])?);
            Ok(Value::Bool(s.starts_with(prefix)))
        }
        "endsWith" => {
            arity(name, args, 2)?;
            let (s, suffix) = (string_arg(name, &args[0])?, string_arg(name, &args[1])?);
            Ok(Value::Bool(s.ends_with(suffix)))
        }
        "matches" => {
            arity(name, args, 2)?;
            let (s, pattern) = (string_arg(name, &args[0])?, string_arg(name, &args[1])?);
            let regex = Regex::new(pattern)
                .map_err(|err| function_error(name, format!("invalid pattern: {err}")))?;
            Ok(Value::Bool(regex.is_match(s)))
        }
        "toUpper" => {
            arity(name, args, 1)?;
            Ok(Value::String(string_arg(name, &args[0])?.to_uppercase()))
        }
        "toLower" => {
            arity(name, args, 1)?;
            Ok(Value::String(string_arg(name, &args[0])?.to_lowercase()))
        }
        "trim" => {
            arity(name, args, 1)?;
            Ok(Value::String(string_arg(name, &args[0])?.trim().to_string()))
        }
        "format" => {
            arity(name, args, 2)?;
            format_number(&args[0], string_arg(name, &args[1])?)
        }
        "parseDate" => {
            arity(name, args, 2)?;
            let (s, pattern) = (string_arg(name, &args[0])?, string_arg(name, &args[1])?);
            let date = NaiveDate::parse_from_str(s, pattern)
                .map_err(|err| function_error(name, format!("'{s}' does not match '{pattern}': {err}")))?;
            Ok(Value::Date(date))
        }
        "if" => {
            arity(name, args, 3)?;
            Ok(if args[0].is_truthy() { args[1].clone() } else { args[2].clone() })
        }
        "coalesce" => {
            if args.is_empty() {
                return Err(EvalError::ArityError { name: name.to_string(), expected: 1, got: 0 });
            }
            Ok(args.iter().find(|v| !v.is_null()).cloned().unwrap_or(Value::Null))
        }
        "sum" => {
            arity(name, args, 1)?;
            numeric_fold(name, &args[0], 0.0, |acc, x| acc + x).map(Value::Float64)
        }
        "avg" => {
            arity(name, args, 1)?;
            let items = list_arg(name, &args[0])?;
            if items.is_empty() {
                return Ok(Value::Null);
            }
            let total = numeric_fold(name, &args[0], 0.0, |acc, x| acc + x)?;
            #[allow(clippy::cast_precision_loss)]
            Ok(Value::Float64(total / items.len() as f64))
        }
        "min" => numeric_extreme(name, args, f64::min),
        "max" => numeric_extreme(name, args, f64::max),
        "count" => {
            arity(name, args, 1)?;
            Ok(Value::Int64(list_arg(name, &args[0])?.len() as i64))
        }
        other => Err(EvalError::UnknownFunction { name: other.to_string() }),
    }
}

fn arity(name: &str, args: &[Value], expected: usize) -> Result<(), EvalError> {
    if args.len() == expected {
        Ok(())
    } else {
        Err(EvalError::ArityError { name: name.to_string(), expected, got: args.len() })
    }
}

fn function_error(name: &str, message: String) -> EvalError {
    EvalError::FunctionError { name: name.to_string(), message }
}

fn string_arg<'a>(name: &str, value: &'a Value) -> Result<&'a str, EvalError> {
    match value {
        Value::String(s) => Ok(s.as_str()),
        other => Err(EvalError::TypeMismatch {
            message: format!("'{name}' expects a String argument, got {}", other.kind()),
        }),
    }
}

fn list_arg<'a>(name: &str, value: &'a Value) -> Result<&'a [Value], EvalError> {
    match value {
        Value::List(items) => Ok(items),
        other => Err(EvalError::TypeMismatch {
            message: format!("'{name}' expects a List argument, got {}", other.kind()),
        }),
    }
}

fn size(value: &Value) -> Result<i64, EvalError> {
    let len = match value {
        Value::List(items) => items.len(),
        Value::Map(fields) => fields.len(),
        Value::String(s) => s.chars().count(),
        other => {
            return Err(EvalError::TypeMismatch {
                message: format!("'size' expects a List, Map, or String, got {}", other.kind()),
            });
        }
    };
    Ok(len as i64)
}

fn contains(collection: &Value, needle: &Value) -> Result<bool, EvalError> {
    match collection {
        Value::List(items) => Ok(items.iter().any(|item| item.structural_eq(needle))),
        Value::String(haystack) => match needle {
            Value::String(n) => Ok(haystack.contains(n.as_str())),
            other => Err(EvalError::TypeMismatch {
                message: format!("'contains' on a String expects a String needle, got {}", other.kind()),
            }),
        },
        other => Err(EvalError::TypeMismatch {
            message: format!("'contains' expects a List or String, got {}", other.kind()),
        }),
    }
}

fn as_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Int64(n) => Some(*n as f64),
        Value::Float64(n) => Some(*n),
        Value::Decimal(d) => format!("{d}").parse().ok(),
        _ => None,
    }
}

fn numeric_fold(
    name: &str,
    value: &Value,
    init: f64,
    combine: impl Fn(f64, f64) -> f64,
) -> Result<f64, EvalError> {
    let items = list_arg(name, value)?;
    let mut acc = init;
    for item in items {
        let n = as_f64(item).ok_or_else(|| EvalError::TypeMismatch {
            message: format!("'{name}' expects a list of numbers, found {}", item.kind()),
        })?;
        acc = combine(acc, n);
    }
    Ok(acc)
}

fn numeric_extreme(name: &str, args: &[Value], pick: impl Fn(f64, f64) -> f64) -> Result<Value, EvalError> {
    arity(name, args, 1)?;
    let items = list_arg(name, &args[0])?;
    if items.is_empty() {
        return Ok(Value::Null);
    }
    let mut numbers = Vec::with_capacity(items.len());
    for item in items {
        numbers.push(as_f64(item).ok_or_else(|| EvalError::TypeMismatch {
            message: format!("'{name}' expects a list of numbers, found {}", item.kind()),
        })?);
    }
    let mut result = numbers[0];
    for n in &numbers[1..] {
        result = pick(result, *n);
    }
    Ok(Value::Float64(result))
}

fn format_number(value: &Value, pattern: &str) -> Result<Value, EvalError> {
    let precision = pattern.split('.').nth(1).map_or(0, str::len);
    let rendered = match value {
        Value::Int64(n) => format!("{n:.precision$}"),
        Value::Float64(n) => format!("{n:.precision$}"),
        Value::Decimal(d) => d.with_scale_round(precision as i64, bigdecimal::RoundingMode::HalfEven).to_string(),
        other => {
            return Err(EvalError::TypeMismatch {
                message: format!("'format' expects a numeric value, got {}", other.kind()),
            });
        }
    };
    Ok(Value::String(rendered))
}

#[cfg(test)]
mod tests {
    use apex_core::SystemClock;
    use chrono::DateTime;
    use chrono::TimeZone;
    use chrono::Utc;

    use super::*;

    struct FixedClock(DateTime<Utc>);

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            self.0
        }
    }

    #[test]
    fn size_counts_list_elements() {
        let list = Value::List(vec![Value::Int64(1), Value::Int64(2)]);
        assert_eq!(call("size", &[list], &SystemClock).expect("call"), Value::Int64(2));
    }

    #[test]
    fn coalesce_returns_first_non_null() {
        let args = vec![Value::Null, Value::Null, Value::Int64(7)];
        assert_eq!(call("coalesce", &args, &SystemClock).expect("call"), Value::Int64(7));
    }

    #[test]
    fn unknown_function_is_rejected() {
        assert!(matches!(call("doesNotExist", &[], &SystemClock), Err(EvalError::UnknownFunction { .. })));
    }

    #[test]
    fn wrong_arity_is_rejected() {
        assert!(matches!(call("size", &[], &SystemClock), Err(EvalError::ArityError { .. })));
    }

    #[test]
    fn matches_applies_regex() {
        let args = vec![Value::String("RULE_A".into()), Value::String("^RULE_.$".into())];
        assert_eq!(call("matches", &args, &SystemClock).expect("call"), Value::Bool(true));
    }

    #[test]
    fn now_resolves_through_the_injected_clock_not_the_system_clock() {
        let fixed = Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).single().expect("valid date");
        let clock = FixedClock(fixed);
        assert_eq!(call("now", &[], &clock).expect("call"), Value::Timestamp(fixed, None));
        assert_eq!(call("today", &[], &clock).expect("call"), Value::Date(fixed.date_naive()));
    }
}
