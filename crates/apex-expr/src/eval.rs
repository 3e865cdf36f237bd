// apex-expr/src/eval.rs
// ============================================================================
// Module: Evaluator
// Description: Walks a compiled `Ast` against an `EvaluationContext`,
//              producing a `Value` or a typed `EvalError`.
// Purpose: The single evaluation strategy every enrichment condition,
//          lookup key, field-mapping transform, and rule condition goes
//          through.
// Dependencies: apex-core, crate::{ast, error, functions}
// ============================================================================

use apex_core::EvaluationContext;
use apex_core::Value;
use apex_core::ValueKind;

use crate::ast::Ast;
use crate::ast::BinaryOp;
use crate::error::EvalError;
use crate::error::type_mismatch;
use crate::functions;

/// Evaluates `ast` against `ctx`. The top-level entry point; there is no
/// `#this` binding outside a collection operator.
///
/// # Errors
/// Returns any `EvalError` variant named in §4.1's failure-mode list.
pub fn eval(ast: &Ast, ctx: &EvaluationContext) -> Result<Value, EvalError> {
    eval_inner(ast, ctx, None)
}

fn eval_inner(ast: &Ast, ctx: &EvaluationContext, this: Option<&Value>) -> Result<Value, EvalError> {
    match ast {
        Ast::Null => Ok(Value::Null),
        Ast::Bool(b) => Ok(Value::Bool(*b)),
        Ast::Int(n) => Ok(Value::Int64(*n)),
        Ast::Decimal(d) => Ok(Value::Decimal(d.clone())),
        Ast::Str(s) => Ok(Value::String(s.clone())),
        Ast::Date(d) => Ok(Value::Date(*d)),
        Ast::Time(t) => Ok(Value::Time(*t)),
        Ast::Variable(name) => ctx
            .variable(name)
            .cloned()
            .ok_or_else(|| EvalError::UnknownVariable { name: name.clone() }),
        Ast::This => this
            .cloned()
            .ok_or_else(|| EvalError::PathNotFound { path: "#this".to_string() }),
        Ast::RootField(name) => resolve_root_field(name, ctx, this),
        Ast::Member { target, field, safe } => {
            let base = eval_inner(target, ctx, this)?;
            resolve_member(&base, field, *safe)
        }
        Ast::Index { target, index, safe } => {
            let base = eval_inner(target, ctx, this)?;
            if *safe && base.is_null() {
                return Ok(Value::Null);
            }
            let index_value = eval_inner(index, ctx, this)?;
            resolve_index(&base, &index_value, *safe)
        }
        Ast::Not(inner) => Ok(Value::Bool(!eval_inner(inner, ctx, this)?.is_truthy())),
        Ast::Neg(inner) => negate(eval_inner(inner, ctx, this)?),
        Ast::Binary { op, left, right } => eval_binary(*op, left, right, ctx, this),
        Ast::Ternary { cond, then_branch, else_branch } => {
            if eval_inner(cond, ctx, this)?.is_truthy() {
                eval_inner(then_branch, ctx, this)
            } else {
                eval_inner(else_branch, ctx, this)
            }
        }
        Ast::Elvis { left, right } => {
            let left_value = eval_inner(left, ctx, this)?;
            if left_value.is_truthy() {
                Ok(left_value)
            } else {
                eval_inner(right, ctx, this)
            }
        }
        Ast::InstanceOf { target, type_name } => {
            let value = eval_inner(target, ctx, this)?;
            let expected = ValueKind::from_name(type_name).ok_or_else(|| EvalError::TypeMismatch {
                message: format!("unknown type '{type_name}' in instanceof"),
            })?;
            Ok(Value::Bool(value.kind() == expected))
        }
        Ast::Call { name, args } => {
            let evaluated: Result<Vec<Value>, EvalError> =
                args.iter().map(|arg| eval_inner(arg, ctx, this)).collect();
            functions::call(name, &evaluated?, ctx.clock().as_ref())
        }
        Ast::MethodCall { target, name, args, safe } => {
            let target_value = eval_inner(target, ctx, this)?;
            if *safe && target_value.is_null() {
                return Ok(Value::Null);
            }
            let mut evaluated = Vec::with_capacity(args.len() + 1);
            evaluated.push(target_value);
            for arg in args {
                evaluated.push(eval_inner(arg, ctx, this)?);
            }
            functions::call(name, &evaluated, ctx.clock().as_ref())
        }
        Ast::Project { target, body } => {
            let items = eval_list(target, ctx, this)?;
            let mut result = Vec::with_capacity(items.len());
            for item in &items {
                result.push(eval_inner(body, ctx, Some(item))?);
            }
            Ok(Value::List(result))
        }
        Ast::Select { target, body } => {
            let items = eval_list(target, ctx, this)?;
            let mut result = Vec::new();
            for item in items {
                if eval_inner(body, ctx, Some(&item))?.is_truthy() {
                    result.push(item);
                }
            }
            Ok(Value::List(result))
        }
        Ast::First { target, body } => {
            let items = eval_list(target, ctx, this)?;
            for item in items {
                if eval_inner(body, ctx, Some(&item))?.is_truthy() {
                    return Ok(item);
                }
            }
            Ok(Value::Null)
        }
        Ast::Last { target, body } => {
            let items = eval_list(target, ctx, this)?;
            let mut found = Value::Null;
            for item in items {
                if eval_inner(body, ctx, Some(&item))?.is_truthy() {
                    found = item;
                }
            }
            Ok(found)
        }
    }
}

fn resolve_root_field(name: &str, ctx: &EvaluationContext, this: Option<&Value>) -> Result<Value, EvalError> {
    match this {
        Some(Value::Map(fields)) => fields
            .get(name)
            .cloned()
            .ok_or_else(|| EvalError::PathNotFound { path: name.to_string() }),
        Some(_) => Err(EvalError::PathNotFound { path: name.to_string() }),
        None => ctx
            .root()
            .get(name)
            .cloned()
            .ok_or_else(|| EvalError::PathNotFound { path: name.to_string() }),
    }
}

fn resolve_member(base: &Value, field: &str, safe: bool) -> Result<Value, EvalError> {
    if safe && base.is_null() {
        return Ok(Value::Null);
    }
    match base {
        Value::Map(fields) => match fields.get(field) {
            Some(value) => Ok(value.clone()),
            None if safe => Ok(Value::Null),
            None => Err(EvalError::PathNotFound { path: field.to_string() }),
        },
        _ => Err(type_mismatch("member access", base.kind(), ValueKind::Map)),
    }
}

fn resolve_index(base: &Value, index: &Value, safe: bool) -> Result<Value, EvalError> {
    match base {
        Value::List(items) => {
            let Value::Int64(raw_index) = index else {
                return Err(type_mismatch("index", index.kind(), ValueKind::Int64));
            };
            if *raw_index < 0 {
                return Err(EvalError::IndexOutOfBounds { index: *raw_index, length: items.len() });
            }
            #[allow(clippy::cast_sign_loss)]
            let position = *raw_index as usize;
            match items.get(position) {
                Some(value) => Ok(value.clone()),
                None if safe => Ok(Value::Null),
                None => Err(EvalError::IndexOutOfBounds { index: *raw_index, length: items.len() }),
            }
        }
        Value::Map(fields) => {
            let Value::String(key) = index else {
                return Err(type_mismatch("index", index.kind(), ValueKind::String));
            };
            match fields.get(key) {
                Some(value) => Ok(value.clone()),
                None if safe => Ok(Value::Null),
                None => Err(EvalError::PathNotFound { path: key.clone() }),
            }
        }
        _ => Err(type_mismatch("index", base.kind(), ValueKind::List)),
    }
}

fn eval_list(target: &Ast, ctx: &EvaluationContext, this: Option<&Value>) -> Result<Vec<Value>, EvalError> {
    match eval_inner(target, ctx, this)? {
        Value::List(items) => Ok(items),
        other => Err(type_mismatch("collection operator", other.kind(), ValueKind::List)),
    }
}

fn negate(value: Value) -> Result<Value, EvalError> {
    match value {
        Value::Int64(n) => Ok(Value::Int64(-n)),
        Value::Float64(n) => Ok(Value::Float64(-n)),
        Value::Decimal(d) => Ok(Value::Decimal(-d)),
        other => Err(type_mismatch("unary -", other.kind(), other.kind())),
    }
}

fn eval_binary(
    op: BinaryOp,
    left: &Ast,
    right: &Ast,
    ctx: &EvaluationContext,
    this: Option<&Value>,
) -> Result<Value, EvalError> {
    if op == BinaryOp::And {
        let left_value = eval_inner(left, ctx, this)?;
        if !left_value.is_truthy() {
            return Ok(Value::Bool(false));
        }
        return Ok(Value::Bool(eval_inner(right, ctx, this)?.is_truthy()));
    }
    if op == BinaryOp::Or {
        let left_value = eval_inner(left, ctx, this)?;
        if left_value.is_truthy() {
            return Ok(Value::Bool(true));
        }
        return Ok(Value::Bool(eval_inner(right, ctx, this)?.is_truthy()));
    }

    let left_value = eval_inner(left, ctx, this)?;
    let right_value = eval_inner(right, ctx, this)?;

    match op {
        BinaryOp::Add => Ok(left_value.add(&right_value)?),
        BinaryOp::Sub => Ok(left_value.sub(&right_value)?),
        BinaryOp::Mul => Ok(left_value.mul(&right_value)?),
        BinaryOp::Div => Ok(left_value.div(&right_value)?),
        BinaryOp::Mod => Ok(left_value.rem(&right_value)?),
        BinaryOp::Eq => values_equal(&left_value, &right_value).map(Value::Bool),
        BinaryOp::NotEq => values_equal(&left_value, &right_value).map(|eq| Value::Bool(!eq)),
        BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge => {
            let ordering = left_value.compare(&right_value).ok_or_else(|| {
                type_mismatch("comparison", left_value.kind(), right_value.kind())
            })?;
            let result = match op {
                BinaryOp::Lt => ordering.is_lt(),
                BinaryOp::Le => ordering.is_le(),
                BinaryOp::Gt => ordering.is_gt(),
                BinaryOp::Ge => ordering.is_ge(),
                _ => unreachable!("filtered to relational operators above"),
            };
            Ok(Value::Bool(result))
        }
        BinaryOp::And | BinaryOp::Or => unreachable!("handled by short-circuit branch above"),
    }
}

fn values_equal(a: &Value, b: &Value) -> Result<bool, EvalError> {
    let numeric = |v: &Value| matches!(v.kind(), ValueKind::Int64 | ValueKind::Float64 | ValueKind::Decimal);
    if numeric(a) && numeric(b) {
        Ok(a.numeric_eq(b)?)
    } else {
        Ok(a.structural_eq(b))
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;
    use std::sync::Arc;

    use apex_core::Clock;
    use apex_core::Record;
    use chrono::DateTime;
    use chrono::TimeZone;
    use chrono::Utc;

    use super::*;
    use crate::parser::parse;

    fn ctx_from(fields: Vec<(&str, Value)>) -> EvaluationContext {
        let map: BTreeMap<String, Value> = fields.into_iter().map(|(k, v)| (k.to_string(), v)).collect();
        EvaluationContext::new(Record::from_map(map))
    }

    struct FixedClock(DateTime<Utc>);

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            self.0
        }
    }

    #[test]
    fn now_is_deterministic_under_an_injected_clock() {
        let fixed = Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).single().expect("valid date");
        let ctx = EvaluationContext::with_clock(Record::new(), Arc::new(FixedClock(fixed)));
        let ast = parse("now()").expect("parse");

        assert_eq!(eval(&ast, &ctx).expect("eval"), Value::Timestamp(fixed, None));
        assert_eq!(eval(&ast, &ctx).expect("eval"), Value::Timestamp(fixed, None));
    }

    #[test]
    fn safe_navigation_never_raises_path_not_found() {
        let ctx = ctx_from(vec![]);
        let ast = parse("a?.b?.c").expect("parse");
        assert_eq!(eval(&ast, &ctx).expect("eval"), Value::Null);
    }

    #[test]
    fn dynamic_index_with_safe_navigation_scenario() {
        let leg_a = Value::Map(BTreeMap::from([("stbRuleName".to_string(), Value::String("RULE_A".into()))]));
        let trade = Value::Map(BTreeMap::from([
            ("selectedLegIndex".to_string(), Value::Int64(1)),
            (
                "otcTrade".to_string(),
                Value::Map(BTreeMap::from([(
                    "otcLeg".to_string(),
                    Value::List(vec![
                        leg_a,
                        Value::Map(BTreeMap::from([("stbRuleName".to_string(), Value::String("RULE_B".into()))])),
                    ]),
                )])),
            ),
        ]));
        let ctx = ctx_from(vec![("trade", trade)]);
        let ast = parse(
            "trade?.otcTrade?.otcLeg?.size() > trade.selectedLegIndex && trade.otcTrade.otcLeg[trade.selectedLegIndex]?.stbRuleName != null",
        )
        .expect("parse");
        assert_eq!(eval(&ast, &ctx).expect("eval"), Value::Bool(true));
    }

    #[test]
    fn index_out_of_range_selected_leg_is_false_not_error() {
        let trade = Value::Map(BTreeMap::from([
            ("selectedLegIndex".to_string(), Value::Int64(5)),
            (
                "otcTrade".to_string(),
                Value::Map(BTreeMap::from([(
                    "otcLeg".to_string(),
                    Value::List(vec![Value::Map(BTreeMap::new())]),
                )])),
            ),
        ]));
        let ctx = ctx_from(vec![("trade", trade)]);
        let ast = parse(
            "trade?.otcTrade?.otcLeg?.size() > trade.selectedLegIndex && trade.otcTrade.otcLeg[trade.selectedLegIndex]?.stbRuleName != null",
        )
        .expect("parse");
        assert_eq!(eval(&ast, &ctx).expect("eval"), Value::Bool(false));
    }

    #[test]
    fn projection_and_selection_use_this() {
        let ctx = ctx_from(vec![(
            "items",
            Value::List(vec![
                Value::Map(BTreeMap::from([
                    ("active".to_string(), Value::Bool(true)),
                    ("price".to_string(), Value::Int64(10)),
                ])),
                Value::Map(BTreeMap::from([
                    ("active".to_string(), Value::Bool(false)),
                    ("price".to_string(), Value::Int64(20)),
                ])),
            ]),
        )]);
        let ast = parse("items.?[active].![price]").expect("parse");
        assert_eq!(eval(&ast, &ctx).expect("eval"), Value::List(vec![Value::Int64(10)]));
    }
}
