// apex-expr/src/compile.rs
// ============================================================================
// Module: Constant Folding
// Description: A simple constant-folding pass performed once at compile
//              time, so conditions like `1 + 1 == 2` don't re-derive their
//              literal arithmetic on every evaluation (§4.1).
// Purpose: Cheap optimization pass over a parsed `Ast`.
// Dependencies: apex-core, crate::{ast, eval}
// ============================================================================

use apex_core::EvaluationContext;
use apex_core::Record;

use crate::ast::Ast;

/// Folds constant subtrees of `ast` into literal nodes in place.
///
/// Only `Not`, `Neg`, `Binary`, `Ternary`, and `Elvis` nodes whose operands
/// are themselves constant literals are folded; anything that touches
/// `#name`, `#this`, a root field, or a function call is left untouched —
/// function calls are never folded, since `now()`/`today()` are not
/// constant across compilations even though they take no arguments.
#[must_use]
pub fn fold_constants(ast: Ast) -> Ast {
    let folded = fold(ast);
    reconstitute(folded)
}

fn fold(ast: Ast) -> Ast {
    match ast {
        Ast::Not(inner) => {
            let inner = fold(*inner);
            Ast::Not(Box::new(inner))
        }
        Ast::Neg(inner) => {
            let inner = fold(*inner);
            Ast::Neg(Box::new(inner))
        }
        Ast::Binary { op, left, right } => {
            let left = fold(*left);
            let right = fold(*right);
            Ast::Binary { op, left: Box::new(left), right: Box::new(right) }
        }
        Ast::Ternary { cond, then_branch, else_branch } => {
            let cond = fold(*cond);
            let then_branch = fold(*then_branch);
            let else_branch = fold(*else_branch);
            Ast::Ternary { cond: Box::new(cond), then_branch: Box::new(then_branch), else_branch: Box::new(else_branch) }
        }
        Ast::Elvis { left, right } => {
            let left = fold(*left);
            let right = fold(*right);
            Ast::Elvis { left: Box::new(left), right: Box::new(right) }
        }
        Ast::Member { target, field, safe } => {
            Ast::Member { target: Box::new(fold(*target)), field, safe }
        }
        Ast::Index { target, index, safe } => {
            Ast::Index { target: Box::new(fold(*target)), index: Box::new(fold(*index)), safe }
        }
        other => other,
    }
}

/// Evaluates any now-all-constant `Not`/`Neg`/`Binary`/`Ternary`/`Elvis`
/// node into a literal, using a contextless evaluation (safe because a
/// node only reaches this branch once every child is itself a literal).
fn reconstitute(ast: Ast) -> Ast {
    let is_foldable_shape = matches!(
        ast,
        Ast::Not(_) | Ast::Neg(_) | Ast::Binary { .. } | Ast::Ternary { .. } | Ast::Elvis { .. }
    );
    if !is_foldable_shape || !all_children_constant(&ast) {
        return ast;
    }
    let empty_ctx = EvaluationContext::new(Record::new());
    match crate::eval::eval(&ast, &empty_ctx) {
        Ok(value) => value_to_ast(&value).unwrap_or(ast),
        Err(_) => ast,
    }
}

fn all_children_constant(ast: &Ast) -> bool {
    match ast {
        Ast::Not(inner) | Ast::Neg(inner) => inner.is_constant(),
        Ast::Binary { left, right, .. } => left.is_constant() && right.is_constant(),
        Ast::Ternary { cond, then_branch, else_branch } => {
            cond.is_constant() && then_branch.is_constant() && else_branch.is_constant()
        }
        Ast::Elvis { left, right } => left.is_constant() && right.is_constant(),
        _ => false,
    }
}

fn value_to_ast(value: &apex_core::Value) -> Option<Ast> {
    match value {
        apex_core::Value::Null => Some(Ast::Null),
        apex_core::Value::Bool(b) => Some(Ast::Bool(*b)),
        apex_core::Value::Int64(n) => Some(Ast::Int(*n)),
        apex_core::Value::Decimal(d) => Some(Ast::Decimal(d.clone())),
        apex_core::Value::String(s) => Some(Ast::Str(s.clone())),
        apex_core::Value::Date(d) => Some(Ast::Date(*d)),
        apex_core::Value::Time(t) => Some(Ast::Time(*t)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;

    #[test]
    fn folds_pure_literal_arithmetic() {
        let ast = fold_constants(parse("1 + 2 == 3").expect("parse"));
        assert_eq!(ast, Ast::Bool(true));
    }

    #[test]
    fn leaves_root_field_references_untouched() {
        let ast = parse("amount + 1").expect("parse");
        let folded = fold_constants(ast.clone());
        assert_eq!(folded, ast);
    }

    #[test]
    fn never_folds_function_calls() {
        let ast = parse("today()").expect("parse");
        let folded = fold_constants(ast.clone());
        assert_eq!(folded, ast);
    }
}
