// apex-expr/src/lib.rs
// ============================================================================
// Crate: apex-expr
// Description: The path/operator/collection expression language shared by
//              every condition, lookup key, field mapping, and template
//              across the engine (§4.1).
// ============================================================================

//! ## Overview
//! An [`Expression`] is parsed once and evaluated many times. Compilation
//! lexes, parses, and constant-folds the source text; evaluation walks the
//! resulting tree against an [`apex_core::EvaluationContext`].

#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used))]

mod ast;
mod compile;
mod error;
mod eval;
mod functions;
mod lexer;
mod parser;
mod template;

pub use ast::Ast;
pub use ast::BinaryOp;
pub use error::EvalError;
pub use template::render as render_template;

use apex_core::EvaluationContext;
use apex_core::Value;

/// A compiled, ready-to-evaluate expression.
///
/// Compilation is explicit and separate from evaluation: a rule group,
/// enrichment, or field mapping compiles its conditions once when its
/// owning configuration is loaded, then evaluates the compiled form once
/// per record.
#[derive(Debug, Clone, PartialEq)]
pub struct Expression {
    source: String,
    ast: Ast,
}

impl Expression {
    /// Lexes, parses, and constant-folds `source` into a reusable
    /// [`Expression`].
    ///
    /// # Errors
    /// Returns `EvalError::ParseError` if `source` is not a syntactically
    /// valid expression.
    pub fn compile(source: &str) -> Result<Self, EvalError> {
        let ast = parser::parse(source)?;
        let ast = compile::fold_constants(ast);
        Ok(Self { source: source.to_string(), ast })
    }

    /// The original expression text, as given to [`Expression::compile`].
    #[must_use]
    pub fn source(&self) -> &str {
        &self.source
    }

    /// The compiled tree, for callers that need to inspect its shape
    /// (e.g. the enrichment pipeline's dependency analysis).
    #[must_use]
    pub fn ast(&self) -> &Ast {
        &self.ast
    }

    /// Evaluates this expression against `ctx`.
    ///
    /// # Errors
    /// Returns any `EvalError` variant named in §4.1's failure-mode list.
    pub fn evaluate(&self, ctx: &EvaluationContext) -> Result<Value, EvalError> {
        eval::eval(&self.ast, ctx)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use apex_core::Record;

    use super::*;

    #[test]
    fn compiles_and_evaluates_a_condition() {
        let record = Record::from_map(BTreeMap::from([("amount".to_string(), Value::Int64(150))]));
        let ctx = EvaluationContext::new(record);
        let expr = Expression::compile("amount > 100").expect("compile");
        assert_eq!(expr.evaluate(&ctx).expect("evaluate"), Value::Bool(true));
    }

    #[test]
    fn rejects_invalid_syntax_at_compile_time() {
        assert!(Expression::compile("amount >").is_err());
    }
}
