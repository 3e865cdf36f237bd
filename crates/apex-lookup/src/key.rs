// apex-lookup/src/key.rs
// ============================================================================
// Module: Lookup Key
// Description: Scalar or composite key construction for a lookup
//              enrichment (§4.5 step 2: "If the declaration specifies a
//              composite key, evaluate each component and join with the
//              declared separator").
// ============================================================================

use apex_core::EvaluationContext;
use apex_core::Value;
use apex_expr::Expression;

use crate::error::LookupError;

/// How a lookup's resolve key is constructed from the current context.
#[derive(Debug, Clone)]
pub enum LookupKey {
    /// A single expression whose value is used as the key directly.
    Single(Expression),
    /// Several expressions, evaluated in declared order and joined with
    /// `separator` into one string key.
    Composite {
        /// The component expressions, in join order.
        components: Vec<Expression>,
        /// The string inserted between adjacent components.
        separator: String,
        /// Whether a `null` component is tolerated (rendered as an empty
        /// segment) rather than rejected with `LookupError::NullKeyComponent`.
        allow_null_components: bool,
    },
}

/// The result of evaluating a `LookupKey`: `None` means the key itself
/// evaluated to `null` and the enrichment should be skipped (§4.5 step 2).
pub type KeyOutcome = Option<Value>;

impl LookupKey {
    /// Evaluates this key against `ctx`.
    ///
    /// # Errors
    /// Returns `LookupError::Evaluation` if any component fails to
    /// evaluate, or `LookupError::NullKeyComponent` if a composite
    /// component is `null` and nulls are not allowed.
    pub fn evaluate(&self, ctx: &EvaluationContext) -> Result<KeyOutcome, LookupError> {
        match self {
            Self::Single(expr) => {
                let value = expr.evaluate(ctx)?;
                Ok(if matches!(value, Value::Null) { None } else { Some(value) })
            }
            Self::Composite { components, separator, allow_null_components } => {
                let mut segments = Vec::with_capacity(components.len());
                for component in components {
                    let value = component.evaluate(ctx)?;
                    if matches!(value, Value::Null) {
                        if *allow_null_components {
                            segments.push(String::new());
                            continue;
                        }
                        return Err(LookupError::NullKeyComponent {
                            component: component.source().to_string(),
                        });
                    }
                    segments.push(value.render());
                }
                Ok(Some(Value::String(segments.join(separator))))
            }
        }
    }
}
