// apex-lookup/src/mapping.rs
// ============================================================================
// Module: Field Mapping
// Description: Extracts a resolved record's field, applies an optional
//              transform and validation, and writes the result into the
//              context (§4.5 step 5).
// ============================================================================

use apex_core::EvaluationContext;
use apex_core::Record;
use apex_core::Value;
use apex_expr::Expression;

use crate::error::LookupError;

/// A validation rule applied to a field-mapping's resolved value before
/// it is written to the context.
#[derive(Debug, Clone, Default)]
pub struct Validation {
    /// The value must not be `null`.
    pub required: bool,
    /// The value (a `String`) must match this regular expression.
    pub pattern: Option<String>,
    /// The value must equal one of these.
    pub enum_values: Option<Vec<Value>>,
    /// The value must order between `min` and `max` inclusive, using
    /// `Value::compare`.
    pub range: Option<(Value, Value)>,
}

impl Validation {
    fn check(&self, field: &str, value: &Value) -> Result<(), LookupError> {
        if self.required && matches!(value, Value::Null) {
            return Err(LookupError::ValidationFailed {
                field: field.to_string(),
                message: "value is required but was null".to_string(),
            });
        }
        if matches!(value, Value::Null) {
            return Ok(());
        }
        if let Some(pattern) = &self.pattern {
            let Value::String(text) = value else {
                return Err(LookupError::ValidationFailed {
                    field: field.to_string(),
                    message: "pattern validation requires a string value".to_string(),
                });
            };
            let regex = regex::Regex::new(pattern).map_err(|err| LookupError::ValidationFailed {
                field: field.to_string(),
                message: format!("invalid pattern '{pattern}': {err}"),
            })?;
            if !regex.is_match(text) {
                return Err(LookupError::ValidationFailed {
                    field: field.to_string(),
                    message: format!("value '{text}' does not match pattern '{pattern}'"),
                });
            }
        }
        if let Some(enum_values) = &self.enum_values {
            if !enum_values.contains(value) {
                return Err(LookupError::ValidationFailed {
                    field: field.to_string(),
                    message: format!("value '{}' is not one of the declared enum values", value.render()),
                });
            }
        }
        if let Some((min, max)) = &self.range {
            let within = value.compare(min).is_some_and(|ord| ord != std::cmp::Ordering::Less)
                && value.compare(max).is_some_and(|ord| ord != std::cmp::Ordering::Greater);
            if !within {
                return Err(LookupError::ValidationFailed {
                    field: field.to_string(),
                    message: format!(
                        "value '{}' is outside the declared range [{}, {}]",
                        value.render(),
                        min.render(),
                        max.render()
                    ),
                });
            }
        }
        Ok(())
    }
}

/// One declared mapping from a resolved source record's field to a
/// context target field.
#[derive(Debug, Clone)]
pub struct FieldMapping {
    /// The dotted path read from the resolved source record.
    pub source_path: String,
    /// The dotted path written into the context.
    pub target_field: String,
    /// An optional transform applied to the source value, bound as
    /// `#{sourceFieldName}` where `sourceFieldName` is `source_path`'s
    /// last segment.
    pub transform: Option<Expression>,
    /// An optional validation applied to the mapped value before write.
    pub validation: Option<Validation>,
    /// Whether this mapping may overwrite a field already written in
    /// this context.
    pub allow_overwrite: bool,
}

impl FieldMapping {
    fn binding_name(&self) -> &str {
        self.source_path.rsplit('.').next().unwrap_or(&self.source_path)
    }

    /// Extracts, transforms, validates, and writes this mapping's value
    /// from `source` into `ctx`.
    ///
    /// # Errors
    /// Returns `LookupError::Evaluation` if the transform fails,
    /// `LookupError::ValidationFailed` if validation rejects the value,
    /// or a propagated `ContextWrite`/`TypeConflict` from the write itself.
    pub fn apply(&self, source: &Record, ctx: &mut EvaluationContext) -> Result<(), LookupError> {
        let extracted = source.get_path(&self.source_path).cloned().unwrap_or(Value::Null);

        let mapped = if let Some(transform) = &self.transform {
            ctx.set_variable(self.binding_name(), extracted);
            transform.evaluate(ctx)?
        } else {
            extracted
        };

        if let Some(validation) = &self.validation {
            validation.check(&self.target_field, &mapped)?;
        }

        ctx.write_field(&self.target_field, mapped, self.allow_overwrite)?;
        Ok(())
    }
}
