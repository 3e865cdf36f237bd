// apex-expr/src/template.rs
// ============================================================================
// Module: Templates
// Description: Renders `{{expr}}` interpolation inside rule/enrichment
//              message strings (§4.1, §8).
// Purpose: Turn a message template and a context into a plain string
//          without ever propagating an evaluation error — "templates
//          never propagate errors; they degrade gracefully" (§7).
// Dependencies: apex-core, crate::{compile, eval, parser}
// ============================================================================

use apex_core::EvaluationContext;

use crate::compile::fold_constants;
use crate::parser::parse;

/// Renders every `{{expr}}` placeholder in `template` by evaluating `expr`
/// against `ctx` and substituting its rendered text. A placeholder whose
/// expression fails to parse or evaluate is replaced with an empty string
/// rather than aborting the whole render — templates degrade gracefully.
#[must_use]
pub fn render(template: &str, ctx: &EvaluationContext) -> String {
    let mut output = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(start) = rest.find("{{") {
        output.push_str(&rest[..start]);
        let after_open = &rest[start + 2..];
        let Some(end) = after_open.find("}}") else {
            // Unterminated placeholder: emit the rest verbatim and stop.
            output.push_str(&rest[start..]);
            return output;
        };
        let source = after_open[..end].trim();
        output.push_str(&render_one(source, ctx));
        rest = &after_open[end + 2..];
    }
    output.push_str(rest);
    output
}

fn render_one(source: &str, ctx: &EvaluationContext) -> String {
    let Ok(ast) = parse(source) else {
        return String::new();
    };
    let ast = fold_constants(ast);
    crate::eval::eval(&ast, ctx).map_or_else(|_| String::new(), |value| value.render())
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use apex_core::Record;
    use apex_core::Value;

    use super::*;

    #[test]
    fn renders_interpolated_fields() {
        let record = Record::from_map(BTreeMap::from([
            ("instrumentType".to_string(), Value::String("BOND".into())),
            ("notional".to_string(), Value::Int64(1_000_000)),
        ]));
        let ctx = EvaluationContext::new(record);
        let rendered = render("Trade of type {{instrumentType}} with notional {{notional}}", &ctx);
        assert_eq!(rendered, "Trade of type BOND with notional 1000000");
    }

    #[test]
    fn degrades_to_empty_string_on_evaluation_error() {
        let ctx = EvaluationContext::new(Record::new());
        let rendered = render("value: {{missingField}}", &ctx);
        assert_eq!(rendered, "value: ");
    }

    #[test]
    fn passes_through_text_without_placeholders() {
        let ctx = EvaluationContext::new(Record::new());
        assert_eq!(render("no placeholders here", &ctx), "no placeholders here");
    }
}
