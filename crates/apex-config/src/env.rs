// apex-config/src/env.rs
// ============================================================================
// Module: Environment Variable Expansion
// Description: `${VAR}` and `${VAR:default}` expansion in declared
//              secret/config string fields, applied once at load time
//              (§6.4). Arbitrary dataset row values are never expanded —
//              callers apply this only to the specific fields config
//              schemas mark as expandable (connection strings, API keys).
// ============================================================================

use crate::error::ConfigError;

/// Expands every `${VAR}` / `${VAR:default}` occurrence in `value`.
///
/// # Errors
/// Returns `ConfigError::MissingEnvVar` if a referenced variable is unset
/// and no default was given.
pub fn expand(value: &str) -> Result<String, ConfigError> {
    let mut result = String::with_capacity(value.len());
    let mut rest = value;
    while let Some(start) = rest.find("${") {
        result.push_str(&rest[..start]);
        let Some(end) = rest[start..].find('}') else {
            result.push_str(&rest[start..]);
            rest = "";
            break;
        };
        let inner = &rest[start + 2..start + end];
        let expanded = match inner.split_once(':') {
            Some((name, default)) => std::env::var(name).unwrap_or_else(|_| default.to_string()),
            None => {
                std::env::var(inner).map_err(|_| ConfigError::MissingEnvVar { name: inner.to_string() })?
            }
        };
        result.push_str(&expanded);
        rest = &rest[start + end + 1..];
    }
    result.push_str(rest);
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn falls_back_to_declared_default() {
        assert_eq!(expand("${APEX_CONFIG_MISSING_VAR:fallback}").expect("expand"), "fallback");
    }

    #[test]
    fn missing_variable_without_default_errors() {
        assert!(matches!(expand("${APEX_CONFIG_MISSING_VAR}"), Err(ConfigError::MissingEnvVar { .. })));
    }

    #[test]
    fn text_without_placeholders_is_unchanged() {
        assert_eq!(expand("plain-text").expect("expand"), "plain-text");
    }

    #[test]
    fn unterminated_placeholder_is_passed_through_literally() {
        assert_eq!(expand("prefix-${unterminated").expect("expand"), "prefix-${unterminated");
    }
}
