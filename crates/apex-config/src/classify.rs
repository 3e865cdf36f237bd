// apex-config/src/classify.rs
// ============================================================================
// Module: Config Classification
// Description: Deterministic file-type classification: declared
//              `metadata.type` wins; otherwise infer from the document's
//              top-level blocks; otherwise infer from file-path
//              convention; otherwise fail (§4.8 step 1-3).
// ============================================================================

use serde_yaml::Value as YamlValue;

use crate::error::ConfigError;
use crate::metadata::ConfigKind;

/// Classifies a parsed YAML document.
///
/// # Errors
/// Returns `ConfigError::SchemaViolation` if `metadata.type` is present
/// but not one of the five recognized kinds, or
/// `ConfigError::TypeAmbiguous` if neither the declared type, the
/// document's structure, nor `path`'s directory convention determines a
/// kind.
pub fn classify(path: &str, document: &YamlValue) -> Result<ConfigKind, ConfigError> {
    if let Some(declared) =
        document.get("metadata").and_then(|metadata| metadata.get("type")).and_then(YamlValue::as_str)
    {
        return ConfigKind::from_str(declared).ok_or_else(|| ConfigError::SchemaViolation {
            path: path.to_string(),
            message: format!("unknown metadata.type '{declared}'"),
        });
    }

    if document.get("data").is_some() {
        return Ok(ConfigKind::Dataset);
    }
    if document.get("rules").is_some() || document.get("enrichments").is_some() || document.get("data-sources").is_some() {
        return Ok(ConfigKind::RuleConfig);
    }
    if document.get("scenario-registry").is_some() {
        return Ok(ConfigKind::ScenarioRegistry);
    }
    if document.get("scenario").is_some() {
        return Ok(ConfigKind::Scenario);
    }
    if document.get("rule-chains").is_some() && document.get("categories").is_some() {
        return Ok(ConfigKind::Bootstrap);
    }

    classify_by_path(path).ok_or_else(|| ConfigError::TypeAmbiguous { path: path.to_string() })
}

fn classify_by_path(path: &str) -> Option<ConfigKind> {
    if path.contains("/datasets/") {
        Some(ConfigKind::Dataset)
    } else if path.contains("/scenarios/") && path.contains("registry") {
        Some(ConfigKind::ScenarioRegistry)
    } else if path.contains("/scenarios/") {
        Some(ConfigKind::Scenario)
    } else if path.contains("/rules/") || path.contains("/rule-configs/") {
        Some(ConfigKind::RuleConfig)
    } else if path.contains("/bootstrap/") {
        Some(ConfigKind::Bootstrap)
    } else {
        None
    }
}
