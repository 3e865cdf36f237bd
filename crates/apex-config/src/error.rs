// apex-config/src/error.rs
// ============================================================================
// Module: Config Errors
// Description: The config-error taxonomy named in spec §7: load/parse
//              failures, classification ambiguity, metadata gaps, and the
//              dependency-graph failures surfaced at load time rather than
//              at evaluation time.
// ============================================================================

use thiserror::Error;

/// Everything that can go wrong loading or validating one configuration
/// file, or resolving a scenario against the registry.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// The file could not be read from disk.
    #[error("io error reading '{path}': {message}")]
    Io { path: String, message: String },
    /// The file exceeded the configured size cap.
    #[error("config file '{path}' exceeds the size limit")]
    TooLarge { path: String },
    /// The file's bytes were not valid UTF-8.
    #[error("config file '{path}' is not valid utf-8")]
    NotUtf8 { path: String },
    /// The YAML document did not parse.
    #[error("yaml parse error in '{path}': {message}")]
    YamlParse { path: String, message: String },
    /// The document did not match the expected shape for its declared or
    /// inferred type.
    #[error("schema violation in '{path}': {message}")]
    SchemaViolation { path: String, message: String },
    /// File-type classification (§4.8) could not determine a type.
    #[error("could not classify config type for '{path}'")]
    TypeAmbiguous { path: String },
    /// A required universal or type-specific metadata field is missing.
    #[error("config '{path}' is missing required metadata field '{field}'")]
    MetadataMissing { path: String, field: String },
    /// `version` was present but not a valid semantic version.
    #[error("config '{path}' has an invalid version '{version}'")]
    InvalidVersion { path: String, version: String },
    /// Two enrichments or rules in the same load declared the same id.
    #[error("duplicate id '{id}' in '{path}'")]
    DuplicateId { path: String, id: String },
    /// A `depends-on`, data-source, or scenario reference names something
    /// that does not exist.
    #[error("'{path}' references unknown '{reference}'")]
    UnknownReference { path: String, reference: String },
    /// The enrichment or rule dependency graph has a cycle.
    #[error("dependency cycle detected in '{path}': {}", .ids.join(" -> "))]
    CycleDetected { path: String, ids: Vec<String> },
    /// Two mappings in the same load target the same field without
    /// `allow-overwrite`.
    #[error("target field '{field}' is written by both '{first}' and '{second}' without allow-overwrite")]
    FieldCollision { field: String, first: String, second: String },
    /// An embedded expression failed to compile.
    #[error("expression in '{path}' failed to compile: {message}")]
    ExpressionInvalid { path: String, message: String },
    /// No scenario matched the requested data type or scenario id, and no
    /// `default` scenario was declared (§4.9).
    #[error("no scenario found for '{requested}'")]
    ScenarioNotFound { requested: String },
    /// `${VAR}` referenced an environment variable with no value and no
    /// declared default.
    #[error("environment variable '{name}' is not set and no default was given")]
    MissingEnvVar { name: String },
}
