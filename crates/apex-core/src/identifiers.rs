// apex-core/src/identifiers.rs
// ============================================================================
// Module: Core Identifiers
// Description: Opaque, string-backed identifiers shared across APEX configs.
// Purpose: Give every named entity (enrichment, rule, dataset, scenario, ...)
//          a strongly typed, serializable handle instead of a bare String.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! Identifiers are opaque and serialize transparently as strings. Validation
//! (uniqueness, reference resolution) happens at the config-loader boundary,
//! not in these wrapper types.

use std::fmt;

use serde::Deserialize;
use serde::Serialize;

/// Identifier of an enrichment declaration, unique within its enclosing config.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EnrichmentId(String);

impl EnrichmentId {
    /// Creates a new enrichment identifier.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EnrichmentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<&str> for EnrichmentId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for EnrichmentId {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

/// Identifier of a rule declaration, unique within its enclosing config.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RuleId(String);

impl RuleId {
    /// Creates a new rule identifier.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<&str> for RuleId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for RuleId {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

/// Identifier of a rule group.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RuleGroupId(String);

impl RuleGroupId {
    /// Creates a new rule-group identifier.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RuleGroupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<&str> for RuleGroupId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for RuleGroupId {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

/// Identifier of a rule chain.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RuleChainId(String);

impl RuleChainId {
    /// Creates a new rule-chain identifier.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RuleChainId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<&str> for RuleChainId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for RuleChainId {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

/// Identifier of a named data source, as referenced by `data-sources`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DataSourceId(String);

impl DataSourceId {
    /// Creates a new data-source identifier.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DataSourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<&str> for DataSourceId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for DataSourceId {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

/// Identifier of a scenario (`scenario.scenario-id`).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ScenarioId(String);

impl ScenarioId {
    /// Creates a new scenario identifier.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ScenarioId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<&str> for ScenarioId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for ScenarioId {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

/// A data-type name, as used by the scenario registry and routing requests.
/// Distinct from `ScenarioId`: several data types may share one scenario.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DataTypeName(String);

impl DataTypeName {
    /// Creates a new data-type name.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the data-type name as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DataTypeName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<&str> for DataTypeName {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for DataTypeName {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

/// A variable name bound in an `EvaluationContext`, without the leading `#`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VariableName(String);

impl VariableName {
    /// Creates a new variable name.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the variable name as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for VariableName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<&str> for VariableName {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for VariableName {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

#[cfg(test)]
mod tests {
    use super::RuleId;

    #[test]
    fn round_trips_through_display_and_from() {
        let id = RuleId::from("tradeId-required");
        assert_eq!(id.as_str(), "tradeId-required");
        assert_eq!(id.to_string(), "tradeId-required");
        assert_eq!(RuleId::new("x"), RuleId::new("x".to_string()));
    }
}
