// apex-config/src/metadata.rs
// ============================================================================
// Module: Config Metadata
// Description: The five configuration document kinds (§4.8, §6.1), and
//              validation of the universal plus type-specific metadata
//              every document carries.
// ============================================================================

use crate::error::ConfigError;
use crate::schema::RawMetadata;

/// The configuration document kinds the loader classifies (§4.8, §6.1).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ConfigKind {
    Dataset,
    RuleConfig,
    Scenario,
    ScenarioRegistry,
    Bootstrap,
}

impl ConfigKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Dataset => "dataset",
            Self::RuleConfig => "rule-config",
            Self::Scenario => "scenario",
            Self::ScenarioRegistry => "scenario-registry",
            Self::Bootstrap => "bootstrap",
        }
    }

    #[must_use]
    pub fn from_str(value: &str) -> Option<Self> {
        match value {
            "dataset" => Some(Self::Dataset),
            "rule-config" => Some(Self::RuleConfig),
            "scenario" => Some(Self::Scenario),
            "scenario-registry" => Some(Self::ScenarioRegistry),
            "bootstrap" => Some(Self::Bootstrap),
            _ => None,
        }
    }
}

impl std::fmt::Display for ConfigKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Validates universal metadata (`name`, `version`, `description`) and
/// the type-specific extras named in §4.8: `business-domain`/`owner` for
/// scenarios, `created-by` for bootstrap/registry documents, `author` for
/// rule-config, `source` for datasets.
///
/// # Errors
/// Returns `ConfigError::MetadataMissing` if a required field is absent
/// or blank, or `ConfigError::InvalidVersion` if `version` is not
/// `MAJOR.MINOR.PATCH`.
pub fn validate_metadata(path: &str, kind: ConfigKind, metadata: &RawMetadata) -> Result<(), ConfigError> {
    require(path, "name", Some(metadata.name.as_str()))?;
    require(path, "description", Some(metadata.description.as_str()))?;
    validate_semver(path, &metadata.version)?;

    match kind {
        ConfigKind::Scenario => {
            require(path, "business-domain", metadata.business_domain.as_deref())?;
            require(path, "owner", metadata.owner.as_deref())?;
        }
        ConfigKind::Bootstrap | ConfigKind::ScenarioRegistry => {
            require(path, "created-by", metadata.created_by.as_deref())?;
        }
        ConfigKind::RuleConfig => {
            require(path, "author", metadata.author.as_deref())?;
        }
        ConfigKind::Dataset => {
            require(path, "source", metadata.source.as_deref())?;
        }
    }
    Ok(())
}

fn require(path: &str, field: &str, value: Option<&str>) -> Result<(), ConfigError> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(()),
        _ => Err(ConfigError::MetadataMissing { path: path.to_string(), field: field.to_string() }),
    }
}

/// A minimal, dependency-free semver check: `MAJOR.MINOR.PATCH`, each a
/// non-negative integer, with an optional `-prerelease`/`+build` suffix
/// ignored for validity purposes. The workspace does not otherwise depend
/// on the `semver` crate, so this avoids pulling it in for one check.
fn validate_semver(path: &str, version: &str) -> Result<(), ConfigError> {
    let core = version.split(['-', '+']).next().unwrap_or(version);
    let parts: Vec<&str> = core.split('.').collect();
    let valid =
        parts.len() == 3 && parts.iter().all(|part| !part.is_empty() && part.chars().all(|c| c.is_ascii_digit()));
    if valid {
        Ok(())
    } else {
        Err(ConfigError::InvalidVersion { path: path.to_string(), version: version.to_string() })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metadata(overrides: impl FnOnce(&mut RawMetadata)) -> RawMetadata {
        let mut metadata = RawMetadata {
            name: "trades".to_string(),
            version: "1.0.0".to_string(),
            description: "trade enrichment".to_string(),
            kind: None,
            author: None,
            owner: None,
            business_domain: None,
            regulatory_scope: None,
            source: None,
            created: None,
            last_modified: None,
            created_by: None,
            tags: Vec::new(),
            environment: None,
        };
        overrides(&mut metadata);
        metadata
    }

    #[test]
    fn rule_config_requires_author() {
        let metadata = metadata(|_| {});
        let err = validate_metadata("rules.yaml", ConfigKind::RuleConfig, &metadata).unwrap_err();
        assert!(matches!(err, ConfigError::MetadataMissing { field, .. } if field == "author"));
    }

    #[test]
    fn scenario_requires_business_domain_and_owner() {
        let metadata = metadata(|m| m.business_domain = Some("trading".to_string()));
        let err = validate_metadata("scenario.yaml", ConfigKind::Scenario, &metadata).unwrap_err();
        assert!(matches!(err, ConfigError::MetadataMissing { field, .. } if field == "owner"));
    }

    #[test]
    fn invalid_semver_is_rejected() {
        let metadata = metadata(|m| m.version = "v1".to_string());
        let err = validate_metadata("dataset.yaml", ConfigKind::Dataset, &metadata).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidVersion { .. }));
    }

    #[test]
    fn fully_populated_dataset_metadata_is_valid() {
        let metadata = metadata(|m| m.source = Some("treasury-reference-data".to_string()));
        validate_metadata("dataset.yaml", ConfigKind::Dataset, &metadata).expect("valid");
    }
}
