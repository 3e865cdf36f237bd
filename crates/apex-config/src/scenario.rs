// apex-config/src/scenario.rs
// ============================================================================
// Module: Scenario Routing
// Description: Resolves a requested scenario id or data type to the set of
//              rule-config files it should run (§4.9). An explicit
//              scenario id always wins; otherwise the registry is searched
//              for an entry whose `data-types` contains the requested type,
//              matching either the fully-qualified or a short-name alias;
//              otherwise a declared `default` scenario is used if present.
// ============================================================================

use std::collections::BTreeMap;

use crate::error::ConfigError;
use crate::loader::CompiledRuleConfig;
use crate::schema::RawScenarioFile;
use crate::schema::RawScenarioRegistryFile;

/// The rule-config files and category policies a resolved scenario runs,
/// aggregated from every `rule-configurations` entry the scenario names.
#[derive(Debug, Clone, Default)]
pub struct ResolvedProgram {
    pub scenario_id: String,
    pub configs: Vec<CompiledRuleConfig>,
}

/// Routes a scenario request against the loaded registry and scenario
/// files, per §4.9's precedence: explicit id, then data-type match,
/// then the registry's declared `default` scenario.
///
/// # Errors
/// Returns `ConfigError::ScenarioNotFound` if neither `requested_id` nor
/// `requested_data_type` resolves to a known scenario and no `default`
/// scenario is registered.
pub fn route(
    registry: &RawScenarioRegistryFile,
    scenarios: &BTreeMap<String, RawScenarioFile>,
    rule_configs: &BTreeMap<String, CompiledRuleConfig>,
    requested_id: Option<&str>,
    requested_data_type: Option<&str>,
) -> Result<ResolvedProgram, ConfigError> {
    let entry = if let Some(id) = requested_id {
        registry
            .scenario_registry
            .iter()
            .find(|entry| entry.scenario_id == id)
            .ok_or_else(|| ConfigError::ScenarioNotFound { requested: id.to_string() })?
    } else if let Some(data_type) = requested_data_type {
        registry
            .scenario_registry
            .iter()
            .find(|entry| matches_data_type(&entry.data_types, data_type))
            .or_else(|| registry.scenario_registry.iter().find(|entry| entry.scenario_id == "default"))
            .ok_or_else(|| ConfigError::ScenarioNotFound { requested: data_type.to_string() })?
    } else {
        registry
            .scenario_registry
            .iter()
            .find(|entry| entry.scenario_id == "default")
            .ok_or_else(|| ConfigError::ScenarioNotFound { requested: "<none>".to_string() })?
    };

    let scenario = scenarios.get(&entry.scenario_id);
    let config_files = scenario
        .map(|file| file.scenario.rule_configurations.clone())
        .unwrap_or_else(|| vec![entry.config_file.clone()]);

    let mut configs = Vec::with_capacity(config_files.len());
    for path in &config_files {
        let config = rule_configs
            .get(path)
            .ok_or_else(|| ConfigError::UnknownReference { path: entry.scenario_id.clone(), reference: path.clone() })?;
        configs.push(config.clone());
    }

    Ok(ResolvedProgram { scenario_id: entry.scenario_id.clone(), configs })
}

/// Matches `requested` against a registry entry's declared `data-types`,
/// accepting either an exact fully-qualified match (`"com.apex.trade"`)
/// or a match on the final dot-separated segment (`"trade"`), so callers
/// may route by either the long or short form.
fn matches_data_type(declared: &[String], requested: &str) -> bool {
    declared.iter().any(|candidate| {
        candidate == requested || candidate.rsplit('.').next().is_some_and(|short| short == requested)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::RawMetadata;
    use crate::schema::RawScenarioBody;
    use crate::schema::RawScenarioRegistryEntry;

    fn metadata() -> RawMetadata {
        RawMetadata {
            name: "test".to_string(),
            version: "1.0.0".to_string(),
            description: "test".to_string(),
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
        }
    }

    fn registry_with(entries: Vec<RawScenarioRegistryEntry>) -> RawScenarioRegistryFile {
        RawScenarioRegistryFile { metadata: metadata(), scenario_registry: entries }
    }

    #[test]
    fn matches_by_short_name_alias() {
        assert!(matches_data_type(&["com.apex.trade".to_string()], "trade"));
    }

    #[test]
    fn routes_by_data_type_and_aggregates_configured_files() {
        let registry = registry_with(vec![RawScenarioRegistryEntry {
            scenario_id: "trade-settlement".to_string(),
            config_file: "rules/trade.yaml".to_string(),
            data_types: vec!["com.apex.trade".to_string()],
            description: None,
            business_domain: None,
            owner: None,
        }]);
        let scenarios = BTreeMap::from([(
            "trade-settlement".to_string(),
            RawScenarioFile {
                metadata: metadata(),
                scenario: RawScenarioBody {
                    scenario_id: "trade-settlement".to_string(),
                    name: "Trade Settlement".to_string(),
                    description: "settles trades".to_string(),
                    data_types: vec!["com.apex.trade".to_string()],
                    rule_configurations: vec!["rules/trade.yaml".to_string()],
                },
            },
        )]);
        let rule_configs = BTreeMap::from([("rules/trade.yaml".to_string(), CompiledRuleConfig::default())]);

        let resolved = route(&registry, &scenarios, &rule_configs, None, Some("trade")).expect("route");
        assert_eq!(resolved.scenario_id, "trade-settlement");
        assert_eq!(resolved.configs.len(), 1);
    }

    #[test]
    fn unmatched_data_type_without_default_fails() {
        let registry = registry_with(Vec::new());
        let scenarios = BTreeMap::new();
        let rule_configs = BTreeMap::new();
        let err = route(&registry, &scenarios, &rule_configs, None, Some("unknown")).expect_err("not found");
        assert!(matches!(err, ConfigError::ScenarioNotFound { .. }));
    }
}
