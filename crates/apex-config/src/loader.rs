// apex-config/src/loader.rs
// ============================================================================
// Module: Config Loader
// Description: Reads one configuration file from disk, enforces a size
//              cap and path-traversal checks, parses and classifies it,
//              validates its metadata, and compiles it into typed
//              declarations, aggregating everything loaded so far into a
//              `LoadedProgram`. Follows a fail-closed load/resolve-path/
//              validate-path sequence, generalized from a single document
//              format to five YAML document kinds loaded independently.
// ============================================================================

use std::collections::BTreeMap;
use std::path::Path;

use apex_core::DataSourceId;
use apex_drivers::DriverRegistry;
use apex_drivers::InlineDataset;
use apex_drivers::InlineDriver;
use apex_enrichment::EnrichmentDeclaration;
use apex_enrichment::EnrichmentKind;
use apex_enrichment::Node;
use apex_rules::CategoryPolicy;
use apex_rules::RuleDeclaration;
use apex_rules::RuleGroup;

use crate::compile;
use crate::error::ConfigError;
use crate::metadata::ConfigKind;
use crate::metadata::validate_metadata;
use crate::schema::RawDataSource;
use crate::schema::RawDatasetFile;
use crate::schema::RawRuleConfigFile;
use crate::schema::RawScenarioFile;
use crate::schema::RawScenarioRegistryFile;

/// A YAML rule-config or dataset file larger than this almost certainly
/// indicates a generated or corrupted file rather than hand-authored
/// configuration.
const MAX_CONFIG_FILE_SIZE: u64 = 8 * 1024 * 1024;

/// The longest a single path component (or the whole path) may be before
/// being rejected.
const MAX_PATH_COMPONENT_LEN: usize = 255;
const MAX_PATH_LEN: usize = 4096;

/// Everything compiled from one rule-config file, ready to be merged into
/// a [`ResolvedProgram`](crate::scenario::ResolvedProgram).
#[derive(Debug, Clone, Default)]
pub struct CompiledRuleConfig {
    pub enrichments: Vec<EnrichmentDeclaration>,
    pub rule_groups: Vec<RuleGroup>,
    pub category_policies: Vec<CategoryPolicy>,
    pub data_sources: Vec<RawDataSource>,
}

/// Accumulates every file loaded so far: compiled rule configs keyed by
/// the path they were loaded from, inline datasets keyed by their
/// declared `metadata.name`, and the raw scenario/registry documents
/// needed to build the scenario router.
#[derive(Debug, Default)]
pub struct ConfigLoader {
    pub rule_configs: BTreeMap<String, CompiledRuleConfig>,
    pub datasets: BTreeMap<String, InlineDataset>,
    pub scenarios: BTreeMap<String, RawScenarioFile>,
    pub registry: Option<RawScenarioRegistryFile>,
}

impl ConfigLoader {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Reads, validates, classifies, and compiles the file at `path`,
    /// folding its contents into this loader's accumulated state.
    ///
    /// # Errors
    /// Returns `ConfigError::Io`/`TooLarge`/`NotUtf8`/`YamlParse` for
    /// file-level failures, or any classification/metadata/compile
    /// failure surfaced while processing the document.
    pub fn load_file(&mut self, path: &Path) -> Result<ConfigKind, ConfigError> {
        validate_path(path)?;
        let path_str = path.to_string_lossy().to_string();

        let size = std::fs::metadata(path).map_err(|err| ConfigError::Io { path: path_str.clone(), message: err.to_string() })?.len();
        if size > MAX_CONFIG_FILE_SIZE {
            return Err(ConfigError::TooLarge { path: path_str });
        }

        let bytes = std::fs::read(path).map_err(|err| ConfigError::Io { path: path_str.clone(), message: err.to_string() })?;
        let text = String::from_utf8(bytes).map_err(|_| ConfigError::NotUtf8 { path: path_str.clone() })?;

        let document: serde_yaml::Value = serde_yaml::from_str(&text)
            .map_err(|err| ConfigError::YamlParse { path: path_str.clone(), message: err.to_string() })?;
        let kind = crate::classify::classify(&path_str, &document)?;

        match kind {
            ConfigKind::Dataset => self.load_dataset(&path_str, &text)?,
            ConfigKind::RuleConfig => self.load_rule_config(&path_str, &text)?,
            ConfigKind::Scenario => self.load_scenario(&path_str, &text)?,
            ConfigKind::ScenarioRegistry => self.load_scenario_registry(&path_str, &text)?,
            ConfigKind::Bootstrap => self.load_bootstrap(&path_str, &text)?,
        }
        tracing::debug!(path = %path_str, kind = ?kind, "configuration file loaded");
        Ok(kind)
    }

    fn load_dataset(&mut self, path: &str, text: &str) -> Result<(), ConfigError> {
        let raw: RawDatasetFile =
            serde_yaml::from_str(text).map_err(|err| ConfigError::YamlParse { path: path.to_string(), message: err.to_string() })?;
        validate_metadata(path, ConfigKind::Dataset, &raw.metadata)?;
        let key_field = first_key_field(&raw).ok_or_else(|| ConfigError::SchemaViolation {
            path: path.to_string(),
            message: "dataset has no rows to infer a key field from".to_string(),
        })?;
        let dataset = compile::compile_dataset(&raw, &key_field);
        self.datasets.insert(raw.metadata.name.clone(), dataset);
        Ok(())
    }

    fn load_rule_config(&mut self, path: &str, text: &str) -> Result<(), ConfigError> {
        let raw: RawRuleConfigFile =
            serde_yaml::from_str(text).map_err(|err| ConfigError::YamlParse { path: path.to_string(), message: err.to_string() })?;
        if let Some(metadata) = &raw.metadata {
            validate_metadata(path, ConfigKind::RuleConfig, metadata)?;
        }
        for source in &raw.data_sources {
            if source.name.trim().is_empty() || source.kind.trim().is_empty() {
                return Err(ConfigError::SchemaViolation {
                    path: path.to_string(),
                    message: "data-sources entry is missing name or type".to_string(),
                });
            }
        }

        let mut enrichments = Vec::with_capacity(raw.enrichments.len() + raw.rule_chains.len());
        for enrichment in &raw.enrichments {
            enrichments.push(compile::compile_enrichment(path, enrichment)?);
        }
        for chain in &raw.rule_chains {
            let compiled = compile::compile_rule_chain(path, chain)?;
            enrichments.push(EnrichmentDeclaration {
                id: chain.id.clone(),
                depends_on: Vec::new(),
                kind: EnrichmentKind::Chain(compiled),
                enabled: true,
            });
        }
        validate_enrichment_graph(path, &enrichments)?;
        check_enrichment_field_collisions(&enrichments)?;

        let mut rules_by_id: BTreeMap<String, RuleDeclaration> = BTreeMap::new();
        for rule in &raw.rules {
            let compiled = compile::compile_rule(path, rule)?;
            if rules_by_id.insert(rule.id.clone(), compiled).is_some() {
                return Err(ConfigError::DuplicateId { path: path.to_string(), id: rule.id.clone() });
            }
        }

        let mut rule_groups = Vec::with_capacity(raw.rule_groups.len());
        for group in &raw.rule_groups {
            let compiled = compile::compile_rule_group(path, group, &rules_by_id)?;
            validate_rule_group_graph(path, &compiled)?;
            rule_groups.push(compiled);
        }

        let category_policies = raw.categories.iter().map(compile::compile_category_policy).collect();

        self.rule_configs.insert(
            config_key(path),
            CompiledRuleConfig { enrichments, rule_groups, category_policies, data_sources: raw.data_sources },
        );
        Ok(())
    }

    fn load_scenario(&mut self, path: &str, text: &str) -> Result<(), ConfigError> {
        let raw: RawScenarioFile =
            serde_yaml::from_str(text).map_err(|err| ConfigError::YamlParse { path: path.to_string(), message: err.to_string() })?;
        validate_metadata(path, ConfigKind::Scenario, &raw.metadata)?;
        self.scenarios.insert(raw.scenario.scenario_id.clone(), raw);
        Ok(())
    }

    fn load_scenario_registry(&mut self, path: &str, text: &str) -> Result<(), ConfigError> {
        let raw: RawScenarioRegistryFile =
            serde_yaml::from_str(text).map_err(|err| ConfigError::YamlParse { path: path.to_string(), message: err.to_string() })?;
        validate_metadata(path, ConfigKind::ScenarioRegistry, &raw.metadata)?;
        self.registry = Some(raw);
        Ok(())
    }

    fn load_bootstrap(&mut self, path: &str, text: &str) -> Result<(), ConfigError> {
        let raw: crate::schema::RawBootstrapFile =
            serde_yaml::from_str(text).map_err(|err| ConfigError::YamlParse { path: path.to_string(), message: err.to_string() })?;
        validate_metadata(path, ConfigKind::Bootstrap, &raw.metadata)?;
        let mut enrichments = Vec::with_capacity(raw.rule_chains.len());
        for chain in &raw.rule_chains {
            let compiled = compile::compile_rule_chain(path, chain)?;
            enrichments.push(EnrichmentDeclaration {
                id: chain.id.clone(),
                depends_on: Vec::new(),
                kind: EnrichmentKind::Chain(compiled),
                enabled: true,
            });
        }
        validate_enrichment_graph(path, &enrichments)?;
        let category_policies = raw.categories.iter().map(compile::compile_category_policy).collect();
        self.rule_configs.insert(
            config_key(path),
            CompiledRuleConfig { enrichments, rule_groups: Vec::new(), category_policies, data_sources: Vec::new() },
        );
        Ok(())
    }

    /// Registers a driver for every declared `inline` data source across
    /// every loaded rule-config onto `registry`, on top of whatever
    /// drivers the caller already registered. Each such data source is
    /// handed every dataset loaded via [`load_file`](Self::load_file) (a
    /// lookup's `dataset-ref` picks a specific one by its declared
    /// `metadata.name`, the same name it was registered under when its
    /// dataset file was loaded), so a data source's own `name` only
    /// determines the `data-source-id` lookups address it by, not which
    /// datasets it can serve. Any other declared kind (`database`,
    /// `rest-api`, `file-system`, `cache`, `queue`, or a custom name) is
    /// left untouched: per the driver-registry design (spec §9), those
    /// are constructed and registered by the embedding application, which
    /// alone holds the credentials/connections they need.
    pub fn register_inline_drivers(&self, registry: &mut DriverRegistry) {
        for config in self.rule_configs.values() {
            for source in &config.data_sources {
                if source.kind != "inline" {
                    continue;
                }
                let _ = registry
                    .register(DataSourceId::from(source.name.as_str()), Box::new(InlineDriver::new(self.datasets.clone())));
            }
        }
    }
}

/// Checks that no two lookup-bearing enrichments in the same file write
/// the same target field without `allow-overwrite`, across plain
/// lookups, conditional-routing branches (and their common mappings),
/// and chain stages, respecting each field mapping's own
/// `allow_overwrite` escape hatch.
fn check_enrichment_field_collisions(enrichments: &[EnrichmentDeclaration]) -> Result<(), ConfigError> {
    let mut owned = Vec::new();
    for decl in enrichments {
        match &decl.kind {
            EnrichmentKind::Lookup(lookup) => {
                for mapping in &lookup.field_mappings {
                    owned.push((decl.id.clone(), mapping));
                }
            }
            EnrichmentKind::ConditionalRouting(routing) => {
                for (_, lookup) in &routing.branches {
                    for mapping in &lookup.field_mappings {
                        owned.push((decl.id.clone(), mapping));
                    }
                }
                if let Some(lookup) = &routing.default {
                    for mapping in &lookup.field_mappings {
                        owned.push((decl.id.clone(), mapping));
                    }
                }
                for mapping in &routing.common_field_mappings {
                    owned.push((decl.id.clone(), mapping));
                }
            }
            EnrichmentKind::Chain(chain) => {
                for stage in &chain.stages {
                    for mapping in &stage.lookup.field_mappings {
                        owned.push((format!("{}:{}", decl.id, stage.id), mapping));
                    }
                }
            }
            EnrichmentKind::Batch(_) => {}
        }
    }
    compile::check_field_collisions(&owned)
}

/// The key a rule-config or bootstrap file is filed under: its bare file
/// name, since `scenario-registry`/`scenario` documents reference sibling
/// rule-config files by name alone (`config-file: rules.yaml`), not by
/// the full filesystem path they happened to be loaded from.
fn config_key(path: &str) -> String {
    Path::new(path).file_name().map(|name| name.to_string_lossy().into_owned()).unwrap_or_else(|| path.to_string())
}

fn first_key_field(raw: &RawDatasetFile) -> Option<String> {
    raw.data.first()?.keys().next().and_then(|key| key.as_str()).map(str::to_string)
}

fn validate_enrichment_graph(path: &str, enrichments: &[EnrichmentDeclaration]) -> Result<(), ConfigError> {
    let nodes: Vec<Node> = enrichments
        .iter()
        .enumerate()
        .map(|(index, decl)| Node { id: decl.id.clone(), depends_on: decl.depends_on.clone(), declaration_index: index })
        .collect();
    apex_enrichment::topological_order(&nodes).map(|_| ()).map_err(|err| translate_enrichment_error(path, err))
}

fn validate_rule_group_graph(path: &str, group: &RuleGroup) -> Result<(), ConfigError> {
    let nodes: Vec<apex_rules::RuleNode> = group
        .rules
        .iter()
        .enumerate()
        .map(|(index, rule)| apex_rules::RuleNode {
            id: rule.id.clone(),
            depends_on: rule.depends_on.clone(),
            priority: rule.priority,
            declaration_index: index,
        })
        .collect();
    apex_rules::order_rules(&nodes).map(|_| ()).map_err(|err| translate_rule_error(path, err))
}

fn translate_enrichment_error(path: &str, err: apex_enrichment::EnrichmentError) -> ConfigError {
    match err {
        apex_enrichment::EnrichmentError::DuplicateId { id } => ConfigError::DuplicateId { path: path.to_string(), id },
        apex_enrichment::EnrichmentError::UnknownDependency { dependency, .. } => {
            ConfigError::UnknownReference { path: path.to_string(), reference: dependency }
        }
        apex_enrichment::EnrichmentError::CycleDetected { ids } => ConfigError::CycleDetected { path: path.to_string(), ids },
        other => ConfigError::SchemaViolation { path: path.to_string(), message: other.to_string() },
    }
}

fn translate_rule_error(path: &str, err: apex_rules::RuleError) -> ConfigError {
    match err {
        apex_rules::RuleError::DuplicateId { id } => ConfigError::DuplicateId { path: path.to_string(), id },
        apex_rules::RuleError::UnknownDependency { dependency, .. } => {
            ConfigError::UnknownReference { path: path.to_string(), reference: dependency }
        }
        apex_rules::RuleError::CycleDetected { ids } => ConfigError::CycleDetected { path: path.to_string(), ids },
    }
}

/// Rejects paths with components or a total length beyond what a
/// hand-authored config path should ever need.
///
/// # Errors
/// Returns `ConfigError::Io` describing the offending component.
fn validate_path(path: &Path) -> Result<(), ConfigError> {
    let path_str = path.to_string_lossy();
    if path_str.len() > MAX_PATH_LEN {
        return Err(ConfigError::Io { path: path_str.to_string(), message: "path exceeds the maximum length".to_string() });
    }
    for component in path.components() {
        let component_str = component.as_os_str().to_string_lossy();
        if component_str.len() > MAX_PATH_COMPONENT_LEN {
            return Err(ConfigError::Io {
                path: path_str.to_string(),
                message: format!("path component '{component_str}' exceeds the maximum length"),
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    fn write_temp(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().expect("tempfile");
        file.write_all(contents.as_bytes()).expect("write");
        file
    }

    #[test]
    fn loads_a_dataset_file() {
        let file = write_temp(
            "metadata:\n  name: currencies\n  version: 1.0.0\n  description: fx reference\n  type: dataset\n  source: treasury\ndata:\n  - code: USD\n    active: true\n",
        );
        let mut loader = ConfigLoader::new();
        let kind = loader.load_file(file.path()).expect("load");
        assert_eq!(kind, ConfigKind::Dataset);
        assert!(loader.datasets.contains_key("currencies"));
    }

    #[test]
    fn rejects_a_cyclic_enrichment_graph() {
        let file = write_temp(
            "metadata:\n  name: rules\n  version: 1.0.0\n  description: x\n  type: rule-config\n  author: team\nenrichments:\n  - id: a\n    type: lookup\n    depends-on: [b]\n    lookup-config:\n      key: x\n      data-source-id: d\n      dataset-ref: d\n  - id: b\n    type: lookup\n    depends-on: [a]\n    lookup-config:\n      key: x\n      data-source-id: d\n      dataset-ref: d\n",
        );
        let mut loader = ConfigLoader::new();
        let err = loader.load_file(file.path()).expect_err("cycle rejected");
        assert!(matches!(err, ConfigError::CycleDetected { .. }));
    }

    #[test]
    fn rejects_path_traversal_style_long_components() {
        let bogus = Path::new(&"a".repeat(MAX_PATH_COMPONENT_LEN + 1));
        assert!(matches!(validate_path(bogus), Err(ConfigError::Io { .. })));
    }
}
