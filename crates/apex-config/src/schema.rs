// apex-config/src/schema.rs
// ============================================================================
// Module: Raw Config Schema
// Description: serde_yaml-deserializable shapes for the five configuration
//              document kinds (§6.1). These are intentionally loose: wide
//              `Option`s and opaque `serde_yaml::Value` blobs for
//              driver-specific connection details, with `compile.rs`
//              responsible for turning them into typed declarations and
//              raising `ConfigError::SchemaViolation` for anything it
//              cannot make sense of.
// ============================================================================

use std::collections::BTreeMap;

use serde::Deserialize;
use serde_yaml::Mapping;
use serde_yaml::Value as YamlValue;

/// Universal metadata present on every configuration document, plus every
/// type-specific extra named in §6.1/§4.8. Which extras are required is
/// decided by [`crate::metadata::validate_metadata`], not by this shape.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct RawMetadata {
    pub name: String,
    pub version: String,
    pub description: String,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub author: Option<String>,
    pub owner: Option<String>,
    pub business_domain: Option<String>,
    pub regulatory_scope: Option<String>,
    pub source: Option<String>,
    pub created: Option<String>,
    pub last_modified: Option<String>,
    pub created_by: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    pub environment: Option<String>,
}

/// A dataset file: `metadata` plus a flat list of keyed rows.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct RawDatasetFile {
    pub metadata: RawMetadata,
    pub data: Vec<Mapping>,
}

/// One declared external data source. Connection details are kept opaque:
/// `apex-config` validates shape and forwards `connection` to whichever
/// driver factory the host application wires into the `DriverRegistry`,
/// rather than instantiating live drivers itself for anything beyond the
/// pure-data `inline`/`yaml-file` kinds (§9).
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct RawDataSource {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub source_type: Option<String>,
    #[serde(default)]
    pub connection: YamlValue,
    pub queries: Option<YamlValue>,
    pub endpoints: Option<YamlValue>,
    pub topics: Option<YamlValue>,
    pub file_format: Option<String>,
    pub cache: Option<YamlValue>,
    pub circuit_breaker: Option<YamlValue>,
    pub health_check: Option<YamlValue>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct RawValidation {
    #[serde(default)]
    pub required: bool,
    pub pattern: Option<String>,
    pub enum_values: Option<Vec<YamlValue>>,
    pub range: Option<(YamlValue, YamlValue)>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct RawFieldMapping {
    pub source_path: String,
    pub target_field: String,
    pub transform: Option<String>,
    pub validation: Option<RawValidation>,
    #[serde(default)]
    pub allow_overwrite: bool,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct RawFilterCondition {
    pub field: String,
    pub operator: String,
    pub value: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RawMissingDataPolicy {
    Fail,
    Continue,
    Defaults { defaults: BTreeMap<String, YamlValue> },
    Fallback { data_source_id: String, dataset_ref: String },
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct RawLookupConfig {
    pub key: Option<String>,
    #[serde(default)]
    pub key_components: Vec<String>,
    pub key_separator: Option<String>,
    #[serde(default)]
    pub allow_null_components: bool,
    pub data_source_id: String,
    pub dataset_ref: String,
    #[serde(default)]
    pub filters: Vec<RawFilterCondition>,
    pub fallback_data_source_id: Option<String>,
    pub fallback_dataset_ref: Option<String>,
    pub ordering: Option<String>,
    #[serde(default)]
    pub field_mappings: Vec<RawFieldMapping>,
    pub on_not_found: Option<RawMissingDataPolicy>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct RawRoutingBranch {
    pub condition: String,
    #[serde(flatten)]
    pub lookup: RawLookupConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct RawConditionalRoutingConfig {
    #[serde(default)]
    pub branches: Vec<RawRoutingBranch>,
    pub default: Option<RawLookupConfig>,
    #[serde(default)]
    pub common_field_mappings: Vec<RawFieldMapping>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct RawBatchConfig {
    pub collection_field: String,
    pub element_binding: String,
    pub per_element_lookup: RawLookupConfig,
    pub target_field: String,
    #[serde(default)]
    pub allow_overwrite: bool,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct RawChainStage {
    pub stage: String,
    #[serde(flatten)]
    pub lookup: RawLookupConfig,
    #[serde(default)]
    pub depends_on: Vec<String>,
    pub output_source_field: Option<String>,
    pub output_variable: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct RawRuleChainConfiguration {
    pub stages: Vec<RawChainStage>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct RawRuleChain {
    pub id: String,
    pub pattern: String,
    pub configuration: RawRuleChainConfiguration,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct RawEnrichment {
    pub id: String,
    pub name: Option<String>,
    #[serde(rename = "type")]
    pub kind: String,
    pub condition: Option<String>,
    pub lookup_config: Option<RawLookupConfig>,
    pub conditional_routing_config: Option<RawConditionalRoutingConfig>,
    pub batch_config: Option<RawBatchConfig>,
    pub calculation_config: Option<YamlValue>,
    pub api_config: Option<YamlValue>,
    #[serde(default)]
    pub field_mappings: Vec<RawFieldMapping>,
    #[serde(default)]
    pub depends_on: Vec<String>,
    #[serde(default = "default_true")]
    pub enabled: bool,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct RawRule {
    pub id: String,
    pub name: Option<String>,
    pub condition: String,
    pub message: String,
    pub severity: String,
    pub category: Option<String>,
    #[serde(default)]
    pub priority: i32,
    #[serde(default)]
    pub depends_on: Vec<String>,
    #[serde(default = "default_true")]
    pub enabled: bool,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct RawRuleGroup {
    pub id: String,
    pub name: Option<String>,
    pub category: Option<String>,
    #[serde(default)]
    pub stop_on_first_failure: bool,
    pub rule_ids: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct RawCategoryPolicy {
    pub category: String,
    #[serde(default)]
    pub stop_on_error: bool,
}

/// A rule-config file. Every top-level block is optional so a file may
/// declare only data sources, only rules, or any combination (§6.1).
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub struct RawRuleConfigFile {
    pub metadata: Option<RawMetadata>,
    #[serde(default)]
    pub data_sources: Vec<RawDataSource>,
    #[serde(default)]
    pub enrichments: Vec<RawEnrichment>,
    #[serde(default)]
    pub rules: Vec<RawRule>,
    #[serde(default)]
    pub rule_groups: Vec<RawRuleGroup>,
    #[serde(default)]
    pub rule_chains: Vec<RawRuleChain>,
    #[serde(default)]
    pub categories: Vec<RawCategoryPolicy>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct RawScenarioBody {
    pub scenario_id: String,
    pub name: String,
    pub description: String,
    pub data_types: Vec<String>,
    pub rule_configurations: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct RawScenarioFile {
    pub metadata: RawMetadata,
    pub scenario: RawScenarioBody,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct RawScenarioRegistryEntry {
    pub scenario_id: String,
    pub config_file: String,
    pub data_types: Vec<String>,
    pub description: Option<String>,
    pub business_domain: Option<String>,
    pub owner: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct RawScenarioRegistryFile {
    pub metadata: RawMetadata,
    pub scenario_registry: Vec<RawScenarioRegistryEntry>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct RawBootstrapFile {
    pub metadata: RawMetadata,
    #[serde(default)]
    pub rule_chains: Vec<RawRuleChain>,
    #[serde(default)]
    pub categories: Vec<RawCategoryPolicy>,
}
