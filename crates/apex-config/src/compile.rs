// apex-config/src/compile.rs
// ============================================================================
// Module: Declaration Compiler
// Description: Turns the raw, serde_yaml-deserialized shapes (§6.1) into
//              the typed declarations `apex-lookup`, `apex-enrichment`,
//              and `apex-rules` consume, compiling every embedded
//              expression and cross-checking target-field collisions
//              along the way (§4.8).
// ============================================================================

use std::collections::BTreeMap;

use apex_core::DataSourceId;
use apex_core::Record;
use apex_core::Severity;
use apex_core::Value;
use apex_drivers::InlineDataset;
use apex_enrichment::BatchEnrichment;
use apex_enrichment::Chain;
use apex_enrichment::ChainStage;
use apex_enrichment::ConditionalRouting;
use apex_enrichment::EnrichmentDeclaration;
use apex_enrichment::EnrichmentKind;
use apex_expr::Expression;
use apex_lookup::FieldMapping;
use apex_lookup::FilterCondition;
use apex_lookup::LookupEnrichment;
use apex_lookup::LookupKey;
use apex_lookup::MissingDataPolicy;
use apex_lookup::Validation;
use apex_rules::CategoryPolicy;
use apex_rules::RuleDeclaration;
use apex_rules::RuleGroup;

use crate::error::ConfigError;
use crate::schema::RawBatchConfig;
use crate::schema::RawCategoryPolicy;
use crate::schema::RawChainStage;
use crate::schema::RawConditionalRoutingConfig;
use crate::schema::RawDatasetFile;
use crate::schema::RawEnrichment;
use crate::schema::RawFieldMapping;
use crate::schema::RawFilterCondition;
use crate::schema::RawLookupConfig;
use crate::schema::RawMissingDataPolicy;
use crate::schema::RawRule;
use crate::schema::RawRuleChain;
use crate::schema::RawRuleGroup;
use crate::schema::RawValidation;

fn yaml_to_value(value: &serde_yaml::Value) -> Result<Value, ConfigError> {
    let json = serde_json::to_value(value)
        .map_err(|err| ConfigError::SchemaViolation { path: String::new(), message: err.to_string() })?;
    Ok(Value::from(&json))
}

fn compile_expression(path: &str, source: &str) -> Result<Expression, ConfigError> {
    Expression::compile(source)
        .map_err(|err| ConfigError::ExpressionInvalid { path: path.to_string(), message: err.to_string() })
}

/// Compiles a dataset file's declared rows into an [`InlineDataset`],
/// keyed on `key_field`. Each row is converted field-for-field via
/// `Record::from_json`, the same YAML-to-`Record` idiom `YamlFileDriver`
/// uses for on-disk datasets.
#[must_use]
pub fn compile_dataset(raw: &RawDatasetFile, key_field: &str) -> InlineDataset {
    let rows = raw
        .data
        .iter()
        .map(|row| {
            let json = serde_json::to_value(serde_yaml::Value::Mapping(row.clone()))
                .unwrap_or(serde_json::Value::Null);
            Record::from_json(&json)
        })
        .collect();
    InlineDataset { key_field: key_field.to_string(), rows }
}

fn compile_validation(raw: &RawValidation) -> Result<Validation, ConfigError> {
    let enum_values = match &raw.enum_values {
        Some(values) => Some(values.iter().map(yaml_to_value).collect::<Result<Vec<_>, _>>()?),
        None => None,
    };
    let range = match &raw.range {
        Some((min, max)) => Some((yaml_to_value(min)?, yaml_to_value(max)?)),
        None => None,
    };
    Ok(Validation { required: raw.required, pattern: raw.pattern.clone(), enum_values, range })
}

fn compile_field_mapping(path: &str, raw: &RawFieldMapping) -> Result<FieldMapping, ConfigError> {
    let transform = raw.transform.as_deref().map(|source| compile_expression(path, source)).transpose()?;
    let validation = raw.validation.as_ref().map(compile_validation).transpose()?;
    Ok(FieldMapping {
        source_path: raw.source_path.clone(),
        target_field: raw.target_field.clone(),
        transform,
        validation,
        allow_overwrite: raw.allow_overwrite,
    })
}

fn compile_field_mappings(path: &str, raw: &[RawFieldMapping]) -> Result<Vec<FieldMapping>, ConfigError> {
    raw.iter().map(|mapping| compile_field_mapping(path, mapping)).collect()
}

fn compile_filter(path: &str, raw: &RawFilterCondition) -> Result<FilterCondition, ConfigError> {
    Ok(FilterCondition {
        field: raw.field.clone(),
        operator: raw.operator.clone(),
        value: compile_expression(path, &raw.value)?,
    })
}

fn compile_missing_data_policy(raw: Option<&RawMissingDataPolicy>) -> Result<MissingDataPolicy, ConfigError> {
    match raw {
        None => Ok(MissingDataPolicy::Continue),
        Some(RawMissingDataPolicy::Fail) => Ok(MissingDataPolicy::Fail),
        Some(RawMissingDataPolicy::Continue) => Ok(MissingDataPolicy::Continue),
        Some(RawMissingDataPolicy::Defaults { defaults }) => {
            let mut compiled = BTreeMap::new();
            for (field, value) in defaults {
                compiled.insert(field.clone(), yaml_to_value(value)?);
            }
            Ok(MissingDataPolicy::Defaults(compiled))
        }
        Some(RawMissingDataPolicy::Fallback { data_source_id, dataset_ref }) => Ok(MissingDataPolicy::FallbackSource {
            data_source_id: data_source_id.clone(),
            dataset_ref: dataset_ref.clone(),
        }),
    }
}

fn compile_key(path: &str, raw: &RawLookupConfig) -> Result<LookupKey, ConfigError> {
    if let Some(key) = &raw.key {
        return Ok(LookupKey::Single(compile_expression(path, key)?));
    }
    if !raw.key_components.is_empty() {
        let components =
            raw.key_components.iter().map(|source| compile_expression(path, source)).collect::<Result<Vec<_>, _>>()?;
        return Ok(LookupKey::Composite {
            components,
            separator: raw.key_separator.clone().unwrap_or_else(|| "-".to_string()),
            allow_null_components: raw.allow_null_components,
        });
    }
    Err(ConfigError::SchemaViolation {
        path: path.to_string(),
        message: "lookup declares neither 'key' nor 'key-components'".to_string(),
    })
}

/// Compiles a raw lookup block (shared by plain lookup enrichments,
/// routing branches, chain stages, and batch per-element lookups) into a
/// [`LookupEnrichment`].
///
/// # Errors
/// Returns `ConfigError::ExpressionInvalid` if any embedded expression
/// fails to compile, or `ConfigError::SchemaViolation` if neither a
/// single nor composite key is declared.
pub fn compile_lookup(path: &str, name: &str, raw: &RawLookupConfig) -> Result<LookupEnrichment, ConfigError> {
    let fallback = match (&raw.fallback_data_source_id, &raw.fallback_dataset_ref) {
        (Some(id), Some(dataset_ref)) => Some((DataSourceId::from(id.as_str()), dataset_ref.clone())),
        _ => None,
    };
    Ok(LookupEnrichment {
        name: name.to_string(),
        condition: None,
        key: compile_key(path, raw)?,
        data_source_id: DataSourceId::from(raw.data_source_id.as_str()),
        dataset_ref: raw.dataset_ref.clone(),
        filters: raw.filters.iter().map(|filter| compile_filter(path, filter)).collect::<Result<Vec<_>, _>>()?,
        fallback,
        ordering: raw.ordering.as_deref().map(|source| compile_expression(path, source)).transpose()?,
        field_mappings: compile_field_mappings(path, &raw.field_mappings)?,
        missing_data_policy: compile_missing_data_policy(raw.on_not_found.as_ref())?,
    })
}

fn compile_routing(path: &str, raw: &RawConditionalRoutingConfig) -> Result<ConditionalRouting, ConfigError> {
    let mut branches = Vec::with_capacity(raw.branches.len());
    for (index, branch) in raw.branches.iter().enumerate() {
        let condition = compile_expression(path, &branch.condition)?;
        let lookup = compile_lookup(path, &format!("branch-{index}"), &branch.lookup)?;
        branches.push((condition, lookup));
    }
    let default = raw.default.as_ref().map(|lookup| compile_lookup(path, "default-branch", lookup)).transpose()?;
    Ok(ConditionalRouting {
        branches,
        default,
        common_field_mappings: compile_field_mappings(path, &raw.common_field_mappings)?,
    })
}

fn compile_batch(path: &str, raw: &RawBatchConfig) -> Result<BatchEnrichment, ConfigError> {
    Ok(BatchEnrichment {
        collection_field: raw.collection_field.clone(),
        element_binding: raw.element_binding.clone(),
        per_element_lookup: compile_lookup(path, "per-element-lookup", &raw.per_element_lookup)?,
        target_field: raw.target_field.clone(),
        allow_overwrite: raw.allow_overwrite,
    })
}

fn compile_chain_stage(path: &str, raw: &RawChainStage) -> Result<ChainStage, ConfigError> {
    let output_variable = raw.output_variable.clone().ok_or_else(|| ConfigError::SchemaViolation {
        path: path.to_string(),
        message: format!("chain stage '{}' is missing output-variable", raw.stage),
    })?;
    let output_source_field = raw.output_source_field.clone().ok_or_else(|| ConfigError::SchemaViolation {
        path: path.to_string(),
        message: format!("chain stage '{}' is missing output-source-field", raw.stage),
    })?;
    Ok(ChainStage {
        id: raw.stage.clone(),
        depends_on: raw.depends_on.clone(),
        lookup: compile_lookup(path, &raw.stage, &raw.lookup)?,
        output_source_field,
        output_variable,
    })
}

/// Compiles a `rule-chains` entry into an enrichment [`Chain`]: each
/// declared stage runs a lookup and binds its resolved field as a
/// variable later stages (or rules) reference, mirroring spec scenario
/// (4)'s `customer-lookup` -> `account-type-lookup` -> `pricing-lookup`
/// dependency chain.
pub fn compile_rule_chain(path: &str, raw: &RawRuleChain) -> Result<Chain, ConfigError> {
    let stages =
        raw.configuration.stages.iter().map(|stage| compile_chain_stage(path, stage)).collect::<Result<Vec<_>, _>>()?;
    Ok(Chain { name: raw.id.clone(), stages })
}

/// Compiles one declared enrichment, dispatching on its `type` to a
/// plain lookup, conditional-routing branch set, named chain, or batch
/// enrichment.
///
/// # Errors
/// Returns `ConfigError::SchemaViolation` if `type` names anything other
/// than `lookup`, `conditional-routing`, `chain`, or `batch` (notably,
/// `calculation`/`api` are recognized shapes in §6.1's YAML grammar but
/// have no corresponding evaluator in this engine and are rejected here
/// rather than silently ignored), or if the block the declared type
/// requires (`lookup-config`, `conditional-routing-config`, etc.) is
/// absent.
pub fn compile_enrichment(path: &str, raw: &RawEnrichment) -> Result<EnrichmentDeclaration, ConfigError> {
    let kind = match raw.kind.as_str() {
        "lookup" => {
            let lookup_raw = raw.lookup_config.as_ref().ok_or_else(|| ConfigError::SchemaViolation {
                path: path.to_string(),
                message: format!("enrichment '{}' is type 'lookup' but has no lookup-config", raw.id),
            })?;
            let mut lookup = compile_lookup(path, &raw.name.clone().unwrap_or_else(|| raw.id.clone()), lookup_raw)?;
            if lookup.field_mappings.is_empty() {
                lookup.field_mappings = compile_field_mappings(path, &raw.field_mappings)?;
            }
            lookup.condition = raw.condition.as_deref().map(|source| compile_expression(path, source)).transpose()?;
            EnrichmentKind::Lookup(lookup)
        }
        "conditional-routing" => {
            let routing_raw =
                raw.conditional_routing_config.as_ref().ok_or_else(|| ConfigError::SchemaViolation {
                    path: path.to_string(),
                    message: format!(
                        "enrichment '{}' is type 'conditional-routing' but has no conditional-routing-config",
                        raw.id
                    ),
                })?;
            EnrichmentKind::ConditionalRouting(compile_routing(path, routing_raw)?)
        }
        "batch" => {
            let batch_raw = raw.batch_config.as_ref().ok_or_else(|| ConfigError::SchemaViolation {
                path: path.to_string(),
                message: format!("enrichment '{}' is type 'batch' but has no batch-config", raw.id),
            })?;
            EnrichmentKind::Batch(compile_batch(path, batch_raw)?)
        }
        other => {
            return Err(ConfigError::SchemaViolation {
                path: path.to_string(),
                message: format!("enrichment '{}' declares unsupported type '{other}'", raw.id),
            });
        }
    };
    Ok(EnrichmentDeclaration { id: raw.id.clone(), depends_on: raw.depends_on.clone(), kind, enabled: raw.enabled })
}

fn compile_severity(path: &str, raw: &str) -> Result<Severity, ConfigError> {
    match raw.to_ascii_lowercase().as_str() {
        "info" => Ok(Severity::Info),
        "warning" => Ok(Severity::Warning),
        "error" => Ok(Severity::Error),
        other => Err(ConfigError::SchemaViolation {
            path: path.to_string(),
            message: format!("unknown severity '{other}'"),
        }),
    }
}

/// Compiles one declared rule.
///
/// # Errors
/// Returns `ConfigError::ExpressionInvalid` if `condition` fails to
/// compile, or `ConfigError::SchemaViolation` if `severity` is not one
/// of `info`/`warning`/`error`.
pub fn compile_rule(path: &str, raw: &RawRule) -> Result<RuleDeclaration, ConfigError> {
    Ok(RuleDeclaration {
        id: raw.id.clone(),
        depends_on: raw.depends_on.clone(),
        priority: raw.priority,
        condition: compile_expression(path, &raw.condition)?,
        message_template: raw.message.clone(),
        severity: compile_severity(path, &raw.severity)?,
        category: raw.category.clone(),
        enabled: raw.enabled,
    })
}

/// Compiles a declared rule group, resolving `rule-ids` against
/// `all_rules`.
///
/// # Errors
/// Returns `ConfigError::UnknownReference` if a rule id in `rule-ids` was
/// not declared anywhere in `all_rules`.
pub fn compile_rule_group(
    path: &str,
    raw: &RawRuleGroup,
    all_rules: &BTreeMap<String, RuleDeclaration>,
) -> Result<RuleGroup, ConfigError> {
    let mut rules = Vec::with_capacity(raw.rule_ids.len());
    for id in &raw.rule_ids {
        let rule = all_rules.get(id).ok_or_else(|| ConfigError::UnknownReference {
            path: path.to_string(),
            reference: id.clone(),
        })?;
        rules.push(rule.clone());
    }
    Ok(RuleGroup {
        name: raw.name.clone().unwrap_or_else(|| raw.id.clone()),
        rules,
        stop_on_first_failure: raw.stop_on_first_failure,
    })
}

#[must_use]
pub fn compile_category_policy(raw: &RawCategoryPolicy) -> CategoryPolicy {
    CategoryPolicy { category: raw.category.clone(), stop_on_error: raw.stop_on_error }
}

/// Checks that no two field mappings in `mappings` (paired with an
/// owning declaration id for the error message) target the same field
/// unless at least one declares `allow-overwrite`.
///
/// # Errors
/// Returns `ConfigError::FieldCollision` on the first conflicting pair
/// found, in declaration order.
pub fn check_field_collisions(mappings: &[(String, &FieldMapping)]) -> Result<(), ConfigError> {
    let mut owners: BTreeMap<&str, &str> = BTreeMap::new();
    for (owner, mapping) in mappings {
        if mapping.allow_overwrite {
            continue;
        }
        if let Some(previous_owner) = owners.get(mapping.target_field.as_str()) {
            return Err(ConfigError::FieldCollision {
                field: mapping.target_field.clone(),
                first: (*previous_owner).to_string(),
                second: owner.clone(),
            });
        }
        owners.insert(mapping.target_field.as_str(), owner.as_str());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::RawMissingDataPolicy as RawPolicy;

    #[test]
    fn compiles_single_key_lookup() {
        let raw = RawLookupConfig {
            key: Some("currency".to_string()),
            key_components: Vec::new(),
            key_separator: None,
            allow_null_components: false,
            data_source_id: "currencies-inline".to_string(),
            dataset_ref: "currencies".to_string(),
            filters: Vec::new(),
            fallback_data_source_id: None,
            fallback_dataset_ref: None,
            ordering: None,
            field_mappings: vec![RawFieldMapping {
                source_path: "name".to_string(),
                target_field: "currencyName".to_string(),
                transform: None,
                validation: None,
                allow_overwrite: false,
            }],
            on_not_found: Some(RawPolicy::Fail),
        };
        let lookup = compile_lookup("currencies.yaml", "currency-lookup", &raw).expect("compile");
        assert!(matches!(lookup.key, LookupKey::Single(_)));
        assert_eq!(lookup.field_mappings.len(), 1);
        assert_eq!(lookup.missing_data_policy, MissingDataPolicy::Fail);
    }

    #[test]
    fn composite_key_without_separator_defaults_to_dash() {
        let raw = RawLookupConfig {
            key: None,
            key_components: vec!["customerId".to_string(), "region".to_string()],
            key_separator: None,
            allow_null_components: false,
            data_source_id: "pricing".to_string(),
            dataset_ref: "pricing".to_string(),
            filters: Vec::new(),
            fallback_data_source_id: None,
            fallback_dataset_ref: None,
            ordering: None,
            field_mappings: Vec::new(),
            on_not_found: None,
        };
        let lookup = compile_lookup("pricing.yaml", "pricing-lookup", &raw).expect("compile");
        let LookupKey::Composite { separator, .. } = lookup.key else {
            panic!("expected a composite key");
        };
        assert_eq!(separator, "-");
    }

    #[test]
    fn unknown_severity_is_rejected() {
        let raw = RawRule {
            id: "r1".to_string(),
            name: None,
            condition: "true".to_string(),
            message: "ok".to_string(),
            severity: "critical".to_string(),
            category: None,
            priority: 0,
            depends_on: Vec::new(),
            enabled: true,
        };
        assert!(matches!(compile_rule("rules.yaml", &raw), Err(ConfigError::SchemaViolation { .. })));
    }

    #[test]
    fn calculation_enrichment_type_is_rejected() {
        let raw = RawEnrichment {
            id: "calc".to_string(),
            name: None,
            kind: "calculation".to_string(),
            condition: None,
            lookup_config: None,
            conditional_routing_config: None,
            batch_config: None,
            calculation_config: Some(serde_yaml::Value::Null),
            api_config: None,
            field_mappings: Vec::new(),
            depends_on: Vec::new(),
            enabled: true,
        };
        assert!(matches!(compile_enrichment("rules.yaml", &raw), Err(ConfigError::SchemaViolation { .. })));
    }

    #[test]
    fn field_collision_without_overwrite_is_rejected() {
        let mapping = FieldMapping {
            source_path: "x".to_string(),
            target_field: "shared".to_string(),
            transform: None,
            validation: None,
            allow_overwrite: false,
        };
        let mappings = vec![("first".to_string(), &mapping), ("second".to_string(), &mapping)];
        assert!(matches!(check_field_collisions(&mappings), Err(ConfigError::FieldCollision { .. })));
    }
}
