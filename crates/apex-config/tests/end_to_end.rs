// apex-config/tests/end_to_end.rs
// ============================================================================
// Module: End-to-End Scenarios
// Description: Loads a tempdir configuration tree through `Engine` and
//              evaluates a record against it, the same way an embedding
//              application would, covering the load-compile-route-evaluate
//              round trip for each declared enrichment and rule-group shape.
// ============================================================================

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::collections::BTreeMap;
use std::io::Write as _;
use std::path::Path;
use std::sync::Arc;

use apex_config::Engine;
use apex_config::EngineDeps;
use apex_core::DataSourceId;
use apex_core::Record;
use apex_core::Value;
use apex_drivers::DriverRegistry;
use apex_drivers::YamlFileDriver;
use apex_drivers::YamlFileSource;
use apex_core::Decision;

fn write_file(dir: &Path, name: &str, contents: &str) {
    if let Some(parent) = Path::new(name).parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(dir.join(parent)).expect("mkdir");
        }
    }
    let mut file = std::fs::File::create(dir.join(name)).expect("create");
    file.write_all(contents.as_bytes()).expect("write");
}

fn registry_entry(scenario_id: &str, config_file: &str, data_type: &str) -> String {
    format!(
        "metadata:\n  name: registry\n  version: 1.0.0\n  description: scenario registry\n  type: scenario-registry\nscenario-registry:\n  - scenario-id: {scenario_id}\n    config-file: {config_file}\n    data-types: [{data_type}]\n"
    )
}

fn record_from_json(value: serde_json::Value) -> Record {
    Record::from_json(&value)
}

// 1) Simple currency enrichment (literal values).
#[tokio::test]
async fn simple_currency_enrichment_resolves_name_and_active_flag() {
    let dir = tempfile::tempdir().expect("tempdir");
    write_file(
        dir.path(),
        "currencies.yaml",
        "metadata:\n  name: currencies\n  version: 1.0.0\n  description: fx reference\n  type: dataset\n  source: treasury\ndata:\n  - code: USD\n    name: US Dollar\n    active: true\n  - code: EUR\n    name: Euro\n    active: true\n",
    );
    write_file(
        dir.path(),
        "rules.yaml",
        "metadata:\n  name: currency-rules\n  version: 1.0.0\n  description: currency enrichment\n  type: rule-config\n  author: team\ndata-sources:\n  - name: currencies-inline\n    type: inline\nenrichments:\n  - id: currency-lookup\n    type: lookup\n    lookup-config:\n      key: currency\n      data-source-id: currencies-inline\n      dataset-ref: currencies\n      field-mappings:\n        - source-path: name\n          target-field: currencyName\n        - source-path: active\n          target-field: currencyActive\nrules:\n  - id: currency-is-active\n    condition: currencyActive == true\n    message: \"Currency {{currency}} ({{currencyName}}) is active\"\n    severity: error\nrule-groups:\n  - id: main\n    rule-ids: [currency-is-active]\n",
    );
    write_file(dir.path(), "registry.yaml", &registry_entry("currency", "rules.yaml", "com.apex.currency"));

    let engine = Engine::load_config(dir.path(), EngineDeps::default()).expect("load");
    let program = engine.route(None, Some("currency")).expect("route");

    let mut fields = BTreeMap::new();
    fields.insert("currency".to_string(), Value::String("USD".to_string()));
    fields.insert("amount".to_string(), Value::Int64(100));
    let record = Record::from_map(fields);

    let result = engine.evaluate(&program, record).await.expect("evaluate");
    assert_eq!(result.enrichment_outcomes.len(), 1);
    assert!(result.enrichment_outcomes[0].was_resolved());

    assert_eq!(result.report.outcomes.len(), 1);
    let outcome = &result.report.outcomes[0];
    assert_eq!(outcome.message, "Currency USD (US Dollar) is active");
    assert!(!result.report.has_errors());
    assert_eq!(result.report.decision, Some(Decision::AutoApproved));
}

// 2) Dynamic-index access with safe navigation.
#[tokio::test]
async fn dynamic_index_access_with_safe_navigation() {
    let dir = tempfile::tempdir().expect("tempdir");
    write_file(
        dir.path(),
        "rules.yaml",
        "metadata:\n  name: leg-rules\n  version: 1.0.0\n  description: otc leg selection\n  type: rule-config\n  author: team\nrules:\n  - id: selected-leg-has-stb-rule\n    condition: \"trade?.otcTrade?.otcLeg?.size() > trade.selectedLegIndex && trade.otcTrade.otcLeg[trade.selectedLegIndex]?.stbRuleName != null\"\n    message: selected leg carries an stb rule\n    severity: warning\nrule-groups:\n  - id: main\n    rule-ids: [selected-leg-has-stb-rule]\n",
    );
    write_file(dir.path(), "registry.yaml", &registry_entry("otc-leg", "rules.yaml", "com.apex.otcleg"));

    let engine = Engine::load_config(dir.path(), EngineDeps::default()).expect("load");
    let program = engine.route(None, Some("otcleg")).expect("route");

    let trade_json = |selected_leg_index: i64| {
        serde_json::json!({
            "trade": {
                "selectedLegIndex": selected_leg_index,
                "otcTrade": {
                    "otcLeg": [
                        {"stbRuleName": "RULE_A"},
                        {"stbRuleName": "RULE_B"},
                        {"stbRuleName": "RULE_C"},
                    ]
                }
            }
        })
    };

    let matching = engine.evaluate(&program, record_from_json(trade_json(1))).await.expect("evaluate matching");
    assert_eq!(matching.report.outcomes.len(), 1);
    assert!(matches!(matching.report.outcomes[0].status, apex_core::OutcomeStatus::Passed));

    let out_of_range =
        engine.evaluate(&program, record_from_json(trade_json(5))).await.expect("evaluate out of range");
    assert_eq!(out_of_range.report.outcomes.len(), 1);
    assert!(matches!(out_of_range.report.outcomes[0].status, apex_core::OutcomeStatus::Failed));
    assert!(!out_of_range.report.has_errors());
}

// 3) Compound key pricing.
#[tokio::test]
async fn compound_key_pricing_joins_customer_and_region() {
    let dir = tempfile::tempdir().expect("tempdir");
    write_file(
        dir.path(),
        "pricing.yaml",
        "metadata:\n  name: pricing-tiers\n  version: 1.0.0\n  description: customer pricing by region\n  type: dataset\n  source: pricing-desk\ndata:\n  - customer-region: CUST001-NA\n    customerTier: SILVER\n    regionalDiscount: 0.05\n  - customer-region: CUST001-EU\n    customerTier: GOLD\n    regionalDiscount: 0.10\n",
    );
    write_file(
        dir.path(),
        "rules.yaml",
        "metadata:\n  name: pricing-rules\n  version: 1.0.0\n  description: compound key pricing\n  type: rule-config\n  author: team\ndata-sources:\n  - name: pricing-inline\n    type: inline\nenrichments:\n  - id: customer-pricing-lookup\n    type: lookup\n    lookup-config:\n      key-components: [customerId, region]\n      key-separator: \"-\"\n      data-source-id: pricing-inline\n      dataset-ref: pricing-tiers\n      field-mappings:\n        - source-path: customerTier\n          target-field: customerTier\n        - source-path: regionalDiscount\n          target-field: regionalDiscount\nrules:\n  - id: has-pricing-tier\n    condition: customerTier != null\n    message: pricing tier resolved\n    severity: info\nrule-groups:\n  - id: main\n    rule-ids: [has-pricing-tier]\n",
    );
    write_file(dir.path(), "registry.yaml", &registry_entry("pricing", "rules.yaml", "com.apex.pricing"));

    let engine = Engine::load_config(dir.path(), EngineDeps::default()).expect("load");
    let program = engine.route(None, Some("pricing")).expect("route");

    let mut fields = BTreeMap::new();
    fields.insert("customerId".to_string(), Value::String("CUST001".to_string()));
    fields.insert("region".to_string(), Value::String("EU".to_string()));
    let record = Record::from_map(fields);

    let result = engine.evaluate(&program, record).await.expect("evaluate");
    assert!(result.enrichment_outcomes[0].was_resolved());
    let snapshot = result.report.context_snapshot.expect("snapshot");
    assert_eq!(snapshot.get("customerTier"), Some(&Value::String("GOLD".to_string())));
    assert_eq!(snapshot.get("regionalDiscount"), Some(&Value::Float64(0.10)));
}

// 4) Dependency chain with depends-on.
#[tokio::test]
async fn dependency_chain_resolves_in_order() {
    let dir = tempfile::tempdir().expect("tempdir");
    write_file(
        dir.path(),
        "customers.yaml",
        "metadata:\n  name: customers\n  version: 1.0.0\n  description: customer reference\n  type: dataset\n  source: crm\ndata:\n  - customerId: CUST001\n    accountType: PREMIUM\n",
    );
    write_file(
        dir.path(),
        "account-types.yaml",
        "metadata:\n  name: account-types\n  version: 1.0.0\n  description: account type reference\n  type: dataset\n  source: crm\ndata:\n  - accountType: PREMIUM\n    creditLimit: 50000\n    pricingTier: TIER_A\n",
    );
    write_file(
        dir.path(),
        "pricing-tiers.yaml",
        "metadata:\n  name: pricing-tiers\n  version: 1.0.0\n  description: pricing tier reference\n  type: dataset\n  source: pricing-desk\ndata:\n  - pricingTier: TIER_A\n    transactionFee: 2.5\n",
    );
    write_file(
        dir.path(),
        "rules.yaml",
        "metadata:\n  name: chain-rules\n  version: 1.0.0\n  description: dependency chain\n  type: rule-config\n  author: team\ndata-sources:\n  - name: chain-inline\n    type: inline\nrule-chains:\n  - id: customer-pricing-chain\n    pattern: sequential\n    configuration:\n      stages:\n        - stage: customer-lookup\n          key: customerId\n          data-source-id: chain-inline\n          dataset-ref: customers\n          output-source-field: accountType\n          output-variable: accountType\n          field-mappings:\n            - source-path: accountType\n              target-field: accountType\n        - stage: account-type-lookup\n          depends-on: [customer-lookup]\n          key: accountType\n          data-source-id: chain-inline\n          dataset-ref: account-types\n          output-source-field: creditLimit\n          output-variable: creditLimit\n          field-mappings:\n            - source-path: creditLimit\n              target-field: creditLimit\n            - source-path: pricingTier\n              target-field: pricingTier\n        - stage: pricing-lookup\n          depends-on: [account-type-lookup]\n          key: pricingTier\n          data-source-id: chain-inline\n          dataset-ref: pricing-tiers\n          output-source-field: transactionFee\n          output-variable: transactionFee\n          field-mappings:\n            - source-path: transactionFee\n              target-field: transactionFee\nrules:\n  - id: has-transaction-fee\n    condition: transactionFee != null\n    message: transaction fee confirmed\n    severity: info\nrule-groups:\n  - id: main\n    rule-ids: [has-transaction-fee]\n",
    );
    write_file(dir.path(), "registry.yaml", &registry_entry("trade", "rules.yaml", "com.apex.trade"));

    let engine = Engine::load_config(dir.path(), EngineDeps::default()).expect("load");
    let program = engine.route(None, Some("trade")).expect("route");

    let mut fields = BTreeMap::new();
    fields.insert("customerId".to_string(), Value::String("CUST001".to_string()));
    let record = Record::from_map(fields);

    let result = engine.evaluate(&program, record).await.expect("evaluate");
    let snapshot = result.report.context_snapshot.expect("snapshot");
    assert_eq!(snapshot.get("transactionFee"), Some(&Value::Float64(2.5)));
    assert!(matches!(result.report.outcomes[0].status, apex_core::OutcomeStatus::Passed));

    // Miss at the first stage: its target field is written null, which
    // nulls out every downstream stage's key in turn, so each stage is
    // skipped and writes null to its own targets, cascading all the way
    // to the terminal rule without ever touching an unwritten field.
    let mut missing_fields = BTreeMap::new();
    missing_fields.insert("customerId".to_string(), Value::String("UNKNOWN".to_string()));
    let missing_record = Record::from_map(missing_fields);
    let missed = engine.evaluate(&program, missing_record).await.expect("evaluate missing");
    assert!(matches!(missed.report.outcomes[0].status, apex_core::OutcomeStatus::Failed));
}

// 5) Conditional routing by instrument type.
#[tokio::test]
async fn conditional_routing_picks_branch_by_instrument_type_and_venue() {
    let dir = tempfile::tempdir().expect("tempdir");
    // Not a `.yaml`/`.yml` file: kept out of the directory walk the config
    // loader performs, since its bare array shape has no metadata to
    // classify it by and no path-convention directory to fall back on.
    write_file(
        dir.path(),
        "bonds.dat",
        "- cusip: \"912828XYZ\"\n  price: 101.25\n",
    );
    write_file(
        dir.path(),
        "nyse-equities.yaml",
        "metadata:\n  name: nyse-equities\n  version: 1.0.0\n  description: NYSE equity prices\n  type: dataset\n  source: market-data\ndata:\n  - symbol: IBM\n    price: 140.00\n    source: NYSE\n",
    );
    write_file(
        dir.path(),
        "nasdaq-equities.yaml",
        "metadata:\n  name: nasdaq-equities\n  version: 1.0.0\n  description: NASDAQ equity prices\n  type: dataset\n  source: market-data\ndata:\n  - symbol: AAPL\n    price: 185.50\n    source: NASDAQ\n",
    );
    write_file(
        dir.path(),
        "default-prices.yaml",
        "metadata:\n  name: defaults\n  version: 1.0.0\n  description: placeholder price for unrouted instrument types\n  type: dataset\n  source: market-data\ndata:\n  - placeholder: DEFAULT\n    price: 0.0\n    source: Default\n",
    );
    write_file(
        dir.path(),
        "rules.yaml",
        "metadata:\n  name: routing-rules\n  version: 1.0.0\n  description: instrument routing\n  type: rule-config\n  author: team\ndata-sources:\n  - name: prices-inline\n    type: inline\n  - name: prices-yaml-file\n    type: yaml-file\nenrichments:\n  - id: price-routing\n    type: conditional-routing\n    conditional-routing-config:\n      branches:\n        - condition: instrumentType == \"EQUITY\" && tradingVenue == \"NYSE\"\n          key: symbol\n          data-source-id: prices-inline\n          dataset-ref: nyse-equities\n          field-mappings:\n            - source-path: price\n              target-field: currentPrice\n            - source-path: source\n              target-field: priceSource\n        - condition: instrumentType == \"EQUITY\" && tradingVenue == \"NASDAQ\"\n          key: symbol\n          data-source-id: prices-inline\n          dataset-ref: nasdaq-equities\n          field-mappings:\n            - source-path: price\n              target-field: currentPrice\n            - source-path: source\n              target-field: priceSource\n        - condition: instrumentType == \"BOND\"\n          key: cusip\n          data-source-id: prices-yaml-file\n          dataset-ref: bonds\n          field-mappings:\n            - source-path: price\n              target-field: currentPrice\n      default:\n        key: \"'DEFAULT'\"\n        data-source-id: prices-inline\n        dataset-ref: defaults\n        field-mappings:\n          - source-path: price\n            target-field: currentPrice\n          - source-path: source\n            target-field: priceSource\nrules:\n  - id: has-current-price\n    condition: currentPrice != null\n    message: price resolved\n    severity: info\nrule-groups:\n  - id: main\n    rule-ids: [has-current-price]\n",
    );
    write_file(dir.path(), "registry.yaml", &registry_entry("trade", "rules.yaml", "com.apex.trade"));

    let mut driver_registry = DriverRegistry::new();
    let mut yaml_sources = BTreeMap::new();
    yaml_sources.insert(
        "bonds".to_string(),
        YamlFileSource { path: dir.path().join("bonds.dat"), key_field: "cusip".to_string() },
    );
    driver_registry
        .register(DataSourceId::from("prices-yaml-file"), Box::new(YamlFileDriver::new(yaml_sources)))
        .expect("register yaml-file driver");
    driver_registry.init_all().await.expect("init yaml-file driver");

    let deps = EngineDeps { driver_registry, ..EngineDeps::default() };
    let engine = Engine::load_config(dir.path(), deps).expect("load");
    let program = engine.route(None, Some("trade")).expect("route");

    let mut nasdaq_fields = BTreeMap::new();
    nasdaq_fields.insert("instrumentType".to_string(), Value::String("EQUITY".to_string()));
    nasdaq_fields.insert("tradingVenue".to_string(), Value::String("NASDAQ".to_string()));
    nasdaq_fields.insert("symbol".to_string(), Value::String("AAPL".to_string()));
    let nasdaq_record = Record::from_map(nasdaq_fields);
    let nasdaq_result = engine.evaluate(&program, nasdaq_record).await.expect("evaluate nasdaq");
    let nasdaq_snapshot = nasdaq_result.report.context_snapshot.expect("snapshot");
    assert!(nasdaq_snapshot.get("currentPrice").is_some());

    let mut bond_fields = BTreeMap::new();
    bond_fields.insert("instrumentType".to_string(), Value::String("BOND".to_string()));
    bond_fields.insert("cusip".to_string(), Value::String("912828XYZ".to_string()));
    let bond_record = Record::from_map(bond_fields);
    let bond_result = engine.evaluate(&program, bond_record).await.expect("evaluate bond");
    let bond_snapshot = bond_result.report.context_snapshot.expect("snapshot");
    assert_eq!(bond_snapshot.get("currentPrice"), Some(&Value::Float64(101.25)));

    let mut fx_fields = BTreeMap::new();
    fx_fields.insert("instrumentType".to_string(), Value::String("FX".to_string()));
    let fx_record = Record::from_map(fx_fields);
    let fx_result = engine.evaluate(&program, fx_record).await.expect("evaluate fx default branch");
    let fx_snapshot = fx_result.report.context_snapshot.expect("snapshot");
    assert_eq!(fx_snapshot.get("currentPrice"), Some(&Value::Float64(0.0)));
    assert_eq!(fx_snapshot.get("priceSource"), Some(&Value::String("Default".to_string())));
}

// 6) Rule-group short-circuit semantics.
#[tokio::test]
async fn stop_on_first_failure_halts_the_group_and_later_groups() {
    let dir = tempfile::tempdir().expect("tempdir");
    write_file(
        dir.path(),
        "rules.yaml",
        "metadata:\n  name: validation-rules\n  version: 1.0.0\n  description: trade id validation\n  type: rule-config\n  author: team\nrules:\n  - id: tradeId-required\n    condition: tradeId != null\n    message: trade id is present\n    severity: error\n  - id: tradeId-format\n    condition: \"tradeId.matches(\\\"^[0-9]+$\\\")\"\n    message: trade id is numeric\n    severity: error\n  - id: never-runs\n    condition: \"true\"\n    message: should not evaluate\n    severity: info\nrule-groups:\n  - id: basic-validation\n    stop-on-first-failure: true\n    rule-ids: [tradeId-required, tradeId-format]\n  - id: later-group\n    rule-ids: [never-runs]\n",
    );
    write_file(dir.path(), "registry.yaml", &registry_entry("trade", "rules.yaml", "com.apex.trade"));

    let engine = Engine::load_config(dir.path(), EngineDeps::default()).expect("load");
    let program = engine.route(None, Some("trade")).expect("route");

    let mut fields = BTreeMap::new();
    fields.insert("tradeId".to_string(), Value::String("abc123".to_string()));
    let record = Record::from_map(fields);

    let result = engine.evaluate(&program, record).await.expect("evaluate");
    assert_eq!(result.report.outcomes.len(), 2);
    assert!(matches!(result.report.outcomes[0].status, apex_core::OutcomeStatus::Passed));
    assert!(matches!(result.report.outcomes[1].status, apex_core::OutcomeStatus::Failed));
    assert!(result.report.has_errors());
    assert_eq!(result.report.decision, Some(Decision::Rejected));
}
