// crates/apex-cli/src/cli_tests.rs
// ============================================================================
// Module: CLI Command Tests
// Description: Exercises `validate`/`route`/`evaluate` end to end against a
//              tempdir-based configuration tree, the same way a shell
//              invocation would.
// Dependencies: apex-cli main helpers, tempfile
// ============================================================================

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::io::Write as _;
use std::path::Path;

use super::*;

fn write_file(dir: &Path, name: &str, contents: &str) {
    let mut file = std::fs::File::create(dir.join(name)).expect("create");
    file.write_all(contents.as_bytes()).expect("write");
}

fn write_minimal_config(dir: &Path) {
    write_file(
        dir,
        "currencies.yaml",
        "metadata:\n  name: currencies\n  version: 1.0.0\n  description: fx reference\n  type: dataset\n  source: treasury\ndata:\n  - code: USD\n    name: US Dollar\n",
    );
    write_file(
        dir,
        "rules.yaml",
        "metadata:\n  name: trade-rules\n  version: 1.0.0\n  description: trade validation\n  type: rule-config\n  author: team\ndata-sources:\n  - name: currencies-inline\n    type: inline\nenrichments:\n  - id: currency-lookup\n    type: lookup\n    lookup-config:\n      key: currency\n      data-source-id: currencies-inline\n      dataset-ref: currencies\n      field-mappings:\n        - source-path: name\n          target-field: currencyName\nrules:\n  - id: has-currency-name\n    condition: currencyName\n    message: currency resolved\n    severity: info\nrule-groups:\n  - id: main\n    rule-ids: [has-currency-name]\n",
    );
    write_file(
        dir,
        "registry.yaml",
        "metadata:\n  name: registry\n  version: 1.0.0\n  description: scenario registry\n  type: scenario-registry\nscenario-registry:\n  - scenario-id: trade\n    config-file: rules.yaml\n    data-types: [com.apex.trade]\n",
    );
}

#[test]
fn validate_accepts_a_well_formed_configuration_tree() {
    let dir = tempfile::tempdir().expect("tempdir");
    write_minimal_config(dir.path());
    validate(dir.path()).expect("validate");
}

#[test]
fn validate_rejects_a_directory_with_no_configuration() {
    let dir = tempfile::tempdir().expect("tempdir");
    let err = validate(dir.path()).expect_err("empty directory should not validate");
    assert!(matches!(err, CliError::Config(_)));
}

#[test]
fn route_resolves_the_requested_data_type() {
    let dir = tempfile::tempdir().expect("tempdir");
    write_minimal_config(dir.path());
    route(dir.path(), None, Some("com.apex.trade".to_string())).expect("route");
}

#[tokio::test]
async fn evaluate_prints_a_report_for_a_matching_record() {
    let dir = tempfile::tempdir().expect("tempdir");
    write_minimal_config(dir.path());
    let record_path = dir.path().join("record.json");
    write_file(dir.path(), "record.json", "{\"currency\": \"USD\"}");

    evaluate(dir.path(), None, Some("com.apex.trade".to_string()), &record_path).await.expect("evaluate");
}
