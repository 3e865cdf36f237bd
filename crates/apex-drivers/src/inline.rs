// apex-drivers/src/inline.rs
// ============================================================================
// Module: Inline Driver
// Description: A constant, in-memory dataset declared directly in config
//              (§4.4: "Inline: constant, cached; supports filter
//              predicates and composite keys").
// ============================================================================

use std::collections::BTreeMap;

use apex_core::Record;
use apex_core::Value;
use async_trait::async_trait;

use crate::capabilities::Capabilities;
use crate::driver::DataSourceDriver;
use crate::driver::FilterSpec;
use crate::error::DriverError;

/// One named dataset held by an [`InlineDriver`]: a fixed row set and
/// the field a resolve key is matched against.
#[derive(Debug, Clone)]
pub struct InlineDataset {
    /// The field name a `resolve` key is compared against. For a
    /// composite key, the executor has already joined the components
    /// into a single string before calling the driver.
    pub key_field: String,
    /// The dataset's rows, declared in config.
    pub rows: Vec<Record>,
}

/// A driver whose data is embedded directly in configuration rather than
/// fetched from an external system. Never fails to connect; `resolve`
/// is a linear scan since datasets are expected to be small.
#[derive(Debug, Clone, Default)]
pub struct InlineDriver {
    datasets: BTreeMap<String, InlineDataset>,
}

impl InlineDriver {
    /// Builds a driver from its declared datasets.
    #[must_use]
    pub fn new(datasets: BTreeMap<String, InlineDataset>) -> Self {
        Self { datasets }
    }

    fn dataset(&self, dataset_ref: &str) -> Result<&InlineDataset, DriverError> {
        self.datasets.get(dataset_ref).ok_or_else(|| DriverError::NotFound {
            what: format!("inline dataset '{dataset_ref}'"),
        })
    }
}

fn matches_filter(row: &Record, filter: &FilterSpec) -> bool {
    let Some(field_value) = row.get_path(&filter.field) else {
        return false;
    };
    match filter.operator.as_str() {
        "==" => *field_value == filter.value,
        "!=" => *field_value != filter.value,
        _ => false,
    }
}

#[async_trait]
impl DataSourceDriver for InlineDriver {
    async fn init(&mut self) -> Result<(), DriverError> {
        Ok(())
    }

    async fn shutdown(&mut self) -> Result<(), DriverError> {
        Ok(())
    }

    async fn healthy(&self) -> bool {
        true
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities { supports_composite_keys: true, supports_filter: true, ..Capabilities::none() }
    }

    async fn resolve(
        &self,
        dataset_ref: &str,
        key: &Value,
        _params: &Record,
    ) -> Result<Option<Record>, DriverError> {
        let dataset = self.dataset(dataset_ref)?;
        let found = dataset
            .rows
            .iter()
            .find(|row| row.get(&dataset.key_field).is_some_and(|value| value == key));
        Ok(found.cloned())
    }

    async fn resolve_filtered(
        &self,
        dataset_ref: &str,
        filter: &FilterSpec,
        _params: &Record,
    ) -> Result<Vec<Record>, DriverError> {
        let dataset = self.dataset(dataset_ref)?;
        Ok(dataset.rows.iter().filter(|row| matches_filter(row, filter)).cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rows() -> Vec<Record> {
        let mut usd = Record::new();
        usd.set_path("currency", Value::String("USD".to_string())).expect("write");
        usd.set_path("rate", Value::Int64(1)).expect("write");
        let mut eur = Record::new();
        eur.set_path("currency", Value::String("EUR".to_string())).expect("write");
        eur.set_path("rate", Value::Int64(2)).expect("write");
        vec![usd, eur]
    }

    fn driver() -> InlineDriver {
        let mut datasets = BTreeMap::new();
        datasets.insert(
            "currencies".to_string(),
            InlineDataset { key_field: "currency".to_string(), rows: rows() },
        );
        InlineDriver::new(datasets)
    }

    #[tokio::test]
    async fn resolve_finds_matching_row_by_key_field() {
        let driver = driver();
        let record = driver
            .resolve("currencies", &Value::String("EUR".to_string()), &Record::new())
            .await
            .expect("resolve")
            .expect("found");
        assert_eq!(record.get("rate"), Some(&Value::Int64(2)));
    }

    #[tokio::test]
    async fn resolve_missing_key_is_none_not_error() {
        let driver = driver();
        let result = driver
            .resolve("currencies", &Value::String("GBP".to_string()), &Record::new())
            .await
            .expect("resolve");
        assert_eq!(result, None);
    }

    #[tokio::test]
    async fn resolve_against_unknown_dataset_is_not_found() {
        let driver = driver();
        let err = driver
            .resolve("missing", &Value::String("USD".to_string()), &Record::new())
            .await
            .expect_err("not found");
        assert!(matches!(err, DriverError::NotFound { .. }));
    }

    #[tokio::test]
    async fn resolve_filtered_applies_equality_predicate() {
        let driver = driver();
        let filter = FilterSpec {
            field: "currency".to_string(),
            operator: "==".to_string(),
            value: Value::String("USD".to_string()),
        };
        let rows = driver.resolve_filtered("currencies", &filter, &Record::new()).await.expect("filter");
        assert_eq!(rows.len(), 1);
    }
}
