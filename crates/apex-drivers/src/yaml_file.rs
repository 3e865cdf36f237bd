// apex-drivers/src/yaml_file.rs
// ============================================================================
// Module: YamlFile Driver
// Description: Loads a dataset once from a YAML file on disk (§4.4:
//              "YamlFile: loads once (with optional watch); supports
//              filter predicates").
// ============================================================================

use std::collections::BTreeMap;
use std::path::PathBuf;

use apex_core::Record;
use apex_core::Value;
use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::capabilities::Capabilities;
use crate::driver::DataSourceDriver;
use crate::driver::FilterSpec;
use crate::error::DriverError;

/// Where a single dataset lives on disk and which field its key is read
/// from.
#[derive(Debug, Clone)]
pub struct YamlFileSource {
    /// Path to the YAML file. Its top level must be a sequence of maps.
    pub path: PathBuf,
    /// The field each row's resolve key is matched against.
    pub key_field: String,
}

/// A driver backed by one or more YAML files, loaded fully into memory
/// on [`init`](DataSourceDriver::init) and held until the driver is
/// recreated (watch/reload is the config loader's concern, not this
/// driver's).
#[derive(Debug)]
pub struct YamlFileDriver {
    sources: BTreeMap<String, YamlFileSource>,
    loaded: RwLock<BTreeMap<String, Vec<Record>>>,
}

impl YamlFileDriver {
    /// Builds a driver from its declared dataset sources. Nothing is
    /// read from disk until [`init`](DataSourceDriver::init) runs.
    #[must_use]
    pub fn new(sources: BTreeMap<String, YamlFileSource>) -> Self {
        Self { sources, loaded: RwLock::new(BTreeMap::new()) }
    }

    async fn load_one(source: &YamlFileSource) -> Result<Vec<Record>, DriverError> {
        let contents = tokio::fs::read_to_string(&source.path).await.map_err(|err| {
            DriverError::NotFound { what: format!("{}: {err}", source.path.display()) }
        })?;
        let rows: Vec<serde_json::Value> =
            serde_yaml::from_str::<Vec<serde_yaml::Value>>(&contents)
                .map_err(|err| DriverError::ParseError { message: err.to_string() })?
                .into_iter()
                .map(|value| {
                    serde_json::to_value(value)
                        .map_err(|err| DriverError::ParseError { message: err.to_string() })
                })
                .collect::<Result<_, _>>()?;
        Ok(rows.iter().map(Record::from_json).collect())
    }
}

fn matches_filter(row: &Record, filter: &FilterSpec) -> bool {
    row.get_path(&filter.field).is_some_and(|value| match filter.operator.as_str() {
        "==" => *value == filter.value,
        "!=" => *value != filter.value,
        _ => false,
    })
}

#[async_trait]
impl DataSourceDriver for YamlFileDriver {
    async fn init(&mut self) -> Result<(), DriverError> {
        let mut loaded = BTreeMap::new();
        for (dataset_ref, source) in &self.sources {
            loaded.insert(dataset_ref.clone(), Self::load_one(source).await?);
        }
        self.loaded = RwLock::new(loaded);
        Ok(())
    }

    async fn shutdown(&mut self) -> Result<(), DriverError> {
        self.loaded.write().await.clear();
        Ok(())
    }

    async fn healthy(&self) -> bool {
        !self.loaded.read().await.is_empty() || self.sources.is_empty()
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities { supports_filter: true, ..Capabilities::none() }
    }

    async fn resolve(
        &self,
        dataset_ref: &str,
        key: &Value,
        _params: &Record,
    ) -> Result<Option<Record>, DriverError> {
        let source = self.sources.get(dataset_ref).ok_or_else(|| DriverError::NotFound {
            what: format!("yaml-file dataset '{dataset_ref}'"),
        })?;
        let loaded = self.loaded.read().await;
        let rows = loaded.get(dataset_ref).map_or(&[][..], Vec::as_slice);
        Ok(rows.iter().find(|row| row.get(&source.key_field).is_some_and(|v| v == key)).cloned())
    }

    async fn resolve_filtered(
        &self,
        dataset_ref: &str,
        filter: &FilterSpec,
        _params: &Record,
    ) -> Result<Vec<Record>, DriverError> {
        if !self.sources.contains_key(dataset_ref) {
            return Err(DriverError::NotFound { what: format!("yaml-file dataset '{dataset_ref}'") });
        }
        let loaded = self.loaded.read().await;
        let rows = loaded.get(dataset_ref).map_or(&[][..], Vec::as_slice);
        Ok(rows.iter().filter(|row| matches_filter(row, filter)).cloned().collect())
    }
}
