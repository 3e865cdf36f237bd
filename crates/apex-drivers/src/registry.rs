// apex-drivers/src/registry.rs
// ============================================================================
// Module: Driver Registry
// Description: Resolves a configured data source by its identifier and
//              dispatches calls to the matching driver instance.
// Purpose: Give the lookup executor one place to ask "the driver named
//          X" without knowing which concrete driver kind backs it.
// ============================================================================

use std::collections::BTreeMap;

use apex_core::DataSourceId;
use apex_core::Record;
use apex_core::Value;

use crate::capabilities::Capabilities;
use crate::driver::DataSourceDriver;
use crate::driver::FilterSpec;
use crate::error::DriverError;

/// Holds every configured data source driver, keyed by the
/// [`DataSourceId`] named in `data-sources` config.
///
/// # Invariants
/// - Data source identifiers are unique within a registry.
pub struct DriverRegistry {
    drivers: BTreeMap<DataSourceId, Box<dyn DataSourceDriver>>,
}

impl Default for DriverRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl DriverRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self { drivers: BTreeMap::new() }
    }

    /// Registers a driver under `data_source_id`.
    ///
    /// # Errors
    /// Returns `DriverError::ConnectionError` if the identifier is
    /// already registered.
    pub fn register(
        &mut self,
        data_source_id: DataSourceId,
        driver: Box<dyn DataSourceDriver>,
    ) -> Result<(), DriverError> {
        if self.drivers.contains_key(&data_source_id) {
            return Err(DriverError::ConnectionError {
                message: format!("data source '{data_source_id}' already registered"),
            });
        }
        self.drivers.insert(data_source_id, driver);
        Ok(())
    }

    /// Initializes every registered driver. Called once at engine
    /// startup and on every config reload.
    ///
    /// # Errors
    /// Returns the first `DriverError` encountered; initialization does
    /// not continue past the first failure.
    pub async fn init_all(&mut self) -> Result<(), DriverError> {
        for driver in self.drivers.values_mut() {
            driver.init().await?;
        }
        Ok(())
    }

    /// Shuts down every registered driver, continuing past individual
    /// failures so a stuck driver cannot block the others from
    /// releasing their resources.
    pub async fn shutdown_all(&mut self) {
        for (data_source_id, driver) in &mut self.drivers {
            if let Err(err) = driver.shutdown().await {
                tracing::warn!(%data_source_id, %err, "driver shutdown failed");
            }
        }
    }

    fn driver(&self, data_source_id: &DataSourceId) -> Result<&dyn DataSourceDriver, DriverError> {
        self.drivers
            .get(data_source_id)
            .map(std::convert::AsRef::as_ref)
            .ok_or_else(|| DriverError::NotFound { what: format!("data source '{data_source_id}'") })
    }

    /// The capability flags the named driver declares.
    ///
    /// # Errors
    /// Returns `DriverError::NotFound` if no driver is registered under
    /// `data_source_id`.
    pub fn capabilities(&self, data_source_id: &DataSourceId) -> Result<Capabilities, DriverError> {
        Ok(self.driver(data_source_id)?.capabilities())
    }

    /// Resolves a key against the named driver.
    ///
    /// # Errors
    /// Returns `DriverError::NotFound` if no driver is registered under
    /// `data_source_id`, or the underlying driver's own error.
    pub async fn resolve(
        &self,
        data_source_id: &DataSourceId,
        dataset_ref: &str,
        key: &Value,
        params: &Record,
    ) -> Result<Option<Record>, DriverError> {
        self.driver(data_source_id)?.resolve(dataset_ref, key, params).await
    }

    /// Applies a server-side filter against the named driver.
    ///
    /// # Errors
    /// Returns `DriverError::NotFound` if no driver is registered under
    /// `data_source_id`, or the underlying driver's own error (including
    /// its default rejection when it does not support filtering).
    pub async fn resolve_filtered(
        &self,
        data_source_id: &DataSourceId,
        dataset_ref: &str,
        filter: &FilterSpec,
        params: &Record,
    ) -> Result<Vec<Record>, DriverError> {
        self.driver(data_source_id)?.resolve_filtered(dataset_ref, filter, params).await
    }

    /// Reports whether every registered driver is currently healthy.
    pub async fn all_healthy(&self) -> bool {
        for driver in self.drivers.values() {
            if !driver.healthy().await {
                return false;
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap as StdBTreeMap;

    use super::*;
    use crate::inline::InlineDataset;
    use crate::inline::InlineDriver;

    fn registry_with_one_inline_source() -> DriverRegistry {
        let mut rows = StdBTreeMap::new();
        rows.insert(
            "currencies".to_string(),
            InlineDataset { key_field: "currency".to_string(), rows: Vec::new() },
        );
        let mut registry = DriverRegistry::new();
        registry
            .register(DataSourceId::from("currencies-inline"), Box::new(InlineDriver::new(rows)))
            .expect("register");
        registry
    }

    #[test]
    fn registering_a_duplicate_identifier_fails() {
        let mut rows = StdBTreeMap::new();
        rows.insert(
            "currencies".to_string(),
            InlineDataset { key_field: "currency".to_string(), rows: Vec::new() },
        );
        let mut registry = registry_with_one_inline_source();
        let err = registry
            .register(DataSourceId::from("currencies-inline"), Box::new(InlineDriver::new(rows)))
            .expect_err("duplicate");
        assert!(matches!(err, DriverError::ConnectionError { .. }));
    }

    #[tokio::test]
    async fn resolve_against_unknown_data_source_is_not_found() {
        let registry = registry_with_one_inline_source();
        let err = registry
            .resolve(&DataSourceId::from("missing"), "currencies", &Value::Null, &Record::new())
            .await
            .expect_err("not found");
        assert!(matches!(err, DriverError::NotFound { .. }));
    }

    #[tokio::test]
    async fn all_healthy_is_true_for_inline_drivers() {
        let registry = registry_with_one_inline_source();
        assert!(registry.all_healthy().await);
    }
}
