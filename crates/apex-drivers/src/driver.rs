// apex-drivers/src/driver.rs
// ============================================================================
// Module: DataSourceDriver
// Description: The common contract every data source driver implements
//              (§4.4: init, shutdown, healthy, resolve, batch_resolve,
//              query).
// ============================================================================

use std::collections::BTreeMap;

use apex_core::Record;
use apex_core::Value;
use async_trait::async_trait;

use crate::capabilities::Capabilities;
use crate::error::DriverError;

/// A filter predicate a driver is asked to apply, when
/// [`Capabilities::supports_filter`] is set. `apex-lookup` compiles the
/// declarative filter expression down to this shape; drivers that accept
/// it translate it into their own query language.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterSpec {
    /// The field being filtered on.
    pub field: String,
    /// The operator, e.g. `"=="`, `">"`, `"in"`.
    pub operator: String,
    /// The value being compared against.
    pub value: Value,
}

/// A single resolved key, used by [`DataSourceDriver::batch_resolve`] to
/// pair each input key with its (possibly absent) record.
pub type BatchKey = Value;

/// Common contract every data source driver implements (§4.4).
///
/// A driver is stateful (it owns a connection, an open file handle, or a
/// client) but is otherwise opaque to the rest of the engine: the lookup
/// executor only ever calls through this trait.
#[async_trait]
pub trait DataSourceDriver: Send + Sync {
    /// Initializes the driver against its configuration. Called once at
    /// engine startup (or config reload) before any `resolve` call.
    ///
    /// # Errors
    /// Returns `DriverError` if the driver cannot establish its
    /// connection, open its file, or validate its configuration.
    async fn init(&mut self) -> Result<(), DriverError>;

    /// Releases any held resources. Called on engine shutdown or before
    /// a config reload replaces this driver instance.
    ///
    /// # Errors
    /// Returns `DriverError` if cleanup fails; callers log and continue.
    async fn shutdown(&mut self) -> Result<(), DriverError>;

    /// Reports whether the driver is currently able to serve requests.
    async fn healthy(&self) -> bool;

    /// The capability flags this driver instance supports.
    fn capabilities(&self) -> Capabilities;

    /// Resolves a single key against `dataset_ref`, e.g. a table name, a
    /// file path, or an endpoint path, depending on the driver kind.
    /// `params` carries any additional bound fields the lookup needs
    /// (composite key components, bind variables).
    ///
    /// Returns `Ok(None)` when the dataset has no matching record; that
    /// is not an error, it is the normal "not found" outcome the missing
    /// data policy acts on. `Err` is reserved for failures of the driver
    /// itself (§4.4).
    ///
    /// # Errors
    /// Returns `DriverError` on connection, auth, timeout, or parse
    /// failure.
    async fn resolve(
        &self,
        dataset_ref: &str,
        key: &Value,
        params: &Record,
    ) -> Result<Option<Record>, DriverError>;

    /// Resolves many keys at once. The default implementation loops over
    /// [`resolve`](Self::resolve) one key at a time; drivers that declare
    /// [`Capabilities::supports_batch`] should override this with a real
    /// batched call.
    ///
    /// # Errors
    /// Returns `DriverError` if any individual resolve fails.
    async fn batch_resolve(
        &self,
        dataset_ref: &str,
        keys: &[BatchKey],
        params: &Record,
    ) -> Result<BTreeMap<String, Option<Record>>, DriverError> {
        let mut results = BTreeMap::new();
        for key in keys {
            let resolved = self.resolve(dataset_ref, key, params).await?;
            results.insert(key.render(), resolved);
        }
        Ok(results)
    }

    /// Runs an arbitrary query, for drivers that declare
    /// [`Capabilities::supports_query`]. The default implementation
    /// rejects every call; only drivers that override it (e.g. Database)
    /// support this operation.
    ///
    /// # Errors
    /// Returns `DriverError::ConnectionError` by default. Overriding
    /// drivers return `DriverError::ParseError` for a malformed
    /// statement, or propagate the underlying failure.
    async fn query(
        &self,
        _statement: &str,
        _params: &Record,
    ) -> Result<Vec<Record>, DriverError> {
        Err(DriverError::ConnectionError {
            message: "this driver does not support query()".to_string(),
        })
    }

    /// An optional filter applied server-side, for drivers that declare
    /// [`Capabilities::supports_filter`]. The default rejects the call;
    /// `apex-lookup` only invokes this when the capability flag is set.
    ///
    /// # Errors
    /// Returns `DriverError::ConnectionError` by default.
    async fn resolve_filtered(
        &self,
        _dataset_ref: &str,
        _filter: &FilterSpec,
        _params: &Record,
    ) -> Result<Vec<Record>, DriverError> {
        Err(DriverError::ConnectionError {
            message: "this driver does not support server-side filtering".to_string(),
        })
    }
}
