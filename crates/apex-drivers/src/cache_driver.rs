// apex-drivers/src/cache_driver.rs
// ============================================================================
// Module: Cache Driver
// Description: Exposes a keyed cache as a data source in its own right
//              (§4.4: "Cache: direct lookup using key patterns; used as
//              a source rather than accelerator").
// ============================================================================

use std::sync::Arc;

use apex_cache::Cache;
use apex_core::Record;
use apex_core::Value;
use async_trait::async_trait;

use crate::capabilities::Capabilities;
use crate::driver::DataSourceDriver;
use crate::error::DriverError;

/// Reads a `Record` straight out of a cache keyed by `{dataset_ref}:{key}`.
/// Unlike every other driver, a miss here really does mean "no value was
/// ever written", not "go fetch it" — this driver never populates the
/// cache itself.
pub struct CacheSourceDriver {
    cache: Arc<Cache>,
}

impl std::fmt::Debug for CacheSourceDriver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheSourceDriver").finish()
    }
}

impl CacheSourceDriver {
    /// Wraps an already-configured [`Cache`] as a driver.
    #[must_use]
    pub fn new(cache: Arc<Cache>) -> Self {
        Self { cache }
    }

    fn cache_key(dataset_ref: &str, key: &Value) -> String {
        format!("{dataset_ref}:{}", key.render())
    }
}

#[async_trait]
impl DataSourceDriver for CacheSourceDriver {
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
        Capabilities::none()
    }

    async fn resolve(
        &self,
        dataset_ref: &str,
        key: &Value,
        _params: &Record,
    ) -> Result<Option<Record>, DriverError> {
        let cache_key = Self::cache_key(dataset_ref, key);
        self.cache
            .resolve::<_, std::future::Ready<Result<Option<Record>, DriverError>>, DriverError>(
                &cache_key,
                || std::future::ready(Ok(None)),
            )
            .await
    }
}

#[cfg(test)]
mod tests {
    use apex_cache::CachePolicy;

    use super::*;

    #[tokio::test]
    async fn resolve_reads_a_prepopulated_key() {
        let cache = Arc::new(Cache::new(CachePolicy::default(), None));
        let mut record = Record::new();
        record.set_path("rate", Value::Int64(42)).expect("write");
        cache
            .resolve::<_, std::future::Ready<Result<Option<Record>, DriverError>>, DriverError>(
                "rates:USD",
                || std::future::ready(Ok(Some(record.clone()))),
            )
            .await
            .expect("prime");

        let driver = CacheSourceDriver::new(Arc::clone(&cache));
        let resolved = driver
            .resolve("rates", &Value::String("USD".to_string()), &Record::new())
            .await
            .expect("resolve")
            .expect("found");
        assert_eq!(resolved.get("rate"), Some(&Value::Int64(42)));
    }

    #[tokio::test]
    async fn resolve_never_populates_on_miss() {
        let cache = Arc::new(Cache::new(CachePolicy::default(), None));
        let driver = CacheSourceDriver::new(Arc::clone(&cache));
        let resolved =
            driver.resolve("rates", &Value::String("EUR".to_string()), &Record::new()).await.expect("resolve");
        assert_eq!(resolved, None);
    }
}
