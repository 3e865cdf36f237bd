// apex-drivers/src/queue.rs
// ============================================================================
// Module: Queue Driver
// Description: A pop-style read-through buffer for streaming enrichment
//              (§4.4: "Queue (read-through buffer): pop-style consumption
//              for streaming enrichment; not all enrichments support
//              queues").
// ============================================================================

use std::collections::BTreeMap;
use std::collections::VecDeque;

use apex_core::Record;
use apex_core::Value;
use async_trait::async_trait;
use tokio::sync::Mutex as AsyncMutex;

use crate::capabilities::Capabilities;
use crate::driver::DataSourceDriver;
use crate::error::DriverError;

/// An in-process FIFO buffer keyed by dataset reference. `resolve`
/// ignores the supplied key and pops the next record; a queue has no
/// notion of "look this key up", only "give me the next item". Callers
/// that need keyed access should use a different driver kind.
#[derive(Debug, Default)]
pub struct QueueDriver {
    queues: AsyncMutex<BTreeMap<String, VecDeque<Record>>>,
}

impl QueueDriver {
    /// Builds a driver from its initial per-queue contents.
    #[must_use]
    pub fn new(queues: BTreeMap<String, VecDeque<Record>>) -> Self {
        Self { queues: AsyncMutex::new(queues) }
    }

    /// Pushes a record onto the back of `dataset_ref`'s queue, creating
    /// it if it does not yet exist. Used by producers feeding a
    /// streaming enrichment; not part of the `DataSourceDriver` contract
    /// itself.
    pub async fn push(&self, dataset_ref: &str, record: Record) {
        self.queues.lock().await.entry(dataset_ref.to_string()).or_default().push_back(record);
    }

    /// The number of records currently buffered for `dataset_ref`.
    pub async fn len(&self, dataset_ref: &str) -> usize {
        self.queues.lock().await.get(dataset_ref).map_or(0, VecDeque::len)
    }
}

#[async_trait]
impl DataSourceDriver for QueueDriver {
    async fn init(&mut self) -> Result<(), DriverError> {
        Ok(())
    }

    async fn shutdown(&mut self) -> Result<(), DriverError> {
        self.queues.lock().await.clear();
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
        _key: &Value,
        _params: &Record,
    ) -> Result<Option<Record>, DriverError> {
        Ok(self.queues.lock().await.get_mut(dataset_ref).and_then(VecDeque::pop_front))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn resolve_pops_records_in_fifo_order() {
        let driver = QueueDriver::default();
        let mut first = Record::new();
        first.set_path("seq", Value::Int64(1)).expect("write");
        let mut second = Record::new();
        second.set_path("seq", Value::Int64(2)).expect("write");
        driver.push("events", first).await;
        driver.push("events", second).await;

        let popped_first =
            driver.resolve("events", &Value::Null, &Record::new()).await.expect("resolve").expect("some");
        let popped_second =
            driver.resolve("events", &Value::Null, &Record::new()).await.expect("resolve").expect("some");
        assert_eq!(popped_first.get("seq"), Some(&Value::Int64(1)));
        assert_eq!(popped_second.get("seq"), Some(&Value::Int64(2)));
    }

    #[tokio::test]
    async fn resolve_on_empty_queue_is_none() {
        let driver = QueueDriver::default();
        driver.push("events", Record::new()).await;
        driver.resolve("events", &Value::Null, &Record::new()).await.expect("resolve");
        let result = driver.resolve("events", &Value::Null, &Record::new()).await.expect("resolve");
        assert_eq!(result, None);
    }
}
