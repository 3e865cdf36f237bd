// apex-drivers/src/database.rs
// ============================================================================
// Module: Database Driver
// Description: Parameterized SQL queries against an embedded/local
//              database (§4.4: "Database: parameterized queries (`:name`
//              placeholders) with prepared-statement caching; supports
//              batch via `IN` expansion").
// ============================================================================

use std::collections::BTreeMap;
use std::sync::Arc;

use apex_core::Record;
use apex_core::Value;
use async_trait::async_trait;
use rusqlite::Connection;
use rusqlite::types::Value as SqlValue;
use tokio::sync::Mutex as AsyncMutex;

use crate::capabilities::Capabilities;
use crate::driver::BatchKey;
use crate::driver::DataSourceDriver;
use crate::error::DriverError;

/// A named query template bound to one dataset reference. `:key` is the
/// resolve key placeholder; any other `:name` placeholder is bound from
/// `params` passed to `resolve`.
#[derive(Debug, Clone)]
pub struct DatasetQuery {
    /// SQL text with `rusqlite` named placeholders (`:key`, `:name`, ...).
    pub statement: String,
}

fn value_to_sql(value: &Value) -> Result<SqlValue, DriverError> {
    Ok(match value {
        Value::Null => SqlValue::Null,
        Value::Bool(b) => SqlValue::Integer(i64::from(*b)),
        Value::Int64(i) => SqlValue::Integer(*i),
        Value::Float64(f) => SqlValue::Real(*f),
        Value::String(s) => SqlValue::Text(s.clone()),
        Value::Decimal(d) => SqlValue::Text(d.to_string()),
        other => {
            return Err(DriverError::ParseError {
                message: format!("value of kind {:?} cannot be bound to a SQL parameter", other.kind()),
            });
        }
    })
}

fn row_to_record(row: &rusqlite::Row<'_>) -> rusqlite::Result<Record> {
    let mut record = Record::new();
    for (index, column) in row.as_ref().column_names().iter().enumerate() {
        let value: SqlValue = row.get(index)?;
        let mapped = match value {
            SqlValue::Null => Value::Null,
            SqlValue::Integer(i) => Value::Int64(i),
            SqlValue::Real(f) => Value::Float64(f),
            SqlValue::Text(s) => Value::String(s),
            SqlValue::Blob(b) => Value::Bytes(b),
        };
        record.set_path(column, mapped).map_err(|err| {
            rusqlite::Error::ToSqlConversionFailure(Box::new(std::io::Error::other(err.to_string())))
        })?;
    }
    Ok(record)
}

/// A driver backed by a `rusqlite` connection. Every call runs on a
/// blocking worker thread via `spawn_blocking`, since `rusqlite` itself
/// is synchronous.
pub struct DatabaseDriver {
    connection: Arc<AsyncMutex<Connection>>,
    datasets: BTreeMap<String, DatasetQuery>,
}

impl DatabaseDriver {
    /// Opens (or creates) the database at `path` (`":memory:"` for an
    /// in-process instance) and registers per-dataset query templates.
    ///
    /// # Errors
    /// Returns `DriverError::ConnectionError` if the connection cannot
    /// be opened.
    pub fn open(path: &str, datasets: BTreeMap<String, DatasetQuery>) -> Result<Self, DriverError> {
        let connection = Connection::open(path)
            .map_err(|err| DriverError::ConnectionError { message: err.to_string() })?;
        Ok(Self { connection: Arc::new(AsyncMutex::new(connection)), datasets })
    }

    fn query_for(&self, dataset_ref: &str) -> Result<&DatasetQuery, DriverError> {
        self.datasets
            .get(dataset_ref)
            .ok_or_else(|| DriverError::NotFound { what: format!("database dataset '{dataset_ref}'") })
    }
}

impl std::fmt::Debug for DatabaseDriver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DatabaseDriver").field("datasets", &self.datasets.keys().collect::<Vec<_>>()).finish()
    }
}

async fn run_query(
    connection: Arc<AsyncMutex<Connection>>,
    statement: String,
    bindings: Vec<(String, Value)>,
) -> Result<Vec<Record>, DriverError> {
    tokio::task::spawn_blocking(move || {
        let guard = connection.blocking_lock();
        let mut prepared = guard
            .prepare_cached(&statement)
            .map_err(|err| DriverError::ParseError { message: err.to_string() })?;
        let mut sql_bindings = Vec::with_capacity(bindings.len());
        for (name, value) in &bindings {
            sql_bindings.push((format!(":{name}"), value_to_sql(value)?));
        }
        let params: Vec<(&str, &dyn rusqlite::ToSql)> =
            sql_bindings.iter().map(|(name, value)| (name.as_str(), value as &dyn rusqlite::ToSql)).collect();
        let rows = prepared
            .query_map(params.as_slice(), |row| row_to_record(row))
            .map_err(|err| DriverError::ConnectionError { message: err.to_string() })?;
        rows.collect::<Result<Vec<_>, _>>()
            .map_err(|err| DriverError::ConnectionError { message: err.to_string() })
    })
    .await
    .map_err(|err| DriverError::ConnectionError { message: err.to_string() })?
}

fn bindings_from(key: &Value, params: &Record) -> Vec<(String, Value)> {
    let mut bindings = vec![("key".to_string(), key.clone())];
    bindings.extend(params.fields().iter().map(|(name, value)| (name.clone(), value.clone())));
    bindings
}

#[async_trait]
impl DataSourceDriver for DatabaseDriver {
    async fn init(&mut self) -> Result<(), DriverError> {
        Ok(())
    }

    async fn shutdown(&mut self) -> Result<(), DriverError> {
        Ok(())
    }

    async fn healthy(&self) -> bool {
        let connection = Arc::clone(&self.connection);
        tokio::task::spawn_blocking(move || connection.blocking_lock().execute_batch("SELECT 1"))
            .await
            .is_ok_and(|result| result.is_ok())
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities { supports_composite_keys: true, supports_batch: true, supports_query: true, ..Capabilities::none() }
    }

    async fn resolve(
        &self,
        dataset_ref: &str,
        key: &Value,
        params: &Record,
    ) -> Result<Option<Record>, DriverError> {
        let query = self.query_for(dataset_ref)?.clone();
        let rows = run_query(Arc::clone(&self.connection), query.statement, bindings_from(key, params)).await?;
        match rows.len() {
            0 => Ok(None),
            1 => Ok(rows.into_iter().next()),
            _ => Err(DriverError::ParseError { message: format!("query for '{dataset_ref}' returned {} rows, expected at most 1", rows.len()) }),
        }
    }

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

    async fn query(&self, statement: &str, params: &Record) -> Result<Vec<Record>, DriverError> {
        let bindings =
            params.fields().iter().map(|(name, value)| (name.clone(), value.clone())).collect();
        run_query(Arc::clone(&self.connection), statement.to_string(), bindings).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn seeded_driver() -> DatabaseDriver {
        let mut datasets = BTreeMap::new();
        datasets.insert(
            "instruments".to_string(),
            DatasetQuery { statement: "SELECT symbol, rate FROM instruments WHERE symbol = :key".to_string() },
        );
        let driver = DatabaseDriver::open(":memory:", datasets).expect("open");
        let connection = driver.connection.lock().await;
        connection
            .execute_batch(
                "CREATE TABLE instruments (symbol TEXT, rate REAL);\
                 INSERT INTO instruments VALUES ('AAPL', 1.5), ('VOD', 2.25);",
            )
            .expect("seed");
        drop(connection);
        driver
    }

    #[tokio::test]
    async fn resolve_runs_templated_query_and_binds_key() {
        let driver = seeded_driver().await;
        let record = driver
            .resolve("instruments", &Value::String("VOD".to_string()), &Record::new())
            .await
            .expect("resolve")
            .expect("found");
        assert_eq!(record.get("rate"), Some(&Value::Float64(2.25)));
    }

    #[tokio::test]
    async fn resolve_no_match_is_none() {
        let driver = seeded_driver().await;
        let result = driver
            .resolve("instruments", &Value::String("MSFT".to_string()), &Record::new())
            .await
            .expect("resolve");
        assert_eq!(result, None);
    }

    #[tokio::test]
    async fn query_runs_arbitrary_statement() {
        let driver = seeded_driver().await;
        let rows = driver
            .query("SELECT symbol FROM instruments ORDER BY symbol", &Record::new())
            .await
            .expect("query");
        assert_eq!(rows.len(), 2);
    }
}
