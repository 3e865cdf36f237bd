// apex-drivers/src/filesystem.rs
// ============================================================================
// Module: FileSystem Driver
// Description: CSV/JSON/YAML/XML files addressed by a path template
//              (§4.4: "FileSystem: CSV/JSON/YAML/XML parsers; path
//              templates with substitution; optional file watching").
// ============================================================================

use std::collections::BTreeMap;
use std::path::PathBuf;

use apex_core::Record;
use apex_core::Value;
use async_trait::async_trait;

use crate::capabilities::Capabilities;
use crate::driver::DataSourceDriver;
use crate::error::DriverError;

/// The file format a dataset is parsed as.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileFormat {
    /// Comma-separated values, header row names the fields.
    Csv,
    /// A single JSON value or an array of objects.
    Json,
    /// A single YAML value or a sequence of mappings.
    Yaml,
    /// A flat XML document; each child element of the root becomes a
    /// row, and each of its own children becomes a field.
    Xml,
}

/// Where one dataset lives. `path_template` may contain `{key}`,
/// substituted with the resolve key before the path is opened.
#[derive(Debug, Clone)]
pub struct FileSystemSource {
    /// Path template, e.g. `"data/rates/{key}.json"`.
    pub path_template: String,
    /// Parser to apply to the file's contents.
    pub format: FileFormat,
    /// Root directory every resolved path must stay under, preventing a
    /// templated key from escaping via `../`.
    pub root: PathBuf,
    /// When the resolved file holds more than one row (a CSV file, a
    /// JSON/YAML array, a multi-element XML document), the field each
    /// row's key is matched against. `None` means the path template
    /// already pins down a single row (one file per key) and the first
    /// parsed row is returned as-is.
    pub key_field: Option<String>,
}

/// A driver that reads CSV/JSON/YAML/XML files named by a path
/// template. Every call re-reads from disk; there is no in-memory
/// cache at this layer (`apex-cache` sits in front of the lookup
/// executor for that).
#[derive(Debug, Clone, Default)]
pub struct FileSystemDriver {
    sources: BTreeMap<String, FileSystemSource>,
}

impl FileSystemDriver {
    /// Builds a driver from its declared dataset sources.
    #[must_use]
    pub fn new(sources: BTreeMap<String, FileSystemSource>) -> Self {
        Self { sources }
    }

    fn resolved_path(source: &FileSystemSource, key: &Value) -> Result<PathBuf, DriverError> {
        let rendered = source.path_template.replace("{key}", &key.render());
        let candidate = source.root.join(&rendered);
        let canonical_root = source.root.canonicalize().unwrap_or_else(|_| source.root.clone());
        let canonical_candidate = candidate
            .canonicalize()
            .map_err(|err| DriverError::NotFound { what: format!("{}: {err}", candidate.display()) })?;
        if !canonical_candidate.starts_with(&canonical_root) {
            return Err(DriverError::ParseError {
                message: format!("resolved path '{}' escapes dataset root", candidate.display()),
            });
        }
        Ok(canonical_candidate)
    }

    async fn parse_rows(path: &std::path::Path, format: FileFormat) -> Result<Vec<Record>, DriverError> {
        let contents = tokio::fs::read_to_string(path)
            .await
            .map_err(|err| DriverError::NotFound { what: format!("{}: {err}", path.display()) })?;
        match format {
            FileFormat::Json => {
                let value: serde_json::Value = serde_json::from_str(&contents)
                    .map_err(|err| DriverError::ParseError { message: err.to_string() })?;
                match value {
                    serde_json::Value::Array(items) => Ok(items.iter().map(Record::from_json).collect()),
                    other => Ok(vec![Record::from_json(&other)]),
                }
            }
            FileFormat::Yaml => {
                let value: serde_yaml::Value = serde_yaml::from_str(&contents)
                    .map_err(|err| DriverError::ParseError { message: err.to_string() })?;
                let as_json = serde_json::to_value(value)
                    .map_err(|err| DriverError::ParseError { message: err.to_string() })?;
                match as_json {
                    serde_json::Value::Array(items) => Ok(items.iter().map(Record::from_json).collect()),
                    other => Ok(vec![Record::from_json(&other)]),
                }
            }
            FileFormat::Csv => {
                let mut reader = csv::Reader::from_reader(contents.as_bytes());
                let headers = reader
                    .headers()
                    .map_err(|err| DriverError::ParseError { message: err.to_string() })?
                    .clone();
                let mut rows = Vec::new();
                for result in reader.records() {
                    let row = result.map_err(|err| DriverError::ParseError { message: err.to_string() })?;
                    let mut record = Record::new();
                    for (name, value) in headers.iter().zip(row.iter()) {
                        record
                            .set_path(name, Value::String(value.to_string()))
                            .map_err(|err| DriverError::ParseError { message: err.to_string() })?;
                    }
                    rows.push(record);
                }
                Ok(rows)
            }
            FileFormat::Xml => {
                let document = roxmltree::Document::parse(&contents)
                    .map_err(|err| DriverError::ParseError { message: err.to_string() })?;
                let mut rows = Vec::new();
                for row_element in document.root_element().children().filter(|n| n.is_element()) {
                    let mut record = Record::new();
                    for field in row_element.children().filter(|n| n.is_element()) {
                        let text = field.text().unwrap_or("").to_string();
                        record
                            .set_path(field.tag_name().name(), Value::String(text))
                            .map_err(|err| DriverError::ParseError { message: err.to_string() })?;
                    }
                    rows.push(record);
                }
                Ok(rows)
            }
        }
    }
}

#[async_trait]
impl DataSourceDriver for FileSystemDriver {
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
        let source = self
            .sources
            .get(dataset_ref)
            .ok_or_else(|| DriverError::NotFound { what: format!("filesystem dataset '{dataset_ref}'") })?;
        let path = Self::resolved_path(source, key)?;
        let rows = Self::parse_rows(&path, source.format).await?;
        match &source.key_field {
            Some(field) => Ok(rows.into_iter().find(|row| row.get(field).is_some_and(|v| v == key))),
            None => Ok(rows.into_iter().next()),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[tokio::test]
    async fn resolves_json_file_by_templated_key() {
        let dir = tempfile::tempdir().expect("tempdir");
        std::fs::write(dir.path().join("AAPL.json"), r#"{"symbol":"AAPL","price":180}"#).expect("write");
        let mut sources = BTreeMap::new();
        sources.insert(
            "prices".to_string(),
            FileSystemSource {
                path_template: "{key}.json".to_string(),
                format: FileFormat::Json,
                root: dir.path().to_path_buf(),
                key_field: None,
            },
        );
        let driver = FileSystemDriver::new(sources);
        let record = driver
            .resolve("prices", &Value::String("AAPL".to_string()), &Record::new())
            .await
            .expect("resolve")
            .expect("found");
        assert_eq!(record.get("price"), Some(&Value::Int64(180)));
    }

    #[tokio::test]
    async fn path_template_cannot_escape_dataset_root() {
        let dir = tempfile::tempdir().expect("tempdir");
        std::fs::write(dir.path().join("AAPL.json"), "{}").expect("write");
        let mut sources = BTreeMap::new();
        sources.insert(
            "prices".to_string(),
            FileSystemSource {
                path_template: "{key}".to_string(),
                format: FileFormat::Json,
                root: dir.path().to_path_buf(),
                key_field: None,
            },
        );
        let driver = FileSystemDriver::new(sources);
        let err = driver
            .resolve("prices", &Value::String("../../../etc/passwd".to_string()), &Record::new())
            .await
            .expect_err("escape rejected");
        assert!(matches!(err, DriverError::NotFound { .. } | DriverError::ParseError { .. }));
    }

    #[tokio::test]
    async fn resolves_csv_row_by_templated_key() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut file = std::fs::File::create(dir.path().join("instruments.csv")).expect("create");
        writeln!(file, "symbol,exchange\nAAPL,NASDAQ\nVOD,LSE").expect("write");
        let mut sources = BTreeMap::new();
        sources.insert(
            "instruments".to_string(),
            FileSystemSource {
                path_template: "instruments.csv".to_string(),
                format: FileFormat::Csv,
                root: dir.path().to_path_buf(),
                key_field: Some("symbol".to_string()),
            },
        );
        let driver = FileSystemDriver::new(sources);
        let record = driver
            .resolve("instruments", &Value::String("VOD".to_string()), &Record::new())
            .await
            .expect("resolve")
            .expect("found");
        assert_eq!(record.get("exchange"), Some(&Value::String("LSE".to_string())));
    }
}
