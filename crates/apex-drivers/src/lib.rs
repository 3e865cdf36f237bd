// apex-drivers/src/lib.rs
// ============================================================================
// Module: APEX Data Source Drivers
// Description: The `DataSourceDriver` trait, its capability flags, the
//              closed set of built-in drivers, and the registry that
//              resolves a configured data source by identifier (§4.4).
// Purpose: Give the lookup executor one uniform way to call out to any
//          backing store without knowing which concrete kind it is.
// Dependencies: apex-cache, apex-core, apex-resilience, async-trait, csv,
//               reqwest, roxmltree, rusqlite, serde_json, serde_yaml
// ============================================================================

//! ## Overview
//! `apex-drivers` owns everything that talks to the outside world on
//! behalf of a lookup: the [`DataSourceDriver`] trait every concrete
//! driver implements, the [`Capabilities`] flags a driver declares, the
//! seven built-in driver kinds (Inline, YamlFile, Database, RestApi,
//! FileSystem, Cache, Queue), and the [`DriverRegistry`] that resolves a
//! configured data source by its [`apex_core::DataSourceId`]. Key
//! construction and expression evaluation never happen here — drivers
//! only ever receive an already-resolved key and a params record.

#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used))]

pub mod cache_driver;
pub mod capabilities;
pub mod database;
pub mod driver;
pub mod error;
pub mod filesystem;
pub mod inline;
pub mod queue;
pub mod registry;
pub mod rest;
pub mod yaml_file;

pub use cache_driver::CacheSourceDriver;
pub use capabilities::Capabilities;
pub use database::DatabaseDriver;
pub use database::DatasetQuery;
pub use driver::BatchKey;
pub use driver::DataSourceDriver;
pub use driver::FilterSpec;
pub use error::DriverError;
pub use filesystem::FileFormat;
pub use filesystem::FileSystemDriver;
pub use filesystem::FileSystemSource;
pub use inline::InlineDataset;
pub use inline::InlineDriver;
pub use queue::QueueDriver;
pub use registry::DriverRegistry;
pub use rest::AuthSelector;
pub use rest::RestApiDriver;
pub use rest::RestEndpoint;
pub use yaml_file::YamlFileDriver;
pub use yaml_file::YamlFileSource;
