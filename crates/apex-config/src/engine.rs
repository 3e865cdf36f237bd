// apex-config/src/engine.rs
// ============================================================================
// Module: Engine Wiring
// Description: The top-level `Engine`: loads configuration from a
//              directory, routes a request to a resolved scenario, runs
//              that scenario's enrichment pipeline and rule groups against
//              a record, and exposes cache invalidation (§6.2). Injected
//              collaborators (clock, metrics, audit, secrets) are supplied
//              via `EngineDeps` rather than reached for globally (§6.3).
// ============================================================================

use std::path::Path;
use std::sync::Arc;

use apex_cache::Cache;
use apex_cache::CachePolicy;
use apex_core::AuditSink;
use apex_core::Clock;
use apex_core::EvaluationContext;
use apex_core::MetricsSink;
use apex_core::NullAuditSink;
use apex_core::NullMetricsSink;
use apex_core::Record;
use apex_core::Report;
use apex_core::SecretProvider;
use apex_core::SystemClock;
use apex_drivers::DriverRegistry;
use apex_enrichment::EnrichmentPipeline;
use apex_lookup::LookupExecutor;
use apex_rules::RuleEngine;

use crate::error::ConfigError;
use crate::loader::ConfigLoader;
use crate::scenario;
use crate::scenario::ResolvedProgram;

/// Collaborators the engine is handed at construction time rather than
/// reaching for globally. `driver_registry` seeds the engine's registry
/// with whatever external drivers (database, rest-api, ...) the host
/// application already constructed; [`Engine::load_config`] then
/// registers the inline drivers a loaded configuration tree itself
/// declares on top of it. `Default` wires in no-op implementations
/// suitable for tests and for callers with no cache, metrics, or audit
/// backend configured yet.
pub struct EngineDeps {
    pub driver_registry: DriverRegistry,
    pub cache: Option<Arc<Cache>>,
    pub clock: Arc<dyn Clock>,
    pub metrics: Arc<dyn MetricsSink>,
    pub audit: Arc<dyn AuditSink>,
    pub secret_provider: Arc<dyn SecretProvider>,
}

impl Default for EngineDeps {
    fn default() -> Self {
        Self {
            driver_registry: DriverRegistry::new(),
            cache: None,
            clock: Arc::new(SystemClock),
            metrics: Arc::new(NullMetricsSink),
            audit: Arc::new(NullAuditSink),
            secret_provider: Arc::new(NoSecrets),
        }
    }
}

/// A [`SecretProvider`] that resolves nothing, used when no secret store
/// is wired. Any driver that actually needs a secret must be given a real
/// provider.
#[derive(Debug, Default, Clone, Copy)]
struct NoSecrets;

impl SecretProvider for NoSecrets {
    fn get(&self, reference: &str) -> Result<String, apex_core::collaborators::SecretError> {
        Err(apex_core::collaborators::SecretError::NotFound { reference: reference.to_string() })
    }
}

/// The outcome of evaluating one record against a resolved scenario: the
/// enrichment pipeline's per-node outcomes followed by the rule engine's
/// report.
#[derive(Debug)]
pub struct EvaluationResult {
    pub enrichment_outcomes: Vec<apex_lookup::LookupOutcome>,
    pub report: Report,
}

/// Loads configuration, routes requests to scenarios, and evaluates
/// records against them. One `Engine` owns one loaded configuration
/// snapshot; [`Engine::reload`] replaces it wholesale so a request never
/// observes a half-updated configuration.
pub struct Engine {
    driver_registry: Arc<DriverRegistry>,
    cache: Option<Arc<Cache>>,
    clock: Arc<dyn Clock>,
    metrics: Arc<dyn MetricsSink>,
    audit: Arc<dyn AuditSink>,
    secret_provider: Arc<dyn SecretProvider>,
    loader: ConfigLoader,
}

impl Engine {
    /// Loads every configuration file found (recursively) under `root`,
    /// registers every declared `inline` data source's driver on top of
    /// whatever external drivers `deps.driver_registry` already carries,
    /// and builds an engine over the result.
    ///
    /// # Errors
    /// Returns any `ConfigError` raised while loading or compiling a
    /// discovered file.
    pub fn load_config(root: &Path, mut deps: EngineDeps) -> Result<Self, ConfigError> {
        let loader = load_directory(root)?;
        loader.register_inline_drivers(&mut deps.driver_registry);
        tracing::debug!(root = %root.display(), rule_configs = loader.rule_configs.len(), "loaded configuration tree");
        Ok(Self {
            driver_registry: Arc::new(deps.driver_registry),
            cache: deps.cache,
            clock: deps.clock,
            metrics: deps.metrics,
            audit: deps.audit,
            secret_provider: deps.secret_provider,
            loader,
        })
    }

    /// Discards and reloads the entire configuration tree under `root`,
    /// re-seeding the driver registry from `deps` the same way
    /// [`load_config`](Self::load_config) does. All-or-nothing: on
    /// failure, the engine keeps running its previous configuration
    /// snapshot and driver registry.
    ///
    /// # Errors
    /// Returns any `ConfigError` raised while loading or compiling a
    /// discovered file; on error, `self` is left unmodified.
    pub fn reload(&mut self, root: &Path, mut deps: EngineDeps) -> Result<(), ConfigError> {
        let loader = load_directory(root)?;
        loader.register_inline_drivers(&mut deps.driver_registry);
        tracing::info!(root = %root.display(), "configuration reloaded");
        self.driver_registry = Arc::new(deps.driver_registry);
        self.cache = deps.cache;
        self.clock = deps.clock;
        self.metrics = deps.metrics;
        self.audit = deps.audit;
        self.secret_provider = deps.secret_provider;
        self.loader = loader;
        Ok(())
    }

    /// Routes a request to the scenario matching `requested_id` or
    /// `requested_data_type`, per §4.9's precedence.
    ///
    /// # Errors
    /// Returns `ConfigError::ScenarioNotFound` if neither resolves, and no
    /// `default` scenario is registered. Returns `ConfigError::Io`-shaped
    /// errors if no scenario registry was loaded at all (surfaced as
    /// `ConfigError::MetadataMissing`, since a missing registry is itself
    /// a load-time configuration gap).
    pub fn route(
        &self,
        requested_id: Option<&str>,
        requested_data_type: Option<&str>,
    ) -> Result<ResolvedProgram, ConfigError> {
        let registry = self.loader.registry.as_ref().ok_or_else(|| ConfigError::MetadataMissing {
            path: "<scenario-registry>".to_string(),
            field: "scenario-registry".to_string(),
        })?;
        scenario::route(registry, &self.loader.scenarios, &self.loader.rule_configs, requested_id, requested_data_type)
    }

    /// Runs `program`'s enrichment pipeline and rule groups, in file
    /// order, against `record`.
    ///
    /// # Errors
    /// Propagates the enrichment pipeline's `EnrichmentError` or the rule
    /// engine's `RuleError`, wrapped as `ConfigError::SchemaViolation`
    /// since both indicate a dependency graph that should have been
    /// rejected at load time.
    pub async fn evaluate(&self, program: &ResolvedProgram, record: Record) -> Result<EvaluationResult, ConfigError> {
        let mut ctx = EvaluationContext::with_clock(record, Arc::clone(&self.clock));
        let executor = LookupExecutor::new(Arc::clone(&self.driver_registry), self.cache.clone());
        let pipeline = EnrichmentPipeline::new(executor);
        let rule_engine = RuleEngine::new();

        let mut enrichment_outcomes = Vec::new();
        let mut all_groups = Vec::new();
        let mut all_policies = Vec::new();

        for config in &program.configs {
            let outcomes = pipeline.run(&config.enrichments, &mut ctx).await.map_err(|err| ConfigError::SchemaViolation {
                path: program.scenario_id.clone(),
                message: err.to_string(),
            })?;
            enrichment_outcomes.extend(outcomes);
            all_groups.extend(config.rule_groups.iter().cloned());
            all_policies.extend(config.category_policies.iter().cloned());
        }

        let report = rule_engine.evaluate(&all_groups, &all_policies, &mut ctx).map_err(|err| ConfigError::SchemaViolation {
            path: program.scenario_id.clone(),
            message: err.to_string(),
        })?;
        tracing::debug!(
            scenario = %program.scenario_id,
            outcome_count = report.outcomes.len(),
            decision = ?report.decision,
            "scenario evaluated"
        );

        for event in &report.audit_events {
            self.audit.append(event.clone());
        }

        Ok(EvaluationResult { enrichment_outcomes, report })
    }

    /// Invalidates a single cache key, or every key matching a
    /// `*`-wildcard pattern, delegating directly to the configured
    /// [`Cache`]. A no-op when no cache is configured.
    pub async fn invalidate(&self, key_pattern: &str) {
        let Some(cache) = &self.cache else {
            return;
        };
        if key_pattern.contains('*') {
            cache.invalidate_pattern(key_pattern).await;
        } else {
            cache.invalidate(key_pattern).await;
        }
    }

    #[must_use]
    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    #[must_use]
    pub fn secret_provider(&self) -> &Arc<dyn SecretProvider> {
        &self.secret_provider
    }

    #[must_use]
    pub fn metrics(&self) -> &Arc<dyn MetricsSink> {
        &self.metrics
    }
}

fn load_directory(root: &Path) -> Result<ConfigLoader, ConfigError> {
    let mut loader = ConfigLoader::new();
    let mut files = Vec::new();
    collect_yaml_files(root, &mut files)?;
    files.sort();
    for path in &files {
        loader.load_file(path)?;
    }
    Ok(loader)
}

fn collect_yaml_files(dir: &Path, out: &mut Vec<std::path::PathBuf>) -> Result<(), ConfigError> {
    let entries = std::fs::read_dir(dir).map_err(|err| ConfigError::Io {
        path: dir.to_string_lossy().to_string(),
        message: err.to_string(),
    })?;
    for entry in entries {
        let entry = entry.map_err(|err| ConfigError::Io { path: dir.to_string_lossy().to_string(), message: err.to_string() })?;
        let path = entry.path();
        if path.is_dir() {
            collect_yaml_files(&path, out)?;
        } else if matches!(path.extension().and_then(std::ffi::OsStr::to_str), Some("yaml" | "yml")) {
            out.push(path);
        }
    }
    Ok(())
}

/// Builds an `EngineDeps` with a simple L1-only cache under the given
/// policy, otherwise defaulted.
#[must_use]
pub fn deps_with_cache(driver_registry: DriverRegistry, policy: CachePolicy) -> EngineDeps {
    EngineDeps { driver_registry, cache: Some(Arc::new(Cache::new(policy, None))), ..EngineDeps::default() }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    fn write_file(dir: &Path, name: &str, contents: &str) {
        let mut file = std::fs::File::create(dir.join(name)).expect("create");
        file.write_all(contents.as_bytes()).expect("write");
    }

    #[tokio::test]
    async fn loads_routes_and_evaluates_a_minimal_scenario() {
        let dir = tempfile::tempdir().expect("tempdir");
        write_file(
            dir.path(),
            "currencies.yaml",
            "metadata:\n  name: currencies\n  version: 1.0.0\n  description: fx reference\n  type: dataset\n  source: treasury\ndata:\n  - code: USD\n    name: US Dollar\n",
        );
        write_file(
            dir.path(),
            "rules.yaml",
            "metadata:\n  name: trade-rules\n  version: 1.0.0\n  description: trade validation\n  type: rule-config\n  author: team\ndata-sources:\n  - name: currencies-inline\n    type: inline\nenrichments:\n  - id: currency-lookup\n    type: lookup\n    lookup-config:\n      key: currency\n      data-source-id: currencies-inline\n      dataset-ref: currencies\n      field-mappings:\n        - source-path: name\n          target-field: currencyName\nrules:\n  - id: has-currency-name\n    condition: currencyName\n    message: currency resolved\n    severity: info\nrule-groups:\n  - id: main\n    rule-ids: [has-currency-name]\n",
        );
        write_file(
            dir.path(),
            "registry.yaml",
            "metadata:\n  name: registry\n  version: 1.0.0\n  description: scenario registry\n  type: scenario-registry\nscenario-registry:\n  - scenario-id: trade\n    config-file: rules.yaml\n    data-types: [com.apex.trade]\n",
        );

        let engine = Engine::load_config(dir.path(), EngineDeps::default()).expect("load");

        let program = engine.route(None, Some("trade")).expect("route");
        assert_eq!(program.scenario_id, "trade");

        let mut fields = std::collections::BTreeMap::new();
        fields.insert("currency".to_string(), apex_core::Value::String("USD".to_string()));
        let record = Record::from_map(fields);

        let result = engine.evaluate(&program, record).await.expect("evaluate");
        assert_eq!(result.report.outcomes.len(), 1);
        assert!(!result.report.has_errors());
    }

    #[test]
    fn reload_replaces_the_loaded_snapshot() {
        let dir = tempfile::tempdir().expect("tempdir");
        write_file(
            dir.path(),
            "rules.yaml",
            "metadata:\n  name: trade-rules\n  version: 1.0.0\n  description: trade validation\n  type: rule-config\n  author: team\n",
        );
        write_file(
            dir.path(),
            "registry.yaml",
            "metadata:\n  name: registry\n  version: 1.0.0\n  description: scenario registry\n  type: scenario-registry\nscenario-registry:\n  - scenario-id: trade\n    config-file: rules.yaml\n    data-types: [com.apex.trade]\n",
        );
        let mut engine = Engine::load_config(dir.path(), EngineDeps::default()).expect("load");
        assert!(engine.route(Some("trade"), None).is_ok());

        let other_dir = tempfile::tempdir().expect("tempdir");
        engine.reload(other_dir.path(), EngineDeps::default()).expect("reload");
        assert!(matches!(engine.route(Some("trade"), None), Err(ConfigError::ScenarioNotFound { .. })));
    }
}
