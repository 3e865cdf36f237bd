// apex-lookup/src/executor.rs
// ============================================================================
// Module: Lookup Executor
// Description: Runs one `LookupEnrichment` against the current context:
//              condition, key, cache/driver/fallback resolution, field
//              mapping, missing-data policy, and outcome reporting (§4.5).
// ============================================================================

use std::sync::Arc;
use std::time::Duration;
use std::time::Instant;

use apex_cache::Cache;
use apex_core::EvaluationContext;
use apex_core::Record;
use apex_core::Value;
use apex_drivers::DriverRegistry;
use apex_drivers::FilterSpec;

use crate::declaration::LookupEnrichment;
use crate::error::LookupError;
use crate::outcome::LookupOutcome;
use crate::policy::MissingDataPolicy;

/// Evaluates `LookupEnrichment` declarations against a registry of data
/// source drivers, optionally fronted by a shared cache.
#[derive(Debug)]
pub struct LookupExecutor {
    registry: Arc<DriverRegistry>,
    cache: Option<Arc<Cache>>,
}

impl LookupExecutor {
    /// Builds an executor over `registry`, optionally caching resolves
    /// through `cache`.
    #[must_use]
    pub fn new(registry: Arc<DriverRegistry>, cache: Option<Arc<Cache>>) -> Self {
        Self { registry, cache }
    }

    /// Runs one enrichment against `ctx`, mutating it in place with
    /// whatever field mappings apply, and returns what happened.
    ///
    /// # Errors
    /// Returns `LookupError` if the condition, key, or any transform
    /// fails to evaluate, if a field mapping's validation fails, if the
    /// underlying driver fails, if more than one candidate record is
    /// returned with no ordering declared, or if the missing-data policy
    /// is `fail` and nothing resolved.
    pub async fn execute(
        &self,
        enrichment: &LookupEnrichment,
        ctx: &mut EvaluationContext,
    ) -> Result<LookupOutcome, LookupError> {
        let started = Instant::now();

        if let Some(condition) = &enrichment.condition {
            if !condition.evaluate(ctx)?.is_truthy() {
                return Ok(LookupOutcome::skipped("condition was false", started.elapsed()));
            }
        }

        let Some(key) = enrichment.key.evaluate(ctx)? else {
            for mapping in &enrichment.field_mappings {
                ctx.write_field(&mapping.target_field, Value::Null, mapping.allow_overwrite)?;
            }
            return Ok(LookupOutcome::skipped("key evaluated to null", started.elapsed()));
        };

        let params = self.build_params(enrichment, ctx)?;

        let (record, data_source_id, cache_hit) =
            match self.resolve_with_fallback(enrichment, &key, &params).await? {
                Some(found) => found,
                None => {
                    return self.apply_missing_data_policy(enrichment, ctx, started.elapsed());
                }
            };

        for mapping in &enrichment.field_mappings {
            mapping.apply(&record, ctx)?;
        }

        Ok(LookupOutcome::resolved(data_source_id, cache_hit, started.elapsed()))
    }

    /// Runs condition/key/resolve/fallback without applying field
    /// mappings or the missing-data policy, returning the raw resolved
    /// record if any. Used by callers (e.g. a chain stage) that need the
    /// resolved value itself rather than its effect on the context.
    ///
    /// # Errors
    /// Returns `LookupError` under the same conditions as
    /// [`execute`](Self::execute)'s condition/key/resolve phase.
    pub async fn resolve_record(
        &self,
        enrichment: &LookupEnrichment,
        ctx: &EvaluationContext,
    ) -> Result<Option<Record>, LookupError> {
        if let Some(condition) = &enrichment.condition {
            if !condition.evaluate(ctx)?.is_truthy() {
                return Ok(None);
            }
        }
        let Some(key) = enrichment.key.evaluate(ctx)? else {
            return Ok(None);
        };
        let params = self.build_params(enrichment, ctx)?;
        Ok(self
            .resolve_with_fallback(enrichment, &key, &params)
            .await?
            .map(|(record, _, _)| record))
    }

    /// Evaluates every declared filter condition into a `Record` of
    /// filter-field -> value, bound alongside the key when the driver
    /// supports query-style resolution.
    fn build_params(
        &self,
        enrichment: &LookupEnrichment,
        ctx: &EvaluationContext,
    ) -> Result<Record, LookupError> {
        let mut params = Record::new();
        for filter in &enrichment.filters {
            let value = filter.value.evaluate(ctx)?;
            params.set_path(&filter.field, value)?;
        }
        Ok(params)
    }

    async fn resolve_with_fallback(
        &self,
        enrichment: &LookupEnrichment,
        key: &Value,
        params: &Record,
    ) -> Result<Option<(Record, apex_core::DataSourceId, bool)>, LookupError> {
        if let Some(found) = self
            .resolve_one(&enrichment.data_source_id, &enrichment.dataset_ref, enrichment, key, params)
            .await?
        {
            return Ok(Some(found));
        }
        if let Some((fallback_id, fallback_dataset_ref)) = &enrichment.fallback {
            if let Some(found) = self
                .resolve_one(fallback_id, fallback_dataset_ref, enrichment, key, params)
                .await?
            {
                return Ok(Some(found));
            }
        }
        Ok(None)
    }

    async fn resolve_one(
        &self,
        data_source_id: &apex_core::DataSourceId,
        dataset_ref: &str,
        enrichment: &LookupEnrichment,
        key: &Value,
        params: &Record,
    ) -> Result<Option<(Record, apex_core::DataSourceId, bool)>, LookupError> {
        if !enrichment.filters.is_empty() {
            let capabilities = self.registry.capabilities(data_source_id)?;
            if capabilities.supports_filter {
                let candidates = self.resolve_filtered(data_source_id, dataset_ref, enrichment, params).await?;
                return Ok(self.pick_candidate(candidates, enrichment, dataset_ref)?.map(|record| {
                    (record, data_source_id.clone(), false)
                }));
            }
        }

        let cache_key = format!("{data_source_id}:{dataset_ref}:{}", key.render());
        let record = match &self.cache {
            Some(cache) => {
                let hits_before = cache.stats().hits;
                let resolved = cache
                    .resolve(&cache_key, || async {
                        self.registry.resolve(data_source_id, dataset_ref, key, params).await
                    })
                    .await?;
                let cache_hit = cache.stats().hits > hits_before;
                return Ok(resolved.map(|record| (record, data_source_id.clone(), cache_hit)));
            }
            None => self.registry.resolve(data_source_id, dataset_ref, key, params).await?,
        };
        Ok(record.map(|record| (record, data_source_id.clone(), false)))
    }

    /// Pushes the first declared filter down to the driver, then narrows
    /// the result client-side against any remaining declared filters.
    async fn resolve_filtered(
        &self,
        data_source_id: &apex_core::DataSourceId,
        dataset_ref: &str,
        enrichment: &LookupEnrichment,
        params: &Record,
    ) -> Result<Vec<Record>, LookupError> {
        let Some(first) = enrichment.filters.first() else {
            return Ok(Vec::new());
        };
        let spec = FilterSpec {
            field: first.field.clone(),
            operator: first.operator.clone(),
            value: params.get(&first.field).cloned().unwrap_or(Value::Null),
        };
        let mut candidates = self.registry.resolve_filtered(data_source_id, dataset_ref, &spec, params).await?;
        for filter in enrichment.filters.iter().skip(1) {
            let expected = params.get(&filter.field).cloned().unwrap_or(Value::Null);
            candidates.retain(|record| record.get(&filter.field) == Some(&expected));
        }
        Ok(candidates)
    }

    /// Picks the matching record when a lookup resolves to more than one
    /// candidate: sorts by the declared `ordering` expression (evaluated
    /// with each candidate bound as its own context root) and takes the
    /// first, or errors if no ordering was declared.
    fn pick_candidate(
        &self,
        candidates: Vec<Record>,
        enrichment: &LookupEnrichment,
        dataset_ref: &str,
    ) -> Result<Option<Record>, LookupError> {
        match candidates.len() {
            0 => Ok(None),
            1 => Ok(candidates.into_iter().next()),
            _ => match &enrichment.ordering {
                Some(ordering) => {
                    let mut scored = Vec::with_capacity(candidates.len());
                    for record in candidates {
                        let candidate_ctx = EvaluationContext::new(record.clone());
                        let score = ordering.evaluate(&candidate_ctx)?;
                        scored.push((score, record));
                    }
                    scored.sort_by(|a, b| a.0.compare(&b.0).unwrap_or(std::cmp::Ordering::Equal));
                    Ok(scored.into_iter().next().map(|(_, record)| record))
                }
                None => Err(LookupError::DuplicateKey { dataset_ref: dataset_ref.to_string() }),
            },
        }
    }

    fn apply_missing_data_policy(
        &self,
        enrichment: &LookupEnrichment,
        ctx: &mut EvaluationContext,
        elapsed: Duration,
    ) -> Result<LookupOutcome, LookupError> {
        match &enrichment.missing_data_policy {
            MissingDataPolicy::Fail => {
                Err(LookupError::MissingDataFailure { dataset_ref: enrichment.dataset_ref.clone() })
            }
            MissingDataPolicy::Continue => {
                for mapping in &enrichment.field_mappings {
                    ctx.write_field(&mapping.target_field, Value::Null, mapping.allow_overwrite)?;
                }
                Ok(LookupOutcome::missing("continue", elapsed))
            }
            MissingDataPolicy::Defaults(defaults) => {
                for mapping in &enrichment.field_mappings {
                    if let Some(value) = defaults.get(&mapping.target_field) {
                        ctx.write_field(&mapping.target_field, value.clone(), mapping.allow_overwrite)?;
                    }
                }
                Ok(LookupOutcome::missing("defaults", elapsed))
            }
            MissingDataPolicy::FallbackSource { .. } => Ok(LookupOutcome::missing("fallback-source", elapsed)),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use apex_core::DataSourceId;
    use apex_drivers::InlineDataset;
    use apex_drivers::InlineDriver;
    use apex_expr::Expression;

    use super::*;
    use crate::key::LookupKey;
    use crate::mapping::FieldMapping;

    fn registry_with_currency_rows() -> Arc<DriverRegistry> {
        let row = {
            let mut fields = BTreeMap::new();
            fields.insert("currency".to_string(), Value::String("EUR".to_string()));
            fields.insert("rate".to_string(), Value::Float64(1.08));
            Record::from_map(fields)
        };
        let mut datasets = BTreeMap::new();
        datasets.insert(
            "currencies".to_string(),
            InlineDataset { key_field: "currency".to_string(), rows: vec![row] },
        );
        let mut registry = DriverRegistry::new();
        registry
            .register(DataSourceId::from("currencies-inline"), Box::new(InlineDriver::new(datasets)))
            .expect("register");
        Arc::new(registry)
    }

    fn enrichment(missing_data_policy: MissingDataPolicy) -> LookupEnrichment {
        LookupEnrichment {
            name: "currency-enrichment".to_string(),
            condition: None,
            key: LookupKey::Single(Expression::compile("quoteCurrency").expect("compile")),
            data_source_id: DataSourceId::from("currencies-inline"),
            dataset_ref: "currencies".to_string(),
            filters: Vec::new(),
            fallback: None,
            ordering: None,
            field_mappings: vec![FieldMapping {
                source_path: "rate".to_string(),
                target_field: "exchangeRate".to_string(),
                transform: None,
                validation: None,
                allow_overwrite: false,
            }],
            missing_data_policy,
        }
    }

    #[tokio::test]
    async fn resolved_enrichment_writes_mapped_field() {
        let executor = LookupExecutor::new(registry_with_currency_rows(), None);
        let mut fields = BTreeMap::new();
        fields.insert("quoteCurrency".to_string(), Value::String("EUR".to_string()));
        let mut ctx = EvaluationContext::new(Record::from_map(fields));

        let outcome = executor.execute(&enrichment(MissingDataPolicy::Fail), &mut ctx).await.expect("execute");

        assert!(outcome.was_resolved());
        assert_eq!(ctx.root().get("exchangeRate"), Some(&Value::Float64(1.08)));
    }

    #[tokio::test]
    async fn missing_record_with_fail_policy_errors() {
        let executor = LookupExecutor::new(registry_with_currency_rows(), None);
        let mut fields = BTreeMap::new();
        fields.insert("quoteCurrency".to_string(), Value::String("GBP".to_string()));
        let mut ctx = EvaluationContext::new(Record::from_map(fields));

        let err = executor
            .execute(&enrichment(MissingDataPolicy::Fail), &mut ctx)
            .await
            .expect_err("missing data should fail");
        assert!(matches!(err, LookupError::MissingDataFailure { .. }));
    }

    #[tokio::test]
    async fn missing_record_with_defaults_policy_writes_defaults() {
        let executor = LookupExecutor::new(registry_with_currency_rows(), None);
        let mut fields = BTreeMap::new();
        fields.insert("quoteCurrency".to_string(), Value::String("GBP".to_string()));
        let mut ctx = EvaluationContext::new(Record::from_map(fields));
        let defaults = BTreeMap::from([("exchangeRate".to_string(), Value::Float64(1.0))]);

        let outcome = executor
            .execute(&enrichment(MissingDataPolicy::Defaults(defaults)), &mut ctx)
            .await
            .expect("execute");

        assert!(!outcome.was_resolved());
        assert_eq!(ctx.root().get("exchangeRate"), Some(&Value::Float64(1.0)));
    }

    #[tokio::test]
    async fn missing_record_with_continue_policy_writes_null_targets() {
        let executor = LookupExecutor::new(registry_with_currency_rows(), None);
        let mut fields = BTreeMap::new();
        fields.insert("quoteCurrency".to_string(), Value::String("GBP".to_string()));
        let mut ctx = EvaluationContext::new(Record::from_map(fields));

        let outcome = executor
            .execute(&enrichment(MissingDataPolicy::Continue), &mut ctx)
            .await
            .expect("execute");

        assert!(!outcome.was_resolved());
        assert_eq!(ctx.root().get("exchangeRate"), Some(&Value::Null));
    }

    #[tokio::test]
    async fn false_condition_skips_without_touching_context() {
        let executor = LookupExecutor::new(registry_with_currency_rows(), None);
        let mut decl = enrichment(MissingDataPolicy::Continue);
        decl.condition = Some(Expression::compile("false").expect("compile"));
        let mut fields = BTreeMap::new();
        fields.insert("quoteCurrency".to_string(), Value::String("EUR".to_string()));
        let mut ctx = EvaluationContext::new(Record::from_map(fields));

        let outcome = executor.execute(&decl, &mut ctx).await.expect("execute");

        assert_eq!(outcome, LookupOutcome::skipped("condition was false", outcome.elapsed));
        assert_eq!(ctx.root().get("exchangeRate"), None);
    }
}
