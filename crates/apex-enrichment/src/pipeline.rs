// apex-enrichment/src/pipeline.rs
// ============================================================================
// Module: Enrichment Pipeline
// Description: Orders declared enrichments by dependency, then runs each
//              node — lookup, conditional routing, chain, or batch —
//              against a shared evaluation context (§4.6).
// ============================================================================

use std::time::Duration;
use std::time::Instant;

use apex_core::EvaluationContext;
use apex_core::Record;
use apex_core::Value;
use apex_lookup::LookupExecutor;
use apex_lookup::LookupOutcome;

use crate::declaration::BatchEnrichment;
use crate::declaration::Chain;
use crate::declaration::ChainStage;
use crate::declaration::ConditionalRouting;
use crate::declaration::EnrichmentDeclaration;
use crate::declaration::EnrichmentKind;
use crate::error::EnrichmentError;
use crate::graph::Node;
use crate::graph::topological_order;

/// Runs a set of declared enrichments against a context, one topological
/// layer at a time.
#[derive(Debug)]
pub struct EnrichmentPipeline {
    executor: LookupExecutor,
}

impl EnrichmentPipeline {
    /// Builds a pipeline over the given lookup executor.
    #[must_use]
    pub fn new(executor: LookupExecutor) -> Self {
        Self { executor }
    }

    /// Orders `declarations` by their `depends-on` graph and runs each one
    /// against `ctx` in that order, returning one outcome per node in the
    /// order it ran.
    ///
    /// # Errors
    /// Returns `EnrichmentError::CycleDetected`/`DuplicateId`/
    /// `UnknownDependency` if the graph is malformed, or propagates a
    /// node's own execution failure.
    pub async fn run(
        &self,
        declarations: &[EnrichmentDeclaration],
        ctx: &mut EvaluationContext,
    ) -> Result<Vec<LookupOutcome>, EnrichmentError> {
        let nodes: Vec<Node> = declarations
            .iter()
            .enumerate()
            .map(|(index, decl)| Node {
                id: decl.id.clone(),
                depends_on: decl.depends_on.clone(),
                declaration_index: index,
            })
            .collect();
        let order = topological_order(&nodes)?;

        let mut outcomes = Vec::with_capacity(order.len());
        for id in order {
            let decl = declarations
                .iter()
                .find(|decl| decl.id == id)
                .expect("topological_order only returns ids present in declarations");
            outcomes.push(self.run_node(decl, ctx).await?);
        }
        Ok(outcomes)
    }

    async fn run_node(
        &self,
        decl: &EnrichmentDeclaration,
        ctx: &mut EvaluationContext,
    ) -> Result<LookupOutcome, EnrichmentError> {
        if !decl.enabled {
            return Ok(LookupOutcome::skipped("enrichment is disabled", Duration::ZERO));
        }
        match &decl.kind {
            EnrichmentKind::Lookup(lookup) => Ok(self.executor.execute(lookup, ctx).await?),
            EnrichmentKind::ConditionalRouting(routing) => self.run_routing(routing, ctx).await,
            EnrichmentKind::Chain(chain) => self.run_chain(chain, ctx).await,
            EnrichmentKind::Batch(batch) => self.run_batch(batch, ctx).await,
        }
    }

    async fn run_routing(
        &self,
        routing: &ConditionalRouting,
        ctx: &mut EvaluationContext,
    ) -> Result<LookupOutcome, EnrichmentError> {
        let mut chosen = None;
        for (condition, lookup) in &routing.branches {
            if condition.evaluate(ctx)?.is_truthy() {
                chosen = Some(lookup);
                break;
            }
        }
        let branch = chosen.or(routing.default.as_ref());

        let outcome = match branch {
            Some(lookup) => self.executor.execute(lookup, ctx).await?,
            None => LookupOutcome::skipped(
                "no routing branch matched and no default was declared",
                Duration::ZERO,
            ),
        };

        let source = ctx.root().clone();
        for mapping in &routing.common_field_mappings {
            mapping.apply(&source, ctx)?;
        }

        Ok(outcome)
    }

    async fn run_chain(
        &self,
        chain: &Chain,
        ctx: &mut EvaluationContext,
    ) -> Result<LookupOutcome, EnrichmentError> {
        let started = Instant::now();
        let nodes: Vec<Node> = chain
            .stages
            .iter()
            .enumerate()
            .map(|(index, stage)| Node {
                id: stage.id.clone(),
                depends_on: stage.depends_on.clone(),
                declaration_index: index,
            })
            .collect();
        let order = topological_order(&nodes)?;

        let mut last_outcome = LookupOutcome::skipped("chain declared no stages", started.elapsed());
        for id in order {
            let stage = chain
                .stages
                .iter()
                .find(|stage| stage.id == id)
                .expect("topological_order only returns ids present in this chain");
            last_outcome = self.run_chain_stage(stage, ctx).await?;
        }
        Ok(last_outcome)
    }

    async fn run_chain_stage(
        &self,
        stage: &ChainStage,
        ctx: &mut EvaluationContext,
    ) -> Result<LookupOutcome, EnrichmentError> {
        let outcome = self.executor.execute(&stage.lookup, ctx).await?;
        let value = ctx.root().get_path(&stage.output_source_field).cloned().unwrap_or(Value::Null);
        ctx.set_variable(stage.output_variable.clone(), value);
        Ok(outcome)
    }

    async fn run_batch(
        &self,
        batch: &BatchEnrichment,
        ctx: &mut EvaluationContext,
    ) -> Result<LookupOutcome, EnrichmentError> {
        let started = Instant::now();
        let collection = ctx.root().get_path(&batch.collection_field).cloned().unwrap_or(Value::Null);
        let Value::List(elements) = collection else {
            return Err(EnrichmentError::NotACollection {
                field: batch.collection_field.clone(),
                kind: collection.kind().to_string(),
            });
        };

        let mut results = Vec::with_capacity(elements.len());
        for element in elements {
            let mut element_ctx = EvaluationContext::new(ctx.root().clone());
            element_ctx.set_variable(batch.element_binding.clone(), element);
            let resolved = self.executor.resolve_record(&batch.per_element_lookup, &element_ctx).await?;
            results.push(resolved.map(Record::into_value).unwrap_or(Value::Null));
        }

        let element_count = results.len();
        ctx.write_field(&batch.target_field, Value::List(results), batch.allow_overwrite)?;
        tracing::debug!(field = %batch.target_field, element_count, "batch enrichment applied");

        Ok(LookupOutcome::resolved(batch.per_element_lookup.data_source_id.clone(), false, started.elapsed()))
    }
}
