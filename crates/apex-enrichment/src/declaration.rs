// apex-enrichment/src/declaration.rs
// ============================================================================
// Module: Enrichment Declaration
// Description: The shape of one declared enrichment node, as the pipeline
//              orders and runs it (§4.6): a plain lookup, a
//              conditional-routing branch set, a named chain, or a
//              batch (element-wise) enrichment.
// ============================================================================

use apex_expr::Expression;
use apex_lookup::FieldMapping;
use apex_lookup::LookupEnrichment;

/// A `(condition, sub-lookup)` pair evaluated in declared order; the
/// first whose condition is true runs, with `default` as the fallback
/// when none match.
#[derive(Debug, Clone)]
pub struct ConditionalRouting {
    /// Branches in evaluation order.
    pub branches: Vec<(Expression, LookupEnrichment)>,
    /// Runs when no branch condition is true.
    pub default: Option<LookupEnrichment>,
    /// Field mappings applied regardless of which branch ran, sourced
    /// from the context root after the branch (or default) completes.
    pub common_field_mappings: Vec<FieldMapping>,
}

/// One stage of a named chain: a lookup whose resolved value, read back
/// from `output_source_field` after the lookup's own field mappings run,
/// is bound as `#{output_variable}` for later stages to reference.
#[derive(Debug, Clone)]
pub struct ChainStage {
    /// The stage's id, scoped to its enclosing chain.
    pub id: String,
    /// Ids of other stages in the same chain this one depends on.
    pub depends_on: Vec<String>,
    /// The lookup this stage runs.
    pub lookup: LookupEnrichment,
    /// The dotted context path read back after the lookup runs.
    pub output_source_field: String,
    /// The variable name subsequent stages bind the read-back value as.
    pub output_variable: String,
}

/// A named sequence of stages, each producing a variable later stages may
/// consume, internally ordered the same way the outer pipeline orders
/// enrichments.
#[derive(Debug, Clone)]
pub struct Chain {
    /// The chain's name, for logging.
    pub name: String,
    /// The chain's stages, in declaration order (not necessarily
    /// dependency order).
    pub stages: Vec<ChainStage>,
}

/// An element-wise enrichment over a declared list field: each element is
/// bound as `#{element_binding}`, resolved through `per_element_lookup`,
/// and the parallel results (preserving input order) are written to
/// `target_field` as one list.
#[derive(Debug, Clone)]
pub struct BatchEnrichment {
    /// The dotted context path to the input collection.
    pub collection_field: String,
    /// The variable name each element is bound as while its lookup key
    /// is evaluated.
    pub element_binding: String,
    /// The lookup run once per element.
    pub per_element_lookup: LookupEnrichment,
    /// Where the resulting list is written.
    pub target_field: String,
    /// Whether the target field write may overwrite a prior write.
    pub allow_overwrite: bool,
}

/// The kind of work one declared enrichment node performs.
#[derive(Debug, Clone)]
pub enum EnrichmentKind {
    /// A single lookup enrichment.
    Lookup(LookupEnrichment),
    /// A conditional-routing branch set.
    ConditionalRouting(ConditionalRouting),
    /// A named chain of stages.
    Chain(Chain),
    /// An element-wise batch enrichment.
    Batch(BatchEnrichment),
}

/// One node in the outer dependency graph the pipeline orders and runs.
#[derive(Debug, Clone)]
pub struct EnrichmentDeclaration {
    /// The node's unique id.
    pub id: String,
    /// Other node ids this one must run after.
    pub depends_on: Vec<String>,
    /// What this node does.
    pub kind: EnrichmentKind,
    /// When false, the node is never run and reports a skipped outcome.
    pub enabled: bool,
}
