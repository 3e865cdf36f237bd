// apex-lookup/src/declaration.rs
// ============================================================================
// Module: Lookup Declaration
// Description: The fully-resolved, type-checked shape of one configured
//              lookup enrichment, as the executor consumes it (§4.5).
// ============================================================================

use apex_core::DataSourceId;
use apex_expr::Expression;

use crate::key::LookupKey;
use crate::mapping::FieldMapping;
use crate::policy::MissingDataPolicy;

/// A filter applied against a data source's `resolve_filtered` beyond the
/// primary key (§4.4's `supports_filter` capability).
#[derive(Debug, Clone)]
pub struct FilterCondition {
    /// The field to filter on, within the candidate record.
    pub field: String,
    /// The comparison operator (`"=="`, `"!="`, and whatever else the
    /// target driver understands).
    pub operator: String,
    /// The expression producing the value compared against.
    pub value: Expression,
}

/// One declared lookup enrichment.
#[derive(Debug, Clone)]
pub struct LookupEnrichment {
    /// An identifying name for logging and reporting.
    pub name: String,
    /// Whether this enrichment runs at all; `None` means "always run".
    pub condition: Option<Expression>,
    /// How to build the resolve key from the current context.
    pub key: LookupKey,
    /// Which registered driver to resolve against.
    pub data_source_id: DataSourceId,
    /// The dataset/table/endpoint/collection the driver looks the key up
    /// in.
    pub dataset_ref: String,
    /// Extra filters applied beyond the primary key.
    pub filters: Vec<FilterCondition>,
    /// A second `(data_source_id, dataset_ref)` to try when the primary
    /// source has no match, before the missing-data policy applies.
    pub fallback: Option<(DataSourceId, String)>,
    /// When a lookup can return more than one record, the expression used
    /// to pick the first one after sorting candidates by it; `None` means
    /// more than one match is an error (`LookupError::DuplicateKey`).
    pub ordering: Option<Expression>,
    /// How resolved fields get written into the context.
    pub field_mappings: Vec<FieldMapping>,
    /// What to do when nothing resolves.
    pub missing_data_policy: MissingDataPolicy,
}
