// apex-lookup/src/policy.rs
// ============================================================================
// Module: Missing-Data Policy
// Description: What an enrichment does when its key resolves to no record,
//              after any declared fallback source has also been tried
//              (§4.5 step 4).
// ============================================================================

use std::collections::BTreeMap;

use apex_core::Value;

/// What to do when a lookup's key produces no matching record.
#[derive(Debug, Clone, PartialEq)]
pub enum MissingDataPolicy {
    /// Surface `LookupError::MissingDataFailure` and abort the enrichment.
    Fail,
    /// Write `Value::Null` into every declared target field and continue.
    Continue,
    /// Write these literal values into the declared target fields instead
    /// of the (absent) mapped source fields.
    Defaults(BTreeMap<String, Value>),
    /// Try a second, named data source / dataset reference before falling
    /// back to `Continue` semantics.
    FallbackSource {
        /// The data source identifier to retry against.
        data_source_id: String,
        /// The dataset reference to retry within that source.
        dataset_ref: String,
    },
}

impl Default for MissingDataPolicy {
    fn default() -> Self {
        Self::Continue
    }
}
