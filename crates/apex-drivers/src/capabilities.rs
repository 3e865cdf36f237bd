// apex-drivers/src/capabilities.rs
// ============================================================================
// Module: Driver Capabilities
// Description: The capability flags a driver declares so the lookup
//              executor knows whether to push work down or do it itself
//              (§4.4: "Drivers declare whether they support composite
//              keys, batch, and filter predicates").
// ============================================================================

/// What a driver implementation supports, so `apex-lookup` can decide
/// whether to push a composite key, a batch of keys, or a filter
/// predicate down to the driver, or handle it client-side instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Capabilities {
    /// The driver can resolve a key built from more than one field.
    pub supports_composite_keys: bool,
    /// The driver has a real `batch_resolve` (not just a loop over
    /// `resolve`).
    pub supports_batch: bool,
    /// The driver can evaluate a filter predicate itself, e.g. by
    /// compiling it into a `WHERE` clause or query parameter.
    pub supports_filter: bool,
    /// The driver supports arbitrary `query(statement, params)` calls,
    /// beyond simple key resolution.
    pub supports_query: bool,
}

impl Capabilities {
    /// No optional capability: every key is a single scalar, batches are
    /// simulated with repeated `resolve` calls, filters are applied
    /// client-side, and `query` is unsupported.
    #[must_use]
    pub fn none() -> Self {
        Self::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn none_capability_set_has_everything_disabled() {
        let capabilities = Capabilities::none();
        assert!(!capabilities.supports_composite_keys);
        assert!(!capabilities.supports_batch);
        assert!(!capabilities.supports_filter);
        assert!(!capabilities.supports_query);
    }
}
