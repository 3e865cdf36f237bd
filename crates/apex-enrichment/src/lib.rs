// apex-enrichment/src/lib.rs
// ============================================================================
// Module: APEX Enrichment Pipeline
// Description: Dependency-ordered execution of declared enrichments:
//              plain lookups, conditional-routing branches, named chains,
//              and batch (element-wise) enrichment (§4.6).
// Purpose: Turn a flat list of declared enrichments plus their
//          `depends-on` edges into the order the engine actually runs
//          them in, then run each one against a shared context.
// Dependencies: apex-core, apex-expr, apex-lookup
// ============================================================================

//! ## Overview
//! `apex-enrichment` sits between configuration and the lookup executor:
//! [`graph::topological_order`] turns a declared dependency graph into a
//! run order (rejecting cycles and dangling references at load time), and
//! [`pipeline::EnrichmentPipeline`] walks that order, dispatching each
//! node to a plain [`apex_lookup::LookupEnrichment`], a
//! [`declaration::ConditionalRouting`] branch set, a named
//! [`declaration::Chain`], or a [`declaration::BatchEnrichment`].

#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used))]

pub mod declaration;
pub mod error;
pub mod graph;
pub mod pipeline;

pub use declaration::BatchEnrichment;
pub use declaration::Chain;
pub use declaration::ChainStage;
pub use declaration::ConditionalRouting;
pub use declaration::EnrichmentDeclaration;
pub use declaration::EnrichmentKind;
pub use error::EnrichmentError;
pub use graph::Node;
pub use graph::topological_order;
pub use pipeline::EnrichmentPipeline;
