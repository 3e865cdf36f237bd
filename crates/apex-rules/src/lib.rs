// apex-rules/src/lib.rs
// ============================================================================
// Module: APEX Rule Engine
// Description: Evaluates declared rule groups against an enriched context,
//              accumulating severity-classified outcomes and deriving the
//              approval decision (§4.7).
// Purpose: Turn a flat set of rule groups plus their `depends-on` edges and
//          category policies into an ordered evaluation run and a `Report`.
// Dependencies: apex-core, apex-expr
// ============================================================================

//! ## Overview
//! [`ordering::order_rules`] orders one group's rules by their
//! `depends-on` graph, tie-broken by ascending priority and then
//! declaration order. [`engine::RuleEngine`] walks each group in that
//! order, renders each rule's message template, classifies the outcome's
//! severity (upgrading to `Error` when the condition itself throws), and
//! derives the terminal [`apex_core::Decision`] from the running
//! `#hasErrors`/`#hasWarnings` totals it rebinds on the context after
//! every rule.

#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used))]

pub mod declaration;
pub mod engine;
pub mod error;
pub mod ordering;

pub use declaration::CategoryPolicy;
pub use declaration::RuleDeclaration;
pub use declaration::RuleGroup;
pub use engine::RuleEngine;
pub use error::RuleError;
pub use ordering::RuleNode;
pub use ordering::order_rules;
