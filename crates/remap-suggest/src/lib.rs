//! Rule suggestion from field names alone.
//!
//! Two independent heuristics: [`score`] pairs source fields with
//! destination fields by name similarity and proposes assign/ignore
//! rules, and [`nesting`] detects repeated-column families (e.g.
//! `address1`, `address2`) and proposes nest rules. Both produce plain
//! [`remap_model::Rule`] values for a human to review; nothing in the
//! execution engine depends on this crate.

pub mod nesting;
pub mod score;

pub use nesting::nesting_rules;
pub use score::{FieldMatch, NameSimilaritySuggester, RuleSuggester};
