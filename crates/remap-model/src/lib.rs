//! Data model for the remap mapping engine.
//!
//! This crate defines the types shared across the workspace:
//!
//! - **value**: the tagged union stored in record fields
//! - **record**: an insertion-ordered field-name -> value map (one row)
//! - **field**: source/destination routing for prefixed field references
//! - **rule**: the declarative mapping-rule definitions

pub mod field;
pub mod record;
pub mod rule;
pub mod value;

pub use field::{FieldRef, Side};
pub use record::Record;
pub use rule::{FindReplacePair, NestSubfield, Rule, RuleKind};
pub use value::Value;
