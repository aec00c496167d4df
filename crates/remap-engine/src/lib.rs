//! Rule-execution engine for declarative record mapping.
//!
//! A mapping program is an ordered list of rules applied, in order, to
//! one source record at a time; each rule reads fields from either
//! record and writes into the destination record built up across the
//! sequence. This crate compiles rule lists ([`Program::compile`]) and
//! runs them ([`Program::run`], [`Program::run_single`]).
//!
//! - **arith**: restricted arithmetic equation grammar
//! - **template**: `{i}` positional interpolation templates
//! - **nest**: column grouping into ordered subrecords
//! - **filter**: the injected filter-evaluation boundary
//! - **error**: configuration errors and per-row diagnostics
//!
//! Per-row execution is purely functional given the source record, the
//! program, and the filter evaluator; no state carries across rows.

mod apply;
pub mod arith;
pub mod error;
pub mod filter;
pub mod nest;
pub mod program;
pub mod template;

pub use arith::Equation;
pub use error::{ConfigError, Diagnostic, RuleError};
pub use filter::{
    AlwaysTrue, ExecOptions, FilterError, FilterErrorPolicy, FilterEvaluator, FnEvaluator,
};
pub use nest::{CONTROL_KEY, NestGrouper};
pub use program::{Program, RowOutcome, RunOutcome};
pub use template::Template;
