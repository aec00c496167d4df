//! The filter gate.
//!
//! Filter expressions are an external boundary: the engine never parses
//! filter syntax. Callers inject a [`FilterEvaluator`] and the engine
//! invokes it exactly once per filtered rule per row, honoring the
//! boolean it returns. A rule without a filter never touches the
//! evaluator.

use remap_model::Record;
use thiserror::Error;

/// Failure reported by an external filter evaluator.
#[derive(Debug, Clone, Error)]
#[error("{0}")]
pub struct FilterError(String);

impl FilterError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// Caller-supplied predicate over one (source, destination) pair.
///
/// Implementations must be side-effect-free from the engine's point of
/// view and safe for concurrent read-only use if rows are dispatched to
/// parallel workers.
pub trait FilterEvaluator {
    fn evaluate(
        &self,
        source: &Record,
        destination: &Record,
        expression: &str,
    ) -> Result<bool, FilterError>;
}

/// Evaluator that accepts every expression. Useful when a program is
/// known to carry no filters, or filters should be ignored.
#[derive(Debug, Clone, Copy, Default)]
pub struct AlwaysTrue;

impl FilterEvaluator for AlwaysTrue {
    fn evaluate(&self, _: &Record, _: &Record, _: &str) -> Result<bool, FilterError> {
        Ok(true)
    }
}

/// Adapter that lets a plain closure act as an evaluator.
#[derive(Clone, Copy)]
pub struct FnEvaluator<F>(pub F);

impl<F> FilterEvaluator for FnEvaluator<F>
where
    F: Fn(&Record, &Record, &str) -> Result<bool, FilterError>,
{
    fn evaluate(
        &self,
        source: &Record,
        destination: &Record,
        expression: &str,
    ) -> Result<bool, FilterError> {
        (self.0)(source, destination, expression)
    }
}

/// What to do when the external evaluator itself errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FilterErrorPolicy {
    /// Treat the filter as false: skip the rule and record a diagnostic.
    #[default]
    Lenient,
    /// Re-raise the error, aborting the run.
    Strict,
}

/// Per-run execution options.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExecOptions {
    pub filter_errors: FilterErrorPolicy,
}

impl ExecOptions {
    #[must_use]
    pub fn strict_filters(mut self) -> Self {
        self.filter_errors = FilterErrorPolicy::Strict;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn closures_are_evaluators() {
        let evaluator = FnEvaluator(|_: &Record, _: &Record, expression: &str| match expression {
            "yes" => Ok(true),
            "no" => Ok(false),
            other => Err(FilterError::new(format!("bad expression: {other}"))),
        });

        let record = Record::new();
        assert!(evaluator.evaluate(&record, &record, "yes").unwrap());
        assert!(!evaluator.evaluate(&record, &record, "no").unwrap());
        assert!(evaluator.evaluate(&record, &record, "?").is_err());
    }
}
