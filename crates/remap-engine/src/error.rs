//! Error taxonomy and per-row diagnostics.
//!
//! Two families: [`ConfigError`] is raised while compiling a program,
//! before any row is processed, and is always fatal. [`RuleError`] is a
//! per-row failure; the affected write is skipped, the row keeps
//! processing, and the error is recorded as a [`Diagnostic`] so batch
//! callers can report partial success.

use serde::Serialize;
use thiserror::Error;

/// A malformed rule detected at program compilation.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Transform rule names a transform the engine does not recognize.
    #[error("unknown transform '{name}' (expected \"uppercase\" or \"lowercase\")")]
    UnknownTransform { name: String },

    /// A regex failed to compile.
    #[error("invalid regex '{pattern}': {source}")]
    InvalidRegex {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    /// A nest subfield pattern must capture exactly one control key.
    #[error("nest regex '{pattern}' must have exactly one capture group, found {found}")]
    CaptureGroupCount { pattern: String, found: usize },

    /// Arithmetic equation failed to parse.
    #[error("invalid equation '{equation}': {message}")]
    InvalidEquation { equation: String, message: String },

    /// Interpolation template references a source-field index that
    /// does not exist.
    #[error("template placeholder {{{index}}} out of range ({available} source fields)")]
    PlaceholderOutOfRange { index: usize, available: usize },

    /// Rule requires at least one source field.
    #[error("{rule} rule requires at least one source field")]
    EmptySourceFields { rule: &'static str },

    /// Delete may only target the destination record.
    #[error("delete cannot target the source record: '{field}'")]
    DeleteFromSource { field: String },
}

/// A per-row, per-rule failure. Never aborts the row on its own.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum RuleError {
    /// A required field was absent or could not be coerced.
    #[error("cannot resolve field '{field}': {reason}")]
    FieldResolution { field: String, reason: String },

    /// Arithmetic evaluation failed (divide by zero, non-numeric operand).
    #[error("expression '{expression}' failed: {reason}")]
    Expression { expression: String, reason: String },

    /// The external filter evaluator reported an error.
    #[error("filter '{expression}' failed: {reason}")]
    FilterEvaluation { expression: String, reason: String },
}

/// One recorded failure, addressed by row and by rule position.
///
/// `rule_path` is the index path through the program: `[3]` is the
/// fourth top-level rule, `[3, 1]` the second rule of the subprogram at
/// that position.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Diagnostic {
    pub row: usize,
    pub rule_path: Vec<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rule_name: Option<String>,
    pub error: RuleError,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn diagnostic_serializes_with_tagged_error() {
        let diagnostic = Diagnostic {
            row: 2,
            rule_path: vec![1, 0],
            rule_name: Some("compute iq".into()),
            error: RuleError::Expression {
                expression: "age / 0".into(),
                reason: "division by zero".into(),
            },
        };

        let json = serde_json::to_value(&diagnostic).unwrap();
        assert_eq!(json["row"], 2);
        assert_eq!(json["error"]["kind"], "expression");
    }
}
