//! Program compilation and execution entry points.
//!
//! A [`Program`] is the compiled form of an ordered rule list: regexes
//! built, equations and templates parsed, subprograms compiled
//! recursively. Compilation is where every configuration error
//! surfaces, so a program that compiles can be applied to any number of
//! rows without re-validating.
//!
//! Execution is a fold: each rule observes the destination record as
//! mutated by all prior rules and may overwrite any field. No state
//! carries across rows, which makes row processing embarrassingly
//! parallel for callers that want to dispatch rows to workers.

use std::collections::BTreeSet;

use remap_model::{FieldRef, FindReplacePair, Record, Rule, RuleKind, Side, Value};

use crate::apply::{ExecContext, apply_rules};
use crate::arith::Equation;
use crate::error::{ConfigError, Diagnostic, RuleError};
use crate::filter::{ExecOptions, FilterEvaluator};
use crate::nest::NestGrouper;
use crate::template::Template;

/// A compiled mapping program.
#[derive(Debug, Clone)]
pub struct Program {
    rules: Vec<CompiledRule>,
}

/// One compiled rule: the shared envelope plus the variant-specific
/// operation.
#[derive(Debug, Clone)]
pub(crate) struct CompiledRule {
    pub(crate) name: Option<String>,
    pub(crate) filter: Option<String>,
    pub(crate) op: Op,
}

/// Compiled rule operations. Mirrors [`RuleKind`] with parsing already
/// done.
#[derive(Debug, Clone)]
pub(crate) enum Op {
    Assign {
        source: String,
        destination: String,
    },
    /// No-op, but the documented field still counts as read by the
    /// program.
    Ignore {
        source: String,
    },
    Constant {
        destination: String,
        value: Value,
    },
    Transform {
        source: String,
        destination: String,
        case: StringCase,
    },
    RegexExtract {
        source: String,
        regex: regex::Regex,
        destinations: Vec<String>,
    },
    Interpolate {
        sources: Vec<String>,
        destination: String,
        template: Template,
    },
    Arithmetic {
        equation: Equation,
        destination: String,
    },
    Delete {
        destination: String,
    },
    Subprogram {
        program: Program,
    },
    Coalesce {
        sources: Vec<String>,
        destination: String,
        default: Value,
    },
    Concatenate {
        sources: Vec<String>,
        destination: String,
        separator: String,
    },
    Array {
        sources: Vec<String>,
        destination: String,
    },
    Nest {
        grouper: NestGrouper,
        destination: String,
    },
    FindReplace {
        destination: String,
        values: Vec<FindReplacePair>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum StringCase {
    Upper,
    Lower,
}

impl StringCase {
    pub(crate) fn apply(self, s: &str) -> String {
        match self {
            Self::Upper => s.to_uppercase(),
            Self::Lower => s.to_lowercase(),
        }
    }
}

impl Op {
    pub(crate) fn name(&self) -> &'static str {
        match self {
            Self::Assign { .. } => "assign",
            Self::Ignore { .. } => "ignore",
            Self::Constant { .. } => "constant",
            Self::Transform { .. } => "transform",
            Self::RegexExtract { .. } => "regex-extract",
            Self::Interpolate { .. } => "interpolate",
            Self::Arithmetic { .. } => "arithmetic",
            Self::Delete { .. } => "delete",
            Self::Subprogram { .. } => "subprogram",
            Self::Coalesce { .. } => "coalesce",
            Self::Concatenate { .. } => "concatenate",
            Self::Array { .. } => "array",
            Self::Nest { .. } => "nest",
            Self::FindReplace { .. } => "find-replace",
        }
    }
}

/// Result of running one row.
#[derive(Debug, Clone)]
pub struct RowOutcome {
    pub record: Record,
    pub diagnostics: Vec<Diagnostic>,
}

/// Result of running a batch of rows.
#[derive(Debug, Clone, Default)]
pub struct RunOutcome {
    /// Transformed records, input order preserved. Rows whose output
    /// holds no non-null value are pruned.
    pub records: Vec<Record>,
    /// Ordered per-row, per-rule diagnostics.
    pub diagnostics: Vec<Diagnostic>,
}

impl Program {
    /// Compile an ordered rule list.
    ///
    /// # Errors
    ///
    /// Returns the first [`ConfigError`] found; nothing runs until the
    /// whole program is well formed.
    pub fn compile(rules: Vec<Rule>) -> Result<Self, ConfigError> {
        let compiled = rules
            .into_iter()
            .map(compile_rule)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { rules: compiled })
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// True if any rule, at any nesting depth, carries a filter.
    pub fn has_filters(&self) -> bool {
        self.rules.iter().any(|rule| {
            rule.filter.is_some()
                || matches!(&rule.op, Op::Subprogram { program } if program.has_filters())
        })
    }

    pub(crate) fn rules(&self) -> &[CompiledRule] {
        &self.rules
    }

    /// Source-record field names this program may read. `destination!`
    /// references are excluded; nest rules contribute nothing because
    /// their inputs are patterns, not names.
    pub fn source_fields(&self) -> BTreeSet<String> {
        let mut fields = BTreeSet::new();
        self.collect_source_fields(&mut fields);
        fields
    }

    fn collect_source_fields(&self, fields: &mut BTreeSet<String>) {
        fn add(fields: &mut BTreeSet<String>, name: &str) {
            if FieldRef::parse(name, Side::Source).side == Side::Source {
                fields.insert(name.to_string());
            }
        }

        for rule in &self.rules {
            match &rule.op {
                Op::Assign { source, .. }
                | Op::Ignore { source }
                | Op::Transform { source, .. }
                | Op::RegexExtract { source, .. } => add(fields, source),
                Op::Arithmetic { equation, .. } => {
                    for ident in equation.identifiers() {
                        add(fields, ident);
                    }
                }
                Op::Interpolate { sources, .. }
                | Op::Coalesce { sources, .. }
                | Op::Concatenate { sources, .. }
                | Op::Array { sources, .. } => {
                    for source in sources {
                        add(fields, source);
                    }
                }
                Op::Subprogram { program } => program.collect_source_fields(fields),
                Op::Constant { .. }
                | Op::Delete { .. }
                | Op::Nest { .. }
                | Op::FindReplace { .. } => {}
            }
        }
    }

    /// Run one row with default options. A fresh destination record is
    /// created, populated across the rule sequence, and returned.
    ///
    /// The source is `&mut` only for the discouraged `source!`
    /// destination convention; programs that never write through
    /// `source!` leave it untouched.
    ///
    /// # Errors
    ///
    /// Only strict-mode filter failures surface as `Err`; everything
    /// else lands in [`RowOutcome::diagnostics`].
    pub fn run_single<E>(&self, source: &mut Record, evaluator: &E) -> Result<RowOutcome, RuleError>
    where
        E: FilterEvaluator + ?Sized,
    {
        self.run_single_with(source, evaluator, ExecOptions::default())
    }

    /// [`Program::run_single`] with explicit options.
    pub fn run_single_with<E>(
        &self,
        source: &mut Record,
        evaluator: &E,
        options: ExecOptions,
    ) -> Result<RowOutcome, RuleError>
    where
        E: FilterEvaluator + ?Sized,
    {
        let mut diagnostics = Vec::new();
        let record = self.run_row(source, 0, evaluator, options, &mut diagnostics)?;
        Ok(RowOutcome {
            record,
            diagnostics,
        })
    }

    /// Run every row in order. Per-row failures become diagnostics;
    /// rows are never dropped because of them, though output rows with
    /// no non-null values are pruned.
    ///
    /// # Errors
    ///
    /// Only strict-mode filter failures abort the run.
    pub fn run<E>(&self, records: &mut [Record], evaluator: &E) -> Result<RunOutcome, RuleError>
    where
        E: FilterEvaluator + ?Sized,
    {
        self.run_with(records, evaluator, ExecOptions::default())
    }

    /// [`Program::run`] with explicit options.
    pub fn run_with<E>(
        &self,
        records: &mut [Record],
        evaluator: &E,
        options: ExecOptions,
    ) -> Result<RunOutcome, RuleError>
    where
        E: FilterEvaluator + ?Sized,
    {
        let mut outcome = RunOutcome::default();

        for (row, source) in records.iter_mut().enumerate() {
            let record = self.run_row(source, row, evaluator, options, &mut outcome.diagnostics)?;
            if record.non_null_values() > 0 {
                outcome.records.push(record);
            }
        }

        Ok(outcome)
    }

    fn run_row<E>(
        &self,
        source: &mut Record,
        row: usize,
        evaluator: &E,
        options: ExecOptions,
        diagnostics: &mut Vec<Diagnostic>,
    ) -> Result<Record, RuleError>
    where
        E: FilterEvaluator + ?Sized,
    {
        let mut destination = Record::new();
        let mut ctx = ExecContext {
            row,
            path: Vec::new(),
            diagnostics,
            options,
        };
        apply_rules(&self.rules, source, &mut destination, &mut ctx, evaluator)?;
        Ok(destination)
    }
}

fn compile_rule(rule: Rule) -> Result<CompiledRule, ConfigError> {
    let op = match rule.kind {
        RuleKind::Assign {
            source_field,
            destination_field,
        } => Op::Assign {
            source: source_field,
            destination: destination_field,
        },
        RuleKind::Ignore { source_field } => Op::Ignore {
            source: source_field,
        },
        RuleKind::Constant {
            destination_field,
            value,
        } => Op::Constant {
            destination: destination_field,
            value,
        },
        RuleKind::Transform {
            source_field,
            destination_field,
            transform,
        } => {
            let case = match transform.as_str() {
                "uppercase" => StringCase::Upper,
                "lowercase" => StringCase::Lower,
                _ => return Err(ConfigError::UnknownTransform { name: transform }),
            };
            Op::Transform {
                source: source_field,
                destination: destination_field,
                case,
            }
        }
        RuleKind::RegexExtract {
            source_field,
            regex,
            destination_fields,
        } => {
            let compiled =
                regex::Regex::new(&regex).map_err(|source| ConfigError::InvalidRegex {
                    pattern: regex,
                    source,
                })?;
            Op::RegexExtract {
                source: source_field,
                regex: compiled,
                destinations: destination_fields,
            }
        }
        RuleKind::Interpolate {
            source_fields,
            destination_field,
            output,
        } => Op::Interpolate {
            template: Template::parse(&output, source_fields.len())?,
            sources: source_fields,
            destination: destination_field,
        },
        RuleKind::Arithmetic {
            equation,
            destination_field,
            // The listed source fields are advisory; the equation's own
            // identifiers are authoritative.
            source_fields: _,
        } => Op::Arithmetic {
            equation: Equation::parse(&equation)?,
            destination: destination_field,
        },
        RuleKind::Delete { destination_field } => {
            if FieldRef::parse(&destination_field, Side::Destination).side == Side::Source {
                return Err(ConfigError::DeleteFromSource {
                    field: destination_field,
                });
            }
            Op::Delete {
                destination: destination_field,
            }
        }
        RuleKind::Subprogram { rules } => Op::Subprogram {
            program: Program::compile(rules)?,
        },
        RuleKind::Coalesce {
            source_fields,
            destination_field,
            default_value,
        } => {
            require_sources("coalesce", &source_fields)?;
            Op::Coalesce {
                sources: source_fields,
                destination: destination_field,
                default: default_value,
            }
        }
        RuleKind::Concatenate {
            source_fields,
            destination_field,
            separator,
        } => {
            require_sources("concatenate", &source_fields)?;
            Op::Concatenate {
                sources: source_fields,
                destination: destination_field,
                separator: separator.unwrap_or_else(|| ",".to_string()),
            }
        }
        RuleKind::Array {
            source_fields,
            destination_field,
        } => {
            require_sources("array", &source_fields)?;
            Op::Array {
                sources: source_fields,
                destination: destination_field,
            }
        }
        RuleKind::Nest {
            subfields,
            destination_field,
        } => Op::Nest {
            grouper: NestGrouper::compile(&subfields)?,
            destination: destination_field,
        },
        RuleKind::FindReplace {
            destination_field,
            values,
        } => Op::FindReplace {
            destination: destination_field,
            values,
        },
    };

    Ok(CompiledRule {
        name: rule.name,
        filter: rule.filter,
        op,
    })
}

fn require_sources(rule: &'static str, sources: &[String]) -> Result<(), ConfigError> {
    if sources.is_empty() {
        Err(ConfigError::EmptySourceFields { rule })
    } else {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rule(json: serde_json::Value) -> Rule {
        serde_json::from_value(json).unwrap()
    }

    #[test]
    fn unknown_transform_fails_at_compile() {
        let err = Program::compile(vec![rule(serde_json::json!({
            "type": "transform",
            "sourceField": "name",
            "destinationField": "name",
            "transform": "reverse"
        }))])
        .unwrap_err();
        assert!(matches!(err, ConfigError::UnknownTransform { .. }));
    }

    #[test]
    fn bad_nest_regex_fails_at_compile() {
        let err = Program::compile(vec![rule(serde_json::json!({
            "type": "nest",
            "subfields": [{"sourceRegex": "address[0-9]+", "destinationSubfield": "v"}],
            "destinationField": "address"
        }))])
        .unwrap_err();
        assert!(matches!(err, ConfigError::CaptureGroupCount { .. }));
    }

    #[test]
    fn delete_source_fails_at_compile() {
        let err = Program::compile(vec![rule(serde_json::json!({
            "type": "delete",
            "destinationField": "source!name"
        }))])
        .unwrap_err();
        assert!(matches!(err, ConfigError::DeleteFromSource { .. }));
    }

    #[test]
    fn compile_errors_inside_subprograms_surface() {
        let err = Program::compile(vec![rule(serde_json::json!({
            "type": "subprogram",
            "rules": [{
                "type": "arithmetic",
                "equation": "age +",
                "sourceFields": ["age"],
                "destinationField": "iq"
            }]
        }))])
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEquation { .. }));
    }

    #[test]
    fn source_fields_skip_destination_references() {
        let program = Program::compile(vec![
            rule(serde_json::json!({
                "type": "assign",
                "sourceField": "name",
                "destinationField": "nickname"
            })),
            rule(serde_json::json!({
                "type": "transform",
                "sourceField": "destination!nickname",
                "destinationField": "nickname",
                "transform": "lowercase"
            })),
            rule(serde_json::json!({
                "type": "arithmetic",
                "equation": "(age * 4) + bonus",
                "sourceFields": ["age"],
                "destinationField": "iq"
            })),
        ])
        .unwrap();

        let fields: Vec<String> = program.source_fields().into_iter().collect();
        assert_eq!(fields, vec!["age", "bonus", "name"]);
    }

    #[test]
    fn ignore_rules_contribute_source_fields() {
        let program = Program::compile(vec![rule(serde_json::json!({
            "type": "ignore",
            "sourceField": "internal_id"
        }))])
        .unwrap();

        let fields: Vec<String> = program.source_fields().into_iter().collect();
        assert_eq!(fields, vec!["internal_id"]);
    }

    #[test]
    fn source_fields_recurse_into_subprograms() {
        let program = Program::compile(vec![
            rule(serde_json::json!({
                "type": "assign",
                "sourceField": "age",
                "destinationField": "yearsOld"
            })),
            rule(serde_json::json!({
                "type": "subprogram",
                "rules": [
                    {"type": "assign", "sourceField": "name", "destinationField": "nickname"},
                    {"type": "ignore", "sourceField": "notes"}
                ]
            })),
        ])
        .unwrap();

        let fields: Vec<String> = program.source_fields().into_iter().collect();
        assert_eq!(fields, vec!["age", "name", "notes"]);
    }

    #[test]
    fn has_filters_sees_nested_rules() {
        let program = Program::compile(vec![rule(serde_json::json!({
            "type": "subprogram",
            "rules": [{
                "type": "ignore",
                "sourceField": "x",
                "filter": "x eq 1"
            }]
        }))])
        .unwrap();
        assert!(program.has_filters());
    }
}
