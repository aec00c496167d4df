//! Per-rule application.
//!
//! One function per concern: `apply_rules` folds a compiled rule list
//! over a (source, destination) pair, `read_field`/`write_field` route
//! every field reference through the prefix convention, and the filter
//! gate decides whether a rule runs at all.

use remap_model::{FieldRef, Record, Side, Value};
use tracing::{debug, warn};

use crate::error::{Diagnostic, RuleError};
use crate::filter::{ExecOptions, FilterErrorPolicy, FilterEvaluator};
use crate::program::{CompiledRule, Op};

/// Mutable execution state threaded through a row.
pub(crate) struct ExecContext<'a> {
    pub(crate) row: usize,
    /// Index path of the rule list currently being applied.
    pub(crate) path: Vec<usize>,
    pub(crate) diagnostics: &'a mut Vec<Diagnostic>,
    pub(crate) options: ExecOptions,
}

impl ExecContext<'_> {
    fn record(&mut self, index: usize, rule: &CompiledRule, error: RuleError) {
        let mut rule_path = self.path.clone();
        rule_path.push(index);
        warn!(row = self.row, rule = ?rule_path, %error, "rule failed; continuing row");
        self.diagnostics.push(Diagnostic {
            row: self.row,
            rule_path,
            rule_name: rule.name.clone(),
            error,
        });
    }
}

/// Read a field reference, defaulting to the source side.
fn read_field(source: &Record, destination: &Record, name: &str) -> Value {
    let field = FieldRef::parse(name, Side::Source);
    let record = match field.side {
        Side::Source => source,
        Side::Destination => destination,
    };
    record.get(field.key).cloned().unwrap_or(Value::Null)
}

/// Write a field reference, defaulting to the destination side. The
/// `source!` redirect mutates the source record; it is preserved as a
/// legacy escape hatch and intentionally not extended.
fn write_field(source: &mut Record, destination: &mut Record, name: &str, value: Value) {
    let field = FieldRef::parse(name, Side::Destination);
    match field.side {
        Side::Source => source.set(field.key, value),
        Side::Destination => destination.set(field.key, value),
    }
}

/// Fold a compiled rule list over one record pair.
///
/// Returns `Err` only when a filter evaluator fails under the strict
/// policy; every other failure is recorded and the row continues.
pub(crate) fn apply_rules<E>(
    rules: &[CompiledRule],
    source: &mut Record,
    destination: &mut Record,
    ctx: &mut ExecContext<'_>,
    evaluator: &E,
) -> Result<(), RuleError>
where
    E: FilterEvaluator + ?Sized,
{
    for (index, rule) in rules.iter().enumerate() {
        if let Some(expression) = &rule.filter {
            match evaluator.evaluate(source, destination, expression) {
                Ok(true) => {}
                Ok(false) => {
                    debug!(row = ctx.row, rule = index, op = rule.op.name(), "skipped by filter");
                    continue;
                }
                Err(err) => {
                    let error = RuleError::FilterEvaluation {
                        expression: expression.clone(),
                        reason: err.to_string(),
                    };
                    match ctx.options.filter_errors {
                        FilterErrorPolicy::Strict => return Err(error),
                        FilterErrorPolicy::Lenient => {
                            ctx.record(index, rule, error);
                            continue;
                        }
                    }
                }
            }
        }

        apply_one(index, rule, source, destination, ctx, evaluator)?;
    }

    Ok(())
}

fn apply_one<E>(
    index: usize,
    rule: &CompiledRule,
    source: &mut Record,
    destination: &mut Record,
    ctx: &mut ExecContext<'_>,
    evaluator: &E,
) -> Result<(), RuleError>
where
    E: FilterEvaluator + ?Sized,
{
    match &rule.op {
        Op::Assign {
            source: from,
            destination: to,
        } => {
            let value = read_field(source, destination, from);
            write_field(source, destination, to, value);
        }

        Op::Ignore { .. } => {}

        Op::Constant {
            destination: to,
            value,
        } => {
            write_field(source, destination, to, value.clone());
        }

        Op::Transform {
            source: from,
            destination: to,
            case,
        } => {
            let value = match read_field(source, destination, from) {
                Value::Null => Value::Null,
                value => Value::String(case.apply(&value.coerce_string())),
            };
            write_field(source, destination, to, value);
        }

        Op::RegexExtract {
            source: from,
            regex,
            destinations,
        } => {
            let text = read_field(source, destination, from).coerce_string();
            let captures = regex.captures(&text);
            for (i, to) in destinations.iter().enumerate() {
                let value = captures
                    .as_ref()
                    .and_then(|caps| caps.get(i + 1))
                    .map_or(Value::Null, |m| Value::String(m.as_str().to_string()));
                write_field(source, destination, to, value);
            }
        }

        Op::Interpolate {
            sources,
            destination: to,
            template,
        } => {
            let values: Vec<Value> = sources
                .iter()
                .map(|name| read_field(source, destination, name))
                .collect();
            write_field(source, destination, to, Value::String(template.render(&values)));
        }

        Op::Arithmetic {
            equation,
            destination: to,
        } => {
            let result = equation.evaluate(&|name: &str| {
                match read_field(source, destination, name) {
                    Value::Null => Err(RuleError::FieldResolution {
                        field: name.to_string(),
                        reason: "missing or null".into(),
                    }),
                    value => value.coerce_number().ok_or_else(|| RuleError::Expression {
                        expression: equation.text().to_string(),
                        reason: format!("field '{name}' is not numeric"),
                    }),
                }
            });
            match result {
                Ok(number) => write_field(source, destination, to, Value::Number(number)),
                Err(error) => ctx.record(index, rule, error),
            }
        }

        Op::Delete { destination: to } => {
            // Compilation guarantees this routes to the destination.
            let field = FieldRef::parse(to, Side::Destination);
            destination.remove(field.key);
        }

        Op::Subprogram { program } => {
            ctx.path.push(index);
            let result = apply_rules(program.rules(), source, destination, ctx, evaluator);
            ctx.path.pop();
            result?;
        }

        Op::Coalesce {
            sources,
            destination: to,
            default,
        } => {
            let found = sources
                .iter()
                .map(|name| read_field(source, destination, name))
                .find(|value| !value.is_null());
            let value = found.unwrap_or_else(|| default.clone());
            write_field(source, destination, to, value);
        }

        Op::Concatenate {
            sources,
            destination: to,
            separator,
        } => {
            let joined = sources
                .iter()
                .map(|name| read_field(source, destination, name).coerce_string())
                .collect::<Vec<_>>()
                .join(separator);
            write_field(source, destination, to, Value::String(joined));
        }

        Op::Array {
            sources,
            destination: to,
        } => {
            let values: Vec<Value> = sources
                .iter()
                .map(|name| read_field(source, destination, name))
                .collect();
            write_field(source, destination, to, Value::Array(values));
        }

        Op::Nest {
            grouper,
            destination: to,
        } => {
            let groups = grouper.group(source);
            let value = Value::Array(groups.into_iter().map(Value::Record).collect());
            write_field(source, destination, to, value);
        }

        Op::FindReplace {
            destination: to,
            values,
        } => {
            let current = {
                let field = FieldRef::parse(to, Side::Destination);
                let record: &Record = match field.side {
                    Side::Source => source,
                    Side::Destination => destination,
                };
                record.get(field.key).cloned().unwrap_or(Value::Null)
            };
            if !current.is_null() {
                let mut text = current.coerce_string();
                for pair in values {
                    text = text.replace(&pair.find, &pair.replace);
                }
                write_field(source, destination, to, Value::String(text));
            }
        }
    }

    Ok(())
}
