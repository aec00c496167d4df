//! Subcommand implementations.

use std::fs::File;
use std::io::{self, BufReader, BufWriter, Write};
use std::path::Path;

use anyhow::{Context, bail};
use remap_engine::{AlwaysTrue, ExecOptions, Program};
use remap_model::{Record, Rule, Value};
use remap_suggest::{NameSimilaritySuggester, RuleSuggester, nesting_rules};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{info, warn};

use crate::cli::{CheckArgs, InputFormatArg, RunArgs, SuggestArgs};

/// Counters for the `run` subcommand, used for the exit code.
pub struct RunReport {
    pub rows_in: usize,
    pub rows_out: usize,
    pub diagnostics: usize,
}

pub fn run(args: &RunArgs) -> anyhow::Result<RunReport> {
    let program = load_program(&args.program)?;
    let mut records = load_records(&args.input, args.input_format)?;

    if program.has_filters() {
        warn!("program has filter expressions but no evaluator is configured; all filters pass");
    }

    let mut options = ExecOptions::default();
    if args.strict_filters {
        options = options.strict_filters();
    }

    let rows_in = records.len();
    let outcome = program.run_with(&mut records, &AlwaysTrue, options)?;

    info!(
        rows_in,
        rows_out = outcome.records.len(),
        diagnostics = outcome.diagnostics.len(),
        "run complete"
    );
    for diagnostic in &outcome.diagnostics {
        warn!(row = diagnostic.row, "{}", diagnostic.error);
    }

    write_json(args.output.as_deref(), &outcome.records)?;
    if let Some(path) = &args.diagnostics {
        write_json(Some(path), &outcome.diagnostics)?;
    }

    Ok(RunReport {
        rows_in,
        rows_out: outcome.records.len(),
        diagnostics: outcome.diagnostics.len(),
    })
}

pub fn check(args: &CheckArgs) -> anyhow::Result<()> {
    let program = load_program(&args.program)?;
    let fields = program.source_fields();

    info!(rules = program.len(), "program compiles");
    println!(
        "ok: {} rules, reads {} source fields",
        program.len(),
        fields.len()
    );
    Ok(())
}

pub fn suggest(args: &SuggestArgs) -> anyhow::Result<()> {
    let source_fields: Vec<String> = read_json_file(&args.source_fields)?;
    let destination_fields: Vec<String> = read_json_file(&args.destination_fields)?;

    let suggester = NameSimilaritySuggester::new().with_threshold(args.threshold);
    let mut rules = suggester.request_rules(&source_fields, &destination_fields);
    if args.nesting {
        rules.extend(nesting_rules(&source_fields));
    }

    info!(rules = rules.len(), "suggestions ready");
    write_json(args.output.as_deref(), &rules)
}

fn load_program(path: &Path) -> anyhow::Result<Program> {
    let rules: Vec<Rule> = read_json_file(path)?;
    Program::compile(rules).with_context(|| format!("invalid program {}", path.display()))
}

fn load_records(path: &Path, format: Option<InputFormatArg>) -> anyhow::Result<Vec<Record>> {
    let format = match format {
        Some(format) => format,
        None => infer_format(path)?,
    };
    match format {
        InputFormatArg::Json => read_json_file(path),
        InputFormatArg::Csv => read_csv(path),
    }
}

fn infer_format(path: &Path) -> anyhow::Result<InputFormatArg> {
    match path.extension().and_then(|e| e.to_str()) {
        Some("json") => Ok(InputFormatArg::Json),
        Some("csv") => Ok(InputFormatArg::Csv),
        _ => bail!(
            "cannot infer input format of {}; pass --input-format",
            path.display()
        ),
    }
}

/// Read CSV rows as records: every cell is a string, empty or missing
/// cells are null. Ragged rows are accepted; a short row still yields a
/// value for every header.
fn read_csv(path: &Path) -> anyhow::Result<Vec<Record>> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_path(path)
        .with_context(|| format!("cannot open {}", path.display()))?;
    let headers = reader.headers()?.clone();

    let mut records = Vec::new();
    for row in reader.records() {
        let row = row?;
        let mut record = Record::new();
        for (i, header) in headers.iter().enumerate() {
            match row.get(i) {
                Some(cell) if !cell.is_empty() => record.set(header, cell),
                _ => record.set(header, Value::Null),
            }
        }
        records.push(record);
    }
    Ok(records)
}

fn read_json_file<T: DeserializeOwned>(path: &Path) -> anyhow::Result<T> {
    let file =
        File::open(path).with_context(|| format!("cannot open {}", path.display()))?;
    serde_json::from_reader(BufReader::new(file))
        .with_context(|| format!("cannot parse {}", path.display()))
}

fn write_json<T: Serialize>(path: Option<&Path>, value: &T) -> anyhow::Result<()> {
    match path {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("cannot create {}", path.display()))?;
            let mut writer = BufWriter::new(file);
            serde_json::to_writer_pretty(&mut writer, value)?;
            writer.write_all(b"\n")?;
            writer.flush()?;
        }
        None => {
            let mut writer = BufWriter::new(io::stdout().lock());
            serde_json::to_writer_pretty(&mut writer, value)?;
            writer.write_all(b"\n")?;
            writer.flush()?;
        }
    }
    Ok(())
}
