//! CLI argument definitions.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use clap_verbosity_flag::{Verbosity, WarnLevel};

#[derive(Parser)]
#[command(
    name = "remap",
    version,
    about = "Apply declarative mapping programs to flat records",
    long_about = "Apply declarative mapping programs to flat records.\n\n\
                  A program is a JSON list of rules (assign, transform, nest, ...)\n\
                  applied in order to every input record."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Adjust log verbosity (-v for info, -vv for debug, -q for errors only).
    #[command(flatten)]
    pub verbosity: Verbosity<WarnLevel>,

    /// Explicit log level (overrides -v/-q flags).
    #[arg(long = "log-level", value_enum, global = true)]
    pub log_level: Option<LogLevelArg>,

    /// Log output format (pretty for human, json for machine parsing).
    #[arg(
        long = "log-format",
        value_enum,
        default_value = "pretty",
        global = true
    )]
    pub log_format: LogFormatArg,

    /// Write logs to a file instead of stderr.
    #[arg(long = "log-file", value_name = "PATH", global = true)]
    pub log_file: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Apply a mapping program to input records.
    Run(RunArgs),

    /// Compile a mapping program and report configuration errors.
    Check(CheckArgs),

    /// Suggest mapping rules from source and destination field names.
    Suggest(SuggestArgs),
}

#[derive(Parser)]
pub struct RunArgs {
    /// Path to the mapping program (JSON list of rules).
    #[arg(value_name = "PROGRAM")]
    pub program: PathBuf,

    /// Input records: a JSON array of objects, or a CSV file with a
    /// header row.
    #[arg(value_name = "INPUT")]
    pub input: PathBuf,

    /// Input format (default: inferred from the file extension).
    #[arg(long = "input-format", value_enum)]
    pub input_format: Option<InputFormatArg>,

    /// Write mapped records here instead of stdout.
    #[arg(long = "output", value_name = "PATH")]
    pub output: Option<PathBuf>,

    /// Write per-row diagnostics to this file as JSON.
    #[arg(long = "diagnostics", value_name = "PATH")]
    pub diagnostics: Option<PathBuf>,

    /// Abort the run when a filter expression fails to evaluate
    /// instead of skipping the rule.
    #[arg(long = "strict-filters")]
    pub strict_filters: bool,
}

#[derive(Parser)]
pub struct CheckArgs {
    /// Path to the mapping program (JSON list of rules).
    #[arg(value_name = "PROGRAM")]
    pub program: PathBuf,
}

#[derive(Parser)]
pub struct SuggestArgs {
    /// JSON array of source field names.
    #[arg(value_name = "SOURCE_FIELDS")]
    pub source_fields: PathBuf,

    /// JSON array of destination field names.
    #[arg(value_name = "DESTINATION_FIELDS")]
    pub destination_fields: PathBuf,

    /// Minimum name-similarity score for an assign suggestion.
    #[arg(long = "threshold", value_name = "SCORE", default_value_t = 0.8)]
    pub threshold: f64,

    /// Also propose nest rules for repeated source columns.
    #[arg(long = "nesting")]
    pub nesting: bool,

    /// Write suggested rules here instead of stdout.
    #[arg(long = "output", value_name = "PATH")]
    pub output: Option<PathBuf>,
}

#[derive(Clone, Copy, ValueEnum)]
pub enum InputFormatArg {
    Json,
    Csv,
}

/// CLI log level choices.
#[derive(Clone, Copy, ValueEnum)]
pub enum LogLevelArg {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// CLI log format choices.
#[derive(Clone, Copy, ValueEnum)]
pub enum LogFormatArg {
    Pretty,
    Compact,
    Json,
}
