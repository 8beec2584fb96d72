//! CLI argument definitions for the ADE engine.

use std::path::PathBuf;

use ade_model::{ConflictPolicy, RunRequest, SettingsOverrides};
use clap::{Args, Parser, Subcommand, ValueEnum};
use clap_verbosity_flag::{Verbosity, WarnLevel};
use colorchoice_clap::Color;

#[derive(Parser)]
#[command(
    name = "ade",
    version,
    about = "ADE - Normalize spreadsheet and CSV tables against a config package",
    long_about = "Detect tables in spreadsheets and CSV files, map their columns to the\n\
                  canonical fields of a config package, normalize and validate the values,\n\
                  and write a normalized workbook plus a JSON audit artifact."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Adjust log verbosity (-v for info, -vv for debug, -q for errors only).
    #[command(flatten)]
    pub verbosity: Verbosity<WarnLevel>,

    /// Control ANSI color output (auto, always, never).
    #[command(flatten)]
    pub color: Color,

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

    /// Allow cell values in trace-level logs.
    #[arg(long = "log-data", global = true)]
    pub log_data: bool,
}

#[derive(Subcommand)]
pub enum Command {
    /// Normalize one input file.
    Run(RunArgs),

    /// Build the registry from a config package and list what it registers.
    CheckConfig(CheckConfigArgs),
}

#[derive(Args)]
pub struct RunArgs {
    /// Config package directory (or its manifest file).
    #[arg(long = "config", value_name = "DIR")]
    pub config: PathBuf,

    /// Input CSV, TSV or spreadsheet file.
    #[arg(long = "input", value_name = "FILE")]
    pub input: PathBuf,

    /// Only process this sheet; repeat to select several, in order.
    #[arg(long = "sheet", value_name = "NAME")]
    pub sheets: Vec<String>,

    /// Output workbook path (default: <INPUT DIR>/output/<STEM>.normalized.xlsx).
    #[arg(long = "output", value_name = "PATH", conflicts_with = "output_dir")]
    pub output: Option<PathBuf>,

    /// Directory for the output workbook.
    #[arg(long = "output-dir", value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// Directory for the event log and artifact (default: <OUTPUT DIR>/logs).
    #[arg(long = "logs-dir", value_name = "DIR", conflicts_with = "logs_path")]
    pub logs_dir: Option<PathBuf>,

    /// Event log file; the artifact is written next to it.
    #[arg(long = "logs-path", value_name = "FILE")]
    pub logs_path: Option<PathBuf>,

    /// Minimum score for a column to map to a field.
    #[arg(long = "threshold", value_name = "SCORE")]
    pub threshold: Option<f64>,

    /// How to resolve several columns claiming the same field.
    #[arg(long = "conflict-policy", value_enum)]
    pub conflict_policy: Option<ConflictPolicyArg>,

    /// Drop columns that did not map to a field instead of appending them.
    #[arg(long = "no-append-unmapped")]
    pub no_append_unmapped: bool,
}

impl RunArgs {
    pub fn to_request(&self) -> RunRequest {
        let mut request = RunRequest::new(&self.config, &self.input);
        if !self.sheets.is_empty() {
            request = request.with_sheets(self.sheets.iter().cloned());
        }
        request.output_path = self.output.clone();
        request.output_dir = self.output_dir.clone();
        request.logs_dir = self.logs_dir.clone();
        request.logs_path = self.logs_path.clone();
        request.with_settings(SettingsOverrides {
            mapping_threshold: self.threshold,
            conflict_policy: self.conflict_policy.map(ConflictPolicy::from),
            append_unmapped: self.no_append_unmapped.then_some(false),
        })
    }
}

#[derive(Args)]
pub struct CheckConfigArgs {
    /// Config package directory (or its manifest file).
    #[arg(long = "config", value_name = "DIR")]
    pub config: PathBuf,
}

#[derive(Clone, Copy, ValueEnum)]
pub enum ConflictPolicyArg {
    Leftmost,
    #[value(name = "leave_unmapped", alias = "leave-unmapped")]
    LeaveUnmapped,
    #[value(name = "best_score", alias = "best-score")]
    BestScore,
}

impl From<ConflictPolicyArg> for ConflictPolicy {
    fn from(value: ConflictPolicyArg) -> Self {
        match value {
            ConflictPolicyArg::Leftmost => Self::Leftmost,
            ConflictPolicyArg::LeaveUnmapped => Self::LeaveUnmapped,
            ConflictPolicyArg::BestScore => Self::BestScore,
        }
    }
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
