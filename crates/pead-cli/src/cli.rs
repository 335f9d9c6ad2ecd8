//! CLI argument definitions for pead.
//!
//! # Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `run` | Load earnings, fetch prices, compute drift, rank and summarize |
//! | `inspect` | Load and validate an earnings file without network access |
//!
//! # Global Options
//!
//! | Option | Default | Description |
//! |--------|---------|-------------|
//! | `--format` | `table` | Output format (table, json) |
//! | `--pretty` | `false` | Pretty-print JSON output |
//! | `--verbose` | `false` | Debug-level logging on stderr |
//!
//! # Examples
//!
//! ```bash
//! # Full run over a WRDS Compustat export
//! pead run data/earnings.csv
//!
//! # Custom column names with a real consensus column
//! pead run surprises.csv --ticker-col ticker --date-col date \
//!     --eps-col actual --consensus-col estimate
//!
//! # Check a file before spending API calls on it
//! pead inspect data/earnings.csv --format json --pretty
//! ```

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use pead_core::EarningsColumns;

/// Post-earnings announcement drift analysis.
#[derive(Debug, Parser)]
#[command(
    name = "pead",
    author,
    version,
    about = "Post-earnings announcement drift analysis",
    long_about = "Joins quarterly earnings announcements with daily closing prices, computes the \
cumulative abnormal return around each report date, classifies the earnings surprise, ranks \
the results and asks a language model for a short narrative.\n\
\n\
API keys are read from FDA_API_KEY (prices) and OPENAI_API_KEY (narrative)."
)]
pub struct Cli {
    /// Output format for results.
    #[arg(long, global = true, value_enum, default_value_t = OutputFormat::Table)]
    pub format: OutputFormat,

    /// Pretty-print JSON output with indentation.
    #[arg(long, global = true, default_value_t = false)]
    pub pretty: bool,

    /// Log at debug level (overrides RUST_LOG).
    #[arg(short, long, global = true, default_value_t = false)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable tables.
    Table,
    /// Single JSON object.
    Json,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the full drift pipeline and save the narrative summary.
    ///
    /// # Examples
    ///
    ///   pead run earnings.csv
    ///   pead run earnings.csv --top 5 --threshold 0.02 --output-dir reports
    Run(RunArgs),

    /// Load and validate an earnings file offline.
    Inspect(InspectArgs),
}

/// Source column names mapped onto the canonical earnings fields.
#[derive(Debug, Clone, Args)]
pub struct ColumnArgs {
    /// Column holding the ticker symbol.
    #[arg(long, default_value = "tic")]
    pub ticker_col: String,

    /// Column holding the report date.
    #[arg(long, default_value = "rdq")]
    pub date_col: String,

    /// Column holding actual EPS.
    #[arg(long, default_value = "epspxq")]
    pub eps_col: String,

    /// Column holding consensus EPS. Without it consensus is 95% of actual EPS.
    #[arg(long)]
    pub consensus_col: Option<String>,
}

impl ColumnArgs {
    pub fn to_columns(&self) -> EarningsColumns {
        EarningsColumns {
            ticker: self.ticker_col.clone(),
            report_date: self.date_col.clone(),
            eps_actual: self.eps_col.clone(),
            eps_consensus: self.consensus_col.clone(),
        }
    }
}

#[derive(Debug, Args)]
pub struct RunArgs {
    /// Earnings CSV file with a header row.
    pub input: PathBuf,

    #[command(flatten)]
    pub columns: ColumnArgs,

    /// Surprise ratios within [-threshold, threshold] are Neutral.
    #[arg(long, default_value_t = 0.01)]
    pub threshold: f64,

    /// Number of entries in the top-by-CAR view.
    #[arg(long, default_value_t = 3)]
    pub top: usize,

    /// Minimum spacing between price requests in milliseconds.
    #[arg(long, default_value_t = 1000)]
    pub pacing_ms: u64,

    /// Calendar days added on each side of the report-date span when fetching prices.
    #[arg(long, default_value_t = 7)]
    pub padding_days: u32,

    /// Price API request timeout in milliseconds.
    #[arg(long, default_value_t = 10_000)]
    pub timeout_ms: u64,

    /// Chat model used for the narrative (defaults to PEAD_CHAT_MODEL or gpt-4).
    #[arg(long)]
    pub model: Option<String>,

    /// Directory receiving summary_report_<date>.txt.
    #[arg(long, default_value = ".")]
    pub output_dir: PathBuf,
}

#[derive(Debug, Args)]
pub struct InspectArgs {
    /// Earnings CSV file with a header row.
    pub input: PathBuf,

    #[command(flatten)]
    pub columns: ColumnArgs,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn run_defaults_match_pipeline_defaults() {
        let cli = Cli::try_parse_from(["pead", "run", "earnings.csv"]).expect("parses");
        let Command::Run(args) = cli.command else {
            panic!("expected run command");
        };
        assert_eq!(args.threshold, 0.01);
        assert_eq!(args.top, 3);
        assert_eq!(args.pacing_ms, 1000);
        assert_eq!(args.columns.to_columns(), EarningsColumns::default());
        assert_eq!(cli.format, OutputFormat::Table);
    }

    #[test]
    fn global_flags_follow_subcommand() {
        let cli = Cli::try_parse_from([
            "pead",
            "inspect",
            "earnings.csv",
            "--consensus-col",
            "estimate",
            "--format",
            "json",
            "--pretty",
        ])
        .expect("parses");
        assert!(cli.pretty);
        assert_eq!(cli.format, OutputFormat::Json);
        let Command::Inspect(args) = cli.command else {
            panic!("expected inspect command");
        };
        assert_eq!(args.columns.consensus_col.as_deref(), Some("estimate"));
    }
}
