use pead_core::{load_earnings_file, DateRange, Dropped, Ticker};
use serde::Serialize;

use crate::cli::{InspectArgs, OutputFormat};
use crate::error::CliError;
use crate::output;

/// Offline view of an earnings file.
#[derive(Debug, Serialize)]
pub struct InspectReport {
    pub input: String,
    pub records: usize,
    pub tickers: Vec<Ticker>,
    pub report_dates: Option<DateRange>,
    pub dropped: Vec<Dropped>,
}

pub fn run(args: &InspectArgs, format: OutputFormat, pretty: bool) -> Result<(), CliError> {
    let earnings = load_earnings_file(&args.input, &args.columns.to_columns())?;

    let report = InspectReport {
        input: args.input.display().to_string(),
        records: earnings.kept.len(),
        tickers: pead_core::earnings::unique_tickers(&earnings.kept),
        report_dates: DateRange::spanning(earnings.kept.iter().map(|record| record.report_date), 0),
        dropped: earnings.dropped,
    };

    output::render_inspect(&report, format, pretty)
}
