//! Earnings file loading.
//!
//! Reads a delimited file with a header row, maps source-specific column
//! names onto [`EarningsRecord`] and drops (with a reason) every row that
//! cannot produce a valid record. Only file-level problems are errors.

use std::collections::HashSet;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::outcome::{DropReason, Stage, StageReport};
use crate::{CalendarDate, EarningsRecord, Ticker};

/// Placeholder consensus as a fraction of actual EPS when no estimate is supplied.
pub const CONSENSUS_PLACEHOLDER_FACTOR: f64 = 0.95;

/// Source column names for each canonical earnings field.
///
/// Defaults follow the WRDS Compustat quarterly export.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EarningsColumns {
    pub ticker: String,
    pub report_date: String,
    pub eps_actual: String,
    pub eps_consensus: Option<String>,
}

impl Default for EarningsColumns {
    fn default() -> Self {
        Self {
            ticker: String::from("tic"),
            report_date: String::from("rdq"),
            eps_actual: String::from("epspxq"),
            eps_consensus: None,
        }
    }
}

/// File-level earnings loading failures.
#[derive(Debug, Error)]
pub enum EarningsError {
    #[error("failed to open earnings file {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed earnings file: {0}")]
    Csv(#[from] csv::Error),

    #[error("earnings file is missing required column '{column}'")]
    MissingColumn { column: String },
}

#[derive(Debug, Clone, Copy)]
struct ColumnIndex {
    ticker: usize,
    report_date: usize,
    eps_actual: usize,
    eps_consensus: Option<usize>,
}

impl ColumnIndex {
    fn resolve(headers: &csv::StringRecord, columns: &EarningsColumns) -> Result<Self, EarningsError> {
        let find = |name: &str| {
            headers
                .iter()
                .position(|header| header.trim() == name)
                .ok_or_else(|| EarningsError::MissingColumn {
                    column: name.to_owned(),
                })
        };

        Ok(Self {
            ticker: find(&columns.ticker)?,
            report_date: find(&columns.report_date)?,
            eps_actual: find(&columns.eps_actual)?,
            eps_consensus: columns.eps_consensus.as_deref().map(find).transpose()?,
        })
    }
}

pub fn load_earnings_file(
    path: &Path,
    columns: &EarningsColumns,
) -> Result<StageReport<EarningsRecord>, EarningsError> {
    let file = File::open(path).map_err(|source| EarningsError::Open {
        path: path.to_path_buf(),
        source,
    })?;
    load_earnings(file, columns)
}

pub fn load_earnings<R: Read>(
    reader: R,
    columns: &EarningsColumns,
) -> Result<StageReport<EarningsRecord>, EarningsError> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers = reader.headers()?.clone();
    let index = ColumnIndex::resolve(&headers, columns)?;

    let mut report = StageReport::new();
    for (offset, row) in reader.records().enumerate() {
        let row = row?;
        let line = row
            .position()
            .map(|position| position.line())
            .unwrap_or(offset as u64 + 2);
        report.record(Stage::Load, format!("row {line}"), parse_row(&row, index, columns));
    }

    tracing::info!(
        kept = report.kept.len(),
        dropped = report.dropped.len(),
        "loaded earnings records"
    );
    Ok(report)
}

fn parse_row(
    row: &csv::StringRecord,
    index: ColumnIndex,
    columns: &EarningsColumns,
) -> Result<EarningsRecord, DropReason> {
    let ticker_raw = required_cell(row, index.ticker, &columns.ticker)?;
    let ticker = Ticker::parse(ticker_raw).map_err(|error| DropReason::InvalidTicker {
        value: ticker_raw.to_owned(),
        detail: error.to_string(),
    })?;

    let date_raw = required_cell(row, index.report_date, &columns.report_date)?;
    let report_date = CalendarDate::parse(date_raw).map_err(|_| DropReason::UnparseableDate {
        value: date_raw.to_owned(),
    })?;

    let eps_actual = parse_number(
        required_cell(row, index.eps_actual, &columns.eps_actual)?,
        &columns.eps_actual,
    )?;

    let supplied_consensus = match (index.eps_consensus, columns.eps_consensus.as_deref()) {
        (Some(position), Some(name)) => optional_cell(row, position)
            .map(|raw| parse_number(raw, name))
            .transpose()?,
        _ => None,
    };
    let eps_consensus =
        supplied_consensus.unwrap_or(eps_actual * CONSENSUS_PLACEHOLDER_FACTOR);

    EarningsRecord::new(ticker, report_date, eps_actual, eps_consensus).map_err(DropReason::from)
}

fn optional_cell(row: &csv::StringRecord, position: usize) -> Option<&str> {
    row.get(position)
        .map(str::trim)
        .filter(|value| !value.is_empty())
}

fn required_cell<'r>(
    row: &'r csv::StringRecord,
    position: usize,
    field: &str,
) -> Result<&'r str, DropReason> {
    optional_cell(row, position).ok_or_else(|| DropReason::MissingField {
        field: field.to_owned(),
    })
}

fn parse_number(raw: &str, field: &str) -> Result<f64, DropReason> {
    raw.parse::<f64>()
        .map_err(|_| DropReason::UnparseableNumber {
            field: field.to_owned(),
            value: raw.to_owned(),
        })
}

/// Distinct tickers in first-seen order.
pub fn unique_tickers(records: &[EarningsRecord]) -> Vec<Ticker> {
    let mut seen = HashSet::new();
    records
        .iter()
        .filter(|record| seen.insert(record.ticker.clone()))
        .map(|record| record.ticker.clone())
        .collect()
}
