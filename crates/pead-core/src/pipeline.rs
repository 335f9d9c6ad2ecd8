//! End-to-end drift run.
//!
//! Earnings records flow strictly forward:
//!
//! ```text
//! load -> fetch prices -> join -> compute drift -> rank -> summarize -> save
//! ```
//!
//! Per-record problems are collected as [`Dropped`] entries. The run only stops
//! when a stage has nothing left to hand on.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;

use crate::adapters::FinancialDatasetsAdapter;
use crate::config::PipelineConfig;
use crate::drift::DriftComputer;
use crate::earnings::{load_earnings_file, unique_tickers, EarningsError};
use crate::join::{join_events, PriceIndex};
use crate::outcome::{Dropped, StageReport};
use crate::price_source::{fetch_price_histories, FetchFailure, PriceSource};
use crate::ranking::{CategoryStats, Ranker, SortOrder};
use crate::report::save_summary;
use crate::summary::{ChatCompletionService, NarrativeSummarizer, SummaryService};
use crate::throttling::RequestPacer;
use crate::{CalendarDate, DateRange, DriftResult, EarningsRecord, JoinedEvent, Ticker};

/// Conditions that end a run before a report exists.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("no valid earnings records to process")]
    NoEarnings,

    #[error("no price data fetched for any of {tickers} ticker(s)")]
    NoPriceData { tickers: usize },

    #[error("no earnings event could be matched with prices on both sides of its report date")]
    NoJoinedEvents,

    #[error(transparent)]
    Earnings(#[from] EarningsError),

    #[error("failed to write summary report: {0}")]
    Io(#[from] std::io::Error),
}

/// Everything a completed run produced.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PipelineReport {
    pub loaded: usize,
    pub tickers: Vec<Ticker>,
    pub fetch_window: DateRange,
    pub price_observations: usize,
    pub fetch_failures: Vec<FetchFailure>,
    pub joined: Vec<JoinedEvent>,
    pub results: Vec<DriftResult>,
    pub top: Vec<DriftResult>,
    pub category_stats: Vec<CategoryStats>,
    pub summary: String,
    pub dropped: Vec<Dropped>,
}

/// A completed run together with the narrative file it wrote.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SavedRun {
    #[serde(flatten)]
    pub report: PipelineReport,
    pub summary_path: PathBuf,
}

pub struct Pipeline {
    config: PipelineConfig,
    price_source: Arc<dyn PriceSource>,
    summarizer: NarrativeSummarizer,
}

impl Pipeline {
    pub fn new(
        config: PipelineConfig,
        price_source: Arc<dyn PriceSource>,
        summary_service: Arc<dyn SummaryService>,
    ) -> Self {
        Self {
            config,
            price_source,
            summarizer: NarrativeSummarizer::new(summary_service),
        }
    }

    /// Pipeline backed by the financialdatasets.ai price API and a chat-completions service.
    pub fn from_config(config: PipelineConfig) -> Self {
        let price_source = Arc::new(FinancialDatasetsAdapter::new(config.prices.clone()));
        let summary_service = Arc::new(ChatCompletionService::new(config.chat.clone()));
        Self::new(config, price_source, summary_service)
    }

    /// Loads an earnings file with the configured column mapping.
    pub fn load(&self, path: &Path) -> Result<StageReport<EarningsRecord>, PipelineError> {
        Ok(load_earnings_file(path, &self.config.columns)?)
    }

    pub async fn run(
        &self,
        earnings: StageReport<EarningsRecord>,
    ) -> Result<PipelineReport, PipelineError> {
        let StageReport {
            kept: records,
            dropped: mut all_dropped,
        } = earnings;

        let fetch_window = DateRange::spanning(
            records.iter().map(|record| record.report_date),
            self.config.window_padding_days,
        )
        .ok_or(PipelineError::NoEarnings)?;
        let tickers = unique_tickers(&records);
        tracing::info!(
            records = records.len(),
            tickers = tickers.len(),
            window = %fetch_window,
            "starting drift run"
        );

        let pacer = RequestPacer::new(self.config.pacing);
        let batch =
            fetch_price_histories(self.price_source.as_ref(), &tickers, fetch_window, &pacer).await;
        if batch.is_empty() {
            return Err(PipelineError::NoPriceData {
                tickers: tickers.len(),
            });
        }
        let price_observations = batch.observation_count();
        let fetch_failures = batch.failures;

        let index = PriceIndex::new(batch.histories);
        let joined = join_events(&records, &index);
        all_dropped.extend(joined.dropped);
        if joined.kept.is_empty() {
            return Err(PipelineError::NoJoinedEvents);
        }

        let computer = DriftComputer::new(self.config.surprise_threshold);
        let drift = computer.compute_all(&joined.kept);
        all_dropped.extend(drift.dropped);
        let results = drift.kept;

        let ranker = Ranker::new(&results);
        let top = ranker
            .top_by_car(self.config.top_n, SortOrder::Descending)
            .into_iter()
            .cloned()
            .collect();
        let category_stats = ranker.summary_stats();

        let summary = self.summarizer.summarize(&results).await;

        tracing::info!(
            joined = joined.kept.len(),
            results = results.len(),
            dropped = all_dropped.len(),
            "drift run complete"
        );

        Ok(PipelineReport {
            loaded: records.len(),
            tickers,
            fetch_window,
            price_observations,
            fetch_failures,
            joined: joined.kept,
            results,
            top,
            category_stats,
            summary,
            dropped: all_dropped,
        })
    }

    /// Runs and writes the narrative to the configured output directory.
    ///
    /// Nothing is written when the run stops early.
    pub async fn run_and_save(
        &self,
        earnings: StageReport<EarningsRecord>,
        report_date: CalendarDate,
    ) -> Result<SavedRun, PipelineError> {
        let report = self.run(earnings).await?;
        let summary_path = save_summary(&self.config.output_dir, report_date, &report.summary)?;
        Ok(SavedRun {
            report,
            summary_path,
        })
    }
}
