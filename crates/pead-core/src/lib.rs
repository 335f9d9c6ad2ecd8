//! Core pipeline for post-earnings announcement drift.
//!
//! This crate contains:
//! - Canonical domain models and validation
//! - Earnings file loading and price source adapters
//! - Event-price joining, CAR computation and surprise classification
//! - Ranking views and narrative summaries
//! - Pipeline orchestration with per-record drop reporting

pub mod adapters;
pub mod config;
pub mod domain;
pub mod drift;
pub mod earnings;
pub mod error;
pub mod http_client;
pub mod join;
pub mod outcome;
pub mod pipeline;
pub mod price_source;
pub mod ranking;
pub mod report;
pub mod summary;
pub mod throttling;

pub use adapters::FinancialDatasetsAdapter;
pub use config::{ChatConfig, PipelineConfig, PriceApiConfig};
pub use domain::{
    CalendarDate, DateRange, DriftResult, EarningsRecord, JoinedEvent, PriceObservation,
    SurpriseCategory, Ticker,
};
pub use drift::{DriftComputer, DEFAULT_SURPRISE_THRESHOLD};
pub use earnings::{load_earnings, load_earnings_file, EarningsColumns, EarningsError};
pub use error::ValidationError;
pub use http_client::{
    HttpAuth, HttpClient, HttpError, HttpMethod, HttpRequest, HttpResponse, ReqwestHttpClient,
};
pub use join::{join_events, PriceIndex};
pub use outcome::{DropReason, Dropped, Stage, StageReport};
pub use pipeline::{Pipeline, PipelineError, PipelineReport, SavedRun};
pub use price_source::{
    fetch_price_histories, FetchFailure, PriceBatch, PriceHistoryRequest, PriceSource,
    SourceError, SourceErrorKind,
};
pub use ranking::{CategoryStats, Ranker, SortOrder, DEFAULT_TOP_N};
pub use summary::{
    ChatCompletionService, ChatMessage, ChatRole, NarrativeSummarizer, SummaryError,
    SummaryRequest, SummaryService,
};
pub use throttling::RequestPacer;
