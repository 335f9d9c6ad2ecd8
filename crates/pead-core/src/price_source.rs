//! Price source contract and batch fetching.
//!
//! A [`PriceSource`] returns the daily close history of one ticker over a
//! [`DateRange`]. [`fetch_price_histories`] drives a source over many tickers,
//! one paced request at a time. A failing ticker is recorded and skipped; the
//! rest of the batch carries on.

use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};
use std::future::Future;
use std::pin::Pin;

use serde::Serialize;

use crate::throttling::RequestPacer;
use crate::{DateRange, PriceObservation, Ticker};

/// Upstream fault classification for price requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceErrorKind {
    /// Upstream unreachable or connection reset.
    Transport,
    /// Upstream did not answer within the request timeout.
    Timeout,
    /// Upstream answered with a non-success status.
    UpstreamStatus,
    /// Upstream answered but the body was not the expected shape.
    MalformedResponse,
    /// Well-formed response without any usable price bar.
    EmptyResult,
    /// Request could not be built, e.g. no API key is configured.
    InvalidRequest,
}

/// Structured error returned by price sources.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourceError {
    kind: SourceErrorKind,
    message: String,
    status: Option<u16>,
}

impl SourceError {
    pub fn transport(message: impl Into<String>) -> Self {
        Self {
            kind: SourceErrorKind::Transport,
            message: message.into(),
            status: None,
        }
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self {
            kind: SourceErrorKind::Timeout,
            message: message.into(),
            status: None,
        }
    }

    pub fn upstream_status(status: u16, message: impl Into<String>) -> Self {
        Self {
            kind: SourceErrorKind::UpstreamStatus,
            message: message.into(),
            status: Some(status),
        }
    }

    pub fn malformed_response(message: impl Into<String>) -> Self {
        Self {
            kind: SourceErrorKind::MalformedResponse,
            message: message.into(),
            status: None,
        }
    }

    pub fn empty_result(message: impl Into<String>) -> Self {
        Self {
            kind: SourceErrorKind::EmptyResult,
            message: message.into(),
            status: None,
        }
    }

    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self {
            kind: SourceErrorKind::InvalidRequest,
            message: message.into(),
            status: None,
        }
    }

    pub const fn kind(&self) -> SourceErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub const fn status(&self) -> Option<u16> {
        self.status
    }

    pub const fn code(&self) -> &'static str {
        match self.kind {
            SourceErrorKind::Transport => "source.transport",
            SourceErrorKind::Timeout => "source.timeout",
            SourceErrorKind::UpstreamStatus => "source.upstream_status",
            SourceErrorKind::MalformedResponse => "source.malformed_response",
            SourceErrorKind::EmptyResult => "source.empty_result",
            SourceErrorKind::InvalidRequest => "source.invalid_request",
        }
    }
}

impl Display for SourceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.message, self.code())
    }
}

impl std::error::Error for SourceError {}

/// Request for the full daily history of one ticker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PriceHistoryRequest {
    pub ticker: Ticker,
    pub range: DateRange,
}

impl PriceHistoryRequest {
    pub fn new(ticker: Ticker, range: DateRange) -> Self {
        Self { ticker, range }
    }
}

/// Source adapter contract for daily price history.
///
/// Implementations must be `Send + Sync`; the batch fetcher only ever holds a
/// shared reference.
pub trait PriceSource: Send + Sync {
    /// Short provider name used in logs.
    fn name(&self) -> &'static str;

    /// Fetches every daily close for `req.ticker` inside `req.range`.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError`] when the request cannot be built, the upstream
    /// is unreachable or too slow, answers with a failure status, returns an
    /// unexpected body, or has no bars.
    fn price_history<'a>(
        &'a self,
        req: PriceHistoryRequest,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<PriceObservation>, SourceError>> + Send + 'a>>;
}

/// One ticker whose history could not be fetched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FetchFailure {
    pub ticker: Ticker,
    pub error: SourceError,
}

/// Union of every successfully fetched history plus the per-ticker failures.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PriceBatch {
    pub histories: BTreeMap<Ticker, Vec<PriceObservation>>,
    pub failures: Vec<FetchFailure>,
}

impl PriceBatch {
    pub fn is_empty(&self) -> bool {
        self.histories.values().all(Vec::is_empty)
    }

    pub fn observation_count(&self) -> usize {
        self.histories.values().map(Vec::len).sum()
    }
}

/// Fetches each ticker in turn, pacing requests and skipping failures.
pub async fn fetch_price_histories(
    source: &dyn PriceSource,
    tickers: &[Ticker],
    range: DateRange,
    pacer: &RequestPacer,
) -> PriceBatch {
    let mut batch = PriceBatch::default();

    for ticker in tickers {
        pacer.wait().await;
        tracing::info!(source = source.name(), ticker = %ticker, %range, "fetching price history");

        let request = PriceHistoryRequest::new(ticker.clone(), range);
        match source.price_history(request).await {
            Ok(observations) if observations.is_empty() => {
                let error = SourceError::empty_result(format!("no prices returned for {ticker}"));
                tracing::warn!(ticker = %ticker, code = error.code(), "{}", error.message());
                batch.failures.push(FetchFailure {
                    ticker: ticker.clone(),
                    error,
                });
            }
            Ok(observations) => {
                tracing::debug!(ticker = %ticker, bars = observations.len(), "price history fetched");
                batch.histories.insert(ticker.clone(), observations);
            }
            Err(error) => {
                tracing::warn!(ticker = %ticker, code = error.code(), "price fetch failed: {}", error.message());
                batch.failures.push(FetchFailure {
                    ticker: ticker.clone(),
                    error,
                });
            }
        }
    }

    batch
}
