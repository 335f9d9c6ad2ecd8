use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use serde::Deserialize;

use crate::config::PriceApiConfig;
use crate::http_client::{HttpAuth, HttpClient, HttpRequest, ReqwestHttpClient};
use crate::price_source::{PriceHistoryRequest, PriceSource, SourceError};
use crate::{CalendarDate, PriceObservation, Ticker};

/// Daily price history from the financialdatasets.ai `/prices` endpoint.
#[derive(Clone)]
pub struct FinancialDatasetsAdapter {
    http_client: Arc<dyn HttpClient>,
    config: PriceApiConfig,
}

impl FinancialDatasetsAdapter {
    pub fn new(config: PriceApiConfig) -> Self {
        Self::with_http_client(Arc::new(ReqwestHttpClient::default()), config)
    }

    pub fn with_http_client(http_client: Arc<dyn HttpClient>, config: PriceApiConfig) -> Self {
        Self {
            http_client,
            config,
        }
    }

    fn build_request(&self, req: &PriceHistoryRequest) -> Result<HttpRequest, SourceError> {
        let api_key = self.config.api_key.as_deref().ok_or_else(|| {
            SourceError::invalid_request("financialdatasets API key is not configured (FDA_API_KEY)")
        })?;

        Ok(HttpRequest::get(&self.config.base_url)
            .with_query("ticker", req.ticker.as_str())
            .with_query("start_date", req.range.start.format_iso())
            .with_query("end_date", req.range.end.format_iso())
            .with_query("interval", "day")
            .with_query("interval_multiplier", "1")
            .with_timeout_ms(self.config.timeout_ms)
            .with_auth(&HttpAuth::Header {
                name: String::from("X-API-KEY"),
                value: api_key.to_owned(),
            }))
    }

    async fn fetch(&self, req: PriceHistoryRequest) -> Result<Vec<PriceObservation>, SourceError> {
        let request = self.build_request(&req)?;

        let response = self.http_client.execute(request).await.map_err(|error| {
            if error.is_timeout() {
                SourceError::timeout(format!(
                    "financialdatasets request timed out: {}",
                    error.message()
                ))
            } else {
                SourceError::transport(format!(
                    "financialdatasets transport error: {}",
                    error.message()
                ))
            }
        })?;

        if !response.is_success() {
            return Err(SourceError::upstream_status(
                response.status,
                format!("financialdatasets returned status {}", response.status),
            ));
        }

        let payload: PricesResponse = serde_json::from_str(&response.body).map_err(|e| {
            SourceError::malformed_response(format!("failed to parse financialdatasets prices: {e}"))
        })?;

        let bars = payload.prices.ok_or_else(|| {
            SourceError::malformed_response(format!(
                "financialdatasets response for {} has no 'prices' list",
                req.ticker
            ))
        })?;

        let observations = normalize_bars(&req.ticker, bars);
        if observations.is_empty() {
            return Err(SourceError::empty_result(format!(
                "financialdatasets returned no usable prices for {}",
                req.ticker
            )));
        }

        Ok(observations)
    }
}

impl PriceSource for FinancialDatasetsAdapter {
    fn name(&self) -> &'static str {
        "financialdatasets"
    }

    fn price_history<'a>(
        &'a self,
        req: PriceHistoryRequest,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<PriceObservation>, SourceError>> + Send + 'a>> {
        Box::pin(self.fetch(req))
    }
}

#[derive(Debug, Deserialize)]
struct PricesResponse {
    #[serde(default)]
    prices: Option<Vec<PriceBar>>,
}

/// One bar as sent upstream. Fields stay loose so a single bad bar is
/// skipped instead of failing the whole response.
#[derive(Debug, Deserialize)]
struct PriceBar {
    time: Option<serde_json::Value>,
    close: Option<serde_json::Value>,
}

fn normalize_bars(ticker: &Ticker, bars: Vec<PriceBar>) -> Vec<PriceObservation> {
    bars.into_iter()
        .filter_map(|bar| {
            let Some(time) = bar.time.as_ref().and_then(serde_json::Value::as_str) else {
                tracing::debug!(ticker = %ticker, time = ?bar.time, "skipping bar without a time string");
                return None;
            };
            let date = match CalendarDate::parse(time) {
                Ok(date) => date,
                Err(error) => {
                    tracing::debug!(ticker = %ticker, time, "skipping bar: {error}");
                    return None;
                }
            };
            let Some(close) = bar.close.as_ref().and_then(serde_json::Value::as_f64) else {
                tracing::debug!(ticker = %ticker, %date, close = ?bar.close, "skipping bar without a numeric close");
                return None;
            };
            match PriceObservation::new(ticker.clone(), date, close) {
                Ok(observation) => Some(observation),
                Err(error) => {
                    tracing::debug!(ticker = %ticker, %date, "skipping bar: {error}");
                    None
                }
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http_client::{HttpError, HttpResponse};
    use crate::price_source::SourceErrorKind;
    use crate::DateRange;
    use std::sync::Mutex;

    #[derive(Debug)]
    struct RecordingHttpClient {
        response: Result<HttpResponse, HttpError>,
        requests: Mutex<Vec<HttpRequest>>,
    }

    impl RecordingHttpClient {
        fn returning(response: Result<HttpResponse, HttpError>) -> Self {
            Self {
                response,
                requests: Mutex::new(Vec::new()),
            }
        }

        fn recorded_requests(&self) -> Vec<HttpRequest> {
            self.requests
                .lock()
                .expect("request store should not be poisoned")
                .clone()
        }
    }

    impl HttpClient for RecordingHttpClient {
        fn execute<'a>(
            &'a self,
            request: HttpRequest,
        ) -> Pin<Box<dyn Future<Output = Result<HttpResponse, HttpError>> + Send + 'a>> {
            self.requests
                .lock()
                .expect("request store should not be poisoned")
                .push(request);
            let response = self.response.clone();
            Box::pin(async move { response })
        }
    }

    fn request() -> PriceHistoryRequest {
        PriceHistoryRequest::new(
            Ticker::parse("AAPL").expect("ticker"),
            DateRange::new(
                CalendarDate::parse("2024-10-25").expect("date"),
                CalendarDate::parse("2024-11-08").expect("date"),
            )
            .expect("range"),
        )
    }

    fn adapter(client: Arc<RecordingHttpClient>) -> FinancialDatasetsAdapter {
        FinancialDatasetsAdapter::with_http_client(
            client,
            PriceApiConfig {
                api_key: Some(String::from("fda-key")),
                ..PriceApiConfig::default()
            },
        )
    }

    #[tokio::test]
    async fn sends_day_interval_query_and_api_key_header() {
        let client = Arc::new(RecordingHttpClient::returning(Ok(HttpResponse::ok_json(
            r#"{"prices":[{"time":"2024-10-31T04:00:00Z","close":180.5}]}"#,
        ))));

        adapter(client.clone())
            .price_history(request())
            .await
            .expect("fetch should succeed");

        let requests = client.recorded_requests();
        assert_eq!(requests.len(), 1);
        let sent = &requests[0];
        assert_eq!(sent.query_value("ticker"), Some("AAPL"));
        assert_eq!(sent.query_value("start_date"), Some("2024-10-25"));
        assert_eq!(sent.query_value("end_date"), Some("2024-11-08"));
        assert_eq!(sent.query_value("interval"), Some("day"));
        assert_eq!(sent.query_value("interval_multiplier"), Some("1"));
        assert_eq!(sent.headers.get("x-api-key").map(String::as_str), Some("fda-key"));
    }

    #[tokio::test]
    async fn normalizes_timestamps_to_calendar_dates() {
        let client = Arc::new(RecordingHttpClient::returning(Ok(HttpResponse::ok_json(
            r#"{"ticker":"AAPL","prices":[
                {"time":"2024-10-31 00:00:00 EDT","open":1.0,"close":180.5},
                {"time":"garbage","close":181.0},
                {"time":"2024-11-01T20:00:00-04:00","close":182.25}
            ]}"#,
        ))));

        let observations = adapter(client)
            .price_history(request())
            .await
            .expect("fetch should succeed");

        assert_eq!(observations.len(), 2);
        assert_eq!(observations[0].date.format_iso(), "2024-10-31");
        assert_eq!(observations[1].date.format_iso(), "2024-11-01");
        assert_eq!(observations[1].close, 182.25);
        assert!(observations.iter().all(|o| o.ticker.as_str() == "AAPL"));
    }

    #[tokio::test]
    async fn skips_bars_without_usable_close_or_time() {
        let client = Arc::new(RecordingHttpClient::returning(Ok(HttpResponse::ok_json(
            r#"{"prices":[
                {"time":"2024-10-31","close":180.0},
                {"time":"2024-11-01","close":null},
                {"time":"2024-11-04"},
                {"time":20241105,"close":185.0},
                {"close":186.0},
                {"time":"2024-11-06","close":"n/a"},
                {"time":"2024-11-07","close":190.0}
            ]}"#,
        ))));

        let observations = adapter(client)
            .price_history(request())
            .await
            .expect("valid bars should survive");

        let kept = observations
            .iter()
            .map(|o| (o.date.format_iso(), o.close))
            .collect::<Vec<_>>();
        assert_eq!(
            kept,
            vec![
                (String::from("2024-10-31"), 180.0),
                (String::from("2024-11-07"), 190.0)
            ]
        );
    }

    #[tokio::test]
    async fn missing_api_key_is_rejected_before_sending() {
        let client = Arc::new(RecordingHttpClient::returning(Ok(HttpResponse::ok_json(
            r#"{"prices":[]}"#,
        ))));
        let source = FinancialDatasetsAdapter::with_http_client(
            client.clone(),
            PriceApiConfig {
                api_key: None,
                ..PriceApiConfig::default()
            },
        );

        let error = source
            .price_history(request())
            .await
            .expect_err("no key must fail");

        assert_eq!(error.kind(), SourceErrorKind::InvalidRequest);
        assert_eq!(error.code(), "source.invalid_request");
        assert!(client.recorded_requests().is_empty());
    }

    #[tokio::test]
    async fn classifies_upstream_faults() {
        let cases = [
            (
                Err(HttpError::new("connection refused")),
                SourceErrorKind::Transport,
            ),
            (
                Err(HttpError::timeout("request timeout")),
                SourceErrorKind::Timeout,
            ),
            (
                Ok(HttpResponse::with_status(429, "slow down")),
                SourceErrorKind::UpstreamStatus,
            ),
            (
                Ok(HttpResponse::ok_json("<html>oops</html>")),
                SourceErrorKind::MalformedResponse,
            ),
            (
                Ok(HttpResponse::ok_json(r#"{"error":"unknown ticker"}"#)),
                SourceErrorKind::MalformedResponse,
            ),
            (
                Ok(HttpResponse::ok_json(r#"{"prices":[]}"#)),
                SourceErrorKind::EmptyResult,
            ),
        ];

        for (response, expected) in cases {
            let client = Arc::new(RecordingHttpClient::returning(response));
            let error = adapter(client)
                .price_history(request())
                .await
                .expect_err("must fail");
            assert_eq!(error.kind(), expected, "{error}");
        }
    }
}
