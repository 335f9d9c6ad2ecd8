//! Narrative summaries of drift results.
//!
//! The results table is rendered as text and sent with a fixed analyst
//! prompt to a [`SummaryService`]. [`NarrativeSummarizer::summarize`] never
//! fails: an empty table or a service failure yields a descriptive string.

use std::fmt::Write as _;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::ChatConfig;
use crate::http_client::{HttpAuth, HttpClient, HttpRequest, ReqwestHttpClient};
use crate::DriftResult;

pub const EMPTY_SUMMARY: &str = "No data available for summary.";

pub const SYSTEM_PROMPT: &str = "You are a financial analyst specialized in earnings reports.";

const TABLE_COLUMNS: &str =
    "Ticker, Date, EPS_Actual, EPS_Consensus, Price_Before, Price_After, CAR, Surprise_Category";

/// Chat role of a prompt message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    System,
    User,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }
}

/// Provider-neutral summary request: a system message followed by a user message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SummaryRequest {
    pub messages: Vec<ChatMessage>,
}

/// Summarization service failures.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SummaryError {
    #[error("summary service API key is not configured")]
    MissingApiKey,
    #[error("summary service unreachable: {0}")]
    Transport(String),
    #[error("summary service returned status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("summary service response was malformed: {0}")]
    MalformedResponse(String),
    #[error("summary service returned an empty completion")]
    EmptyCompletion,
}

/// Opaque text-completion backend.
pub trait SummaryService: Send + Sync {
    fn complete<'a>(
        &'a self,
        request: SummaryRequest,
    ) -> Pin<Box<dyn Future<Output = Result<String, SummaryError>> + Send + 'a>>;
}

/// Renders drift results as a fixed-width text table.
pub fn render_results_table(results: &[DriftResult]) -> String {
    let mut table = format!(
        "{:<8} {:<10} {:>10} {:>13} {:>12} {:>12} {:>9} {:<17}\n",
        "Ticker",
        "Date",
        "EPS_Actual",
        "EPS_Consensus",
        "Price_Before",
        "Price_After",
        "CAR",
        "Surprise_Category"
    );

    for result in results {
        let event = &result.event;
        let _ = writeln!(
            table,
            "{:<8} {:<10} {:>10.4} {:>13.4} {:>12.2} {:>12.2} {:>9.4} {:<17}",
            event.ticker.as_str(),
            event.report_date.format_iso(),
            event.eps_actual,
            event.eps_consensus,
            event.price_before,
            event.price_after,
            result.car,
            result.surprise_category.as_str()
        );
    }

    table
}

/// Builds the analyst prompt for a set of drift results.
pub fn build_summary_request(results: &[DriftResult]) -> SummaryRequest {
    let table = render_results_table(results);
    let prompt = format!(
        "You are a financial analyst assistant.\n\
         \n\
         Given the following earnings drift data (with columns: {TABLE_COLUMNS}):\n\
         \n\
         {table}\n\
         Write a professional, concise summary for a financial report including:\n\
         - General insights about CAR\n\
         - How different Surprise Categories performed\n\
         - Any notable company mentions\n\
         - Mention average CAR trends if possible\n"
    );

    SummaryRequest {
        messages: vec![ChatMessage::system(SYSTEM_PROMPT), ChatMessage::user(prompt)],
    }
}

/// Produces the narrative for a results table, recovering from every failure.
#[derive(Clone)]
pub struct NarrativeSummarizer {
    service: Arc<dyn SummaryService>,
}

impl NarrativeSummarizer {
    pub fn new(service: Arc<dyn SummaryService>) -> Self {
        Self { service }
    }

    pub async fn summarize(&self, results: &[DriftResult]) -> String {
        if results.is_empty() {
            return String::from(EMPTY_SUMMARY);
        }

        match self.service.complete(build_summary_request(results)).await {
            Ok(summary) => summary,
            Err(error) => {
                tracing::warn!("narrative generation failed: {error}");
                format!("Narrative generation failed: {error}")
            }
        }
    }
}

/// OpenAI-compatible chat-completions backend.
#[derive(Clone)]
pub struct ChatCompletionService {
    http_client: Arc<dyn HttpClient>,
    config: ChatConfig,
}

impl ChatCompletionService {
    pub fn new(config: ChatConfig) -> Self {
        Self::with_http_client(Arc::new(ReqwestHttpClient::default()), config)
    }

    pub fn with_http_client(http_client: Arc<dyn HttpClient>, config: ChatConfig) -> Self {
        Self {
            http_client,
            config,
        }
    }

    async fn execute(&self, request: SummaryRequest) -> Result<String, SummaryError> {
        let api_key = self
            .config
            .api_key
            .as_deref()
            .ok_or(SummaryError::MissingApiKey)?;

        let payload = ChatCompletionPayload {
            model: &self.config.model,
            messages: &request.messages,
            temperature: self.config.temperature,
            max_tokens: self.config.max_tokens,
        };
        let body = serde_json::to_string(&payload)
            .map_err(|e| SummaryError::MalformedResponse(format!("failed to encode request: {e}")))?;

        let http_request = HttpRequest::post(&self.config.endpoint)
            .with_auth(&HttpAuth::BearerToken(api_key.to_owned()))
            .with_json_body(body)
            .with_timeout_ms(self.config.timeout_ms);

        let response = self
            .http_client
            .execute(http_request)
            .await
            .map_err(|e| SummaryError::Transport(e.message().to_owned()))?;

        if !response.is_success() {
            return Err(SummaryError::Status {
                status: response.status,
                body: truncate(&response.body, 200),
            });
        }

        let completion: ChatCompletionResponse = serde_json::from_str(&response.body)
            .map_err(|e| SummaryError::MalformedResponse(e.to_string()))?;

        let content = completion
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .map(|content| content.trim().to_owned())
            .unwrap_or_default();

        if content.is_empty() {
            return Err(SummaryError::EmptyCompletion);
        }
        Ok(content)
    }
}

impl SummaryService for ChatCompletionService {
    fn complete<'a>(
        &'a self,
        request: SummaryRequest,
    ) -> Pin<Box<dyn Future<Output = Result<String, SummaryError>> + Send + 'a>> {
        Box::pin(self.execute(request))
    }
}

#[derive(Debug, Serialize)]
struct ChatCompletionPayload<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

fn truncate(value: &str, max_chars: usize) -> String {
    value.chars().take(max_chars).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http_client::{HttpError, HttpResponse};
    use crate::{CalendarDate, JoinedEvent, SurpriseCategory, Ticker};
    use std::sync::Mutex;

    struct RecordingHttpClient {
        response: Result<HttpResponse, HttpError>,
        requests: Mutex<Vec<HttpRequest>>,
    }

    impl RecordingHttpClient {
        fn returning(response: Result<HttpResponse, HttpError>) -> Arc<Self> {
            Arc::new(Self {
                response,
                requests: Mutex::new(Vec::new()),
            })
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

    fn sample_results() -> Vec<DriftResult> {
        vec![DriftResult {
            event: JoinedEvent {
                ticker: Ticker::parse("AAPL").expect("ticker"),
                report_date: CalendarDate::parse("2024-11-01").expect("date"),
                eps_actual: 1.25,
                eps_consensus: 1.10,
                price_before: 180.0,
                price_before_date: CalendarDate::parse("2024-10-31").expect("date"),
                price_after: 190.0,
                price_after_date: CalendarDate::parse("2024-11-04").expect("date"),
            },
            car: 10.0 / 180.0,
            surprise_ratio: 0.15 / 1.10,
            surprise_category: SurpriseCategory::Positive,
        }]
    }

    fn config(api_key: Option<&str>) -> ChatConfig {
        ChatConfig {
            api_key: api_key.map(str::to_owned),
            ..ChatConfig::default()
        }
    }

    #[test]
    fn request_has_analyst_system_role_and_table() {
        let request = build_summary_request(&sample_results());

        assert_eq!(request.messages.len(), 2);
        assert_eq!(request.messages[0].role, ChatRole::System);
        assert_eq!(request.messages[0].content, SYSTEM_PROMPT);
        assert_eq!(request.messages[1].role, ChatRole::User);
        let prompt = &request.messages[1].content;
        assert!(prompt.contains("AAPL"));
        assert!(prompt.contains("2024-11-01"));
        assert!(prompt.contains("Positive"));
        assert!(prompt.contains("General insights about CAR"));
    }

    #[tokio::test]
    async fn chat_service_posts_model_messages_and_bearer_token() {
        let client = RecordingHttpClient::returning(Ok(HttpResponse::ok_json(
            r#"{"choices":[{"message":{"role":"assistant","content":"  Drift was positive.  "}}]}"#,
        )));
        let service = ChatCompletionService::with_http_client(client.clone(), config(Some("sk-test")));

        let summary = service
            .complete(build_summary_request(&sample_results()))
            .await
            .expect("completion should succeed");
        assert_eq!(summary, "Drift was positive.");

        let requests = client.recorded_requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(
            requests[0].headers.get("authorization").map(String::as_str),
            Some("Bearer sk-test")
        );
        let body: serde_json::Value =
            serde_json::from_str(requests[0].body.as_deref().expect("body")).expect("json body");
        assert_eq!(body["model"], "gpt-4");
        assert_eq!(body["max_tokens"], 500);
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][1]["role"], "user");
    }

    #[tokio::test]
    async fn missing_api_key_fails_without_calling_upstream() {
        let client = RecordingHttpClient::returning(Ok(HttpResponse::ok_json("{}")));
        let service = ChatCompletionService::with_http_client(client.clone(), config(None));

        let error = service
            .complete(build_summary_request(&sample_results()))
            .await
            .expect_err("must fail");
        assert_eq!(error, SummaryError::MissingApiKey);
        assert!(client.recorded_requests().is_empty());
    }

    #[tokio::test]
    async fn summarizer_falls_back_on_service_failure() {
        let client = RecordingHttpClient::returning(Ok(HttpResponse::with_status(500, "boom")));
        let summarizer = NarrativeSummarizer::new(Arc::new(ChatCompletionService::with_http_client(
            client,
            config(Some("sk-test")),
        )));

        let summary = summarizer.summarize(&sample_results()).await;
        assert!(summary.starts_with("Narrative generation failed:"), "{summary}");
        assert!(summary.contains("500"));
    }

    #[tokio::test]
    async fn summarizer_returns_placeholder_for_empty_input() {
        let client = RecordingHttpClient::returning(Err(HttpError::new("unreachable")));
        let summarizer = NarrativeSummarizer::new(Arc::new(ChatCompletionService::with_http_client(
            client.clone(),
            config(Some("sk-test")),
        )));

        assert_eq!(summarizer.summarize(&[]).await, EMPTY_SUMMARY);
        assert!(client.recorded_requests().is_empty());
    }

    #[tokio::test]
    async fn empty_completion_is_an_error() {
        let client = RecordingHttpClient::returning(Ok(HttpResponse::ok_json(
            r#"{"choices":[{"message":{"content":"   "}}]}"#,
        )));
        let service = ChatCompletionService::with_http_client(client, config(Some("sk-test")));

        let error = service
            .complete(build_summary_request(&sample_results()))
            .await
            .expect_err("must fail");
        assert_eq!(error, SummaryError::EmptyCompletion);
    }
}
