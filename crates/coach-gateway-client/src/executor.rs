//! Single-request executor for the gateway.
//!
//! One call, one request: no retries. The request races a timeout and an
//! optional caller cancellation token; the response body is read as text and
//! parsed leniently, and failures carry one readable message pulled from
//! whichever error shape the gateway produced.

use std::time::{Duration, Instant};

use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue};
use reqwest::{Method, StatusCode};
use serde_json::{Map, Value, json};
use tokio_util::sync::CancellationToken;

use crate::error::GatewayError;

pub const DEFAULT_TIMEOUT_MS: u64 = 15_000;
const JSON_CONTENT_TYPE: &str = "application/json";

#[derive(Debug, Clone)]
pub struct RequestOptions {
    pub method: Method,
    /// Merged over `Content-Type: application/json`; later entries win.
    pub headers: Vec<(String, String)>,
    pub body: Option<Value>,
    /// Falls back to the executor default when unset.
    pub timeout: Option<Duration>,
    pub cancel: Option<CancellationToken>,
}

impl Default for RequestOptions {
    fn default() -> Self {
        Self {
            method: Method::GET,
            headers: Vec::new(),
            body: None,
            timeout: None,
            cancel: None,
        }
    }
}

impl RequestOptions {
    #[must_use]
    pub fn get() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn post(body: Value) -> Self {
        Self {
            method: Method::POST,
            body: Some(body),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    #[must_use]
    pub fn with_cancel(mut self, cancel: CancellationToken) -> Self {
        self.cancel = Some(cancel);
        self
    }
}

/// Status and untouched body text of a completed exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawResponse {
    pub status: StatusCode,
    pub text: String,
}

#[derive(Debug, Clone)]
pub struct RequestExecutor {
    http: reqwest::Client,
    default_timeout: Duration,
}

impl Default for RequestExecutor {
    fn default() -> Self {
        Self::new()
    }
}

impl RequestExecutor {
    #[must_use]
    pub fn new() -> Self {
        Self::with_http(reqwest::Client::new())
    }

    #[must_use]
    pub fn with_http(http: reqwest::Client) -> Self {
        Self {
            http,
            default_timeout: Duration::from_millis(DEFAULT_TIMEOUT_MS),
        }
    }

    #[must_use]
    pub fn with_default_timeout(mut self, timeout: Duration) -> Self {
        self.default_timeout = timeout;
        self
    }

    #[must_use]
    pub fn default_timeout(&self) -> Duration {
        self.default_timeout
    }

    /// Parsed body on 2xx, [`GatewayError::Http`] with an extracted message
    /// otherwise.
    pub async fn fetch_json(
        &self,
        base_url: &str,
        path: &str,
        options: RequestOptions,
    ) -> Result<Value, GatewayError> {
        let method = options.method.clone();
        let response = self.send(base_url, path, options).await?;
        let body = parse_body(&response.text);
        if response.status.is_success() {
            return Ok(body);
        }

        let message = extract_error_message(&body, response.status);
        tracing::warn!(
            %method,
            path,
            status = response.status.as_u16(),
            message = %message,
            "gateway rejected request"
        );
        Err(GatewayError::Http {
            status: response.status,
            message,
        })
    }

    /// Runs the exchange without classifying the status.
    pub async fn send(
        &self,
        base_url: &str,
        path: &str,
        options: RequestOptions,
    ) -> Result<RawResponse, GatewayError> {
        let RequestOptions {
            method,
            headers,
            body,
            timeout,
            cancel,
        } = options;

        let url = endpoint(base_url, path)?;
        let timeout = timeout.unwrap_or(self.default_timeout);
        let timeout_ms = timeout.as_millis() as u64;

        let mut request = self
            .http
            .request(method.clone(), url.as_str())
            .headers(merge_headers(&headers)?);
        if let Some(body) = body.as_ref() {
            let encoded =
                serde_json::to_vec(body).map_err(|error| GatewayError::Encode(error.to_string()))?;
            request = request.body(encoded);
        }

        let cancel = cancel.unwrap_or_default();
        let started = Instant::now();
        tracing::debug!(%method, url = %url, timeout_ms, "gateway request started");

        // The timer and the in-flight request are both owned by this select;
        // whichever branch loses is dropped before it returns.
        let outcome = tokio::select! {
            biased;
            () = cancel.cancelled() => Err(GatewayError::Cancelled),
            () = tokio::time::sleep(timeout) => Err(GatewayError::Timeout { timeout_ms }),
            result = read_response(request) => result,
        };

        let elapsed_ms = started.elapsed().as_millis() as u64;
        match &outcome {
            Ok(response) => tracing::debug!(
                %method,
                url = %url,
                status = response.status.as_u16(),
                elapsed_ms,
                "gateway request finished"
            ),
            Err(error) => tracing::warn!(
                %method,
                url = %url,
                elapsed_ms,
                error = %error,
                "gateway request did not complete"
            ),
        }
        outcome
    }
}

async fn read_response(request: reqwest::RequestBuilder) -> Result<RawResponse, GatewayError> {
    let response = request.send().await?;
    let status = response.status();
    let text = response.text().await?;
    Ok(RawResponse { status, text })
}

/// Absolute `http(s)://` paths are used as-is; anything else is joined onto
/// the base URL.
pub fn endpoint(base_url: &str, path: &str) -> Result<String, GatewayError> {
    let path = path.trim();
    if is_absolute_url(path) {
        return Ok(path.to_string());
    }

    let base = base_url.trim().trim_end_matches('/');
    if base.is_empty() {
        return Err(GatewayError::InvalidUrl("gateway URL is empty".to_string()));
    }
    if !is_absolute_url(base) {
        return Err(GatewayError::InvalidUrl(base.to_string()));
    }

    if path.is_empty() {
        Ok(base.to_string())
    } else if path.starts_with('/') {
        Ok(format!("{base}{path}"))
    } else {
        Ok(format!("{base}/{path}"))
    }
}

fn is_absolute_url(value: &str) -> bool {
    value.starts_with("http://") || value.starts_with("https://")
}

fn merge_headers(extra: &[(String, String)]) -> Result<HeaderMap, GatewayError> {
    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static(JSON_CONTENT_TYPE));
    for (raw_name, raw_value) in extra {
        let name = HeaderName::from_bytes(raw_name.trim().as_bytes())
            .map_err(|_| GatewayError::Encode(format!("invalid header name `{raw_name}`")))?;
        let value = HeaderValue::from_str(raw_value)
            .map_err(|_| GatewayError::Encode(format!("invalid value for header `{raw_name}`")))?;
        headers.insert(name, value);
    }
    Ok(headers)
}

/// Empty body reads as `{}`; anything that is not JSON is wrapped as
/// `{"raw": <text>}`.
#[must_use]
pub fn parse_body(text: &str) -> Value {
    if text.is_empty() {
        return Value::Object(Map::new());
    }
    serde_json::from_str(text).unwrap_or_else(|_| json!({ "raw": text }))
}

/// First match wins:
/// 1. `detail` as a list of `{loc, msg}` validation errors, flattened to
///    `loc.path: msg` entries joined by ` | `
/// 2. `detail`, `message`, or `error` as a non-blank string
/// 3. non-blank `raw` text
///
/// Whitespace-only strings count as empty, so the result always carries
/// readable text.
/// 4. the status reason phrase, or `Request failed: <code>`
#[must_use]
pub fn extract_error_message(body: &Value, status: StatusCode) -> String {
    if let Some(summary) = validation_summary(body.get("detail")) {
        return summary;
    }

    for field in ["detail", "message", "error", "raw"] {
        if let Some(text) = body
            .get(field)
            .and_then(Value::as_str)
            .filter(|text| !text.trim().is_empty())
        {
            return text.to_string();
        }
    }

    status.canonical_reason().map_or_else(
        || format!("Request failed: {}", status.as_u16()),
        ToString::to_string,
    )
}

fn validation_summary(detail: Option<&Value>) -> Option<String> {
    let entries = detail?.as_array()?;
    let parts = entries
        .iter()
        .filter_map(|entry| {
            let message = entry.get("msg").and_then(Value::as_str)?;
            let location = entry
                .get("loc")
                .and_then(Value::as_array)
                .map(|segments| {
                    segments
                        .iter()
                        .filter_map(location_segment)
                        .collect::<Vec<_>>()
                        .join(".")
                })
                .unwrap_or_default();
            Some(if location.is_empty() {
                message.to_string()
            } else {
                format!("{location}: {message}")
            })
        })
        .collect::<Vec<_>>();

    if parts.is_empty() {
        None
    } else {
        Some(parts.join(" | "))
    }
}

fn location_segment(segment: &Value) -> Option<String> {
    match segment {
        Value::String(text) => Some(text.clone()),
        Value::Number(number) => Some(number.to_string()),
        _ => None,
    }
}
