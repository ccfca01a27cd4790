//! Transport envelope for the Helio GraphQL endpoint.
//!
//! [`HelioClient::execute`] performs exactly one HTTP round trip and folds
//! every outcome (network failure, HTTP status, malformed body, GraphQL
//! errors) into an [`OperationOutcome`]. It never retries; retry policy
//! lives in [`crate::polling`] only.

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde_json::Value;

use helio_core::config::ClientConfig;
use helio_core::error::HelioError;

use crate::operations::RemoteOperation;

/// Response header carrying the service-side correlation id.
pub const CORRELATION_HEADER: &str = "trace-id";
pub const CLIENT_NAME_HEADER: HeaderName = HeaderName::from_static("helioadditive-client-name");
pub const CLIENT_VERSION_HEADER: HeaderName =
    HeaderName::from_static("helioadditive-client-version");

/// Characters of a non-200 body kept in the error message.
const ERROR_BODY_EXCERPT: usize = 500;

// ---------------------------------------------------------------------------
// Outcome
// ---------------------------------------------------------------------------

/// Normalized result of one envelope call.
///
/// Callers must check `errors` before `data`: a response may carry both.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OperationOutcome {
    pub data: Option<Value>,
    pub errors: Option<Vec<String>>,
    /// Correlation id from the response, empty when not supplied.
    pub correlation_id: String,
    /// Set when `errors` came from the network/HTTP layer rather than
    /// from the GraphQL body.
    pub transport_failure: bool,
}

impl OperationOutcome {
    /// Successful outcome carrying `data`.
    pub fn success(data: Value) -> Self {
        Self {
            data: Some(data),
            ..Self::default()
        }
    }

    /// A network or HTTP-layer failure with a single message.
    pub fn transport_error(message: impl Into<String>, correlation_id: impl Into<String>) -> Self {
        Self {
            data: None,
            errors: Some(vec![message.into()]),
            correlation_id: correlation_id.into(),
            transport_failure: true,
        }
    }

    /// Structured GraphQL errors returned by the service.
    pub fn service_errors(messages: Vec<String>, correlation_id: impl Into<String>) -> Self {
        Self {
            data: None,
            errors: Some(messages),
            correlation_id: correlation_id.into(),
            transport_failure: false,
        }
    }

    /// Interpret a parsed 200 response body.
    ///
    /// `errors` may be a list of error objects or a single object; each
    /// entry contributes its `message`, or its JSON text when it has none.
    /// An empty error list counts as success.
    pub fn from_body(mut body: Value, correlation_id: impl Into<String>) -> Self {
        let errors: Option<Vec<String>> = match body.get("errors") {
            Some(Value::Array(entries)) => Some(entries.iter().map(error_message).collect()),
            Some(entry @ Value::Object(_)) => Some(vec![error_message(entry)]),
            _ => None,
        };
        let errors = errors.filter(|messages| !messages.is_empty());

        let data = body
            .get_mut("data")
            .map(Value::take)
            .filter(|d| !d.is_null());

        Self {
            data,
            errors,
            correlation_id: correlation_id.into(),
            transport_failure: false,
        }
    }

    pub fn is_success(&self) -> bool {
        self.errors.is_none()
    }

    /// Convert into the `data` payload, or the error the outcome represents.
    pub fn into_data(self, operation: &'static str) -> Result<Value, HelioError> {
        if let Some(messages) = self.errors {
            return Err(if self.transport_failure {
                HelioError::Transport {
                    operation,
                    message: messages.join("; "),
                    correlation_id: self.correlation_id,
                }
            } else {
                HelioError::Protocol {
                    operation,
                    messages,
                    correlation_id: self.correlation_id,
                }
            });
        }
        self.data.ok_or_else(|| HelioError::UnexpectedResponse {
            operation,
            message: "response contained no data".into(),
        })
    }
}

fn error_message(entry: &Value) -> String {
    match entry {
        Value::String(s) => s.clone(),
        Value::Object(map) => match map.get("message") {
            Some(Value::String(msg)) => msg.clone(),
            _ => entry.to_string(),
        },
        other => other.to_string(),
    }
}

/// Deserialize a required, non-null field of a `data` payload.
pub fn take_field<T: DeserializeOwned>(
    data: &mut Value,
    field: &str,
    operation: &'static str,
) -> Result<T, HelioError> {
    take_optional_field(data, field, operation)?.ok_or_else(|| HelioError::UnexpectedResponse {
        operation,
        message: format!("`{field}` was null or missing"),
    })
}

/// Deserialize an optional field of a `data` payload; null and missing
/// both yield `None`.
pub fn take_optional_field<T: DeserializeOwned>(
    data: &mut Value,
    field: &str,
    operation: &'static str,
) -> Result<Option<T>, HelioError> {
    match data.get_mut(field).map(Value::take) {
        None | Some(Value::Null) => Ok(None),
        Some(value) => serde_json::from_value(value)
            .map(Some)
            .map_err(|e| HelioError::UnexpectedResponse {
                operation,
                message: format!("could not decode `{field}`: {e}"),
            }),
    }
}

// ---------------------------------------------------------------------------
// Transport seam
// ---------------------------------------------------------------------------

/// Executes one remote operation. Implementations must be stateless
/// between calls so a single instance can serve concurrent poll loops.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn execute(&self, operation: &RemoteOperation) -> OperationOutcome;
}

/// HTTP client for the Helio GraphQL endpoint.
#[derive(Debug, Clone)]
pub struct HelioClient {
    http: reqwest::Client,
    config: ClientConfig,
}

impl HelioClient {
    /// Create a client with its own connection pool.
    pub fn new(config: ClientConfig) -> Result<Self, HelioError> {
        if config.token.trim().is_empty() {
            return Err(HelioError::Config("access token must not be empty".into()));
        }
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| HelioError::Config(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { http, config })
    }

    /// Create a client reusing an existing [`reqwest::Client`].
    pub fn with_client(http: reqwest::Client, config: ClientConfig) -> Self {
        Self { http, config }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn api_url(&self) -> &str {
        &self.config.api_url
    }

    /// Identity and credential headers sent with every request.
    pub fn headers(&self) -> Result<HeaderMap, HelioError> {
        let value = |v: &str| {
            HeaderValue::from_str(v)
                .map_err(|_| HelioError::Config(format!("invalid header value: {v:?}")))
        };

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(AUTHORIZATION, value(&format!("Bearer {}", self.config.token))?);
        headers.insert(CLIENT_NAME_HEADER, value(&self.config.client_name)?);
        headers.insert(CLIENT_VERSION_HEADER, value(&self.config.client_version)?);
        Ok(headers)
    }
}

#[async_trait]
impl Transport for HelioClient {
    async fn execute(&self, operation: &RemoteOperation) -> OperationOutcome {
        let headers = match self.headers() {
            Ok(h) => h,
            Err(e) => return OperationOutcome::transport_error(e.to_string(), ""),
        };

        let mut payload = serde_json::json!({ "query": operation.query });
        if operation.has_variables() {
            payload["variables"] = operation.variables.clone();
        }

        tracing::debug!(operation = operation.name, url = %self.config.api_url, "Sending request");

        let response = match self
            .http
            .post(&self.config.api_url)
            .headers(headers)
            .json(&payload)
            .send()
            .await
        {
            Ok(r) => r,
            Err(e) => {
                tracing::warn!(operation = operation.name, error = %e, "Request failed");
                return OperationOutcome::transport_error(format!("Network error: {e}"), "");
            }
        };

        let correlation_id = response
            .headers()
            .get(CORRELATION_HEADER)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();

        let status = response.status();
        match status {
            StatusCode::OK => {}
            StatusCode::UNAUTHORIZED => {
                return OperationOutcome::transport_error(
                    "HTTP 401 Unauthorized - check your access credential.",
                    correlation_id,
                );
            }
            StatusCode::TOO_MANY_REQUESTS => {
                return OperationOutcome::transport_error(
                    "HTTP 429 - quota exceeded or rate limited.",
                    correlation_id,
                );
            }
            other => {
                let body = response.text().await.unwrap_or_default();
                let excerpt: String = body.chars().take(ERROR_BODY_EXCERPT).collect();
                tracing::warn!(
                    operation = operation.name,
                    status = other.as_u16(),
                    correlation_id = %correlation_id,
                    "Unexpected HTTP status",
                );
                return OperationOutcome::transport_error(
                    format!("HTTP {}: {excerpt}", other.as_u16()),
                    correlation_id,
                );
            }
        }

        let bytes = match response.bytes().await {
            Ok(b) => b,
            Err(e) => {
                return OperationOutcome::transport_error(
                    format!("Network error: {e}"),
                    correlation_id,
                );
            }
        };

        match serde_json::from_slice::<Value>(&bytes) {
            Ok(body) => {
                let outcome = OperationOutcome::from_body(body, correlation_id);
                if let Some(errors) = &outcome.errors {
                    tracing::debug!(
                        operation = operation.name,
                        count = errors.len(),
                        correlation_id = %outcome.correlation_id,
                        "Service returned errors",
                    );
                }
                outcome
            }
            Err(_) => {
                OperationOutcome::transport_error("Failed to parse JSON response.", correlation_id)
            }
        }
    }
}
