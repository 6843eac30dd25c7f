//! Tolerant interpretation of gateway HTTP responses.
//!
//! Gateways answer misconfigured requests with HTML error pages, empty
//! bodies or JSON that reports a failure under HTTP 200. Everything here
//! turns those into data; nothing panics on a bad body.

use serde::de::DeserializeOwned;
use serde_json::Value;

use super::SendOutcome;

/// Characters of a malformed body kept in error messages
const BODY_EXCERPT_CHARS: usize = 200;

/// A gateway response read as text and classified
#[derive(Debug, Clone)]
pub struct ParsedResponse {
    pub status: u16,
    pub data: Option<Value>,
    pub error: Option<String>,
}

/// Reads a response body as text and classifies it
pub async fn parse(response: reqwest::Response) -> ParsedResponse {
    let status = response.status().as_u16();

    match response.text().await {
        Ok(body) => classify_body(status, &body),
        Err(e) => ParsedResponse {
            status,
            data: None,
            error: Some(format!("Failed to read response body: {}", e.without_url())),
        },
    }
}

/// Classifies a raw body: HTML page, JSON document, empty, or garbage
pub fn classify_body(status: u16, body: &str) -> ParsedResponse {
    let trimmed = body.trim_start();

    if trimmed.is_empty() {
        return ParsedResponse {
            status,
            data: None,
            error: None,
        };
    }

    if looks_like_html(trimmed) {
        return ParsedResponse {
            status,
            data: None,
            error: Some(
                "Non-JSON response (HTML page), check the API URL and endpoint".to_string(),
            ),
        };
    }

    match serde_json::from_str::<Value>(trimmed) {
        Ok(data) => ParsedResponse {
            status,
            data: Some(data),
            error: None,
        },
        Err(_) => ParsedResponse {
            status,
            data: None,
            error: Some(format!("Invalid JSON response: {}", excerpt(trimmed))),
        },
    }
}

fn looks_like_html(body: &str) -> bool {
    let head: String = body.chars().take(9).collect::<String>().to_ascii_lowercase();
    head.starts_with("<!doctype") || head.starts_with("<html")
}

fn excerpt(body: &str) -> String {
    let mut chars = body.chars();
    let head: String = chars.by_ref().take(BODY_EXCERPT_CHARS).collect();
    if chars.next().is_some() {
        format!("{}...", head)
    } else {
        head
    }
}

/// Failure reported inside an otherwise well-formed JSON body.
///
/// Either `"status": "error"` or a non-empty `error` field.
pub fn logical_error(data: &Value) -> Option<String> {
    let status_is_error = data
        .get("status")
        .and_then(Value::as_str)
        .is_some_and(|s| s.eq_ignore_ascii_case("error"));

    let error_field = data.get("error").filter(|e| match e {
        Value::Null | Value::Bool(false) => false,
        Value::String(s) => !s.trim().is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
        _ => true,
    });

    if !status_is_error && error_field.is_none() {
        return None;
    }

    Some(
        provider_message(data)
            .unwrap_or_else(|| "Provider reported an error".to_string()),
    )
}

/// Best human-readable message in a provider's JSON body
fn provider_message(data: &Value) -> Option<String> {
    let as_text = |v: &Value| match v {
        Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
        Value::Object(o) => o
            .get("message")
            .and_then(Value::as_str)
            .map(str::to_string),
        _ => None,
    };

    data.get("message")
        .and_then(as_text)
        .or_else(|| data.get("error").and_then(as_text))
        .or_else(|| data.get("response").and_then(|r| r.get("message")).and_then(as_text))
}

impl ParsedResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Failed outcome if the response is a transport-level or logical failure
    pub fn failure(&self) -> Option<SendOutcome> {
        let status = Some(self.status);

        if !self.is_success() {
            let detail = self
                .error
                .clone()
                .or_else(|| self.data.as_ref().and_then(provider_message));
            let message = match detail {
                Some(detail) => format!("HTTP {}: {}", self.status, detail),
                None => format!("HTTP {}", self.status),
            };
            return Some(SendOutcome::failure(message, status));
        }

        if let Some(ref error) = self.error {
            return Some(SendOutcome::failure(error.clone(), status));
        }

        self.data
            .as_ref()
            .and_then(logical_error)
            .map(|error| SendOutcome::failure(error, status))
    }

    /// Decodes the JSON body into a provider schema. An empty body decodes
    /// to the schema's default.
    pub fn decode<T: DeserializeOwned + Default>(&self) -> Result<T, SendOutcome> {
        match self.data {
            None => Ok(T::default()),
            Some(ref data) => serde_json::from_value(data.clone()).map_err(|e| {
                SendOutcome::failure(
                    format!("Unexpected response shape: {}", e),
                    Some(self.status),
                )
            }),
        }
    }

    /// Decodes like [`decode`](Self::decode), but a body of any other shape
    /// becomes the schema's default. For gateways whose acknowledgement
    /// body carries nothing required.
    pub fn decode_or_default<T: DeserializeOwned + Default>(&self) -> T {
        self.decode().unwrap_or_else(|outcome| {
            log::debug!(
                "Ignoring unrecognized gateway body: {}",
                outcome.error.unwrap_or_default()
            );
            T::default()
        })
    }
}
