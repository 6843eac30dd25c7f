//! WhatsApp gateway adapters.
//!
//! Every supported gateway speaks its own wire protocol. Each one is a
//! [`ProviderAdapter`] selected by [`create_adapter`] from the closed
//! [`GatewayProvider`] enum.

pub mod evolution;
pub mod response;
pub mod wppconnect;
pub mod zapi;
pub mod zpro;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::{AppError, AppResult};
use crate::models::{GatewayConfig, GatewayProvider};

pub use evolution::EvolutionAdapter;
pub use response::ParsedResponse;
pub use wppconnect::WppConnectAdapter;
pub use zapi::ZapiAdapter;
pub use zpro::ZproAdapter;

// =============================================================================
// Send Outcome
// =============================================================================

/// Result of one send attempt against a gateway
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SendOutcome {
    pub success: bool,
    /// Provider message id (or a synthesized tracking id)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub http_status: Option<u16>,
}

impl SendOutcome {
    pub fn success(message_id: Option<String>, http_status: Option<u16>) -> Self {
        Self {
            success: true,
            message_id,
            error: None,
            http_status,
        }
    }

    pub fn failure(error: impl Into<String>, http_status: Option<u16>) -> Self {
        Self {
            success: false,
            message_id: None,
            error: Some(error.into()),
            http_status,
        }
    }
}

// =============================================================================
// Provider Adapter Trait
// =============================================================================

/// One gateway's request construction and response interpretation.
///
/// `send` never returns an error: HTTP failures, malformed bodies and
/// provider-reported errors all come back as a failed [`SendOutcome`].
#[async_trait]
pub trait ProviderAdapter: Send + Sync {
    /// Send a text message to a normalized phone number
    async fn send(&self, config: &GatewayConfig, phone: &str, message: &str) -> SendOutcome;

    /// Validate a gateway configuration for this provider
    fn validate_config(&self, config: &GatewayConfig) -> AppResult<()>;
}

/// Creates the adapter for a provider
pub fn create_adapter(
    provider: GatewayProvider,
    client: reqwest::Client,
) -> Box<dyn ProviderAdapter> {
    match provider {
        GatewayProvider::Zpro => Box::new(ZproAdapter::new(client)),
        GatewayProvider::Zapi => Box::new(ZapiAdapter::new(client)),
        GatewayProvider::Evolution => Box::new(EvolutionAdapter::new(client)),
        GatewayProvider::Wppconnect => Box::new(WppConnectAdapter::new(client)),
    }
}

/// Builds the shared HTTP client used by every adapter
pub fn build_http_client(timeout: std::time::Duration) -> AppResult<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| AppError::Internal(format!("Failed to create HTTP client: {}", e)))
}

// =============================================================================
// Shared Helpers
// =============================================================================

/// Message id as gateways send it: text, number, or something unexpected
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub(crate) enum MessageId {
    Text(String),
    Number(i64),
    Other(serde_json::Value),
}

impl MessageId {
    pub(crate) fn into_string(self) -> Option<String> {
        match self {
            MessageId::Text(s) if !s.trim().is_empty() => Some(s),
            MessageId::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }
}

/// Field deserializer that treats a value of the wrong shape as absent.
///
/// Use with `#[serde(default, deserialize_with = "lenient")]` on fields a
/// gateway fills inconsistently.
pub(crate) fn lenient<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(serde_json::from_value(value).ok())
}

/// Picks the first usable id among candidates
pub(crate) fn first_id<I>(candidates: I) -> Option<String>
where
    I: IntoIterator<Item = Option<MessageId>>,
{
    candidates
        .into_iter()
        .flatten()
        .find_map(MessageId::into_string)
}

/// Sends a request and classifies the response; transport errors become a failed outcome
pub(crate) async fn execute(request: reqwest::RequestBuilder) -> Result<ParsedResponse, SendOutcome> {
    match request.send().await {
        Ok(response) => Ok(response::parse(response).await),
        Err(e) => {
            // The URL can carry the API key (Z-API path, Zpro legacy query)
            let e = e.without_url();
            let error = if e.is_timeout() {
                "Request timed out".to_string()
            } else if e.is_connect() {
                format!("Connection failed: {}", e)
            } else {
                format!("Request failed: {}", e)
            };
            Err(SendOutcome::failure(error, None))
        }
    }
}

/// Checks the fields every provider needs
pub(crate) fn validate_common(config: &GatewayConfig, requires_instance: bool) -> AppResult<()> {
    let parsed_url = url::Url::parse(config.api_url.trim())
        .map_err(|_| AppError::Validation("Invalid API URL format".to_string()))?;

    if parsed_url.scheme() != "http" && parsed_url.scheme() != "https" {
        return Err(AppError::Validation(
            "API URL must use HTTP or HTTPS".to_string(),
        ));
    }

    if config.api_key.trim().is_empty() {
        return Err(AppError::Validation("API key is required".to_string()));
    }

    if requires_instance
        && config
            .instance_id
            .as_deref()
            .map_or(true, |id| id.trim().is_empty())
    {
        return Err(AppError::Validation(format!(
            "Instance ID is required for {}",
            config.provider_name
        )));
    }

    Ok(())
}

/// Instance id of a config already validated with `requires_instance`
pub(crate) fn instance_id(config: &GatewayConfig) -> Result<&str, SendOutcome> {
    config
        .instance_id
        .as_deref()
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .ok_or_else(|| SendOutcome::failure("Gateway instance ID is not configured", None))
}
