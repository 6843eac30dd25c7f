//! Zpro gateway.
//!
//! Two mutually exclusive request shapes, chosen by `use_official_api`:
//! the legacy GET with credentials in the query string, and the official
//! (WABA) POST with a JSON body and Bearer auth. Both share one response
//! schema.

use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};

use super::{
    execute, first_id, lenient, validate_common, MessageId, ProviderAdapter, SendOutcome,
};
use crate::error::AppResult;
use crate::models::GatewayConfig;

/// Zpro gateway adapter
pub struct ZproAdapter {
    client: reqwest::Client,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct OfficialRequest<'a> {
    number: &'a str,
    body: &'a str,
    external_key: &'a str,
}

/// Zpro omits ids inconsistently; any of these may carry one
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ZproResponse {
    id: Option<MessageId>,
    message_id: Option<MessageId>,
    #[serde(default, deserialize_with = "lenient")]
    key: Option<ZproKey>,
    #[serde(default, deserialize_with = "lenient")]
    data: Option<ZproData>,
}

#[derive(Debug, Deserialize)]
struct ZproKey {
    id: Option<MessageId>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ZproData {
    Message {
        id: Option<MessageId>,
        #[serde(rename = "messageId")]
        message_id: Option<MessageId>,
    },
    Other(serde_json::Value),
}

impl ZproResponse {
    fn message_id(self) -> Option<String> {
        let (data_id, data_message_id) = match self.data {
            Some(ZproData::Message { id, message_id }) => (id, message_id),
            _ => (None, None),
        };

        first_id([
            self.id,
            self.message_id,
            self.key.and_then(|k| k.id),
            data_id,
            data_message_id,
        ])
    }
}

/// Tracking id for acknowledged sends that came back without one
fn synthesized_id() -> String {
    format!("zpro-{}", Utc::now().timestamp_millis())
}

impl ZproAdapter {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }

    fn legacy_request(
        &self,
        config: &GatewayConfig,
        phone: &str,
        message: &str,
    ) -> reqwest::RequestBuilder {
        let key = config.api_key.as_str();
        self.client.get(config.api_url.trim()).query(&[
            ("body", message),
            ("number", phone),
            ("externalKey", key),
            ("bearertoken", key),
            ("isClosed", "false"),
        ])
    }

    fn official_request(
        &self,
        config: &GatewayConfig,
        phone: &str,
        message: &str,
    ) -> reqwest::RequestBuilder {
        self.client
            .post(config.api_url.trim())
            .bearer_auth(&config.api_key)
            .json(&OfficialRequest {
                number: phone,
                body: message,
                external_key: &config.api_key,
            })
    }
}

#[async_trait]
impl ProviderAdapter for ZproAdapter {
    async fn send(&self, config: &GatewayConfig, phone: &str, message: &str) -> SendOutcome {
        let request = if config.use_official_api {
            self.official_request(config, phone, message)
        } else {
            self.legacy_request(config, phone, message)
        };

        let parsed = match execute(request).await {
            Ok(parsed) => parsed,
            Err(outcome) => return outcome,
        };

        if let Some(outcome) = parsed.failure() {
            return outcome;
        }

        // Acknowledged: any body shape is accepted, the id is best effort
        let body: ZproResponse = parsed.decode_or_default();

        let message_id = body.message_id().unwrap_or_else(|| {
            let id = synthesized_id();
            log::debug!("Zpro acknowledged without an id, tracking as {}", id);
            id
        });

        SendOutcome::success(Some(message_id), Some(parsed.status))
    }

    fn validate_config(&self, config: &GatewayConfig) -> AppResult<()> {
        validate_common(config, false)
    }
}
