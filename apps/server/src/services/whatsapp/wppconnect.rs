//! WPPConnect server gateway: POST with Bearer auth.
//!
//! Returns HTTP 200 for some logical failures, so success also requires
//! `status` to differ from `"error"`.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::{
    execute, first_id, instance_id, validate_common, MessageId, ProviderAdapter, SendOutcome,
};
use crate::error::AppResult;
use crate::models::GatewayConfig;

/// WPPConnect gateway adapter
pub struct WppConnectAdapter {
    client: reqwest::Client,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SendMessageRequest<'a> {
    phone: &'a str,
    message: &'a str,
    is_group: bool,
}

#[derive(Debug, Default, Deserialize)]
struct SendMessageResponse {
    status: Option<serde_json::Value>,
    response: Option<WppPayload>,
    id: Option<MessageId>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum WppPayload {
    Many(Vec<WppMessage>),
    One(WppMessage),
    Other(serde_json::Value),
}

#[derive(Debug, Deserialize)]
struct WppMessage {
    id: Option<MessageId>,
}

impl SendMessageResponse {
    fn is_error(&self) -> bool {
        self.status
            .as_ref()
            .and_then(serde_json::Value::as_str)
            .is_some_and(|s| s.eq_ignore_ascii_case("error"))
    }

    fn message_id(self) -> Option<String> {
        let nested = match self.response {
            Some(WppPayload::Many(messages)) => messages.into_iter().next().and_then(|m| m.id),
            Some(WppPayload::One(message)) => message.id,
            _ => None,
        };

        first_id([nested, self.id])
    }
}

impl WppConnectAdapter {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }

    fn endpoint(config: &GatewayConfig, instance_id: &str) -> String {
        format!("{}/api/{}/send-message", config.base_url(), instance_id)
    }
}

#[async_trait]
impl ProviderAdapter for WppConnectAdapter {
    async fn send(&self, config: &GatewayConfig, phone: &str, message: &str) -> SendOutcome {
        let instance_id = match instance_id(config) {
            Ok(id) => id,
            Err(outcome) => return outcome,
        };

        let request = self
            .client
            .post(Self::endpoint(config, instance_id))
            .bearer_auth(&config.api_key)
            .json(&SendMessageRequest {
                phone,
                message,
                is_group: false,
            });

        let parsed = match execute(request).await {
            Ok(parsed) => parsed,
            Err(outcome) => return outcome,
        };

        if let Some(outcome) = parsed.failure() {
            return outcome;
        }

        // The id is optional, so an unrecognized body still counts as sent
        let body: SendMessageResponse = parsed.decode_or_default();

        // HTTP 200 with status=error
        if body.is_error() {
            return SendOutcome::failure(
                "WPPConnect reported status=error",
                Some(parsed.status),
            );
        }

        SendOutcome::success(body.message_id(), Some(parsed.status))
    }

    fn validate_config(&self, config: &GatewayConfig) -> AppResult<()> {
        validate_common(config, true)
    }
}
