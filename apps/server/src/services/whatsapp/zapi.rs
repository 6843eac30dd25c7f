//! Z-API gateway: POST with the instance and token as path segments.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::{
    execute, first_id, instance_id, validate_common, MessageId, ProviderAdapter, SendOutcome,
};
use crate::error::AppResult;
use crate::models::GatewayConfig;

/// Z-API gateway adapter
pub struct ZapiAdapter {
    client: reqwest::Client,
}

#[derive(Debug, Serialize)]
struct SendTextRequest<'a> {
    phone: &'a str,
    message: &'a str,
}

/// A send is accepted only when `zaapId` is present
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SendTextResponse {
    zaap_id: Option<MessageId>,
    message_id: Option<MessageId>,
}

impl ZapiAdapter {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }

    fn endpoint(config: &GatewayConfig, instance_id: &str) -> String {
        format!(
            "{}/instances/{}/token/{}/send-text",
            config.base_url(),
            instance_id,
            config.api_key
        )
    }
}

#[async_trait]
impl ProviderAdapter for ZapiAdapter {
    async fn send(&self, config: &GatewayConfig, phone: &str, message: &str) -> SendOutcome {
        let instance_id = match instance_id(config) {
            Ok(id) => id,
            Err(outcome) => return outcome,
        };

        let request = self
            .client
            .post(Self::endpoint(config, instance_id))
            .json(&SendTextRequest { phone, message });

        let parsed = match execute(request).await {
            Ok(parsed) => parsed,
            Err(outcome) => return outcome,
        };

        if let Some(outcome) = parsed.failure() {
            return outcome;
        }

        let body: SendTextResponse = match parsed.decode() {
            Ok(body) => body,
            Err(outcome) => return outcome,
        };

        let Some(zaap_id) = body.zaap_id.and_then(MessageId::into_string) else {
            return SendOutcome::failure("Z-API response missing zaapId", Some(parsed.status));
        };

        let message_id = first_id([body.message_id]).unwrap_or(zaap_id);
        SendOutcome::success(Some(message_id), Some(parsed.status))
    }

    fn validate_config(&self, config: &GatewayConfig) -> AppResult<()> {
        validate_common(config, true)
    }
}
