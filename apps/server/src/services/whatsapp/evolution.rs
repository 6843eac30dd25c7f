//! Evolution API gateway: POST with the key in an `apikey` header.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::{
    execute, instance_id, lenient, validate_common, MessageId, ProviderAdapter, SendOutcome,
};
use crate::error::AppResult;
use crate::models::GatewayConfig;

/// Evolution API gateway adapter
pub struct EvolutionAdapter {
    client: reqwest::Client,
}

#[derive(Debug, Serialize)]
struct SendTextRequest<'a> {
    number: &'a str,
    text: &'a str,
}

#[derive(Debug, Default, Deserialize)]
struct SendTextResponse {
    #[serde(default, deserialize_with = "lenient")]
    key: Option<MessageKey>,
}

#[derive(Debug, Deserialize)]
struct MessageKey {
    id: Option<MessageId>,
}

impl EvolutionAdapter {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }

    fn endpoint(config: &GatewayConfig, instance_id: &str) -> String {
        format!("{}/message/sendText/{}", config.base_url(), instance_id)
    }
}

#[async_trait]
impl ProviderAdapter for EvolutionAdapter {
    async fn send(&self, config: &GatewayConfig, phone: &str, message: &str) -> SendOutcome {
        let instance_id = match instance_id(config) {
            Ok(id) => id,
            Err(outcome) => return outcome,
        };

        let request = self
            .client
            .post(Self::endpoint(config, instance_id))
            .header("apikey", &config.api_key)
            .json(&SendTextRequest {
                number: phone,
                text: message,
            });

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

        match body.key.and_then(|k| k.id).and_then(MessageId::into_string) {
            Some(id) => SendOutcome::success(Some(id), Some(parsed.status)),
            None => SendOutcome::failure(
                "Evolution response missing key.id",
                Some(parsed.status),
            ),
        }
    }

    fn validate_config(&self, config: &GatewayConfig) -> AppResult<()> {
        validate_common(config, true)
    }
}
