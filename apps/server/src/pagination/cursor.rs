use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};

/// Cursor for paginating delivery records (newest first)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeliveryCursor {
    /// Last record id seen
    pub last_id: i64,
}

impl DeliveryCursor {
    pub fn new(last_id: i64) -> Self {
        Self { last_id }
    }

    pub fn encode(&self) -> AppResult<String> {
        let json = serde_json::to_string(self)
            .map_err(|e| AppError::Internal(format!("Cursor serialization failed: {}", e)))?;
        Ok(URL_SAFE_NO_PAD.encode(json.as_bytes()))
    }

    pub fn decode(s: &str) -> AppResult<Self> {
        let bytes = URL_SAFE_NO_PAD
            .decode(s)
            .map_err(|_| AppError::Validation("Invalid cursor encoding".to_string()))?;

        let json = String::from_utf8(bytes)
            .map_err(|_| AppError::Validation("Invalid cursor encoding".to_string()))?;

        serde_json::from_str(&json)
            .map_err(|_| AppError::Validation("Invalid cursor format".to_string()))
    }
}
