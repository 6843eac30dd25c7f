use chrono::Utc;
use sqlx::PgPool;

use crate::error::{AppError, AppResult};
use crate::models::{CreateGatewayConfig, GatewayConfig};
use crate::services::whatsapp::create_adapter;

const GATEWAY_COLUMNS: &str = "id, provider, api_url, api_key, instance_id, is_active, \
                               use_official_api, created_at, updated_at";

pub struct GatewayService;

impl GatewayService {
    /// Lists all gateway configurations, active first
    pub async fn list(pool: &PgPool) -> AppResult<Vec<GatewayConfig>> {
        let configs = sqlx::query_as::<_, GatewayConfig>(&format!(
            "SELECT {} FROM gateway_configs ORDER BY is_active DESC, created_at DESC",
            GATEWAY_COLUMNS
        ))
        .fetch_all(pool)
        .await?;

        Ok(configs)
    }

    /// Returns the single active configuration.
    ///
    /// Its absence is a configuration error, fatal for the current dispatch.
    pub async fn get_active(pool: &PgPool) -> AppResult<GatewayConfig> {
        sqlx::query_as::<_, GatewayConfig>(&format!(
            "SELECT {} FROM gateway_configs WHERE is_active = TRUE",
            GATEWAY_COLUMNS
        ))
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| {
            AppError::Configuration("No active WhatsApp gateway configured".to_string())
        })
    }

    /// Creates a configuration after checking it against its provider.
    ///
    /// With `is_active` set, every other row is deactivated in the same
    /// transaction.
    pub async fn create(
        pool: &PgPool,
        client: &reqwest::Client,
        input: CreateGatewayConfig,
    ) -> AppResult<GatewayConfig> {
        let now = Utc::now();
        let candidate = GatewayConfig {
            id: 0,
            provider_name: input.provider.as_str().to_string(),
            api_url: input.api_url.trim().to_string(),
            api_key: input.api_key.trim().to_string(),
            instance_id: input
                .instance_id
                .map(|id| id.trim().to_string())
                .filter(|id| !id.is_empty()),
            is_active: input.is_active,
            use_official_api: input.use_official_api,
            created_at: now,
            updated_at: now,
        };

        create_adapter(input.provider, client.clone()).validate_config(&candidate)?;

        let mut tx = pool.begin().await?;

        if candidate.is_active {
            sqlx::query(
                "UPDATE gateway_configs SET is_active = FALSE, updated_at = NOW() WHERE is_active",
            )
            .execute(&mut *tx)
            .await?;
        }

        let config = sqlx::query_as::<_, GatewayConfig>(&format!(
            r#"
            INSERT INTO gateway_configs (provider, api_url, api_key, instance_id, is_active, use_official_api)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {}
            "#,
            GATEWAY_COLUMNS
        ))
        .bind(&candidate.provider_name)
        .bind(&candidate.api_url)
        .bind(&candidate.api_key)
        .bind(&candidate.instance_id)
        .bind(candidate.is_active)
        .bind(candidate.use_official_api)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        log::info!(
            "Created {} gateway config {} (active: {})",
            config.provider_name,
            config.id,
            config.is_active
        );

        Ok(config)
    }

    /// Makes one configuration the only active one
    pub async fn activate(pool: &PgPool, id: i32) -> AppResult<GatewayConfig> {
        let mut tx = pool.begin().await?;

        sqlx::query(
            "UPDATE gateway_configs SET is_active = FALSE, updated_at = NOW() WHERE is_active AND id <> $1",
        )
        .bind(id)
        .execute(&mut *tx)
        .await?;

        let config = sqlx::query_as::<_, GatewayConfig>(&format!(
            "UPDATE gateway_configs SET is_active = TRUE, updated_at = NOW() WHERE id = $1 RETURNING {}",
            GATEWAY_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Gateway config with id {} not found", id)))?;

        tx.commit().await?;

        log::info!("Activated {} gateway config {}", config.provider_name, config.id);

        Ok(config)
    }
}
