use std::collections::HashMap;

use sqlx::PgPool;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::models::{
    MessageTemplate, NotificationType, ResolvedTemplate, TemplateSource, TenantTemplateOverride,
    UpsertTemplateOverride,
};

/// Placeholder name to substituted value
pub type TemplateValues = HashMap<String, String>;

pub struct TemplateService;

impl TemplateService {
    /// Resolves the effective template text for a slug.
    ///
    /// An active tenant override wins over an active system default.
    /// Returns `None` when neither exists; callers then use the
    /// notification type's hardcoded fallback.
    pub async fn resolve(
        pool: &PgPool,
        slug: &str,
        tenant_id: Option<Uuid>,
    ) -> AppResult<Option<ResolvedTemplate>> {
        if let Some(tenant_id) = tenant_id {
            let content: Option<(String,)> = sqlx::query_as(
                r#"
                SELECT content
                FROM tenant_template_overrides
                WHERE tenant_id = $1 AND slug = $2 AND is_active = TRUE
                "#,
            )
            .bind(tenant_id)
            .bind(slug)
            .fetch_optional(pool)
            .await?;

            if let Some((content,)) = content {
                return Ok(Some(ResolvedTemplate {
                    slug: slug.to_string(),
                    content,
                    source: TemplateSource::TenantOverride,
                }));
            }
        }

        let content: Option<(String,)> = sqlx::query_as(
            r#"
            SELECT default_content
            FROM message_templates
            WHERE slug = $1 AND is_active = TRUE
            "#,
        )
        .bind(slug)
        .fetch_optional(pool)
        .await?;

        Ok(content.map(|(content,)| ResolvedTemplate {
            slug: slug.to_string(),
            content,
            source: TemplateSource::SystemDefault,
        }))
    }

    /// Resolves a template, falling back to the type's hardcoded text
    pub async fn resolve_or_fallback(
        pool: &PgPool,
        notification_type: NotificationType,
        tenant_id: Option<Uuid>,
    ) -> AppResult<ResolvedTemplate> {
        let slug = notification_type.slug();
        let resolved = Self::resolve(pool, slug, tenant_id).await?;

        Ok(resolved.unwrap_or_else(|| {
            log::debug!("No active template for '{}', using fallback", slug);
            ResolvedTemplate {
                slug: slug.to_string(),
                content: notification_type.fallback_template().to_string(),
                source: TemplateSource::Fallback,
            }
        }))
    }

    /// Lists system default templates
    pub async fn list_defaults(pool: &PgPool) -> AppResult<Vec<MessageTemplate>> {
        let templates = sqlx::query_as::<_, MessageTemplate>(
            r#"
            SELECT slug, default_content, variables, is_active, created_at
            FROM message_templates
            ORDER BY slug
            "#,
        )
        .fetch_all(pool)
        .await?;

        Ok(templates)
    }

    /// Creates or replaces a tenant override
    pub async fn upsert_override(
        pool: &PgPool,
        tenant_id: Uuid,
        slug: &str,
        input: UpsertTemplateOverride,
    ) -> AppResult<TenantTemplateOverride> {
        if input.content.trim().is_empty() {
            return Err(AppError::Validation(
                "Template content cannot be empty".to_string(),
            ));
        }

        let known: Option<(String,)> =
            sqlx::query_as("SELECT slug FROM message_templates WHERE slug = $1")
                .bind(slug)
                .fetch_optional(pool)
                .await?;

        if known.is_none() {
            return Err(AppError::NotFound(format!("Template '{}' not found", slug)));
        }

        let row = sqlx::query_as::<_, TenantTemplateOverride>(
            r#"
            INSERT INTO tenant_template_overrides (tenant_id, slug, content, is_active)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (tenant_id, slug)
            DO UPDATE SET content = EXCLUDED.content,
                          is_active = EXCLUDED.is_active,
                          updated_at = NOW()
            RETURNING id, tenant_id, slug, content, is_active, created_at, updated_at
            "#,
        )
        .bind(tenant_id)
        .bind(slug)
        .bind(&input.content)
        .bind(input.is_active)
        .fetch_one(pool)
        .await?;

        Ok(row)
    }

    /// Removes a tenant override, restoring the system default
    pub async fn delete_override(pool: &PgPool, tenant_id: Uuid, slug: &str) -> AppResult<()> {
        let result =
            sqlx::query("DELETE FROM tenant_template_overrides WHERE tenant_id = $1 AND slug = $2")
                .bind(tenant_id)
                .bind(slug)
                .execute(pool)
                .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!(
                "No override for template '{}'",
                slug
            )));
        }

        Ok(())
    }
}

/// Replaces every `{name}` token that has a value.
///
/// Single pass: substituted values are never re-scanned, and tokens
/// without a value are kept verbatim.
pub fn render(content: &str, values: &TemplateValues) -> String {
    let mut out = String::with_capacity(content.len());
    let mut rest = content;

    while let Some(start) = rest.find('{') {
        out.push_str(&rest[..start]);
        let after = &rest[start + 1..];

        match after.find(|c: char| c == '{' || c == '}') {
            Some(end) if after.as_bytes()[end] == b'}' => {
                let name = &after[..end];
                match values.get(name) {
                    Some(value) => out.push_str(value),
                    None => {
                        out.push('{');
                        out.push_str(name);
                        out.push('}');
                    }
                }
                rest = &after[end + 1..];
            }
            _ => {
                out.push('{');
                rest = after;
            }
        }
    }

    out.push_str(rest);
    out
}
