use sqlx::PgPool;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::models::Tenant;

pub struct TenantService;

impl TenantService {
    /// Gets a condominium by ID
    pub async fn get_by_id(pool: &PgPool, id: Uuid) -> AppResult<Tenant> {
        sqlx::query_as::<_, Tenant>(
            "SELECT id, name, owner_id, created_at FROM tenants WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Condominium {} not found", id)))
    }
}
