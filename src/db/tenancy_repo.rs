// src/db/tenancy_repo.rs

use sqlx::PgPool;
use uuid::Uuid;

use crate::{common::error::AppError, models::tenancy::Company};

#[derive(Clone)]
pub struct TenantRepository {
    pool: PgPool,
}

impl TenantRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Verifica se um utilizador tem permissão para aceder a uma empresa.
    /// Esta é a verificação de autorização mais importante: sem ela não há TenantId.
    pub async fn check_user_membership(
        &self,
        user_id: Uuid,
        company_id: Uuid,
    ) -> Result<bool, AppError> {
        // SELECT EXISTS: só queremos saber se a linha existe.
        let exists: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM company_memberships
                WHERE user_id = $1 AND company_id = $2
            )
            "#,
        )
        .bind(user_id)
        .bind(company_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(exists)
    }

    pub async fn companies_for_user(&self, user_id: Uuid) -> Result<Vec<Company>, AppError> {
        let companies = sqlx::query_as::<_, Company>(
            r#"
            SELECT c.id, c.name, c.created_at
            FROM companies c
            JOIN company_memberships m ON m.company_id = c.id
            WHERE m.user_id = $1
            ORDER BY c.name ASC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(companies)
    }
}
