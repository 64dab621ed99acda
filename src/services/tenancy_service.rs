// src/services/tenancy_service.rs

use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::TenantRepository,
    models::tenancy::{Company, TenantId},
};

#[derive(Clone)]
pub struct TenantService {
    tenant_repo: TenantRepository,
}

impl TenantService {
    pub fn new(tenant_repo: TenantRepository) -> Self {
        Self { tenant_repo }
    }

    /// Único lugar onde um `TenantId` nasce: só depois de confirmado o vínculo.
    pub async fn authorize(&self, user_id: Uuid, company_id: Uuid) -> Result<TenantId, AppError> {
        let is_member = self
            .tenant_repo
            .check_user_membership(user_id, company_id)
            .await?;

        if !is_member {
            tracing::warn!(user_id = %user_id, company_id = %company_id, "Acesso negado à empresa");
            return Err(AppError::NotTenantMember);
        }
        Ok(TenantId::new(company_id))
    }

    pub async fn companies_for_user(&self, user_id: Uuid) -> Result<Vec<Company>, AppError> {
        self.tenant_repo.companies_for_user(user_id).await
    }
}
