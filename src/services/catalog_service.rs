// src/services/catalog_service.rs

use sqlx::{Executor, Postgres};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::CatalogRepository,
    models::{
        catalog::{CatalogEntry, CatalogKind, CatalogSummary, Supplier},
        tenancy::TenantId,
    },
};

/// Texto opcional: em branco vira `None`.
fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

#[derive(Clone)]
pub struct CatalogService {
    catalog_repo: CatalogRepository,
}

impl CatalogService {
    pub fn new(catalog_repo: CatalogRepository) -> Self {
        Self { catalog_repo }
    }

    pub async fn list_entries<'e, E>(
        &self,
        executor: E,
        tenant_id: TenantId,
        kind: CatalogKind,
        parent_id: Option<Uuid>,
    ) -> Result<Vec<CatalogEntry>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        self.catalog_repo
            .list_entries(executor, tenant_id, kind, parent_id)
            .await
    }

    pub async fn create_entry<'e, E>(
        &self,
        executor: E,
        tenant_id: TenantId,
        kind: CatalogKind,
        name: &str,
        parent_id: Option<Uuid>,
    ) -> Result<CatalogEntry, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        if kind.requires_parent() && parent_id.is_none() {
            return Err(AppError::MissingParent(kind.label()));
        }
        let entry = self
            .catalog_repo
            .create_entry(executor, tenant_id, kind, name.trim(), parent_id)
            .await?;
        tracing::debug!(entry_id = %entry.id, kind = kind.label(), "Entrada de catálogo criada");
        Ok(entry)
    }

    pub async fn rename_entry<'e, E>(
        &self,
        executor: E,
        tenant_id: TenantId,
        kind: CatalogKind,
        id: Uuid,
        name: &str,
    ) -> Result<CatalogEntry, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        self.catalog_repo
            .rename_entry(executor, tenant_id, kind, id, name.trim())
            .await
    }

    pub async fn delete_entry<'e, E>(
        &self,
        executor: E,
        tenant_id: TenantId,
        kind: CatalogKind,
        id: Uuid,
    ) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        self.catalog_repo.delete_entry(executor, tenant_id, kind, id).await
    }

    pub async fn list_suppliers<'e, E>(
        &self,
        executor: E,
        tenant_id: TenantId,
    ) -> Result<Vec<Supplier>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        self.catalog_repo.list_suppliers(executor, tenant_id).await
    }

    pub async fn create_supplier<'e, E>(
        &self,
        executor: E,
        tenant_id: TenantId,
        name: &str,
        address: Option<&str>,
        phone: Option<&str>,
        email: Option<&str>,
    ) -> Result<Supplier, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        self.catalog_repo
            .create_supplier(
                executor,
                tenant_id,
                name.trim(),
                non_blank(address),
                non_blank(phone),
                non_blank(email),
            )
            .await
    }

    pub async fn delete_supplier<'e, E>(
        &self,
        executor: E,
        tenant_id: TenantId,
        id: Uuid,
    ) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        self.catalog_repo.delete_supplier(executor, tenant_id, id).await
    }

    pub async fn summary<'e, E>(
        &self,
        executor: E,
        tenant_id: TenantId,
    ) -> Result<CatalogSummary, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        self.catalog_repo.summary(executor, tenant_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_contact_fields_are_dropped() {
        assert_eq!(non_blank(Some("  ")), None);
        assert_eq!(non_blank(Some(" 011-4444 ")), Some("011-4444"));
        assert_eq!(non_blank(None), None);
    }
}
