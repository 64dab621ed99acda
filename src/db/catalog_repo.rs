// src/db/catalog_repo.rs

use sqlx::{Executor, Postgres};
use uuid::Uuid;

use crate::{
    common::{
        db_utils::{is_foreign_key_violation, is_unique_violation},
        error::AppError,
    },
    models::{
        catalog::{CatalogEntry, CatalogKind, CatalogSummary, Supplier},
        tenancy::TenantId,
    },
};

// Colunas devolvidas para qualquer catálogo; os planos não têm pai.
fn entry_columns(kind: CatalogKind) -> &'static str {
    if kind.requires_parent() {
        "id, tenant_id, parent_id, name, created_at"
    } else {
        "id, tenant_id, NULL::uuid AS parent_id, name, created_at"
    }
}

#[derive(Clone, Default)]
pub struct CatalogRepository;

impl CatalogRepository {
    pub fn new() -> Self {
        Self
    }

    // ---
    // Leitura
    // ---

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
        // Nos catálogos planos o filtro por pai não se aplica.
        let parent_filter = match (kind.requires_parent(), parent_id) {
            (true, Some(_)) => " AND parent_id = $2",
            _ => "",
        };
        let sql = format!(
            "SELECT {} FROM {} WHERE tenant_id = $1{} ORDER BY name ASC",
            entry_columns(kind),
            kind.table(),
            parent_filter
        );

        let mut query = sqlx::query_as::<_, CatalogEntry>(&sql).bind(tenant_id.as_uuid());
        if !parent_filter.is_empty() {
            query = query.bind(parent_id);
        }

        let entries = query.fetch_all(executor).await?;
        Ok(entries)
    }

    pub async fn list_suppliers<'e, E>(
        &self,
        executor: E,
        tenant_id: TenantId,
    ) -> Result<Vec<Supplier>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let suppliers = sqlx::query_as::<_, Supplier>(
            "SELECT * FROM suppliers WHERE tenant_id = $1 ORDER BY name ASC",
        )
        .bind(tenant_id.as_uuid())
        .fetch_all(executor)
        .await?;
        Ok(suppliers)
    }

    /// Totais do índice (uma única consulta com subconsultas).
    pub async fn summary<'e, E>(
        &self,
        executor: E,
        tenant_id: TenantId,
    ) -> Result<CatalogSummary, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let summary = sqlx::query_as::<_, CatalogSummary>(
            r#"
            SELECT
                (SELECT COUNT(*) FROM units WHERE tenant_id = $1) AS units,
                (SELECT COUNT(*) FROM categories WHERE tenant_id = $1) AS categories,
                (SELECT COUNT(*) FROM sub_categories WHERE tenant_id = $1) AS sub_categories,
                (SELECT COUNT(*) FROM material_types WHERE tenant_id = $1) AS material_types,
                (SELECT COUNT(*) FROM material_categories WHERE tenant_id = $1) AS material_categories,
                (SELECT COUNT(*) FROM crews WHERE tenant_id = $1) AS crews,
                (SELECT COUNT(*) FROM crew_refs WHERE tenant_id = $1) AS crew_refs,
                (SELECT COUNT(*) FROM suppliers WHERE tenant_id = $1) AS suppliers,
                (SELECT COUNT(*) FROM materials WHERE tenant_id = $1) AS materials,
                (SELECT COUNT(*) FROM labor WHERE tenant_id = $1) AS labor,
                (SELECT COUNT(*) FROM subcontracts WHERE tenant_id = $1) AS subcontracts,
                (SELECT COUNT(*) FROM mixtures WHERE tenant_id = $1) AS mixtures,
                (SELECT COUNT(*) FROM exchange_rate_types WHERE tenant_id = $1) AS exchange_rate_types
            "#,
        )
        .bind(tenant_id.as_uuid())
        .fetch_one(executor)
        .await?;
        Ok(summary)
    }

    // ---
    // Escrita
    // ---

    /// Cria uma entrada de catálogo. O pai é obrigatório nos catálogos aninhados
    /// e precisa ser da mesma empresa (FK composta).
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
        let sql = if kind.requires_parent() {
            format!(
                "INSERT INTO {} (tenant_id, parent_id, name) VALUES ($1, $3, $2) RETURNING {}",
                kind.table(),
                entry_columns(kind)
            )
        } else {
            format!(
                "INSERT INTO {} (tenant_id, name) VALUES ($1, $2) RETURNING {}",
                kind.table(),
                entry_columns(kind)
            )
        };

        let mut query = sqlx::query_as::<_, CatalogEntry>(&sql)
            .bind(tenant_id.as_uuid())
            .bind(name);
        if kind.requires_parent() {
            let parent_id = parent_id.ok_or(AppError::MissingParent(kind.label()))?;
            query = query.bind(parent_id);
        }

        query.fetch_one(executor).await.map_err(|e| {
            if is_unique_violation(&e) {
                return AppError::CatalogEntryAlreadyExists(name.to_string());
            }
            if is_foreign_key_violation(&e) {
                return AppError::InvalidReference;
            }
            e.into()
        })
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
        let sql = format!(
            "UPDATE {} SET name = $3 WHERE tenant_id = $1 AND id = $2 RETURNING {}",
            kind.table(),
            entry_columns(kind)
        );

        sqlx::query_as::<_, CatalogEntry>(&sql)
            .bind(tenant_id.as_uuid())
            .bind(id)
            .bind(name)
            .fetch_optional(executor)
            .await
            .map_err(|e| {
                if is_unique_violation(&e) {
                    return AppError::CatalogEntryAlreadyExists(name.to_string());
                }
                e.into()
            })?
            .ok_or(AppError::NotFound("Catalog entry"))
    }

    /// Remove a entrada. Se algum recurso a usa, a FK (RESTRICT) bloqueia.
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
        let sql = format!("DELETE FROM {} WHERE tenant_id = $1 AND id = $2", kind.table());

        let result = sqlx::query(&sql)
            .bind(tenant_id.as_uuid())
            .bind(id)
            .execute(executor)
            .await
            .map_err(|e| {
                if is_foreign_key_violation(&e) {
                    return AppError::CatalogEntryInUse;
                }
                AppError::from(e)
            })?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Catalog entry"));
        }
        Ok(())
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
        sqlx::query_as::<_, Supplier>(
            r#"
            INSERT INTO suppliers (tenant_id, name, address, phone, email)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            "#,
        )
        .bind(tenant_id.as_uuid())
        .bind(name)
        .bind(address)
        .bind(phone)
        .bind(email)
        .fetch_one(executor)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                return AppError::CatalogEntryAlreadyExists(name.to_string());
            }
            e.into()
        })
    }

    /// Os recursos que apontavam para o proveedor ficam sem proveedor (SET NULL).
    pub async fn delete_supplier<'e, E>(
        &self,
        executor: E,
        tenant_id: TenantId,
        id: Uuid,
    ) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let result = sqlx::query("DELETE FROM suppliers WHERE tenant_id = $1 AND id = $2")
            .bind(tenant_id.as_uuid())
            .bind(id)
            .execute(executor)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Supplier"));
        }
        Ok(())
    }
}
