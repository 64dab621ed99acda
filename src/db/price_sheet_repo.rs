// src/db/price_sheet_repo.rs

use rust_decimal::Decimal;
use sqlx::{Executor, Postgres};
use uuid::Uuid;

use crate::{
    common::{
        db_utils::{is_numeric_overflow, is_unique_violation},
        error::AppError,
    },
    models::{
        price_sheets::{PriceSheet, SheetLine},
        resources::ResourceKind,
        tenancy::TenantId,
    },
};

// Colunas da linha da hoja no formato de `SheetLine`.
fn line_columns(kind: ResourceKind) -> String {
    let currency = if kind.has_currency() {
        "currency"
    } else {
        "NULL::currency_code AS currency"
    };
    format!(
        "id, sheet_id, {} AS resource_id, quantity_per_sale_unit, unit_price_sale_unit, {}",
        kind.line_resource_column(),
        currency
    )
}

// Colunas copiadas de/para as linhas. Sem moeda na mão de obra.
fn copied_columns(kind: ResourceKind) -> &'static str {
    if kind.has_currency() {
        "quantity_per_sale_unit, unit_price_sale_unit, currency"
    } else {
        "quantity_per_sale_unit, unit_price_sale_unit"
    }
}

fn copied_columns_with_factor(kind: ResourceKind, alias: &str) -> String {
    let mut columns = format!(
        "{alias}.quantity_per_sale_unit, ROUND({alias}.unit_price_sale_unit * $3, 4)"
    );
    if kind.has_currency() {
        columns.push_str(&format!(", {alias}.currency"));
    }
    columns
}

// O ajuste pode estourar NUMERIC(12,4) no preço copiado.
fn map_copy_error(e: sqlx::Error) -> AppError {
    if is_numeric_overflow(&e) {
        return AppError::AmountOutOfRange("unitPriceSaleUnit");
    }
    e.into()
}

#[derive(Clone, Default)]
pub struct PriceSheetRepository;

impl PriceSheetRepository {
    pub fn new() -> Self {
        Self
    }

    // ---
    // Cabeçalhos
    // ---

    pub async fn create_sheet<'e, E>(
        &self,
        executor: E,
        tenant_id: TenantId,
        kind: ResourceKind,
        name: &str,
        origin_id: Option<Uuid>,
    ) -> Result<PriceSheet, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let sql = format!(
            "INSERT INTO {} (tenant_id, name, origin_id) VALUES ($1, $2, $3) RETURNING *",
            kind.sheet_table()
        );

        sqlx::query_as::<_, PriceSheet>(&sql)
            .bind(tenant_id.as_uuid())
            .bind(name)
            .bind(origin_id)
            .fetch_one(executor)
            .await
            .map_err(|e| {
                if is_unique_violation(&e) {
                    return AppError::SheetNameAlreadyExists(name.to_string());
                }
                e.into()
            })
    }

    pub async fn list_sheets<'e, E>(
        &self,
        executor: E,
        tenant_id: TenantId,
        kind: ResourceKind,
    ) -> Result<Vec<PriceSheet>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let sql = format!(
            "SELECT * FROM {} WHERE tenant_id = $1 ORDER BY created_at DESC",
            kind.sheet_table()
        );
        let sheets = sqlx::query_as::<_, PriceSheet>(&sql)
            .bind(tenant_id.as_uuid())
            .fetch_all(executor)
            .await?;
        Ok(sheets)
    }

    pub async fn find_sheet<'e, E>(
        &self,
        executor: E,
        tenant_id: TenantId,
        kind: ResourceKind,
        sheet_id: Uuid,
    ) -> Result<Option<PriceSheet>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let sql = format!(
            "SELECT * FROM {} WHERE tenant_id = $1 AND id = $2",
            kind.sheet_table()
        );
        let sheet = sqlx::query_as::<_, PriceSheet>(&sql)
            .bind(tenant_id.as_uuid())
            .bind(sheet_id)
            .fetch_optional(executor)
            .await?;
        Ok(sheet)
    }

    /// Linhas e mezclas ligadas à hoja caem junto (CASCADE);
    /// hojas derivadas perdem só a referência de origem.
    pub async fn delete_sheet<'e, E>(
        &self,
        executor: E,
        tenant_id: TenantId,
        kind: ResourceKind,
        sheet_id: Uuid,
    ) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let sql = format!(
            "DELETE FROM {} WHERE tenant_id = $1 AND id = $2",
            kind.sheet_table()
        );
        let result = sqlx::query(&sql)
            .bind(tenant_id.as_uuid())
            .bind(sheet_id)
            .execute(executor)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("PriceSheet"));
        }
        Ok(())
    }

    // ---
    // Linhas congeladas
    // ---

    pub async fn lines<'e, E>(
        &self,
        executor: E,
        tenant_id: TenantId,
        kind: ResourceKind,
        sheet_id: Uuid,
    ) -> Result<Vec<SheetLine>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let sql = format!(
            "SELECT {} FROM {} WHERE tenant_id = $1 AND sheet_id = $2",
            line_columns(kind),
            kind.line_table()
        );
        let lines = sqlx::query_as::<_, SheetLine>(&sql)
            .bind(tenant_id.as_uuid())
            .bind(sheet_id)
            .fetch_all(executor)
            .await?;
        Ok(lines)
    }

    pub async fn find_line<'e, E>(
        &self,
        executor: E,
        tenant_id: TenantId,
        kind: ResourceKind,
        sheet_id: Uuid,
        resource_id: Uuid,
    ) -> Result<Option<SheetLine>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let sql = format!(
            "SELECT {} FROM {} WHERE tenant_id = $1 AND sheet_id = $2 AND {} = $3",
            line_columns(kind),
            kind.line_table(),
            kind.line_resource_column()
        );
        let line = sqlx::query_as::<_, SheetLine>(&sql)
            .bind(tenant_id.as_uuid())
            .bind(sheet_id)
            .bind(resource_id)
            .fetch_optional(executor)
            .await?;
        Ok(line)
    }

    /// Congela os preços atuais dos recursos da empresa na hoja.
    /// Com `restrict_to` só entram os recursos presentes naquela hoja de origem.
    pub async fn snapshot_live<'e, E>(
        &self,
        executor: E,
        tenant_id: TenantId,
        kind: ResourceKind,
        sheet_id: Uuid,
        restrict_to: Option<Uuid>,
        factor: Decimal,
    ) -> Result<u64, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let column = kind.line_resource_column();
        let origin_filter = if restrict_to.is_some() {
            format!(
                "AND r.id IN (SELECT o.{column} FROM {} o WHERE o.tenant_id = $1 AND o.sheet_id = $4)",
                kind.line_table()
            )
        } else {
            String::new()
        };
        let sql = format!(
            r#"
            INSERT INTO {line_table} (tenant_id, sheet_id, {column}, {target})
            SELECT $1, $2, r.id, {source}
            FROM {table} r
            WHERE r.tenant_id = $1 {origin_filter}
            "#,
            line_table = kind.line_table(),
            target = copied_columns(kind),
            source = copied_columns_with_factor(kind, "r"),
            table = kind.table(),
        );

        let mut query = sqlx::query(&sql)
            .bind(tenant_id.as_uuid())
            .bind(sheet_id)
            .bind(factor);
        if let Some(origin_id) = restrict_to {
            query = query.bind(origin_id);
        }

        let result = query.execute(executor).await.map_err(map_copy_error)?;
        Ok(result.rows_affected())
    }

    /// Copia os valores congelados da hoja de origem (a "edição" de uma hoja).
    pub async fn copy_from_origin<'e, E>(
        &self,
        executor: E,
        tenant_id: TenantId,
        kind: ResourceKind,
        sheet_id: Uuid,
        factor: Decimal,
        origin_id: Uuid,
    ) -> Result<u64, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let column = kind.line_resource_column();
        let sql = format!(
            r#"
            INSERT INTO {line_table} (tenant_id, sheet_id, {column}, {target})
            SELECT $1, $2, o.{column}, {source}
            FROM {line_table} o
            WHERE o.tenant_id = $1 AND o.sheet_id = $4
            "#,
            line_table = kind.line_table(),
            target = copied_columns(kind),
            source = copied_columns_with_factor(kind, "o"),
        );

        let result = sqlx::query(&sql)
            .bind(tenant_id.as_uuid())
            .bind(sheet_id)
            .bind(factor)
            .bind(origin_id)
            .execute(executor)
            .await
            .map_err(map_copy_error)?;
        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        db::{
            test_support::{company, material, material_refs, tenant_tx},
            ResourceRepository,
        },
        models::{price_sheets::NewPriceSheet, resources::Currency},
        services::{
            price_sheet_service::PriceSheetService, pricing::tests::dec,
            resource_service::ResourceService,
        },
    };
    use sqlx::PgPool;

    fn sheet_service() -> PriceSheetService {
        PriceSheetService::new(PriceSheetRepository::new(), ResourceRepository::new())
    }

    fn named(name: &str, adjustment: Option<&str>) -> NewPriceSheet {
        NewPriceSheet {
            name: name.into(),
            origin_id: None,
            copy_origin_prices: false,
            adjustment: adjustment.map(str::to_string),
        }
    }

    #[test]
    fn labor_lines_project_a_null_currency() {
        let columns = line_columns(ResourceKind::Labor);
        assert!(columns.contains("labor_id AS resource_id"));
        assert!(columns.contains("NULL::currency_code AS currency"));
        assert_eq!(copied_columns(ResourceKind::Labor).matches(',').count(), 1);
    }

    #[test]
    fn copied_price_is_rounded_like_the_bulk_update() {
        let columns = copied_columns_with_factor(ResourceKind::Material, "r");
        assert_eq!(
            columns,
            "r.quantity_per_sale_unit, ROUND(r.unit_price_sale_unit * $3, 4), r.currency"
        );
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "precisa de Postgres (DATABASE_URL)"]
    async fn sheet_names_are_unique_per_tenant_only(pool: PgPool) {
        let repo = PriceSheetRepository::new();
        let a = company(&pool, "Constructora A").await;
        let b = company(&pool, "Constructora B").await;

        let mut tx = tenant_tx(&pool, a).await;
        repo.create_sheet(&mut *tx, a, ResourceKind::Material, "Enero", None)
            .await
            .unwrap();
        tx.commit().await.unwrap();

        let mut tx = tenant_tx(&pool, b).await;
        repo.create_sheet(&mut *tx, b, ResourceKind::Material, "Enero", None)
            .await
            .unwrap();
        tx.commit().await.unwrap();

        let mut tx = tenant_tx(&pool, a).await;
        let again = repo
            .create_sheet(&mut *tx, a, ResourceKind::Material, "Enero", None)
            .await;
        assert!(matches!(again, Err(AppError::SheetNameAlreadyExists(_))));
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "precisa de Postgres (DATABASE_URL)"]
    async fn rejected_duplicate_sheet_leaves_no_lines(pool: PgPool) {
        let a = company(&pool, "Constructora A").await;

        let mut tx = tenant_tx(&pool, a).await;
        let refs = material_refs(&mut tx, a).await;
        material(&mut tx, a, &refs, "Cemento", dec("100"), Currency::Ars).await;
        material(&mut tx, a, &refs, "Arena", dec("20"), Currency::Ars).await;
        let first = sheet_service()
            .create_sheet(&mut *tx, a, ResourceKind::Material, named("Enero", None))
            .await
            .unwrap();
        tx.commit().await.unwrap();

        let mut tx = tenant_tx(&pool, a).await;
        let duplicate = sheet_service()
            .create_sheet(&mut *tx, a, ResourceKind::Material, named("Enero", None))
            .await;
        assert!(matches!(duplicate, Err(AppError::SheetNameAlreadyExists(_))));
        drop(tx);

        let mut tx = tenant_tx(&pool, a).await;
        let total: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM material_price_sheet_lines WHERE tenant_id = $1",
        )
        .bind(a.as_uuid())
        .fetch_one(&mut *tx)
        .await
        .unwrap();
        let first_lines = PriceSheetRepository::new()
            .lines(&mut *tx, a, ResourceKind::Material, first.id)
            .await
            .unwrap();
        assert_eq!(total, 2);
        assert_eq!(first_lines.len(), 2);
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "precisa de Postgres (DATABASE_URL)"]
    async fn frozen_lines_survive_a_bulk_update(pool: PgPool) {
        let a = company(&pool, "Constructora A").await;

        let mut tx = tenant_tx(&pool, a).await;
        let refs = material_refs(&mut tx, a).await;
        let cement = material(&mut tx, a, &refs, "Cemento", dec("100"), Currency::Ars).await;
        let sheet = sheet_service()
            .create_sheet(&mut *tx, a, ResourceKind::Material, named("Enero", None))
            .await
            .unwrap();
        tx.commit().await.unwrap();

        let mut tx = tenant_tx(&pool, a).await;
        ResourceService::new(ResourceRepository::new())
            .bulk_update_prices(&mut *tx, a, ResourceKind::Material, &[cement.id], "50")
            .await
            .unwrap();
        tx.commit().await.unwrap();

        let mut tx = tenant_tx(&pool, a).await;
        let lines = PriceSheetRepository::new()
            .lines(&mut *tx, a, ResourceKind::Material, sheet.id)
            .await
            .unwrap();
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].unit_price_sale_unit, dec("100"));

        let frozen = sheet_service()
            .resolved_price(&mut tx, a, ResourceKind::Material, cement.id, Some(sheet.id))
            .await
            .unwrap();
        let live = sheet_service()
            .resolved_price(&mut tx, a, ResourceKind::Material, cement.id, None)
            .await
            .unwrap();
        assert_eq!(frozen, dec("100"));
        assert_eq!(live, dec("150"));
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "precisa de Postgres (DATABASE_URL)"]
    async fn adjustment_beyond_the_price_column_is_rejected(pool: PgPool) {
        let a = company(&pool, "Constructora A").await;

        let mut tx = tenant_tx(&pool, a).await;
        let refs = material_refs(&mut tx, a).await;
        material(&mut tx, a, &refs, "Cemento", dec("99999999"), Currency::Ars).await;
        tx.commit().await.unwrap();

        let mut tx = tenant_tx(&pool, a).await;
        let sheet = sheet_service()
            .create_sheet(&mut *tx, a, ResourceKind::Material, named("Enero", Some("50")))
            .await;
        assert!(matches!(
            sheet,
            Err(AppError::AmountOutOfRange("unitPriceSaleUnit"))
        ));
    }
}
