// src/db/resource_repo.rs

use rust_decimal::Decimal;
use sqlx::{Executor, Postgres};
use uuid::Uuid;

use crate::{
    common::{
        db_utils::{is_foreign_key_violation, is_numeric_overflow, is_unique_violation},
        error::AppError,
    },
    models::{
        resources::{
            Currency, Labor, Material, NewLabor, NewMaterial, NewSubcontract, PriceEdit, ResourceKind,
            ResourcePrice, Subcontract,
        },
        tenancy::TenantId,
    },
};

// Projeção de preço comum; a mão de obra não tem moeda.
fn price_columns(kind: ResourceKind) -> String {
    let currency = if kind.has_currency() {
        "currency"
    } else {
        "NULL::currency_code AS currency"
    };
    format!(
        "id, {} AS label, quantity_per_sale_unit, unit_price_sale_unit, {}",
        kind.label_column(),
        currency
    )
}

// Erros de escrita comuns às três famílias.
fn map_write_error(e: sqlx::Error, label: &str) -> AppError {
    if is_unique_violation(&e) {
        return AppError::ResourceAlreadyExists(label.to_string());
    }
    if is_foreign_key_violation(&e) {
        return AppError::InvalidReference;
    }
    e.into()
}

#[derive(Clone, Default)]
pub struct ResourceRepository;

impl ResourceRepository {
    pub fn new() -> Self {
        Self
    }

    // ---
    // Funções de "Leitura"
    // ---

    pub async fn list_materials<'e, E>(
        &self,
        executor: E,
        tenant_id: TenantId,
    ) -> Result<Vec<Material>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let materials = sqlx::query_as::<_, Material>(
            "SELECT * FROM materials WHERE tenant_id = $1 ORDER BY name ASC",
        )
        .bind(tenant_id.as_uuid())
        .fetch_all(executor)
        .await?;
        Ok(materials)
    }

    pub async fn list_labor<'e, E>(
        &self,
        executor: E,
        tenant_id: TenantId,
    ) -> Result<Vec<Labor>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let labor = sqlx::query_as::<_, Labor>(
            r#"
            SELECT l.* FROM labor l
            JOIN categories c ON c.id = l.category_id
            JOIN sub_categories s ON s.id = l.sub_category_id
            WHERE l.tenant_id = $1
            ORDER BY c.name ASC, s.name ASC, l.task ASC
            "#,
        )
        .bind(tenant_id.as_uuid())
        .fetch_all(executor)
        .await?;
        Ok(labor)
    }

    pub async fn list_subcontracts<'e, E>(
        &self,
        executor: E,
        tenant_id: TenantId,
    ) -> Result<Vec<Subcontract>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let subcontracts = sqlx::query_as::<_, Subcontract>(
            r#"
            SELECT sc.* FROM subcontracts sc
            JOIN categories c ON c.id = sc.category_id
            JOIN sub_categories s ON s.id = sc.sub_category_id
            WHERE sc.tenant_id = $1
            ORDER BY c.name ASC, s.name ASC, sc.task ASC
            "#,
        )
        .bind(tenant_id.as_uuid())
        .fetch_all(executor)
        .await?;
        Ok(subcontracts)
    }

    /// Materiais pelos IDs; IDs de outra empresa simplesmente não voltam.
    pub async fn find_materials<'e, E>(
        &self,
        executor: E,
        tenant_id: TenantId,
        ids: &[Uuid],
    ) -> Result<Vec<Material>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let materials = sqlx::query_as::<_, Material>(
            "SELECT * FROM materials WHERE tenant_id = $1 AND id = ANY($2)",
        )
        .bind(tenant_id.as_uuid())
        .bind(ids)
        .fetch_all(executor)
        .await?;
        Ok(materials)
    }

    /// Trava o material (FOR SHARE) enquanto ele entra numa mezcla;
    /// uma troca de moeda concorrente espera o commit.
    pub async fn lock_material<'e, E>(
        &self,
        executor: E,
        tenant_id: TenantId,
        id: Uuid,
    ) -> Result<Option<Material>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let material = sqlx::query_as::<_, Material>(
            "SELECT * FROM materials WHERE tenant_id = $1 AND id = $2 FOR SHARE",
        )
        .bind(tenant_id.as_uuid())
        .bind(id)
        .fetch_optional(executor)
        .await?;
        Ok(material)
    }

    /// Moeda de outro material de alguma mezcla que contém `material_id`
    /// e que difere de `currency`.
    pub async fn conflicting_mixture_currency<'e, E>(
        &self,
        executor: E,
        tenant_id: TenantId,
        material_id: Uuid,
        currency: Currency,
    ) -> Result<Option<Currency>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let conflict = sqlx::query_scalar::<_, Currency>(
            r#"
            SELECT m.currency
            FROM mixture_lines mine
            JOIN mixture_lines other
              ON other.tenant_id = mine.tenant_id
             AND other.mixture_id = mine.mixture_id
             AND other.material_id <> mine.material_id
            JOIN materials m ON m.tenant_id = other.tenant_id AND m.id = other.material_id
            WHERE mine.tenant_id = $1 AND mine.material_id = $2 AND m.currency <> $3
            LIMIT 1
            "#,
        )
        .bind(tenant_id.as_uuid())
        .bind(material_id)
        .bind(currency)
        .fetch_optional(executor)
        .await?;
        Ok(conflict)
    }

    pub async fn list_prices<'e, E>(
        &self,
        executor: E,
        tenant_id: TenantId,
        kind: ResourceKind,
    ) -> Result<Vec<ResourcePrice>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let sql = format!(
            "SELECT {} FROM {} WHERE tenant_id = $1 ORDER BY label ASC",
            price_columns(kind),
            kind.table()
        );
        let prices = sqlx::query_as::<_, ResourcePrice>(&sql)
            .bind(tenant_id.as_uuid())
            .fetch_all(executor)
            .await?;
        Ok(prices)
    }

    pub async fn find_price<'e, E>(
        &self,
        executor: E,
        tenant_id: TenantId,
        kind: ResourceKind,
        id: Uuid,
    ) -> Result<Option<ResourcePrice>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let sql = format!(
            "SELECT {} FROM {} WHERE tenant_id = $1 AND id = $2",
            price_columns(kind),
            kind.table()
        );
        let price = sqlx::query_as::<_, ResourcePrice>(&sql)
            .bind(tenant_id.as_uuid())
            .bind(id)
            .fetch_optional(executor)
            .await?;
        Ok(price)
    }

    // ---
    // Funções de "Escrita"
    // ---

    pub async fn create_material<'e, E>(
        &self,
        executor: E,
        tenant_id: TenantId,
        input: &NewMaterial,
    ) -> Result<Material, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query_as::<_, Material>(
            r#"
            INSERT INTO materials (
                tenant_id, name, supplier_id, type_id, category_id, sale_unit_id,
                quantity_per_sale_unit, unit_price_sale_unit, currency
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING *
            "#,
        )
        .bind(tenant_id.as_uuid())
        .bind(&input.name)
        .bind(input.supplier_id)
        .bind(input.type_id)
        .bind(input.category_id)
        .bind(input.sale_unit_id)
        .bind(input.quantity_per_sale_unit)
        .bind(input.unit_price_sale_unit)
        .bind(input.currency)
        .fetch_one(executor)
        .await
        .map_err(|e| map_write_error(e, &input.name))
    }

    pub async fn create_labor<'e, E>(
        &self,
        executor: E,
        tenant_id: TenantId,
        input: &NewLabor,
    ) -> Result<Labor, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query_as::<_, Labor>(
            r#"
            INSERT INTO labor (
                tenant_id, category_id, sub_category_id, task, crew_id, crew_ref_id,
                sale_unit_id, quantity_per_sale_unit, unit_price_sale_unit
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING *
            "#,
        )
        .bind(tenant_id.as_uuid())
        .bind(input.category_id)
        .bind(input.sub_category_id)
        .bind(&input.task)
        .bind(input.crew_id)
        .bind(input.crew_ref_id)
        .bind(input.sale_unit_id)
        .bind(input.quantity_per_sale_unit)
        .bind(input.unit_price_sale_unit)
        .fetch_one(executor)
        .await
        .map_err(|e| map_write_error(e, &input.task))
    }

    pub async fn create_subcontract<'e, E>(
        &self,
        executor: E,
        tenant_id: TenantId,
        input: &NewSubcontract,
    ) -> Result<Subcontract, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query_as::<_, Subcontract>(
            r#"
            INSERT INTO subcontracts (
                tenant_id, category_id, sub_category_id, task, supplier_id,
                sale_unit_id, quantity_per_sale_unit, unit_price_sale_unit, currency
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING *
            "#,
        )
        .bind(tenant_id.as_uuid())
        .bind(input.category_id)
        .bind(input.sub_category_id)
        .bind(&input.task)
        .bind(input.supplier_id)
        .bind(input.sale_unit_id)
        .bind(input.quantity_per_sale_unit)
        .bind(input.unit_price_sale_unit)
        .bind(input.currency)
        .fetch_one(executor)
        .await
        .map_err(|e| map_write_error(e, &input.task))
    }

    /// Edição manual de preço de um recurso.
    pub async fn update_price<'e, E>(
        &self,
        executor: E,
        tenant_id: TenantId,
        kind: ResourceKind,
        id: Uuid,
        edit: &PriceEdit,
    ) -> Result<ResourcePrice, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        // COALESCE mantém a moeda atual quando nenhuma foi enviada.
        let currency_set = if kind.has_currency() {
            ", currency = COALESCE($5, currency)"
        } else {
            ""
        };
        let sql = format!(
            r#"
            UPDATE {} SET
                quantity_per_sale_unit = $3,
                unit_price_sale_unit = $4{}
            WHERE tenant_id = $1 AND id = $2
            RETURNING {}
            "#,
            kind.table(),
            currency_set,
            price_columns(kind)
        );

        let mut query = sqlx::query_as::<_, ResourcePrice>(&sql)
            .bind(tenant_id.as_uuid())
            .bind(id)
            .bind(edit.quantity_per_sale_unit)
            .bind(edit.unit_price_sale_unit);
        if kind.has_currency() {
            query = query.bind(edit.currency);
        }

        query
            .fetch_optional(executor)
            .await?
            .ok_or(AppError::NotFound(kind.label()))
    }

    /// Reajuste em massa: um único UPDATE atômico, sem ler-alterar-gravar.
    /// Linhas concorrentes são serializadas pelo próprio Postgres (lock de linha).
    pub async fn bulk_update_price<'e, E>(
        &self,
        executor: E,
        tenant_id: TenantId,
        kind: ResourceKind,
        ids: &[Uuid],
        factor: Decimal,
    ) -> Result<u64, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let sql = format!(
            r#"
            UPDATE {}
            SET unit_price_sale_unit = ROUND(unit_price_sale_unit * $3, 4)
            WHERE tenant_id = $1 AND id = ANY($2)
            "#,
            kind.table()
        );

        let result = sqlx::query(&sql)
            .bind(tenant_id.as_uuid())
            .bind(ids)
            .bind(factor)
            .execute(executor)
            .await
            .map_err(|e| {
                // Reajuste que estoura NUMERIC(12, 4): nenhuma linha muda.
                if is_numeric_overflow(&e) {
                    return AppError::AmountOutOfRange("unitPriceSaleUnit");
                }
                AppError::from(e)
            })?;

        Ok(result.rows_affected())
    }

    /// Linhas de hoja e de mezcla protegem o recurso (FK RESTRICT).
    pub async fn delete<'e, E>(
        &self,
        executor: E,
        tenant_id: TenantId,
        kind: ResourceKind,
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
                    return AppError::ResourceInUse;
                }
                AppError::from(e)
            })?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(kind.label()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        db::{
            test_support::{company, material, material_refs, tenant_tx},
            MixtureRepository, PriceSheetRepository,
        },
        models::{mixtures::NewMixture, price_sheets::NewPriceSheet},
        services::{
            mixture_service::MixtureService, price_sheet_service::PriceSheetService,
            pricing::tests::dec, resource_service::ResourceService,
        },
    };
    use sqlx::PgPool;

    #[test]
    fn labor_prices_project_a_null_currency() {
        let columns = price_columns(ResourceKind::Labor);
        assert!(columns.starts_with("id, task AS label"));
        assert!(columns.ends_with("NULL::currency_code AS currency"));
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "precisa de Postgres (DATABASE_URL)"]
    async fn material_frozen_in_a_sheet_cannot_be_deleted(pool: PgPool) {
        let a = company(&pool, "Constructora A").await;

        let mut tx = tenant_tx(&pool, a).await;
        let refs = material_refs(&mut tx, a).await;
        let cement = material(&mut tx, a, &refs, "Cemento", dec("100"), Currency::Ars).await;
        PriceSheetService::new(PriceSheetRepository::new(), ResourceRepository::new())
            .create_sheet(
                &mut *tx,
                a,
                ResourceKind::Material,
                NewPriceSheet {
                    name: "Enero".into(),
                    origin_id: None,
                    copy_origin_prices: false,
                    adjustment: None,
                },
            )
            .await
            .unwrap();
        tx.commit().await.unwrap();

        let mut tx = tenant_tx(&pool, a).await;
        let deleted = ResourceRepository::new()
            .delete(&mut *tx, a, ResourceKind::Material, cement.id)
            .await;
        assert!(matches!(deleted, Err(AppError::ResourceInUse)));
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "precisa de Postgres (DATABASE_URL)"]
    async fn bulk_update_ignores_ids_of_another_tenant(pool: PgPool) {
        let repo = ResourceRepository::new();
        let a = company(&pool, "Constructora A").await;
        let b = company(&pool, "Constructora B").await;

        let mut tx = tenant_tx(&pool, a).await;
        let refs = material_refs(&mut tx, a).await;
        let ours = material(&mut tx, a, &refs, "Cemento", dec("100"), Currency::Ars).await;
        tx.commit().await.unwrap();

        let mut tx = tenant_tx(&pool, b).await;
        let refs = material_refs(&mut tx, b).await;
        let theirs = material(&mut tx, b, &refs, "Cemento", dec("100"), Currency::Ars).await;
        tx.commit().await.unwrap();

        let mut tx = tenant_tx(&pool, a).await;
        let count = repo
            .bulk_update_price(&mut *tx, a, ResourceKind::Material, &[ours.id, theirs.id], dec("1.10"))
            .await
            .unwrap();
        tx.commit().await.unwrap();
        assert_eq!(count, 1);

        let mut tx = tenant_tx(&pool, a).await;
        let updated = repo
            .find_price(&mut *tx, a, ResourceKind::Material, ours.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated.unit_price_sale_unit, dec("110.0000"));
        drop(tx);

        let mut tx = tenant_tx(&pool, b).await;
        let untouched = repo
            .find_price(&mut *tx, b, ResourceKind::Material, theirs.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(untouched.unit_price_sale_unit, dec("100"));
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "precisa de Postgres (DATABASE_URL)"]
    async fn bulk_update_overflow_is_rejected_and_changes_nothing(pool: PgPool) {
        let repo = ResourceRepository::new();
        let a = company(&pool, "Constructora A").await;

        let mut tx = tenant_tx(&pool, a).await;
        let refs = material_refs(&mut tx, a).await;
        let small = material(&mut tx, a, &refs, "Arena", dec("10"), Currency::Ars).await;
        let huge = material(&mut tx, a, &refs, "Cemento", dec("99999999"), Currency::Ars).await;
        tx.commit().await.unwrap();

        let mut tx = tenant_tx(&pool, a).await;
        let outcome = ResourceService::new(repo.clone())
            .bulk_update_prices(&mut *tx, a, ResourceKind::Material, &[small.id, huge.id], "50")
            .await;
        assert!(matches!(outcome, Err(AppError::AmountOutOfRange("unitPriceSaleUnit"))));
        drop(tx);

        let mut tx = tenant_tx(&pool, a).await;
        let price = repo
            .find_price(&mut *tx, a, ResourceKind::Material, small.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(price.unit_price_sale_unit, dec("10"));
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "precisa de Postgres (DATABASE_URL)"]
    async fn currency_change_cannot_mix_a_mixture(pool: PgPool) {
        let repo = ResourceRepository::new();
        let a = company(&pool, "Constructora A").await;

        let mut tx = tenant_tx(&pool, a).await;
        let refs = material_refs(&mut tx, a).await;
        let cement = material(&mut tx, a, &refs, "Cemento", dec("100"), Currency::Ars).await;
        let sand = material(&mut tx, a, &refs, "Arena", dec("20"), Currency::Ars).await;
        let mixtures = MixtureService::new(
            MixtureRepository::new(),
            repo.clone(),
            PriceSheetService::new(PriceSheetRepository::new(), repo.clone()),
        );
        let concrete = mixtures
            .create(
                &mut *tx,
                a,
                NewMixture {
                    name: "Hormigón".into(),
                    unit_id: refs.unit_id,
                    sheet_id: None,
                },
            )
            .await
            .unwrap();
        mixtures
            .add_line(&mut *tx, a, concrete.id, cement.id, dec("5"))
            .await
            .unwrap();
        mixtures
            .add_line(&mut *tx, a, concrete.id, sand.id, dec("2"))
            .await
            .unwrap();
        tx.commit().await.unwrap();

        let mut tx = tenant_tx(&pool, a).await;
        let edit = PriceEdit {
            quantity_per_sale_unit: dec("1"),
            unit_price_sale_unit: dec("20"),
            currency: Some(Currency::Usd),
        };
        let changed = ResourceService::new(repo.clone())
            .update_price(&mut *tx, a, ResourceKind::Material, sand.id, edit)
            .await;
        assert!(matches!(
            changed,
            Err(AppError::MixedCurrency {
                expected: Currency::Ars,
                found: Currency::Usd
            })
        ));
        drop(tx);

        let mut tx = tenant_tx(&pool, a).await;
        let price = repo
            .find_price(&mut *tx, a, ResourceKind::Material, sand.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(price.currency, Some(Currency::Ars));
    }
}
