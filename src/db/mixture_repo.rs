// src/db/mixture_repo.rs

use rust_decimal::Decimal;
use sqlx::{Executor, Postgres};
use uuid::Uuid;

use crate::{
    common::{
        db_utils::{is_foreign_key_violation, is_unique_violation},
        error::AppError,
    },
    models::{
        mixtures::{Mixture, MixtureLine},
        resources::Currency,
        tenancy::TenantId,
    },
};

#[derive(Clone, Default)]
pub struct MixtureRepository;

impl MixtureRepository {
    pub fn new() -> Self {
        Self
    }

    pub async fn create<'e, E>(
        &self,
        executor: E,
        tenant_id: TenantId,
        name: &str,
        unit_id: Uuid,
        sheet_id: Option<Uuid>,
    ) -> Result<Mixture, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query_as::<_, Mixture>(
            r#"
            INSERT INTO mixtures (tenant_id, name, unit_id, sheet_id)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(tenant_id.as_uuid())
        .bind(name)
        .bind(unit_id)
        .bind(sheet_id)
        .fetch_one(executor)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                return AppError::MixtureAlreadyExists(name.to_string());
            }
            if is_foreign_key_violation(&e) {
                return AppError::InvalidReference;
            }
            e.into()
        })
    }

    pub async fn list<'e, E>(
        &self,
        executor: E,
        tenant_id: TenantId,
    ) -> Result<Vec<Mixture>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let mixtures = sqlx::query_as::<_, Mixture>(
            "SELECT * FROM mixtures WHERE tenant_id = $1 ORDER BY name ASC, created_at ASC",
        )
        .bind(tenant_id.as_uuid())
        .fetch_all(executor)
        .await?;
        Ok(mixtures)
    }

    pub async fn find<'e, E>(
        &self,
        executor: E,
        tenant_id: TenantId,
        mixture_id: Uuid,
    ) -> Result<Option<Mixture>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let mixture = sqlx::query_as::<_, Mixture>(
            "SELECT * FROM mixtures WHERE tenant_id = $1 AND id = $2",
        )
        .bind(tenant_id.as_uuid())
        .bind(mixture_id)
        .fetch_optional(executor)
        .await?;
        Ok(mixture)
    }

    /// Trava a mezcla (FOR UPDATE): inclusões de linha na mesma mezcla
    /// passam uma de cada vez.
    pub async fn lock<'e, E>(
        &self,
        executor: E,
        tenant_id: TenantId,
        mixture_id: Uuid,
    ) -> Result<Option<Mixture>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let mixture = sqlx::query_as::<_, Mixture>(
            "SELECT * FROM mixtures WHERE tenant_id = $1 AND id = $2 FOR UPDATE",
        )
        .bind(tenant_id.as_uuid())
        .bind(mixture_id)
        .fetch_optional(executor)
        .await?;
        Ok(mixture)
    }

    pub async fn delete<'e, E>(
        &self,
        executor: E,
        tenant_id: TenantId,
        mixture_id: Uuid,
    ) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let result = sqlx::query("DELETE FROM mixtures WHERE tenant_id = $1 AND id = $2")
            .bind(tenant_id.as_uuid())
            .bind(mixture_id)
            .execute(executor)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Mixture"));
        }
        Ok(())
    }

    // --- Linhas ---

    pub async fn lines<'e, E>(
        &self,
        executor: E,
        tenant_id: TenantId,
        mixture_id: Uuid,
    ) -> Result<Vec<MixtureLine>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let lines = sqlx::query_as::<_, MixtureLine>(
            r#"
            SELECT l.id, l.mixture_id, l.material_id, l.quantity
            FROM mixture_lines l
            JOIN materials m ON m.tenant_id = l.tenant_id AND m.id = l.material_id
            WHERE l.tenant_id = $1 AND l.mixture_id = $2
            ORDER BY m.name ASC
            "#,
        )
        .bind(tenant_id.as_uuid())
        .bind(mixture_id)
        .fetch_all(executor)
        .await?;
        Ok(lines)
    }

    /// Moedas dos materiais que já estão na mezcla. Os materiais ficam travados
    /// (FOR SHARE) até o fim da transação; sem DISTINCT, que o Postgres não
    /// aceita junto com FOR SHARE.
    pub async fn line_currencies<'e, E>(
        &self,
        executor: E,
        tenant_id: TenantId,
        mixture_id: Uuid,
    ) -> Result<Vec<Currency>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let currencies = sqlx::query_scalar::<_, Currency>(
            r#"
            SELECT m.currency
            FROM mixture_lines l
            JOIN materials m ON m.tenant_id = l.tenant_id AND m.id = l.material_id
            WHERE l.tenant_id = $1 AND l.mixture_id = $2
            FOR SHARE OF m
            "#,
        )
        .bind(tenant_id.as_uuid())
        .bind(mixture_id)
        .fetch_all(executor)
        .await?;
        Ok(currencies)
    }

    pub async fn add_line<'e, E>(
        &self,
        executor: E,
        tenant_id: TenantId,
        mixture_id: Uuid,
        material_id: Uuid,
        quantity: Decimal,
    ) -> Result<MixtureLine, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query_as::<_, MixtureLine>(
            r#"
            INSERT INTO mixture_lines (tenant_id, mixture_id, material_id, quantity)
            VALUES ($1, $2, $3, $4)
            RETURNING id, mixture_id, material_id, quantity
            "#,
        )
        .bind(tenant_id.as_uuid())
        .bind(mixture_id)
        .bind(material_id)
        .bind(quantity)
        .fetch_one(executor)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                return AppError::DuplicateMixtureLine;
            }
            if is_foreign_key_violation(&e) {
                return AppError::InvalidReference;
            }
            e.into()
        })
    }

    pub async fn update_line<'e, E>(
        &self,
        executor: E,
        tenant_id: TenantId,
        mixture_id: Uuid,
        material_id: Uuid,
        quantity: Decimal,
    ) -> Result<MixtureLine, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query_as::<_, MixtureLine>(
            r#"
            UPDATE mixture_lines SET quantity = $4
            WHERE tenant_id = $1 AND mixture_id = $2 AND material_id = $3
            RETURNING id, mixture_id, material_id, quantity
            "#,
        )
        .bind(tenant_id.as_uuid())
        .bind(mixture_id)
        .bind(material_id)
        .bind(quantity)
        .fetch_optional(executor)
        .await?
        .ok_or(AppError::NotFound("MixtureLine"))
    }

    pub async fn remove_line<'e, E>(
        &self,
        executor: E,
        tenant_id: TenantId,
        mixture_id: Uuid,
        material_id: Uuid,
    ) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let result = sqlx::query(
            "DELETE FROM mixture_lines WHERE tenant_id = $1 AND mixture_id = $2 AND material_id = $3",
        )
        .bind(tenant_id.as_uuid())
        .bind(mixture_id)
        .bind(material_id)
        .execute(executor)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("MixtureLine"));
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
            PriceSheetRepository, ResourceRepository,
        },
        models::{
            mixtures::NewMixture,
            price_sheets::NewPriceSheet,
            resources::ResourceKind,
        },
        services::{
            mixture_service::MixtureService, price_sheet_service::PriceSheetService,
            pricing::tests::dec, resource_service::ResourceService,
        },
    };
    use sqlx::PgPool;

    fn service() -> MixtureService {
        let resources = ResourceRepository::new();
        MixtureService::new(
            MixtureRepository::new(),
            resources.clone(),
            PriceSheetService::new(PriceSheetRepository::new(), resources),
        )
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "precisa de Postgres (DATABASE_URL)"]
    async fn cost_follows_the_bound_sheet_or_live_prices(pool: PgPool) {
        let a = company(&pool, "Constructora A").await;
        let mixtures = service();

        let mut tx = tenant_tx(&pool, a).await;
        let refs = material_refs(&mut tx, a).await;
        let cement = material(&mut tx, a, &refs, "Cemento", dec("100"), Currency::Ars).await;
        let sheet = PriceSheetService::new(PriceSheetRepository::new(), ResourceRepository::new())
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

        let mut ids = Vec::new();
        for sheet_id in [Some(sheet.id), None] {
            let mixture = mixtures
                .create(
                    &mut *tx,
                    a,
                    NewMixture {
                        name: "Hormigón".into(),
                        unit_id: refs.unit_id,
                        sheet_id,
                    },
                )
                .await
                .unwrap();
            mixtures
                .add_line(&mut *tx, a, mixture.id, cement.id, dec("5"))
                .await
                .unwrap();
            ids.push(mixture.id);
        }
        tx.commit().await.unwrap();

        let mut tx = tenant_tx(&pool, a).await;
        ResourceService::new(ResourceRepository::new())
            .bulk_update_prices(&mut *tx, a, ResourceKind::Material, &[cement.id], "50")
            .await
            .unwrap();
        tx.commit().await.unwrap();

        let mut tx = tenant_tx(&pool, a).await;
        let bound = mixtures.compute_cost(&mut tx, a, ids[0]).await.unwrap();
        let unbound = mixtures.compute_cost(&mut tx, a, ids[1]).await.unwrap();
        assert_eq!(bound.total, dec("500"));
        assert_eq!(unbound.total, dec("750"));
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "precisa de Postgres (DATABASE_URL)"]
    async fn lines_stay_inside_the_tenant(pool: PgPool) {
        let a = company(&pool, "Constructora A").await;
        let b = company(&pool, "Constructora B").await;
        let mixtures = service();

        let mut tx = tenant_tx(&pool, a).await;
        let refs = material_refs(&mut tx, a).await;
        let cement = material(&mut tx, a, &refs, "Cemento", dec("100"), Currency::Ars).await;
        let mixture = mixtures
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
            .add_line(&mut *tx, a, mixture.id, cement.id, dec("5"))
            .await
            .unwrap();
        tx.commit().await.unwrap();

        let mut tx = tenant_tx(&pool, a).await;
        let detail = mixtures.get(&mut tx, a, mixture.id).await.unwrap();
        assert_eq!(detail.lines.len(), 1);
        assert_eq!(detail.lines[0].material_id, cement.id);
        drop(tx);

        let mut tx = tenant_tx(&pool, b).await;
        let lines = MixtureRepository::new()
            .lines(&mut *tx, b, mixture.id)
            .await
            .unwrap();
        assert!(lines.is_empty());
        assert!(matches!(
            mixtures.get(&mut tx, b, mixture.id).await,
            Err(AppError::NotFound("Mixture"))
        ));
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "precisa de Postgres (DATABASE_URL)"]
    async fn second_currency_cannot_join_a_mixture(pool: PgPool) {
        let a = company(&pool, "Constructora A").await;
        let mixtures = service();

        let mut tx = tenant_tx(&pool, a).await;
        let refs = material_refs(&mut tx, a).await;
        let cement = material(&mut tx, a, &refs, "Cemento", dec("100"), Currency::Ars).await;
        let imported = material(&mut tx, a, &refs, "Aditivo", dec("3"), Currency::Usd).await;
        let mixture = mixtures
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
            .add_line(&mut *tx, a, mixture.id, cement.id, dec("5"))
            .await
            .unwrap();

        let mixed = mixtures
            .add_line(&mut *tx, a, mixture.id, imported.id, dec("1"))
            .await;
        assert!(matches!(mixed, Err(AppError::MixedCurrency { .. })));

        // O savepoint desfeito não derruba a transação externa.
        let detail = mixtures.get(&mut tx, a, mixture.id).await.unwrap();
        assert_eq!(detail.lines.len(), 1);
    }
}
