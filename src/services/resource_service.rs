// src/services/resource_service.rs

use rust_decimal::Decimal;
use sqlx::{Acquire, Executor, Postgres};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::ResourceRepository,
    models::{
        resources::{
            BulkUpdateOutcome, Currency, Labor, Material, NewLabor, NewMaterial, NewSubcontract, PriceEdit,
            Priced, ResourceKind, ResourcePrice, Subcontract,
        },
        tenancy::TenantId,
    },
    services::pricing::{
        fits_column, parse_percentage, percentage_factor, with_analysis_price, PRICE_DIGITS,
        RESOURCE_QUANTITY_DIGITS,
    },
};

/// Quantidade e preço nunca são negativos e precisam caber nas colunas.
pub(crate) fn ensure_valid_amounts(
    quantity_per_sale_unit: Decimal,
    unit_price_sale_unit: Decimal,
) -> Result<(), AppError> {
    if quantity_per_sale_unit < Decimal::ZERO {
        return Err(AppError::NegativeAmount("quantityPerSaleUnit"));
    }
    if unit_price_sale_unit < Decimal::ZERO {
        return Err(AppError::NegativeAmount("unitPriceSaleUnit"));
    }
    if !fits_column(quantity_per_sale_unit, RESOURCE_QUANTITY_DIGITS) {
        return Err(AppError::AmountOutOfRange("quantityPerSaleUnit"));
    }
    if !fits_column(unit_price_sale_unit, PRICE_DIGITS) {
        return Err(AppError::AmountOutOfRange("unitPriceSaleUnit"));
    }
    Ok(())
}

/// Fator do reajuste, ou `None` quando o percentual é zero (nada a gravar).
pub(crate) fn bulk_factor(raw_percentage: &str) -> Result<Option<Decimal>, AppError> {
    let percentage = parse_percentage(raw_percentage)?;
    if percentage.is_zero() {
        return Ok(None);
    }
    Ok(Some(percentage_factor(percentage)))
}

pub(crate) fn reject_currency_conflict(
    conflict: Option<Currency>,
    incoming: Currency,
) -> Result<(), AppError> {
    match conflict {
        Some(expected) => Err(AppError::MixedCurrency {
            expected,
            found: incoming,
        }),
        None => Ok(()),
    }
}

#[derive(Clone)]
pub struct ResourceService {
    resource_repo: ResourceRepository,
}

impl ResourceService {
    pub fn new(resource_repo: ResourceRepository) -> Self {
        Self { resource_repo }
    }

    // --- Listagens (sempre com o preço de análise calculado) ---

    pub async fn list_materials<'e, E>(
        &self,
        executor: E,
        tenant_id: TenantId,
    ) -> Result<Vec<Priced<Material>>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let materials = self.resource_repo.list_materials(executor, tenant_id).await?;
        Ok(materials.into_iter().map(with_analysis_price).collect())
    }

    pub async fn list_labor<'e, E>(
        &self,
        executor: E,
        tenant_id: TenantId,
    ) -> Result<Vec<Priced<Labor>>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let labor = self.resource_repo.list_labor(executor, tenant_id).await?;
        Ok(labor.into_iter().map(with_analysis_price).collect())
    }

    pub async fn list_subcontracts<'e, E>(
        &self,
        executor: E,
        tenant_id: TenantId,
    ) -> Result<Vec<Priced<Subcontract>>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let subcontracts = self.resource_repo.list_subcontracts(executor, tenant_id).await?;
        Ok(subcontracts.into_iter().map(with_analysis_price).collect())
    }

    // --- Criação ---

    pub async fn create_material<'e, E>(
        &self,
        executor: E,
        tenant_id: TenantId,
        input: NewMaterial,
    ) -> Result<Priced<Material>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        ensure_valid_amounts(input.quantity_per_sale_unit, input.unit_price_sale_unit)?;
        let material = self
            .resource_repo
            .create_material(executor, tenant_id, &input)
            .await?;
        tracing::info!(material_id = %material.id, tenant_id = %tenant_id, "Material criado");
        Ok(with_analysis_price(material))
    }

    pub async fn create_labor<'e, E>(
        &self,
        executor: E,
        tenant_id: TenantId,
        input: NewLabor,
    ) -> Result<Priced<Labor>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        ensure_valid_amounts(input.quantity_per_sale_unit, input.unit_price_sale_unit)?;
        let labor = self.resource_repo.create_labor(executor, tenant_id, &input).await?;
        tracing::info!(labor_id = %labor.id, tenant_id = %tenant_id, "Mão de obra criada");
        Ok(with_analysis_price(labor))
    }

    pub async fn create_subcontract<'e, E>(
        &self,
        executor: E,
        tenant_id: TenantId,
        input: NewSubcontract,
    ) -> Result<Priced<Subcontract>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        ensure_valid_amounts(input.quantity_per_sale_unit, input.unit_price_sale_unit)?;
        let subcontract = self
            .resource_repo
            .create_subcontract(executor, tenant_id, &input)
            .await?;
        tracing::info!(subcontract_id = %subcontract.id, tenant_id = %tenant_id, "Subcontrato criado");
        Ok(with_analysis_price(subcontract))
    }

    // --- Preços ---

    /// Trocar a moeda de um material não pode deixar uma mezcla com duas moedas.
    pub async fn update_price<'e, E>(
        &self,
        executor: E,
        tenant_id: TenantId,
        kind: ResourceKind,
        id: Uuid,
        edit: PriceEdit,
    ) -> Result<Priced<ResourcePrice>, AppError>
    where
        E: Executor<'e, Database = Postgres> + Acquire<'e, Database = Postgres>,
    {
        ensure_valid_amounts(edit.quantity_per_sale_unit, edit.unit_price_sale_unit)?;

        let mut tx = executor.begin().await?;

        // O UPDATE trava a linha; a checagem abaixo já vê as linhas de mezcla
        // gravadas por quem travou o material antes.
        let price = self
            .resource_repo
            .update_price(&mut *tx, tenant_id, kind, id, &edit)
            .await?;

        if let (ResourceKind::Material, Some(currency)) = (kind, edit.currency) {
            let conflict = self
                .resource_repo
                .conflicting_mixture_currency(&mut *tx, tenant_id, id, currency)
                .await?;
            reject_currency_conflict(conflict, currency)?;
        }

        tx.commit().await?;
        Ok(with_analysis_price(price))
    }

    /// Reajuste percentual em massa de uma família.
    /// Percentual inválido: nada é aplicado. Percentual zero: `NoChange`.
    /// IDs inexistentes ou de outra empresa são ignorados pelo filtro do UPDATE.
    pub async fn bulk_update_prices<'e, E>(
        &self,
        executor: E,
        tenant_id: TenantId,
        kind: ResourceKind,
        ids: &[Uuid],
        raw_percentage: &str,
    ) -> Result<BulkUpdateOutcome, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let Some(factor) = bulk_factor(raw_percentage)? else {
            return Ok(BulkUpdateOutcome::NoChange);
        };
        if ids.is_empty() {
            return Ok(BulkUpdateOutcome::Updated { count: 0 });
        }

        let count = self
            .resource_repo
            .bulk_update_price(executor, tenant_id, kind, ids, factor)
            .await?;

        tracing::info!(
            tenant_id = %tenant_id,
            kind = kind.label(),
            percentage = raw_percentage,
            count,
            "Reajuste em massa aplicado"
        );
        Ok(BulkUpdateOutcome::Updated { count })
    }

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
        self.resource_repo.delete(executor, tenant_id, kind, id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::pricing::tests::dec;

    #[test]
    fn zero_percentage_means_no_change() {
        assert_eq!(bulk_factor("0").unwrap(), None);
        assert_eq!(bulk_factor("0,00").unwrap(), None);
    }

    #[test]
    fn factor_follows_the_parsed_percentage() {
        assert_eq!(bulk_factor("10").unwrap(), Some(dec("1.10")));
        assert_eq!(bulk_factor("-100").unwrap(), Some(Decimal::ZERO));
        assert!(matches!(bulk_factor("-150"), Err(AppError::InvalidPercentage(_))));
    }

    #[test]
    fn negative_amounts_are_rejected() {
        assert!(ensure_valid_amounts(dec("1"), dec("0")).is_ok());
        assert!(matches!(
            ensure_valid_amounts(dec("-1"), dec("10")),
            Err(AppError::NegativeAmount("quantityPerSaleUnit"))
        ));
        assert!(matches!(
            ensure_valid_amounts(dec("1"), dec("-0.01")),
            Err(AppError::NegativeAmount("unitPriceSaleUnit"))
        ));
    }

    #[test]
    fn amounts_beyond_the_columns_are_rejected_before_the_database() {
        assert!(ensure_valid_amounts(dec("999999.9999"), dec("99999999.9999")).is_ok());
        assert!(matches!(
            ensure_valid_amounts(dec("1"), dec("1000000000000")),
            Err(AppError::AmountOutOfRange("unitPriceSaleUnit"))
        ));
        assert!(matches!(
            ensure_valid_amounts(dec("1000000"), dec("1")),
            Err(AppError::AmountOutOfRange("quantityPerSaleUnit"))
        ));
    }

    #[test]
    fn currency_change_conflicting_with_a_mixture_is_rejected() {
        assert!(reject_currency_conflict(None, Currency::Usd).is_ok());
        assert!(matches!(
            reject_currency_conflict(Some(Currency::Ars), Currency::Usd),
            Err(AppError::MixedCurrency {
                expected: Currency::Ars,
                found: Currency::Usd
            })
        ));
    }
}
