// src/services/mixture_service.rs
//
// Custo de uma mezcla: soma de quantidade × preço resolvido de cada material,
// pela hoja ligada ou pelo preço atual. Nada é guardado; cada cálculo relê o banco.

use std::collections::HashMap;

use rust_decimal::Decimal;
use sqlx::{Acquire, Executor, PgConnection, Postgres};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::{MixtureRepository, ResourceRepository},
    models::{
        mixtures::{Mixture, MixtureCost, MixtureDetail, MixtureLine, MixtureLineCost, NewMixture},
        resources::{Currency, Material, ResourceKind},
        tenancy::TenantId,
    },
    services::{
        price_sheet_service::PriceSheetService,
        pricing::{fits_column, resolve_line, SheetSnapshot, LINE_QUANTITY_DIGITS},
    },
};

pub(crate) fn ensure_positive(quantity: Decimal) -> Result<(), AppError> {
    if quantity <= Decimal::ZERO {
        return Err(AppError::NonPositiveQuantity("quantity"));
    }
    if !fits_column(quantity, LINE_QUANTITY_DIGITS) {
        return Err(AppError::AmountOutOfRange("quantity"));
    }
    Ok(())
}

/// Uma mezcla só soma valores de uma mesma moeda.
pub(crate) fn check_currency(existing: &[Currency], incoming: Currency) -> Result<(), AppError> {
    match existing.iter().find(|currency| **currency != incoming) {
        Some(expected) => Err(AppError::MixedCurrency {
            expected: *expected,
            found: incoming,
        }),
        None => Ok(()),
    }
}

/// Soma as linhas a partir do zero exato. Material sem linha na hoja contribui zero.
pub(crate) fn rollup(
    mixture: &Mixture,
    lines: &[MixtureLine],
    materials: &HashMap<Uuid, Material>,
    snapshot: Option<&SheetSnapshot>,
) -> MixtureCost {
    let mut total = Decimal::ZERO;

    let line_costs = lines
        .iter()
        .map(|line| {
            let (unit_price, captured) = match materials.get(&line.material_id) {
                Some(material) => {
                    let resolved = resolve_line(material, snapshot);
                    (resolved.unit_price_sale_unit, resolved.captured)
                }
                None => (Decimal::ZERO, false),
            };
            let cost = line.quantity * unit_price;
            total += cost;

            MixtureLineCost {
                material_id: line.material_id,
                quantity: line.quantity,
                unit_price,
                cost,
                captured,
            }
        })
        .collect();

    MixtureCost {
        mixture_id: mixture.id,
        sheet_id: mixture.sheet_id,
        total,
        lines: line_costs,
    }
}

#[derive(Clone)]
pub struct MixtureService {
    mixture_repo: MixtureRepository,
    resource_repo: ResourceRepository,
    sheet_service: PriceSheetService,
}

impl MixtureService {
    pub fn new(
        mixture_repo: MixtureRepository,
        resource_repo: ResourceRepository,
        sheet_service: PriceSheetService,
    ) -> Self {
        Self {
            mixture_repo,
            resource_repo,
            sheet_service,
        }
    }

    pub async fn create<'e, E>(
        &self,
        executor: E,
        tenant_id: TenantId,
        input: NewMixture,
    ) -> Result<Mixture, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        // A FK composta recusa unidade ou hoja de outra empresa.
        let mixture = self
            .mixture_repo
            .create(executor, tenant_id, input.name.trim(), input.unit_id, input.sheet_id)
            .await?;
        tracing::info!(mixture_id = %mixture.id, tenant_id = %tenant_id, "Mezcla criada");
        Ok(mixture)
    }

    pub async fn list<'e, E>(
        &self,
        executor: E,
        tenant_id: TenantId,
    ) -> Result<Vec<Mixture>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        self.mixture_repo.list(executor, tenant_id).await
    }

    pub async fn get(
        &self,
        conn: &mut PgConnection,
        tenant_id: TenantId,
        mixture_id: Uuid,
    ) -> Result<MixtureDetail, AppError> {
        let mixture = self
            .mixture_repo
            .find(&mut *conn, tenant_id, mixture_id)
            .await?
            .ok_or(AppError::NotFound("Mixture"))?;
        let lines = self
            .mixture_repo
            .lines(&mut *conn, tenant_id, mixture_id)
            .await?;

        Ok(MixtureDetail { mixture, lines })
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
        self.mixture_repo.delete(executor, tenant_id, mixture_id).await
    }

    // --- Linhas ---

    pub async fn add_line<'e, E>(
        &self,
        executor: E,
        tenant_id: TenantId,
        mixture_id: Uuid,
        material_id: Uuid,
        quantity: Decimal,
    ) -> Result<MixtureLine, AppError>
    where
        E: Executor<'e, Database = Postgres> + Acquire<'e, Database = Postgres>,
    {
        ensure_positive(quantity)?;

        let mut tx = executor.begin().await?;

        // Mezcla e materiais travados: outra inclusão ou troca de moeda
        // concorrente espera este commit e vê a linha nova.
        self.mixture_repo
            .lock(&mut *tx, tenant_id, mixture_id)
            .await?
            .ok_or(AppError::NotFound("Mixture"))?;

        let material = self
            .resource_repo
            .lock_material(&mut *tx, tenant_id, material_id)
            .await?
            .ok_or(AppError::NotFound("Material"))?;

        let currencies = self
            .mixture_repo
            .line_currencies(&mut *tx, tenant_id, mixture_id)
            .await?;
        check_currency(&currencies, material.currency)?;

        let line = self
            .mixture_repo
            .add_line(&mut *tx, tenant_id, mixture_id, material_id, quantity)
            .await?;

        tx.commit().await?;
        Ok(line)
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
        ensure_positive(quantity)?;
        self.mixture_repo
            .update_line(executor, tenant_id, mixture_id, material_id, quantity)
            .await
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
        self.mixture_repo
            .remove_line(executor, tenant_id, mixture_id, material_id)
            .await
    }

    /// Custo por unidade da mezcla, com o detalhe de cada linha.
    pub async fn compute_cost(
        &self,
        conn: &mut PgConnection,
        tenant_id: TenantId,
        mixture_id: Uuid,
    ) -> Result<MixtureCost, AppError> {
        let mixture = self
            .mixture_repo
            .find(&mut *conn, tenant_id, mixture_id)
            .await?
            .ok_or(AppError::NotFound("Mixture"))?;

        let lines = self
            .mixture_repo
            .lines(&mut *conn, tenant_id, mixture_id)
            .await?;

        let material_ids: Vec<Uuid> = lines.iter().map(|line| line.material_id).collect();
        let materials: HashMap<Uuid, Material> = self
            .resource_repo
            .find_materials(&mut *conn, tenant_id, &material_ids)
            .await?
            .into_iter()
            .map(|material| (material.id, material))
            .collect();

        let snapshot = match mixture.sheet_id {
            Some(sheet_id) => Some(
                self.sheet_service
                    .load_snapshot(&mut *conn, tenant_id, ResourceKind::Material, sheet_id)
                    .await?,
            ),
            None => None,
        };

        tracing::debug!(
            mixture_id = %mixture_id,
            lines = lines.len(),
            sheet_lines = snapshot.as_ref().map(SheetSnapshot::len),
            "Calculando custo da mezcla"
        );

        Ok(rollup(&mixture, &lines, &materials, snapshot.as_ref()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::pricing::tests::{dec, line_for, material};
    use chrono::Utc;

    fn mixture(sheet_id: Option<Uuid>) -> Mixture {
        Mixture {
            id: Uuid::new_v4(),
            tenant_id: Uuid::new_v4(),
            name: "Hormigón".into(),
            unit_id: Uuid::new_v4(),
            sheet_id,
            created_at: Utc::now(),
        }
    }

    fn mixture_line(mixture: &Mixture, material: &Material, quantity: &str) -> MixtureLine {
        MixtureLine {
            id: Uuid::new_v4(),
            mixture_id: mixture.id,
            material_id: material.id,
            quantity: dec(quantity),
        }
    }

    fn by_id(materials: Vec<Material>) -> HashMap<Uuid, Material> {
        materials.into_iter().map(|m| (m.id, m)).collect()
    }

    #[test]
    fn bound_mixture_keeps_sheet_price_while_unbound_follows_live() {
        let mut cement = material("1", "100.00");
        let sheet_id = Uuid::new_v4();
        let snapshot = SheetSnapshot::from_lines(sheet_id, vec![line_for(sheet_id, &cement)]);

        // O preço atual sobe depois da hoja.
        cement.unit_price_sale_unit = dec("150.00");

        let x = mixture(Some(sheet_id));
        let y = mixture(None);
        let x_lines = vec![mixture_line(&x, &cement, "5")];
        let y_lines = vec![mixture_line(&y, &cement, "5")];
        let materials = by_id(vec![cement]);

        let bound = rollup(&x, &x_lines, &materials, Some(&snapshot));
        let unbound = rollup(&y, &y_lines, &materials, None);

        assert_eq!(bound.total, dec("500.00"));
        assert_eq!(unbound.total, dec("750.00"));
        assert!(bound.lines[0].captured);
    }

    #[test]
    fn empty_mixture_costs_zero() {
        let x = mixture(None);
        let cost = rollup(&x, &[], &HashMap::new(), None);
        assert_eq!(cost.total, Decimal::ZERO);
        assert!(cost.lines.is_empty());
    }

    #[test]
    fn sheet_gap_contributes_zero() {
        let sand = material("1", "20.00");
        let lime = material("1", "8.50");
        let sheet_id = Uuid::new_v4();
        // A hoja só capturou a arena.
        let snapshot = SheetSnapshot::from_lines(sheet_id, vec![line_for(sheet_id, &sand)]);

        let x = mixture(Some(sheet_id));
        let lines = vec![mixture_line(&x, &sand, "2"), mixture_line(&x, &lime, "3")];
        let cost = rollup(&x, &lines, &by_id(vec![sand, lime]), Some(&snapshot));

        assert_eq!(cost.total, dec("40.00"));
        assert_eq!(cost.lines[1].cost, Decimal::ZERO);
        assert!(!cost.lines[1].captured);
    }

    #[test]
    fn total_is_sum_of_quantity_times_price() {
        let a = material("1", "12.3456");
        let b = material("1", "0.0001");
        let x = mixture(None);
        let lines = vec![mixture_line(&x, &a, "0.25"), mixture_line(&x, &b, "3")];
        let cost = rollup(&x, &lines, &by_id(vec![a, b]), None);

        assert_eq!(cost.total, dec("3.0864") + dec("0.0003"));
    }

    #[test]
    fn quantities_must_be_positive() {
        assert!(ensure_positive(dec("0.5")).is_ok());
        assert!(matches!(ensure_positive(Decimal::ZERO), Err(AppError::NonPositiveQuantity(_))));
        assert!(ensure_positive(dec("-1")).is_err());
        assert!(ensure_positive(dec("99999999.9999")).is_ok());
        assert!(matches!(
            ensure_positive(dec("100000000")),
            Err(AppError::AmountOutOfRange("quantity"))
        ));
    }

    #[test]
    fn currencies_cannot_be_mixed() {
        assert!(check_currency(&[], Currency::Usd).is_ok());
        assert!(check_currency(&[Currency::Ars], Currency::Ars).is_ok());
        assert!(matches!(
            check_currency(&[Currency::Ars], Currency::Usd),
            Err(AppError::MixedCurrency {
                expected: Currency::Ars,
                found: Currency::Usd
            })
        ));
    }
}
