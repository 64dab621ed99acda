// src/services/price_sheet_service.rs

use rust_decimal::Decimal;
use sqlx::{Acquire, Executor, PgConnection, Postgres};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::{PriceSheetRepository, ResourceRepository},
    models::{
        price_sheets::{NewPriceSheet, PriceSheet, PriceSheetDetail, SheetPriceRow},
        resources::ResourceKind,
        tenancy::TenantId,
    },
    services::pricing::{
        parse_percentage, percentage_factor, resolve_line, resolve_price, with_analysis_price,
        SheetSnapshot,
    },
};

/// De onde vêm as linhas de uma hoja nova.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum LineSource {
    /// Preços atuais de todos os recursos da família.
    LiveAll,
    /// Preços atuais, só dos recursos presentes na origem.
    LiveFromOrigin(Uuid),
    /// Valores congelados da origem.
    CopyOrigin(Uuid),
}

pub(crate) fn line_source(
    origin_id: Option<Uuid>,
    copy_origin_prices: bool,
) -> Result<LineSource, AppError> {
    match (origin_id, copy_origin_prices) {
        (None, false) => Ok(LineSource::LiveAll),
        (None, true) => Err(AppError::OriginRequired),
        (Some(origin), false) => Ok(LineSource::LiveFromOrigin(origin)),
        (Some(origin), true) => Ok(LineSource::CopyOrigin(origin)),
    }
}

/// Ajuste opcional; campo vazio vale como "sem ajuste".
pub(crate) fn adjustment_factor(adjustment: Option<&str>) -> Result<Decimal, AppError> {
    match adjustment.map(str::trim).filter(|raw| !raw.is_empty()) {
        Some(raw) => Ok(percentage_factor(parse_percentage(raw)?)),
        None => Ok(Decimal::ONE),
    }
}

#[derive(Clone)]
pub struct PriceSheetService {
    sheet_repo: PriceSheetRepository,
    resource_repo: ResourceRepository,
}

impl PriceSheetService {
    pub fn new(sheet_repo: PriceSheetRepository, resource_repo: ResourceRepository) -> Self {
        Self {
            sheet_repo,
            resource_repo,
        }
    }

    /// Cria a hoja e congela as linhas numa única transação.
    /// Depois do commit as linhas não são mais recalculadas.
    pub async fn create_sheet<'e, E>(
        &self,
        executor: E,
        tenant_id: TenantId,
        kind: ResourceKind,
        input: NewPriceSheet,
    ) -> Result<PriceSheet, AppError>
    where
        E: Executor<'e, Database = Postgres> + Acquire<'e, Database = Postgres>,
    {
        // Valida tudo antes de tocar no banco.
        let source = line_source(input.origin_id, input.copy_origin_prices)?;
        let factor = adjustment_factor(input.adjustment.as_deref())?;

        let mut tx = executor.begin().await?;

        // A origem tem de ser da mesma empresa e da mesma família.
        if let Some(origin_id) = input.origin_id {
            self.sheet_repo
                .find_sheet(&mut *tx, tenant_id, kind, origin_id)
                .await?
                .ok_or(AppError::NotFound("PriceSheet"))?;
        }

        let sheet = self
            .sheet_repo
            .create_sheet(&mut *tx, tenant_id, kind, input.name.trim(), input.origin_id)
            .await?;

        let line_count = match source {
            LineSource::LiveAll => {
                self.sheet_repo
                    .snapshot_live(&mut *tx, tenant_id, kind, sheet.id, None, factor)
                    .await?
            }
            LineSource::LiveFromOrigin(origin_id) => {
                self.sheet_repo
                    .snapshot_live(&mut *tx, tenant_id, kind, sheet.id, Some(origin_id), factor)
                    .await?
            }
            LineSource::CopyOrigin(origin_id) => {
                self.sheet_repo
                    .copy_from_origin(&mut *tx, tenant_id, kind, sheet.id, factor, origin_id)
                    .await?
            }
        };

        tx.commit().await?;

        tracing::info!(
            sheet_id = %sheet.id,
            tenant_id = %tenant_id,
            kind = kind.label(),
            lines = line_count,
            "Hoja de precios criada"
        );
        Ok(sheet)
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
        self.sheet_repo.list_sheets(executor, tenant_id, kind).await
    }

    pub async fn get_sheet(
        &self,
        conn: &mut PgConnection,
        tenant_id: TenantId,
        kind: ResourceKind,
        sheet_id: Uuid,
    ) -> Result<PriceSheetDetail, AppError> {
        let sheet = self
            .sheet_repo
            .find_sheet(&mut *conn, tenant_id, kind, sheet_id)
            .await?
            .ok_or(AppError::NotFound("PriceSheet"))?;

        let origin_name = match sheet.origin_id {
            Some(origin_id) => self
                .sheet_repo
                .find_sheet(&mut *conn, tenant_id, kind, origin_id)
                .await?
                .map(|origin| origin.name),
            None => None,
        };

        let lines = self
            .sheet_repo
            .lines(&mut *conn, tenant_id, kind, sheet_id)
            .await?
            .into_iter()
            .map(with_analysis_price)
            .collect();

        Ok(PriceSheetDetail {
            sheet,
            origin_name,
            lines,
        })
    }

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
        self.sheet_repo
            .delete_sheet(executor, tenant_id, kind, sheet_id)
            .await?;
        tracing::info!(sheet_id = %sheet_id, tenant_id = %tenant_id, "Hoja de precios removida");
        Ok(())
    }

    /// Carrega as linhas de uma hoja da empresa. Relido a cada cálculo.
    pub async fn load_snapshot(
        &self,
        conn: &mut PgConnection,
        tenant_id: TenantId,
        kind: ResourceKind,
        sheet_id: Uuid,
    ) -> Result<SheetSnapshot, AppError> {
        self.sheet_repo
            .find_sheet(&mut *conn, tenant_id, kind, sheet_id)
            .await?
            .ok_or(AppError::NotFound("PriceSheet"))?;

        let lines = self
            .sheet_repo
            .lines(&mut *conn, tenant_id, kind, sheet_id)
            .await?;
        Ok(SheetSnapshot::from_lines(sheet_id, lines))
    }

    /// Todos os recursos da família com o preço resolvido na hoja.
    /// Recursos criados depois da hoja aparecem com preço zero.
    pub async fn sheet_prices(
        &self,
        conn: &mut PgConnection,
        tenant_id: TenantId,
        kind: ResourceKind,
        sheet_id: Uuid,
    ) -> Result<Vec<SheetPriceRow>, AppError> {
        let snapshot = self
            .load_snapshot(&mut *conn, tenant_id, kind, sheet_id)
            .await?;
        let resources = self
            .resource_repo
            .list_prices(&mut *conn, tenant_id, kind)
            .await?;

        let rows = resources
            .into_iter()
            .map(|resource| {
                let resolved = resolve_line(&resource, Some(&snapshot));
                SheetPriceRow {
                    resource_id: resource.id,
                    label: resource.label,
                    quantity_per_sale_unit: resolved.quantity_per_sale_unit,
                    unit_price_sale_unit: resolved.unit_price_sale_unit,
                    currency: resolved.currency,
                    analysis_unit_price: resolved.analysis_unit_price(),
                    captured: resolved.captured,
                }
            })
            .collect();
        Ok(rows)
    }

    /// Preço por unidade de venda do recurso na hoja indicada, ou o atual.
    pub async fn resolved_price(
        &self,
        conn: &mut PgConnection,
        tenant_id: TenantId,
        kind: ResourceKind,
        resource_id: Uuid,
        sheet_id: Option<Uuid>,
    ) -> Result<Decimal, AppError> {
        let resource = self
            .resource_repo
            .find_price(&mut *conn, tenant_id, kind, resource_id)
            .await?
            .ok_or(AppError::NotFound(kind.label()))?;

        let snapshot = match sheet_id {
            Some(sheet_id) => {
                self.sheet_repo
                    .find_sheet(&mut *conn, tenant_id, kind, sheet_id)
                    .await?
                    .ok_or(AppError::NotFound("PriceSheet"))?;
                let line = self
                    .sheet_repo
                    .find_line(&mut *conn, tenant_id, kind, sheet_id, resource_id)
                    .await?;
                Some(SheetSnapshot::from_lines(sheet_id, line.into_iter().collect()))
            }
            None => None,
        };

        Ok(resolve_price(&resource, snapshot.as_ref()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::pricing::tests::dec;

    #[test]
    fn sheet_without_origin_snapshots_every_live_price() {
        assert_eq!(line_source(None, false).unwrap(), LineSource::LiveAll);
    }

    #[test]
    fn origin_selects_restricted_live_or_frozen_copy() {
        let origin = Uuid::new_v4();
        assert_eq!(
            line_source(Some(origin), false).unwrap(),
            LineSource::LiveFromOrigin(origin)
        );
        assert_eq!(
            line_source(Some(origin), true).unwrap(),
            LineSource::CopyOrigin(origin)
        );
    }

    #[test]
    fn copying_prices_requires_an_origin() {
        assert!(matches!(line_source(None, true), Err(AppError::OriginRequired)));
    }

    #[test]
    fn blank_adjustment_keeps_prices() {
        assert_eq!(adjustment_factor(None).unwrap(), Decimal::ONE);
        assert_eq!(adjustment_factor(Some("  ")).unwrap(), Decimal::ONE);
        assert_eq!(adjustment_factor(Some("10,5")).unwrap(), dec("1.105"));
        assert!(adjustment_factor(Some("abc")).is_err());
    }
}
