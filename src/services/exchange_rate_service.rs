// src/services/exchange_rate_service.rs

use std::collections::{BTreeMap, HashMap};
use std::str::FromStr;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use sqlx::{Acquire, Executor, PgConnection, Postgres};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::ExchangeRateRepository,
    models::{
        exchange_rates::{ExchangeRateQuote, ExchangeRateType, RateTable, RateTableRow},
        tenancy::TenantId,
    },
    services::pricing::{fits_column, PRICE_DIGITS},
};

pub(crate) fn parse_quote_date(raw: &str) -> Result<NaiveDate, AppError> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|_| AppError::InvalidDate(raw.to_string()))
}

/// "1234,50" ou "1234.50". Cotação negativa não existe; acima de NUMERIC(12, 4) também não.
pub(crate) fn parse_quote_value(raw: &str) -> Result<Decimal, AppError> {
    let value = Decimal::from_str(&raw.trim().replace(',', "."))
        .map_err(|_| AppError::InvalidQuoteValue(raw.to_string()))?;
    if value < Decimal::ZERO || !fits_column(value, PRICE_DIGITS) {
        return Err(AppError::InvalidQuoteValue(raw.to_string()));
    }
    Ok(value)
}

/// Valida o lote inteiro antes de gravar; valores em branco são ignorados.
pub(crate) fn parse_quote_batch(
    values: &[(Uuid, String)],
) -> Result<Vec<(Uuid, Decimal)>, AppError> {
    values
        .iter()
        .filter(|(_, raw)| !raw.trim().is_empty())
        .map(|(rate_type_id, raw)| Ok((*rate_type_id, parse_quote_value(raw)?)))
        .collect()
}

/// Pivota as cotações: uma linha por data (mais recente primeiro),
/// uma coluna por tipo na ordem de `types`.
pub(crate) fn pivot(types: &[ExchangeRateType], quotes: &[ExchangeRateQuote]) -> Vec<RateTableRow> {
    let column: HashMap<Uuid, usize> = types
        .iter()
        .enumerate()
        .map(|(index, rate_type)| (rate_type.id, index))
        .collect();

    let mut by_date: BTreeMap<NaiveDate, Vec<Option<Decimal>>> = BTreeMap::new();
    for quote in quotes {
        let Some(&index) = column.get(&quote.rate_type_id) else {
            continue;
        };
        let values = by_date
            .entry(quote.quoted_on)
            .or_insert_with(|| vec![None; types.len()]);
        values[index] = Some(quote.value);
    }

    by_date
        .into_iter()
        .rev()
        .map(|(quoted_on, values)| RateTableRow { quoted_on, values })
        .collect()
}

#[derive(Clone)]
pub struct ExchangeRateService {
    rate_repo: ExchangeRateRepository,
}

impl ExchangeRateService {
    pub fn new(rate_repo: ExchangeRateRepository) -> Self {
        Self { rate_repo }
    }

    pub async fn create_type<'e, E>(
        &self,
        executor: E,
        tenant_id: TenantId,
        name: &str,
    ) -> Result<ExchangeRateType, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        self.rate_repo.create_type(executor, tenant_id, name.trim()).await
    }

    pub async fn list_types<'e, E>(
        &self,
        executor: E,
        tenant_id: TenantId,
    ) -> Result<Vec<ExchangeRateType>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        self.rate_repo.list_types(executor, tenant_id).await
    }

    /// Grava as cotações de uma data. Um valor inválido recusa o lote inteiro.
    pub async fn save_quotes<'e, E>(
        &self,
        executor: E,
        tenant_id: TenantId,
        raw_date: &str,
        values: &[(Uuid, String)],
    ) -> Result<Vec<ExchangeRateQuote>, AppError>
    where
        E: Executor<'e, Database = Postgres> + Acquire<'e, Database = Postgres>,
    {
        let quoted_on = parse_quote_date(raw_date)?;
        let parsed = parse_quote_batch(values)?;

        let mut tx = executor.begin().await?;
        let mut saved = Vec::with_capacity(parsed.len());
        for (rate_type_id, value) in parsed {
            let quote = self
                .rate_repo
                .upsert_quote(&mut *tx, tenant_id, rate_type_id, quoted_on, value)
                .await?;
            saved.push(quote);
        }
        tx.commit().await?;

        tracing::info!(tenant_id = %tenant_id, date = %quoted_on, count = saved.len(), "Cotações gravadas");
        Ok(saved)
    }

    pub async fn rate_table(
        &self,
        conn: &mut PgConnection,
        tenant_id: TenantId,
    ) -> Result<RateTable, AppError> {
        let types = self.rate_repo.list_types(&mut *conn, tenant_id).await?;
        let quotes = self.rate_repo.recent_quotes(&mut *conn, tenant_id).await?;
        let rows = pivot(&types, &quotes);

        Ok(RateTable { types, rows })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::pricing::tests::dec;
    use chrono::Utc;

    fn rate_type(name: &str) -> ExchangeRateType {
        ExchangeRateType {
            id: Uuid::new_v4(),
            tenant_id: Uuid::new_v4(),
            name: name.into(),
            created_at: Utc::now(),
        }
    }

    fn quote(rate_type: &ExchangeRateType, date: &str, value: &str) -> ExchangeRateQuote {
        ExchangeRateQuote {
            id: Uuid::new_v4(),
            rate_type_id: rate_type.id,
            quoted_on: parse_quote_date(date).unwrap(),
            value: dec(value),
        }
    }

    #[test]
    fn dates_must_be_iso() {
        assert!(parse_quote_date("2025-03-01").is_ok());
        assert!(matches!(parse_quote_date("01/03/2025"), Err(AppError::InvalidDate(_))));
    }

    #[test]
    fn values_accept_comma_and_reject_negatives() {
        assert_eq!(parse_quote_value("1180,50").unwrap(), dec("1180.50"));
        assert!(matches!(parse_quote_value("-1"), Err(AppError::InvalidQuoteValue(_))));
        assert!(parse_quote_value("mil").is_err());
        assert!(matches!(
            parse_quote_value("123456789,5"),
            Err(AppError::InvalidQuoteValue(_))
        ));
    }

    #[test]
    fn one_bad_value_rejects_the_batch() {
        let ok = (Uuid::new_v4(), "1000".to_string());
        let blank = (Uuid::new_v4(), "  ".to_string());
        let bad = (Uuid::new_v4(), "x".to_string());

        assert_eq!(parse_quote_batch(&[ok.clone(), blank.clone()]).unwrap().len(), 1);
        assert!(parse_quote_batch(&[ok, blank, bad]).is_err());
    }

    #[test]
    fn pivot_orders_dates_descending_and_columns_by_type() {
        let official = rate_type("Oficial");
        let blue = rate_type("Blue");
        let quotes = vec![
            quote(&official, "2025-03-01", "1050"),
            quote(&blue, "2025-03-02", "1200"),
            quote(&official, "2025-03-02", "1060"),
        ];

        let rows = pivot(&[official, blue], &quotes);

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].quoted_on, parse_quote_date("2025-03-02").unwrap());
        assert_eq!(rows[0].values, vec![Some(dec("1060")), Some(dec("1200"))]);
        assert_eq!(rows[1].values, vec![Some(dec("1050")), None]);
    }
}
