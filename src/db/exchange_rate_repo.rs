// src/db/exchange_rate_repo.rs

use chrono::NaiveDate;
use rust_decimal::Decimal;
use sqlx::{Executor, Postgres};
use uuid::Uuid;

use crate::{
    common::{
        db_utils::{is_foreign_key_violation, is_unique_violation},
        error::AppError,
    },
    models::{
        exchange_rates::{ExchangeRateQuote, ExchangeRateType},
        tenancy::TenantId,
    },
};

/// Quantas datas a tabela de cotações mostra.
pub const RATE_TABLE_DAYS: i64 = 200;

#[derive(Clone, Default)]
pub struct ExchangeRateRepository;

impl ExchangeRateRepository {
    pub fn new() -> Self {
        Self
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
        sqlx::query_as::<_, ExchangeRateType>(
            "INSERT INTO exchange_rate_types (tenant_id, name) VALUES ($1, $2) RETURNING *",
        )
        .bind(tenant_id.as_uuid())
        .bind(name)
        .fetch_one(executor)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                return AppError::CatalogEntryAlreadyExists(name.to_string());
            }
            e.into()
        })
    }

    pub async fn list_types<'e, E>(
        &self,
        executor: E,
        tenant_id: TenantId,
    ) -> Result<Vec<ExchangeRateType>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let types = sqlx::query_as::<_, ExchangeRateType>(
            "SELECT * FROM exchange_rate_types WHERE tenant_id = $1 ORDER BY name ASC",
        )
        .bind(tenant_id.as_uuid())
        .fetch_all(executor)
        .await?;
        Ok(types)
    }

    /// Grava (ou sobrescreve) a cotação de um tipo numa data.
    pub async fn upsert_quote<'e, E>(
        &self,
        executor: E,
        tenant_id: TenantId,
        rate_type_id: Uuid,
        quoted_on: NaiveDate,
        value: Decimal,
    ) -> Result<ExchangeRateQuote, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query_as::<_, ExchangeRateQuote>(
            r#"
            INSERT INTO exchange_rate_quotes (tenant_id, rate_type_id, quoted_on, value)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (tenant_id, quoted_on, rate_type_id)
            DO UPDATE SET value = EXCLUDED.value, updated_at = NOW()
            RETURNING id, rate_type_id, quoted_on, value
            "#,
        )
        .bind(tenant_id.as_uuid())
        .bind(rate_type_id)
        .bind(quoted_on)
        .bind(value)
        .fetch_one(executor)
        .await
        .map_err(|e| {
            if is_foreign_key_violation(&e) {
                return AppError::InvalidReference;
            }
            e.into()
        })
    }

    /// Cotações das últimas `RATE_TABLE_DAYS` datas com algum valor.
    pub async fn recent_quotes<'e, E>(
        &self,
        executor: E,
        tenant_id: TenantId,
    ) -> Result<Vec<ExchangeRateQuote>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let quotes = sqlx::query_as::<_, ExchangeRateQuote>(
            r#"
            SELECT q.id, q.rate_type_id, q.quoted_on, q.value
            FROM exchange_rate_quotes q
            WHERE q.tenant_id = $1
              AND q.quoted_on IN (
                  SELECT DISTINCT quoted_on FROM exchange_rate_quotes
                  WHERE tenant_id = $1
                  ORDER BY quoted_on DESC
                  LIMIT $2
              )
            ORDER BY q.quoted_on DESC
            "#,
        )
        .bind(tenant_id.as_uuid())
        .bind(RATE_TABLE_DAYS)
        .fetch_all(executor)
        .await?;
        Ok(quotes)
    }
}
