// src/models/exchange_rates.rs

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

// Tipo de dólar (oficial, blue, MEP...). Só guardamos as cotações cruas.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ExchangeRateType {
    pub id: Uuid,
    pub tenant_id: Uuid,
    #[schema(example = "Blue")]
    pub name: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ExchangeRateQuote {
    pub id: Uuid,
    pub rate_type_id: Uuid,
    pub quoted_on: NaiveDate,
    pub value: Decimal,
}

// Uma linha da tabela: a data e um valor por tipo (na ordem de `types`).
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RateTableRow {
    pub quoted_on: NaiveDate,
    pub values: Vec<Option<Decimal>>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RateTable {
    pub types: Vec<ExchangeRateType>,
    pub rows: Vec<RateTableRow>,
}
