// src/models/price_sheets.rs

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

use super::resources::{Currency, Priced};

// ---
// 1. Hoja de precios
// ---
// Foto nomeada dos preços de uma família. `origin_id` é só uma referência
// fraca para a hoja de onde esta foi copiada.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PriceSheet {
    pub id: Uuid,
    pub tenant_id: Uuid,
    #[schema(example = "Enero 2025")]
    pub name: String,
    pub origin_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

// ---
// 2. Linha congelada
// ---
// `resource_id` é o material, a mão de obra ou o subcontrato da linha.
// A moeda não existe nas hojas de mão de obra.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SheetLine {
    pub id: Uuid,
    pub sheet_id: Uuid,
    pub resource_id: Uuid,
    pub quantity_per_sale_unit: Decimal,
    pub unit_price_sale_unit: Decimal,
    pub currency: Option<Currency>,
}

/// Hoja completa: cabeçalho, nome da origem e as linhas com preço de análise.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceSheetDetail {
    #[serde(flatten)]
    pub sheet: PriceSheet,
    pub origin_name: Option<String>,
    pub lines: Vec<Priced<SheetLine>>,
}

// Uma linha da listagem "preços nesta hoja": todos os recursos da família,
// com o preço resolvido. `captured = false` indica uma lacuna (preço zero).
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SheetPriceRow {
    pub resource_id: Uuid,
    pub label: String,
    pub quantity_per_sale_unit: Decimal,
    pub unit_price_sale_unit: Decimal,
    pub currency: Option<Currency>,
    #[serde(with = "rust_decimal::serde::str")]
    #[schema(value_type = String)]
    pub analysis_unit_price: Decimal,
    pub captured: bool,
}

// Dados de criação já validados pelo handler.
#[derive(Debug, Clone, Default)]
pub struct NewPriceSheet {
    pub name: String,
    pub origin_id: Option<Uuid>,
    /// Copia os valores congelados da origem em vez dos preços atuais.
    pub copy_origin_prices: bool,
    /// Percentual de ajuste aplicado ao preço copiado ("10,5", "-3").
    pub adjustment: Option<String>,
}
