// src/models/mixtures.rs

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

// --- Mezcla ---
// Sem `sheet_id` a mezcla é calculada com os preços atuais dos materiais.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Mixture {
    pub id: Uuid,
    pub tenant_id: Uuid,
    #[schema(example = "Hormigón H21")]
    pub name: String,
    pub unit_id: Uuid,
    pub sheet_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

// --- Linha da mezcla ---
// Quantidade na unidade de venda do material (bolsas, kg...).
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MixtureLine {
    pub id: Uuid,
    pub mixture_id: Uuid,
    pub material_id: Uuid,
    pub quantity: Decimal,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MixtureDetail {
    #[serde(flatten)]
    pub mixture: Mixture,
    pub lines: Vec<MixtureLine>,
}

// --- Custo calculado ---
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MixtureLineCost {
    pub material_id: Uuid,
    pub quantity: Decimal,
    pub unit_price: Decimal,
    /// Produto sem arredondar (até 8 casas); vai como texto para não perder dígitos.
    #[serde(with = "rust_decimal::serde::str")]
    #[schema(value_type = String, example = "500.00")]
    pub cost: Decimal,
    /// Falso quando a hoja não tem linha para o material (lacuna = zero).
    pub captured: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MixtureCost {
    pub mixture_id: Uuid,
    pub sheet_id: Option<Uuid>,
    /// Custo por unidade da mezcla (ex: por m3 de hormigón), exato, como texto.
    #[serde(with = "rust_decimal::serde::str")]
    #[schema(value_type = String, example = "15241576680.31406652")]
    pub total: Decimal,
    pub lines: Vec<MixtureLineCost>,
}

#[derive(Debug, Clone)]
pub struct NewMixture {
    pub name: String,
    pub unit_id: Uuid,
    pub sheet_id: Option<Uuid>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::pricing::tests::dec;

    #[test]
    fn cost_keeps_every_digit_in_json() {
        let quantity = dec("12345678.1234");
        let unit_price = dec("1234.5678");
        let cost = quantity * unit_price;
        let line = MixtureLineCost {
            material_id: Uuid::new_v4(),
            quantity,
            unit_price,
            cost,
            captured: true,
        };
        let total = MixtureCost {
            mixture_id: Uuid::new_v4(),
            sheet_id: None,
            total: cost,
            lines: vec![line],
        };

        let json = serde_json::to_value(&total).unwrap();

        assert_eq!(json["total"], "15241576680.31406652");
        assert_eq!(json["lines"][0]["cost"], "15241576680.31406652");
    }
}
