// src/models/resources.rs

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

// --- Moeda ---
// ARS é a moeda local, USD a de referência. Nenhuma conversão é feita.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "currency_code", rename_all = "UPPERCASE")] // Banco
#[serde(rename_all = "UPPERCASE")] // JSON
pub enum Currency {
    #[default]
    Ars, // Vira "ARS"
    Usd, // Vira "USD"
}

// --- Famílias de recurso ---
// As três famílias têm a mesma forma de preço; só mudam as tabelas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub enum ResourceKind {
    #[serde(rename = "materials")]
    Material,
    #[serde(rename = "labor")]
    Labor,
    #[serde(rename = "subcontracts")]
    Subcontract,
}

impl ResourceKind {
    pub(crate) fn table(self) -> &'static str {
        match self {
            ResourceKind::Material => "materials",
            ResourceKind::Labor => "labor",
            ResourceKind::Subcontract => "subcontracts",
        }
    }

    pub(crate) fn sheet_table(self) -> &'static str {
        match self {
            ResourceKind::Material => "material_price_sheets",
            ResourceKind::Labor => "labor_price_sheets",
            ResourceKind::Subcontract => "subcontract_price_sheets",
        }
    }

    pub(crate) fn line_table(self) -> &'static str {
        match self {
            ResourceKind::Material => "material_price_sheet_lines",
            ResourceKind::Labor => "labor_price_sheet_lines",
            ResourceKind::Subcontract => "subcontract_price_sheet_lines",
        }
    }

    /// Coluna da linha da hoja que aponta para o recurso.
    pub(crate) fn line_resource_column(self) -> &'static str {
        match self {
            ResourceKind::Material => "material_id",
            ResourceKind::Labor => "labor_id",
            ResourceKind::Subcontract => "subcontract_id",
        }
    }

    /// Coluna descritiva: materiais têm nome, os outros uma tarefa.
    pub(crate) fn label_column(self) -> &'static str {
        match self {
            ResourceKind::Material => "name",
            ResourceKind::Labor | ResourceKind::Subcontract => "task",
        }
    }

    pub fn has_currency(self) -> bool {
        !matches!(self, ResourceKind::Labor)
    }

    pub fn label(self) -> &'static str {
        match self {
            ResourceKind::Material => "Material",
            ResourceKind::Labor => "Labor",
            ResourceKind::Subcontract => "Subcontract",
        }
    }
}

// --- 1. Material ---
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Material {
    pub id: Uuid,
    pub tenant_id: Uuid,
    #[schema(example = "Cemento Portland 50kg")]
    pub name: String,
    pub supplier_id: Option<Uuid>,
    pub type_id: Uuid,
    pub category_id: Uuid,
    pub sale_unit_id: Uuid,
    pub quantity_per_sale_unit: Decimal,
    pub unit_price_sale_unit: Decimal,
    pub currency: Currency,
    pub created_at: DateTime<Utc>,
}

// --- 2. Mano de obra ---
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Labor {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub category_id: Uuid,
    pub sub_category_id: Uuid,
    #[schema(example = "Colocación de cerámicos")]
    pub task: String,
    pub crew_id: Uuid,
    pub crew_ref_id: Uuid,
    pub sale_unit_id: Uuid,
    pub quantity_per_sale_unit: Decimal,
    pub unit_price_sale_unit: Decimal,
    pub created_at: DateTime<Utc>,
}

// --- 3. Subcontrato ---
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Subcontract {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub category_id: Uuid,
    pub sub_category_id: Uuid,
    #[schema(example = "Instalación eléctrica completa")]
    pub task: String,
    pub supplier_id: Option<Uuid>,
    pub sale_unit_id: Uuid,
    pub quantity_per_sale_unit: Decimal,
    pub unit_price_sale_unit: Decimal,
    pub currency: Currency,
    pub created_at: DateTime<Utc>,
}

// --- Projeção de preço comum às três famílias ---
// Usada na listagem de uma hoja (preço resolvido por recurso).
#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ResourcePrice {
    pub id: Uuid,
    pub label: String,
    pub quantity_per_sale_unit: Decimal,
    pub unit_price_sale_unit: Decimal,
    pub currency: Option<Currency>,
}

/// Recurso acompanhado do preço por unidade de análise (derivado, nunca gravado).
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Priced<T> {
    #[serde(flatten)]
    pub resource: T,
    #[serde(with = "rust_decimal::serde::str")]
    pub analysis_unit_price: Decimal,
}

// --- Dados para criação (vindos dos handlers já validados) ---
#[derive(Debug, Clone)]
pub struct NewMaterial {
    pub name: String,
    pub supplier_id: Option<Uuid>,
    pub type_id: Uuid,
    pub category_id: Uuid,
    pub sale_unit_id: Uuid,
    pub quantity_per_sale_unit: Decimal,
    pub unit_price_sale_unit: Decimal,
    pub currency: Currency,
}

#[derive(Debug, Clone)]
pub struct NewLabor {
    pub category_id: Uuid,
    pub sub_category_id: Uuid,
    pub task: String,
    pub crew_id: Uuid,
    pub crew_ref_id: Uuid,
    pub sale_unit_id: Uuid,
    pub quantity_per_sale_unit: Decimal,
    pub unit_price_sale_unit: Decimal,
}

#[derive(Debug, Clone)]
pub struct NewSubcontract {
    pub category_id: Uuid,
    pub sub_category_id: Uuid,
    pub task: String,
    pub supplier_id: Option<Uuid>,
    pub sale_unit_id: Uuid,
    pub quantity_per_sale_unit: Decimal,
    pub unit_price_sale_unit: Decimal,
    pub currency: Currency,
}

// Edição manual de preço. `currency` é ignorada na mão de obra.
#[derive(Debug, Clone)]
pub struct PriceEdit {
    pub quantity_per_sale_unit: Decimal,
    pub unit_price_sale_unit: Decimal,
    pub currency: Option<Currency>,
}

// --- Resultado da atualização em massa ---
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum BulkUpdateOutcome {
    /// Percentual zero: nada foi gravado.
    NoChange,
    Updated { count: u64 },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn currency_uses_iso_codes_on_the_wire() {
        assert_eq!(serde_json::to_string(&Currency::Usd).unwrap(), "\"USD\"");
        assert_eq!(Currency::default(), Currency::Ars);
    }

    #[test]
    fn resource_kind_path_segments() {
        let kind: ResourceKind = serde_json::from_str("\"subcontracts\"").unwrap();
        assert_eq!(kind, ResourceKind::Subcontract);
        assert_eq!(kind.line_resource_column(), "subcontract_id");
        assert!(!ResourceKind::Labor.has_currency());
    }

    #[test]
    fn bulk_outcome_is_tagged() {
        let json = serde_json::to_value(BulkUpdateOutcome::Updated { count: 3 }).unwrap();
        assert_eq!(json, serde_json::json!({ "status": "updated", "count": 3 }));
        let json = serde_json::to_value(BulkUpdateOutcome::NoChange).unwrap();
        assert_eq!(json, serde_json::json!({ "status": "noChange" }));
    }
}
