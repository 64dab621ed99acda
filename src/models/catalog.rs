// src/models/catalog.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

// ---
// 1. Tipos de catálogo
// ---
// Catálogos planos (unidades, rubros, tipos, equipos) e catálogos com pai
// (subrubro -> rubro, categoria -> tipo, ref. equipo -> equipo).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "kebab-case")]
pub enum CatalogKind {
    Units,
    Categories,
    SubCategories,
    MaterialTypes,
    MaterialCategories,
    Crews,
    CrewRefs,
}

impl CatalogKind {
    pub(crate) fn table(self) -> &'static str {
        match self {
            CatalogKind::Units => "units",
            CatalogKind::Categories => "categories",
            CatalogKind::SubCategories => "sub_categories",
            CatalogKind::MaterialTypes => "material_types",
            CatalogKind::MaterialCategories => "material_categories",
            CatalogKind::Crews => "crews",
            CatalogKind::CrewRefs => "crew_refs",
        }
    }

    pub fn requires_parent(self) -> bool {
        matches!(
            self,
            CatalogKind::SubCategories | CatalogKind::MaterialCategories | CatalogKind::CrewRefs
        )
    }

    /// Nome usado nas mensagens de erro.
    pub fn label(self) -> &'static str {
        match self {
            CatalogKind::Units => "unit",
            CatalogKind::Categories => "category",
            CatalogKind::SubCategories => "sub-category",
            CatalogKind::MaterialTypes => "material type",
            CatalogKind::MaterialCategories => "material category",
            CatalogKind::Crews => "crew",
            CatalogKind::CrewRefs => "crew reference",
        }
    }
}

// ---
// 2. Entrada de catálogo
// ---
// `parent_id` só vem preenchido nos catálogos com pai.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CatalogEntry {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub parent_id: Option<Uuid>,
    #[schema(example = "m3")]
    pub name: String,
    pub created_at: DateTime<Utc>,
}

// ---
// 3. Proveedor
// ---
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Supplier {
    pub id: Uuid,
    pub tenant_id: Uuid,
    #[schema(example = "Corralón San Martín")]
    pub name: String,
    pub address: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub created_at: DateTime<Utc>,
}

// Totais do índice de catálogos da empresa.
#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CatalogSummary {
    pub units: i64,
    pub categories: i64,
    pub sub_categories: i64,
    pub material_types: i64,
    pub material_categories: i64,
    pub crews: i64,
    pub crew_refs: i64,
    pub suppliers: i64,
    pub materials: i64,
    pub labor: i64,
    pub subcontracts: i64,
    pub mixtures: i64,
    pub exchange_rate_types: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn path_segments_map_to_kinds() {
        let kind: CatalogKind = serde_json::from_str("\"sub-categories\"").unwrap();
        assert_eq!(kind, CatalogKind::SubCategories);
        assert!(kind.requires_parent());
        assert_eq!(kind.table(), "sub_categories");

        let kind: CatalogKind = serde_json::from_str("\"units\"").unwrap();
        assert!(!kind.requires_parent());
    }
}
