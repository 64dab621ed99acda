// src/docs.rs

use utoipa::OpenApi;
use utoipa::openapi::security::{Http, HttpAuthScheme, SecurityScheme};
use crate::handlers;
use crate::models;

#[derive(OpenApi)]
#[openapi(
    paths(
        // --- Tenancy ---
        handlers::tenancy::list_my_companies,

        // --- Catalog ---
        handlers::catalog::list_entries,
        handlers::catalog::create_entry,
        handlers::catalog::rename_entry,
        handlers::catalog::delete_entry,
        handlers::catalog::get_summary,
        handlers::catalog::list_suppliers,
        handlers::catalog::create_supplier,
        handlers::catalog::delete_supplier,

        // --- Resources ---
        handlers::resources::list_materials,
        handlers::resources::create_material,
        handlers::resources::list_labor,
        handlers::resources::create_labor,
        handlers::resources::list_subcontracts,
        handlers::resources::create_subcontract,
        handlers::resources::delete_resource,
        handlers::resources::update_price,
        handlers::resources::resolved_price,
        handlers::resources::bulk_update_prices,

        // --- Price Sheets ---
        handlers::price_sheets::list_sheets,
        handlers::price_sheets::create_sheet,
        handlers::price_sheets::get_sheet,
        handlers::price_sheets::delete_sheet,
        handlers::price_sheets::sheet_prices,

        // --- Mixtures ---
        handlers::mixtures::list_mixtures,
        handlers::mixtures::create_mixture,
        handlers::mixtures::get_mixture,
        handlers::mixtures::delete_mixture,
        handlers::mixtures::add_line,
        handlers::mixtures::update_line,
        handlers::mixtures::remove_line,
        handlers::mixtures::mixture_cost,

        // --- Exchange Rates ---
        handlers::exchange_rates::list_types,
        handlers::exchange_rates::create_type,
        handlers::exchange_rates::rate_table,
        handlers::exchange_rates::save_quotes,
    ),
    components(
        schemas(
            // --- Tenancy ---
            models::tenancy::Company,

            // --- Catalog ---
            models::catalog::CatalogKind,
            models::catalog::CatalogEntry,
            models::catalog::Supplier,
            models::catalog::CatalogSummary,
            handlers::catalog::CreateCatalogEntryPayload,
            handlers::catalog::RenameCatalogEntryPayload,
            handlers::catalog::CreateSupplierPayload,

            // --- Resources ---
            models::resources::Currency,
            models::resources::ResourceKind,
            models::resources::Material,
            models::resources::Labor,
            models::resources::Subcontract,
            models::resources::ResourcePrice,
            models::resources::BulkUpdateOutcome,
            handlers::resources::CreateMaterialPayload,
            handlers::resources::CreateLaborPayload,
            handlers::resources::CreateSubcontractPayload,
            handlers::resources::UpdatePricePayload,
            handlers::resources::BulkPricePayload,
            handlers::resources::ResolvedPriceResponse,

            // --- Price Sheets ---
            models::price_sheets::PriceSheet,
            models::price_sheets::SheetLine,
            models::price_sheets::SheetPriceRow,
            handlers::price_sheets::CreatePriceSheetPayload,

            // --- Mixtures ---
            models::mixtures::Mixture,
            models::mixtures::MixtureLine,
            models::mixtures::MixtureDetail,
            models::mixtures::MixtureLineCost,
            models::mixtures::MixtureCost,
            handlers::mixtures::CreateMixturePayload,
            handlers::mixtures::AddMixtureLinePayload,
            handlers::mixtures::UpdateMixtureLinePayload,

            // --- Exchange Rates ---
            models::exchange_rates::ExchangeRateType,
            models::exchange_rates::ExchangeRateQuote,
            models::exchange_rates::RateTableRow,
            models::exchange_rates::RateTable,
            handlers::exchange_rates::CreateRateTypePayload,
            handlers::exchange_rates::QuoteValuePayload,
            handlers::exchange_rates::SaveQuotesPayload,
        )
    ),
    tags(
        (name = "Tenancy", description = "Empresas do usuário"),
        (name = "Catalog", description = "Catálogos auxiliares e proveedores"),
        (name = "Resources", description = "Materiais, mão de obra e subcontratos com seus preços"),
        (name = "Price Sheets", description = "Hojas de precios (fotos congeladas dos preços)"),
        (name = "Mixtures", description = "Mezclas e custo por unidade"),
        (name = "Exchange Rates", description = "Tipos de dólar e cotações diárias")
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "api_jwt",
            SecurityScheme::Http(
                Http::new(HttpAuthScheme::Bearer)
            ),
        );
    }
}
