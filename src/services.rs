pub mod pricing;
pub mod tenancy_service;
pub mod catalog_service;
pub mod resource_service;
pub mod price_sheet_service;
pub mod mixture_service;
pub mod exchange_rate_service;
