pub mod tenancy_repo;
pub use tenancy_repo::TenantRepository;
pub mod catalog_repo;
pub use catalog_repo::CatalogRepository;
pub mod resource_repo;
pub use resource_repo::ResourceRepository;
pub mod price_sheet_repo;
pub use price_sheet_repo::PriceSheetRepository;
pub mod mixture_repo;
pub use mixture_repo::MixtureRepository;
pub mod exchange_rate_repo;
pub use exchange_rate_repo::ExchangeRateRepository;

#[cfg(test)]
pub(crate) mod test_support;
