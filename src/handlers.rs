pub mod catalog;
pub mod exchange_rates;
pub mod mixtures;
pub mod price_sheets;
pub mod resources;
pub mod tenancy;
