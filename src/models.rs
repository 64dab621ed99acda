pub mod tenancy;
pub mod catalog;
pub mod resources;
pub mod price_sheets;
pub mod mixtures;
pub mod exchange_rates;
