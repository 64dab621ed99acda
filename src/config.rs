// src/config.rs

use crate::{
    db::{
        CatalogRepository, ExchangeRateRepository, MixtureRepository, PriceSheetRepository,
        ResourceRepository, TenantRepository,
    },
    services::{
        catalog_service::CatalogService, exchange_rate_service::ExchangeRateService,
        mixture_service::MixtureService, price_sheet_service::PriceSheetService,
        resource_service::ResourceService, tenancy_service::TenantService,
    },
};
use anyhow::Context;
use sqlx::{postgres::PgPoolOptions, PgPool};
use std::{env, time::Duration};

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:3000";
const DEFAULT_MAX_CONNECTIONS: u32 = 5;
const DEFAULT_ACQUIRE_TIMEOUT_SECS: u64 = 3;

/// Variáveis de ambiente (ou `.env`) lidas na inicialização.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    pub bind_addr: String,
    pub db_max_connections: u32,
    pub db_acquire_timeout: Duration,
}

fn parse_or<T: std::str::FromStr>(key: &str, raw: Option<String>, default: T) -> anyhow::Result<T> {
    match raw {
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| anyhow::anyhow!("{} inválido: '{}'", key, value)),
        None => Ok(default),
    }
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let database_url = env::var("DATABASE_URL").context("DATABASE_URL deve ser definida")?;
        let jwt_secret = env::var("JWT_SECRET").context("JWT_SECRET deve ser definido")?;
        let bind_addr = env::var("BIND_ADDR").unwrap_or_else(|_| DEFAULT_BIND_ADDR.to_string());

        let db_max_connections = parse_or(
            "DB_MAX_CONNECTIONS",
            env::var("DB_MAX_CONNECTIONS").ok(),
            DEFAULT_MAX_CONNECTIONS,
        )?;
        let acquire_secs = parse_or(
            "DB_ACQUIRE_TIMEOUT_SECS",
            env::var("DB_ACQUIRE_TIMEOUT_SECS").ok(),
            DEFAULT_ACQUIRE_TIMEOUT_SECS,
        )?;

        Ok(Self {
            database_url,
            jwt_secret,
            bind_addr,
            db_max_connections,
            db_acquire_timeout: Duration::from_secs(acquire_secs),
        })
    }
}

#[derive(Clone)]
pub struct AppState {
    pub db_pool: PgPool,
    pub jwt_secret: String,

    pub tenant_service: TenantService,
    pub catalog_service: CatalogService,
    pub resource_service: ResourceService,
    pub price_sheet_service: PriceSheetService,
    pub mixture_service: MixtureService,
    pub exchange_rate_service: ExchangeRateService,
}

impl AppState {
    pub async fn new(config: &Config) -> anyhow::Result<Self> {
        // Conecta ao banco de dados, usando '?' para propagar erros
        let db_pool = PgPoolOptions::new()
            .max_connections(config.db_max_connections)
            .acquire_timeout(config.db_acquire_timeout)
            .connect(&config.database_url)
            .await
            .context("Falha ao conectar ao banco de dados")?;

        tracing::info!("✅ Conexão com o banco de dados estabelecida com sucesso!");

        Ok(Self::from_pool(db_pool, config.jwt_secret.clone()))
    }

    /// Monta o gráfico de dependências sobre um pool já aberto.
    pub fn from_pool(db_pool: PgPool, jwt_secret: String) -> Self {
        let resource_repo = ResourceRepository::new();
        let price_sheet_service =
            PriceSheetService::new(PriceSheetRepository::new(), resource_repo.clone());

        Self {
            tenant_service: TenantService::new(TenantRepository::new(db_pool.clone())),
            catalog_service: CatalogService::new(CatalogRepository::new()),
            resource_service: ResourceService::new(resource_repo.clone()),
            mixture_service: MixtureService::new(
                MixtureRepository::new(),
                resource_repo,
                price_sheet_service.clone(),
            ),
            price_sheet_service,
            exchange_rate_service: ExchangeRateService::new(ExchangeRateRepository::new()),
            jwt_secret,
            db_pool,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numeric_settings_fall_back_to_defaults() {
        assert_eq!(parse_or("X", None, 5u32).unwrap(), 5);
        assert_eq!(parse_or("X", Some(" 12 ".into()), 5u32).unwrap(), 12);
        assert!(parse_or("X", Some("muitas".into()), 5u32).is_err());
    }
}
