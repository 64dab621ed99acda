//src/main.rs

use axum::{
    middleware as axum_middleware,
    routing::{delete, get, post, put},
    Router,
};
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

mod common;
mod config;
mod db;
mod docs;
mod handlers;
mod middleware;
mod models;
mod services;

use crate::config::{AppState, Config};
use crate::docs::ApiDoc;
use crate::middleware::{auth::auth_guard, tenancy::tenant_guard};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .compact()
        .init();

    // Sem configuração válida a aplicação não sobe.
    let config = Config::from_env()?;
    let app_state = AppState::new(&config).await?;

    sqlx::migrate!().run(&app_state.db_pool).await?;
    tracing::info!("✅ Migrações do banco de dados executadas com sucesso!");

    let app = router(app_state);

    let listener = TcpListener::bind(&config.bind_addr).await?;
    tracing::info!("🚀 Servidor escutando em {}", listener.local_addr()?);
    axum::serve(listener, app).await?;

    Ok(())
}

fn router(app_state: AppState) -> Router {
    // Rotas só com token (ainda sem empresa escolhida)
    let user_routes = Router::new()
        .route("/me/companies", get(handlers::tenancy::list_my_companies))
        .layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            auth_guard,
        ));

    let catalog_routes = Router::new()
        .route("/catalog/summary", get(handlers::catalog::get_summary))
        .route(
            "/catalog/{kind}",
            get(handlers::catalog::list_entries).post(handlers::catalog::create_entry),
        )
        .route(
            "/catalog/{kind}/{id}",
            put(handlers::catalog::rename_entry).delete(handlers::catalog::delete_entry),
        )
        .route(
            "/suppliers",
            get(handlers::catalog::list_suppliers).post(handlers::catalog::create_supplier),
        )
        .route("/suppliers/{id}", delete(handlers::catalog::delete_supplier))
        .layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            tenant_guard,
        ));

    let resource_routes = Router::new()
        .route(
            "/materials",
            get(handlers::resources::list_materials).post(handlers::resources::create_material),
        )
        .route(
            "/labor",
            get(handlers::resources::list_labor).post(handlers::resources::create_labor),
        )
        .route(
            "/subcontracts",
            get(handlers::resources::list_subcontracts)
                .post(handlers::resources::create_subcontract),
        )
        .route(
            "/resources/{kind}/bulk-price",
            post(handlers::resources::bulk_update_prices),
        )
        .route(
            "/resources/{kind}/{id}",
            delete(handlers::resources::delete_resource),
        )
        .route(
            "/resources/{kind}/{id}/price",
            put(handlers::resources::update_price),
        )
        .route(
            "/resources/{kind}/{id}/resolved-price",
            get(handlers::resources::resolved_price),
        )
        .layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            tenant_guard,
        ));

    let price_sheet_routes = Router::new()
        .route(
            "/{kind}",
            get(handlers::price_sheets::list_sheets).post(handlers::price_sheets::create_sheet),
        )
        .route(
            "/{kind}/{id}",
            get(handlers::price_sheets::get_sheet).delete(handlers::price_sheets::delete_sheet),
        )
        .route("/{kind}/{id}/prices", get(handlers::price_sheets::sheet_prices))
        .layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            tenant_guard,
        ));

    let mixture_routes = Router::new()
        .route(
            "/",
            get(handlers::mixtures::list_mixtures).post(handlers::mixtures::create_mixture),
        )
        .route(
            "/{id}",
            get(handlers::mixtures::get_mixture).delete(handlers::mixtures::delete_mixture),
        )
        .route("/{id}/lines", post(handlers::mixtures::add_line))
        .route(
            "/{id}/lines/{material_id}",
            put(handlers::mixtures::update_line).delete(handlers::mixtures::remove_line),
        )
        .route("/{id}/cost", get(handlers::mixtures::mixture_cost))
        .layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            tenant_guard,
        ));

    let exchange_rate_routes = Router::new()
        .route(
            "/types",
            get(handlers::exchange_rates::list_types).post(handlers::exchange_rates::create_type),
        )
        .route(
            "/quotes",
            get(handlers::exchange_rates::rate_table).post(handlers::exchange_rates::save_quotes),
        )
        .layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            tenant_guard,
        ));

    let api_routes = Router::new()
        .route("/health", get(|| async { "OK" }))
        .merge(user_routes)
        .merge(catalog_routes)
        .merge(resource_routes)
        .nest("/price-sheets", price_sheet_routes)
        .nest("/mixtures", mixture_routes)
        .nest("/exchange-rates", exchange_rate_routes);

    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .nest("/api", api_routes)
        .with_state(app_state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::Body,
        http::{Request, StatusCode},
    };
    use sqlx::postgres::PgPoolOptions;
    use tower::ServiceExt;

    // Pool preguiçoso: nenhuma das rotas abaixo chega a abrir conexão.
    fn app() -> Router {
        let pool = PgPoolOptions::new()
            .connect_lazy("postgres://localhost/presupuesto")
            .unwrap();
        router(AppState::from_pool(pool, "segredo-de-teste".into()))
    }

    #[tokio::test]
    async fn health_answers_without_credentials() {
        let response = app()
            .oneshot(Request::get("/api/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn tenant_routes_require_a_token() {
        let uri = format!("/api/mixtures/{}/cost", uuid::Uuid::new_v4());
        let response = app()
            .oneshot(Request::get(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn every_read_route_is_mounted_behind_the_guard() {
        let id = uuid::Uuid::new_v4();
        for uri in [
            format!("/api/price-sheets/materials/{id}"),
            format!("/api/price-sheets/materials/{id}/prices"),
            format!("/api/resources/materials/{id}/resolved-price"),
            format!("/api/mixtures/{id}"),
            "/api/exchange-rates/quotes".to_string(),
        ] {
            let response = app()
                .oneshot(Request::get(&uri).body(Body::empty()).unwrap())
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::UNAUTHORIZED, "{uri}");
        }
    }
}
