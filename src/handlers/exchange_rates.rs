// src/handlers/exchange_rates.rs

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::{
    common::{
        db_utils::begin_tenant_tx,
        error::{ApiError, AppError},
    },
    config::AppState,
    middleware::{auth::AuthenticatedUser, i18n::Locale, tenancy::TenantContext},
    models::exchange_rates::{ExchangeRateQuote, ExchangeRateType, RateTable},
};

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateRateTypePayload {
    #[validate(length(min = 1, max = 60, message = "O nome do tipo é obrigatório."))]
    #[schema(example = "Oficial")]
    pub name: String,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct QuoteValuePayload {
    pub rate_type_id: Uuid,
    /// Texto como digitado ("1045,50"). Vazio = sem cotação para o tipo.
    #[schema(example = "1045,50")]
    pub value: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct SaveQuotesPayload {
    #[schema(example = "2025-03-14")]
    pub date: String,
    pub values: Vec<QuoteValuePayload>,
}

#[utoipa::path(
    get,
    path = "/api/exchange-rates/types",
    tag = "Exchange Rates",
    params(("x-tenant-id" = Uuid, Header, description = "ID da Empresa")),
    responses((status = 200, body = [ExchangeRateType])),
    security(("api_jwt" = []))
)]
pub async fn list_types(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    tenant: TenantContext,
) -> Result<impl IntoResponse, ApiError> {
    let to_api = |e: AppError| e.to_api_error(&locale);

    let mut tx = begin_tenant_tx(&app_state, &tenant, &user).await.map_err(to_api)?;

    let types = app_state
        .exchange_rate_service
        .list_types(&mut *tx, tenant.tenant_id())
        .await
        .map_err(to_api)?;

    tx.commit().await.map_err(|e| to_api(AppError::from(e)))?;
    Ok(Json(types))
}

#[utoipa::path(
    post,
    path = "/api/exchange-rates/types",
    tag = "Exchange Rates",
    request_body = CreateRateTypePayload,
    params(("x-tenant-id" = Uuid, Header, description = "ID da Empresa")),
    responses(
        (status = 201, body = ExchangeRateType),
        (status = 409, description = "Tipo já cadastrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn create_type(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    tenant: TenantContext,
    Json(payload): Json<CreateRateTypePayload>,
) -> Result<impl IntoResponse, ApiError> {
    let to_api = |e: AppError| e.to_api_error(&locale);

    payload.validate().map_err(|e| to_api(AppError::ValidationError(e)))?;

    let mut tx = begin_tenant_tx(&app_state, &tenant, &user).await.map_err(to_api)?;

    let rate_type = app_state
        .exchange_rate_service
        .create_type(&mut *tx, tenant.tenant_id(), &payload.name)
        .await
        .map_err(to_api)?;

    tx.commit().await.map_err(|e| to_api(AppError::from(e)))?;
    Ok((StatusCode::CREATED, Json(rate_type)))
}

/// Tabela das últimas datas cotadas, uma coluna por tipo.
#[utoipa::path(
    get,
    path = "/api/exchange-rates/quotes",
    tag = "Exchange Rates",
    params(("x-tenant-id" = Uuid, Header, description = "ID da Empresa")),
    responses((status = 200, body = RateTable)),
    security(("api_jwt" = []))
)]
pub async fn rate_table(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    tenant: TenantContext,
) -> Result<impl IntoResponse, ApiError> {
    let to_api = |e: AppError| e.to_api_error(&locale);

    let mut tx = begin_tenant_tx(&app_state, &tenant, &user).await.map_err(to_api)?;

    let table = app_state
        .exchange_rate_service
        .rate_table(&mut *tx, tenant.tenant_id())
        .await
        .map_err(to_api)?;

    tx.commit().await.map_err(|e| to_api(AppError::from(e)))?;
    Ok(Json(table))
}

#[utoipa::path(
    post,
    path = "/api/exchange-rates/quotes",
    tag = "Exchange Rates",
    request_body = SaveQuotesPayload,
    params(("x-tenant-id" = Uuid, Header, description = "ID da Empresa")),
    responses(
        (status = 200, description = "Cotações gravadas (substitui as da mesma data)", body = [ExchangeRateQuote]),
        (status = 400, description = "Data ou valor inválido; nada é gravado")
    ),
    security(("api_jwt" = []))
)]
pub async fn save_quotes(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    tenant: TenantContext,
    Json(payload): Json<SaveQuotesPayload>,
) -> Result<impl IntoResponse, ApiError> {
    let to_api = |e: AppError| e.to_api_error(&locale);

    let values: Vec<(Uuid, String)> = payload
        .values
        .into_iter()
        .map(|v| (v.rate_type_id, v.value))
        .collect();

    let mut tx = begin_tenant_tx(&app_state, &tenant, &user).await.map_err(to_api)?;

    let saved = app_state
        .exchange_rate_service
        .save_quotes(&mut *tx, tenant.tenant_id(), &payload.date, &values)
        .await
        .map_err(to_api)?;

    tx.commit().await.map_err(|e| to_api(AppError::from(e)))?;
    Ok(Json(saved))
}
