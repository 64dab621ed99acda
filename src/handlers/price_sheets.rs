// src/handlers/price_sheets.rs

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
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
    models::{
        price_sheets::{NewPriceSheet, PriceSheet, SheetPriceRow},
        resources::ResourceKind,
    },
};

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreatePriceSheetPayload {
    #[validate(length(min = 1, max = 100, message = "O nome da hoja é obrigatório."))]
    #[schema(example = "Marzo 2025")]
    pub name: String,
    pub origin_id: Option<Uuid>,
    /// Com origem: copia os valores congelados dela em vez dos preços atuais.
    #[serde(default)]
    pub copy_origin_prices: bool,
    /// Ajuste percentual opcional sobre o preço copiado.
    #[schema(example = "5")]
    pub adjustment: Option<String>,
}

#[utoipa::path(
    get,
    path = "/api/price-sheets/{kind}",
    tag = "Price Sheets",
    params(
        ("kind" = ResourceKind, Path, description = "materials, labor ou subcontracts"),
        ("x-tenant-id" = Uuid, Header, description = "ID da Empresa")
    ),
    responses((status = 200, body = [PriceSheet])),
    security(("api_jwt" = []))
)]
pub async fn list_sheets(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    tenant: TenantContext,
    Path(kind): Path<ResourceKind>,
) -> Result<impl IntoResponse, ApiError> {
    let to_api = |e: AppError| e.to_api_error(&locale);

    let mut tx = begin_tenant_tx(&app_state, &tenant, &user).await.map_err(to_api)?;

    let sheets = app_state
        .price_sheet_service
        .list_sheets(&mut *tx, tenant.tenant_id(), kind)
        .await
        .map_err(to_api)?;

    tx.commit().await.map_err(|e| to_api(AppError::from(e)))?;
    Ok(Json(sheets))
}

#[utoipa::path(
    post,
    path = "/api/price-sheets/{kind}",
    tag = "Price Sheets",
    request_body = CreatePriceSheetPayload,
    params(
        ("kind" = ResourceKind, Path, description = "materials, labor ou subcontracts"),
        ("x-tenant-id" = Uuid, Header, description = "ID da Empresa")
    ),
    responses(
        (status = 201, description = "Hoja criada com as linhas congeladas", body = PriceSheet),
        (status = 409, description = "Nome já usado nesta empresa")
    ),
    security(("api_jwt" = []))
)]
pub async fn create_sheet(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    tenant: TenantContext,
    Path(kind): Path<ResourceKind>,
    Json(payload): Json<CreatePriceSheetPayload>,
) -> Result<impl IntoResponse, ApiError> {
    let to_api = |e: AppError| e.to_api_error(&locale);

    payload.validate().map_err(|e| to_api(AppError::ValidationError(e)))?;

    let input = NewPriceSheet {
        name: payload.name,
        origin_id: payload.origin_id,
        copy_origin_prices: payload.copy_origin_prices,
        adjustment: payload.adjustment,
    };

    let mut tx = begin_tenant_tx(&app_state, &tenant, &user).await.map_err(to_api)?;

    let sheet = app_state
        .price_sheet_service
        .create_sheet(&mut *tx, tenant.tenant_id(), kind, input)
        .await
        .map_err(to_api)?;

    tx.commit().await.map_err(|e| to_api(AppError::from(e)))?;
    Ok((StatusCode::CREATED, Json(sheet)))
}

#[utoipa::path(
    get,
    path = "/api/price-sheets/{kind}/{id}",
    tag = "Price Sheets",
    params(
        ("kind" = ResourceKind, Path, description = "materials, labor ou subcontracts"),
        ("id" = Uuid, Path, description = "ID da hoja"),
        ("x-tenant-id" = Uuid, Header, description = "ID da Empresa")
    ),
    responses((status = 200, description = "Hoja, nome da origem e linhas congeladas", body = PriceSheet)),
    security(("api_jwt" = []))
)]
pub async fn get_sheet(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    tenant: TenantContext,
    Path((kind, id)): Path<(ResourceKind, Uuid)>,
) -> Result<impl IntoResponse, ApiError> {
    let to_api = |e: AppError| e.to_api_error(&locale);

    let mut tx = begin_tenant_tx(&app_state, &tenant, &user).await.map_err(to_api)?;

    let detail = app_state
        .price_sheet_service
        .get_sheet(&mut *tx, tenant.tenant_id(), kind, id)
        .await
        .map_err(to_api)?;

    tx.commit().await.map_err(|e| to_api(AppError::from(e)))?;
    Ok(Json(detail))
}

#[utoipa::path(
    delete,
    path = "/api/price-sheets/{kind}/{id}",
    tag = "Price Sheets",
    params(
        ("kind" = ResourceKind, Path, description = "materials, labor ou subcontracts"),
        ("id" = Uuid, Path, description = "ID da hoja"),
        ("x-tenant-id" = Uuid, Header, description = "ID da Empresa")
    ),
    responses((status = 204, description = "Hoja, linhas e mezclas ligadas removidas")),
    security(("api_jwt" = []))
)]
pub async fn delete_sheet(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    tenant: TenantContext,
    Path((kind, id)): Path<(ResourceKind, Uuid)>,
) -> Result<impl IntoResponse, ApiError> {
    let to_api = |e: AppError| e.to_api_error(&locale);

    let mut tx = begin_tenant_tx(&app_state, &tenant, &user).await.map_err(to_api)?;

    app_state
        .price_sheet_service
        .delete_sheet(&mut *tx, tenant.tenant_id(), kind, id)
        .await
        .map_err(to_api)?;

    tx.commit().await.map_err(|e| to_api(AppError::from(e)))?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    get,
    path = "/api/price-sheets/{kind}/{id}/prices",
    tag = "Price Sheets",
    params(
        ("kind" = ResourceKind, Path, description = "materials, labor ou subcontracts"),
        ("id" = Uuid, Path, description = "ID da hoja"),
        ("x-tenant-id" = Uuid, Header, description = "ID da Empresa")
    ),
    responses((status = 200, description = "Todos os recursos com o preço na hoja; captured=false é lacuna", body = [SheetPriceRow])),
    security(("api_jwt" = []))
)]
pub async fn sheet_prices(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    tenant: TenantContext,
    Path((kind, id)): Path<(ResourceKind, Uuid)>,
) -> Result<impl IntoResponse, ApiError> {
    let to_api = |e: AppError| e.to_api_error(&locale);

    let mut tx = begin_tenant_tx(&app_state, &tenant, &user).await.map_err(to_api)?;

    let rows = app_state
        .price_sheet_service
        .sheet_prices(&mut *tx, tenant.tenant_id(), kind, id)
        .await
        .map_err(to_api)?;

    tx.commit().await.map_err(|e| to_api(AppError::from(e)))?;
    Ok(Json(rows))
}
