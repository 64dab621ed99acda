// src/handlers/catalog.rs

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

use crate::{
    common::{
        db_utils::begin_tenant_tx,
        error::{ApiError, AppError},
    },
    config::AppState,
    middleware::{auth::AuthenticatedUser, i18n::Locale, tenancy::TenantContext},
    models::catalog::{CatalogEntry, CatalogKind, CatalogSummary, Supplier},
};

// ---
// Payloads
// ---
#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateCatalogEntryPayload {
    #[validate(length(min = 1, max = 100, message = "O nome é obrigatório."))]
    pub name: String,
    /// Obrigatório em sub-categories, material-categories e crew-refs.
    pub parent_id: Option<Uuid>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct RenameCatalogEntryPayload {
    #[validate(length(min = 1, max = 100, message = "O nome é obrigatório."))]
    pub name: String,
}

#[derive(Debug, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
pub struct ParentFilter {
    /// Filtra os catálogos aninhados pelo pai.
    pub parent_id: Option<Uuid>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateSupplierPayload {
    #[validate(length(min = 1, max = 150, message = "O nome é obrigatório."))]
    pub name: String,
    pub address: Option<String>,
    pub phone: Option<String>,
    #[validate(email(message = "E-mail inválido."))]
    pub email: Option<String>,
}

// ---
// Catálogos
// ---
#[utoipa::path(
    get,
    path = "/api/catalog/{kind}",
    tag = "Catalog",
    params(
        ("kind" = CatalogKind, Path, description = "Tipo de catálogo"),
        ParentFilter,
        ("x-tenant-id" = Uuid, Header, description = "ID da Empresa")
    ),
    responses((status = 200, body = [CatalogEntry])),
    security(("api_jwt" = []))
)]
pub async fn list_entries(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    tenant: TenantContext,
    Path(kind): Path<CatalogKind>,
    Query(filter): Query<ParentFilter>,
) -> Result<impl IntoResponse, ApiError> {
    let to_api = |e: AppError| e.to_api_error(&locale);

    let mut tx = begin_tenant_tx(&app_state, &tenant, &user).await.map_err(to_api)?;

    let entries = app_state
        .catalog_service
        .list_entries(&mut *tx, tenant.tenant_id(), kind, filter.parent_id)
        .await
        .map_err(to_api)?;

    tx.commit().await.map_err(|e| to_api(AppError::from(e)))?;
    Ok(Json(entries))
}

#[utoipa::path(
    post,
    path = "/api/catalog/{kind}",
    tag = "Catalog",
    request_body = CreateCatalogEntryPayload,
    params(
        ("kind" = CatalogKind, Path, description = "Tipo de catálogo"),
        ("x-tenant-id" = Uuid, Header, description = "ID da Empresa")
    ),
    responses(
        (status = 201, description = "Entrada criada", body = CatalogEntry),
        (status = 409, description = "Nome já usado")
    ),
    security(("api_jwt" = []))
)]
pub async fn create_entry(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    tenant: TenantContext,
    Path(kind): Path<CatalogKind>,
    Json(payload): Json<CreateCatalogEntryPayload>,
) -> Result<impl IntoResponse, ApiError> {
    let to_api = |e: AppError| e.to_api_error(&locale);

    payload.validate().map_err(|e| to_api(AppError::ValidationError(e)))?;

    let mut tx = begin_tenant_tx(&app_state, &tenant, &user).await.map_err(to_api)?;

    let entry = app_state
        .catalog_service
        .create_entry(&mut *tx, tenant.tenant_id(), kind, &payload.name, payload.parent_id)
        .await
        .map_err(to_api)?;

    tx.commit().await.map_err(|e| to_api(AppError::from(e)))?;
    Ok((StatusCode::CREATED, Json(entry)))
}

#[utoipa::path(
    put,
    path = "/api/catalog/{kind}/{id}",
    tag = "Catalog",
    request_body = RenameCatalogEntryPayload,
    params(
        ("kind" = CatalogKind, Path, description = "Tipo de catálogo"),
        ("id" = Uuid, Path, description = "ID da entrada"),
        ("x-tenant-id" = Uuid, Header, description = "ID da Empresa")
    ),
    responses((status = 200, body = CatalogEntry)),
    security(("api_jwt" = []))
)]
pub async fn rename_entry(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    tenant: TenantContext,
    Path((kind, id)): Path<(CatalogKind, Uuid)>,
    Json(payload): Json<RenameCatalogEntryPayload>,
) -> Result<impl IntoResponse, ApiError> {
    let to_api = |e: AppError| e.to_api_error(&locale);

    payload.validate().map_err(|e| to_api(AppError::ValidationError(e)))?;

    let mut tx = begin_tenant_tx(&app_state, &tenant, &user).await.map_err(to_api)?;

    let entry = app_state
        .catalog_service
        .rename_entry(&mut *tx, tenant.tenant_id(), kind, id, &payload.name)
        .await
        .map_err(to_api)?;

    tx.commit().await.map_err(|e| to_api(AppError::from(e)))?;
    Ok(Json(entry))
}

#[utoipa::path(
    delete,
    path = "/api/catalog/{kind}/{id}",
    tag = "Catalog",
    params(
        ("kind" = CatalogKind, Path, description = "Tipo de catálogo"),
        ("id" = Uuid, Path, description = "ID da entrada"),
        ("x-tenant-id" = Uuid, Header, description = "ID da Empresa")
    ),
    responses(
        (status = 204, description = "Removida"),
        (status = 409, description = "Em uso por algum recurso")
    ),
    security(("api_jwt" = []))
)]
pub async fn delete_entry(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    tenant: TenantContext,
    Path((kind, id)): Path<(CatalogKind, Uuid)>,
) -> Result<impl IntoResponse, ApiError> {
    let to_api = |e: AppError| e.to_api_error(&locale);

    let mut tx = begin_tenant_tx(&app_state, &tenant, &user).await.map_err(to_api)?;

    app_state
        .catalog_service
        .delete_entry(&mut *tx, tenant.tenant_id(), kind, id)
        .await
        .map_err(to_api)?;

    tx.commit().await.map_err(|e| to_api(AppError::from(e)))?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    get,
    path = "/api/catalog/summary",
    tag = "Catalog",
    params(("x-tenant-id" = Uuid, Header, description = "ID da Empresa")),
    responses((status = 200, body = CatalogSummary)),
    security(("api_jwt" = []))
)]
pub async fn get_summary(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    tenant: TenantContext,
) -> Result<impl IntoResponse, ApiError> {
    let to_api = |e: AppError| e.to_api_error(&locale);

    let mut tx = begin_tenant_tx(&app_state, &tenant, &user).await.map_err(to_api)?;

    let summary = app_state
        .catalog_service
        .summary(&mut *tx, tenant.tenant_id())
        .await
        .map_err(to_api)?;

    tx.commit().await.map_err(|e| to_api(AppError::from(e)))?;
    Ok(Json(summary))
}

// ---
// Proveedores
// ---
#[utoipa::path(
    get,
    path = "/api/suppliers",
    tag = "Catalog",
    params(("x-tenant-id" = Uuid, Header, description = "ID da Empresa")),
    responses((status = 200, body = [Supplier])),
    security(("api_jwt" = []))
)]
pub async fn list_suppliers(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    tenant: TenantContext,
) -> Result<impl IntoResponse, ApiError> {
    let to_api = |e: AppError| e.to_api_error(&locale);

    let mut tx = begin_tenant_tx(&app_state, &tenant, &user).await.map_err(to_api)?;

    let suppliers = app_state
        .catalog_service
        .list_suppliers(&mut *tx, tenant.tenant_id())
        .await
        .map_err(to_api)?;

    tx.commit().await.map_err(|e| to_api(AppError::from(e)))?;
    Ok(Json(suppliers))
}

#[utoipa::path(
    post,
    path = "/api/suppliers",
    tag = "Catalog",
    request_body = CreateSupplierPayload,
    params(("x-tenant-id" = Uuid, Header, description = "ID da Empresa")),
    responses((status = 201, description = "Proveedor criado", body = Supplier)),
    security(("api_jwt" = []))
)]
pub async fn create_supplier(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    tenant: TenantContext,
    Json(payload): Json<CreateSupplierPayload>,
) -> Result<impl IntoResponse, ApiError> {
    let to_api = |e: AppError| e.to_api_error(&locale);

    payload.validate().map_err(|e| to_api(AppError::ValidationError(e)))?;

    let mut tx = begin_tenant_tx(&app_state, &tenant, &user).await.map_err(to_api)?;

    let supplier = app_state
        .catalog_service
        .create_supplier(
            &mut *tx,
            tenant.tenant_id(),
            &payload.name,
            payload.address.as_deref(),
            payload.phone.as_deref(),
            payload.email.as_deref(),
        )
        .await
        .map_err(to_api)?;

    tx.commit().await.map_err(|e| to_api(AppError::from(e)))?;
    Ok((StatusCode::CREATED, Json(supplier)))
}

#[utoipa::path(
    delete,
    path = "/api/suppliers/{id}",
    tag = "Catalog",
    params(
        ("id" = Uuid, Path, description = "ID do proveedor"),
        ("x-tenant-id" = Uuid, Header, description = "ID da Empresa")
    ),
    responses((status = 204, description = "Removido; recursos ficam sem proveedor")),
    security(("api_jwt" = []))
)]
pub async fn delete_supplier(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    tenant: TenantContext,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let to_api = |e: AppError| e.to_api_error(&locale);

    let mut tx = begin_tenant_tx(&app_state, &tenant, &user).await.map_err(to_api)?;

    app_state
        .catalog_service
        .delete_supplier(&mut *tx, tenant.tenant_id(), id)
        .await
        .map_err(to_api)?;

    tx.commit().await.map_err(|e| to_api(AppError::from(e)))?;
    Ok(StatusCode::NO_CONTENT)
}
