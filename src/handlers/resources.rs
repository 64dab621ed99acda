// src/handlers/resources.rs

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
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
    models::resources::{
        BulkUpdateOutcome, Currency, Labor, Material, NewLabor, NewMaterial, NewSubcontract,
        PriceEdit, ResourceKind, ResourcePrice, Subcontract,
    },
};

fn default_quantity() -> Decimal {
    Decimal::ONE
}

// ---
// Payloads de criação
// ---
#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateMaterialPayload {
    #[validate(length(min = 1, max = 200, message = "O nome é obrigatório."))]
    pub name: String,
    pub supplier_id: Option<Uuid>,
    pub type_id: Uuid,
    pub category_id: Uuid,
    pub sale_unit_id: Uuid,
    #[serde(default = "default_quantity")]
    pub quantity_per_sale_unit: Decimal,
    pub unit_price_sale_unit: Decimal,
    #[serde(default)]
    pub currency: Currency,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateLaborPayload {
    pub category_id: Uuid,
    pub sub_category_id: Uuid,
    #[validate(length(min = 1, max = 200, message = "A tarefa é obrigatória."))]
    pub task: String,
    pub crew_id: Uuid,
    pub crew_ref_id: Uuid,
    pub sale_unit_id: Uuid,
    #[serde(default = "default_quantity")]
    pub quantity_per_sale_unit: Decimal,
    pub unit_price_sale_unit: Decimal,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateSubcontractPayload {
    pub category_id: Uuid,
    pub sub_category_id: Uuid,
    #[validate(length(min = 1, max = 200, message = "A tarefa é obrigatória."))]
    pub task: String,
    pub supplier_id: Option<Uuid>,
    pub sale_unit_id: Uuid,
    #[serde(default = "default_quantity")]
    pub quantity_per_sale_unit: Decimal,
    pub unit_price_sale_unit: Decimal,
    #[serde(default)]
    pub currency: Currency,
}

// ---
// Payloads de preço
// ---
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePricePayload {
    pub quantity_per_sale_unit: Decimal,
    pub unit_price_sale_unit: Decimal,
    /// Ignorada na mão de obra.
    pub currency: Option<Currency>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BulkPricePayload {
    pub ids: Vec<Uuid>,
    /// Percentual com vírgula ou ponto: "10,5", "-3".
    #[validate(length(min = 1, message = "O percentual é obrigatório."))]
    #[schema(example = "10,5")]
    pub percentage: String,
}

#[derive(Debug, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedPriceQuery {
    /// Sem hoja, vale o preço atual.
    pub sheet_id: Option<Uuid>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedPriceResponse {
    pub resource_id: Uuid,
    pub sheet_id: Option<Uuid>,
    pub unit_price_sale_unit: Decimal,
}

// ---
// Materiais
// ---
#[utoipa::path(
    get,
    path = "/api/materials",
    tag = "Resources",
    params(("x-tenant-id" = Uuid, Header, description = "ID da Empresa")),
    responses((status = 200, description = "Materiais com analysisUnitPrice", body = [Material])),
    security(("api_jwt" = []))
)]
pub async fn list_materials(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    tenant: TenantContext,
) -> Result<impl IntoResponse, ApiError> {
    let to_api = |e: AppError| e.to_api_error(&locale);

    let mut tx = begin_tenant_tx(&app_state, &tenant, &user).await.map_err(to_api)?;

    let materials = app_state
        .resource_service
        .list_materials(&mut *tx, tenant.tenant_id())
        .await
        .map_err(to_api)?;

    tx.commit().await.map_err(|e| to_api(AppError::from(e)))?;
    Ok(Json(materials))
}

#[utoipa::path(
    post,
    path = "/api/materials",
    tag = "Resources",
    request_body = CreateMaterialPayload,
    params(("x-tenant-id" = Uuid, Header, description = "ID da Empresa")),
    responses(
        (status = 201, description = "Material criado", body = Material),
        (status = 409, description = "Nome já usado"),
        (status = 422, description = "Referência de outra empresa")
    ),
    security(("api_jwt" = []))
)]
pub async fn create_material(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    tenant: TenantContext,
    Json(payload): Json<CreateMaterialPayload>,
) -> Result<impl IntoResponse, ApiError> {
    let to_api = |e: AppError| e.to_api_error(&locale);

    payload.validate().map_err(|e| to_api(AppError::ValidationError(e)))?;

    let input = NewMaterial {
        name: payload.name.trim().to_string(),
        supplier_id: payload.supplier_id,
        type_id: payload.type_id,
        category_id: payload.category_id,
        sale_unit_id: payload.sale_unit_id,
        quantity_per_sale_unit: payload.quantity_per_sale_unit,
        unit_price_sale_unit: payload.unit_price_sale_unit,
        currency: payload.currency,
    };

    let mut tx = begin_tenant_tx(&app_state, &tenant, &user).await.map_err(to_api)?;

    let material = app_state
        .resource_service
        .create_material(&mut *tx, tenant.tenant_id(), input)
        .await
        .map_err(to_api)?;

    tx.commit().await.map_err(|e| to_api(AppError::from(e)))?;
    Ok((StatusCode::CREATED, Json(material)))
}

// ---
// Mano de obra
// ---
#[utoipa::path(
    get,
    path = "/api/labor",
    tag = "Resources",
    params(("x-tenant-id" = Uuid, Header, description = "ID da Empresa")),
    responses((status = 200, description = "Mão de obra com analysisUnitPrice", body = [Labor])),
    security(("api_jwt" = []))
)]
pub async fn list_labor(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    tenant: TenantContext,
) -> Result<impl IntoResponse, ApiError> {
    let to_api = |e: AppError| e.to_api_error(&locale);

    let mut tx = begin_tenant_tx(&app_state, &tenant, &user).await.map_err(to_api)?;

    let labor = app_state
        .resource_service
        .list_labor(&mut *tx, tenant.tenant_id())
        .await
        .map_err(to_api)?;

    tx.commit().await.map_err(|e| to_api(AppError::from(e)))?;
    Ok(Json(labor))
}

#[utoipa::path(
    post,
    path = "/api/labor",
    tag = "Resources",
    request_body = CreateLaborPayload,
    params(("x-tenant-id" = Uuid, Header, description = "ID da Empresa")),
    responses((status = 201, description = "Mão de obra criada", body = Labor)),
    security(("api_jwt" = []))
)]
pub async fn create_labor(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    tenant: TenantContext,
    Json(payload): Json<CreateLaborPayload>,
) -> Result<impl IntoResponse, ApiError> {
    let to_api = |e: AppError| e.to_api_error(&locale);

    payload.validate().map_err(|e| to_api(AppError::ValidationError(e)))?;

    let input = NewLabor {
        category_id: payload.category_id,
        sub_category_id: payload.sub_category_id,
        task: payload.task.trim().to_string(),
        crew_id: payload.crew_id,
        crew_ref_id: payload.crew_ref_id,
        sale_unit_id: payload.sale_unit_id,
        quantity_per_sale_unit: payload.quantity_per_sale_unit,
        unit_price_sale_unit: payload.unit_price_sale_unit,
    };

    let mut tx = begin_tenant_tx(&app_state, &tenant, &user).await.map_err(to_api)?;

    let labor = app_state
        .resource_service
        .create_labor(&mut *tx, tenant.tenant_id(), input)
        .await
        .map_err(to_api)?;

    tx.commit().await.map_err(|e| to_api(AppError::from(e)))?;
    Ok((StatusCode::CREATED, Json(labor)))
}

// ---
// Subcontratos
// ---
#[utoipa::path(
    get,
    path = "/api/subcontracts",
    tag = "Resources",
    params(("x-tenant-id" = Uuid, Header, description = "ID da Empresa")),
    responses((status = 200, description = "Subcontratos com analysisUnitPrice", body = [Subcontract])),
    security(("api_jwt" = []))
)]
pub async fn list_subcontracts(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    tenant: TenantContext,
) -> Result<impl IntoResponse, ApiError> {
    let to_api = |e: AppError| e.to_api_error(&locale);

    let mut tx = begin_tenant_tx(&app_state, &tenant, &user).await.map_err(to_api)?;

    let subcontracts = app_state
        .resource_service
        .list_subcontracts(&mut *tx, tenant.tenant_id())
        .await
        .map_err(to_api)?;

    tx.commit().await.map_err(|e| to_api(AppError::from(e)))?;
    Ok(Json(subcontracts))
}

#[utoipa::path(
    post,
    path = "/api/subcontracts",
    tag = "Resources",
    request_body = CreateSubcontractPayload,
    params(("x-tenant-id" = Uuid, Header, description = "ID da Empresa")),
    responses((status = 201, description = "Subcontrato criado", body = Subcontract)),
    security(("api_jwt" = []))
)]
pub async fn create_subcontract(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    tenant: TenantContext,
    Json(payload): Json<CreateSubcontractPayload>,
) -> Result<impl IntoResponse, ApiError> {
    let to_api = |e: AppError| e.to_api_error(&locale);

    payload.validate().map_err(|e| to_api(AppError::ValidationError(e)))?;

    let input = NewSubcontract {
        category_id: payload.category_id,
        sub_category_id: payload.sub_category_id,
        task: payload.task.trim().to_string(),
        supplier_id: payload.supplier_id,
        sale_unit_id: payload.sale_unit_id,
        quantity_per_sale_unit: payload.quantity_per_sale_unit,
        unit_price_sale_unit: payload.unit_price_sale_unit,
        currency: payload.currency,
    };

    let mut tx = begin_tenant_tx(&app_state, &tenant, &user).await.map_err(to_api)?;

    let subcontract = app_state
        .resource_service
        .create_subcontract(&mut *tx, tenant.tenant_id(), input)
        .await
        .map_err(to_api)?;

    tx.commit().await.map_err(|e| to_api(AppError::from(e)))?;
    Ok((StatusCode::CREATED, Json(subcontract)))
}

// ---
// Operações comuns às três famílias
// ---
#[utoipa::path(
    delete,
    path = "/api/resources/{kind}/{id}",
    tag = "Resources",
    params(
        ("kind" = ResourceKind, Path, description = "materials, labor ou subcontracts"),
        ("id" = Uuid, Path, description = "ID do recurso"),
        ("x-tenant-id" = Uuid, Header, description = "ID da Empresa")
    ),
    responses(
        (status = 204, description = "Removido"),
        (status = 409, description = "Referenciado por hojas ou mezclas")
    ),
    security(("api_jwt" = []))
)]
pub async fn delete_resource(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    tenant: TenantContext,
    Path((kind, id)): Path<(ResourceKind, Uuid)>,
) -> Result<impl IntoResponse, ApiError> {
    let to_api = |e: AppError| e.to_api_error(&locale);

    let mut tx = begin_tenant_tx(&app_state, &tenant, &user).await.map_err(to_api)?;

    app_state
        .resource_service
        .delete(&mut *tx, tenant.tenant_id(), kind, id)
        .await
        .map_err(to_api)?;

    tx.commit().await.map_err(|e| to_api(AppError::from(e)))?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    put,
    path = "/api/resources/{kind}/{id}/price",
    tag = "Resources",
    request_body = UpdatePricePayload,
    params(
        ("kind" = ResourceKind, Path, description = "materials, labor ou subcontracts"),
        ("id" = Uuid, Path, description = "ID do recurso"),
        ("x-tenant-id" = Uuid, Header, description = "ID da Empresa")
    ),
    responses(
        (status = 200, description = "Preço atualizado", body = ResourcePrice),
        (status = 400, description = "Valor negativo ou acima do limite"),
        (status = 422, description = "A nova moeda mistura moedas numa mezcla")
    ),
    security(("api_jwt" = []))
)]
pub async fn update_price(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    tenant: TenantContext,
    Path((kind, id)): Path<(ResourceKind, Uuid)>,
    Json(payload): Json<UpdatePricePayload>,
) -> Result<impl IntoResponse, ApiError> {
    let to_api = |e: AppError| e.to_api_error(&locale);

    let edit = PriceEdit {
        quantity_per_sale_unit: payload.quantity_per_sale_unit,
        unit_price_sale_unit: payload.unit_price_sale_unit,
        currency: payload.currency,
    };

    let mut tx = begin_tenant_tx(&app_state, &tenant, &user).await.map_err(to_api)?;

    let price = app_state
        .resource_service
        .update_price(&mut *tx, tenant.tenant_id(), kind, id, edit)
        .await
        .map_err(to_api)?;

    tx.commit().await.map_err(|e| to_api(AppError::from(e)))?;
    Ok(Json(price))
}

#[utoipa::path(
    get,
    path = "/api/resources/{kind}/{id}/resolved-price",
    tag = "Resources",
    params(
        ("kind" = ResourceKind, Path, description = "materials, labor ou subcontracts"),
        ("id" = Uuid, Path, description = "ID do recurso"),
        ResolvedPriceQuery,
        ("x-tenant-id" = Uuid, Header, description = "ID da Empresa")
    ),
    responses((status = 200, body = ResolvedPriceResponse)),
    security(("api_jwt" = []))
)]
pub async fn resolved_price(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    tenant: TenantContext,
    Path((kind, id)): Path<(ResourceKind, Uuid)>,
    Query(query): Query<ResolvedPriceQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let to_api = |e: AppError| e.to_api_error(&locale);

    let mut tx = begin_tenant_tx(&app_state, &tenant, &user).await.map_err(to_api)?;

    let unit_price_sale_unit = app_state
        .price_sheet_service
        .resolved_price(&mut *tx, tenant.tenant_id(), kind, id, query.sheet_id)
        .await
        .map_err(to_api)?;

    tx.commit().await.map_err(|e| to_api(AppError::from(e)))?;
    Ok(Json(ResolvedPriceResponse {
        resource_id: id,
        sheet_id: query.sheet_id,
        unit_price_sale_unit,
    }))
}

#[utoipa::path(
    post,
    path = "/api/resources/{kind}/bulk-price",
    tag = "Resources",
    request_body = BulkPricePayload,
    params(
        ("kind" = ResourceKind, Path, description = "materials, labor ou subcontracts"),
        ("x-tenant-id" = Uuid, Header, description = "ID da Empresa")
    ),
    responses(
        (status = 200, description = "noChange ou updated com a contagem", body = BulkUpdateOutcome),
        (status = 400, description = "Percentual inválido ou preço resultante acima do limite; nada foi aplicado")
    ),
    security(("api_jwt" = []))
)]
pub async fn bulk_update_prices(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    tenant: TenantContext,
    Path(kind): Path<ResourceKind>,
    Json(payload): Json<BulkPricePayload>,
) -> Result<impl IntoResponse, ApiError> {
    let to_api = |e: AppError| e.to_api_error(&locale);

    payload.validate().map_err(|e| to_api(AppError::ValidationError(e)))?;

    let mut tx = begin_tenant_tx(&app_state, &tenant, &user).await.map_err(to_api)?;

    let outcome = app_state
        .resource_service
        .bulk_update_prices(&mut *tx, tenant.tenant_id(), kind, &payload.ids, &payload.percentage)
        .await
        .map_err(to_api)?;

    tx.commit().await.map_err(|e| to_api(AppError::from(e)))?;
    Ok(Json(outcome))
}
