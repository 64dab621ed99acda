// src/handlers/mixtures.rs

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use rust_decimal::Decimal;
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
    models::mixtures::{Mixture, MixtureCost, MixtureDetail, MixtureLine, NewMixture},
};

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateMixturePayload {
    #[validate(length(min = 1, max = 150, message = "O nome da mezcla é obrigatório."))]
    pub name: String,
    pub unit_id: Uuid,
    /// Hoja de materiais usada no cálculo; sem ela valem os preços atuais.
    pub sheet_id: Option<Uuid>,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AddMixtureLinePayload {
    pub material_id: Uuid,
    pub quantity: Decimal,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateMixtureLinePayload {
    pub quantity: Decimal,
}

#[utoipa::path(
    get,
    path = "/api/mixtures",
    tag = "Mixtures",
    params(("x-tenant-id" = Uuid, Header, description = "ID da Empresa")),
    responses((status = 200, body = [Mixture])),
    security(("api_jwt" = []))
)]
pub async fn list_mixtures(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    tenant: TenantContext,
) -> Result<impl IntoResponse, ApiError> {
    let to_api = |e: AppError| e.to_api_error(&locale);

    let mut tx = begin_tenant_tx(&app_state, &tenant, &user).await.map_err(to_api)?;

    let mixtures = app_state
        .mixture_service
        .list(&mut *tx, tenant.tenant_id())
        .await
        .map_err(to_api)?;

    tx.commit().await.map_err(|e| to_api(AppError::from(e)))?;
    Ok(Json(mixtures))
}

#[utoipa::path(
    post,
    path = "/api/mixtures",
    tag = "Mixtures",
    request_body = CreateMixturePayload,
    params(("x-tenant-id" = Uuid, Header, description = "ID da Empresa")),
    responses(
        (status = 201, description = "Mezcla criada", body = Mixture),
        (status = 409, description = "Mesmo nome para a mesma hoja")
    ),
    security(("api_jwt" = []))
)]
pub async fn create_mixture(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    tenant: TenantContext,
    Json(payload): Json<CreateMixturePayload>,
) -> Result<impl IntoResponse, ApiError> {
    let to_api = |e: AppError| e.to_api_error(&locale);

    payload.validate().map_err(|e| to_api(AppError::ValidationError(e)))?;

    let input = NewMixture {
        name: payload.name,
        unit_id: payload.unit_id,
        sheet_id: payload.sheet_id,
    };

    let mut tx = begin_tenant_tx(&app_state, &tenant, &user).await.map_err(to_api)?;

    let mixture = app_state
        .mixture_service
        .create(&mut *tx, tenant.tenant_id(), input)
        .await
        .map_err(to_api)?;

    tx.commit().await.map_err(|e| to_api(AppError::from(e)))?;
    Ok((StatusCode::CREATED, Json(mixture)))
}

#[utoipa::path(
    get,
    path = "/api/mixtures/{id}",
    tag = "Mixtures",
    params(
        ("id" = Uuid, Path, description = "ID da mezcla"),
        ("x-tenant-id" = Uuid, Header, description = "ID da Empresa")
    ),
    responses((status = 200, body = MixtureDetail)),
    security(("api_jwt" = []))
)]
pub async fn get_mixture(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    tenant: TenantContext,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let to_api = |e: AppError| e.to_api_error(&locale);

    let mut tx = begin_tenant_tx(&app_state, &tenant, &user).await.map_err(to_api)?;

    let detail = app_state
        .mixture_service
        .get(&mut *tx, tenant.tenant_id(), id)
        .await
        .map_err(to_api)?;

    tx.commit().await.map_err(|e| to_api(AppError::from(e)))?;
    Ok(Json(detail))
}

#[utoipa::path(
    delete,
    path = "/api/mixtures/{id}",
    tag = "Mixtures",
    params(
        ("id" = Uuid, Path, description = "ID da mezcla"),
        ("x-tenant-id" = Uuid, Header, description = "ID da Empresa")
    ),
    responses((status = 204, description = "Mezcla e linhas removidas")),
    security(("api_jwt" = []))
)]
pub async fn delete_mixture(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    tenant: TenantContext,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let to_api = |e: AppError| e.to_api_error(&locale);

    let mut tx = begin_tenant_tx(&app_state, &tenant, &user).await.map_err(to_api)?;

    app_state
        .mixture_service
        .delete(&mut *tx, tenant.tenant_id(), id)
        .await
        .map_err(to_api)?;

    tx.commit().await.map_err(|e| to_api(AppError::from(e)))?;
    Ok(StatusCode::NO_CONTENT)
}

// ---
// Linhas
// ---
#[utoipa::path(
    post,
    path = "/api/mixtures/{id}/lines",
    tag = "Mixtures",
    request_body = AddMixtureLinePayload,
    params(
        ("id" = Uuid, Path, description = "ID da mezcla"),
        ("x-tenant-id" = Uuid, Header, description = "ID da Empresa")
    ),
    responses(
        (status = 201, body = MixtureLine),
        (status = 409, description = "Material já está na mezcla"),
        (status = 422, description = "Moeda diferente dos outros materiais")
    ),
    security(("api_jwt" = []))
)]
pub async fn add_line(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    tenant: TenantContext,
    Path(id): Path<Uuid>,
    Json(payload): Json<AddMixtureLinePayload>,
) -> Result<impl IntoResponse, ApiError> {
    let to_api = |e: AppError| e.to_api_error(&locale);

    let mut tx = begin_tenant_tx(&app_state, &tenant, &user).await.map_err(to_api)?;

    let line = app_state
        .mixture_service
        .add_line(&mut *tx, tenant.tenant_id(), id, payload.material_id, payload.quantity)
        .await
        .map_err(to_api)?;

    tx.commit().await.map_err(|e| to_api(AppError::from(e)))?;
    Ok((StatusCode::CREATED, Json(line)))
}

#[utoipa::path(
    put,
    path = "/api/mixtures/{id}/lines/{material_id}",
    tag = "Mixtures",
    request_body = UpdateMixtureLinePayload,
    params(
        ("id" = Uuid, Path, description = "ID da mezcla"),
        ("material_id" = Uuid, Path, description = "ID do material"),
        ("x-tenant-id" = Uuid, Header, description = "ID da Empresa")
    ),
    responses((status = 200, body = MixtureLine)),
    security(("api_jwt" = []))
)]
pub async fn update_line(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    tenant: TenantContext,
    Path((id, material_id)): Path<(Uuid, Uuid)>,
    Json(payload): Json<UpdateMixtureLinePayload>,
) -> Result<impl IntoResponse, ApiError> {
    let to_api = |e: AppError| e.to_api_error(&locale);

    let mut tx = begin_tenant_tx(&app_state, &tenant, &user).await.map_err(to_api)?;

    let line = app_state
        .mixture_service
        .update_line(&mut *tx, tenant.tenant_id(), id, material_id, payload.quantity)
        .await
        .map_err(to_api)?;

    tx.commit().await.map_err(|e| to_api(AppError::from(e)))?;
    Ok(Json(line))
}

#[utoipa::path(
    delete,
    path = "/api/mixtures/{id}/lines/{material_id}",
    tag = "Mixtures",
    params(
        ("id" = Uuid, Path, description = "ID da mezcla"),
        ("material_id" = Uuid, Path, description = "ID do material"),
        ("x-tenant-id" = Uuid, Header, description = "ID da Empresa")
    ),
    responses((status = 204, description = "Linha removida")),
    security(("api_jwt" = []))
)]
pub async fn remove_line(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    tenant: TenantContext,
    Path((id, material_id)): Path<(Uuid, Uuid)>,
) -> Result<impl IntoResponse, ApiError> {
    let to_api = |e: AppError| e.to_api_error(&locale);

    let mut tx = begin_tenant_tx(&app_state, &tenant, &user).await.map_err(to_api)?;

    app_state
        .mixture_service
        .remove_line(&mut *tx, tenant.tenant_id(), id, material_id)
        .await
        .map_err(to_api)?;

    tx.commit().await.map_err(|e| to_api(AppError::from(e)))?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    get,
    path = "/api/mixtures/{id}/cost",
    tag = "Mixtures",
    params(
        ("id" = Uuid, Path, description = "ID da mezcla"),
        ("x-tenant-id" = Uuid, Header, description = "ID da Empresa")
    ),
    responses((status = 200, description = "Custo por unidade da mezcla, com detalhe por linha", body = MixtureCost)),
    security(("api_jwt" = []))
)]
pub async fn mixture_cost(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    tenant: TenantContext,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let to_api = |e: AppError| e.to_api_error(&locale);

    let mut tx = begin_tenant_tx(&app_state, &tenant, &user).await.map_err(to_api)?;

    let cost = app_state
        .mixture_service
        .compute_cost(&mut *tx, tenant.tenant_id(), id)
        .await
        .map_err(to_api)?;

    tx.commit().await.map_err(|e| to_api(AppError::from(e)))?;
    Ok(Json(cost))
}
