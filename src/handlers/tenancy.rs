// src/handlers/tenancy.rs

use axum::{extract::State, response::IntoResponse, Json};

use crate::{
    common::error::ApiError,
    config::AppState,
    middleware::{auth::AuthenticatedUser, i18n::Locale},
    models::tenancy::Company,
};

/// Empresas às quais o usuário do token pertence (para escolher o X-Tenant-ID).
#[utoipa::path(
    get,
    path = "/api/me/companies",
    tag = "Tenancy",
    responses((status = 200, description = "Empresas do usuário", body = [Company])),
    security(("api_jwt" = []))
)]
pub async fn list_my_companies(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
) -> Result<impl IntoResponse, ApiError> {
    let companies = app_state
        .tenant_service
        .companies_for_user(user.0)
        .await
        .map_err(|e| e.to_api_error(&locale))?;

    Ok(Json(companies))
}
