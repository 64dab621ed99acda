// src/middleware/tenancy.rs

use axum::{
    extract::{FromRequestParts, Request, State},
    http::{request::Parts, HeaderMap},
    middleware::Next,
    response::Response,
};
use axum_extra::{
    headers::{authorization::Bearer, Authorization},
    TypedHeader,
};
use uuid::Uuid;

use crate::{
    common::error::{ApiError, AppError},
    config::AppState,
    middleware::{auth::authenticate, i18n::Locale},
    models::tenancy::TenantId,
};

// O nome do nosso cabeçalho HTTP customizado
const TENANT_ID_HEADER: &str = "x-tenant-id";

/// A empresa em nome da qual a requisição age, já autorizada.
#[derive(Debug, Clone, Copy)]
pub struct TenantContext(TenantId);

impl TenantContext {
    pub fn tenant_id(&self) -> TenantId {
        self.0
    }
}

/// Lê o X-Tenant-ID. Ausente e inválido são erros diferentes.
pub fn parse_tenant_header(headers: &HeaderMap) -> Result<Uuid, AppError> {
    let value = headers
        .get(TENANT_ID_HEADER)
        .ok_or(AppError::MissingTenant)?;

    let value_str = value.to_str().map_err(|_| AppError::InvalidTenantHeader)?;
    Uuid::parse_str(value_str.trim()).map_err(|_| AppError::InvalidTenantHeader)
}

// Autentica, lê o cabeçalho e confere o vínculo com a empresa.
// Só então o TenantContext entra nas extensions.
pub async fn tenant_guard(
    State(app_state): State<AppState>,
    locale: Locale,
    bearer: Option<TypedHeader<Authorization<Bearer>>>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let user = authenticate(bearer, &app_state.jwt_secret)
        .map_err(|e| e.to_api_error(&locale))?;

    let company_id = parse_tenant_header(request.headers())
        .map_err(|e| e.to_api_error(&locale))?;

    let tenant_id = app_state
        .tenant_service
        .authorize(user.0, company_id)
        .await
        .map_err(|e| e.to_api_error(&locale))?;

    request.extensions_mut().insert(user);
    request.extensions_mut().insert(TenantContext(tenant_id));
    Ok(next.run(request).await)
}

impl<S> FromRequestParts<S> for TenantContext
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<TenantContext>()
            .copied()
            .ok_or(AppError::MissingTenant)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn reads_a_valid_tenant_header() {
        let company_id = Uuid::new_v4();
        let mut headers = HeaderMap::new();
        headers.insert(
            TENANT_ID_HEADER,
            HeaderValue::from_str(&company_id.to_string()).unwrap(),
        );
        assert_eq!(parse_tenant_header(&headers).unwrap(), company_id);
    }

    #[test]
    fn missing_header_is_its_own_error() {
        assert!(matches!(
            parse_tenant_header(&HeaderMap::new()),
            Err(AppError::MissingTenant)
        ));
    }

    #[test]
    fn garbage_header_is_rejected() {
        let mut headers = HeaderMap::new();
        headers.insert(TENANT_ID_HEADER, HeaderValue::from_static("loja-1"));
        assert!(matches!(
            parse_tenant_header(&headers),
            Err(AppError::InvalidTenantHeader)
        ));
    }
}
