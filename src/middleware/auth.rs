// src/middleware/auth.rs

use axum::{
    extract::{FromRequestParts, Request, State},
    http::request::Parts,
    middleware::Next,
    response::Response,
};
use axum_extra::{
    headers::{authorization::Bearer, Authorization},
    TypedHeader,
};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    common::error::{ApiError, AppError},
    config::AppState,
    middleware::i18n::Locale,
};

// Os tokens são emitidos pelo provedor de identidade; aqui só validamos.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub exp: usize,
}

/// O usuário do token, já validado pelo guard.
#[derive(Debug, Clone, Copy)]
pub struct AuthenticatedUser(pub Uuid);

/// Valida assinatura (HS256) e expiração, e devolve o `sub`.
pub fn decode_user_id(token: &str, secret: &str) -> Result<Uuid, AppError> {
    let data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::new(Algorithm::HS256),
    )
    .map_err(|e| {
        tracing::debug!("Token recusado: {}", e);
        AppError::InvalidToken
    })?;

    Ok(data.claims.sub)
}

pub(crate) fn authenticate(
    bearer: Option<TypedHeader<Authorization<Bearer>>>,
    secret: &str,
) -> Result<AuthenticatedUser, AppError> {
    let TypedHeader(Authorization(bearer)) = bearer.ok_or(AppError::InvalidToken)?;
    decode_user_id(bearer.token(), secret).map(AuthenticatedUser)
}

// Rotas que só precisam do usuário (ex: /api/me/companies).
pub async fn auth_guard(
    State(app_state): State<AppState>,
    locale: Locale,
    bearer: Option<TypedHeader<Authorization<Bearer>>>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let user = authenticate(bearer, &app_state.jwt_secret)
        .map_err(|e| e.to_api_error(&locale))?;

    request.extensions_mut().insert(user);
    Ok(next.run(request).await)
}

impl<S> FromRequestParts<S> for AuthenticatedUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthenticatedUser>()
            .copied()
            .ok_or(AppError::InvalidToken)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{encode, EncodingKey, Header};

    const SECRET: &str = "segredo-de-teste";

    fn token_for(sub: Uuid, exp: usize, secret: &str) -> String {
        encode(
            &Header::default(),
            &Claims { sub, exp },
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .unwrap()
    }

    fn far_future() -> usize {
        (chrono::Utc::now().timestamp() + 3600) as usize
    }

    #[test]
    fn valid_token_yields_the_subject() {
        let user_id = Uuid::new_v4();
        let token = token_for(user_id, far_future(), SECRET);
        assert_eq!(decode_user_id(&token, SECRET).unwrap(), user_id);
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let token = token_for(Uuid::new_v4(), far_future(), "outro-segredo");
        assert!(matches!(decode_user_id(&token, SECRET), Err(AppError::InvalidToken)));
    }

    #[test]
    fn expired_token_is_rejected() {
        let expired = (chrono::Utc::now().timestamp() - 3600) as usize;
        let token = token_for(Uuid::new_v4(), expired, SECRET);
        assert!(matches!(decode_user_id(&token, SECRET), Err(AppError::InvalidToken)));
    }

    #[test]
    fn missing_header_is_rejected() {
        assert!(matches!(authenticate(None, SECRET), Err(AppError::InvalidToken)));
    }
}
