// src/common/error.rs

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{json, Value};
use thiserror::Error;

use crate::middleware::i18n::Locale;
use crate::models::resources::Currency;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Erro de validação")]
    ValidationError(#[from] validator::ValidationErrors),

    #[error("Percentual inválido: {0}")]
    InvalidPercentage(String),

    #[error("Data inválida: {0}")]
    InvalidDate(String),

    #[error("Cotação inválida: {0}")]
    InvalidQuoteValue(String),

    #[error("Valor negativo: {0}")]
    NegativeAmount(&'static str),

    #[error("Valor acima do limite da coluna: {0}")]
    AmountOutOfRange(&'static str),

    #[error("Quantidade deve ser positiva: {0}")]
    NonPositiveQuantity(&'static str),

    #[error("Copiar preços exige uma hoja de origem")]
    OriginRequired,

    #[error("Catálogo '{0}' exige um pai")]
    MissingParent(&'static str),

    #[error("Entrada de catálogo já existe: {0}")]
    CatalogEntryAlreadyExists(String),

    #[error("Entrada de catálogo em uso")]
    CatalogEntryInUse,

    #[error("Recurso já existe: {0}")]
    ResourceAlreadyExists(String),

    #[error("Recurso referenciado por hojas ou mezclas")]
    ResourceInUse,

    #[error("Hoja de precios já existe: {0}")]
    SheetNameAlreadyExists(String),

    #[error("Mezcla já existe: {0}")]
    MixtureAlreadyExists(String),

    #[error("Material já faz parte da mezcla")]
    DuplicateMixtureLine,

    #[error("Moeda misturada na mezcla: esperado {expected:?}, recebido {found:?}")]
    MixedCurrency { expected: Currency, found: Currency },

    #[error("Referência inválida para este tenant")]
    InvalidReference,

    #[error("{0} não encontrado")]
    NotFound(&'static str),

    #[error("Token inválido")]
    InvalidToken,

    #[error("Cabeçalho X-Tenant-ID ausente")]
    MissingTenant,

    #[error("Cabeçalho X-Tenant-ID inválido")]
    InvalidTenantHeader,

    #[error("Usuário não pertence à empresa")]
    NotTenantMember,

    // Variante para erros de banco de dados
    #[error("Erro de banco de dados: {0}")]
    DatabaseError(#[from] sqlx::Error),

    // `anyhow::Error` é ótimo para capturar o contexto do erro.
    #[error("Erro interno do servidor: {0}")]
    InternalServerError(#[from] anyhow::Error),
}

/// Resposta de erro já traduzida, pronta para o cliente.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub error: String,
    pub details: Option<Value>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = match self.details {
            Some(details) => json!({ "error": self.error, "details": details }),
            None => json!({ "error": self.error }),
        };
        (self.status, Json(body)).into_response()
    }
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::ValidationError(_)
            | AppError::InvalidPercentage(_)
            | AppError::InvalidDate(_)
            | AppError::InvalidQuoteValue(_)
            | AppError::NegativeAmount(_)
            | AppError::AmountOutOfRange(_)
            | AppError::NonPositiveQuantity(_)
            | AppError::OriginRequired
            | AppError::MissingParent(_)
            | AppError::MissingTenant
            | AppError::InvalidTenantHeader => StatusCode::BAD_REQUEST,

            AppError::CatalogEntryAlreadyExists(_)
            | AppError::CatalogEntryInUse
            | AppError::ResourceAlreadyExists(_)
            | AppError::ResourceInUse
            | AppError::SheetNameAlreadyExists(_)
            | AppError::MixtureAlreadyExists(_)
            | AppError::DuplicateMixtureLine => StatusCode::CONFLICT,

            AppError::MixedCurrency { .. } | AppError::InvalidReference => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::InvalidToken => StatusCode::UNAUTHORIZED,
            AppError::NotTenantMember => StatusCode::FORBIDDEN,
            AppError::DatabaseError(_) | AppError::InternalServerError(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Converte o erro de domínio na resposta HTTP, no idioma do cliente.
    pub fn to_api_error(&self, locale: &Locale) -> ApiError {
        let status = self.status();

        if status == StatusCode::INTERNAL_SERVER_ERROR {
            // O `tracing` loga a mensagem detalhada; o cliente recebe só a genérica.
            tracing::error!("Erro Interno do Servidor: {}", self);
        }

        let details = match self {
            AppError::ValidationError(errors) => {
                let mut details = serde_json::Map::new();
                for (field, field_errors) in errors.field_errors() {
                    let messages: Vec<String> = field_errors
                        .iter()
                        .map(|e| {
                            e.message
                                .as_ref()
                                .map(|m| m.to_string())
                                .unwrap_or_else(|| e.code.to_string())
                        })
                        .collect();
                    details.insert(field.to_string(), json!(messages));
                }
                Some(Value::Object(details))
            }
            AppError::InvalidPercentage(raw)
            | AppError::InvalidDate(raw)
            | AppError::InvalidQuoteValue(raw) => Some(json!({ "value": raw })),
            AppError::CatalogEntryAlreadyExists(name)
            | AppError::ResourceAlreadyExists(name)
            | AppError::SheetNameAlreadyExists(name)
            | AppError::MixtureAlreadyExists(name) => Some(json!({ "name": name })),
            AppError::MixedCurrency { expected, found } => {
                Some(json!({ "expected": expected, "found": found }))
            }
            _ => None,
        };

        ApiError {
            status,
            error: self.message(locale.lang()),
            details,
        }
    }

    fn message(&self, lang: &str) -> String {
        let (es, pt, en): (String, String, String) = match self {
            AppError::ValidationError(_) => (
                "Uno o más campos son inválidos.".into(),
                "Um ou mais campos são inválidos.".into(),
                "One or more fields are invalid.".into(),
            ),
            AppError::InvalidPercentage(_) => (
                "El porcentaje no es un número válido.".into(),
                "O percentual não é um número válido.".into(),
                "The percentage is not a valid number.".into(),
            ),
            AppError::InvalidDate(_) => (
                "La fecha es inválida (use AAAA-MM-DD).".into(),
                "A data é inválida (use AAAA-MM-DD).".into(),
                "The date is invalid (use YYYY-MM-DD).".into(),
            ),
            AppError::InvalidQuoteValue(_) => (
                "Una cotización no es un número válido.".into(),
                "Uma cotação não é um número válido.".into(),
                "A quoted value is not a valid number.".into(),
            ),
            AppError::NegativeAmount(field) => (
                format!("El campo '{}' no puede ser negativo.", field),
                format!("O campo '{}' não pode ser negativo.", field),
                format!("The field '{}' cannot be negative.", field),
            ),
            AppError::AmountOutOfRange(field) => (
                format!("El campo '{}' supera el máximo permitido.", field),
                format!("O campo '{}' ultrapassa o máximo permitido.", field),
                format!("The field '{}' exceeds the maximum allowed value.", field),
            ),
            AppError::NonPositiveQuantity(field) => (
                format!("El campo '{}' debe ser mayor que cero.", field),
                format!("O campo '{}' deve ser maior que zero.", field),
                format!("The field '{}' must be greater than zero.", field),
            ),
            AppError::OriginRequired => (
                "Para copiar precios hay que elegir una hoja de origen.".into(),
                "Para copiar preços é preciso escolher uma hoja de origem.".into(),
                "Copying prices requires an origin sheet.".into(),
            ),
            AppError::MissingParent(kind) => (
                format!("El catálogo '{}' requiere un elemento padre.", kind),
                format!("O catálogo '{}' exige um item pai.", kind),
                format!("The '{}' catalog requires a parent entry.", kind),
            ),
            AppError::CatalogEntryAlreadyExists(name) => (
                format!("Ya existe '{}' en este catálogo.", name),
                format!("'{}' já existe neste catálogo.", name),
                format!("'{}' already exists in this catalog.", name),
            ),
            AppError::CatalogEntryInUse => (
                "El elemento está en uso y no puede eliminarse.".into(),
                "O item está em uso e não pode ser removido.".into(),
                "The entry is in use and cannot be deleted.".into(),
            ),
            AppError::ResourceAlreadyExists(name) => (
                format!("El recurso '{}' ya existe.", name),
                format!("O recurso '{}' já existe.", name),
                format!("The resource '{}' already exists.", name),
            ),
            AppError::ResourceInUse => (
                "El recurso está referenciado por hojas de precios o mezclas.".into(),
                "O recurso é referenciado por hojas de preços ou mezclas.".into(),
                "The resource is referenced by price sheets or mixtures.".into(),
            ),
            AppError::SheetNameAlreadyExists(name) => (
                format!("Ya existe una hoja de precios llamada '{}'.", name),
                format!("Já existe uma hoja de preços chamada '{}'.", name),
                format!("A price sheet named '{}' already exists.", name),
            ),
            AppError::MixtureAlreadyExists(name) => (
                format!("La mezcla '{}' ya existe para esa hoja.", name),
                format!("A mezcla '{}' já existe para essa hoja.", name),
                format!("The mixture '{}' already exists for that sheet.", name),
            ),
            AppError::DuplicateMixtureLine => (
                "El material ya forma parte de la mezcla.".into(),
                "O material já faz parte da mezcla.".into(),
                "The material is already part of the mixture.".into(),
            ),
            AppError::MixedCurrency { .. } => (
                "No se pueden mezclar materiales de distintas monedas.".into(),
                "Não é possível misturar materiais de moedas diferentes.".into(),
                "Materials with different currencies cannot be mixed.".into(),
            ),
            AppError::InvalidReference => (
                "Una referencia no existe en esta empresa.".into(),
                "Uma referência não existe nesta empresa.".into(),
                "A referenced entry does not exist in this company.".into(),
            ),
            AppError::NotFound(what) => (
                format!("{} no encontrado.", what),
                format!("{} não encontrado.", what),
                format!("{} not found.", what),
            ),
            AppError::InvalidToken => (
                "Token de autenticación inválido o ausente.".into(),
                "Token de autenticação inválido ou ausente.".into(),
                "Missing or invalid authentication token.".into(),
            ),
            AppError::MissingTenant => (
                "La cabecera X-Tenant-ID es obligatoria.".into(),
                "O cabeçalho X-Tenant-ID é obrigatório.".into(),
                "The X-Tenant-ID header is required.".into(),
            ),
            AppError::InvalidTenantHeader => (
                "La cabecera X-Tenant-ID no es un UUID válido.".into(),
                "Cabeçalho X-Tenant-ID inválido (não é um UUID).".into(),
                "The X-Tenant-ID header is not a valid UUID.".into(),
            ),
            AppError::NotTenantMember => (
                "No pertenece a esta empresa.".into(),
                "Você não pertence a esta empresa.".into(),
                "You are not a member of this company.".into(),
            ),
            AppError::DatabaseError(_) | AppError::InternalServerError(_) => (
                "Ocurrió un error inesperado.".into(),
                "Ocorreu um erro inesperado.".into(),
                "An unexpected error occurred.".into(),
            ),
        };

        match lang {
            "es" => es,
            "pt" => pt,
            _ => en,
        }
    }
}

// Middlewares não têm o extrator de idioma; usam o padrão.
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        self.to_api_error(&Locale::default()).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uniqueness_errors_are_conflicts() {
        assert_eq!(
            AppError::SheetNameAlreadyExists("Enero".into()).status(),
            StatusCode::CONFLICT
        );
        assert_eq!(AppError::ResourceInUse.status(), StatusCode::CONFLICT);
        assert_eq!(AppError::DuplicateMixtureLine.status(), StatusCode::CONFLICT);
    }

    #[test]
    fn bad_percentage_is_a_bad_request_with_the_raw_value() {
        let api = AppError::InvalidPercentage("abc".into()).to_api_error(&Locale("es".into()));
        assert_eq!(api.status, StatusCode::BAD_REQUEST);
        assert_eq!(api.error, "El porcentaje no es un número válido.");
        assert_eq!(api.details, Some(json!({ "value": "abc" })));
    }

    #[test]
    fn overflowing_amount_is_a_bad_request() {
        let api = AppError::AmountOutOfRange("unitPriceSaleUnit").to_api_error(&Locale("pt".into()));
        assert_eq!(api.status, StatusCode::BAD_REQUEST);
        assert_eq!(api.error, "O campo 'unitPriceSaleUnit' ultrapassa o máximo permitido.");
    }

    #[test]
    fn unknown_language_falls_back_to_english() {
        let api = AppError::NotFound("Mixture").to_api_error(&Locale("de".into()));
        assert_eq!(api.status, StatusCode::NOT_FOUND);
        assert_eq!(api.error, "Mixture not found.");
    }

    #[test]
    fn internal_errors_hide_details() {
        let api = AppError::InternalServerError(anyhow::anyhow!("pool exhausted"))
            .to_api_error(&Locale::default());
        assert_eq!(api.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(api.error, "An unexpected error occurred.");
        assert!(api.details.is_none());
    }
}
