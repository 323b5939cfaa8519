use axum::{http::StatusCode, response::IntoResponse, Json};
use diesel::result::{DatabaseErrorKind, Error as DieselError};
use log::error;

use crate::security::validation::{FieldError, ValidationResult};

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Validation failed")]
    Validation(Vec<FieldError>),
    #[error("Bad request: {0}")]
    BadRequest(String),
    #[error("Unauthorized: {0}")]
    Unauthorized(String),
    #[error("Forbidden: {0}")]
    Forbidden(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Conflict: {0}")]
    Conflict(String),
    #[error("Upstream error: {0}")]
    Upstream(String),
    #[error("Database error: {0}")]
    Database(String),
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn not_found(entity: &str) -> Self {
        Self::NotFound(format!("{entity} not found"))
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Validation(_) | Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::Upstream(_) => StatusCode::BAD_GATEWAY,
            Self::Database(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let status = self.status_code();
        let body = match self {
            Self::Validation(details) => serde_json::json!({
                "error": "Validation failed",
                "details": details,
            }),
            Self::BadRequest(msg)
            | Self::Unauthorized(msg)
            | Self::Forbidden(msg)
            | Self::NotFound(msg)
            | Self::Conflict(msg)
            | Self::Upstream(msg) => serde_json::json!({ "error": msg }),
            Self::Database(msg) | Self::Internal(msg) => {
                error!("Request failed with internal error: {}", msg);
                serde_json::json!({ "error": "Internal server error" })
            }
        };
        (status, Json(body)).into_response()
    }
}

impl From<DieselError> for ApiError {
    fn from(err: DieselError) -> Self {
        match err {
            DieselError::NotFound => Self::NotFound("Record not found".to_string()),
            DieselError::DatabaseError(kind, info) => {
                let constraint = info.constraint_name().unwrap_or("constraint").to_string();
                match kind {
                    DatabaseErrorKind::UniqueViolation => {
                        Self::Conflict(format!("Duplicate value violates {constraint}"))
                    }
                    DatabaseErrorKind::ForeignKeyViolation => Self::BadRequest(format!(
                        "Referenced record does not exist ({constraint})"
                    )),
                    DatabaseErrorKind::CheckViolation => {
                        Self::BadRequest(format!("Value violates {constraint}"))
                    }
                    DatabaseErrorKind::NotNullViolation => Self::BadRequest(format!(
                        "Missing value for column {}",
                        info.column_name().unwrap_or("unknown")
                    )),
                    _ => Self::Database(info.message().to_string()),
                }
            }
            other => Self::Database(other.to_string()),
        }
    }
}

impl From<diesel::r2d2::PoolError> for ApiError {
    fn from(err: diesel::r2d2::PoolError) -> Self {
        Self::Database(format!("connection pool: {err}"))
    }
}

impl From<ValidationResult> for ApiError {
    fn from(result: ValidationResult) -> Self {
        Self::Validation(result.field_errors())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::security::validation::ValidationError;

    #[test]
    fn test_status_codes() {
        assert_eq!(ApiError::Validation(vec![]).status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(ApiError::not_found("Station").status_code(), StatusCode::NOT_FOUND);
        assert_eq!(
            ApiError::Conflict("already paid".into()).status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            ApiError::Upstream("ita down".into()).status_code(),
            StatusCode::BAD_GATEWAY
        );
    }

    #[test]
    fn test_diesel_not_found_maps_to_404() {
        let err: ApiError = DieselError::NotFound.into();
        assert!(matches!(err, ApiError::NotFound(_)));
    }

    #[test]
    fn test_validation_result_conversion_keeps_every_field() {
        let mut result = ValidationResult::new();
        result.add_error(ValidationError::Required("name".into()));
        result.add_error(ValidationError::Required("code".into()));
        match ApiError::from(result) {
            ApiError::Validation(details) => {
                let fields: Vec<_> = details.iter().map(|d| d.field.as_str()).collect();
                assert_eq!(fields, vec!["name", "code"]);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_internal_error_body_is_generic() {
        use http_body_util::BodyExt;

        let response = ApiError::Database("password=hunter2".into()).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["error"], "Internal server error");
    }
}
