//! Admin authentication for the back-office API.
//!
//! A request is admitted when its `Authorization: Bearer` token is either the
//! configured admin API key or an HS256 JWT carrying `role = "admin"`.

use axum::{
    extract::{Request, State},
    http::{header, HeaderMap},
    middleware::Next,
    response::Response,
};
use chrono::Utc;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::core::config::AuthConfig;
use crate::core::shared::error::ApiError;
use crate::core::shared::state::AppState;

pub const ADMIN_ROLE: &str = "admin";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdminClaims {
    pub sub: String,
    pub role: String,
    pub exp: i64,
    #[serde(default)]
    pub email: Option<String>,
}

/// Who performed an admin request. Stored in request extensions by
/// [`require_admin`] and recorded on audit columns such as `acknowledgedBy`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdminIdentity {
    pub subject: String,
}

impl AdminIdentity {
    pub fn api_key() -> Self {
        Self {
            subject: "api-key".to_string(),
        }
    }
}

pub fn extract_bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer ").or_else(|| v.strip_prefix("bearer ")))
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

pub fn authenticate(config: &AuthConfig, token: &str) -> Result<AdminIdentity, ApiError> {
    if let Some(api_key) = config.admin_api_key.as_deref().filter(|k| !k.is_empty()) {
        if constant_time_eq(api_key.as_bytes(), token.as_bytes()) {
            return Ok(AdminIdentity::api_key());
        }
    }

    if config.jwt_secret.is_empty() {
        return Err(ApiError::Unauthorized("Invalid credentials".to_string()));
    }

    let claims = decode::<AdminClaims>(
        token,
        &DecodingKey::from_secret(config.jwt_secret.as_bytes()),
        &Validation::new(Algorithm::HS256),
    )
    .map_err(|e| {
        debug!("Rejected bearer token: {}", e);
        ApiError::Unauthorized("Invalid or expired token".to_string())
    })?
    .claims;

    if claims.role != ADMIN_ROLE {
        warn!("Non-admin subject {} attempted back-office access", claims.sub);
        return Err(ApiError::Forbidden("Admin role required".to_string()));
    }

    Ok(AdminIdentity { subject: claims.sub })
}

pub async fn require_admin(
    State(state): State<Arc<AppState>>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = extract_bearer_token(request.headers())
        .ok_or_else(|| ApiError::Unauthorized("Missing bearer token".to_string()))?;
    let identity = authenticate(&state.config.auth, token)?;
    request.extensions_mut().insert(identity);
    Ok(next.run(request).await)
}

pub fn issue_token(
    secret: &str,
    subject: &str,
    role: &str,
    ttl: chrono::Duration,
) -> Result<String, jsonwebtoken::errors::Error> {
    let claims = AdminClaims {
        sub: subject.to_string(),
        role: role.to_string(),
        exp: (Utc::now() + ttl).timestamp(),
        email: None,
    };
    encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn config() -> AuthConfig {
        AuthConfig {
            jwt_secret: "test-secret".to_string(),
            admin_api_key: Some("key-123".to_string()),
        }
    }

    #[test]
    fn test_extract_bearer_token() {
        let mut headers = HeaderMap::new();
        assert!(extract_bearer_token(&headers).is_none());
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer abc"));
        assert_eq!(extract_bearer_token(&headers), Some("abc"));
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Basic abc"));
        assert!(extract_bearer_token(&headers).is_none());
    }

    #[test]
    fn test_api_key_is_admin() {
        assert_eq!(authenticate(&config(), "key-123").unwrap(), AdminIdentity::api_key());
    }

    #[test]
    fn test_admin_jwt_is_accepted() {
        let token = issue_token("test-secret", "ops@petwash.co.il", ADMIN_ROLE, chrono::Duration::hours(1)).unwrap();
        let identity = authenticate(&config(), &token).unwrap();
        assert_eq!(identity.subject, "ops@petwash.co.il");
    }

    #[test]
    fn test_non_admin_jwt_is_forbidden() {
        let token = issue_token("test-secret", "customer-1", "customer", chrono::Duration::hours(1)).unwrap();
        assert!(matches!(authenticate(&config(), &token), Err(ApiError::Forbidden(_))));
    }

    #[test]
    fn test_expired_or_foreign_jwt_is_unauthorized() {
        let expired = issue_token("test-secret", "ops", ADMIN_ROLE, chrono::Duration::hours(-2)).unwrap();
        assert!(matches!(authenticate(&config(), &expired), Err(ApiError::Unauthorized(_))));

        let foreign = issue_token("other-secret", "ops", ADMIN_ROLE, chrono::Duration::hours(1)).unwrap();
        assert!(matches!(authenticate(&config(), &foreign), Err(ApiError::Unauthorized(_))));
    }

    #[test]
    fn test_nothing_configured_rejects_everything() {
        let config = AuthConfig::default();
        assert!(matches!(authenticate(&config, "anything"), Err(ApiError::Unauthorized(_))));
    }
}
