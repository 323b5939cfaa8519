use axum::http::{header, HeaderValue, Method};
use log::{info, warn};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};

#[derive(Debug, Clone)]
pub struct CorsConfig {
    pub allowed_origins: Vec<String>,
    pub allowed_methods: Vec<Method>,
    pub max_age_secs: u64,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allowed_origins: vec![],
            allowed_methods: vec![
                Method::GET,
                Method::POST,
                Method::PUT,
                Method::OPTIONS,
            ],
            max_age_secs: 3600,
        }
    }
}

impl CorsConfig {
    pub fn with_origins(mut self, origins: Vec<String>) -> Self {
        self.allowed_origins = origins;
        self
    }

    /// Admin clients authenticate with bearer tokens, never cookies, so the
    /// layer does not allow credentials. With no origins configured any
    /// origin may call the API.
    pub fn build(self) -> CorsLayer {
        let origins: Vec<HeaderValue> = self
            .allowed_origins
            .iter()
            .filter(|o| is_valid_origin_format(o))
            .filter_map(|o| o.parse().ok())
            .collect();
        if origins.len() < self.allowed_origins.len() {
            warn!(
                "Ignored {} malformed CORS origin(s)",
                self.allowed_origins.len() - origins.len()
            );
        }

        let cors = if origins.is_empty() {
            info!("CORS: no origins configured, allowing any origin");
            CorsLayer::new().allow_origin(Any)
        } else {
            info!("CORS: allowing {} configured origin(s)", origins.len());
            CorsLayer::new().allow_origin(AllowOrigin::list(origins))
        };

        cors.allow_methods(self.allowed_methods)
            .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE, header::ACCEPT])
            .max_age(std::time::Duration::from_secs(self.max_age_secs))
    }
}

fn is_valid_origin_format(origin: &str) -> bool {
    let Some(rest) = origin
        .strip_prefix("https://")
        .or_else(|| origin.strip_prefix("http://"))
    else {
        return false;
    };
    !rest.is_empty() && !rest.contains('/') && !rest.contains("..")
}

pub fn create_cors_layer(allowed_origins: &[String]) -> CorsLayer {
    CorsConfig::default()
        .with_origins(allowed_origins.to_vec())
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = CorsConfig::default();
        assert!(config.allowed_origins.is_empty());
        assert_eq!(config.max_age_secs, 3600);
        assert!(config.allowed_methods.contains(&Method::PUT));
    }

    #[test]
    fn test_origin_format() {
        assert!(is_valid_origin_format("https://admin.petwash.co.il"));
        assert!(is_valid_origin_format("http://localhost:3000"));
        assert!(!is_valid_origin_format("javascript:alert(1)"));
        assert!(!is_valid_origin_format("https://"));
        assert!(!is_valid_origin_format("https://evil.com/path"));
    }
}
