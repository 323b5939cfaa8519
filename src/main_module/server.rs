//! HTTP server initialization and routing

use axum::{middleware, routing::get, Router};
use log::{error, info};
use std::sync::Arc;
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};

use crate::core::shared::state::AppState;
use crate::security::{create_cors_layer, require_admin};

use super::{health_check, shutdown_signal};

pub const ENTERPRISE_PREFIX: &str = "/api/enterprise";
pub const FINANCE_PREFIX: &str = "/api/finance";

/// Every route under the two API prefixes sits behind the admin check;
/// `/health` stays public.
pub fn build_router(app_state: Arc<AppState>) -> Router {
    let enterprise = Router::new()
        .merge(crate::geography::configure_geography_routes())
        .merge(crate::franchise::configure_franchise_routes())
        .merge(crate::stations::configure_station_routes())
        .merge(crate::billing::configure_billing_routes())
        .merge(crate::maintenance::configure_maintenance_routes())
        .merge(crate::inventory::configure_inventory_routes())
        .merge(crate::subscriptions::configure_subscription_routes())
        .merge(crate::analytics::configure_analytics_routes());

    let finance = Router::new()
        .merge(crate::finance::configure_finance_routes())
        .merge(crate::invoicing::configure_invoicing_routes());

    let protected = Router::new()
        .nest(ENTERPRISE_PREFIX, enterprise)
        .nest(FINANCE_PREFIX, finance)
        .route_layer(middleware::from_fn_with_state(
            app_state.clone(),
            require_admin,
        ));

    Router::new()
        .route("/health", get(health_check))
        .merge(protected)
        .layer(create_cors_layer(&app_state.config.server.cors_allowed_origins))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(tracing::Level::INFO))
                .on_response(DefaultOnResponse::new().level(tracing::Level::INFO)),
        )
        .with_state(app_state)
}

pub async fn run_server(app_state: Arc<AppState>) -> std::io::Result<()> {
    let addr = app_state.config.server_addr();
    let app = build_router(app_state);

    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(l) => l,
        Err(e) => {
            error!(
                "Failed to bind to {}: {} - is another instance running?",
                addr, e
            );
            return Err(e);
        }
    };
    info!("HTTP server listening on {}", addr);
    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(std::io::Error::other)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::shared::test_utils::{admin_token, test_state};
    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    async fn json_body(response: axum::response::Response) -> serde_json::Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_api_requires_bearer_token() {
        let app = build_router(test_state());
        for path in [
            "/api/enterprise/stations",
            "/api/enterprise/analytics/global",
            "/api/finance/ledger",
            "/api/finance/ita/circuit-breaker",
        ] {
            let response = app
                .clone()
                .oneshot(Request::get(path).body(Body::empty()).unwrap())
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::UNAUTHORIZED, "{path}");
        }
    }

    #[tokio::test]
    async fn test_health_is_public_and_reports_database() {
        let response = build_router(test_state())
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        let body = json_body(response).await;
        assert_eq!(body["status"], "degraded");
        assert_eq!(body["service"], "petwash");
        assert_eq!(body["itaCircuitBreaker"], "closed");
    }

    #[tokio::test]
    async fn test_non_admin_jwt_is_forbidden() {
        let state = test_state();
        let token = crate::security::auth::issue_token(
            &state.config.auth.jwt_secret,
            "operator-1",
            "operator",
            chrono::Duration::minutes(5),
        )
        .unwrap();
        let response = build_router(state)
            .oneshot(
                Request::get("/api/enterprise/stations")
                    .header(header::AUTHORIZATION, format!("Bearer {token}"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_validation_runs_before_database() {
        let state = test_state();
        let token = admin_token(&state);
        let response = build_router(state)
            .oneshot(
                Request::post("/api/enterprise/countries")
                    .header(header::AUTHORIZATION, format!("Bearer {token}"))
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(r#"{"code":"isr","name":""}"#))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = json_body(response).await;
        assert_eq!(body["error"], "Validation failed");
        let fields: Vec<&str> = body["details"]
            .as_array()
            .unwrap()
            .iter()
            .filter_map(|d| d["field"].as_str())
            .collect();
        assert!(fields.contains(&"currencyCode"));
        assert!(fields.contains(&"timezone"));
    }

    #[tokio::test]
    async fn test_malformed_json_is_400() {
        let state = test_state();
        let token = admin_token(&state);
        let response = build_router(state)
            .oneshot(
                Request::post("/api/finance/accounts-payable")
                    .header(header::AUTHORIZATION, format!("Bearer {token}"))
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from("{not json"))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json_body(response).await["error"], "Validation failed");
    }

    #[tokio::test]
    async fn test_breaker_status_and_reset() {
        let state = test_state();
        let token = admin_token(&state);
        state.ita_breaker.record_failure();
        let app = build_router(state.clone());

        let response = app
            .clone()
            .oneshot(
                Request::get("/api/finance/ita/circuit-breaker")
                    .header(header::AUTHORIZATION, format!("Bearer {token}"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await["consecutiveFailures"], 1);

        let response = app
            .oneshot(
                Request::post("/api/finance/ita/circuit-breaker/reset")
                    .header(header::AUTHORIZATION, format!("Bearer {token}"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        let body = json_body(response).await;
        assert_eq!(body["state"], "closed");
        assert_eq!(body["consecutiveFailures"], 0);
    }
}
