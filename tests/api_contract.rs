//! End-to-end checks through the full router against a real Postgres.
//!
//! Every test returns early when `TEST_DATABASE_URL` is unset so the suite
//! passes on machines without a database.

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use std::sync::Arc;
use tokio::sync::{Mutex, Notify};
use tower::ServiceExt;
use uuid::Uuid;

use petwash::core::bootstrap::seed_reference_data;
use petwash::core::config::AppConfig;
use petwash::core::shared::state::AppState;
use petwash::core::shared::utils::{create_pool, run_migrations};
use petwash::invoicing::{InvoiceSubmission, ItaClient, ItaError, ItaOutcome};
use petwash::main_module::build_router;

const API_KEY: &str = "contract-test-key";

/// Tests that submit invoices share the `error` backlog, so they run one at a
/// time.
static INVOICE_LOCK: Mutex<()> = Mutex::const_new(());

struct NeverCalledIta;

#[async_trait]
impl ItaClient for NeverCalledIta {
    async fn submit_invoice(&self, _submission: &InvoiceSubmission) -> Result<ItaOutcome, ItaError> {
        Err(ItaError::Transport("ITA must not be called in this test".to_string()))
    }
}

struct OfflineIta;

#[async_trait]
impl ItaClient for OfflineIta {
    async fn submit_invoice(&self, _submission: &InvoiceSubmission) -> Result<ItaOutcome, ItaError> {
        Err(ItaError::Transport("connection refused".to_string()))
    }
}

struct AcceptingIta;

#[async_trait]
impl ItaClient for AcceptingIta {
    async fn submit_invoice(&self, submission: &InvoiceSubmission) -> Result<ItaOutcome, ItaError> {
        Ok(ItaOutcome::Accepted {
            allocation_number: format!("ALLOC-{}", submission.invoice_number),
        })
    }
}

/// Holds every submission until the test releases it.
struct GatedIta {
    entered: Arc<Notify>,
    release: Arc<Notify>,
}

#[async_trait]
impl ItaClient for GatedIta {
    async fn submit_invoice(&self, _submission: &InvoiceSubmission) -> Result<ItaOutcome, ItaError> {
        self.entered.notify_one();
        self.release.notified().await;
        Ok(ItaOutcome::Accepted {
            allocation_number: "ALLOC-GATED".to_string(),
        })
    }
}

fn app() -> Option<Router> {
    app_with(Arc::new(NeverCalledIta))
}

fn app_with(ita_client: Arc<dyn ItaClient>) -> Option<Router> {
    let Ok(url) = std::env::var("TEST_DATABASE_URL") else {
        println!("Skipping test - TEST_DATABASE_URL not set");
        return None;
    };

    let mut config = AppConfig::default();
    config.database.url = url;
    config.database.max_connections = 4;
    config.auth.jwt_secret = "contract-test-secret".to_string();
    config.auth.admin_api_key = Some(API_KEY.to_string());

    let pool = match create_pool(&config.database) {
        Ok(pool) => pool,
        Err(e) => {
            println!("Skipping test - cannot connect to database: {}", e);
            return None;
        }
    };
    if let Err(e) = run_migrations(&pool) {
        panic!("migrations failed: {e}");
    }
    let mut conn = pool.get().unwrap();
    seed_reference_data(&mut conn).unwrap();
    drop(conn);
    let state = Arc::new(AppState::new(pool, config, ita_client));
    Some(build_router(state))
}

fn suffix() -> String {
    Uuid::new_v4().simple().to_string()[..10].to_uppercase()
}

async fn call(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let mut request = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Bearer {API_KEY}"));
    let body = match body {
        Some(value) => {
            request = request.header(header::CONTENT_TYPE, "application/json");
            Body::from(value.to_string())
        }
        None => Body::empty(),
    };
    let response = app
        .clone()
        .oneshot(request.body(body).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, json)
}

fn id_of(value: &Value) -> String {
    value["id"].as_str().unwrap().to_string()
}

async fn country_id(app: &Router, code: &str) -> String {
    let (status, countries) = call(app, Method::GET, "/api/enterprise/countries", None).await;
    assert_eq!(status, StatusCode::OK);
    countries
        .as_array()
        .unwrap()
        .iter()
        .find(|c| c["code"] == code)
        .map(id_of)
        .unwrap()
}

async fn new_territory(app: &Router, country_id: &str) -> String {
    let (status, territory) = call(
        app,
        Method::POST,
        "/api/enterprise/territories",
        Some(json!({
            "countryId": country_id,
            "territoryCode": format!("TLV-{}", suffix()),
            "name": "Tel Aviv North"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    id_of(&territory)
}

async fn new_franchisee(app: &Router, country_id: &str, territory_id: &str) -> String {
    let (status, franchisee) = call(
        app,
        Method::POST,
        "/api/enterprise/franchisees",
        Some(json!({
            "countryId": country_id,
            "territoryId": territory_id,
            "businessName": format!("Clean Paws {}", suffix()),
            "contactName": "Noa Levi",
            "contactEmail": "noa@cleanpaws.example",
            "currency": "ILS"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    id_of(&franchisee)
}

async fn new_station(
    app: &Router,
    country_id: &str,
    territory_id: &str,
    franchisee_id: Option<&str>,
    operational_status: &str,
) -> Value {
    let code = suffix();
    let (status, station) = call(
        app,
        Method::POST,
        "/api/enterprise/stations",
        Some(json!({
            "franchiseeId": franchisee_id,
            "territoryId": territory_id,
            "countryId": country_id,
            "stationCode": format!("ST-{code}"),
            "identityNumber": format!("ID-{code}"),
            "name": "Dizengoff wash bay",
            "address": "Dizengoff St 100",
            "city": "Tel Aviv",
            "operationalStatus": operational_status
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    station
}

/// A station with its own fresh territory, so filters on that territory see
/// only what the test creates.
async fn station_fixture(app: &Router) -> (String, String, Value) {
    let country = country_id(app, "IL").await;
    let territory = new_territory(app, &country).await;
    let station = new_station(app, &country, &territory, None, "active").await;
    (country, territory, station)
}

async fn large_invoice(app: &Router) -> Value {
    let (status, invoice) = call(
        app,
        Method::POST,
        "/api/finance/invoices",
        Some(json!({
            "customerName": "Haifa Grooming Ltd",
            "customerTaxId": "514000001",
            "amountBeforeVat": "25000.00",
            "vatRate": "18",
            "currency": "ILS"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    invoice
}

#[tokio::test]
async fn test_health_reports_database() {
    let Some(app) = app() else { return };
    let response = app
        .oneshot(Request::get("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_duplicate_payable_invoice_is_conflict() {
    let Some(app) = app() else { return };
    let body = json!({
        "vendorName": "Hydro Supplies Ltd",
        "invoiceNumber": format!("HS-{}", suffix()),
        "category": "supplies",
        "amount": "1000.00",
        "vat": "180.00",
        "currency": "ILS",
        "dueDate": "2030-01-31"
    });
    let (status, _) = call(&app, Method::POST, "/api/finance/accounts-payable", Some(body.clone())).await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, error) = call(&app, Method::POST, "/api/finance/accounts-payable", Some(body)).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(error["error"].is_string());
}

#[tokio::test]
async fn test_paying_a_payable_twice_is_conflict_and_posts_one_entry() {
    let Some(app) = app() else { return };
    let (status, payable) = call(
        &app,
        Method::POST,
        "/api/finance/accounts-payable",
        Some(json!({
            "vendorName": "Israel Electric",
            "invoiceNumber": format!("IEC-{}", suffix()),
            "category": "utilities",
            "amount": "500",
            "currency": "ILS",
            "dueDate": "2030-02-28"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let id = payable["id"].as_str().unwrap().to_string();
    assert_eq!(payable["status"], "unpaid");

    let pay_uri = format!("/api/finance/accounts-payable/{id}/pay");
    let (status, paid) = call(&app, Method::POST, &pay_uri, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(paid["status"], "paid");
    assert_eq!(paid["ledgerEntry"]["sourceId"], id.as_str());

    let (status, _) = call(&app, Method::POST, &pay_uri, Some(json!({}))).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, entries) = call(
        &app,
        Method::GET,
        &format!("/api/finance/ledger?sourceId={id}"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(entries.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_small_invoice_skips_the_tax_authority() {
    let Some(app) = app() else { return };
    let (status, invoice) = call(
        &app,
        Method::POST,
        "/api/finance/invoices",
        Some(json!({
            "customerName": "Walk-in customer",
            "amountBeforeVat": "150.00",
            "vatRate": "18",
            "currency": "ILS"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(invoice["itaSubmissionStatus"], "not_required");
    assert_eq!(invoice["requiresAllocation"], false);
    assert_eq!(invoice["itaSubmissionAttempts"], 0);

    let id = invoice["id"].as_str().unwrap();
    let (status, _) = call(
        &app,
        Method::POST,
        &format!("/api/finance/invoices/{id}/submit"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_stock_never_goes_negative() {
    let Some(app) = app() else { return };
    let (status, part) = call(
        &app,
        Method::POST,
        "/api/enterprise/spare-parts",
        Some(json!({
            "partNumber": format!("PUMP-{}", suffix()),
            "name": "Shampoo dosing pump",
            "category": "pumps",
            "unitCost": "320.00",
            "currency": "ILS",
            "quantityInStock": 5,
            "reorderPoint": 6,
            "minimumStockLevel": 2
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(part["lowStock"], true);
    let part_id = part["id"].as_str().unwrap().to_string();

    let (status, _) = call(
        &app,
        Method::POST,
        "/api/enterprise/inventory/adjust",
        Some(json!({ "sparePartId": part_id, "movementType": "correction", "quantity": -10 })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = call(
        &app,
        Method::POST,
        "/api/enterprise/inventory/adjust",
        Some(json!({ "sparePartId": part_id, "movementType": "consume", "quantity": 1 })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, adjusted) = call(
        &app,
        Method::POST,
        "/api/enterprise/inventory/adjust",
        Some(json!({ "sparePartId": part_id, "movementType": "restock", "quantity": 3 })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(adjusted["sparePart"]["quantityInStock"], 8);
    assert_eq!(adjusted["sparePart"]["lowStock"], false);
    assert_eq!(adjusted["movement"]["performedBy"], "api-key");

    let (status, movements) = call(
        &app,
        Method::GET,
        &format!("/api/enterprise/inventory/movements?sparePartId={part_id}"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(movements.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_unknown_ids_are_not_found() {
    let Some(app) = app() else { return };
    let missing = Uuid::new_v4();
    for uri in [
        format!("/api/enterprise/stations/{missing}"),
        format!("/api/enterprise/franchisees/{missing}"),
        format!("/api/enterprise/analytics/franchisee/{missing}"),
        format!("/api/finance/invoices/{missing}"),
    ] {
        let (status, body) = call(&app, Method::GET, &uri, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND, "{uri}");
        assert!(body["error"].as_str().unwrap().ends_with("not found"));
    }
}

#[tokio::test]
async fn test_global_analytics_shape() {
    let Some(app) = app() else { return };
    let (status, body) = call(&app, Method::GET, "/api/enterprise/analytics/global", None).await;
    assert_eq!(status, StatusCode::OK);
    for key in [
        "stationStats",
        "franchiseeStats",
        "financialStats",
        "maintenanceStats",
        "alertStats",
        "inventoryStats",
        "generatedAt",
    ] {
        assert!(body.get(key).is_some(), "missing {key}");
    }
}

#[tokio::test]
async fn test_bill_payment_settles_and_posts_one_entry() {
    let Some(app) = app() else { return };
    let (_, _, station) = station_fixture(&app).await;
    let (status, bill) = call(
        &app,
        Method::POST,
        "/api/enterprise/bills",
        Some(json!({
            "stationId": id_of(&station),
            "billType": "electricity",
            "vendorName": "Israel Electric",
            "dueDate": "2030-03-31",
            "amount": "1250.00",
            "vat": "212.50",
            "currency": "ILS"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(bill["totalAmount"], "1462.50");
    assert_eq!(bill["status"], "unpaid");
    let id = id_of(&bill);

    let (status, paid) = call(&app, Method::POST, &format!("/api/enterprise/bills/{id}/pay"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(paid["ledgerEntry"]["debit"], "1462.50");
    assert_eq!(paid["ledgerEntry"]["credit"], "0.00");

    let (status, fetched) = call(&app, Method::GET, &format!("/api/enterprise/bills/{id}"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched["status"], "paid");
    assert_eq!(fetched["paidAmount"], "1462.50");
    assert!(fetched["paymentDate"].is_string());

    let (status, entries) = call(
        &app,
        Method::GET,
        &format!("/api/finance/ledger?sourceId={id}"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(entries.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_paid_bill_status_follows_payments() {
    let Some(app) = app() else { return };
    let (_, _, station) = station_fixture(&app).await;
    let (status, bill) = call(
        &app,
        Method::POST,
        "/api/enterprise/bills",
        Some(json!({
            "stationId": id_of(&station),
            "billType": "water",
            "vendorName": "Mei Avivim",
            "dueDate": "2030-04-30",
            "amount": "1000.00",
            "vat": "180.00",
            "currency": "ILS"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let uri = format!("/api/enterprise/bills/{}", id_of(&bill));

    let (status, _) = call(&app, Method::POST, &format!("{uri}/pay"), None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = call(&app, Method::PUT, &uri, Some(json!({ "status": "unpaid" }))).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, reopened) = call(&app, Method::PUT, &uri, Some(json!({ "amount": "2000.00" }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(reopened["totalAmount"], "2180.00");
    assert_eq!(reopened["paidAmount"], "1180.00");
    assert_eq!(reopened["status"], "partially_paid");

    let (status, _) = call(&app, Method::PUT, &uri, Some(json!({ "amount": "500.00" }))).await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_retry_failed_with_empty_backlog() {
    let Some(app) = app_with(Arc::new(AcceptingIta)) else { return };
    let _guard = INVOICE_LOCK.lock().await;

    // Drain anything an earlier run left in `error`.
    let (status, _) = call(&app, Method::POST, "/api/finance/invoices/retry-failed", None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, summary) = call(&app, Method::POST, "/api/finance/invoices/retry-failed", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(summary, json!({ "total": 0, "successful": 0, "failed": 0 }));
}

#[tokio::test]
async fn test_concurrent_submit_of_same_invoice_is_conflict() {
    let Some(offline) = app_with(Arc::new(OfflineIta)) else { return };
    let entered = Arc::new(Notify::new());
    let release = Arc::new(Notify::new());
    let Some(gated) = app_with(Arc::new(GatedIta {
        entered: entered.clone(),
        release: release.clone(),
    })) else {
        return;
    };
    let _guard = INVOICE_LOCK.lock().await;

    let invoice = large_invoice(&offline).await;
    assert_eq!(invoice["itaSubmissionStatus"], "error");
    assert_eq!(invoice["itaSubmissionAttempts"], 1);
    let id = id_of(&invoice);
    let submit_uri = format!("/api/finance/invoices/{id}/submit");

    let first = tokio::spawn({
        let gated = gated.clone();
        let uri = submit_uri.clone();
        async move { call(&gated, Method::POST, &uri, None).await }
    });
    entered.notified().await;

    let (status, _) = call(&gated, Method::POST, &submit_uri, None).await;
    assert_eq!(status, StatusCode::CONFLICT);
    let (_, in_flight) = call(&gated, Method::GET, &format!("/api/finance/invoices/{id}"), None).await;
    assert_eq!(in_flight["itaSubmissionStatus"], "submitted");

    release.notify_one();
    let (status, accepted) = first.await.unwrap();
    assert_eq!(status, StatusCode::OK);
    assert_eq!(accepted["itaSubmissionStatus"], "accepted");
    assert_eq!(accepted["itaAllocationNumber"], "ALLOC-GATED");
    assert_eq!(accepted["itaSubmissionAttempts"], 2);
    assert!(accepted["itaLastError"].is_null());
}

#[tokio::test]
async fn test_station_filter_returns_exactly_matching_set() {
    let Some(app) = app() else { return };
    let country = country_id(&app, "IL").await;
    let territory = new_territory(&app, &country).await;
    let active = new_station(&app, &country, &territory, None, "active").await;
    let in_maintenance = new_station(&app, &country, &territory, None, "maintenance").await;

    let (status, stations) = call(
        &app,
        Method::GET,
        &format!("/api/enterprise/stations?territoryId={territory}&operationalStatus=maintenance"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let ids: Vec<String> = stations.as_array().unwrap().iter().map(id_of).collect();
    assert_eq!(ids, vec![id_of(&in_maintenance)]);
    assert!(!ids.contains(&id_of(&active)));

    let (status, everything) = call(
        &app,
        Method::GET,
        &format!("/api/enterprise/stations?territoryId={territory}"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(everything.as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_franchisee_station_stats_match_stations() {
    let Some(app) = app() else { return };
    let country = country_id(&app, "IL").await;
    let territory = new_territory(&app, &country).await;
    let franchisee = new_franchisee(&app, &country, &territory).await;
    for status in ["active", "active", "maintenance"] {
        new_station(&app, &country, &territory, Some(&franchisee), status).await;
    }

    let (status, analytics) = call(
        &app,
        Method::GET,
        &format!("/api/enterprise/analytics/franchisee/{franchisee}"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let stats = &analytics["stationStats"];
    assert_eq!(stats["total"], 3);
    assert_eq!(stats["activeStations"], 2);
    assert_eq!(stats["byOperationalStatus"]["active"], 2);
    assert_eq!(stats["byOperationalStatus"]["maintenance"], 1);
    assert_eq!(stats["byHealthStatus"]["healthy"], 3);

    let (_, stations) = call(
        &app,
        Method::GET,
        &format!("/api/enterprise/stations?franchiseeId={franchisee}"),
        None,
    )
    .await;
    let stations = stations.as_array().unwrap();
    assert_eq!(stats["total"], stations.len());
    let active = stations
        .iter()
        .filter(|s| s["operationalStatus"] == "active")
        .count();
    assert_eq!(stats["activeStations"], active);
}

#[tokio::test]
async fn test_created_station_reads_back_identically() {
    let Some(app) = app() else { return };
    let (_, _, created) = station_fixture(&app).await;
    let (status, fetched) = call(
        &app,
        Method::GET,
        &format!("/api/enterprise/stations/{}", id_of(&created)),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched, created);
}

#[tokio::test]
async fn test_update_of_unknown_id_is_not_found() {
    let Some(app) = app() else { return };
    let missing = Uuid::new_v4();
    for (uri, body) in [
        (format!("/api/enterprise/stations/{missing}"), json!({ "name": "Renamed" })),
        (format!("/api/enterprise/bills/{missing}"), json!({ "notes": "late" })),
        (format!("/api/enterprise/work-orders/{missing}"), json!({ "title": "Recheck" })),
        (format!("/api/finance/accounts-payable/{missing}"), json!({ "vendorName": "Acme" })),
    ] {
        let (status, error) = call(&app, Method::PUT, &uri, Some(body)).await;
        assert_eq!(status, StatusCode::NOT_FOUND, "{uri}");
        assert!(error["error"].as_str().unwrap().ends_with("not found"));
    }
}

#[tokio::test]
async fn test_work_order_update_rejects_asset_of_other_station() {
    let Some(app) = app() else { return };
    let (country, territory, home) = station_fixture(&app).await;
    let other = new_station(&app, &country, &territory, None, "active").await;

    let (status, foreign_asset) = call(
        &app,
        Method::POST,
        "/api/enterprise/assets",
        Some(json!({
            "stationId": id_of(&other),
            "assetTag": format!("DRY-{}", suffix()),
            "assetType": "dryer",
            "name": "Blower dryer",
            "currency": "ILS"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, order) = call(
        &app,
        Method::POST,
        "/api/enterprise/work-orders",
        Some(json!({
            "stationId": id_of(&home),
            "title": "Dryer makes noise",
            "currency": "ILS"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let uri = format!("/api/enterprise/work-orders/{}", id_of(&order));

    let (status, _) = call(
        &app,
        Method::PUT,
        &uri,
        Some(json!({ "assetId": id_of(&foreign_asset) })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, unchanged) = call(&app, Method::GET, &uri, None).await;
    assert!(unchanged["assetId"].is_null());
}

#[tokio::test]
async fn test_telemetry_alerts_and_resolution_restore_health() {
    let Some(app) = app() else { return };
    let (_, _, station) = station_fixture(&app).await;
    let station_id = id_of(&station);
    let reading = json!({
        "stationId": station_id,
        "waterPressurePsi": 45.0,
        "shampooLevelPercent": 5.0,
        "isOnline": true
    });

    let (status, ingested) = call(&app, Method::POST, "/api/enterprise/telemetry", Some(reading.clone())).await;
    assert_eq!(status, StatusCode::CREATED);
    let opened = ingested["alertsOpened"].as_array().unwrap().clone();
    assert_eq!(opened.len(), 1);
    assert_eq!(opened[0]["alertType"], "low_supplies");
    assert_eq!(ingested["healthStatus"], "warning");

    let (status, repeated) = call(&app, Method::POST, "/api/enterprise/telemetry", Some(reading)).await;
    assert_eq!(status, StatusCode::CREATED);
    assert!(repeated["alertsOpened"].as_array().unwrap().is_empty());

    let (_, degraded) = call(&app, Method::GET, &format!("/api/enterprise/stations/{station_id}"), None).await;
    assert_eq!(degraded["healthStatus"], "warning");

    let (status, resolved) = call(
        &app,
        Method::POST,
        &format!("/api/enterprise/alerts/{}/resolve", id_of(&opened[0])),
        Some(json!({ "resolutionNotes": "Refilled shampoo tank" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(resolved["status"], "resolved");

    let (_, healthy) = call(&app, Method::GET, &format!("/api/enterprise/stations/{station_id}"), None).await;
    assert_eq!(healthy["healthStatus"], "healthy");
}
