//! # Integration Tests for fuelc-api
//!
//! Drives the full router in-process: compliance records, banking,
//! transfers, pooling, the route catalogue, the error envelope and the
//! OpenAPI document. The compliance year is pinned to 2026 so expiry and
//! future-year rules are deterministic, and the FUELEU-2023 schedule is
//! selected so every year 2025..=2050 has a target.

use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;

use fuelc_api::state::{AppConfig, AppState};
use fuelc_compliance::TargetSchedule;
use fuelc_core::ComplianceYear;

/// Helper: build the test app with no database, the year pinned to 2026 and
/// the period schedule.
fn test_app() -> axum::Router {
    let config = AppConfig {
        compliance_year: Some(ComplianceYear::new(2026).unwrap()),
        schedule: TargetSchedule::fueleu_2023(),
        ..AppConfig::default()
    };
    fuelc_api::app(AppState::with_config(config, None))
}

/// Helper: read response body as string.
async fn body_string(response: axum::http::Response<Body>) -> String {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    String::from_utf8(bytes.to_vec()).unwrap()
}

/// Helper: send a request and decode the JSON response.
async fn send(app: &axum::Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let request = match body {
        Some(body) => Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => Request::builder()
            .method(method)
            .uri(uri)
            .body(Body::empty())
            .unwrap(),
    };
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let text = body_string(response).await;
    let value = serde_json::from_str(&text).unwrap_or(Value::String(text));
    (status, value)
}

/// Helper: record a ship-year and assert it was stored.
async fn record(app: &axum::Router, ship: &str, year: i64, intensity: f64, fuel: f64) -> Value {
    let (status, body) = send(
        app,
        Method::POST,
        "/v1/compliance/records",
        Some(json!({
            "ship_id": ship,
            "year": year,
            "actual_intensity": intensity,
            "fuel_consumption": fuel,
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "record failed: {body}");
    body
}

// -- Health Probes ------------------------------------------------------------

#[tokio::test]
async fn test_liveness_endpoint() {
    let app = test_app();
    let response = app
        .oneshot(
            Request::builder()
                .uri("/health/liveness")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_string(response).await, "ok");
}

#[tokio::test]
async fn test_readiness_without_database() {
    let app = test_app();
    let response = app
        .oneshot(
            Request::builder()
                .uri("/health/readiness")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_string(response).await, "ready");
}

// -- Compliance ---------------------------------------------------------------

#[tokio::test]
async fn test_record_then_read_balance() {
    let app = test_app();
    let stored = record(&app, "IMO9321483", 2025, 88.3368, 1.0).await;
    assert_eq!(stored["cb"], "41000.00");
    assert_eq!(stored["surplus"], true);
    assert_eq!(stored["schedule_version"], "FUELEU-2023");

    let (status, body) = send(&app, Method::GET, "/v1/compliance/cb/IMO9321483/2025", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["cb"], "41000.00");
    assert_eq!(body["year"], 2025);

    let (status, body) = send(&app, Method::GET, "/v1/compliance/records?ship_id=IMO9321483", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_default_schedule_has_anchor_years_only() {
    let config = AppConfig {
        compliance_year: Some(ComplianceYear::new(2026).unwrap()),
        ..AppConfig::default()
    };
    let app = fuelc_api::app(AppState::with_config(config, None));

    let stored = record(&app, "S1", 2030, 86.96, 1.0).await;
    assert_eq!(stored["schedule_version"], "ANCHORS-V0");
    assert_eq!(stored["target_intensity"], 87.96);
    assert_eq!(stored["cb"], "41000.00");

    let (status, body) = send(
        &app,
        Method::POST,
        "/v1/compliance/records",
        Some(json!({
            "ship_id": "S1",
            "year": 2027,
            "actual_intensity": 88.0,
            "fuel_consumption": 1.0,
        })),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"]["code"], "UNSUPPORTED_YEAR");
}

#[tokio::test]
async fn test_missing_record_is_404() {
    let app = test_app();
    let (status, body) = send(&app, Method::GET, "/v1/compliance/cb/NOPE/2025", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "RECORD_NOT_FOUND");
}

#[tokio::test]
async fn test_year_before_window_is_422() {
    let app = test_app();
    let (status, body) = send(
        &app,
        Method::POST,
        "/v1/compliance/records",
        Some(json!({
            "ship_id": "S1",
            "year": 2024,
            "actual_intensity": 88.0,
            "fuel_consumption": 1.0,
        })),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"]["code"], "UNSUPPORTED_YEAR");
}

#[tokio::test]
async fn test_malformed_json_is_rejected() {
    let app = test_app();
    let response = app
        .oneshot(
            Request::builder()
                .method(Method::POST)
                .uri("/v1/compliance/records")
                .header("content-type", "application/json")
                .body(Body::from("{not json"))
                .unwrap(),
        )
        .await
        .unwrap();
    assert!(response.status().is_client_error());
    let body: Value = serde_json::from_str(&body_string(response).await).unwrap();
    assert!(body["error"]["code"].is_string());
}

#[tokio::test]
async fn test_intensity_comparison() {
    let app = test_app();
    let (status, body) = send(
        &app,
        Method::POST,
        "/v1/compliance/comparison",
        Some(json!({
            "year": 2025,
            "baseline_intensity": 91.16,
            "comparison_intensity": 88.0,
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["compliant"], true);
    assert!(body["percent_diff"].as_f64().unwrap() < 0.0);
}

// -- Banking ------------------------------------------------------------------

#[tokio::test]
async fn test_bank_over_cap_is_409_with_limit() {
    let app = test_app();
    record(&app, "S1", 2025, 88.3368, 1.0).await;

    let (status, body) = send(
        &app,
        Method::POST,
        "/v1/banking/bank",
        Some(json!({ "ship_id": "S1", "year": 2025, "amount": "9000.00" })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["code"], "EXCEEDS_BANK_CAP");
    assert_eq!(body["error"]["details"]["cap"], "8200.00");
    assert_eq!(body["error"]["details"]["requested"], "9000.00");
}

#[tokio::test]
async fn test_bank_then_apply_to_deficit() {
    let app = test_app();
    record(&app, "S1", 2025, 88.3368, 1.0).await;
    record(&app, "S1", 2026, 90.3368, 1.0).await;

    let (status, deposit) = send(
        &app,
        Method::POST,
        "/v1/banking/bank",
        Some(json!({ "ship_id": "S1", "year": 2025, "amount": "8200.00" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(deposit["kind"], "DEPOSIT");

    let (status, withdrawal) = send(
        &app,
        Method::POST,
        "/v1/banking/apply",
        Some(json!({ "ship_id": "S1", "year": 2026, "amount": "5000.00" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(withdrawal["kind"], "WITHDRAWAL");
    assert_eq!(withdrawal["draws"][0]["source_year"], 2025);

    let (status, position) = send(&app, Method::GET, "/v1/compliance/adjusted-cb/S1/2026", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(position["raw_cb"], "-41000.00");
    assert_eq!(position["applied"], "5000.00");
    assert_eq!(position["adjusted_cb"], "-36000.00");

    let (_, balance) = send(&app, Method::GET, "/v1/banking/S1/balance", None).await;
    assert_eq!(balance["available_balance"], "3200.00");
}

#[tokio::test]
async fn test_apply_to_surplus_year_is_409() {
    let app = test_app();
    record(&app, "S1", 2025, 88.3368, 1.0).await;
    let (status, body) = send(
        &app,
        Method::POST,
        "/v1/banking/apply",
        Some(json!({ "ship_id": "S1", "year": 2025, "amount": "1.00" })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["code"], "NO_DEFICIT_TO_COVER");
}

#[tokio::test]
async fn test_transfer_moves_balance() {
    let app = test_app();
    record(&app, "S1", 2025, 88.3368, 1.0).await;
    send(
        &app,
        Method::POST,
        "/v1/banking/bank",
        Some(json!({ "ship_id": "S1", "year": 2025, "amount": "8200.00" })),
    )
    .await;

    let (status, entry) = send(
        &app,
        Method::POST,
        "/v1/banking/transfer",
        Some(json!({ "from_ship_id": "S1", "to_ship_id": "S2", "amount": "3000.00" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(entry["kind"], "TRANSFER");
    assert_eq!(entry["counterparty_ship_id"], "S2");

    let (_, sender) = send(&app, Method::GET, "/v1/banking/S1/balance", None).await;
    let (_, receiver) = send(&app, Method::GET, "/v1/banking/S2/balance", None).await;
    assert_eq!(sender["available_balance"], "5200.00");
    assert_eq!(receiver["available_balance"], "3000.00");

    let (status, entries) = send(&app, Method::GET, "/v1/banking/S2/entries", None).await;
    assert_eq!(status, StatusCode::OK);
    let entries = entries.as_array().unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0]["year"], 2025);
}

#[tokio::test]
async fn test_transfer_to_self_is_409() {
    let app = test_app();
    let (status, body) = send(
        &app,
        Method::POST,
        "/v1/banking/transfer",
        Some(json!({ "from_ship_id": "S1", "to_ship_id": "S1", "amount": "1.00" })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["code"], "SAME_SHIP_TRANSFER");
}

#[tokio::test]
async fn test_bad_amount_is_422() {
    let app = test_app();
    let (status, _) = send(
        &app,
        Method::POST,
        "/v1/banking/bank",
        Some(json!({ "ship_id": "S1", "year": 2025, "amount": "12.345" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn test_summary_reports_expiring_credits_and_utilization() {
    let config = AppConfig {
        compliance_year: Some(ComplianceYear::new(2028).unwrap()),
        schedule: TargetSchedule::fueleu_2023(),
        ..AppConfig::default()
    };
    let app = fuelc_api::app(AppState::with_config(config, None));
    record(&app, "S1", 2025, 88.3368, 1.0).await;
    record(&app, "S1", 2027, 88.3368, 1.0).await;
    for year in [2025, 2027] {
        let (status, _) = send(
            &app,
            Method::POST,
            "/v1/banking/bank",
            Some(json!({ "ship_id": "S1", "year": year, "amount": "4000.00" })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
    }
    send(
        &app,
        Method::POST,
        "/v1/banking/transfer",
        Some(json!({ "from_ship_id": "S1", "to_ship_id": "S2", "amount": "2000.00" })),
    )
    .await;

    let (status, summary) = send(&app, Method::GET, "/v1/banking/S1/summary", None).await;
    assert_eq!(status, StatusCode::OK);
    // 2025 credits are usable through 2028 and 2 000 of them were transferred.
    assert_eq!(summary["expiring_soon"], "2000.00");
    assert_eq!(summary["utilization_rate"], 25.0);

    let (status, expiring) = send(&app, Method::GET, "/v1/banking/S1/expiring", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(expiring.as_array().unwrap().len(), 1);
    assert_eq!(expiring[0]["source_year"], 2025);

    let (_, horizon) = send(&app, Method::GET, "/v1/banking/S1/expiring?within_years=3", None).await;
    assert_eq!(horizon.as_array().unwrap().len(), 2);

    let (status, _) = send(&app, Method::GET, "/v1/banking/S1/expiring?within_years=0", None).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

// -- Pooling ------------------------------------------------------------------

#[tokio::test]
async fn test_pool_conserves_total() {
    let app = test_app();
    record(&app, "A", 2025, 88.3368, 1.0).await;
    record(&app, "B", 2025, 90.3368, 0.5).await;

    let (status, pool) = send(
        &app,
        Method::POST,
        "/v1/pools",
        Some(json!({
            "year": 2025,
            "members": [{ "ship_id": "A" }, { "ship_id": "B" }],
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "pool failed: {pool}");
    assert_eq!(pool["total"], "20500.00");

    let members = pool["members"].as_array().unwrap();
    let after = |ship: &str| {
        members
            .iter()
            .find(|m| m["ship_id"] == ship)
            .map(|m| m["cb_after"].clone())
            .unwrap()
    };
    assert_eq!(after("A"), "20500.00");
    assert_eq!(after("B"), "0.00");

    let id = pool["pool_id"].as_str().unwrap().to_string();
    let (status, fetched) = send(&app, Method::GET, &format!("/v1/pools/{id}"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched["total"], "20500.00");

    let (_, position) = send(&app, Method::GET, "/v1/compliance/adjusted-cb/B/2025", None).await;
    assert_eq!(position["adjusted_cb"], "0.00");
    assert_eq!(position["pool_id"], id.as_str());
}

#[tokio::test]
async fn test_pool_with_negative_sum_is_409() {
    let app = test_app();
    record(&app, "A", 2025, 88.3368, 1.0).await;
    record(&app, "B", 2025, 91.3368, 1.0).await;
    let (status, body) = send(
        &app,
        Method::POST,
        "/v1/pools",
        Some(json!({
            "year": 2025,
            "members": [{ "ship_id": "A" }, { "ship_id": "B" }],
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["code"], "POOL_SUM_NEGATIVE");
}

#[tokio::test]
async fn test_pool_member_without_record_is_404() {
    let app = test_app();
    record(&app, "A", 2025, 90.3368, 1.0).await;
    let (status, body) = send(
        &app,
        Method::POST,
        "/v1/pools",
        Some(json!({
            "year": 2025,
            "members": [
                { "ship_id": "GHOST", "cb_before": "1000000.00" },
                { "ship_id": "A" },
            ],
        })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "RECORD_NOT_FOUND");

    let (_, pools) = send(&app, Method::GET, "/v1/pools", None).await;
    assert!(pools.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_pool_rejects_stated_balance_that_differs() {
    let app = test_app();
    record(&app, "A", 2025, 88.3368, 1.0).await;
    record(&app, "B", 2025, 90.3368, 0.5).await;
    let (status, body) = send(
        &app,
        Method::POST,
        "/v1/pools",
        Some(json!({
            "year": 2025,
            "members": [
                { "ship_id": "A", "cb_before": "-1000000.00" },
                { "ship_id": "B" },
            ],
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["code"], "CB_BEFORE_MISMATCH");
    assert_eq!(body["error"]["details"]["actual"], "41000.00");

    // The bank cap still derives from the stored record.
    let (status, body) = send(
        &app,
        Method::POST,
        "/v1/banking/bank",
        Some(json!({ "ship_id": "A", "year": 2025, "amount": "8200.01" })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["details"]["cap"], "8200.00");
}

#[tokio::test]
async fn test_oversized_amounts_are_422() {
    let app = test_app();
    let (status, _) = send(
        &app,
        Method::POST,
        "/v1/pools",
        Some(json!({
            "year": 2025,
            "members": [
                { "ship_id": "A", "cb_before": "50000000000000000" },
                { "ship_id": "B", "cb_before": "50000000000000000" },
            ],
        })),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let (status, _) = send(
        &app,
        Method::POST,
        "/v1/banking/bank",
        Some(json!({ "ship_id": "A", "year": 2025, "amount": "92233720368547758.07" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn test_single_member_pool_is_rejected() {
    let app = test_app();
    let (status, body) = send(
        &app,
        Method::POST,
        "/v1/pools",
        Some(json!({ "year": 2025, "members": [{ "ship_id": "A", "cb_before": "1.00" }] })),
    )
    .await;
    assert!(status.is_client_error());
    assert!(body["error"]["code"].is_string());
}

#[tokio::test]
async fn test_unknown_pool_is_404() {
    let app = test_app();
    let (status, body) = send(
        &app,
        Method::GET,
        "/v1/pools/00000000-0000-0000-0000-000000000000",
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "POOL_NOT_FOUND");
}

// -- Route Catalogue ----------------------------------------------------------

async fn add_route(app: &axum::Router, id: &str, vessel: &str, fuel: &str, year: i64, intensity: f64) -> (StatusCode, Value) {
    send(
        app,
        Method::POST,
        "/v1/routes",
        Some(json!({
            "route_id": id,
            "vessel_type": vessel,
            "fuel_type": fuel,
            "year": year,
            "ghg_intensity": intensity,
            "fuel_consumption": 5000.0,
            "distance": 12000.0,
            "total_emissions": 4500.0,
        })),
    )
    .await
}

#[tokio::test]
async fn test_route_catalogue_filters_and_baseline_comparison() {
    let app = test_app();
    for (id, vessel, fuel, year, intensity) in [
        ("R001", "Container", "HFO", 2025, 91.0),
        ("R002", "BulkCarrier", "LNG", 2025, 88.0),
        ("R003", "Tanker", "MGO", 2026, 93.5),
    ] {
        let (status, body) = add_route(&app, id, vessel, fuel, year, intensity).await;
        assert_eq!(status, StatusCode::CREATED, "add failed: {body}");
        assert_eq!(body["is_baseline"], false);
    }

    let (status, body) = add_route(&app, "R001", "Container", "HFO", 2025, 91.0).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["code"], "DUPLICATE_ROUTE");

    let (_, all) = send(&app, Method::GET, "/v1/routes", None).await;
    assert_eq!(all.as_array().unwrap().len(), 3);
    let (_, lng) = send(&app, Method::GET, "/v1/routes?fuel_type=LNG&year=2025", None).await;
    assert_eq!(lng.as_array().unwrap().len(), 1);
    assert_eq!(lng[0]["route_id"], "R002");
    let (_, tankers) = send(&app, Method::GET, "/v1/routes?vessel_type=Tanker", None).await;
    assert_eq!(tankers[0]["route_id"], "R003");

    let (status, body) = send(&app, Method::GET, "/v1/routes/comparison", None).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["code"], "BASELINE_NOT_SET");

    let (status, base) = send(&app, Method::POST, "/v1/routes/R001/baseline", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(base["is_baseline"], true);

    let (status, rows) = send(&app, Method::GET, "/v1/routes/comparison", None).await;
    assert_eq!(status, StatusCode::OK);
    let rows = rows.as_array().unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0]["comparison"]["route_id"], "R002");
    assert_eq!(rows[0]["compliant"], true);
    assert_eq!(rows[0]["target_intensity"], 89.3368);
    assert_eq!(rows[1]["compliant"], false);

    send(&app, Method::POST, "/v1/routes/R002/baseline", None).await;
    let (_, old) = send(&app, Method::GET, "/v1/routes/R001", None).await;
    assert_eq!(old["is_baseline"], false);
}

#[tokio::test]
async fn test_route_input_errors() {
    let app = test_app();
    let (status, _) = add_route(&app, "R001", "Ferry", "HFO", 2025, 91.0).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    let (status, body) = add_route(&app, "R001", "Container", "HFO", 2024, 91.0).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"]["code"], "UNSUPPORTED_YEAR");

    let (status, body) = send(&app, Method::GET, "/v1/routes/R404", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "ROUTE_NOT_FOUND");
    let (status, _) = send(&app, Method::POST, "/v1/routes/R404/baseline", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

// -- OpenAPI & Metrics --------------------------------------------------------

#[tokio::test]
async fn test_openapi_document_served() {
    let app = test_app();
    let (status, doc) = send(&app, Method::GET, "/openapi.json", None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(doc["paths"]["/v1/banking/bank"].is_object());
    assert!(doc["paths"]["/v1/pools"].is_object());
    assert!(doc["paths"]["/v1/routes/comparison"].is_object());
}

#[tokio::test]
async fn test_metrics_count_requests() {
    let app = test_app();
    send(&app, Method::GET, "/v1/compliance/cb/NOPE/2025", None).await;
    let (status, text) = send(&app, Method::GET, "/metrics", None).await;
    assert_eq!(status, StatusCode::OK);
    let text = text.as_str().unwrap();
    assert!(text.contains(
        r#"fuelc_http_errors_total{method="GET",path="/v1/compliance/cb/:ship_id/:year",status="404"} 1"#
    ));
    assert!(text.contains("fuelc_pools 0"));
    assert!(!text.contains("NOPE"), "raw path leaked into labels");
}
