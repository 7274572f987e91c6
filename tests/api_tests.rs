//! HTTP API 集成测试
//!
//! 覆盖单表路由、analytics、dashboard、health 与看板页面。

mod common;

use std::sync::Arc;

use actix_web::http::StatusCode;
use actix_web::test::{self, TestRequest};
use actix_web::{App, web};
use serde_json::{Value, json};

use funnelboard::api::middleware::{REQUEST_ID_HEADER, RequestIdMiddleware};
use funnelboard::api::services::{AppStartTime, configure_routes};
use funnelboard::config::RoutesConfig;
use funnelboard::services::{DashboardService, DashboardSettings};
use funnelboard::storage::{Table, UnconfiguredStore};

use common::*;

// =============================================================================
// 测试环境
// =============================================================================

fn sample_store() -> MemoryStore {
    MemoryStore {
        discounts: vec![
            contact("D1", Some("Dana"), Some("dana@example.com"), None),
            contact("D2", Some("Dmitri"), None, Some("555-0102")),
            contact("SHARED", Some("From Discount"), Some("d@example.com"), None),
        ],
        referrals: vec![
            contact("R1", Some("Rita"), Some("rita@example.com"), Some("555-0199")),
            contact("SHARED", Some("From Referral"), None, None),
        ],
        opens: vec![
            open("D1", at(2024, 3, 10, 12, 0, 0)),
            open("D1", at(2024, 3, 10, 11, 0, 0)),
            open("R1", at(2024, 3, 9, 8, 30, 0)),
            open("R1", at(2024, 3, 9, 8, 20, 0)),
            open("SHARED", at(2024, 3, 9, 8, 0, 0)),
            open("GHOST", at(2024, 3, 8, 7, 0, 0)),
        ],
        input_events: vec![
            input_event(1, "D1", "email", "dana@example.com", at(2024, 3, 10, 12, 1, 0)),
            input_event(2, "D1", "phone", "555", at(2024, 3, 10, 12, 2, 0)),
            input_event(3, "R1", "name", "Rita", at(2024, 3, 9, 8, 31, 0)),
        ],
        fields_filled: vec![filled(1, "D1", at(2024, 3, 10, 12, 3, 0))],
        submissions: vec![submission(1, "D1", at(2024, 3, 10, 12, 5, 0)), {
            let mut s = submission(2, "WALKIN", at(2024, 3, 9, 9, 0, 0));
            s.name = Some("Walk In".to_string());
            s.submission_snapshot = Some(Value::String(r#"{"move_size":"2br","budget":900}"#.to_string()));
            s
        }],
        ..Default::default()
    }
}

fn app_data(service: DashboardService) -> (web::Data<DashboardService>, web::Data<AppStartTime>) {
    (
        web::Data::new(service),
        web::Data::new(AppStartTime {
            start_datetime: chrono::Utc::now(),
        }),
    )
}

macro_rules! init_app {
    ($service:expr) => {{
        let (service, start) = app_data($service);
        let routes = RoutesConfig::default();
        test::init_service(
            App::new()
                .wrap(RequestIdMiddleware)
                .app_data(service)
                .app_data(start)
                .configure(move |cfg| configure_routes(cfg, &routes)),
        )
        .await
    }};
}

macro_rules! get_json {
    ($app:expr, $uri:expr) => {{
        let resp = test::call_service(&$app, TestRequest::get().uri($uri).to_request()).await;
        let status = resp.status();
        let body: Value = test::read_body_json(resp).await;
        (status, body)
    }};
}

// =============================================================================
// 单表路由
// =============================================================================

#[actix_rt::test]
async fn test_discount_returns_rows_unchanged() {
    let app = init_app!(service(sample_store()));
    let (status, body) = get_json!(app, "/api/discount");

    assert_eq!(status, StatusCode::OK);
    let rows = body.as_array().unwrap();
    assert_eq!(rows.len(), 3);
    assert_eq!(rows[0]["code"], "D1");
    assert_eq!(rows[1]["email"], Value::Null);
    assert!(rows[0].get("source").is_none());
}

#[actix_rt::test]
async fn test_code_opens_are_enriched() {
    let app = init_app!(service(sample_store()));
    let (status, body) = get_json!(app, "/api/code_opens");

    assert_eq!(status, StatusCode::OK);
    let rows = body.as_array().unwrap();
    assert_eq!(rows.len(), 6);

    let d1 = &rows[0];
    assert_eq!(d1["code"], "D1");
    assert_eq!(d1["name"], "Dana");
    assert_eq!(d1["phone"], "Unknown");
    assert_eq!(d1["source"], "discount");

    // referral 后写入，覆盖同 code 的 discount
    let shared = rows.iter().find(|r| r["code"] == "SHARED").unwrap();
    assert_eq!(shared["name"], "From Referral");
    assert_eq!(shared["email"], "Unknown");
    assert_eq!(shared["source"], "referral");

    let ghost = rows.iter().find(|r| r["code"] == "GHOST").unwrap();
    assert_eq!(ghost["name"], "Unknown");
    assert_eq!(ghost["source"], "Unknown");
}

#[actix_rt::test]
async fn test_input_events_keep_event_fields() {
    let app = init_app!(service(sample_store()));
    let (_, body) = get_json!(app, "/api/code_input_events");

    let first = &body[0];
    assert_eq!(first["id"], 1);
    assert_eq!(first["field_name"], "email");
    assert_eq!(first["input_value"], "dana@example.com");
    assert_eq!(first["source"], "discount");
}

#[actix_rt::test]
async fn test_form_submissions_merge_direct_columns() {
    let app = init_app!(service(sample_store()));
    let (status, body) = get_json!(app, "/api/form_submissions");

    assert_eq!(status, StatusCode::OK);
    let walk_in = body
        .as_array()
        .unwrap()
        .iter()
        .find(|r| r["code"] == "WALKIN")
        .unwrap();

    assert_eq!(walk_in["name"], "Walk In");
    assert_eq!(walk_in["email"], "Unknown");
    assert_eq!(walk_in["source"], "submission");

    let data = &walk_in["submission_data"];
    assert_eq!(data["budget"], 900);
    assert_eq!(data["name"], "Walk In");
    // 直接列优先于快照，缺失时为 null
    assert_eq!(data["move_size"], Value::Null);
}

#[actix_rt::test]
async fn test_table_failure_returns_error_body() {
    let app = init_app!(service(sample_store().failing(Table::CodeOpens)));
    let (status, body) = get_json!(app, "/api/code_opens");

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body["error"].as_str().unwrap().contains("code_opens"));
}

#[actix_rt::test]
async fn test_reference_failure_degrades_to_unknown() {
    let store = sample_store()
        .failing(Table::Discount)
        .failing(Table::Referral);
    let app = init_app!(service(store));
    let (status, body) = get_json!(app, "/api/code_opens");

    assert_eq!(status, StatusCode::OK);
    assert!(
        body.as_array()
            .unwrap()
            .iter()
            .all(|r| r["name"] == "Unknown" && r["source"] == "Unknown")
    );
}

// =============================================================================
// analytics
// =============================================================================

#[actix_rt::test]
async fn test_analytics_summary() {
    let app = init_app!(service(sample_store()));
    let (status, body) = get_json!(app, "/api/analytics");

    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body["totals"],
        json!({
            "totalGeneratedCodes": 5,
            "totalDiscountCodes": 3,
            "totalReferralCodes": 2,
            "totalUniqueOpens": 4,
            "totalOpensCount": 6,
        })
    );
    let conversions = &body["conversions"];
    assert_eq!(conversions["discountOpens"], 2);
    assert_eq!(conversions["referralOpens"], 2);
    assert_eq!(conversions["discountConversionRate"], "66.7%");
    assert_eq!(conversions["referralConversionRate"], "100.0%");
    assert_eq!(conversions["overallConversionRate"], "80.0%");
    assert_eq!(conversions["opensPerCode"], "1.5");
}

#[actix_rt::test]
async fn test_analytics_failure_hides_details() {
    let app = init_app!(service(sample_store().failing(Table::Referral)));
    let (status, body) = get_json!(app, "/api/analytics");

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body, json!({ "error": "Failed to fetch analytics" }));
}

// =============================================================================
// dashboard
// =============================================================================

#[actix_rt::test]
async fn test_dashboard_rejects_invalid_date() {
    let app = init_app!(service(sample_store()));
    let (status, body) = get_json!(app, "/api/dashboard?from=2024-13-40");

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("2024-13-40"));
}

#[actix_rt::test]
async fn test_dashboard_rejects_malformed_limit() {
    let app = init_app!(service(sample_store()));
    let (status, body) = get_json!(app, "/api/dashboard?limit=many");

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());
}

#[actix_rt::test]
async fn test_dashboard_reports_partial_failures() {
    let app = init_app!(service(sample_store().failing(Table::CodeInputEvents)));
    let (status, body) = get_json!(app, "/api/dashboard");

    assert_eq!(status, StatusCode::OK);
    assert!(body["errors"]["inputEvents"].is_string());
    assert!(body["errors"].get("opens").is_none());
    assert!(body["tables"]["inputEvents"]["error"].is_string());
    assert_eq!(body["metrics"]["totalOpens"], 6);
    assert_eq!(body["metrics"]["totalInputEvents"], 0);
}

#[actix_rt::test]
async fn test_dashboard_filters_by_date_and_code() {
    let app = init_app!(service(sample_store()));
    let (status, body) =
        get_json!(app, "/api/dashboard?from=2024-03-10&to=2024-03-10&code=d");

    assert_eq!(status, StatusCode::OK);
    let metrics = &body["metrics"];
    assert_eq!(metrics["totalOpens"], 2);
    assert_eq!(metrics["uniqueCodes"], 1);
    assert_eq!(metrics["totalSubmissions"], 1);
    assert_eq!(metrics["openToFilledRate"], "50.0");
    assert_eq!(metrics["filledToSubmitRate"], "100.0");
    assert_eq!(body["completion"]["ratePercent"], "100.0");
    assert_eq!(body["filters"]["code"], "d");
}

#[actix_rt::test]
async fn test_dashboard_limit_truncates_rows_but_not_totals() {
    let app = init_app!(service(sample_store()));
    let (_, body) = get_json!(app, "/api/dashboard?limit=1");

    let opens = &body["tables"]["opens"];
    assert_eq!(opens["rows"].as_array().unwrap().len(), 1);
    assert_eq!(opens["total"], 6);
}

// =============================================================================
// health / 页面 / 中间件
// =============================================================================

#[actix_rt::test]
async fn test_health_reports_backend() {
    let app = init_app!(service(sample_store()));
    let (status, body) = get_json!(app, "/health");

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["backend"], "memory");
    assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
}

#[actix_rt::test]
async fn test_health_unconfigured_is_unavailable() {
    let store = Arc::new(UnconfiguredStore::new(vec!["datastore.url"]));
    let app = init_app!(DashboardService::new(store, DashboardSettings::default()));

    let (status, body) = get_json!(app, "/health");
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["status"], "unconfigured");

    let (status, body) = get_json!(app, "/api/discount");
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body["error"].as_str().unwrap().contains("datastore.url"));
}

#[actix_rt::test]
async fn test_liveness() {
    let app = init_app!(service(MemoryStore::default()));
    let resp = test::call_service(&app, TestRequest::get().uri("/health/live").to_request()).await;
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);
}

#[actix_rt::test]
async fn test_index_page_is_served() {
    let app = init_app!(service(MemoryStore::default()));
    let resp = test::call_service(&app, TestRequest::get().uri("/").to_request()).await;

    assert_eq!(resp.status(), StatusCode::OK);
    let body = test::read_body(resp).await;
    let html = String::from_utf8_lossy(&body);
    assert!(html.contains("Funnelboard"));
    assert!(!html.contains("%API_PREFIX%"));
}

#[actix_rt::test]
async fn test_request_id_is_propagated() {
    let app = init_app!(service(MemoryStore::default()));

    let req = TestRequest::get()
        .uri("/health/live")
        .insert_header((REQUEST_ID_HEADER, "edge-42"))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(
        resp.headers()
            .get(REQUEST_ID_HEADER)
            .and_then(|v| v.to_str().ok()),
        Some("edge-42")
    );

    let resp = test::call_service(&app, TestRequest::get().uri("/health/live").to_request()).await;
    let generated = resp.headers().get(REQUEST_ID_HEADER).unwrap().to_str().unwrap();
    assert_eq!(generated.len(), 36);
}
