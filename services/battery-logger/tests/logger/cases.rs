use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Request, StatusCode, header},
};
use battery_logger::{
    AppState, Variant, build_router,
    sheet::{Cell, CsvWorkbook, MemoryWorkbook},
};
use serde_json::{Value, json};
use std::sync::Arc;
use tower::util::ServiceExt; // for `oneshot`

const SHEET: &str = "Sheet1";

async fn memory_app(variant: Variant) -> (Router, MemoryWorkbook) {
    let book = MemoryWorkbook::new();
    book.add_sheet(SHEET).await;
    let app = build_router(AppState {
        workbook: Arc::new(book.clone()),
        sheet_name: SHEET.into(),
        variant,
    });
    (app, book)
}

async fn post(app: &Router, body: impl Into<Body>) -> Value {
    let resp = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/")
                .header("content-type", "application/json")
                .body(body.into())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(
        resp.headers()[header::CONTENT_TYPE],
        "application/json"
    );
    serde_json::from_slice(&to_bytes(resp.into_body(), 64 * 1024).await.unwrap()).unwrap()
}

async fn get(app: &Router, uri: &str) -> (StatusCode, String, String) {
    let resp = app
        .clone()
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = resp.status();
    let content_type = resp
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    let bytes = to_bytes(resp.into_body(), 64 * 1024).await.unwrap();
    (status, content_type, String::from_utf8(bytes.to_vec()).unwrap())
}

fn tag_body(name: &str, usage: i64) -> String {
    json!({
        "name": name,
        "uid": "04:A2:19:7C",
        "usageCount": usage,
        "totalTime": 10,
        "totalTimeFormatted": "10s",
    })
    .to_string()
}

#[tokio::test]
async fn tag_create_then_update() {
    let (app, book) = memory_app(Variant::Tag).await;

    let first = post(&app, tag_body("A", 1)).await;
    assert_eq!(first["status"], "success");
    assert_eq!(first["action"], "created");
    let rows = book.rows(SHEET).await.unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0][0], Cell::text("Battery Name"));
    assert_eq!(rows[1][0], Cell::text("A"));
    let Cell::Time(created_at) = rows[1][5] else {
        panic!("timestamp column should hold a time, got {:?}", rows[1][5]);
    };

    let second = post(&app, tag_body("A", 2)).await;
    assert_eq!(second["status"], "success");
    assert_eq!(second["action"], "updated");
    let rows = book.rows(SHEET).await.unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[1][2], Cell::Int(2));
    let Cell::Time(updated_at) = rows[1][5] else {
        panic!("timestamp column should hold a time");
    };
    assert!(updated_at >= created_at);
}

#[tokio::test]
async fn usage_variant_layout() {
    let (app, book) = memory_app(Variant::Usage).await;
    let body = json!({
        "battery_uuid": "7f3c-01",
        "battery_usage": "discharging",
        "battery_usage_count": 4,
        "total_time_used": 3600,
        "total_percentage_used": 37.5,
    })
    .to_string();

    let resp = post(&app, body).await;
    assert_eq!(resp["action"], "created");
    assert_eq!(resp["message"], "Data logged successfully");

    let rows = book.rows(SHEET).await.unwrap();
    assert_eq!(rows[0][1], Cell::text("Battery UUID"));
    assert!(matches!(rows[1][0], Cell::Time(_)));
    assert_eq!(
        rows[1][1..].to_vec(),
        vec![
            Cell::text("7f3c-01"),
            Cell::text("discharging"),
            Cell::Int(4),
            Cell::Int(3600),
            Cell::Float(37.5),
        ]
    );
}

#[tokio::test]
async fn distinct_keys_append_and_match_is_case_sensitive() {
    let (app, book) = memory_app(Variant::Tag).await;
    for name in ["Battery 1", "battery 1", "Battery 2"] {
        assert_eq!(post(&app, tag_body(name, 1)).await["action"], "created");
    }
    assert_eq!(post(&app, tag_body("Battery 2", 5)).await["action"], "updated");
    assert_eq!(book.rows(SHEET).await.unwrap().len(), 4);
}

#[tokio::test]
async fn malformed_json_is_reported_and_store_untouched() {
    let (app, book) = memory_app(Variant::Tag).await;
    let resp = post(&app, "{\"name\": \"A\", ").await;
    assert_eq!(resp["status"], "error");
    assert!(!resp["message"].as_str().unwrap().is_empty());
    assert!(resp.get("action").is_none());
    assert!(book.rows(SHEET).await.unwrap().is_empty());
}

#[tokio::test]
async fn missing_key_field_is_an_error() {
    let (app, book) = memory_app(Variant::Usage).await;
    let resp = post(&app, json!({"battery_usage": "x"}).to_string()).await;
    assert_eq!(resp["status"], "error");
    assert!(resp["message"].as_str().unwrap().contains("battery_uuid"));
    assert!(book.rows(SHEET).await.unwrap().is_empty());
}

#[tokio::test]
async fn missing_sheet_is_an_error_envelope() {
    let app = build_router(AppState {
        workbook: Arc::new(MemoryWorkbook::new()),
        sheet_name: SHEET.into(),
        variant: Variant::Tag,
    });
    let resp = post(&app, tag_body("A", 1)).await;
    assert_eq!(resp["status"], "error");
    assert_eq!(resp["message"], "sheet not found: Sheet1");
}

#[tokio::test]
async fn clear_keeps_only_header() {
    for count in [0usize, 1, 5] {
        let (app, book) = memory_app(Variant::Tag).await;
        post(&app, tag_body("seed", 0)).await;
        for i in 1..count {
            post(&app, tag_body(&format!("B{i}"), 1)).await;
        }
        if count == 0 {
            get(&app, "/?action=clear").await;
        }

        let (status, content_type, text) = get(&app, "/?action=clear").await;
        assert_eq!(status, StatusCode::OK);
        assert!(content_type.starts_with("text/plain"));
        assert_eq!(text, "Sheet cleared");

        let rows = book.rows(SHEET).await.unwrap();
        assert_eq!(rows.len(), 1, "{count} data rows");
        assert_eq!(rows[0][0], Cell::text("Battery Name"));
    }
}

#[tokio::test]
async fn clear_on_missing_sheet_is_noop() {
    let app = build_router(AppState {
        workbook: Arc::new(MemoryWorkbook::new()),
        sheet_name: SHEET.into(),
        variant: Variant::Tag,
    });
    let (status, _, text) = get(&app, "/?action=clear").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(text, "Sheet cleared");
}

#[tokio::test]
async fn status_without_action_does_not_touch_store() {
    let (app, book) = memory_app(Variant::Tag).await;
    post(&app, tag_body("A", 1)).await;

    for uri in ["/", "/?action=", "/?action=reboot"] {
        let (status, content_type, text) = get(&app, uri).await;
        assert_eq!(status, StatusCode::OK);
        assert!(content_type.starts_with("text/plain"));
        assert_eq!(text, "Battery tracker ready");
    }
    assert_eq!(book.rows(SHEET).await.unwrap().len(), 2);
}

#[tokio::test]
async fn usage_status_is_json() {
    let (app, _book) = memory_app(Variant::Usage).await;
    let (status, content_type, text) = get(&app, "/").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(content_type, "application/json");
    let v: Value = serde_json::from_str(&text).unwrap();
    assert_eq!(v["status"], "online");
    assert_eq!(v["message"], "Battery Logger API is running");
}

#[tokio::test]
async fn list_reports_health() {
    let (app, _book) = memory_app(Variant::Tag).await;
    post(&app, tag_body("fresh", 2)).await;
    post(&app, tag_body("tired", 39)).await;
    post(&app, tag_body("worn", 55)).await;

    let (status, _, text) = get(&app, "/?action=list").await;
    assert_eq!(status, StatusCode::OK);
    let v: Value = serde_json::from_str(&text).unwrap();
    let list = v.as_array().unwrap();
    assert_eq!(list.len(), 3);
    assert_eq!(list[0]["id"], "fresh");
    assert_eq!(list[0]["health"], "good");
    assert_eq!(list[1]["health"], "warning");
    assert_eq!(list[2]["usage_count"], 55);
    assert_eq!(list[2]["health"], "critical");
}

#[tokio::test]
async fn healthz_ok_with_request_id() {
    let (app, _book) = memory_app(Variant::Usage).await;
    let resp = app
        .oneshot(
            Request::builder()
                .uri("/healthz")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert!(resp.headers().contains_key("x-request-id"));
}

#[tokio::test]
async fn csv_store_end_to_end() {
    let dir = tempfile::tempdir().unwrap();
    let book = CsvWorkbook::new(dir.path());
    book.ensure_sheet(SHEET).await.unwrap();
    let app = build_router(AppState {
        workbook: Arc::new(book),
        sheet_name: SHEET.into(),
        variant: Variant::Tag,
    });

    assert_eq!(post(&app, tag_body("A", 1)).await["action"], "created");
    assert_eq!(post(&app, tag_body("A", 2)).await["action"], "updated");
    assert_eq!(post(&app, tag_body("B", 1)).await["action"], "created");

    let text = std::fs::read_to_string(dir.path().join("Sheet1.csv")).unwrap();
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines.len(), 3);
    assert!(lines[0].starts_with("Battery Name,NFC UID,Usage Count"));
    assert!(lines[1].starts_with("A,04:A2:19:7C,2,10,10s,"));

    get(&app, "/?action=clear").await;
    let text = std::fs::read_to_string(dir.path().join("Sheet1.csv")).unwrap();
    assert_eq!(text.lines().count(), 1);
}

async fn csv_app(dir: &std::path::Path, variant: Variant) -> Router {
    let book = CsvWorkbook::new(dir);
    book.ensure_sheet(SHEET).await.unwrap();
    build_router(AppState {
        workbook: Arc::new(book),
        sheet_name: SHEET.into(),
        variant,
    })
}

#[tokio::test]
async fn csv_numeric_looking_key_updates_in_place() {
    let dir = tempfile::tempdir().unwrap();
    let app = csv_app(dir.path(), Variant::Tag).await;

    assert_eq!(post(&app, tag_body("007", 1)).await["action"], "created");
    assert_eq!(post(&app, tag_body("007", 2)).await["action"], "updated");
    assert_eq!(post(&app, tag_body("7", 1)).await["action"], "created");

    let text = std::fs::read_to_string(dir.path().join("Sheet1.csv")).unwrap();
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines.len(), 3);
    assert!(lines[1].starts_with("007,04:A2:19:7C,2,"));
    assert!(lines[2].starts_with("7,04:A2:19:7C,1,"));
}

#[tokio::test]
async fn csv_text_payloads_survive_later_writes() {
    let dir = tempfile::tempdir().unwrap();
    let app = csv_app(dir.path(), Variant::Tag).await;

    let body = json!({
        "name": "X",
        "uid": "0012",
        "usageCount": 1,
        "totalTime": 1,
        "totalTimeFormatted": "1.50",
    })
    .to_string();
    post(&app, body).await;
    post(&app, tag_body("Y", 1)).await;
    post(&app, tag_body("Y", 2)).await;

    let text = std::fs::read_to_string(dir.path().join("Sheet1.csv")).unwrap();
    assert!(
        text.lines().nth(1).unwrap().starts_with("X,0012,1,1,1.50,"),
        "{text}"
    );
}

#[tokio::test]
async fn csv_malformed_body_leaves_file_untouched() {
    let dir = tempfile::tempdir().unwrap();
    let app = csv_app(dir.path(), Variant::Tag).await;
    post(&app, tag_body("A", 1)).await;
    let before = std::fs::read(dir.path().join("Sheet1.csv")).unwrap();

    let resp = post(&app, "not json").await;
    assert_eq!(resp["status"], "error");
    let resp = post(&app, json!({"uid": "no name"}).to_string()).await;
    assert_eq!(resp["status"], "error");

    let after = std::fs::read(dir.path().join("Sheet1.csv")).unwrap();
    assert_eq!(before, after);
}

#[tokio::test]
async fn loosely_typed_fields_are_logged_as_sent() {
    let (app, book) = memory_app(Variant::Tag).await;
    let body = json!({
        "name": "A",
        "uid": 4660,
        "usageCount": 2.0,
        "totalTime": "10",
    })
    .to_string();

    let resp = post(&app, body).await;
    assert_eq!(resp["status"], "success");
    assert_eq!(resp["action"], "created");

    let rows = book.rows(SHEET).await.unwrap();
    assert_eq!(
        rows[1][..5].to_vec(),
        vec![
            Cell::text("A"),
            Cell::Int(4660),
            Cell::Int(2),
            Cell::text("10"),
            Cell::text(""),
        ]
    );
}

#[tokio::test]
async fn odd_queries_get_ready_message() {
    let (app, book) = memory_app(Variant::Tag).await;
    post(&app, tag_body("A", 1)).await;

    for uri in ["/?action=clear&action=x", "/?action=%ZZ", "/?=&&action"] {
        let (status, _, text) = get(&app, uri).await;
        assert_eq!(status, StatusCode::OK, "{uri}");
        assert_eq!(text, "Battery tracker ready", "{uri}");
    }
    assert_eq!(book.rows(SHEET).await.unwrap().len(), 2);

    let (_, _, text) = get(&app, "/?action=clear&action=clear").await;
    assert_eq!(text, "Sheet cleared");
    assert_eq!(book.rows(SHEET).await.unwrap().len(), 1);
}
