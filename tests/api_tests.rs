//! HTTP API tests through the axum router

use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    Router,
};
use bptrack::db::Database;
use bptrack::models::{BloodPressureReading, MedicationDose};
use bptrack::web::{create_app, AppState};
use serde_json::{json, Value};
use tempfile::TempDir;
use tower::ServiceExt;

fn test_app() -> (TempDir, Database, Router) {
    let dir = tempfile::tempdir().unwrap();
    let db = Database::open(dir.path().join("api.db")).unwrap();
    let app = create_app(AppState::new(db.clone()));
    (dir, db, app)
}

async fn send(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, value)
}

fn seed(db: &Database) {
    db.with_conn(|conn| {
        BloodPressureReading::new("2024-01-01 08:00", Some(118), Some(76), Some(62)).insert_if_absent(conn)?;
        BloodPressureReading::new("2024-01-01 20:00", Some(125), None, None).insert_if_absent(conn)?;
        BloodPressureReading::new("2024-01-02 08:00", Some(130), Some(85), Some(70)).insert_if_absent(conn)?;
        MedicationDose::new("2024-01-01 08:00", "Candesartan", 8.0).insert(conn)?;
        Ok(())
    })
    .unwrap();
}

#[tokio::test]
async fn test_get_all_data() {
    let (_dir, db, app) = test_app();
    seed(&db);

    let (status, body) = send(&app, Method::GET, "/api/data/all", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["bp_readings"].as_array().unwrap().len(), 3);
    assert_eq!(body["bp_readings"][1], json!(["2024-01-01 20:00", 125, null, null]));
    assert_eq!(body["medications"], json!([["2024-01-01 08:00", "Candesartan", 8.0]]));
}

#[tokio::test]
async fn test_get_day_data() {
    let (_dir, db, app) = test_app();
    seed(&db);

    let (status, body) = send(&app, Method::GET, "/api/data/2024-01-02", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!({
            "bp_readings": [["2024-01-02 08:00", 130, 85, 70]],
            "medications": [],
        })
    );
}

#[tokio::test]
async fn test_unknown_day_is_empty() {
    let (_dir, _db, app) = test_app();

    let (status, body) = send(&app, Method::GET, "/api/data/2030-05-05", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"bp_readings": [], "medications": []}));
}

#[tokio::test]
async fn test_invalid_date_is_bad_request() {
    let (_dir, _db, app) = test_app();

    let (status, body) = send(&app, Method::GET, "/api/data/2024-13-40", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "bad_request");
    assert!(body["message"].as_str().unwrap().contains("2024-13-40"));
}

#[tokio::test]
async fn test_replace_day_round_trip() {
    let (_dir, db, app) = test_app();
    seed(&db);

    let payload = json!({
        "bp_readings": [
            {"datetime": "2024-01-01 07:30", "systolic": 121, "diastolic": 79, "heart_rate": 64},
            {"datetime": "2024-01-01 12:00", "systolic": 0, "diastolic": null},
        ],
        "medications": [
            {"datetime": "2024-01-01 07:30", "medication": "Metoprolol", "dosage": 25},
            {"datetime": "2024-01-01 07:30", "medication": "Candesartan", "dosage": 0},
        ],
    });

    let (status, body) = send(&app, Method::POST, "/api/data/2024-01-01", Some(payload)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"success": true}));

    let (_, day) = send(&app, Method::GET, "/api/data/2024-01-01", None).await;
    assert_eq!(
        day,
        json!({
            "bp_readings": [["2024-01-01 07:30", 121, 79, 64]],
            "medications": [["2024-01-01 07:30", "Metoprolol", 25.0]],
        })
    );

    // other dates are untouched
    let (_, other) = send(&app, Method::GET, "/api/data/2024-01-02", None).await;
    assert_eq!(other["bp_readings"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_replace_with_empty_body_clears_day() {
    let (_dir, db, app) = test_app();
    seed(&db);

    let (status, _) = send(&app, Method::POST, "/api/data/2024-01-01", Some(json!({}))).await;
    assert_eq!(status, StatusCode::OK);

    let (_, day) = send(&app, Method::GET, "/api/data/2024-01-01", None).await;
    assert_eq!(day, json!({"bp_readings": [], "medications": []}));
}

#[tokio::test]
async fn test_record_outside_day_is_rejected_and_nothing_changes() {
    let (_dir, db, app) = test_app();
    seed(&db);

    let payload = json!({
        "bp_readings": [{"datetime": "2024-01-02 09:00", "systolic": 120}],
    });
    let (status, body) = send(&app, Method::POST, "/api/data/2024-01-01", Some(payload)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "bad_request");

    let (_, day) = send(&app, Method::GET, "/api/data/2024-01-01", None).await;
    assert_eq!(day["bp_readings"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_unparseable_timestamp_is_rejected_and_nothing_changes() {
    let (_dir, db, app) = test_app();
    seed(&db);

    let payload = json!({
        "bp_readings": [{"datetime": "2024-01-01 garbage", "systolic": 120}],
    });
    let (status, body) = send(&app, Method::POST, "/api/data/2024-01-01", Some(payload)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "bad_request");

    let (_, day) = send(&app, Method::GET, "/api/data/2024-01-01", None).await;
    assert_eq!(day["bp_readings"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_replace_stores_canonical_timestamps() {
    let (_dir, _db, app) = test_app();

    let payload = json!({
        "bp_readings": [{"datetime": "2024-01-01 8:00", "systolic": 121, "diastolic": 79}],
        "medications": [{"datetime": "2024-01-01T09:05:30", "medication": "Aspirin", "dosage": 100.0}],
    });
    let (status, _) = send(&app, Method::POST, "/api/data/2024-01-01", Some(payload)).await;
    assert_eq!(status, StatusCode::OK);

    let (_, day) = send(&app, Method::GET, "/api/data/2024-01-01", None).await;
    assert_eq!(day["bp_readings"], json!([["2024-01-01 08:00", 121, 79, null]]));
    assert_eq!(day["medications"], json!([["2024-01-01 09:05:30", "Aspirin", 100.0]]));
}

#[tokio::test]
async fn test_malformed_body_is_bad_request() {
    let (_dir, _db, app) = test_app();

    let request = Request::builder()
        .method(Method::POST)
        .uri("/api/data/2024-01-01")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_pages_are_served() {
    let (_dir, _db, app) = test_app();

    for uri in ["/", "/edit"] {
        let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
        let response = app.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let html = String::from_utf8(bytes.to_vec()).unwrap();
        assert!(html.contains("<!DOCTYPE html>"));
    }
}
