use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use axum::Router;
use chrono::{Days, Local, NaiveDate};
use packwise_api::{build_app, router, ApiState, AppConfig};
use packwise_storage::{MemoryStore, Store};
use serde_json::{json, Value};
use tower::ServiceExt;

const API_KEY: &str = "test-packwise-key";

fn test_config() -> AppConfig {
    AppConfig {
        api_key: API_KEY.to_string(),
        ..AppConfig::default()
    }
}

fn days_from_today(days: u64) -> NaiveDate {
    Local::now()
        .date_naive()
        .checked_add_days(Days::new(days))
        .unwrap()
}

fn trip_json(id: &str, days_ahead: u64) -> Value {
    json!({
        "id": id,
        "name": "Patagonia trek",
        "destination": "El Chaltén",
        "start_date": days_from_today(days_ahead),
        "end_date": days_from_today(days_ahead + 9),
        "packing_list": [
            { "id": "1", "name": "Down jacket", "category": "Clothing" },
            { "id": "2", "name": "Merino base layer", "category": "Clothing" },
            { "id": "3", "name": "Trekking poles", "category": "Gear" },
            { "id": "4", "name": "Passport", "category": "Documents", "essential": true },
            { "id": "5", "name": "Headlamp", "category": "Gear", "packed": true }
        ]
    })
}

fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .header("x-api-key", API_KEY)
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn empty_request(method: &str, uri: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("x-api-key", API_KEY)
        .body(Body::empty())
        .unwrap()
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let parsed = if body.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&body).unwrap()
    };
    (status, parsed)
}

fn scheduled_ids(scheduled: &Value) -> Vec<String> {
    scheduled
        .as_array()
        .unwrap()
        .iter()
        .map(|entry| entry["id"].as_str().unwrap().to_string())
        .collect()
}

#[tokio::test]
async fn health_is_public() {
    let app = build_app(test_config()).await.expect("app should build");

    let response = app
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn reminder_routes_require_api_key() {
    let app = build_app(test_config()).await.expect("app should build");

    let request = Request::builder()
        .method("GET")
        .uri("/v1/reminders/scheduled")
        .body(Body::empty())
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn rejects_trip_ending_before_it_starts() {
    let app = build_app(test_config()).await.expect("app should build");

    let mut trip = trip_json("bad", 10);
    trip["end_date"] = json!(days_from_today(2));

    let (status, body) = send(&app, json_request("POST", "/v1/trips", trip)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "invalid_trip");
}

#[tokio::test]
async fn preview_does_not_touch_the_gateway() {
    let app = build_app(test_config()).await.expect("app should build");
    send(&app, json_request("POST", "/v1/trips", trip_json("patagonia", 10))).await;

    let (status, reminders) = send(
        &app,
        json_request(
            "POST",
            "/v1/reminders/preview",
            json!({ "trip_id": "patagonia", "is_premium": true }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let types = reminders
        .as_array()
        .unwrap()
        .iter()
        .map(|reminder| reminder["type"].as_str().unwrap().to_string())
        .collect::<Vec<_>>();
    assert_eq!(
        types,
        vec!["packing", "weather", "essentials", "final-check", "final-check"]
    );

    let (_, scheduled) = send(&app, empty_request("GET", "/v1/reminders/scheduled")).await;
    assert!(scheduled_ids(&scheduled).is_empty());
}

#[tokio::test]
async fn sync_disable_and_cancel_lifecycle() {
    let app = build_app(test_config()).await.expect("app should build");
    send(&app, json_request("POST", "/v1/trips", trip_json("patagonia", 10))).await;
    send(&app, json_request("POST", "/v1/trips", trip_json("lofoten", 20))).await;

    let (status, outcome) = send(
        &app,
        json_request(
            "POST",
            "/v1/trips/patagonia/reminders/sync",
            json!({ "is_premium": true }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(outcome["scheduled"].as_array().unwrap().len(), 5);
    assert_eq!(outcome["cancelled"], 0);

    let (_, outcome) = send(
        &app,
        json_request("POST", "/v1/trips/lofoten/reminders/sync", json!({})),
    )
    .await;
    assert_eq!(
        outcome["scheduled"],
        json!(["lofoten-essentials-0", "lofoten-essentials-1"])
    );

    // Re-sync replaces rather than duplicates.
    let (_, outcome) = send(
        &app,
        json_request(
            "POST",
            "/v1/trips/patagonia/reminders/sync",
            json!({ "is_premium": true }),
        ),
    )
    .await;
    assert_eq!(outcome["cancelled"], 5);
    let (_, scheduled) = send(&app, empty_request("GET", "/v1/reminders/scheduled")).await;
    assert_eq!(scheduled_ids(&scheduled).len(), 7);

    let (_, outcome) = send(
        &app,
        json_request(
            "POST",
            "/v1/trips/patagonia/reminders/sync",
            json!({ "is_premium": true, "settings": { "enabled": false } }),
        ),
    )
    .await;
    assert_eq!(outcome["cancelled"], 5);
    assert_eq!(outcome["scheduled"], json!([]));

    let (status, body) = send(&app, empty_request("DELETE", "/v1/trips/lofoten/reminders")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["cancelled"], 2);

    let (_, scheduled) = send(&app, empty_request("GET", "/v1/reminders/scheduled")).await;
    assert!(scheduled_ids(&scheduled).is_empty());
}

#[tokio::test]
async fn out_of_range_time_of_day_is_rejected() {
    let app = build_app(test_config()).await.expect("app should build");
    send(&app, json_request("POST", "/v1/trips", trip_json("patagonia", 10))).await;
    let settings = json!({ "time_of_day": { "hour": 25, "minute": 90 } });

    let (status, body) = send(
        &app,
        json_request(
            "POST",
            "/v1/trips/patagonia/reminders/sync",
            json!({ "is_premium": true, "settings": settings.clone() }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "invalid_settings");

    let (status, body) = send(
        &app,
        json_request(
            "POST",
            "/v1/reminders/preview",
            json!({ "trip_id": "patagonia", "settings": settings }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "invalid_settings");

    let (_, scheduled) = send(&app, empty_request("GET", "/v1/reminders/scheduled")).await;
    assert!(scheduled_ids(&scheduled).is_empty());
}

#[tokio::test]
async fn sync_unknown_trip_is_not_found() {
    let app = build_app(test_config()).await.expect("app should build");

    let (status, body) = send(
        &app,
        json_request("POST", "/v1/trips/nowhere/reminders/sync", json!({})),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "trip_not_found");
}

#[tokio::test]
async fn permission_denial_surfaces_as_forbidden() {
    let memory = MemoryStore::new();
    let app = router(ApiState::new(Store::Memory(memory.clone()), API_KEY), 64 * 1024);
    send(&app, json_request("POST", "/v1/trips", trip_json("patagonia", 10))).await;

    memory.set_permission(false);
    let (status, body) = send(
        &app,
        json_request(
            "POST",
            "/v1/trips/patagonia/reminders/sync",
            json!({ "is_premium": true }),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "permission_denied");

    let (_, scheduled) = send(&app, empty_request("GET", "/v1/reminders/scheduled")).await;
    assert!(scheduled_ids(&scheduled).is_empty());
}
