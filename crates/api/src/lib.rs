mod config;

use std::sync::Arc;

use anyhow::Result;
use axum::body::Body;
use axum::extract::{Json, Path, State};
use axum::http::{Method, Request, StatusCode};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, post};
use axum::Router;
use packwise_core::{ReminderSettings, Trip};
use packwise_observability::{MetricsSnapshot, ReminderMetrics};
use packwise_scheduler::{ReminderError, ReminderScheduler};
use packwise_storage::{NotificationGateway, Store, TripProvider};
use serde::{Deserialize, Serialize};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;
use tracing::error;

pub use config::AppConfig;

const MAX_TRIP_FIELD_LEN: usize = 160;
const MAX_PACKING_ITEMS: usize = 500;

#[derive(Clone)]
pub struct ApiState {
    pub scheduler: Arc<ReminderScheduler<Store>>,
    pub store: Arc<Store>,
    pub metrics: Arc<ReminderMetrics>,
    pub api_key: String,
}

impl ApiState {
    pub fn new(store: Store, api_key: impl Into<String>) -> Self {
        let store = Arc::new(store);
        let metrics = ReminderMetrics::shared();
        let scheduler = Arc::new(ReminderScheduler::new(store.clone(), metrics.clone()));

        Self {
            scheduler,
            store,
            metrics,
            api_key: api_key.into(),
        }
    }
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    timestamp_local: String,
    storage: &'static str,
    metrics: MetricsSnapshot,
}

#[derive(Debug, Deserialize)]
struct PreviewRequest {
    trip_id: String,
    #[serde(default)]
    settings: Option<serde_json::Value>,
    #[serde(default)]
    is_premium: bool,
}

#[derive(Debug, Deserialize)]
struct SyncRequest {
    #[serde(default)]
    settings: Option<serde_json::Value>,
    #[serde(default)]
    is_premium: bool,
}

#[derive(Debug, Serialize)]
struct CancelResponse {
    trip_id: String,
    cancelled: usize,
}

pub async fn build_app(config: AppConfig) -> Result<Router> {
    let store = match config.database_url.as_deref() {
        Some(database_url) => Store::sqlite(database_url).await?,
        None => Store::memory(),
    };

    let state = ApiState::new(store, config.api_key);
    Ok(router(state, config.body_limit_bytes))
}

pub fn router(state: ApiState, body_limit_bytes: usize) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/v1/trips", get(trips_list).post(trip_upsert))
        .route("/v1/reminders/preview", post(reminders_preview))
        .route("/v1/reminders/scheduled", get(reminders_scheduled))
        .route("/v1/trips/{trip_id}/reminders/sync", post(reminders_sync))
        .route("/v1/trips/{trip_id}/reminders", delete(reminders_cancel))
        .layer(TraceLayer::new_for_http())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(RequestBodyLimitLayer::new(body_limit_bytes))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            api_key_middleware,
        ))
        .with_state(state)
}

async fn health(State(state): State<ApiState>) -> impl IntoResponse {
    let payload = HealthResponse {
        status: "ok",
        timestamp_local: chrono::Local::now().to_rfc3339(),
        storage: match state.store.as_ref() {
            Store::Memory(_) => "memory",
            Store::Sqlite(_) => "sqlite",
        },
        metrics: state.metrics.snapshot(),
    };
    (StatusCode::OK, Json(payload))
}

async fn trips_list(State(state): State<ApiState>) -> Response {
    match state.store.list_trips().await {
        Ok(trips) => (StatusCode::OK, Json(trips)).into_response(),
        Err(err) => internal_error("trip_store_failed", err),
    }
}

async fn trip_upsert(State(state): State<ApiState>, Json(trip): Json<Trip>) -> Response {
    if let Err(message) = validate_trip(&trip) {
        return error_response(StatusCode::BAD_REQUEST, "invalid_trip", message);
    }

    match state.store.upsert_trip(&trip).await {
        Ok(()) => (StatusCode::OK, Json(trip)).into_response(),
        Err(err) => internal_error("trip_store_failed", err),
    }
}

async fn reminders_preview(
    State(state): State<ApiState>,
    Json(input): Json<PreviewRequest>,
) -> Response {
    let settings = match parse_settings(input.settings) {
        Ok(settings) => settings,
        Err(response) => return response,
    };
    let trip = match load_trip(&state, &input.trip_id).await {
        Ok(trip) => trip,
        Err(response) => return response,
    };

    let reminders = state
        .scheduler
        .generate_smart_reminders(&trip, &settings, input.is_premium);
    (StatusCode::OK, Json(reminders)).into_response()
}

async fn reminders_sync(
    State(state): State<ApiState>,
    Path(trip_id): Path<String>,
    Json(input): Json<SyncRequest>,
) -> Response {
    let settings = match parse_settings(input.settings) {
        Ok(settings) => settings,
        Err(response) => return response,
    };
    let trip = match load_trip(&state, &trip_id).await {
        Ok(trip) => trip,
        Err(response) => return response,
    };

    match state
        .scheduler
        .update_reminders_for_trip(&trip, &settings, input.is_premium)
        .await
    {
        Ok(outcome) => (StatusCode::OK, Json(outcome)).into_response(),
        Err(err) => reminder_error_response(err),
    }
}

async fn reminders_cancel(State(state): State<ApiState>, Path(trip_id): Path<String>) -> Response {
    match state.scheduler.cancel_reminders_for_trip(&trip_id).await {
        Ok(cancelled) => (
            StatusCode::OK,
            Json(CancelResponse { trip_id, cancelled }),
        )
            .into_response(),
        Err(err) => reminder_error_response(err),
    }
}

async fn reminders_scheduled(State(state): State<ApiState>) -> Response {
    match state.store.get_all_scheduled().await {
        Ok(scheduled) => (StatusCode::OK, Json(scheduled)).into_response(),
        Err(err) => error_response(StatusCode::BAD_GATEWAY, "gateway_error", &err.to_string()),
    }
}

async fn load_trip(state: &ApiState, trip_id: &str) -> Result<Trip, Response> {
    match state.store.load_trip(trip_id).await {
        Ok(Some(trip)) => Ok(trip),
        Ok(None) => Err(error_response(
            StatusCode::NOT_FOUND,
            "trip_not_found",
            &format!("no trip with id {}", trip_id),
        )),
        Err(err) => Err(internal_error("trip_store_failed", err)),
    }
}

/// Missing settings mean defaults. Malformed ones, such as an out-of-range
/// time of day, are rejected before anything touches the gateway.
fn parse_settings(raw: Option<serde_json::Value>) -> Result<ReminderSettings, Response> {
    match raw {
        None | Some(serde_json::Value::Null) => Ok(ReminderSettings::default()),
        Some(value) => serde_json::from_value(value).map_err(|err| {
            error_response(StatusCode::BAD_REQUEST, "invalid_settings", &err.to_string())
        }),
    }
}

fn validate_trip(trip: &Trip) -> Result<(), &'static str> {
    if trip.id.trim().is_empty() {
        return Err("id is required");
    }
    if trip.name.trim().is_empty() {
        return Err("name is required");
    }
    if [&trip.id, &trip.name, &trip.destination]
        .iter()
        .any(|value| value.chars().count() > MAX_TRIP_FIELD_LEN)
    {
        return Err("trip fields are too long");
    }
    if trip.end_date < trip.start_date {
        return Err("end_date must not be before start_date");
    }
    if trip.packing_list.len() > MAX_PACKING_ITEMS {
        return Err("packing list is too long");
    }
    Ok(())
}

fn reminder_error_response(err: ReminderError) -> Response {
    match err {
        ReminderError::PermissionDenied => error_response(
            StatusCode::FORBIDDEN,
            "permission_denied",
            "notification permission was denied; no reminders were scheduled",
        ),
        other => {
            error!(error = %other, "reminder gateway failure");
            error_response(StatusCode::BAD_GATEWAY, "gateway_error", &other.to_string())
        }
    }
}

fn internal_error(code: &str, err: anyhow::Error) -> Response {
    error!(error = %err, code, "request failed");
    error_response(StatusCode::INTERNAL_SERVER_ERROR, code, "internal error")
}

fn error_response(status: StatusCode, code: &str, message: &str) -> Response {
    (
        status,
        Json(serde_json::json!({
            "error": code,
            "message": message,
        })),
    )
        .into_response()
}

fn is_public_endpoint(path: &str) -> bool {
    path == "/health"
}

async fn api_key_middleware(
    State(state): State<ApiState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    if request.method() == Method::OPTIONS || is_public_endpoint(request.uri().path()) {
        return next.run(request).await;
    }

    let header_key = request
        .headers()
        .get("x-api-key")
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default();

    if header_key != state.api_key {
        return error_response(
            StatusCode::UNAUTHORIZED,
            "unauthorized",
            "missing or invalid x-api-key",
        );
    }

    next.run(request).await
}
