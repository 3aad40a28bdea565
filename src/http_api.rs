//! HTTP API for dashboard pollers
//!
//! JSON endpoints over the attendance, motion and noise logs, the duplicate
//! buffer, the registry and the aggregated stats, plus a simulation
//! endpoint that injects synthetic lines into the shared pipeline. CORS is
//! permissive; the dashboard is served from a separate origin.

use crate::classifier::date_string;
use crate::error::{ClasswatchError, Result};
use crate::server::{EventOutcome, Service};
use crate::services::{DuplicateAttempt, Outcome, Stats};
use crate::storage::{AttendanceRow, MotionRow, NoiseRow, RfidUser};
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::{Local, Utc};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::info;

/// Error wrapper mapping crate errors onto HTTP responses
struct ApiError(ClasswatchError);

impl From<ClasswatchError> for ApiError {
    fn from(err: ClasswatchError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self.0 {
            ClasswatchError::InvalidInput(msg) => {
                (StatusCode::BAD_REQUEST, Json(json!({ "error": msg }))).into_response()
            }
            err => (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": "Database error", "details": err.to_string() })),
            )
                .into_response(),
        }
    }
}

/// Build the API router
pub fn router(service: Arc<Service>) -> Router {
    Router::new()
        .route("/", get(root_info))
        .route("/health", get(health))
        .route("/attendance", get(get_attendance))
        .route("/motion", get(get_motion))
        .route("/logs", get(get_noise_log))
        .route("/duplicates", get(get_duplicates))
        .route("/duplicates/clear", post(clear_duplicates))
        .route("/stats", get(get_stats))
        .route("/users", get(get_users).post(register_user))
        .route("/simulate", post(simulate))
        .layer(tower_http::cors::CorsLayer::permissive())
        .with_state(service)
}

/// Bind and serve the API until ctrl-c
pub async fn serve(service: Arc<Service>, port: u16) -> Result<()> {
    let addr = format!("0.0.0.0:{port}");
    let listener = TcpListener::bind(&addr)
        .await
        .map_err(|e| ClasswatchError::connection(format!("Failed to bind {addr}: {e}")))?;

    info!("HTTP API listening on http://{addr}");

    axum::serve(listener, router(service))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| ClasswatchError::connection(format!("HTTP server error: {e}")))?;

    Ok(())
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    info!("Shutdown signal received");
}

async fn root_info() -> Json<Value> {
    Json(json!({
        "service": env!("CARGO_PKG_NAME"),
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": [
            "/attendance", "/motion", "/logs", "/duplicates", "/stats",
            "/users", "/simulate", "/health",
        ],
    }))
}

async fn health(State(service): State<Arc<Service>>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "connected": service.connection_status().is_connected().await,
        "timestamp": Utc::now().to_rfc3339(),
    }))
}

async fn get_attendance(
    State(service): State<Arc<Service>>,
) -> std::result::Result<Json<Vec<AttendanceRow>>, ApiError> {
    let today = date_string(Local::now());
    let rows = service
        .database()
        .attendance_on(&today, service.config().log_query_cap)
        .await?;
    Ok(Json(rows))
}

async fn get_motion(
    State(service): State<Arc<Service>>,
) -> std::result::Result<Json<Vec<MotionRow>>, ApiError> {
    let rows = service
        .database()
        .motion_today(service.config().log_query_cap)
        .await?;
    Ok(Json(rows))
}

async fn get_noise_log(
    State(service): State<Arc<Service>>,
) -> std::result::Result<Json<Vec<NoiseRow>>, ApiError> {
    let rows = service
        .database()
        .noise_log(service.config().log_query_cap)
        .await?;
    Ok(Json(rows))
}

async fn get_duplicates(State(service): State<Arc<Service>>) -> Json<Vec<DuplicateAttempt>> {
    Json(service.duplicates().snapshot().await)
}

async fn clear_duplicates(State(service): State<Arc<Service>>) -> Json<Value> {
    service.duplicates().clear().await;
    Json(json!({ "success": true, "message": "Duplicate attempts cleared" }))
}

async fn get_stats(
    State(service): State<Arc<Service>>,
) -> std::result::Result<Json<Stats>, ApiError> {
    let stats = service.stats().compute().await?;
    Ok(Json(stats))
}

async fn get_users(
    State(service): State<Arc<Service>>,
) -> std::result::Result<Json<Vec<RfidUser>>, ApiError> {
    let users = service.database().list_users().await?;
    Ok(Json(users))
}

#[derive(Debug, Deserialize)]
struct RegisterUserRequest {
    uid: Option<String>,
    name: Option<String>,
}

async fn register_user(
    State(service): State<Arc<Service>>,
    Json(request): Json<RegisterUserRequest>,
) -> std::result::Result<Json<Value>, ApiError> {
    let (uid, name) = match (request.uid, request.name) {
        (Some(uid), Some(name)) if !uid.is_empty() && !name.is_empty() => (uid, name),
        _ => {
            return Err(ClasswatchError::invalid_input("UID and name are required").into());
        }
    };

    let id = service
        .database()
        .upsert_user(&uid.to_uppercase(), &name)
        .await?;
    Ok(Json(json!({ "success": true, "id": id })))
}

#[derive(Debug, Deserialize)]
struct SimulateRequest {
    #[serde(rename = "type")]
    kind: String,
    data: Option<String>,
}

async fn simulate(
    State(service): State<Arc<Service>>,
    Json(request): Json<SimulateRequest>,
) -> std::result::Result<Json<Value>, ApiError> {
    let line = match request.kind.as_str() {
        "rfid" => {
            let data = request
                .data
                .ok_or_else(|| ClasswatchError::invalid_input("RFID simulation requires data"))?;
            format!("UID: {data}")
        }
        "motion" => "Motion detected!".to_string(),
        "noise" => {
            let data = request
                .data
                .ok_or_else(|| ClasswatchError::invalid_input("Noise simulation requires data"))?;
            format!("DB: {data}")
        }
        other => {
            return Err(
                ClasswatchError::invalid_input(format!("Invalid simulation type: {other}")).into(),
            );
        }
    };

    info!(line = %line, "Simulated sensor line");
    let outcomes = service.process_line(&line).await?;
    let results: Vec<Value> = outcomes.iter().map(describe_outcome).collect();
    Ok(Json(json!({ "success": true, "line": line, "results": results })))
}

fn describe_outcome(outcome: &EventOutcome) -> Value {
    match outcome {
        EventOutcome::Attendance(Outcome::Present(record)) => {
            json!({ "type": "attendance", "result": "present", "name": record.name })
        }
        EventOutcome::Attendance(Outcome::Duplicate(attempt)) => {
            json!({ "type": "attendance", "result": "duplicate", "name": attempt.name })
        }
        EventOutcome::Attendance(Outcome::Unauthorized(record)) => {
            json!({ "type": "attendance", "result": "unauthorized", "uid": record.uid })
        }
        EventOutcome::Motion { time } => json!({ "type": "motion", "time": time }),
        EventOutcome::Noise { db, status } => {
            json!({ "type": "noise", "dB": db, "status": status.as_str() })
        }
    }
}
