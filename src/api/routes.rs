//! API route definitions.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{error, info};

use super::state::AppState;
use crate::alert::Alert;
use crate::pipeline;
use crate::storage::records;
use crate::triage::Criticality;

const DEFAULT_LIMIT: usize = 50;
const MAX_LIMIT: usize = 500;

pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/analyze_log", post(analyze_log))
        .route("/logs", get(list_logs))
        .route("/logs/{id}", get(get_log))
        .route("/stats", get(stats))
}

/// Accept an alert and analyse it in the background.
async fn analyze_log(State(state): State<AppState>, Json(alert): Json<Alert>) -> impl IntoResponse {
    let request_id = uuid::Uuid::new_v4();
    info!(
        %request_id,
        event_type = alert.event_type().as_deref().unwrap_or("unknown"),
        "alert received"
    );

    tokio::spawn(async move {
        if let Err(e) = pipeline::process_alert(&state.pool, &state.resolver, alert).await {
            error!(%request_id, error = %e, "failed to process alert");
        }
    });

    (
        StatusCode::ACCEPTED,
        Json(json!({
            "status": "accepted",
            "message": "alert queued for analysis",
            "request_id": request_id,
        })),
    )
}

#[derive(Debug, Deserialize)]
struct LogsQuery {
    limit: Option<usize>,
    #[serde(alias = "severity")]
    criticidade: Option<String>,
}

async fn list_logs(State(state): State<AppState>, Query(q): Query<LogsQuery>) -> Response {
    let criticality = match q.criticidade.as_deref() {
        None | Some("") => None,
        Some(raw) => match Criticality::parse(raw) {
            Some(c) => Some(c),
            None => {
                return error_response(
                    StatusCode::BAD_REQUEST,
                    format!("unknown criticality '{}'", raw),
                )
            }
        },
    };
    let limit = q.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);

    let pool = state.pool.clone();
    let result =
        tokio::task::spawn_blocking(move || records::list_recent(&pool, limit, criticality)).await;

    match result {
        Ok(Ok(alerts)) => {
            let total = alerts.len();
            Json(json!({
                "data": alerts,
                "meta": { "total": total, "limit": limit }
            }))
            .into_response()
        }
        Ok(Err(e)) => internal_error(e),
        Err(e) => internal_error(e.into()),
    }
}

async fn get_log(State(state): State<AppState>, Path(id): Path<i64>) -> Response {
    let pool = state.pool.clone();
    match tokio::task::spawn_blocking(move || records::get_alert(&pool, id)).await {
        Ok(Ok(Some(alert))) => Json(json!({ "data": alert })).into_response(),
        Ok(Ok(None)) => error_response(StatusCode::NOT_FOUND, format!("alert {} not found", id)),
        Ok(Err(e)) => internal_error(e),
        Err(e) => internal_error(e.into()),
    }
}

async fn stats(State(state): State<AppState>) -> Response {
    let pool = state.pool.clone();
    match tokio::task::spawn_blocking(move || records::stats(&pool)).await {
        Ok(Ok(stats)) => Json(json!({
            "data": stats,
            "meta": { "timestamp": chrono::Utc::now().to_rfc3339() }
        }))
        .into_response(),
        Ok(Err(e)) => internal_error(e),
        Err(e) => internal_error(e.into()),
    }
}

pub(super) async fn health(State(state): State<AppState>) -> Json<Value> {
    let online = state.resolver.check_model_health().await;
    Json(json!({
        "status": if online { "healthy" } else { "degraded" },
        "ollama": if online { "online" } else { "offline" },
        "version": env!("CARGO_PKG_VERSION"),
        "timestamp": chrono::Utc::now().to_rfc3339(),
    }))
}

fn internal_error(e: anyhow::Error) -> Response {
    error!(error = %e, "storage query failed");
    error_response(StatusCode::INTERNAL_SERVER_ERROR, "storage error".to_string())
}

fn error_response(status: StatusCode, message: String) -> Response {
    (status, Json(json!({ "error": message }))).into_response()
}
