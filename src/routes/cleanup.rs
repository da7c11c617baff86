use std::collections::HashMap;

use axum::extract::{Query, State};
use axum::http::{header, HeaderMap};
use axum::response::IntoResponse;
use axum::routing::any;
use axum::{Json, Router};
use serde::Serialize;

use crate::cleanup::CleanupSummary;
use crate::response::AppError;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    // Method-agnostic: the scheduler POSTs, manual invocations tend to GET.
    Router::new().route("/cleanup", any(run_cleanup))
}

#[derive(Debug, Serialize)]
pub struct CleanupResponse {
    pub message: &'static str,
    pub hours: u32,
    pub result: CleanupSummary,
}

pub async fn run_cleanup(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, AppError> {
    check_cron_secret(&state, &headers)?;

    let default_hours = state.config().cleanup.default_window_hours;
    let hours = parse_window_hours(params.get("hours").map(String::as_str), default_hours);

    tracing::info!(hours, "Running cleanup");
    let result = state.engine().run(hours).await?;
    tracing::info!(
        deleted_objects = result.deleted_objects,
        deleted_sessions = result.deleted_sessions,
        "Cleanup completed"
    );

    Ok(Json(CleanupResponse {
        message: "cleanup completed",
        hours,
        result,
    }))
}

/// When CRON_SECRET is configured, the caller must present it as a bearer
/// token. Without the config the endpoint is open, matching deployments
/// that gate it upstream.
fn check_cron_secret(state: &AppState, headers: &HeaderMap) -> Result<(), AppError> {
    let Some(secret) = state.config().cron_secret.as_deref() else {
        return Ok(());
    };

    let presented = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "));

    if presented == Some(secret) {
        Ok(())
    } else {
        Err(AppError::unauthorized("invalid or missing cron secret"))
    }
}

/// Expiry window in hours. Positive integers are clamped to at least 1;
/// anything missing, non-numeric or non-positive falls back to the default.
fn parse_window_hours(raw: Option<&str>, default_hours: u32) -> u32 {
    match raw.map(str::parse::<i64>) {
        Some(Ok(h)) if h > 0 => h.min(i64::from(u32::MAX)) as u32,
        _ => default_hours.max(1),
    }
}
