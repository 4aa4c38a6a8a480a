//! Dashboard endpoints: alerts and aggregate stats

use crate::analytics;
use crate::handlers::processes::repo_error_response;
use crate::handlers::AppState;
use crate::models::ApiResponse;
use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use chrono::Local;

/// Top alerts for the dashboard panel, severity descending
pub async fn get_alerts(State(state): State<AppState>) -> impl IntoResponse {
    match state.repo.list_processes().await {
        Ok(processes) => {
            let today = Local::now().date_naive();
            let alerts = analytics::dashboard_alerts(&processes, today);
            (StatusCode::OK, Json(ApiResponse::success(alerts)))
        }
        Err(e) => repo_error_response(e),
    }
}

/// Aggregate dashboard stats
pub async fn get_stats(State(state): State<AppState>) -> impl IntoResponse {
    match state.repo.list_processes().await {
        Ok(processes) => {
            let stats = analytics::compute_stats(&processes);
            (StatusCode::OK, Json(ApiResponse::success(stats)))
        }
        Err(e) => repo_error_response(e),
    }
}
