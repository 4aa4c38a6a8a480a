//! CSV import and export endpoints

use crate::csv::{self, ImportError};
use crate::handlers::processes::repo_error_response;
use crate::handlers::AppState;
use crate::models::ApiResponse;
use axum::{
    extract::{Multipart, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use chrono::Local;
use serde::Serialize;

/// Outcome of a CSV import run.
#[derive(Debug, Serialize)]
pub struct ImportSummary {
    pub imported: usize,
    /// Data rows present in the file but rejected by the parser.
    pub failed: usize,
}

/// Import processes from a legacy CSV upload
pub async fn import_processes(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Response {
    // First file field wins; the upload form only ever sends one.
    let text = match multipart.next_field().await {
        Ok(Some(field)) => match field.text().await {
            Ok(text) => text,
            Err(e) => {
                tracing::warn!("Unreadable upload field: {}", e);
                return unreadable();
            }
        },
        Ok(None) => return unreadable(),
        Err(e) => {
            tracing::warn!("Malformed multipart request: {}", e);
            return unreadable();
        }
    };

    let (max_id, units) = match (
        state.repo.max_process_id().await,
        state.repo.list_units().await,
    ) {
        (Ok(max_id), Ok(units)) => (max_id, units),
        (Err(e), _) | (_, Err(e)) => return repo_error_response::<ImportSummary>(e).into_response(),
    };

    let today = Local::now().date_naive();
    let parsed = match csv::parse_legacy_csv(&text, max_id, today, &units) {
        Ok(parsed) => parsed,
        Err(e) => {
            return (
                StatusCode::BAD_REQUEST,
                Json(ApiResponse::<ImportSummary>::error(e.to_string())),
            )
                .into_response();
        }
    };

    let total_rows = csv::data_row_count(&text);
    match state.repo.import_processes(parsed).await {
        Ok(imported) => {
            // Failed covers both parser-rejected rows and rows whose insert
            // failed independently mid-import.
            let failed = total_rows.saturating_sub(imported);
            tracing::info!("CSV import: {} inserted, {} failed", imported, failed);
            (
                StatusCode::OK,
                Json(ApiResponse::success(ImportSummary { imported, failed })),
            )
                .into_response()
        }
        Err(e) => repo_error_response::<ImportSummary>(e).into_response(),
    }
}

fn unreadable() -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(ApiResponse::<ImportSummary>::error(
            ImportError::Unreadable.to_string(),
        )),
    )
        .into_response()
}

/// Download the full process list as CSV
pub async fn export_processes(State(state): State<AppState>) -> Response {
    let processes = match state.repo.list_processes().await {
        Ok(processes) => processes,
        Err(e) => return repo_error_response::<()>(e).into_response(),
    };

    let today = Local::now().date_naive();
    let body = csv::export_csv(&processes);
    let disposition = format!(
        "attachment; filename=\"{}\"",
        csv::export_filename(today)
    );

    (
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        body,
    )
        .into_response()
}
