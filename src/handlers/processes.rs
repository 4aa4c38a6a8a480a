//! Process CRUD, notes and the unit lookup

use crate::filter::ProcessFilter;
use crate::handlers::AppState;
use crate::models::*;
use crate::repository::RepositoryError;
use crate::validation::{is_valid_nif, validate_new_process, validate_process_patch};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Deserialize;

/// Map a repository error to the standard response pair.
pub(crate) fn repo_error_response<T>(e: RepositoryError) -> (StatusCode, Json<ApiResponse<T>>) {
    match e {
        RepositoryError::NotFound(id) => (
            StatusCode::NOT_FOUND,
            Json(ApiResponse::error(format!("Processo {} não encontrado", id))),
        ),
        e => {
            tracing::error!("Repository error: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ApiResponse::error("Erro interno do servidor")),
            )
        }
    }
}

// =============================================================================
// Process Endpoints
// =============================================================================

/// Query parameters for the filtered process list.
#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    /// Free-text search over cliente, referencia, assunto and NIF.
    #[serde(default)]
    pub q: Option<String>,
    /// Comma-separated estado values.
    #[serde(default)]
    pub estado: Option<String>,
    /// Comma-separated risk levels.
    #[serde(default)]
    pub risco: Option<String>,
}

impl ListQuery {
    fn into_filter(self) -> ProcessFilter {
        let mut filter = ProcessFilter::new();
        filter.query = self.q.unwrap_or_default();
        if let Some(estados) = self.estado {
            filter.estados = estados
                .split(',')
                .filter_map(|s| s.trim().parse().ok())
                .collect();
        }
        if let Some(riscos) = self.risco {
            filter.riscos = riscos
                .split(',')
                .filter_map(|s| s.trim().parse().ok())
                .collect();
        }
        filter
    }
}

/// List processes, optionally filtered
pub async fn list_processes(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> impl IntoResponse {
    match state.repo.list_processes().await {
        Ok(processes) => {
            let filter = query.into_filter();
            let filtered: Vec<Process> = filter.apply(&processes).into_iter().cloned().collect();
            (StatusCode::OK, Json(ApiResponse::success(filtered)))
        }
        Err(e) => repo_error_response(e),
    }
}

/// Get a single process by id
pub async fn get_process(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> impl IntoResponse {
    match state.repo.get_process(id).await {
        Ok(process) => (StatusCode::OK, Json(ApiResponse::success(process))),
        Err(e) => repo_error_response(e),
    }
}

/// Create a new process
pub async fn create_process(
    State(state): State<AppState>,
    Json(input): Json<NewProcess>,
) -> impl IntoResponse {
    if let Err(e) = validate_new_process(&input) {
        return (
            StatusCode::BAD_REQUEST,
            Json(ApiResponse::<Process>::error(e.to_string())),
        );
    }

    // Advisory only; a failing checksum never blocks the save.
    if let Some(nif) = input.rgpd.as_ref().and_then(|r| r.nif.as_deref()) {
        if !is_valid_nif(nif) {
            tracing::warn!("NIF '{}' falha a validação de checksum", nif);
        }
    }

    match state.repo.create_process(input).await {
        Ok(process) => (StatusCode::CREATED, Json(ApiResponse::success(process))),
        Err(e) => repo_error_response(e),
    }
}

/// Partially update a process
pub async fn update_process(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(patch): Json<ProcessPatch>,
) -> impl IntoResponse {
    if let Err(e) = validate_process_patch(&patch) {
        return (
            StatusCode::BAD_REQUEST,
            Json(ApiResponse::<Process>::error(e.to_string())),
        );
    }

    if let Some(nif) = patch
        .rgpd
        .as_ref()
        .and_then(|r| r.nif.set_value())
    {
        if !is_valid_nif(nif) {
            tracing::warn!("NIF '{}' falha a validação de checksum", nif);
        }
    }

    match state.repo.update_process(id, patch).await {
        Ok(process) => (StatusCode::OK, Json(ApiResponse::success(process))),
        Err(e) => repo_error_response(e),
    }
}

/// Delete a process
pub async fn delete_process(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> impl IntoResponse {
    match state.repo.delete_process(id).await {
        Ok(()) => (StatusCode::OK, Json(ApiResponse::success(id))),
        Err(e) => repo_error_response(e),
    }
}

// =============================================================================
// Notes
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct NoteInput {
    pub nota: String,
    #[serde(default)]
    pub user: Option<String>,
}

/// Append a free-text note to a process history
pub async fn add_note(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(input): Json<NoteInput>,
) -> impl IntoResponse {
    if input.nota.trim().is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(ApiResponse::<Process>::error("A nota não pode estar vazia")),
        );
    }

    match state.repo.add_note(id, input.nota.trim(), input.user).await {
        Ok(process) => (StatusCode::CREATED, Json(ApiResponse::success(process))),
        Err(e) => repo_error_response(e),
    }
}

// =============================================================================
// Organizational units / health
// =============================================================================

/// List the organizational units
pub async fn list_units(State(state): State<AppState>) -> impl IntoResponse {
    match state.repo.list_units().await {
        Ok(units) => (StatusCode::OK, Json(ApiResponse::success(units))),
        Err(e) => repo_error_response(e),
    }
}

/// Liveness probe
pub async fn health() -> impl IntoResponse {
    (StatusCode::OK, Json(ApiResponse::success("ok")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ProcessStatus, RiskLevel};

    #[test]
    fn test_list_query_parses_comma_separated_sets() {
        let query = ListQuery {
            q: Some("acme".to_string()),
            estado: Some("Aberto, Em Curso".to_string()),
            risco: Some("Alto,Crítico,inexistente".to_string()),
        };
        let filter = query.into_filter();

        assert_eq!(filter.query, "acme");
        assert!(filter.estados.contains(&ProcessStatus::Aberto));
        assert!(filter.estados.contains(&ProcessStatus::EmCurso));
        // Unknown tokens are dropped, not errors.
        assert_eq!(filter.riscos.len(), 2);
        assert!(filter.riscos.contains(&RiskLevel::Critico));
    }

    #[test]
    fn test_empty_query_builds_identity_filter() {
        let filter = ListQuery::default().into_filter();
        assert_eq!(filter, ProcessFilter::new());
    }
}
