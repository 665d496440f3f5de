use std::sync::Arc;

use axum::extract::State;
use axum::Json;

use cronvault_jobs::RunningJob;

use crate::error::ApiError;
use crate::state::AppState;

/// Jobs currently running, across all processes. Reading this also clears
/// records left behind by jobs that died.
#[utoipa::path(
    get,
    path = "/api/status",
    tag = "Jobs",
    responses((status = 200, description = "Running jobs: [{database, pid, started}]"))
)]
pub async fn status(State(state): State<Arc<AppState>>) -> Result<Json<Vec<RunningJob>>, ApiError> {
    Ok(Json(state.coordinator.list_running()?))
}
