//! Backup listing, deletion by public ID, and manual triggering.

use std::collections::BTreeMap;
use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use tracing::info;

use cronvault_jobs::{group_by_database, parse_artifact_filename, scan_artifacts, BackupArtifact, RunningJob};

use crate::backup;
use crate::error::{ApiError, ErrorBody};
use crate::state::AppState;

#[utoipa::path(
    get,
    path = "/api/backups",
    tag = "Backups",
    responses((status = 200, description = "Artifacts grouped by database, newest first"))
)]
pub async fn backups_list(
    State(state): State<Arc<AppState>>,
) -> Result<Json<BTreeMap<String, Vec<BackupArtifact>>>, ApiError> {
    let artifacts = scan_artifacts(&state.config.storage.backup_dir)?;
    let artifacts = state.registry.assign_ids(artifacts).await?;
    Ok(Json(group_by_database(artifacts)))
}

#[utoipa::path(
    delete,
    path = "/api/backups/{id}",
    tag = "Backups",
    params(("id" = u64, Path, description = "Public backup ID")),
    responses(
        (status = 204, description = "Artifact deleted"),
        (status = 404, description = "Unknown ID or file already gone", body = ErrorBody)
    )
)]
pub async fn backups_delete(
    State(state): State<Arc<AppState>>,
    Path(id): Path<u64>,
) -> Result<StatusCode, ApiError> {
    let not_found = || ApiError::NotFound(format!("No backup with id {id}"));

    let filename = state.registry.resolve(id).await?.ok_or_else(not_found)?;
    // The store is a plain file; never follow a name that is not an artifact.
    if parse_artifact_filename(&filename).is_none() {
        return Err(not_found());
    }

    let path = state.config.storage.backup_dir.join(&filename);
    match std::fs::remove_file(&path) {
        Ok(()) => {}
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Err(not_found()),
        Err(e) => return Err(e.into()),
    }
    // The ID stays issued to this filename forever.
    info!(id, "deleted backup {}", filename);
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    post,
    path = "/api/trigger/{database}",
    tag = "Backups",
    params(("database" = String, Path, description = "Database config name")),
    responses(
        (status = 202, description = "Dump started: {database, pid, started}"),
        (status = 404, description = "Unknown database", body = ErrorBody),
        (status = 409, description = "Already running", body = ErrorBody),
        (status = 422, description = "No stored password", body = ErrorBody)
    )
)]
pub async fn backups_trigger(
    State(state): State<Arc<AppState>>,
    Path(database): Path<String>,
) -> Result<(StatusCode, Json<RunningJob>), ApiError> {
    let job = backup::trigger(&state, &database).await?;
    Ok((StatusCode::ACCEPTED, Json(job)))
}
