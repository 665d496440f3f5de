//! The persisted backup plan.
//!
//! Writes are validated in full before anything touches disk, then the job
//! table is regenerated from the new plan.

use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use tracing::info;

use cronvault_schedule::{BackupPlan, PlanDocument};

use crate::error::{ApiError, ErrorBody};
use crate::state::AppState;

#[utoipa::path(
    get,
    path = "/api/config",
    tag = "Config",
    responses((status = 200, description = "Databases and schedules"))
)]
pub async fn config_get(State(state): State<Arc<AppState>>) -> Result<Json<BackupPlan>, ApiError> {
    Ok(Json(state.load_plan()?))
}

#[utoipa::path(
    put,
    path = "/api/config",
    tag = "Config",
    request_body(content_type = "application/json", description = "Databases and schedules"),
    responses(
        (status = 200, description = "Plan saved and job table regenerated"),
        (status = 400, description = "Unknown database reference or invalid cron expression", body = ErrorBody)
    )
)]
pub async fn config_put(
    State(state): State<Arc<AppState>>,
    Json(document): Json<PlanDocument>,
) -> Result<Json<BackupPlan>, ApiError> {
    let plan = BackupPlan::try_from(document)?;

    let _turn = state.plan_queue.enter().await;
    plan.save(&state.config.storage.plan_file())?;
    state.regenerate_crontab_locked().await;
    info!(schedules = plan.schedules().len(), "backup plan updated");
    Ok(Json(plan))
}
