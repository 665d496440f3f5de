//! Password endpoints backed by the credential vault.
//!
//! Every successful change regenerates the job table, since schedules without
//! a stored password are projected as skipped.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use cronvault_vault::VaultError;

use crate::error::{ApiError, ErrorBody};
use crate::state::AppState;

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PasswordList {
    pub enabled: bool,
    pub decryption_failing: bool,
    pub names: Vec<String>,
}

#[derive(Serialize, ToSchema)]
pub struct PasswordValue {
    pub name: String,
    pub password: String,
}

#[derive(Deserialize, ToSchema)]
pub struct SetPasswordRequest {
    pub password: String,
}

#[derive(Deserialize, ToSchema)]
pub struct ResetRequest {
    #[serde(default)]
    pub confirm: bool,
}

#[utoipa::path(
    get,
    path = "/api/passwords",
    tag = "Passwords",
    responses((status = 200, description = "Names with a stored password", body = PasswordList))
)]
pub async fn passwords_list(State(state): State<Arc<AppState>>) -> Result<Json<PasswordList>, ApiError> {
    let status = state.vault.status();
    let names = if status.enabled && !status.decryption_failing {
        match state.vault.list().await {
            Ok(names) => names.into_iter().collect(),
            // reported through the flag below
            Err(VaultError::DecryptionFailed(_)) => Vec::new(),
            Err(e) => return Err(e.into()),
        }
    } else {
        Vec::new()
    };
    Ok(Json(PasswordList {
        enabled: status.enabled,
        decryption_failing: state.vault.is_failing(),
        names,
    }))
}

#[utoipa::path(
    get,
    path = "/api/passwords/{name}",
    tag = "Passwords",
    params(("name" = String, Path, description = "Database config name")),
    responses(
        (status = 200, description = "Stored password", body = PasswordValue),
        (status = 404, description = "No password stored", body = ErrorBody),
        (status = 423, description = "Store cannot be decrypted", body = ErrorBody),
        (status = 503, description = "Vault not configured", body = ErrorBody)
    )
)]
pub async fn passwords_get(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
) -> Result<Json<PasswordValue>, ApiError> {
    if !state.vault.is_enabled() {
        return Err(ApiError::VaultNotConfigured);
    }
    let password = state
        .vault
        .get(&name)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("No stored password for '{name}'")))?;
    Ok(Json(PasswordValue { name, password }))
}

#[utoipa::path(
    put,
    path = "/api/passwords/{name}",
    tag = "Passwords",
    params(("name" = String, Path, description = "Database config name")),
    request_body = SetPasswordRequest,
    responses(
        (status = 204, description = "Stored"),
        (status = 400, description = "Invalid name", body = ErrorBody),
        (status = 423, description = "Store cannot be decrypted", body = ErrorBody),
        (status = 503, description = "Vault not configured", body = ErrorBody)
    )
)]
pub async fn passwords_put(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
    Json(body): Json<SetPasswordRequest>,
) -> Result<StatusCode, ApiError> {
    state.vault.set(&name, &body.password).await?;
    state.regenerate_crontab().await;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    delete,
    path = "/api/passwords/{name}",
    tag = "Passwords",
    params(("name" = String, Path, description = "Database config name")),
    responses(
        (status = 204, description = "Deleted (or was not stored)"),
        (status = 423, description = "Store cannot be decrypted", body = ErrorBody),
        (status = 503, description = "Vault not configured", body = ErrorBody)
    )
)]
pub async fn passwords_delete(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
) -> Result<StatusCode, ApiError> {
    if state.vault.delete(&name).await? {
        state.regenerate_crontab().await;
    }
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    post,
    path = "/api/passwords/reset",
    tag = "Passwords",
    request_body = ResetRequest,
    responses(
        (status = 204, description = "All stored passwords discarded"),
        (status = 400, description = "Confirmation missing", body = ErrorBody),
        (status = 503, description = "Vault not configured", body = ErrorBody)
    )
)]
pub async fn passwords_reset(
    State(state): State<Arc<AppState>>,
    Json(body): Json<ResetRequest>,
) -> Result<StatusCode, ApiError> {
    if !body.confirm {
        return Err(ApiError::Validation(
            "Resetting discards every stored password; send {\"confirm\": true}".to_string(),
        ));
    }
    state.vault.reset().await?;
    state.regenerate_crontab().await;
    Ok(StatusCode::NO_CONTENT)
}
