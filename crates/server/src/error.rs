//! HTTP error mapping.
//!
//! Every handler returns `Result<_, ApiError>`; each failure class gets its
//! own status code so clients can tell "already running" from "wrong secret".

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;
use tracing::error;
use utoipa::ToSchema;

use cronvault_core::CoreError;
use cronvault_jobs::{CoordinatorError, RegistryError, RunnerError};
use cronvault_schedule::PlanError;
use cronvault_vault::VaultError;

#[derive(Serialize, ToSchema)]
pub struct ErrorBody {
    pub error: String,
}

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Unauthorized(&'static str),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    AlreadyRunning(String),

    #[error("No stored password for '{0}'")]
    MissingPassword(String),

    #[error("{0}")]
    DecryptionFailing(String),

    #[error("Password vault is not configured (set ENCRYPTION_SECRET)")]
    VaultNotConfigured,

    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::AlreadyRunning(_) => StatusCode::CONFLICT,
            Self::MissingPassword(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::DecryptionFailing(_) => StatusCode::LOCKED,
            Self::VaultNotConfigured => StatusCode::SERVICE_UNAVAILABLE,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(status = status.as_u16(), "{self}");
        }
        (status, Json(ErrorBody { error: self.to_string() })).into_response()
    }
}

impl From<VaultError> for ApiError {
    fn from(e: VaultError) -> Self {
        match e {
            VaultError::NotConfigured => Self::VaultNotConfigured,
            VaultError::DecryptionFailed(_) => Self::DecryptionFailing(e.to_string()),
            VaultError::InvalidName(_) => Self::Validation(e.to_string()),
            VaultError::Crypto(_) | VaultError::Storage(_) | VaultError::Task(_) => Self::Internal(e.to_string()),
        }
    }
}

impl From<PlanError> for ApiError {
    fn from(e: PlanError) -> Self {
        match e {
            PlanError::Storage(_) => Self::Internal(e.to_string()),
            _ => Self::Validation(e.to_string()),
        }
    }
}

impl From<CoordinatorError> for ApiError {
    fn from(e: CoordinatorError) -> Self {
        match e {
            CoordinatorError::AlreadyRunning { .. } => Self::AlreadyRunning(e.to_string()),
            CoordinatorError::InvalidName(_) => Self::Validation(e.to_string()),
            CoordinatorError::Io(_) | CoordinatorError::Storage(_) => Self::Internal(e.to_string()),
        }
    }
}

impl From<RegistryError> for ApiError {
    fn from(e: RegistryError) -> Self {
        Self::Internal(e.to_string())
    }
}

impl From<RunnerError> for ApiError {
    fn from(e: RunnerError) -> Self {
        Self::Internal(e.to_string())
    }
}

impl From<CoreError> for ApiError {
    fn from(e: CoreError) -> Self {
        Self::Internal(e.to_string())
    }
}

impl From<std::io::Error> for ApiError {
    fn from(e: std::io::Error) -> Self {
        Self::Internal(e.to_string())
    }
}
