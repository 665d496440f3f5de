use axum::Json;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use cronvault_schedule::{describe, validate_cron};

#[derive(Deserialize, ToSchema)]
pub struct ValidateRequest {
    pub cron: String,
}

#[derive(Serialize, ToSchema)]
pub struct ValidateResponse {
    pub valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Preview for the schedule editor. Uses the same validator as the
/// config write path, so a preview that passes will also save.
#[utoipa::path(
    post,
    path = "/api/schedules/validate",
    tag = "Config",
    request_body = ValidateRequest,
    responses((status = 200, description = "Validation result", body = ValidateResponse))
)]
pub async fn schedules_validate(Json(body): Json<ValidateRequest>) -> Json<ValidateResponse> {
    let response = match validate_cron(&body.cron) {
        Ok(()) => ValidateResponse {
            valid: true,
            error: None,
            description: describe(&body.cron),
        },
        Err(e) => ValidateResponse {
            valid: false,
            error: Some(e.to_string()),
            description: None,
        },
    };
    Json(response)
}
