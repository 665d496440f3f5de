//! OpenAPI documentation aggregator.
//!
//! Collects all `#[utoipa::path]`-annotated handlers and `ToSchema`-derived
//! types into a single OpenAPI 3.1 spec, served via Scalar UI at `/docs`.

use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

struct BearerAuth;

impl Modify for BearerAuth {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer",
            SecurityScheme::Http(HttpBuilder::new().scheme(HttpAuthScheme::Bearer).build()),
        );
    }
}

#[derive(OpenApi)]
#[openapi(
    info(
        title = "cronvault API",
        version = "0.1.0",
        description = "Scheduled database backups with an encrypted password vault.",
    ),
    modifiers(&BearerAuth),
    security(("bearer" = [])),
    tags(
        (name = "Health", description = "Liveness"),
        (name = "Passwords", description = "Encrypted per-database password vault"),
        (name = "Jobs", description = "Running backup jobs across processes"),
        (name = "Backups", description = "Backup artifacts, stable IDs, and manual triggers"),
        (name = "Config", description = "Databases, schedules, and cron validation"),
    ),
    paths(
        crate::api::health::health,
        crate::api::passwords::passwords_list,
        crate::api::passwords::passwords_get,
        crate::api::passwords::passwords_put,
        crate::api::passwords::passwords_delete,
        crate::api::passwords::passwords_reset,
        crate::api::status::status,
        crate::api::backups::backups_list,
        crate::api::backups::backups_delete,
        crate::api::backups::backups_trigger,
        crate::api::config::config_get,
        crate::api::config::config_put,
        crate::api::schedules::schedules_validate,
    ),
    components(schemas(
        crate::error::ErrorBody,
        crate::api::health::HealthResponse,
        crate::api::passwords::PasswordList,
        crate::api::passwords::PasswordValue,
        crate::api::passwords::SetPasswordRequest,
        crate::api::passwords::ResetRequest,
        crate::api::schedules::ValidateRequest,
        crate::api::schedules::ValidateResponse,
    ))
)]
pub struct ApiDoc;
