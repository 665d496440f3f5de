//! HTTP router construction.
//!
//! Assembles all Axum routes, middleware, and OpenAPI docs into a single `Router`.

use std::sync::Arc;

use axum::middleware;
use axum::routing::{delete, get, post};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_scalar::{Scalar, Servable};

use crate::state::AppState;
use crate::{api, auth};

/// Build the complete application router with all routes and middleware.
pub fn build_router(state: Arc<AppState>) -> Router {
    let protected = Router::new()
        // /reset MUST precede /{name} to avoid "reset" being captured
        .route("/api/passwords/reset", post(api::passwords_reset))
        .route(
            "/api/passwords/{name}",
            get(api::passwords_get)
                .put(api::passwords_put)
                .delete(api::passwords_delete),
        )
        .route("/api/passwords", get(api::passwords_list))
        .route("/api/status", get(api::status))
        .route("/api/backups", get(api::backups_list))
        .route("/api/backups/{id}", delete(api::backups_delete))
        .route("/api/trigger/{database}", post(api::backups_trigger))
        .route("/api/config", get(api::config_get).put(api::config_put))
        .route("/api/schedules/validate", post(api::schedules_validate))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth::require_api_token,
        ));

    Router::new()
        .route("/health", get(api::health))
        .merge(protected)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
        .merge(Scalar::with_url("/docs", api::doc::ApiDoc::openapi()))
}
