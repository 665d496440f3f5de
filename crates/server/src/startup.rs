//! Server startup: shared state initialization and the listen loop.

use std::sync::Arc;

use tracing::{info, warn};

use cronvault_core::Config;

use crate::router::build_router;
use crate::state::AppState;

/// Build `AppState`, check the vault once, and bring the job table in line
/// with the persisted plan.
pub async fn build_app_state(config: Config) -> anyhow::Result<Arc<AppState>> {
    std::fs::create_dir_all(&config.storage.data_dir)?;
    std::fs::create_dir_all(&config.storage.backup_dir)?;
    std::fs::create_dir_all(config.storage.run_dir())?;
    std::fs::create_dir_all(&config.jobs.log_dir)?;

    if config.server.api_token.is_none() {
        warn!("API_TOKEN is not set: every /api request will be refused and no job will be scheduled");
    }

    let state = Arc::new(AppState::new(config));

    let vault = state.vault.verify().await;
    if !vault.enabled {
        warn!("ENCRYPTION_SECRET is not set: password vault disabled");
    } else if vault.decryption_failing {
        warn!("password store cannot be decrypted; fix ENCRYPTION_SECRET or POST /api/passwords/reset");
    }

    // Drop records left by jobs that died while the server was down.
    let running = state.coordinator.list_running()?;
    info!(running = running.len(), "job coordinator ready");

    state.regenerate_crontab().await;
    Ok(state)
}

pub async fn serve(config: Config) -> anyhow::Result<()> {
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let state = build_app_state(config).await?;
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Listening on http://{} (docs at /docs)", addr);
    axum::serve(listener, app).await?;
    Ok(())
}
