//! Starting backups, from the API and from cron.
//!
//! Whoever starts the dump owns the database's lock: the server for
//! API-triggered jobs, the `run` process for cron-triggered ones.

use std::sync::Arc;

use anyhow::Context;
use chrono::Utc;
use serde::Deserialize;
use tracing::{error, info, warn};

use cronvault_core::Config;
use cronvault_jobs::{
    CoordinatorError, DumpRequest, DumpRunner, FileJobCoordinator, JobCoordinator, JobLease,
    RunningDump, RunningJob,
};
use cronvault_schedule::{BackupPlan, DatabaseEntry};

use crate::error::ApiError;
use crate::state::AppState;

/// `EX_TEMPFAIL`: another run holds the database; cron will try again next time.
pub const EXIT_ALREADY_RUNNING: i32 = 75;

fn dump_request(entry: &DatabaseEntry, password: String) -> DumpRequest {
    DumpRequest {
        database: entry.name.clone(),
        host: entry.host.clone(),
        port: entry.port,
        user: entry.user.clone(),
        schema: entry.schema_name().to_string(),
        password,
    }
}

/// Start a dump for `database` and return as soon as the process is running.
pub async fn trigger(state: &Arc<AppState>, database: &str) -> Result<RunningJob, ApiError> {
    let plan = state.load_plan()?;
    let entry = plan
        .database(database)
        .ok_or_else(|| ApiError::NotFound(format!("Unknown database '{database}'")))?;

    let lease = state.coordinator.acquire(database)?;
    let password = state
        .vault
        .get(database)
        .await?
        .ok_or_else(|| ApiError::MissingPassword(database.to_string()))?;

    let started = Utc::now();
    let dump = state
        .runner
        .spawn(&dump_request(entry, password), started)?;
    let pid = dump.pid();
    if let Err(e) = state.coordinator.publish_status(database, pid, started) {
        // The lock still guards the job; only the status view is affected.
        warn!(database = %database, error = %e, "failed to publish job status");
    }

    tokio::spawn(supervise(lease, dump));
    Ok(RunningJob {
        database: database.to_string(),
        pid,
        started,
    })
}

/// Wait for a server-started dump, then release its lease.
async fn supervise(lease: JobLease, dump: RunningDump) {
    match dump.wait().await {
        Ok(outcome) if outcome.succeeded() => {
            info!(database = %outcome.database, "backup completed");
        }
        Ok(outcome) => {
            warn!(database = %outcome.database, code = ?outcome.exit_code, "backup failed");
        }
        Err(e) => error!(database = %lease.database(), error = %e, "lost track of dump process"),
    }
    drop(lease);
}

#[derive(Deserialize)]
struct PasswordResponse {
    password: String,
}

/// Ask the local server for a stored password.
async fn fetch_password(config: &Config, database: &str) -> anyhow::Result<String> {
    let token = config
        .server
        .api_token
        .as_deref()
        .context("API_TOKEN is not set in the job environment")?;
    let url = format!(
        "http://127.0.0.1:{}/api/passwords/{}",
        config.server.port, database
    );

    let response = reqwest::Client::new()
        .get(&url)
        .bearer_auth(token)
        .send()
        .await
        .with_context(|| format!("password request to {url} failed"))?;
    let status = response.status();
    if !status.is_success() {
        anyhow::bail!("server answered {status} for the password of '{database}'");
    }
    let body: PasswordResponse = response.json().await.context("malformed password response")?;
    Ok(body.password)
}

/// Entry point of `cronvault run <database>`. Returns the process exit code.
pub async fn run_scheduled(config: &Config, database: &str) -> anyhow::Result<i32> {
    let plan = BackupPlan::load(&config.storage.plan_file())?;
    let entry = plan
        .database(database)
        .with_context(|| format!("database '{database}' is not in the backup plan"))?;

    let coordinator = FileJobCoordinator::new(config.storage.run_dir());
    let _lease = match coordinator.acquire(database) {
        Ok(lease) => lease,
        Err(CoordinatorError::AlreadyRunning { pid, .. }) => {
            warn!(database = %database, ?pid, "backup already running, skipping this run");
            return Ok(EXIT_ALREADY_RUNNING);
        }
        Err(e) => return Err(e.into()),
    };

    let started = Utc::now();
    coordinator.publish_status(database, std::process::id(), started)?;

    let password = fetch_password(config, database).await?;
    let runner = DumpRunner::new(&config.jobs.dump_command, &config.storage.backup_dir);
    let outcome = runner
        .spawn(&dump_request(entry, password), started)?
        .wait()
        .await?;

    if outcome.succeeded() {
        info!(database = %database, "scheduled backup completed");
        Ok(0)
    } else {
        error!(database = %database, code = ?outcome.exit_code, "scheduled backup failed");
        Ok(1)
    }
}
