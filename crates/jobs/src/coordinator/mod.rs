//! Cross-process execution coordination.
//!
//! Jobs run in separate OS processes (server-spawned dumps and cron-started
//! `run` commands). They coordinate only through the filesystem: one advisory
//! lock and one status record per database under the run directory.
//!
//! Per database: `Idle -> acquire -> Running -> lease dropped -> Idle`. A
//! record whose process has died counts as `Idle` everywhere and is removed
//! the next time anyone looks at it.

mod file;
mod probe;


use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use cronvault_core::CoreError;

pub use file::{FileJobCoordinator, JobLease};
pub use probe::{ProcessProbe, SignalProbe};

#[derive(Error, Debug)]
pub enum CoordinatorError {
    /// Another job holds the database. Never retried automatically.
    #[error("A backup of '{database}' is already running")]
    AlreadyRunning { database: String, pid: Option<u32> },

    #[error("Invalid database name '{0}'")]
    InvalidName(String),

    #[error("Coordinator IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Coordinator storage error: {0}")]
    Storage(#[from] CoreError),
}

/// On-disk status record, `run/<database>.status.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusRecord {
    pub running: bool,
    pub database: String,
    pub pid: u32,
    pub started: DateTime<Utc>,
}

/// A job whose process is confirmed alive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunningJob {
    pub database: String,
    pub pid: u32,
    pub started: DateTime<Utc>,
}

impl From<StatusRecord> for RunningJob {
    fn from(r: StatusRecord) -> Self {
        Self {
            database: r.database,
            pid: r.pid,
            started: r.started,
        }
    }
}

/// Per-database mutual exclusion plus a self-healing view of running jobs.
pub trait JobCoordinator: Send + Sync {
    /// Take the database's lock without waiting.
    /// Fails with [`CoordinatorError::AlreadyRunning`] if a live job holds it.
    fn acquire(&self, database: &str) -> Result<JobLease, CoordinatorError>;

    /// Record which process is doing the work, for `list_running` and for
    /// `acquire` calls made after the lock holder is gone.
    fn publish_status(
        &self,
        database: &str,
        pid: u32,
        started: DateTime<Utc>,
    ) -> Result<(), CoordinatorError>;

    fn clear_status(&self, database: &str) -> Result<(), CoordinatorError>;

    /// Jobs whose recorded process is alive. Stale records are deleted.
    fn list_running(&self) -> Result<Vec<RunningJob>, CoordinatorError>;
}
