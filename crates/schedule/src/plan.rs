//! The persisted backup plan: which databases exist and when each is dumped.
//!
//! A [`BackupPlan`] can only be obtained through validation. JSON goes through
//! [`PlanDocument`] and `TryFrom`, so an unknown database reference or a bad
//! cron expression is rejected before anything reaches disk.

use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use cronvault_core::fs::{read_json, write_json_atomic};
use cronvault_core::{is_valid_config_name, CoreError};

use crate::cron::{validate_cron, CronError};

#[derive(Error, Debug)]
pub enum PlanError {
    #[error("Invalid database name '{0}': use 1-64 characters of A-Z, a-z, 0-9, '_' or '-'")]
    InvalidDatabaseName(String),

    #[error("Database '{0}' is defined more than once")]
    DuplicateDatabase(String),

    #[error("Schedule #{index} references unknown database '{database}'")]
    UnknownDatabase { index: usize, database: String },

    #[error("Schedule #{index} ({database}): {source}")]
    InvalidCron {
        index: usize,
        database: String,
        #[source]
        source: CronError,
    },

    #[error("Plan storage error: {0}")]
    Storage(#[from] CoreError),
}

fn default_host() -> String {
    "localhost".to_string()
}

fn default_port() -> u16 {
    3306
}

fn default_user() -> String {
    "root".to_string()
}

/// Connection details for one database. `name` is the config name used as
/// the key everywhere else (vault, locks, backup files).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatabaseEntry {
    pub name: String,
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_user")]
    pub user: String,
    /// Schema name on the server; defaults to `name`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub database: Option<String>,
}

impl DatabaseEntry {
    pub fn schema_name(&self) -> &str {
        self.database.as_deref().unwrap_or(&self.name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleEntry {
    pub database: String,
    pub cron: String,
}

/// Unvalidated wire form of the plan.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PlanDocument {
    #[serde(default)]
    pub databases: Vec<DatabaseEntry>,
    #[serde(default)]
    pub schedules: Vec<ScheduleEntry>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "PlanDocument")]
pub struct BackupPlan {
    databases: Vec<DatabaseEntry>,
    schedules: Vec<ScheduleEntry>,
}

impl TryFrom<PlanDocument> for BackupPlan {
    type Error = PlanError;

    fn try_from(doc: PlanDocument) -> Result<Self, Self::Error> {
        let mut names = HashSet::new();
        for db in &doc.databases {
            if !is_valid_config_name(&db.name) {
                return Err(PlanError::InvalidDatabaseName(db.name.clone()));
            }
            if !names.insert(db.name.as_str()) {
                return Err(PlanError::DuplicateDatabase(db.name.clone()));
            }
        }

        for (i, schedule) in doc.schedules.iter().enumerate() {
            let index = i + 1;
            if !names.contains(schedule.database.as_str()) {
                return Err(PlanError::UnknownDatabase {
                    index,
                    database: schedule.database.clone(),
                });
            }
            validate_cron(&schedule.cron).map_err(|source| PlanError::InvalidCron {
                index,
                database: schedule.database.clone(),
                source,
            })?;
        }

        Ok(Self {
            databases: doc.databases,
            schedules: doc.schedules,
        })
    }
}

impl BackupPlan {
    pub fn new(
        databases: Vec<DatabaseEntry>,
        schedules: Vec<ScheduleEntry>,
    ) -> Result<Self, PlanError> {
        Self::try_from(PlanDocument {
            databases,
            schedules,
        })
    }

    pub fn databases(&self) -> &[DatabaseEntry] {
        &self.databases
    }

    pub fn schedules(&self) -> &[ScheduleEntry] {
        &self.schedules
    }

    pub fn database(&self, name: &str) -> Option<&DatabaseEntry> {
        self.databases.iter().find(|d| d.name == name)
    }

    /// Load the plan from `path`. A missing file is an empty plan.
    pub fn load(path: &Path) -> Result<Self, PlanError> {
        let doc: Option<PlanDocument> = read_json(path)?;
        doc.map(Self::try_from)
            .transpose()
            .map(Option::unwrap_or_default)
    }

    /// Atomically replace the plan file.
    pub fn save(&self, path: &Path) -> Result<(), PlanError> {
        write_json_atomic(path, self, None)?;
        info!(
            databases = self.databases.len(),
            schedules = self.schedules.len(),
            "saved backup plan to {}",
            path.display()
        );
        Ok(())
    }
}
