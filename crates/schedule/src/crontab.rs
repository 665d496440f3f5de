//! Compile the backup plan into the OS job table.
//!
//! The table is regenerated in full on every plan or password change; there is
//! no incremental diff. Each job's environment carries only the shared API
//! token and port, which the job uses to fetch its password from the server.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::process::Command;

use tracing::{info, warn};

use cronvault_core::fs::{write_atomic, PRIVATE_FILE_MODE};
use cronvault_core::{Config, CoreError};

use crate::plan::{BackupPlan, ScheduleEntry};

/// What the projector knows about stored credentials.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VaultAvailability {
    /// No encryption secret configured.
    Disabled,
    /// The store exists but cannot be decrypted with the current secret.
    Failing,
    /// Names that currently have a stored password.
    Available(BTreeSet<String>),
}

#[derive(Debug, Clone)]
pub struct CrontabSettings {
    pub api_token: Option<String>,
    pub port: u16,
    pub job_binary: PathBuf,
    pub data_dir: PathBuf,
    pub log_dir: PathBuf,
    pub install: bool,
}

impl CrontabSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            api_token: config.server.api_token.clone(),
            port: config.server.port,
            job_binary: config.jobs.job_binary.clone(),
            data_dir: config.storage.data_dir.clone(),
            log_dir: config.jobs.log_dir.clone(),
            install: config.jobs.install_crontab,
        }
    }
}

pub struct CrontabProjector {
    settings: CrontabSettings,
}

const HEADER: &str = "# Generated by cronvault; regenerated on every configuration change. Do not edit.\n";

impl CrontabProjector {
    pub fn new(settings: CrontabSettings) -> Self {
        Self { settings }
    }

    /// Render the full job table. Deterministic: same inputs, same bytes.
    pub fn render(&self, plan: &BackupPlan, vault: &VaultAvailability) -> String {
        let mut out = String::from(HEADER);
        for schedule in plan.schedules() {
            let line = self.job_line(schedule);
            match self.skip_reason(schedule, vault) {
                Some(reason) => out.push_str(&format!("# skipped ({reason}): {line}\n")),
                None => {
                    out.push_str(&line);
                    out.push('\n');
                }
            }
        }
        out
    }

    /// Render, write to `path` with owner-only permissions, and install it if configured.
    pub fn project(
        &self,
        plan: &BackupPlan,
        vault: &VaultAvailability,
        path: &Path,
    ) -> Result<(), CoreError> {
        let table = self.render(plan, vault);
        write_atomic(path, table.as_bytes(), Some(PRIVATE_FILE_MODE))?;
        info!(
            schedules = plan.schedules().len(),
            "wrote job table to {}",
            path.display()
        );

        if self.settings.install {
            // The file on disk is already correct; a failed install is only logged.
            if let Err(e) = install(path) {
                warn!(error = %e, "failed to install job table with crontab");
            }
        }
        Ok(())
    }

    fn skip_reason(&self, schedule: &ScheduleEntry, vault: &VaultAvailability) -> Option<&'static str> {
        if self.settings.api_token.is_none() {
            return Some("API_TOKEN not configured");
        }
        match vault {
            VaultAvailability::Disabled => Some("vault disabled"),
            VaultAvailability::Failing => Some("vault cannot be decrypted"),
            VaultAvailability::Available(names) if !names.contains(&schedule.database) => {
                Some("no stored password")
            }
            VaultAvailability::Available(_) => None,
        }
    }

    fn job_line(&self, schedule: &ScheduleEntry) -> String {
        let s = &self.settings;
        let log_file = s.log_dir.join(format!("{}.log", schedule.database));
        let command = format!(
            "API_TOKEN={} PORT={} {} run {} --data-dir {} >> {} 2>&1",
            sh_quote(s.api_token.as_deref().unwrap_or_default()),
            sh_quote(&s.port.to_string()),
            sh_quote(&s.job_binary.to_string_lossy()),
            sh_quote(&schedule.database),
            sh_quote(&s.data_dir.to_string_lossy()),
            sh_quote(&log_file.to_string_lossy()),
        );
        // `%` is a line break in a crontab command field
        format!("{} {}", schedule.cron, command.replace('%', "\\%"))
    }
}

fn install(path: &Path) -> std::io::Result<()> {
    let status = Command::new("crontab").arg(path).status()?;
    if status.success() {
        info!("installed job table from {}", path.display());
        Ok(())
    } else {
        Err(std::io::Error::other(format!("crontab exited with {status}")))
    }
}

/// Quote `value` as a single `sh` word.
fn sh_quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', r"'\''"))
}
