//! Schedules: cron validation and description, the persisted backup plan,
//! and projection of that plan into the OS job table.

pub mod cron;
pub mod crontab;
pub mod plan;

pub use cron::{describe, validate_cron, CronError, CronExpression, CronField};
pub use crontab::{CrontabProjector, CrontabSettings, VaultAvailability};
pub use plan::{BackupPlan, DatabaseEntry, PlanDocument, PlanError, ScheduleEntry};
