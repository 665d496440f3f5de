//! [`JobCoordinator`] backed by `flock(2)` lock files and JSON status records.

use std::fs::{self, File, OpenOptions};
use std::io;
use std::os::unix::fs::OpenOptionsExt;
use std::os::unix::io::AsRawFd;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use cronvault_core::fs::{read_json, write_json_atomic, PRIVATE_FILE_MODE};
use cronvault_core::is_valid_config_name;

use super::probe::{ProcessProbe, SignalProbe};
use super::{CoordinatorError, JobCoordinator, RunningJob, StatusRecord};

const LOCK_SUFFIX: &str = ".lock";
const STATUS_SUFFIX: &str = ".status.json";

/// Held for the lifetime of one job.
///
/// Dropping it removes the status record and closes the lock file, which
/// releases the lock. If the owner dies instead, the kernel releases the lock
/// and the leftover record is healed by liveness probing.
#[derive(Debug)]
pub struct JobLease {
    database: String,
    status_path: PathBuf,
    _lock: File,
}

impl JobLease {
    pub fn database(&self) -> &str {
        &self.database
    }
}

impl Drop for JobLease {
    fn drop(&mut self) {
        if let Err(e) = remove_if_exists(&self.status_path) {
            warn!(database = %self.database, error = %e, "failed to clear status record");
        }
        debug!(database = %self.database, "released job lock");
    }
}

pub struct FileJobCoordinator<P = SignalProbe> {
    run_dir: PathBuf,
    probe: P,
}

impl FileJobCoordinator<SignalProbe> {
    pub fn new(run_dir: impl Into<PathBuf>) -> Self {
        Self::with_probe(run_dir, SignalProbe)
    }
}

impl<P: ProcessProbe> FileJobCoordinator<P> {
    pub fn with_probe(run_dir: impl Into<PathBuf>, probe: P) -> Self {
        Self {
            run_dir: run_dir.into(),
            probe,
        }
    }

    pub fn run_dir(&self) -> &Path {
        &self.run_dir
    }

    fn lock_path(&self, database: &str) -> PathBuf {
        self.run_dir.join(format!("{database}{LOCK_SUFFIX}"))
    }

    fn status_path(&self, database: &str) -> PathBuf {
        self.run_dir.join(format!("{database}{STATUS_SUFFIX}"))
    }

    fn check_name(database: &str) -> Result<(), CoordinatorError> {
        if is_valid_config_name(database) {
            Ok(())
        } else {
            Err(CoordinatorError::InvalidName(database.to_string()))
        }
    }

    /// Remove a stale record unless a new job has replaced it since it was read.
    ///
    /// `list_running` does not hold the database lock, so an `acquire` from
    /// another process may clear the stale record and publish its own between
    /// the liveness probe and the removal.
    fn remove_if_unchanged(&self, path: &Path, stale: &StatusRecord) -> io::Result<bool> {
        match read_json::<StatusRecord>(path) {
            Ok(Some(current)) if current.pid == stale.pid && current.started == stale.started => {
                remove_if_exists(path)?;
                Ok(true)
            }
            Ok(_) => Ok(false),
            // Garbage written in between is left for the next read to discard.
            Err(_) => Ok(false),
        }
    }

    /// Read a status record. Unparseable records are dropped as stale.
    fn read_status(&self, path: &Path) -> Option<StatusRecord> {
        match read_json::<StatusRecord>(path) {
            Ok(record) => record,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "discarding unreadable status record");
                let _ = remove_if_exists(path);
                None
            }
        }
    }
}

impl<P: ProcessProbe> JobCoordinator for FileJobCoordinator<P> {
    fn acquire(&self, database: &str) -> Result<JobLease, CoordinatorError> {
        Self::check_name(database)?;
        fs::create_dir_all(&self.run_dir)?;

        let lock = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .mode(PRIVATE_FILE_MODE)
            .open(self.lock_path(database))?;

        let status_path = self.status_path(database);
        if !try_lock_exclusive(&lock)? {
            let pid = self.read_status(&status_path).map(|r| r.pid);
            debug!(database = %database, ?pid, "lock held by another job");
            return Err(CoordinatorError::AlreadyRunning {
                database: database.to_string(),
                pid,
            });
        }

        // The lock is ours, but a job started by a previous lock holder may
        // still be alive (e.g. a dump child that outlived its server).
        if let Some(record) = self.read_status(&status_path) {
            if self.probe.is_alive(record.pid) {
                debug!(database = %database, pid = record.pid, "recorded job still alive");
                return Err(CoordinatorError::AlreadyRunning {
                    database: database.to_string(),
                    pid: Some(record.pid),
                });
            }
            info!(database = %database, pid = record.pid, "clearing stale status record");
            remove_if_exists(&status_path)?;
        }

        debug!(database = %database, "acquired job lock");
        Ok(JobLease {
            database: database.to_string(),
            status_path,
            _lock: lock,
        })
    }

    fn publish_status(
        &self,
        database: &str,
        pid: u32,
        started: DateTime<Utc>,
    ) -> Result<(), CoordinatorError> {
        Self::check_name(database)?;
        let record = StatusRecord {
            running: true,
            database: database.to_string(),
            pid,
            started,
        };
        write_json_atomic(&self.status_path(database), &record, None)?;
        info!(database = %database, pid, "job running");
        Ok(())
    }

    fn clear_status(&self, database: &str) -> Result<(), CoordinatorError> {
        Self::check_name(database)?;
        remove_if_exists(&self.status_path(database))?;
        Ok(())
    }

    fn list_running(&self) -> Result<Vec<RunningJob>, CoordinatorError> {
        let entries = match fs::read_dir(&self.run_dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut running = Vec::new();
        for entry in entries {
            let path = entry?.path();
            let is_status = path
                .file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.ends_with(STATUS_SUFFIX));
            if !is_status {
                continue;
            }
            let Some(record) = self.read_status(&path) else {
                continue;
            };
            if self.probe.is_alive(record.pid) {
                running.push(RunningJob::from(record));
            } else if self.remove_if_unchanged(&path, &record)? {
                info!(database = %record.database, pid = record.pid, "removed stale status record");
            }
        }

        running.sort_by(|a, b| a.database.cmp(&b.database));
        Ok(running)
    }
}

/// Non-blocking exclusive `flock`. `Ok(false)` when someone else holds it.
fn try_lock_exclusive(file: &File) -> io::Result<bool> {
    let rc = unsafe { libc::flock(file.as_raw_fd(), libc::LOCK_EX | libc::LOCK_NB) };
    if rc == 0 {
        return Ok(true);
    }
    let err = io::Error::last_os_error();
    if err.raw_os_error() == Some(libc::EWOULDBLOCK) {
        Ok(false)
    } else {
        Err(err)
    }
}

fn remove_if_exists(path: &Path) -> io::Result<()> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e),
    }
}
