//! Launching the external dump pipeline for one database.
//!
//! The pipeline is an operator-supplied shell snippet. It receives the
//! connection details and the output path through its environment and writes
//! into a `*.partial` file, which is renamed into a visible artifact only
//! after a zero exit.

use std::fs::OpenOptions;
use std::io;
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};

use chrono::{DateTime, Utc};
use thiserror::Error;
use tokio::process::{Child, Command};
use tracing::{error, info, warn};

use crate::artifact::artifact_filename;

#[derive(Error, Debug)]
pub enum RunnerError {
    #[error("Failed to start dump for '{database}': {source}")]
    Spawn {
        database: String,
        #[source]
        source: io::Error,
    },

    #[error("Dump process for '{0}' exited before reporting a pid")]
    NoPid(String),

    #[error("Dump IO error: {0}")]
    Io(#[from] io::Error),
}

/// Everything the dump command needs for one database.
#[derive(Clone)]
pub struct DumpRequest {
    pub database: String,
    pub host: String,
    pub port: u16,
    pub user: String,
    pub schema: String,
    pub password: String,
}

impl std::fmt::Debug for DumpRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DumpRequest")
            .field("database", &self.database)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("schema", &self.schema)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DumpOutcome {
    pub database: String,
    pub exit_code: Option<i32>,
    /// Final artifact path, present only on success.
    pub artifact: Option<PathBuf>,
}

impl DumpOutcome {
    pub fn succeeded(&self) -> bool {
        self.artifact.is_some()
    }
}

#[derive(Debug, Clone)]
pub struct DumpRunner {
    command: String,
    backup_dir: PathBuf,
    log_dir: Option<PathBuf>,
}

impl DumpRunner {
    pub fn new(command: impl Into<String>, backup_dir: impl Into<PathBuf>) -> Self {
        Self {
            command: command.into(),
            backup_dir: backup_dir.into(),
            log_dir: None,
        }
    }

    /// Append the child's output to `<log_dir>/<database>.log` instead of
    /// inheriting this process's stdout and stderr.
    pub fn with_log_dir(mut self, log_dir: impl Into<PathBuf>) -> Self {
        self.log_dir = Some(log_dir.into());
        self
    }

    pub fn backup_dir(&self) -> &Path {
        &self.backup_dir
    }

    /// Start the dump and return at once. The artifact name is derived from `started`.
    pub fn spawn(&self, request: &DumpRequest, started: DateTime<Utc>) -> Result<RunningDump, RunnerError> {
        std::fs::create_dir_all(&self.backup_dir)?;
        let final_path = self
            .backup_dir
            .join(artifact_filename(&request.database, started));
        let mut partial_name = final_path.clone().into_os_string();
        partial_name.push(".partial");
        let partial_path = PathBuf::from(partial_name);

        let mut cmd = Command::new("sh");
        cmd.arg("-c")
            .arg(&self.command)
            .env("DB_NAME", &request.database)
            .env("DB_HOST", &request.host)
            .env("DB_PORT", request.port.to_string())
            .env("DB_USER", &request.user)
            .env("DB_DATABASE", &request.schema)
            .env("MYSQL_PWD", &request.password)
            .env("BACKUP_FILE", &partial_path)
            .stdin(Stdio::null());

        if let Some(dir) = &self.log_dir {
            std::fs::create_dir_all(dir)?;
            let log = OpenOptions::new()
                .create(true)
                .append(true)
                .open(dir.join(format!("{}.log", request.database)))?;
            cmd.stdout(log.try_clone()?).stderr(log);
        }

        let child = cmd.spawn().map_err(|source| RunnerError::Spawn {
            database: request.database.clone(),
            source,
        })?;
        let pid = child
            .id()
            .ok_or_else(|| RunnerError::NoPid(request.database.clone()))?;
        info!(database = %request.database, pid, "dump started");

        Ok(RunningDump {
            child,
            pid,
            database: request.database.clone(),
            partial_path,
            final_path,
        })
    }
}

/// A started dump. Await [`wait`](Self::wait) to finalize the artifact.
#[derive(Debug)]
pub struct RunningDump {
    child: Child,
    pid: u32,
    database: String,
    partial_path: PathBuf,
    final_path: PathBuf,
}

impl RunningDump {
    pub fn pid(&self) -> u32 {
        self.pid
    }

    pub fn database(&self) -> &str {
        &self.database
    }

    /// Wait for the child, then publish or discard its output.
    pub async fn wait(mut self) -> Result<DumpOutcome, RunnerError> {
        let status = self.child.wait().await?;
        let artifact = self.finalize(status)?;
        Ok(DumpOutcome {
            database: self.database,
            exit_code: status.code(),
            artifact,
        })
    }

    fn finalize(&self, status: ExitStatus) -> Result<Option<PathBuf>, RunnerError> {
        if !status.success() {
            error!(database = %self.database, pid = self.pid, code = ?status.code(), "dump failed");
            discard(&self.partial_path)?;
            return Ok(None);
        }
        if !self.partial_path.exists() {
            warn!(database = %self.database, "dump exited 0 but wrote no output");
            return Ok(None);
        }
        std::fs::rename(&self.partial_path, &self.final_path)?;
        info!(
            database = %self.database,
            pid = self.pid,
            "dump finished: {}",
            self.final_path.display()
        );
        Ok(Some(self.final_path.clone()))
    }
}

fn discard(path: &Path) -> io::Result<()> {
    match std::fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn request() -> DumpRequest {
        DumpRequest {
            database: "prod".into(),
            host: "db.internal".into(),
            port: 3307,
            user: "backup".into(),
            schema: "app".into(),
            password: "s3cr3t".into(),
        }
    }

    fn started() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 2, 3, 4, 5, 6).unwrap()
    }

    #[tokio::test]
    async fn test_successful_dump_becomes_artifact() {
        let tmp = tempfile::tempdir().unwrap();
        let runner = DumpRunner::new(
            r#"printf '%s|%s|%s|%s|%s|%s' "$DB_NAME" "$DB_HOST" "$DB_PORT" "$DB_USER" "$DB_DATABASE" "$MYSQL_PWD" > "$BACKUP_FILE""#,
            tmp.path().join("backups"),
        );

        let dump = runner.spawn(&request(), started()).unwrap();
        assert!(dump.pid() > 0);
        let outcome = dump.wait().await.unwrap();

        assert!(outcome.succeeded());
        assert_eq!(outcome.exit_code, Some(0));
        let artifact = outcome.artifact.unwrap();
        assert_eq!(
            artifact.file_name().unwrap().to_str().unwrap(),
            "20260203T040506Z_prod.sql.gz"
        );
        assert_eq!(
            std::fs::read_to_string(&artifact).unwrap(),
            "prod|db.internal|3307|backup|app|s3cr3t"
        );
    }

    #[tokio::test]
    async fn test_failed_dump_leaves_nothing_behind() {
        let tmp = tempfile::tempdir().unwrap();
        let backups = tmp.path().join("backups");
        let runner = DumpRunner::new(r#"echo partial > "$BACKUP_FILE"; exit 3"#, &backups);

        let outcome = runner.spawn(&request(), started()).unwrap().wait().await.unwrap();
        assert!(!outcome.succeeded());
        assert_eq!(outcome.exit_code, Some(3));
        assert_eq!(std::fs::read_dir(&backups).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_output_goes_to_log_dir() {
        let tmp = tempfile::tempdir().unwrap();
        let runner = DumpRunner::new(r#"echo hello-from-dump; : > "$BACKUP_FILE""#, tmp.path().join("b"))
            .with_log_dir(tmp.path().join("logs"));

        runner.spawn(&request(), started()).unwrap().wait().await.unwrap();
        let log = std::fs::read_to_string(tmp.path().join("logs/prod.log")).unwrap();
        assert!(log.contains("hello-from-dump"));
    }

    #[test]
    fn test_debug_hides_password() {
        assert!(!format!("{:?}", request()).contains("s3cr3t"));
    }
}
