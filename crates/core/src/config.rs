use std::env;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Load .env file (silently ignores if missing).
pub fn load_dotenv() {
    dotenvy::dotenv().ok();
}

fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_opt(key: &str) -> Option<String> {
    env::var(key).ok().filter(|s| !s.is_empty())
}

/// Read a profiled env var: tries {PROFILE}_{KEY} first, falls back to {KEY}.
fn profiled_env_opt(profile: &str, key: &str) -> Option<String> {
    if !profile.is_empty() {
        let prefixed = format!("{}_{}", profile, key);
        if let Some(v) = env_opt(&prefixed) {
            return Some(v);
        }
    }
    env_opt(key)
}

fn profiled_env_or(profile: &str, key: &str, default: &str) -> String {
    profiled_env_opt(profile, key).unwrap_or_else(|| default.to_string())
}

fn profiled_env_u16(profile: &str, key: &str, default: u16) -> u16 {
    profiled_env_opt(profile, key)
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn profiled_env_bool(profile: &str, key: &str, default: bool) -> bool {
    profiled_env_opt(profile, key)
        .map(|v| matches!(v.to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on"))
        .unwrap_or(default)
}

/// Default dump pipeline. Reads connection details and the output path from
/// the environment prepared by the job runner.
pub const DEFAULT_DUMP_COMMAND: &str = "mysqldump --single-transaction --routines \
-h \"$DB_HOST\" -P \"$DB_PORT\" -u \"$DB_USER\" \"$DB_DATABASE\" | gzip -c > \"$BACKUP_FILE\"";

// ── Top-level config ──────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Active profile name (empty = default).
    pub profile: String,
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub vault: VaultConfig,
    pub jobs: JobsConfig,
}

impl Config {
    /// Build config from environment variables (call `load_dotenv()` first).
    /// Profile is read from `CRONVAULT_PROFILE`. When set (e.g. `PROD`),
    /// every key is first looked up as `{PROFILE}_{KEY}`, falling back to `{KEY}`.
    pub fn from_env() -> Self {
        let profile = env_or("CRONVAULT_PROFILE", "").to_uppercase();
        Self::for_profile(&profile)
    }

    /// Build config for a specific named profile (empty string = default).
    pub fn for_profile(profile: &str) -> Self {
        let p = profile.to_uppercase();
        let p = p.as_str();
        let storage = StorageConfig::from_env_profiled(p);
        Self {
            profile: p.to_string(),
            server: ServerConfig::from_env_profiled(p),
            vault: VaultConfig::from_env_profiled(p, &storage),
            jobs: JobsConfig::from_env_profiled(p, &storage),
            storage,
        }
    }

    /// Config rooted at `data_dir` with every other setting at its default.
    /// Used by tests and by the `run` subcommand's `--data-dir` override.
    pub fn with_data_dir(mut self, data_dir: impl Into<PathBuf>) -> Self {
        let data_dir = data_dir.into();
        self.storage = StorageConfig::rooted_at(data_dir);
        self.vault.passwords_file = self.storage.data_dir.join("passwords.json");
        self.jobs.log_dir = self.storage.data_dir.join("logs");
        self
    }

    pub fn profile_label(&self) -> &str {
        if self.profile.is_empty() { "default" } else { &self.profile }
    }

    /// Print a redacted summary for startup logs.
    pub fn log_summary(&self) {
        tracing::info!("Config loaded (profile: {}):", self.profile_label());
        tracing::info!("  server:   {}:{}, api_token configured={}", self.server.host, self.server.port, self.server.api_token.is_some());
        tracing::info!("  storage:  data_dir={}, backup_dir={}", self.storage.data_dir.display(), self.storage.backup_dir.display());
        tracing::info!("  vault:    file={}, enabled={}", self.vault.passwords_file.display(), self.vault.is_enabled());
        tracing::info!("  jobs:     log_dir={}, install_crontab={}", self.jobs.log_dir.display(), self.jobs.install_crontab);
    }
}

// ── Server ────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Shared bearer token for `/api/*`. `None` means every protected
    /// request is refused.
    #[serde(skip_serializing)]
    pub api_token: Option<String>,
}

impl ServerConfig {
    fn from_env_profiled(p: &str) -> Self {
        Self {
            host: profiled_env_or(p, "HOST", "127.0.0.1"),
            port: profiled_env_u16(p, "PORT", 3000),
            api_token: profiled_env_opt(p, "API_TOKEN"),
        }
    }
}

// ── Storage ───────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub data_dir: PathBuf,
    pub backup_dir: PathBuf,
}

impl StorageConfig {
    fn from_env_profiled(p: &str) -> Self {
        let data_dir = PathBuf::from(profiled_env_or(p, "DATA_DIR", "data"));
        let backup_dir = profiled_env_opt(p, "BACKUP_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| data_dir.join("backups"));
        Self { data_dir, backup_dir }
    }

    fn rooted_at(data_dir: PathBuf) -> Self {
        Self {
            backup_dir: data_dir.join("backups"),
            data_dir,
        }
    }

    /// Persisted backup plan (databases + schedules).
    pub fn plan_file(&self) -> PathBuf {
        self.data_dir.join("config.json")
    }

    pub fn identity_file(&self) -> PathBuf {
        self.data_dir.join("backup-ids.json")
    }

    /// Directory holding per-database lock and status files.
    pub fn run_dir(&self) -> PathBuf {
        self.data_dir.join("run")
    }

    pub fn crontab_file(&self) -> PathBuf {
        self.data_dir.join("crontab")
    }
}

// ── Vault ─────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VaultConfig {
    /// Operator encryption secret. `None` disables the vault.
    #[serde(skip_serializing)]
    pub secret: Option<String>,
    pub passwords_file: PathBuf,
}

impl VaultConfig {
    fn from_env_profiled(p: &str, storage: &StorageConfig) -> Self {
        let passwords_file = profiled_env_opt(p, "PASSWORDS_FILE")
            .map(PathBuf::from)
            .unwrap_or_else(|| storage.data_dir.join("passwords.json"));
        Self {
            secret: profiled_env_opt(p, "ENCRYPTION_SECRET"),
            passwords_file,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.secret.is_some()
    }
}

// ── Jobs ──────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobsConfig {
    /// Shell snippet run via `sh -c` for every dump.
    pub dump_command: String,
    /// Binary invoked by generated crontab lines.
    pub job_binary: PathBuf,
    pub log_dir: PathBuf,
    /// Run `crontab <file>` after regenerating the job table.
    pub install_crontab: bool,
}

impl JobsConfig {
    fn from_env_profiled(p: &str, storage: &StorageConfig) -> Self {
        let job_binary = profiled_env_opt(p, "JOB_BINARY")
            .map(PathBuf::from)
            .or_else(|| env::current_exe().ok())
            .unwrap_or_else(|| PathBuf::from("cronvault"));
        let log_dir = profiled_env_opt(p, "JOB_LOG_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| storage.data_dir.join("logs"));
        Self {
            dump_command: profiled_env_or(p, "DUMP_COMMAND", DEFAULT_DUMP_COMMAND),
            job_binary,
            log_dir,
            install_crontab: profiled_env_bool(p, "INSTALL_CRONTAB", false),
        }
    }
}
