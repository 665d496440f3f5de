//! Backup artifacts as found in the backup directory.
//!
//! File names are `<YYYYMMDDTHHMMSSZ>_<configName>.sql.gz`. The fixed-width
//! UTC timestamp comes first, so lexicographic order is chronological.

use std::collections::BTreeMap;
use std::path::Path;

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::Serialize;
use tracing::debug;

use cronvault_core::is_valid_config_name;

pub const ARTIFACT_SUFFIX: &str = ".sql.gz";
const TIMESTAMP_FORMAT: &str = "%Y%m%dT%H%M%SZ";
const TIMESTAMP_LEN: usize = 16;

/// One finished dump on disk. `id` is filled in by the identity registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BackupArtifact {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<u64>,
    pub filename: String,
    pub database: String,
    pub timestamp: DateTime<Utc>,
    pub size: u64,
}

pub fn artifact_filename(database: &str, timestamp: DateTime<Utc>) -> String {
    format!(
        "{}_{}{}",
        timestamp.format(TIMESTAMP_FORMAT),
        database,
        ARTIFACT_SUFFIX
    )
}

/// Split an artifact file name into `(database, timestamp)`.
/// Anything else in the directory (partial dumps, stray files) yields `None`.
pub fn parse_artifact_filename(filename: &str) -> Option<(String, DateTime<Utc>)> {
    let stem = filename.strip_suffix(ARTIFACT_SUFFIX)?;
    let (stamp, database) = stem.split_once('_')?;
    if stamp.len() != TIMESTAMP_LEN || !is_valid_config_name(database) {
        return None;
    }
    let naive = NaiveDateTime::parse_from_str(stamp, TIMESTAMP_FORMAT).ok()?;
    Some((database.to_string(), naive.and_utc()))
}

/// List artifacts directly inside `dir`, sorted by file name.
/// A missing directory is an empty listing.
pub fn scan_artifacts(dir: &Path) -> std::io::Result<Vec<BackupArtifact>> {
    if !dir.exists() {
        return Ok(Vec::new());
    }

    let mut artifacts = Vec::new();
    for entry in walkdir::WalkDir::new(dir).min_depth(1).max_depth(1) {
        let entry = entry.map_err(std::io::Error::other)?;
        if !entry.file_type().is_file() {
            continue;
        }
        let Some(filename) = entry.file_name().to_str() else {
            continue;
        };
        let Some((database, timestamp)) = parse_artifact_filename(filename) else {
            debug!("ignoring non-artifact file {}", entry.path().display());
            continue;
        };
        let size = entry.metadata().map_err(std::io::Error::other)?.len();
        artifacts.push(BackupArtifact {
            id: None,
            filename: filename.to_string(),
            database,
            timestamp,
            size,
        });
    }

    artifacts.sort_by(|a, b| a.filename.cmp(&b.filename));
    Ok(artifacts)
}

/// Group by database, newest first within each group.
pub fn group_by_database(artifacts: Vec<BackupArtifact>) -> BTreeMap<String, Vec<BackupArtifact>> {
    let mut groups: BTreeMap<String, Vec<BackupArtifact>> = BTreeMap::new();
    for artifact in artifacts {
        groups.entry(artifact.database.clone()).or_default().push(artifact);
    }
    for list in groups.values_mut() {
        list.sort_by(|a, b| b.filename.cmp(&a.filename));
    }
    groups
}
