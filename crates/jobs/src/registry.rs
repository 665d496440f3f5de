//! Stable, never-reused public IDs for backup artifacts.

use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use cronvault_core::fs::{read_json, write_json_atomic};
use cronvault_core::{CoreError, MutationQueue};

use crate::artifact::BackupArtifact;

#[derive(Error, Debug)]
pub enum RegistryError {
    #[error("Identity store error: {0}")]
    Storage(#[from] CoreError),
}

/// `backup-ids.json`. `next_id` is always greater than every ID ever issued.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IdentityStore {
    pub next_id: u64,
    #[serde(default)]
    pub by_filename: BTreeMap<String, u64>,
}

impl Default for IdentityStore {
    fn default() -> Self {
        Self {
            next_id: 1,
            by_filename: BTreeMap::new(),
        }
    }
}

impl IdentityStore {
    /// Give every artifact its ID, issuing new ones as needed.
    /// Returns whether the store changed and needs persisting.
    pub fn assign(&mut self, artifacts: &mut [BackupArtifact]) -> bool {
        let mut changed = self.repair_next_id();
        let mut claimed: HashSet<u64> = self.by_filename.values().copied().collect();

        artifacts.sort_by(|a, b| a.filename.cmp(&b.filename));
        for artifact in artifacts.iter_mut() {
            if let Some(&id) = self.by_filename.get(&artifact.filename) {
                artifact.id = Some(id);
                continue;
            }

            let mut id = self.next_id;
            while claimed.contains(&id) {
                id += 1;
            }
            claimed.insert(id);
            self.by_filename.insert(artifact.filename.clone(), id);
            self.next_id = id + 1;
            artifact.id = Some(id);
            changed = true;
        }
        changed
    }

    pub fn filename_for(&self, id: u64) -> Option<&str> {
        self.by_filename
            .iter()
            .find(|(_, v)| **v == id)
            .map(|(k, _)| k.as_str())
    }

    /// Hand-edited or foreign stores may carry IDs at or above `next_id`.
    fn repair_next_id(&mut self) -> bool {
        let floor = self
            .by_filename
            .values()
            .max()
            .map_or(1, |max| max + 1);
        if self.next_id < floor {
            debug!(from = self.next_id, to = floor, "advancing nextId past issued IDs");
            self.next_id = floor;
            true
        } else {
            false
        }
    }
}

/// Persisted filename → ID map. Each call's read-modify-persist cycle runs
/// alone through the registry's [`MutationQueue`]. Only one process is
/// expected to write the store.
pub struct BackupIdentityRegistry {
    path: PathBuf,
    queue: MutationQueue,
}

impl BackupIdentityRegistry {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            queue: MutationQueue::new(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Annotate `artifacts` with their IDs, sorted by file name.
    pub async fn assign_ids(
        &self,
        mut artifacts: Vec<BackupArtifact>,
    ) -> Result<Vec<BackupArtifact>, RegistryError> {
        let _turn = self.queue.enter().await;
        let mut store = self.load()?;
        if store.assign(&mut artifacts) {
            write_json_atomic(&self.path, &store, None)?;
            info!(
                next_id = store.next_id,
                known = store.by_filename.len(),
                "updated backup identity store"
            );
        }
        Ok(artifacts)
    }

    /// File name that was issued `id`, if any. Works for deleted artifacts too.
    pub async fn resolve(&self, id: u64) -> Result<Option<String>, RegistryError> {
        let _turn = self.queue.enter().await;
        Ok(self.load()?.filename_for(id).map(str::to_string))
    }

    fn load(&self) -> Result<IdentityStore, RegistryError> {
        Ok(read_json(&self.path)?.unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifact::artifact_filename;
    use chrono::{TimeZone, Utc};

    fn artifact(db: &str, hour: u32) -> BackupArtifact {
        let timestamp = Utc.with_ymd_and_hms(2026, 1, 2, hour, 0, 0).unwrap();
        BackupArtifact {
            id: None,
            filename: artifact_filename(db, timestamp),
            database: db.to_string(),
            timestamp,
            size: 10,
        }
    }

    fn ids(list: &[BackupArtifact]) -> Vec<u64> {
        list.iter().map(|a| a.id.unwrap()).collect()
    }

    #[test]
    fn test_ids_follow_chronological_order() {
        let mut store = IdentityStore::default();
        let mut list = vec![artifact("prod", 5), artifact("prod", 1), artifact("dev", 3)];
        assert!(store.assign(&mut list));
        assert_eq!(ids(&list), vec![1, 2, 3]);
        assert_eq!(list[0].timestamp.format("%H").to_string(), "01");
        assert_eq!(store.next_id, 4);
    }

    #[test]
    fn test_repeated_assignment_is_stable_and_unchanged() {
        let mut store = IdentityStore::default();
        let mut first = vec![artifact("prod", 1), artifact("prod", 2)];
        store.assign(&mut first);

        let mut again = vec![artifact("prod", 2), artifact("prod", 1)];
        assert!(!store.assign(&mut again));
        assert_eq!(ids(&again), ids(&first));
    }

    #[test]
    fn test_deleted_ids_are_never_reused() {
        let mut store = IdentityStore::default();
        let mut list = vec![artifact("prod", 1), artifact("prod", 2), artifact("prod", 3)];
        store.assign(&mut list);

        // hour 3 deleted, hour 4 appears
        let mut list = vec![artifact("prod", 1), artifact("prod", 2), artifact("prod", 4)];
        store.assign(&mut list);
        assert_eq!(ids(&list), vec![1, 2, 4]);
        assert_eq!(store.filename_for(3), Some(artifact("prod", 3).filename.as_str()));
    }

    #[test]
    fn test_hand_edited_store_never_hands_out_taken_ids() {
        let mut store = IdentityStore {
            next_id: 2,
            by_filename: BTreeMap::from([
                (artifact("prod", 1).filename, 1),
                ("20250101T000000Z_old.sql.gz".to_string(), 7),
            ]),
        };
        let mut list = vec![artifact("prod", 1), artifact("prod", 2)];
        assert!(store.assign(&mut list));
        assert_eq!(ids(&list), vec![1, 8]);
        assert_eq!(store.next_id, 9);
    }

    #[tokio::test]
    async fn test_registry_persists_only_on_change() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("backup-ids.json");
        let registry = BackupIdentityRegistry::new(&path);

        assert!(registry.assign_ids(vec![]).await.unwrap().is_empty());
        assert!(!path.exists());

        let out = registry
            .assign_ids(vec![artifact("prod", 1), artifact("prod", 2)])
            .await
            .unwrap();
        assert_eq!(ids(&out), vec![1, 2]);
        let raw: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(raw["nextId"], 3);
        assert_eq!(raw["byFilename"][artifact("prod", 2).filename.as_str()], 2);

        let modified = std::fs::metadata(&path).unwrap().modified().unwrap();
        registry.assign_ids(vec![artifact("prod", 1)]).await.unwrap();
        assert_eq!(std::fs::metadata(&path).unwrap().modified().unwrap(), modified);

        let reopened = BackupIdentityRegistry::new(&path);
        assert_eq!(
            reopened.resolve(2).await.unwrap(),
            Some(artifact("prod", 2).filename)
        );
        assert_eq!(reopened.resolve(99).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_concurrent_calls_do_not_collide() {
        let tmp = tempfile::tempdir().unwrap();
        let registry = std::sync::Arc::new(BackupIdentityRegistry::new(tmp.path().join("ids.json")));

        let mut handles = Vec::new();
        for hour in 0..6 {
            let registry = registry.clone();
            handles.push(tokio::spawn(async move {
                registry.assign_ids(vec![artifact("prod", hour)]).await.unwrap()
            }));
        }
        let mut seen = HashSet::new();
        for h in handles {
            let out = h.await.unwrap();
            assert!(seen.insert(out[0].id.unwrap()));
        }
        assert_eq!(seen.len(), 6);
    }
}
