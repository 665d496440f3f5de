//! [`CredentialVault`]: the encrypted password store.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info, warn};

use cronvault_core::config::VaultConfig;
use cronvault_core::fs::{read_json, write_json_atomic, PRIVATE_FILE_MODE};
use cronvault_core::{is_valid_config_name, MutationQueue};

use crate::envelope::PasswordEnvelope;
use crate::error::VaultError;

/// Snapshot reported to callers; `decryption_failing` is the sticky flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VaultStatus {
    pub enabled: bool,
    pub decryption_failing: bool,
}

/// Encrypted `configName -> password` store backed by a single file.
///
/// - Without a secret the vault is disabled: reads are empty and writes fail
///   with [`VaultError::NotConfigured`]. Nothing is ever stored in plaintext.
/// - Every mutation decrypts the whole map, applies one change, re-encrypts
///   with a fresh salt and IV, and atomically replaces the file (mode 0600).
///   Mutations run one at a time through a FIFO [`MutationQueue`].
/// - A wrong secret, failed authentication tag or unparseable file raises a
///   sticky "decryption failing" flag. Later calls short-circuit on it, and
///   mutations refuse to overwrite the undecryptable file. Only
///   [`reset`](Self::reset) (explicit data loss) or a new instance with the
///   right secret recovers.
///
/// Key derivation is memory-hard and slow, so every call that decrypts or
/// encrypts runs on tokio's blocking pool.
pub struct CredentialVault {
    store: Arc<SealedStore>,
    queue: MutationQueue,
}

/// File access and crypto, shared with blocking tasks.
struct SealedStore {
    secret: Option<String>,
    path: PathBuf,
    decryption_failing: AtomicBool,
}

impl CredentialVault {
    pub fn new(secret: Option<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            store: Arc::new(SealedStore {
                secret: secret.filter(|s| !s.is_empty()),
                path: path.into(),
                decryption_failing: AtomicBool::new(false),
            }),
            queue: MutationQueue::new(),
        }
    }

    pub fn from_config(config: &VaultConfig) -> Self {
        Self::new(config.secret.clone(), config.passwords_file.clone())
    }

    pub fn path(&self) -> &Path {
        &self.store.path
    }

    pub fn is_enabled(&self) -> bool {
        self.store.secret.is_some()
    }

    /// Current status. Uses only the stored secret digest, never key derivation.
    pub fn status(&self) -> VaultStatus {
        let Some(secret) = self.store.secret.as_deref() else {
            return VaultStatus {
                enabled: false,
                decryption_failing: false,
            };
        };
        if !self.is_failing() {
            match read_json::<PasswordEnvelope>(&self.store.path) {
                Ok(Some(env)) if !env.matches_secret(secret) => {
                    self.store.mark_failing("secret digest mismatch");
                }
                Ok(_) => {}
                Err(e) => self.store.mark_failing(&e.to_string()),
            }
        }
        VaultStatus {
            enabled: true,
            decryption_failing: self.is_failing(),
        }
    }

    pub fn is_failing(&self) -> bool {
        self.store.is_failing()
    }

    /// Fully decrypt the store once and report whether that worked. Meant for
    /// startup, so a wrong secret surfaces in the logs immediately.
    pub async fn verify(&self) -> VaultStatus {
        if self.is_enabled() {
            match self.blocking(|store| store.load()).await {
                Ok(map) => info!(stored = map.len(), "password vault unlocked"),
                Err(e) => warn!(error = %e, "password vault cannot be decrypted"),
            }
        }
        self.status()
    }

    /// Look up one password. `Ok(None)` when absent or when the vault is disabled.
    pub async fn get(&self, name: &str) -> Result<Option<String>, VaultError> {
        if !self.is_enabled() {
            return Ok(None);
        }
        let name = name.to_string();
        self.blocking(move |store| Ok(store.load()?.remove(&name)))
            .await
    }

    /// Names with a stored password. Empty when the vault is disabled.
    pub async fn list(&self) -> Result<BTreeSet<String>, VaultError> {
        if !self.is_enabled() {
            return Ok(BTreeSet::new());
        }
        self.blocking(|store| Ok(store.load()?.into_keys().collect()))
            .await
    }

    /// Store or replace a password.
    pub async fn set(&self, name: &str, password: &str) -> Result<(), VaultError> {
        self.store.secret()?;
        if !is_valid_config_name(name) {
            return Err(VaultError::InvalidName(name.to_string()));
        }

        let _turn = self.queue.enter().await;
        let (key, value) = (name.to_string(), password.to_string());
        self.blocking(move |store| {
            let mut map = store.load()?;
            map.insert(key, value);
            store.save(&map)
        })
        .await?;
        info!(name = %name, "stored password");
        Ok(())
    }

    /// Remove a password. Returns whether one was stored.
    pub async fn delete(&self, name: &str) -> Result<bool, VaultError> {
        self.store.secret()?;

        let _turn = self.queue.enter().await;
        let key = name.to_string();
        let removed = self
            .blocking(move |store| {
                let mut map = store.load()?;
                if map.remove(&key).is_none() {
                    return Ok(false);
                }
                store.save(&map)?;
                Ok(true)
            })
            .await?;
        if removed {
            info!(name = %name, "deleted password");
        }
        Ok(removed)
    }

    /// Discard every stored password and clear the decryption-failing flag.
    ///
    /// This is the operator's explicit acceptance of data loss after a lost
    /// secret or a corrupted store; nothing calls it automatically.
    pub async fn reset(&self) -> Result<(), VaultError> {
        self.store.secret()?;

        let _turn = self.queue.enter().await;
        match std::fs::remove_file(&self.store.path) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }
        self.store.decryption_failing.store(false, Ordering::SeqCst);
        warn!("password store reset; all stored passwords were discarded");
        Ok(())
    }

    async fn blocking<T, F>(&self, f: F) -> Result<T, VaultError>
    where
        F: FnOnce(&SealedStore) -> Result<T, VaultError> + Send + 'static,
        T: Send + 'static,
    {
        let store = Arc::clone(&self.store);
        tokio::task::spawn_blocking(move || f(&store)).await?
    }
}

impl SealedStore {
    fn secret(&self) -> Result<&str, VaultError> {
        self.secret.as_deref().ok_or(VaultError::NotConfigured)
    }

    fn is_failing(&self) -> bool {
        self.decryption_failing.load(Ordering::SeqCst)
    }

    fn mark_failing(&self, reason: &str) {
        if !self.decryption_failing.swap(true, Ordering::SeqCst) {
            warn!(reason = %reason, "password store decryption failing");
        }
    }

    /// Decrypt the whole map, or start empty if no store exists yet.
    fn load(&self) -> Result<BTreeMap<String, String>, VaultError> {
        let secret = self.secret()?;
        if self.is_failing() {
            return Err(VaultError::DecryptionFailed(
                "store previously failed to decrypt; fix ENCRYPTION_SECRET or reset the store"
                    .to_string(),
            ));
        }

        let envelope = match read_json::<PasswordEnvelope>(&self.path) {
            Ok(Some(env)) => env,
            Ok(None) => {
                debug!("no password store at {}, starting empty", self.path.display());
                return Ok(BTreeMap::new());
            }
            Err(e) => {
                let reason = format!("unreadable store: {e}");
                self.mark_failing(&reason);
                return Err(VaultError::DecryptionFailed(reason));
            }
        };

        envelope.open(secret).inspect_err(|e| {
            if let VaultError::DecryptionFailed(reason) = e {
                self.mark_failing(reason);
            }
        })
    }

    fn save(&self, map: &BTreeMap<String, String>) -> Result<(), VaultError> {
        let envelope = PasswordEnvelope::seal(self.secret()?, map)?;
        write_json_atomic(&self.path, &envelope, Some(PRIVATE_FILE_MODE))?;
        Ok(())
    }
}
