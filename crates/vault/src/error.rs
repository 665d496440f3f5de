use thiserror::Error;

use cronvault_core::CoreError;

#[derive(Error, Debug)]
pub enum VaultError {
    /// No encryption secret is configured; the vault never stores plaintext.
    #[error("Password vault is not configured (set ENCRYPTION_SECRET)")]
    NotConfigured,

    /// Wrong secret or corrupted store. Sticky until the operator intervenes.
    #[error("Password store cannot be decrypted: {0}")]
    DecryptionFailed(String),

    #[error("Invalid password name '{0}'")]
    InvalidName(String),

    #[error("Encryption error: {0}")]
    Crypto(String),

    #[error("Password store error: {0}")]
    Storage(#[from] CoreError),

    #[error("Vault task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl From<std::io::Error> for VaultError {
    fn from(e: std::io::Error) -> Self {
        Self::Storage(CoreError::Io(e))
    }
}
