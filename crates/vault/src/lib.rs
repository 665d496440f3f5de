//! Encrypted at-rest storage of per-database passwords.
//!
//! The whole `configName -> password` map is one AES-256-GCM envelope under a
//! scrypt-derived key. See [`CredentialVault`] for the failure semantics.

pub mod crypto;
pub mod envelope;
pub mod error;
mod vault;

pub use envelope::PasswordEnvelope;
pub use error::VaultError;
pub use vault::{CredentialVault, VaultStatus};
