//! On-disk form of the password store.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::crypto::{self, Sealed, IV_LEN, SALT_LEN};
use crate::error::VaultError;

/// `passwords.json`: the entire name → password map as one encrypted blob.
/// All binary fields are lowercase hex.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PasswordEnvelope {
    pub secret_hash: String,
    pub salt: String,
    pub iv: String,
    pub auth_tag: String,
    pub encrypted: String,
}

impl PasswordEnvelope {
    /// Encrypt the whole map with a fresh salt and IV.
    pub fn seal(secret: &str, passwords: &BTreeMap<String, String>) -> Result<Self, VaultError> {
        let plaintext = serde_json::to_vec(passwords)
            .map_err(|e| VaultError::Crypto(format!("failed to encode passwords: {e}")))?;
        let sealed = crypto::seal(secret, &plaintext)?;
        Ok(Self {
            secret_hash: crypto::secret_digest(secret),
            salt: hex::encode(sealed.salt),
            iv: hex::encode(sealed.iv),
            auth_tag: hex::encode(&sealed.tag),
            encrypted: hex::encode(&sealed.ciphertext),
        })
    }

    /// Cheap check: was this envelope written with `secret`?
    pub fn matches_secret(&self, secret: &str) -> bool {
        self.secret_hash.eq_ignore_ascii_case(&crypto::secret_digest(secret))
    }

    /// Decrypt the whole map. Checks the secret digest first so a wrong
    /// secret never reaches key derivation.
    pub fn open(&self, secret: &str) -> Result<BTreeMap<String, String>, VaultError> {
        if !self.matches_secret(secret) {
            return Err(VaultError::DecryptionFailed(
                "ENCRYPTION_SECRET does not match the secret the store was written with".to_string(),
            ));
        }

        let sealed = Sealed {
            salt: decode_fixed::<SALT_LEN>("salt", &self.salt)?,
            iv: decode_fixed::<IV_LEN>("iv", &self.iv)?,
            tag: decode_hex("authTag", &self.auth_tag)?,
            ciphertext: decode_hex("encrypted", &self.encrypted)?,
        };
        let plaintext = crypto::open(secret, &sealed)?;
        serde_json::from_slice(&plaintext)
            .map_err(|e| VaultError::DecryptionFailed(format!("decrypted payload is not a password map: {e}")))
    }
}

fn decode_hex(field: &str, value: &str) -> Result<Vec<u8>, VaultError> {
    hex::decode(value)
        .map_err(|e| VaultError::DecryptionFailed(format!("field '{field}' is not valid hex: {e}")))
}

fn decode_fixed<const N: usize>(field: &str, value: &str) -> Result<[u8; N], VaultError> {
    let bytes = decode_hex(field, value)?;
    bytes.try_into().map_err(|b: Vec<u8>| {
        VaultError::DecryptionFailed(format!("field '{field}' must be {N} bytes, got {}", b.len()))
    })
}
