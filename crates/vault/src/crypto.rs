//! Key derivation and authenticated encryption primitives.

use aes_gcm::aead::{Aead, KeyInit, OsRng};
use aes_gcm::{Aes256Gcm, Nonce};
use rand::RngCore;
use scrypt::{scrypt, Params};
use sha2::{Digest, Sha256};

use crate::error::VaultError;

pub const SALT_LEN: usize = 16;
pub const IV_LEN: usize = 12;
pub const TAG_LEN: usize = 16;
pub const KEY_LEN: usize = 32;

/// scrypt cost: N = 2^14, r = 8, p = 1.
const SCRYPT_LOG_N: u8 = 14;
const SCRYPT_R: u32 = 8;
const SCRYPT_P: u32 = 1;

/// Hex SHA-256 of the operator secret. Stored next to the ciphertext so a
/// wrong secret is detected without running key derivation.
pub fn secret_digest(secret: &str) -> String {
    hex::encode(Sha256::digest(secret.as_bytes()))
}

/// Derive a 256-bit key from `secret` and `salt` with scrypt.
pub fn derive_key(secret: &str, salt: &[u8]) -> Result<[u8; KEY_LEN], VaultError> {
    let params = Params::new(SCRYPT_LOG_N, SCRYPT_R, SCRYPT_P, KEY_LEN)
        .map_err(|e| VaultError::Crypto(format!("invalid scrypt parameters: {e}")))?;
    let mut key = [0u8; KEY_LEN];
    scrypt(secret.as_bytes(), salt, &params, &mut key)
        .map_err(|e| VaultError::Crypto(format!("key derivation failed: {e}")))?;
    Ok(key)
}

/// Output of one encryption, with the GCM tag split from the ciphertext.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sealed {
    pub salt: [u8; SALT_LEN],
    pub iv: [u8; IV_LEN],
    pub tag: Vec<u8>,
    pub ciphertext: Vec<u8>,
}

/// Encrypt `plaintext` under a key derived from `secret` and a fresh random salt and IV.
pub fn seal(secret: &str, plaintext: &[u8]) -> Result<Sealed, VaultError> {
    let mut salt = [0u8; SALT_LEN];
    OsRng.fill_bytes(&mut salt);
    let mut iv = [0u8; IV_LEN];
    OsRng.fill_bytes(&mut iv);

    let key = derive_key(secret, &salt)?;
    let cipher = Aes256Gcm::new_from_slice(&key)
        .map_err(|e| VaultError::Crypto(format!("failed to create cipher: {e}")))?;

    let mut ciphertext = cipher
        .encrypt(Nonce::from_slice(&iv), plaintext)
        .map_err(|e| VaultError::Crypto(format!("encryption failed: {e}")))?;

    // AES-GCM appends the 16-byte tag to the ciphertext.
    let tag = ciphertext.split_off(ciphertext.len() - TAG_LEN);

    Ok(Sealed {
        salt,
        iv,
        tag,
        ciphertext,
    })
}

/// Decrypt and authenticate. Any tampering, truncation or wrong key yields
/// [`VaultError::DecryptionFailed`].
pub fn open(secret: &str, sealed: &Sealed) -> Result<Vec<u8>, VaultError> {
    if sealed.tag.len() != TAG_LEN {
        return Err(VaultError::DecryptionFailed(format!(
            "authentication tag must be {TAG_LEN} bytes, got {}",
            sealed.tag.len()
        )));
    }

    let key = derive_key(secret, &sealed.salt)?;
    let cipher = Aes256Gcm::new_from_slice(&key)
        .map_err(|e| VaultError::Crypto(format!("failed to create cipher: {e}")))?;

    // Reconstruct the ciphertext+tag as AES-GCM expects.
    let mut combined = sealed.ciphertext.clone();
    combined.extend_from_slice(&sealed.tag);

    cipher
        .decrypt(Nonce::from_slice(&sealed.iv), combined.as_ref())
        .map_err(|_| VaultError::DecryptionFailed("authentication tag mismatch".to_string()))
}
