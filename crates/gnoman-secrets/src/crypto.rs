//! AES-256-GCM primitives, HKDF value sealing, and randomness helpers.
//!
//! The file adapter seals each value under a key derived from the master key
//! with a fresh random salt, so the master key is never used directly as a
//! cipher key. Sealed values are self-describing strings:
//! `gnoman:v1:` followed by base64 of `salt || nonce || ciphertext`.

use aes_gcm::aead::Aead;
use aes_gcm::{Aes256Gcm, KeyInit, Nonce};
use base64::engine::general_purpose::{STANDARD, URL_SAFE_NO_PAD};
use base64::Engine;
use gnoman_core::env::{self, vars};
use hkdf::Hkdf;
use rand::rngs::OsRng;
use rand::RngCore;
use sha2::{Digest, Sha256};
use zeroize::Zeroizing;

use crate::error::{Result, SecretError};

pub(crate) const NONCE_SIZE: usize = 12;
pub(crate) const KEY_SIZE: usize = 32;
const SALT_SIZE: usize = 32;

/// HKDF info string used to domain-separate derived keys.
const HKDF_INFO: &[u8] = b"gnoman-file-keyring-v1";

/// Marker prefix of a sealed value.
pub const SEALED_PREFIX: &str = "gnoman:v1:";

/// Derive a 256-bit encryption key from `master_key` and `salt` via HKDF-SHA256.
fn derive_key(master_key: &[u8], salt: &[u8]) -> Result<Zeroizing<[u8; KEY_SIZE]>> {
    let hk = Hkdf::<Sha256>::new(Some(salt), master_key);
    let mut okm = Zeroizing::new([0u8; KEY_SIZE]);
    hk.expand(HKDF_INFO, &mut okm[..])
        .map_err(|e| SecretError::Crypto(format!("HKDF expand failed: {e}")))?;
    Ok(okm)
}

/// Encrypt `plaintext` under `key` with a fresh random nonce.
///
/// Returns `(nonce, ciphertext_with_tag)`.
pub(crate) fn aead_encrypt(key: &[u8], plaintext: &[u8]) -> Result<([u8; NONCE_SIZE], Vec<u8>)> {
    let mut nonce_bytes = [0u8; NONCE_SIZE];
    OsRng.fill_bytes(&mut nonce_bytes);

    let cipher =
        Aes256Gcm::new_from_slice(key).map_err(|e| SecretError::Crypto(e.to_string()))?;
    let ciphertext = cipher
        .encrypt(Nonce::from_slice(&nonce_bytes), plaintext)
        .map_err(|e| SecretError::Crypto(format!("encryption failed: {e}")))?;

    Ok((nonce_bytes, ciphertext))
}

/// Decrypt and authenticate `ciphertext`.
///
/// Any failure, including a tag mismatch, is reported as [`SecretError::Crypto`];
/// callers map it to their own authentication error.
pub(crate) fn aead_decrypt(key: &[u8], nonce: &[u8], ciphertext: &[u8]) -> Result<Vec<u8>> {
    if nonce.len() != NONCE_SIZE {
        return Err(SecretError::Crypto(format!(
            "nonce must be {NONCE_SIZE} bytes, got {}",
            nonce.len()
        )));
    }
    let cipher =
        Aes256Gcm::new_from_slice(key).map_err(|e| SecretError::Crypto(e.to_string()))?;
    cipher
        .decrypt(Nonce::from_slice(nonce), ciphertext)
        .map_err(|_| SecretError::Crypto("authentication failed".to_string()))
}

/// Seal `plaintext` for storage in the file adapter.
pub fn seal_value(master_key: &[u8], plaintext: &str) -> Result<String> {
    let mut salt = [0u8; SALT_SIZE];
    OsRng.fill_bytes(&mut salt);

    let key = derive_key(master_key, &salt)?;
    let (nonce, ciphertext) = aead_encrypt(&key[..], plaintext.as_bytes())?;

    let mut blob = Vec::with_capacity(SALT_SIZE + NONCE_SIZE + ciphertext.len());
    blob.extend_from_slice(&salt);
    blob.extend_from_slice(&nonce);
    blob.extend_from_slice(&ciphertext);

    Ok(format!("{SEALED_PREFIX}{}", STANDARD.encode(blob)))
}

/// Open a value produced by [`seal_value`].
pub fn open_value(master_key: &[u8], sealed: &str) -> Result<String> {
    let encoded = sealed
        .strip_prefix(SEALED_PREFIX)
        .ok_or_else(|| SecretError::Crypto("value is not sealed".to_string()))?;
    let blob = STANDARD
        .decode(encoded)
        .map_err(|e| SecretError::Crypto(format!("base64 decode failed: {e}")))?;
    if blob.len() < SALT_SIZE + NONCE_SIZE {
        return Err(SecretError::Crypto("sealed value too short".to_string()));
    }

    let (salt, rest) = blob.split_at(SALT_SIZE);
    let (nonce, ciphertext) = rest.split_at(NONCE_SIZE);
    let key = derive_key(master_key, salt)?;
    let plaintext = aead_decrypt(&key[..], nonce, ciphertext)?;

    String::from_utf8(plaintext).map_err(|e| SecretError::Crypto(format!("invalid UTF-8: {e}")))
}

/// Whether `value` carries the sealed-value prefix.
pub fn is_sealed(value: &str) -> bool {
    value.starts_with(SEALED_PREFIX)
}

/// Read the file adapter's master key from `GNOMAN_MASTER_KEY` (hex, 32 bytes).
pub fn master_key_from_env() -> Result<Option<Vec<u8>>> {
    let Some(hex_key) = env::get_var(vars::GNOMAN_MASTER_KEY) else {
        return Ok(None);
    };
    let key = hex::decode(hex_key.trim()).map_err(|e| {
        SecretError::Validation(format!("invalid hex in {}: {e}", vars::GNOMAN_MASTER_KEY))
    })?;
    if key.len() != KEY_SIZE {
        return Err(SecretError::Validation(format!(
            "{} must decode to exactly {KEY_SIZE} bytes, got {}",
            vars::GNOMAN_MASTER_KEY,
            key.len()
        )));
    }
    Ok(Some(key))
}

/// Generate a new random 256-bit master key.
pub fn generate_master_key() -> Vec<u8> {
    random_bytes(KEY_SIZE)
}

/// `len` bytes from the operating system CSPRNG.
pub fn random_bytes(len: usize) -> Vec<u8> {
    let mut bytes = vec![0u8; len];
    OsRng.fill_bytes(&mut bytes);
    bytes
}

/// URL-safe text carrying `nbytes` bytes of entropy.
pub fn token_urlsafe(nbytes: usize) -> String {
    URL_SAFE_NO_PAD.encode(random_bytes(nbytes))
}

/// Lowercase hex SHA-256 digest.
pub fn sha256_hex(data: &[u8]) -> String {
    hex::encode(Sha256::digest(data))
}
