//! Passphrase-encrypted backup envelopes.
//!
//! An envelope carries everything needed to decrypt it except the
//! passphrase: the KDF and its cost parameters, the salt and the AEAD nonce.
//! Cost parameters can therefore change between releases without breaking
//! older backups.

use std::fs;
use std::path::Path;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use gnoman_core::config::KdfConfig;
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use tracing::debug;
use zeroize::Zeroizing;

use crate::audit::canonical_json;
use crate::crypto::{self, KEY_SIZE, NONCE_SIZE};
use crate::error::{Result, SecretError};
use crate::fsutil;
use crate::types::SecretEntry;

/// Current envelope format version.
pub const ENVELOPE_VERSION: u32 = 1;

const SALT_SIZE: usize = 16;

/// Key derivation parameters as stored in an envelope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "algorithm")]
pub enum KdfParams {
    #[serde(rename = "scrypt")]
    Scrypt {
        salt: String,
        log_n: u8,
        r: u32,
        p: u32,
    },

    #[serde(rename = "pbkdf2-hmac-sha256")]
    Pbkdf2 { salt: String, iterations: u32 },
}

impl KdfParams {
    fn fresh(config: KdfConfig) -> Self {
        let salt = STANDARD.encode(crypto::random_bytes(SALT_SIZE));
        match config {
            KdfConfig::Scrypt { log_n, r, p } => Self::Scrypt { salt, log_n, r, p },
            KdfConfig::Pbkdf2 { iterations } => Self::Pbkdf2 { salt, iterations },
        }
    }

    pub fn algorithm(&self) -> &'static str {
        match self {
            Self::Scrypt { .. } => "scrypt",
            Self::Pbkdf2 { .. } => "pbkdf2-hmac-sha256",
        }
    }

    /// Cost parameters without the salt.
    pub fn cost(&self) -> KdfConfig {
        match *self {
            Self::Scrypt { log_n, r, p, .. } => KdfConfig::Scrypt { log_n, r, p },
            Self::Pbkdf2 { iterations, .. } => KdfConfig::Pbkdf2 { iterations },
        }
    }

    /// Derive the envelope key. Costs outside the accepted bounds are
    /// rejected before any memory is allocated for the derivation.
    fn derive_key(&self, passphrase: &str) -> Result<Zeroizing<[u8; KEY_SIZE]>> {
        let problems = self.cost().problems();
        if !problems.is_empty() {
            return Err(SecretError::Validation(format!(
                "backup key derivation rejected: {}",
                problems.join("; ")
            )));
        }
        let mut key = Zeroizing::new([0u8; KEY_SIZE]);
        match self {
            Self::Scrypt { salt, log_n, r, p } => {
                let salt = decode_field("kdf.salt", salt)?;
                let params = scrypt::Params::new(*log_n, *r, *p, KEY_SIZE)
                    .map_err(|e| SecretError::Validation(format!("invalid scrypt parameters: {e}")))?;
                scrypt::scrypt(passphrase.as_bytes(), &salt, &params, &mut key[..])
                    .map_err(|e| SecretError::Crypto(format!("scrypt failed: {e}")))?;
            }
            Self::Pbkdf2 { salt, iterations } => {
                let salt = decode_field("kdf.salt", salt)?;
                pbkdf2::pbkdf2_hmac::<Sha256>(passphrase.as_bytes(), &salt, *iterations, &mut key[..]);
            }
        }
        Ok(key)
    }
}

/// Encrypted backup file contents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackupEnvelope {
    pub version: u32,
    pub kdf: KdfParams,
    pub nonce: String,
    pub ciphertext: String,
}

/// Encrypts and decrypts backup envelopes.
#[derive(Debug, Clone, Copy, Default)]
pub struct BackupCodec {
    kdf: KdfConfig,
}

impl BackupCodec {
    /// Codec producing new envelopes with `kdf`. Loading honours whatever
    /// parameters each envelope carries.
    pub fn new(kdf: KdfConfig) -> Self {
        Self { kdf }
    }

    pub fn kdf(&self) -> KdfConfig {
        self.kdf
    }

    /// Encrypt `entries` under `passphrase`.
    pub fn save(&self, entries: &[SecretEntry], passphrase: &str) -> Result<BackupEnvelope> {
        check_passphrase(passphrase)?;
        let plaintext = Zeroizing::new(canonical_json(&serde_json::to_value(entries)?));

        let kdf = KdfParams::fresh(self.kdf);
        let key = kdf.derive_key(passphrase)?;
        let (nonce, ciphertext) = crypto::aead_encrypt(&key[..], plaintext.as_bytes())?;

        debug!(entries = entries.len(), kdf = kdf.algorithm(), "backup sealed");
        Ok(BackupEnvelope {
            version: ENVELOPE_VERSION,
            kdf,
            nonce: STANDARD.encode(nonce),
            ciphertext: STANDARD.encode(ciphertext),
        })
    }

    /// Decrypt `envelope`.
    ///
    /// A wrong passphrase and a tampered envelope are indistinguishable and
    /// both fail with [`SecretError::InvalidPassphraseOrCorruptBackup`].
    pub fn load(&self, envelope: &BackupEnvelope, passphrase: &str) -> Result<Vec<SecretEntry>> {
        if envelope.version != ENVELOPE_VERSION {
            return Err(SecretError::Validation(format!(
                "unsupported backup version {} (expected {ENVELOPE_VERSION})",
                envelope.version
            )));
        }
        let nonce = decode_field("nonce", &envelope.nonce)?;
        if nonce.len() != NONCE_SIZE {
            return Err(SecretError::Validation(format!(
                "backup nonce must be {NONCE_SIZE} bytes"
            )));
        }
        let ciphertext = decode_field("ciphertext", &envelope.ciphertext)?;

        let key = envelope.kdf.derive_key(passphrase)?;
        let plaintext = Zeroizing::new(
            crypto::aead_decrypt(&key[..], &nonce, &ciphertext)
                .map_err(|_| SecretError::InvalidPassphraseOrCorruptBackup)?,
        );

        serde_json::from_slice(&plaintext).map_err(|_| SecretError::InvalidPassphraseOrCorruptBackup)
    }

    /// Re-encrypt under `new_passphrase` with fresh salt and nonce.
    /// `old` is left untouched.
    pub fn rotate_passphrase(
        &self,
        old: &BackupEnvelope,
        old_passphrase: &str,
        new_passphrase: &str,
    ) -> Result<BackupEnvelope> {
        let entries = self.load(old, old_passphrase)?;
        self.save(&entries, new_passphrase)
    }

    /// Rotate the passphrase of a backup file in place.
    ///
    /// The new envelope replaces the old file by atomic rename, so the old
    /// backup stays readable until the new one is on disk.
    pub fn rotate_file(&self, path: &Path, old_passphrase: &str, new_passphrase: &str) -> Result<()> {
        let old = read_envelope(path)?;
        let rotated = self.rotate_passphrase(&old, old_passphrase, new_passphrase)?;
        write_envelope(path, &rotated)
    }
}

/// Read an envelope from disk.
pub fn read_envelope(path: &Path) -> Result<BackupEnvelope> {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(SecretError::NotFound(format!("backup {}", path.display())))
        }
        Err(e) => return Err(e.into()),
    };
    serde_json::from_str(&content)
        .map_err(|e| SecretError::Validation(format!("{} is not a backup envelope: {e}", path.display())))
}

/// Write an envelope atomically with owner-only permissions.
pub fn write_envelope(path: &Path, envelope: &BackupEnvelope) -> Result<()> {
    let data = serde_json::to_vec_pretty(envelope)?;
    fsutil::write_atomic(path, &data)
}

fn check_passphrase(passphrase: &str) -> Result<()> {
    if passphrase.is_empty() {
        return Err(SecretError::Validation("backup passphrase must not be empty".to_string()));
    }
    Ok(())
}

fn decode_field(name: &str, value: &str) -> Result<Vec<u8>> {
    STANDARD
        .decode(value)
        .map_err(|e| SecretError::Validation(format!("backup field '{name}' is not valid base64: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn codec() -> BackupCodec {
        BackupCodec::new(KdfConfig::Scrypt {
            log_n: 10,
            r: 8,
            p: 1,
        })
    }

    fn entries() -> Vec<SecretEntry> {
        vec![
            SecretEntry::new("gnoman", "RPC_URL").with_value("https://rpc.example"),
            SecretEntry::new("gnoman", "WEBHOOK").with_value("hook-123"),
        ]
    }

    #[test]
    fn test_save_load() {
        let envelope = codec().save(&entries(), "pw1").unwrap();
        assert_eq!(envelope.version, ENVELOPE_VERSION);
        assert_eq!(envelope.kdf.algorithm(), "scrypt");
        assert!(!envelope.ciphertext.contains("hook-123"));

        let loaded = codec().load(&envelope, "pw1").unwrap();
        assert_eq!(loaded, entries());
    }

    #[test]
    fn test_wrong_passphrase_is_authentication_failure() {
        let envelope = codec().save(&entries(), "pw1").unwrap();
        let err = codec().load(&envelope, "pw2").unwrap_err();
        assert!(matches!(err, SecretError::InvalidPassphraseOrCorruptBackup));
    }

    #[test]
    fn test_tampered_ciphertext_fails() {
        let mut envelope = codec().save(&entries(), "pw").unwrap();
        let mut raw = STANDARD.decode(&envelope.ciphertext).unwrap();
        raw[0] ^= 0x01;
        envelope.ciphertext = STANDARD.encode(raw);
        assert!(matches!(
            codec().load(&envelope, "pw"),
            Err(SecretError::InvalidPassphraseOrCorruptBackup)
        ));
    }

    #[test]
    fn test_fresh_salt_and_nonce() {
        let a = codec().save(&entries(), "pw").unwrap();
        let b = codec().save(&entries(), "pw").unwrap();
        assert_ne!(a.nonce, b.nonce);
        assert_ne!(a.kdf, b.kdf);
    }

    #[test]
    fn test_pbkdf2_envelope() {
        let codec = BackupCodec::new(KdfConfig::Pbkdf2 { iterations: 1000 });
        let envelope = codec.save(&entries(), "pw").unwrap();
        assert!(matches!(
            envelope.kdf,
            KdfParams::Pbkdf2 {
                iterations: 1000,
                ..
            }
        ));

        // Loading honours the envelope's parameters, not the codec's.
        assert_eq!(self::codec().load(&envelope, "pw").unwrap(), entries());
    }

    #[test]
    fn test_oversized_kdf_cost_is_rejected() {
        let mut envelope = codec().save(&entries(), "pw").unwrap();
        if let KdfParams::Scrypt { log_n, .. } = &mut envelope.kdf {
            *log_n = 30;
        }
        let err = codec().load(&envelope, "pw").unwrap_err();
        assert!(matches!(err, SecretError::Validation(ref msg) if msg.contains("log_n")));

        let mut envelope = codec().save(&entries(), "pw").unwrap();
        if let KdfParams::Scrypt { r, p, .. } = &mut envelope.kdf {
            *r = 1024;
            *p = 1024;
        }
        assert!(matches!(
            codec().load(&envelope, "pw"),
            Err(SecretError::Validation(_))
        ));
    }

    #[test]
    fn test_envelope_wire_format() {
        let envelope = codec().save(&entries(), "pw").unwrap();
        let json = serde_json::to_value(&envelope).unwrap();
        assert_eq!(json["version"], 1);
        assert_eq!(json["kdf"]["algorithm"], "scrypt");
        assert_eq!(json["kdf"]["log_n"], 10);
        assert!(json["kdf"]["salt"].is_string());
        assert!(json["nonce"].is_string());
    }

    #[test]
    fn test_rotate_passphrase() {
        let old = codec().save(&entries(), "old").unwrap();
        let new = codec().rotate_passphrase(&old, "old", "new").unwrap();

        assert_eq!(codec().load(&new, "new").unwrap(), entries());
        assert!(codec().load(&new, "old").is_err());
        assert_eq!(codec().load(&old, "old").unwrap(), entries());
        assert!(codec().rotate_passphrase(&old, "wrong", "new").is_err());
    }

    #[test]
    fn test_rotate_file_keeps_old_on_failure() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("backup.json");
        let original = codec().save(&entries(), "old").unwrap();
        write_envelope(&path, &original).unwrap();

        assert!(codec().rotate_file(&path, "wrong", "new").is_err());
        assert_eq!(read_envelope(&path).unwrap(), original);

        codec().rotate_file(&path, "old", "new").unwrap();
        let rotated = read_envelope(&path).unwrap();
        assert_eq!(codec().load(&rotated, "new").unwrap(), entries());
    }

    #[test]
    fn test_validation_errors() {
        let mut envelope = codec().save(&entries(), "pw").unwrap();
        assert!(matches!(
            codec().save(&entries(), ""),
            Err(SecretError::Validation(_))
        ));

        envelope.version = 99;
        assert!(matches!(
            codec().load(&envelope, "pw"),
            Err(SecretError::Validation(_))
        ));

        envelope.version = ENVELOPE_VERSION;
        envelope.nonce = "***".into();
        assert!(matches!(
            codec().load(&envelope, "pw"),
            Err(SecretError::Validation(_))
        ));
    }

    #[test]
    fn test_missing_backup_is_not_found() {
        let dir = TempDir::new().unwrap();
        let err = read_envelope(&dir.path().join("absent.json")).unwrap_err();
        assert!(matches!(err, SecretError::NotFound(_)));
    }
}
