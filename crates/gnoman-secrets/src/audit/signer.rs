//! Ed25519 signing key for ledger records.

use std::fmt;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use gnoman_core::env::{self, vars};
use rand::rngs::OsRng;
use tracing::debug;
use zeroize::{Zeroize, Zeroizing};

use crate::adapter::PlatformAdapter;
use crate::error::{Result, SecretError};

pub use gnoman_core::config::AUDIT_NAMESPACE;

/// Adapter key holding the ledger signing key.
pub const AUDIT_KEY_NAME: &str = "GNOMAN-AUDIT-KEY";

/// Where a signer's key came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyOrigin {
    Environment,
    Adapter,
    Generated,
    Provided,
}

/// Signs and verifies ledger records.
pub struct AuditSigner {
    signing_key: SigningKey,
    origin: KeyOrigin,
}

impl AuditSigner {
    /// Fresh random key, not persisted anywhere.
    pub fn generate() -> Self {
        Self {
            signing_key: SigningKey::generate(&mut OsRng),
            origin: KeyOrigin::Generated,
        }
    }

    pub fn from_key_bytes(key_bytes: &[u8; 32]) -> Self {
        Self {
            signing_key: SigningKey::from_bytes(key_bytes),
            origin: KeyOrigin::Provided,
        }
    }

    /// Parse base64-encoded 32-byte private key material.
    pub fn from_base64(encoded: &str) -> Result<Self> {
        let raw = Zeroizing::new(STANDARD.decode(encoded.trim()).map_err(|e| {
            SecretError::Validation(format!("audit key must be base64 encoded: {e}"))
        })?);
        let mut bytes: [u8; 32] = raw.as_slice().try_into().map_err(|_| {
            SecretError::Validation(format!(
                "audit key must contain exactly 32 bytes, got {}",
                raw.len()
            ))
        })?;
        let signer = Self::from_key_bytes(&bytes);
        bytes.zeroize();
        Ok(signer)
    }

    /// Resolve the ledger key: `GNOMAN_AUDIT_KEY`, then the adapter entry,
    /// then a newly generated key stored in the adapter.
    ///
    /// Talks to the adapter directly so key resolution is never itself
    /// recorded in the ledger.
    pub fn resolve(adapter: &dyn PlatformAdapter) -> Result<Self> {
        Self::resolve_with(adapter, env::get_var(vars::GNOMAN_AUDIT_KEY))
    }

    pub(crate) fn resolve_with(
        adapter: &dyn PlatformAdapter,
        env_value: Option<String>,
    ) -> Result<Self> {
        if let Some(encoded) = env_value {
            debug!("using audit key from environment");
            return Ok(Self::from_base64(&encoded)?.with_origin(KeyOrigin::Environment));
        }

        if let Some(stored) = adapter.get_secret(AUDIT_NAMESPACE, AUDIT_KEY_NAME)? {
            debug!("using audit key from secret adapter");
            return Ok(Self::from_base64(&stored)?.with_origin(KeyOrigin::Adapter));
        }

        debug!("generating audit key");
        let signer = Self::generate();
        adapter.set_secret(AUDIT_NAMESPACE, AUDIT_KEY_NAME, &signer.export_base64())?;
        Ok(signer)
    }

    fn with_origin(mut self, origin: KeyOrigin) -> Self {
        self.origin = origin;
        self
    }

    pub fn origin(&self) -> KeyOrigin {
        self.origin
    }

    /// Private key material, base64-encoded.
    pub fn export_base64(&self) -> Zeroizing<String> {
        let bytes = Zeroizing::new(self.signing_key.to_bytes());
        Zeroizing::new(STANDARD.encode(bytes.as_slice()))
    }

    pub fn verifying_key(&self) -> VerifyingKey {
        self.signing_key.verifying_key()
    }

    pub fn public_key_hex(&self) -> String {
        hex::encode(self.verifying_key().as_bytes())
    }

    /// Sign `message`, returning a base64 signature.
    pub fn sign(&self, message: &[u8]) -> String {
        STANDARD.encode(self.signing_key.sign(message).to_bytes())
    }

    /// Check a base64 signature over `message`.
    pub fn verify(&self, message: &[u8], signature_b64: &str) -> bool {
        let Ok(raw) = STANDARD.decode(signature_b64) else {
            return false;
        };
        let Ok(bytes) = <[u8; 64]>::try_from(raw.as_slice()) else {
            return false;
        };
        self.verifying_key()
            .verify(message, &Signature::from_bytes(&bytes))
            .is_ok()
    }
}

impl fmt::Debug for AuditSigner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuditSigner")
            .field("public_key", &self.public_key_hex())
            .field("origin", &self.origin)
            .finish()
    }
}
