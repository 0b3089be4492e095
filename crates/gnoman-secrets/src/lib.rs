//! The GNOMAN trust store.
//!
//! Secrets live in a platform adapter (OS keyring, encrypted file or memory)
//! and may be mirrored into `.env.secure` and `.env`. [`SecretStore`] resolves
//! and writes across those sources, [`SyncEngine`] reconciles them when they
//! drift, [`BackupCodec`] produces passphrase-encrypted backups, and every
//! operation is recorded in the signed, hash-chained [`AuditLedger`].

pub mod adapter;
pub mod audit;
pub mod backup;
pub mod crypto;
pub mod envfile;
pub mod error;
mod fsutil;
pub mod metadata;
pub mod store;
pub mod sync;
pub mod types;

pub use adapter::{AdapterKind, AdapterSelection, AdapterSettings, PlatformAdapter};
pub use audit::{AuditLedger, AuditRecord, AuditSigner};
pub use backup::{BackupCodec, BackupEnvelope, KdfParams};
pub use envfile::EnvFileStore;
pub use error::{ErrorKind, Result, SecretError};
pub use metadata::MetadataIndex;
pub use store::{GetOptions, HealthReport, Prompter, SecretStore};
pub use sync::{SecretStatus, SyncAction, SyncEngine, SyncMode, SyncState};
pub use types::{DriftReport, Metadata, SecretEntry, Snapshot, Source};
