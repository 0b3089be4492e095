//! Signed audit ledger.

mod ledger;
mod record;
mod signer;

pub use ledger::AuditLedger;
pub use record::{canonical_json, AuditRecord};
pub use signer::{AuditSigner, KeyOrigin, AUDIT_KEY_NAME, AUDIT_NAMESPACE};
