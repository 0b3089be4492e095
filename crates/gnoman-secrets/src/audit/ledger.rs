//! Append-only, hash-chained, signed NDJSON ledger.
//!
//! Appends read only the tail of the file to find the previous hash. The
//! line is emitted with a single `write_all` followed by a flush, so readers
//! never observe half a record. Two processes appending at the same moment
//! can both read the same previous hash and fork the chain; `verify_log`
//! reports that as a chain break. There is no cross-process lock.

use std::fs::{self, File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use chrono::Utc;
use parking_lot::Mutex;
use serde_json::Value;
use tracing::{debug, warn};

use super::record::{into_object, AuditRecord};
use super::signer::AuditSigner;
use crate::error::{Result, SecretError};
use crate::fsutil;

/// Size of each backward read when tailing the ledger.
const TAIL_BLOCK: u64 = 4096;

/// The audit ledger.
pub struct AuditLedger {
    path: PathBuf,
    signer: AuditSigner,
    append_lock: Mutex<()>,
}

impl AuditLedger {
    pub fn new(path: impl Into<PathBuf>, signer: AuditSigner) -> Self {
        Self {
            path: path.into(),
            signer,
            append_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn signer(&self) -> &AuditSigner {
        &self.signer
    }

    /// Append one record.
    ///
    /// `params` and `result` are stored as JSON objects; a non-object value is
    /// wrapped as `{"value": ...}` and `null` becomes `{}`. Callers must never
    /// pass secret values here.
    pub fn append(
        &self,
        action: &str,
        params: Value,
        ok: bool,
        result: Value,
    ) -> Result<AuditRecord> {
        let _guard = self.append_lock.lock();

        let previous_hash = self.last_hash()?;
        let now = Utc::now();
        let mut record = AuditRecord {
            previous_hash,
            timestamp: now.timestamp_micros() as f64 / 1_000_000.0,
            action: action.to_string(),
            params: into_object(params),
            result: into_object(result),
            ok,
            hash: String::new(),
            signature: String::new(),
        };
        record.hash = record.compute_hash();
        record.signature = self.signer.sign(&record.signing_message());

        let mut line = serde_json::to_string(&record)?;
        line.push('\n');
        self.write_line(line.as_bytes())?;

        debug!(action, ok, "audit record appended");
        Ok(record)
    }

    fn write_line(&self, line: &[u8]) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let created = !self.path.exists();
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        if created {
            fsutil::restrict_permissions(&self.path)?;
        }
        file.write_all(line)?;
        file.flush()?;
        Ok(())
    }

    fn last_hash(&self) -> Result<String> {
        let Some(line) = tail_lines(&self.path, 1)?.pop() else {
            return Ok(String::new());
        };
        match serde_json::from_str::<AuditRecord>(&line) {
            Ok(record) => Ok(record.hash),
            Err(e) => {
                warn!(path = %self.path.display(), "last ledger line is malformed, starting a new chain: {e}");
                Ok(String::new())
            }
        }
    }

    /// The newest `n` records, oldest first. Malformed lines are skipped.
    pub fn read_tail(&self, n: usize) -> Result<Vec<AuditRecord>> {
        let lines = tail_lines(&self.path, n)?;
        Ok(lines
            .iter()
            .filter_map(|line| match serde_json::from_str::<AuditRecord>(line) {
                Ok(record) => Some(record),
                Err(e) => {
                    warn!("skipping malformed ledger line: {e}");
                    None
                }
            })
            .collect())
    }

    /// Every record in the file. A malformed line is a chain break.
    pub fn load_all(&self) -> Result<Vec<AuditRecord>> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };
        content
            .lines()
            .filter(|line| !line.trim().is_empty())
            .enumerate()
            .map(|(index, line)| {
                serde_json::from_str::<AuditRecord>(line).map_err(|e| SecretError::ChainIntegrity {
                    index,
                    reason: format!("unparseable record: {e}"),
                })
            })
            .collect()
    }

    /// Recompute each record's hash and check its signature.
    /// Returns false at the first mismatch.
    pub fn verify(&self, records: &[AuditRecord]) -> bool {
        records
            .iter()
            .enumerate()
            .all(|(index, record)| self.check_record(index, record).is_ok())
    }

    fn check_record(&self, index: usize, record: &AuditRecord) -> Result<()> {
        if record.compute_hash() != record.hash {
            return Err(SecretError::ChainIntegrity {
                index,
                reason: "hash mismatch".to_string(),
            });
        }
        if !self.signer.verify(&record.signing_message(), &record.signature) {
            return Err(SecretError::SignatureMismatch(format!(
                "record {index} is not signed by the ledger key"
            )));
        }
        Ok(())
    }

    /// Check that each record links to its predecessor.
    pub fn verify_chain(&self, records: &[AuditRecord]) -> Result<()> {
        for (index, pair) in records.windows(2).enumerate() {
            if pair[1].previous_hash != pair[0].hash {
                return Err(SecretError::ChainIntegrity {
                    index: index + 1,
                    reason: "previous_hash does not match the preceding record".to_string(),
                });
            }
        }
        Ok(())
    }

    /// Full audit of the ledger file: genesis link, per-record hash and
    /// signature, and chain continuity. Returns the number of records.
    pub fn verify_log(&self) -> Result<usize> {
        let records = self.load_all()?;
        if let Some(first) = records.first() {
            if !first.previous_hash.is_empty() {
                return Err(SecretError::ChainIntegrity {
                    index: 0,
                    reason: "first record does not start the chain".to_string(),
                });
            }
        }
        for (index, record) in records.iter().enumerate() {
            self.check_record(index, record)?;
        }
        self.verify_chain(&records)?;
        Ok(records.len())
    }
}

/// The last `n` non-empty lines of `path`, oldest first, read backward in
/// fixed-size blocks.
fn tail_lines(path: &Path, n: usize) -> Result<Vec<String>> {
    if n == 0 {
        return Ok(Vec::new());
    }
    let mut file = match File::open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e.into()),
    };

    let mut pos = file.metadata()?.len();
    let mut buf: Vec<u8> = Vec::new();
    while pos > 0 {
        let start = pos.saturating_sub(TAIL_BLOCK);
        let mut chunk = vec![0u8; (pos - start) as usize];
        file.seek(SeekFrom::Start(start))?;
        file.read_exact(&mut chunk)?;
        chunk.extend_from_slice(&buf);
        buf = chunk;
        pos = start;

        // A line is complete once a newline precedes it.
        let complete = buf
            .split(|&b| b == b'\n')
            .skip(1)
            .filter(|line| !line.iter().all(u8::is_ascii_whitespace))
            .count();
        if complete >= n {
            break;
        }
    }

    let text = String::from_utf8_lossy(&buf);
    let lines: Vec<String> = text
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(str::to_string)
        .collect();
    let skip = lines.len().saturating_sub(n);
    Ok(lines.into_iter().skip(skip).collect())
}
