//! Durability log - append-only record of accepted writes
//!
//! Every write is appended as one JSON line before it is propagated to
//! replicas. Appends are serialized by a mutex so concurrent writers never
//! interleave partial lines.

use crate::{Error, Result};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

/// A write accepted by the primary
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WriteRecord {
    /// Display name
    pub name: String,
    /// User identifier
    pub user_id: i64,
    /// Whether the user is active
    pub is_active: bool,
}

impl WriteRecord {
    /// Create a record
    pub fn new(name: impl Into<String>, user_id: i64, is_active: bool) -> Self {
        Self {
            name: name.into(),
            user_id,
            is_active,
        }
    }

    /// Serialize to the JSON payload sent to replicas
    pub fn to_payload(&self) -> Result<bytes::Bytes> {
        Ok(serde_json::to_vec(self)?.into())
    }
}

/// Append-only newline-delimited JSON log
pub struct DurabilityLog {
    path: PathBuf,
    file: Mutex<File>,
    fsync: bool,
    appended: AtomicU64,
}

impl DurabilityLog {
    /// Open (or create) the log at `path`
    ///
    /// With `fsync` set, every append is followed by `sync_data`.
    pub fn open(path: impl AsRef<Path>, fsync: bool) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        tracing::info!("Opened durability log at {:?}", path);

        Ok(Self {
            path,
            file: Mutex::new(file),
            fsync,
            appended: AtomicU64::new(0),
        })
    }

    /// Append one record as a single line
    pub fn append(&self, record: &WriteRecord) -> Result<()> {
        let mut line = serde_json::to_vec(record)?;
        line.push(b'\n');

        let mut file = self.file.lock();
        file.write_all(&line).map_err(|e| self.append_error(e))?;
        if self.fsync {
            file.sync_data().map_err(|e| self.append_error(e))?;
        }
        drop(file);

        self.appended.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    /// Read every record back in append order
    pub fn replay(&self) -> Result<Vec<WriteRecord>> {
        let reader = BufReader::new(File::open(&self.path)?);
        let mut records = Vec::new();

        for line in reader.lines() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            records.push(serde_json::from_str(&line)?);
        }

        Ok(records)
    }

    /// Location of the log file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Records appended through this handle
    pub fn appended(&self) -> u64 {
        self.appended.load(Ordering::Relaxed)
    }

    fn append_error(&self, e: std::io::Error) -> Error {
        tracing::error!("Failed to append to {:?}: {}", self.path, e);
        Error::durability(format!("failed to append to {}: {e}", self.path.display()))
    }
}
