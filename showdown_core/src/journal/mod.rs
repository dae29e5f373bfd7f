//! The durable, append-only combat journal.
//!
//! Stored at `<dir>/events.log`, one JSON record per line:
//!
//! ```text
//! {"timestamp":"2026-10-18T09:15:02.114Z","message":"Doc fired at 10.0.0.8:50003 and Ringo was shot with 4 damage"}
//! {"timestamp":"2026-10-18T09:15:03.120Z","message":"Ringo realizes they are dead"}
//! ```
//!
//! No header, index or checksum. Each append is flushed before it returns,
//! so an acknowledged record survives a crash of the writing process.
//! Appends are serialised by one lock; there is a single writer.
//!
//! The offset handed back for a record is the byte position of its first
//! byte in the file, which is unique and increases with append order.

mod store;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::{self, BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};
use store::Store;
use thiserror::Error;
use tracing::{debug, info};

/// File name of the journal inside its directory.
pub const JOURNAL_FILE: &str = "events.log";

/// Journal errors.
#[derive(Debug, Error)]
pub enum JournalError {
    #[error("Failed to open journal at {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Journal I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Failed to encode event: {0}")]
    Encode(#[source] serde_json::Error),

    #[error("Corrupt record on line {line}: {source}")]
    Decode {
        line: usize,
        #[source]
        source: serde_json::Error,
    },

    #[error("Journal is closed")]
    Closed,
}

/// One journal record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CombatEvent {
    /// Wall-clock time at append
    pub timestamp: DateTime<Utc>,

    /// Free-text description
    pub message: String,
}

/// Append-only event journal rooted at a directory.
pub struct Journal {
    dir: PathBuf,
    store: Mutex<Option<Store>>,
}

impl Journal {
    /// Opens (or creates) the journal file inside `dir`.
    ///
    /// `dir` must already exist.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, JournalError> {
        let dir = dir.into();
        let store = Self::open_store(&dir)?;
        info!(dir = %dir.display(), size = store.size(), "Journal opened");
        Ok(Self {
            dir,
            store: Mutex::new(Some(store)),
        })
    }

    fn open_store(dir: &Path) -> Result<Store, JournalError> {
        let path = dir.join(JOURNAL_FILE);
        Store::open(&path).map_err(|source| JournalError::Open { path, source })
    }

    fn lock(&self) -> MutexGuard<'_, Option<Store>> {
        self.store.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Directory holding the journal.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the journal file.
    pub fn path(&self) -> PathBuf {
        self.dir.join(JOURNAL_FILE)
    }

    /// Appends `message` stamped with the current time; returns its offset.
    pub fn append(&self, message: &str) -> Result<u64, JournalError> {
        let mut guard = self.lock();
        let store = guard.as_mut().ok_or(JournalError::Closed)?;

        let event = CombatEvent {
            timestamp: Utc::now(),
            message: message.to_string(),
        };
        let record = serde_json::to_vec(&event).map_err(JournalError::Encode)?;
        let offset = store.append(&record)?;
        debug!(offset, bytes = record.len(), "Appended record");
        Ok(offset)
    }

    /// Appends an opaque payload, decoding it as UTF-8 (lossily).
    pub fn append_payload(&self, payload: &[u8]) -> Result<u64, JournalError> {
        self.append(&String::from_utf8_lossy(payload))
    }

    /// Current size of the journal file in bytes (the next offset).
    pub fn size(&self) -> Result<u64, JournalError> {
        self.lock().as_ref().map(Store::size).ok_or(JournalError::Closed)
    }

    /// True once `close` (or `remove`) has run.
    pub fn is_closed(&self) -> bool {
        self.lock().is_none()
    }

    /// Reads every record back in append order.
    pub fn records(&self) -> Result<Vec<CombatEvent>, JournalError> {
        // Hold the lock so no append interleaves with the read.
        let _guard = self.lock();
        read_records(&self.path())
    }

    /// Flushes and releases the file. A second call is a no-op.
    pub fn close(&self) -> Result<(), JournalError> {
        if let Some(store) = self.lock().take() {
            store.close()?;
            info!(dir = %self.dir.display(), "Journal closed");
        }
        Ok(())
    }

    /// Closes the journal and deletes its whole directory.
    pub fn remove(&self) -> Result<(), JournalError> {
        self.close()?;
        match fs::remove_dir_all(&self.dir) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    /// Removes the journal and starts an empty one in the same place.
    pub fn reset(&self) -> Result<(), JournalError> {
        self.remove()?;
        fs::create_dir_all(&self.dir)?;
        let store = Self::open_store(&self.dir)?;
        *self.lock() = Some(store);
        info!(dir = %self.dir.display(), "Journal reset");
        Ok(())
    }
}

/// Reads all records from a journal file.
pub fn read_records(path: &Path) -> Result<Vec<CombatEvent>, JournalError> {
    let reader = BufReader::new(File::open(path)?);
    let mut events = Vec::new();
    for (index, line) in reader.lines().enumerate() {
        let line = line?;
        if line.is_empty() {
            continue;
        }
        let event = serde_json::from_str(&line).map_err(|source| JournalError::Decode {
            line: index + 1,
            source,
        })?;
        events.push(event);
    }
    Ok(events)
}
