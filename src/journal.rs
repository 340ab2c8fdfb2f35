//! Best-effort record of the files one `add` touched, enough to put them
//! back. There is no transaction: the journal is written after the run and
//! revert only restores files nobody edited since.

use crate::edit::{atomic_write, EditError};
use crate::naming::{DriverIdentity, Kernel};
use crate::safety::RootGuard;
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use xxhash_rust::xxh3::xxh3_64;

/// Journals live under `<root>/.hdf_scaffold/journal/`.
pub const JOURNAL_DIR: &str = ".hdf_scaffold/journal";

#[derive(Error, Debug)]
pub enum JournalError {
    #[error("journal I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("journal {} is malformed: {source}", .path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error(transparent)]
    Write(#[from] EditError),
}

fn io_err(path: &Path) -> impl FnOnce(io::Error) -> JournalError + '_ {
    move |source| JournalError::Io {
        path: path.to_path_buf(),
        source,
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JournalEntry {
    pub path: PathBuf,
    /// Content before the run; `None` when the run created the file
    pub before: Option<String>,
    /// xxh3 of the content the run left behind
    pub after_hash: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Journal {
    pub kernel: Kernel,
    pub module: String,
    pub driver: String,
    pub entries: Vec<JournalEntry>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum RevertResult {
    Restored,
    /// File was created by the run and has been deleted
    Removed,
    /// File changed after the run; left alone
    Modified,
    /// File no longer exists; nothing to do
    Missing,
    /// Path lies outside the guarded root or in a protected tree; left alone
    Refused,
}

impl RevertResult {
    /// Whether the entry still describes work revert could not undo.
    pub fn is_pending(self) -> bool {
        matches!(self, RevertResult::Modified | RevertResult::Refused)
    }
}

impl Journal {
    pub fn new(identity: &DriverIdentity) -> Self {
        Self {
            kernel: identity.kernel,
            module: identity.module.clone(),
            driver: identity.driver.clone(),
            entries: Vec::new(),
        }
    }

    pub fn path_for(root: &Path, kernel: Kernel, module: &str, driver: &str) -> PathBuf {
        root.join(JOURNAL_DIR)
            .join(format!("{}_{}_{}.json", kernel.as_str(), module, driver))
    }

    pub fn load(path: &Path) -> Result<Self, JournalError> {
        let text = fs::read_to_string(path).map_err(io_err(path))?;
        serde_json::from_str(&text).map_err(|source| JournalError::Json {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Continue an earlier journal for the same driver, so a re-run that
    /// finishes a partial add stays revertible as a whole.
    pub fn load_or_new(path: &Path, identity: &DriverIdentity) -> Result<Self, JournalError> {
        if path.is_file() {
            Self::load(path)
        } else {
            Ok(Self::new(identity))
        }
    }

    /// Current content of `path`, or `None` when it does not exist yet.
    pub fn read_before(path: &Path) -> Result<Option<String>, JournalError> {
        match fs::read_to_string(path) {
            Ok(text) => Ok(Some(text)),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(source) => Err(JournalError::Io {
                path: path.to_path_buf(),
                source,
            }),
        }
    }

    /// Record that the run changed `path`, which held `before`. A file
    /// touched twice keeps its oldest `before`.
    pub fn record(&mut self, path: &Path, before: Option<String>) -> Result<(), JournalError> {
        let after = fs::read(path).map_err(io_err(path))?;
        let after_hash = xxh3_64(&after);
        match self.entries.iter_mut().find(|e| e.path == path) {
            Some(entry) => entry.after_hash = after_hash,
            None => self.entries.push(JournalEntry {
                path: path.to_path_buf(),
                before,
                after_hash,
            }),
        }
        Ok(())
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entry(&self, path: &Path) -> Option<&JournalEntry> {
        self.entries.iter().find(|e| e.path == path)
    }

    pub fn save(&self, path: &Path) -> Result<(), JournalError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(io_err(parent))?;
        }
        let json = serde_json::to_string_pretty(self).map_err(|source| JournalError::Json {
            path: path.to_path_buf(),
            source,
        })?;
        atomic_write(path, json.as_bytes())?;
        debug!("journal written to {}", path.display());
        Ok(())
    }

    /// Undo every entry, newest first. Entries `guard` rejects are reported
    /// as `Refused` and never touched, whatever the journal claims.
    pub fn revert(&self, guard: &RootGuard) -> Result<Vec<(PathBuf, RevertResult)>, JournalError> {
        let mut results = Vec::with_capacity(self.entries.len());
        for entry in self.entries.iter().rev() {
            let result = revert_entry(entry, guard)?;
            info!("{}: {:?}", entry.path.display(), result);
            results.push((entry.path.clone(), result));
        }
        Ok(results)
    }
}

fn revert_entry(entry: &JournalEntry, guard: &RootGuard) -> Result<RevertResult, JournalError> {
    if !entry.path.exists() {
        return Ok(RevertResult::Missing);
    }
    if let Err(err) = guard.validate_path(&entry.path) {
        warn!("not reverting {}: {err}", entry.path.display());
        return Ok(RevertResult::Refused);
    }
    let current = match fs::read(&entry.path) {
        Ok(bytes) => bytes,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(RevertResult::Missing),
        Err(source) => {
            return Err(JournalError::Io {
                path: entry.path.clone(),
                source,
            })
        }
    };
    if xxh3_64(&current) != entry.after_hash {
        return Ok(RevertResult::Modified);
    }
    match &entry.before {
        Some(before) => {
            atomic_write(&entry.path, before.as_bytes())?;
            Ok(RevertResult::Restored)
        }
        None => {
            fs::remove_file(&entry.path).map_err(io_err(&entry.path))?;
            Ok(RevertResult::Removed)
        }
    }
}
