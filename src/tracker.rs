//! Content change tracking for incremental translation.
//!
//! Translating a file costs one API round trip per target language, so the
//! translate stage skips source files whose content is unchanged since they
//! were last processed.
//!
//! ## Fingerprints
//!
//! Each tracked file is recorded under its canonical absolute path with a
//! SHA-256 digest of its text, so `content/a.md`, `./content/a.md` and
//! `/site/content/a.md` all share one entry. Content-based rather than mtime-based so it survives `git checkout`
//! (which resets modification times). A file is *changed* when its path is
//! not recorded or its current digest differs from the recorded one.
//!
//! ## Storage
//!
//! The record is a JSON file (default `.hash`) loaded once when the tracker
//! is opened. A missing, unreadable or corrupt record loads as empty, which
//! simply means every file counts as changed. [`ChangeTracker::update`]
//! writes the whole record back immediately, so an interrupted run keeps
//! everything recorded up to that point.

use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::io;
use std::path::{Path, PathBuf};

/// Version of the record format. Bump to invalidate existing records when
/// the format or digest computation changes.
const RECORD_VERSION: u32 = 1;

#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
struct ChangeRecord {
    version: u32,
    checksums: BTreeMap<String, String>,
}

/// Tracks which files changed since they were last recorded.
#[derive(Debug)]
pub struct ChangeTracker {
    store: PathBuf,
    record: ChangeRecord,
}

impl ChangeTracker {
    /// Open the record at `store`. Returns an empty tracker if the file
    /// doesn't exist or can't be parsed.
    pub fn open(store: &Path) -> Self {
        let record = std::fs::read_to_string(store)
            .ok()
            .and_then(|content| serde_json::from_str::<ChangeRecord>(&content).ok())
            .filter(|record| record.version == RECORD_VERSION)
            .unwrap_or_else(|| {
                log::debug!("No usable change record at {}", store.display());
                ChangeRecord {
                    version: RECORD_VERSION,
                    checksums: BTreeMap::new(),
                }
            });
        Self {
            store: store.to_path_buf(),
            record,
        }
    }

    /// Whether `path`'s content differs from what was last recorded.
    ///
    /// A file that can't be read counts as changed; the caller will hit the
    /// read error itself when it goes on to process the file.
    pub fn has_changed(&self, path: &Path) -> bool {
        match (self.record.checksums.get(&key(path)), checksum(path)) {
            (Some(recorded), Ok(current)) => *recorded != current,
            _ => true,
        }
    }

    /// Record `path`'s current checksum and persist the whole record.
    pub fn update(&mut self, path: &Path) -> io::Result<()> {
        let digest = checksum(path)?;
        self.record.checksums.insert(key(path), digest);
        self.save()
    }

    /// Number of tracked files.
    pub fn len(&self) -> usize {
        self.record.checksums.len()
    }

    pub fn is_empty(&self) -> bool {
        self.record.checksums.is_empty()
    }

    fn save(&self) -> io::Result<()> {
        if let Some(parent) = self.store.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(&self.record)?;
        std::fs::write(&self.store, json)
    }
}

/// Record key for `path`: canonical if the file exists, otherwise absolute.
fn key(path: &Path) -> String {
    std::fs::canonicalize(path)
        .or_else(|_| std::path::absolute(path))
        .unwrap_or_else(|_| path.to_path_buf())
        .to_string_lossy()
        .into_owned()
}

/// SHA-256 of a file's UTF-8 text, as a hex string.
///
/// Fails with `InvalidData` for files that are not valid UTF-8.
pub fn checksum(path: &Path) -> io::Result<String> {
    let text = std::fs::read_to_string(path)?;
    Ok(format!("{:x}", Sha256::digest(text.as_bytes())))
}
