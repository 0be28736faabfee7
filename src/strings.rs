//! Translations of short strings: page titles, section labels, the site name.
//!
//! Bodies are translated into mirror files, but titles are derived from file
//! names, which stay untranslated on disk. The [`StringMap`] remembers what
//! each canonical title became in every language, and the render stage looks
//! titles up through it.
//!
//! One map is opened per invocation and passed by `&mut` to the translate
//! stage and by `&` to the render stage, so every component sees the others'
//! additions without re-reading the file. The backing file is
//! `<translations_dir>/strings.json`:
//!
//! ```json
//! {
//!     "Kirk Is Born": { "en": "Kirk Is Born", "jp": "カーク誕生" }
//! }
//! ```

use crate::naming;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StringMapError {
    #[error("IO error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Invalid string map {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Source string → language code → translation.
#[derive(Debug, Default)]
pub struct StringMap {
    path: PathBuf,
    entries: BTreeMap<String, BTreeMap<String, String>>,
}

impl StringMap {
    /// An empty map that will be saved to `path`.
    pub fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
            entries: BTreeMap::new(),
        }
    }

    /// Load the map from `path`. A missing file yields an empty map; a file
    /// that exists but does not parse is an error, since saving over it
    /// would lose every translation it holds.
    pub fn load(path: &Path) -> Result<Self, StringMapError> {
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Self::new(path)),
            Err(source) => {
                return Err(StringMapError::Io {
                    path: path.to_path_buf(),
                    source,
                });
            }
        };
        let entries = serde_json::from_str(&content).map_err(|source| StringMapError::Json {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self {
            path: path.to_path_buf(),
            entries,
        })
    }

    /// The stored translation of `string`, or `string` itself.
    pub fn lookup(&self, lang: &str, string: &str) -> String {
        self.entries
            .get(string)
            .and_then(|by_lang| by_lang.get(lang))
            .cloned()
            .unwrap_or_else(|| string.to_string())
    }

    pub fn is_translated(&self, string: &str, lang: &str) -> bool {
        self.entries
            .get(string)
            .is_some_and(|by_lang| by_lang.contains_key(lang))
    }

    /// Record a translation. The first translation recorded for a
    /// `(string, lang)` pair wins; later calls are no-ops.
    ///
    /// Returns whether the entry was added.
    pub fn add(&mut self, string: &str, lang: &str, translation: &str) -> bool {
        if self.is_translated(string, lang) {
            return false;
        }
        self.entries
            .entry(string.to_string())
            .or_default()
            .insert(lang.to_string(), translation.to_string());
        true
    }

    /// The title of `path` in `lang`: canonical title, then lookup.
    pub fn get_title(&self, lang: &str, path: &Path) -> String {
        self.lookup(lang, &naming::title_from_path(path))
    }

    /// Number of distinct source strings.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Persist the map as pretty-printed UTF-8 JSON.
    pub fn save(&self) -> Result<(), StringMapError> {
        let io_err = |source: std::io::Error| StringMapError::Io {
            path: self.path.clone(),
            source,
        };
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).map_err(io_err)?;
        }
        let json = serde_json::to_string_pretty(&self.entries).map_err(|source| {
            StringMapError::Json {
                path: self.path.clone(),
                source,
            }
        })?;
        std::fs::write(&self.path, json).map_err(io_err)
    }
}
