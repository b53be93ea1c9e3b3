//! Deck Library
//!
//! The directory of deck and media files the daemon serves. All names coming
//! from clients go through [`sanitize_name`] first, so a request can only ever
//! address a plain file directly inside the library directory.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info};

/// Extensions listed by [`DeckLibrary::list`]
pub const LISTED_EXTENSIONS: &[&str] = &["xml", "mov", "mp4", "m4v", "avi"];

/// Listing timestamp format, e.g. `Jan 2, 2006, 3:04pm (UTC)`
const DATE_FORMAT: &str = "%b %-d, %Y, %-I:%M%P (%Z)";

/// Errors from library file operations
#[derive(Debug, Error)]
pub enum LibraryError {
    /// The name was empty or had no file component
    #[error("invalid deck name: {0:?}")]
    InvalidName(String),

    /// No such file in the library
    #[error("{0}: no such file")]
    NotFound(String),

    /// Filesystem failure
    #[error("{name}: {source}")]
    Io {
        /// File (or directory) involved
        name: String,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },
}

/// One listed file
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct DeckEntry {
    /// File name
    pub name: String,
    /// Size in bytes
    pub size: u64,
    /// Modification time, formatted for display
    pub date: String,
}

/// Reduce a client-supplied path to its final file name
///
/// Returns `None` when nothing usable remains (`""`, `"/"`, `"."`, `".."`).
#[must_use]
pub fn sanitize_name(raw: &str) -> Option<String> {
    let base = raw
        .trim()
        .rsplit(['/', '\\'])
        .find(|segment| !segment.is_empty())?;

    match base {
        "." | ".." => None,
        name => Some(name.to_string()),
    }
}

/// Whether a file name has one of the listed extensions
#[must_use]
pub fn is_listed(name: &str) -> bool {
    Path::new(name)
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| LISTED_EXTENSIONS.contains(&ext))
}

/// A directory of decks
#[derive(Clone, Debug)]
pub struct DeckLibrary {
    root: PathBuf,
}

impl DeckLibrary {
    /// Serve files from `root`
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Full path of a sanitized name
    ///
    /// # Errors
    ///
    /// [`LibraryError::InvalidName`] if nothing is left after sanitizing.
    pub fn resolve(&self, raw: &str) -> Result<(String, PathBuf), LibraryError> {
        let name = sanitize_name(raw).ok_or_else(|| LibraryError::InvalidName(raw.to_string()))?;
        let path = self.root.join(&name);
        Ok((name, path))
    }

    /// Deck and media files, sorted by name
    ///
    /// # Errors
    ///
    /// [`LibraryError::Io`] if the directory cannot be read.
    pub fn list(&self) -> Result<Vec<DeckEntry>, LibraryError> {
        let io_err = |source| LibraryError::Io {
            name: self.root.display().to_string(),
            source,
        };

        let mut entries = Vec::new();
        for entry in fs::read_dir(&self.root).map_err(io_err)? {
            let entry = entry.map_err(io_err)?;
            let name = entry.file_name().to_string_lossy().into_owned();
            if !is_listed(&name) {
                continue;
            }

            let meta = entry.metadata().map_err(io_err)?;
            if !meta.is_file() {
                continue;
            }

            let date = meta
                .modified()
                .map(|t| DateTime::<Utc>::from(t).format(DATE_FORMAT).to_string())
                .unwrap_or_default();

            entries.push(DeckEntry {
                name,
                size: meta.len(),
                date,
            });
        }

        entries.sort_by(|a, b| a.name.cmp(&b.name));
        debug!(count = entries.len(), "Listed decks");
        Ok(entries)
    }

    /// Create or overwrite a file with `data`
    ///
    /// # Errors
    ///
    /// [`LibraryError::InvalidName`] or [`LibraryError::Io`].
    pub fn write(&self, raw: &str, data: &[u8]) -> Result<String, LibraryError> {
        let (name, path) = self.resolve(raw)?;
        fs::write(&path, data).map_err(|source| LibraryError::Io {
            name: name.clone(),
            source,
        })?;
        info!(name = %name, bytes = data.len(), "Deck written");
        Ok(name)
    }

    /// Create (truncate) a file for streaming output
    ///
    /// # Errors
    ///
    /// [`LibraryError::InvalidName`] or [`LibraryError::Io`].
    pub fn create(&self, raw: &str) -> Result<(String, fs::File), LibraryError> {
        let (name, path) = self.resolve(raw)?;
        let file = fs::File::create(&path).map_err(|source| LibraryError::Io {
            name: name.clone(),
            source,
        })?;
        Ok((name, file))
    }

    /// Delete a file
    ///
    /// # Errors
    ///
    /// [`LibraryError::NotFound`] if absent, otherwise
    /// [`LibraryError::InvalidName`] or [`LibraryError::Io`].
    pub fn remove(&self, raw: &str) -> Result<String, LibraryError> {
        let (name, path) = self.resolve(raw)?;
        match fs::remove_file(&path) {
            Ok(()) => {
                info!(name = %name, "Deck removed");
                Ok(name)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(LibraryError::NotFound(name)),
            Err(source) => Err(LibraryError::Io { name, source }),
        }
    }
}
