//! JSON document persistence
//!
//! Handles saving and loading the library document to/from the filesystem.
//! Uses atomic writes (write to temp file, then rename) to prevent corruption.
//!
//! Storage location: `~/.local/share/formulary/` (configurable via `Config`)
//!
//! Files:
//! - `library.json` - The whole document, compact JSON
//! - `library.json.corrupt.backup` - Last library file that failed to parse

use std::fs::{self, File};
use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::document::DocumentError;
use crate::models::{self, Document};
use crate::storage::error::{StorageError, StorageResult};

/// Persistence layer for the library document
pub struct JsonPersistence {
    config: Config,
}

/// Sizes of the files backing the library
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StorageStats {
    pub library_exists: bool,
    pub library_size: u64,
    pub backup_size: u64,
}

impl StorageStats {
    pub fn total_size(&self) -> u64 {
        self.library_size + self.backup_size
    }

    pub fn total_size_human(&self) -> String {
        let size = self.total_size();
        if size < 1024 {
            format!("{} B", size)
        } else if size < 1024 * 1024 {
            format!("{:.1} KB", size as f64 / 1024.0)
        } else {
            format!("{:.1} MB", size as f64 / (1024.0 * 1024.0))
        }
    }
}

impl JsonPersistence {
    /// Create a new persistence handler with the given configuration
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Check if a library file exists on disk
    pub fn exists(&self) -> bool {
        self.config.library_path().exists()
    }

    /// Stamp and save a document using an atomic write
    pub fn save(&self, doc: &mut Document) -> Result<()> {
        doc.touch(models::now());
        let json = doc.to_json().context("Failed to serialize document")?;
        let target_path = self.config.library_path();

        atomic_write(&target_path, json.as_bytes())
            .with_context(|| format!("Failed to save library to {:?}", target_path))?;

        debug!(path = ?target_path, bytes = json.len(), "Library saved");
        Ok(())
    }

    /// Load the document from disk
    ///
    /// Returns `None` if the file doesn't exist. A file that exists but isn't
    /// UTF-8 JSON yields an error carrying a [`DocumentError`].
    pub fn load(&self) -> Result<Option<Document>> {
        let path = self.config.library_path();

        if !self.exists() {
            return Ok(None);
        }

        let bytes = fs::read(&path)
            .map_err(|e| StorageError::from_read(e, path.clone()))
            .with_context(|| format!("Failed to read library from {:?}", path))?;
        let text = String::from_utf8(bytes)
            .map_err(DocumentError::from)
            .with_context(|| format!("Failed to decode library from {:?}", path))?;

        let doc = Document::from_json(&text)
            .with_context(|| format!("Failed to parse library from {:?}", path))?;

        Ok(Some(doc))
    }

    /// Load the stored document, or start a fresh one
    ///
    /// A missing file yields the default document. A file that fails to parse
    /// is copied to the backup path and replaced by the default document;
    /// the caller never sees that failure. Other I/O failures propagate.
    pub fn load_or_create(&self) -> Result<Document> {
        match self.load() {
            Ok(Some(doc)) => {
                info!(
                    units = doc.units.len(),
                    entries = doc.entry_count(),
                    "Library loaded"
                );
                return Ok(doc);
            }
            Ok(None) => {
                info!("No library found, creating a new one");
            }
            Err(err) => {
                let details = match err.downcast_ref::<DocumentError>() {
                    Some(parse_err) => parse_err.to_string(),
                    None => return Err(err),
                };
                let corrupt = StorageError::CorruptDocument {
                    path: self.config.library_path(),
                    backup_path: self.config.backup_path(),
                    details,
                };
                self.backup_corrupt()?;
                warn!("{}", corrupt);
            }
        }

        let mut doc = Document::default();
        self.save(&mut doc)?;
        Ok(doc)
    }

    /// Copy the current library file to the backup path
    fn backup_corrupt(&self) -> Result<()> {
        let from = self.config.library_path();
        let to = self.config.backup_path();
        fs::copy(&from, &to)
            .map_err(|e| StorageError::from_io(e, to.clone()))
            .with_context(|| format!("Failed to back up {:?} to {:?}", from, to))?;
        Ok(())
    }

    /// Report sizes of the files on disk
    pub fn stats(&self) -> StorageStats {
        let size_of = |path: &Path| fs::metadata(path).map(|m| m.len()).unwrap_or(0);
        let library = self.config.library_path();
        StorageStats {
            library_exists: library.exists(),
            library_size: size_of(&library),
            backup_size: size_of(&self.config.backup_path()),
        }
    }
}

/// Write data to a file atomically
///
/// 1. Write to a temporary file in the same directory
/// 2. Sync the file to disk
/// 3. Rename the temp file to the target path
fn atomic_write(path: &Path, data: &[u8]) -> StorageResult<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|source| StorageError::CreateDirectory {
            path: parent.to_path_buf(),
            source,
        })?;
    }

    let temp_path = path.with_extension("tmp");

    let mut file =
        File::create(&temp_path).map_err(|e| StorageError::from_io(e, temp_path.clone()))?;
    file.write_all(data)
        .map_err(|e| StorageError::from_io(e, temp_path.clone()))?;
    file.sync_all()
        .map_err(|e| StorageError::from_io(e, temp_path.clone()))?;

    fs::rename(&temp_path, path).map_err(|source| StorageError::AtomicWriteFailed {
        from: temp_path.clone(),
        to: path.to_path_buf(),
        source,
    })?;

    Ok(())
}
