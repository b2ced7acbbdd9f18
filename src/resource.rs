//! # Filesystem-Backed Config Resources
//!
//! A [`ConfigResource`] binds a [`PropertyStore`] to one file on disk
//! through a [`ConfigCodec`]. Every jail instance owns exactly one
//! resource; its path is derived from the instance directory.
//!
//! ## Lifecycle Contract
//!
//! - Loading replaces the in-memory store with the decoded file content
//!   and clears the dirty flag.
//! - Mutation marks the resource dirty but never persists implicitly;
//!   saving is an explicit call made by the workflow after a unit
//!   creation succeeds.
//! - Immediately after `load()` or `save()`, the on-disk representation
//!   and the in-memory store are equal.
//!
//! ## Atomic Writes
//!
//! Saves go through a temp file + rename:
//! 1. Write to `<path>.tmp.<uuid>`
//! 2. Rename to `<path>`
//!
//! A crash or I/O failure partway through leaves the prior on-disk
//! content intact, and concurrent readers never observe a partial
//! write. Temp names are unique so concurrent savers cannot trample
//! each other's staging files.

use crate::codec::ConfigCodec;
use crate::constants::MAX_CONFIG_FILE_SIZE;
use crate::error::{Error, Result};
use crate::props::PropertyStore;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// A property store bound to a file through a codec.
pub struct ConfigResource {
    /// Backing file location.
    path: PathBuf,
    /// The owned property store.
    store: PropertyStore,
    /// Serialization format for the backing file.
    codec: Box<dyn ConfigCodec>,
    /// True when the in-memory store has unsaved changes.
    dirty: bool,
}

impl ConfigResource {
    /// Creates a resource with an empty store. Nothing touches disk
    /// until `load()` or `save()`.
    pub fn new(path: PathBuf, codec: Box<dyn ConfigCodec>) -> Self {
        Self {
            path,
            store: PropertyStore::new(),
            codec,
            dirty: false,
        }
    }

    /// Creates a resource seeded with an existing store.
    ///
    /// The seed has never been persisted, so the resource starts dirty.
    pub fn with_store(path: PathBuf, codec: Box<dyn ConfigCodec>, store: PropertyStore) -> Self {
        Self {
            path,
            store,
            codec,
            dirty: true,
        }
    }

    /// Backing file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns true if the backing file exists.
    pub fn exists(&self) -> bool {
        self.path.is_file()
    }

    /// Returns true if the store has unsaved changes.
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Read-only view of the property store.
    pub fn store(&self) -> &PropertyStore {
        &self.store
    }

    /// Mutable view of the property store. Marks the resource dirty.
    pub fn store_mut(&mut self) -> &mut PropertyStore {
        self.dirty = true;
        &mut self.store
    }

    /// Parses and stores one property. Marks the resource dirty.
    pub fn set(&mut self, key: &str, raw: &str) -> Result<()> {
        self.store.set(key, raw)?;
        self.dirty = true;
        Ok(())
    }

    /// Loads the backing file, replacing the in-memory store.
    ///
    /// Fails with [`Error::ResourceNotFound`] if the file is missing and
    /// [`Error::ResourceCorrupt`] if it cannot be decoded or exceeds the
    /// config size bound.
    pub fn load(&mut self) -> Result<()> {
        let meta = fs::metadata(&self.path)
            .map_err(|_| Error::ResourceNotFound(self.path.clone()))?;
        if meta.len() > MAX_CONFIG_FILE_SIZE {
            return Err(Error::ResourceCorrupt {
                path: self.path.clone(),
                reason: format!(
                    "file size {} exceeds limit of {} bytes",
                    meta.len(),
                    MAX_CONFIG_FILE_SIZE
                ),
            });
        }

        let bytes = fs::read(&self.path).map_err(|_| Error::ResourceNotFound(self.path.clone()))?;

        self.store = self.codec.decode(&bytes).map_err(|e| Error::ResourceCorrupt {
            path: self.path.clone(),
            reason: e.to_string(),
        })?;
        self.dirty = false;

        debug!(
            path = %self.path.display(),
            codec = self.codec.name(),
            properties = self.store.len(),
            "loaded config resource"
        );
        Ok(())
    }

    /// Encodes the store and writes it atomically to the backing file.
    ///
    /// On any failure the prior on-disk content is untouched and the
    /// staging file is removed.
    pub fn save(&mut self) -> Result<()> {
        let bytes = self.codec.encode(&self.store)?;

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| Error::ResourceWriteError {
                path: self.path.clone(),
                reason: e.to_string(),
            })?;
        }

        // Unique temp name: concurrent savers stage independently and
        // the final rename is atomic.
        let temp_name = format!("tmp.{}", uuid::Uuid::now_v7());
        let temp_path = self.path.with_extension(temp_name);

        fs::write(&temp_path, &bytes).map_err(|e| Error::ResourceWriteError {
            path: self.path.clone(),
            reason: e.to_string(),
        })?;
        fs::rename(&temp_path, &self.path).map_err(|e| {
            let _ = fs::remove_file(&temp_path);
            Error::ResourceWriteError {
                path: self.path.clone(),
                reason: e.to_string(),
            }
        })?;

        self.dirty = false;
        debug!(
            path = %self.path.display(),
            bytes = bytes.len(),
            "saved config resource"
        );
        Ok(())
    }
}
