//! # Directory-Tree Backend
//!
//! A plain-filesystem implementation of the provisioning collaborators,
//! used by the CLI and integration tests. It needs no volume manager:
//! releases and jails are ordinary directory trees, and "fetching" is a
//! recursive copy from a local mirror directory.
//!
//! ## Layout
//!
//! ```text
//! <base>/
//! ├── releases/
//! │   └── 13.2-RELEASE/
//! │       └── root/        (release payload)
//! └── jails/
//!     └── web01/
//!         ├── root/        (jail filesystem)
//!         └── config.json  (persisted properties)
//! ```
//!
//! ## Instantiation Rules
//!
//! - A jail directory that already exists refuses instantiation; names
//!   are a shared namespace.
//! - Standalone jails deep-copy the source's `root/` payload.
//! - Basejails and empty jails get a bare `root/`; a basejail's release
//!   directories are mounted at start, which is outside this layer.
//! - A failed copy removes the partial instance directory before the
//!   error is reported.

use crate::constants::{
    validate_instance_name, validate_source_name, CONFIG_FILE_NAME, JAILS_DIR, RELEASES_DIR,
    ROOT_DIR_NAME,
};
use crate::error::{Error, Result};
use crate::props::PropertyStore;
use crate::source::{Fetcher, Source, SourceInventory, SourceKind};
use crate::workflow::{InstanceHandle, JailRuntime};
use async_trait::async_trait;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Directory-tree implementation of [`SourceInventory`], [`Fetcher`],
/// and [`JailRuntime`].
pub struct DirBackend {
    base: PathBuf,
    mirror: Option<PathBuf>,
}

impl DirBackend {
    /// Creates the backend, materializing the base layout.
    pub fn new(base: PathBuf) -> Result<Self> {
        fs::create_dir_all(base.join(RELEASES_DIR))?;
        fs::create_dir_all(base.join(JAILS_DIR))?;
        info!(base = %base.display(), "directory backend initialized");
        Ok(Self { base, mirror: None })
    }

    /// Attaches a mirror directory that fetches copy releases from.
    pub fn with_mirror(mut self, mirror: PathBuf) -> Self {
        self.mirror = Some(mirror);
        self
    }

    /// Base directory of the backend.
    pub fn base_dir(&self) -> &Path {
        &self.base
    }

    /// Directory holding jail instance directories.
    pub fn jail_root(&self) -> PathBuf {
        self.base.join(JAILS_DIR)
    }

    /// Directory of one fetched release.
    pub fn release_dir(&self, name: &str) -> PathBuf {
        self.base.join(RELEASES_DIR).join(name)
    }

    /// Directory of one jail instance.
    pub fn jail_dir(&self, name: &str) -> PathBuf {
        self.jail_root().join(name)
    }

    /// The filesystem payload a source contributes to new jails.
    fn source_payload(&self, source: &Source) -> PathBuf {
        match source.kind() {
            SourceKind::Release => self.release_dir(source.name()).join(ROOT_DIR_NAME),
            SourceKind::Template => self.jail_dir(source.name()).join(ROOT_DIR_NAME),
        }
    }

    /// Recursively copies a directory tree.
    fn copy_dir(from: &Path, to: &Path) -> std::io::Result<()> {
        fs::create_dir_all(to)?;
        for entry in fs::read_dir(from)? {
            let entry = entry?;
            let target = to.join(entry.file_name());
            if entry.path().is_dir() {
                Self::copy_dir(&entry.path(), &target)?;
            } else {
                fs::copy(entry.path(), &target)?;
            }
        }
        Ok(())
    }
}

#[async_trait]
impl SourceInventory for DirBackend {
    async fn release_fetched(&self, name: &str) -> bool {
        if validate_source_name(name).is_err() {
            return false;
        }
        self.release_dir(name).join(ROOT_DIR_NAME).is_dir()
    }

    async fn release_available(&self, name: &str) -> Result<bool> {
        if validate_source_name(name).is_err() {
            return Ok(false);
        }
        let Some(mirror) = &self.mirror else {
            return Ok(false);
        };
        Ok(mirror.join(name).join(ROOT_DIR_NAME).is_dir())
    }

    async fn template_exists(&self, name: &str) -> bool {
        if validate_instance_name(name).is_err() {
            return false;
        }
        self.jail_dir(name).is_dir()
    }
}

#[async_trait]
impl Fetcher for DirBackend {
    async fn fetch(&self, name: &str) -> Result<()> {
        validate_source_name(name).map_err(|reason| Error::FetchFailed {
            name: name.to_string(),
            reason: reason.to_string(),
        })?;
        let Some(mirror) = &self.mirror else {
            return Err(Error::FetchFailed {
                name: name.to_string(),
                reason: "no mirror configured".to_string(),
            });
        };

        let from = mirror.join(name);
        let to = self.release_dir(name);
        Self::copy_dir(&from, &to).map_err(|e| {
            let _ = fs::remove_dir_all(&to);
            Error::FetchFailed {
                name: name.to_string(),
                reason: e.to_string(),
            }
        })?;

        info!(release = name, "release fetched from mirror");
        Ok(())
    }
}

#[async_trait]
impl JailRuntime for DirBackend {
    async fn instantiate(&self, source: &Source, store: &PropertyStore) -> Result<InstanceHandle> {
        let name = store
            .get("name")
            .and_then(|v| v.as_str().map(str::to_string))
            .ok_or_else(|| Error::InstantiationFailed {
                name: "<unnamed>".to_string(),
                reason: "property store carries no name".to_string(),
            })?;

        validate_instance_name(&name).map_err(|reason| Error::InstantiationFailed {
            name: name.clone(),
            reason: reason.to_string(),
        })?;

        let dir = self.jail_dir(&name);
        if dir.exists() {
            return Err(Error::InstantiationFailed {
                name,
                reason: "a jail with this name already exists".to_string(),
            });
        }

        let root = dir.join(ROOT_DIR_NAME);
        fs::create_dir_all(&root).map_err(|e| Error::InstantiationFailed {
            name: name.clone(),
            reason: e.to_string(),
        })?;

        // Empty jails and basejails get a bare root; the latter mount
        // their release directories at start.
        let wants_payload = !store.flag("empty") && !store.flag("basejail");
        if wants_payload {
            let payload = self.source_payload(source);
            if !payload.is_dir() {
                let _ = fs::remove_dir_all(&dir);
                return Err(Error::InstantiationFailed {
                    name,
                    reason: format!("source payload missing at {}", payload.display()),
                });
            }
            if let Err(e) = Self::copy_dir(&payload, &root) {
                warn!(jail = %name, "payload copy failed, removing partial instance");
                let _ = fs::remove_dir_all(&dir);
                return Err(Error::InstantiationFailed {
                    name,
                    reason: e.to_string(),
                });
            }
        }

        debug!(jail = %name, source = source.name(), "instantiated jail directory");
        Ok(InstanceHandle { name, dir })
    }
}
