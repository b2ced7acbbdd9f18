//! Host information used by the provisioning workflow.
//!
//! When a creation request names neither a release nor a template, the
//! host's currently running release version is substituted as the
//! implicit source selector.

use std::io;
use std::process::Command;
use tracing::debug;

/// The host this control plane runs on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Host {
    release_version: String,
}

impl Host {
    /// Creates a host with a known release version.
    pub fn new(release_version: impl Into<String>) -> Self {
        Self {
            release_version: release_version.into(),
        }
    }

    /// Detects the running host's release version via `uname -r`.
    pub fn detect() -> io::Result<Self> {
        let output = Command::new("uname").arg("-r").output()?;
        if !output.status.success() {
            return Err(io::Error::other("uname -r exited with failure"));
        }
        let version = String::from_utf8_lossy(&output.stdout).trim().to_string();
        if version.is_empty() {
            return Err(io::Error::other("uname -r produced no output"));
        }
        debug!(release = %version, "detected host release");
        Ok(Self::new(version))
    }

    /// The release version string, e.g. `13.2-RELEASE`.
    pub fn release_version(&self) -> &str {
        &self.release_version
    }
}
