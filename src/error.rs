//! Error types for the provisioning control plane.

use std::path::PathBuf;

/// Result type alias for provisioning operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in the provisioning control plane.
///
/// Request-construction errors (malformed tokens, invalid request shape,
/// source resolution failures) are batch-fatal: they abort a whole
/// provisioning request before any unit is created. Instantiation and
/// persistence errors are unit-local: they are recorded in that unit's
/// outcome and the batch continues.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    // =========================================================================
    // Property Errors
    // =========================================================================
    /// A raw value failed to parse against the property's declared type.
    #[error("invalid value '{value}' for property '{key}': {reason}")]
    InvalidPropertyValue {
        key: String,
        value: String,
        reason: String,
    },

    /// A `key=value` override token had no `=` separator.
    #[error("malformed property token '{0}': expected key=value")]
    MalformedPropertyToken(String),

    // =========================================================================
    // Request Errors
    // =========================================================================
    /// The provisioning request itself is inconsistent.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    // =========================================================================
    // Source Errors
    // =========================================================================
    /// The named release or template does not exist locally or upstream.
    #[error("source not found: {0}")]
    SourceNotFound(String),

    /// The release exists upstream but fetching is disabled by policy.
    #[error("release '{0}' is available but not fetched (fetching disabled)")]
    SourceNotFetched(String),

    /// Fetching the release failed.
    #[error("failed to fetch release '{name}': {reason}")]
    FetchFailed { name: String, reason: String },

    // =========================================================================
    // Config Resource Errors
    // =========================================================================
    /// The backing config file does not exist.
    #[error("config resource not found: {0}")]
    ResourceNotFound(PathBuf),

    /// The backing config file exists but could not be decoded.
    #[error("config resource corrupt at {path}: {reason}")]
    ResourceCorrupt { path: PathBuf, reason: String },

    /// Writing the config file failed. The prior on-disk content is intact.
    #[error("failed to write config resource at {path}: {reason}")]
    ResourceWriteError { path: PathBuf, reason: String },

    /// A codec failed to encode or decode a property store.
    #[error("codec error: {0}")]
    Codec(String),

    // =========================================================================
    // Instantiation Errors
    // =========================================================================
    /// The runtime collaborator failed to materialize a jail instance.
    #[error("failed to instantiate jail '{name}': {reason}")]
    InstantiationFailed { name: String, reason: String },

    // =========================================================================
    // I/O Errors
    // =========================================================================
    /// Generic I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Returns true if this error aborts a whole batch rather than a
    /// single unit.
    pub fn is_batch_fatal(&self) -> bool {
        !matches!(
            self,
            Self::InstantiationFailed { .. } | Self::ResourceWriteError { .. }
        )
    }
}
