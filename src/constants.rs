//! # Provisioning Constants
//!
//! Defines naming rules, size bounds, and on-disk layout names for the
//! jail provisioning layer. These constants are the single source of
//! truth for validation throughout the codebase.
//!
//! ## Cross-References
//!
//! - [`crate::resource`]: Uses the config size bound when loading
//! - [`crate::workflow`]: Uses name validation before creating units
//! - [`crate::backend`]: Uses the directory layout names

// =============================================================================
// On-Disk Layout
// =============================================================================

/// File name of the persisted jail configuration inside an instance
/// directory.
pub const CONFIG_FILE_NAME: &str = "config.json";

/// Subdirectory holding fetched releases.
///
/// Structure: `releases/<release-name>/root/`
pub const RELEASES_DIR: &str = "releases";

/// Subdirectory holding jail instances.
///
/// Structure: `jails/<jail-name>/root/` + `jails/<jail-name>/config.json`
pub const JAILS_DIR: &str = "jails";

/// Name of the root filesystem directory inside a release or jail.
pub const ROOT_DIR_NAME: &str = "root";

// =============================================================================
// Size Limits
// =============================================================================

/// Maximum size of a persisted config file (1 MiB).
///
/// **Security**: Prevents memory exhaustion from decoding a corrupt or
/// hostile config file. Real jail configs are a few KiB.
pub const MAX_CONFIG_FILE_SIZE: u64 = 1024 * 1024;

/// Maximum number of jails in a single batch request.
///
/// **Security**: Bounds disk and namespace consumption from a mistyped
/// count. Legitimate batches of a few thousand still fit.
pub const MAX_BATCH_COUNT: u32 = 10_000;

// =============================================================================
// Validation Patterns
// =============================================================================
//
// Character allowlists for user-provided names that end up in filesystem
// paths. Validation is allowlist-based, not blocklist-based.
// =============================================================================

/// Valid characters for jail instance names.
///
/// Excludes `/`, `.`, and anything else usable for path traversal when
/// the name becomes a directory component.
pub const INSTANCE_NAME_VALID_CHARS: &str =
    "abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789-_";

/// Valid characters for release names.
///
/// Releases carry version dots (`13.2-RELEASE`), so `.` is allowed but
/// never as a leading character.
pub const SOURCE_NAME_VALID_CHARS: &str =
    "abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789-_.";

/// Maximum instance name length.
///
/// Accommodates UUIDs (36 chars) and descriptive names with headroom.
pub const MAX_INSTANCE_NAME_LEN: usize = 88;

/// Validates a jail instance name for filesystem safety.
///
/// Ensures names are non-empty, within [`MAX_INSTANCE_NAME_LEN`], and
/// contain only characters from [`INSTANCE_NAME_VALID_CHARS`].
#[must_use = "validation result must be checked before the name is used in a path"]
pub fn validate_instance_name(name: &str) -> std::result::Result<(), &'static str> {
    if name.is_empty() {
        return Err("instance name cannot be empty");
    }
    if name.len() > MAX_INSTANCE_NAME_LEN {
        return Err("instance name exceeds maximum length");
    }
    if !name.chars().all(|c| INSTANCE_NAME_VALID_CHARS.contains(c)) {
        return Err("instance name contains invalid characters");
    }
    Ok(())
}

/// Validates a release name for filesystem safety.
#[must_use = "validation result must be checked before the name is used in a path"]
pub fn validate_source_name(name: &str) -> std::result::Result<(), &'static str> {
    if name.is_empty() {
        return Err("source name cannot be empty");
    }
    if name.len() > MAX_INSTANCE_NAME_LEN {
        return Err("source name exceeds maximum length");
    }
    if name.starts_with('.') {
        return Err("source name cannot start with '.'");
    }
    if !name.chars().all(|c| SOURCE_NAME_VALID_CHARS.contains(c)) {
        return Err("source name contains invalid characters");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_instance_name_rejects_traversal() {
        assert!(validate_instance_name("../etc").is_err());
        assert!(validate_instance_name("a/b").is_err());
        assert!(validate_instance_name("").is_err());
    }

    #[test]
    fn test_instance_name_accepts_uuid() {
        assert!(validate_instance_name("2d3f88e5-9d1a-4b2f-8f50-1b7c9a3e0c11").is_ok());
        assert!(validate_instance_name("web01").is_ok());
    }

    #[test]
    fn test_source_name_allows_version_dots() {
        assert!(validate_source_name("13.2-RELEASE").is_ok());
        assert!(validate_source_name(".hidden").is_err());
        assert!(validate_source_name("a/../b").is_err());
    }
}
