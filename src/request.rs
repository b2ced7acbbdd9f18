//! # Provisioning Requests
//!
//! A [`ProvisioningRequest`] is the already-parsed input to the
//! creation workflow: a source selector (release XOR template), a unit
//! count, optional explicit name, the basejail flags, and raw
//! `key=value` property override tokens. Shape validation happens here,
//! before any source is resolved or unit created.

use crate::constants::{validate_instance_name, MAX_BATCH_COUNT};
use crate::error::{Error, Result};
use crate::host::Host;
use crate::props::BASEJAIL_TYPES;
use crate::source::{FetchPolicy, SourceSelector};
use std::path::PathBuf;
use std::str::FromStr;
use tracing::debug;

// =============================================================================
// Basejail Strategy
// =============================================================================

/// How a basejail mounts its release directories at start.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BasejailType {
    /// Null-mount the release directories over the jail's own (fast,
    /// the default).
    Nullfs,
    /// Clone individual release datasets (legacy).
    Zfs,
}

impl BasejailType {
    /// Property-value spelling of the strategy.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Nullfs => "nullfs",
            Self::Zfs => "zfs",
        }
    }
}

impl FromStr for BasejailType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "nullfs" => Ok(Self::Nullfs),
            "zfs" => Ok(Self::Zfs),
            other => Err(Error::InvalidRequest(format!(
                "unknown basejail type '{}': expected one of: {}",
                other,
                BASEJAIL_TYPES.join(", ")
            ))),
        }
    }
}

impl std::fmt::Display for BasejailType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Request
// =============================================================================

/// Input to [`crate::workflow::ProvisioningWorkflow::create`].
#[derive(Debug, Clone, Default)]
pub struct ProvisioningRequest {
    /// Release to create from. Mutually exclusive with `template`.
    pub release: Option<String>,
    /// Template jail to clone from. Mutually exclusive with `release`.
    pub template: Option<String>,
    /// Number of jails to create, numbered sequentially.
    pub count: u32,
    /// Explicit instance name; only valid when `count` is 1.
    pub name: Option<String>,
    /// Mark the new jails as basejails.
    pub basejail: bool,
    /// Mount strategy; only valid together with `basejail`.
    pub basejail_type: Option<BasejailType>,
    /// Create empty jails with no release payload.
    pub empty: bool,
    /// Package list file carried onto the jail config.
    pub pkglist: Option<PathBuf>,
    /// Whether a missing release may be fetched on demand.
    pub fetch_policy: FetchPolicy,
    /// Raw `key=value` property override tokens.
    pub props: Vec<String>,
}

impl ProvisioningRequest {
    /// A single-unit request from a release, the common case.
    pub fn from_release(release: impl Into<String>) -> Self {
        Self {
            release: Some(release.into()),
            count: 1,
            ..Self::default()
        }
    }

    /// A single-unit request cloned from a template jail.
    pub fn from_template(template: impl Into<String>) -> Self {
        Self {
            template: Some(template.into()),
            count: 1,
            ..Self::default()
        }
    }

    /// Validates the request shape.
    ///
    /// Runs before any source resolution; every violation here is
    /// batch-fatal.
    pub fn validate(&self) -> Result<()> {
        if self.release.is_some() && self.template.is_some() {
            return Err(Error::InvalidRequest(
                "a release and a template are mutually exclusive".to_string(),
            ));
        }
        if self.count == 0 {
            return Err(Error::InvalidRequest(
                "count must be a positive integer".to_string(),
            ));
        }
        if self.count > MAX_BATCH_COUNT {
            return Err(Error::InvalidRequest(format!(
                "count {} exceeds the batch limit of {}",
                self.count, MAX_BATCH_COUNT
            )));
        }
        if self.name.is_some() && self.count > 1 {
            return Err(Error::InvalidRequest(
                "an explicit name is only valid when count is 1".to_string(),
            ));
        }
        if let Some(name) = &self.name {
            validate_instance_name(name)
                .map_err(|reason| Error::InvalidRequest(format!("name '{}': {}", name, reason)))?;
        }
        if self.basejail_type.is_some() && !self.basejail {
            return Err(Error::InvalidRequest(
                "basejail type cannot be set without the basejail flag".to_string(),
            ));
        }
        Ok(())
    }

    /// The effective source selector.
    ///
    /// When neither a release nor a template is named, the host's
    /// currently running release is substituted.
    pub fn selector(&self, host: &Host) -> SourceSelector {
        if let Some(template) = &self.template {
            return SourceSelector::Template(template.clone());
        }
        if let Some(release) = &self.release {
            return SourceSelector::Release(release.clone());
        }
        debug!(
            release = host.release_version(),
            "no release selected, defaulting to host release"
        );
        SourceSelector::Release(host.release_version().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_release_and_template_are_exclusive() {
        let mut request = ProvisioningRequest::from_release("13.2-RELEASE");
        request.template = Some("golden".to_string());
        assert!(matches!(
            request.validate(),
            Err(Error::InvalidRequest(_))
        ));
    }

    #[test]
    fn test_basejail_type_requires_basejail_flag() {
        let mut request = ProvisioningRequest::from_release("13.2-RELEASE");
        request.basejail_type = Some(BasejailType::Nullfs);
        assert!(matches!(
            request.validate(),
            Err(Error::InvalidRequest(_))
        ));

        request.basejail = true;
        assert!(request.validate().is_ok());
    }

    #[test]
    fn test_explicit_name_requires_single_unit() {
        let mut request = ProvisioningRequest::from_release("13.2-RELEASE");
        request.name = Some("web01".to_string());
        assert!(request.validate().is_ok());

        request.count = 3;
        assert!(matches!(
            request.validate(),
            Err(Error::InvalidRequest(_))
        ));
    }

    #[test]
    fn test_default_selector_is_host_release() {
        let request = ProvisioningRequest {
            count: 1,
            ..ProvisioningRequest::default()
        };
        let host = Host::new("13.2-RELEASE");
        assert_eq!(
            request.selector(&host),
            SourceSelector::Release("13.2-RELEASE".to_string())
        );
    }

    #[test]
    fn test_basejail_type_parsing() {
        assert_eq!("nullfs".parse::<BasejailType>().unwrap(), BasejailType::Nullfs);
        assert_eq!("zfs".parse::<BasejailType>().unwrap(), BasejailType::Zfs);
        assert!("tmpfs".parse::<BasejailType>().is_err());
    }
}
