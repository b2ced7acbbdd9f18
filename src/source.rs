//! # Source Resolution
//!
//! A jail is created from a *source*: either a release (an immutable,
//! versioned base image) or a template (a prior jail instance cloned in
//! place of a release). Before any unit in a batch is attempted, the
//! [`SourceResolver`] drives the selector to a terminal state exactly
//! once; the resolved [`Source`] is then shared read-only across all
//! units.
//!
//! ## Release State Machine
//!
//! ```text
//!                 ┌─────────┐
//!                 │ Unknown │
//!                 └────┬────┘
//!          query local │ inventory
//!       ┌──────────────┼───────────────┐
//!       ▼              ▼               ▼
//! ┌───────────┐ ┌──────────────┐ ┌─────────┐
//! │ Fetched-  │ │ Available-   │ │ Missing │──► SourceNotFound
//! │ Local  ✓  │ │ Remote       │ └─────────┘
//! └───────────┘ └──────┬───────┘
//!                      │ auto-fetch          fail-if-missing
//!                      ├─────────────────────────────┐
//!                      ▼                             ▼
//!            fetch ok → FetchedLocal ✓       SourceNotFetched
//!            fetch err → FetchFailed
//! ```
//!
//! Templates are always local; their resolution either succeeds
//! immediately or fails with `SourceNotFound`.
//!
//! ## Collaborators
//!
//! Inventory queries and the actual download are behind the
//! [`SourceInventory`] and [`Fetcher`] traits so the resolver can be
//! exercised without a live mirror.

use crate::error::{Error, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info};

// =============================================================================
// Source Model
// =============================================================================

/// Availability state of a source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Availability {
    /// Not yet queried.
    Unknown,
    /// Exists upstream but is not downloaded.
    AvailableRemote,
    /// Present locally; jails may be instantiated from it.
    FetchedLocal,
    /// Does not exist locally or upstream.
    Missing,
}

/// What kind of source a jail is created from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    /// An immutable, versioned base image.
    Release,
    /// A prior jail instance used as a clone source.
    Template,
}

/// How the resolver handles a release that is not yet downloaded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FetchPolicy {
    /// Fetch the release automatically (the default).
    #[default]
    AutoFetch,
    /// Fail with `SourceNotFetched` instead of fetching.
    FailIfMissing,
}

/// Which source a creation request names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceSelector {
    /// Create from a release by name.
    Release(String),
    /// Create from an existing jail used as a template.
    Template(String),
}

impl SourceSelector {
    /// The selected source name.
    pub fn name(&self) -> &str {
        match self {
            Self::Release(name) | Self::Template(name) => name,
        }
    }
}

/// A resolved creation source, shared read-only across a batch.
///
/// A source only reaches callers in the `FetchedLocal` state; the
/// resolver fails otherwise.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Source {
    name: String,
    kind: SourceKind,
    state: Availability,
}

impl Source {
    /// Source name (release version string or template jail name).
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Release or template.
    pub fn kind(&self) -> SourceKind {
        self.kind
    }

    /// Availability state. Always `FetchedLocal` for resolved sources.
    pub fn state(&self) -> Availability {
        self.state
    }

    /// Version identifier, present for releases only. The release name
    /// is its version (`13.2-RELEASE`).
    pub fn version(&self) -> Option<&str> {
        match self.kind {
            SourceKind::Release => Some(&self.name),
            SourceKind::Template => None,
        }
    }
}

// =============================================================================
// Collaborator Traits
// =============================================================================

/// Queries the local and upstream inventory of sources.
#[async_trait]
pub trait SourceInventory: Send + Sync {
    /// Returns true if the release is already downloaded.
    async fn release_fetched(&self, name: &str) -> bool;

    /// Returns true if the release exists upstream.
    async fn release_available(&self, name: &str) -> Result<bool>;

    /// Returns true if a jail with this name exists locally.
    async fn template_exists(&self, name: &str) -> bool;
}

/// Downloads a release into the local inventory.
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Fetches the named release. On success the release must be
    /// reported as fetched by the inventory.
    async fn fetch(&self, name: &str) -> Result<()>;
}

// =============================================================================
// Resolver
// =============================================================================

/// Drives a source selector to a terminal state.
pub struct SourceResolver {
    inventory: Arc<dyn SourceInventory>,
    fetcher: Arc<dyn Fetcher>,
}

impl SourceResolver {
    /// Creates a resolver over the given collaborators.
    pub fn new(inventory: Arc<dyn SourceInventory>, fetcher: Arc<dyn Fetcher>) -> Self {
        Self { inventory, fetcher }
    }

    /// Resolves a selector, fetching on demand per `policy`.
    ///
    /// Called once per workflow invocation; the returned source is
    /// terminal-success (`FetchedLocal`) and never mutated afterwards.
    pub async fn resolve(&self, selector: &SourceSelector, policy: FetchPolicy) -> Result<Source> {
        match selector {
            SourceSelector::Release(name) => self.resolve_release(name, policy).await,
            SourceSelector::Template(name) => self.resolve_template(name).await,
        }
    }

    async fn resolve_release(&self, name: &str, policy: FetchPolicy) -> Result<Source> {
        if self.inventory.release_fetched(name).await {
            debug!(release = name, "release already fetched");
            return Ok(Source {
                name: name.to_string(),
                kind: SourceKind::Release,
                state: Availability::FetchedLocal,
            });
        }

        if !self.inventory.release_available(name).await? {
            return Err(Error::SourceNotFound(name.to_string()));
        }

        match policy {
            FetchPolicy::FailIfMissing => {
                Err(Error::SourceNotFetched(name.to_string()))
            }
            FetchPolicy::AutoFetch => {
                info!(release = name, "release available upstream, fetching");
                self.fetcher.fetch(name).await?;
                Ok(Source {
                    name: name.to_string(),
                    kind: SourceKind::Release,
                    state: Availability::FetchedLocal,
                })
            }
        }
    }

    async fn resolve_template(&self, name: &str) -> Result<Source> {
        // Templates are prior jail instances; no fetch state applies.
        if !self.inventory.template_exists(name).await {
            return Err(Error::SourceNotFound(name.to_string()));
        }
        debug!(template = name, "template resolved");
        Ok(Source {
            name: name.to_string(),
            kind: SourceKind::Template,
            state: Availability::FetchedLocal,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FakeInventory {
        fetched: bool,
        available: bool,
        template: bool,
    }

    #[async_trait]
    impl SourceInventory for FakeInventory {
        async fn release_fetched(&self, _name: &str) -> bool {
            self.fetched
        }
        async fn release_available(&self, _name: &str) -> Result<bool> {
            Ok(self.available)
        }
        async fn template_exists(&self, _name: &str) -> bool {
            self.template
        }
    }

    #[derive(Default)]
    struct CountingFetcher {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl Fetcher for CountingFetcher {
        async fn fetch(&self, _name: &str) -> Result<()> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    fn resolver_with(
        inventory: FakeInventory,
    ) -> (SourceResolver, Arc<CountingFetcher>) {
        let fetcher = Arc::new(CountingFetcher::default());
        let resolver = SourceResolver::new(Arc::new(inventory), fetcher.clone());
        (resolver, fetcher)
    }

    #[tokio::test]
    async fn test_missing_release_never_fetches() {
        let (resolver, fetcher) = resolver_with(FakeInventory {
            fetched: false,
            available: false,
            template: false,
        });
        let err = resolver
            .resolve(
                &SourceSelector::Release("9.9-RELEASE".into()),
                FetchPolicy::AutoFetch,
            )
            .await
            .unwrap_err();
        assert!(matches!(err, Error::SourceNotFound(_)));
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_no_fetch_policy_fails_without_fetching() {
        let (resolver, fetcher) = resolver_with(FakeInventory {
            fetched: false,
            available: true,
            template: false,
        });
        let err = resolver
            .resolve(
                &SourceSelector::Release("13.2-RELEASE".into()),
                FetchPolicy::FailIfMissing,
            )
            .await
            .unwrap_err();
        assert!(matches!(err, Error::SourceNotFetched(_)));
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_auto_fetch_transitions_to_local() {
        let (resolver, fetcher) = resolver_with(FakeInventory {
            fetched: false,
            available: true,
            template: false,
        });
        let source = resolver
            .resolve(
                &SourceSelector::Release("13.2-RELEASE".into()),
                FetchPolicy::AutoFetch,
            )
            .await
            .unwrap();
        assert_eq!(source.state(), Availability::FetchedLocal);
        assert_eq!(source.version(), Some("13.2-RELEASE"));
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_template_has_no_version() {
        let (resolver, _fetcher) = resolver_with(FakeInventory {
            fetched: false,
            available: false,
            template: true,
        });
        let source = resolver
            .resolve(
                &SourceSelector::Template("golden".into()),
                FetchPolicy::AutoFetch,
            )
            .await
            .unwrap();
        assert_eq!(source.kind(), SourceKind::Template);
        assert_eq!(source.version(), None);
    }
}
