//! # Provisioning Workflow
//!
//! Orchestrates batch jail creation: resolve the source once, build a
//! base property store from the request, then create N units
//! sequentially with per-unit fault isolation.
//!
//! ## Failure Domains
//!
//! | Stage                         | Failure scope |
//! |-------------------------------|---------------|
//! | Request validation            | batch-fatal   |
//! | Source resolution             | batch-fatal   |
//! | Base store construction       | batch-fatal   |
//! | Per-unit instantiate/persist  | unit-local    |
//!
//! A unit failure is recorded in its [`UnitOutcome`] and the remaining
//! units are still attempted. Outcomes come back in request order.
//!
//! ## Sequencing
//!
//! Units are created strictly one after another: each unit's filesystem
//! materialization and config persistence completes (or fails) before
//! the next begins, because unit creation allocates from a shared
//! namespace. The resolved [`Source`] is shared read-only across the
//! batch, so the fetch happens at most once even for large counts.

use crate::codec::JsonCodec;
use crate::constants::CONFIG_FILE_NAME;
use crate::error::{Error, Result};
use crate::host::Host;
use crate::props::{PropertyStore, PropertyValue};
use crate::request::ProvisioningRequest;
use crate::resource::ConfigResource;
use crate::source::{Source, SourceKind, SourceResolver};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info, warn};

// =============================================================================
// Runtime Collaborator
// =============================================================================

/// Handle to a materialized jail instance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstanceHandle {
    /// Instance name.
    pub name: String,
    /// Instance directory on disk.
    pub dir: PathBuf,
}

/// Materializes jail instances from a resolved source.
///
/// This is the boundary to the actual jail/volume machinery; the
/// workflow only decides what gets created and records the outcome.
#[async_trait]
pub trait JailRuntime: Send + Sync {
    /// Creates one jail instance from `source`, configured by `store`.
    ///
    /// The store carries the instance name under the `name` property.
    /// Failures surface as [`Error::InstantiationFailed`] and are
    /// wrapped into the unit's outcome by the workflow.
    async fn instantiate(&self, source: &Source, store: &PropertyStore) -> Result<InstanceHandle>;
}

// =============================================================================
// Outcomes
// =============================================================================

/// Result of one unit in a provisioning batch.
#[derive(Debug)]
pub struct UnitOutcome {
    /// Zero-based position in the batch.
    pub index: u32,
    /// Display name of the instance.
    pub name: String,
    /// Creation result for this unit alone.
    pub result: Result<()>,
}

impl UnitOutcome {
    /// Returns true if this unit was created and persisted.
    pub fn succeeded(&self) -> bool {
        self.result.is_ok()
    }
}

// =============================================================================
// Workflow
// =============================================================================

/// Batch jail creation against a resolved source.
pub struct ProvisioningWorkflow {
    resolver: SourceResolver,
    runtime: Arc<dyn JailRuntime>,
    /// Directory holding jail instance directories; used to locate a
    /// template's persisted config.
    jail_root: PathBuf,
}

impl ProvisioningWorkflow {
    /// Creates a workflow over the given collaborators.
    pub fn new(resolver: SourceResolver, runtime: Arc<dyn JailRuntime>, jail_root: PathBuf) -> Self {
        Self {
            resolver,
            runtime,
            jail_root,
        }
    }

    /// Creates `request.count` jails and reports one outcome per unit.
    ///
    /// Returns `Err` only for batch-fatal conditions (invalid request,
    /// malformed override token, source resolution failure) detected
    /// before any unit is attempted. Once the loop starts, failures are
    /// per-unit and the batch always runs to the end.
    pub async fn create(
        &self,
        request: &ProvisioningRequest,
        host: &Host,
    ) -> Result<Vec<UnitOutcome>> {
        request.validate()?;

        let selector = request.selector(host);
        let source = self
            .resolver
            .resolve(&selector, request.fetch_policy)
            .await?;

        let base = self.build_base_store(request, &source)?;

        let mut outcomes = Vec::with_capacity(request.count as usize);
        for index in 0..request.count {
            let name = match &request.name {
                Some(name) => name.clone(),
                None => uuid::Uuid::new_v4().to_string(),
            };

            let suffix = if request.count > 1 {
                format!(" ({}/{})", index + 1, request.count)
            } else {
                String::new()
            };

            let result = self.create_unit(&name, &base, &source).await;
            match &result {
                Ok(()) => {
                    info!(
                        "jail '{}' successfully created from '{}'{}",
                        name,
                        source.name(),
                        suffix
                    );
                }
                Err(e) => {
                    warn!("jail '{}' could not be created{}: {}", name, suffix, e);
                }
            }

            outcomes.push(UnitOutcome {
                index,
                name,
                result,
            });
        }

        Ok(outcomes)
    }

    /// Builds the property store every unit is seeded from.
    ///
    /// Order matters: template inheritance first, then the request's
    /// explicit flags, then `key=value` overrides (strongest).
    fn build_base_store(
        &self,
        request: &ProvisioningRequest,
        source: &Source,
    ) -> Result<PropertyStore> {
        let mut store = PropertyStore::new();

        match source.kind() {
            SourceKind::Release => {
                store.put("release", PropertyValue::Str(source.name().to_string()));
            }
            SourceKind::Template => self.inherit_from_template(&mut store, source.name())?,
        }

        if request.basejail {
            store.put("basejail", PropertyValue::Bool(true));
        }
        if let Some(basejail_type) = request.basejail_type {
            store.put(
                "basejail_type",
                PropertyValue::Choice(basejail_type.as_str().to_string()),
            );
        }
        if request.empty {
            store.put("empty", PropertyValue::Bool(true));
        }
        if let Some(pkglist) = &request.pkglist {
            store.put(
                "pkglist",
                PropertyValue::Str(pkglist.to_string_lossy().into_owned()),
            );
        }

        store.apply_overrides(&request.props)?;
        Ok(store)
    }

    /// Copies the source-defining properties from a template's
    /// persisted config onto the base store.
    fn inherit_from_template(&self, store: &mut PropertyStore, template: &str) -> Result<()> {
        let path = self.jail_root.join(template).join(CONFIG_FILE_NAME);
        let mut resource = ConfigResource::new(path, Box::new(JsonCodec::new()));

        match resource.load() {
            Ok(()) => {
                for key in ["release", "basejail", "basejail_type"] {
                    if let Some(value) = resource.store().stored(key) {
                        store.put(key, value.clone());
                    }
                }
                debug!(template, "inherited source properties from template");
                Ok(())
            }
            Err(Error::ResourceNotFound(_)) => {
                // The template jail exists but carries no persisted
                // config; nothing to inherit.
                warn!(template, "template has no config, skipping inheritance");
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    /// Creates and persists one unit. Any error here is unit-local.
    async fn create_unit(
        &self,
        name: &str,
        base: &PropertyStore,
        source: &Source,
    ) -> Result<()> {
        let mut store = base.clone();
        store.put("name", PropertyValue::Str(name.to_string()));

        let handle = self.runtime.instantiate(source, &store).await?;

        let mut resource = ConfigResource::with_store(
            handle.dir.join(CONFIG_FILE_NAME),
            Box::new(JsonCodec::new()),
            store,
        );
        resource.save()?;
        Ok(())
    }
}
