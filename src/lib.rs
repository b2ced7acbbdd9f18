//! # warden
//!
//! **Jail Provisioning and Configuration Control Plane**
//!
//! This crate decides what jails get created, from what source, with
//! what properties, and how failures in a batch are isolated from one
//! another. The actual isolation machinery (jail start/stop, network
//! attach, volume cloning) lives behind collaborator traits.
//!
//! # Architecture Overview
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                      ProvisioningWorkflow                      │
//! │   validate request → resolve source once → N sequential units  │
//! ├────────────────────────────────────────────────────────────────┤
//! │  ┌──────────────────┐   ┌─────────────────────────────────┐    │
//! │  │  SourceResolver  │   │         ConfigResource          │    │
//! │  │  release/template│   │  PropertyStore + ConfigCodec    │    │
//! │  │  fetch-on-demand │   │  atomic load/save, dirty flag   │    │
//! │  └────────┬─────────┘   └───────────────┬─────────────────┘    │
//! ├───────────┼─────────────────────────────┼──────────────────────┤
//! │           ▼          Collaborators      ▼                      │
//! │  SourceInventory · Fetcher · JailRuntime   (DirBackend impl)   │
//! └────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Batch Semantics
//!
//! A creation request provisions N jails against one resolved source:
//!
//! - Request validation, override parsing, and source resolution happen
//!   before any unit is created; failures there abort the whole batch.
//! - A failure while instantiating or persisting unit *i* is recorded
//!   in that unit's outcome and units *i+1..N* are still attempted.
//! - The source is resolved (and fetched, if needed) exactly once per
//!   batch, no matter the count.
//!
//! # Configuration Model
//!
//! Each jail owns one [`ConfigResource`]: a typed [`PropertyStore`]
//! bound to a file through a [`ConfigCodec`]. Known properties are
//! type-checked against a registry; unknown properties are preserved
//! verbatim. Saves are atomic (temp file + rename), so a crash never
//! leaves a half-written config behind.
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use warden::{
//!     DirBackend, Host, ProvisioningRequest, ProvisioningWorkflow, SourceResolver,
//! };
//!
//! # async fn demo() -> warden::Result<()> {
//! let backend = Arc::new(DirBackend::new("/var/warden".into())?);
//! let resolver = SourceResolver::new(backend.clone(), backend.clone());
//! let workflow = ProvisioningWorkflow::new(resolver, backend.clone(), backend.jail_root());
//!
//! let mut request = ProvisioningRequest::from_release("13.2-RELEASE");
//! request.count = 3;
//! request.props = vec!["boot=yes".to_string()];
//!
//! let outcomes = workflow.create(&request, &Host::detect()?).await?;
//! for outcome in &outcomes {
//!     println!("{}: {}", outcome.name, outcome.succeeded());
//! }
//! # Ok(())
//! # }
//! ```

pub mod backend;
pub mod codec;
pub mod constants;
pub mod error;
pub mod host;
pub mod props;
pub mod request;
pub mod resource;
pub mod source;
pub mod workflow;

// Re-exports
pub use backend::DirBackend;
pub use codec::{ConfigCodec, JsonCodec};
pub use constants::*;
pub use error::{Error, Result};
pub use host::Host;
pub use props::{PropertyStore, PropertyType, PropertyValue};
pub use request::{BasejailType, ProvisioningRequest};
pub use resource::ConfigResource;
pub use source::{
    Availability, FetchPolicy, Fetcher, Source, SourceInventory, SourceKind, SourceResolver,
    SourceSelector,
};
pub use workflow::{InstanceHandle, JailRuntime, ProvisioningWorkflow, UnitOutcome};
