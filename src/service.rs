//! # Service Context
//!
//! All long-lived service state assembled once at startup and handed to the
//! HTTP layer explicitly. Handlers receive the context as shared state and
//! never reach for process-wide singletons.

use std::sync::Arc;

use crate::catalog::MappingCatalog;
use crate::engine::Engine;
use crate::lookup::LookupExecutor;
use crate::snapshot::SnapshotManager;
use crate::trust::{BearerVerifier, ResponseSigner};

/// Shared state for one running gateway instance
pub struct ServiceContext {
    /// Mapping catalog loaded at startup
    pub catalog: Arc<MappingCatalog>,
    /// Embedded query engine
    pub engine: Arc<Engine>,
    /// Snapshot lifecycle manager
    pub snapshots: Arc<SnapshotManager>,
    /// Lookup executor wired to the parts above
    pub executor: LookupExecutor,
    /// Inbound bearer token verifier
    pub verifier: BearerVerifier,
    /// Response envelope signer, when configured
    pub signer: Option<ResponseSigner>,
    /// source_id echoed when a request does not carry one
    pub default_source_id: String,
}

impl ServiceContext {
    /// Assemble a context from pre-built parts
    pub fn new(
        catalog: Arc<MappingCatalog>,
        engine: Arc<Engine>,
        snapshots: Arc<SnapshotManager>,
        verifier: BearerVerifier,
        signer: Option<ResponseSigner>,
        default_source_id: String,
    ) -> Self {
        let executor = LookupExecutor::new(catalog.clone(), engine.clone(), snapshots.clone());

        Self {
            catalog,
            engine,
            snapshots,
            executor,
            verifier,
            signer,
            default_source_id,
        }
    }
}
