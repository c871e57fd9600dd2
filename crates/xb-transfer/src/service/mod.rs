//! # Service Layer
//!
//! Orchestrator, adapter registry and mesh wiring, plus [`TransferService`],
//! which binds them to the [`TransferApi`] inbound port.

pub mod mesh;
pub mod orchestrator;
pub mod registry;

pub use mesh::{audit_mesh, wire_mesh};
pub use orchestrator::TransferOrchestrator;
pub use registry::{AdapterRegistry, SharedAdapter, SharedObserver, TransferRoute};

use crate::algorithms::CancelSignal;
use crate::domain::{
    Address, AuditEntry, EndpointId, MeshTopology, OrchestratorConfig, TransferError,
    TransferOutcome, TransferRequest, WiringReport,
};
use crate::ports::TransferApi;
use async_trait::async_trait;

/// One deployment: adapters, their connection graph, and a pipeline.
pub struct TransferService {
    registry: AdapterRegistry,
    topology: MeshTopology,
    orchestrator: TransferOrchestrator,
}

impl TransferService {
    /// Create a service. Fails if `config` does not validate.
    pub fn new(
        registry: AdapterRegistry,
        topology: MeshTopology,
        config: OrchestratorConfig,
    ) -> Result<Self, TransferError> {
        Ok(Self {
            registry,
            topology,
            orchestrator: TransferOrchestrator::new(config)?,
        })
    }

    /// Registered adapters.
    pub fn registry(&self) -> &AdapterRegistry {
        &self.registry
    }

    /// Connection graph.
    pub fn topology(&self) -> &MeshTopology {
        &self.topology
    }

    /// Underlying pipeline.
    pub fn orchestrator(&self) -> &TransferOrchestrator {
        &self.orchestrator
    }
}

#[async_trait]
impl TransferApi for TransferService {
    async fn transfer(
        &self,
        request: &TransferRequest,
        refund_address: Address,
        cancel: &CancelSignal,
    ) -> TransferOutcome {
        match self.registry.route(request.source, request.destination) {
            Ok(route) => {
                self.orchestrator
                    .execute(&route, request, refund_address, cancel)
                    .await
            }
            Err(err) => orchestrator::rejected(err),
        }
    }

    async fn wire(&self) -> Vec<WiringReport> {
        wire_mesh(&self.registry, &self.topology, self.orchestrator.locks()).await
    }

    async fn audit(&self) -> Vec<AuditEntry> {
        audit_mesh(&self.registry, &self.topology).await
    }

    fn is_endpoint_supported(&self, endpoint: EndpointId) -> bool {
        self.registry.contains(endpoint)
    }
}
