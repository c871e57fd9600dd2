//! # Inbound Ports
//!
//! API trait defining what the transfer subsystem offers to callers.

use crate::algorithms::CancelSignal;
use crate::domain::{
    Address, AuditEntry, EndpointId, TransferOutcome, TransferRequest, WiringReport,
};
use async_trait::async_trait;

/// Transfer API - inbound port.
#[async_trait]
pub trait TransferApi: Send + Sync {
    /// Run one transfer through the full pipeline.
    ///
    /// Always returns an outcome; failures are reported as
    /// `TransferStatus::Failed` with the failing stage attached.
    async fn transfer(
        &self,
        request: &TransferRequest,
        refund_address: Address,
        cancel: &CancelSignal,
    ) -> TransferOutcome;

    /// Reconcile every connection of the mesh.
    async fn wire(&self) -> Vec<WiringReport>;

    /// Check every connection of the mesh without writing.
    async fn audit(&self) -> Vec<AuditEntry>;

    /// Whether an adapter is registered for `endpoint`.
    fn is_endpoint_supported(&self, endpoint: EndpointId) -> bool;
}
