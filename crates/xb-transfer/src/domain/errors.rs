//! # Domain Errors
//!
//! Error taxonomy for the transfer pipeline.

use super::value_objects::EndpointId;
use primitive_types::U256;
use thiserror::Error;

/// Transfer pipeline error types.
///
/// Every variant is cloneable so a failure can be stored verbatim inside a
/// [`TransferOutcome`](super::TransferOutcome).
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum TransferError {
    /// RPC/transport failure. Transient; the whole orchestration may be retried.
    #[error("Network error: {0}")]
    NetworkError(String),

    /// The signer lacks permission for a write.
    #[error("Authorization error: {0}")]
    AuthorizationError(String),

    /// Fee quote failed. Absorbed by the fee engine, never surfaced.
    #[error("Quote error: {0}")]
    QuoteError(String),

    /// Dry run reverted. The reason is carried verbatim from the execution.
    #[error("Simulation failed: {reason}")]
    SimulationError {
        /// Revert reason.
        reason: String,
    },

    /// The source chain rejected the transfer.
    #[error("Submit failed: {reason}")]
    SubmitError {
        /// Rejection reason.
        reason: String,
    },

    /// `valueToSend` does not match `nativeFee (+ amount)`.
    #[error("Value mismatch: expected {expected}, got {actual}")]
    ValueMismatch {
        /// Value derived from the fee and request.
        expected: U256,
        /// Value the caller asked to send.
        actual: U256,
    },

    /// Peer reconciliation failed.
    #[error("Reconcile {local} -> {remote} failed: {cause}")]
    ReconcileError {
        /// Endpoint whose binding was being reconciled.
        local: EndpointId,
        /// Remote endpoint of the binding.
        remote: EndpointId,
        /// Underlying read or write failure.
        cause: Box<TransferError>,
    },

    /// Request violates a local invariant.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Address could not be parsed.
    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    /// Amount could not be parsed or overflowed.
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    /// Configuration rejected by validation.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// No adapter registered for the endpoint.
    #[error("Unknown endpoint: {0}")]
    UnknownEndpoint(EndpointId),
}

impl TransferError {
    /// Whether retrying the whole orchestration may succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::NetworkError(_) => true,
            Self::ReconcileError { cause, .. } => cause.is_transient(),
            _ => false,
        }
    }
}
