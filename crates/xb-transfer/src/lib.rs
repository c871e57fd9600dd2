//! # XB Transfer
//!
//! Client-side orchestrator for cross-chain token transfers over a
//! messaging network.
//!
//! **Architecture:** Hexagonal (DDD + Ports/Adapters)
//!
//! ## Purpose
//!
//! Drive one transfer from request to delivery:
//! - Reconcile the peer bindings between source and destination adapters
//! - Quote the delivery fee, falling back to a conservative constant
//! - Dry-run the transfer before committing it
//! - Submit exactly once and watch the destination for delivery
//!
//! ## Guarantees
//!
//! | Property | Description |
//! |----------|-------------|
//! | Idempotent wiring | A binding or path setting is written only when it differs |
//! | Quoting never fails | Any quote failure yields the fallback fee |
//! | Simulation gating | A failed dry run is never followed by a submit |
//! | Value invariant | `value == nativeFee (+ amount for native adapters)` |
//! | Bounded watching | At most `max_poll_attempts` observations |
//! | Per-signer writes | One in-flight write per signing identity |
//!
//! ## Module Structure
//!
//! ```text
//! xb-transfer/
//! ├── domain/          # Requests, outcomes, addresses, config, errors
//! ├── algorithms/      # Reconcile, fee, simulate, submit, watch
//! ├── ports/           # TransferApi, capability traits, mocks
//! ├── service/         # Orchestrator, registry, mesh wiring
//! └── adapters/        # In-memory simnet
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod adapters;
pub mod algorithms;
pub mod domain;
pub mod ports;
pub mod service;

// Re-exports
pub use adapters::{ObservedAsset, Simnet, SimnetAdapter, SimnetObserver};
pub use algorithms::{
    await_delivery, cancel_pair, reconcile, reconcile_config, simulate, submit, value_to_send,
    CancelHandle, CancelSignal, DeliveryWatcher, FeeQuotingEngine, PollState, SignerLocks,
};
pub use domain::{
    format_units, parse_units, Address, AuditEntry, AuditStatus, ConfigKind, Connection,
    DeliveryResult, DeliveryStatus, EndpointId, FailureReason, FeeQuote, FeeSource, MeshTopology,
    OrchestrationState, OrchestratorConfig, PathSettings, PeerBinding, ReconcileResult,
    SimulationReport, Stage, StageRecord, TransactionId, TransactionReceipt, TransferError,
    TransferOutcome, TransferRequest, TransferRequestBuilder, TransferStatus, WiringReport,
    DEFAULT_FALLBACK_FEE, NATIVE_DECIMALS,
};
pub use ports::{
    ConfigCapability, MessagingAdapter, MockMessagingAdapter, ObserveCapability, PeerCapability,
    QuoteCapability, ScriptedObserver, SigningIdentity, SimulateCapability, SubmitCapability,
    TransferApi,
};
pub use service::{
    audit_mesh, wire_mesh, AdapterRegistry, SharedAdapter, SharedObserver, TransferOrchestrator,
    TransferRoute, TransferService,
};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
