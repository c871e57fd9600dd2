//! # Outbound Ports
//!
//! Capabilities the orchestrator needs from the messaging adapter contract
//! and from the destination chain. Implementations own the RPC client,
//! signing and receipt waiting; the core only sees these traits.

use crate::domain::{
    Address, ConfigKind, EndpointId, FeeQuote, SimulationReport, TransactionId, TransactionReceipt,
    TransferError, TransferRequest,
};
use async_trait::async_trait;
use primitive_types::U256;

/// Identity that signs writes issued through an adapter.
///
/// Writes are serialized per signer to avoid nonce collisions.
pub trait SigningIdentity: Send + Sync {
    /// Address of the signing key.
    fn signer(&self) -> Address;
}

/// Peer registry of one adapter contract.
#[async_trait]
pub trait PeerCapability: SigningIdentity {
    /// Endpoint this adapter lives on.
    fn local_endpoint(&self) -> EndpointId;

    /// Address of the adapter contract itself, i.e. what remote adapters must
    /// record as their peer for this endpoint.
    fn contract_address(&self) -> Address;

    /// Current binding for `remote`. [`Address::ZERO`] when unset.
    async fn get_peer(&self, remote: EndpointId) -> Result<Address, TransferError>;

    /// Write the binding for `remote` and wait for ledger acceptance.
    ///
    /// Fails with `AuthorizationError` or `NetworkError`.
    async fn set_peer(
        &self,
        remote: EndpointId,
        peer: Address,
    ) -> Result<TransactionId, TransferError>;
}

/// Verifier and executor settings of one adapter's outbound paths.
#[async_trait]
pub trait ConfigCapability: SigningIdentity {
    /// Current value of `kind` for the path to `remote`. Empty when unset.
    async fn get_config(
        &self,
        remote: EndpointId,
        kind: ConfigKind,
    ) -> Result<Vec<Address>, TransferError>;

    /// Write `kind` for the path to `remote` and wait for ledger acceptance.
    ///
    /// Fails with `AuthorizationError` or `NetworkError`.
    async fn set_config(
        &self,
        remote: EndpointId,
        kind: ConfigKind,
        value: &[Address],
    ) -> Result<TransactionId, TransferError>;
}

/// Fee quoting.
#[async_trait]
pub trait QuoteCapability: Send + Sync {
    /// Quote the delivery fee for `request`.
    async fn quote_send(
        &self,
        request: &TransferRequest,
        use_protocol_token: bool,
    ) -> Result<FeeQuote, TransferError>;
}

/// State-reverting execution of `send`.
#[async_trait]
pub trait SimulateCapability: Send + Sync {
    /// Dry-run the transfer. Fails with `SimulationError{reason}`.
    async fn simulate_send(
        &self,
        request: &TransferRequest,
        fee: &FeeQuote,
        refund_address: Address,
    ) -> Result<SimulationReport, TransferError>;
}

/// Real submission of a transfer.
#[async_trait]
pub trait SubmitCapability: SigningIdentity {
    /// Whether the adapter wraps the chain's native asset, in which case the
    /// transferred amount travels as transaction value.
    fn is_native_adapter(&self) -> bool;

    /// Submit once and wait for source-chain acceptance.
    ///
    /// Fails with `SubmitError{reason}`.
    async fn send(
        &self,
        request: &TransferRequest,
        fee: &FeeQuote,
        refund_address: Address,
        value_to_send: U256,
    ) -> Result<TransactionReceipt, TransferError>;
}

/// Read access to a destination-side quantity (usually a balance).
#[async_trait]
pub trait ObserveCapability: Send + Sync {
    /// Read the observed quantity for `account`. Fails with `NetworkError`.
    async fn read(&self, account: &Address) -> Result<U256, TransferError>;
}

/// Full capability set of a messaging adapter contract.
pub trait MessagingAdapter:
    PeerCapability + ConfigCapability + QuoteCapability + SimulateCapability + SubmitCapability
{
}

impl<T> MessagingAdapter for T where
    T: PeerCapability
        + ConfigCapability
        + QuoteCapability
        + SimulateCapability
        + SubmitCapability
{
}
