//! Simulated Network
//!
//! In-memory multi-chain ledger implementing every outbound capability.
//! Messages sent through an adapter stay in flight until
//! [`Simnet::deliver_all`] (or the relayer task) delivers them to the peer
//! adapter recorded on the source.

use crate::domain::{
    Address, ConfigKind, EndpointId, FeeQuote, SimulationReport, TransactionId, TransactionReceipt,
    TransferError, TransferRequest,
};
use crate::ports::{
    ConfigCapability, ObserveCapability, PeerCapability, QuoteCapability, SigningIdentity, SimulateCapability,
    SubmitCapability,
};
use async_trait::async_trait;
use parking_lot::RwLock;
use primitive_types::U256;
use sha2::{Digest, Sha256};
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Per-adapter contract state.
#[derive(Clone, Debug)]
struct AdapterState {
    owner: Address,
    native: bool,
    fee: U256,
    peers: HashMap<EndpointId, Address>,
    configs: HashMap<(EndpointId, ConfigKind), Vec<Address>>,
}

/// Per-chain state.
#[derive(Debug, Default)]
struct ChainState {
    native: HashMap<Address, U256>,
    /// (token contract, holder) -> balance
    tokens: HashMap<(Address, Address), U256>,
    adapters: HashMap<Address, AdapterState>,
}

/// A message accepted on the source, not yet delivered.
#[derive(Clone, Debug)]
struct InFlight {
    guid: String,
    source: EndpointId,
    source_contract: Address,
    destination: EndpointId,
    destination_contract: Address,
    recipient: Address,
    amount: U256,
}

#[derive(Debug, Default)]
struct Ledger {
    chains: HashMap<EndpointId, ChainState>,
    in_flight: VecDeque<InFlight>,
    down: HashSet<EndpointId>,
    nonce: u64,
    block: u64,
}

impl Ledger {
    fn chain(&self, endpoint: EndpointId) -> Result<&ChainState, TransferError> {
        if self.down.contains(&endpoint) {
            return Err(TransferError::NetworkError(format!(
                "endpoint {endpoint} unreachable"
            )));
        }
        self.chains
            .get(&endpoint)
            .ok_or(TransferError::UnknownEndpoint(endpoint))
    }

    fn chain_mut(&mut self, endpoint: EndpointId) -> Result<&mut ChainState, TransferError> {
        if self.down.contains(&endpoint) {
            return Err(TransferError::NetworkError(format!(
                "endpoint {endpoint} unreachable"
            )));
        }
        self.chains
            .get_mut(&endpoint)
            .ok_or(TransferError::UnknownEndpoint(endpoint))
    }

    fn adapter(&self, endpoint: EndpointId, contract: Address) -> Result<&AdapterState, TransferError> {
        self.chain(endpoint)?
            .adapters
            .get(&contract)
            .ok_or_else(|| no_contract(endpoint, contract))
    }

    /// Adapter contract for an owner-only write by `signer`.
    fn owned_adapter_mut(
        &mut self,
        endpoint: EndpointId,
        contract: Address,
        signer: Address,
    ) -> Result<&mut AdapterState, TransferError> {
        let adapter = self
            .chain_mut(endpoint)?
            .adapters
            .get_mut(&contract)
            .ok_or_else(|| no_contract(endpoint, contract))?;
        if adapter.owner != signer {
            return Err(TransferError::AuthorizationError(format!(
                "OwnableUnauthorizedAccount({signer})"
            )));
        }
        Ok(adapter)
    }

    /// Next id derived from a running nonce.
    fn next_id(&mut self, domain: &str, endpoint: EndpointId, account: Address) -> String {
        self.nonce += 1;
        derive_id(domain, endpoint, account, self.nonce)
    }

    fn next_block(&mut self) -> u64 {
        self.block += 1;
        self.block
    }

    /// Checks shared by simulation and submission. Returns the fee the
    /// adapter actually charges.
    fn check_send(
        &self,
        contract: Address,
        sender: Address,
        request: &TransferRequest,
        fee: &FeeQuote,
        value: U256,
    ) -> Result<U256, String> {
        let chain = self.chain(request.source).map_err(|e| e.to_string())?;
        let adapter = chain
            .adapters
            .get(&contract)
            .ok_or_else(|| no_contract(request.source, contract).to_string())?;

        let peer = adapter
            .peers
            .get(&request.destination)
            .copied()
            .unwrap_or(Address::ZERO);
        if peer.is_zero() {
            return Err(format!("NoPeer({})", request.destination));
        }
        if fee.native_fee < adapter.fee {
            return Err(format!(
                "InsufficientFee(required {}, supplied {})",
                adapter.fee, fee.native_fee
            ));
        }

        let required_value = if adapter.native {
            fee.native_fee
                .checked_add(request.amount)
                .ok_or_else(|| "value overflow".to_string())?
        } else {
            fee.native_fee
        };
        if value != required_value {
            return Err(format!(
                "InvalidValue(expected {}, got {})",
                required_value, value
            ));
        }

        let native_balance = chain.native.get(&sender).copied().unwrap_or_default();
        if native_balance < value {
            return Err(format!(
                "InsufficientBalance(native {}, needed {})",
                native_balance, value
            ));
        }
        if !adapter.native {
            let token_balance = chain
                .tokens
                .get(&(contract, sender))
                .copied()
                .unwrap_or_default();
            if token_balance < request.amount {
                return Err(format!(
                    "InsufficientBalance(token {}, needed {})",
                    token_balance, request.amount
                ));
            }
        }
        Ok(adapter.fee)
    }

    fn deliver(&mut self, message: &InFlight) -> Result<(), TransferError> {
        let chain = self.chain_mut(message.destination)?;
        let adapter = chain
            .adapters
            .get(&message.destination_contract)
            .ok_or_else(|| no_contract(message.destination, message.destination_contract))?;

        let trusted = adapter
            .peers
            .get(&message.source)
            .copied()
            .unwrap_or(Address::ZERO);
        if trusted != message.source_contract {
            return Err(TransferError::AuthorizationError(format!(
                "OnlyPeer({}, {})",
                message.source, message.source_contract
            )));
        }

        if adapter.native {
            let balance = chain.native.entry(message.recipient).or_default();
            *balance = balance.saturating_add(message.amount);
        } else {
            let balance = chain
                .tokens
                .entry((message.destination_contract, message.recipient))
                .or_default();
            *balance = balance.saturating_add(message.amount);
        }
        Ok(())
    }
}

fn derive_id(domain: &str, endpoint: EndpointId, account: Address, nonce: u64) -> String {
    let mut hasher = Sha256::new();
    hasher.update(domain.as_bytes());
    hasher.update(endpoint.get().to_be_bytes());
    hasher.update(account.as_bytes32());
    hasher.update(nonce.to_be_bytes());
    format!("0x{}", hex::encode(hasher.finalize()))
}

fn no_contract(endpoint: EndpointId, contract: Address) -> TransferError {
    TransferError::NetworkError(format!("no contract at {contract} on endpoint {endpoint}"))
}

/// What a [`SimnetObserver`] reads.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ObservedAsset {
    /// Native balance.
    Native,
    /// Token balance held at an adapter contract.
    Token(Address),
}

/// Shared in-memory network.
#[derive(Debug, Default)]
pub struct Simnet {
    ledger: RwLock<Ledger>,
}

impl Simnet {
    /// Create an empty network.
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Add a chain. No-op if it exists.
    pub fn add_chain(&self, endpoint: EndpointId) {
        self.ledger.write().chains.entry(endpoint).or_default();
    }

    /// Deploy an adapter contract owned by `owner`, charging `fee` per send.
    pub fn deploy_adapter(
        &self,
        endpoint: EndpointId,
        contract: Address,
        owner: Address,
        native: bool,
        fee: U256,
    ) -> Result<(), TransferError> {
        let mut ledger = self.ledger.write();
        let chain = ledger
            .chains
            .get_mut(&endpoint)
            .ok_or(TransferError::UnknownEndpoint(endpoint))?;
        if chain.adapters.contains_key(&contract) {
            return Err(TransferError::InvalidConfig(format!(
                "contract {contract} already deployed on endpoint {endpoint}"
            )));
        }
        chain.adapters.insert(
            contract,
            AdapterState {
                owner,
                native,
                fee,
                peers: HashMap::new(),
                configs: HashMap::new(),
            },
        );
        info!(
            "[xb-transfer] simnet: deployed {} adapter {} on {}",
            if native { "native" } else { "token" },
            contract,
            endpoint
        );
        Ok(())
    }

    /// Credit native balance.
    pub fn fund(&self, endpoint: EndpointId, account: Address, amount: U256) -> Result<(), TransferError> {
        let mut ledger = self.ledger.write();
        let chain = ledger
            .chains
            .get_mut(&endpoint)
            .ok_or(TransferError::UnknownEndpoint(endpoint))?;
        let balance = chain.native.entry(account).or_default();
        *balance = balance.saturating_add(amount);
        Ok(())
    }

    /// Mint adapter tokens to `account`.
    pub fn mint(
        &self,
        endpoint: EndpointId,
        contract: Address,
        account: Address,
        amount: U256,
    ) -> Result<(), TransferError> {
        let mut ledger = self.ledger.write();
        let chain = ledger
            .chains
            .get_mut(&endpoint)
            .ok_or(TransferError::UnknownEndpoint(endpoint))?;
        if !chain.adapters.contains_key(&contract) {
            return Err(no_contract(endpoint, contract));
        }
        let balance = chain.tokens.entry((contract, account)).or_default();
        *balance = balance.saturating_add(amount);
        Ok(())
    }

    /// Native balance of `account`.
    pub fn native_balance(&self, endpoint: EndpointId, account: Address) -> U256 {
        self.ledger
            .read()
            .chains
            .get(&endpoint)
            .and_then(|c| c.native.get(&account).copied())
            .unwrap_or_default()
    }

    /// Token balance of `account` at `contract`.
    pub fn token_balance(&self, endpoint: EndpointId, contract: Address, account: Address) -> U256 {
        self.ledger
            .read()
            .chains
            .get(&endpoint)
            .and_then(|c| c.tokens.get(&(contract, account)).copied())
            .unwrap_or_default()
    }

    /// Make `endpoint` unreachable (every call fails with `NetworkError`).
    pub fn set_reachable(&self, endpoint: EndpointId, reachable: bool) {
        let mut ledger = self.ledger.write();
        if reachable {
            ledger.down.remove(&endpoint);
        } else {
            ledger.down.insert(endpoint);
        }
    }

    /// Messages accepted but not yet delivered.
    pub fn pending_messages(&self) -> usize {
        self.ledger.read().in_flight.len()
    }

    /// Deliver every in-flight message whose destination is reachable.
    ///
    /// Messages rejected by the destination (unknown contract, untrusted
    /// source) are dropped with a warning. Returns the number delivered.
    pub fn deliver_all(&self) -> usize {
        let mut ledger = self.ledger.write();
        let pending: Vec<InFlight> = ledger.in_flight.drain(..).collect();
        let mut delivered = 0;

        for message in pending {
            if ledger.down.contains(&message.destination) {
                ledger.in_flight.push_back(message);
                continue;
            }
            match ledger.deliver(&message) {
                Ok(()) => {
                    delivered += 1;
                    debug!(
                        "[xb-transfer] simnet: delivered {} ({} -> {}, {})",
                        message.guid, message.source, message.destination, message.amount
                    );
                }
                Err(err) => warn!(
                    guid = %message.guid,
                    error = %err,
                    "[xb-transfer] simnet: message rejected by destination"
                ),
            }
        }
        delivered
    }

    /// Spawn a task delivering in-flight messages every `interval`.
    pub fn spawn_relayer(self: &Arc<Self>, interval: Duration) -> JoinHandle<()> {
        let simnet = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                ticker.tick().await;
                simnet.deliver_all();
            }
        })
    }

    /// Adapter handle for `contract` on `endpoint`, signing as `signer`.
    pub fn adapter(self: &Arc<Self>, endpoint: EndpointId, contract: Address, signer: Address) -> SimnetAdapter {
        SimnetAdapter {
            simnet: Arc::clone(self),
            endpoint,
            contract,
            signer,
        }
    }

    /// Observer for balances on `endpoint`.
    pub fn observer(self: &Arc<Self>, endpoint: EndpointId, asset: ObservedAsset) -> SimnetObserver {
        SimnetObserver {
            simnet: Arc::clone(self),
            endpoint,
            asset,
        }
    }
}

/// Adapter contract handle on the simnet.
#[derive(Clone, Debug)]
pub struct SimnetAdapter {
    simnet: Arc<Simnet>,
    endpoint: EndpointId,
    contract: Address,
    signer: Address,
}

impl SigningIdentity for SimnetAdapter {
    fn signer(&self) -> Address {
        self.signer
    }
}

#[async_trait]
impl PeerCapability for SimnetAdapter {
    fn local_endpoint(&self) -> EndpointId {
        self.endpoint
    }

    fn contract_address(&self) -> Address {
        self.contract
    }

    async fn get_peer(&self, remote: EndpointId) -> Result<Address, TransferError> {
        let ledger = self.simnet.ledger.read();
        let adapter = ledger.adapter(self.endpoint, self.contract)?;
        Ok(adapter.peers.get(&remote).copied().unwrap_or(Address::ZERO))
    }

    async fn set_peer(
        &self,
        remote: EndpointId,
        peer: Address,
    ) -> Result<TransactionId, TransferError> {
        let mut ledger = self.simnet.ledger.write();
        ledger
            .owned_adapter_mut(self.endpoint, self.contract, self.signer)?
            .peers
            .insert(remote, peer);
        ledger.next_block();
        Ok(TransactionId::new(ledger.next_id("setPeer", self.endpoint, self.signer)))
    }
}

#[async_trait]
impl ConfigCapability for SimnetAdapter {
    async fn get_config(
        &self,
        remote: EndpointId,
        kind: ConfigKind,
    ) -> Result<Vec<Address>, TransferError> {
        let ledger = self.simnet.ledger.read();
        let adapter = ledger.adapter(self.endpoint, self.contract)?;
        Ok(adapter.configs.get(&(remote, kind)).cloned().unwrap_or_default())
    }

    async fn set_config(
        &self,
        remote: EndpointId,
        kind: ConfigKind,
        value: &[Address],
    ) -> Result<TransactionId, TransferError> {
        let mut ledger = self.simnet.ledger.write();
        ledger
            .owned_adapter_mut(self.endpoint, self.contract, self.signer)?
            .configs
            .insert((remote, kind), value.to_vec());
        ledger.next_block();
        Ok(TransactionId::new(ledger.next_id("setConfig", self.endpoint, self.signer)))
    }
}

#[async_trait]
impl QuoteCapability for SimnetAdapter {
    async fn quote_send(
        &self,
        request: &TransferRequest,
        _use_protocol_token: bool,
    ) -> Result<FeeQuote, TransferError> {
        let ledger = self.simnet.ledger.read();
        let adapter = ledger.adapter(self.endpoint, self.contract)?;
        if !adapter.peers.contains_key(&request.destination) {
            return Err(TransferError::QuoteError(format!(
                "NoPeer({})",
                request.destination
            )));
        }
        Ok(FeeQuote::native(adapter.fee))
    }
}

#[async_trait]
impl SimulateCapability for SimnetAdapter {
    async fn simulate_send(
        &self,
        request: &TransferRequest,
        fee: &FeeQuote,
        _refund_address: Address,
    ) -> Result<SimulationReport, TransferError> {
        let ledger = self.simnet.ledger.read();
        let native = ledger
            .adapter(self.endpoint, self.contract)
            .map(|a| a.native)
            .map_err(|e| TransferError::SimulationError {
                reason: e.to_string(),
            })?;
        let value = if native {
            fee.native_fee.saturating_add(request.amount)
        } else {
            fee.native_fee
        };
        let charged = ledger
            .check_send(self.contract, self.signer, request, fee, value)
            .map_err(|reason| TransferError::SimulationError { reason })?;

        // the guid the next send would be assigned
        Ok(SimulationReport {
            message_id: derive_id("guid", request.destination, request.recipient, ledger.nonce + 1),
            native_fee: charged,
            amount_sent: request.amount,
            amount_received: request.amount,
        })
    }
}

#[async_trait]
impl SubmitCapability for SimnetAdapter {
    fn is_native_adapter(&self) -> bool {
        self.simnet
            .ledger
            .read()
            .chains
            .get(&self.endpoint)
            .and_then(|c| c.adapters.get(&self.contract))
            .map(|a| a.native)
            .unwrap_or(false)
    }

    async fn send(
        &self,
        request: &TransferRequest,
        fee: &FeeQuote,
        refund_address: Address,
        value_to_send: U256,
    ) -> Result<TransactionReceipt, TransferError> {
        let mut ledger = self.simnet.ledger.write();
        let charged = ledger
            .check_send(self.contract, self.signer, request, fee, value_to_send)
            .map_err(|reason| TransferError::SubmitError { reason })?;

        let (native, destination_contract) = {
            let adapter = ledger.adapter(self.endpoint, self.contract)?;
            let peer = adapter
                .peers
                .get(&request.destination)
                .copied()
                .unwrap_or(Address::ZERO);
            (adapter.native, peer)
        };

        let chain = ledger.chain_mut(self.endpoint)?;
        let balance = chain.native.entry(self.signer).or_default();
        *balance = balance.saturating_sub(value_to_send);
        // overpaid fee goes back to the refund address
        let refund = fee.native_fee.saturating_sub(charged);
        if !refund.is_zero() {
            let refunded = chain.native.entry(refund_address).or_default();
            *refunded = refunded.saturating_add(refund);
        }
        if !native {
            let tokens = chain.tokens.entry((self.contract, self.signer)).or_default();
            *tokens = tokens.saturating_sub(request.amount);
        }

        let block = ledger.next_block();
        let guid = ledger.next_id("guid", request.destination, request.recipient);
        let tx = ledger.next_id("send", self.endpoint, self.signer);
        ledger.in_flight.push_back(InFlight {
            guid: guid.clone(),
            source: self.endpoint,
            source_contract: self.contract,
            destination: request.destination,
            destination_contract,
            recipient: request.recipient,
            amount: request.amount,
        });

        debug!(
            "[xb-transfer] simnet: {} accepted in block {} (guid {})",
            tx, block, guid
        );
        Ok(TransactionReceipt {
            transaction_id: TransactionId::new(tx),
            block_number: Some(block),
            message_id: Some(guid),
        })
    }
}

/// Balance reader on the simnet.
#[derive(Clone, Debug)]
pub struct SimnetObserver {
    simnet: Arc<Simnet>,
    endpoint: EndpointId,
    asset: ObservedAsset,
}

#[async_trait]
impl ObserveCapability for SimnetObserver {
    async fn read(&self, account: &Address) -> Result<U256, TransferError> {
        let ledger = self.simnet.ledger.read();
        let chain = ledger.chain(self.endpoint)?;
        Ok(match self.asset {
            ObservedAsset::Native => chain.native.get(account).copied().unwrap_or_default(),
            ObservedAsset::Token(contract) => chain
                .tokens
                .get(&(contract, *account))
                .copied()
                .unwrap_or_default(),
        })
    }
}
