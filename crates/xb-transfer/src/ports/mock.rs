//! # Mock Capabilities
//!
//! Scriptable adapter and observer with call counters, for tests of the
//! pipeline and of code built on top of it.

use super::outbound::{
    ConfigCapability, ObserveCapability, PeerCapability, QuoteCapability, SigningIdentity, SimulateCapability,
    SubmitCapability,
};
use crate::domain::{
    Address, ConfigKind, EndpointId, FeeQuote, SimulationReport, TransactionId, TransactionReceipt,
    TransferError, TransferRequest,
};
use async_trait::async_trait;
use parking_lot::Mutex;
use primitive_types::U256;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// Mock messaging adapter.
///
/// Every capability succeeds by default; failures are switched on with the
/// `with_*_failure` builders.
pub struct MockMessagingAdapter {
    endpoint: EndpointId,
    contract: Address,
    signer: Address,
    native: bool,
    peers: Mutex<HashMap<EndpointId, Address>>,
    configs: Mutex<HashMap<(EndpointId, ConfigKind), Vec<Address>>>,
    quote: Result<FeeQuote, TransferError>,
    quote_delay: Option<Duration>,
    get_peer_error: Option<TransferError>,
    set_peer_error: Option<TransferError>,
    set_config_error: Option<TransferError>,
    simulation_error: Option<String>,
    received_shortfall: U256,
    submit_error: Option<String>,
    transaction_id: TransactionId,
    write_delay: Option<Duration>,

    get_peer_calls: AtomicUsize,
    set_peer_calls: AtomicUsize,
    set_config_calls: AtomicUsize,
    quote_calls: AtomicUsize,
    simulate_calls: AtomicUsize,
    send_calls: AtomicUsize,
    active_writes: AtomicUsize,
    max_concurrent_writes: AtomicUsize,
    last_send_value: Mutex<Option<U256>>,
}

impl MockMessagingAdapter {
    /// Create a mock adapter on `endpoint` deployed at `contract`.
    pub fn new(endpoint: EndpointId, contract: Address) -> Self {
        Self {
            endpoint,
            contract,
            signer: Address::from_evm([0x5A; 20]),
            native: false,
            peers: Mutex::new(HashMap::new()),
            configs: Mutex::new(HashMap::new()),
            quote: Ok(FeeQuote::native(1u64)),
            quote_delay: None,
            get_peer_error: None,
            set_peer_error: None,
            set_config_error: None,
            simulation_error: None,
            received_shortfall: U256::zero(),
            submit_error: None,
            transaction_id: TransactionId::from("0xmock"),
            write_delay: None,
            get_peer_calls: AtomicUsize::new(0),
            set_peer_calls: AtomicUsize::new(0),
            set_config_calls: AtomicUsize::new(0),
            quote_calls: AtomicUsize::new(0),
            simulate_calls: AtomicUsize::new(0),
            send_calls: AtomicUsize::new(0),
            active_writes: AtomicUsize::new(0),
            max_concurrent_writes: AtomicUsize::new(0),
            last_send_value: Mutex::new(None),
        }
    }

    /// Mark the adapter as wrapping the native asset.
    pub fn native(mut self) -> Self {
        self.native = true;
        self
    }

    /// Set signer identity.
    pub fn with_signer(mut self, signer: Address) -> Self {
        self.signer = signer;
        self
    }

    /// Pre-set a peer binding.
    pub fn with_peer(self, remote: EndpointId, peer: Address) -> Self {
        self.peers.lock().insert(remote, peer);
        self
    }

    /// Quote returned by `quote_send`.
    pub fn with_quote(mut self, quote: FeeQuote) -> Self {
        self.quote = Ok(quote);
        self
    }

    /// Make `quote_send` fail.
    pub fn with_quote_failure(mut self, error: TransferError) -> Self {
        self.quote = Err(error);
        self
    }

    /// Delay `quote_send` (to exercise timeouts).
    pub fn with_quote_delay(mut self, delay: Duration) -> Self {
        self.quote_delay = Some(delay);
        self
    }

    /// Make `get_peer` fail.
    pub fn with_get_peer_failure(mut self, error: TransferError) -> Self {
        self.get_peer_error = Some(error);
        self
    }

    /// Make `set_peer` fail.
    pub fn with_set_peer_failure(mut self, error: TransferError) -> Self {
        self.set_peer_error = Some(error);
        self
    }

    /// Make `set_config` fail.
    pub fn with_set_config_failure(mut self, error: TransferError) -> Self {
        self.set_config_error = Some(error);
        self
    }

    /// Make `simulate_send` revert with `reason`.
    pub fn with_simulation_failure(mut self, reason: impl Into<String>) -> Self {
        self.simulation_error = Some(reason.into());
        self
    }

    /// Report `shortfall` less than the requested amount as received.
    pub fn with_received_shortfall(mut self, shortfall: impl Into<U256>) -> Self {
        self.received_shortfall = shortfall.into();
        self
    }

    /// Make `send` fail with `reason`.
    pub fn with_submit_failure(mut self, reason: impl Into<String>) -> Self {
        self.submit_error = Some(reason.into());
        self
    }

    /// Transaction id returned by `send`.
    pub fn with_transaction_id(mut self, id: impl Into<TransactionId>) -> Self {
        self.transaction_id = id.into();
        self
    }

    /// Hold every write for `delay` (to exercise write serialization).
    pub fn with_write_delay(mut self, delay: Duration) -> Self {
        self.write_delay = Some(delay);
        self
    }

    /// Number of `get_peer` calls.
    pub fn get_peer_calls(&self) -> usize {
        self.get_peer_calls.load(Ordering::SeqCst)
    }

    /// Number of `set_peer` calls.
    pub fn set_peer_calls(&self) -> usize {
        self.set_peer_calls.load(Ordering::SeqCst)
    }

    /// Number of `set_config` calls.
    pub fn set_config_calls(&self) -> usize {
        self.set_config_calls.load(Ordering::SeqCst)
    }

    /// Number of `quote_send` calls.
    pub fn quote_calls(&self) -> usize {
        self.quote_calls.load(Ordering::SeqCst)
    }

    /// Number of `simulate_send` calls.
    pub fn simulate_calls(&self) -> usize {
        self.simulate_calls.load(Ordering::SeqCst)
    }

    /// Number of `send` calls.
    pub fn send_calls(&self) -> usize {
        self.send_calls.load(Ordering::SeqCst)
    }

    /// Highest number of writes that were in flight at the same time.
    pub fn max_concurrent_writes(&self) -> usize {
        self.max_concurrent_writes.load(Ordering::SeqCst)
    }

    /// Value passed to the last `send`.
    pub fn last_send_value(&self) -> Option<U256> {
        *self.last_send_value.lock()
    }

    /// Current binding, bypassing counters.
    pub fn peer(&self, remote: EndpointId) -> Option<Address> {
        self.peers.lock().get(&remote).copied()
    }

    /// Current `kind` setting for `remote`, bypassing counters.
    pub fn config(&self, remote: EndpointId, kind: ConfigKind) -> Vec<Address> {
        self.configs
            .lock()
            .get(&(remote, kind))
            .cloned()
            .unwrap_or_default()
    }

    async fn enter_write(&self) {
        let active = self.active_writes.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_concurrent_writes.fetch_max(active, Ordering::SeqCst);
        if let Some(delay) = self.write_delay {
            tokio::time::sleep(delay).await;
        }
    }

    fn exit_write(&self) {
        self.active_writes.fetch_sub(1, Ordering::SeqCst);
    }
}

impl SigningIdentity for MockMessagingAdapter {
    fn signer(&self) -> Address {
        self.signer
    }
}

#[async_trait]
impl PeerCapability for MockMessagingAdapter {
    fn local_endpoint(&self) -> EndpointId {
        self.endpoint
    }

    fn contract_address(&self) -> Address {
        self.contract
    }

    async fn get_peer(&self, remote: EndpointId) -> Result<Address, TransferError> {
        self.get_peer_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(err) = &self.get_peer_error {
            return Err(err.clone());
        }
        Ok(self.peers.lock().get(&remote).copied().unwrap_or(Address::ZERO))
    }

    async fn set_peer(
        &self,
        remote: EndpointId,
        peer: Address,
    ) -> Result<TransactionId, TransferError> {
        self.set_peer_calls.fetch_add(1, Ordering::SeqCst);
        self.enter_write().await;
        let result = match &self.set_peer_error {
            Some(err) => Err(err.clone()),
            None => {
                self.peers.lock().insert(remote, peer);
                Ok(TransactionId::new(format!("0xsetpeer{}", remote)))
            }
        };
        self.exit_write();
        result
    }
}

#[async_trait]
impl ConfigCapability for MockMessagingAdapter {
    async fn get_config(
        &self,
        remote: EndpointId,
        kind: ConfigKind,
    ) -> Result<Vec<Address>, TransferError> {
        Ok(self.config(remote, kind))
    }

    async fn set_config(
        &self,
        remote: EndpointId,
        kind: ConfigKind,
        value: &[Address],
    ) -> Result<TransactionId, TransferError> {
        self.set_config_calls.fetch_add(1, Ordering::SeqCst);
        self.enter_write().await;
        let result = match &self.set_config_error {
            Some(err) => Err(err.clone()),
            None => {
                self.configs.lock().insert((remote, kind), value.to_vec());
                Ok(TransactionId::new(format!("0xsetconfig{}-{}", remote, kind.code())))
            }
        };
        self.exit_write();
        result
    }
}

#[async_trait]
impl QuoteCapability for MockMessagingAdapter {
    async fn quote_send(
        &self,
        _request: &TransferRequest,
        _use_protocol_token: bool,
    ) -> Result<FeeQuote, TransferError> {
        self.quote_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.quote_delay {
            tokio::time::sleep(delay).await;
        }
        self.quote.clone()
    }
}

#[async_trait]
impl SimulateCapability for MockMessagingAdapter {
    async fn simulate_send(
        &self,
        request: &TransferRequest,
        fee: &FeeQuote,
        _refund_address: Address,
    ) -> Result<SimulationReport, TransferError> {
        self.simulate_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(reason) = &self.simulation_error {
            return Err(TransferError::SimulationError {
                reason: reason.clone(),
            });
        }
        Ok(SimulationReport {
            message_id: "0xguid".to_string(),
            native_fee: fee.native_fee,
            amount_sent: request.amount,
            amount_received: request.amount.saturating_sub(self.received_shortfall),
        })
    }
}

#[async_trait]
impl SubmitCapability for MockMessagingAdapter {
    fn is_native_adapter(&self) -> bool {
        self.native
    }

    async fn send(
        &self,
        _request: &TransferRequest,
        _fee: &FeeQuote,
        _refund_address: Address,
        value_to_send: U256,
    ) -> Result<TransactionReceipt, TransferError> {
        self.send_calls.fetch_add(1, Ordering::SeqCst);
        *self.last_send_value.lock() = Some(value_to_send);
        self.enter_write().await;
        let result = match &self.submit_error {
            Some(reason) => Err(TransferError::SubmitError {
                reason: reason.clone(),
            }),
            None => Ok(TransactionReceipt {
                transaction_id: self.transaction_id.clone(),
                block_number: Some(1),
                message_id: Some("0xguid".to_string()),
            }),
        };
        self.exit_write();
        result
    }
}

/// Observer returning a scripted sequence of readings.
///
/// Once the script is exhausted the last successful reading repeats.
pub struct ScriptedObserver {
    readings: Mutex<VecDeque<Result<U256, TransferError>>>,
    last: Mutex<U256>,
    reads: AtomicUsize,
    read_delay: Option<Duration>,
}

impl ScriptedObserver {
    /// Observer returning `values` in order.
    pub fn new<I, V>(values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<U256>,
    {
        Self::from_results(values.into_iter().map(|v| Ok(v.into())))
    }

    /// Observer returning a mix of readings and failures.
    pub fn from_results<I>(results: I) -> Self
    where
        I: IntoIterator<Item = Result<U256, TransferError>>,
    {
        Self {
            readings: Mutex::new(results.into_iter().collect()),
            last: Mutex::new(U256::zero()),
            reads: AtomicUsize::new(0),
            read_delay: None,
        }
    }

    /// Delay every read by `delay`.
    pub fn with_read_delay(mut self, delay: Duration) -> Self {
        self.read_delay = Some(delay);
        self
    }

    /// Observer that always reads `value`.
    pub fn constant(value: impl Into<U256>) -> Self {
        let value = value.into();
        let observer = Self::new(std::iter::empty::<U256>());
        *observer.last.lock() = value;
        observer
    }

    /// Number of reads performed.
    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ObserveCapability for ScriptedObserver {
    async fn read(&self, _account: &Address) -> Result<U256, TransferError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.read_delay {
            tokio::time::sleep(delay).await;
        }
        let next = self.readings.lock().pop_front();
        match next {
            Some(Ok(value)) => {
                *self.last.lock() = value;
                Ok(value)
            }
            Some(Err(err)) => Err(err),
            None => Ok(*self.last.lock()),
        }
    }
}
