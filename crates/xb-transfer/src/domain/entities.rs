//! # Domain Entities
//!
//! Requests, quotes, receipts and outcomes flowing through the pipeline.

use super::errors::TransferError;
use super::value_objects::{Address, EndpointId, Stage, TransactionId};
use primitive_types::U256;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A cross-chain transfer as requested by the caller.
///
/// Amounts are in the smallest unit (18-decimal fixed point for native
/// assets). Constructed by the caller and never modified by the pipeline.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferRequest {
    /// Endpoint the transfer leaves from.
    pub source: EndpointId,
    /// Endpoint the transfer is delivered to.
    pub destination: EndpointId,
    /// Recipient on the destination chain.
    pub recipient: Address,
    /// Amount debited on the source.
    pub amount: U256,
    /// Minimum acceptable amount credited on the destination.
    pub min_amount: U256,
    /// Executor options (opaque to the orchestrator).
    pub extra_options: Vec<u8>,
    /// Compose payload (opaque).
    pub compose_message: Vec<u8>,
    /// Adapter-specific command (opaque).
    pub command: Vec<u8>,
}

impl TransferRequest {
    /// Start building a request.
    pub fn builder(
        source: EndpointId,
        destination: EndpointId,
        recipient: Address,
    ) -> TransferRequestBuilder {
        TransferRequestBuilder::new(source, destination, recipient)
    }

    /// Check the request's local invariants.
    pub fn validate(&self) -> Result<(), TransferError> {
        if self.source == self.destination {
            return Err(TransferError::InvalidRequest(format!(
                "source and destination are both endpoint {}",
                self.source
            )));
        }
        if self.amount.is_zero() {
            return Err(TransferError::InvalidRequest("amount must be non-zero".into()));
        }
        if self.min_amount > self.amount {
            return Err(TransferError::InvalidRequest(format!(
                "min_amount {} exceeds amount {}",
                self.min_amount, self.amount
            )));
        }
        if self.recipient.is_zero() {
            return Err(TransferError::InvalidRequest("recipient is the zero address".into()));
        }
        Ok(())
    }
}

/// Builder for [`TransferRequest`].
#[derive(Clone, Debug)]
pub struct TransferRequestBuilder {
    source: EndpointId,
    destination: EndpointId,
    recipient: Address,
    amount: U256,
    min_amount: Option<U256>,
    extra_options: Vec<u8>,
    compose_message: Vec<u8>,
    command: Vec<u8>,
}

impl TransferRequestBuilder {
    /// Create a new builder with required fields.
    pub fn new(source: EndpointId, destination: EndpointId, recipient: Address) -> Self {
        Self {
            source,
            destination,
            recipient,
            amount: U256::zero(),
            min_amount: None,
            extra_options: Vec::new(),
            compose_message: Vec::new(),
            command: Vec::new(),
        }
    }

    /// Set amount.
    pub fn amount(mut self, amount: impl Into<U256>) -> Self {
        self.amount = amount.into();
        self
    }

    /// Set minimum amount. Defaults to `amount` (no slippage).
    pub fn min_amount(mut self, min_amount: impl Into<U256>) -> Self {
        self.min_amount = Some(min_amount.into());
        self
    }

    /// Set executor options.
    pub fn extra_options(mut self, options: Vec<u8>) -> Self {
        self.extra_options = options;
        self
    }

    /// Set compose payload.
    pub fn compose_message(mut self, message: Vec<u8>) -> Self {
        self.compose_message = message;
        self
    }

    /// Set adapter command.
    pub fn command(mut self, command: Vec<u8>) -> Self {
        self.command = command;
        self
    }

    /// Build and validate.
    pub fn build(self) -> Result<TransferRequest, TransferError> {
        let request = TransferRequest {
            source: self.source,
            destination: self.destination,
            recipient: self.recipient,
            amount: self.amount,
            min_amount: self.min_amount.unwrap_or(self.amount),
            extra_options: self.extra_options,
            compose_message: self.compose_message,
            command: self.command,
        };
        request.validate()?;
        Ok(request)
    }
}

/// Fee estimate for one transfer. Never cached across requests.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeQuote {
    /// Fee payable in the source chain's native asset.
    pub native_fee: U256,
    /// Fee payable in the protocol token.
    pub protocol_token_fee: U256,
}

impl FeeQuote {
    /// A native-only fee.
    pub fn native(native_fee: impl Into<U256>) -> Self {
        Self {
            native_fee: native_fee.into(),
            protocol_token_fee: U256::zero(),
        }
    }
}

/// Where a fee came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeeSource {
    /// Returned by the adapter's quote capability.
    Quoted,
    /// Substituted from configuration after a failed quote.
    Fallback,
}

/// Counterparty binding of a local adapter for one remote endpoint.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeerBinding {
    /// Endpoint of the adapter holding the binding.
    pub local: EndpointId,
    /// Remote endpoint the binding is for.
    pub remote: EndpointId,
    /// Address trusted as counterparty on the remote endpoint.
    pub remote_address: Address,
}

/// Result of one reconcile call.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconcileResult {
    /// Whether a correcting write was issued.
    pub changed: bool,
    /// Transaction of the correcting write.
    pub transaction_id: Option<TransactionId>,
}

impl ReconcileResult {
    /// Binding already matched.
    pub fn unchanged() -> Self {
        Self {
            changed: false,
            transaction_id: None,
        }
    }

    /// Binding was rewritten.
    pub fn changed(transaction_id: TransactionId) -> Self {
        Self {
            changed: true,
            transaction_id: Some(transaction_id),
        }
    }
}

/// What a state-reverting dry run of `send` would have produced.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimulationReport {
    /// Would-be message identifier (GUID).
    pub message_id: String,
    /// Fee the execution would charge.
    pub native_fee: U256,
    /// Amount debited on the source.
    pub amount_sent: U256,
    /// Amount the destination would credit.
    pub amount_received: U256,
}

/// Source-chain acceptance of a submitted transfer.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionReceipt {
    /// Transaction identifier.
    pub transaction_id: TransactionId,
    /// Block that included the transaction, when known.
    pub block_number: Option<u64>,
    /// Messaging-layer GUID, when the adapter reports one.
    pub message_id: Option<String>,
}

/// How a delivery watch ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeliveryStatus {
    /// Observed value rose above the baseline.
    Confirmed,
    /// Window exhausted or cancelled; the transfer may still be in flight.
    TimedOut,
}

/// Result of the delivery watcher.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryResult {
    /// Final status.
    pub status: DeliveryStatus,
    /// Increase over the baseline, when confirmed.
    pub observed_delta: Option<U256>,
    /// Observations performed.
    pub attempts_used: u32,
    /// Whether the watch ended because of a cancellation signal.
    pub cancelled: bool,
}

/// Terminal status of an orchestration run.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransferStatus {
    /// Dry run only; nothing was submitted.
    Simulated,
    /// Submitted, delivery not watched.
    Submitted,
    /// Submitted and delivery observed.
    Confirmed,
    /// Submitted, delivery not yet observed. Not a failure.
    TimedOut,
    /// A fatal error stopped the run.
    Failed(FailureReason),
}

impl TransferStatus {
    /// Short lowercase label, used for logs and metrics.
    pub fn label(&self) -> &'static str {
        match self {
            TransferStatus::Simulated => "simulated",
            TransferStatus::Submitted => "submitted",
            TransferStatus::Confirmed => "confirmed",
            TransferStatus::TimedOut => "timed_out",
            TransferStatus::Failed(_) => "failed",
        }
    }
}

/// Fatal error together with the stage that raised it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailureReason {
    /// Failing stage.
    pub stage: Stage,
    /// Error message, as raised by the stage.
    pub message: String,
    /// Whether retrying the whole orchestration may succeed.
    pub transient: bool,
    #[serde(skip)]
    error: Option<TransferError>,
}

impl FailureReason {
    /// Attach a stage name to an error.
    pub fn new(stage: Stage, error: TransferError) -> Self {
        Self {
            stage,
            message: error.to_string(),
            transient: error.is_transient(),
            error: Some(error),
        }
    }

    /// The original error, unless the reason was deserialized.
    pub fn error(&self) -> Option<&TransferError> {
        self.error.as_ref()
    }
}

/// One audited stage transition.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageRecord {
    /// Stage that ran.
    pub stage: Stage,
    /// Short outcome description (`"ok"`, `"skipped"`, `"fallback"`, ...).
    pub outcome: String,
}

/// Terminal record of one orchestration run.
///
/// Only the orchestrator builds outcomes; callers get read-only accessors.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferOutcome {
    pub(crate) run_id: Uuid,
    pub(crate) status: TransferStatus,
    pub(crate) transaction_id: Option<TransactionId>,
    pub(crate) observed_delta: Option<U256>,
    pub(crate) fee: Option<FeeQuote>,
    pub(crate) fee_source: Option<FeeSource>,
    pub(crate) simulation: Option<SimulationReport>,
    pub(crate) poll_attempts: u32,
    pub(crate) stages: Vec<StageRecord>,
}

impl TransferOutcome {
    /// Correlation id of the run.
    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    /// Terminal status.
    pub fn status(&self) -> &TransferStatus {
        &self.status
    }

    /// Transaction id of the submitted transfer.
    pub fn transaction_id(&self) -> Option<&TransactionId> {
        self.transaction_id.as_ref()
    }

    /// Delivered increase observed on the destination.
    pub fn observed_delta(&self) -> Option<U256> {
        self.observed_delta
    }

    /// Fee used for simulation and submission.
    pub fn fee(&self) -> Option<&FeeQuote> {
        self.fee.as_ref()
    }

    /// Whether the fee was quoted or fell back.
    pub fn fee_source(&self) -> Option<FeeSource> {
        self.fee_source
    }

    /// Dry-run report, if a simulation ran.
    pub fn simulation(&self) -> Option<&SimulationReport> {
        self.simulation.as_ref()
    }

    /// Delivery observations performed.
    pub fn poll_attempts(&self) -> u32 {
        self.poll_attempts
    }

    /// Audit trail of stage transitions, in order.
    pub fn stages(&self) -> &[StageRecord] {
        &self.stages
    }

    /// Failure details, if the run failed.
    pub fn failure(&self) -> Option<&FailureReason> {
        match &self.status {
            TransferStatus::Failed(reason) => Some(reason),
            _ => None,
        }
    }

    /// Whether the run failed.
    pub fn is_failure(&self) -> bool {
        self.failure().is_some()
    }

    /// One-line summary for operators.
    ///
    /// Keeps "failed" and "submitted, confirmation pending" clearly apart.
    pub fn summary(&self) -> String {
        let tx = self
            .transaction_id
            .as_ref()
            .map(|t| t.to_string())
            .unwrap_or_else(|| "-".to_string());
        match &self.status {
            TransferStatus::Simulated => "dry run succeeded; nothing was submitted".to_string(),
            TransferStatus::Submitted => {
                format!("transfer submitted (tx {tx}); delivery is not being watched")
            }
            TransferStatus::Confirmed => format!(
                "transfer delivered (tx {tx}), destination increased by {}",
                self.observed_delta.unwrap_or_default()
            ),
            TransferStatus::TimedOut => format!(
                "transfer submitted (tx {tx}); confirmation pending, check again later"
            ),
            TransferStatus::Failed(reason) => {
                format!("transfer failed at stage {}: {}", reason.stage, reason.message)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn recipient() -> Address {
        Address::from_evm([0xAA; 20])
    }

    #[test]
    fn test_builder_defaults_min_amount_to_amount() {
        let request =
            TransferRequest::builder(EndpointId::new(1), EndpointId::new(2), recipient())
                .amount(100u64)
                .build()
                .unwrap();
        assert_eq!(request.min_amount, U256::from(100u64));
    }

    #[test]
    fn test_min_amount_above_amount_rejected() {
        let result =
            TransferRequest::builder(EndpointId::new(1), EndpointId::new(2), recipient())
                .amount(100u64)
                .min_amount(101u64)
                .build();
        assert!(matches!(result, Err(TransferError::InvalidRequest(_))));
    }

    #[test]
    fn test_same_endpoint_rejected() {
        let result =
            TransferRequest::builder(EndpointId::new(7), EndpointId::new(7), recipient())
                .amount(1u64)
                .build();
        assert!(result.is_err());
    }

    #[test]
    fn test_zero_amount_rejected() {
        let result =
            TransferRequest::builder(EndpointId::new(1), EndpointId::new(2), recipient()).build();
        assert!(result.is_err());
    }

    #[test]
    fn test_failure_reason_keeps_stage_and_error() {
        let reason = FailureReason::new(
            Stage::Submit,
            TransferError::SubmitError {
                reason: "nonce too low".into(),
            },
        );
        assert_eq!(reason.stage, Stage::Submit);
        assert!(reason.message.contains("nonce too low"));
        assert!(!reason.transient);
        assert!(matches!(reason.error(), Some(TransferError::SubmitError { .. })));
    }

    #[test]
    fn test_status_labels() {
        assert_eq!(TransferStatus::TimedOut.label(), "timed_out");
        assert_eq!(TransferStatus::Confirmed.label(), "confirmed");
    }
}
