//! # Transfer Orchestrator
//!
//! Sequences one request through validate, reconcile, quote, simulate,
//! submit and watch, producing exactly one [`TransferOutcome`].
//!
//! ```text
//! Initialized ──► PeersReconciled ──► FeeQuoted ──┬──► Simulated ──┬──► Submitted ──► Confirmed
//!                                                 │                │                └─► TimedOut
//!                                                 └────────────────┘
//!      any non-terminal state ──► Failed
//! ```

use super::registry::TransferRoute;
use crate::algorithms::{
    reconcile, simulate, submit, value_to_send, CancelSignal, DeliveryWatcher, FeeQuotingEngine,
    SignerLocks,
};
use crate::domain::{
    Address, DeliveryStatus, FailureReason, FeeQuote, FeeSource, OrchestrationState,
    OrchestratorConfig, ReconcileResult, SimulationReport, Stage, StageRecord, TransactionId,
    TransferError, TransferOutcome, TransferRequest, TransferStatus,
};
use primitive_types::U256;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};
use uuid::Uuid;

/// Attach the failing stage to an error.
trait AtStage<T> {
    fn at(self, stage: Stage) -> Result<T, (Stage, TransferError)>;
}

impl<T> AtStage<T> for Result<T, TransferError> {
    fn at(self, stage: Stage) -> Result<T, (Stage, TransferError)> {
        self.map_err(|err| (stage, err))
    }
}

/// Mutable record of one run; frozen into a [`TransferOutcome`] at the end.
struct Run {
    id: Uuid,
    state: OrchestrationState,
    transaction_id: Option<TransactionId>,
    observed_delta: Option<U256>,
    fee: Option<FeeQuote>,
    fee_source: Option<FeeSource>,
    simulation: Option<SimulationReport>,
    poll_attempts: u32,
    stages: Vec<StageRecord>,
}

impl Run {
    fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            state: OrchestrationState::Initialized,
            transaction_id: None,
            observed_delta: None,
            fee: None,
            fee_source: None,
            simulation: None,
            poll_attempts: 0,
            stages: Vec::new(),
        }
    }

    fn record(&mut self, stage: Stage, outcome: impl Into<String>) {
        let outcome = outcome.into();
        info!(
            run_id = %self.id,
            stage = %stage,
            outcome = %outcome,
            "[xb-transfer] Stage complete"
        );
        self.stages.push(StageRecord { stage, outcome });
    }

    fn advance(&mut self, next: OrchestrationState) {
        debug_assert!(
            self.state.can_transition_to(next),
            "invalid transition {:?} -> {:?}",
            self.state,
            next
        );
        self.state = next;
    }

    fn fail(mut self, stage: Stage, err: TransferError) -> TransferOutcome {
        error!(
            run_id = %self.id,
            stage = %stage,
            error = %err,
            "[xb-transfer] Transfer failed"
        );
        self.stages.push(StageRecord {
            stage,
            outcome: "failed".to_string(),
        });
        self.advance(OrchestrationState::Failed);
        self.finish(TransferStatus::Failed(FailureReason::new(stage, err)))
    }

    fn finish(self, status: TransferStatus) -> TransferOutcome {
        info!(
            run_id = %self.id,
            status = status.label(),
            "[xb-transfer] Transfer finished"
        );
        TransferOutcome {
            run_id: self.id,
            status,
            transaction_id: self.transaction_id,
            observed_delta: self.observed_delta,
            fee: self.fee,
            fee_source: self.fee_source,
            simulation: self.simulation,
            poll_attempts: self.poll_attempts,
            stages: self.stages,
        }
    }
}

/// Outcome for a request rejected before any stage could run.
pub(crate) fn rejected(err: TransferError) -> TransferOutcome {
    Run::new().fail(Stage::Validate, err)
}

fn describe(result: &ReconcileResult) -> &'static str {
    if result.changed {
        "changed"
    } else {
        "unchanged"
    }
}

/// Parameterized transfer pipeline.
///
/// `Send + Sync`; one instance serves any number of concurrent requests.
/// Writes through the same signer are serialized by the shared
/// [`SignerLocks`].
pub struct TransferOrchestrator {
    config: OrchestratorConfig,
    fees: FeeQuotingEngine,
    watcher: DeliveryWatcher,
    locks: Arc<SignerLocks>,
}

impl TransferOrchestrator {
    /// Create an orchestrator with its own signer locks.
    pub fn new(config: OrchestratorConfig) -> Result<Self, TransferError> {
        Self::with_locks(config, Arc::new(SignerLocks::new()))
    }

    /// Create an orchestrator sharing `locks` with other writers (e.g. mesh
    /// wiring).
    pub fn with_locks(
        config: OrchestratorConfig,
        locks: Arc<SignerLocks>,
    ) -> Result<Self, TransferError> {
        config.validate()?;
        Ok(Self {
            fees: FeeQuotingEngine::from_config(&config),
            watcher: DeliveryWatcher::new(
                config.max_poll_attempts,
                Duration::from_millis(config.poll_interval_ms),
            )
            .with_observe_timeout(Duration::from_millis(config.observe_timeout_ms)),
            config,
            locks,
        })
    }

    /// Active configuration.
    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    /// Signer locks used for writes.
    pub fn locks(&self) -> &Arc<SignerLocks> {
        &self.locks
    }

    /// Run `request` over `route`.
    ///
    /// Never returns an error: fatal failures end as
    /// [`TransferStatus::Failed`] with the stage attached. `cancel` is only
    /// consulted while watching for delivery.
    pub async fn execute(
        &self,
        route: &TransferRoute,
        request: &TransferRequest,
        refund_address: Address,
        cancel: &CancelSignal,
    ) -> TransferOutcome {
        let mut run = Run::new();
        info!(
            run_id = %run.id,
            "[xb-transfer] Transfer {} -> {}: {} to {}",
            request.source,
            request.destination,
            request.amount,
            request.recipient
        );

        match self
            .drive(&mut run, route, request, refund_address, cancel)
            .await
        {
            Ok(status) => run.finish(status),
            Err((stage, err)) => run.fail(stage, err),
        }
    }

    async fn drive(
        &self,
        run: &mut Run,
        route: &TransferRoute,
        request: &TransferRequest,
        refund_address: Address,
        cancel: &CancelSignal,
    ) -> Result<TransferStatus, (Stage, TransferError)> {
        // validate
        request.validate().at(Stage::Validate)?;
        check_route(route, request).at(Stage::Validate)?;
        if refund_address.is_zero() {
            return Err((
                Stage::Validate,
                TransferError::InvalidRequest("refund address is the zero address".into()),
            ));
        }
        run.record(Stage::Validate, "ok");

        // reconcile
        let mut outcomes = Vec::with_capacity(2);
        for (adapter, binding) in route.required_bindings(self.config.require_bidirectional_wiring) {
            let result = reconcile(
                &**adapter,
                binding.local,
                binding.remote,
                binding.remote_address,
                &self.locks,
            )
            .await
            .at(Stage::Reconcile)?;
            outcomes.push(format!(
                "{}->{} {}",
                binding.local,
                binding.remote,
                describe(&result)
            ));
        }
        run.record(Stage::Reconcile, outcomes.join(", "));
        run.advance(OrchestrationState::PeersReconciled);

        // quote
        let (fee, fee_source) = self.fees.quote(&*route.source, request).await;
        run.fee = Some(fee);
        run.fee_source = Some(fee_source);
        run.record(
            Stage::Quote,
            match fee_source {
                FeeSource::Quoted => "quoted",
                FeeSource::Fallback => "fallback",
            },
        );
        run.advance(OrchestrationState::FeeQuoted);

        // simulate
        if self.config.simulate_before_send || self.config.dry_run {
            let report = simulate(&*route.source, request, &fee, refund_address)
                .await
                .at(Stage::Simulate)?;
            run.simulation = Some(report);
            run.record(Stage::Simulate, "ok");
            run.advance(OrchestrationState::Simulated);
        } else {
            run.record(Stage::Simulate, "skipped");
        }

        if self.config.dry_run {
            return Ok(TransferStatus::Simulated);
        }

        // baseline before submit, so the delivery cannot already be included
        let observer = route
            .observer
            .as_ref()
            .filter(|_| self.config.max_poll_attempts > 0);
        let baseline = match observer {
            Some(observer) => Some(
                self.watcher
                    .read_baseline(&**observer, &request.recipient)
                    .await
                    .at(Stage::Watch)?,
            ),
            None => None,
        };

        // submit
        let value = value_to_send(request, &fee, route.source.is_native_adapter())
            .at(Stage::Submit)?;
        let receipt = submit(
            &*route.source,
            request,
            &fee,
            refund_address,
            value,
            &self.locks,
        )
        .await
        .at(Stage::Submit)?;
        run.record(Stage::Submit, format!("tx {}", receipt.transaction_id));
        run.transaction_id = Some(receipt.transaction_id);
        run.advance(OrchestrationState::Submitted);

        // watch
        let (Some(observer), Some(baseline)) = (observer, baseline) else {
            run.record(Stage::Watch, "skipped");
            return Ok(TransferStatus::Submitted);
        };
        let result = self
            .watcher
            .watch(&**observer, &request.recipient, baseline, cancel)
            .await;
        run.poll_attempts = result.attempts_used;

        match result.status {
            DeliveryStatus::Confirmed => {
                run.observed_delta = result.observed_delta;
                run.record(Stage::Watch, "confirmed");
                run.advance(OrchestrationState::Confirmed);
                Ok(TransferStatus::Confirmed)
            }
            DeliveryStatus::TimedOut => {
                run.record(
                    Stage::Watch,
                    if result.cancelled {
                        "cancelled"
                    } else {
                        "timed_out"
                    },
                );
                run.advance(OrchestrationState::TimedOut);
                Ok(TransferStatus::TimedOut)
            }
        }
    }
}

fn check_route(route: &TransferRoute, request: &TransferRequest) -> Result<(), TransferError> {
    if route.source.local_endpoint() != request.source {
        return Err(TransferError::InvalidRequest(format!(
            "source adapter lives on {}, request leaves from {}",
            route.source.local_endpoint(),
            request.source
        )));
    }
    if route.destination.local_endpoint() != request.destination {
        return Err(TransferError::InvalidRequest(format!(
            "destination adapter lives on {}, request arrives at {}",
            route.destination.local_endpoint(),
            request.destination
        )));
    }
    Ok(())
}
