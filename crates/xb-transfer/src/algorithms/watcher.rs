//! # Delivery Watcher
//!
//! Polls a destination-side quantity at a fixed cadence until it rises above
//! a baseline or the attempt budget runs out. Never writes.

use super::cancel::CancelSignal;
use crate::domain::{Address, DeliveryResult, DeliveryStatus, TransferError};
use crate::ports::ObserveCapability;
use primitive_types::U256;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};

/// Internal polling state.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PollState {
    /// Value to exceed.
    pub baseline: U256,
    /// Observations performed so far.
    pub attempts_used: u32,
    /// Observation budget.
    pub attempts_max: u32,
    /// Delay between observations.
    pub interval: Duration,
}

impl PollState {
    /// Fresh state.
    pub fn new(baseline: U256, attempts_max: u32, interval: Duration) -> Self {
        Self {
            baseline,
            attempts_used: 0,
            attempts_max,
            interval,
        }
    }

    /// Whether the budget is spent.
    pub fn exhausted(&self) -> bool {
        self.attempts_used >= self.attempts_max
    }

    fn finish(&self, status: DeliveryStatus, delta: Option<U256>, cancelled: bool) -> DeliveryResult {
        DeliveryResult {
            status,
            observed_delta: delta,
            attempts_used: self.attempts_used,
            cancelled,
        }
    }
}

/// Bound on a single read when none is configured.
pub const DEFAULT_OBSERVE_TIMEOUT: Duration = Duration::from_secs(10);

/// Poll `observe` until it returns a value strictly above `baseline`.
///
/// Failed observations consume an attempt, and so does a read that takes
/// longer than `observe_timeout`. There is no sleep after the final attempt.
/// Cancellation ends the watch immediately with `TimedOut`.
pub async fn await_delivery<F, Fut>(
    mut observe: F,
    baseline: U256,
    max_attempts: u32,
    interval: Duration,
    observe_timeout: Duration,
    cancel: &CancelSignal,
) -> DeliveryResult
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<U256, TransferError>>,
{
    let mut state = PollState::new(baseline, max_attempts, interval);

    while !state.exhausted() {
        if cancel.is_cancelled() {
            return state.finish(DeliveryStatus::TimedOut, None, true);
        }

        state.attempts_used += 1;
        let reading = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                return state.finish(DeliveryStatus::TimedOut, None, true);
            }
            reading = tokio::time::timeout(observe_timeout, observe()) => {
                reading.unwrap_or_else(|_| Err(read_timed_out(observe_timeout)))
            }
        };

        match reading {
            Ok(value) if value > state.baseline => {
                let delta = value - state.baseline;
                debug!(
                    "[xb-transfer] Delivery observed on attempt {}/{}: +{}",
                    state.attempts_used, state.attempts_max, delta
                );
                return state.finish(DeliveryStatus::Confirmed, Some(delta), false);
            }
            Ok(value) => {
                debug!(
                    "[xb-transfer] Attempt {}/{}: {} (baseline {})",
                    state.attempts_used, state.attempts_max, value, state.baseline
                );
            }
            Err(err) => {
                warn!(
                    attempt = state.attempts_used,
                    error = %err,
                    "[xb-transfer] Delivery observation failed"
                );
            }
        }

        if state.exhausted() {
            break;
        }

        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                return state.finish(DeliveryStatus::TimedOut, None, true);
            }
            _ = tokio::time::sleep(state.interval) => {}
        }
    }

    state.finish(DeliveryStatus::TimedOut, None, false)
}

fn read_timed_out(limit: Duration) -> TransferError {
    TransferError::NetworkError(format!("destination read timed out after {limit:?}"))
}

/// Delivery watcher bound to a poll budget.
#[derive(Clone, Copy, Debug)]
pub struct DeliveryWatcher {
    max_attempts: u32,
    interval: Duration,
    observe_timeout: Duration,
}

impl DeliveryWatcher {
    /// Create a watcher.
    pub fn new(max_attempts: u32, interval: Duration) -> Self {
        Self {
            max_attempts,
            interval,
            observe_timeout: DEFAULT_OBSERVE_TIMEOUT,
        }
    }

    /// Bound every read, the baseline included, by `timeout`.
    pub fn with_observe_timeout(mut self, timeout: Duration) -> Self {
        self.observe_timeout = timeout;
        self
    }

    /// Read the value delivery must exceed. A read over the timeout is a
    /// `NetworkError`.
    pub async fn read_baseline<O>(&self, observer: &O, account: &Address) -> Result<U256, TransferError>
    where
        O: ObserveCapability + ?Sized,
    {
        tokio::time::timeout(self.observe_timeout, observer.read(account))
            .await
            .unwrap_or_else(|_| Err(read_timed_out(self.observe_timeout)))
    }

    /// Watch `account` through `observer`.
    pub async fn watch<O>(
        &self,
        observer: &O,
        account: &Address,
        baseline: U256,
        cancel: &CancelSignal,
    ) -> DeliveryResult
    where
        O: ObserveCapability + ?Sized,
    {
        await_delivery(
            || observer.read(account),
            baseline,
            self.max_attempts,
            self.interval,
            self.observe_timeout,
            cancel,
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algorithms::cancel::cancel_pair;
    use crate::ports::mock::ScriptedObserver;
    use std::sync::Arc;
    use tokio::time::Instant;

    fn account() -> Address {
        Address::from_evm([7; 20])
    }

    #[tokio::test(start_paused = true)]
    async fn test_confirms_on_first_increase() {
        let observer = ScriptedObserver::new([10u64, 10, 15]);
        let watcher = DeliveryWatcher::new(5, Duration::from_secs(5));

        let result = watcher
            .watch(&observer, &account(), U256::from(10u64), &CancelSignal::never())
            .await;

        assert_eq!(result.status, DeliveryStatus::Confirmed);
        assert_eq!(result.observed_delta, Some(U256::from(5u64)));
        assert_eq!(result.attempts_used, 3);
        assert_eq!(observer.reads(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_times_out_after_budget() {
        let observer = ScriptedObserver::constant(10u64);
        let watcher = DeliveryWatcher::new(3, Duration::from_secs(5));
        let start = Instant::now();

        let result = watcher
            .watch(&observer, &account(), U256::from(10u64), &CancelSignal::never())
            .await;

        assert_eq!(result.status, DeliveryStatus::TimedOut);
        assert!(!result.cancelled);
        assert_eq!(observer.reads(), 3);
        // two sleeps between three reads
        assert_eq!(start.elapsed(), Duration::from_secs(10));
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_reads_consume_attempts() {
        let observer = ScriptedObserver::from_results([
            Err(TransferError::NetworkError("rpc".into())),
            Err(TransferError::NetworkError("rpc".into())),
            Ok(U256::from(11u64)),
        ]);
        let watcher = DeliveryWatcher::new(2, Duration::from_secs(1));

        let result = watcher
            .watch(&observer, &account(), U256::from(10u64), &CancelSignal::never())
            .await;
        assert_eq!(result.status, DeliveryStatus::TimedOut);
        assert_eq!(result.attempts_used, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_decrease_is_not_delivery() {
        let observer = ScriptedObserver::new([9u64, 10, 11]);
        let watcher = DeliveryWatcher::new(3, Duration::from_secs(1));
        let result = watcher
            .watch(&observer, &account(), U256::from(10u64), &CancelSignal::never())
            .await;
        assert_eq!(result.observed_delta, Some(U256::from(1u64)));
        assert_eq!(result.attempts_used, 3);
    }

    #[tokio::test]
    async fn test_zero_budget_never_reads() {
        let observer = ScriptedObserver::constant(99u64);
        let result = DeliveryWatcher::new(0, Duration::from_secs(1))
            .watch(&observer, &account(), U256::zero(), &CancelSignal::never())
            .await;
        assert_eq!(result.status, DeliveryStatus::TimedOut);
        assert_eq!(observer.reads(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancellation_ends_watch() {
        let observer = Arc::new(ScriptedObserver::constant(10u64));
        let (handle, signal) = cancel_pair();
        let watcher = DeliveryWatcher::new(100, Duration::from_secs(1));

        let task = {
            let observer = observer.clone();
            tokio::spawn(async move {
                watcher
                    .watch(&*observer, &account(), U256::from(10u64), &signal)
                    .await
            })
        };

        tokio::time::sleep(Duration::from_millis(2_500)).await;
        handle.cancel();
        let result = task.await.unwrap();

        assert_eq!(result.status, DeliveryStatus::TimedOut);
        assert!(result.cancelled);
        assert_eq!(result.attempts_used, 3);
        assert_eq!(observer.reads(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_hung_reads_are_bounded() {
        let start = Instant::now();

        let result = await_delivery(
            || std::future::pending::<Result<U256, TransferError>>(),
            U256::from(10u64),
            3,
            Duration::from_secs(1),
            Duration::from_secs(2),
            &CancelSignal::never(),
        )
        .await;

        assert_eq!(result.status, DeliveryStatus::TimedOut);
        assert!(!result.cancelled);
        assert_eq!(result.attempts_used, 3);
        // three 2s read timeouts plus two 1s pauses between them
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_secs(8) && elapsed < Duration::from_secs(9));
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_read_counts_as_failed_attempt() {
        let observer = ScriptedObserver::new([15u64]).with_read_delay(Duration::from_secs(30));
        let watcher =
            DeliveryWatcher::new(2, Duration::from_secs(1)).with_observe_timeout(Duration::from_secs(5));

        let result = watcher
            .watch(&observer, &account(), U256::from(10u64), &CancelSignal::never())
            .await;

        assert_eq!(result.status, DeliveryStatus::TimedOut);
        assert_eq!(result.attempts_used, 2);
        assert_eq!(observer.reads(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_baseline_read_times_out() {
        let observer = ScriptedObserver::constant(10u64).with_read_delay(Duration::from_secs(60));
        let watcher =
            DeliveryWatcher::new(3, Duration::from_secs(1)).with_observe_timeout(Duration::from_secs(5));

        let err = watcher.read_baseline(&observer, &account()).await.unwrap_err();

        assert!(matches!(err, TransferError::NetworkError(_)));
        assert!(err.is_transient());
    }
}
