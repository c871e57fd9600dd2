//! # Transfer Flows
//!
//! Full orchestration runs against the simnet: wiring, quoting, simulation,
//! submission, relaying and delivery observation.

#[cfg(test)]
mod tests {
    use super::super::*;
    use std::time::Duration;
    use xb_transfer::{
        cancel_pair, CancelSignal, Stage, TransferApi, TransferError, TransferStatus,
    };

    fn relayed(fixture: &Fixture) -> tokio::task::JoinHandle<()> {
        fixture.simnet.spawn_relayer(Duration::from_millis(1_500))
    }

    // =========================================================================
    // DELIVERY
    // =========================================================================

    #[tokio::test(start_paused = true)]
    async fn test_native_to_token_transfer_confirms() {
        let fixture = Fixture::three_chains(fast_config());
        let relayer = relayed(&fixture);

        let outcome = fixture
            .service
            .transfer(&request(SEPOLIA, ARBITRUM, "2"), owner(), &CancelSignal::never())
            .await;

        assert_eq!(outcome.status(), &TransferStatus::Confirmed);
        assert_eq!(outcome.observed_delta(), Some(units("2")));
        assert!(outcome.transaction_id().is_some());
        assert_eq!(
            fixture.simnet.native_balance(SEPOLIA, owner()),
            units("10") - units("2") - units("0.001")
        );
        assert_eq!(
            fixture
                .simnet
                .token_balance(ARBITRUM, contract(ARBITRUM), owner()),
            units("102")
        );
        assert_eq!(fixture.simnet.pending_messages(), 0);
        relayer.abort();
    }

    #[tokio::test(start_paused = true)]
    async fn test_token_to_token_burns_on_source() {
        let fixture = Fixture::three_chains(fast_config());
        let relayer = relayed(&fixture);

        let outcome = fixture
            .service
            .transfer(&request(ARBITRUM, OPTIMISM, "5"), owner(), &CancelSignal::never())
            .await;

        assert_eq!(outcome.status(), &TransferStatus::Confirmed);
        assert_eq!(
            fixture
                .simnet
                .token_balance(ARBITRUM, contract(ARBITRUM), owner()),
            units("95")
        );
        // token adapters carry only the fee as native value
        assert_eq!(
            fixture.simnet.native_balance(ARBITRUM, owner()),
            units("10") - units("0.001")
        );
        relayer.abort();
    }

    #[tokio::test(start_paused = true)]
    async fn test_undelivered_transfer_times_out_then_lands() {
        let fixture = Fixture::three_chains(
            OrchestratorConfig::default()
                .with_poll_interval_ms(1_000)
                .with_max_poll_attempts(3),
        );

        let outcome = fixture
            .service
            .transfer(&request(SEPOLIA, OPTIMISM, "1"), owner(), &CancelSignal::never())
            .await;

        assert_eq!(outcome.status(), &TransferStatus::TimedOut);
        assert!(!outcome.is_failure());
        assert!(outcome.summary().contains("pending"));
        assert_eq!(fixture.simnet.pending_messages(), 1);

        assert_eq!(fixture.simnet.deliver_all(), 1);
        assert_eq!(
            fixture
                .simnet
                .token_balance(OPTIMISM, contract(OPTIMISM), owner()),
            units("101")
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_stops_watch_without_failing() {
        let fixture = Fixture::three_chains(fast_config());
        let (handle, cancel) = cancel_pair();

        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(1_200)).await;
            handle.cancel();
        });

        let outcome = fixture
            .service
            .transfer(&request(SEPOLIA, ARBITRUM, "1"), owner(), &cancel)
            .await;

        assert_eq!(outcome.status(), &TransferStatus::TimedOut);
        assert_eq!(outcome.stages().last().unwrap().outcome, "cancelled");
        assert!(outcome.transaction_id().is_some());
    }

    // =========================================================================
    // GATING
    // =========================================================================

    #[tokio::test]
    async fn test_dry_run_wires_but_moves_nothing() {
        let fixture = Fixture::three_chains(fast_config().with_dry_run(true));

        let outcome = fixture
            .service
            .transfer(&request(SEPOLIA, ARBITRUM, "1"), owner(), &CancelSignal::never())
            .await;

        assert_eq!(outcome.status(), &TransferStatus::Simulated);
        assert!(outcome.simulation().is_some());
        assert!(outcome.transaction_id().is_none());
        assert_eq!(fixture.simnet.pending_messages(), 0);
        assert_eq!(fixture.simnet.native_balance(SEPOLIA, owner()), units("10"));
    }

    #[tokio::test]
    async fn test_insufficient_tokens_fail_simulation() {
        let fixture = Fixture::three_chains(fast_config());

        let outcome = fixture
            .service
            .transfer(&request(ARBITRUM, SEPOLIA, "500"), owner(), &CancelSignal::never())
            .await;

        let failure = outcome.failure().unwrap();
        assert_eq!(failure.stage, Stage::Simulate);
        assert!(failure.message.contains("InsufficientBalance"));
        assert_eq!(fixture.simnet.pending_messages(), 0);
    }

    #[tokio::test]
    async fn test_non_owner_signer_fails_at_reconcile() {
        let fixture = Fixture::with_topology(
            fast_config(),
            MeshTopology::full_mesh(&[SEPOLIA, ARBITRUM, OPTIMISM]),
            stranger(),
        );

        let outcome = fixture
            .service
            .transfer(&request(SEPOLIA, ARBITRUM, "1"), stranger(), &CancelSignal::never())
            .await;

        let failure = outcome.failure().unwrap();
        assert_eq!(failure.stage, Stage::Reconcile);
        assert!(!failure.transient);
        assert!(matches!(
            failure.error(),
            Some(TransferError::ReconcileError { .. })
        ));
        assert!(outcome.transaction_id().is_none());
    }

    #[tokio::test]
    async fn test_unreachable_destination_fails_before_submit() {
        let fixture = Fixture::three_chains(fast_config());
        fixture.simnet.set_reachable(ARBITRUM, false);

        let outcome = fixture
            .service
            .transfer(&request(SEPOLIA, ARBITRUM, "1"), owner(), &CancelSignal::never())
            .await;

        let failure = outcome.failure().unwrap();
        assert_eq!(failure.stage, Stage::Reconcile);
        assert!(failure.transient);
        assert_eq!(fixture.simnet.native_balance(SEPOLIA, owner()), units("10"));
    }

    // =========================================================================
    // CONCURRENCY
    // =========================================================================

    #[tokio::test(start_paused = true)]
    async fn test_independent_transfers_run_concurrently() {
        let fixture = Fixture::three_chains(fast_config());
        let relayer = relayed(&fixture);
        let never = CancelSignal::never();

        let to_arbitrum = request(SEPOLIA, ARBITRUM, "1");
        let to_optimism = request(SEPOLIA, OPTIMISM, "3");
        let (a, b) = futures::join!(
            fixture.service.transfer(&to_arbitrum, owner(), &never),
            fixture.service.transfer(&to_optimism, owner(), &never),
        );

        assert_eq!(a.status(), &TransferStatus::Confirmed);
        assert_eq!(b.status(), &TransferStatus::Confirmed);
        assert_eq!(a.observed_delta(), Some(units("1")));
        assert_eq!(b.observed_delta(), Some(units("3")));
        assert_ne!(a.run_id(), b.run_id());
        assert_eq!(
            fixture.simnet.native_balance(SEPOLIA, owner()),
            units("10") - units("4") - units("0.002")
        );
        relayer.abort();
    }
}
