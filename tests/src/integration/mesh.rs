//! # Mesh Wiring
//!
//! `wire` and `audit` over a three-chain deployment.

#[cfg(test)]
mod tests {
    use super::super::*;
    use xb_transfer::{
        AuditStatus, CancelSignal, Connection, PeerCapability, TransferApi, TransferStatus,
    };

    #[tokio::test]
    async fn test_wire_is_idempotent() {
        let fixture = Fixture::three_chains(fast_config());

        let first = fixture.service.wire().await;
        assert_eq!(first.len(), 6);
        assert!(first.iter().all(|r| r.changed()));

        let second = fixture.service.wire().await;
        assert_eq!(second.len(), 6);
        assert!(second.iter().all(|r| r.result.is_ok() && !r.changed()));
    }

    #[tokio::test]
    async fn test_audit_is_read_only() {
        let fixture = Fixture::three_chains(fast_config());

        let before = fixture.service.audit().await;
        assert!(before
            .iter()
            .all(|e| matches!(e.status, Ok(AuditStatus::Missing))));

        // auditing twice changes nothing
        let again = fixture.service.audit().await;
        assert!(again.iter().all(|e| !e.is_wired()));

        fixture.service.wire().await;
        let after = fixture.service.audit().await;
        assert!(after.iter().all(|e| e.is_wired()));
        assert!(after
            .iter()
            .all(|e| e.expected == contract(e.connection.to)));
    }

    #[tokio::test]
    async fn test_audit_reports_mismatch_and_wire_corrects_it() {
        let fixture = Fixture::three_chains(fast_config());
        fixture.service.wire().await;

        let bogus = Address::from_evm([0xEE; 20]);
        fixture
            .simnet
            .adapter(SEPOLIA, contract(SEPOLIA), owner())
            .set_peer(ARBITRUM, bogus)
            .await
            .unwrap();

        let audit = fixture.service.audit().await;
        let broken: Vec<_> = audit.iter().filter(|e| !e.is_wired()).collect();
        assert_eq!(broken.len(), 1);
        assert_eq!(broken[0].connection, Connection::new(SEPOLIA, ARBITRUM));
        assert_eq!(
            broken[0].status,
            Ok(AuditStatus::Mismatch { actual: bogus })
        );

        let reports = fixture.service.wire().await;
        assert_eq!(reports.iter().filter(|r| r.changed()).count(), 1);
        assert!(fixture.service.audit().await.iter().all(|e| e.is_wired()));
    }

    #[tokio::test]
    async fn test_wire_continues_past_unreachable_chain() {
        let fixture = Fixture::three_chains(fast_config());
        fixture.simnet.set_reachable(OPTIMISM, false);

        let reports = fixture.service.wire().await;

        let failed: Vec<_> = reports.iter().filter(|r| r.result.is_err()).collect();
        // only bindings held on Optimism fail; the other four still land
        assert_eq!(failed.len(), 2);
        assert!(failed.iter().all(|r| r.connection.from == OPTIMISM));
        assert_eq!(reports.iter().filter(|r| r.changed()).count(), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_one_way_wiring_is_rejected_on_delivery() {
        let topology = MeshTopology::new().connect(SEPOLIA, ARBITRUM);
        let fixture = Fixture::with_topology(
            fast_config().with_bidirectional_wiring(false),
            topology,
            owner(),
        );

        let reports = fixture.service.wire().await;
        assert_eq!(reports.len(), 1);

        let outcome = fixture
            .service
            .transfer(&request(SEPOLIA, ARBITRUM, "1"), owner(), &CancelSignal::never())
            .await;
        assert_eq!(outcome.status(), &TransferStatus::TimedOut);

        // destination does not trust the source, so the message is rejected
        fixture.simnet.deliver_all();
        assert_eq!(
            fixture
                .simnet
                .token_balance(ARBITRUM, contract(ARBITRUM), owner()),
            units("100")
        );
    }
}
