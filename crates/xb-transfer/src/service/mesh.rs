//! # Mesh Wiring
//!
//! Reconciles or audits every connection of a [`MeshTopology`].

use super::registry::AdapterRegistry;
use crate::algorithms::{reconcile, reconcile_config, SignerLocks};
use crate::domain::{
    Address, AuditEntry, AuditStatus, ConfigKind, Connection, MeshTopology, PathSettings,
    ReconcileResult, TransferError, WiringReport,
};
use tracing::{info, warn};

/// Reconcile every connection: `from`'s binding for `to` must equal `to`'s
/// adapter address.
///
/// When `from` has path settings, they are reconciled for `to` once the peer
/// binding is in place. Connections are processed in order. A failure is
/// recorded in its report and the remaining connections still run.
pub async fn wire_mesh(
    registry: &AdapterRegistry,
    topology: &MeshTopology,
    locks: &SignerLocks,
) -> Vec<WiringReport> {
    let mut reports = Vec::with_capacity(topology.len());

    for connection in topology.connections() {
        let result = wire_one(registry, connection, locks).await;
        let settings = match (&result, topology.settings(connection.from)) {
            (Ok(_), Some(settings)) => apply_settings(registry, connection, settings, locks).await,
            _ => Vec::new(),
        };
        match &result {
            Ok(r) if r.changed => info!(
                "[xb-transfer] Wired {} -> {}",
                connection.from, connection.to
            ),
            Ok(_) => info!(
                "[xb-transfer] {} -> {} already wired",
                connection.from, connection.to
            ),
            Err(err) => warn!(
                error = %err,
                "[xb-transfer] Wiring {} -> {} failed",
                connection.from,
                connection.to
            ),
        }
        reports.push(WiringReport {
            connection: *connection,
            result,
            settings,
        });
    }

    reports
}

async fn wire_one(
    registry: &AdapterRegistry,
    connection: &Connection,
    locks: &SignerLocks,
) -> Result<ReconcileResult, TransferError> {
    let local = registry.adapter(connection.from)?;
    let remote = registry.adapter(connection.to)?;
    reconcile(
        &*local,
        connection.from,
        connection.to,
        remote.contract_address(),
        locks,
    )
    .await
}

async fn apply_settings(
    registry: &AdapterRegistry,
    connection: &Connection,
    settings: &PathSettings,
    locks: &SignerLocks,
) -> Vec<(ConfigKind, Result<ReconcileResult, TransferError>)> {
    let local = match registry.adapter(connection.from) {
        Ok(local) => local,
        Err(err) => return vec![(ConfigKind::Verifiers, Err(err))],
    };

    let mut results = Vec::with_capacity(2);
    for (kind, desired) in settings.desired() {
        let result = reconcile_config(&*local, connection.to, kind, &desired, locks).await;
        if let Err(err) = &result {
            warn!(
                error = %err,
                "[xb-transfer] Setting {} for {} -> {} failed",
                kind,
                connection.from,
                connection.to
            );
        }
        results.push((kind, result));
    }
    results
}

/// Read every connection's binding and compare it with the expected peer.
/// Never writes.
pub async fn audit_mesh(registry: &AdapterRegistry, topology: &MeshTopology) -> Vec<AuditEntry> {
    let mut entries = Vec::with_capacity(topology.len());

    for connection in topology.connections() {
        let (expected, status) = match (
            registry.adapter(connection.from),
            registry.adapter(connection.to),
        ) {
            (Ok(local), Ok(remote)) => {
                let expected = remote.contract_address();
                let status = local.get_peer(connection.to).await.map(|actual| {
                    if actual == expected {
                        AuditStatus::Wired
                    } else if actual.is_zero() {
                        AuditStatus::Missing
                    } else {
                        AuditStatus::Mismatch { actual }
                    }
                });
                (expected, status)
            }
            (Err(err), _) | (_, Err(err)) => (Address::ZERO, Err(err)),
        };

        entries.push(AuditEntry {
            connection: *connection,
            expected,
            status,
        });
    }

    entries
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::EndpointId;
    use crate::ports::mock::MockMessagingAdapter;
    use std::sync::Arc;

    fn mocks() -> (Arc<MockMessagingAdapter>, Arc<MockMessagingAdapter>, AdapterRegistry) {
        let a = Arc::new(MockMessagingAdapter::new(EndpointId::new(1), Address::from_evm([0xA; 20])));
        let b = Arc::new(MockMessagingAdapter::new(EndpointId::new(2), Address::from_evm([0xB; 20])));
        let mut registry = AdapterRegistry::new();
        registry.register(a.clone()).register(b.clone());
        (a, b, registry)
    }

    #[tokio::test]
    async fn test_wire_mesh_is_idempotent() {
        let (a, b, registry) = mocks();
        let topology = MeshTopology::new().connect_both(1u32, 2u32);
        let locks = SignerLocks::new();

        let first = wire_mesh(&registry, &topology, &locks).await;
        assert_eq!(first.len(), 2);
        assert!(first.iter().all(|r| r.changed()));

        let second = wire_mesh(&registry, &topology, &locks).await;
        assert!(second.iter().all(|r| r.result == Ok(ReconcileResult::unchanged())));
        assert_eq!(a.set_peer_calls(), 1);
        assert_eq!(b.set_peer_calls(), 1);
        assert_eq!(a.peer(EndpointId::new(2)), Some(Address::from_evm([0xB; 20])));
    }

    #[tokio::test]
    async fn test_wire_mesh_continues_past_failures() {
        let (_, b, registry) = mocks();
        let topology = MeshTopology::new().connect(1u32, 9u32).connect(2u32, 1u32);

        let reports = wire_mesh(&registry, &topology, &SignerLocks::new()).await;
        assert_eq!(
            reports[0].result,
            Err(TransferError::UnknownEndpoint(EndpointId::new(9)))
        );
        assert!(reports[1].changed());
        assert_eq!(b.set_peer_calls(), 1);
    }

    #[tokio::test]
    async fn test_wire_mesh_applies_path_settings_once() {
        let (a, b, registry) = mocks();
        let verifiers = vec![Address::from_evm([0xD1; 20]), Address::from_evm([0xD2; 20])];
        let executor = Address::from_evm([0xEE; 20]);
        let topology = MeshTopology::new().connect_both(1u32, 2u32).with_settings(
            1u32,
            PathSettings {
                verifiers: verifiers.clone(),
                executor: Some(executor),
            },
        );
        let locks = SignerLocks::new();

        let first = wire_mesh(&registry, &topology, &locks).await;
        let kinds: Vec<_> = first[0].settings.iter().map(|(kind, _)| *kind).collect();
        assert_eq!(kinds, vec![ConfigKind::Verifiers, ConfigKind::Executor]);
        assert!(first.iter().all(|r| r.is_ok()));
        assert!(first[1].settings.is_empty());
        assert_eq!(a.config(EndpointId::new(2), ConfigKind::Verifiers), verifiers);
        assert_eq!(a.config(EndpointId::new(2), ConfigKind::Executor), vec![executor]);

        let second = wire_mesh(&registry, &topology, &locks).await;
        assert!(second.iter().all(|r| !r.changed()));
        assert_eq!(a.set_config_calls(), 2);
        assert_eq!(b.set_config_calls(), 0);
    }

    #[tokio::test]
    async fn test_failed_peer_skips_settings() {
        let a = Arc::new(
            MockMessagingAdapter::new(EndpointId::new(1), Address::from_evm([0xA; 20]))
                .with_set_peer_failure(TransferError::AuthorizationError("not owner".into())),
        );
        let b = Arc::new(MockMessagingAdapter::new(EndpointId::new(2), Address::from_evm([0xB; 20])));
        let mut registry = AdapterRegistry::new();
        registry.register(a.clone()).register(b);
        let topology = MeshTopology::new().connect(1u32, 2u32).with_settings(
            1u32,
            PathSettings {
                verifiers: Vec::new(),
                executor: Some(Address::from_evm([0xEE; 20])),
            },
        );

        let reports = wire_mesh(&registry, &topology, &SignerLocks::new()).await;
        assert!(!reports[0].is_ok());
        assert!(reports[0].settings.is_empty());
        assert_eq!(a.set_config_calls(), 0);
    }

    #[tokio::test]
    async fn test_setting_failure_marks_report_failed() {
        let a = Arc::new(
            MockMessagingAdapter::new(EndpointId::new(1), Address::from_evm([0xA; 20]))
                .with_set_config_failure(TransferError::NetworkError("dropped".into())),
        );
        let b = Arc::new(MockMessagingAdapter::new(EndpointId::new(2), Address::from_evm([0xB; 20])));
        let mut registry = AdapterRegistry::new();
        registry.register(a.clone()).register(b);
        let topology = MeshTopology::new().connect(1u32, 2u32).with_settings(
            1u32,
            PathSettings {
                verifiers: vec![Address::from_evm([0xD1; 20])],
                executor: None,
            },
        );

        let reports = wire_mesh(&registry, &topology, &SignerLocks::new()).await;
        assert!(reports[0].result.is_ok());
        assert!(reports[0].changed());
        assert!(!reports[0].is_ok());
        assert_eq!(a.peer(EndpointId::new(2)), Some(Address::from_evm([0xB; 20])));
    }

    #[tokio::test]
    async fn test_audit_mesh_never_writes() {
        let (_, b, _) = mocks();
        let a = Arc::new(
            MockMessagingAdapter::new(EndpointId::new(1), Address::from_evm([0xA; 20]))
                .with_peer(EndpointId::new(2), Address::from_evm([0xC; 20])),
        );
        let mut registry = AdapterRegistry::new();
        registry.register(a.clone()).register(b.clone());
        let topology = MeshTopology::new().connect_both(1u32, 2u32);

        let entries = audit_mesh(&registry, &topology).await;
        assert_eq!(
            entries[0].status,
            Ok(AuditStatus::Mismatch {
                actual: Address::from_evm([0xC; 20])
            })
        );
        assert_eq!(entries[1].status, Ok(AuditStatus::Missing));
        assert_eq!(a.set_peer_calls() + b.set_peer_calls(), 0);
    }
}
