//! # Mesh Topology
//!
//! Directed connection graph between deployed adapters, the verifier and
//! executor settings each endpoint applies to its paths, and the per-edge
//! reports produced when wiring or auditing it.

use super::entities::ReconcileResult;
use super::errors::TransferError;
use super::value_objects::{Address, EndpointId};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// One directed edge: `from` must trust `to`'s adapter as its peer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Connection {
    /// Endpoint holding the binding.
    pub from: EndpointId,
    /// Endpoint the binding points at.
    pub to: EndpointId,
}

impl Connection {
    /// Create an edge.
    pub fn new(from: impl Into<EndpointId>, to: impl Into<EndpointId>) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
        }
    }

    /// The opposite edge.
    pub fn reversed(&self) -> Self {
        Self {
            from: self.to,
            to: self.from,
        }
    }
}

/// Kind of path setting, numbered like the messaging library's config types.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ConfigKind {
    /// Verifier set that must attest a message before delivery.
    Verifiers,
    /// Executor that delivers verified messages.
    Executor,
}

impl ConfigKind {
    /// Numeric config type.
    pub fn code(&self) -> u32 {
        match self {
            ConfigKind::Verifiers => 1,
            ConfigKind::Executor => 2,
        }
    }
}

impl fmt::Display for ConfigKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigKind::Verifiers => write!(f, "verifiers"),
            ConfigKind::Executor => write!(f, "executor"),
        }
    }
}

/// Verifier set and executor an endpoint uses on every outbound path.
///
/// An empty verifier list or a missing executor leaves that setting alone.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathSettings {
    /// Required verifiers.
    #[serde(default)]
    pub verifiers: Vec<Address>,
    /// Executor address.
    #[serde(default)]
    pub executor: Option<Address>,
}

impl PathSettings {
    /// Whether nothing is to be applied.
    pub fn is_empty(&self) -> bool {
        self.verifiers.is_empty() && self.executor.is_none()
    }

    /// Settings to apply, in config-type order, each as its canonical value.
    pub fn desired(&self) -> Vec<(ConfigKind, Vec<Address>)> {
        let mut desired = Vec::with_capacity(2);
        if !self.verifiers.is_empty() {
            desired.push((ConfigKind::Verifiers, canonical(self.verifiers.clone())));
        }
        if let Some(executor) = self.executor {
            desired.push((ConfigKind::Executor, vec![executor]));
        }
        desired
    }
}

/// Sorted, duplicate-free form of an address list, so a verifier set compares
/// equal regardless of the order it was written in.
pub fn canonical(mut addresses: Vec<Address>) -> Vec<Address> {
    addresses.sort_by_key(|a| *a.as_bytes32());
    addresses.dedup();
    addresses
}

/// Set of directed connections, kept sorted and free of duplicates, plus
/// optional per-endpoint path settings.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MeshTopology {
    connections: BTreeSet<Connection>,
    #[serde(default)]
    settings: BTreeMap<EndpointId, PathSettings>,
}

impl MeshTopology {
    /// Empty topology.
    pub fn new() -> Self {
        Self::default()
    }

    /// Every ordered pair of distinct `endpoints`.
    pub fn full_mesh(endpoints: &[EndpointId]) -> Self {
        let mut topology = Self::new();
        for &from in endpoints {
            for &to in endpoints {
                if from != to {
                    topology.connections.insert(Connection { from, to });
                }
            }
        }
        topology
    }

    /// Add one directed edge. Self-loops are ignored.
    pub fn connect(mut self, from: impl Into<EndpointId>, to: impl Into<EndpointId>) -> Self {
        self.insert(Connection::new(from, to));
        self
    }

    /// Add both directions between `a` and `b`.
    pub fn connect_both(self, a: impl Into<EndpointId>, b: impl Into<EndpointId>) -> Self {
        let (a, b) = (a.into(), b.into());
        self.connect(a, b).connect(b, a)
    }

    /// Add an edge in place. Returns false for self-loops and duplicates.
    pub fn insert(&mut self, connection: Connection) -> bool {
        if connection.from == connection.to {
            return false;
        }
        self.connections.insert(connection)
    }

    /// Whether `from -> to` is part of the mesh.
    pub fn contains(&self, from: EndpointId, to: EndpointId) -> bool {
        self.connections.contains(&Connection { from, to })
    }

    /// Apply `settings` to every outbound path of `endpoint`.
    pub fn with_settings(mut self, endpoint: impl Into<EndpointId>, settings: PathSettings) -> Self {
        let endpoint = endpoint.into();
        if settings.is_empty() {
            self.settings.remove(&endpoint);
        } else {
            self.settings.insert(endpoint, settings);
        }
        self
    }

    /// Path settings configured for `endpoint`.
    pub fn settings(&self, endpoint: EndpointId) -> Option<&PathSettings> {
        self.settings.get(&endpoint)
    }

    /// Edges in a stable order.
    pub fn connections(&self) -> impl Iterator<Item = &Connection> {
        self.connections.iter()
    }

    /// Number of edges.
    pub fn len(&self) -> usize {
        self.connections.len()
    }

    /// Whether the mesh has no edges.
    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }
}

/// Outcome of reconciling one edge.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WiringReport {
    /// Edge that was reconciled.
    pub connection: Connection,
    /// Peer reconcile result or the error that stopped it.
    pub result: Result<ReconcileResult, TransferError>,
    /// Path settings reconciled after the peer, empty when none are
    /// configured or the peer step failed.
    pub settings: Vec<(ConfigKind, Result<ReconcileResult, TransferError>)>,
}

impl WiringReport {
    /// Whether any correcting write was issued.
    pub fn changed(&self) -> bool {
        matches!(&self.result, Ok(r) if r.changed)
            || self
                .settings
                .iter()
                .any(|(_, result)| matches!(result, Ok(r) if r.changed))
    }

    /// Whether the peer and every setting reconciled.
    pub fn is_ok(&self) -> bool {
        self.result.is_ok() && self.settings.iter().all(|(_, result)| result.is_ok())
    }
}

/// Read-only state of one edge.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum AuditStatus {
    /// Binding matches the destination adapter.
    Wired,
    /// No binding recorded.
    Missing,
    /// Binding points elsewhere.
    Mismatch {
        /// Address currently recorded.
        actual: Address,
    },
}

/// Audit of one edge.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AuditEntry {
    /// Edge that was checked.
    pub connection: Connection,
    /// Address the binding should hold.
    pub expected: Address,
    /// Observed state, or the read error.
    pub status: Result<AuditStatus, TransferError>,
}

impl AuditEntry {
    /// Whether the edge is correctly wired.
    pub fn is_wired(&self) -> bool {
        matches!(self.status, Ok(AuditStatus::Wired))
    }
}
