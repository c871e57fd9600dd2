//! # Adapter Registry
//!
//! Maps endpoint ids to deployed adapters and, optionally, to a
//! destination-side observer used for delivery watching.

use crate::domain::{EndpointId, PeerBinding, TransferError};
use crate::ports::{MessagingAdapter, ObserveCapability};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Shared handle to an adapter.
pub type SharedAdapter = Arc<dyn MessagingAdapter>;

/// Shared handle to an observer.
pub type SharedObserver = Arc<dyn ObserveCapability>;

#[derive(Clone)]
struct RegistryEntry {
    adapter: SharedAdapter,
    observer: Option<SharedObserver>,
}

/// Adapters of one deployment, keyed by endpoint.
#[derive(Clone, Default)]
pub struct AdapterRegistry {
    entries: BTreeMap<EndpointId, RegistryEntry>,
}

impl AdapterRegistry {
    /// Empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `adapter` under its own endpoint id. Replaces any previous entry.
    pub fn register(&mut self, adapter: SharedAdapter) -> &mut Self {
        let endpoint = adapter.local_endpoint();
        self.entries.insert(
            endpoint,
            RegistryEntry {
                adapter,
                observer: None,
            },
        );
        self
    }

    /// Register `adapter` with an observer for transfers arriving on it.
    pub fn register_with_observer(
        &mut self,
        adapter: SharedAdapter,
        observer: SharedObserver,
    ) -> &mut Self {
        let endpoint = adapter.local_endpoint();
        self.entries.insert(
            endpoint,
            RegistryEntry {
                adapter,
                observer: Some(observer),
            },
        );
        self
    }

    /// Adapter deployed on `endpoint`.
    pub fn adapter(&self, endpoint: EndpointId) -> Result<SharedAdapter, TransferError> {
        self.entries
            .get(&endpoint)
            .map(|e| e.adapter.clone())
            .ok_or(TransferError::UnknownEndpoint(endpoint))
    }

    /// Observer for `endpoint`, if one was registered.
    pub fn observer(&self, endpoint: EndpointId) -> Option<SharedObserver> {
        self.entries.get(&endpoint).and_then(|e| e.observer.clone())
    }

    /// Whether `endpoint` is known.
    pub fn contains(&self, endpoint: EndpointId) -> bool {
        self.entries.contains_key(&endpoint)
    }

    /// Registered endpoints in ascending order.
    pub fn endpoints(&self) -> Vec<EndpointId> {
        self.entries.keys().copied().collect()
    }

    /// Resolve the adapters and observer for `source -> destination`.
    pub fn route(
        &self,
        source: EndpointId,
        destination: EndpointId,
    ) -> Result<TransferRoute, TransferError> {
        Ok(TransferRoute {
            source: self.adapter(source)?,
            destination: self.adapter(destination)?,
            observer: self.observer(destination),
        })
    }
}

/// Everything the orchestrator needs for one direction of travel.
#[derive(Clone)]
pub struct TransferRoute {
    /// Adapter the transfer is sent from.
    pub source: SharedAdapter,
    /// Adapter the transfer arrives at.
    pub destination: SharedAdapter,
    /// Destination-side observer; without one the run ends at `Submitted`.
    pub observer: Option<SharedObserver>,
}

impl TransferRoute {
    /// Build a route by hand.
    pub fn new(source: SharedAdapter, destination: SharedAdapter) -> Self {
        Self {
            source,
            destination,
            observer: None,
        }
    }

    /// Attach a destination observer.
    pub fn with_observer(mut self, observer: SharedObserver) -> Self {
        self.observer = Some(observer);
        self
    }

    /// Bindings a transfer over this route relies on, with the adapter that
    /// holds each one. The source must trust the destination adapter; with
    /// `bidirectional` the destination must trust the source as well.
    pub fn required_bindings(&self, bidirectional: bool) -> Vec<(&SharedAdapter, PeerBinding)> {
        let mut bindings = vec![(
            &self.source,
            PeerBinding {
                local: self.source.local_endpoint(),
                remote: self.destination.local_endpoint(),
                remote_address: self.destination.contract_address(),
            },
        )];
        if bidirectional {
            bindings.push((
                &self.destination,
                PeerBinding {
                    local: self.destination.local_endpoint(),
                    remote: self.source.local_endpoint(),
                    remote_address: self.source.contract_address(),
                },
            ));
        }
        bindings
    }
}
