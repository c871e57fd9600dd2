//! Builds a [`TransferService`] over the simnet from a [`Deployment`].

use crate::deployment::{ConfigError, Deployment};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::info;
use xb_transfer::{
    parse_units, Address, AdapterRegistry, EndpointId, ObservedAsset, OrchestratorConfig, Simnet,
    TransferService, NATIVE_DECIMALS,
};

/// A running simulated deployment.
pub struct SimnetRuntime {
    deployment: Deployment,
    simnet: Arc<Simnet>,
    service: TransferService,
    relayer: Option<JoinHandle<()>>,
}

impl SimnetRuntime {
    /// Create chains, deploy and fund adapters, and build the service.
    ///
    /// `config` is final; see [`Deployment::orchestrator_config`] for the overlay.
    pub fn build(deployment: Deployment, config: OrchestratorConfig) -> Result<Self, ConfigError> {
        let simnet = Simnet::new();
        let owner = deployment.owner;
        let mut registry = AdapterRegistry::new();

        for endpoint in &deployment.endpoints {
            let eid = EndpointId::new(endpoint.eid);
            simnet.add_chain(eid);
            simnet.deploy_adapter(
                eid,
                endpoint.contract,
                owner,
                endpoint.native,
                parse_units(&endpoint.fee, NATIVE_DECIMALS)?,
            )?;
            simnet.fund(eid, owner, parse_units(&endpoint.balance, NATIVE_DECIMALS)?)?;
            if let Some(tokens) = &endpoint.tokens {
                simnet.mint(
                    eid,
                    endpoint.contract,
                    owner,
                    parse_units(tokens, NATIVE_DECIMALS)?,
                )?;
            }

            let asset = if endpoint.native {
                ObservedAsset::Native
            } else {
                ObservedAsset::Token(endpoint.contract)
            };
            registry.register_with_observer(
                Arc::new(simnet.adapter(eid, endpoint.contract, owner)),
                Arc::new(simnet.observer(eid, asset)),
            );
            info!(
                "[xb-runtime] Endpoint {} ({}) adapter {}",
                endpoint.name, eid, endpoint.contract
            );
        }

        let topology = deployment.topology()?;
        let service = TransferService::new(registry, topology, config)?;

        Ok(Self {
            deployment,
            simnet,
            service,
            relayer: None,
        })
    }

    /// Start delivering in-flight messages in the background.
    pub fn start_relayer(&mut self) {
        if self.relayer.is_none() {
            let interval = Duration::from_millis(self.deployment.simnet.relay_interval_ms);
            self.relayer = Some(self.simnet.spawn_relayer(interval));
        }
    }

    /// Transfer service over the simnet.
    pub fn service(&self) -> &TransferService {
        &self.service
    }

    /// Underlying simulated network.
    pub fn simnet(&self) -> &Arc<Simnet> {
        &self.simnet
    }

    /// Loaded deployment.
    pub fn deployment(&self) -> &Deployment {
        &self.deployment
    }

    /// Signer and owner of every adapter.
    pub fn owner(&self) -> Address {
        self.deployment.owner
    }
}

impl Drop for SimnetRuntime {
    fn drop(&mut self) {
        if let Some(relayer) = self.relayer.take() {
            relayer.abort();
        }
    }
}
