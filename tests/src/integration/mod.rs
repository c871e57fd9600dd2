//! Integration flows over the in-memory simnet.
//!
//! Each flow builds a fresh [`Fixture`]: chains, adapters owned by one
//! signer, a registry with observers, and a service over a chosen topology.

pub mod flows;
pub mod mesh;
pub mod runtime;

use primitive_types::U256;
use std::sync::Arc;
use xb_transfer::{
    parse_units, Address, AdapterRegistry, EndpointId, MeshTopology, ObservedAsset,
    OrchestratorConfig, Simnet, TransferRequest, TransferService, NATIVE_DECIMALS,
};

/// Native-asset adapter chain.
pub const SEPOLIA: EndpointId = EndpointId::new(40161);
/// Token adapter chain.
pub const ARBITRUM: EndpointId = EndpointId::new(40231);
/// Second token adapter chain.
pub const OPTIMISM: EndpointId = EndpointId::new(40232);

/// Whole units with 18 decimals.
pub fn units(text: &str) -> U256 {
    parse_units(text, NATIVE_DECIMALS).unwrap()
}

/// Adapter owner and default sender.
pub fn owner() -> Address {
    Address::from_evm([0x11; 20])
}

/// A third party without adapter ownership.
pub fn stranger() -> Address {
    Address::from_evm([0x99; 20])
}

/// Contract address of the adapter on `endpoint`.
pub fn contract(endpoint: EndpointId) -> Address {
    let mut bytes = [0u8; 20];
    bytes[..4].copy_from_slice(&endpoint.get().to_be_bytes());
    bytes[19] = 0xAD;
    Address::from_evm(bytes)
}

/// Simnet plus the service built over it.
pub struct Fixture {
    pub simnet: Arc<Simnet>,
    pub service: TransferService,
}

impl Fixture {
    /// Sepolia (native) plus Arbitrum and Optimism (token), fully meshed.
    pub fn three_chains(config: OrchestratorConfig) -> Self {
        Self::with_topology(
            config,
            MeshTopology::full_mesh(&[SEPOLIA, ARBITRUM, OPTIMISM]),
            owner(),
        )
    }

    /// Same chains, explicit topology, adapters signed by `signer`.
    pub fn with_topology(
        config: OrchestratorConfig,
        topology: MeshTopology,
        signer: Address,
    ) -> Self {
        let simnet = Simnet::new();
        let mut registry = AdapterRegistry::new();

        for (endpoint, native) in [(SEPOLIA, true), (ARBITRUM, false), (OPTIMISM, false)] {
            simnet.add_chain(endpoint);
            simnet
                .deploy_adapter(endpoint, contract(endpoint), owner(), native, units("0.001"))
                .unwrap();
            simnet.fund(endpoint, owner(), units("10")).unwrap();
            simnet.fund(endpoint, stranger(), units("10")).unwrap();
            let asset = if native {
                ObservedAsset::Native
            } else {
                simnet
                    .mint(endpoint, contract(endpoint), owner(), units("100"))
                    .unwrap();
                ObservedAsset::Token(contract(endpoint))
            };
            registry.register_with_observer(
                Arc::new(simnet.adapter(endpoint, contract(endpoint), signer)),
                Arc::new(simnet.observer(endpoint, asset)),
            );
        }

        let service = TransferService::new(registry, topology, config).unwrap();
        Self { simnet, service }
    }
}

/// Watch settings short enough for paused-clock tests.
pub fn fast_config() -> OrchestratorConfig {
    OrchestratorConfig::default()
        .with_poll_interval_ms(500)
        .with_max_poll_attempts(20)
}

/// Transfer of `amount` whole units to the owner.
pub fn request(source: EndpointId, destination: EndpointId, amount: &str) -> TransferRequest {
    TransferRequest::builder(source, destination, owner())
        .amount(units(amount))
        .build()
        .unwrap()
}
