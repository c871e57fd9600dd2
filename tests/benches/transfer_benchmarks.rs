//! Transfer pipeline benchmarks.
//!
//! Run with: `cargo bench -p xb-tests`

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use std::sync::Arc;
use xb_transfer::{
    format_units, parse_units, Address, AdapterRegistry, CancelSignal, EndpointId, MeshTopology,
    ObservedAsset, OrchestratorConfig, Simnet, TransferApi, TransferRequest, TransferService,
    NATIVE_DECIMALS,
};

const SOURCE: EndpointId = EndpointId::new(40161);
const DESTINATION: EndpointId = EndpointId::new(40231);

fn service(config: OrchestratorConfig) -> TransferService {
    let owner = Address::from_evm([0x11; 20]);
    let simnet = Simnet::new();
    let mut registry = AdapterRegistry::new();
    for (endpoint, byte) in [(SOURCE, 0xA1u8), (DESTINATION, 0xB2u8)] {
        let contract = Address::from_evm([byte; 20]);
        simnet.add_chain(endpoint);
        simnet
            .deploy_adapter(endpoint, contract, owner, true, 1_000u64.into())
            .unwrap();
        simnet
            .fund(endpoint, owner, parse_units("1000000000", NATIVE_DECIMALS).unwrap())
            .unwrap();
        registry.register_with_observer(
            Arc::new(simnet.adapter(endpoint, contract, owner)),
            Arc::new(simnet.observer(endpoint, ObservedAsset::Native)),
        );
    }
    TransferService::new(
        registry,
        MeshTopology::full_mesh(&[SOURCE, DESTINATION]),
        config,
    )
    .unwrap()
}

fn bench_units(c: &mut Criterion) {
    let mut group = c.benchmark_group("units");
    group.bench_function("parse", |b| {
        b.iter(|| parse_units(black_box("123456.789012345678"), NATIVE_DECIMALS))
    });
    let value = parse_units("123456.789012345678", NATIVE_DECIMALS).unwrap();
    group.bench_function("format", |b| {
        b.iter(|| format_units(black_box(value), NATIVE_DECIMALS))
    });
    group.finish();
}

fn bench_pipeline(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let owner = Address::from_evm([0x11; 20]);
    let request = TransferRequest::builder(SOURCE, DESTINATION, owner)
        .amount(1_000_000u64)
        .build()
        .unwrap();
    let never = CancelSignal::never();

    let mut group = c.benchmark_group("pipeline");

    let dry = service(OrchestratorConfig::default().with_dry_run(true));
    group.bench_function("dry_run", |b| {
        b.to_async(&rt)
            .iter(|| dry.transfer(black_box(&request), owner, &never))
    });

    let unwatched = service(OrchestratorConfig::default().with_max_poll_attempts(0));
    group.bench_function("submit_unwatched", |b| {
        b.to_async(&rt)
            .iter(|| unwatched.transfer(black_box(&request), owner, &never))
    });

    let wired = service(OrchestratorConfig::default());
    rt.block_on(wired.wire());
    group.bench_function("wire_noop", |b| b.to_async(&rt).iter(|| wired.wire()));

    group.finish();
}

criterion_group!(benches, bench_units, bench_pipeline);
criterion_main!(benches);
