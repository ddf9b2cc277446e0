//! Path-engine micro-benchmarks over a synthetic fabric.

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use dnaas_fabric::domain::{BundlePeer, BundleRecord, ParsedDeviceArtifact};
use dnaas_fabric::normalize::DeviceNameNormalizer;
use dnaas_fabric::path::{calculate_p2mp_paths, PathEngine};
use dnaas_fabric::topology::{TopologyBuilder, TopologyGraph};
use tokio_util::sync::CancellationToken;

fn synthetic_fabric(normalizer: &DeviceNameNormalizer, leaves: usize) -> TopologyGraph {
    let mut artifacts = Vec::new();
    for i in 0..leaves {
        let name = format!("DNAAS-LEAF-A{i:02}");
        // Odd leaves on spine B08, even leaves on spine D14
        let spine = if i % 2 == 0 { "DNAAS-SPINE-D14" } else { "DNAAS-SPINE-B08" };
        let mut artifact = ParsedDeviceArtifact::new(&name);
        artifact.bundles.push(BundleRecord {
            name: "bundle-100".into(),
            device: name.clone(),
            members: vec![format!("ge100-0/0/{i}")],
            peers: vec![BundlePeer {
                remote_device: spine.into(),
                local_interface: format!("ge100-0/0/{i}"),
                remote_interface: format!("ge100-0/0/{}", 100 + i),
            }],
        });
        artifacts.push(artifact);
    }
    for spine in ["DNAAS-SPINE-B08", "DNAAS-SPINE-D14"] {
        let mut artifact = ParsedDeviceArtifact::new(spine);
        artifact.bundles.push(BundleRecord {
            name: "bundle-500".into(),
            device: spine.into(),
            members: vec!["ge100-4/0/1".into()],
            peers: vec![BundlePeer {
                remote_device: "DNAAS-SUPERSPINE-D04".into(),
                local_interface: "ge100-4/0/1".into(),
                remote_interface: format!("ge100-5/0/{}", if spine.ends_with("B08") { 1 } else { 2 }),
            }],
        });
        artifacts.push(artifact);
    }
    TopologyBuilder::new(normalizer).build(&artifacts).0
}

fn bench_paths(c: &mut Criterion) {
    let normalizer = DeviceNameNormalizer::new();
    let mut group = c.benchmark_group("path_engine");
    for leaves in [16usize, 64, 256] {
        let graph = synthetic_fabric(&normalizer, leaves);
        let engine = PathEngine::new(&graph);
        let src = normalizer.device_id("DNAAS-LEAF-A01");
        let dst_shared = normalizer.device_id("DNAAS-LEAF-A03");
        let dst_crossed = normalizer.device_id("DNAAS-LEAF-A02");

        group.bench_with_input(BenchmarkId::new("p2p_2tier", leaves), &leaves, |b, _| {
            b.iter(|| engine.calculate_path(&src, &dst_shared).unwrap())
        });
        group.bench_with_input(BenchmarkId::new("p2p_3tier", leaves), &leaves, |b, _| {
            b.iter(|| engine.calculate_path(&src, &dst_crossed).unwrap())
        });

        let destinations: Vec<_> = (2..leaves)
            .map(|i| normalizer.device_id(&format!("DNAAS-LEAF-A{i:02}")))
            .collect();
        group.bench_with_input(BenchmarkId::new("p2mp_plan", leaves), &leaves, |b, _| {
            let cancel = CancellationToken::new();
            b.iter(|| calculate_p2mp_paths(&engine, &src, &destinations, &cancel))
        });
    }
    group.finish();
}

criterion_group!(benches, bench_paths);
criterion_main!(benches);
