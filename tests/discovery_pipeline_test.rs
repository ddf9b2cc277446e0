//! Discovery pipeline tests: filesystem round trip, deterministic output,
//! issue surfacing and cancellation.

mod common;

use common::{lab_fabric, outer_entry, with_bridge_domain};
use dnaas_fabric::domain::ArtifactSource;
use dnaas_fabric::normalize::DeviceNameNormalizer;
use dnaas_fabric::persistence::{FsArtifactSource, StateStore};
use dnaas_fabric::{DiscoveryLimits, DiscoveryOrchestrator, FabricConfig, FabricService};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

async fn write_artifacts(dir: &std::path::Path, artifacts: &[dnaas_fabric::ParsedDeviceArtifact]) {
    for artifact in artifacts {
        let rendered = serde_yaml::to_string(artifact).unwrap();
        tokio::fs::write(dir.join(format!("{}.yaml", artifact.device)), rendered)
            .await
            .unwrap();
    }
}

fn discovery_fixture() -> Vec<dnaas_fabric::ParsedDeviceArtifact> {
    let mut artifacts = lab_fabric();
    for artifact in artifacts.iter_mut() {
        if artifact.device == "DNAAS-LEAF-A01" {
            with_bridge_domain(
                artifact,
                "g_visaev_v253_lab",
                &["bundle-100.253"],
                vec![outer_entry("bundle-100.253", 253)],
            );
        }
        if artifact.device == "DNAAS-LEAF-A02" {
            with_bridge_domain(
                artifact,
                "visaev_253_probe",
                &["bundle-100.253"],
                vec![outer_entry("bundle-100.253", 253)],
            );
        }
    }
    artifacts
}

#[tokio::test]
async fn end_to_end_from_disk() {
    let dir = tempfile::tempdir().unwrap();
    write_artifacts(dir.path(), &discovery_fixture()).await;

    let source = FsArtifactSource::new(dir.path());
    assert_eq!(source.list_devices().await.unwrap().len(), 8);

    let orchestrator = DiscoveryOrchestrator::new(
        Arc::new(DeviceNameNormalizer::new()),
        DiscoveryLimits::default(),
    );
    let outcome = orchestrator
        .run(&source, &CancellationToken::new())
        .await
        .unwrap();

    assert!(!outcome.cancelled);
    assert_eq!(outcome.summary.device_count, 8);
    assert_eq!(outcome.summary.bridge_domain_count, 2);
    assert_eq!(outcome.summary.consolidated_count, 1);
    assert_eq!(outcome.consolidated[0].consolidated_name, "g_visaev_v253");
    assert_eq!(outcome.consolidated[0].devices.len(), 2);
    // The lab fabric has no LLDP tables, only bundle records
    assert!(!outcome.topology_report.lldp_gaps.is_empty());
}

#[tokio::test]
async fn repeated_discovery_is_byte_identical() {
    let dir = tempfile::tempdir().unwrap();
    write_artifacts(dir.path(), &discovery_fixture()).await;
    let source = FsArtifactSource::new(dir.path());

    let mut reports = Vec::new();
    for _ in 0..2 {
        let orchestrator = DiscoveryOrchestrator::new(
            Arc::new(DeviceNameNormalizer::new()),
            DiscoveryLimits::default(),
        );
        let outcome = orchestrator
            .run(&source, &CancellationToken::new())
            .await
            .unwrap();
        reports.push(serde_json::to_string(&outcome.consolidated).unwrap());
    }
    assert_eq!(reports[0], reports[1]);
}

#[tokio::test]
async fn cancellation_yields_partial_outcome() {
    let dir = tempfile::tempdir().unwrap();
    write_artifacts(dir.path(), &discovery_fixture()).await;
    let source = FsArtifactSource::new(dir.path());

    let orchestrator = DiscoveryOrchestrator::new(
        Arc::new(DeviceNameNormalizer::new()),
        DiscoveryLimits::default(),
    );
    let cancel = CancellationToken::new();
    cancel.cancel();
    let outcome = orchestrator.run(&source, &cancel).await.unwrap();
    assert!(outcome.cancelled);
    assert!(outcome.consolidated.is_empty());
}

#[tokio::test]
async fn service_persists_state_after_discovery() {
    let data_dir = tempfile::tempdir().unwrap();
    let work_dir = tempfile::tempdir().unwrap();
    write_artifacts(data_dir.path(), &discovery_fixture()).await;

    let service = FabricService::new(FabricConfig::new(data_dir.path(), work_dir.path()))
        .await
        .unwrap();
    let report = service.discover(&CancellationToken::new()).await.unwrap();
    assert!(!report.cancelled);
    assert_eq!(report.consolidated.len(), 1);

    let store = StateStore::new(work_dir.path());
    let snapshot = store.load_snapshot().await.unwrap().unwrap();
    assert_eq!(snapshot.devices.len(), report.topology.devices.len());
    let maps = store.load_normalization_maps().await.unwrap().unwrap();
    assert!(maps.name_mappings.contains_key("DNAAS-LEAF-A01"));

    // A fresh service restores the learned names
    let service = FabricService::new(FabricConfig::new(data_dir.path(), work_dir.path()))
        .await
        .unwrap();
    assert_eq!(
        service.normalizer().normalize("DNAAS-LEAF-A01"),
        "DNAAS-LEAF-A01"
    );
}

#[tokio::test]
async fn build_service_through_application_layer() {
    let data_dir = tempfile::tempdir().unwrap();
    let work_dir = tempfile::tempdir().unwrap();
    write_artifacts(data_dir.path(), &lab_fabric()).await;

    let service = FabricService::new(FabricConfig::new(data_dir.path(), work_dir.path()))
        .await
        .unwrap();
    let request = dnaas_fabric::ServiceRequest {
        service_name: "g_u_v100".into(),
        vlan_id: 100,
        source: dnaas_fabric::Endpoint::new("DNAAS-LEAF-A01", "ge100-0/0/10"),
        destinations: vec![dnaas_fabric::Endpoint::new("DNAAS-LEAF-A02", "ge100-0/0/20")],
    };
    let artifact = service
        .build_service(&request, &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(artifact.per_device_commands.len(), 3);
    assert_eq!(artifact.command_count(), 18);
}
