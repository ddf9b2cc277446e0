//! The discovery pipeline.
//!
//! Loads parsed device artifacts with bounded I/O concurrency, builds the
//! topology under a single writer, fans bridge-domain detection out across
//! devices through a results channel, then reduces classification,
//! identifier extraction and consolidation on one thread. Cancellation
//! drains the in-flight work and returns a partial result.

use crate::discovery::classifier::{DnaasClassifier, OuterVlanUsage};
use crate::discovery::consolidation::{
    ClassifiedBridgeDomain, ConsolidatedBridgeDomain, ConsolidatedInterface, ConsolidationEngine,
};
use crate::discovery::detector::{BridgeDomainDetector, BridgeDomainFragment};
use crate::discovery::global_id::{ConsolidationScope, GlobalIdentifierExtractor};
use crate::discovery::roles::InterfaceRoleAnalyzer;
use crate::domain::{
    ArtifactSource, CoreError, DeviceRole, Issue, IssueKind, ParsedDeviceArtifact,
};
use crate::normalize::DeviceNameNormalizer;
use crate::path::PathEngine;
use crate::topology::{TopologyBuilder, TopologyGraph, TopologySnapshot, TopologyValidationReport};
use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Worker-pool bounds for a discovery run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscoveryLimits {
    /// Concurrent artifact reads
    pub io_workers: usize,
    /// Concurrent per-device detection tasks
    pub cpu_workers: usize,
}

impl Default for DiscoveryLimits {
    fn default() -> Self {
        Self {
            io_workers: 8,
            cpu_workers: 8,
        }
    }
}

/// Aggregate counts for one discovery run
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DiscoverySummary {
    /// Unique id of this run
    pub session_id: String,
    /// Run start
    pub started_at: Option<DateTime<Utc>>,
    /// Run end
    pub finished_at: Option<DateTime<Utc>>,
    /// Devices with artifacts
    pub device_count: usize,
    /// Devices by role
    pub devices_by_role: BTreeMap<String, usize>,
    /// Detected bridge-domain groups
    pub bridge_domain_count: usize,
    /// Consolidated services
    pub consolidated_count: usize,
    /// Consolidated services by DNAAS type code
    pub types: BTreeMap<String, usize>,
}

/// Everything a discovery run produces
#[derive(Debug)]
pub struct DiscoveryOutcome {
    /// Aggregate counts
    pub summary: DiscoverySummary,
    /// The built topology (read-only from here on)
    pub graph: Arc<TopologyGraph>,
    /// Topology construction findings
    pub topology_report: TopologyValidationReport,
    /// Serializable topology record
    pub snapshot: TopologySnapshot,
    /// Consolidated bridge domains, ascending by name
    pub consolidated: Vec<ConsolidatedBridgeDomain>,
    /// Run-level warnings and skips
    pub issues: Vec<Issue>,
    /// True when the run was cut short
    pub cancelled: bool,
}

/// Runs the discovery pipeline against an artifact source
pub struct DiscoveryOrchestrator {
    normalizer: Arc<DeviceNameNormalizer>,
    limits: DiscoveryLimits,
}

impl DiscoveryOrchestrator {
    /// An orchestrator sharing the run's normalizer
    pub fn new(normalizer: Arc<DeviceNameNormalizer>, limits: DiscoveryLimits) -> Self {
        Self { normalizer, limits }
    }

    /// Execute a full discovery pass.
    ///
    /// I/O failures abort; cancellation returns the partial outcome with
    /// `cancelled = true`.
    pub async fn run(
        &self,
        source: &dyn ArtifactSource,
        cancel: &CancellationToken,
    ) -> Result<DiscoveryOutcome, CoreError> {
        let started_at = Utc::now();
        let session_id = uuid::Uuid::new_v4().to_string();
        tracing::info!(%session_id, "starting discovery run");

        // Phase 1: bounded artifact loading
        let devices = source.list_devices().await?;
        let artifacts = self.load_artifacts(source, &devices, cancel).await?;
        if cancel.is_cancelled() {
            return Ok(self.partial(session_id, started_at, artifacts));
        }

        // Phase 2: topology under one writer, published immutable
        let builder = TopologyBuilder::new(&self.normalizer);
        let (graph, topology_report) = builder.build(&artifacts);
        let graph = Arc::new(graph);

        // Phase 3: per-device detection fan-out, single-threaded reduce
        let fragments = self.detect_fragments(&artifacts, cancel).await;
        let groups = BridgeDomainDetector::group_fragments(fragments);
        if cancel.is_cancelled() {
            let mut outcome = self.partial(session_id, started_at, artifacts);
            outcome.graph = graph;
            outcome.topology_report = topology_report;
            return Ok(outcome);
        }

        // Phase 4: classification, roles, identifiers, consolidation
        let usage = OuterVlanUsage::survey(&groups);
        let role_analyzer = InterfaceRoleAnalyzer::new(&graph);
        let mut issues: Vec<Issue> = topology_report.issues.clone();
        let mut classified = Vec::with_capacity(groups.len());

        for group in groups.iter() {
            let classification = DnaasClassifier::classify(group, &usage);
            if classification.dnaas_type == crate::discovery::classifier::DnaasType::Unknown {
                issues.push(Issue::new(
                    IssueKind::ClassificationAmbiguity,
                    format!(
                        "bridge domain '{}' has conflicting VLAN facts; kept with confidence {:.2}",
                        group.name, classification.confidence
                    ),
                ));
            }
            let global_id = GlobalIdentifierExtractor::extract(group, classification.dnaas_type);
            let username = GlobalIdentifierExtractor::extract_username(&group.name);
            let interfaces = self.resolve_interfaces(group, &graph, &role_analyzer, &mut issues);
            classified.push(ClassifiedBridgeDomain {
                group: group.clone(),
                classification,
                global_id,
                username,
                interfaces,
            });
        }

        let bridge_domain_count = groups.len();
        let mut consolidated = ConsolidationEngine::consolidate(classified);
        for bd in &consolidated {
            issues.extend(bd.issues.iter().cloned());
        }

        // Phase 5: report paths between consolidated endpoints
        let engine = PathEngine::new(&graph);
        for bd in &mut consolidated {
            if bd.scope == ConsolidationScope::Local {
                continue;
            }
            Self::attach_paths(bd, &engine, &graph, &mut issues);
        }

        let snapshot = TopologySnapshot::capture(&graph, &topology_report, started_at);
        let summary = self.summarize(
            session_id,
            started_at,
            &artifacts,
            bridge_domain_count,
            &consolidated,
        );
        tracing::info!(
            devices = summary.device_count,
            bridge_domains = summary.bridge_domain_count,
            consolidated = summary.consolidated_count,
            "discovery run complete"
        );

        Ok(DiscoveryOutcome {
            summary,
            graph,
            topology_report,
            snapshot,
            consolidated,
            issues,
            cancelled: false,
        })
    }

    async fn load_artifacts(
        &self,
        source: &dyn ArtifactSource,
        devices: &[String],
        cancel: &CancellationToken,
    ) -> Result<Vec<ParsedDeviceArtifact>, CoreError> {
        let loaded: Vec<Result<Option<ParsedDeviceArtifact>, CoreError>> =
            stream::iter(devices.iter().cloned())
                .map(|device| async move {
                    if cancel.is_cancelled() {
                        return Ok(None);
                    }
                    source.load_device(&device).await.map(Some)
                })
                .buffer_unordered(self.limits.io_workers.max(1))
                .collect()
                .await;

        let mut artifacts = Vec::with_capacity(devices.len());
        for result in loaded {
            if let Some(artifact) = result? {
                artifacts.push(artifact);
            }
        }
        // Deterministic downstream ordering regardless of I/O completion
        artifacts.sort_by(|a, b| a.device.cmp(&b.device));
        Ok(artifacts)
    }

    async fn detect_fragments(
        &self,
        artifacts: &[ParsedDeviceArtifact],
        cancel: &CancellationToken,
    ) -> Vec<BridgeDomainFragment> {
        let (tx, mut rx) = mpsc::channel::<Vec<BridgeDomainFragment>>(self.limits.cpu_workers.max(1));

        let mut handles = Vec::new();
        for chunk in artifacts.chunks(chunk_size(artifacts.len(), self.limits.cpu_workers)) {
            let chunk = chunk.to_vec();
            let normalizer = Arc::clone(&self.normalizer);
            let tx = tx.clone();
            let cancel = cancel.clone();
            handles.push(tokio::spawn(async move {
                if cancel.is_cancelled() {
                    return;
                }
                let detector = BridgeDomainDetector::new(&normalizer);
                let mut fragments = Vec::new();
                for artifact in &chunk {
                    fragments.extend(detector.detect_device(artifact));
                }
                let _ = tx.send(fragments).await;
            }));
        }
        drop(tx);

        let mut all = Vec::new();
        while let Some(batch) = rx.recv().await {
            all.extend(batch);
        }
        for handle in handles {
            let _ = handle.await;
        }
        all
    }

    fn resolve_interfaces(
        &self,
        group: &crate::discovery::detector::BridgeDomainGroup,
        graph: &TopologyGraph,
        analyzer: &InterfaceRoleAnalyzer<'_>,
        issues: &mut Vec<Issue>,
    ) -> Vec<ConsolidatedInterface> {
        let mut out = Vec::new();
        for fragment in &group.fragments {
            let node = graph.node_by_key(fragment.device.key());
            for interface in &fragment.interfaces {
                let decision = match node {
                    Some(ix) => analyzer.assign(ix, &interface.name),
                    None => crate::discovery::roles::RoleDecision {
                        role: None,
                        ambiguous: true,
                        detail: Some(format!(
                            "device {} is not in the topology",
                            fragment.device.canonical()
                        )),
                    },
                };
                if decision.ambiguous {
                    if let Some(detail) = &decision.detail {
                        issues.push(Issue::new(IssueKind::DataGap, detail.clone()));
                    }
                }
                out.push(ConsolidatedInterface {
                    device: fragment.device.canonical().to_string(),
                    name: interface.name.clone(),
                    role: decision.role,
                    ambiguous: decision.ambiguous,
                    vlan_facts: interface.vlan.clone(),
                });
            }
        }
        out.sort_by(|a, b| (&a.device, &a.name).cmp(&(&b.device, &b.name)));
        out
    }

    fn attach_paths(
        bd: &mut ConsolidatedBridgeDomain,
        engine: &PathEngine<'_>,
        graph: &TopologyGraph,
        issues: &mut Vec<Issue>,
    ) {
        let ids: Vec<_> = bd
            .devices
            .iter()
            .filter_map(|canonical| {
                graph
                    .devices()
                    .into_iter()
                    .find(|d| d.id.canonical() == canonical.as_str())
                    .map(|d| (d.id.clone(), d.role))
            })
            .collect();

        for (i, (a, a_role)) in ids.iter().enumerate() {
            for (b, b_role) in ids.iter().skip(i + 1) {
                let result = match (*a_role, *b_role) {
                    (DeviceRole::Leaf, DeviceRole::Leaf) => engine.calculate_path(a, b),
                    (DeviceRole::Leaf, DeviceRole::Superspine) => {
                        engine.calculate_path_to_superspine(a, b)
                    }
                    (DeviceRole::Superspine, DeviceRole::Leaf) => {
                        engine.calculate_path_to_superspine(b, a)
                    }
                    // Spine-resident fragments are transit artifacts; no
                    // endpoint pair to report
                    _ => continue,
                };
                match result {
                    Ok(path) => bd.paths.push(path),
                    Err(failure) => issues.push(Issue::new(
                        IssueKind::PathFailure,
                        format!(
                            "{}: no path between {} and {}: {}",
                            bd.consolidated_name,
                            a.canonical(),
                            b.canonical(),
                            failure
                        ),
                    )),
                }
            }
        }
    }

    fn summarize(
        &self,
        session_id: String,
        started_at: DateTime<Utc>,
        artifacts: &[ParsedDeviceArtifact],
        bridge_domain_count: usize,
        consolidated: &[ConsolidatedBridgeDomain],
    ) -> DiscoverySummary {
        let mut devices_by_role: BTreeMap<String, usize> = BTreeMap::new();
        for artifact in artifacts {
            let canonical = self.normalizer.normalize(&artifact.device);
            let role = DeviceRole::from_canonical_name(&canonical);
            *devices_by_role.entry(role.to_string()).or_insert(0) += 1;
        }
        let mut types: BTreeMap<String, usize> = BTreeMap::new();
        for bd in consolidated {
            *types.entry(bd.dnaas_type.code().to_string()).or_insert(0) += 1;
        }
        DiscoverySummary {
            session_id,
            started_at: Some(started_at),
            finished_at: Some(Utc::now()),
            device_count: artifacts.len(),
            devices_by_role,
            bridge_domain_count,
            consolidated_count: consolidated.len(),
            types,
        }
    }

    fn partial(
        &self,
        session_id: String,
        started_at: DateTime<Utc>,
        artifacts: Vec<ParsedDeviceArtifact>,
    ) -> DiscoveryOutcome {
        tracing::warn!(%session_id, "discovery cancelled; returning partial outcome");
        DiscoveryOutcome {
            summary: self.summarize(session_id, started_at, &artifacts, 0, &[]),
            graph: Arc::new(TopologyGraph::default()),
            topology_report: TopologyValidationReport::default(),
            snapshot: TopologySnapshot::default(),
            consolidated: Vec::new(),
            issues: Vec::new(),
            cancelled: true,
        }
    }
}

fn chunk_size(total: usize, workers: usize) -> usize {
    (total / workers.max(1)).max(1)
}
