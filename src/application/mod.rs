//! # Application Service Layer
//!
//! Wires the pipeline together for one run: a normalizer and its persisted
//! maps, the artifact source, discovery, validation and synthesis. All
//! services are constructed here and injected; no module-level state
//! exists anywhere in the core.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                     FabricService                        │
//! │   discover ──► topology ──► detect ──► consolidate       │
//! │   build-p2p / build-p2mp ──► validate ──► synthesize     │
//! └──────────────────────────────────────────────────────────┘
//! ```

use crate::config::{ConfigArtifact, ConfigSynthesizer};
use crate::discovery::{
    ConsolidatedBridgeDomain, DiscoveryLimits, DiscoveryOrchestrator, DiscoverySummary,
};
use crate::domain::{ArtifactSource, CoreError, Issue, ServiceRequest};
use crate::normalize::{DeviceNameNormalizer, NormalizationReport};
use crate::persistence::{FsArtifactSource, StateStore};
use crate::topology::{TopologyBuilder, TopologyGraph, TopologySnapshot};
use crate::validation::RequestValidator;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Runtime configuration for the fabric core
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FabricConfig {
    /// Directory holding per-device parsed artifacts
    pub parsed_data_dir: PathBuf,
    /// Working directory for persisted state and outputs
    pub work_dir: PathBuf,
    /// Discovery worker-pool bounds
    #[serde(default)]
    pub limits: DiscoveryLimits,
    /// Service-name length bound
    #[serde(default = "default_service_name_limit")]
    pub service_name_limit: usize,
}

fn default_service_name_limit() -> usize {
    crate::domain::DEFAULT_SERVICE_NAME_LIMIT
}

impl FabricConfig {
    /// A configuration with defaults for everything but the directories
    pub fn new(parsed_data_dir: impl Into<PathBuf>, work_dir: impl Into<PathBuf>) -> Self {
        Self {
            parsed_data_dir: parsed_data_dir.into(),
            work_dir: work_dir.into(),
            limits: DiscoveryLimits::default(),
            service_name_limit: default_service_name_limit(),
        }
    }
}

/// Serializable discovery result: the outbound consolidated report
#[derive(Debug, Serialize, Deserialize)]
pub struct DiscoveryReport {
    /// Aggregate counts
    pub summary: DiscoverySummary,
    /// Topology record
    pub topology: TopologySnapshot,
    /// Consolidated bridge domains, ascending by name
    pub consolidated: Vec<ConsolidatedBridgeDomain>,
    /// What name normalization did during the run
    pub normalization: NormalizationReport,
    /// Run warnings and skips
    pub issues: Vec<Issue>,
    /// Cut short by cancellation
    pub cancelled: bool,
}

/// Orchestrates the core pipeline for a host application
pub struct FabricService {
    config: FabricConfig,
    normalizer: Arc<DeviceNameNormalizer>,
}

impl FabricService {
    /// Create a service, restoring the persisted normalization map when
    /// one exists under the working directory.
    pub async fn new(config: FabricConfig) -> Result<Self, CoreError> {
        let store = StateStore::new(&config.work_dir);
        let normalizer = match store.load_normalization_maps().await? {
            Some(maps) => {
                tracing::info!("restored persisted normalization map");
                DeviceNameNormalizer::from_maps(&maps)
            }
            None => DeviceNameNormalizer::new(),
        };
        Ok(Self {
            config,
            normalizer: Arc::new(normalizer),
        })
    }

    /// The injected normalizer (shared with every component of the run)
    pub fn normalizer(&self) -> &Arc<DeviceNameNormalizer> {
        &self.normalizer
    }

    /// Run a discovery pass and persist the snapshot and normalization map.
    ///
    /// Nothing is persisted when the run was cancelled; the partial report
    /// is still returned with `cancelled = true`.
    pub async fn discover(&self, cancel: &CancellationToken) -> Result<DiscoveryReport, CoreError> {
        let source = FsArtifactSource::new(&self.config.parsed_data_dir);
        let orchestrator =
            DiscoveryOrchestrator::new(Arc::clone(&self.normalizer), self.config.limits.clone());
        let outcome = orchestrator.run(&source, cancel).await?;

        let normalization = self
            .normalizer
            .report(&outcome.topology_report.unreachable_devices);
        let report = DiscoveryReport {
            summary: outcome.summary,
            topology: outcome.snapshot,
            consolidated: outcome.consolidated,
            normalization,
            issues: outcome.issues,
            cancelled: outcome.cancelled,
        };

        if !report.cancelled {
            let store = StateStore::new(&self.config.work_dir);
            store.store_snapshot(&report.topology).await?;
            store
                .store_normalization_maps(&self.normalizer.export_maps())
                .await?;
        }
        Ok(report)
    }

    /// Build the configuration artifact for a P2P or P2MP request.
    pub async fn build_service(
        &self,
        request: &ServiceRequest,
        cancel: &CancellationToken,
    ) -> Result<ConfigArtifact, CoreError> {
        let source = FsArtifactSource::new(&self.config.parsed_data_dir);
        let graph = self.build_graph(&source, cancel).await?;
        self.build_service_on(&graph, request, cancel)
    }

    /// Synthesis against an already-built topology (reentrant; used by
    /// hosts serving concurrent requests off one snapshot).
    pub fn build_service_on(
        &self,
        graph: &TopologyGraph,
        request: &ServiceRequest,
        cancel: &CancellationToken,
    ) -> Result<ConfigArtifact, CoreError> {
        let validator = RequestValidator::new(graph, &self.normalizer)
            .with_service_name_limit(self.config.service_name_limit);
        let validated = validator.validate(request)?;
        ConfigSynthesizer::new(graph).synthesize(&validated, cancel)
    }

    /// Load artifacts and build the topology once, under a single writer.
    pub async fn build_graph(
        &self,
        source: &dyn ArtifactSource,
        cancel: &CancellationToken,
    ) -> Result<TopologyGraph, CoreError> {
        let devices = source.list_devices().await?;
        let mut artifacts = Vec::with_capacity(devices.len());
        for device in &devices {
            if cancel.is_cancelled() {
                return Err(CoreError::Cancelled);
            }
            artifacts.push(source.load_device(device).await?);
        }
        let (graph, report) = TopologyBuilder::new(&self.normalizer).build(&artifacts);
        if !report.is_clean() {
            tracing::warn!(
                invalid_links = report.invalid_links.len(),
                lldp_gaps = report.lldp_gaps.len(),
                "topology built with findings"
            );
        }
        Ok(graph)
    }
}
