//! # Fabric Audit
//!
//! Exercises path computation and configuration synthesis across leaf
//! pairs of a built topology and reports per-pair outcomes. Used as a
//! health check after discovery: a drop in the pass rate points at broken
//! bundle records or lost spine connectivity before any operator request
//! does.

use crate::config::ConfigSynthesizer;
use crate::domain::{CoreError, Endpoint, ServiceRequest};
use crate::normalize::DeviceNameNormalizer;
use crate::path::PathEngine;
use crate::topology::TopologyGraph;
use crate::validation::RequestValidator;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

/// Outcome of one audited leaf pair
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PairAudit {
    /// Source leaf canonical name
    pub source: String,
    /// Destination leaf canonical name
    pub destination: String,
    /// Whether a path plus a full configuration could be produced
    pub passed: bool,
    /// `two_tier` / `three_tier` when a path exists
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tier: Option<String>,
    /// Failure detail when the pair failed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Aggregate audit result
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AuditReport {
    /// Pairs exercised
    pub pairs_tested: usize,
    /// Pairs that produced a complete configuration
    pub passed: usize,
    /// Pairs that failed
    pub failed: usize,
    /// passed / tested
    pub pass_rate: f64,
    /// Failing pairs only, ascending by (source, destination)
    pub failures: Vec<PairAudit>,
}

/// Exercises the build pipeline over every leaf pair
pub struct FabricAuditor<'a> {
    graph: &'a TopologyGraph,
    normalizer: &'a DeviceNameNormalizer,
    pair_limit: usize,
}

impl<'a> FabricAuditor<'a> {
    /// An auditor over a built topology; audits every pair by default
    pub fn new(graph: &'a TopologyGraph, normalizer: &'a DeviceNameNormalizer) -> Self {
        Self {
            graph,
            normalizer,
            pair_limit: usize::MAX,
        }
    }

    /// Cap the number of pairs exercised (large fabrics)
    pub fn with_pair_limit(mut self, limit: usize) -> Self {
        self.pair_limit = limit;
        self
    }

    /// Probe every ordered leaf pair: compute the path and synthesize a
    /// throwaway configuration. The probe VLAN never leaves this process.
    pub fn audit(&self, cancel: &CancellationToken) -> Result<AuditReport, CoreError> {
        let engine = PathEngine::new(self.graph);
        let sources = engine.available_sources();

        let mut report = AuditReport::default();
        'outer: for source in &sources {
            for dest in &sources {
                if source == dest {
                    continue;
                }
                if report.pairs_tested >= self.pair_limit {
                    break 'outer;
                }
                if cancel.is_cancelled() {
                    return Err(CoreError::Cancelled);
                }
                report.pairs_tested += 1;
                match self.probe_pair(source.raw(), dest.raw(), cancel) {
                    Ok(tier) => {
                        report.passed += 1;
                        tracing::debug!(
                            source = %source.canonical(),
                            dest = %dest.canonical(),
                            tier,
                            "audit pair passed"
                        );
                    }
                    Err(error) => {
                        report.failed += 1;
                        report.failures.push(PairAudit {
                            source: source.canonical().to_string(),
                            destination: dest.canonical().to_string(),
                            passed: false,
                            tier: None,
                            error: Some(error.to_string()),
                        });
                    }
                }
            }
        }
        report.pass_rate = if report.pairs_tested == 0 {
            0.0
        } else {
            report.passed as f64 / report.pairs_tested as f64
        };
        report
            .failures
            .sort_by(|a, b| (&a.source, &a.destination).cmp(&(&b.source, &b.destination)));
        tracing::info!(
            tested = report.pairs_tested,
            passed = report.passed,
            failed = report.failed,
            "fabric audit complete"
        );
        Ok(report)
    }

    fn probe_pair(
        &self,
        source: &str,
        dest: &str,
        cancel: &CancellationToken,
    ) -> Result<&'static str, CoreError> {
        let source_port = self
            .first_access_port(source)
            .ok_or_else(|| CoreError::DataGap(format!("no access port known on '{source}'")))?;
        let dest_port = self
            .first_access_port(dest)
            .ok_or_else(|| CoreError::DataGap(format!("no access port known on '{dest}'")))?;

        let request = ServiceRequest {
            service_name: "audit_probe".to_string(),
            vlan_id: 4094,
            source: Endpoint::new(source, source_port),
            destinations: vec![Endpoint::new(dest, dest_port)],
        };
        let validated = RequestValidator::new(self.graph, self.normalizer).validate(&request)?;
        let artifact = ConfigSynthesizer::new(self.graph).synthesize(&validated, cancel)?;
        Ok(match artifact.per_device_commands.len() {
            3 => "two_tier",
            _ => "three_tier",
        })
    }

    /// Lowest-named physical port on the device that is not a bundle
    /// member (those are transit, not access).
    fn first_access_port(&self, device: &str) -> Option<String> {
        let key = self.normalizer.canonical_key(device);
        let ix = self.graph.node_by_key(&key)?;
        self.graph
            .interfaces_on(ix)
            .into_iter()
            .filter(|info| info.kind == crate::domain::InterfaceKind::Physical)
            .find(|info| self.graph.bundle_for_interface(ix, &info.name).is_none())
            .map(|info| info.name.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{BundlePeer, BundleRecord, ParsedDeviceArtifact};
    use crate::topology::TopologyBuilder;

    fn leaf(name: &str, member: &str, spine_port: &str, user_port: &str) -> ParsedDeviceArtifact {
        let mut artifact = ParsedDeviceArtifact::new(name);
        artifact.interfaces = vec![user_port.into()];
        artifact.bundles.push(BundleRecord {
            name: "bundle-100".into(),
            device: name.into(),
            members: vec![member.into()],
            peers: vec![BundlePeer {
                remote_device: "DNAAS-SPINE-B08".into(),
                local_interface: member.into(),
                remote_interface: spine_port.into(),
            }],
        });
        artifact
    }

    fn spine_bundles() -> ParsedDeviceArtifact {
        let mut artifact = ParsedDeviceArtifact::new("DNAAS-SPINE-B08");
        for (bundle, member) in [("bundle-101", "ge100-0/0/21"), ("bundle-102", "ge100-0/0/22")] {
            artifact.bundles.push(BundleRecord {
                name: bundle.into(),
                device: "DNAAS-SPINE-B08".into(),
                members: vec![member.into()],
                peers: vec![],
            });
        }
        artifact
    }

    #[test]
    fn healthy_fabric_passes_all_pairs() {
        let normalizer = DeviceNameNormalizer::new();
        let artifacts = vec![
            leaf("DNAAS-LEAF-A01", "ge100-0/0/1", "ge100-0/0/21", "ge100-0/0/10"),
            leaf("DNAAS-LEAF-A02", "ge100-0/0/2", "ge100-0/0/22", "ge100-0/0/20"),
            spine_bundles(),
        ];
        let (graph, _) = TopologyBuilder::new(&normalizer).build(&artifacts);
        let report = FabricAuditor::new(&graph, &normalizer)
            .audit(&CancellationToken::new())
            .unwrap();
        assert_eq!(report.pairs_tested, 2);
        assert_eq!(report.passed, 2);
        assert!(report.failures.is_empty());
        assert!((report.pass_rate - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn missing_spine_bundle_shows_up_as_failure() {
        let normalizer = DeviceNameNormalizer::new();
        // The spine has no bundle records: every pair must fail the
        // bundles-only rule on the transit device
        let artifacts = vec![
            leaf("DNAAS-LEAF-A01", "ge100-0/0/1", "ge100-0/0/21", "ge100-0/0/10"),
            leaf("DNAAS-LEAF-A02", "ge100-0/0/2", "ge100-0/0/22", "ge100-0/0/20"),
        ];
        let (graph, _) = TopologyBuilder::new(&normalizer).build(&artifacts);
        let report = FabricAuditor::new(&graph, &normalizer)
            .audit(&CancellationToken::new())
            .unwrap();
        assert_eq!(report.pairs_tested, 2);
        assert_eq!(report.failed, 2);
        assert!(report.failures[0]
            .error
            .as_deref()
            .unwrap()
            .contains("must use bundles"));
    }

    #[test]
    fn pair_limit_caps_the_sweep() {
        let normalizer = DeviceNameNormalizer::new();
        let artifacts = vec![
            leaf("DNAAS-LEAF-A01", "ge100-0/0/1", "ge100-0/0/21", "ge100-0/0/10"),
            leaf("DNAAS-LEAF-A02", "ge100-0/0/2", "ge100-0/0/22", "ge100-0/0/20"),
            spine_bundles(),
        ];
        let (graph, _) = TopologyBuilder::new(&normalizer).build(&artifacts);
        let report = FabricAuditor::new(&graph, &normalizer)
            .with_pair_limit(1)
            .audit(&CancellationToken::new())
            .unwrap();
        assert_eq!(report.pairs_tested, 1);
    }
}
