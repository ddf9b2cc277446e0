//! Builds the fabric graph from per-device neighbor and bundle records.
//!
//! Bundle-recorded connections are the primary link source; a bare LLDP
//! adjacency only becomes a link when no bundle claims the interface. When
//! the two disagree on a peer the bundle record wins and the disagreement
//! is reported as a discrepancy.

use crate::domain::{
    DeviceId, DeviceRole, DeviceStatus, Issue, IssueKind, ParsedDeviceArtifact,
};
use crate::normalize::DeviceNameNormalizer;
use crate::topology::graph::{DeviceNode, LinkKind, TopologyGraph};
use petgraph::graph::NodeIndex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// An illegal link found during construction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvalidLinkReport {
    /// One end
    pub a_device: String,
    /// Interface on that end
    pub a_interface: String,
    /// Other end
    pub b_device: String,
    /// Interface on that end
    pub b_interface: String,
    /// Why the link is illegal
    pub reason: String,
}

/// Construction findings surfaced next to the graph
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TopologyValidationReport {
    /// Leaf-leaf / superspine-superspine links (kept in the graph, marked
    /// invalid, excluded from pathfinding)
    pub invalid_links: Vec<InvalidLinkReport>,
    /// Collected devices with zero LLDP entries
    pub lldp_gaps: Vec<String>,
    /// Devices with no valid link toward any spine
    pub unreachable_devices: Vec<String>,
    /// Corrupted LLDP neighbor entries dropped
    pub corrupted_neighbor_entries: usize,
    /// Bundle-vs-LLDP disagreements and other warnings
    pub issues: Vec<Issue>,
}

impl TopologyValidationReport {
    /// Whether construction found nothing to report
    pub fn is_clean(&self) -> bool {
        self.invalid_links.is_empty()
            && self.lldp_gaps.is_empty()
            && self.unreachable_devices.is_empty()
            && self.corrupted_neighbor_entries == 0
            && self.issues.is_empty()
    }
}

/// Builds an immutable [`TopologyGraph`] from parsed device artifacts
pub struct TopologyBuilder<'a> {
    normalizer: &'a DeviceNameNormalizer,
}

impl<'a> TopologyBuilder<'a> {
    /// A builder borrowing the run's normalizer
    pub fn new(normalizer: &'a DeviceNameNormalizer) -> Self {
        Self { normalizer }
    }

    /// Canonical identity for a raw device name.
    ///
    /// Superspine control cards (NCC0/NCC1) collapse into one logical
    /// chassis; the card designator survives only in the variants set.
    pub fn identify(&self, raw: &str) -> (DeviceId, DeviceRole) {
        let canonical = self.normalizer.normalize(raw);
        let role = DeviceRole::from_canonical_name(&canonical);
        if role == DeviceRole::Superspine {
            let display = canonical
                .trim_end_matches("-NCC0")
                .trim_end_matches("-NCC1")
                .to_string();
            let id = DeviceId::from_parts(raw.to_string(), display, self.normalizer.chassis_key(raw));
            (id, role)
        } else {
            (self.normalizer.device_id(raw), role)
        }
    }

    /// Construct the graph and its validation report
    pub fn build(
        &self,
        artifacts: &[ParsedDeviceArtifact],
    ) -> (TopologyGraph, TopologyValidationReport) {
        let mut graph = TopologyGraph::new();
        let mut report = TopologyValidationReport::default();

        // Pass 1: devices and their local inventory
        for artifact in artifacts {
            let (id, role) = self.identify(&artifact.device);
            let node = graph.add_device(DeviceNode {
                variants: BTreeSet::from([artifact.device.clone()]),
                status: artifact.status,
                id,
                role,
            });
            for interface in &artifact.interfaces {
                graph.add_interface(node, interface);
            }
            for bd in &artifact.bridge_domain_instances {
                for interface in &bd.interfaces {
                    graph.add_interface(node, interface);
                }
            }
            for vlan in &artifact.vlan_configurations {
                graph.add_interface(node, &vlan.interface);
            }
            for bundle in &artifact.bundles {
                graph.add_bundle(node, &bundle.name, &bundle.members);
            }
        }

        // Pass 2: links from bundle-recorded connections
        for artifact in artifacts {
            let local = self.node_for(&mut graph, &artifact.device);
            for bundle in &artifact.bundles {
                for peer in &bundle.peers {
                    if peer.remote_device.trim().is_empty() {
                        continue;
                    }
                    let remote = self.node_for(&mut graph, &peer.remote_device);
                    graph.add_link(
                        local,
                        &peer.local_interface,
                        remote,
                        &peer.remote_interface,
                        LinkKind::Bundle,
                    );
                }
            }
            // Explicit spine-to-superspine records, when the collectors
            // provide them directly
            for conn in &artifact.connected_superspines {
                let remote = self.node_for(&mut graph, &conn.neighbor_device);
                graph.add_link(
                    local,
                    &conn.local_interface,
                    remote,
                    &conn.neighbor_interface,
                    LinkKind::Bundle,
                );
            }
        }

        // Pass 3: bare LLDP adjacencies; bundle records win on conflict
        for artifact in artifacts {
            let local = self.node_for(&mut graph, &artifact.device);
            for neighbor in &artifact.neighbors {
                if neighbor.neighbor_device.trim().is_empty() || neighbor.neighbor_device == "|" {
                    report.corrupted_neighbor_entries += 1;
                    tracing::warn!(
                        device = %artifact.device,
                        interface = %neighbor.local_interface,
                        "dropping corrupted LLDP neighbor entry"
                    );
                    continue;
                }
                let neighbor_key = self.identify(&neighbor.neighbor_device).0;
                if let Some((_, remote_node, _)) = graph.link_at(local, &neighbor.local_interface) {
                    let recorded = graph.device(remote_node).id.clone();
                    if recorded != neighbor_key {
                        let detail = format!(
                            "{} {}: bundle records peer {}, LLDP advertises {}; preferring the bundle record",
                            graph.device(local).id.canonical(),
                            neighbor.local_interface,
                            recorded.canonical(),
                            neighbor_key.canonical(),
                        );
                        tracing::warn!("{detail}");
                        report.issues.push(Issue::new(IssueKind::TopologyDiscrepancy, detail));
                    }
                    continue;
                }
                let remote = self.node_for(&mut graph, &neighbor.neighbor_device);
                graph.add_link(
                    local,
                    &neighbor.local_interface,
                    remote,
                    &neighbor.neighbor_interface,
                    LinkKind::Physical,
                );
            }
        }

        self.scan_invariants(&graph, artifacts, &mut report);
        (graph, report)
    }

    fn node_for(&self, graph: &mut TopologyGraph, raw: &str) -> NodeIndex {
        let (id, role) = self.identify(raw);
        // add_device merges the variant set when the key is already present
        graph.add_device(DeviceNode {
            variants: BTreeSet::from([raw.to_string()]),
            status: DeviceStatus::Reachable,
            id,
            role,
        })
    }

    fn scan_invariants(
        &self,
        graph: &TopologyGraph,
        artifacts: &[ParsedDeviceArtifact],
        report: &mut TopologyValidationReport,
    ) {
        for (link, a, b) in graph.all_links() {
            if link.valid {
                continue;
            }
            let a_dev = graph.device(a);
            let b_dev = graph.device(b);
            let reason = format!("{:?} link is not allowed in the fabric", link.role_pair);
            report.invalid_links.push(InvalidLinkReport {
                a_device: a_dev.id.canonical().to_string(),
                a_interface: link.a_interface.clone(),
                b_device: b_dev.id.canonical().to_string(),
                b_interface: link.b_interface.clone(),
                reason: reason.clone(),
            });
            report.issues.push(Issue::new(
                IssueKind::InvalidLink,
                format!(
                    "{}:{} <-> {}:{} ({reason})",
                    a_dev.id.canonical(),
                    link.a_interface,
                    b_dev.id.canonical(),
                    link.b_interface
                ),
            ));
        }
        report.invalid_links.sort_by(|x, y| {
            (&x.a_device, &x.a_interface).cmp(&(&y.a_device, &y.a_interface))
        });

        for artifact in artifacts {
            if artifact.neighbors.is_empty() {
                let canonical = self.normalizer.normalize(&artifact.device);
                tracing::warn!(device = %canonical, "no LLDP data collected");
                report.lldp_gaps.push(canonical);
            }
        }
        report.lldp_gaps.sort();
        report.lldp_gaps.dedup();

        for device in graph.devices() {
            let reachable = match device.role {
                DeviceRole::Spine => {
                    let ix = graph.node_by_key(device.id.key());
                    ix.map(|ix| !graph.links_from(ix).is_empty()).unwrap_or(false)
                }
                _ => graph
                    .node_by_key(device.id.key())
                    .map(|ix| !graph.neighbors_with_role(ix, DeviceRole::Spine).is_empty())
                    .unwrap_or(false),
            };
            if !reachable {
                report.unreachable_devices.push(device.id.canonical().to_string());
            }
        }
        report.unreachable_devices.sort();
    }
}
