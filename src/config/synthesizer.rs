//! Configuration synthesis: endpoint specification plus computed paths in,
//! ordered per-device CLI command lists out.
//!
//! Every participating sub-interface gets the same three lines: attach to
//! the bridge-domain instance, enable the L2 service, assign the VLAN.
//! Uplink and transit attachments must ride bundles; only user-facing
//! access ports may be bare physical interfaces (and on superspines only
//! when no bundle contains them).

use crate::config::artifact::{ArtifactMetadata, ConfigArtifact, TopologyType};
use crate::domain::{CoreError, DeviceId, DeviceRole, Issue, IssueKind};
use crate::path::{calculate_p2mp_paths, FabricPath, PathEngine, Segment, SegmentKind};
use crate::topology::TopologyGraph;
use crate::validation::{ValidatedEndpoint, ValidatedRequest};
use chrono::Utc;
use std::collections::{BTreeMap, BTreeSet};
use tokio_util::sync::CancellationToken;

/// Sub-interfaces a device contributes, split by command ordering group
#[derive(Debug, Default, Clone)]
struct DeviceBucket {
    /// Fabric-side attachments (bundles), rendered first
    uplinks: BTreeSet<String>,
    /// User-facing attachments, rendered second
    access: BTreeSet<String>,
}

/// Synthesizes configuration artifacts from validated requests
pub struct ConfigSynthesizer<'a> {
    graph: &'a TopologyGraph,
}

impl<'a> ConfigSynthesizer<'a> {
    /// A synthesizer over a built topology
    pub fn new(graph: &'a TopologyGraph) -> Self {
        Self { graph }
    }

    /// Build the artifact for a validated request.
    ///
    /// Dispatches on the destination set: one leaf is P2P, one superspine
    /// is P2P-to-superspine, several leaves are P2MP, and a mix of leaves
    /// and superspines is P2MP_MIXED.
    pub fn synthesize(
        &self,
        request: &ValidatedRequest,
        cancel: &CancellationToken,
    ) -> Result<ConfigArtifact, CoreError> {
        let engine = PathEngine::new(self.graph);
        let mut buckets: BTreeMap<String, DeviceBucket> = BTreeMap::new();
        let mut issues: Vec<Issue> = request.issues.clone();
        let mut path_keys: Vec<String> = Vec::new();
        let mut served_paths: Vec<FabricPath> = Vec::new();

        let (leaves, superspines): (Vec<&ValidatedEndpoint>, Vec<&ValidatedEndpoint>) = request
            .destinations
            .iter()
            .partition(|d| d.role == DeviceRole::Leaf);

        let topology_type = match (leaves.len(), superspines.len()) {
            (1, 0) | (0, 1) => TopologyType::P2p,
            (_, 0) => TopologyType::P2mp,
            _ => TopologyType::P2mpMixed,
        };
        tracing::info!(
            service = %request.service.as_str(),
            vlan = request.vlan.value(),
            %topology_type,
            "synthesizing configuration"
        );

        // Leaf destinations
        if !leaves.is_empty() {
            let dest_ids: Vec<DeviceId> = leaves.iter().map(|d| d.device.clone()).collect();
            let plan = calculate_p2mp_paths(&engine, &request.source.device, &dest_ids, cancel);
            if plan.cancelled {
                return Err(CoreError::Cancelled);
            }
            for failed in &plan.failed_destinations {
                let detail = format!(
                    "destination {} skipped: {} ({})",
                    failed.device, failed.detail, failed.reason
                );
                if topology_type == TopologyType::P2p {
                    return Err(CoreError::Topology(detail));
                }
                issues.push(Issue::new(IssueKind::PathFailure, detail));
            }
            for path in plan.paths.values() {
                self.walk_fabric_path(path, &mut buckets)?;
                served_paths.push(path.clone());
            }
            // Access trio on each served destination leaf
            for dest in &leaves {
                if plan.paths.contains_key(dest.device.key()) {
                    self.add_access(&mut buckets, &dest.device, &dest.interface);
                }
            }
        }

        // Superspine destinations: individual P2P attachments
        for dest in &superspines {
            match engine.calculate_path_to_superspine(&request.source.device, &dest.device) {
                Ok(path) => {
                    self.walk_superspine_path(&path, dest, &mut buckets)?;
                    served_paths.push(path);
                }
                Err(failure) => {
                    let detail = format!(
                        "destination {} skipped: {failure}",
                        dest.device.canonical()
                    );
                    if topology_type == TopologyType::P2p {
                        return Err(CoreError::Topology(detail));
                    }
                    issues.push(Issue::new(IssueKind::PathFailure, detail));
                }
            }
        }

        if served_paths.is_empty() {
            return Err(CoreError::Topology(
                "no destination could be served".to_string(),
            ));
        }

        // Source access port, once, regardless of destination count
        self.add_access(&mut buckets, &request.source.device, &request.source.interface);

        for path in &served_paths {
            for key in path.device_keys() {
                if !path_keys.contains(&key) {
                    path_keys.push(key);
                }
            }
        }

        let artifact = ConfigArtifact {
            metadata: ArtifactMetadata {
                service_name: request.service.as_str().to_string(),
                vlan_id: request.vlan.value(),
                topology_type,
                source_device: request.source.device.canonical().to_string(),
                source_device_type: request.source.role,
                dest_devices: request
                    .destinations
                    .iter()
                    .map(|d| d.device.canonical().to_string())
                    .collect(),
                dest_device_types: request.destinations.iter().map(|d| d.role).collect(),
                path: path_keys,
                generated_at: Utc::now(),
            },
            per_device_commands: self.render(&buckets, request),
            issues,
        };
        Ok(artifact)
    }

    /// Register every fabric-side attachment of a leaf-to-leaf path.
    ///
    /// Both endpoints of every segment must resolve to bundles: uplinks on
    /// the leaves, both sides on spines, both sides on a transit
    /// superspine.
    fn walk_fabric_path(
        &self,
        path: &FabricPath,
        buckets: &mut BTreeMap<String, DeviceBucket>,
    ) -> Result<(), CoreError> {
        for segment in &path.segments {
            let source_bundle = self.require_bundle(
                &segment.source_device,
                &segment.source_interface,
                Self::side_of(segment, true),
            )?;
            self.add_uplink(buckets, &segment.source_device, &source_bundle);

            let dest_bundle = self.require_bundle(
                &segment.dest_device,
                &segment.dest_interface,
                Self::side_of(segment, false),
            )?;
            self.add_uplink(buckets, &segment.dest_device, &dest_bundle);
        }
        Ok(())
    }

    /// Register a leaf-to-superspine path: leaf uplink and spine sides are
    /// bundles, the superspine downlink is a bundle, and the user-facing
    /// port may fall back to bare physical.
    fn walk_superspine_path(
        &self,
        path: &FabricPath,
        dest: &ValidatedEndpoint,
        buckets: &mut BTreeMap<String, DeviceBucket>,
    ) -> Result<(), CoreError> {
        self.walk_fabric_path(path, buckets)?;
        let access = self.bundle_or_physical(&dest.device, &dest.interface);
        self.add_access_raw(buckets, &dest.device, access);
        Ok(())
    }

    fn side_of(segment: &Segment, source_side: bool) -> &'static str {
        match (segment.kind, source_side) {
            (SegmentKind::LeafToSpine, true) => "uplink",
            (SegmentKind::LeafToSpine, false) => "downlink",
            (SegmentKind::SpineToLeaf, true) => "downlink",
            (SegmentKind::SpineToLeaf, false) => "uplink",
            (SegmentKind::SpineToSuperspine, true) => "uplink",
            (SegmentKind::SpineToSuperspine, false) => "downlink",
            (SegmentKind::SuperspineToSpine, true) => "downlink",
            (SegmentKind::SuperspineToSpine, false) => "uplink",
        }
    }

    fn require_bundle(
        &self,
        device: &DeviceId,
        interface: &str,
        side: &str,
    ) -> Result<String, CoreError> {
        let node = self.graph.node_by_key(device.key()).ok_or_else(|| {
            CoreError::Topology(format!("device '{}' is not in the topology", device.canonical()))
        })?;
        self.graph
            .bundle_for_interface(node, interface)
            .map(str::to_string)
            .ok_or_else(|| {
                CoreError::Synthesis(format!(
                    "no bundle contains {interface} on {}; {side} interfaces must use bundles, \
                     not physical ports",
                    device.canonical()
                ))
            })
    }

    /// Bundle when one contains the port, bare physical otherwise
    fn bundle_or_physical(&self, device: &DeviceId, interface: &str) -> String {
        self.graph
            .node_by_key(device.key())
            .and_then(|node| self.graph.bundle_for_interface(node, interface))
            .map(str::to_string)
            .unwrap_or_else(|| interface.to_string())
    }

    fn add_uplink(&self, buckets: &mut BTreeMap<String, DeviceBucket>, device: &DeviceId, interface: &str) {
        buckets
            .entry(device.canonical().to_string())
            .or_default()
            .uplinks
            .insert(interface.to_string());
    }

    fn add_access(&self, buckets: &mut BTreeMap<String, DeviceBucket>, device: &DeviceId, interface: &str) {
        self.add_access_raw(buckets, device, interface.to_string());
    }

    fn add_access_raw(
        &self,
        buckets: &mut BTreeMap<String, DeviceBucket>,
        device: &DeviceId,
        interface: String,
    ) {
        buckets
            .entry(device.canonical().to_string())
            .or_default()
            .access
            .insert(interface);
    }

    /// Render the three-line trios: uplink group before access group,
    /// ascending interface names within each, one trio per sub-interface.
    fn render(
        &self,
        buckets: &BTreeMap<String, DeviceBucket>,
        request: &ValidatedRequest,
    ) -> BTreeMap<String, Vec<String>> {
        let service = request.service.as_str();
        let vlan = request.vlan.value();
        let mut out = BTreeMap::new();
        for (device, bucket) in buckets {
            let mut commands = Vec::new();
            for interface in &bucket.uplinks {
                Self::trio(&mut commands, service, interface, vlan);
            }
            for interface in &bucket.access {
                if bucket.uplinks.contains(interface) {
                    continue;
                }
                Self::trio(&mut commands, service, interface, vlan);
            }
            out.insert(device.clone(), commands);
        }
        out
    }

    fn trio(commands: &mut Vec<String>, service: &str, interface: &str, vlan: u16) {
        commands.push(format!(
            "network-services bridge-domain instance {service} interface {interface}.{vlan}"
        ));
        commands.push(format!("interfaces {interface}.{vlan} l2-service enabled"));
        commands.push(format!("interfaces {interface}.{vlan} vlan-id {vlan}"));
    }
}
