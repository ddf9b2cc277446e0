//! Multi-tier path computation between fabric endpoints.
//!
//! A 2-tier path crosses one shared spine; a 3-tier path crosses the
//! lowest-keyed spine on each side and a common superspine. All tie-breaks
//! are ascending canonical key so repeated runs pick identical paths.

use crate::domain::{DeviceId, DeviceRole, DeviceStatus};
use crate::topology::TopologyGraph;
use petgraph::graph::NodeIndex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Direction and tier of one path segment
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    strum_macros::Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum SegmentKind {
    /// Leaf uplink into a spine
    LeafToSpine,
    /// Spine downlink into a leaf
    SpineToLeaf,
    /// Spine uplink into a superspine
    SpineToSuperspine,
    /// Superspine downlink into a spine
    SuperspineToSpine,
}

/// One hop of a computed path
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Segment {
    /// Hop direction
    pub kind: SegmentKind,
    /// Device the hop leaves
    pub source_device: DeviceId,
    /// Device the hop enters
    pub dest_device: DeviceId,
    /// Egress interface on the source device
    pub source_interface: String,
    /// Ingress interface on the destination device
    pub dest_interface: String,
}

/// Which shape of path was selected
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "tier")]
pub enum PathTier {
    /// Two segments via one shared spine
    TwoTier {
        /// The shared spine
        spine: DeviceId,
    },
    /// Four segments via a common superspine
    ThreeTier {
        /// Spine on the source side
        source_spine: DeviceId,
        /// The common superspine
        superspine: DeviceId,
        /// Spine on the destination side
        dest_spine: DeviceId,
    },
    /// Two segments ending on a superspine destination
    ToSuperspine {
        /// The transit spine
        spine: DeviceId,
    },
}

/// An ordered, non-empty hop sequence between two fabric devices
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FabricPath {
    /// Path start (always a leaf)
    pub source: DeviceId,
    /// Path end (leaf or superspine)
    pub destination: DeviceId,
    /// Selected shape
    pub tier: PathTier,
    /// Hops in order
    pub segments: Vec<Segment>,
}

impl FabricPath {
    /// Canonical keys of every device along the path, in hop order
    pub fn device_keys(&self) -> Vec<String> {
        let mut keys = vec![self.source.key().to_string()];
        for segment in &self.segments {
            let key = segment.dest_device.key().to_string();
            if keys.last() != Some(&key) {
                keys.push(key);
            }
        }
        keys
    }

    /// Whether any device appears twice on the path
    pub fn has_repeated_device(&self) -> bool {
        let keys = self.device_keys();
        let mut seen = std::collections::BTreeSet::new();
        keys.iter().any(|k| !seen.insert(k))
    }
}

/// Why a path could not be produced.
///
/// These are skip reasons, not fatal errors; P2MP planning collects them
/// per destination and continues.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "reason")]
pub enum PathFailure {
    #[error("device '{device}' is not in the topology")]
    UnknownDevice { device: String },

    #[error("'{device}' has role {role}, expected {expected}")]
    WrongRole {
        device: String,
        role: DeviceRole,
        expected: DeviceRole,
    },

    #[error("source and destination are the same device '{device}'")]
    SameDevice { device: String },

    #[error("'{device}' has no spine connectivity")]
    NoSpineConnectivity { device: String },

    #[error("every spine serving '{device}' is marked failed")]
    FailedSpineAffected { device: String },

    #[error("no common superspine between '{source_spine}' and '{dest_spine}'")]
    NoCommonSuperspine {
        source_spine: String,
        dest_spine: String,
    },

    #[error("no spine connects '{src}' to superspine '{destination}'")]
    NoSpineToSuperspine { src: String, destination: String },
}

impl PathFailure {
    /// Short machine-readable reason tag
    pub fn reason_code(&self) -> &'static str {
        match self {
            PathFailure::UnknownDevice { .. } => "unknown_device",
            PathFailure::WrongRole { .. } => "wrong_role",
            PathFailure::SameDevice { .. } => "same_device",
            PathFailure::NoSpineConnectivity { .. } => "no_spine_connectivity",
            PathFailure::FailedSpineAffected { .. } => "failed_spine_affected",
            PathFailure::NoCommonSuperspine { .. } => "no_common_superspine",
            PathFailure::NoSpineToSuperspine { .. } => "no_spine_to_superspine",
        }
    }
}

/// Pure path computation over an immutable topology.
///
/// The engine holds no state beyond the graph reference; it is reentrant
/// and safe to share across concurrent requests.
pub struct PathEngine<'a> {
    graph: &'a TopologyGraph,
}

impl<'a> PathEngine<'a> {
    /// An engine over a built topology
    pub fn new(graph: &'a TopologyGraph) -> Self {
        Self { graph }
    }

    /// The topology this engine runs against
    pub fn graph(&self) -> &TopologyGraph {
        self.graph
    }

    /// Leaves usable as P2P/P2MP sources, ascending by canonical key.
    ///
    /// A leaf is available when it is reachable and at least one of its
    /// spines is not marked failed.
    pub fn available_sources(&self) -> Vec<DeviceId> {
        self.graph
            .devices_with_role(DeviceRole::Leaf)
            .into_iter()
            .filter(|d| d.status != DeviceStatus::Failed)
            .filter_map(|d| {
                let ix = self.graph.node_by_key(d.id.key())?;
                let usable = self.usable_spines(ix);
                (!usable.is_empty()).then(|| d.id.clone())
            })
            .collect()
    }

    /// Valid destinations for a source: every other available leaf plus all
    /// superspines, ascending by canonical key within each role.
    pub fn available_destinations(&self, source: &DeviceId) -> Vec<DeviceId> {
        let mut out: Vec<DeviceId> = self
            .available_sources()
            .into_iter()
            .filter(|d| d != source)
            .collect();
        out.extend(
            self.graph
                .devices_with_role(DeviceRole::Superspine)
                .into_iter()
                .filter(|d| d.status != DeviceStatus::Failed)
                .map(|d| d.id.clone()),
        );
        out
    }

    /// Compute the preferred leaf-to-leaf path.
    ///
    /// Shared spine wins (2-tier); otherwise the lowest-keyed spine on each
    /// side plus the lowest-keyed common superspine (3-tier).
    pub fn calculate_path(&self, source: &DeviceId, dest: &DeviceId) -> Result<FabricPath, PathFailure> {
        if source == dest {
            return Err(PathFailure::SameDevice {
                device: source.canonical().to_string(),
            });
        }
        let src = self.leaf_node(source)?;
        let dst = self.leaf_node(dest)?;

        let src_spines = self.usable_spines_or_reason(src, source)?;
        let dst_spines = self.usable_spines_or_reason(dst, dest)?;

        // 2-tier: shared spine, lowest canonical key
        if let Some(&shared) = src_spines.iter().find(|s| dst_spines.contains(s)) {
            let spine_id = self.graph.device(shared).id.clone();
            tracing::debug!(
                source = %source.canonical(),
                dest = %dest.canonical(),
                spine = %spine_id.canonical(),
                "2-tier path via shared spine"
            );
            let up = self.segment(src, shared, SegmentKind::LeafToSpine)?;
            let down = self.segment(shared, dst, SegmentKind::SpineToLeaf)?;
            return Ok(FabricPath {
                source: source.clone(),
                destination: dest.clone(),
                tier: PathTier::TwoTier { spine: spine_id },
                segments: vec![up, down],
            });
        }

        // 3-tier: lowest-keyed spine per side, common superspine
        let s_src = src_spines[0];
        let s_dst = dst_spines[0];
        let src_ss = self.graph.neighbors_with_role(s_src, DeviceRole::Superspine);
        let dst_ss = self.graph.neighbors_with_role(s_dst, DeviceRole::Superspine);
        let superspine = src_ss
            .iter()
            .find(|ss| dst_ss.contains(ss))
            .copied()
            .ok_or_else(|| PathFailure::NoCommonSuperspine {
                source_spine: self.graph.device(s_src).id.canonical().to_string(),
                dest_spine: self.graph.device(s_dst).id.canonical().to_string(),
            })?;

        tracing::debug!(
            source = %source.canonical(),
            dest = %dest.canonical(),
            superspine = %self.graph.device(superspine).id.canonical(),
            "3-tier path via common superspine"
        );
        let segments = vec![
            self.segment(src, s_src, SegmentKind::LeafToSpine)?,
            self.segment(s_src, superspine, SegmentKind::SpineToSuperspine)?,
            self.segment(superspine, s_dst, SegmentKind::SuperspineToSpine)?,
            self.segment(s_dst, dst, SegmentKind::SpineToLeaf)?,
        ];
        Ok(FabricPath {
            source: source.clone(),
            destination: dest.clone(),
            tier: PathTier::ThreeTier {
                source_spine: self.graph.device(s_src).id.clone(),
                superspine: self.graph.device(superspine).id.clone(),
                dest_spine: self.graph.device(s_dst).id.clone(),
            },
            segments,
        })
    }

    /// Compute a leaf-to-superspine path (P2P with a superspine
    /// destination). NCC control-card variants address the same chassis.
    pub fn calculate_path_to_superspine(
        &self,
        source: &DeviceId,
        dest: &DeviceId,
    ) -> Result<FabricPath, PathFailure> {
        let src = self.leaf_node(source)?;
        let dst = self
            .graph
            .node_by_key(dest.key())
            .ok_or_else(|| PathFailure::UnknownDevice {
                device: dest.canonical().to_string(),
            })?;
        let dst_role = self.graph.device(dst).role;
        if dst_role != DeviceRole::Superspine {
            return Err(PathFailure::WrongRole {
                device: dest.canonical().to_string(),
                role: dst_role,
                expected: DeviceRole::Superspine,
            });
        }

        let spines = self.usable_spines_or_reason(src, source)?;
        let spine = spines
            .into_iter()
            .find(|s| {
                self.graph
                    .neighbors_with_role(*s, DeviceRole::Superspine)
                    .contains(&dst)
            })
            .ok_or_else(|| PathFailure::NoSpineToSuperspine {
                src: source.canonical().to_string(),
                destination: dest.canonical().to_string(),
            })?;

        let segments = vec![
            self.segment(src, spine, SegmentKind::LeafToSpine)?,
            self.segment(spine, dst, SegmentKind::SpineToSuperspine)?,
        ];
        Ok(FabricPath {
            source: source.clone(),
            destination: self.graph.device(dst).id.clone(),
            tier: PathTier::ToSuperspine {
                spine: self.graph.device(spine).id.clone(),
            },
            segments,
        })
    }

    fn leaf_node(&self, id: &DeviceId) -> Result<NodeIndex, PathFailure> {
        let ix = self
            .graph
            .node_by_key(id.key())
            .ok_or_else(|| PathFailure::UnknownDevice {
                device: id.canonical().to_string(),
            })?;
        let role = self.graph.device(ix).role;
        if role != DeviceRole::Leaf {
            return Err(PathFailure::WrongRole {
                device: id.canonical().to_string(),
                role,
                expected: DeviceRole::Leaf,
            });
        }
        Ok(ix)
    }

    /// Spines of a device whose status is not failed, ascending by key
    fn usable_spines(&self, ix: NodeIndex) -> Vec<NodeIndex> {
        self.graph
            .neighbors_with_role(ix, DeviceRole::Spine)
            .into_iter()
            .filter(|s| self.graph.device(*s).status != DeviceStatus::Failed)
            .collect()
    }

    fn usable_spines_or_reason(
        &self,
        ix: NodeIndex,
        id: &DeviceId,
    ) -> Result<Vec<NodeIndex>, PathFailure> {
        let all = self.graph.neighbors_with_role(ix, DeviceRole::Spine);
        if all.is_empty() {
            return Err(PathFailure::NoSpineConnectivity {
                device: id.canonical().to_string(),
            });
        }
        let usable = self.usable_spines(ix);
        if usable.is_empty() {
            return Err(PathFailure::FailedSpineAffected {
                device: id.canonical().to_string(),
            });
        }
        Ok(usable)
    }

    fn segment(
        &self,
        from: NodeIndex,
        to: NodeIndex,
        kind: SegmentKind,
    ) -> Result<Segment, PathFailure> {
        let (_, local_if, remote_if) =
            self.graph
                .link_between(from, to)
                .ok_or_else(|| PathFailure::UnknownDevice {
                    device: self.graph.device(to).id.canonical().to_string(),
                })?;
        Ok(Segment {
            kind,
            source_device: self.graph.device(from).id.clone(),
            dest_device: self.graph.device(to).id.clone(),
            source_interface: local_if.to_string(),
            dest_interface: remote_if.to_string(),
        })
    }
}
