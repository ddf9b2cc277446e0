//! # Topology Layer
//!
//! Reconstructs the physical fabric from per-device LLDP and bundle data:
//! role classification, link inference, chassis consolidation and the
//! read-only graph the path engine and discovery pipeline run against.

pub mod builder;
pub mod graph;
pub mod snapshot;

pub use builder::{InvalidLinkReport, TopologyBuilder, TopologyValidationReport};
pub use graph::{
    BundleInfo, DeviceNode, InterfaceInfo, LinkEdge, LinkKind, LinkRolePair, TopologyGraph,
};
pub use snapshot::{
    SnapshotBundle, SnapshotDevice, SnapshotEndpoint, SnapshotLink, TopologySnapshot,
};
