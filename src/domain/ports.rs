//! Inbound interface to the external collectors.
//!
//! The SSH/NETCONF probers and their CLI parsers are external
//! collaborators; the core consumes their output as the structured records
//! below. Everything is format-agnostic data: the persistence layer decides
//! how the records are stored on disk.

use crate::domain::vlan::VlanConfigEntry;
use crate::domain::CoreError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// One LLDP neighbor observation on a device
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NeighborRecord {
    /// Interface on the reporting device
    pub local_interface: String,
    /// Neighbor system name as advertised
    pub neighbor_device: String,
    /// Neighbor port as advertised
    pub neighbor_interface: String,
}

/// One point-to-point connection recorded on a bundle
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BundlePeer {
    /// Remote device name as recorded in the bundle CLI
    pub remote_device: String,
    /// Member port on the local device carrying this connection
    pub local_interface: String,
    /// Port on the remote device
    pub remote_interface: String,
}

/// A link aggregation group on one device
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BundleRecord {
    /// Bundle name (e.g. `bundle-100`)
    pub name: String,
    /// Owning device
    pub device: String,
    /// Member physical ports
    pub members: Vec<String>,
    /// Recorded connections to remote devices
    #[serde(default)]
    pub peers: Vec<BundlePeer>,
}

/// One bridge-domain instance as parsed from a device
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BdInstanceRecord {
    /// Instance name
    pub name: String,
    /// Admin state as reported (`enabled` / `disabled`)
    #[serde(default = "default_admin_state")]
    pub admin_state: String,
    /// Attached interface names
    #[serde(default)]
    pub interfaces: Vec<String>,
}

fn default_admin_state() -> String {
    "enabled".to_string()
}

/// Collector-reported reachability of a device
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, strum_macros::Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum DeviceStatus {
    /// Collection succeeded
    #[default]
    Reachable,
    /// Collection failed; the device is assumed down
    Failed,
}

/// Everything the collectors hand over for one device
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedDeviceArtifact {
    /// Device name as collected (raw, un-normalized)
    pub device: String,
    /// Collector-reported status
    #[serde(default)]
    pub status: DeviceStatus,
    /// Known interfaces on the device, when the collector inventories them
    #[serde(default)]
    pub interfaces: Vec<String>,
    /// LLDP neighbor table
    #[serde(default)]
    pub neighbors: Vec<NeighborRecord>,
    /// Bundle definitions
    #[serde(default)]
    pub bundles: Vec<BundleRecord>,
    /// Explicit spine-to-superspine connection records, when collected
    #[serde(default)]
    pub connected_superspines: Vec<NeighborRecord>,
    /// Bridge-domain instances
    #[serde(default)]
    pub bridge_domain_instances: Vec<BdInstanceRecord>,
    /// Per-interface VLAN CLI facts
    #[serde(default)]
    pub vlan_configurations: Vec<VlanConfigEntry>,
}

impl ParsedDeviceArtifact {
    /// Empty artifact for a device name
    pub fn new(device: impl Into<String>) -> Self {
        Self {
            device: device.into(),
            status: DeviceStatus::Reachable,
            interfaces: Vec::new(),
            neighbors: Vec::new(),
            bundles: Vec::new(),
            connected_superspines: Vec::new(),
            bridge_domain_instances: Vec::new(),
            vlan_configurations: Vec::new(),
        }
    }
}

/// Source of parsed device artifacts (the collector handoff directory)
#[async_trait]
pub trait ArtifactSource: Send + Sync {
    /// List devices an artifact exists for
    async fn list_devices(&self) -> Result<Vec<String>, CoreError>;

    /// Load one device's parsed artifact
    async fn load_device(&self, device: &str) -> Result<ParsedDeviceArtifact, CoreError>;
}
