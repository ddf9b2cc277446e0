//! Configuration artifacts: ordered per-device CLI command lists plus
//! request metadata. Artifacts are pure values; they reference nothing
//! beyond their own fields and serialize as the outbound record.

use crate::domain::{DeviceRole, Issue};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Service topology shape
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
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum TopologyType {
    /// One destination
    P2p,
    /// Multiple leaf destinations
    P2mp,
    /// Leaf and superspine destinations combined
    P2mpMixed,
}

/// Request context carried on an artifact
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArtifactMetadata {
    /// Service identifier
    pub service_name: String,
    /// VLAN assigned along the path
    pub vlan_id: u16,
    /// Shape of the request
    pub topology_type: TopologyType,
    /// Source device canonical name
    pub source_device: String,
    /// Source device tier
    pub source_device_type: DeviceRole,
    /// Destination canonical names, request order
    pub dest_devices: Vec<String>,
    /// Destination tiers, request order
    pub dest_device_types: Vec<DeviceRole>,
    /// Canonical keys of devices along the computed path(s)
    pub path: Vec<String>,
    /// Generation time
    pub generated_at: DateTime<Utc>,
}

/// Ordered per-device command lists for one provisioning request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigArtifact {
    /// Request context
    pub metadata: ArtifactMetadata,
    /// Device canonical name -> CLI lines, devices ascending
    pub per_device_commands: BTreeMap<String, Vec<String>>,
    /// Non-fatal findings from synthesis
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub issues: Vec<Issue>,
}

impl ConfigArtifact {
    /// Total command count across devices
    pub fn command_count(&self) -> usize {
        self.per_device_commands.values().map(Vec::len).sum()
    }

    /// Render a short per-device summary for CLI output
    pub fn summary(&self) -> String {
        let mut out = String::new();
        out.push_str(&format!(
            "{} (VLAN {}, {}): {} devices, {} commands\n",
            self.metadata.service_name,
            self.metadata.vlan_id,
            self.metadata.topology_type,
            self.per_device_commands.len(),
            self.command_count()
        ));
        for (device, commands) in &self.per_device_commands {
            out.push_str(&format!("  {device}: {} commands\n", commands.len()));
        }
        out
    }
}
