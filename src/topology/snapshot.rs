//! Serializable topology snapshot.
//!
//! The outbound record other systems consume; also the shape persisted as
//! `topology_snapshot.json` in the working directory.

use crate::domain::DeviceRole;
use crate::topology::builder::TopologyValidationReport;
use crate::topology::graph::{LinkKind, TopologyGraph};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// One device in the snapshot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotDevice {
    /// Canonical display name
    pub name: String,
    /// Canonical comparison key
    pub canonical_key: String,
    /// Tier
    pub role: DeviceRole,
    /// Raw spellings observed for this device
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub variants: BTreeSet<String>,
}

/// One end of a snapshot link
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotEndpoint {
    /// Device canonical name
    pub device: String,
    /// Interface on that device
    pub interface: String,
}

/// One link in the snapshot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotLink {
    /// First end (lower canonical key)
    pub a: SnapshotEndpoint,
    /// Second end
    pub b: SnapshotEndpoint,
    /// `bundle` or `physical`
    pub kind: LinkKind,
}

/// One bundle in the snapshot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotBundle {
    /// Owning device canonical name
    pub device: String,
    /// Bundle name
    pub name: String,
    /// Member ports
    pub members: Vec<String>,
    /// Remote endpoints reachable over member ports
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub peers: Vec<SnapshotEndpoint>,
}

/// The full outbound topology record
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TopologySnapshot {
    /// When the snapshot was taken
    pub taken_at: Option<DateTime<Utc>>,
    /// Devices, ascending by canonical key
    pub devices: Vec<SnapshotDevice>,
    /// Links, deterministic order
    pub links: Vec<SnapshotLink>,
    /// Bundles, deterministic order
    pub bundles: Vec<SnapshotBundle>,
    /// Construction findings
    pub validation: TopologyValidationReport,
}

impl TopologySnapshot {
    /// Capture a snapshot of a built graph
    pub fn capture(
        graph: &TopologyGraph,
        validation: &TopologyValidationReport,
        taken_at: DateTime<Utc>,
    ) -> Self {
        let devices = graph
            .devices()
            .into_iter()
            .map(|d| SnapshotDevice {
                name: d.id.canonical().to_string(),
                canonical_key: d.id.key().to_string(),
                role: d.role,
                variants: d.variants.clone(),
            })
            .collect();

        let mut links: Vec<SnapshotLink> = graph
            .all_links()
            .into_iter()
            .filter(|(link, _, _)| link.valid)
            .map(|(link, a, b)| {
                let a_dev = graph.device(a);
                let b_dev = graph.device(b);
                let mut ends = [
                    SnapshotEndpoint {
                        device: a_dev.id.canonical().to_string(),
                        interface: link.a_interface.clone(),
                    },
                    SnapshotEndpoint {
                        device: b_dev.id.canonical().to_string(),
                        interface: link.b_interface.clone(),
                    },
                ];
                if (&ends[1].device, &ends[1].interface) < (&ends[0].device, &ends[0].interface) {
                    ends.swap(0, 1);
                }
                let [a, b] = ends;
                SnapshotLink { a, b, kind: link.kind }
            })
            .collect();
        links.sort_by(|x, y| {
            (&x.a.device, &x.a.interface, &x.b.device).cmp(&(&y.a.device, &y.a.interface, &y.b.device))
        });

        let mut bundles = Vec::new();
        for device in graph.devices() {
            let Some(ix) = graph.node_by_key(device.id.key()) else {
                continue;
            };
            for bundle in graph.bundles_on(ix) {
                let mut peers: Vec<SnapshotEndpoint> = bundle
                    .members
                    .iter()
                    .filter_map(|member| graph.link_at(ix, member))
                    .map(|(_, remote, remote_if)| SnapshotEndpoint {
                        device: graph.device(remote).id.canonical().to_string(),
                        interface: remote_if.to_string(),
                    })
                    .collect();
                peers.sort_by(|x, y| (&x.device, &x.interface).cmp(&(&y.device, &y.interface)));
                peers.dedup();
                bundles.push(SnapshotBundle {
                    device: device.id.canonical().to_string(),
                    name: bundle.name.clone(),
                    members: bundle.members.iter().cloned().collect(),
                    peers,
                });
            }
        }
        bundles.sort_by(|x, y| (&x.device, &x.name).cmp(&(&y.device, &y.name)));

        Self {
            taken_at: Some(taken_at),
            devices,
            links,
            bundles,
            validation: validation.clone(),
        }
    }
}
