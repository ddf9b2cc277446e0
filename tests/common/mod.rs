//! Shared fixtures: a small three-tier lab fabric.

use dnaas_fabric::domain::{
    BdInstanceRecord, BundlePeer, BundleRecord, ParsedDeviceArtifact,
};
use dnaas_fabric::domain::vlan::VlanConfigEntry;

/// A leaf with one uplink bundle toward a spine plus user ports.
pub fn leaf(
    name: &str,
    uplink_member: &str,
    spine: &str,
    spine_port: &str,
    user_ports: &[&str],
) -> ParsedDeviceArtifact {
    let mut artifact = ParsedDeviceArtifact::new(name);
    artifact.interfaces = user_ports.iter().map(|p| p.to_string()).collect();
    artifact.bundles.push(BundleRecord {
        name: "bundle-100".into(),
        device: name.into(),
        members: vec![uplink_member.into()],
        peers: vec![BundlePeer {
            remote_device: spine.into(),
            local_interface: uplink_member.into(),
            remote_interface: spine_port.into(),
        }],
    });
    artifact
}

/// A spine with one bundle per attached device.
pub fn spine(name: &str, bundles: &[(&str, &str, &str, &str)]) -> ParsedDeviceArtifact {
    let mut artifact = ParsedDeviceArtifact::new(name);
    for (bundle_name, member, remote, remote_if) in bundles {
        artifact.bundles.push(BundleRecord {
            name: bundle_name.to_string(),
            device: name.into(),
            members: vec![member.to_string()],
            peers: vec![BundlePeer {
                remote_device: remote.to_string(),
                local_interface: member.to_string(),
                remote_interface: remote_if.to_string(),
            }],
        });
    }
    artifact
}

/// The lab fabric used by the seed scenarios:
/// A01/A02/A03/B01 on SPINE-B08, F16 on SPINE-D14, both spines on
/// SUPERSPINE-D04 (collected as its NCC0 control card).
pub fn lab_fabric() -> Vec<ParsedDeviceArtifact> {
    let mut artifacts = vec![
        leaf("DNAAS-LEAF-A01", "ge100-0/0/1", "DNAAS-SPINE-B08", "ge100-0/0/21", &["ge100-0/0/10"]),
        leaf("DNAAS-LEAF-A02", "ge100-0/0/2", "DNAAS-SPINE-B08", "ge100-0/0/22", &["ge100-0/0/20"]),
        leaf("DNAAS-LEAF-A03", "ge100-0/0/3", "DNAAS-SPINE-B08", "ge100-0/0/23", &["ge100-0/0/30"]),
        leaf("DNAAS-LEAF-B01", "ge100-0/0/4", "DNAAS-SPINE-B08", "ge100-0/0/24", &["ge100-0/0/40"]),
        leaf("DNAAS-LEAF-F16", "ge100-0/0/5", "DNAAS-SPINE-D14", "ge100-0/0/26", &["ge100-0/0/50"]),
        spine(
            "DNAAS-SPINE-B08",
            &[
                ("bundle-101", "ge100-0/0/21", "DNAAS-LEAF-A01", "ge100-0/0/1"),
                ("bundle-102", "ge100-0/0/22", "DNAAS-LEAF-A02", "ge100-0/0/2"),
                ("bundle-103", "ge100-0/0/23", "DNAAS-LEAF-A03", "ge100-0/0/3"),
                ("bundle-104", "ge100-0/0/24", "DNAAS-LEAF-B01", "ge100-0/0/4"),
                ("bundle-500", "ge100-4/0/1", "DNAAS-SuperSpine-D04-NCC0", "ge100-5/0/1"),
            ],
        ),
        spine(
            "DNAAS-SPINE-D14",
            &[
                ("bundle-116", "ge100-0/0/26", "DNAAS-LEAF-F16", "ge100-0/0/5"),
                ("bundle-500", "ge100-4/0/2", "DNAAS-SuperSpine-D04-NCC1", "ge100-5/0/2"),
            ],
        ),
        spine(
            "DNAAS-SuperSpine-D04-NCC0",
            &[
                ("bundle-508", "ge100-5/0/1", "DNAAS-SPINE-B08", "ge100-4/0/1"),
                ("bundle-514", "ge100-5/0/2", "DNAAS-SPINE-D14", "ge100-4/0/2"),
            ],
        ),
    ];
    // The superspine also exposes user-facing access ports
    if let Some(superspine) = artifacts
        .iter_mut()
        .find(|a| a.device == "DNAAS-SuperSpine-D04-NCC0")
    {
        superspine.interfaces.push("ge100-5/0/12".into());
    }
    artifacts
}

/// Attach a bridge domain plus VLAN facts to a device artifact.
pub fn with_bridge_domain(
    artifact: &mut ParsedDeviceArtifact,
    bd_name: &str,
    interfaces: &[&str],
    entries: Vec<VlanConfigEntry>,
) {
    artifact.bridge_domain_instances.push(BdInstanceRecord {
        name: bd_name.into(),
        admin_state: "enabled".into(),
        interfaces: interfaces.iter().map(|s| s.to_string()).collect(),
    });
    artifact.vlan_configurations.extend(entries);
}

/// An outer-tag-only VLAN entry (QinQ service side).
pub fn outer_entry(interface: &str, outer: u16) -> VlanConfigEntry {
    VlanConfigEntry {
        interface: interface.into(),
        outer_vlan: Some(outer),
        ..Default::default()
    }
}
