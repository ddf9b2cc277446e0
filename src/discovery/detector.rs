//! Bridge-domain detection: per-device service fragments from parsed
//! bridge-domain instances joined with VLAN CLI facts.
//!
//! Golden rule: VLAN information comes only from `vlan_configurations`
//! entries. A sub-interface's numeric name suffix is never read back as a
//! VLAN ID, and interfaces without an entry carry "no VLAN facts".

use crate::domain::vlan::{merge_interface_facts, VlanConfig, VlanConfigEntry};
use crate::domain::{DeviceId, InterfaceKind, ParsedDeviceArtifact};
use crate::normalize::DeviceNameNormalizer;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// One interface attached to a bridge-domain fragment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FragmentInterface {
    /// Interface name
    pub name: String,
    /// Name-shape kind
    pub kind: InterfaceKind,
    /// CLI-derived VLAN facts ([`VlanConfig::None`] when the interface has
    /// no `vlan_configurations` entry)
    pub vlan: VlanConfig,
}

/// Aggregated VLAN facts for a whole fragment
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FragmentVlanSummary {
    /// Winning aggregate configuration
    pub aggregate: VlanConfig,
    /// Outer tag observed on any member entry
    pub outer_vlan: Option<u16>,
    /// Single vlan-id observed on any member entry
    pub vlan_id: Option<u16>,
    /// Distinct inner tags observed across member entries
    pub inner_vlans: BTreeSet<u16>,
    /// Members with at least one VLAN fact
    pub members_with_facts: usize,
    /// Members carrying no VLAN facts
    pub members_without_facts: usize,
    /// Whether members disagreed on their facts
    pub conflicting: bool,
}

impl FragmentVlanSummary {
    /// Fraction of members with facts; 1.0 for an interface-less fragment
    pub fn completeness(&self) -> f64 {
        let total = self.members_with_facts + self.members_without_facts;
        if total == 0 {
            return 1.0;
        }
        // A fragment with no facts anywhere is a complete observation of
        // an untagged service, not a partial one.
        if self.members_with_facts == 0 {
            return 1.0;
        }
        self.members_with_facts as f64 / total as f64
    }

    /// Whether any tagging fact exists
    pub fn has_facts(&self) -> bool {
        self.members_with_facts > 0
    }
}

/// A per-device slice of a bridge domain
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BridgeDomainFragment {
    /// Bridge-domain instance name
    pub name: String,
    /// Device carrying this slice
    pub device: DeviceId,
    /// Admin state as reported
    pub admin_state: String,
    /// Attached interfaces with their facts
    pub interfaces: Vec<FragmentInterface>,
    /// Aggregated VLAN facts
    pub vlan: FragmentVlanSummary,
}

/// All fragments of one bridge-domain name across devices
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BridgeDomainGroup {
    /// The shared bridge-domain name
    pub name: String,
    /// Per-device fragments, ascending by device key
    pub fragments: Vec<BridgeDomainFragment>,
}

impl BridgeDomainGroup {
    /// Devices carrying the bridge domain, ascending canonical names
    pub fn devices(&self) -> Vec<String> {
        let mut devices: Vec<String> = self
            .fragments
            .iter()
            .map(|f| f.device.canonical().to_string())
            .collect();
        devices.sort();
        devices.dedup();
        devices
    }

    /// Group-wide VLAN summary (union of the fragment summaries)
    pub fn vlan_summary(&self) -> FragmentVlanSummary {
        let configs: Vec<&VlanConfig> = self
            .fragments
            .iter()
            .flat_map(|f| f.interfaces.iter().map(|i| &i.vlan))
            .collect();
        let merged = merge_interface_facts(configs);
        let mut summary = FragmentVlanSummary {
            aggregate: merged.config,
            outer_vlan: merged.outer_vlan,
            vlan_id: merged.vlan_id,
            inner_vlans: BTreeSet::new(),
            members_with_facts: merged.members_with_facts,
            members_without_facts: merged.members_without_facts,
            conflicting: merged.conflicting,
        };
        for fragment in &self.fragments {
            summary.inner_vlans.extend(fragment.vlan.inner_vlans.iter().copied());
            if summary.outer_vlan.is_none() {
                summary.outer_vlan = fragment.vlan.outer_vlan;
            } else if fragment.vlan.outer_vlan.is_some()
                && fragment.vlan.outer_vlan != summary.outer_vlan
            {
                summary.conflicting = true;
            }
            if summary.vlan_id.is_none() {
                summary.vlan_id = fragment.vlan.vlan_id;
            }
            summary.conflicting |= fragment.vlan.conflicting;
        }
        summary
    }
}

/// Detects bridge-domain fragments across a parsed-data snapshot
pub struct BridgeDomainDetector<'a> {
    normalizer: &'a DeviceNameNormalizer,
}

impl<'a> BridgeDomainDetector<'a> {
    /// A detector borrowing the run's normalizer
    pub fn new(normalizer: &'a DeviceNameNormalizer) -> Self {
        Self { normalizer }
    }

    /// Group every bridge-domain instance by name and join each device's
    /// attached interfaces with their VLAN CLI facts.
    pub fn detect(&self, artifacts: &[ParsedDeviceArtifact]) -> Vec<BridgeDomainGroup> {
        let fragments = artifacts
            .iter()
            .flat_map(|artifact| self.detect_device(artifact))
            .collect();
        Self::group_fragments(fragments)
    }

    /// Detect one device's fragments. The per-device half of [`Self::detect`];
    /// the discovery orchestrator fans this out across devices.
    pub fn detect_device(&self, artifact: &ParsedDeviceArtifact) -> Vec<BridgeDomainFragment> {
        let device = self.normalizer.device_id(&artifact.device);
        let entries: BTreeMap<&str, &VlanConfigEntry> = artifact
            .vlan_configurations
            .iter()
            .map(|e| (e.interface.as_str(), e))
            .collect();
        artifact
            .bridge_domain_instances
            .iter()
            .map(|bd| self.detect_fragment(&device, bd, &entries))
            .collect()
    }

    /// Reduce per-device fragments into name-keyed groups, deterministic
    /// order.
    pub fn group_fragments(fragments: Vec<BridgeDomainFragment>) -> Vec<BridgeDomainGroup> {
        let mut groups: BTreeMap<String, Vec<BridgeDomainFragment>> = BTreeMap::new();
        for fragment in fragments {
            groups.entry(fragment.name.clone()).or_default().push(fragment);
        }
        let out: Vec<BridgeDomainGroup> = groups
            .into_iter()
            .map(|(name, mut fragments)| {
                fragments.sort_by(|a, b| a.device.cmp(&b.device));
                BridgeDomainGroup { name, fragments }
            })
            .collect();
        tracing::info!(groups = out.len(), "bridge-domain detection complete");
        out
    }

    fn detect_fragment(
        &self,
        device: &DeviceId,
        bd: &crate::domain::BdInstanceRecord,
        entries: &BTreeMap<&str, &VlanConfigEntry>,
    ) -> BridgeDomainFragment {
        let mut interfaces: Vec<FragmentInterface> = bd
            .interfaces
            .iter()
            .map(|name| FragmentInterface {
                name: name.clone(),
                kind: InterfaceKind::from_name(name),
                vlan: entries
                    .get(name.as_str())
                    .map(|e| e.to_config())
                    .unwrap_or_default(),
            })
            .collect();
        interfaces.sort_by(|a, b| a.name.cmp(&b.name));

        let merged = merge_interface_facts(interfaces.iter().map(|i| &i.vlan));
        let mut summary = FragmentVlanSummary {
            aggregate: merged.config,
            outer_vlan: merged.outer_vlan,
            vlan_id: merged.vlan_id,
            inner_vlans: BTreeSet::new(),
            members_with_facts: merged.members_with_facts,
            members_without_facts: merged.members_without_facts,
            conflicting: merged.conflicting,
        };
        for interface in &interfaces {
            if let VlanConfig::DoubleTag { inner: Some(inner), .. } = interface.vlan {
                summary.inner_vlans.insert(inner);
            }
        }

        BridgeDomainFragment {
            name: bd.name.clone(),
            device: device.clone(),
            admin_state: bd.admin_state.clone(),
            interfaces,
            vlan: summary,
        }
    }
}
