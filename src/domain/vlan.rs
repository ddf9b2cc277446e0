//! VLAN configuration facts as parsed from device CLI.
//!
//! VLAN information is drawn only from parsed `vlan_configurations` CLI
//! data. The numeric suffix of a sub-interface name (`bundle-3700.8101`)
//! is never read back as a VLAN ID.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// A single edge manipulation rule (push/pop/translate) as parsed from CLI
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ManipulationRule {
    /// Operation keyword (`push`, `pop`, `translate`)
    pub operation: String,
    /// Direction the rule applies to (`ingress` / `egress`)
    pub direction: String,
    /// VLAN argument, when the operation carries one
    pub vlan: Option<u16>,
}

/// Aggregated VLAN facts for an interface or a bridge-domain fragment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum VlanConfig {
    /// One explicit vlan-id
    SingleTag {
        /// The tag
        vlan: u16,
    },
    /// QinQ service tag, with the customer tag when the CLI names one.
    ///
    /// An outer tag alone is a complete fact: the service side of a QinQ
    /// bridge domain is configured per-outer, and many members never pin a
    /// specific inner.
    DoubleTag {
        /// Service (outer) tag
        outer: u16,
        /// Customer (inner) tag, when explicitly configured
        inner: Option<u16>,
    },
    /// Contiguous vlan-id range
    Range {
        /// First id, inclusive
        start: u16,
        /// Last id, inclusive
        end: u16,
    },
    /// Explicit vlan-id list
    List {
        /// Sorted, deduplicated ids
        vlans: BTreeSet<u16>,
    },
    /// Edge push/pop/translate rules without a plain tag assignment
    Manipulation {
        /// Rules in CLI order
        rules: Vec<ManipulationRule>,
    },
    /// Untagged L2 (port-mode)
    PortMode,
    /// No VLAN facts observed for this interface
    #[default]
    None,
}

impl VlanConfig {
    /// Whether any VLAN fact was observed
    pub fn has_facts(&self) -> bool {
        !matches!(self, VlanConfig::None)
    }

    /// The outer (service) tag, when one exists
    pub fn outer_vlan(&self) -> Option<u16> {
        match self {
            VlanConfig::DoubleTag { outer, .. } => Some(*outer),
            _ => None,
        }
    }

    /// The single vlan-id, when one exists
    pub fn vlan_id(&self) -> Option<u16> {
        match self {
            VlanConfig::SingleTag { vlan } => Some(*vlan),
            _ => None,
        }
    }
}

impl fmt::Display for VlanConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VlanConfig::SingleTag { vlan } => write!(f, "vlan {vlan}"),
            VlanConfig::DoubleTag { outer, inner: Some(inner) } => {
                write!(f, "qinq {outer}.{inner}")
            }
            VlanConfig::DoubleTag { outer, inner: None } => write!(f, "qinq outer {outer}"),
            VlanConfig::Range { start, end } => write!(f, "range {start}-{end}"),
            VlanConfig::List { vlans } => write!(f, "list of {}", vlans.len()),
            VlanConfig::Manipulation { rules } => write!(f, "manipulation ({} rules)", rules.len()),
            VlanConfig::PortMode => write!(f, "port-mode"),
            VlanConfig::None => write!(f, "no vlan facts"),
        }
    }
}

/// One interface's parsed VLAN CLI facts, as handed over by the collectors
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct VlanConfigEntry {
    /// Interface the facts belong to
    pub interface: String,
    /// Plain vlan-id assignment
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vlan_id: Option<u16>,
    /// QinQ outer tag
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outer_vlan: Option<u16>,
    /// QinQ inner tag
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inner_vlan: Option<u16>,
    /// Range expression, `"100-200"`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vlan_range: Option<String>,
    /// Explicit id list
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vlan_list: Option<Vec<u16>>,
    /// Edge manipulation rules
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub manipulation: Vec<ManipulationRule>,
    /// Explicit port-mode (untagged) marker
    #[serde(default)]
    pub port_mode: bool,
}

impl VlanConfigEntry {
    /// Collapse the raw entry into one `VlanConfig` arm.
    ///
    /// Precedence: explicit outer (with or without an inner) > single
    /// vlan-id > range > list > manipulation > port-mode > none.
    pub fn to_config(&self) -> VlanConfig {
        if let Some(outer) = self.outer_vlan {
            return VlanConfig::DoubleTag {
                outer,
                inner: self.inner_vlan,
            };
        }
        if let Some(vlan) = self.vlan_id {
            return VlanConfig::SingleTag { vlan };
        }
        if let Some(range) = &self.vlan_range {
            if let Some(parsed) = parse_range(range) {
                return VlanConfig::Range {
                    start: parsed.0,
                    end: parsed.1,
                };
            }
        }
        if let Some(list) = &self.vlan_list {
            if !list.is_empty() {
                return VlanConfig::List {
                    vlans: list.iter().copied().collect(),
                };
            }
        }
        if !self.manipulation.is_empty() {
            return VlanConfig::Manipulation {
                rules: self.manipulation.clone(),
            };
        }
        if self.port_mode {
            return VlanConfig::PortMode;
        }
        VlanConfig::None
    }
}

fn parse_range(expr: &str) -> Option<(u16, u16)> {
    let (start, end) = expr.split_once('-')?;
    let start = start.trim().parse().ok()?;
    let end = end.trim().parse().ok()?;
    if start <= end {
        Some((start, end))
    } else {
        None
    }
}

/// Outcome of merging interface-level facts into a fragment-level view
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergedVlanFacts {
    /// The winning aggregate configuration
    pub config: VlanConfig,
    /// Outer tag observed anywhere across the members
    pub outer_vlan: Option<u16>,
    /// Plain vlan-id observed anywhere across the members
    pub vlan_id: Option<u16>,
    /// Members that contributed facts
    pub members_with_facts: usize,
    /// Members without any facts
    pub members_without_facts: usize,
    /// Irreconcilable facts were seen across members
    pub conflicting: bool,
}

/// Merge per-interface facts into one fragment-level aggregate.
///
/// Facts from different members must agree arm-by-arm; two members naming
/// different outers (or different single tags) mark the merge conflicting.
/// Members without facts never influence the winner.
pub fn merge_interface_facts<'a, I>(configs: I) -> MergedVlanFacts
where
    I: IntoIterator<Item = &'a VlanConfig>,
{
    let mut winner = VlanConfig::None;
    let mut outer_vlan = None;
    let mut vlan_id = None;
    let mut with_facts = 0usize;
    let mut without_facts = 0usize;
    let mut conflicting = false;

    for config in configs {
        if !config.has_facts() {
            without_facts += 1;
            continue;
        }
        with_facts += 1;

        match config {
            VlanConfig::DoubleTag { outer, .. } => {
                if let Some(seen) = outer_vlan {
                    if seen != *outer {
                        conflicting = true;
                    }
                } else {
                    outer_vlan = Some(*outer);
                }
            }
            VlanConfig::SingleTag { vlan } => {
                if let Some(seen) = vlan_id {
                    if seen != *vlan {
                        conflicting = true;
                    }
                } else {
                    vlan_id = Some(*vlan);
                }
            }
            _ => {}
        }

        if precedence(config) > precedence(&winner) {
            winner = config.clone();
        } else if precedence(config) == precedence(&winner) && *config != winner {
            // Double-tag members that agree on the outer are inner groups
            // of one service, not a conflict.
            let same_outer_qinq = matches!(
                (config, &winner),
                (VlanConfig::DoubleTag { outer: a, .. }, VlanConfig::DoubleTag { outer: b, .. })
                    if a == b
            );
            if !same_outer_qinq {
                conflicting = true;
            }
        }
    }

    // A single tag observed next to double-tag members is a hybrid shape,
    // not a conflict; the double-tag arm stays the winner.
    if matches!(winner, VlanConfig::DoubleTag { .. }) && vlan_id.is_some() {
        conflicting = false;
    }

    MergedVlanFacts {
        config: winner,
        outer_vlan,
        vlan_id,
        members_with_facts: with_facts,
        members_without_facts: without_facts,
        conflicting,
    }
}

fn precedence(config: &VlanConfig) -> u8 {
    match config {
        VlanConfig::DoubleTag { .. } => 6,
        VlanConfig::SingleTag { .. } => 5,
        VlanConfig::Range { .. } => 4,
        VlanConfig::List { .. } => 3,
        VlanConfig::Manipulation { .. } => 2,
        VlanConfig::PortMode => 1,
        VlanConfig::None => 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entry_precedence_double_tag_wins() {
        let entry = VlanConfigEntry {
            interface: "bundle-100.253".into(),
            vlan_id: Some(253),
            outer_vlan: Some(253),
            inner_vlan: Some(10),
            ..Default::default()
        };
        assert_eq!(
            entry.to_config(),
            VlanConfig::DoubleTag { outer: 253, inner: Some(10) }
        );
    }

    #[test]
    fn entry_outer_without_inner_is_a_fact() {
        let entry = VlanConfigEntry {
            interface: "bundle-100.253".into(),
            outer_vlan: Some(253),
            ..Default::default()
        };
        let config = entry.to_config();
        assert_eq!(config, VlanConfig::DoubleTag { outer: 253, inner: None });
        assert!(config.has_facts());
        assert_eq!(config.outer_vlan(), Some(253));
    }

    #[test]
    fn entry_range_parses() {
        let entry = VlanConfigEntry {
            interface: "ge100-0/0/1.100".into(),
            vlan_range: Some("100-200".into()),
            ..Default::default()
        };
        assert_eq!(entry.to_config(), VlanConfig::Range { start: 100, end: 200 });
    }

    #[test]
    fn entry_without_facts_is_none() {
        let entry = VlanConfigEntry {
            interface: "ge100-0/0/1".into(),
            ..Default::default()
        };
        assert_eq!(entry.to_config(), VlanConfig::None);
        assert!(!entry.to_config().has_facts());
    }

    #[test]
    fn merge_agreeing_single_tags() {
        let a = VlanConfig::SingleTag { vlan: 100 };
        let b = VlanConfig::SingleTag { vlan: 100 };
        let merged = merge_interface_facts([&a, &b]);
        assert_eq!(merged.config, VlanConfig::SingleTag { vlan: 100 });
        assert!(!merged.conflicting);
        assert_eq!(merged.members_with_facts, 2);
    }

    #[test]
    fn merge_conflicting_single_tags() {
        let a = VlanConfig::SingleTag { vlan: 100 };
        let b = VlanConfig::SingleTag { vlan: 200 };
        let merged = merge_interface_facts([&a, &b]);
        assert!(merged.conflicting);
    }

    #[test]
    fn merge_hybrid_is_not_conflict() {
        let tagged = VlanConfig::DoubleTag { outer: 253, inner: Some(7) };
        let single = VlanConfig::SingleTag { vlan: 253 };
        let merged = merge_interface_facts([&tagged, &single]);
        assert_eq!(
            merged.config,
            VlanConfig::DoubleTag { outer: 253, inner: Some(7) }
        );
        assert!(!merged.conflicting);
        assert_eq!(merged.outer_vlan, Some(253));
        assert_eq!(merged.vlan_id, Some(253));
    }

    #[test]
    fn merge_outer_only_members_carry_the_outer() {
        let a = VlanConfig::DoubleTag { outer: 253, inner: None };
        let b = VlanConfig::DoubleTag { outer: 253, inner: None };
        let merged = merge_interface_facts([&a, &b]);
        assert_eq!(merged.outer_vlan, Some(253));
        assert_eq!(merged.members_with_facts, 2);
        assert_eq!(merged.members_without_facts, 0);
        assert!(!merged.conflicting);
    }

    #[test]
    fn merge_inner_groups_share_one_outer() {
        let a = VlanConfig::DoubleTag { outer: 253, inner: Some(10) };
        let b = VlanConfig::DoubleTag { outer: 253, inner: Some(20) };
        let merged = merge_interface_facts([&a, &b]);
        assert!(!merged.conflicting);
        assert_eq!(merged.outer_vlan, Some(253));
    }

    #[test]
    fn merge_disagreeing_outers_conflict() {
        let a = VlanConfig::DoubleTag { outer: 100, inner: Some(10) };
        let b = VlanConfig::DoubleTag { outer: 200, inner: Some(10) };
        let merged = merge_interface_facts([&a, &b]);
        assert!(merged.conflicting);
    }

    #[test]
    fn merge_counts_factless_members() {
        let a = VlanConfig::SingleTag { vlan: 100 };
        let none = VlanConfig::None;
        let merged = merge_interface_facts([&a, &none, &none]);
        assert_eq!(merged.members_with_facts, 1);
        assert_eq!(merged.members_without_facts, 2);
        assert!(!merged.conflicting);
    }
}
