//! DNAAS service-type classification.
//!
//! Types are decided only from CLI-derived VLAN facts (never device roles
//! or interface names) plus one cross-group observation: whether other
//! bridge domains use the same outer tag.

use crate::discovery::detector::{BridgeDomainGroup, FragmentVlanSummary};
use crate::domain::vlan::VlanConfig;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// The closed DNAAS type set
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    strum_macros::Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum DnaasType {
    /// Type 1: explicit outer+inner on the members
    DoubleTagged,
    /// Type 2A: one outer tag, the inner groups share one bridge domain
    QinqSingleBd,
    /// Type 2B: one outer tag mapped to multiple bridge domains by inner
    QinqMultiBd,
    /// Type 3: double-tagged and single-tagged members under one outer
    Hybrid,
    /// Type 4A: one vlan-id across the members
    SingleTagged,
    /// Type 4B: a contiguous vlan-id range
    SingleTaggedRange,
    /// Type 4B: an explicit vlan-id list
    SingleTaggedList,
    /// Type 5: untagged L2, no VLAN facts
    PortMode,
    /// Conflicting facts; kept with reduced confidence
    Unknown,
}

impl DnaasType {
    /// Short type code ("1", "2A", ... "5")
    pub fn code(&self) -> &'static str {
        match self {
            DnaasType::DoubleTagged => "1",
            DnaasType::QinqSingleBd => "2A",
            DnaasType::QinqMultiBd => "2B",
            DnaasType::Hybrid => "3",
            DnaasType::SingleTagged => "4A",
            DnaasType::SingleTaggedRange | DnaasType::SingleTaggedList => "4B",
            DnaasType::PortMode => "5",
            DnaasType::Unknown => "?",
        }
    }

    /// Types keyed by an outer (service) tag
    pub fn is_qinq(&self) -> bool {
        matches!(
            self,
            DnaasType::DoubleTagged
                | DnaasType::QinqSingleBd
                | DnaasType::QinqMultiBd
                | DnaasType::Hybrid
        )
    }

    /// Types keyed by a plain vlan-id
    pub fn is_single_tagged(&self) -> bool {
        matches!(self, DnaasType::SingleTagged)
    }

    /// Range or list shapes
    pub fn is_range_or_list(&self) -> bool {
        matches!(self, DnaasType::SingleTaggedRange | DnaasType::SingleTaggedList)
    }
}

/// A classified bridge-domain group
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Classification {
    /// Assigned type
    pub dnaas_type: DnaasType,
    /// Fact-completeness driven confidence in [0,1]
    pub confidence: f64,
}

/// How every outer tag is used across all detected bridge domains
#[derive(Debug, Clone, Default)]
pub struct OuterVlanUsage {
    by_outer: BTreeMap<u16, Vec<(String, BTreeSet<u16>)>>,
}

impl OuterVlanUsage {
    /// Survey outer usage across detected groups
    pub fn survey(groups: &[BridgeDomainGroup]) -> Self {
        let mut by_outer: BTreeMap<u16, Vec<(String, BTreeSet<u16>)>> = BTreeMap::new();
        for group in groups {
            let summary = group.vlan_summary();
            if let Some(outer) = summary.outer_vlan {
                by_outer
                    .entry(outer)
                    .or_default()
                    .push((group.name.clone(), summary.inner_vlans.clone()));
            }
        }
        Self { by_outer }
    }

    /// Bridge domains other than `name` using the same outer
    pub fn shared_with(&self, outer: u16, name: &str) -> Vec<&(String, BTreeSet<u16>)> {
        self.by_outer
            .get(&outer)
            .map(|users| users.iter().filter(|(n, _)| n != name).collect())
            .unwrap_or_default()
    }
}

/// Classifies bridge-domain groups into DNAAS types
pub struct DnaasClassifier;

impl DnaasClassifier {
    /// Classify one group given the fabric-wide outer-tag survey
    pub fn classify(group: &BridgeDomainGroup, usage: &OuterVlanUsage) -> Classification {
        let summary = group.vlan_summary();
        let completeness = summary.completeness();

        if summary.conflicting {
            return Classification {
                dnaas_type: DnaasType::Unknown,
                confidence: (completeness * 0.5).min(0.5),
            };
        }

        let dnaas_type = Self::decide(&group.name, &summary, usage);
        Classification {
            dnaas_type,
            confidence: completeness,
        }
    }

    fn decide(name: &str, summary: &FragmentVlanSummary, usage: &OuterVlanUsage) -> DnaasType {
        if let Some(outer) = summary.outer_vlan {
            // Range/list under an outer tag stays a range/list service;
            // the outer only feeds the consolidation key.
            match &summary.aggregate {
                VlanConfig::Range { .. } => return DnaasType::SingleTaggedRange,
                VlanConfig::List { .. } => return DnaasType::SingleTaggedList,
                _ => {}
            }

            // Type 1 and Type 3 both need members that pin an inner tag;
            // an outer-only aggregate is the per-outer service side.
            let explicit_double =
                matches!(summary.aggregate, VlanConfig::DoubleTag { inner: Some(_), .. });
            let has_bare_single = summary.vlan_id.is_some();
            if explicit_double && has_bare_single {
                return DnaasType::Hybrid;
            }
            if summary.inner_vlans.len() > 1 {
                return DnaasType::QinqSingleBd;
            }

            let sharers = usage.shared_with(outer, name);
            if sharers.is_empty() {
                return if explicit_double {
                    DnaasType::DoubleTagged
                } else {
                    // Outer observed without an inner and not shared:
                    // a single-service QinQ umbrella
                    DnaasType::QinqSingleBd
                };
            }
            // Shared outer: a multi-BD mapping keyed by distinct inners is
            // 2B, anything else folds into the single-service 2A shape.
            let my_inner = summary.inner_vlans.iter().next().copied();
            let distinct_inner_mapping = my_inner.is_some()
                && sharers.iter().all(|(_, inners)| {
                    !inners.is_empty() && inners.iter().next().copied() != my_inner
                });
            if distinct_inner_mapping {
                return DnaasType::QinqMultiBd;
            }
            return DnaasType::QinqSingleBd;
        }

        match &summary.aggregate {
            VlanConfig::SingleTag { .. } => DnaasType::SingleTagged,
            VlanConfig::Range { .. } => DnaasType::SingleTaggedRange,
            VlanConfig::List { .. } => DnaasType::SingleTaggedList,
            VlanConfig::Manipulation { rules } => {
                // Push rules without a plain tag are edge-managed QinQ
                if rules.iter().any(|r| r.operation.eq_ignore_ascii_case("push")) {
                    DnaasType::QinqSingleBd
                } else {
                    DnaasType::Unknown
                }
            }
            VlanConfig::DoubleTag { .. } => DnaasType::DoubleTagged,
            VlanConfig::PortMode | VlanConfig::None => DnaasType::PortMode,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::discovery::detector::{BridgeDomainFragment, FragmentInterface};
    use crate::domain::InterfaceKind;
    use crate::normalize::DeviceNameNormalizer;

    fn group(name: &str, device: &str, interfaces: Vec<FragmentInterface>) -> BridgeDomainGroup {
        let normalizer = DeviceNameNormalizer::new();
        let mut summary = FragmentVlanSummary::default();
        let merged =
            crate::domain::vlan::merge_interface_facts(interfaces.iter().map(|i| &i.vlan));
        summary.aggregate = merged.config;
        summary.outer_vlan = merged.outer_vlan;
        summary.vlan_id = merged.vlan_id;
        summary.members_with_facts = merged.members_with_facts;
        summary.members_without_facts = merged.members_without_facts;
        summary.conflicting = merged.conflicting;
        for interface in &interfaces {
            if let VlanConfig::DoubleTag { inner: Some(inner), .. } = interface.vlan {
                summary.inner_vlans.insert(inner);
            }
        }
        BridgeDomainGroup {
            name: name.into(),
            fragments: vec![BridgeDomainFragment {
                name: name.into(),
                device: normalizer.device_id(device),
                admin_state: "enabled".into(),
                interfaces,
                vlan: summary,
            }],
        }
    }

    fn double_tag_if(name: &str, outer: u16, inner: u16) -> FragmentInterface {
        FragmentInterface {
            name: name.into(),
            kind: InterfaceKind::from_name(name),
            vlan: VlanConfig::DoubleTag { outer, inner: Some(inner) },
        }
    }

    fn single_tag_if(name: &str, vlan: u16) -> FragmentInterface {
        FragmentInterface {
            name: name.into(),
            kind: InterfaceKind::from_name(name),
            vlan: VlanConfig::SingleTag { vlan },
        }
    }

    #[test]
    fn plain_double_tag_is_type_1() {
        let g = group("g_u_v100", "DNAAS-LEAF-B14", vec![double_tag_if("bundle-1.100", 100, 10)]);
        let usage = OuterVlanUsage::survey(std::slice::from_ref(&g));
        let c = DnaasClassifier::classify(&g, &usage);
        assert_eq!(c.dnaas_type, DnaasType::DoubleTagged);
        assert_eq!(c.dnaas_type.code(), "1");
        assert!((c.confidence - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn many_inners_in_one_bd_is_type_2a() {
        let g = group(
            "g_u_v100",
            "DNAAS-LEAF-B14",
            vec![
                double_tag_if("bundle-1.10", 100, 10),
                double_tag_if("bundle-1.20", 100, 20),
            ],
        );
        let usage = OuterVlanUsage::survey(std::slice::from_ref(&g));
        let c = DnaasClassifier::classify(&g, &usage);
        assert_eq!(c.dnaas_type, DnaasType::QinqSingleBd);
    }

    #[test]
    fn outer_mapped_to_bds_by_inner_is_type_2b() {
        let g1 = group("g_u_v100_a", "DNAAS-LEAF-B14", vec![double_tag_if("bundle-1.10", 100, 10)]);
        let g2 = group("g_u_v100_b", "DNAAS-LEAF-B14", vec![double_tag_if("bundle-1.20", 100, 20)]);
        let groups = vec![g1, g2];
        let usage = OuterVlanUsage::survey(&groups);
        let c = DnaasClassifier::classify(&groups[0], &usage);
        assert_eq!(c.dnaas_type, DnaasType::QinqMultiBd);
        assert_eq!(c.dnaas_type.code(), "2B");
    }

    #[test]
    fn outer_only_members_are_qinq_not_port_mode() {
        let outer_only = FragmentInterface {
            name: "bundle-100.253".into(),
            kind: InterfaceKind::Subinterface,
            vlan: VlanConfig::DoubleTag { outer: 253, inner: None },
        };
        let g = group("g_visaev_v253", "DNAAS-LEAF-B14", vec![outer_only]);
        let usage = OuterVlanUsage::survey(std::slice::from_ref(&g));
        let c = DnaasClassifier::classify(&g, &usage);
        assert_eq!(c.dnaas_type, DnaasType::QinqSingleBd);
        assert!((c.confidence - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn shared_outer_without_inners_is_type_2a() {
        let member = |name: &str| FragmentInterface {
            name: name.into(),
            kind: InterfaceKind::Subinterface,
            vlan: VlanConfig::DoubleTag { outer: 253, inner: None },
        };
        let groups = vec![
            group("g_visaev_v253_a", "DNAAS-LEAF-B14", vec![member("bundle-100.253")]),
            group("g_visaev_v253_b", "DNAAS-LEAF-B15", vec![member("bundle-100.253")]),
        ];
        let usage = OuterVlanUsage::survey(&groups);
        for g in &groups {
            let c = DnaasClassifier::classify(g, &usage);
            assert_eq!(c.dnaas_type, DnaasType::QinqSingleBd);
        }
    }

    #[test]
    fn mixed_members_are_type_3() {
        let g = group(
            "g_u_v100",
            "DNAAS-LEAF-B14",
            vec![
                double_tag_if("bundle-1.10", 100, 10),
                single_tag_if("ge100-0/0/5.100", 100),
            ],
        );
        let usage = OuterVlanUsage::survey(std::slice::from_ref(&g));
        let c = DnaasClassifier::classify(&g, &usage);
        assert_eq!(c.dnaas_type, DnaasType::Hybrid);
    }

    #[test]
    fn single_tag_is_type_4a() {
        let g = group("v100_bd", "DNAAS-LEAF-B14", vec![single_tag_if("ge100-0/0/5.100", 100)]);
        let usage = OuterVlanUsage::survey(std::slice::from_ref(&g));
        let c = DnaasClassifier::classify(&g, &usage);
        assert_eq!(c.dnaas_type, DnaasType::SingleTagged);
        assert_eq!(c.dnaas_type.code(), "4A");
    }

    #[test]
    fn range_is_type_4b() {
        let g = group(
            "range_bd",
            "DNAAS-LEAF-B14",
            vec![FragmentInterface {
                name: "ge100-0/0/5".into(),
                kind: InterfaceKind::Physical,
                vlan: VlanConfig::Range { start: 100, end: 200 },
            }],
        );
        let usage = OuterVlanUsage::survey(std::slice::from_ref(&g));
        let c = DnaasClassifier::classify(&g, &usage);
        assert_eq!(c.dnaas_type, DnaasType::SingleTaggedRange);
        assert_eq!(c.dnaas_type.code(), "4B");
    }

    #[test]
    fn no_facts_is_port_mode() {
        let g = group(
            "portmode_bd",
            "DNAAS-LEAF-B14",
            vec![FragmentInterface {
                name: "ge100-0/0/5".into(),
                kind: InterfaceKind::Physical,
                vlan: VlanConfig::None,
            }],
        );
        let usage = OuterVlanUsage::survey(std::slice::from_ref(&g));
        let c = DnaasClassifier::classify(&g, &usage);
        assert_eq!(c.dnaas_type, DnaasType::PortMode);
        assert_eq!(c.dnaas_type.code(), "5");
    }

    #[test]
    fn conflicts_cap_confidence() {
        let g = group(
            "conflict_bd",
            "DNAAS-LEAF-B14",
            vec![single_tag_if("a.100", 100), single_tag_if("b.200", 200)],
        );
        let usage = OuterVlanUsage::survey(std::slice::from_ref(&g));
        let c = DnaasClassifier::classify(&g, &usage);
        assert_eq!(c.dnaas_type, DnaasType::Unknown);
        assert!(c.confidence <= 0.5);
    }
}
