//! Consolidation of per-device bridge-domain fragments into global
//! services.
//!
//! Fragments sharing `(username?, global identifier)` merge into one
//! consolidated bridge domain carrying the union of devices and
//! interfaces, full provenance, and the paths attached afterwards for
//! reporting. Fragments with neither identifier nor username stay
//! unconsolidated.

use crate::discovery::classifier::{Classification, DnaasType};
use crate::discovery::detector::BridgeDomainGroup;
use crate::discovery::global_id::{ConsolidationScope, GlobalIdentifierResult};
use crate::discovery::roles::InterfaceRole;
use crate::domain::vlan::VlanConfig;
use crate::domain::{Issue, IssueKind};
use crate::path::FabricPath;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One interface of a consolidated bridge domain, with its assigned role
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsolidatedInterface {
    /// Device canonical name
    pub device: String,
    /// Interface name
    pub name: String,
    /// Assigned role, absent when ambiguous
    pub role: Option<InterfaceRole>,
    /// Flagged when no role evidence existed
    #[serde(default)]
    pub ambiguous: bool,
    /// CLI-derived VLAN facts
    pub vlan_facts: VlanConfig,
}

/// Where a consolidated bridge domain came from
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConsolidationProvenance {
    /// Original fragment bridge-domain names, ascending
    pub original_names: Vec<String>,
    /// How many fragments merged
    pub consolidated_count: usize,
    /// Per-fragment classification confidence
    pub fragment_confidences: BTreeMap<String, f64>,
}

/// A consolidated bridge-domain service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsolidatedBridgeDomain {
    /// Synthesized canonical service name
    pub consolidated_name: String,
    /// Consolidation identifier (outer VLAN or vlan-id), when present
    pub global_identifier: Option<u16>,
    /// Username parsed from the fragment names, when present
    pub username: Option<String>,
    /// Scope classification
    pub scope: ConsolidationScope,
    /// Merged DNAAS type
    pub dnaas_type: DnaasType,
    /// Merged confidence
    pub confidence: f64,
    /// Devices carrying the service, ascending canonical names
    pub devices: Vec<String>,
    /// All member interfaces with roles
    pub interfaces: Vec<ConsolidatedInterface>,
    /// Inter-device paths for reporting; empty for LOCAL scope
    pub paths: Vec<FabricPath>,
    /// Merge provenance
    pub consolidation_provenance: ConsolidationProvenance,
    /// Warnings raised while merging
    pub issues: Vec<Issue>,
}

/// A classified group ready for consolidation
#[derive(Debug, Clone)]
pub struct ClassifiedBridgeDomain {
    /// The detected group
    pub group: BridgeDomainGroup,
    /// Its DNAAS classification
    pub classification: Classification,
    /// Its identifier extraction result
    pub global_id: GlobalIdentifierResult,
    /// Username parsed from the name
    pub username: Option<String>,
    /// Interfaces with roles resolved against the topology
    pub interfaces: Vec<ConsolidatedInterface>,
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
enum MergeKey {
    Keyed(Option<String>, u16),
    Unkeyed(String),
}

/// Merges classified bridge domains by consolidation key
pub struct ConsolidationEngine;

impl ConsolidationEngine {
    /// Consolidate classified groups. Output is ordered ascending by
    /// consolidated name so repeated runs are byte-identical.
    pub fn consolidate(classified: Vec<ClassifiedBridgeDomain>) -> Vec<ConsolidatedBridgeDomain> {
        let mut buckets: BTreeMap<MergeKey, Vec<ClassifiedBridgeDomain>> = BTreeMap::new();
        for item in classified {
            let key = match item.global_id.identifier {
                Some(id) => MergeKey::Keyed(item.username.clone(), id),
                None => MergeKey::Unkeyed(item.group.name.clone()),
            };
            buckets.entry(key).or_default().push(item);
        }

        let mut out: Vec<ConsolidatedBridgeDomain> = buckets
            .into_iter()
            .map(|(key, items)| Self::merge(key, items))
            .collect();
        out.sort_by(|a, b| a.consolidated_name.cmp(&b.consolidated_name));
        tracing::info!(consolidated = out.len(), "consolidation complete");
        out
    }

    fn merge(key: MergeKey, items: Vec<ClassifiedBridgeDomain>) -> ConsolidatedBridgeDomain {
        let mut issues = Vec::new();

        let mut original_names: Vec<String> =
            items.iter().map(|i| i.group.name.clone()).collect();
        original_names.sort();
        original_names.dedup();

        let mut fragment_confidences = BTreeMap::new();
        for item in &items {
            fragment_confidences.insert(item.group.name.clone(), item.classification.confidence);
        }

        let mut devices: Vec<String> = items
            .iter()
            .flat_map(|i| i.group.devices())
            .collect();
        devices.sort();
        devices.dedup();

        let mut interfaces: Vec<ConsolidatedInterface> = items
            .iter()
            .flat_map(|i| i.interfaces.iter().cloned())
            .collect();
        interfaces.sort_by(|a, b| (&a.device, &a.name).cmp(&(&b.device, &b.name)));
        interfaces.dedup_by(|a, b| a.device == b.device && a.name == b.name);

        let types: Vec<DnaasType> = items.iter().map(|i| i.classification.dnaas_type).collect();
        let (dnaas_type, type_conflict) = Self::merge_types(&types);
        let mut confidence = items
            .iter()
            .map(|i| i.classification.confidence)
            .fold(f64::INFINITY, f64::min);
        if !confidence.is_finite() {
            confidence = 0.0;
        }
        if type_conflict {
            confidence *= 0.7;
            let detail = format!(
                "merged fragments disagree on DNAAS type ({}); using {}",
                types
                    .iter()
                    .map(|t| t.code())
                    .collect::<Vec<_>>()
                    .join(", "),
                dnaas_type.code()
            );
            tracing::warn!("{detail}");
            issues.push(Issue::new(IssueKind::ConsolidationConflict, detail));
        }

        let (username, identifier) = match &key {
            MergeKey::Keyed(username, id) => (username.clone(), Some(*id)),
            MergeKey::Unkeyed(_) => (
                items.first().and_then(|i| i.username.clone()),
                None,
            ),
        };

        let scope = match identifier {
            None => ConsolidationScope::Local,
            Some(_) if devices.len() > 1 => ConsolidationScope::GlobalDeployment,
            Some(_) => ConsolidationScope::LocalDeployment,
        };

        let consolidated_name = match (&username, identifier, &key) {
            (Some(user), Some(id), _) => format!("g_{user}_v{id}"),
            (None, Some(id), _) => format!("g_v{id}"),
            (_, None, MergeKey::Unkeyed(name)) => name.clone(),
            (_, None, MergeKey::Keyed(..)) => original_names[0].clone(),
        };

        ConsolidatedBridgeDomain {
            consolidated_name,
            global_identifier: identifier,
            username,
            scope,
            dnaas_type,
            confidence,
            devices,
            interfaces,
            paths: Vec::new(),
            consolidation_provenance: ConsolidationProvenance {
                consolidated_count: original_names.len(),
                original_names,
                fragment_confidences,
            },
            issues,
        }
    }

    /// Unanimous type survives; mixed types fold to the most permissive
    /// compatible family member.
    fn merge_types(types: &[DnaasType]) -> (DnaasType, bool) {
        let first = match types.first() {
            Some(t) => *t,
            None => return (DnaasType::Unknown, false),
        };
        if types.iter().all(|t| *t == first) {
            return (first, false);
        }
        if types.iter().any(|t| *t == DnaasType::Unknown || *t == DnaasType::PortMode) {
            return (DnaasType::Unknown, true);
        }
        let any_single = types
            .iter()
            .any(|t| t.is_single_tagged() || t.is_range_or_list());
        let any_qinq = types.iter().any(|t| t.is_qinq());
        if any_qinq && any_single {
            return (DnaasType::Hybrid, true);
        }
        if any_qinq {
            let merged = if types.iter().any(|t| *t == DnaasType::Hybrid) {
                DnaasType::Hybrid
            } else {
                // Fragments of one keyed service under a shared outer form
                // a single consolidated bridge domain
                DnaasType::QinqSingleBd
            };
            return (merged, true);
        }
        let merged = if types.iter().any(|t| *t == DnaasType::SingleTaggedList) {
            DnaasType::SingleTaggedList
        } else if types.iter().any(|t| *t == DnaasType::SingleTaggedRange) {
            DnaasType::SingleTaggedRange
        } else {
            DnaasType::SingleTagged
        };
        (merged, true)
    }
}
