//! Global-identifier extraction for cross-device consolidation.
//!
//! QinQ families consolidate on the outer tag, single-tagged services on
//! the vlan-id, port-mode not at all. The username, when the bridge-domain
//! name carries one, narrows the consolidation key.

use crate::discovery::classifier::DnaasType;
use crate::discovery::detector::BridgeDomainGroup;
use serde::{Deserialize, Serialize};

/// How far a bridge domain may consolidate
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
pub enum ConsolidationScope {
    /// No global identifier: stays device-local
    Local,
    /// Identifier present but deployed on a single device
    LocalDeployment,
    /// Identifier present and deployed across devices
    GlobalDeployment,
}

/// Identifier extraction outcome for one bridge-domain group
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GlobalIdentifierResult {
    /// The bridge-domain name examined
    pub bridge_domain: String,
    /// The consolidation identifier (a VLAN tag), when one exists
    pub identifier: Option<u16>,
    /// Scope classification
    pub scope: ConsolidationScope,
    /// Whether cross-device consolidation is possible
    pub can_consolidate_globally: bool,
    /// Which rule produced the identifier
    pub extraction_method: String,
    /// Extraction confidence
    pub confidence: f64,
}

/// Extracts consolidation identifiers from classified bridge domains
pub struct GlobalIdentifierExtractor;

impl GlobalIdentifierExtractor {
    /// Extract the identifier and scope for a classified group
    pub fn extract(group: &BridgeDomainGroup, dnaas_type: DnaasType) -> GlobalIdentifierResult {
        let summary = group.vlan_summary();
        let device_count = group.devices().len();

        if dnaas_type.is_qinq() {
            return match summary.outer_vlan {
                Some(outer) => Self::keyed(group, outer, device_count, "qinq_outer_vlan", 0.95),
                None => {
                    tracing::warn!(bd = %group.name, "QinQ bridge domain missing outer VLAN");
                    Self::local(group, "qinq_missing_outer_vlan")
                }
            };
        }
        if dnaas_type.is_single_tagged() {
            return match summary.vlan_id {
                Some(vlan) => Self::keyed(group, vlan, device_count, "single_tagged_vlan_id", 0.90),
                None => {
                    tracing::warn!(bd = %group.name, "single-tagged bridge domain missing VLAN ID");
                    Self::local(group, "single_tagged_missing_vlan")
                }
            };
        }
        if dnaas_type.is_range_or_list() {
            // Nested QinQ with a range keys on the outer; a bare range is
            // local only
            return match summary.outer_vlan {
                Some(outer) => {
                    Self::keyed(group, outer, device_count, "range_list_qinq_outer_vlan", 0.85)
                }
                None => Self::local(group, "range_list_local_only"),
            };
        }
        if dnaas_type == DnaasType::PortMode {
            return Self::local(group, "port_mode_local_only");
        }
        Self::local(group, "unknown_type_default")
    }

    /// Pull a username out of a bridge-domain name.
    ///
    /// Recognized shapes, tried in order: `g_<user>_v<vlan>` /
    /// `l_<user>_<desc>`, `<user>_v<vlan>`, `<user>_<anything>`.
    pub fn extract_username(bridge_domain_name: &str) -> Option<String> {
        let lower = bridge_domain_name.to_ascii_lowercase();
        let segments: Vec<&str> = lower.split('_').collect();
        if segments.len() < 2 {
            return None;
        }

        if (segments[0] == "g" || segments[0] == "l") && segments.len() >= 3 {
            if !segments[1].is_empty() {
                return Some(segments[1].to_string());
            }
        }
        if !segments[0].is_empty() {
            return Some(segments[0].to_string());
        }
        None
    }

    fn keyed(
        group: &BridgeDomainGroup,
        identifier: u16,
        device_count: usize,
        method: &str,
        confidence: f64,
    ) -> GlobalIdentifierResult {
        let scope = if device_count > 1 {
            ConsolidationScope::GlobalDeployment
        } else {
            ConsolidationScope::LocalDeployment
        };
        GlobalIdentifierResult {
            bridge_domain: group.name.clone(),
            identifier: Some(identifier),
            scope,
            can_consolidate_globally: scope == ConsolidationScope::GlobalDeployment,
            extraction_method: method.to_string(),
            confidence,
        }
    }

    fn local(group: &BridgeDomainGroup, method: &str) -> GlobalIdentifierResult {
        GlobalIdentifierResult {
            bridge_domain: group.name.clone(),
            identifier: None,
            scope: ConsolidationScope::Local,
            can_consolidate_globally: false,
            extraction_method: method.to_string(),
            confidence: 0.95,
        }
    }
}
