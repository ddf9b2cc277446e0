//! Interface-role assignment from device tier and link evidence.
//!
//! A leaf interface with no link evidence is conservatively ACCESS; a
//! spine or superspine interface with no evidence is flagged ambiguous and
//! left unassigned. There is no fallback guessing above the leaf tier.

use crate::domain::{split_subinterface, DeviceRole};
use crate::topology::TopologyGraph;
use petgraph::graph::NodeIndex;
use serde::{Deserialize, Serialize};

/// Function of an interface within a bridge-domain service
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum_macros::Display,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum InterfaceRole {
    /// User/endpoint facing attachment
    Access,
    /// Toward the next tier up
    Uplink,
    /// Toward the next tier down
    Downlink,
    /// LAG member port carrying traffic for its bundle
    Transport,
}

/// Outcome of a role lookup for one interface
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleDecision {
    /// Assigned role, absent when the interface is ambiguous
    pub role: Option<InterfaceRole>,
    /// True when no evidence allowed an assignment
    pub ambiguous: bool,
    /// Why the interface is ambiguous, when it is
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl RoleDecision {
    fn assigned(role: InterfaceRole) -> Self {
        Self {
            role: Some(role),
            ambiguous: false,
            detail: None,
        }
    }

    fn ambiguous(detail: impl Into<String>) -> Self {
        Self {
            role: None,
            ambiguous: true,
            detail: Some(detail.into()),
        }
    }
}

/// Assigns interface roles against the built topology
pub struct InterfaceRoleAnalyzer<'a> {
    graph: &'a TopologyGraph,
}

impl<'a> InterfaceRoleAnalyzer<'a> {
    /// An analyzer over a built topology
    pub fn new(graph: &'a TopologyGraph) -> Self {
        Self { graph }
    }

    /// Role of `interface` on the device at `ix`.
    ///
    /// Subinterfaces inherit the evidence of their parent; a bare physical
    /// port that is a member of a bundle is TRANSPORT for that bundle.
    pub fn assign(&self, ix: NodeIndex, interface: &str) -> RoleDecision {
        let device = self.graph.device(ix);
        let base = match split_subinterface(interface) {
            Some((parent, _)) => parent,
            None => interface,
        };

        // LAG members carry their bundle's traffic
        if let Some(bundle) = self.graph.bundle_for_interface(ix, base) {
            if bundle != base {
                return RoleDecision::assigned(InterfaceRole::Transport);
            }
        }

        let remote_role = self.remote_role(ix, base);
        match (device.role, remote_role) {
            (DeviceRole::Leaf, Some(DeviceRole::Spine)) => {
                RoleDecision::assigned(InterfaceRole::Uplink)
            }
            // Leaves default to ACCESS: user-facing ports carry no fabric
            // LLDP evidence
            (DeviceRole::Leaf, _) => RoleDecision::assigned(InterfaceRole::Access),

            (DeviceRole::Spine, Some(DeviceRole::Leaf)) => {
                RoleDecision::assigned(InterfaceRole::Downlink)
            }
            (DeviceRole::Spine, Some(DeviceRole::Superspine)) => {
                RoleDecision::assigned(InterfaceRole::Uplink)
            }
            (DeviceRole::Spine, _) => RoleDecision::ambiguous(format!(
                "no link evidence for {} on spine {}",
                interface,
                device.id.canonical()
            )),

            (DeviceRole::Superspine, Some(DeviceRole::Spine)) => {
                RoleDecision::assigned(InterfaceRole::Downlink)
            }
            // A link to a non-fabric device is user-facing evidence
            (DeviceRole::Superspine, Some(DeviceRole::Unknown)) => {
                RoleDecision::assigned(InterfaceRole::Access)
            }
            (DeviceRole::Superspine, _) => RoleDecision::ambiguous(format!(
                "no link evidence for {} on superspine {}",
                interface,
                device.id.canonical()
            )),

            (DeviceRole::Unknown, _) => RoleDecision::ambiguous(format!(
                "device {} has unknown role",
                device.id.canonical()
            )),
        }
    }

    /// Role of the device on the far side of the link at (device, base
    /// interface), resolving bundles through their member ports.
    fn remote_role(&self, ix: NodeIndex, base: &str) -> Option<DeviceRole> {
        if let Some((_, remote, _)) = self.graph.link_at(ix, base) {
            return Some(self.graph.device(remote).role);
        }
        // A bundle itself carries no link; its members do
        let bundle = self
            .graph
            .bundles_on(ix)
            .into_iter()
            .find(|b| b.name == base)?;
        bundle
            .members
            .iter()
            .find_map(|member| self.graph.link_at(ix, member))
            .map(|(_, remote, _)| self.graph.device(remote).role)
    }
}
