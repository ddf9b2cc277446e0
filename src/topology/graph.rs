//! The fabric graph.
//!
//! Devices are petgraph nodes, links are undirected edges carrying the
//! interface pair at both ends. Two side indices give O(1) lookup from
//! (device) to its interfaces and from (device, interface) to the link on
//! it. The graph is built once per discovery run and read-only afterwards.

use crate::domain::{DeviceId, DeviceRole, DeviceStatus, InterfaceKind, SpeedClass};
use petgraph::graph::{EdgeIndex, NodeIndex, UnGraph};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};

/// A device in the fabric
#[derive(Debug, Clone)]
pub struct DeviceNode {
    /// Canonical identity
    pub id: DeviceId,
    /// Tier
    pub role: DeviceRole,
    /// Raw name variants observed for this device (NCC control cards of a
    /// superspine chassis all land here)
    pub variants: BTreeSet<String>,
    /// Collector-reported reachability
    pub status: DeviceStatus,
}

/// One interface known on a device
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterfaceInfo {
    /// Interface name
    pub name: String,
    /// Physical / bundle / subinterface
    pub kind: InterfaceKind,
    /// Speed class from the naming convention
    pub speed: SpeedClass,
}

/// How a link was established
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LinkKind {
    /// From a bundle's recorded peer connections
    Bundle,
    /// From a bare LLDP adjacency
    Physical,
}

/// Role pairing of a link's two ends
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkRolePair {
    /// Leaf to spine (either direction)
    LeafSpine,
    /// Spine to superspine (either direction)
    SpineSuperspine,
    /// Leaf to leaf: illegal in this fabric
    LeafLeaf,
    /// Superspine to superspine: illegal in this fabric
    SuperspineSuperspine,
    /// At least one end has an unknown role
    Other,
}

impl LinkRolePair {
    /// Classify from the two endpoint roles
    pub fn classify(a: DeviceRole, b: DeviceRole) -> Self {
        use DeviceRole::*;
        match (a, b) {
            (Leaf, Spine) | (Spine, Leaf) => LinkRolePair::LeafSpine,
            (Spine, Superspine) | (Superspine, Spine) => LinkRolePair::SpineSuperspine,
            (Leaf, Leaf) => LinkRolePair::LeafLeaf,
            (Superspine, Superspine) => LinkRolePair::SuperspineSuperspine,
            _ => LinkRolePair::Other,
        }
    }

    /// Whether this pairing is a fabric transit pair
    pub fn is_fabric(&self) -> bool {
        matches!(self, LinkRolePair::LeafSpine | LinkRolePair::SpineSuperspine)
    }

    /// Leaf-leaf and superspine-superspine links are never legal; links to
    /// unknown-role devices are user-facing, not errors.
    pub fn is_forbidden(&self) -> bool {
        matches!(self, LinkRolePair::LeafLeaf | LinkRolePair::SuperspineSuperspine)
    }
}

/// An undirected link between two (device, interface) endpoints
#[derive(Debug, Clone)]
pub struct LinkEdge {
    /// Interface on the petgraph source end
    pub a_interface: String,
    /// Interface on the petgraph target end
    pub b_interface: String,
    /// Bundle-derived or bare physical
    pub kind: LinkKind,
    /// Role pairing of the two ends
    pub role_pair: LinkRolePair,
    /// Illegal links stay in the graph for reporting but are excluded from
    /// pathfinding
    pub valid: bool,
}

/// A bundle attached to one device
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BundleInfo {
    /// Bundle name
    pub name: String,
    /// Member physical ports
    pub members: BTreeSet<String>,
}

/// Immutable fabric topology with device, interface and link indices
#[derive(Debug, Default)]
pub struct TopologyGraph {
    graph: UnGraph<DeviceNode, LinkEdge>,
    by_key: HashMap<String, NodeIndex>,
    interfaces: HashMap<NodeIndex, BTreeMap<String, InterfaceInfo>>,
    links_by_endpoint: HashMap<(NodeIndex, String), EdgeIndex>,
    bundles: HashMap<NodeIndex, BTreeMap<String, BundleInfo>>,
}

impl TopologyGraph {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn add_device(&mut self, node: DeviceNode) -> NodeIndex {
        if let Some(&ix) = self.by_key.get(node.id.key()) {
            // Merge variants/status into the existing node
            let existing = &mut self.graph[ix];
            existing.variants.extend(node.variants);
            if node.status == DeviceStatus::Failed {
                existing.status = DeviceStatus::Failed;
            }
            return ix;
        }
        let key = node.id.key().to_string();
        let ix = self.graph.add_node(node);
        self.by_key.insert(key, ix);
        ix
    }

    pub(crate) fn add_interface(&mut self, device: NodeIndex, name: &str) {
        self.interfaces
            .entry(device)
            .or_default()
            .entry(name.to_string())
            .or_insert_with(|| InterfaceInfo {
                name: name.to_string(),
                kind: InterfaceKind::from_name(name),
                speed: SpeedClass::from_name(name),
            });
    }

    pub(crate) fn add_bundle(&mut self, device: NodeIndex, name: &str, members: &[String]) {
        let entry = self
            .bundles
            .entry(device)
            .or_default()
            .entry(name.to_string())
            .or_insert_with(|| BundleInfo {
                name: name.to_string(),
                members: BTreeSet::new(),
            });
        entry.members.extend(members.iter().cloned());
        self.add_interface(device, name);
        for member in members {
            self.add_interface(device, member);
        }
    }

    pub(crate) fn add_link(
        &mut self,
        a: NodeIndex,
        a_interface: &str,
        b: NodeIndex,
        b_interface: &str,
        kind: LinkKind,
    ) -> Option<EdgeIndex> {
        if a == b {
            return None;
        }
        // One link per (device, interface) endpoint; first writer wins
        if self.links_by_endpoint.contains_key(&(a, a_interface.to_string()))
            || self.links_by_endpoint.contains_key(&(b, b_interface.to_string()))
        {
            return None;
        }
        let role_pair = LinkRolePair::classify(self.graph[a].role, self.graph[b].role);
        let edge = self.graph.add_edge(
            a,
            b,
            LinkEdge {
                a_interface: a_interface.to_string(),
                b_interface: b_interface.to_string(),
                kind,
                role_pair,
                valid: !role_pair.is_forbidden(),
            },
        );
        self.add_interface(a, a_interface);
        self.add_interface(b, b_interface);
        self.links_by_endpoint.insert((a, a_interface.to_string()), edge);
        self.links_by_endpoint.insert((b, b_interface.to_string()), edge);
        Some(edge)
    }

    /// Node index for a canonical key
    pub fn node_by_key(&self, key: &str) -> Option<NodeIndex> {
        self.by_key.get(key).copied()
    }

    /// The device at a node index
    pub fn device(&self, ix: NodeIndex) -> &DeviceNode {
        &self.graph[ix]
    }

    /// All devices, ascending by canonical key
    pub fn devices(&self) -> Vec<&DeviceNode> {
        let mut keys: Vec<&String> = self.by_key.keys().collect();
        keys.sort();
        keys.iter()
            .filter_map(|k| self.by_key.get(*k))
            .map(|ix| &self.graph[*ix])
            .collect()
    }

    /// Devices of a role, ascending by canonical key
    pub fn devices_with_role(&self, role: DeviceRole) -> Vec<&DeviceNode> {
        self.devices().into_iter().filter(|d| d.role == role).collect()
    }

    /// Interfaces known on a device, ascending by name
    pub fn interfaces_on(&self, ix: NodeIndex) -> Vec<&InterfaceInfo> {
        self.interfaces
            .get(&ix)
            .map(|m| m.values().collect())
            .unwrap_or_default()
    }

    /// Whether a device carries an interface.
    ///
    /// A subinterface `<parent>.<tag>` is present when its parent is.
    pub fn has_interface(&self, ix: NodeIndex, name: &str) -> bool {
        let Some(map) = self.interfaces.get(&ix) else {
            return false;
        };
        if map.contains_key(name) {
            return true;
        }
        match crate::domain::split_subinterface(name) {
            Some((parent, _)) => map.contains_key(parent),
            None => false,
        }
    }

    /// Whether any interface inventory exists for a device
    pub fn has_interface_inventory(&self, ix: NodeIndex) -> bool {
        self.interfaces.get(&ix).map(|m| !m.is_empty()).unwrap_or(false)
    }

    /// The link attached at (device, interface), if one exists
    pub fn link_at(&self, ix: NodeIndex, interface: &str) -> Option<(&LinkEdge, NodeIndex, &str)> {
        let edge = *self.links_by_endpoint.get(&(ix, interface.to_string()))?;
        let (a, b) = self.graph.edge_endpoints(edge)?;
        let link = &self.graph[edge];
        if a == ix {
            Some((link, b, link.b_interface.as_str()))
        } else {
            Some((link, a, link.a_interface.as_str()))
        }
    }

    /// All valid links from a device: (link, local interface, remote node,
    /// remote interface), ascending by local interface
    pub fn links_from(&self, ix: NodeIndex) -> Vec<(&LinkEdge, &str, NodeIndex, &str)> {
        use petgraph::visit::EdgeRef;
        let mut out = Vec::new();
        for edge in self.graph.edges(ix) {
            let link = edge.weight();
            if !link.valid {
                continue;
            }
            // Endpoints as originally added: a_interface belongs to `a`
            let (a, b) = match self.graph.edge_endpoints(edge.id()) {
                Some(pair) => pair,
                None => continue,
            };
            if a == ix {
                out.push((link, link.a_interface.as_str(), b, link.b_interface.as_str()));
            } else {
                out.push((link, link.b_interface.as_str(), a, link.a_interface.as_str()));
            }
        }
        out.sort_by(|x, y| x.1.cmp(y.1));
        out
    }

    /// Every link in the graph (including invalid ones), with endpoints
    pub fn all_links(&self) -> Vec<(&LinkEdge, NodeIndex, NodeIndex)> {
        self.graph
            .edge_indices()
            .filter_map(|e| {
                let (a, b) = self.graph.edge_endpoints(e)?;
                Some((&self.graph[e], a, b))
            })
            .collect()
    }

    /// Neighbor devices of `ix` with the given role, reachable over valid
    /// links, deduplicated and ascending by canonical key
    pub fn neighbors_with_role(&self, ix: NodeIndex, role: DeviceRole) -> Vec<NodeIndex> {
        let mut found: Vec<NodeIndex> = self
            .links_from(ix)
            .into_iter()
            .map(|(_, _, remote, _)| remote)
            .filter(|remote| self.graph[*remote].role == role)
            .collect();
        found.sort_by(|a, b| self.graph[*a].id.key().cmp(self.graph[*b].id.key()));
        found.dedup();
        found
    }

    /// The first valid link connecting two devices, with the local and
    /// remote interfaces seen from `from`; lowest local interface wins.
    pub fn link_between(&self, from: NodeIndex, to: NodeIndex) -> Option<(&LinkEdge, &str, &str)> {
        self.links_from(from)
            .into_iter()
            .find(|(_, _, remote, _)| *remote == to)
            .map(|(link, local, _, remote_if)| (link, local, remote_if))
    }

    /// Bundles on a device, ascending by name
    pub fn bundles_on(&self, ix: NodeIndex) -> Vec<&BundleInfo> {
        self.bundles
            .get(&ix)
            .map(|m| m.values().collect())
            .unwrap_or_default()
    }

    /// Resolve a physical port to the bundle containing it.
    ///
    /// A bundle name resolves to itself; a plain physical port resolves to
    /// `None` when no bundle lists it as a member.
    pub fn bundle_for_interface(&self, ix: NodeIndex, interface: &str) -> Option<&str> {
        let bundles = self.bundles.get(&ix)?;
        if let Some(bundle) = bundles.get(interface) {
            return Some(bundle.name.as_str());
        }
        bundles
            .values()
            .find(|b| b.members.contains(interface))
            .map(|b| b.name.as_str())
    }

    /// Node count
    pub fn device_count(&self) -> usize {
        self.graph.node_count()
    }

    /// Edge count (valid and invalid)
    pub fn link_count(&self) -> usize {
        self.graph.edge_count()
    }
}
