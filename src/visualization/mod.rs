//! # Topology and Path Rendering
//!
//! Text renderings for the host CLI: a tier-ordered topology tree and a
//! one-line path trace. Output is deterministic (ascending canonical key
//! at every level) so renders can be diffed across discovery runs.

use crate::domain::DeviceRole;
use crate::path::{FabricPath, P2mpPlan};
use crate::topology::TopologyGraph;
use std::fmt::Write;

/// Tier icon used in tree renderings
fn role_tag(role: DeviceRole) -> &'static str {
    match role {
        DeviceRole::Leaf => "leaf",
        DeviceRole::Spine => "spine",
        DeviceRole::Superspine => "superspine",
        DeviceRole::Unknown => "?",
    }
}

/// Render the fabric as a superspine -> spine -> leaf tree.
///
/// Devices unreachable from any spine are listed in a trailing section so
/// coverage gaps stay visible in the same view.
pub fn render_topology_tree(graph: &TopologyGraph) -> String {
    let mut out = String::new();
    let superspines = graph.devices_with_role(DeviceRole::Superspine);
    let spines = graph.devices_with_role(DeviceRole::Spine);

    for superspine in &superspines {
        let _ = writeln!(out, "{} [superspine]", superspine.id.canonical());
        if let Some(ss_ix) = graph.node_by_key(superspine.id.key()) {
            for spine_ix in graph.neighbors_with_role(ss_ix, DeviceRole::Spine) {
                render_spine(graph, spine_ix, "  ", &mut out);
            }
        }
    }

    // Spines with no superspine still head their own subtree
    for spine in &spines {
        let Some(ix) = graph.node_by_key(spine.id.key()) else {
            continue;
        };
        if graph.neighbors_with_role(ix, DeviceRole::Superspine).is_empty() {
            render_spine(graph, ix, "", &mut out);
        }
    }

    let orphans: Vec<&str> = graph
        .devices()
        .into_iter()
        .filter(|d| d.role == DeviceRole::Leaf)
        .filter(|d| {
            graph
                .node_by_key(d.id.key())
                .map(|ix| graph.neighbors_with_role(ix, DeviceRole::Spine).is_empty())
                .unwrap_or(true)
        })
        .map(|d| d.id.canonical())
        .collect();
    if !orphans.is_empty() {
        let _ = writeln!(out, "unreachable:");
        for name in orphans {
            let _ = writeln!(out, "  {name} [leaf]");
        }
    }
    out
}

fn render_spine(
    graph: &TopologyGraph,
    spine_ix: petgraph::graph::NodeIndex,
    indent: &str,
    out: &mut String,
) {
    let spine = graph.device(spine_ix);
    let _ = writeln!(out, "{indent}{} [spine]", spine.id.canonical());
    for leaf_ix in graph.neighbors_with_role(spine_ix, DeviceRole::Leaf) {
        let leaf = graph.device(leaf_ix);
        let link = graph
            .link_between(leaf_ix, spine_ix)
            .map(|(_, local, remote)| format!(" ({local} -> {remote})"))
            .unwrap_or_default();
        let _ = writeln!(out, "{indent}  {} [leaf]{link}", leaf.id.canonical());
    }
}

/// Render one path as a single arrow-joined line with interfaces
pub fn render_path(path: &FabricPath) -> String {
    let mut out = String::new();
    let _ = write!(out, "{}", path.source.canonical());
    for segment in &path.segments {
        let _ = write!(
            out,
            " -[{}]-> {}",
            segment.source_interface,
            segment.dest_device.canonical()
        );
    }
    out
}

/// Render a P2MP plan: one line per destination plus utilization
pub fn render_p2mp_plan(plan: &P2mpPlan) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "P2MP from {} ({} served, {} failed)",
        plan.source.canonical(),
        plan.served(),
        plan.failed_destinations.len()
    );
    for path in plan.paths.values() {
        let _ = writeln!(out, "  {}", render_path(path));
    }
    for (spine, dests) in &plan.spine_groups {
        let _ = writeln!(out, "  via {spine}: {} destination(s)", dests.len());
    }
    for failed in &plan.failed_destinations {
        let _ = writeln!(out, "  !! {}: {}", failed.device, failed.reason);
    }
    out
}

/// Summarize a device's place in the fabric (tier plus neighbor tiers)
pub fn describe_device(graph: &TopologyGraph, canonical_key: &str) -> Option<String> {
    let ix = graph.node_by_key(canonical_key)?;
    let device = graph.device(ix);
    let mut out = format!("{} [{}]", device.id.canonical(), role_tag(device.role));
    let links = graph.links_from(ix);
    if !links.is_empty() {
        let _ = write!(out, ", {} link(s)", links.len());
    }
    if device.variants.len() > 1 {
        let _ = write!(out, ", {} name variants", device.variants.len());
    }
    Some(out)
}
