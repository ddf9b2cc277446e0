//! Point-to-multipoint path planning.
//!
//! Computes one path per destination, groups destinations by the spine
//! they were served through, and reports shared-spine utilization. A
//! destination with no viable path is dropped from the plan with its skip
//! reason; the plan as a whole succeeds when at least one destination is
//! served.

use crate::domain::DeviceId;
use crate::path::engine::{FabricPath, PathEngine, PathTier};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tokio_util::sync::CancellationToken;

/// A destination that could not be served
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailedDestination {
    /// Destination device (canonical name)
    pub device: String,
    /// Machine-readable skip reason
    pub reason: String,
    /// Human-readable detail
    pub detail: String,
}

/// Shared-spine utilization summary
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct P2mpMetrics {
    /// Distinct spines used across all served destinations
    pub total_spines_used: usize,
    /// served / requested
    pub path_efficiency: f64,
}

/// The outcome of P2MP path planning
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct P2mpPlan {
    /// Source leaf
    pub source: DeviceId,
    /// Served destinations, keyed by destination canonical key
    pub paths: BTreeMap<String, FabricPath>,
    /// Destinations grouped by the spine that serves them (spine canonical
    /// name -> destination canonical names, both ascending)
    pub spine_groups: BTreeMap<String, Vec<String>>,
    /// Utilization summary
    pub metrics: P2mpMetrics,
    /// Destinations dropped from the plan
    pub failed_destinations: Vec<FailedDestination>,
    /// True when planning was cut short by cancellation
    pub cancelled: bool,
}

impl P2mpPlan {
    /// Number of destinations served
    pub fn served(&self) -> usize {
        self.paths.len()
    }

    /// served + failed == requested
    pub fn requested(&self) -> usize {
        self.paths.len() + self.failed_destinations.len()
    }
}

/// Plan paths from one source leaf to many destination leaves.
///
/// Planning honors `cancel`: a fired token stops the per-destination loop
/// and returns the partial plan with `cancelled = true`.
pub fn calculate_p2mp_paths(
    engine: &PathEngine<'_>,
    source: &DeviceId,
    destinations: &[DeviceId],
    cancel: &CancellationToken,
) -> P2mpPlan {
    tracing::info!(
        source = %source.canonical(),
        destinations = destinations.len(),
        "planning P2MP paths"
    );

    let mut paths = BTreeMap::new();
    let mut failed = Vec::new();
    let mut cancelled = false;

    for dest in destinations {
        if cancel.is_cancelled() {
            cancelled = true;
            tracing::warn!("P2MP planning cancelled; returning partial plan");
            break;
        }
        match engine.calculate_path(source, dest) {
            Ok(path) => {
                paths.insert(dest.key().to_string(), path);
            }
            Err(failure) => {
                tracing::warn!(
                    dest = %dest.canonical(),
                    reason = failure.reason_code(),
                    "destination dropped from P2MP plan"
                );
                failed.push(FailedDestination {
                    device: dest.canonical().to_string(),
                    reason: failure.reason_code().to_string(),
                    detail: failure.to_string(),
                });
            }
        }
    }

    let mut spine_groups: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for path in paths.values() {
        let spine = match &path.tier {
            PathTier::TwoTier { spine } => spine,
            PathTier::ThreeTier { source_spine, .. } => source_spine,
            PathTier::ToSuperspine { spine } => spine,
        };
        spine_groups
            .entry(spine.canonical().to_string())
            .or_default()
            .push(path.destination.canonical().to_string());
    }
    for group in spine_groups.values_mut() {
        group.sort();
    }

    let requested = destinations.len();
    let metrics = P2mpMetrics {
        total_spines_used: spine_groups.len(),
        path_efficiency: if requested == 0 {
            0.0
        } else {
            paths.len() as f64 / requested as f64
        },
    };

    P2mpPlan {
        source: source.clone(),
        paths,
        spine_groups,
        metrics,
        failed_destinations: failed,
        cancelled,
    }
}

/// Convenience: does the plan serve anyone at all
pub fn plan_succeeded(plan: &P2mpPlan) -> bool {
    plan.served() >= 1
}
