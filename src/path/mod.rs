//! # Path Engine
//!
//! Pure path computation over the read-only topology: 2-tier and 3-tier
//! leaf-to-leaf paths, leaf-to-superspine attachment and P2MP planning
//! with shared-spine optimization. No synchronization; safe to call from
//! concurrent requests.

pub mod engine;
pub mod p2mp;

pub use engine::{FabricPath, PathEngine, PathFailure, PathTier, Segment, SegmentKind};
pub use p2mp::{calculate_p2mp_paths, plan_succeeded, FailedDestination, P2mpMetrics, P2mpPlan};
