//! # Discovery Pipeline
//!
//! Reconstructs deployed L2 services from parsed device data: bridge-domain
//! detection, DNAAS classification, interface-role analysis, global
//! identifier extraction and cross-device consolidation.
//!
//! ```text
//! artifacts ──► detector ──► classifier ──► roles ──► global-id ──► consolidation
//!                  │                                                    │
//!                  └──────────── one topology snapshot per run ◄────────┘
//! ```

pub mod classifier;
pub mod consolidation;
pub mod detector;
pub mod global_id;
pub mod orchestrator;
pub mod roles;

pub use classifier::{Classification, DnaasClassifier, DnaasType, OuterVlanUsage};
pub use consolidation::{
    ClassifiedBridgeDomain, ConsolidatedBridgeDomain, ConsolidatedInterface,
    ConsolidationEngine, ConsolidationProvenance,
};
pub use detector::{
    BridgeDomainDetector, BridgeDomainFragment, BridgeDomainGroup, FragmentInterface,
    FragmentVlanSummary,
};
pub use global_id::{ConsolidationScope, GlobalIdentifierExtractor, GlobalIdentifierResult};
pub use orchestrator::{
    DiscoveryLimits, DiscoveryOrchestrator, DiscoveryOutcome, DiscoverySummary,
};
pub use roles::{InterfaceRole, InterfaceRoleAnalyzer, RoleDecision};
