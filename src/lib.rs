//! # DNAAS Fabric Core
//!
//! Lifecycle automation for VLAN-based L2 bridge domains across a
//! three-tier spine-leaf fabric. The crate ingests per-device parsed
//! CLI/operational data, normalizes device identities, reconstructs the
//! physical topology, discovers and consolidates deployed bridge domains,
//! computes multi-tier paths and synthesizes per-device configuration for
//! new P2P and P2MP services.
//!
//! Raw-data collection, persistence, the HTTP front-end and the deployment
//! executor are external collaborators; this crate consumes their parsed
//! records and emits structured topology, service and configuration
//! artifacts.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod application;
pub mod config;
pub mod discovery;
pub mod domain;
pub mod normalize;
pub mod path;
pub mod persistence;
pub mod qa;
pub mod topology;
pub mod validation;
pub mod visualization;

pub use application::{DiscoveryReport, FabricConfig, FabricService};
pub use config::{ConfigArtifact, ConfigSynthesizer, TopologyType};
pub use discovery::{
    ConsolidatedBridgeDomain, ConsolidationScope, DiscoveryLimits, DiscoveryOrchestrator,
    DnaasType, InterfaceRole,
};
pub use domain::{
    CoreError, DeviceId, DeviceRole, Endpoint, Issue, IssueKind, ParsedDeviceArtifact,
    ServiceRequest, VlanConfig, VlanId,
};
pub use normalize::DeviceNameNormalizer;
pub use path::{FabricPath, P2mpPlan, PathEngine};
pub use qa::{AuditReport, FabricAuditor};
pub use topology::{TopologyBuilder, TopologyGraph, TopologySnapshot};
pub use validation::RequestValidator;
