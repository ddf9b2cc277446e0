//! # Configuration Synthesis
//!
//! Turns a validated service request plus computed paths into ordered
//! per-device CLI command lists. Output ordering is deterministic: devices
//! ascend by canonical name, uplink sub-interfaces precede access ports,
//! and names sort ascending within each group.

pub mod artifact;
pub mod synthesizer;

pub use artifact::{ArtifactMetadata, ConfigArtifact, TopologyType};
pub use synthesizer::ConfigSynthesizer;
