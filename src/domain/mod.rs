//! # Fabric Domain Layer
//!
//! Value objects, VLAN fact model and error taxonomy shared by the whole
//! pipeline. Everything here is plain data: no I/O, no device interaction.

pub mod errors;
pub mod ports;
pub mod value_objects;
pub mod vlan;

pub use errors::{CoreError, Issue, IssueKind};
pub use ports::{
    ArtifactSource, BdInstanceRecord, BundlePeer, BundleRecord, DeviceStatus, NeighborRecord,
    ParsedDeviceArtifact,
};
pub use value_objects::{
    split_subinterface, DeviceId, DeviceRole, Endpoint, InterfaceKind, ServiceName,
    ServiceNameError, ServiceRequest, SpeedClass, VlanId, VlanIdError,
    DEFAULT_SERVICE_NAME_LIMIT,
};
pub use vlan::{
    merge_interface_facts, ManipulationRule, MergedVlanFacts, VlanConfig, VlanConfigEntry,
};
