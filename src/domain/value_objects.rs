//! Value objects for the fabric domain

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use thiserror::Error;

/// Device identity: the raw name as observed on the wire plus the canonical
/// key all naming variants of the same physical device collapse to.
///
/// Equality, hashing and ordering use the canonical key only, so two
/// `DeviceId`s built from different spellings of the same device compare
/// equal. The normalizer is the single constructor; everything downstream
/// consumes `DeviceId`s instead of raw strings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceId {
    raw: String,
    canonical: String,
    key: String,
}

impl DeviceId {
    pub(crate) fn from_parts(raw: String, canonical: String, key: String) -> Self {
        Self { raw, canonical, key }
    }

    /// The name exactly as observed in the input data
    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// The normalized display name
    pub fn canonical(&self) -> &str {
        &self.canonical
    }

    /// The canonical key (identity for equality, hashing and ordering)
    pub fn key(&self) -> &str {
        &self.key
    }
}

impl PartialEq for DeviceId {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key
    }
}

impl Eq for DeviceId {}

impl Hash for DeviceId {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.key.hash(state);
    }
}

impl PartialOrd for DeviceId {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for DeviceId {
    fn cmp(&self, other: &Self) -> Ordering {
        self.key.cmp(&other.key)
    }
}

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.canonical)
    }
}

/// Tier of a device in the Clos-like fabric
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
    strum_macros::EnumString,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum DeviceRole {
    /// Attaches endpoints; valid source and destination
    Leaf,
    /// Aggregates leaves; transport only
    Spine,
    /// Aggregates spines; valid destination only
    Superspine,
    /// Role could not be derived from the canonical name
    Unknown,
}

impl DeviceRole {
    /// Derive the role from a canonical device name.
    ///
    /// The vocabulary is fixed: "superspine" (or the "SS" shorthand
    /// segment) wins over "spine", which wins over "leaf".
    pub fn from_canonical_name(name: &str) -> Self {
        let lower = name.to_ascii_lowercase();
        if lower.contains("superspine") || lower.split('-').any(|part| part == "ss") {
            DeviceRole::Superspine
        } else if lower.contains("spine") {
            DeviceRole::Spine
        } else if lower.contains("leaf") {
            DeviceRole::Leaf
        } else {
            DeviceRole::Unknown
        }
    }
}

/// An 802.1Q tag a bridge-domain service may occupy.
///
/// Only 1-4094 ever reach the synthesizer: tag 0 marks priority-only
/// frames and 4095 is reserved by the standard, so neither can name a
/// service on the fabric.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct VlanId(u16);

#[derive(Error, Debug)]
pub enum VlanIdError {
    #[error("VLAN {0} is reserved by 802.1Q and cannot carry a service")]
    Reserved(u16),
    #[error("VLAN {0} is outside the usable range 1-4094")]
    OutOfRange(u16),
}

impl VlanId {
    /// Check a raw tag from a request before it names a sub-interface
    pub fn try_new(tag: u16) -> Result<Self, VlanIdError> {
        match tag {
            0 | 4095 => Err(VlanIdError::Reserved(tag)),
            1..=4094 => Ok(Self(tag)),
            _ => Err(VlanIdError::OutOfRange(tag)),
        }
    }

    /// The raw tag, for rendering into `<if>.<vlan>` command lines
    pub fn value(&self) -> u16 {
        self.0
    }
}

impl fmt::Display for VlanId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Default upper bound for service-name length
pub const DEFAULT_SERVICE_NAME_LIMIT: usize = 64;

/// Bridge-domain service identifier (e.g. `g_visaev_v253`)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ServiceName(String);

#[derive(Error, Debug)]
pub enum ServiceNameError {
    #[error("service name must not be empty")]
    Empty,
    #[error("service name '{0}' exceeds {1} characters")]
    TooLong(String, usize),
    #[error("service name '{0}' contains disallowed character '{1}'")]
    BadCharacter(String, char),
}

impl ServiceName {
    /// Validate against the default length limit
    pub fn try_new(name: &str) -> Result<Self, ServiceNameError> {
        Self::try_new_with_limit(name, DEFAULT_SERVICE_NAME_LIMIT)
    }

    /// Validate with an explicit length limit
    pub fn try_new_with_limit(name: &str, limit: usize) -> Result<Self, ServiceNameError> {
        if name.is_empty() {
            return Err(ServiceNameError::Empty);
        }
        if name.len() > limit {
            return Err(ServiceNameError::TooLong(name.to_string(), limit));
        }
        if let Some(bad) = name
            .chars()
            .find(|c| !(c.is_ascii_alphanumeric() || *c == '_' || *c == '-'))
        {
            return Err(ServiceNameError::BadCharacter(name.to_string(), bad));
        }
        Ok(Self(name.to_string()))
    }

    /// The validated name
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ServiceName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Interface kind as derived from its name shape
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
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum InterfaceKind {
    /// Bare physical port (e.g. `ge100-0/0/10`)
    Physical,
    /// Link aggregation group (e.g. `bundle-100`)
    Bundle,
    /// Tagged child of a port or bundle (e.g. `bundle-100.253`)
    Subinterface,
}

impl InterfaceKind {
    /// Classify an interface name by shape.
    ///
    /// Shape decides the kind only; it never decides VLAN facts.
    pub fn from_name(name: &str) -> Self {
        if name.contains('.') {
            InterfaceKind::Subinterface
        } else if name.to_ascii_lowercase().starts_with("bundle-") {
            InterfaceKind::Bundle
        } else {
            InterfaceKind::Physical
        }
    }
}

/// Transport speed class, derived from the port naming convention
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpeedClass {
    /// `ge10-*` ports
    TenGig,
    /// `ge100-*` ports and bundles
    HundredGig,
    /// Anything else
    Unknown,
}

impl SpeedClass {
    /// Derive the speed class from an interface name
    pub fn from_name(name: &str) -> Self {
        let lower = name.to_ascii_lowercase();
        if lower.starts_with("ge100-") || lower.starts_with("bundle-") {
            SpeedClass::HundredGig
        } else if lower.starts_with("ge10-") {
            SpeedClass::TenGig
        } else {
            SpeedClass::Unknown
        }
    }
}

/// Split a subinterface name into its parent and numeric tag.
///
/// `bundle-100.253` -> `("bundle-100", 253)`. Returns `None` when the name
/// has no `.` separator or the tag is not a number.
pub fn split_subinterface(name: &str) -> Option<(&str, u16)> {
    let (parent, tag) = name.rsplit_once('.')?;
    let tag = tag.parse().ok()?;
    Some((parent, tag))
}

/// A (device, interface) attachment point in a service request.
///
/// Device names are raw here; the pipeline canonicalizes them on entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Endpoint {
    /// Device name as supplied by the caller
    pub device: String,
    /// Interface name on that device
    pub interface: String,
}

impl Endpoint {
    /// Convenience constructor
    pub fn new(device: impl Into<String>, interface: impl Into<String>) -> Self {
        Self {
            device: device.into(),
            interface: interface.into(),
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.device, self.interface)
    }
}

/// A P2P or P2MP provisioning request.
///
/// Fields are raw caller input; the validator turns them into checked
/// values (`vlan_id` is wide on purpose so out-of-range requests reach the
/// validator instead of failing deserialization).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceRequest {
    /// Service identifier, also the bridge-domain instance name
    pub service_name: String,
    /// VLAN to assign on every sub-interface along the path
    pub vlan_id: i32,
    /// Source attachment (must be a leaf)
    pub source: Endpoint,
    /// Destination attachments (leaves and/or superspines)
    pub destinations: Vec<Endpoint>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_vocabulary() {
        assert_eq!(
            DeviceRole::from_canonical_name("DNAAS-LEAF-B06"),
            DeviceRole::Leaf
        );
        assert_eq!(
            DeviceRole::from_canonical_name("DNAAS-SPINE-B08"),
            DeviceRole::Spine
        );
        assert_eq!(
            DeviceRole::from_canonical_name("DNAAS-SUPERSPINE-D04"),
            DeviceRole::Superspine
        );
        assert_eq!(
            DeviceRole::from_canonical_name("DNAAS-SS-D04"),
            DeviceRole::Superspine
        );
        assert_eq!(DeviceRole::from_canonical_name("CORE-R1"), DeviceRole::Unknown);
    }

    #[test]
    fn vlan_id_bounds() {
        assert!(VlanId::try_new(1).is_ok());
        assert!(VlanId::try_new(4094).is_ok());
        assert!(VlanId::try_new(0).is_err());
        assert!(VlanId::try_new(4095).is_err());
        assert!(VlanId::try_new(5000).is_err());
    }

    #[test]
    fn service_name_charset() {
        assert!(ServiceName::try_new("g_visaev_v253").is_ok());
        assert!(ServiceName::try_new("").is_err());
        assert!(ServiceName::try_new("bad name").is_err());
        assert!(ServiceName::try_new(&"x".repeat(65)).is_err());
        assert!(ServiceName::try_new_with_limit("abcdef", 4).is_err());
    }

    #[test]
    fn interface_kind_shapes() {
        assert_eq!(InterfaceKind::from_name("ge100-0/0/10"), InterfaceKind::Physical);
        assert_eq!(InterfaceKind::from_name("bundle-100"), InterfaceKind::Bundle);
        assert_eq!(
            InterfaceKind::from_name("bundle-100.253"),
            InterfaceKind::Subinterface
        );
    }

    #[test]
    fn subinterface_split() {
        assert_eq!(split_subinterface("bundle-100.253"), Some(("bundle-100", 253)));
        assert_eq!(split_subinterface("ge100-0/0/10"), None);
        assert_eq!(split_subinterface("bundle-100.abc"), None);
    }
}
