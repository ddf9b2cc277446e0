//! Domain errors

use thiserror::Error;

/// Fabric core errors.
///
/// Validation and topology failures abort the request; data gaps and
/// classification ambiguity are collected into per-run reports instead of
/// being raised (see `issues` on the outbound artifacts).
#[derive(Error, Debug)]
pub enum CoreError {
    #[error("validation error: {0}")]
    Validation(String),

    #[error("topology error: {0}")]
    Topology(String),

    #[error("required data missing: {0}")]
    DataGap(String),

    #[error("configuration synthesis error: {0}")]
    Synthesis(String),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("operation cancelled")]
    Cancelled,
}

impl CoreError {
    /// Process exit code for the host CLI (0 success, 1 validation,
    /// 2 I/O, 3 cancellation).
    pub fn exit_code(&self) -> i32 {
        match self {
            CoreError::Validation(_)
            | CoreError::Topology(_)
            | CoreError::DataGap(_)
            | CoreError::Synthesis(_) => 1,
            CoreError::Serialization(_) | CoreError::Io(_) => 2,
            CoreError::Cancelled => 3,
        }
    }
}

impl From<serde_json::Error> for CoreError {
    fn from(err: serde_json::Error) -> Self {
        CoreError::Serialization(err.to_string())
    }
}

impl From<serde_yaml::Error> for CoreError {
    fn from(err: serde_yaml::Error) -> Self {
        CoreError::Serialization(err.to_string())
    }
}

impl From<crate::domain::value_objects::VlanIdError> for CoreError {
    fn from(err: crate::domain::value_objects::VlanIdError) -> Self {
        CoreError::Validation(err.to_string())
    }
}

impl From<crate::domain::value_objects::ServiceNameError> for CoreError {
    fn from(err: crate::domain::value_objects::ServiceNameError) -> Self {
        CoreError::Validation(err.to_string())
    }
}

/// A non-fatal condition surfaced on an outbound artifact
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Issue {
    /// Issue category
    pub kind: IssueKind,
    /// Human-readable description
    pub detail: String,
}

/// Category of a surfaced, non-fatal condition
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    serde::Serialize,
    serde::Deserialize,
    strum_macros::Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum IssueKind {
    /// Required LLDP or VLAN data missing; the item was skipped
    DataGap,
    /// Conflicting VLAN facts within a fragment
    ClassificationAmbiguity,
    /// Merged fragments disagree on DNAAS type
    ConsolidationConflict,
    /// Bundle record and LLDP disagree on a peer
    TopologyDiscrepancy,
    /// Illegal link observed (leaf-leaf or superspine-superspine)
    InvalidLink,
    /// A destination could not be served
    PathFailure,
}

impl Issue {
    /// Convenience constructor
    pub fn new(kind: IssueKind, detail: impl Into<String>) -> Self {
        Self {
            kind,
            detail: detail.into(),
        }
    }
}
