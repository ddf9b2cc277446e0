//! # Request Validator
//!
//! Guards configuration synthesis: VLAN range, service-name shape, endpoint
//! roles, duplicate endpoints and interface presence, all checked against
//! the read-only topology before any command is generated.

use crate::domain::{
    CoreError, DeviceId, DeviceRole, Endpoint, Issue, IssueKind, ServiceName, ServiceRequest,
    VlanId, DEFAULT_SERVICE_NAME_LIMIT,
};
use crate::normalize::DeviceNameNormalizer;
use crate::topology::TopologyGraph;
use std::collections::BTreeSet;

/// One checked request endpoint
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedEndpoint {
    /// Canonical device identity
    pub device: DeviceId,
    /// Device tier
    pub role: DeviceRole,
    /// Interface as supplied by the caller
    pub interface: String,
}

/// A request that passed validation
#[derive(Debug, Clone)]
pub struct ValidatedRequest {
    /// Checked service name
    pub service: ServiceName,
    /// Checked VLAN
    pub vlan: VlanId,
    /// Checked source (always a leaf)
    pub source: ValidatedEndpoint,
    /// Checked destinations (leaves and/or superspines), request order
    pub destinations: Vec<ValidatedEndpoint>,
    /// Destinations dropped from a P2MP request, with reasons
    pub issues: Vec<Issue>,
}

/// Validates service requests against the topology
pub struct RequestValidator<'a> {
    graph: &'a TopologyGraph,
    normalizer: &'a DeviceNameNormalizer,
    service_name_limit: usize,
}

impl<'a> RequestValidator<'a> {
    /// A validator with the default service-name bound
    pub fn new(graph: &'a TopologyGraph, normalizer: &'a DeviceNameNormalizer) -> Self {
        Self {
            graph,
            normalizer,
            service_name_limit: DEFAULT_SERVICE_NAME_LIMIT,
        }
    }

    /// Override the service-name length bound
    pub fn with_service_name_limit(mut self, limit: usize) -> Self {
        self.service_name_limit = limit;
        self
    }

    /// Validate a request.
    ///
    /// P2P requests fail on any problem. For P2MP, invalid destinations
    /// are dropped with an issue each; the request fails only when none
    /// survive.
    pub fn validate(&self, request: &ServiceRequest) -> Result<ValidatedRequest, CoreError> {
        let vlan = self.validate_vlan(request.vlan_id)?;
        let service =
            ServiceName::try_new_with_limit(&request.service_name, self.service_name_limit)
                .map_err(|e| CoreError::Validation(e.to_string()))?;

        let source = self.validate_endpoint(&request.source)?;
        if source.role != DeviceRole::Leaf {
            return Err(CoreError::Validation(format!(
                "source must be LEAF; '{}' has role {}",
                source.device.canonical(),
                source.role
            )));
        }

        if request.destinations.is_empty() {
            return Err(CoreError::Validation(
                "at least one destination is required".to_string(),
            ));
        }

        let p2mp = request.destinations.len() > 1;
        let mut seen: BTreeSet<(String, String)> = BTreeSet::new();
        seen.insert((
            source.device.key().to_string(),
            source.interface.clone(),
        ));

        let mut destinations = Vec::new();
        let mut issues = Vec::new();
        for endpoint in &request.destinations {
            match self.validate_destination(endpoint, &mut seen) {
                Ok(validated) => destinations.push(validated),
                Err(error) if p2mp => {
                    tracing::warn!(endpoint = %endpoint, %error, "destination dropped from P2MP request");
                    issues.push(Issue::new(
                        IssueKind::DataGap,
                        format!("destination {endpoint} dropped: {error}"),
                    ));
                }
                Err(error) => return Err(error),
            }
        }
        if destinations.is_empty() {
            return Err(CoreError::Validation(
                "no destination passed validation".to_string(),
            ));
        }

        Ok(ValidatedRequest {
            service,
            vlan,
            source,
            destinations,
            issues,
        })
    }

    fn validate_vlan(&self, vlan_id: i32) -> Result<VlanId, CoreError> {
        let narrow: u16 = vlan_id.try_into().map_err(|_| {
            CoreError::Validation(format!("VLAN {vlan_id} is outside the usable range 1-4094"))
        })?;
        VlanId::try_new(narrow).map_err(|e| CoreError::Validation(e.to_string()))
    }

    fn validate_destination(
        &self,
        endpoint: &Endpoint,
        seen: &mut BTreeSet<(String, String)>,
    ) -> Result<ValidatedEndpoint, CoreError> {
        let validated = self.validate_endpoint(endpoint)?;
        match validated.role {
            DeviceRole::Leaf | DeviceRole::Superspine => {}
            role => {
                return Err(CoreError::Validation(format!(
                    "destination must be LEAF or SUPERSPINE; '{}' has role {role}",
                    validated.device.canonical()
                )));
            }
        }
        let key = (
            validated.device.key().to_string(),
            validated.interface.clone(),
        );
        if !seen.insert(key) {
            return Err(CoreError::Validation(format!(
                "duplicate endpoint {}:{}",
                validated.device.canonical(),
                validated.interface
            )));
        }
        Ok(validated)
    }

    fn validate_endpoint(&self, endpoint: &Endpoint) -> Result<ValidatedEndpoint, CoreError> {
        if endpoint.interface.trim().is_empty() {
            return Err(CoreError::Validation(format!(
                "missing interface for device '{}'",
                endpoint.device
            )));
        }
        // Superspine endpoints may be addressed through a control-card
        // variant; resolve through the chassis key
        let id = self.normalizer.device_id(&endpoint.device);
        let node = self
            .graph
            .node_by_key(id.key())
            .or_else(|| self.graph.node_by_key(&self.normalizer.chassis_key(&endpoint.device)))
            .ok_or_else(|| {
                CoreError::Validation(format!(
                    "device '{}' is not in the topology",
                    endpoint.device
                ))
            })?;
        let device = self.graph.device(node);

        if self.graph.has_interface_inventory(node)
            && !self.graph.has_interface(node, &endpoint.interface)
        {
            return Err(CoreError::Validation(format!(
                "interface '{}' does not exist on '{}'",
                endpoint.interface,
                device.id.canonical()
            )));
        }

        Ok(ValidatedEndpoint {
            device: device.id.clone(),
            role: device.role,
            interface: endpoint.interface.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{BundlePeer, BundleRecord, ParsedDeviceArtifact};
    use crate::topology::TopologyBuilder;

    fn fabric() -> (DeviceNameNormalizer, TopologyGraph) {
        let normalizer = DeviceNameNormalizer::new();
        let mut a01 = ParsedDeviceArtifact::new("DNAAS-LEAF-A01");
        a01.interfaces = vec!["ge100-0/0/10".into()];
        a01.bundles.push(BundleRecord {
            name: "bundle-100".into(),
            device: "DNAAS-LEAF-A01".into(),
            members: vec!["ge100-0/0/1".into()],
            peers: vec![BundlePeer {
                remote_device: "DNAAS-SPINE-B08".into(),
                local_interface: "ge100-0/0/1".into(),
                remote_interface: "ge100-0/0/21".into(),
            }],
        });
        let mut a02 = ParsedDeviceArtifact::new("DNAAS-LEAF-A02");
        a02.interfaces = vec!["ge100-0/0/20".into()];
        a02.bundles.push(BundleRecord {
            name: "bundle-100".into(),
            device: "DNAAS-LEAF-A02".into(),
            members: vec!["ge100-0/0/2".into()],
            peers: vec![BundlePeer {
                remote_device: "DNAAS-SPINE-B08".into(),
                local_interface: "ge100-0/0/2".into(),
                remote_interface: "ge100-0/0/22".into(),
            }],
        });
        let graph = TopologyBuilder::new(&normalizer).build(&[a01, a02]).0;
        (normalizer, graph)
    }

    fn request(vlan: i32, src_if: &str, dst: &str) -> ServiceRequest {
        ServiceRequest {
            service_name: "g_u_v100".into(),
            vlan_id: vlan,
            source: Endpoint::new("DNAAS-LEAF-A01", src_if),
            destinations: vec![Endpoint::new(dst, "ge100-0/0/20")],
        }
    }

    #[test]
    fn accepts_valid_request() {
        let (normalizer, graph) = fabric();
        let validator = RequestValidator::new(&graph, &normalizer);
        let validated = validator
            .validate(&request(100, "ge100-0/0/10", "DNAAS-LEAF-A02"))
            .unwrap();
        assert_eq!(validated.vlan.value(), 100);
        assert_eq!(validated.destinations.len(), 1);
    }

    #[test]
    fn rejects_vlan_out_of_range() {
        let (normalizer, graph) = fabric();
        let validator = RequestValidator::new(&graph, &normalizer);
        for vlan in [0, 4095, -1, 70000] {
            let error = validator
                .validate(&request(vlan, "ge100-0/0/10", "DNAAS-LEAF-A02"))
                .unwrap_err();
            assert!(matches!(error, CoreError::Validation(_)), "vlan {vlan}");
        }
    }

    #[test]
    fn rejects_bad_service_name() {
        let (normalizer, graph) = fabric();
        let validator = RequestValidator::new(&graph, &normalizer);
        let mut req = request(100, "ge100-0/0/10", "DNAAS-LEAF-A02");
        req.service_name = "bad name!".into();
        assert!(matches!(
            validator.validate(&req),
            Err(CoreError::Validation(_))
        ));
    }

    #[test]
    fn rejects_spine_source_and_destination() {
        let (normalizer, graph) = fabric();
        let validator = RequestValidator::new(&graph, &normalizer);

        let mut req = request(100, "ge100-0/0/10", "DNAAS-LEAF-A02");
        req.source = Endpoint::new("DNAAS-SPINE-B08", "ge100-0/0/21");
        let error = validator.validate(&req).unwrap_err();
        assert!(error.to_string().contains("source must be LEAF"));

        let mut req = request(100, "ge100-0/0/10", "DNAAS-LEAF-A02");
        req.destinations = vec![Endpoint::new("DNAAS-SPINE-B08", "ge100-0/0/22")];
        let error = validator.validate(&req).unwrap_err();
        assert!(error.to_string().contains("LEAF or SUPERSPINE"));
    }

    #[test]
    fn rejects_duplicate_endpoints() {
        let (normalizer, graph) = fabric();
        let validator = RequestValidator::new(&graph, &normalizer);
        let mut req = request(100, "ge100-0/0/10", "DNAAS-LEAF-A02");
        req.destinations.push(Endpoint::new("dnaas_leaf_a02", "ge100-0/0/20"));
        // Two spellings of the same endpoint: P2MP drops the duplicate
        let validated = validator.validate(&req).unwrap();
        assert_eq!(validated.destinations.len(), 1);
        assert_eq!(validated.issues.len(), 1);
    }

    #[test]
    fn rejects_missing_interface() {
        let (normalizer, graph) = fabric();
        let validator = RequestValidator::new(&graph, &normalizer);
        let error = validator
            .validate(&request(100, "ge100-9/9/9", "DNAAS-LEAF-A02"))
            .unwrap_err();
        assert!(error.to_string().contains("does not exist"));
    }

    #[test]
    fn p2mp_requires_one_valid_destination() {
        let (normalizer, graph) = fabric();
        let validator = RequestValidator::new(&graph, &normalizer);
        let mut req = request(100, "ge100-0/0/10", "DNAAS-LEAF-A02");
        req.destinations = vec![
            Endpoint::new("DNAAS-LEAF-ZZ98", "ge100-0/0/1"),
            Endpoint::new("DNAAS-LEAF-ZZ99", "ge100-0/0/1"),
        ];
        let error = validator.validate(&req).unwrap_err();
        assert!(error.to_string().contains("no destination passed validation"));
    }
}
