use std::sync::Arc;
use crate::fabric::FabricApi;
use crate::topology::{Node, NodePort, TopologyMode, TopologySource};
use crate::DmError;

/// Topology read from the node and port objects of the fabric controller on every query
pub struct ApiTopology {
    fabric: Arc<dyn FabricApi>,
}

impl ApiTopology {
    pub fn new(fabric: Arc<dyn FabricApi>) -> Self {
        Self { fabric }
    }

    fn invalid(host_id: &str, reason: impl Into<String>) -> DmError {
        let reason = reason.into();
        tracing::error!("data in fabric controller for node {host_id} is incomplete: {reason}");
        DmError::InvalidNode(host_id.to_string(), reason)
    }
}

impl TopologySource for ApiTopology {
    fn resolve(&self, host_id: &str) -> Result<Node, DmError> {
        let fabric_node = self.fabric.read_node_by_hostname(host_id)?
            .ok_or_else(|| DmError::NodeNotFound(host_id.to_string()))?;

        let mut ports = Vec::new();
        for port_ref in &fabric_node.ports {
            let port = self.fabric.get_port(&port_ref.uuid)?
                .ok_or_else(|| Self::invalid(host_id, format!("port {} cannot be read", port_ref.uuid)))?;
            // ports not cabled to a switch are left out
            let Some(pi_ref) = port.physical_interface_back_refs.first() else {
                tracing::debug!("port {:?} of node {host_id} has no physical interface", port.fq_name);
                continue;
            };
            let (switch_name, port_name) = pi_ref.parent_and_name()
                .ok_or_else(|| Self::invalid(host_id, format!("malformed physical interface reference {:?}", pi_ref.to)))?;
            let name = port.fq_name.last()
                .ok_or_else(|| Self::invalid(host_id, format!("port {} has an empty fq_name", port.uuid)))?;
            ports.push(NodePort {
                name: Some(name.clone()),
                switch_name: switch_name.to_string(),
                port_name: port_name.to_string(),
                switch_id: None,
            });
        }

        if ports.is_empty() {
            return Err(Self::invalid(host_id, "no port connected to a physical interface"));
        }
        Ok(Node {
            name: host_id.to_string(),
            ports,
        })
    }

    fn contains(&self, host_id: &str) -> bool {
        match self.fabric.read_node_by_hostname(host_id) {
            Ok(node) => node.is_some(),
            Err(err) => {
                tracing::warn!("could not check node {host_id} in fabric controller: {err}");
                false
            }
        }
    }

    fn mode(&self) -> TopologyMode {
        TopologyMode::Api
    }
}
