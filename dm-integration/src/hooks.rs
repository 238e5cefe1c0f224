use dm_integration_schemas::neutron_models::NeutronPort;
use crate::integrator::DeviceManagerIntegrator;
use crate::DmError;

/// Entry point for Neutron port notifications. A VMI is shared by every port of a network on a
/// host, so it is only removed once the last eligible port bound there is gone.
pub struct PortEventHandler {
    integrator: DeviceManagerIntegrator,
}

impl PortEventHandler {
    pub fn new(integrator: DeviceManagerIntegrator) -> Self {
        Self { integrator }
    }

    pub fn integrator(&self) -> &DeviceManagerIntegrator {
        &self.integrator
    }

    pub fn port_created(&self, port: &NeutronPort) -> Result<(), DmError> {
        tracing::debug!("port {} created", port.id);
        self.integrator.sync_vlan_tagging_for_port(port, &NeutronPort::unbound(&port.id))
    }

    pub fn port_updated(&self, port: &NeutronPort, original: &NeutronPort) -> Result<(), DmError> {
        tracing::debug!("port {} updated", port.id);
        if !self.integrator.enabled() {
            return Ok(());
        }
        if port.binding_fields() != original.binding_fields()
            && self.other_port_bound(original, &port.id)? {
            tracing::debug!(
                "VMI of port {} on {:?} still used by another port, only creating the new one",
                port.id, original.host_id,
            );
            return self.integrator.create_vlan_tagging_for_port(port);
        }
        self.integrator.sync_vlan_tagging_for_port(port, original)
    }

    pub fn port_deleted(&self, port: &NeutronPort) -> Result<(), DmError> {
        tracing::debug!("port {} deleted", port.id);
        if !self.integrator.enabled() {
            return Ok(());
        }
        if self.other_port_bound(port, &port.id)? {
            tracing::debug!("VMI of port {} on {:?} still used by another port, kept", port.id, port.host_id);
            return Ok(());
        }
        self.integrator.delete_vlan_tagging_for_port(port)
    }

    /// Whether an eligible port other than `exclude_id` is bound to the network and host of
    /// `port`
    fn other_port_bound(&self, port: &NeutronPort, exclude_id: &str) -> Result<bool, DmError> {
        let (Some(network_id), Some(host_id)) = (port.network_id.as_deref(), port.host_id.as_deref()) else {
            return Ok(false);
        };
        if network_id.is_empty() || host_id.is_empty() {
            return Ok(false);
        }
        let ports = self.integrator.core_plugin().get_ports(network_id, host_id)?;
        Ok(ports.iter()
            .filter(|other| other.id != exclude_id)
            .any(|other| self.integrator.should_be_tagged(other)))
    }
}
