use std::sync::Arc;
use dm_integration_schemas::fabric_models::{
    Project, VirtualMachineInterface, VirtualMachineInterfacePropertiesType,
};
use dm_integration_schemas::neutron_models::{NeutronPort, DEVICE_OWNER_COMPUTE_PREFIX};
use dm_integration_schemas::settings::DmIntegrationConfig;
use uuid::Uuid;
use crate::bindings::BindingsHelper;
use crate::core_plugin::CorePlugin;
use crate::fabric::FabricApi;
use crate::topology::{topology_from_config, TopologyMode, TopologySource};
use crate::DmError;

/// Keeps one VMI per (project, network, compute host) in the fabric controller for every
/// compute host managed by Device Manager, so Device Manager can configure the VLAN on the
/// switch ports the host is cabled to.
pub struct DeviceManagerIntegrator {
    fabric: Arc<dyn FabricApi>,
    core_plugin: Arc<dyn CorePlugin>,
    // not set when the integration is disabled
    bindings_helper: Option<BindingsHelper>,
}

impl DeviceManagerIntegrator {
    /// Load the topology when the integration is enabled, nothing is loaded otherwise
    pub fn new(
        config: &DmIntegrationConfig,
        fabric: Arc<dyn FabricApi>,
        core_plugin: Arc<dyn CorePlugin>,
    ) -> Result<Self, DmError> {
        if !config.enabled {
            tracing::info!("device manager integration is disabled");
            return Ok(Self { fabric, core_plugin, bindings_helper: None });
        }
        let topology = topology_from_config(config, fabric.clone())?;
        Ok(Self::with_topology(topology, fabric, core_plugin))
    }

    pub fn with_topology(
        topology: Box<dyn TopologySource>,
        fabric: Arc<dyn FabricApi>,
        core_plugin: Arc<dyn CorePlugin>,
    ) -> Self {
        let bindings_helper = BindingsHelper::new(topology, fabric.clone());
        Self { fabric, core_plugin, bindings_helper: Some(bindings_helper) }
    }

    pub fn enabled(&self) -> bool {
        self.bindings_helper.is_some()
    }

    pub fn topology_mode(&self) -> Option<TopologyMode> {
        self.bindings_helper.as_ref().map(BindingsHelper::topology_mode)
    }

    pub fn bindings_helper(&self) -> Option<&BindingsHelper> {
        self.bindings_helper.as_ref()
    }

    pub fn core_plugin(&self) -> &dyn CorePlugin {
        self.core_plugin.as_ref()
    }

    /// Bring the fabric controller in line with `port`. When the port moved to another host,
    /// device or network, the VMI of the previous state is removed first.
    pub fn sync_vlan_tagging_for_port(&self, port: &NeutronPort, previous: &NeutronPort) -> Result<(), DmError> {
        if !self.enabled() {
            return Ok(());
        }
        if port.binding_fields() != previous.binding_fields() {
            self.delete_vlan_tagging_for_port(previous)?;
        }
        self.create_vlan_tagging_for_port(port)
    }

    /// A port is tagged when it belongs to a VM on a host managed by Device Manager
    pub fn should_be_tagged(&self, port: &NeutronPort) -> bool {
        let Some(bindings_helper) = &self.bindings_helper else {
            return false;
        };
        let (Some(host_id), Some(device_id), Some(device_owner), Some(_)) = (
            port.host_id.as_deref(),
            port.device_id.as_deref(),
            port.device_owner.as_deref(),
            port.network_id.as_deref(),
        ) else {
            return false;
        };
        !host_id.is_empty()
            && !device_id.is_empty()
            && device_owner.starts_with(DEVICE_OWNER_COMPUTE_PREFIX)
            && bindings_helper.check_host_managed(host_id)
    }

    pub fn create_vlan_tagging_for_port(&self, port: &NeutronPort) -> Result<(), DmError> {
        let Some(bindings_helper) = &self.bindings_helper else {
            return Ok(());
        };
        if !self.should_be_tagged(port) {
            tracing::debug!(
                "compute {:?} is not managed by Device Manager or no connected VM, integration skipped",
                port.host_id,
            );
            return Ok(());
        }
        let (Some(network_id), Some(host_id)) = (port.network_id.as_deref(), port.host_id.as_deref()) else {
            return Ok(());
        };

        let Some(vlan_tag) = self.get_vlan_tag(network_id)? else {
            tracing::debug!("no VLAN tag for port {}, binding for Device Manager skipped", port.id);
            return Ok(());
        };

        let project = self.get_project(port)?;
        let vmi_name = make_vmi_name(network_id, host_id);
        let vmi_fq_name = vmi_fq_name(&project, &vmi_name);
        if self.fabric.get_virtual_machine_interface(&vmi_fq_name)?.is_some() {
            tracing::debug!("VMI {vmi_name} with bindings for Device Manager exists, creating skipped");
            return Ok(());
        }

        let Some(network) = self.fabric.get_virtual_network(network_id)? else {
            tracing::error!("virtual network {network_id} does not exist in the fabric controller");
            return Ok(());
        };

        let properties = VirtualMachineInterfacePropertiesType::with_vlan_tag(vlan_tag);
        let bindings = bindings_helper.get_bindings_for_host(host_id)?;
        let vmi = VirtualMachineInterface::new(&vmi_name, &network, properties, bindings, &project);
        self.fabric.create_virtual_machine_interface(&vmi)?;
        tracing::info!("created VMI {vmi_name} with bindings for Device Manager for port {}", port.id);
        Ok(())
    }

    /// Remove the VMI `port` maps to. This does not check for other ports still bound to the same
    /// network and host, the caller must only ask for it once the last one is gone.
    pub fn delete_vlan_tagging_for_port(&self, port: &NeutronPort) -> Result<(), DmError> {
        if !self.should_be_tagged(port) {
            tracing::debug!("port {} cannot be VLAN tagged, deleting VMI for Device Manager skipped", port.id);
            return Ok(());
        }
        let (Some(network_id), Some(host_id)) = (port.network_id.as_deref(), port.host_id.as_deref()) else {
            return Ok(());
        };

        let project = self.get_project(port)?;
        let vmi_fq_name = vmi_fq_name(&project, &make_vmi_name(network_id, host_id));
        let Some(vmi) = self.fabric.get_virtual_machine_interface(&vmi_fq_name)? else {
            tracing::debug!("no VMI {vmi_fq_name:?} to delete for port {}", port.id);
            return Ok(());
        };

        self.detach_vmi_from_vpg(&vmi)?;
        self.fabric.delete_virtual_machine_interface(&vmi_fq_name)?;
        tracing::info!("deleted VMI {vmi_fq_name:?} with bindings for Device Manager for port {}", port.id);
        Ok(())
    }

    // only the first VPG the VMI is attached to is updated
    fn detach_vmi_from_vpg(&self, vmi: &VirtualMachineInterface) -> Result<(), DmError> {
        let Some(vpg_ref) = vmi.virtual_port_group_back_refs.first() else {
            return Ok(());
        };
        let Some(mut vpg) = self.fabric.get_virtual_port_group(&vpg_ref.uuid)? else {
            tracing::warn!("virtual port group {} referenced by VMI {:?} not found", vpg_ref.uuid, vmi.fq_name);
            return Ok(());
        };
        vpg.del_virtual_machine_interface(vmi);
        self.fabric.update_virtual_port_group(&vpg)
    }

    fn get_vlan_tag(&self, network_id: &str) -> Result<Option<u16>, DmError> {
        let network = self.core_plugin.get_network(network_id)?;
        Ok(network.vlan_tag())
    }

    /// Project of the port tenant, the controller stores it under the hyphenated form of the
    /// Neutron tenant id
    fn get_project(&self, port: &NeutronPort) -> Result<Project, DmError> {
        let tenant_id = port.tenant()
            .ok_or_else(|| DmError::InvalidPort(port.id.clone(), "no tenant".into()))?;
        let project_id = Uuid::parse_str(tenant_id)
            .map_err(|err| DmError::InvalidPort(port.id.clone(), format!("tenant id {tenant_id}: {err}")))?
            .hyphenated()
            .to_string();
        self.fabric.get_project(&project_id)?
            .ok_or(DmError::ProjectNotFound(project_id))
    }
}

/// One VMI for all the VMs of a network on a host
pub fn make_vmi_name(network_id: &str, host_id: &str) -> String {
    format!("_vlan_tag_for_vn_{network_id}_compute_{host_id}")
}

fn vmi_fq_name(project: &Project, vmi_name: &str) -> Vec<String> {
    let mut fq_name = project.fq_name.clone();
    fq_name.push(vmi_name.to_string());
    fq_name
}
