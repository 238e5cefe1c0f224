use std::sync::Arc;
use dm_integration_schemas::fabric_models::{
    FabricNode, FabricPort, FabricResource, PhysicalInterface, PhysicalRouter, Project,
    VirtualMachineInterface, VirtualNetwork, VirtualPortGroup, DEFAULT_GLOBAL_SYSTEM_CONFIG,
};
use dm_integration_schemas::settings::ApiServerConfig;
use service_clients::keystone::KeystoneAuth;
use service_clients::vnc::{VncClientConfig, VncRestClient};
use crate::DmError;

/// The operations the integration needs from the fabric controller. "Not found" is `Ok(None)`,
/// errors are kept for the controller being unreachable or refusing a request.
pub trait FabricApi: Send + Sync {
    /// Project by uuid, the uuid being the hyphenated form of the Neutron tenant id
    fn get_project(&self, project_id: &str) -> Result<Option<Project>, DmError>;

    /// Virtual network by uuid, shared with the Neutron network id
    fn get_virtual_network(&self, network_id: &str) -> Result<Option<VirtualNetwork>, DmError>;

    fn get_virtual_machine_interface(&self, fq_name: &[String]) -> Result<Option<VirtualMachineInterface>, DmError>;

    fn create_virtual_machine_interface(&self, vmi: &VirtualMachineInterface) -> Result<(), DmError>;

    fn delete_virtual_machine_interface(&self, fq_name: &[String]) -> Result<(), DmError>;

    fn get_virtual_port_group(&self, uuid: &str) -> Result<Option<VirtualPortGroup>, DmError>;

    fn update_virtual_port_group(&self, vpg: &VirtualPortGroup) -> Result<(), DmError>;

    /// Physical interface `pi_name` of the switch `switch_name`
    fn read_pi_from_switch(&self, switch_name: &str, pi_name: &str) -> Result<Option<PhysicalInterface>, DmError>;

    /// Name of the fabric the switch belongs to
    fn read_fabric_name_from_switch(&self, switch_name: &str) -> Result<Option<String>, DmError>;

    fn read_node_by_hostname(&self, hostname: &str) -> Result<Option<FabricNode>, DmError>;

    fn get_port(&self, uuid: &str) -> Result<Option<FabricPort>, DmError>;
}

/// `FabricApi` over the REST API of the fabric controller
pub struct VncFabricClient {
    client: VncRestClient,
}

impl VncFabricClient {
    pub fn new(config: &ApiServerConfig, keystone: Option<Arc<KeystoneAuth>>) -> Self {
        Self::from_client_config(VncClientConfig::new(config, keystone))
    }

    pub fn from_client_config(config: VncClientConfig) -> Self {
        Self {
            client: VncRestClient::new(config),
        }
    }

    pub fn is_connected(&self) -> bool {
        self.client.is_connected()
    }
}

fn switch_fq_name(switch_name: &str) -> Vec<String> {
    vec![DEFAULT_GLOBAL_SYSTEM_CONFIG.to_string(), switch_name.to_string()]
}

impl FabricApi for VncFabricClient {
    fn get_project(&self, project_id: &str) -> Result<Option<Project>, DmError> {
        Ok(self.client.read(project_id)?)
    }

    fn get_virtual_network(&self, network_id: &str) -> Result<Option<VirtualNetwork>, DmError> {
        Ok(self.client.read(network_id)?)
    }

    fn get_virtual_machine_interface(&self, fq_name: &[String]) -> Result<Option<VirtualMachineInterface>, DmError> {
        Ok(self.client.read_by_fq_name(fq_name)?)
    }

    fn create_virtual_machine_interface(&self, vmi: &VirtualMachineInterface) -> Result<(), DmError> {
        match self.client.create(vmi) {
            Ok(uuid) => {
                tracing::debug!("created virtual machine interface {:?} with uuid {uuid}", vmi.fq_name);
                Ok(())
            }
            Err(err) if err.is_conflict() => {
                tracing::warn!("virtual machine interface {:?} already exists", vmi.fq_name);
                Ok(())
            }
            Err(err) => Err(err.into()),
        }
    }

    fn delete_virtual_machine_interface(&self, fq_name: &[String]) -> Result<(), DmError> {
        match self.client.delete_by_fq_name(FabricResource::VirtualMachineInterface, fq_name) {
            Ok(()) => Ok(()),
            Err(err) if err.is_not_found() => {
                tracing::warn!("virtual machine interface {fq_name:?} already deleted");
                Ok(())
            }
            Err(err) => Err(err.into()),
        }
    }

    fn get_virtual_port_group(&self, uuid: &str) -> Result<Option<VirtualPortGroup>, DmError> {
        Ok(self.client.read(uuid)?)
    }

    fn update_virtual_port_group(&self, vpg: &VirtualPortGroup) -> Result<(), DmError> {
        match self.client.update(vpg) {
            Ok(()) => Ok(()),
            Err(err) if err.is_not_found() => {
                tracing::warn!("virtual port group {:?} no longer exists", vpg.fq_name);
                Ok(())
            }
            Err(err) => Err(err.into()),
        }
    }

    fn read_pi_from_switch(&self, switch_name: &str, pi_name: &str) -> Result<Option<PhysicalInterface>, DmError> {
        let mut fq_name = switch_fq_name(switch_name);
        fq_name.push(pi_name.to_string());
        Ok(self.client.read_by_fq_name(&fq_name)?)
    }

    fn read_fabric_name_from_switch(&self, switch_name: &str) -> Result<Option<String>, DmError> {
        let router: Option<PhysicalRouter> = self.client.read_by_fq_name(&switch_fq_name(switch_name))?;
        Ok(router.and_then(|router| {
            router.fabric_refs.first()
                .and_then(|fabric_ref| fabric_ref.name())
                .map(str::to_string)
        }))
    }

    fn read_node_by_hostname(&self, hostname: &str) -> Result<Option<FabricNode>, DmError> {
        let nodes: Vec<FabricNode> = self.client.list_filtered("node_hostname", hostname)?;
        Ok(nodes.into_iter()
            .find(|node| node.hostname.as_deref() == Some(hostname)))
    }

    fn get_port(&self, uuid: &str) -> Result<Option<FabricPort>, DmError> {
        Ok(self.client.read(uuid)?)
    }
}
