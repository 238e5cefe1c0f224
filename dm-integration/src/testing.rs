use std::collections::HashMap;
use std::sync::Mutex;
use anyhow::anyhow;
use dm_integration_schemas::fabric_models::{
    FabricNode, FabricPort, ObjectReference, PhysicalInterface, Project, VirtualMachineInterface,
    VirtualNetwork, VirtualPortGroup, DEFAULT_GLOBAL_SYSTEM_CONFIG,
};
use dm_integration_schemas::neutron_models::{NeutronNetwork, NeutronPort};
use crate::core_plugin::CorePlugin;
use crate::fabric::FabricApi;
use crate::DmError;

fn pi_fq_name(switch_name: &str, pi_name: &str) -> Vec<String> {
    vec![DEFAULT_GLOBAL_SYSTEM_CONFIG.to_string(), switch_name.to_string(), pi_name.to_string()]
}

#[derive(Default)]
struct FakeState {
    vmis: HashMap<Vec<String>, VirtualMachineInterface>,
    vpgs: HashMap<String, VirtualPortGroup>,
    calls: Vec<String>,
    failure: Option<String>,
}

/// In memory fabric controller recording every call made to it
#[derive(Default)]
pub struct FakeFabric {
    projects: HashMap<String, Project>,
    networks: HashMap<String, VirtualNetwork>,
    pis: HashMap<(String, String), PhysicalInterface>,
    fabrics: HashMap<String, String>,
    nodes: HashMap<String, FabricNode>,
    ports: HashMap<String, FabricPort>,
    state: Mutex<FakeState>,
}

impl FakeFabric {
    pub fn add_project(&mut self, uuid: &str, name: &str) {
        self.projects.insert(uuid.to_string(), Project {
            uuid: uuid.to_string(),
            fq_name: vec!["default-domain".into(), name.to_string()],
        });
    }

    pub fn add_network(&mut self, uuid: &str) {
        self.networks.insert(uuid.to_string(), VirtualNetwork {
            uuid: uuid.to_string(),
            fq_name: vec!["default-domain".into(), "admin".into(), format!("vn-{uuid}")],
        });
    }

    pub fn add_fabric(&mut self, switch_name: &str, fabric_name: &str) {
        self.fabrics.insert(switch_name.to_string(), fabric_name.to_string());
    }

    /// Physical interface with back references to the given VPGs, in that order
    pub fn add_pi(&mut self, switch_name: &str, pi_name: &str, vpg_uuids: &[&str]) {
        self.pis.insert((switch_name.to_string(), pi_name.to_string()), PhysicalInterface {
            uuid: format!("pi-{switch_name}-{pi_name}"),
            fq_name: pi_fq_name(switch_name, pi_name),
            virtual_port_group_back_refs: vpg_uuids.iter()
                .map(|uuid| ObjectReference::new(&[format!("vpg-{uuid}")], uuid))
                .collect(),
        });
    }

    pub fn add_vpg(&mut self, uuid: &str, name: &str, user_created: bool, pis: &[(&str, &str)]) {
        let vpg = VirtualPortGroup {
            uuid: uuid.to_string(),
            fq_name: vec![DEFAULT_GLOBAL_SYSTEM_CONFIG.into(), "fabric-1".into(), name.to_string()],
            virtual_port_group_user_created: user_created,
            physical_interface_refs: pis.iter()
                .map(|(switch, pi)| ObjectReference::new(&pi_fq_name(switch, pi), &format!("pi-{switch}-{pi}")))
                .collect(),
            virtual_machine_interface_refs: vec![],
        };
        self.state.get_mut().unwrap().vpgs.insert(uuid.to_string(), vpg);
    }

    /// VMI already present in the controller, attached to the given VPGs
    pub fn add_vmi(&mut self, fq_name: &[String], vpg_uuids: &[&str]) {
        let uuid = format!("uuid-{}", fq_name.join(":"));
        let state = self.state.get_mut().unwrap();
        for vpg_uuid in vpg_uuids {
            if let Some(vpg) = state.vpgs.get_mut(*vpg_uuid) {
                vpg.virtual_machine_interface_refs.push(ObjectReference::new(fq_name, &uuid));
            }
        }
        state.vmis.insert(fq_name.to_vec(), VirtualMachineInterface {
            uuid: Some(uuid),
            fq_name: fq_name.to_vec(),
            virtual_port_group_back_refs: vpg_uuids.iter()
                .map(|vpg_uuid| ObjectReference::new(&[format!("vpg-{vpg_uuid}")], vpg_uuid))
                .collect(),
            ..Default::default()
        });
    }

    /// Node with ports given as `(uuid, name, Some((switch, interface)))`
    pub fn add_node(&mut self, hostname: &str, ports: &[(&str, &str, Option<(&str, &str)>)]) {
        let mut node = FabricNode {
            uuid: format!("node-{hostname}"),
            fq_name: vec![DEFAULT_GLOBAL_SYSTEM_CONFIG.into(), hostname.to_string()],
            hostname: Some(hostname.to_string()),
            ports: vec![],
        };
        for (uuid, name, link) in ports {
            let fq_name = vec![DEFAULT_GLOBAL_SYSTEM_CONFIG.into(), hostname.to_string(), name.to_string()];
            node.ports.push(ObjectReference::new(&fq_name, uuid));
            self.ports.insert(uuid.to_string(), FabricPort {
                uuid: uuid.to_string(),
                fq_name,
                physical_interface_back_refs: link.iter()
                    .map(|(switch, pi)| ObjectReference::new(&pi_fq_name(switch, pi), "pi"))
                    .collect(),
            });
        }
        self.nodes.insert(hostname.to_string(), node);
    }

    pub fn remove_port(&mut self, uuid: &str) {
        self.ports.remove(uuid);
    }

    pub fn fail_with(&self, msg: &str) {
        self.state.lock().unwrap().failure = Some(msg.to_string());
    }

    pub fn calls(&self) -> Vec<String> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn vmi(&self, fq_name: &[String]) -> Option<VirtualMachineInterface> {
        self.state.lock().unwrap().vmis.get(fq_name).cloned()
    }

    pub fn vmi_count(&self) -> usize {
        self.state.lock().unwrap().vmis.len()
    }

    pub fn vpg(&self, uuid: &str) -> Option<VirtualPortGroup> {
        self.state.lock().unwrap().vpgs.get(uuid).cloned()
    }

    fn record(&self, call: String) -> Result<(), DmError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(call);
        match &state.failure {
            Some(msg) => Err(DmError::Fabric(anyhow!(msg.clone()))),
            None => Ok(()),
        }
    }
}

fn last(fq_name: &[String]) -> &str {
    fq_name.last().map(String::as_str).unwrap_or_default()
}

impl FabricApi for FakeFabric {
    fn get_project(&self, project_id: &str) -> Result<Option<Project>, DmError> {
        self.record(format!("get_project:{project_id}"))?;
        Ok(self.projects.get(project_id).cloned())
    }

    fn get_virtual_network(&self, network_id: &str) -> Result<Option<VirtualNetwork>, DmError> {
        self.record(format!("get_virtual_network:{network_id}"))?;
        Ok(self.networks.get(network_id).cloned())
    }

    fn get_virtual_machine_interface(&self, fq_name: &[String]) -> Result<Option<VirtualMachineInterface>, DmError> {
        self.record(format!("get_vmi:{}", last(fq_name)))?;
        Ok(self.vmi(fq_name))
    }

    fn create_virtual_machine_interface(&self, vmi: &VirtualMachineInterface) -> Result<(), DmError> {
        self.record(format!("create_vmi:{}", last(&vmi.fq_name)))?;
        let mut created = vmi.clone();
        created.uuid = Some(format!("uuid-{}", vmi.fq_name.join(":")));
        self.state.lock().unwrap().vmis.entry(vmi.fq_name.clone()).or_insert(created);
        Ok(())
    }

    fn delete_virtual_machine_interface(&self, fq_name: &[String]) -> Result<(), DmError> {
        self.record(format!("delete_vmi:{}", last(fq_name)))?;
        self.state.lock().unwrap().vmis.remove(fq_name);
        Ok(())
    }

    fn get_virtual_port_group(&self, uuid: &str) -> Result<Option<VirtualPortGroup>, DmError> {
        self.record(format!("get_vpg:{uuid}"))?;
        Ok(self.vpg(uuid))
    }

    fn update_virtual_port_group(&self, vpg: &VirtualPortGroup) -> Result<(), DmError> {
        self.record(format!("update_vpg:{}", vpg.uuid))?;
        let mut state = self.state.lock().unwrap();
        if let Some(existing) = state.vpgs.get_mut(&vpg.uuid) {
            *existing = vpg.clone();
        }
        Ok(())
    }

    fn read_pi_from_switch(&self, switch_name: &str, pi_name: &str) -> Result<Option<PhysicalInterface>, DmError> {
        self.record(format!("read_pi:{switch_name}:{pi_name}"))?;
        Ok(self.pis.get(&(switch_name.to_string(), pi_name.to_string())).cloned())
    }

    fn read_fabric_name_from_switch(&self, switch_name: &str) -> Result<Option<String>, DmError> {
        self.record(format!("read_fabric:{switch_name}"))?;
        Ok(self.fabrics.get(switch_name).cloned())
    }

    fn read_node_by_hostname(&self, hostname: &str) -> Result<Option<FabricNode>, DmError> {
        self.record(format!("read_node_by_hostname:{hostname}"))?;
        Ok(self.nodes.get(hostname).cloned())
    }

    fn get_port(&self, uuid: &str) -> Result<Option<FabricPort>, DmError> {
        self.record(format!("get_port:{uuid}"))?;
        Ok(self.ports.get(uuid).cloned())
    }
}

/// Neutron stand in holding networks and the ports bound to hosts
#[derive(Default)]
pub struct FakeCorePlugin {
    networks: HashMap<String, NeutronNetwork>,
    ports: Mutex<Vec<NeutronPort>>,
}

impl FakeCorePlugin {
    pub fn add_network(&mut self, id: &str, network_type: &str, segmentation_id: Option<i64>) {
        self.networks.insert(id.to_string(), NeutronNetwork {
            id: id.to_string(),
            network_type: Some(network_type.to_string()),
            segmentation_id,
        });
    }

    pub fn add_port(&self, port: NeutronPort) {
        self.ports.lock().unwrap().push(port);
    }
}

impl CorePlugin for FakeCorePlugin {
    fn get_network(&self, network_id: &str) -> Result<NeutronNetwork, DmError> {
        self.networks.get(network_id)
            .cloned()
            .ok_or_else(|| DmError::CorePlugin(anyhow!("network {network_id} not found")))
    }

    fn get_ports(&self, network_id: &str, host_id: &str) -> Result<Vec<NeutronPort>, DmError> {
        Ok(self.ports.lock().unwrap().iter()
            .filter(|port| port.network_id.as_deref() == Some(network_id))
            .filter(|port| port.host_id.as_deref() == Some(host_id))
            .cloned()
            .collect())
    }
}

/// Port of a VM on `host` attached to `network`
pub fn compute_port(id: &str, network: &str, host: &str) -> NeutronPort {
    NeutronPort {
        id: id.to_string(),
        network_id: Some(network.to_string()),
        host_id: Some(host.to_string()),
        device_id: Some(format!("vm-{id}")),
        device_owner: Some("compute:nova".to_string()),
        tenant_id: Some(TENANT_ID.to_string()),
        project_id: None,
    }
}

/// Neutron form of the tenant, the fabric controller knows it as `PROJECT_UUID`
pub const TENANT_ID: &str = "0ed483e083ef4f7082501fcfa5d98c0e";
pub const PROJECT_UUID: &str = "0ed483e0-83ef-4f70-8250-1fcfa5d98c0e";
