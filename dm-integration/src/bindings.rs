use std::collections::HashSet;
use std::io;
use std::sync::Arc;
use dm_integration_schemas::fabric_models::KeyValuePairs;
use serde::Serialize;
use serde_json::ser::Formatter;
use crate::fabric::FabricApi;
use crate::topology::{Node, TopologyMode, TopologySource};
use crate::DmError;

/// Hosts handed to Device Manager are bound as baremetal
pub const DM_MANAGED_VNIC_TYPE: &str = "baremetal";

/// One physical link of the host, the field order is part of the payload
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct LocalLinkInformation {
    pub port_id: String,
    pub switch_info: String,
    pub fabric: String,
}

/// Binding details for a VMI of a managed host
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct BindingProfile {
    pub local_link_information: Vec<LocalLinkInformation>,
    pub vnic_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vpg: Option<String>,
}

#[derive(Serialize)]
struct ProfileValue<'a> {
    local_link_information: &'a [LocalLinkInformation],
}

/// Writes `, ` and `: ` between elements and `\uXXXX` for anything outside ASCII, the way the
/// existing bindings were written
struct SpacedFormatter;

impl Formatter for SpacedFormatter {
    fn write_string_fragment<W: ?Sized + io::Write>(&mut self, writer: &mut W, fragment: &str) -> io::Result<()> {
        let mut units = [0u16; 2];
        for c in fragment.chars() {
            if c.is_ascii() {
                writer.write_all(&[c as u8])?;
            } else {
                for unit in c.encode_utf16(&mut units).iter() {
                    write!(writer, "\\u{unit:04x}")?;
                }
            }
        }
        Ok(())
    }

    fn begin_array_value<W: ?Sized + io::Write>(&mut self, writer: &mut W, first: bool) -> io::Result<()> {
        if first { Ok(()) } else { writer.write_all(b", ") }
    }

    fn begin_object_key<W: ?Sized + io::Write>(&mut self, writer: &mut W, first: bool) -> io::Result<()> {
        if first { Ok(()) } else { writer.write_all(b", ") }
    }

    fn begin_object_value<W: ?Sized + io::Write>(&mut self, writer: &mut W) -> io::Result<()> {
        writer.write_all(b": ")
    }
}

impl BindingProfile {
    /// The `profile` binding value, i.e.
    /// `{"local_link_information": [{"port_id": "xe-0/0/1", "switch_info": "leaf1", "fabric": "fabric-1"}]}`
    pub fn profile_json(&self) -> Result<String, DmError> {
        let mut buffer = Vec::new();
        let mut serializer = serde_json::Serializer::with_formatter(&mut buffer, SpacedFormatter);
        ProfileValue { local_link_information: &self.local_link_information }.serialize(&mut serializer)?;
        Ok(String::from_utf8_lossy(&buffer).into_owned())
    }

    /// Bindings as stored on the VMI: `profile`, `vnic_type` and `vpg` when a VPG is reused
    pub fn to_key_value_pairs(&self) -> Result<KeyValuePairs, DmError> {
        let mut pairs = vec![
            ("profile".to_string(), self.profile_json()?),
            ("vnic_type".to_string(), self.vnic_type.clone()),
        ];
        if let Some(vpg) = &self.vpg {
            pairs.push(("vpg".to_string(), vpg.clone()));
        }
        Ok(KeyValuePairs::from_pairs(pairs))
    }
}

/// Decides which hosts are managed and what their VMIs are bound to
pub struct BindingsHelper {
    topology: Box<dyn TopologySource>,
    fabric: Arc<dyn FabricApi>,
}

impl BindingsHelper {
    pub fn new(topology: Box<dyn TopologySource>, fabric: Arc<dyn FabricApi>) -> Self {
        Self { topology, fabric }
    }

    pub fn topology_mode(&self) -> TopologyMode {
        self.topology.mode()
    }

    pub fn check_host_managed(&self, host_id: &str) -> bool {
        self.topology.contains(host_id)
    }

    pub fn resolve_node(&self, host_id: &str) -> Result<Node, DmError> {
        self.topology.resolve(host_id)
    }

    pub fn get_bindings_for_host(&self, host_id: &str) -> Result<KeyValuePairs, DmError> {
        let node = self.topology.resolve(host_id)?;
        self.build_bindings(&node)?.to_key_value_pairs()
    }

    /// Build the profile for every link of the node. Every switch needs a fabric, there is no
    /// partial profile.
    pub fn build_bindings(&self, node: &Node) -> Result<BindingProfile, DmError> {
        let mut local_link_information = Vec::with_capacity(node.ports.len());
        for port in &node.ports {
            let fabric = self.fabric.read_fabric_name_from_switch(&port.switch_name)?
                .ok_or_else(|| {
                    tracing::error!("cannot find fabric name for switch {}", port.switch_name);
                    DmError::FabricNotFound(port.switch_name.clone())
                })?;
            local_link_information.push(LocalLinkInformation {
                port_id: port.port_name.clone(),
                switch_info: port.switch_name.clone(),
                fabric,
            });
        }

        let vpg = self.find_existing_vpg(node)?;
        Ok(BindingProfile {
            local_link_information,
            vnic_type: DM_MANAGED_VNIC_TYPE.to_string(),
            vpg,
        })
    }

    /// Name of an automatically created VPG covering exactly the links of the node. User created
    /// VPGs are never picked, neither are VPGs missing a link or having an extra one.
    fn find_existing_vpg(&self, node: &Node) -> Result<Option<String>, DmError> {
        let Some(first) = node.ports.first() else {
            return Err(DmError::InvalidNode(node.name.clone(), "node has no ports".into()));
        };
        let pi = self.fabric.read_pi_from_switch(&first.switch_name, &first.port_name)?
            .ok_or_else(|| {
                tracing::error!("PI {} on switch {} not found in API", first.port_name, first.switch_name);
                DmError::PhysicalInterfaceNotFound {
                    switch_name: first.switch_name.clone(),
                    port_name: first.port_name.clone(),
                }
            })?;

        let required: HashSet<(&str, &str)> = node.ports.iter()
            .map(|port| (port.switch_name.as_str(), port.port_name.as_str()))
            .collect();

        for vpg_ref in &pi.virtual_port_group_back_refs {
            let Some(vpg) = self.fabric.get_virtual_port_group(&vpg_ref.uuid)? else {
                continue;
            };
            if vpg.virtual_port_group_user_created {
                continue;
            }
            let existing: Option<HashSet<(&str, &str)>> = vpg.physical_interface_refs.iter()
                .map(|pi_ref| pi_ref.parent_and_name())
                .collect();
            if existing.as_ref() == Some(&required) {
                tracing::debug!("reusing virtual port group {:?} for node {}", vpg.fq_name, node.name);
                return Ok(vpg.name().map(str::to_string));
            }
        }
        Ok(None)
    }
}
