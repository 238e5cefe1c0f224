use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use strum_macros::{AsRefStr, Display};

/// Parent of the physical routers and the nodes in the fabric controller
pub const DEFAULT_GLOBAL_SYSTEM_CONFIG: &str = "default-global-system-config";
/// Creator recorded in `id_perms` of the VMIs created for Device Manager
pub const VMI_CREATOR: &str = "networking-opencontrail";

/// The resource kinds read or written in the fabric controller. The kebab-case name is the one
/// used in REST paths and as the key wrapping the object body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, AsRefStr)]
#[strum(serialize_all = "kebab-case")]
pub enum FabricResource {
    Project,
    VirtualNetwork,
    VirtualMachineInterface,
    PhysicalInterface,
    VirtualPortGroup,
    PhysicalRouter,
    Node,
    Port,
}

impl FabricResource {
    /// Collection path used for create requests, i.e. `virtual-machine-interfaces`
    pub fn collection(&self) -> String {
        format!("{}s", self.as_ref())
    }
}

/// Implemented by every object model so the REST client can read and write them generically.
pub trait FabricObject: Serialize + DeserializeOwned {
    const RESOURCE: FabricResource;

    fn uuid(&self) -> Option<&str>;
    fn fq_name(&self) -> &[String];
}

/// Reference from one object to another, `to` is the fq_name of the referenced object
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq, Default)]
pub struct ObjectReference {
    pub to: Vec<String>,
    #[serde(default)]
    pub uuid: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub href: Option<String>,
    /// link data of the reference, i.e. `ae_num` on the physical interfaces of a VPG
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attr: Option<Value>,
}

impl ObjectReference {
    pub fn new(to: &[String], uuid: &str) -> Self {
        Self {
            to: to.to_vec(),
            uuid: uuid.to_string(),
            href: None,
            attr: None,
        }
    }

    /// Name of the referenced object, the last element of its fq_name
    pub fn name(&self) -> Option<&str> {
        self.to.last().map(String::as_str)
    }

    /// Name of the referenced object and the name of its parent, for a physical interface this
    /// is `(switch, interface)`
    pub fn parent_and_name(&self) -> Option<(&str, &str)> {
        match self.to.as_slice() {
            [.., parent, name] => Some((parent.as_str(), name.as_str())),
            _ => None,
        }
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq, Default)]
pub struct IdPerms {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub creator: Option<String>,
    #[serde(default = "default_true")]
    pub enable: bool,
}

fn default_true() -> bool {
    true
}

impl IdPerms {
    pub fn created_by(creator: &str) -> Self {
        Self {
            creator: Some(creator.to_string()),
            enable: true,
        }
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq, Default)]
pub struct KeyValuePair {
    pub key: String,
    pub value: String,
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq, Default)]
pub struct KeyValuePairs {
    #[serde(default)]
    pub key_value_pair: Vec<KeyValuePair>,
}

impl KeyValuePairs {
    pub fn from_pairs<K: Into<String>, V: Into<String>>(pairs: impl IntoIterator<Item = (K, V)>) -> Self {
        Self {
            key_value_pair: pairs.into_iter()
                .map(|(key, value)| KeyValuePair { key: key.into(), value: value.into() })
                .collect(),
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.key_value_pair.iter()
            .find(|pair| pair.key.eq(key))
            .map(|pair| pair.value.as_str())
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq, Default)]
pub struct VirtualMachineInterfacePropertiesType {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub_interface_vlan_tag: Option<u16>,
}

impl VirtualMachineInterfacePropertiesType {
    pub fn with_vlan_tag(vlan_tag: u16) -> Self {
        Self {
            sub_interface_vlan_tag: Some(vlan_tag),
        }
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq, Default)]
pub struct Project {
    #[serde(default)]
    pub uuid: String,
    pub fq_name: Vec<String>,
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq, Default)]
pub struct VirtualNetwork {
    #[serde(default)]
    pub uuid: String,
    pub fq_name: Vec<String>,
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq, Default)]
pub struct VirtualMachineInterface {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uuid: Option<String>,
    pub fq_name: Vec<String>,
    #[serde(default)]
    pub parent_type: String,
    #[serde(default)]
    pub virtual_network_refs: Vec<ObjectReference>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub virtual_machine_interface_properties: Option<VirtualMachineInterfacePropertiesType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub virtual_machine_interface_bindings: Option<KeyValuePairs>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id_perms: Option<IdPerms>,
    /// back references are computed by the controller and never written
    #[serde(default, skip_serializing)]
    pub virtual_port_group_back_refs: Vec<ObjectReference>,
}

impl VirtualMachineInterface {
    /// Build a VMI in `project` attached to `network`, ready to be created in the controller.
    pub fn new(
        name: &str,
        network: &VirtualNetwork,
        properties: VirtualMachineInterfacePropertiesType,
        bindings: KeyValuePairs,
        project: &Project,
    ) -> Self {
        let mut fq_name = project.fq_name.clone();
        fq_name.push(name.to_string());
        Self {
            uuid: None,
            fq_name,
            parent_type: FabricResource::Project.to_string(),
            virtual_network_refs: vec![ObjectReference::new(&network.fq_name, &network.uuid)],
            virtual_machine_interface_properties: Some(properties),
            virtual_machine_interface_bindings: Some(bindings),
            id_perms: Some(IdPerms::created_by(VMI_CREATOR)),
            virtual_port_group_back_refs: vec![],
        }
    }

    pub fn name(&self) -> Option<&str> {
        self.fq_name.last().map(String::as_str)
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq, Default)]
pub struct PhysicalInterface {
    #[serde(default)]
    pub uuid: String,
    pub fq_name: Vec<String>,
    #[serde(default, skip_serializing)]
    pub virtual_port_group_back_refs: Vec<ObjectReference>,
}

/// Only the VMI references of a VPG are ever written back, the rest is owned by the controller
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq, Default)]
pub struct VirtualPortGroup {
    #[serde(default)]
    pub uuid: String,
    pub fq_name: Vec<String>,
    #[serde(default, skip_serializing)]
    pub virtual_port_group_user_created: bool,
    #[serde(default, skip_serializing)]
    pub physical_interface_refs: Vec<ObjectReference>,
    #[serde(default)]
    pub virtual_machine_interface_refs: Vec<ObjectReference>,
}

impl VirtualPortGroup {
    pub fn name(&self) -> Option<&str> {
        self.fq_name.last().map(String::as_str)
    }

    /// Drop the reference to `vmi`, matched by uuid when the VMI has one, otherwise by fq_name
    pub fn del_virtual_machine_interface(&mut self, vmi: &VirtualMachineInterface) {
        self.virtual_machine_interface_refs.retain(|vmi_ref| {
            match &vmi.uuid {
                Some(uuid) if !vmi_ref.uuid.is_empty() => !vmi_ref.uuid.eq(uuid),
                _ => !vmi_ref.to.eq(&vmi.fq_name),
            }
        });
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq, Default)]
pub struct PhysicalRouter {
    #[serde(default)]
    pub uuid: String,
    pub fq_name: Vec<String>,
    #[serde(default)]
    pub fabric_refs: Vec<ObjectReference>,
}

/// A compute host registered in the controller, `ports` are its child port objects
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq, Default)]
pub struct FabricNode {
    #[serde(default)]
    pub uuid: String,
    pub fq_name: Vec<String>,
    #[serde(rename = "node_hostname", default, skip_serializing_if = "Option::is_none")]
    pub hostname: Option<String>,
    #[serde(default, skip_serializing)]
    pub ports: Vec<ObjectReference>,
}

/// A NIC of a compute host, linked to the switch interface it is cabled to through the
/// physical interface back reference
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq, Default)]
pub struct FabricPort {
    #[serde(default)]
    pub uuid: String,
    pub fq_name: Vec<String>,
    #[serde(default, skip_serializing)]
    pub physical_interface_back_refs: Vec<ObjectReference>,
}

macro_rules! fabric_object {
    ($model:ty, $resource:expr) => {
        impl FabricObject for $model {
            const RESOURCE: FabricResource = $resource;

            fn uuid(&self) -> Option<&str> {
                if self.uuid.is_empty() { None } else { Some(&self.uuid) }
            }

            fn fq_name(&self) -> &[String] {
                &self.fq_name
            }
        }
    };
}

fabric_object!(Project, FabricResource::Project);
fabric_object!(VirtualNetwork, FabricResource::VirtualNetwork);
fabric_object!(PhysicalInterface, FabricResource::PhysicalInterface);
fabric_object!(VirtualPortGroup, FabricResource::VirtualPortGroup);
fabric_object!(PhysicalRouter, FabricResource::PhysicalRouter);
fabric_object!(FabricNode, FabricResource::Node);
fabric_object!(FabricPort, FabricResource::Port);

impl FabricObject for VirtualMachineInterface {
    const RESOURCE: FabricResource = FabricResource::VirtualMachineInterface;

    fn uuid(&self) -> Option<&str> {
        self.uuid.as_deref()
    }

    fn fq_name(&self) -> &[String] {
        &self.fq_name
    }
}
