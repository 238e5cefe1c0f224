use serde::{Deserialize, Serialize};

/// Ports owned by a compute instance have a device owner starting with this prefix
pub const DEVICE_OWNER_COMPUTE_PREFIX: &str = "compute:";
pub const TYPE_VLAN: &str = "vlan";
pub const MIN_VLAN_TAG: i64 = 1;
pub const MAX_VLAN_TAG: i64 = 4094;

/// The subset of a Neutron port used to decide on VLAN tagging. Every field other than `id` can
/// be missing from a notification, which is different from the field being an empty string.
#[derive(Deserialize, Serialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct NeutronPort {
    #[serde(default)]
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub network_id: Option<String>,
    #[serde(rename = "binding:host_id", default, skip_serializing_if = "Option::is_none")]
    pub host_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device_owner: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tenant_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_id: Option<String>,
}

impl NeutronPort {
    /// A port that is not plugged to anything, used as the previous state of a new port
    pub fn unbound(id: &str) -> Self {
        Self {
            id: id.to_string(),
            network_id: Some(String::new()),
            host_id: Some(String::new()),
            device_id: Some(String::new()),
            device_owner: Some(String::new()),
            tenant_id: None,
            project_id: None,
        }
    }

    /// Newer Neutron releases send `project_id` alongside or instead of `tenant_id`
    pub fn tenant(&self) -> Option<&str> {
        self.tenant_id.as_deref()
            .or(self.project_id.as_deref())
    }

    /// The fields that decide which VMI the port maps to, in the order
    /// `(binding:host_id, device_id, device_owner, network_id)`
    pub fn binding_fields(&self) -> [Option<&str>; 4] {
        [
            self.host_id.as_deref(),
            self.device_id.as_deref(),
            self.device_owner.as_deref(),
            self.network_id.as_deref(),
        ]
    }

    pub fn has_binding_fields(&self) -> bool {
        self.binding_fields().iter().all(Option::is_some)
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct NeutronNetwork {
    #[serde(default)]
    pub id: String,
    #[serde(rename = "provider:network_type", default, skip_serializing_if = "Option::is_none")]
    pub network_type: Option<String>,
    #[serde(rename = "provider:segmentation_id", default, skip_serializing_if = "Option::is_none")]
    pub segmentation_id: Option<i64>,
}

impl NeutronNetwork {
    /// The VLAN tag of the network, only for VLAN provider networks with a tag in 1..=4094
    pub fn vlan_tag(&self) -> Option<u16> {
        if self.network_type.as_deref() != Some(TYPE_VLAN) {
            return None;
        }
        match self.segmentation_id {
            Some(tag) if (MIN_VLAN_TAG..=MAX_VLAN_TAG).contains(&tag) => u16::try_from(tag).ok(),
            _ => None,
        }
    }
}

/// Neutron wraps single resources in a key named after the resource
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct PortBody {
    pub port: NeutronPort,
}

/// Body of a port update notification, carrying the port before and after the update
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct PortUpdateBody {
    pub port: NeutronPort,
    pub original_port: NeutronPort,
}

#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct NetworkBody {
    pub network: NeutronNetwork,
}

#[derive(Deserialize, Serialize, Debug, Clone, Default)]
pub struct PortsBody {
    #[serde(default)]
    pub ports: Vec<NeutronPort>,
}
