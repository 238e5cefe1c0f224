use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::fmt::Formatter;
use std::path::Path;
use thiserror::Error;
use validator::{Validate, ValidationError};

/// Errors raised while reading the static topology document. The document is treated as ground
/// truth for which compute hosts are wired into the fabric, so anything that does not match the
/// expected shape is rejected as a whole rather than partially loaded.
#[derive(Error, Debug)]
pub enum TopologyDocumentError {
    #[error("could not read topology file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("topology has invalid format: {msg}")]
    InvalidFormat {
        msg: String,
    },
}

/// The static topology document, example:
///
/// ```yaml
/// nodes:
///   - name: b1s19-node3
///     type: baremetal
///     ports:
///       - name: ens1f1
///         switch_name: vqfx-10k-leaf2
///         port_name: xe-0/0/1
/// ```
#[derive(Deserialize, Serialize, Debug, Clone, Validate, PartialEq)]
#[validate(schema(function = "validate_unique_names"))]
pub struct TopologyDocument {
    #[validate]
    pub nodes: Vec<TopologyNode>,
}

/// A compute host and the physical links it has into the fabric. The node name is the Neutron
/// `binding:host_id` of the host.
#[derive(Deserialize, Serialize, Debug, Clone, Validate, PartialEq, Eq)]
pub struct TopologyNode {
    #[validate(length(min = 1))]
    pub name: String,
    #[validate(length(min = 1))]
    #[validate]
    pub ports: Vec<TopologyPort>,
}

#[derive(Deserialize, Serialize, Debug, Clone, Validate, PartialEq, Eq, Hash)]
pub struct TopologyPort {
    /// name of the NIC on the host side
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[validate(length(min = 1))]
    pub switch_name: String,
    /// physical interface name on the switch, i.e. xe-0/0/1
    #[validate(length(min = 1))]
    pub port_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub switch_id: Option<String>,
}

fn validate_unique_names(document: &TopologyDocument) -> Result<(), ValidationError> {
    let names: HashSet<&String> = document.nodes.iter()
        .map(|node| &node.name)
        .collect();
    if names.len() != document.nodes.len() {
        return Err(ValidationError::new("duplicated_node_names"));
    }
    Ok(())
}

impl TopologyDocument {
    /// Parse and validate the topology from a YAML string. An empty document is not a valid
    /// topology.
    pub fn from_yaml_str(text: &str) -> Result<Self, TopologyDocumentError> {
        let document: Self = serde_yaml::from_str(text)
            .map_err(|err| TopologyDocumentError::InvalidFormat { msg: format!("{err}") })?;
        document.validate()
            .map_err(|err| TopologyDocumentError::InvalidFormat { msg: format!("{err}") })?;
        Ok(document)
    }

    /// Read the topology file once, this is done on start up so a blocking read is fine
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, TopologyDocumentError> {
        let path = path.as_ref();
        tracing::trace!("loading topology from {:?}", path);
        let text = std::fs::read_to_string(path)
            .map_err(|source| TopologyDocumentError::Io {
                path: path.display().to_string(),
                source,
            })?;
        Self::from_yaml_str(&text)
    }

    pub fn node(&self, name: &str) -> Option<&TopologyNode> {
        self.nodes.iter().find(|node| node.name.eq(name))
    }
}

impl fmt::Display for TopologyDocument {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let text = serde_yaml::to_string(&self).map_err(|_| fmt::Error)?;
        f.write_str(&text)
    }
}
