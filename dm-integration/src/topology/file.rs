use std::collections::HashMap;
use std::path::Path;
use dm_integration_schemas::topology_yaml::TopologyDocument;
use crate::topology::{Node, TopologyMode, TopologySource};
use crate::DmError;

/// Topology loaded once from the static YAML document, never refreshed
pub struct FileTopology {
    nodes: HashMap<String, Node>,
}

impl FileTopology {
    pub fn load(path: Option<&Path>) -> Result<Self, DmError> {
        let path = path.ok_or(DmError::NoTopologyFile)?;
        let document = TopologyDocument::load_from_file(path)?;
        tracing::debug!("loaded {} nodes from {}", document.nodes.len(), path.display());
        Ok(Self::from_document(document))
    }

    /// The document must already be validated, node names are unique
    pub fn from_document(document: TopologyDocument) -> Self {
        let nodes = document.nodes.into_iter()
            .map(|node| (node.name.clone(), node))
            .collect();
        Self { nodes }
    }
}

impl TopologySource for FileTopology {
    fn resolve(&self, host_id: &str) -> Result<Node, DmError> {
        match self.nodes.get(host_id) {
            Some(node) => Ok(node.clone()),
            None => {
                tracing::error!("tried to get node for host {host_id}, but node not found");
                Err(DmError::NodeNotFound(host_id.to_string()))
            }
        }
    }

    fn contains(&self, host_id: &str) -> bool {
        self.nodes.contains_key(host_id)
    }

    fn mode(&self) -> TopologyMode {
        TopologyMode::File
    }
}
