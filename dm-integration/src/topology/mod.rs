mod api;
mod file;

use std::sync::Arc;
use dm_integration_schemas::settings::DmIntegrationConfig;
use dm_integration_schemas::topology_yaml::{TopologyNode, TopologyPort};
use strum_macros::{AsRefStr, Display};
use crate::fabric::FabricApi;
use crate::DmError;

pub use api::ApiTopology;
pub use file::FileTopology;

/// A compute host and its links into the fabric
pub type Node = TopologyNode;
/// One physical link of a compute host
pub type NodePort = TopologyPort;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, AsRefStr)]
#[strum(serialize_all = "lowercase")]
pub enum TopologyMode {
    File,
    Api,
}

/// Where the physical topology of the compute hosts comes from.
///
/// `resolve` fails with `NodeNotFound` when the host is unknown and with `InvalidNode` when the
/// host is known but none of its links can be used. `contains` never fails.
pub trait TopologySource: Send + Sync {
    fn resolve(&self, host_id: &str) -> Result<Node, DmError>;

    fn contains(&self, host_id: &str) -> bool;

    fn mode(&self) -> TopologyMode;
}

/// Static file topology when a file is configured, otherwise the topology is read live from
/// the fabric controller
pub fn topology_from_config(
    config: &DmIntegrationConfig,
    fabric: Arc<dyn FabricApi>,
) -> Result<Box<dyn TopologySource>, DmError> {
    match &config.topology {
        Some(path) => {
            tracing::info!("using static topology from {}", path.display());
            Ok(Box::new(FileTopology::load(Some(path))?))
        }
        None => {
            tracing::info!("no topology file configured, topology is read from the fabric controller");
            Ok(Box::new(ApiTopology::new(fabric)))
        }
    }
}
