use dm_integration_schemas::topology_yaml::TopologyDocumentError;
use service_clients::RestError;
use thiserror::Error;

/// Failures of the Device Manager integration. Apart from a virtual network missing in the
/// fabric controller, none of these are recovered from, they propagate to whoever delivered the
/// port notification.
#[derive(Error, Debug)]
pub enum DmError {
    #[error("topology has invalid format: {0}")]
    ConfigInvalidFormat(String),
    #[error("no topology file configured")]
    NoTopologyFile,
    #[error("could not read topology file {path}: {source}")]
    TopologyIo {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("node {0} not found in topology")]
    NodeNotFound(String),
    #[error("node {0} has no usable physical links: {1}")]
    InvalidNode(String, String),
    #[error("cannot find fabric name for switch {0}")]
    FabricNotFound(String),
    #[error("physical interface {port_name} on switch {switch_name} not found")]
    PhysicalInterfaceNotFound {
        switch_name: String,
        port_name: String,
    },
    #[error("project {0} not found in fabric controller")]
    ProjectNotFound(String),
    #[error("port {0} cannot be bound: {1}")]
    InvalidPort(String, String),
    #[error("could not serialise binding profile: {0}")]
    Serialisation(#[from] serde_json::Error),
    #[error("fabric controller request failed: {0:#}")]
    Fabric(anyhow::Error),
    #[error("core plugin request failed: {0:#}")]
    CorePlugin(anyhow::Error),
}

impl DmError {
    /// Errors caused by the topology or inventory data rather than by a failing service
    pub fn is_precondition(&self) -> bool {
        matches!(
            self,
            DmError::InvalidNode(..)
                | DmError::FabricNotFound(_)
                | DmError::PhysicalInterfaceNotFound { .. }
                | DmError::ProjectNotFound(_)
                | DmError::InvalidPort(..)
        )
    }
}

impl From<TopologyDocumentError> for DmError {
    fn from(err: TopologyDocumentError) -> Self {
        match err {
            TopologyDocumentError::Io { path, source } => DmError::TopologyIo { path, source },
            TopologyDocumentError::InvalidFormat { msg } => DmError::ConfigInvalidFormat(msg),
        }
    }
}

impl From<RestError> for DmError {
    fn from(err: RestError) -> Self {
        DmError::Fabric(err.into())
    }
}
