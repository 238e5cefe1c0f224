use std::sync::Arc;
use dm_integration_schemas::neutron_models::{NeutronNetwork, NeutronPort};
use dm_integration_schemas::settings::NeutronConfig;
use service_clients::keystone::KeystoneAuth;
use service_clients::neutron::NeutronClient;
use crate::DmError;

/// What the integration reads from the Neutron core plugin
pub trait CorePlugin: Send + Sync {
    fn get_network(&self, network_id: &str) -> Result<NeutronNetwork, DmError>;

    /// Ports of `network_id` bound to `host_id`
    fn get_ports(&self, network_id: &str, host_id: &str) -> Result<Vec<NeutronPort>, DmError>;
}

/// `CorePlugin` over the Neutron REST API
pub struct NeutronCorePlugin {
    client: NeutronClient,
}

impl NeutronCorePlugin {
    pub fn new(config: &NeutronConfig, keystone: Option<Arc<KeystoneAuth>>) -> Result<Self, DmError> {
        let client = NeutronClient::new(config, keystone)
            .map_err(|err| DmError::CorePlugin(err.into()))?;
        Ok(Self { client })
    }
}

impl CorePlugin for NeutronCorePlugin {
    fn get_network(&self, network_id: &str) -> Result<NeutronNetwork, DmError> {
        self.client.get_network(network_id)
            .map_err(|err| DmError::CorePlugin(err.into()))
    }

    fn get_ports(&self, network_id: &str, host_id: &str) -> Result<Vec<NeutronPort>, DmError> {
        self.client.list_ports(network_id, host_id)
            .map_err(|err| DmError::CorePlugin(err.into()))
    }
}
