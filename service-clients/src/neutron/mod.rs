use std::sync::Arc;
use dm_integration_schemas::neutron_models::{NetworkBody, NeutronNetwork, NeutronPort, PortsBody};
use dm_integration_schemas::settings::NeutronConfig;
use reqwest::blocking::Client;
use serde::de::DeserializeOwned;
use crate::keystone::{Credentials, KeystoneAuth};
use crate::{join_url, send_authorised, RestError};

/// Read only client for the Neutron API, used to look up the network of a port and the other
/// ports bound to the same host.
pub struct NeutronClient {
    client: Client,
    url: String,
    credentials: Credentials,
}

impl NeutronClient {
    pub fn new(config: &NeutronConfig, keystone: Option<Arc<KeystoneAuth>>) -> Result<Self, RestError> {
        let client = Client::builder()
            .build()
            .map_err(|err| RestError::InvalidConfig(format!("building http client: {err}")))?;
        Ok(Self {
            client,
            url: config.url.clone(),
            credentials: Credentials::from_config(config.auth_token.as_ref(), keystone),
        })
    }

    fn get<T: DeserializeOwned>(&self, path: &str, query: &[(&str, &str)]) -> Result<T, RestError> {
        let url = join_url(&self.url, path);
        tracing::trace!("GET {url}");
        let (status, text) = send_authorised(&self.client, &self.credentials, path, || {
            self.client.get(&url).query(query)
        })?;
        if !status.is_success() {
            return Err(RestError::from_status(path, status, text));
        }
        serde_json::from_str(&text)
            .map_err(|err| RestError::InvalidResponse { path: path.to_string(), msg: err.to_string() })
    }

    pub fn get_network(&self, network_id: &str) -> Result<NeutronNetwork, RestError> {
        let body: NetworkBody = self.get(&format!("v2.0/networks/{network_id}"), &[])?;
        Ok(body.network)
    }

    /// Ports of `network_id` bound to `host_id`
    pub fn list_ports(&self, network_id: &str, host_id: &str) -> Result<Vec<NeutronPort>, RestError> {
        let body: PortsBody = self.get(
            "v2.0/ports",
            &[("network_id", network_id), ("binding:host_id", host_id)],
        )?;
        Ok(body.ports)
    }
}
