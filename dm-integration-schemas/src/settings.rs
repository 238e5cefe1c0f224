use std::fmt::Formatter;
use std::net::{IpAddr, SocketAddr};
use std::path::{Path, PathBuf};
use std::fmt;
use anyhow::{bail, Context};
use serde::{Deserialize, Serialize};
use tokio::fs::File;
use tokio::io::AsyncWriteExt;
use crate::DM_SETTINGS_FOLDER;

/// Configuration for the Device Manager integration. This is passed explicitly to everything that
/// needs it, there is no process wide configuration object.
#[derive(Deserialize, Serialize, Debug, Clone)]
#[serde(rename_all = "snake_case")]
pub struct DmIntegrationConfig {
    /// when false, initialisation and every port sync are no-ops
    #[serde(default)]
    pub enabled: bool,
    /// path to the static topology YAML, when not set the topology is read live from the fabric
    /// controller
    #[serde(default)]
    pub topology: Option<PathBuf>,
    #[serde(default)]
    pub api_server: ApiServerConfig,
    #[serde(default)]
    pub neutron: NeutronConfig,
    #[serde(default)]
    pub server: ServerConfig,
    /// keystone credentials, when set tokens are requested from keystone and renewed when they
    /// expire, taking precedence over the static `auth_token` of the API server and Neutron
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub keystone: Option<KeystoneConfig>,
    #[serde(default = "default_log_folder")]
    pub log_folder: String,
}

impl Default for DmIntegrationConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            topology: None,
            api_server: ApiServerConfig::default(),
            neutron: NeutronConfig::default(),
            server: ServerConfig::default(),
            keystone: None,
            log_folder: default_log_folder(),
        }
    }
}

/// Connection details for the fabric controller API server
#[derive(Deserialize, Serialize, Debug, Clone)]
#[serde(rename_all = "snake_case")]
pub struct ApiServerConfig {
    #[serde(default = "default_api_server_host")]
    pub host: String,
    #[serde(default = "default_api_server_port")]
    pub port: u16,
    #[serde(default)]
    pub use_ssl: bool,
    /// skip certificate verification, only for lab setups
    #[serde(default)]
    pub insecure: bool,
    /// CA bundle (PEM) to verify the API server certificate with
    #[serde(default)]
    pub ca_file: Option<PathBuf>,
    /// fixed token sent as `X-Auth-Token`. Keystone tokens expire, so this only suits API servers
    /// without auth or long-lived service tokens, use `keystone` otherwise.
    #[serde(default)]
    pub auth_token: Option<String>,
}

impl Default for ApiServerConfig {
    fn default() -> Self {
        Self {
            host: default_api_server_host(),
            port: default_api_server_port(),
            use_ssl: false,
            insecure: false,
            ca_file: None,
            auth_token: None,
        }
    }
}

impl ApiServerConfig {
    pub fn base_url(&self) -> String {
        let scheme = if self.use_ssl { "https" } else { "http" };
        format!("{scheme}://{}:{}", self.host, self.port)
    }
}

#[derive(Deserialize, Serialize, Debug, Clone)]
#[serde(rename_all = "snake_case")]
pub struct NeutronConfig {
    #[serde(default = "default_neutron_url")]
    pub url: String,
    /// fixed token, see `ApiServerConfig::auth_token`
    #[serde(default)]
    pub auth_token: Option<String>,
}

impl Default for NeutronConfig {
    fn default() -> Self {
        Self {
            url: default_neutron_url(),
            auth_token: None,
        }
    }
}

/// Password authentication against keystone v3, scoped to a project
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct KeystoneConfig {
    /// versioned identity endpoint, i.e. `http://127.0.0.1:5000/v3`
    pub auth_url: String,
    pub username: String,
    pub password: String,
    pub project_name: String,
    #[serde(default = "default_domain")]
    pub user_domain_name: String,
    #[serde(default = "default_domain")]
    pub project_domain_name: String,
}

/// Where the hook service listens for port notifications
#[derive(Deserialize, Serialize, Debug, Clone)]
#[serde(rename_all = "snake_case")]
pub struct ServerConfig {
    #[serde(default = "default_listen_address")]
    pub listen_address: String,
    #[serde(default = "default_server_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_address: default_listen_address(),
            port: default_server_port(),
        }
    }
}

impl ServerConfig {
    pub fn socket_addr(&self) -> anyhow::Result<SocketAddr> {
        let ip: IpAddr = self.listen_address.parse()
            .with_context(|| format!("parsing listen address {}", self.listen_address))?;
        Ok(SocketAddr::new(ip, self.port))
    }
}

fn default_api_server_host() -> String {"127.0.0.1".to_string()}
fn default_api_server_port() -> u16 {8082}
fn default_neutron_url() -> String {"http://127.0.0.1:9696".to_string()}
fn default_listen_address() -> String {"0.0.0.0".to_string()}
fn default_server_port() -> u16 {3366}
fn default_domain() -> String {"Default".to_string()}
fn default_log_folder() -> String {"/var/log/dm-integration/".to_string()}

impl fmt::Display for DmIntegrationConfig {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let text = serde_json::to_string_pretty(&self).map_err(|_| fmt::Error)?;
        f.write_str(&text)
    }
}

impl DmIntegrationConfig {
    pub fn default_path() -> PathBuf {
        PathBuf::from(format!("{DM_SETTINGS_FOLDER}config.json"))
    }

    pub async fn write<P: AsRef<Path>>(&self, path: P) -> anyhow::Result<()> {
        let mut output = File::create(path).await?;
        output.write_all(format!("{self}").as_bytes()).await?;
        Ok(())
    }

    pub async fn read<P: AsRef<Path>>(path: P) -> anyhow::Result<DmIntegrationConfig> {
        let path = path.as_ref();
        tracing::trace!("expected dm integration config json location: {:?}", path);
        if path.is_file() {
            let text = tokio::fs::read_to_string(path).await?;
            let config: DmIntegrationConfig = serde_json::from_str(&text)
                .with_context(|| format!("parsing {}", path.display()))?;
            Ok(config)
        } else {
            bail!("could not read {}", path.display())
        }
    }
}
