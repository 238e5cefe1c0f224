use serde::{Deserialize, Serialize};

/// Query string accepted by the inspection endpoints, `?pretty=true` returns indented JSON
#[derive(Serialize, Deserialize, Debug, Default)]
pub struct PrettyQueryParams {
    pub pretty: Option<bool>,
}

impl PrettyQueryParams {
    pub fn is_pretty(&self) -> bool {
        self.pretty.unwrap_or(false)
    }
}

/// Response body of the status endpoint of the hook service
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "snake_case")]
pub struct ServiceStatus {
    pub version: String,
    pub enabled: bool,
    /// `file` or `api`, empty when the integration is disabled
    pub topology_mode: String,
    pub started_at: String,
}
