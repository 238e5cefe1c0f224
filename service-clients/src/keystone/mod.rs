use std::sync::{Arc, Mutex};
use dm_integration_schemas::settings::KeystoneConfig;
use reqwest::blocking::Client;
use serde_json::json;
use crate::{join_url, RestError};

const SUBJECT_TOKEN_HEADER: &str = "X-Subject-Token";

/// Keystone v3 password authentication. The token is requested on first use and kept until a
/// service rejects it.
pub struct KeystoneAuth {
    config: KeystoneConfig,
    token: Mutex<Option<String>>,
}

impl KeystoneAuth {
    pub fn new(config: &KeystoneConfig) -> Self {
        Self {
            config: config.clone(),
            token: Mutex::new(None),
        }
    }

    /// The cached token, or a new one issued with `client`
    pub fn token(&self, client: &Client) -> Result<String, RestError> {
        let mut token = self.token.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Some(token) = &*token {
            return Ok(token.clone());
        }
        let issued = self.issue_token(client)?;
        *token = Some(issued.clone());
        Ok(issued)
    }

    /// Forget the cached token so the next request authenticates again
    pub fn invalidate(&self) {
        let mut token = self.token.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        *token = None;
    }

    fn issue_token(&self, client: &Client) -> Result<String, RestError> {
        let path = "auth/tokens";
        let url = join_url(&self.config.auth_url, path);
        tracing::debug!("requesting keystone token for {} from {}", self.config.username, self.config.auth_url);
        let body = json!({
            "auth": {
                "identity": {
                    "methods": ["password"],
                    "password": {
                        "user": {
                            "name": self.config.username,
                            "domain": {"name": self.config.user_domain_name},
                            "password": self.config.password,
                        }
                    }
                },
                "scope": {
                    "project": {
                        "name": self.config.project_name,
                        "domain": {"name": self.config.project_domain_name},
                    }
                }
            }
        });
        let response = client.post(&url)
            .json(&body)
            .send()
            .map_err(|source| RestError::Transport { path: url.clone(), source })?;
        let status = response.status();
        let token = response.headers()
            .get(SUBJECT_TOKEN_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);
        if !status.is_success() {
            let text = response.text().unwrap_or_default();
            return Err(RestError::from_status(&url, status, text));
        }
        token.ok_or_else(|| RestError::InvalidResponse {
            path: url,
            msg: format!("missing {SUBJECT_TOKEN_HEADER} header"),
        })
    }
}

/// What a client sends as `X-Auth-Token`
#[derive(Clone, Default)]
pub enum Credentials {
    #[default]
    Anonymous,
    Token(String),
    Keystone(Arc<KeystoneAuth>),
}

impl Credentials {
    /// Keystone wins over a fixed token when both are configured
    pub fn from_config(auth_token: Option<&String>, keystone: Option<Arc<KeystoneAuth>>) -> Self {
        match (keystone, auth_token) {
            (Some(keystone), _) => Credentials::Keystone(keystone),
            (None, Some(token)) => Credentials::Token(token.clone()),
            (None, None) => Credentials::Anonymous,
        }
    }

    pub fn token(&self, client: &Client) -> Result<Option<String>, RestError> {
        match self {
            Credentials::Anonymous => Ok(None),
            Credentials::Token(token) => Ok(Some(token.clone())),
            Credentials::Keystone(keystone) => keystone.token(client).map(Some),
        }
    }

    /// Drop a rejected token, true when a fresh one can be requested
    pub fn invalidate(&self) -> bool {
        match self {
            Credentials::Keystone(keystone) => {
                keystone.invalidate();
                true
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use httptest::all_of;
    use httptest::matchers::{eq, json_decoded, request};
    use httptest::responders::status_code;
    use httptest::{Expectation, Server};
    use serde_json::json;
    use super::*;

    fn keystone_config(server: &Server) -> KeystoneConfig {
        KeystoneConfig {
            auth_url: server.url_str("/v3"),
            username: "neutron".into(),
            password: "secret".into(),
            project_name: "service".into(),
            user_domain_name: "Default".into(),
            project_domain_name: "Default".into(),
        }
    }

    #[test]
    fn test_token_is_issued_once() {
        let server = Server::run();
        server.expect(
            Expectation::matching(all_of![
                request::method_path("POST", "/v3/auth/tokens"),
                request::body(json_decoded(eq(json!({
                    "auth": {
                        "identity": {
                            "methods": ["password"],
                            "password": {"user": {"name": "neutron", "domain": {"name": "Default"}, "password": "secret"}}
                        },
                        "scope": {"project": {"name": "service", "domain": {"name": "Default"}}}
                    }
                })))),
            ])
            .times(1)
            .respond_with(status_code(201).insert_header("X-Subject-Token", "token-1").body("{}")),
        );
        let keystone = KeystoneAuth::new(&keystone_config(&server));
        let client = Client::new();

        assert_eq!(keystone.token(&client).unwrap(), "token-1");
        assert_eq!(keystone.token(&client).unwrap(), "token-1");
    }

    #[test]
    fn test_rejected_credentials() {
        let server = Server::run();
        server.expect(
            Expectation::matching(request::method_path("POST", "/v3/auth/tokens"))
                .respond_with(status_code(401).body(r#"{"error": {"code": 401}}"#)),
        );
        let keystone = KeystoneAuth::new(&keystone_config(&server));

        let res = keystone.token(&Client::new());

        assert!(matches!(res, Err(RestError::Http { status, .. }) if status == reqwest::StatusCode::UNAUTHORIZED));
    }

    #[test]
    fn test_credentials_precedence() {
        let server = Server::run();
        let keystone = Arc::new(KeystoneAuth::new(&keystone_config(&server)));
        let token = "fixed".to_string();

        assert!(matches!(Credentials::from_config(Some(&token), Some(keystone)), Credentials::Keystone(_)));
        assert!(matches!(Credentials::from_config(Some(&token), None), Credentials::Token(t) if t == "fixed"));
        assert!(matches!(Credentials::from_config(None, None), Credentials::Anonymous));
        assert!(!Credentials::Token(token).invalidate());
    }
}
