use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use dm_integration_schemas::fabric_models::{FabricObject, FabricResource};
use dm_integration_schemas::settings::ApiServerConfig;
use reqwest::blocking::Client;
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use crate::keystone::{Credentials, KeystoneAuth};
use crate::{join_url, send_authorised, RestError};

/// How to reach the fabric controller API server
#[derive(Clone)]
pub struct VncClientConfig {
    pub base_url: String,
    pub credentials: Credentials,
    pub insecure: bool,
    pub ca_file: Option<PathBuf>,
}

impl VncClientConfig {
    pub fn new(config: &ApiServerConfig, keystone: Option<Arc<KeystoneAuth>>) -> Self {
        Self {
            base_url: config.base_url(),
            credentials: Credentials::from_config(config.auth_token.as_ref(), keystone),
            insecure: config.insecure,
            ca_file: config.ca_file.clone(),
        }
    }
}

impl From<&ApiServerConfig> for VncClientConfig {
    fn from(config: &ApiServerConfig) -> Self {
        Self::new(config, None)
    }
}

enum Connection {
    Disconnected,
    Connected(Client),
}

/// Blocking client for the VNC style REST API of the fabric controller. Nothing is contacted
/// when the client is built, the HTTP client is created by the first request.
pub struct VncRestClient {
    config: VncClientConfig,
    connection: Mutex<Connection>,
}

impl VncRestClient {
    pub fn new(config: VncClientConfig) -> Self {
        Self {
            config,
            connection: Mutex::new(Connection::Disconnected),
        }
    }

    pub fn is_connected(&self) -> bool {
        let connection = self.connection.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        matches!(*connection, Connection::Connected(_))
    }

    /// Move to the connected state if needed and hand out the HTTP client
    pub fn ensure_connected(&self) -> Result<Client, RestError> {
        let mut connection = self.connection.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        match &*connection {
            Connection::Connected(client) => Ok(client.clone()),
            Connection::Disconnected => {
                tracing::debug!("connecting to fabric controller at {}", self.config.base_url);
                let client = self.build_client()?;
                *connection = Connection::Connected(client.clone());
                Ok(client)
            }
        }
    }

    fn build_client(&self) -> Result<Client, RestError> {
        let mut builder = Client::builder()
            .danger_accept_invalid_certs(self.config.insecure);
        if let Some(ca_file) = &self.config.ca_file {
            let pem = std::fs::read(ca_file)
                .map_err(|err| RestError::InvalidConfig(format!("reading {}: {err}", ca_file.display())))?;
            let certificate = reqwest::Certificate::from_pem(&pem)
                .map_err(|err| RestError::InvalidConfig(format!("parsing {}: {err}", ca_file.display())))?;
            builder = builder.add_root_certificate(certificate);
        }
        builder.build()
            .map_err(|err| RestError::InvalidConfig(format!("building http client: {err}")))
    }

    fn execute_request(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, String)],
        body: Option<Value>,
    ) -> Result<Value, RestError> {
        let client = self.ensure_connected()?;
        let url = join_url(&self.config.base_url, path);
        tracing::trace!("{method} {url}");

        let (status, text) = send_authorised(&client, &self.config.credentials, path, || {
            let mut request = client.request(method.clone(), &url);
            if !query.is_empty() {
                request = request.query(query);
            }
            if let Some(body) = &body {
                request = request.json(body);
            }
            request
        })?;
        if !status.is_success() {
            return Err(RestError::from_status(path, status, text));
        }
        if text.trim().is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(&text)
            .map_err(|err| RestError::InvalidResponse { path: path.to_string(), msg: err.to_string() })
    }

    /// Resolve an fq_name to the uuid of the object, `None` when no such object exists
    pub fn fq_name_to_id(&self, resource: FabricResource, fq_name: &[String]) -> Result<Option<String>, RestError> {
        let body = json!({"type": resource.as_ref(), "fq_name": fq_name});
        match self.execute_request(Method::POST, "fqname-to-id", &[], Some(body)) {
            Ok(value) => {
                let uuid = value.get("uuid")
                    .and_then(Value::as_str)
                    .ok_or_else(|| RestError::InvalidResponse {
                        path: "fqname-to-id".into(),
                        msg: "missing uuid".into(),
                    })?;
                Ok(Some(uuid.to_string()))
            }
            Err(err) if err.is_not_found() => Ok(None),
            Err(err) => Err(err),
        }
    }

    pub fn read<T: FabricObject>(&self, uuid: &str) -> Result<Option<T>, RestError> {
        let path = format!("{}/{uuid}", T::RESOURCE);
        match self.execute_request(Method::GET, &path, &[], None) {
            Ok(value) => Ok(Some(unwrap_body(&path, T::RESOURCE, value)?)),
            Err(err) if err.is_not_found() => Ok(None),
            Err(err) => Err(err),
        }
    }

    pub fn read_by_fq_name<T: FabricObject>(&self, fq_name: &[String]) -> Result<Option<T>, RestError> {
        match self.fq_name_to_id(T::RESOURCE, fq_name)? {
            Some(uuid) => self.read(&uuid),
            None => Ok(None),
        }
    }

    /// List objects with every property, filtered on `field == value`
    pub fn list_filtered<T: FabricObject>(&self, field: &str, value: &str) -> Result<Vec<T>, RestError> {
        let path = T::RESOURCE.collection();
        let filter = format!("{field}=={}", Value::String(value.to_string()));
        let query = [("detail", "true".to_string()), ("filters", filter)];
        let value = self.execute_request(Method::GET, &path, &query, None)?;
        let items = value.get(&path)
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();
        items.into_iter()
            .map(|item| unwrap_body(&path, T::RESOURCE, item))
            .collect()
    }

    /// Create the object and return the uuid given to it by the controller
    pub fn create<T: FabricObject>(&self, object: &T) -> Result<String, RestError> {
        let path = T::RESOURCE.collection();
        let value = self.execute_request(Method::POST, &path, &[], Some(wrap_body(&path, object)?))?;
        value.get(T::RESOURCE.as_ref())
            .and_then(|created| created.get("uuid"))
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| RestError::InvalidResponse { path, msg: "missing uuid".into() })
    }

    pub fn update<T: FabricObject>(&self, object: &T) -> Result<(), RestError> {
        let uuid = object.uuid()
            .ok_or_else(|| RestError::InvalidConfig(format!("{} without uuid", T::RESOURCE)))?;
        let path = format!("{}/{uuid}", T::RESOURCE);
        self.execute_request(Method::PUT, &path, &[], Some(wrap_body(&path, object)?))?;
        Ok(())
    }

    pub fn delete(&self, resource: FabricResource, uuid: &str) -> Result<(), RestError> {
        let path = format!("{resource}/{uuid}");
        self.execute_request(Method::DELETE, &path, &[], None)?;
        Ok(())
    }

    /// Delete by fq_name, `NotFound` when the name does not resolve
    pub fn delete_by_fq_name(&self, resource: FabricResource, fq_name: &[String]) -> Result<(), RestError> {
        let uuid = self.fq_name_to_id(resource, fq_name)?
            .ok_or_else(|| RestError::NotFound(fq_name.join(":")))?;
        self.delete(resource, &uuid)
    }
}

/// Objects travel wrapped in a key named after their type
fn wrap_body<T: FabricObject>(path: &str, object: &T) -> Result<Value, RestError> {
    let value = serde_json::to_value(object)
        .map_err(|err| RestError::InvalidResponse { path: path.to_string(), msg: err.to_string() })?;
    let mut body = serde_json::Map::new();
    body.insert(T::RESOURCE.to_string(), value);
    Ok(Value::Object(body))
}

fn unwrap_body<T: DeserializeOwned>(path: &str, resource: FabricResource, mut value: Value) -> Result<T, RestError> {
    let inner = value.get_mut(resource.as_ref())
        .map(Value::take)
        .ok_or_else(|| RestError::InvalidResponse {
            path: path.to_string(),
            msg: format!("missing {resource} key"),
        })?;
    serde_json::from_value(inner)
        .map_err(|err| RestError::InvalidResponse { path: path.to_string(), msg: err.to_string() })
}

#[cfg(test)]
mod tests {
    use dm_integration_schemas::fabric_models::{FabricNode, Project, VirtualMachineInterface, VirtualPortGroup};
    use httptest::{all_of, cycle};
    use httptest::matchers::{contains, eq, json_decoded, key, request, url_decoded};
    use httptest::responders::{json_encoded, status_code};
    use httptest::{Expectation, Server};
    use super::*;

    fn client(server: &Server) -> VncRestClient {
        VncRestClient::new(VncClientConfig {
            base_url: server.url_str("/"),
            credentials: Credentials::Token("secret".into()),
            insecure: false,
            ca_file: None,
        })
    }

    #[test]
    fn test_client_starts_disconnected() {
        let server = Server::run();
        let client = client(&server);
        assert!(!client.is_connected());
        client.ensure_connected().unwrap();
        assert!(client.is_connected());
    }

    #[test]
    fn test_missing_ca_file_is_invalid_config() {
        let client = VncRestClient::new(VncClientConfig {
            base_url: "https://127.0.0.1:1".into(),
            credentials: Credentials::Anonymous,
            insecure: false,
            ca_file: Some(PathBuf::from("/does/not/exist.pem")),
        });
        assert!(matches!(client.ensure_connected(), Err(RestError::InvalidConfig(_))));
        assert!(!client.is_connected());
    }

    #[test]
    fn test_read_unwraps_body() {
        let server = Server::run();
        server.expect(
            Expectation::matching(all_of![
                request::method_path("GET", "/project/p-1"),
                request::headers(contains(("x-auth-token", "secret"))),
            ])
            .respond_with(json_encoded(json!({"project": {"uuid": "p-1", "fq_name": ["default-domain", "admin"]}}))),
        );
        let project: Project = client(&server).read("p-1").unwrap().unwrap();
        assert_eq!(project.fq_name, vec!["default-domain", "admin"]);
    }

    #[test]
    fn test_read_not_found_is_none() {
        let server = Server::run();
        server.expect(
            Expectation::matching(request::method_path("GET", "/project/p-1"))
                .respond_with(status_code(404)),
        );
        let project: Option<Project> = client(&server).read("p-1").unwrap();
        assert!(project.is_none());
    }

    #[test]
    fn test_fq_name_to_id_request() {
        let server = Server::run();
        server.expect(
            Expectation::matching(all_of![
                request::method_path("POST", "/fqname-to-id"),
                request::body(json_decoded(eq(json!({
                    "type": "virtual-machine-interface",
                    "fq_name": ["default-domain", "admin", "vmi"],
                })))),
            ])
            .respond_with(json_encoded(json!({"uuid": "vmi-1"}))),
        );
        let fq_name = vec!["default-domain".to_string(), "admin".to_string(), "vmi".to_string()];
        let uuid = client(&server).fq_name_to_id(FabricResource::VirtualMachineInterface, &fq_name).unwrap();
        assert_eq!(uuid.as_deref(), Some("vmi-1"));
    }

    #[test]
    fn test_create_conflict() {
        let server = Server::run();
        server.expect(
            Expectation::matching(all_of![
                request::method_path("POST", "/virtual-machine-interfaces"),
                request::body(json_decoded(|body: &Value| body.get("virtual-machine-interface").is_some())),
            ])
            .respond_with(status_code(409).body(r#"{"error": "exists"}"#)),
        );
        let vmi = VirtualMachineInterface {
            fq_name: vec!["admin".into(), "vmi".into()],
            ..Default::default()
        };
        let res = client(&server).create(&vmi);
        assert!(matches!(res, Err(RestError::Conflict(_))));
    }

    #[test]
    fn test_create_returns_uuid() {
        let server = Server::run();
        server.expect(
            Expectation::matching(request::method_path("POST", "/virtual-machine-interfaces"))
                .respond_with(json_encoded(json!({"virtual-machine-interface": {"uuid": "vmi-1", "fq_name": ["admin", "vmi"]}}))),
        );
        let vmi = VirtualMachineInterface {
            fq_name: vec!["admin".into(), "vmi".into()],
            ..Default::default()
        };
        assert_eq!(client(&server).create(&vmi).unwrap(), "vmi-1");
    }

    #[test]
    fn test_update_requires_uuid() {
        let server = Server::run();
        let vmi = VirtualMachineInterface::default();
        let res = client(&server).update(&vmi);
        assert!(matches!(res, Err(RestError::InvalidConfig(_))));
    }

    #[test]
    fn test_vpg_update_only_writes_vmi_refs() {
        let server = Server::run();
        server.expect(
            Expectation::matching(request::method_path("GET", "/virtual-port-group/vpg-1"))
                .respond_with(json_encoded(json!({"virtual-port-group": {
                    "uuid": "vpg-1",
                    "fq_name": ["default-global-system-config", "fabric-1", "vpg-1"],
                    "virtual_port_group_user_created": false,
                    "physical_interface_refs": [{
                        "to": ["default-global-system-config", "leaf1", "xe-0/0/1"],
                        "uuid": "pi-1",
                        "attr": {"ae_num": 3},
                    }],
                    "virtual_machine_interface_refs": [
                        {"to": ["default-domain", "admin", "vmi-a"], "uuid": "vmi-a"},
                        {"to": ["default-domain", "admin", "vmi-b"], "uuid": "vmi-b"},
                    ],
                }}))),
        );
        server.expect(
            Expectation::matching(all_of![
                request::method_path("PUT", "/virtual-port-group/vpg-1"),
                request::body(json_decoded(eq(json!({"virtual-port-group": {
                    "uuid": "vpg-1",
                    "fq_name": ["default-global-system-config", "fabric-1", "vpg-1"],
                    "virtual_machine_interface_refs": [
                        {"to": ["default-domain", "admin", "vmi-b"], "uuid": "vmi-b"},
                    ],
                }})))),
            ])
            .respond_with(json_encoded(json!({"virtual-port-group": {"uuid": "vpg-1"}}))),
        );
        let client = client(&server);
        let mut vpg: VirtualPortGroup = client.read("vpg-1").unwrap().unwrap();
        assert_eq!(vpg.physical_interface_refs[0].attr, Some(json!({"ae_num": 3})));
        let vmi = VirtualMachineInterface {
            uuid: Some("vmi-a".into()),
            fq_name: vec!["default-domain".into(), "admin".into(), "vmi-a".into()],
            ..Default::default()
        };

        vpg.del_virtual_machine_interface(&vmi);
        client.update(&vpg).unwrap();
    }

    #[test]
    fn test_list_filtered() {
        let server = Server::run();
        server.expect(
            Expectation::matching(all_of![
                request::method_path("GET", "/nodes"),
                request::query(url_decoded(contains(("detail", "true")))),
                request::query(url_decoded(contains(("filters", r#"node_hostname=="compute1""#)))),
            ])
            .respond_with(json_encoded(json!({"nodes": [{"node": {
                "uuid": "n-1",
                "fq_name": ["default-global-system-config", "compute1"],
                "node_hostname": "compute1",
                "ports": [{"to": ["x", "compute1", "eth0"], "uuid": "port-1"}],
            }}]}))),
        );
        let nodes: Vec<FabricNode> = client(&server).list_filtered("node_hostname", "compute1").unwrap();
        assert_eq!(nodes.len(), 1);
        assert_eq!(nodes[0].hostname.as_deref(), Some("compute1"));
        assert_eq!(nodes[0].ports[0].uuid, "port-1");
    }

    #[test]
    fn test_server_error() {
        let server = Server::run();
        server.expect(
            Expectation::matching(request::method_path("GET", "/project/p-1"))
                .respond_with(status_code(500).body("boom")),
        );
        let res: Result<Option<Project>, _> = client(&server).read("p-1");
        assert!(matches!(res, Err(RestError::Http { .. })));
    }

    #[test]
    fn test_expired_keystone_token_is_renewed() {
        let server = Server::run();
        server.expect(
            Expectation::matching(request::method_path("POST", "/v3/auth/tokens"))
                .times(2)
                .respond_with(cycle![
                    status_code(201).insert_header("X-Subject-Token", "expired").body("{}"),
                    status_code(201).insert_header("X-Subject-Token", "fresh").body("{}"),
                ]),
        );
        server.expect(
            Expectation::matching(all_of![
                request::method_path("GET", "/project/p-1"),
                request::headers(contains(("x-auth-token", "expired"))),
            ])
            .respond_with(status_code(401)),
        );
        server.expect(
            Expectation::matching(all_of![
                request::method_path("GET", "/project/p-1"),
                request::headers(contains(("x-auth-token", "fresh"))),
            ])
            .respond_with(json_encoded(json!({"project": {"uuid": "p-1", "fq_name": ["default-domain", "admin"]}}))),
        );
        let keystone = Arc::new(KeystoneAuth::new(&dm_integration_schemas::settings::KeystoneConfig {
            auth_url: server.url_str("/v3"),
            username: "neutron".into(),
            password: "secret".into(),
            project_name: "service".into(),
            user_domain_name: "Default".into(),
            project_domain_name: "Default".into(),
        }));
        let api_server = ApiServerConfig::default();
        let mut config = VncClientConfig::new(&api_server, Some(keystone));
        config.base_url = server.url_str("/");
        let client = VncRestClient::new(config);

        let project: Project = client.read("p-1").unwrap().unwrap();

        assert_eq!(project.uuid, "p-1");
    }

    #[test]
    fn test_fixed_token_is_not_retried() {
        let server = Server::run();
        server.expect(
            Expectation::matching(all_of![
                request::method_path("GET", "/project/p-1"),
                request::headers(contains(key("x-auth-token"))),
            ])
            .times(1)
            .respond_with(status_code(401)),
        );
        let res: Result<Option<Project>, _> = client(&server).read("p-1");
        assert!(matches!(res, Err(RestError::Http { status, .. }) if status == reqwest::StatusCode::UNAUTHORIZED));
    }
}
