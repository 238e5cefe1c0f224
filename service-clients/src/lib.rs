pub mod keystone;
pub mod neutron;
pub mod vnc;

use reqwest::blocking::{Client, RequestBuilder};
use reqwest::StatusCode;
use thiserror::Error;
use crate::keystone::Credentials;

/// Errors shared by the REST clients. "Not found" and "conflict" are split out so callers can
/// decide which ones are tolerable.
#[derive(Error, Debug)]
pub enum RestError {
    #[error("'{0}' not found")]
    NotFound(String),
    #[error("'{0}' already exists")]
    Conflict(String),
    #[error("request to '{path}' failed with {status}: {body}")]
    Http {
        path: String,
        status: StatusCode,
        body: String,
    },
    #[error("could not reach '{path}': {source}")]
    Transport {
        path: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("invalid configuration '{0}'")]
    InvalidConfig(String),
    #[error("invalid response from '{path}': {msg}")]
    InvalidResponse {
        path: String,
        msg: String,
    },
}

impl RestError {
    /// Map a non success status code onto the error taxonomy
    pub fn from_status(path: &str, status: StatusCode, body: String) -> Self {
        match status {
            StatusCode::NOT_FOUND => RestError::NotFound(path.to_string()),
            StatusCode::CONFLICT => RestError::Conflict(path.to_string()),
            _ => RestError::Http {
                path: path.to_string(),
                status,
                body,
            },
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, RestError::NotFound(_))
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, RestError::Conflict(_))
    }
}

/// Join a base url and a path without doubling or dropping the slash
pub fn join_url(base_url: &str, path: &str) -> String {
    format!("{}/{}", base_url.trim_end_matches('/'), path.trim_start_matches('/'))
}

/// Send the request made by `build` with the current token. A 401 answer is retried once with a
/// fresh token when the credentials can renew it. Returns the status and the body text.
pub(crate) fn send_authorised<F>(
    client: &Client,
    credentials: &Credentials,
    path: &str,
    build: F,
) -> Result<(StatusCode, String), RestError>
where
    F: Fn() -> RequestBuilder,
{
    let mut renewed = false;
    loop {
        let mut request = build();
        if let Some(token) = credentials.token(client)? {
            request = request.header("X-Auth-Token", token);
        }
        let response = request.send()
            .map_err(|source| RestError::Transport { path: path.to_string(), source })?;
        let status = response.status();
        let text = response.text()
            .map_err(|source| RestError::Transport { path: path.to_string(), source })?;
        if status == StatusCode::UNAUTHORIZED && !renewed && credentials.invalidate() {
            tracing::debug!("token rejected for '{path}', authenticating again");
            renewed = true;
            continue;
        }
        return Ok((status, text));
    }
}
