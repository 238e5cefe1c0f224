use std::sync::Arc;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post, put};
use axum::Router;
use chrono::{DateTime, Utc};
use dm_integration_lib::hooks::PortEventHandler;
use dm_integration_lib::DmError;
use dm_integration_schemas::handlers::ServiceStatus;
use thiserror::Error;
use crate::config::handlers::service_status;
use crate::inspect::handlers::{get_bindings, get_topology};
use crate::ports::handlers::{create_port, delete_port, update_port};

pub mod config;
pub mod inspect;
pub mod logging;
pub mod ports;

/// Version reported by the status endpoint
pub const PROJECT_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Shared state of the handlers. The port handler is synchronous and is only ever called from
/// blocking tasks.
#[derive(Clone)]
pub struct AppState {
    pub handler: Arc<PortEventHandler>,
    pub started_at: DateTime<Utc>,
}

impl AppState {
    pub fn new(handler: PortEventHandler) -> Self {
        Self {
            handler: Arc::new(handler),
            started_at: Utc::now(),
        }
    }

    pub fn status(&self) -> ServiceStatus {
        let integrator = self.handler.integrator();
        ServiceStatus {
            version: PROJECT_VERSION.to_string(),
            enabled: integrator.enabled(),
            topology_mode: integrator.topology_mode()
                .map(|mode| mode.to_string())
                .unwrap_or_default(),
            started_at: self.started_at.to_rfc3339(),
        }
    }
}

/// Raised by the inspection endpoints when there is no topology to inspect
#[derive(Error, Debug)]
#[error("device manager integration is disabled")]
pub struct IntegrationDisabled;

/// Generic error handling struct used by the handlers, the status code is picked from the
/// error at the root of the chain.
pub struct AppError(anyhow::Error);

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        if self.0.downcast_ref::<IntegrationDisabled>().is_some() {
            return StatusCode::SERVICE_UNAVAILABLE;
        }
        match self.0.downcast_ref::<DmError>() {
            Some(DmError::NodeNotFound(_)) => StatusCode::NOT_FOUND,
            Some(err) if err.is_precondition() => StatusCode::UNPROCESSABLE_ENTITY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!("request failed: {:#}", self.0);
        } else {
            tracing::warn!("request rejected: {:#}", self.0);
        }
        (status, format!("Something went wrong: {:#}", self.0)).into_response()
    }
}

impl<E> From<E> for AppError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        Self(err.into())
    }
}

/// Produce the app in a separate function to allow for testing without creating an http server
pub fn dm_app(app_state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/status", get(service_status))
        .route("/api/ports", post(create_port))
        .route("/api/ports/:id", put(update_port).delete(delete_port))
        .route("/api/topology/:host", get(get_topology))
        .route("/api/bindings/:host", get(get_bindings))
        .with_state(app_state)
}
