use std::sync::Arc;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use dm_integration_lib::DmError;
use dm_integration_schemas::neutron_models::{NeutronPort, PortBody, PortUpdateBody};
use crate::{AppError, AppState};

/// The port in the body must be the one named in the path, a missing body id is taken from the
/// path
fn port_for_path(id: &str, mut port: NeutronPort) -> Result<NeutronPort, DmError> {
    if port.id.is_empty() {
        port.id = id.to_string();
    }
    if port.id != id {
        return Err(DmError::InvalidPort(id.to_string(), format!("body is for port {}", port.id)));
    }
    Ok(port)
}

pub async fn create_port(
    State(app_state): State<Arc<AppState>>,
    Json(body): Json<PortBody>,
) -> Result<StatusCode, AppError> {
    tracing::debug!("port create notification for {}", body.port.id);
    let handler = app_state.handler.clone();
    tokio::task::spawn_blocking(move || handler.port_created(&body.port)).await??;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn update_port(
    State(app_state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(body): Json<PortUpdateBody>,
) -> Result<StatusCode, AppError> {
    tracing::debug!("port update notification for {id}");
    let port = port_for_path(&id, body.port)?;
    let original = port_for_path(&id, body.original_port)?;
    let handler = app_state.handler.clone();
    tokio::task::spawn_blocking(move || handler.port_updated(&port, &original)).await??;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn delete_port(
    State(app_state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(body): Json<PortBody>,
) -> Result<StatusCode, AppError> {
    tracing::debug!("port delete notification for {id}");
    let port = port_for_path(&id, body.port)?;
    let handler = app_state.handler.clone();
    tokio::task::spawn_blocking(move || handler.port_deleted(&port)).await??;
    Ok(StatusCode::NO_CONTENT)
}
