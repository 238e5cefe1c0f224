use std::sync::Arc;
use axum::extract::{Path, Query, State};
use axum::response::IntoResponse;
use axum_extra::response::ErasedJson;
use dm_integration_lib::bindings::BindingsHelper;
use dm_integration_lib::hooks::PortEventHandler;
use dm_integration_schemas::handlers::PrettyQueryParams;
use serde_json::json;
use crate::{AppError, AppState, IntegrationDisabled};

fn bindings_helper(handler: &PortEventHandler) -> Result<&BindingsHelper, IntegrationDisabled> {
    handler.integrator().bindings_helper().ok_or(IntegrationDisabled)
}

fn respond(value: serde_json::Value, params: &PrettyQueryParams) -> ErasedJson {
    if params.is_pretty() {
        ErasedJson::pretty(value)
    } else {
        ErasedJson::new(value)
    }
}

/// Physical links of a compute host as the integration sees them
pub async fn get_topology(
    State(app_state): State<Arc<AppState>>,
    Path(host): Path<String>,
    Query(params): Query<PrettyQueryParams>,
) -> Result<impl IntoResponse, AppError> {
    let handler = app_state.handler.clone();
    let node = tokio::task::spawn_blocking(move || -> anyhow::Result<_> {
        Ok(bindings_helper(&handler)?.resolve_node(&host)?)
    }).await??;
    Ok(respond(serde_json::to_value(node)?, &params))
}

/// The bindings a VMI created now for the host would carry
pub async fn get_bindings(
    State(app_state): State<Arc<AppState>>,
    Path(host): Path<String>,
    Query(params): Query<PrettyQueryParams>,
) -> Result<impl IntoResponse, AppError> {
    let handler = app_state.handler.clone();
    let value = tokio::task::spawn_blocking(move || -> anyhow::Result<_> {
        let helper = bindings_helper(&handler)?;
        let node = helper.resolve_node(&host)?;
        let profile = helper.build_bindings(&node)?;
        let key_value_pairs = profile.to_key_value_pairs()?;
        Ok(json!({
            "host": host,
            "profile": profile,
            "key_value_pairs": key_value_pairs,
        }))
    }).await??;
    Ok(respond(value, &params))
}
