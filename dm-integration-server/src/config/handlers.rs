use std::sync::Arc;
use axum::extract::{Query, State};
use axum::response::IntoResponse;
use axum_extra::response::ErasedJson;
use dm_integration_schemas::handlers::PrettyQueryParams;
use crate::{AppError, AppState};

pub async fn service_status(
    State(app_state): State<Arc<AppState>>,
    Query(params): Query<PrettyQueryParams>,
) -> Result<impl IntoResponse, AppError> {
    let status = app_state.status();
    if params.is_pretty() {
        return Ok(ErasedJson::pretty(status));
    }
    Ok(ErasedJson::new(status))
}
