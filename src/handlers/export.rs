//! Export handler: JSON snapshot of every collection.

use crate::error::AppError;
use crate::export::export_all;
use crate::handlers::entity::blocking;
use crate::state::AppState;
use axum::{extract::State, Json};
use serde_json::Value;

pub async fn export(State(state): State<AppState>) -> Result<Json<Value>, AppError> {
    let collections = state.collections.clone();
    let snapshot = blocking(move || export_all(collections.iter())).await?;
    Ok(Json(snapshot))
}
