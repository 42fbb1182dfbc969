//! Router assembly: common routes at the root, collections under `/api`.

mod common;
mod entity;

pub use common::common_routes;
pub use entity::entity_routes;

use crate::config::Settings;
use crate::state::AppState;
use axum::{extract::DefaultBodyLimit, Router};
use tower_http::cors::CorsLayer;
use tower_http::limit::RequestBodyLimitLayer;

/// The full application router.
pub fn app(state: AppState, settings: &Settings) -> Router {
    Router::new()
        .merge(common_routes(state.clone()))
        .nest("/api", entity_routes(state))
        .layer(DefaultBodyLimit::max(settings.max_body_bytes))
        .layer(RequestBodyLimitLayer::new(settings.max_body_bytes))
        .layer(CorsLayer::permissive())
}
