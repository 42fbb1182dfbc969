//! Collection routes. Path extractors receive the collection segment and key;
//! handlers resolve the store by segment.

use crate::handlers::{bulk_upsert, create, delete as delete_handler, export, list, read, update};
use crate::state::AppState;
use axum::{routing::get, routing::post, Router};

pub fn entity_routes(state: AppState) -> Router {
    Router::new()
        .route("/export", get(export))
        .route("/:path_segment", get(list).post(create))
        .route("/:path_segment/bulk-upsert", post(bulk_upsert))
        .route("/:path_segment/:key", get(read).put(update).delete(delete_handler))
        .with_state(state)
}
