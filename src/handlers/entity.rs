//! Collection handlers: list, create, read, update, delete, bulk upsert.

use crate::error::{AppError, StoreError};
use crate::query::{filter, paginate, search};
use crate::response::{bulk_ack, success_many, success_one, success_one_ok, success_page, update_ack, Ack};
use crate::service::RecordStore;
use crate::state::AppState;
use crate::table::Record;
use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

/// Run a store call off the async runtime; file I/O blocks.
pub(crate) async fn blocking<T, F>(f: F) -> Result<T, AppError>
where
    F: FnOnce() -> Result<T, StoreError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| AppError::Internal(format!("blocking task failed: {}", e)))?
        .map_err(AppError::from)
}

fn store_for(state: &AppState, segment: &str, operation: &str) -> Result<Arc<RecordStore>, AppError> {
    let store = state
        .collections
        .by_path(segment)
        .ok_or_else(|| AppError::UnknownCollection(segment.to_string()))?;
    if !store.collection().allows(operation) {
        return Err(AppError::OperationNotAllowed {
            collection: store.collection().name.clone(),
            operation: operation.to_string(),
        });
    }
    Ok(store)
}

fn parse_body(body: &Bytes) -> Result<Value, AppError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Err(AppError::BadRequest("No data provided".into()));
    }
    serde_json::from_slice(body).map_err(|e| AppError::BadRequest(format!("invalid JSON: {}", e)))
}

fn body_to_record(value: Value) -> Result<Record, AppError> {
    match value {
        Value::Object(m) if m.is_empty() => Err(AppError::BadRequest("No data provided".into())),
        Value::Object(m) => Ok(m),
        _ => Err(AppError::BadRequest("body must be a JSON object".into())),
    }
}

/// Bulk payload: a JSON array of objects, or `{ "data": [...] }`.
fn body_to_records(value: Value) -> Result<Vec<Record>, AppError> {
    let items = match value {
        Value::Array(arr) => arr,
        Value::Object(mut m) => match m.remove("data") {
            Some(Value::Array(arr)) => arr,
            _ => return Err(AppError::BadRequest("body must be a JSON array".into())),
        },
        _ => return Err(AppError::BadRequest("body must be a JSON array".into())),
    };
    items
        .into_iter()
        .map(|v| match v {
            Value::Object(m) => Ok(m),
            _ => Err(AppError::BadRequest("each item must be a JSON object".into())),
        })
        .collect()
}

fn parse_usize(name: &str, v: &str) -> Result<usize, AppError> {
    v.trim()
        .parse()
        .map_err(|_| AppError::BadRequest(format!("{} must be a positive integer", name)))
}

pub async fn list(
    State(state): State<AppState>,
    Path(path_segment): Path<String>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<impl IntoResponse, AppError> {
    let store = store_for(&state, &path_segment, "list")?;
    let collection = store.collection();

    let mut page: Option<usize> = None;
    let mut per_page: Option<usize> = None;
    let mut query: Option<String> = None;
    let mut filters: Vec<(String, String)> = Vec::new();
    for (k, v) in params {
        match k.as_str() {
            "page" => page = Some(parse_usize("page", &v)?),
            "per_page" => per_page = Some(parse_usize("per_page", &v)?),
            "search" | "q" => query = Some(v),
            _ => match collection.schema.resolve_request_key(&k) {
                Some(field) => filters.push((field, v)),
                None => tracing::debug!(param = %k, "ignoring unknown query parameter"),
            },
        }
    }
    let search_fields: Vec<String> = if collection.search_fields.is_empty() {
        collection.schema.columns.iter().map(|c| c.field.clone()).collect()
    } else {
        collection.search_fields.clone()
    };

    let list_store = store.clone();
    let mut rows = blocking(move || list_store.list()).await?;
    rows = filter(rows, &filters);
    if let Some(q) = query {
        rows = search(rows, &q, &search_fields);
    }

    Ok(match (page, per_page) {
        (Some(page), Some(per_page)) => success_page(paginate(rows, page, per_page)).into_response(),
        _ => success_many(rows).into_response(),
    })
}

pub async fn create(
    State(state): State<AppState>,
    Path(path_segment): Path<String>,
    body: Bytes,
) -> Result<impl IntoResponse, AppError> {
    let store = store_for(&state, &path_segment, "create")?;
    let record = body_to_record(parse_body(&body)?)?;
    let row = blocking(move || store.create(&record)).await?;
    Ok(success_one(row))
}

pub async fn read(
    State(state): State<AppState>,
    Path((path_segment, key)): Path<(String, String)>,
) -> Result<impl IntoResponse, AppError> {
    let store = store_for(&state, &path_segment, "read")?;
    let row = blocking(move || store.get(&key)).await?;
    Ok(success_one_ok(row))
}

pub async fn update(
    State(state): State<AppState>,
    Path((path_segment, key)): Path<(String, String)>,
    body: Bytes,
) -> Result<impl IntoResponse, AppError> {
    let store = store_for(&state, &path_segment, "update")?;
    let record = body_to_record(parse_body(&body)?)?;
    let entity = store.collection().name.clone();
    let shown = key.trim().to_string();
    let outcome = blocking(move || store.update(&key, &record)).await?;
    Ok(update_ack(&entity, &shown, outcome))
}

pub async fn delete(
    State(state): State<AppState>,
    Path((path_segment, key)): Path<(String, String)>,
) -> Result<impl IntoResponse, AppError> {
    let store = store_for(&state, &path_segment, "delete")?;
    let message = format!("{} '{}' deleted", store.collection().name, key.trim());
    blocking(move || store.delete(&key)).await?;
    Ok((StatusCode::OK, Json(Ack::new(message))))
}

pub async fn bulk_upsert(
    State(state): State<AppState>,
    Path(path_segment): Path<String>,
    body: Bytes,
) -> Result<impl IntoResponse, AppError> {
    let store = store_for(&state, &path_segment, "bulk_upsert")?;
    let records = body_to_records(parse_body(&body)?)?;
    let entity = store.collection().name.clone();
    let counts = blocking(move || store.bulk_upsert(&records)).await?;
    Ok(bulk_ack(&entity, counts))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn blank_bodies_are_rejected() {
        assert!(matches!(parse_body(&Bytes::from_static(b"  ")), Err(AppError::BadRequest(_))));
        assert!(matches!(body_to_record(json!({})), Err(AppError::BadRequest(_))));
        assert!(matches!(body_to_record(json!([1])), Err(AppError::BadRequest(_))));
    }

    #[test]
    fn bulk_body_shapes() {
        assert_eq!(body_to_records(json!([{ "a": 1 }])).unwrap().len(), 1);
        assert_eq!(body_to_records(json!({ "data": [{ "a": 1 }, { "b": 2 }] })).unwrap().len(), 2);
        assert!(body_to_records(json!({ "a": 1 })).is_err());
        assert!(body_to_records(json!([1, 2])).is_err());
        assert!(body_to_records(json!([])).unwrap().is_empty());
    }
}
