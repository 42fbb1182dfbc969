//! JSON snapshots of collections, keyed by the file's own headers.

use crate::error::StoreResult;
use crate::service::RecordStore;
use crate::table::{Record, Table};
use crate::writer;
use serde_json::{json, Value};
use std::collections::HashSet;
use std::path::Path;

/// Every row of one collection. Empty cells become `null`. A blank or
/// repeated header is keyed by its canonical field instead.
pub fn snapshot(store: &RecordStore) -> StoreResult<Vec<Record>> {
    let c = store.collection();
    let table = Table::load(&c.path, &c.schema)?;
    let mut used = HashSet::new();
    let names: Vec<&str> = table
        .columns()
        .iter()
        .map(|col| {
            if col.header.is_empty() || !used.insert(col.header.as_str()) {
                col.field.as_str()
            } else {
                col.header.as_str()
            }
        })
        .collect();
    let rows = table
        .rows()
        .iter()
        .map(|row| {
            let mut out = Record::new();
            for (col, name) in table.columns().iter().zip(&names) {
                let value = match row.get(&col.field) {
                    Some(Value::String(s)) if s.is_empty() => Value::Null,
                    Some(v) => v.clone(),
                    None => Value::Null,
                };
                out.insert(name.to_string(), value);
            }
            out
        })
        .collect();
    Ok(rows)
}

/// `{ "exported_at": ..., "collections": { <path segment>: [rows] } }`
pub fn export_all<'a>(stores: impl IntoIterator<Item = &'a RecordStore>) -> StoreResult<Value> {
    let mut collections = serde_json::Map::new();
    for store in stores {
        let rows = snapshot(store)?;
        tracing::debug!(collection = %store.collection().name, rows = rows.len(), "exported");
        collections.insert(
            store.collection().path_segment.clone(),
            Value::Array(rows.into_iter().map(Value::Object).collect()),
        );
    }
    Ok(json!({
        "exported_at": chrono::Utc::now().to_rfc3339(),
        "collections": collections,
    }))
}

/// Write one `<path segment>.json` per collection into `dir`. Returns the number of files written.
pub fn write_snapshots<'a>(stores: impl IntoIterator<Item = &'a RecordStore>, dir: &Path) -> StoreResult<usize> {
    let mut written = 0;
    for store in stores {
        let rows = snapshot(store)?;
        let target = dir.join(format!("{}.json", store.collection().path_segment));
        writer::persist(&target, || {
            serde_json::to_vec_pretty(&rows).map_err(|e| crate::error::StoreError::Io {
                path: target.clone(),
                reason: e.to_string(),
            })
        })?;
        tracing::info!(path = %target.display(), rows = rows.len(), "snapshot written");
        written += 1;
    }
    Ok(written)
}
