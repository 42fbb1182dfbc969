//! Pagination, substring search and exact filters over presented records.

use crate::service::coerce::cell_text;
use crate::table::Record;
use serde::Serialize;

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page: usize,
    pub per_page: usize,
    pub total: usize,
}

/// 1-indexed page of `items`. Out-of-range pages (and page or size 0) are empty, never an error.
pub fn paginate<T>(items: Vec<T>, page: usize, per_page: usize) -> Page<T> {
    let total = items.len();
    let start = page.saturating_sub(1).saturating_mul(per_page);
    let items = if page == 0 || per_page == 0 || start >= total {
        Vec::new()
    } else {
        items.into_iter().skip(start).take(per_page).collect()
    };
    Page {
        items,
        page,
        per_page,
        total,
    }
}

/// Records where any of `fields` contains `query`, case-insensitive. A blank query keeps everything.
pub fn search(records: Vec<Record>, query: &str, fields: &[String]) -> Vec<Record> {
    let needle = query.trim().to_lowercase();
    if needle.is_empty() {
        return records;
    }
    records
        .into_iter()
        .filter(|r| {
            fields
                .iter()
                .filter_map(|f| r.get(f))
                .any(|v| cell_text(v).to_lowercase().contains(&needle))
        })
        .collect()
}

/// Records whose fields equal every `(field, value)` pair after trimming.
pub fn filter(records: Vec<Record>, filters: &[(String, String)]) -> Vec<Record> {
    if filters.is_empty() {
        return records;
    }
    records
        .into_iter()
        .filter(|r| {
            filters.iter().all(|(f, want)| {
                r.get(f)
                    .map(|v| cell_text(v).trim() == want.trim())
                    .unwrap_or(false)
            })
        })
        .collect()
}
