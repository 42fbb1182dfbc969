//! Key resolution: user-supplied key string -> row index.
//!
//! Two passes over the candidates, first hit wins:
//! 1. trimmed + NFKC-normalized exact comparison
//! 2. the same comparison, case-insensitive
//!
//! Containment matching exists only for diagnostics and never selects a row.

use crate::service::coerce::cell_text;
use crate::table::Record;
use unicode_normalization::UnicodeNormalization;

/// Trim, apply NFKC, trim again (compatibility forms can expand to whitespace).
pub fn normalize_key(s: &str) -> String {
    s.trim().nfkc().collect::<String>().trim().to_string()
}

fn key_of(row: &Record, key_field: &str) -> String {
    row.get(key_field).map(cell_text).unwrap_or_default()
}

/// Index of the first row whose `key_field` matches `query`.
pub fn resolve(rows: &[Record], key_field: &str, query: &str) -> Option<usize> {
    let wanted = normalize_key(query);
    if wanted.is_empty() {
        return None;
    }
    let candidates: Vec<String> = rows.iter().map(|r| normalize_key(&key_of(r, key_field))).collect();

    if let Some(i) = candidates.iter().position(|c| *c == wanted) {
        return Some(i);
    }
    let wanted_lower = wanted.to_lowercase();
    candidates.iter().position(|c| c.to_lowercase() == wanted_lower)
}

/// Keys that contain the query or are contained in it, case-insensitive. For logging only.
pub fn similar_keys(rows: &[Record], key_field: &str, query: &str, limit: usize) -> Vec<String> {
    let wanted = normalize_key(query).to_lowercase();
    if wanted.is_empty() {
        return Vec::new();
    }
    rows.iter()
        .map(|r| key_of(r, key_field))
        .filter(|k| {
            let c = normalize_key(k).to_lowercase();
            !c.is_empty() && (c.contains(&wanted) || wanted.contains(&c))
        })
        .take(limit)
        .collect()
}
