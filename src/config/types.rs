//! Raw config types matching `config/collections.json`.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Operations a collection may expose.
pub const OPERATIONS: &[&str] = &["list", "read", "create", "update", "delete", "bulk_upsert"];

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ColumnConfig {
    /// Canonical field name (lowercase, underscore separated).
    pub field: String,
    /// Exact header string in the backing file.
    pub header: String,
    #[serde(default)]
    pub numeric: bool,
    /// Value used when a create or bulk upsert omits the field.
    #[serde(default)]
    pub default: Option<serde_json::Value>,
    /// Alternative canonical names accepted in files and requests, checked in order.
    #[serde(default)]
    pub aliases: Vec<String>,
    /// Always written, even when no row carries a value.
    #[serde(default)]
    pub retain: bool,
}

/// What `update` does when the key does not resolve.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissingKeyPolicy {
    #[default]
    Reject,
    Insert,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ValidationRule {
    #[serde(default)]
    pub required: Option<bool>,
    #[serde(default)]
    pub format: Option<String>,
    #[serde(default)]
    pub max_length: Option<u32>,
    #[serde(default)]
    pub min_length: Option<u32>,
    #[serde(default)]
    pub pattern: Option<String>,
    #[serde(default)]
    pub allowed: Option<Vec<serde_json::Value>>,
    #[serde(default)]
    pub minimum: Option<f64>,
    #[serde(default)]
    pub maximum: Option<f64>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CollectionConfig {
    /// Entity name used in messages (e.g. "tool").
    pub name: String,
    pub path_segment: String,
    pub file_name: String,
    /// Canonical field name of the primary key column.
    pub primary_key: String,
    /// Last-resort key column rule: first header whose canonical name contains every token.
    #[serde(default)]
    pub key_tokens: Vec<String>,
    pub columns: Vec<ColumnConfig>,
    #[serde(default)]
    pub search_fields: Vec<String>,
    #[serde(default = "default_operations")]
    pub operations: Vec<String>,
    #[serde(default)]
    pub on_missing_key: MissingKeyPolicy,
    #[serde(default)]
    pub validation: HashMap<String, ValidationRule>,
}

fn default_operations() -> Vec<String> {
    OPERATIONS.iter().map(|s| s.to_string()).collect()
}

/// All collections served by one process.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct InventoryConfig {
    pub collections: Vec<CollectionConfig>,
}
