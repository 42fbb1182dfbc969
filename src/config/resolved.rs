//! Resolved collection model: config validated and flattened for runtime use.

use crate::case::{canonical_field_name, looks_camel_case, to_snake_case};
use crate::config::{MissingKeyPolicy, ValidationRule};
use std::collections::{HashMap, HashSet};
use std::path::PathBuf;

#[derive(Clone, Debug)]
pub struct ColumnSpec {
    pub field: String,
    pub header: String,
    pub numeric: bool,
    pub default: Option<serde_json::Value>,
    pub aliases: Vec<String>,
    pub retain: bool,
}

/// Column layout of one collection: declared columns in original file order plus key rules.
#[derive(Clone, Debug)]
pub struct Schema {
    pub primary_key: String,
    pub key_tokens: Vec<String>,
    pub columns: Vec<ColumnSpec>,
}

impl Schema {
    pub fn column(&self, field: &str) -> Option<&ColumnSpec> {
        self.columns.iter().find(|c| c.field == field)
    }

    pub fn is_numeric(&self, field: &str) -> bool {
        self.column(field).map(|c| c.numeric).unwrap_or(false)
    }

    /// Header used when the file does not already name this field.
    pub fn header_for(&self, field: &str) -> Option<&str> {
        self.column(field).map(|c| c.header.as_str())
    }

    pub fn key_header(&self) -> &str {
        self.header_for(&self.primary_key).unwrap_or(&self.primary_key)
    }

    /// Map a canonical name onto a declared field, directly or through its aliases.
    pub fn declared_field(&self, canonical: &str) -> Option<&str> {
        if let Some(c) = self.column(canonical) {
            return Some(c.field.as_str());
        }
        self.columns
            .iter()
            .find(|c| c.aliases.iter().any(|a| a == canonical))
            .map(|c| c.field.as_str())
    }

    /// Resolve a request key ("Part Name", "part_name", "partName", "tools_name") to a declared field.
    pub fn resolve_request_key(&self, key: &str) -> Option<String> {
        let canonical = canonical_field_name(key);
        if let Some(f) = self.declared_field(&canonical) {
            return Some(f.to_string());
        }
        if looks_camel_case(key.trim()) {
            let snake = canonical_field_name(&to_snake_case(key.trim()));
            if let Some(f) = self.declared_field(&snake) {
                return Some(f.to_string());
            }
        }
        None
    }
}

#[derive(Clone, Debug)]
pub struct ResolvedCollection {
    pub name: String,
    pub path_segment: String,
    /// Backing file: data dir joined with the configured file name.
    pub path: PathBuf,
    pub schema: Schema,
    pub operations: HashSet<String>,
    pub search_fields: Vec<String>,
    pub on_missing_key: MissingKeyPolicy,
    pub validation: HashMap<String, ValidationRule>,
}

impl ResolvedCollection {
    pub fn allows(&self, operation: &str) -> bool {
        self.operations.contains(operation)
    }
}

#[derive(Clone, Debug)]
pub struct ResolvedModel {
    pub collections: Vec<ResolvedCollection>,
}

impl ResolvedModel {
    pub fn collection_by_path(&self, path: &str) -> Option<&ResolvedCollection> {
        self.collections.iter().find(|c| c.path_segment == path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn schema() -> Schema {
        Schema {
            primary_key: "part_name".into(),
            key_tokens: vec!["part".into(), "name".into()],
            columns: vec![
                ColumnSpec {
                    field: "part_name".into(),
                    header: "Part Name".into(),
                    numeric: false,
                    default: None,
                    aliases: vec!["tools_name".into()],
                    retain: false,
                },
                ColumnSpec {
                    field: "total".into(),
                    header: "Total".into(),
                    numeric: true,
                    default: None,
                    aliases: vec!["current_stock".into()],
                    retain: false,
                },
            ],
        }
    }

    #[test]
    fn request_keys_resolve_through_every_spelling() {
        let s = schema();
        assert_eq!(s.resolve_request_key("Part Name").as_deref(), Some("part_name"));
        assert_eq!(s.resolve_request_key("part_name").as_deref(), Some("part_name"));
        assert_eq!(s.resolve_request_key("tools_name").as_deref(), Some("part_name"));
        assert_eq!(s.resolve_request_key("TOOLS NAME").as_deref(), Some("part_name"));
        assert_eq!(s.resolve_request_key("currentStock").as_deref(), Some("total"));
        assert_eq!(s.resolve_request_key("colour"), None);
    }

    #[test]
    fn numeric_and_headers() {
        let s = schema();
        assert!(s.is_numeric("total"));
        assert!(!s.is_numeric("part_name"));
        assert_eq!(s.key_header(), "Part Name");
    }
}
