//! Config validation: key/column consistency and route uniqueness.

use crate::case::canonical_field_name;
use crate::config::{InventoryConfig, OPERATIONS};
use crate::error::ConfigError;
use std::collections::HashSet;

pub fn validate(config: &InventoryConfig) -> Result<(), ConfigError> {
    let mut path_segments = HashSet::new();
    let mut file_names = HashSet::new();
    for c in &config.collections {
        if !path_segments.insert(c.path_segment.as_str()) {
            return Err(ConfigError::DuplicatePathSegment(c.path_segment.clone()));
        }
        if c.file_name.trim().is_empty() {
            return Err(ConfigError::InvalidColumn {
                collection: c.name.clone(),
                message: "file_name must not be empty".into(),
            });
        }
        // Two stores on one file would overwrite each other.
        if !file_names.insert(c.file_name.trim()) {
            return Err(ConfigError::DuplicateFileName(c.file_name.clone()));
        }

        let mut fields = HashSet::new();
        let mut headers = HashSet::new();
        for col in &c.columns {
            if col.field != canonical_field_name(&col.field) || col.field.is_empty() {
                return Err(ConfigError::InvalidColumn {
                    collection: c.name.clone(),
                    message: format!("field '{}' is not a canonical name", col.field),
                });
            }
            if col.header.trim().is_empty() {
                return Err(ConfigError::InvalidColumn {
                    collection: c.name.clone(),
                    message: format!("field '{}' has no header", col.field),
                });
            }
            if !fields.insert(col.field.as_str()) {
                return Err(ConfigError::InvalidColumn {
                    collection: c.name.clone(),
                    message: format!("field '{}' declared twice", col.field),
                });
            }
            if !headers.insert(col.header.as_str()) {
                return Err(ConfigError::InvalidColumn {
                    collection: c.name.clone(),
                    message: format!("header '{}' declared twice", col.header),
                });
            }
        }

        if !fields.contains(c.primary_key.as_str()) {
            return Err(ConfigError::InvalidPrimaryKey {
                collection: c.name.clone(),
                column: c.primary_key.clone(),
            });
        }

        for field in c.search_fields.iter().chain(c.validation.keys()) {
            if !fields.contains(field.as_str()) {
                return Err(ConfigError::InvalidColumn {
                    collection: c.name.clone(),
                    message: format!("'{}' is not a declared column", field),
                });
            }
        }

        for op in &c.operations {
            if !OPERATIONS.contains(&op.as_str()) {
                return Err(ConfigError::UnknownOperation {
                    collection: c.name.clone(),
                    operation: op.clone(),
                });
            }
        }
    }
    Ok(())
}
