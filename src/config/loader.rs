//! Load collection config from the embedded defaults or a JSON file, and resolve it against a data directory.

use crate::config::resolved::{ColumnSpec, ResolvedCollection, ResolvedModel, Schema};
use crate::config::{validate, InventoryConfig, Settings};
use crate::error::ConfigError;
use std::path::Path;

const BUILTIN_COLLECTIONS: &str = include_str!("../../config/collections.json");

/// The inventory collections shipped with the crate.
pub fn builtin() -> Result<InventoryConfig, ConfigError> {
    serde_json::from_str(BUILTIN_COLLECTIONS).map_err(|e| ConfigError::Load(format!("built-in collections: {}", e)))
}

/// Load config from a JSON file shaped like `config/collections.json`.
pub fn load_from_path(path: &Path) -> Result<InventoryConfig, ConfigError> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| ConfigError::Load(format!("{}: {}", path.display(), e)))?;
    serde_json::from_str(&raw).map_err(|e| ConfigError::Load(format!("{}: {}", path.display(), e)))
}

/// Build resolved model from config; every backing file lives under `data_dir`.
pub fn resolve(config: &InventoryConfig, data_dir: &Path) -> Result<ResolvedModel, ConfigError> {
    validate(config)?;
    let collections = config
        .collections
        .iter()
        .map(|c| {
            let columns = c
                .columns
                .iter()
                .map(|col| ColumnSpec {
                    field: col.field.clone(),
                    header: col.header.clone(),
                    numeric: col.numeric,
                    default: col.default.clone(),
                    aliases: col.aliases.clone(),
                    retain: col.retain,
                })
                .collect();
            ResolvedCollection {
                name: c.name.clone(),
                path_segment: c.path_segment.clone(),
                path: data_dir.join(&c.file_name),
                schema: Schema {
                    primary_key: c.primary_key.clone(),
                    key_tokens: c.key_tokens.clone(),
                    columns,
                },
                operations: c.operations.iter().cloned().collect(),
                search_fields: c.search_fields.clone(),
                on_missing_key: c.on_missing_key,
                validation: c.validation.clone(),
            }
        })
        .collect();
    Ok(ResolvedModel { collections })
}

/// Config from `settings.config_path` (or the built-in collections), resolved against `settings.data_dir`.
pub fn load_model(settings: &Settings) -> Result<ResolvedModel, ConfigError> {
    let config = match &settings.config_path {
        Some(path) => {
            tracing::info!(path = %path.display(), "loading collections from file");
            load_from_path(path)?
        }
        None => builtin()?,
    };
    resolve(&config, &settings.data_dir)
}
