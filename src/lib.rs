//! Stockroom: inventory collections stored as delimited files, served over REST.

pub mod case;
pub mod config;
pub mod error;
pub mod export;
pub mod handlers;
pub mod matcher;
pub mod query;
pub mod response;
pub mod routes;
pub mod service;
pub mod state;
pub mod table;
pub mod writer;

pub use config::{builtin, load_from_path, load_model, resolve, InventoryConfig, ResolvedCollection, ResolvedModel, Settings};
pub use error::{AppError, ConfigError, StoreError, StoreResult};
pub use export::{export_all, write_snapshots};
pub use query::{paginate, search, Page};
pub use response::{success_many, success_one};
pub use routes::{app, common_routes, entity_routes};
pub use service::{BulkOutcome, RecordStore, UpdateOutcome};
pub use state::AppState;
pub use table::Record;
