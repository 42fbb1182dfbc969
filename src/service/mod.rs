//! RecordStore: generic CRUD over delimited files, with request validation and value coercion.

pub mod coerce;
mod store;
mod validation;
pub use store::{BulkOutcome, RecordStore, UpdateOutcome, ID_FIELD};
pub use validation::RequestValidator;
