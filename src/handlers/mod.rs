//! HTTP handlers for collection CRUD and export.

pub mod entity;
pub mod export;
pub use entity::*;
pub use export::*;
