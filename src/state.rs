//! Shared application state for all routes. Stores are built once at startup.

use crate::config::ResolvedModel;
use crate::service::RecordStore;
use std::sync::Arc;

/// One engine per collection, in configuration order.
pub struct Collections {
    stores: Vec<Arc<RecordStore>>,
}

impl Collections {
    pub fn new(model: ResolvedModel) -> Self {
        Collections {
            stores: model.collections.into_iter().map(|c| Arc::new(RecordStore::new(c))).collect(),
        }
    }

    pub fn by_path(&self, segment: &str) -> Option<Arc<RecordStore>> {
        self.stores.iter().find(|s| s.collection().path_segment == segment).cloned()
    }

    pub fn iter(&self) -> impl Iterator<Item = &RecordStore> {
        self.stores.iter().map(|s| s.as_ref())
    }
}

#[derive(Clone)]
pub struct AppState {
    pub collections: Arc<Collections>,
}

impl AppState {
    pub fn new(model: ResolvedModel) -> Self {
        AppState {
            collections: Arc::new(Collections::new(model)),
        }
    }
}
