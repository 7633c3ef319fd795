//! Database handle shared across the application.

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::backend::{DocumentStore, WriteOp};
use crate::batch::WriteBatch;
use crate::collection::{Collection, Entity};
use crate::error::StoreError;
use crate::memory::MemoryStore;

/// Entry point to the document store. Cheap to clone.
#[derive(Clone)]
pub struct DocumentDb {
    store: Arc<dyn DocumentStore>,
}

impl std::fmt::Debug for DocumentDb {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DocumentDb").finish_non_exhaustive()
    }
}

impl DocumentDb {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    /// Database over a fresh [`MemoryStore`].
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryStore::new()))
    }

    pub fn store(&self) -> &Arc<dyn DocumentStore> {
        &self.store
    }

    pub fn collection<T>(&self, name: &str) -> Collection<T>
    where
        T: Serialize + DeserializeOwned + Send + Sync + 'static,
    {
        Collection::new(Arc::clone(&self.store), name)
    }

    /// Collection at the entity's home name.
    pub fn collection_for<T: Entity>(&self) -> Collection<T> {
        self.collection(T::COLLECTION)
    }

    /// Apply untyped writes atomically.
    pub async fn batch(&self, ops: Vec<WriteOp>) -> Result<(), StoreError> {
        if ops.is_empty() {
            return Ok(());
        }
        let count = ops.len();
        self.store.commit(ops).await?;
        tracing::debug!(writes = count, "batch committed");
        Ok(())
    }

    pub async fn commit(&self, batch: WriteBatch) -> Result<(), StoreError> {
        self.batch(batch.into_ops()).await
    }
}
