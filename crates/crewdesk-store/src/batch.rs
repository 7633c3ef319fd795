//! Typed builder for atomic multi-document writes.

use crewdesk_core::DocumentId;
use serde::Serialize;

use crate::backend::WriteOp;
use crate::collection::{encode, Collection};
use crate::error::StoreError;

/// Writes committed together by [`DocumentDb::commit`](crate::DocumentDb::commit).
///
/// Entities are serialized when queued, so a serialization failure is
/// reported before anything is sent to the store.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WriteBatch {
    ops: Vec<WriteOp>,
}

impl WriteBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set<T: Serialize>(
        &mut self,
        collection: &Collection<T>,
        id: &DocumentId,
        data: &T,
    ) -> Result<&mut Self, StoreError> {
        self.ops.push(WriteOp::Set {
            collection: collection.name().to_string(),
            id: id.clone(),
            fields: encode(collection.name(), data)?,
        });
        Ok(self)
    }

    pub fn update<T, P: Serialize + ?Sized>(
        &mut self,
        collection: &Collection<T>,
        id: &DocumentId,
        patch: &P,
    ) -> Result<&mut Self, StoreError> {
        self.ops.push(WriteOp::Update {
            collection: collection.name().to_string(),
            id: id.clone(),
            fields: encode(collection.name(), patch)?,
        });
        Ok(self)
    }

    pub fn delete<T>(&mut self, collection: &Collection<T>, id: &DocumentId) -> &mut Self {
        self.ops.push(WriteOp::Delete {
            collection: collection.name().to_string(),
            id: id.clone(),
        });
        self
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    pub fn into_ops(self) -> Vec<WriteOp> {
        self.ops
    }
}

impl From<Vec<WriteOp>> for WriteBatch {
    fn from(ops: Vec<WriteOp>) -> Self {
        Self { ops }
    }
}
