//! # Backend seam
//!
//! Untyped document storage. Documents are JSON objects keyed by
//! `(collection, id)`; the id is never part of the stored fields.
//!
//! Implementations must deliver listener snapshots in mutation order and
//! must stop delivering once the listener is detached.

use async_trait::async_trait;
use crewdesk_core::DocumentId;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tokio::sync::mpsc;

use crate::constraint::Constraint;
use crate::error::StoreError;

/// A stored document: its id and its fields.
#[derive(Debug, Clone, PartialEq)]
pub struct RawDocument {
    pub id: DocumentId,
    pub fields: Map<String, Value>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeKind {
    Added,
    Modified,
    Removed,
}

/// One document entering, changing within, or leaving a result set.
#[derive(Debug, Clone, PartialEq)]
pub struct RawChange {
    pub kind: ChangeKind,
    /// The document after the change; for removals, the last version seen.
    pub doc: RawDocument,
}

/// The full result of a watched query plus what changed since the previous
/// snapshot. The first snapshot reports every document as added.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RawSnapshot {
    pub docs: Vec<RawDocument>,
    pub changes: Vec<RawChange>,
}

/// A single write in an atomic batch.
#[derive(Debug, Clone, PartialEq)]
pub enum WriteOp {
    /// Create or fully replace.
    Set {
        collection: String,
        id: DocumentId,
        fields: Map<String, Value>,
    },
    /// Merge fields into an existing document. Keys may be dotted paths.
    Update {
        collection: String,
        id: DocumentId,
        fields: Map<String, Value>,
    },
    /// Remove; absent documents are ignored.
    Delete { collection: String, id: DocumentId },
}

impl WriteOp {
    pub fn collection(&self) -> &str {
        match self {
            Self::Set { collection, .. }
            | Self::Update { collection, .. }
            | Self::Delete { collection, .. } => collection,
        }
    }

    pub fn id(&self) -> &DocumentId {
        match self {
            Self::Set { id, .. } | Self::Update { id, .. } | Self::Delete { id, .. } => id,
        }
    }
}

pub type SnapshotEvent = Result<RawSnapshot, StoreError>;

/// A live registration with a backend.
///
/// `detach` unregisters it; it is called at most once by the owning
/// subscription.
pub struct Listener {
    pub(crate) events: mpsc::UnboundedReceiver<SnapshotEvent>,
    pub(crate) detach: Box<dyn FnOnce() + Send>,
}

impl Listener {
    pub fn new(
        events: mpsc::UnboundedReceiver<SnapshotEvent>,
        detach: impl FnOnce() + Send + 'static,
    ) -> Self {
        Self {
            events,
            detach: Box::new(detach),
        }
    }
}

impl std::fmt::Debug for Listener {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Listener").finish_non_exhaustive()
    }
}

/// Document database backend.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Store `fields` under a fresh id and return it.
    async fn add(&self, collection: &str, fields: Map<String, Value>)
        -> Result<DocumentId, StoreError>;

    async fn set(
        &self,
        collection: &str,
        id: &DocumentId,
        fields: Map<String, Value>,
    ) -> Result<(), StoreError>;

    async fn get(&self, collection: &str, id: &DocumentId)
        -> Result<Option<RawDocument>, StoreError>;

    /// Fails with [`StoreError::NotFound`] if the document does not exist.
    async fn update(
        &self,
        collection: &str,
        id: &DocumentId,
        fields: Map<String, Value>,
    ) -> Result<(), StoreError>;

    async fn delete(&self, collection: &str, id: &DocumentId) -> Result<(), StoreError>;

    async fn query(
        &self,
        collection: &str,
        constraints: &[Constraint],
    ) -> Result<Vec<RawDocument>, StoreError>;

    /// Apply every operation, or none.
    async fn commit(&self, ops: Vec<WriteOp>) -> Result<(), StoreError>;

    /// Watch a query. The current result is delivered first.
    fn listen(&self, collection: &str, constraints: &[Constraint]) -> Result<Listener, StoreError>;

    /// Watch one document. Snapshots hold zero or one document.
    fn listen_document(&self, collection: &str, id: &DocumentId) -> Result<Listener, StoreError>;
}
