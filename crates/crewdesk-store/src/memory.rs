//! In-process document store.
//!
//! All state sits behind one mutex: every write, including a whole batch,
//! is applied and fanned out to listeners under the same lock, so each
//! listener observes mutations in the order they were committed.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use crewdesk_core::DocumentId;
use parking_lot::Mutex;
use serde_json::{Map, Value};
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::backend::{
    ChangeKind, DocumentStore, Listener, RawChange, RawDocument, RawSnapshot, SnapshotEvent,
    WriteOp,
};
use crate::constraint::{Constraint, QueryPlan};
use crate::error::StoreError;
use crate::value;

/// Maximum number of writes accepted in one batch.
pub const MAX_BATCH_WRITES: usize = 500;

type Documents = BTreeMap<DocumentId, Map<String, Value>>;

enum Target {
    Query(QueryPlan),
    Document(DocumentId),
}

struct Watcher {
    collection: String,
    target: Target,
    last: Vec<RawDocument>,
    tx: mpsc::UnboundedSender<SnapshotEvent>,
}

#[derive(Default)]
struct Inner {
    collections: HashMap<String, Documents>,
    watchers: BTreeMap<u64, Watcher>,
    next_watcher: u64,
    unavailable: bool,
}

impl Inner {
    fn ensure_available(&self) -> Result<(), StoreError> {
        if self.unavailable {
            return Err(StoreError::Unavailable {
                reason: "in-memory store switched off".into(),
            });
        }
        Ok(())
    }

    fn notify(&mut self, touched: &HashSet<String>) {
        let mut watchers = std::mem::take(&mut self.watchers);
        watchers.retain(|id, watcher| {
            if !touched.contains(&watcher.collection) {
                return true;
            }
            let next = evaluate(&self.collections, &watcher.collection, &watcher.target);
            let changes = diff(&watcher.last, &next);
            if changes.is_empty() {
                return true;
            }
            watcher.last = next.clone();
            let delivered = watcher
                .tx
                .send(Ok(RawSnapshot {
                    docs: next,
                    changes,
                }))
                .is_ok();
            if !delivered {
                tracing::debug!(listener = id, collection = %watcher.collection, "dropping closed listener");
            }
            delivered
        });
        self.watchers = watchers;
    }
}

fn raw(id: &DocumentId, fields: &Map<String, Value>) -> RawDocument {
    RawDocument {
        id: id.clone(),
        fields: fields.clone(),
    }
}

fn evaluate(
    collections: &HashMap<String, Documents>,
    collection: &str,
    target: &Target,
) -> Vec<RawDocument> {
    let Some(docs) = collections.get(collection) else {
        return Vec::new();
    };
    match target {
        Target::Query(plan) => plan.apply(docs.iter().map(|(id, f)| raw(id, f))),
        Target::Document(id) => docs.get(id).map(|f| raw(id, f)).into_iter().collect(),
    }
}

fn diff(prev: &[RawDocument], next: &[RawDocument]) -> Vec<RawChange> {
    let before: HashMap<&DocumentId, &RawDocument> = prev.iter().map(|d| (&d.id, d)).collect();
    let after: HashSet<&DocumentId> = next.iter().map(|d| &d.id).collect();
    let mut changes: Vec<RawChange> = prev
        .iter()
        .filter(|d| !after.contains(&d.id))
        .map(|d| RawChange {
            kind: ChangeKind::Removed,
            doc: d.clone(),
        })
        .collect();
    for doc in next {
        let kind = match before.get(&doc.id) {
            None => ChangeKind::Added,
            Some(old) if old.fields != doc.fields => ChangeKind::Modified,
            Some(_) => continue,
        };
        changes.push(RawChange {
            kind,
            doc: doc.clone(),
        });
    }
    changes
}

/// Document store held entirely in memory. Clones share the same data.
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<Inner>>,
}

impl std::fmt::Debug for MemoryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.lock();
        f.debug_struct("MemoryStore")
            .field("collections", &inner.collections.len())
            .field("listeners", &inner.watchers.len())
            .finish()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulate an outage: every operation fails with `Unavailable`.
    pub fn set_available(&self, available: bool) {
        self.inner.lock().unavailable = !available;
    }

    /// Number of registered listeners.
    pub fn listener_count(&self) -> usize {
        self.inner.lock().watchers.len()
    }

    /// Number of documents in `collection`.
    pub fn document_count(&self, collection: &str) -> usize {
        self.inner
            .lock()
            .collections
            .get(collection)
            .map_or(0, BTreeMap::len)
    }

    fn apply(&self, ops: Vec<WriteOp>) -> Result<(), StoreError> {
        if ops.len() > MAX_BATCH_WRITES {
            return Err(StoreError::BatchRejected(format!(
                "{} writes exceed the limit of {MAX_BATCH_WRITES}",
                ops.len()
            )));
        }
        let mut inner = self.inner.lock();
        inner.ensure_available()?;

        let mut staged: HashMap<String, Documents> = HashMap::new();
        for op in &ops {
            let docs = staged
                .entry(op.collection().to_string())
                .or_insert_with(|| {
                    inner
                        .collections
                        .get(op.collection())
                        .cloned()
                        .unwrap_or_default()
                });
            match op {
                WriteOp::Set { id, fields, .. } => {
                    docs.insert(id.clone(), fields.clone());
                }
                WriteOp::Update {
                    collection,
                    id,
                    fields,
                } => {
                    let current = docs.get_mut(id).ok_or_else(|| StoreError::NotFound {
                        collection: collection.clone(),
                        id: id.to_string(),
                    })?;
                    for (path, value) in fields {
                        value::set_path(current, path, value.clone());
                    }
                }
                WriteOp::Delete { id, .. } => {
                    docs.remove(id);
                }
            }
        }

        let touched: HashSet<String> = staged.keys().cloned().collect();
        inner.collections.extend(staged);
        tracing::debug!(writes = ops.len(), collections = touched.len(), "committed writes");
        inner.notify(&touched);
        Ok(())
    }

    fn register(&self, collection: &str, target: Target) -> Result<Listener, StoreError> {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut inner = self.inner.lock();
        inner.ensure_available()?;

        let docs = evaluate(&inner.collections, collection, &target);
        let changes = docs
            .iter()
            .map(|d| RawChange {
                kind: ChangeKind::Added,
                doc: d.clone(),
            })
            .collect();
        // The receiver is still held here, so the initial send cannot fail.
        let _ = tx.send(Ok(RawSnapshot {
            docs: docs.clone(),
            changes,
        }));

        let id = inner.next_watcher;
        inner.next_watcher += 1;
        inner.watchers.insert(
            id,
            Watcher {
                collection: collection.to_string(),
                target,
                last: docs,
                tx,
            },
        );
        tracing::trace!(listener = id, collection, "listener registered");

        let weak = Arc::downgrade(&self.inner);
        Ok(Listener::new(rx, move || {
            if let Some(inner) = weak.upgrade() {
                inner.lock().watchers.remove(&id);
                tracing::trace!(listener = id, "listener detached");
            }
        }))
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn add(
        &self,
        collection: &str,
        fields: Map<String, Value>,
    ) -> Result<DocumentId, StoreError> {
        let id = DocumentId::new(Uuid::new_v4().simple().to_string())?;
        self.apply(vec![WriteOp::Set {
            collection: collection.to_string(),
            id: id.clone(),
            fields,
        }])?;
        Ok(id)
    }

    async fn set(
        &self,
        collection: &str,
        id: &DocumentId,
        fields: Map<String, Value>,
    ) -> Result<(), StoreError> {
        self.apply(vec![WriteOp::Set {
            collection: collection.to_string(),
            id: id.clone(),
            fields,
        }])
    }

    async fn get(
        &self,
        collection: &str,
        id: &DocumentId,
    ) -> Result<Option<RawDocument>, StoreError> {
        let inner = self.inner.lock();
        inner.ensure_available()?;
        Ok(inner
            .collections
            .get(collection)
            .and_then(|docs| docs.get(id))
            .map(|fields| raw(id, fields)))
    }

    async fn update(
        &self,
        collection: &str,
        id: &DocumentId,
        fields: Map<String, Value>,
    ) -> Result<(), StoreError> {
        self.apply(vec![WriteOp::Update {
            collection: collection.to_string(),
            id: id.clone(),
            fields,
        }])
    }

    async fn delete(&self, collection: &str, id: &DocumentId) -> Result<(), StoreError> {
        self.apply(vec![WriteOp::Delete {
            collection: collection.to_string(),
            id: id.clone(),
        }])
    }

    async fn query(
        &self,
        collection: &str,
        constraints: &[Constraint],
    ) -> Result<Vec<RawDocument>, StoreError> {
        let plan = QueryPlan::compile(collection, constraints)?;
        let inner = self.inner.lock();
        inner.ensure_available()?;
        Ok(evaluate(&inner.collections, collection, &Target::Query(plan)))
    }

    async fn commit(&self, ops: Vec<WriteOp>) -> Result<(), StoreError> {
        self.apply(ops)
    }

    fn listen(&self, collection: &str, constraints: &[Constraint]) -> Result<Listener, StoreError> {
        let plan = QueryPlan::compile(collection, constraints)?;
        self.register(collection, Target::Query(plan))
    }

    fn listen_document(&self, collection: &str, id: &DocumentId) -> Result<Listener, StoreError> {
        self.register(collection, Target::Document(id.clone()))
    }
}
