//! # Typed collections
//!
//! [`Collection<T>`] maps entities to and from backend documents. Entities
//! are serialized with serde; the document id travels beside the body in
//! [`WithId<T>`] and is never written into the stored fields.

use std::marker::PhantomData;
use std::sync::Arc;

use crewdesk_core::{DocumentId, WithId};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};

use crate::backend::{ChangeKind, DocumentStore, RawDocument, RawSnapshot};
use crate::constraint::{filter, limit, Constraint, FilterOp, QueryPlan};
use crate::cursor::Cursor;
use crate::error::StoreError;
use crate::subscription::Subscription;

/// An entity with a home collection.
pub trait Entity: Serialize + DeserializeOwned + Send + Sync + 'static {
    const COLLECTION: &'static str;
}

/// One page of a paginated query.
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    pub items: Vec<WithId<T>>,
    /// Position after the last item. `None` when the page came back short,
    /// meaning there is nothing further.
    pub next_cursor: Option<Cursor>,
}

/// A typed change within a watched result.
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentChange<T> {
    pub kind: ChangeKind,
    pub doc: WithId<T>,
}

/// Typed handle onto one collection.
pub struct Collection<T> {
    store: Arc<dyn DocumentStore>,
    name: Arc<str>,
    _entity: PhantomData<fn() -> T>,
}

impl<T> Clone for Collection<T> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            name: Arc::clone(&self.name),
            _entity: PhantomData,
        }
    }
}

impl<T> Collection<T> {
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl<T> std::fmt::Debug for Collection<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Collection").field("name", &self.name).finish()
    }
}

pub(crate) fn encode<T: Serialize + ?Sized>(collection: &str, data: &T) -> Result<Map<String, Value>, StoreError> {
    match serde_json::to_value(data) {
        Ok(Value::Object(fields)) => Ok(fields),
        Ok(_) => Err(StoreError::NotAnObject {
            collection: collection.to_string(),
        }),
        Err(source) => Err(StoreError::Serialization {
            collection: collection.to_string(),
            source,
        }),
    }
}

fn decode<T: DeserializeOwned>(collection: &str, doc: RawDocument) -> Result<WithId<T>, StoreError> {
    let data = serde_json::from_value(Value::Object(doc.fields)).map_err(|source| {
        StoreError::Serialization {
            collection: collection.to_string(),
            source,
        }
    })?;
    Ok(WithId::new(doc.id, data))
}

fn decode_all<T: DeserializeOwned>(
    collection: &str,
    docs: Vec<RawDocument>,
) -> Result<Vec<WithId<T>>, StoreError> {
    docs.into_iter().map(|d| decode(collection, d)).collect()
}

impl<T> Collection<T>
where
    T: Serialize + DeserializeOwned + Send + Sync + 'static,
{
    pub(crate) fn new(store: Arc<dyn DocumentStore>, name: &str) -> Self {
        Self {
            store,
            name: Arc::from(name),
            _entity: PhantomData,
        }
    }

    /// Store `data` under a fresh id.
    pub async fn create(&self, data: &T) -> Result<DocumentId, StoreError> {
        let fields = encode(&self.name, data)?;
        let id = self.store.add(&self.name, fields).await?;
        tracing::debug!(collection = %self.name, %id, "document created");
        Ok(id)
    }

    /// Create or fully replace the document `id`.
    pub async fn set_with_id(&self, id: &DocumentId, data: &T) -> Result<(), StoreError> {
        let fields = encode(&self.name, data)?;
        self.store.set(&self.name, id, fields).await
    }

    pub async fn get_one(&self, id: &DocumentId) -> Result<Option<WithId<T>>, StoreError> {
        self.store
            .get(&self.name, id)
            .await?
            .map(|doc| decode(&self.name, doc))
            .transpose()
    }

    pub async fn exists(&self, id: &DocumentId) -> Result<bool, StoreError> {
        Ok(self.store.get(&self.name, id).await?.is_some())
    }

    /// Every document, in natural order.
    pub async fn get_all(&self) -> Result<Vec<WithId<T>>, StoreError> {
        self.query(&[]).await
    }

    pub async fn get_all_by_field(
        &self,
        field: &str,
        value: impl Into<Value>,
    ) -> Result<Vec<WithId<T>>, StoreError> {
        self.query(&[filter(field, FilterOp::Eq, value)]).await
    }

    /// First document, in natural order, whose `field` equals `value`.
    pub async fn get_one_by_field(
        &self,
        field: &str,
        value: impl Into<Value>,
    ) -> Result<Option<WithId<T>>, StoreError> {
        let mut found = self
            .query(&[filter(field, FilterOp::Eq, value), limit(1)])
            .await?;
        Ok(found.pop())
    }

    pub async fn query(&self, constraints: &[Constraint]) -> Result<Vec<WithId<T>>, StoreError> {
        let docs = self.store.query(&self.name, constraints).await?;
        decode_all(&self.name, docs)
    }

    /// Merge the fields `patch` serializes to into document `id`.
    ///
    /// Fields absent from the serialized patch are left untouched; keys may
    /// be dotted paths into nested objects. Fails with
    /// [`StoreError::NotFound`] when the document does not exist.
    pub async fn update<P: Serialize + ?Sized>(
        &self,
        id: &DocumentId,
        patch: &P,
    ) -> Result<(), StoreError> {
        let fields = encode(&self.name, patch)?;
        self.store.update(&self.name, id, fields).await
    }

    /// Remove document `id`. Deleting an absent document succeeds.
    pub async fn delete(&self, id: &DocumentId) -> Result<(), StoreError> {
        self.store.delete(&self.name, id).await
    }

    /// `page_size` documents after `cursor` (from the start when `None`),
    /// under the ordering given by `constraints`.
    pub async fn query_with_pagination(
        &self,
        constraints: &[Constraint],
        page_size: usize,
        cursor: Option<&Cursor>,
    ) -> Result<Page<T>, StoreError> {
        let mut full: Vec<Constraint> = constraints.to_vec();
        full.push(limit(page_size));
        if let Some(cursor) = cursor {
            full.push(Constraint::StartAfter(cursor.clone()));
        }
        let plan = QueryPlan::compile(&self.name, &full)?;
        let docs = self.store.query(&self.name, &full).await?;
        let next_cursor = match docs.last() {
            Some(last) if docs.len() == page_size => Some(plan.cursor_after(last)),
            _ => None,
        };
        Ok(Page {
            items: decode_all(&self.name, docs)?,
            next_cursor,
        })
    }

    /// Live view of the documents matching `constraints`.
    pub fn subscribe_all(
        &self,
        constraints: &[Constraint],
    ) -> Result<Subscription<Vec<WithId<T>>>, StoreError> {
        let listener = self.store.listen(&self.name, constraints)?;
        let name = Arc::clone(&self.name);
        Ok(Subscription::new(listener, move |snapshot: RawSnapshot| {
            decode_all(&name, snapshot.docs)
        }))
    }

    /// Live view of one document; `None` while it does not exist.
    pub fn subscribe_one(&self, id: &DocumentId) -> Result<Subscription<Option<WithId<T>>>, StoreError> {
        let listener = self.store.listen_document(&self.name, id)?;
        let name = Arc::clone(&self.name);
        Ok(Subscription::new(listener, move |snapshot: RawSnapshot| {
            snapshot
                .docs
                .into_iter()
                .next()
                .map(|doc| decode(&name, doc))
                .transpose()
        }))
    }

    /// Live stream of added, modified and removed documents.
    pub fn subscribe_changes(
        &self,
        constraints: &[Constraint],
    ) -> Result<Subscription<Vec<DocumentChange<T>>>, StoreError> {
        let listener = self.store.listen(&self.name, constraints)?;
        let name = Arc::clone(&self.name);
        Ok(Subscription::new(listener, move |snapshot: RawSnapshot| {
            snapshot
                .changes
                .into_iter()
                .map(|change| {
                    Ok(DocumentChange {
                        kind: change.kind,
                        doc: decode(&name, change.doc)?,
                    })
                })
                .collect()
        }))
    }
}
