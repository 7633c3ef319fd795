//! Documents joined with their store-assigned identifier.

use serde::{Deserialize, Serialize};

use crate::identity::DocumentId;

/// A stored entity together with its identifier.
///
/// On the wire the identifier is flattened next to the entity's own fields
/// (`{"id": "...", ...fields}`), matching how documents are presented to
/// callers of the access layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WithId<T> {
    pub id: DocumentId,
    #[serde(flatten)]
    pub data: T,
}

impl<T> WithId<T> {
    pub fn new(id: DocumentId, data: T) -> Self {
        Self { id, data }
    }

    /// Drop the identifier, returning the entity.
    pub fn into_data(self) -> T {
        self.data
    }

    /// Map the entity while keeping the identifier.
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> WithId<U> {
        WithId {
            id: self.id,
            data: f(self.data),
        }
    }
}

impl<T> std::ops::Deref for WithId<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.data
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Note {
        title: String,
    }

    #[test]
    fn id_is_flattened_next_to_fields() {
        let doc = WithId::new(
            DocumentId::new("n1").unwrap(),
            Note {
                title: "hello".into(),
            },
        );
        let value = serde_json::to_value(&doc).unwrap();
        assert_eq!(value, json!({"id": "n1", "title": "hello"}));

        let back: WithId<Note> = serde_json::from_value(value).unwrap();
        assert_eq!(back, doc);
        assert_eq!(back.title, "hello");
    }
}
