//! Opaque pagination cursors.
//!
//! A cursor records the sort-key values and id of the last document of a
//! page. It is only meaningful for the ordering it was produced under;
//! presenting it to a query with a different number of sort keys is
//! rejected.

use std::fmt;
use std::str::FromStr;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use crewdesk_core::DocumentId;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

use crate::error::StoreError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct CursorBody {
    #[serde(rename = "v")]
    values: Vec<Value>,
    id: DocumentId,
}

/// Position just after a document in a fixed ordering.
#[derive(Debug, Clone, PartialEq)]
pub struct Cursor {
    body: CursorBody,
}

impl Cursor {
    pub fn new(values: Vec<Value>, id: DocumentId) -> Self {
        Self {
            body: CursorBody { values, id },
        }
    }

    /// Sort-key values of the document, one per explicit ordering.
    pub fn values(&self) -> &[Value] {
        &self.body.values
    }

    pub fn id(&self) -> &DocumentId {
        &self.body.id
    }

    /// URL-safe token form.
    pub fn encode(&self) -> String {
        // Serializing a Vec<Value> and a string cannot fail.
        let json = serde_json::to_vec(&self.body).unwrap_or_default();
        URL_SAFE_NO_PAD.encode(json)
    }

    pub fn decode(token: &str) -> Result<Self, StoreError> {
        let bytes = URL_SAFE_NO_PAD
            .decode(token.trim())
            .map_err(|e| StoreError::InvalidCursor(format!("not base64url: {e}")))?;
        let body: CursorBody = serde_json::from_slice(&bytes)
            .map_err(|e| StoreError::InvalidCursor(format!("unreadable payload: {e}")))?;
        Ok(Self { body })
    }
}

impl fmt::Display for Cursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.encode())
    }
}

impl FromStr for Cursor {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::decode(s)
    }
}

impl Serialize for Cursor {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.encode())
    }
}

impl<'de> Deserialize<'de> for Cursor {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let token = String::deserialize(deserializer)?;
        Self::decode(&token).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn token_decodes_to_the_same_position() {
        let cursor = Cursor::new(vec![json!("2024-05-01"), json!(3)], DocumentId::new("o-7").unwrap());
        let token = cursor.to_string();
        assert!(!token.contains('='));
        assert!(!token.contains('/'));
        assert_eq!(token.parse::<Cursor>().unwrap(), cursor);
    }

    #[test]
    fn garbage_tokens_are_rejected() {
        let empty_id = URL_SAFE_NO_PAD.encode(br#"{"v":[],"id":""}"#);
        for token in ["***", "e30", empty_id.as_str()] {
            assert!(matches!(
                Cursor::decode(token),
                Err(StoreError::InvalidCursor(_))
            ), "{token}");
        }
    }

    #[test]
    fn serde_uses_the_token_form() {
        let cursor = Cursor::new(vec![], DocumentId::new("a").unwrap());
        let json = serde_json::to_value(&cursor).unwrap();
        assert_eq!(json, Value::String(cursor.encode()));
        let back: Cursor = serde_json::from_value(json).unwrap();
        assert_eq!(back, cursor);
    }
}
