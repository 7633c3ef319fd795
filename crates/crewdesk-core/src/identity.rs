//! # Identity Newtypes
//!
//! Each identifier is a distinct type. You cannot pass an [`AuthUid`] where
//! a [`DocumentId`] is expected, even though both are strings on the wire.
//!
//! Both types validate at construction time and route deserialization
//! through the same constructor, so a malformed identifier never enters the
//! system from a backend response either.

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Implement `Deserialize` for string newtypes by routing through `new()`.
macro_rules! impl_validating_deserialize {
    ($ty:ident) => {
        impl<'de> Deserialize<'de> for $ty {
            fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
            where
                D: serde::Deserializer<'de>,
            {
                let raw = String::deserialize(deserializer)?;
                Self::new(raw).map_err(serde::de::Error::custom)
            }
        }
    };
}

/// Identifier of a document inside a collection of the document store.
///
/// Assigned once, at creation (either by the store or by the caller through
/// `set_with_id`), and never changes afterwards. The derived `Ord` is the
/// store's natural ordering.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct DocumentId(String);

impl_validating_deserialize!(DocumentId);

impl DocumentId {
    /// Create a document identifier.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::InvalidDocumentId`] when the value is empty
    /// or contains a path separator.
    pub fn new(value: impl Into<String>) -> Result<Self, ValidationError> {
        let s = value.into();
        if s.is_empty() || s.contains('/') {
            return Err(ValidationError::InvalidDocumentId(s));
        }
        Ok(Self(s))
    }

    /// Access the identifier string.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consume the identifier, returning the inner string.
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl std::fmt::Display for DocumentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for DocumentId {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl AsRef<str> for DocumentId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// User identifier issued by the identity provider (the provider's `uid`,
/// called `localId` by the personal-data backend).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct AuthUid(String);

impl_validating_deserialize!(AuthUid);

impl AuthUid {
    /// Create a provider user id.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::InvalidAuthUid`] when the value is empty
    /// or whitespace only.
    pub fn new(value: impl Into<String>) -> Result<Self, ValidationError> {
        let s = value.into();
        if s.trim().is_empty() {
            return Err(ValidationError::InvalidAuthUid(s));
        }
        Ok(Self(s))
    }

    /// Access the uid string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for AuthUid {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for AuthUid {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}
