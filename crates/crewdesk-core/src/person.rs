//! Personal-data records.
//!
//! Contact details live in a separate backend (kept apart from the
//! document store for personal-data compliance). Records are keyed by
//! `person_id`, which is the identity provider's uid of the person.

use serde::{Deserialize, Serialize};

/// A personal-data record as returned by the persons backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Person {
    /// Backend row id. Absent on records that have not been created yet.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    #[serde(rename = "personId")]
    pub person_id: String,
    pub full_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub telegram: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub whatsapp: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vk: Option<String>,
}

impl Person {
    pub fn new(person_id: impl Into<String>, full_name: impl Into<String>) -> Self {
        Self {
            id: None,
            person_id: person_id.into(),
            full_name: full_name.into(),
            email: None,
            phone: None,
            telegram: None,
            whatsapp: None,
            vk: None,
        }
    }

    /// Apply a patch in place. Fields absent from the patch are untouched.
    pub fn apply(&mut self, patch: &PersonPatch) {
        if let Some(v) = &patch.full_name {
            self.full_name = v.clone();
        }
        if let Some(v) = &patch.email {
            self.email = Some(v.clone());
        }
        if let Some(v) = &patch.phone {
            self.phone = Some(v.clone());
        }
        if let Some(v) = &patch.telegram {
            self.telegram = Some(v.clone());
        }
        if let Some(v) = &patch.whatsapp {
            self.whatsapp = Some(v.clone());
        }
        if let Some(v) = &patch.vk {
            self.vk = Some(v.clone());
        }
    }
}

/// Partial update for a [`Person`]. Only `Some` fields are sent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersonPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub telegram: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub whatsapp: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vk: Option<String>,
}

impl PersonPatch {
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }
}
