//! The joined view of one signed-in user.
//!
//! A profile is assembled from three owners:
//!
//! | Part | Owner |
//! |------|-------|
//! | [`AuthInfo`] | identity provider |
//! | [`Person`] | personal-data backend |
//! | [`EmployeeRecord`] | document store (`employees`) |
//!
//! Only the auth part is mandatory. The other two resolve independently and
//! stay `None` when their lookup fails.

use serde::{Deserialize, Serialize};

use crate::document::WithId;
use crate::employee::{AccessLevel, Employee};
use crate::identity::AuthUid;
use crate::person::Person;

/// Authentication facts issued by the identity provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthInfo {
    pub email: Option<String>,
    pub local_id: AuthUid,
}

/// An employee document with its id.
pub type EmployeeRecord = WithId<Employee>;

/// Joined user profile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    pub personal: Option<Person>,
    pub employee: Option<EmployeeRecord>,
    pub auth: AuthInfo,
}

impl UserProfile {
    /// A profile carrying only the auth part.
    pub fn from_auth(auth: AuthInfo) -> Self {
        Self {
            personal: None,
            employee: None,
            auth,
        }
    }

    /// Whether all three parts resolved.
    pub fn is_complete(&self) -> bool {
        self.personal.is_some() && self.employee.is_some()
    }

    /// Display name: the personal full name, falling back to the email, then the uid.
    pub fn display_name(&self) -> &str {
        if let Some(p) = &self.personal {
            return &p.full_name;
        }
        self.auth
            .email
            .as_deref()
            .unwrap_or_else(|| self.auth.local_id.as_str())
    }

    /// Access level from the employee part. `None` when it did not resolve.
    pub fn access_level(&self) -> Option<AccessLevel> {
        self.employee.as_ref().and_then(|e| e.access_level)
    }
}
