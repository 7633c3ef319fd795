//! Employee documents, stored in the `employees` collection.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Staff role. An employee may hold several.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Artist,
    Pirotech,
    Tech,
    Driver,
    Manager,
    /// Forward-compatible catch-all for roles added after this build.
    #[serde(other)]
    Unknown,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Artist => "artist",
            Self::Pirotech => "pirotech",
            Self::Tech => "tech",
            Self::Driver => "driver",
            Self::Manager => "manager",
            Self::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Dashboard access level.
///
/// Privilege order is `Unknown < Employee < Manager < Director`; compare
/// through [`allows`](AccessLevel::allows).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccessLevel {
    Employee,
    Manager,
    Director,
    /// Levels this build does not know. Grants nothing.
    #[serde(other)]
    Unknown,
}

impl AccessLevel {
    fn rank(self) -> u8 {
        match self {
            Self::Unknown => 0,
            Self::Employee => 1,
            Self::Manager => 2,
            Self::Director => 3,
        }
    }

    /// Whether this level grants at least `minimum`.
    pub fn allows(&self, minimum: AccessLevel) -> bool {
        self.rank() >= minimum.rank()
    }
}

/// An employee as stored in the document store.
///
/// The identifier is not part of the body; read paths return
/// [`WithId<Employee>`](crate::WithId).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Employee {
    /// Key into the personal-data backend.
    pub person_id: String,
    #[serde(default)]
    pub roles: Vec<Role>,
    /// Dates the employee has declared themselves available.
    #[serde(default)]
    pub availability: Vec<DateTime<Utc>>,
    #[serde(default)]
    pub is_active: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_level: Option<AccessLevel>,
}

impl Employee {
    pub fn new(person_id: impl Into<String>) -> Self {
        Self {
            person_id: person_id.into(),
            roles: Vec::new(),
            availability: Vec::new(),
            is_active: true,
            access_level: None,
        }
    }

    pub fn has_role(&self, role: Role) -> bool {
        self.roles.contains(&role)
    }

    /// Whether the employee declared availability on the calendar day of `at`.
    pub fn is_available_on(&self, at: DateTime<Utc>) -> bool {
        let day = at.date_naive();
        self.availability.iter().any(|a| a.date_naive() == day)
    }
}
