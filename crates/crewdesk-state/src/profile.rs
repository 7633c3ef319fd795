//! Profile resolution: joining the personal and employee records of the
//! signed-in user.
//!
//! Both records are keyed by the identity provider's uid: the personal
//! record by `person_id`, the employee document by its `personId` field.
//! The two lookups run concurrently and fail independently.

use std::sync::Arc;

use async_trait::async_trait;
use crewdesk_client::{ApiError, PersonsClient};
use crewdesk_core::{AuthInfo, AuthUid, EmployeeRecord, Person, UserProfile};
use crewdesk_store::{EmployeeService, StoreError};

/// Failure of one profile lookup.
#[derive(Debug, thiserror::Error)]
pub enum LookupError {
    #[error("personal-data lookup failed: {0}")]
    Persons(#[from] ApiError),
    #[error("employee lookup failed: {0}")]
    Employees(#[from] StoreError),
}

/// Source of personal records.
#[async_trait]
pub trait PersonDirectory: Send + Sync {
    async fn person_for(&self, uid: &AuthUid) -> Result<Option<Person>, LookupError>;
}

/// Source of employee records.
#[async_trait]
pub trait EmployeeDirectory: Send + Sync {
    async fn employee_for(&self, uid: &AuthUid) -> Result<Option<EmployeeRecord>, LookupError>;
}

#[async_trait]
impl PersonDirectory for PersonsClient {
    async fn person_for(&self, uid: &AuthUid) -> Result<Option<Person>, LookupError> {
        Ok(self.get_person_by_id(uid.as_str()).await?)
    }
}

#[async_trait]
impl EmployeeDirectory for EmployeeService {
    async fn employee_for(&self, uid: &AuthUid) -> Result<Option<EmployeeRecord>, LookupError> {
        Ok(self.find_by_person_id(uid.as_str()).await?)
    }
}

/// Builds a [`UserProfile`] for a signed-in identity.
#[derive(Clone)]
pub struct ProfileResolver {
    persons: Arc<dyn PersonDirectory>,
    employees: Arc<dyn EmployeeDirectory>,
}

impl std::fmt::Debug for ProfileResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProfileResolver").finish_non_exhaustive()
    }
}

impl ProfileResolver {
    pub fn new(persons: Arc<dyn PersonDirectory>, employees: Arc<dyn EmployeeDirectory>) -> Self {
        Self { persons, employees }
    }

    /// Resolve both parts. A failed or empty lookup leaves its part `None`;
    /// resolution itself never fails.
    pub async fn resolve(&self, auth: AuthInfo) -> UserProfile {
        let uid = auth.local_id.clone();
        let (personal, employee) = tokio::join!(
            self.persons.person_for(&uid),
            self.employees.employee_for(&uid)
        );

        let mut profile = UserProfile::from_auth(auth);
        profile.personal = personal.unwrap_or_else(|e| {
            tracing::warn!(uid = %uid, error = %e, "personal record unavailable; profile degraded");
            None
        });
        profile.employee = employee.unwrap_or_else(|e| {
            tracing::warn!(uid = %uid, error = %e, "employee record unavailable; profile degraded");
            None
        });
        if !profile.is_complete() {
            tracing::debug!(
                uid = %uid,
                personal = profile.personal.is_some(),
                employee = profile.employee.is_some(),
                "profile resolved partially"
            );
        }
        profile
    }
}
