//! Employee documents.

use chrono::{DateTime, Utc};
use crewdesk_core::{AccessLevel, DocumentId, Employee, Role, WithId};
use serde::{Deserialize, Serialize};

use crate::collection::{Collection, DocumentChange, Entity};
use crate::constraint::{filter, Constraint, FilterOp};
use crate::db::DocumentDb;
use crate::error::StoreError;
use crate::subscription::Subscription;

impl Entity for Employee {
    const COLLECTION: &'static str = "employees";
}

/// Partial update of an employee. `None` fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmployeePatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub roles: Option<Vec<Role>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub availability: Option<Vec<DateTime<Utc>>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_active: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub access_level: Option<AccessLevel>,
}

/// Access to the `employees` collection.
#[derive(Debug, Clone)]
pub struct EmployeeService {
    employees: Collection<Employee>,
}

impl EmployeeService {
    pub fn new(db: &DocumentDb) -> Self {
        Self {
            employees: db.collection_for::<Employee>(),
        }
    }

    pub fn collection(&self) -> &Collection<Employee> {
        &self.employees
    }

    pub async fn create(&self, employee: &Employee) -> Result<DocumentId, StoreError> {
        self.employees.create(employee).await
    }

    pub async fn set_with_id(&self, id: &DocumentId, employee: &Employee) -> Result<(), StoreError> {
        self.employees.set_with_id(id, employee).await
    }

    pub async fn get_one(&self, id: &DocumentId) -> Result<Option<WithId<Employee>>, StoreError> {
        self.employees.get_one(id).await
    }

    pub async fn get_all(&self) -> Result<Vec<WithId<Employee>>, StoreError> {
        self.employees.get_all().await
    }

    pub async fn query(&self, constraints: &[Constraint]) -> Result<Vec<WithId<Employee>>, StoreError> {
        self.employees.query(constraints).await
    }

    pub async fn update(&self, id: &DocumentId, patch: &EmployeePatch) -> Result<(), StoreError> {
        self.employees.update(id, patch).await
    }

    pub async fn delete(&self, id: &DocumentId) -> Result<(), StoreError> {
        self.employees.delete(id).await
    }

    pub fn subscribe_all(
        &self,
        constraints: &[Constraint],
    ) -> Result<Subscription<Vec<WithId<Employee>>>, StoreError> {
        self.employees.subscribe_all(constraints)
    }

    pub fn subscribe_one(
        &self,
        id: &DocumentId,
    ) -> Result<Subscription<Option<WithId<Employee>>>, StoreError> {
        self.employees.subscribe_one(id)
    }

    pub fn subscribe_changes(
        &self,
        constraints: &[Constraint],
    ) -> Result<Subscription<Vec<DocumentChange<Employee>>>, StoreError> {
        self.employees.subscribe_changes(constraints)
    }

    /// The employee record linked to a person, if any.
    pub async fn find_by_person_id(
        &self,
        person_id: &str,
    ) -> Result<Option<WithId<Employee>>, StoreError> {
        self.employees.get_one_by_field("personId", person_id).await
    }

    pub async fn find_active_with_role(&self, role: Role) -> Result<Vec<WithId<Employee>>, StoreError> {
        self.employees
            .query(&[
                filter("isActive", FilterOp::Eq, true),
                filter("roles", FilterOp::ArrayContains, role.as_str()),
            ])
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn patch_touches_only_given_fields() {
        let service = EmployeeService::new(&DocumentDb::in_memory());
        let mut employee = Employee::new("p-1");
        employee.roles = vec![Role::Tech];
        let id = service.create(&employee).await.unwrap();

        service
            .update(
                &id,
                &EmployeePatch {
                    access_level: Some(AccessLevel::Manager),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        let stored = service.get_one(&id).await.unwrap().unwrap();
        assert_eq!(stored.access_level, Some(AccessLevel::Manager));
        assert_eq!(stored.roles, vec![Role::Tech]);
        assert_eq!(stored.person_id, "p-1");
    }

    #[tokio::test]
    async fn finds_by_person_and_role() {
        let service = EmployeeService::new(&DocumentDb::in_memory());
        let mut driver = Employee::new("p-1");
        driver.roles = vec![Role::Driver, Role::Tech];
        let mut retired = Employee::new("p-2");
        retired.roles = vec![Role::Driver];
        retired.is_active = false;
        service.create(&driver).await.unwrap();
        service.create(&retired).await.unwrap();

        let found = service.find_by_person_id("p-2").await.unwrap().unwrap();
        assert!(!found.is_active);
        assert!(service.find_by_person_id("p-9").await.unwrap().is_none());

        let drivers = service.find_active_with_role(Role::Driver).await.unwrap();
        assert_eq!(drivers.len(), 1);
        assert_eq!(drivers[0].person_id, "p-1");
    }
}
