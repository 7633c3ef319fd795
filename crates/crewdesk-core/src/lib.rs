//! # crewdesk-core: Foundational Types
//!
//! Shared vocabulary for every other crate in the workspace. It depends on
//! nothing internal.
//!
//! - **Identifiers** ([`identity`]): [`DocumentId`] (assigned by the document
//!   store) and [`AuthUid`] (issued by the identity provider). Both validate
//!   at construction and at deserialization.
//! - **Documents** ([`document`]): [`WithId`], any stored entity joined with
//!   its store-assigned identifier.
//! - **Models**: [`Employee`], [`Person`], [`Order`] and the joined
//!   [`UserProfile`].
//!
//! ## Crate Policy
//!
//! - No `unsafe` code.
//! - No `.unwrap()` outside tests.
//! - Wire shapes follow the backends: employee documents are camelCase,
//!   personal-data records are snake_case.

pub mod document;
pub mod employee;
pub mod error;
pub mod identity;
pub mod order;
pub mod person;
pub mod profile;

pub use document::WithId;
pub use employee::{AccessLevel, Employee, Role};
pub use error::ValidationError;
pub use identity::{AuthUid, DocumentId};
pub use order::{
    ActualTimes, Assignment, Coordinates, Financials, Order, OrderStatus, Participants,
    ScheduledTimes, Timeline,
};
pub use person::{Person, PersonPatch};
pub use profile::{AuthInfo, EmployeeRecord, UserProfile};
