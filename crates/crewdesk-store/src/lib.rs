//! # crewdesk-store: Document Access Layer
//!
//! Generic access to a schema-less document database addressed by
//! `(collection, document id)`.
//!
//! ## Layers
//!
//! - [`DocumentStore`] is the backend seam: untyped JSON documents,
//!   constraint queries, atomic commits and change listeners.
//!   [`MemoryStore`] implements it in-process.
//! - [`DocumentDb`] is the entry point handed to the rest of the
//!   application. It produces typed [`Collection<T>`] handles and commits
//!   [`WriteBatch`]es.
//! - Feature services ([`EmployeeService`], [`OrderService`]) fix the
//!   collection name and entity type.
//!
//! ## Ordering
//!
//! Results follow the natural order (document id, ascending) unless
//! [`Constraint::OrderBy`] is given. Several orderings compose as
//! successive sort keys; the document id is always the final tie-break,
//! which is what makes [`Cursor`]s stable for a fixed query.
//!
//! ## Subscriptions
//!
//! A [`Subscription`] delivers one snapshot per store mutation that changes
//! its result, in mutation order. [`Subscription::cancel`] releases the
//! backend listener exactly once; nothing is delivered afterwards.

pub mod backend;
pub mod batch;
pub mod collection;
pub mod constraint;
pub mod cursor;
pub mod db;
pub mod employees;
pub mod error;
pub mod memory;
pub mod orders;
pub mod subscription;
mod value;

pub use backend::{
    ChangeKind, DocumentStore, Listener, RawChange, RawDocument, RawSnapshot, SnapshotEvent,
    WriteOp,
};
pub use batch::WriteBatch;
pub use collection::{Collection, DocumentChange, Entity, Page};
pub use constraint::{filter, limit, order_by, Constraint, Direction, FilterOp, QueryPlan, DOCUMENT_ID_FIELD};
pub use crewdesk_core::{DocumentId, WithId};
pub use cursor::Cursor;
pub use db::DocumentDb;
pub use employees::{EmployeePatch, EmployeeService};
pub use error::StoreError;
pub use memory::{MemoryStore, MAX_BATCH_WRITES};
pub use orders::OrderService;
pub use subscription::Subscription;
