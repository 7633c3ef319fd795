// SPDX-License-Identifier: BUSL-1.1
//! In-memory storage backend using DashMap.

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

use crewdesk_core::Person;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

struct Inner {
    persons: DashMap<String, Person>,
    next_id: AtomicI64,
    require_auth: bool,
}

/// Shared application state. All clones share the same data.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<Inner>,
}

impl AppState {
    /// `require_auth` makes every `/api` route answer 401 to requests
    /// without a bearer token.
    pub fn new(require_auth: bool) -> Self {
        Self {
            inner: Arc::new(Inner {
                persons: DashMap::new(),
                next_id: AtomicI64::new(1),
                require_auth,
            }),
        }
    }

    /// Records keyed by `person_id`.
    pub fn persons(&self) -> &DashMap<String, Person> {
        &self.inner.persons
    }

    pub fn requires_auth(&self) -> bool {
        self.inner.require_auth
    }

    /// Store `person` under its `person_id`, assigning a row id when it has
    /// none. Returns `None`, leaving the map untouched, when the person id is
    /// already taken.
    pub fn create(&self, mut person: Person) -> Option<Person> {
        match self.inner.persons.entry(person.person_id.clone()) {
            Entry::Occupied(_) => None,
            Entry::Vacant(slot) => {
                if person.id.is_none() {
                    person.id = Some(self.inner.next_id.fetch_add(1, Ordering::Relaxed));
                }
                slot.insert(person.clone());
                Some(person)
            }
        }
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new(false)
    }
}
