//! Observable auth store.

use crewdesk_session::{ReadSignal, Signal};
use tokio::sync::broadcast;

use crate::auth::{reduce, AuthEvent, AuthState};

const EVENT_BUFFER: usize = 64;

/// Holds the [`AuthState`] and fans dispatched events out to observers.
///
/// `dispatch` applies [`reduce`] first, then broadcasts the event, so an
/// observer reading the state on receipt sees the post-transition value.
#[derive(Clone)]
pub struct AuthStore {
    state: Signal<AuthState>,
    events: broadcast::Sender<AuthEvent>,
}

impl Default for AuthStore {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for AuthStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthStore")
            .field("state", &self.state.get())
            .field("observers", &self.events.receiver_count())
            .finish()
    }
}

impl AuthStore {
    pub fn new() -> Self {
        let (events, _rx) = broadcast::channel(EVENT_BUFFER);
        Self {
            state: Signal::new(AuthState::default()),
            events,
        }
    }

    pub fn dispatch(&self, event: AuthEvent) {
        tracing::debug!(event = event.name(), "auth event");
        self.state.update(|state| reduce(state, &event));
        // No observer is not an error.
        let _ = self.events.send(event);
    }

    /// Current state.
    pub fn snapshot(&self) -> AuthState {
        self.state.get()
    }

    pub fn state(&self) -> ReadSignal<AuthState> {
        self.state.read_only()
    }

    /// Events dispatched from now on.
    pub fn events(&self) -> broadcast::Receiver<AuthEvent> {
        self.events.subscribe()
    }
}
