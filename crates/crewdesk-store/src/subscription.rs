//! Cancellable, typed live views over a backend listener.

use tokio::sync::mpsc;

use crate::backend::{Listener, RawSnapshot, SnapshotEvent};
use crate::error::StoreError;

type Mapper<S> = Box<dyn Fn(RawSnapshot) -> Result<S, StoreError> + Send>;

/// A live subscription delivering `S` values.
///
/// Dropping the subscription cancels it.
pub struct Subscription<S> {
    events: mpsc::UnboundedReceiver<SnapshotEvent>,
    detach: Option<Box<dyn FnOnce() + Send>>,
    map: Mapper<S>,
}

impl<S> Subscription<S> {
    pub(crate) fn new(
        listener: Listener,
        map: impl Fn(RawSnapshot) -> Result<S, StoreError> + Send + 'static,
    ) -> Self {
        Self {
            events: listener.events,
            detach: Some(listener.detach),
            map: Box::new(map),
        }
    }

    /// Next emission. `None` once cancelled or when the backend has gone
    /// away.
    pub async fn next(&mut self) -> Option<Result<S, StoreError>> {
        if self.is_cancelled() {
            return None;
        }
        let event = self.events.recv().await?;
        if self.is_cancelled() {
            return None;
        }
        Some(event.and_then(|snapshot| (self.map)(snapshot)))
    }

    /// Next emission if one is already queued.
    pub fn try_next(&mut self) -> Option<Result<S, StoreError>> {
        if self.is_cancelled() {
            return None;
        }
        let event = self.events.try_recv().ok()?;
        Some(event.and_then(|snapshot| (self.map)(snapshot)))
    }

    /// Stop delivery and release the backend listener. Idempotent.
    pub fn cancel(&mut self) {
        if let Some(detach) = self.detach.take() {
            detach();
            self.events.close();
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.detach.is_none()
    }
}

impl<S> Drop for Subscription<S> {
    fn drop(&mut self) {
        self.cancel();
    }
}

impl<S> std::fmt::Debug for Subscription<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("cancelled", &self.is_cancelled())
            .finish_non_exhaustive()
    }
}
