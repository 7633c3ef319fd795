//! # Signal: publish-on-change cell
//!
//! A `Signal<T>` holds one value. Writing a value equal to the current one
//! is a no-op; writing a different value publishes it:
//!
//! 1. the cell is updated,
//! 2. every synchronous listener runs, in registration order, with the new
//!    value (no lock on the value is held while they run),
//! 3. async observers holding a [`watch`](Signal::watch) receiver wake up.
//!
//! Publishes are serialised by a re-entrant lock, so listeners of one change
//! finish before the next change on the same signal is delivered. A listener
//! may write to the signal it observes; the nested publish is delivered
//! inline.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::{Mutex, ReentrantMutex};
use tokio::sync::watch;

type Listener<T> = Arc<dyn Fn(&T) + Send + Sync>;

/// Handle returned by [`Signal::subscribe`], used to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

struct Inner<T> {
    tx: watch::Sender<T>,
    listeners: Mutex<Vec<(ListenerId, Listener<T>)>>,
    next_id: AtomicU64,
    publishing: ReentrantMutex<()>,
}

/// Mutable, observable cell. Clones share the same value.
pub struct Signal<T> {
    inner: Arc<Inner<T>>,
}

impl<T> Clone for Signal<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> std::fmt::Debug for Signal<T>
where
    T: std::fmt::Debug,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Signal")
            .field("value", &*self.inner.tx.borrow())
            .field("listeners", &self.inner.listeners.lock().len())
            .finish()
    }
}

impl<T> Signal<T>
where
    T: Clone + PartialEq + Send + Sync + 'static,
{
    pub fn new(initial: T) -> Self {
        let (tx, _rx) = watch::channel(initial);
        Self {
            inner: Arc::new(Inner {
                tx,
                listeners: Mutex::new(Vec::new()),
                next_id: AtomicU64::new(0),
                publishing: ReentrantMutex::new(()),
            }),
        }
    }

    /// Current value.
    pub fn get(&self) -> T {
        self.inner.tx.borrow().clone()
    }

    /// Store `value`. Returns `true` if it differed from the current value
    /// and was published.
    pub fn set(&self, value: T) -> bool {
        let _publishing = self.inner.publishing.lock();
        let changed = self.inner.tx.send_if_modified(|current| {
            if *current == value {
                false
            } else {
                *current = value;
                true
            }
        });
        if changed {
            self.notify();
        }
        changed
    }

    /// Derive the next value from the current one.
    pub fn update(&self, f: impl FnOnce(&T) -> T) -> bool {
        let _publishing = self.inner.publishing.lock();
        let next = f(&self.inner.tx.borrow());
        self.set(next)
    }

    /// Register a synchronous listener. It is not called for the current
    /// value, only for subsequent changes.
    pub fn subscribe(&self, listener: impl Fn(&T) + Send + Sync + 'static) -> ListenerId {
        let id = ListenerId(self.inner.next_id.fetch_add(1, Ordering::Relaxed));
        self.inner.listeners.lock().push((id, Arc::new(listener)));
        id
    }

    /// Remove a listener. Unknown ids are ignored.
    pub fn unsubscribe(&self, id: ListenerId) {
        self.inner.listeners.lock().retain(|(lid, _)| *lid != id);
    }

    /// Async observation channel. The current value is marked as seen.
    pub fn watch(&self) -> watch::Receiver<T> {
        self.inner.tx.subscribe()
    }

    /// Read-only view sharing this cell.
    pub fn read_only(&self) -> ReadSignal<T> {
        ReadSignal {
            signal: self.clone(),
        }
    }

    fn notify(&self) {
        let value = self.get();
        let listeners: Vec<Listener<T>> = self
            .inner
            .listeners
            .lock()
            .iter()
            .map(|(_, l)| Arc::clone(l))
            .collect();
        for listener in listeners {
            listener(&value);
        }
    }
}

/// Read-only handle onto a [`Signal`].
pub struct ReadSignal<T> {
    signal: Signal<T>,
}

impl<T> Clone for ReadSignal<T> {
    fn clone(&self) -> Self {
        Self {
            signal: self.signal.clone(),
        }
    }
}

impl<T> std::fmt::Debug for ReadSignal<T>
where
    T: std::fmt::Debug,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.signal.fmt(f)
    }
}

impl<T> ReadSignal<T>
where
    T: Clone + PartialEq + Send + Sync + 'static,
{
    pub fn get(&self) -> T {
        self.signal.get()
    }

    pub fn subscribe(&self, listener: impl Fn(&T) + Send + Sync + 'static) -> ListenerId {
        self.signal.subscribe(listener)
    }

    pub fn unsubscribe(&self, id: ListenerId) {
        self.signal.unsubscribe(id)
    }

    pub fn watch(&self) -> watch::Receiver<T> {
        self.signal.watch()
    }
}
