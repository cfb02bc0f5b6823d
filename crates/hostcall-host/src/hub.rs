//! Error broadcast hub.
//!
//! Every classified failure produced on the host side is delivered here
//! exactly once. Listeners run in registration order against a snapshot of
//! the listener list, so a listener may add or remove listeners (including
//! itself) without affecting the dispatch in progress.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use hostcall_protocol::ClassifiedError;
use tracing::error;

use crate::fault::panic_message;

type Listener = Arc<dyn Fn(&ClassifiedError) + Send + Sync>;

/// Handle returned by [`ErrorHub::add_listener`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

#[derive(Default)]
pub struct ErrorHub {
    listeners: Mutex<Vec<(ListenerId, Listener)>>,
    next_id: AtomicU64,
}

impl ErrorHub {
    pub fn new() -> Self {
        Self::default()
    }

    fn listeners(&self) -> MutexGuard<'_, Vec<(ListenerId, Listener)>> {
        self.listeners.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn add_listener<F>(&self, listener: F) -> ListenerId
    where
        F: Fn(&ClassifiedError) + Send + Sync + 'static,
    {
        let id = ListenerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.listeners().push((id, Arc::new(listener)));
        id
    }

    /// Returns false if `id` was not registered.
    pub fn remove_listener(&self, id: ListenerId) -> bool {
        let mut listeners = self.listeners();
        let before = listeners.len();
        listeners.retain(|(existing, _)| *existing != id);
        listeners.len() != before
    }

    pub fn listener_count(&self) -> usize {
        self.listeners().len()
    }

    /// Deliver `err` to every listener, then log it.
    ///
    /// A panicking listener is logged and skipped; the rest still run.
    pub fn dispatch(&self, err: &ClassifiedError) {
        let snapshot: Vec<(ListenerId, Listener)> = self
            .listeners()
            .iter()
            .map(|(id, listener)| (*id, Arc::clone(listener)))
            .collect();

        for (id, listener) in snapshot {
            if let Err(panic) = catch_unwind(AssertUnwindSafe(|| listener(err))) {
                error!(
                    listener = id.0,
                    panic = %panic_message(&*panic),
                    "error listener panicked"
                );
            }
        }

        error!(
            kind = %err.kind,
            code = %err.code,
            message = %err.message,
            details = ?err.details,
            "ipc error"
        );
    }
}

impl std::fmt::Debug for ErrorHub {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ErrorHub")
            .field("listeners", &self.listener_count())
            .finish()
    }
}
