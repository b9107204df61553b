//! Per-class dispatch gates.
//!
//! The host caps the number of simultaneous connections it keeps open, and
//! calls issued in a burst get dropped or stalled. Each call class gets one
//! gate; a caller holds it only while its call is being dispatched and its
//! callbacks registered, so the waits themselves still overlap.

use tokio::sync::{Mutex, MutexGuard};
use tracing::trace;

/// Which gate a call goes through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CallClass {
    /// Plain REST verbs.
    Rest,
    /// UI API metadata lookups.
    Metadata,
}

/// One FIFO gate per [`CallClass`].
///
/// Share one value (behind an `Arc`) between every invoker that talks to the
/// same host.
#[derive(Debug, Default)]
pub struct CallLocks {
    rest: Mutex<()>,
    metadata: Mutex<()>,
}

/// Held while a call is dispatched. Dropping it lets the next caller of the
/// same class dispatch.
#[derive(Debug)]
#[must_use = "the gate is released as soon as the permit is dropped"]
pub struct DispatchPermit<'a> {
    class: CallClass,
    _guard: MutexGuard<'a, ()>,
}

impl DispatchPermit<'_> {
    pub fn class(&self) -> CallClass {
        self.class
    }
}

impl CallLocks {
    pub fn new() -> Self {
        Self::default()
    }

    fn gate(&self, class: CallClass) -> &Mutex<()> {
        match class {
            CallClass::Rest => &self.rest,
            CallClass::Metadata => &self.metadata,
        }
    }

    /// Block the current thread until the gate for `class` is free.
    ///
    /// Waiters are admitted in the order they arrived. Must not be called
    /// from inside an async task; use [`acquire_async`](Self::acquire_async)
    /// there.
    pub fn acquire(&self, class: CallClass) -> DispatchPermit<'_> {
        trace!(?class, "acquiring dispatch gate");
        DispatchPermit {
            class,
            _guard: self.gate(class).blocking_lock(),
        }
    }

    /// Wait for the gate for `class` without blocking the thread.
    pub async fn acquire_async(&self, class: CallClass) -> DispatchPermit<'_> {
        DispatchPermit {
            class,
            _guard: self.gate(class).lock().await,
        }
    }

    /// Take the gate only if nobody holds it.
    pub fn try_acquire(&self, class: CallClass) -> Option<DispatchPermit<'_>> {
        self.gate(class)
            .try_lock()
            .ok()
            .map(|guard| DispatchPermit {
                class,
                _guard: guard,
            })
    }
}
