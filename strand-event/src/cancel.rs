//! Cancellation signal threaded through every
//! suspending operation.
//!
//! A [`Cancel`] is a one-shot flag that can be
//! observed synchronously, awaited, and linked:
//! a child created by [`Cancel::child`] fires
//! whenever its parent does, but cancelling the
//! child leaves the parent untouched. This is
//! how a select statement cancels its pending
//! readiness waits without disturbing the
//! caller's own signal.

use parking_lot::Mutex;
use std::pin::pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use tokio::sync::Notify;

/// One-shot latch.
///
/// Once set it stays set, and every waiter,
/// past or future, observes it.
pub(crate) struct Latch {
    set: AtomicBool,
    notify: Notify,
}

impl Latch {
    pub(crate) fn new() -> Self {
        Self {
            set: AtomicBool::new(false),
            notify: Notify::new(),
        }
    }

    pub(crate) fn new_set() -> Self {
        Self {
            set: AtomicBool::new(true),
            notify: Notify::new(),
        }
    }

    /// Set the latch, returns whether this call set it.
    pub(crate) fn set(&self) -> bool {
        let first = !self.set.swap(true, Ordering::SeqCst);
        if first {
            self.notify.notify_waiters();
        }
        first
    }

    pub(crate) fn is_set(&self) -> bool {
        self.set.load(Ordering::SeqCst)
    }

    pub(crate) async fn wait(&self) {
        loop {
            // XXX: the notified future must be enabled
            // before testing the flag, otherwise a set()
            // racing in between is never observed.
            let mut notified = pin!(self.notify.notified());
            notified.as_mut().enable();
            if self.is_set() {
                return;
            }
            notified.await;
        }
    }
}

struct Inner {
    latch: Latch,
    children: Mutex<Vec<Weak<Inner>>>,
}

impl Inner {
    fn new() -> Self {
        Self {
            latch: Latch::new(),
            children: Mutex::new(Vec::new()),
        }
    }

    fn cancel(&self) {
        if !self.latch.set() {
            return;
        }
        let children = std::mem::take(&mut *self.children.lock());
        for child in children {
            if let Some(child) = child.upgrade() {
                child.cancel();
            }
        }
    }
}

/// Cancellation signal.
///
/// Cloning the signal yields another handle to
/// the same flag. The default value is a fresh,
/// uncancelled root signal.
#[derive(Clone)]
pub struct Cancel {
    inner: Arc<Inner>,
}

impl Default for Cancel {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Cancel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Cancel")
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}

impl Cancel {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Inner::new()),
        }
    }

    /// Fire the signal and every linked child.
    /// Idempotent.
    pub fn cancel(&self) {
        self.inner.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.inner.latch.is_set()
    }

    /// Wait until the signal fires.
    pub async fn cancelled(&self) {
        self.inner.latch.wait().await
    }

    /// Create a linked child signal.
    ///
    /// The child is cancelled together with this
    /// signal, or on its own, whichever comes first.
    pub fn child(&self) -> Cancel {
        let child = Cancel::new();
        let mut children = self.inner.children.lock();
        // XXX: tested under the lock, cancel() sets the
        // flag before taking the children, so a child is
        // either drained by it or sees the flag here.
        if self.is_cancelled() {
            drop(children);
            child.cancel();
            return child;
        }
        children.retain(|weak| weak.strong_count() > 0);
        children.push(Arc::downgrade(&child.inner));
        child
    }
}
