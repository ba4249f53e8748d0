//! Scroll Lock - Reference-counted background scroll suppression
//!
//! One [`ScrollLock`] exists per host and is shared by every overlay. Each
//! overlay holds a [`ScrollLockToken`]; a token contributes at most one to the
//! count, so releasing a token that never acquired (or releasing twice) is a
//! no-op.
//!
//! The count is mirrored onto the document body:
//! - `data-scroll-lock-count` holds the current count while it is above zero
//! - the `scroll-locked` class is present exactly while the count is above zero
//!
//! # Example
//!
//! ```ignore
//! let first = host.scroll_lock().token();
//! let second = host.scroll_lock().token();
//! first.acquire();
//! second.acquire();
//! first.release();
//! assert!(host.scroll_lock().is_locked()); // second still holds it
//! ```

use std::cell::Cell;
use std::fmt;
use std::rc::Rc;

use crate::dom::Document;

/// Body class present while scrolling is locked.
pub const SCROLL_LOCKED_CLASS: &str = "scroll-locked";

/// Body attribute carrying the lock count.
pub const SCROLL_LOCK_COUNT_ATTR: &str = "data-scroll-lock-count";

struct LockState {
    count: Cell<usize>,
    document: Option<Document>,
}

impl LockState {
    fn sync_body(&self) {
        let Some(doc) = &self.document else { return };
        let body = doc.body();
        let count = self.count.get();
        if count > 0 {
            doc.set_attribute(body, SCROLL_LOCK_COUNT_ATTR, count.to_string());
            doc.add_class(body, SCROLL_LOCKED_CLASS);
        } else {
            doc.remove_attribute(body, SCROLL_LOCK_COUNT_ATTR);
            doc.remove_class(body, SCROLL_LOCKED_CLASS);
        }
    }
}

/// Shared scroll-lock counter. Cloning shares the counter.
#[derive(Clone)]
pub struct ScrollLock {
    state: Rc<LockState>,
}

impl fmt::Debug for ScrollLock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScrollLock")
            .field("count", &self.state.count.get())
            .finish()
    }
}

impl ScrollLock {
    /// A lock mirrored onto `document`'s body. Without a document the count
    /// is still tracked.
    pub fn new(document: Option<Document>) -> Self {
        Self {
            state: Rc::new(LockState {
                count: Cell::new(0),
                document,
            }),
        }
    }

    pub fn count(&self) -> usize {
        self.state.count.get()
    }

    pub fn is_locked(&self) -> bool {
        self.count() > 0
    }

    /// A fresh, unheld token on this lock.
    pub fn token(&self) -> ScrollLockToken {
        ScrollLockToken {
            lock: self.clone(),
            held: Cell::new(false),
        }
    }

    fn increment(&self) {
        let count = self.state.count.get() + 1;
        self.state.count.set(count);
        if count == 1 {
            tracing::debug!("scroll lock engaged");
        }
        self.state.sync_body();
    }

    fn decrement(&self) {
        let count = self.state.count.get().saturating_sub(1);
        self.state.count.set(count);
        if count == 0 {
            tracing::debug!("scroll lock released");
        }
        self.state.sync_body();
    }
}

/// One overlay's share of the scroll lock. Dropping the token releases it.
pub struct ScrollLockToken {
    lock: ScrollLock,
    held: Cell<bool>,
}

impl fmt::Debug for ScrollLockToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScrollLockToken")
            .field("held", &self.held.get())
            .finish()
    }
}

impl ScrollLockToken {
    /// Take a share of the lock. Acquiring a held token does nothing.
    pub fn acquire(&self) {
        if self.held.replace(true) {
            return;
        }
        self.lock.increment();
    }

    /// Give the share back. Releasing an unheld token does nothing.
    pub fn release(&self) {
        if !self.held.replace(false) {
            return;
        }
        self.lock.decrement();
    }

    pub fn is_held(&self) -> bool {
        self.held.get()
    }
}

impl Drop for ScrollLockToken {
    fn drop(&mut self) {
        self.release();
    }
}
