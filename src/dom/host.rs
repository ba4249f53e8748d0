//! Host - The environment a primitive runs in.
//!
//! Bundles the (optional) document, the clock and the process-wide scroll
//! lock. A host without a document models non-browser rendering: state
//! machines still run, while focus, geometry and attribute writes silently
//! do nothing.

use super::{Document, Scheduler};
use crate::state::scroll_lock::ScrollLock;

/// Shared environment handed to every primitive.
#[derive(Clone, Debug)]
pub struct Host {
    document: Option<Document>,
    scheduler: Scheduler,
    scroll_lock: ScrollLock,
}

impl Host {
    /// A host with a live document, a fresh clock and a scroll lock on its body.
    pub fn new(document: Document) -> Self {
        let scroll_lock = ScrollLock::new(Some(document.clone()));
        Self {
            document: Some(document),
            scheduler: Scheduler::new(),
            scroll_lock,
        }
    }

    /// A host with no document at all.
    pub fn headless() -> Self {
        Self {
            document: None,
            scheduler: Scheduler::new(),
            scroll_lock: ScrollLock::new(None),
        }
    }

    /// Assemble a host from parts, e.g. to share one scroll lock between hosts.
    pub fn from_parts(
        document: Option<Document>,
        scheduler: Scheduler,
        scroll_lock: ScrollLock,
    ) -> Self {
        Self {
            document,
            scheduler,
            scroll_lock,
        }
    }

    pub fn document(&self) -> Option<&Document> {
        self.document.as_ref()
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    pub fn scroll_lock(&self) -> &ScrollLock {
        &self.scroll_lock
    }
}
