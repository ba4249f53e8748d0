//! Instance lifecycle shared by every primitive.
//!
//! [`InstanceCore`] owns what a primitive must give back on destroy:
//! document listeners, binding claims, timers, its scroll-lock share and the
//! user's destroy hook.

use std::cell::{Cell, RefCell};
use std::fmt;

use crate::dom::{Document, ElementId, Event, EventKind, EventTarget, Host, ListenerId, TaskSlots};
use crate::error::Result;
use crate::state::scroll_lock::ScrollLockToken;

use super::types::DestroyCallback;

struct PartEntry {
    element: ElementId,
    part: &'static str,
    listeners: Vec<ListenerId>,
}

pub(crate) struct InstanceCore {
    host: Host,
    id: String,
    slots: TaskSlots,
    scroll_lock: ScrollLockToken,
    listeners: RefCell<Vec<ListenerId>>,
    parts: RefCell<Vec<PartEntry>>,
    destroyed: Cell<bool>,
    on_destroy: RefCell<Option<DestroyCallback>>,
}

impl fmt::Debug for InstanceCore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InstanceCore")
            .field("id", &self.id)
            .field("listeners", &self.listeners.borrow().len())
            .field("destroyed", &self.destroyed.get())
            .finish()
    }
}

impl InstanceCore {
    pub(crate) fn new(host: Host, id: String, on_destroy: Option<DestroyCallback>) -> Self {
        let slots = TaskSlots::new(host.scheduler().clone());
        let scroll_lock = host.scroll_lock().token();
        Self {
            host,
            id,
            slots,
            scroll_lock,
            listeners: RefCell::new(Vec::new()),
            parts: RefCell::new(Vec::new()),
            destroyed: Cell::new(false),
            on_destroy: RefCell::new(on_destroy),
        }
    }

    pub(crate) fn id(&self) -> &str {
        &self.id
    }

    pub(crate) fn document(&self) -> Option<&Document> {
        if self.destroyed.get() {
            return None;
        }
        self.host.document()
    }

    pub(crate) fn slots(&self) -> &TaskSlots {
        &self.slots
    }

    pub(crate) fn scroll_lock(&self) -> &ScrollLockToken {
        &self.scroll_lock
    }

    pub(crate) fn is_destroyed(&self) -> bool {
        self.destroyed.get()
    }

    /// `{id}-{suffix}`
    pub(crate) fn part_id(&self, suffix: &str) -> String {
        format!("{}-{}", self.id, suffix)
    }

    // -------------------------------------------------------------------------
    // Listeners
    // -------------------------------------------------------------------------

    pub(crate) fn listen(
        &self,
        target: impl Into<EventTarget>,
        kind: EventKind,
        handler: impl Fn(&Event) + 'static,
    ) -> Option<ListenerId> {
        self.listen_with(target, kind, false, handler)
    }

    /// Register a listener owned by this instance. `None` without a document.
    pub(crate) fn listen_with(
        &self,
        target: impl Into<EventTarget>,
        kind: EventKind,
        capture: bool,
        handler: impl Fn(&Event) + 'static,
    ) -> Option<ListenerId> {
        let doc = self.document()?;
        let id = doc.add_listener_with(target, kind, capture, handler);
        self.listeners.borrow_mut().push(id);
        Some(id)
    }

    pub(crate) fn unlisten(&self, ids: impl IntoIterator<Item = ListenerId>) {
        let ids: Vec<ListenerId> = ids.into_iter().collect();
        self.listeners.borrow_mut().retain(|id| !ids.contains(id));
        if let Some(doc) = self.host.document() {
            for id in ids {
                doc.remove_listener(id);
            }
        }
    }

    // -------------------------------------------------------------------------
    // Parts
    // -------------------------------------------------------------------------

    /// Claim `element` as `part` of this instance.
    ///
    /// `Ok(true)` for a fresh binding; `Ok(false)` when this instance already
    /// holds it, in which case the caller updates in place instead of
    /// registering listeners again. Another instance holding it is an error.
    pub(crate) fn bind_part(&self, element: ElementId, part: &'static str) -> Result<bool> {
        let Some(doc) = self.document() else {
            return Ok(true);
        };
        let fresh = doc.claim(element, part, &self.id)?;
        if fresh {
            self.parts.borrow_mut().push(PartEntry {
                element,
                part,
                listeners: Vec::new(),
            });
            tracing::trace!(id = %self.id, %element, part, "part bound");
        }
        Ok(fresh)
    }

    /// Register a listener owned by a bound part.
    pub(crate) fn listen_part(
        &self,
        element: ElementId,
        part: &'static str,
        target: impl Into<EventTarget>,
        kind: EventKind,
        handler: impl Fn(&Event) + 'static,
    ) {
        let Some(id) = self.listen(target, kind, handler) else {
            return;
        };
        let mut parts = self.parts.borrow_mut();
        if let Some(entry) = parts
            .iter_mut()
            .find(|entry| entry.element == element && entry.part == part)
        {
            entry.listeners.push(id);
        }
    }

    pub(crate) fn is_bound(&self, element: ElementId, part: &'static str) -> bool {
        self.parts
            .borrow()
            .iter()
            .any(|entry| entry.element == element && entry.part == part)
    }

    /// Undo a part binding: its listeners, its claim and the attributes it
    /// wrote. Unbinding twice is a no-op.
    pub(crate) fn unbind_part(&self, element: ElementId, part: &'static str, attributes: &[&str]) {
        let entry = {
            let mut parts = self.parts.borrow_mut();
            parts
                .iter()
                .position(|entry| entry.element == element && entry.part == part)
                .map(|index| parts.remove(index))
        };
        let Some(entry) = entry else { return };
        self.unlisten(entry.listeners);
        if let Some(doc) = self.host.document() {
            doc.release_claim(element, part, &self.id);
            for name in attributes {
                doc.remove_attribute(element, name);
            }
        }
        tracing::trace!(id = %self.id, %element, part, "part unbound");
    }

    // -------------------------------------------------------------------------
    // Destroy
    // -------------------------------------------------------------------------

    /// Tear everything down. Returns `false` if already destroyed.
    pub(crate) fn destroy(&self) -> bool {
        if self.destroyed.replace(true) {
            return false;
        }

        let listeners: Vec<ListenerId> = self.listeners.borrow_mut().drain(..).collect();
        let parts: Vec<PartEntry> = self.parts.borrow_mut().drain(..).collect();
        if let Some(doc) = self.host.document() {
            for id in listeners {
                doc.remove_listener(id);
            }
            for entry in parts {
                doc.release_claim(entry.element, entry.part, &self.id);
            }
        }
        self.slots.cancel_all();
        self.scroll_lock.release();

        tracing::debug!(id = %self.id, "instance destroyed");

        let hook = self.on_destroy.borrow_mut().take();
        if let Some(hook) = hook {
            hook();
        }
        true
    }
}
