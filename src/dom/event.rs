//! Events and listener registry.
//!
//! Listeners are registered against an [`EventTarget`] and an [`EventKind`],
//! optionally in the capture phase. Registration returns a [`ListenerId`];
//! removal by id is idempotent.
//!
//! Handlers are stored as `Rc<dyn Fn(&Event)>` so dispatch can snapshot the
//! matching handlers, release the document borrow, and let handlers re-enter
//! the document (focus, attribute writes, nested dispatch).

use std::cell::Cell;
use std::rc::Rc;

use super::ElementId;
use crate::state::keyboard::KeyboardEvent;

// =============================================================================
// TYPES
// =============================================================================

/// Kinds of events the engine listens for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    KeyDown,
    Click,
    PointerDown,
    PointerEnter,
    PointerLeave,
    Focus,
    Blur,
    Input,
    Load,
    Error,
    Scroll,
    Resize,
}

impl EventKind {
    /// Whether the event bubbles from the target up to the window.
    pub fn bubbles(self) -> bool {
        matches!(
            self,
            EventKind::KeyDown | EventKind::Click | EventKind::PointerDown | EventKind::Input
        )
    }
}

/// Where a listener is attached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventTarget {
    Window,
    Document,
    Element(ElementId),
}

impl From<ElementId> for EventTarget {
    fn from(element: ElementId) -> Self {
        EventTarget::Element(element)
    }
}

/// Identifier returned by listener registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(pub(crate) u64);

/// Listener handler. Shared so dispatch can call it without holding a borrow.
pub type EventHandler = Rc<dyn Fn(&Event)>;

/// A dispatched event.
#[derive(Debug, Clone)]
pub struct Event {
    kind: EventKind,
    target: Cell<Option<EventTarget>>,
    /// Key data for `KeyDown` events.
    pub key: Option<KeyboardEvent>,
    /// The element focus or the pointer is moving to (Blur, PointerLeave).
    pub related_target: Option<ElementId>,
    /// New form value for `Input` events.
    pub value: Option<String>,
    default_prevented: Cell<bool>,
    propagation_stopped: Cell<bool>,
}

impl Event {
    pub fn new(kind: EventKind) -> Self {
        Self {
            kind,
            target: Cell::new(None),
            key: None,
            related_target: None,
            value: None,
            default_prevented: Cell::new(false),
            propagation_stopped: Cell::new(false),
        }
    }

    /// A key press event.
    pub fn key_down(key: KeyboardEvent) -> Self {
        Self {
            key: Some(key),
            ..Self::new(EventKind::KeyDown)
        }
    }

    /// An input event carrying the element's new value.
    pub fn input(value: impl Into<String>) -> Self {
        Self {
            value: Some(value.into()),
            ..Self::new(EventKind::Input)
        }
    }

    pub fn with_related_target(mut self, related: Option<ElementId>) -> Self {
        self.related_target = related;
        self
    }

    pub fn kind(&self) -> EventKind {
        self.kind
    }

    /// Target the event was dispatched at (set by dispatch).
    pub fn target(&self) -> Option<EventTarget> {
        self.target.get()
    }

    /// Target element, if the event was dispatched at an element.
    pub fn target_element(&self) -> Option<ElementId> {
        match self.target.get() {
            Some(EventTarget::Element(element)) => Some(element),
            _ => None,
        }
    }

    pub(crate) fn set_target(&self, target: EventTarget) {
        self.target.set(Some(target));
    }

    pub fn prevent_default(&self) {
        self.default_prevented.set(true);
    }

    pub fn default_prevented(&self) -> bool {
        self.default_prevented.get()
    }

    pub fn stop_propagation(&self) {
        self.propagation_stopped.set(true);
    }

    pub fn propagation_stopped(&self) -> bool {
        self.propagation_stopped.get()
    }
}

// =============================================================================
// LISTENER REGISTRY
// =============================================================================

struct ListenerEntry {
    id: ListenerId,
    target: EventTarget,
    kind: EventKind,
    capture: bool,
    handler: EventHandler,
}

/// Registered listeners, in registration order.
#[derive(Default)]
pub(crate) struct ListenerRegistry {
    entries: Vec<ListenerEntry>,
    next_id: u64,
}

impl ListenerRegistry {
    pub(crate) fn add(
        &mut self,
        target: EventTarget,
        kind: EventKind,
        capture: bool,
        handler: EventHandler,
    ) -> ListenerId {
        let id = ListenerId(self.next_id);
        self.next_id += 1;
        self.entries.push(ListenerEntry {
            id,
            target,
            kind,
            capture,
            handler,
        });
        id
    }

    pub(crate) fn remove(&mut self, id: ListenerId) -> bool {
        let before = self.entries.len();
        self.entries.retain(|entry| entry.id != id);
        self.entries.len() != before
    }

    pub(crate) fn contains(&self, id: ListenerId) -> bool {
        self.entries.iter().any(|entry| entry.id == id)
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    pub(crate) fn count_for(&self, target: EventTarget) -> usize {
        self.entries.iter().filter(|entry| entry.target == target).count()
    }

    /// Snapshot handlers for one target and phase.
    ///
    /// `capture: None` selects every listener on the target (the at-target phase).
    pub(crate) fn matching(
        &self,
        target: EventTarget,
        kind: EventKind,
        capture: Option<bool>,
    ) -> Vec<(ListenerId, EventHandler)> {
        self.entries
            .iter()
            .filter(|entry| entry.target == target && entry.kind == kind)
            .filter(|entry| capture.is_none_or(|capture| entry.capture == capture))
            .map(|entry| (entry.id, entry.handler.clone()))
            .collect()
    }
}
