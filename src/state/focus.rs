//! Focus System - Focusable queries, focus trap and focus restoration
//!
//! Manages focus inside a [`Document`]:
//! - focusable enumeration (document order)
//! - focus trapping for modals and open menus (Tab/Shift+Tab wrap)
//! - focus snapshots for restoration on close
//! - deterministic focus notification
//!
//! # Example
//!
//! ```ignore
//! use spark_headless::state::focus::{FocusSnapshot, FocusTrap};
//!
//! let snapshot = FocusSnapshot::capture(&doc, true);
//! let trap = FocusTrap::attach(&doc, dialog);
//! // ... dialog is open ...
//! trap.release();
//! snapshot.restore(&doc, Some(trigger));
//! ```

use std::cell::Cell;
use std::fmt;

use crate::dom::{Document, ElementId, Event, EventKind, ListenerId};

// =============================================================================
// FOCUSABLE QUERIES
// =============================================================================

fn is_form_control(tag: &str) -> bool {
    matches!(tag, "button" | "input" | "select" | "textarea")
}

/// Whether `element` can take keyboard focus.
///
/// Matches links with an `href`, enabled form controls (hidden inputs
/// excluded) and anything with a non-negative `tabindex`.
pub fn is_focusable(doc: &Document, element: ElementId) -> bool {
    let Some(tag) = doc.tag(element) else {
        return false;
    };

    if tag == "a" && doc.has_attribute(element, "href") {
        return true;
    }

    if is_form_control(&tag) && !doc.is_disabled(element) {
        let hidden_input =
            tag == "input" && doc.attribute(element, "type").as_deref() == Some("hidden");
        if !hidden_input {
            return true;
        }
    }

    doc.attribute(element, "tabindex")
        .and_then(|value| value.trim().parse::<i32>().ok())
        .is_some_and(|index| index >= 0)
}

/// Focusable descendants of `container`, in document order.
pub fn focusable_elements(doc: &Document, container: ElementId) -> Vec<ElementId> {
    doc.descendants(container)
        .into_iter()
        .filter(|&element| is_focusable(doc, element))
        .collect()
}

pub fn first_focusable(doc: &Document, container: ElementId) -> Option<ElementId> {
    focusable_elements(doc, container).first().copied()
}

pub fn last_focusable(doc: &Document, container: ElementId) -> Option<ElementId> {
    focusable_elements(doc, container).last().copied()
}

// =============================================================================
// FOCUS WITH NOTIFICATION
// =============================================================================

/// Focus `element` and guarantee exactly one `Focus` notification.
///
/// If the element already holds focus the document does not fire again, so
/// the event is redispatched so listeners still observe the move.
/// Returns `false` for elements that cannot receive focus (detached, unknown).
pub fn focus_and_notify(doc: &Document, element: ElementId) -> bool {
    if !doc.is_connected(element) {
        return false;
    }
    if !doc.focus(element) {
        doc.dispatch(element, &Event::new(EventKind::Focus));
    }
    true
}

// =============================================================================
// FOCUS TRAP (for modals/dialogs)
// =============================================================================

/// Keeps Tab/Shift+Tab cycling inside a container while attached.
///
/// Tab on the last focusable wraps to the first, Shift+Tab on the first wraps
/// to the last. A container without focusable descendants is left alone.
pub struct FocusTrap {
    doc: Document,
    container: ElementId,
    listener: Cell<Option<ListenerId>>,
}

impl fmt::Debug for FocusTrap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FocusTrap")
            .field("container", &self.container)
            .field("active", &self.is_active())
            .finish()
    }
}

impl FocusTrap {
    pub fn attach(doc: &Document, container: ElementId) -> Self {
        let trap_doc = doc.clone();
        let listener = doc.add_listener(container, EventKind::KeyDown, move |event| {
            handle_trap_key(&trap_doc, container, event);
        });
        tracing::trace!(%container, "focus trap attached");
        Self {
            doc: doc.clone(),
            container,
            listener: Cell::new(Some(listener)),
        }
    }

    pub fn container(&self) -> ElementId {
        self.container
    }

    pub fn is_active(&self) -> bool {
        self.listener.get().is_some()
    }

    /// Detach the trap. Releasing twice is a no-op.
    pub fn release(&self) {
        if let Some(listener) = self.listener.take() {
            self.doc.remove_listener(listener);
            tracing::trace!(container = %self.container, "focus trap released");
        }
    }
}

impl Drop for FocusTrap {
    fn drop(&mut self) {
        self.release();
    }
}

fn handle_trap_key(doc: &Document, container: ElementId, event: &Event) {
    let Some(key) = &event.key else { return };
    if key.key != "Tab" {
        return;
    }

    let focusables = focusable_elements(doc, container);
    let (Some(&first), Some(&last)) = (focusables.first(), focusables.last()) else {
        return;
    };

    let active = doc.active_element();
    let inside = active.is_some_and(|active| focusables.contains(&active));

    let target = if key.modifiers.shift {
        (!inside || active == Some(first)).then_some(last)
    } else {
        (!inside || active == Some(last)).then_some(first)
    };

    if let Some(target) = target {
        event.prevent_default();
        focus_and_notify(doc, target);
    }
}

// =============================================================================
// FOCUS SNAPSHOT (for restoration)
// =============================================================================

/// The element that had focus when an overlay opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FocusSnapshot {
    pub previously_focused: Option<ElementId>,
    pub restore_on_close: bool,
}

impl FocusSnapshot {
    pub fn capture(doc: &Document, restore_on_close: bool) -> Self {
        Self {
            previously_focused: doc.active_element(),
            restore_on_close,
        }
    }

    /// Consume the snapshot, refocusing the saved element (or `fallback` when
    /// the saved one is gone). Returns `true` if focus was restored.
    pub fn restore(self, doc: &Document, fallback: Option<ElementId>) -> bool {
        if !self.restore_on_close {
            return false;
        }
        let target = self
            .previously_focused
            .filter(|&element| doc.is_connected(element))
            .or(fallback.filter(|&element| doc.is_connected(element)));
        match target {
            Some(element) => focus_and_notify(doc, element),
            None => false,
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::keyboard::{KeyboardEvent, Modifiers};
    use std::rc::Rc;

    fn dialog(doc: &Document) -> (ElementId, ElementId, ElementId, ElementId) {
        let container = doc.create_child(doc.body(), "div");
        let first = doc.create_child(container, "button");
        let middle = doc.create_child(container, "input");
        let last = doc.create_child(container, "a");
        doc.set_attribute(last, "href", "#");
        (container, first, middle, last)
    }

    #[test]
    fn test_focusable_enumeration() {
        let doc = Document::new();
        let container = doc.create_child(doc.body(), "div");
        let link = doc.create_child(container, "a");
        doc.set_attribute(link, "href", "/home");
        let bare_link = doc.create_child(container, "a");
        let disabled = doc.create_child(container, "button");
        doc.set_disabled(disabled, true);
        let hidden = doc.create_child(container, "input");
        doc.set_attribute(hidden, "type", "hidden");
        let nested = doc.create_child(container, "div");
        let select = doc.create_child(nested, "select");
        let tabbable = doc.create_child(container, "span");
        doc.set_attribute(tabbable, "tabindex", "0");
        let untabbable = doc.create_child(container, "span");
        doc.set_attribute(untabbable, "tabindex", "-1");
        let area = doc.create_child(container, "textarea");

        assert_eq!(
            focusable_elements(&doc, container),
            vec![link, select, tabbable, area]
        );
        assert!(!is_focusable(&doc, bare_link));
    }

    #[test]
    fn test_trap_wraps_both_directions() {
        let doc = Document::new();
        let (container, first, _, last) = dialog(&doc);
        let _trap = FocusTrap::attach(&doc, container);

        doc.focus(last);
        assert!(doc.key_down(last, "Tab"));
        assert_eq!(doc.active_element(), Some(first));

        let shift_tab = KeyboardEvent::with_modifiers("Tab", Modifiers::shift());
        assert!(doc.key_down_with(first, shift_tab));
        assert_eq!(doc.active_element(), Some(last));
    }

    #[test]
    fn test_trap_leaves_inner_tabs_alone() {
        let doc = Document::new();
        let (container, first, _, _) = dialog(&doc);
        let _trap = FocusTrap::attach(&doc, container);

        doc.focus(first);
        assert!(!doc.key_down(first, "Tab"));
        assert_eq!(doc.active_element(), Some(first));
    }

    #[test]
    fn test_trap_on_empty_container_is_noop() {
        let doc = Document::new();
        let container = doc.create_child(doc.body(), "div");
        let _trap = FocusTrap::attach(&doc, container);
        doc.set_attribute(container, "tabindex", "-1");
        doc.focus(container);
        assert!(!doc.key_down(container, "Tab"));
    }

    #[test]
    fn test_trap_release_is_idempotent() {
        let doc = Document::new();
        let (container, first, _, last) = dialog(&doc);
        let trap = FocusTrap::attach(&doc, container);
        trap.release();
        trap.release();
        assert!(!trap.is_active());
        assert_eq!(doc.listener_count(), 0);

        doc.focus(last);
        doc.key_down(last, "Tab");
        assert_ne!(doc.active_element(), Some(first));
    }

    #[test]
    fn test_snapshot_restores_previous_focus() {
        let doc = Document::new();
        let outside = doc.create_child(doc.body(), "button");
        let (_, first, _, _) = dialog(&doc);
        doc.focus(outside);

        let snapshot = FocusSnapshot::capture(&doc, true);
        doc.focus(first);
        assert!(snapshot.restore(&doc, None));
        assert_eq!(doc.active_element(), Some(outside));
    }

    #[test]
    fn test_snapshot_falls_back_when_element_removed() {
        let doc = Document::new();
        let outside = doc.create_child(doc.body(), "button");
        let trigger = doc.create_child(doc.body(), "button");
        doc.focus(outside);

        let snapshot = FocusSnapshot::capture(&doc, true);
        doc.remove(outside);
        assert!(snapshot.restore(&doc, Some(trigger)));
        assert_eq!(doc.active_element(), Some(trigger));
    }

    #[test]
    fn test_snapshot_without_restore() {
        let doc = Document::new();
        let outside = doc.create_child(doc.body(), "button");
        let inside = doc.create_child(doc.body(), "button");
        doc.focus(outside);
        let snapshot = FocusSnapshot::capture(&doc, false);
        doc.focus(inside);
        assert!(!snapshot.restore(&doc, Some(outside)));
        assert_eq!(doc.active_element(), Some(inside));
    }

    #[test]
    fn test_focus_and_notify_fires_once() {
        let doc = Document::new();
        let button = doc.create_child(doc.body(), "button");
        let count = Rc::new(Cell::new(0));
        let c = count.clone();
        doc.add_listener(button, EventKind::Focus, move |_| c.set(c.get() + 1));

        assert!(focus_and_notify(&doc, button));
        assert_eq!(count.get(), 1);
        assert!(focus_and_notify(&doc, button));
        assert_eq!(count.get(), 2);

        let orphan = doc.create_element("button");
        assert!(!focus_and_notify(&doc, orphan));
    }
}
