//! Document - Element arena, attributes, focus and event dispatch.
//!
//! Elements are indices into an arena owned by the document:
//!
//! ```text
//! Index 0: html (parent=None)
//! Index 1: body (parent=0)
//! Index 2: button (parent=1, attrs={role: "button"}, rect=...)
//! ```
//!
//! Indices are never recycled, so a stale [`ElementId`] can never alias an
//! element created later. Removing an element detaches its subtree; detached
//! elements keep their data but are no longer connected, cannot take focus and
//! do not appear in `descendants` of the body.
//!
//! # Example
//!
//! ```ignore
//! use spark_headless::dom::Document;
//!
//! let doc = Document::new();
//! let button = doc.create_child(doc.body(), "button");
//! doc.set_attribute(button, "aria-pressed", "false");
//! doc.focus(button);
//! assert_eq!(doc.active_element(), Some(button));
//! ```

use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;
use std::rc::Rc;

use super::event::{Event, EventHandler, EventKind, EventTarget, ListenerId, ListenerRegistry};
use crate::error::{Error, Result};
use crate::state::keyboard::KeyboardEvent;
use crate::types::{Rect, Viewport};

// =============================================================================
// Element
// =============================================================================

/// Handle to an element owned by a [`Document`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ElementId(usize);

impl ElementId {
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for ElementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Default)]
struct ElementData {
    tag: String,
    parent: Option<ElementId>,
    children: Vec<ElementId>,
    attributes: BTreeMap<String, String>,
    classes: BTreeSet<String>,
    styles: BTreeMap<String, String>,
    text: String,
    value: String,
    rect: Rect,
}

// =============================================================================
// Document State
// =============================================================================

struct DocumentState {
    elements: Vec<ElementData>,
    root: ElementId,
    body: ElementId,
    active: Option<ElementId>,
    viewport: Viewport,
    listeners: ListenerRegistry,
    /// (element, part) -> owning instance id
    claims: HashMap<(ElementId, &'static str), String>,
}

impl DocumentState {
    fn get(&self, element: ElementId) -> Option<&ElementData> {
        self.elements.get(element.0)
    }

    fn get_mut(&mut self, element: ElementId) -> Option<&mut ElementData> {
        self.elements.get_mut(element.0)
    }

    fn alloc(&mut self, tag: &str, parent: Option<ElementId>) -> ElementId {
        let id = ElementId(self.elements.len());
        self.elements.push(ElementData {
            tag: tag.to_ascii_lowercase(),
            parent,
            ..Default::default()
        });
        if let Some(parent) = parent {
            if let Some(data) = self.get_mut(parent) {
                data.children.push(id);
            }
        }
        id
    }

    fn is_inclusive_ancestor(&self, ancestor: ElementId, mut node: ElementId) -> bool {
        loop {
            if node == ancestor {
                return true;
            }
            match self.get(node).and_then(|data| data.parent) {
                Some(parent) => node = parent,
                None => return false,
            }
        }
    }

    fn is_connected(&self, element: ElementId) -> bool {
        self.get(element).is_some() && self.is_inclusive_ancestor(self.root, element)
    }

    fn detach(&mut self, element: ElementId) {
        let parent = self.get(element).and_then(|data| data.parent);
        if let Some(parent) = parent {
            if let Some(data) = self.get_mut(parent) {
                data.children.retain(|&child| child != element);
            }
        }
        if let Some(data) = self.get_mut(element) {
            data.parent = None;
        }
    }

    /// Ancestors of `element`, nearest first (excluding the element itself).
    fn ancestors(&self, element: ElementId) -> Vec<ElementId> {
        let mut result = Vec::new();
        let mut current = self.get(element).and_then(|data| data.parent);
        while let Some(node) = current {
            result.push(node);
            current = self.get(node).and_then(|data| data.parent);
        }
        result
    }

    fn collect_descendants(&self, element: ElementId, out: &mut Vec<ElementId>) {
        if let Some(data) = self.get(element) {
            for &child in &data.children {
                out.push(child);
                self.collect_descendants(child, out);
            }
        }
    }

    fn collect_text(&self, element: ElementId, out: &mut String) {
        if let Some(data) = self.get(element) {
            out.push_str(&data.text);
            for &child in &data.children {
                self.collect_text(child, out);
            }
        }
    }
}

// =============================================================================
// Document Handle
// =============================================================================

/// Shared handle to an in-memory document.
///
/// Cloning the handle shares the same document.
#[derive(Clone)]
pub struct Document {
    inner: Rc<RefCell<DocumentState>>,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.inner.borrow();
        f.debug_struct("Document")
            .field("elements", &state.elements.len())
            .field("active", &state.active)
            .field("viewport", &state.viewport)
            .finish()
    }
}

impl Document {
    /// Create a document with `<html><body></body></html>` and the default viewport.
    pub fn new() -> Self {
        Self::with_viewport(Viewport::default())
    }

    pub fn with_viewport(viewport: Viewport) -> Self {
        let mut state = DocumentState {
            elements: Vec::new(),
            root: ElementId(0),
            body: ElementId(0),
            active: None,
            viewport,
            listeners: ListenerRegistry::default(),
            claims: HashMap::new(),
        };
        let root = state.alloc("html", None);
        let body = state.alloc("body", Some(root));
        state.root = root;
        state.body = body;
        Self {
            inner: Rc::new(RefCell::new(state)),
        }
    }

    /// Whether two handles point at the same document.
    pub fn ptr_eq(&self, other: &Document) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    pub fn body(&self) -> ElementId {
        self.inner.borrow().body
    }

    pub fn document_element(&self) -> ElementId {
        self.inner.borrow().root
    }

    // -------------------------------------------------------------------------
    // Tree
    // -------------------------------------------------------------------------

    /// Create a detached element.
    pub fn create_element(&self, tag: &str) -> ElementId {
        self.inner.borrow_mut().alloc(tag, None)
    }

    /// Create an element and append it to `parent`.
    ///
    /// If `parent` is unknown the element is left detached.
    pub fn create_child(&self, parent: ElementId, tag: &str) -> ElementId {
        let mut state = self.inner.borrow_mut();
        let parent = state.get(parent).map(|_| parent);
        state.alloc(tag, parent)
    }

    /// Move `child` (and its subtree) to the end of `parent`'s children.
    pub fn append_child(&self, parent: ElementId, child: ElementId) -> Result<()> {
        let mut state = self.inner.borrow_mut();
        if state.get(parent).is_none() {
            return Err(Error::UnknownElement(parent));
        }
        if state.get(child).is_none() {
            return Err(Error::UnknownElement(child));
        }
        if state.is_inclusive_ancestor(child, parent) {
            return Err(Error::InvalidHierarchy { parent, child });
        }
        state.detach(child);
        if let Some(data) = state.get_mut(child) {
            data.parent = Some(parent);
        }
        if let Some(data) = state.get_mut(parent) {
            data.children.push(child);
        }
        Ok(())
    }

    /// Detach an element (and its subtree) from the tree.
    ///
    /// If focus was inside the removed subtree the document loses focus
    /// without firing blur, the way browsers behave.
    pub fn remove(&self, element: ElementId) {
        let mut state = self.inner.borrow_mut();
        if state.get(element).is_none() || element == state.root {
            return;
        }
        state.detach(element);
        if let Some(active) = state.active {
            if state.is_inclusive_ancestor(element, active) {
                state.active = None;
            }
        }
    }

    /// Whether the id was allocated by this document.
    pub fn exists(&self, element: ElementId) -> bool {
        self.inner.borrow().get(element).is_some()
    }

    /// Whether the element is attached to the document tree.
    pub fn is_connected(&self, element: ElementId) -> bool {
        self.inner.borrow().is_connected(element)
    }

    pub fn tag(&self, element: ElementId) -> Option<String> {
        self.inner.borrow().get(element).map(|data| data.tag.clone())
    }

    pub fn parent(&self, element: ElementId) -> Option<ElementId> {
        self.inner.borrow().get(element).and_then(|data| data.parent)
    }

    pub fn children(&self, element: ElementId) -> Vec<ElementId> {
        self.inner
            .borrow()
            .get(element)
            .map(|data| data.children.clone())
            .unwrap_or_default()
    }

    /// All descendants of `element` in document order (pre-order), excluding itself.
    pub fn descendants(&self, element: ElementId) -> Vec<ElementId> {
        let mut out = Vec::new();
        self.inner.borrow().collect_descendants(element, &mut out);
        out
    }

    /// Inclusive containment: an element contains itself.
    pub fn contains(&self, ancestor: ElementId, node: ElementId) -> bool {
        self.inner.borrow().is_inclusive_ancestor(ancestor, node)
    }

    // -------------------------------------------------------------------------
    // Attributes, classes, styles
    // -------------------------------------------------------------------------

    pub fn set_attribute(&self, element: ElementId, name: &str, value: impl Into<String>) {
        if let Some(data) = self.inner.borrow_mut().get_mut(element) {
            data.attributes.insert(name.to_string(), value.into());
        }
    }

    pub fn attribute(&self, element: ElementId, name: &str) -> Option<String> {
        self.inner
            .borrow()
            .get(element)
            .and_then(|data| data.attributes.get(name).cloned())
    }

    pub fn has_attribute(&self, element: ElementId, name: &str) -> bool {
        self.inner
            .borrow()
            .get(element)
            .is_some_and(|data| data.attributes.contains_key(name))
    }

    pub fn remove_attribute(&self, element: ElementId, name: &str) {
        if let Some(data) = self.inner.borrow_mut().get_mut(element) {
            data.attributes.remove(name);
        }
    }

    /// Set `name` when `value` is `Some`, remove it when `None`.
    pub fn toggle_attribute(&self, element: ElementId, name: &str, value: Option<String>) {
        match value {
            Some(value) => self.set_attribute(element, name, value),
            None => self.remove_attribute(element, name),
        }
    }

    pub fn add_class(&self, element: ElementId, class: &str) {
        if let Some(data) = self.inner.borrow_mut().get_mut(element) {
            data.classes.insert(class.to_string());
        }
    }

    pub fn remove_class(&self, element: ElementId, class: &str) {
        if let Some(data) = self.inner.borrow_mut().get_mut(element) {
            data.classes.remove(class);
        }
    }

    pub fn has_class(&self, element: ElementId, class: &str) -> bool {
        self.inner
            .borrow()
            .get(element)
            .is_some_and(|data| data.classes.contains(class))
    }

    pub fn set_style(&self, element: ElementId, property: &str, value: impl Into<String>) {
        if let Some(data) = self.inner.borrow_mut().get_mut(element) {
            data.styles.insert(property.to_string(), value.into());
        }
    }

    pub fn style(&self, element: ElementId, property: &str) -> Option<String> {
        self.inner
            .borrow()
            .get(element)
            .and_then(|data| data.styles.get(property).cloned())
    }

    pub fn remove_style(&self, element: ElementId, property: &str) {
        if let Some(data) = self.inner.borrow_mut().get_mut(element) {
            data.styles.remove(property);
        }
    }

    /// Shorthand for the `disabled` attribute.
    pub fn set_disabled(&self, element: ElementId, disabled: bool) {
        if disabled {
            self.set_attribute(element, "disabled", "");
        } else {
            self.remove_attribute(element, "disabled");
        }
    }

    pub fn is_disabled(&self, element: ElementId) -> bool {
        self.has_attribute(element, "disabled")
    }

    // -------------------------------------------------------------------------
    // Content and geometry
    // -------------------------------------------------------------------------

    /// Set the element's own text (children keep theirs).
    pub fn set_text(&self, element: ElementId, text: impl Into<String>) {
        if let Some(data) = self.inner.borrow_mut().get_mut(element) {
            data.text = text.into();
        }
    }

    /// Concatenated text of the element and its descendants.
    pub fn text_content(&self, element: ElementId) -> String {
        let mut out = String::new();
        self.inner.borrow().collect_text(element, &mut out);
        out
    }

    /// Form value (`input`, `textarea`).
    pub fn set_value(&self, element: ElementId, value: impl Into<String>) {
        if let Some(data) = self.inner.borrow_mut().get_mut(element) {
            data.value = value.into();
        }
    }

    pub fn value(&self, element: ElementId) -> Option<String> {
        self.inner.borrow().get(element).map(|data| data.value.clone())
    }

    /// Layout result reported by the host renderer.
    pub fn set_rect(&self, element: ElementId, rect: Rect) {
        if let Some(data) = self.inner.borrow_mut().get_mut(element) {
            data.rect = rect;
        }
    }

    /// Live bounding rectangle; `None` for unknown elements.
    pub fn bounding_rect(&self, element: ElementId) -> Option<Rect> {
        self.inner.borrow().get(element).map(|data| data.rect)
    }

    pub fn viewport(&self) -> Viewport {
        self.inner.borrow().viewport
    }

    /// Resize the viewport and fire `Resize` on the window.
    pub fn set_viewport(&self, viewport: Viewport) {
        self.inner.borrow_mut().viewport = viewport;
        self.dispatch(EventTarget::Window, &Event::new(EventKind::Resize));
    }

    // -------------------------------------------------------------------------
    // Focus
    // -------------------------------------------------------------------------

    pub fn active_element(&self) -> Option<ElementId> {
        self.inner.borrow().active
    }

    /// Move focus to `element`, firing `Blur` on the previous element and
    /// `Focus` on the new one.
    ///
    /// Returns `true` when focus changed. Focusing the active element or a
    /// disconnected element does nothing.
    pub fn focus(&self, element: ElementId) -> bool {
        let previous = {
            let mut state = self.inner.borrow_mut();
            if !state.is_connected(element) || state.active == Some(element) {
                return false;
            }
            let previous = state.active;
            state.active = Some(element);
            previous
        };
        if let Some(previous) = previous {
            self.dispatch(
                EventTarget::Element(previous),
                &Event::new(EventKind::Blur).with_related_target(Some(element)),
            );
        }
        self.dispatch(EventTarget::Element(element), &Event::new(EventKind::Focus));
        true
    }

    /// Clear focus, firing `Blur` on the element that had it.
    pub fn blur(&self) {
        let previous = self.inner.borrow_mut().active.take();
        if let Some(previous) = previous {
            self.dispatch(EventTarget::Element(previous), &Event::new(EventKind::Blur));
        }
    }

    // -------------------------------------------------------------------------
    // Listeners
    // -------------------------------------------------------------------------

    /// Register a bubbling-phase listener.
    pub fn add_listener(
        &self,
        target: impl Into<EventTarget>,
        kind: EventKind,
        handler: impl Fn(&Event) + 'static,
    ) -> ListenerId {
        self.add_listener_with(target, kind, false, handler)
    }

    /// Register a listener, in the capture phase when `capture` is set.
    pub fn add_listener_with(
        &self,
        target: impl Into<EventTarget>,
        kind: EventKind,
        capture: bool,
        handler: impl Fn(&Event) + 'static,
    ) -> ListenerId {
        let handler: EventHandler = Rc::new(handler);
        self.inner
            .borrow_mut()
            .listeners
            .add(target.into(), kind, capture, handler)
    }

    /// Remove a listener. Removing twice is a no-op.
    pub fn remove_listener(&self, id: ListenerId) -> bool {
        self.inner.borrow_mut().listeners.remove(id)
    }

    /// Number of registered listeners (all targets).
    pub fn listener_count(&self) -> usize {
        self.inner.borrow().listeners.len()
    }

    /// Number of listeners attached to one target.
    pub fn listener_count_for(&self, target: impl Into<EventTarget>) -> usize {
        self.inner.borrow().listeners.count_for(target.into())
    }

    // -------------------------------------------------------------------------
    // Dispatch
    // -------------------------------------------------------------------------

    /// Dispatch an event: capture phase top-down, target phase, then bubble
    /// phase bottom-up (for bubbling kinds). Element paths end at the
    /// document and window only when the element is connected.
    ///
    /// Returns `true` if a listener called `prevent_default`.
    pub fn dispatch(&self, target: impl Into<EventTarget>, event: &Event) -> bool {
        let target = target.into();
        event.set_target(target);

        // Path from the outermost target down to the parent of `target`.
        let path: Vec<EventTarget> = {
            let state = self.inner.borrow();
            match target {
                EventTarget::Window => Vec::new(),
                EventTarget::Document => vec![EventTarget::Window],
                EventTarget::Element(element) => {
                    let mut path: Vec<EventTarget> = state
                        .ancestors(element)
                        .into_iter()
                        .rev()
                        .map(EventTarget::Element)
                        .collect();
                    if state.is_connected(element) {
                        path.insert(0, EventTarget::Document);
                        path.insert(0, EventTarget::Window);
                    }
                    path
                }
            }
        };

        for &node in &path {
            self.invoke(node, event, Some(true));
            if event.propagation_stopped() {
                return event.default_prevented();
            }
        }

        self.invoke(target, event, None);
        if event.propagation_stopped() {
            return event.default_prevented();
        }

        if event.kind().bubbles() {
            for &node in path.iter().rev() {
                self.invoke(node, event, Some(false));
                if event.propagation_stopped() {
                    break;
                }
            }
        }

        event.default_prevented()
    }

    fn invoke(&self, target: EventTarget, event: &Event, capture: Option<bool>) {
        let handlers = self
            .inner
            .borrow()
            .listeners
            .matching(target, event.kind(), capture);
        for (id, handler) in handlers {
            // A handler earlier in this phase may have removed this listener.
            if !self.inner.borrow().listeners.contains(id) {
                continue;
            }
            handler(event);
        }
    }

    // -------------------------------------------------------------------------
    // Host event helpers
    // -------------------------------------------------------------------------

    /// Dispatch a click. Returns whether default was prevented.
    pub fn click(&self, element: ElementId) -> bool {
        self.dispatch(element, &Event::new(EventKind::Click))
    }

    /// Dispatch a key press by key name. Returns whether default was prevented.
    pub fn key_down(&self, element: ElementId, key: &str) -> bool {
        self.key_down_with(element, KeyboardEvent::new(key))
    }

    /// Dispatch a KeyDown for `key`. Key releases are not key presses and
    /// dispatch nothing.
    pub fn key_down_with(&self, element: ElementId, key: KeyboardEvent) -> bool {
        if !key.is_press() {
            return false;
        }
        self.dispatch(element, &Event::key_down(key))
    }

    /// Press on an element (fires before focus and click in a real pointer sequence).
    pub fn pointer_down(&self, element: ElementId) -> bool {
        self.dispatch(element, &Event::new(EventKind::PointerDown))
    }

    pub fn pointer_enter(&self, element: ElementId) {
        self.dispatch(element, &Event::new(EventKind::PointerEnter));
    }

    /// Pointer leaves `element`, moving onto `related` (if any).
    pub fn pointer_leave(&self, element: ElementId, related: Option<ElementId>) {
        self.dispatch(
            element,
            &Event::new(EventKind::PointerLeave).with_related_target(related),
        );
    }

    /// Write a form value and fire `Input`.
    pub fn input(&self, element: ElementId, value: &str) {
        self.set_value(element, value);
        self.dispatch(element, &Event::input(value));
    }

    pub fn scroll(&self, target: impl Into<EventTarget>) {
        self.dispatch(target, &Event::new(EventKind::Scroll));
    }

    /// Image finished loading.
    pub fn load(&self, element: ElementId) {
        self.dispatch(element, &Event::new(EventKind::Load));
    }

    /// Image failed to load.
    pub fn fail(&self, element: ElementId) {
        self.dispatch(element, &Event::new(EventKind::Error));
    }

    // -------------------------------------------------------------------------
    // Binding claims
    // -------------------------------------------------------------------------

    /// Claim `element` as `part` for instance `owner`.
    ///
    /// Returns `Ok(true)` for a fresh claim, `Ok(false)` when the same owner
    /// already holds it, and `ConflictingBinding` when another owner does.
    pub fn claim(&self, element: ElementId, part: &'static str, owner: &str) -> Result<bool> {
        let mut state = self.inner.borrow_mut();
        if state.get(element).is_none() {
            return Err(Error::UnknownElement(element));
        }
        match state.claims.get(&(element, part)) {
            Some(existing) if existing == owner => Ok(false),
            Some(existing) => Err(Error::ConflictingBinding {
                element,
                part,
                owner: existing.clone(),
            }),
            None => {
                state.claims.insert((element, part), owner.to_string());
                Ok(true)
            }
        }
    }

    /// Release a claim held by `owner`. Releasing twice is a no-op.
    pub fn release_claim(&self, element: ElementId, part: &'static str, owner: &str) {
        let mut state = self.inner.borrow_mut();
        if state.claims.get(&(element, part)).is_some_and(|existing| existing == owner) {
            state.claims.remove(&(element, part));
        }
    }

    pub fn claim_owner(&self, element: ElementId, part: &'static str) -> Option<String> {
        self.inner.borrow().claims.get(&(element, part)).cloned()
    }
}
