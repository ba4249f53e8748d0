//! Modal - Dialog with focus trap, scroll lock and focus restoration.
//!
//! # Lifecycle
//!
//! ```text
//! closed --open()--> opening --> open --close()--> closing --> closed
//!                                  ^                  |
//!                                  +---- denied ------+
//! ```
//!
//! `open()` captures the focused element, takes a share of the scroll lock,
//! focuses the initial target and traps Tab inside the content. `close()`
//! asks the `on_before_close` guard (which may answer later through a
//! [`PendingClose`]), then releases the lock and restores focus before
//! returning. Escape, outside pointer presses and the close button all route
//! to `close()`.
//!
//! # Example
//!
//! ```ignore
//! let modal = Modal::new(host.clone(), ModalConfig::default());
//! let _trigger = modal.trigger(open_button)?;
//! let _content = modal.content(dialog)?;
//! modal.open();
//! assert_eq!(modal.close(), CloseOutcome::Closed);
//! assert_eq!(doc.active_element(), Some(open_button));
//! ```

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

use serde::Deserialize;

use crate::dom::{Document, ElementId, Event, EventKind, EventTarget, Host, ListenerId};
use crate::error::{Error, Result};
use crate::state::focus::{first_focusable, focus_and_notify, FocusSnapshot, FocusTrap};
use crate::state::keyboard::is_escape_key;
use crate::state::store::StateStore;

use super::id::resolve_id;
use super::lifecycle::InstanceCore;
use super::types::{Binding, DestroyCallback, OpenChangeCallback};

const TRIGGER: &str = "modal-trigger";
const OVERLAY: &str = "modal-overlay";
const CONTENT: &str = "modal-content";
const TITLE: &str = "modal-title";
const DESCRIPTION: &str = "modal-description";
const CLOSE: &str = "modal-close";

const TRIGGER_ATTRIBUTES: &[&str] = &["aria-haspopup", "aria-expanded", "aria-controls", "data-state"];
const OVERLAY_ATTRIBUTES: &[&str] = &["aria-hidden", "data-state", "hidden"];
const CONTENT_ATTRIBUTES: &[&str] = &[
    "id",
    "role",
    "aria-modal",
    "aria-labelledby",
    "aria-describedby",
    "tabindex",
    "data-state",
    "hidden",
];
const LABEL_ATTRIBUTES: &[&str] = &["id"];
const CLOSE_ATTRIBUTES: &[&str] = &["aria-label"];

// =============================================================================
// CONFIG
// =============================================================================

/// ARIA role of the dialog content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModalRole {
    #[default]
    Dialog,
    AlertDialog,
}

impl ModalRole {
    pub fn as_str(self) -> &'static str {
        match self {
            ModalRole::Dialog => "dialog",
            ModalRole::AlertDialog => "alertdialog",
        }
    }
}

/// Answer of an `on_before_close` guard.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseDecision {
    Allow,
    Deny,
    /// The guard keeps the [`PendingClose`] and resolves it later.
    Pending,
}

/// Result of a close request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseOutcome {
    Closed,
    AlreadyClosed,
    Denied,
    Pending,
}

/// Guard consulted before closing.
pub type BeforeCloseCallback = Rc<dyn Fn(PendingClose) -> CloseDecision>;

#[derive(Clone, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ModalConfig {
    pub id: Option<String>,
    /// Open immediately on construction.
    pub open: bool,
    pub role: ModalRole,
    pub close_on_escape: bool,
    pub close_on_outside_click: bool,
    pub lock_scroll: bool,
    pub trap_focus: bool,
    pub return_focus: bool,
    /// Defaults to `{id}-title`.
    pub labelled_by: Option<String>,
    /// Defaults to `{id}-description`.
    pub described_by: Option<String>,
    #[serde(skip)]
    pub initial_focus: Option<ElementId>,
    #[serde(skip)]
    pub on_open_change: Option<OpenChangeCallback>,
    #[serde(skip)]
    pub on_before_close: Option<BeforeCloseCallback>,
    #[serde(skip)]
    pub on_destroy: Option<DestroyCallback>,
}

impl Default for ModalConfig {
    fn default() -> Self {
        Self {
            id: None,
            open: false,
            role: ModalRole::Dialog,
            close_on_escape: true,
            close_on_outside_click: true,
            lock_scroll: true,
            trap_focus: true,
            return_focus: true,
            labelled_by: None,
            described_by: None,
            initial_focus: None,
            on_open_change: None,
            on_before_close: None,
            on_destroy: None,
        }
    }
}

// =============================================================================
// PHASE
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModalPhase {
    Closed,
    Opening,
    Open,
    Closing,
}

impl ModalPhase {
    pub fn as_str(self) -> &'static str {
        match self {
            ModalPhase::Closed => "closed",
            ModalPhase::Opening => "opening",
            ModalPhase::Open => "open",
            ModalPhase::Closing => "closing",
        }
    }

    fn parse(value: &str) -> Self {
        match value {
            "opening" => ModalPhase::Opening,
            "open" => ModalPhase::Open,
            "closing" => ModalPhase::Closing,
            _ => ModalPhase::Closed,
        }
    }
}

// =============================================================================
// PENDING CLOSE
// =============================================================================

/// A close request waiting on an asynchronous guard.
///
/// Only the most recent request can resolve; older handles are stale.
#[derive(Clone)]
pub struct PendingClose {
    modal: Weak<ModalInner>,
    generation: u64,
}

impl fmt::Debug for PendingClose {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PendingClose")
            .field("generation", &self.generation)
            .field("current", &self.is_current())
            .finish()
    }
}

impl PendingClose {
    /// Whether this handle can still decide the close.
    pub fn is_current(&self) -> bool {
        self.modal().is_some_and(|modal| {
            modal.phase() == ModalPhase::Closing
                && modal.inner.generation.get() == self.generation
        })
    }

    fn modal(&self) -> Option<Modal> {
        Modal::upgrade(&self.modal)
    }

    /// Finish closing. Returns `true` if the modal closed.
    pub fn allow(self) -> bool {
        self.resolve(Ok(true)).unwrap_or(false)
    }

    /// Keep the modal open.
    pub fn deny(self) {
        let _ = self.resolve(Ok(false));
    }

    /// Settle the request. A failed guard keeps the modal open and hands the
    /// error back to the caller.
    pub fn resolve(self, decision: Result<bool>) -> Result<bool> {
        if !self.is_current() {
            return Ok(false);
        }
        let Some(modal) = self.modal() else {
            return Ok(false);
        };
        match decision {
            Ok(true) => {
                modal.finish_close();
                Ok(true)
            }
            Ok(false) => {
                modal.set_phase(ModalPhase::Open);
                tracing::debug!(id = %modal.id(), "close denied");
                Ok(false)
            }
            Err(error) => {
                modal.set_phase(ModalPhase::Open);
                tracing::warn!(id = %modal.id(), %error, "close guard failed");
                Err(error)
            }
        }
    }

    /// Shorthand for a guard that failed with `message`.
    pub fn fail(self, message: impl Into<String>) -> Result<bool> {
        self.resolve(Err(Error::Callback(message.into())))
    }
}

// =============================================================================
// MODAL
// =============================================================================

#[derive(Debug, Clone, Copy, Default)]
struct ModalParts {
    trigger: Option<ElementId>,
    overlay: Option<ElementId>,
    content: Option<ElementId>,
    title: Option<ElementId>,
    description: Option<ElementId>,
}

struct ModalInner {
    core: InstanceCore,
    config: RefCell<ModalConfig>,
    state: StateStore,
    parts: Cell<ModalParts>,
    snapshot: Cell<Option<FocusSnapshot>>,
    trap: RefCell<Option<FocusTrap>>,
    outside_listener: Cell<Option<ListenerId>>,
    generation: Cell<u64>,
}

/// Headless modal dialog. Cloning shares the instance.
#[derive(Clone)]
pub struct Modal {
    inner: Rc<ModalInner>,
}

impl Modal {
    pub fn new(host: Host, config: ModalConfig) -> Self {
        let id = resolve_id(config.id.as_deref(), "modal");
        let state = StateStore::builder()
            .field("open", false)
            .field("phase", ModalPhase::Closed.as_str())
            .build();
        let core = InstanceCore::new(host, id, config.on_destroy.clone());
        let open = config.open;

        let modal = Self {
            inner: Rc::new(ModalInner {
                core,
                config: RefCell::new(config),
                state,
                parts: Cell::new(ModalParts::default()),
                snapshot: Cell::new(None),
                trap: RefCell::new(None),
                outside_listener: Cell::new(None),
                generation: Cell::new(0),
            }),
        };

        let weak = Rc::downgrade(&modal.inner);
        modal.inner.state.bind_dom_sync(move |_| {
            if let Some(modal) = Self::upgrade(&weak) {
                modal.sync_dom();
            }
        });

        if open {
            modal.open();
        }
        modal
    }

    fn upgrade(weak: &Weak<ModalInner>) -> Option<Self> {
        weak.upgrade().map(|inner| Self { inner })
    }

    fn weak(&self) -> Weak<ModalInner> {
        Rc::downgrade(&self.inner)
    }

    pub fn id(&self) -> &str {
        self.inner.core.id()
    }

    pub fn state(&self) -> &StateStore {
        &self.inner.state
    }

    pub fn is_open(&self) -> bool {
        self.inner.state.get_bool("open").unwrap_or(false)
    }

    pub fn phase(&self) -> ModalPhase {
        self.inner
            .state
            .get_str("phase")
            .ok()
            .flatten()
            .map(|phase| ModalPhase::parse(&phase))
            .unwrap_or(ModalPhase::Closed)
    }

    fn set_phase(&self, phase: ModalPhase) {
        let _ = self.inner.state.set("phase", phase.as_str());
    }

    pub fn content_id(&self) -> String {
        self.inner.core.part_id("content")
    }

    pub fn title_id(&self) -> String {
        self.inner
            .config
            .borrow()
            .labelled_by
            .clone()
            .unwrap_or_else(|| self.inner.core.part_id("title"))
    }

    pub fn description_id(&self) -> String {
        self.inner
            .config
            .borrow()
            .described_by
            .clone()
            .unwrap_or_else(|| self.inner.core.part_id("description"))
    }

    fn update_parts(&self, update: impl FnOnce(&mut ModalParts)) {
        let mut parts = self.inner.parts.get();
        update(&mut parts);
        self.inner.parts.set(parts);
    }

    // -------------------------------------------------------------------------
    // Parts
    // -------------------------------------------------------------------------

    /// Element that opens the modal when clicked.
    pub fn trigger(&self, element: ElementId) -> Result<Binding> {
        let core = &self.inner.core;
        if core.bind_part(element, TRIGGER)? {
            let weak = self.weak();
            core.listen_part(element, TRIGGER, element, EventKind::Click, move |_| {
                if let Some(modal) = Self::upgrade(&weak) {
                    modal.open();
                }
            });
        }
        self.update_parts(|parts| parts.trigger = Some(element));
        self.sync_dom();
        Ok(self.unbind_on_destroy(element, TRIGGER, TRIGGER_ATTRIBUTES, |parts| &mut parts.trigger))
    }

    /// Backdrop. Clicking the backdrop itself closes the modal.
    pub fn overlay(&self, element: ElementId) -> Result<Binding> {
        let core = &self.inner.core;
        if core.bind_part(element, OVERLAY)? {
            let weak = self.weak();
            core.listen_part(element, OVERLAY, element, EventKind::Click, move |event| {
                let Some(modal) = Self::upgrade(&weak) else { return };
                let on_backdrop = event.target_element() == Some(element);
                if on_backdrop && modal.inner.config.borrow().close_on_outside_click {
                    modal.close();
                }
            });
        }
        self.update_parts(|parts| parts.overlay = Some(element));
        self.sync_dom();
        Ok(self.unbind_on_destroy(element, OVERLAY, OVERLAY_ATTRIBUTES, |parts| &mut parts.overlay))
    }

    /// The dialog surface: role, labelling, Escape and the focus trap.
    pub fn content(&self, element: ElementId) -> Result<Binding> {
        let core = &self.inner.core;
        if core.bind_part(element, CONTENT)? {
            let weak = self.weak();
            core.listen_part(element, CONTENT, element, EventKind::KeyDown, move |event| {
                if let Some(modal) = Self::upgrade(&weak) {
                    modal.handle_content_key(event);
                }
            });
        }
        self.update_parts(|parts| parts.content = Some(element));
        self.sync_dom();
        if self.is_open() {
            // Content mounted after open(): focus has not moved in yet.
            let focus_inside = self.inner.core.document().is_some_and(|doc| {
                doc.active_element().is_some_and(|active| doc.contains(element, active))
            });
            if !focus_inside {
                let initial = self.inner.config.borrow().initial_focus;
                self.focus_initial(initial);
            }
            self.attach_trap();
        }
        Ok(self.unbind_on_destroy(element, CONTENT, CONTENT_ATTRIBUTES, |parts| &mut parts.content))
    }

    /// Heading referenced by `aria-labelledby`.
    pub fn title(&self, element: ElementId) -> Result<Binding> {
        self.inner.core.bind_part(element, TITLE)?;
        self.update_parts(|parts| parts.title = Some(element));
        self.sync_dom();
        Ok(self.unbind_on_destroy(element, TITLE, LABEL_ATTRIBUTES, |parts| &mut parts.title))
    }

    /// Text referenced by `aria-describedby`.
    pub fn description(&self, element: ElementId) -> Result<Binding> {
        self.inner.core.bind_part(element, DESCRIPTION)?;
        self.update_parts(|parts| parts.description = Some(element));
        self.sync_dom();
        Ok(self.unbind_on_destroy(element, DESCRIPTION, LABEL_ATTRIBUTES, |parts| {
            &mut parts.description
        }))
    }

    /// Button that closes the modal.
    pub fn close_button(&self, element: ElementId) -> Result<Binding> {
        let core = &self.inner.core;
        if core.bind_part(element, CLOSE)? {
            let weak = self.weak();
            core.listen_part(element, CLOSE, element, EventKind::Click, move |_| {
                if let Some(modal) = Self::upgrade(&weak) {
                    modal.close();
                }
            });
            if let Some(doc) = core.document() {
                if !doc.has_attribute(element, "aria-label") {
                    doc.set_attribute(element, "aria-label", "Close");
                }
            }
        }
        let weak = self.weak();
        Ok(Binding::from_destroy(move || {
            if let Some(modal) = Self::upgrade(&weak) {
                modal.inner.core.unbind_part(element, CLOSE, CLOSE_ATTRIBUTES);
            }
        }))
    }

    fn unbind_on_destroy(
        &self,
        element: ElementId,
        part: &'static str,
        attributes: &'static [&'static str],
        slot: fn(&mut ModalParts) -> &mut Option<ElementId>,
    ) -> Binding {
        let weak = self.weak();
        Binding::from_destroy(move || {
            let Some(modal) = Self::upgrade(&weak) else { return };
            modal.inner.core.unbind_part(element, part, attributes);
            modal.update_parts(|parts| {
                let current = slot(parts);
                if *current == Some(element) {
                    *current = None;
                }
            });
            if part == CONTENT {
                if let Some(trap) = modal.inner.trap.borrow_mut().take() {
                    trap.release();
                }
            }
        })
    }

    fn handle_content_key(&self, event: &Event) {
        let Some(key) = &event.key else { return };
        if is_escape_key(&key.key) && self.inner.config.borrow().close_on_escape {
            event.prevent_default();
            event.stop_propagation();
            self.close();
        }
    }

    fn handle_outside_pointer(&self, event: &Event) {
        if !self.inner.config.borrow().close_on_outside_click {
            return;
        }
        let Some(doc) = self.inner.core.document() else { return };
        let Some(target) = event.target_element() else { return };
        let parts = self.inner.parts.get();
        let inside = |element: Option<ElementId>| element.is_some_and(|el| doc.contains(el, target));
        if inside(parts.content) || inside(parts.trigger) {
            return;
        }
        if inside_other_open_dialog(doc, target, parts.content) {
            return;
        }
        self.close();
    }

    // -------------------------------------------------------------------------
    // Helpers
    // -------------------------------------------------------------------------

    /// Open the modal. Returns `false` if it was not closed.
    pub fn open(&self) -> bool {
        if self.inner.core.is_destroyed() || self.phase() != ModalPhase::Closed {
            return false;
        }
        self.set_phase(ModalPhase::Opening);

        let config = self.inner.config.borrow().clone();
        if let Some(doc) = self.inner.core.document() {
            self.inner
                .snapshot
                .set(Some(FocusSnapshot::capture(doc, config.return_focus)));
        }
        if config.lock_scroll {
            self.inner.core.scroll_lock().acquire();
        }

        let _ = self.inner.state.set("open", true);
        self.focus_initial(config.initial_focus);
        self.attach_trap();

        let weak = self.weak();
        let listener = self.inner.core.listen(EventTarget::Document, EventKind::PointerDown, move |event| {
            if let Some(modal) = Self::upgrade(&weak) {
                modal.handle_outside_pointer(event);
            }
        });
        self.inner.outside_listener.set(listener);

        self.set_phase(ModalPhase::Open);
        tracing::debug!(id = %self.id(), "modal opened");
        if let Some(callback) = config.on_open_change {
            callback(true);
        }
        true
    }

    /// Request a close, consulting the guard first.
    pub fn close(&self) -> CloseOutcome {
        if self.inner.core.is_destroyed() {
            return CloseOutcome::AlreadyClosed;
        }
        match self.phase() {
            ModalPhase::Closed => return CloseOutcome::AlreadyClosed,
            ModalPhase::Closing => return CloseOutcome::Pending,
            ModalPhase::Opening | ModalPhase::Open => {}
        }

        let guard = self.inner.config.borrow().on_before_close.clone();
        let Some(guard) = guard else {
            self.finish_close();
            return CloseOutcome::Closed;
        };

        let generation = self.inner.generation.get() + 1;
        self.inner.generation.set(generation);
        self.set_phase(ModalPhase::Closing);

        let pending = PendingClose {
            modal: self.weak(),
            generation,
        };
        let decision = guard(pending.clone());

        // The guard may have settled the request synchronously.
        if !pending.is_current() {
            return match self.phase() {
                ModalPhase::Closed => CloseOutcome::Closed,
                _ => CloseOutcome::Denied,
            };
        }
        match decision {
            CloseDecision::Allow => {
                self.finish_close();
                CloseOutcome::Closed
            }
            CloseDecision::Deny => {
                self.set_phase(ModalPhase::Open);
                CloseOutcome::Denied
            }
            CloseDecision::Pending => CloseOutcome::Pending,
        }
    }

    pub fn toggle(&self) {
        if self.phase() == ModalPhase::Closed {
            self.open();
        } else {
            self.close();
        }
    }

    fn finish_close(&self) {
        self.inner.core.scroll_lock().release();
        if let Some(trap) = self.inner.trap.borrow_mut().take() {
            trap.release();
        }
        if let Some(listener) = self.inner.outside_listener.take() {
            self.inner.core.unlisten([listener]);
        }

        let snapshot = self.inner.snapshot.take();
        if let (Some(snapshot), Some(doc)) = (snapshot, self.inner.core.document()) {
            snapshot.restore(doc, self.inner.parts.get().trigger);
        }

        let _ = self.inner.state.set("open", false);
        self.set_phase(ModalPhase::Closed);
        tracing::debug!(id = %self.id(), "modal closed");

        let callback = self.inner.config.borrow().on_open_change.clone();
        if let Some(callback) = callback {
            callback(false);
        }
    }

    fn focus_initial(&self, initial: Option<ElementId>) {
        let Some(doc) = self.inner.core.document() else { return };
        let Some(content) = self.inner.parts.get().content else { return };
        let target = initial
            .filter(|&el| doc.is_connected(el))
            .or_else(|| first_focusable(doc, content))
            .unwrap_or(content);
        focus_and_notify(doc, target);
    }

    fn attach_trap(&self) {
        if !self.inner.config.borrow().trap_focus || self.inner.trap.borrow().is_some() {
            return;
        }
        let Some(doc) = self.inner.core.document() else { return };
        let Some(content) = self.inner.parts.get().content else { return };
        *self.inner.trap.borrow_mut() = Some(FocusTrap::attach(doc, content));
    }

    pub fn destroy(&self) {
        if let Some(trap) = self.inner.trap.borrow_mut().take() {
            trap.release();
        }
        self.inner.snapshot.take();
        if self.inner.core.destroy() {
            self.inner.state.clear_subscribers();
        }
    }

    // -------------------------------------------------------------------------
    // DOM sync
    // -------------------------------------------------------------------------

    fn sync_dom(&self) {
        let Some(doc) = self.inner.core.document() else { return };
        let parts = self.inner.parts.get();
        let open = self.is_open();
        let data_state = if open { "open" } else { "closed" };
        let role = self.inner.config.borrow().role;

        if let Some(trigger) = parts.trigger {
            doc.set_attribute(trigger, "aria-haspopup", "dialog");
            doc.set_attribute(trigger, "aria-expanded", open.to_string());
            doc.set_attribute(trigger, "aria-controls", self.content_id());
            doc.set_attribute(trigger, "data-state", data_state);
        }
        if let Some(overlay) = parts.overlay {
            doc.set_attribute(overlay, "aria-hidden", "true");
            doc.set_attribute(overlay, "data-state", data_state);
            doc.toggle_attribute(overlay, "hidden", (!open).then(String::new));
        }
        if let Some(content) = parts.content {
            doc.set_attribute(content, "id", self.content_id());
            doc.set_attribute(content, "role", role.as_str());
            doc.set_attribute(content, "aria-modal", "true");
            doc.set_attribute(content, "aria-labelledby", self.title_id());
            doc.set_attribute(content, "aria-describedby", self.description_id());
            doc.set_attribute(content, "tabindex", "-1");
            doc.set_attribute(content, "data-state", data_state);
            doc.toggle_attribute(content, "hidden", (!open).then(String::new));
        }
        if let Some(title) = parts.title {
            doc.set_attribute(title, "id", self.title_id());
        }
        if let Some(description) = parts.description {
            doc.set_attribute(description, "id", self.description_id());
        }
    }
}

/// Whether `target` sits inside another open modal surface (a nested dialog).
fn inside_other_open_dialog(doc: &Document, target: ElementId, own: Option<ElementId>) -> bool {
    let mut current = Some(target);
    while let Some(element) = current {
        if Some(element) != own
            && doc.attribute(element, "aria-modal").as_deref() == Some("true")
            && doc.attribute(element, "data-state").as_deref() == Some("open")
        {
            return true;
        }
        current = doc.parent(element);
    }
    false
}

// =============================================================================
// TESTS
// =============================================================================
