//! Tooltip - Delayed hover/focus hint with placement.
//!
//! `show()`/`hide()` go through the configured delays; `open()`/`close()` act
//! immediately. Each delay lives in its own timer slot, so a newer request
//! always supersedes an older one:
//!
//! ```text
//! closed --show--> (open_delay) --> open --hide--> (close_delay) --> closed
//! ```
//!
//! Any close request cancels a pending open. With `interactive` set, moving
//! the pointer from the trigger onto the content keeps the tooltip open.
//!
//! # Example
//!
//! ```ignore
//! let tooltip = Tooltip::new(host.clone(), TooltipConfig::default());
//! let _t = tooltip.trigger(button)?;
//! let _c = tooltip.content(hint)?;
//! doc.pointer_enter(button);
//! host.scheduler().advance(300);
//! assert!(tooltip.is_open());
//! ```

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use serde::{Deserialize, Deserializer};

use crate::dom::{ElementId, Event, EventKind, EventTarget, Host, ListenerId};
use crate::error::Result;
use crate::layout::{PlacementResult, PositionOptions, DEFAULT_OFFSET};
use crate::state::keyboard::is_escape_key;
use crate::state::store::StateStore;
use crate::types::Placement;

use super::floating::Floating;
use super::id::resolve_id;
use super::lifecycle::InstanceCore;
use super::types::{Binding, DestroyCallback, OpenChangeCallback};

const TRIGGER: &str = "tooltip-trigger";
const CONTENT: &str = "tooltip-content";

const OPEN_SLOT: &str = "open";
const CLOSE_SLOT: &str = "close";

const TRIGGER_ATTRIBUTES: &[&str] = &["aria-describedby", "data-state"];
const CONTENT_ATTRIBUTES: &[&str] = &["id", "role", "data-visible", "data-state", "data-placement", "hidden"];

pub const DEFAULT_OPEN_DELAY: u64 = 300;
pub const DEFAULT_CLOSE_DELAY: u64 = 100;

// =============================================================================
// TRIGGERS
// =============================================================================

bitflags::bitflags! {
    /// Interactions on the trigger that show the tooltip.
    ///
    /// Combine with bitwise OR: `TooltipTrigger::HOVER | TooltipTrigger::FOCUS`
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct TooltipTrigger: u8 {
        const HOVER = 1 << 0;
        const FOCUS = 1 << 1;
    }
}

impl Default for TooltipTrigger {
    fn default() -> Self {
        Self::HOVER | Self::FOCUS
    }
}

/// Decodes from a list of names: `["hover", "focus"]`.
impl<'de> Deserialize<'de> for TooltipTrigger {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let names = Vec::<String>::deserialize(deserializer)?;
        names.iter().try_fold(Self::empty(), |triggers, name| match name.as_str() {
            "hover" => Ok(triggers | Self::HOVER),
            "focus" => Ok(triggers | Self::FOCUS),
            other => Err(serde::de::Error::unknown_variant(other, &["hover", "focus"])),
        })
    }
}

// =============================================================================
// CONFIG
// =============================================================================

#[derive(Clone, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TooltipConfig {
    pub id: Option<String>,
    /// Milliseconds before showing. `0` shows synchronously.
    pub open_delay: u64,
    /// Milliseconds before hiding. `0` hides synchronously.
    pub close_delay: u64,
    pub placement: Placement,
    pub offset: f64,
    pub smart_positioning: bool,
    pub disabled: bool,
    /// Keep open while the pointer is over the content.
    pub interactive: bool,
    pub triggers: TooltipTrigger,
    pub close_on_escape: bool,
    #[serde(skip)]
    pub on_open_change: Option<OpenChangeCallback>,
    #[serde(skip)]
    pub on_destroy: Option<DestroyCallback>,
}

impl Default for TooltipConfig {
    fn default() -> Self {
        Self {
            id: None,
            open_delay: DEFAULT_OPEN_DELAY,
            close_delay: DEFAULT_CLOSE_DELAY,
            placement: Placement::TOP,
            offset: DEFAULT_OFFSET,
            smart_positioning: true,
            disabled: false,
            interactive: true,
            triggers: TooltipTrigger::default(),
            close_on_escape: true,
            on_open_change: None,
            on_destroy: None,
        }
    }
}

impl TooltipConfig {
    fn position_options(&self) -> PositionOptions {
        PositionOptions {
            placement: self.placement,
            offset: self.offset,
            smart_positioning: self.smart_positioning,
        }
    }
}

// =============================================================================
// TOOLTIP
// =============================================================================

struct TooltipInner {
    core: InstanceCore,
    config: RefCell<TooltipConfig>,
    state: StateStore,
    floating: Floating,
    trigger: Cell<Option<ElementId>>,
    content: Cell<Option<ElementId>>,
    escape_listener: Cell<Option<ListenerId>>,
}

/// Headless tooltip. Cloning shares the instance.
#[derive(Clone)]
pub struct Tooltip {
    inner: Rc<TooltipInner>,
}

impl Tooltip {
    pub fn new(host: Host, config: TooltipConfig) -> Self {
        let id = resolve_id(config.id.as_deref(), "tooltip");
        let state = StateStore::builder()
            .field("open", false)
            .field("disabled", config.disabled)
            .field("placement", config.placement.to_string())
            .field("x", 0.0)
            .field("y", 0.0)
            .build();
        let core = InstanceCore::new(host, id, config.on_destroy.clone());
        let floating = Floating::new(config.position_options());

        let tooltip = Self {
            inner: Rc::new(TooltipInner {
                core,
                config: RefCell::new(config),
                state,
                floating,
                trigger: Cell::new(None),
                content: Cell::new(None),
                escape_listener: Cell::new(None),
            }),
        };

        let weak = Rc::downgrade(&tooltip.inner);
        tooltip.inner.state.bind_dom_sync(move |_| {
            if let Some(tooltip) = Self::upgrade(&weak) {
                tooltip.sync_dom();
            }
        });
        tooltip
    }

    fn upgrade(weak: &Weak<TooltipInner>) -> Option<Self> {
        weak.upgrade().map(|inner| Self { inner })
    }

    fn weak(&self) -> Weak<TooltipInner> {
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

    pub fn is_disabled(&self) -> bool {
        self.inner.state.get_bool("disabled").unwrap_or(false)
    }

    /// An open delay is running.
    pub fn is_opening(&self) -> bool {
        self.inner.core.slots().is_pending(OPEN_SLOT)
    }

    /// A close delay is running.
    pub fn is_closing(&self) -> bool {
        self.inner.core.slots().is_pending(CLOSE_SLOT)
    }

    pub fn content_id(&self) -> String {
        self.inner.core.part_id("content")
    }

    // -------------------------------------------------------------------------
    // Parts
    // -------------------------------------------------------------------------

    pub fn trigger(&self, element: ElementId) -> Result<Binding> {
        let core = &self.inner.core;
        if core.bind_part(element, TRIGGER)? {
            let triggers = self.inner.config.borrow().triggers;
            if triggers.contains(TooltipTrigger::HOVER) {
                let weak = self.weak();
                core.listen_part(element, TRIGGER, element, EventKind::PointerEnter, move |_| {
                    if let Some(tooltip) = Self::upgrade(&weak) {
                        tooltip.show();
                    }
                });
                let weak = self.weak();
                core.listen_part(element, TRIGGER, element, EventKind::PointerLeave, move |event| {
                    if let Some(tooltip) = Self::upgrade(&weak) {
                        tooltip.handle_pointer_leave(event, tooltip.inner.content.get());
                    }
                });
            }
            if triggers.contains(TooltipTrigger::FOCUS) {
                let weak = self.weak();
                core.listen_part(element, TRIGGER, element, EventKind::Focus, move |_| {
                    if let Some(tooltip) = Self::upgrade(&weak) {
                        tooltip.show();
                    }
                });
                let weak = self.weak();
                core.listen_part(element, TRIGGER, element, EventKind::Blur, move |_| {
                    if let Some(tooltip) = Self::upgrade(&weak) {
                        tooltip.hide();
                    }
                });
            }
        }
        self.inner.trigger.set(Some(element));
        self.sync_dom();

        let weak = self.weak();
        Ok(Binding::from_destroy(move || {
            let Some(tooltip) = Self::upgrade(&weak) else { return };
            tooltip.inner.core.unbind_part(element, TRIGGER, TRIGGER_ATTRIBUTES);
            if tooltip.inner.trigger.get() == Some(element) {
                tooltip.inner.trigger.set(None);
            }
        }))
    }

    pub fn content(&self, element: ElementId) -> Result<Binding> {
        let core = &self.inner.core;
        if core.bind_part(element, CONTENT)? {
            let weak = self.weak();
            core.listen_part(element, CONTENT, element, EventKind::PointerEnter, move |_| {
                let Some(tooltip) = Self::upgrade(&weak) else { return };
                if tooltip.inner.config.borrow().interactive {
                    tooltip.inner.core.slots().cancel(CLOSE_SLOT);
                }
            });
            let weak = self.weak();
            core.listen_part(element, CONTENT, element, EventKind::PointerLeave, move |event| {
                if let Some(tooltip) = Self::upgrade(&weak) {
                    tooltip.handle_pointer_leave(event, tooltip.inner.trigger.get());
                }
            });
        }
        self.inner.content.set(Some(element));
        self.sync_dom();
        if self.is_open() {
            self.update_position();
        }

        let weak = self.weak();
        Ok(Binding::from_destroy(move || {
            let Some(tooltip) = Self::upgrade(&weak) else { return };
            tooltip.inner.core.unbind_part(element, CONTENT, CONTENT_ATTRIBUTES);
            if tooltip.inner.content.get() == Some(element) {
                tooltip.inner.content.set(None);
            }
        }))
    }

    /// Pointer left the trigger or the content. Moving onto `partner` (the
    /// other half) keeps the tooltip open when interactive.
    fn handle_pointer_leave(&self, event: &Event, partner: Option<ElementId>) {
        let onto_partner = match (self.inner.core.document(), partner, event.related_target) {
            (Some(doc), Some(partner), Some(related)) => doc.contains(partner, related),
            _ => false,
        };
        if onto_partner && self.inner.config.borrow().interactive {
            self.inner.core.slots().cancel(CLOSE_SLOT);
            return;
        }
        self.hide();
    }

    // -------------------------------------------------------------------------
    // Helpers
    // -------------------------------------------------------------------------

    /// Open after `open_delay`.
    pub fn show(&self) {
        if self.inner.core.is_destroyed() || self.is_disabled() {
            return;
        }
        self.inner.core.slots().cancel(CLOSE_SLOT);
        if self.is_open() || self.is_opening() {
            return;
        }
        let delay = self.inner.config.borrow().open_delay;
        if delay == 0 {
            self.open();
            return;
        }
        let weak = self.weak();
        self.inner.core.slots().schedule(OPEN_SLOT, delay, move || {
            if let Some(tooltip) = Self::upgrade(&weak) {
                tooltip.open();
            }
        });
        tracing::trace!(id = %self.id(), delay, "tooltip open scheduled");
    }

    /// Close after `close_delay`. Cancels a pending open.
    pub fn hide(&self) {
        if self.inner.core.is_destroyed() {
            return;
        }
        self.inner.core.slots().cancel(OPEN_SLOT);
        if !self.is_open() || self.is_closing() {
            return;
        }
        let delay = self.inner.config.borrow().close_delay;
        if delay == 0 {
            self.close();
            return;
        }
        let weak = self.weak();
        self.inner.core.slots().schedule(CLOSE_SLOT, delay, move || {
            if let Some(tooltip) = Self::upgrade(&weak) {
                tooltip.close();
            }
        });
        tracing::trace!(id = %self.id(), delay, "tooltip close scheduled");
    }

    /// Open now, skipping the delay.
    pub fn open(&self) -> bool {
        let slots = self.inner.core.slots();
        slots.cancel(OPEN_SLOT);
        slots.cancel(CLOSE_SLOT);
        if self.inner.core.is_destroyed() || self.is_disabled() || self.is_open() {
            return false;
        }

        let _ = self.inner.state.set("open", true);
        self.update_position();
        let weak = self.weak();
        self.inner.floating.track(&self.inner.core, move || {
            if let Some(tooltip) = Self::upgrade(&weak) {
                tooltip.update_position();
            }
        });

        let weak = self.weak();
        let listener = self.inner.core.listen(EventTarget::Document, EventKind::KeyDown, move |event| {
            if let Some(tooltip) = Self::upgrade(&weak) {
                tooltip.handle_escape(event);
            }
        });
        self.inner.escape_listener.set(listener);

        tracing::debug!(id = %self.id(), "tooltip opened");
        let callback = self.inner.config.borrow().on_open_change.clone();
        if let Some(callback) = callback {
            callback(true);
        }
        true
    }

    /// Close now, skipping the delay.
    pub fn close(&self) -> bool {
        let slots = self.inner.core.slots();
        slots.cancel(OPEN_SLOT);
        slots.cancel(CLOSE_SLOT);
        if self.inner.core.is_destroyed() || !self.is_open() {
            return false;
        }

        self.inner.floating.untrack(&self.inner.core);
        if let Some(listener) = self.inner.escape_listener.take() {
            self.inner.core.unlisten([listener]);
        }
        let _ = self.inner.state.set("open", false);

        tracing::debug!(id = %self.id(), "tooltip closed");
        let callback = self.inner.config.borrow().on_open_change.clone();
        if let Some(callback) = callback {
            callback(false);
        }
        true
    }

    fn handle_escape(&self, event: &Event) {
        let Some(key) = &event.key else { return };
        if is_escape_key(&key.key) && self.inner.config.borrow().close_on_escape {
            self.close();
        }
    }

    /// Disabling closes immediately and drops pending timers.
    pub fn set_disabled(&self, disabled: bool) {
        let _ = self.inner.state.set("disabled", disabled);
        if disabled {
            let slots = self.inner.core.slots();
            slots.cancel(OPEN_SLOT);
            slots.cancel(CLOSE_SLOT);
            self.close();
        }
    }

    pub fn set_delays(&self, open_delay: u64, close_delay: u64) {
        let mut config = self.inner.config.borrow_mut();
        config.open_delay = open_delay;
        config.close_delay = close_delay;
    }

    pub fn set_placement(&self, placement: Placement) {
        let options = {
            let mut config = self.inner.config.borrow_mut();
            config.placement = placement;
            config.position_options()
        };
        self.inner.floating.set_options(options);
        let _ = self.inner.state.set("placement", placement.to_string());
        if self.is_open() {
            self.update_position();
        }
    }

    /// Recompute the content position from live rectangles.
    pub fn update_position(&self) -> Option<PlacementResult> {
        self.inner.floating.update(
            &self.inner.core,
            &self.inner.state,
            self.inner.trigger.get(),
            self.inner.content.get(),
        )
    }

    pub fn destroy(&self) {
        if self.inner.core.destroy() {
            self.inner.state.clear_subscribers();
        }
    }

    // -------------------------------------------------------------------------
    // DOM sync
    // -------------------------------------------------------------------------

    fn sync_dom(&self) {
        let Some(doc) = self.inner.core.document() else { return };
        let open = self.is_open();
        let data_state = if open { "open" } else { "closed" };

        if let Some(trigger) = self.inner.trigger.get() {
            doc.set_attribute(trigger, "aria-describedby", self.content_id());
            doc.set_attribute(trigger, "data-state", data_state);
        }
        if let Some(content) = self.inner.content.get() {
            doc.set_attribute(content, "id", self.content_id());
            doc.set_attribute(content, "role", "tooltip");
            doc.set_attribute(content, "data-visible", open.to_string());
            doc.set_attribute(content, "data-state", data_state);
            doc.toggle_attribute(content, "hidden", (!open).then(String::new));
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
