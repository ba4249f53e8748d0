//! Button - Activation, toggle and loading semantics for any element.
//!
//! Native `<button>` elements get `type` and `disabled`; anything else gets
//! `role="button"`, a tabindex, and Enter/Space activation.
//!
//! # Example
//!
//! ```ignore
//! use spark_headless::primitives::{Button, ButtonConfig};
//!
//! let button = Button::new(host.clone(), ButtonConfig {
//!     toggle: true,
//!     on_click: Some(Rc::new(|| println!("clicked"))),
//!     ..Default::default()
//! });
//! let mut binding = button.root(element)?;
//! doc.click(element);
//! assert!(button.is_pressed());
//! binding.destroy();
//! ```

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use serde::Deserialize;

use crate::dom::{ElementId, Event, EventKind, Host};
use crate::error::Result;
use crate::state::keyboard::is_activation_key;
use crate::state::store::StateStore;

use super::id::resolve_id;
use super::lifecycle::InstanceCore;
use super::types::{Binding, Callback, DestroyCallback, PressedChangeCallback};

const ROOT: &str = "button-root";

const ROOT_ATTRIBUTES: &[&str] = &[
    "role",
    "tabindex",
    "type",
    "disabled",
    "aria-disabled",
    "aria-busy",
    "aria-pressed",
    "data-status",
    "data-variant",
    "data-size",
    "data-disabled",
];

// =============================================================================
// CONFIG
// =============================================================================

#[derive(Clone, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ButtonConfig {
    pub id: Option<String>,
    pub disabled: bool,
    pub loading: bool,
    /// Toggle buttons flip `pressed` on every activation.
    pub toggle: bool,
    pub pressed: bool,
    pub variant: String,
    pub size: String,
    /// `type` attribute for native buttons.
    #[serde(rename = "type")]
    pub button_type: String,
    #[serde(skip)]
    pub on_click: Option<Callback>,
    #[serde(skip)]
    pub on_pressed_change: Option<PressedChangeCallback>,
    #[serde(skip)]
    pub on_destroy: Option<DestroyCallback>,
}

impl Default for ButtonConfig {
    fn default() -> Self {
        Self {
            id: None,
            disabled: false,
            loading: false,
            toggle: false,
            pressed: false,
            variant: "primary".to_string(),
            size: "md".to_string(),
            button_type: "button".to_string(),
            on_click: None,
            on_pressed_change: None,
            on_destroy: None,
        }
    }
}

// =============================================================================
// BUTTON
// =============================================================================

struct ButtonInner {
    core: InstanceCore,
    config: RefCell<ButtonConfig>,
    state: StateStore,
    root: Cell<Option<ElementId>>,
}

/// Headless button. Cloning shares the instance.
#[derive(Clone)]
pub struct Button {
    inner: Rc<ButtonInner>,
}

impl Button {
    pub fn new(host: Host, config: ButtonConfig) -> Self {
        let id = resolve_id(config.id.as_deref(), "button");
        let state = StateStore::builder()
            .field("disabled", config.disabled)
            .field("loading", config.loading)
            .field("pressed", config.toggle && config.pressed)
            .build();
        let core = InstanceCore::new(host, id, config.on_destroy.clone());

        let button = Self {
            inner: Rc::new(ButtonInner {
                core,
                config: RefCell::new(config),
                state,
                root: Cell::new(None),
            }),
        };

        let weak = Rc::downgrade(&button.inner);
        button.inner.state.bind_dom_sync(move |_| {
            if let Some(button) = Self::upgrade(&weak) {
                button.sync_dom();
            }
        });
        button
    }

    fn upgrade(weak: &Weak<ButtonInner>) -> Option<Self> {
        weak.upgrade().map(|inner| Self { inner })
    }

    pub fn id(&self) -> &str {
        self.inner.core.id()
    }

    pub fn state(&self) -> &StateStore {
        &self.inner.state
    }

    pub fn is_pressed(&self) -> bool {
        self.inner.state.get_bool("pressed").unwrap_or(false)
    }

    pub fn is_disabled(&self) -> bool {
        self.inner.state.get_bool("disabled").unwrap_or(false)
    }

    pub fn is_loading(&self) -> bool {
        self.inner.state.get_bool("loading").unwrap_or(false)
    }

    /// Disabled and loading buttons ignore activation.
    fn is_inert(&self) -> bool {
        self.is_disabled() || self.is_loading()
    }

    // -------------------------------------------------------------------------
    // Parts
    // -------------------------------------------------------------------------

    /// Bind the button element.
    pub fn root(&self, element: ElementId) -> Result<Binding> {
        let core = &self.inner.core;
        let fresh = core.bind_part(element, ROOT)?;
        self.inner.root.set(Some(element));

        if fresh {
            let weak = Rc::downgrade(&self.inner);
            core.listen_part(element, ROOT, element, EventKind::Click, move |event| {
                if let Some(button) = Self::upgrade(&weak) {
                    button.handle_click(event);
                }
            });

            let native = core
                .document()
                .and_then(|doc| doc.tag(element))
                .is_some_and(|tag| tag == "button");
            if !native {
                let weak = Rc::downgrade(&self.inner);
                core.listen_part(element, ROOT, element, EventKind::KeyDown, move |event| {
                    if let Some(button) = Self::upgrade(&weak) {
                        button.handle_key(element, event);
                    }
                });
            }
        }
        self.sync_dom();

        let weak = Rc::downgrade(&self.inner);
        Ok(Binding::from_destroy(move || {
            if let Some(button) = Self::upgrade(&weak) {
                button.inner.core.unbind_part(element, ROOT, ROOT_ATTRIBUTES);
                if button.inner.root.get() == Some(element) {
                    button.inner.root.set(None);
                }
            }
        }))
    }

    fn handle_click(&self, event: &Event) {
        if self.is_inert() {
            event.prevent_default();
            event.stop_propagation();
            return;
        }
        self.activate();
    }

    fn handle_key(&self, element: ElementId, event: &Event) {
        let Some(key) = &event.key else { return };
        if !is_activation_key(&key.key) {
            return;
        }
        event.prevent_default();
        if let Some(doc) = self.inner.core.document() {
            doc.click(element);
        }
    }

    fn activate(&self) {
        let config = self.inner.config.borrow().clone();
        if config.toggle {
            self.set_pressed(!self.is_pressed());
        }
        if let Some(on_click) = config.on_click {
            on_click();
        }
    }

    // -------------------------------------------------------------------------
    // Helpers
    // -------------------------------------------------------------------------

    /// Activate as if clicked. Returns `false` when disabled or loading.
    pub fn click(&self) -> bool {
        if self.inner.core.is_destroyed() || self.is_inert() {
            return false;
        }
        self.activate();
        true
    }

    pub fn set_pressed(&self, pressed: bool) {
        if self.inner.core.is_destroyed() || !self.inner.config.borrow().toggle {
            return;
        }
        if self.inner.state.set("pressed", pressed).unwrap_or(false) {
            tracing::debug!(id = %self.id(), pressed, "button pressed changed");
            let callback = self.inner.config.borrow().on_pressed_change.clone();
            if let Some(callback) = callback {
                callback(pressed);
            }
        }
    }

    pub fn toggle(&self) {
        self.set_pressed(!self.is_pressed());
    }

    pub fn set_disabled(&self, disabled: bool) {
        let _ = self.inner.state.set("disabled", disabled);
    }

    pub fn set_loading(&self, loading: bool) {
        let _ = self.inner.state.set("loading", loading);
    }

    pub fn set_variant(&self, variant: impl Into<String>) {
        self.inner.config.borrow_mut().variant = variant.into();
        self.sync_dom();
    }

    pub fn set_size(&self, size: impl Into<String>) {
        self.inner.config.borrow_mut().size = size.into();
        self.sync_dom();
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
        let Some(root) = self.inner.root.get() else { return };
        let config = self.inner.config.borrow().clone();
        let disabled = self.is_disabled();
        let loading = self.is_loading();
        let native = doc.tag(root).is_some_and(|tag| tag == "button");

        if native {
            doc.set_attribute(root, "type", config.button_type.as_str());
            doc.set_disabled(root, disabled);
        } else {
            doc.set_attribute(root, "role", "button");
            doc.set_attribute(root, "tabindex", if disabled { "-1" } else { "0" });
        }

        let flag = |on: bool| on.then(|| "true".to_string());
        doc.toggle_attribute(root, "aria-disabled", flag(disabled || loading));
        doc.toggle_attribute(root, "aria-busy", flag(loading));
        doc.toggle_attribute(root, "data-disabled", disabled.then(String::new));
        doc.set_attribute(root, "data-status", if loading { "loading" } else { "idle" });
        doc.set_attribute(root, "data-variant", config.variant.as_str());
        doc.set_attribute(root, "data-size", config.size.as_str());
        if config.toggle {
            doc.set_attribute(root, "aria-pressed", self.is_pressed().to_string());
        } else {
            doc.remove_attribute(root, "aria-pressed");
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::Document;
    use crate::primitives::reset_id_counter;

    fn setup() -> (Document, Host) {
        reset_id_counter();
        let doc = Document::new();
        (doc.clone(), Host::new(doc))
    }

    fn counter() -> (Rc<Cell<u32>>, Callback) {
        let count = Rc::new(Cell::new(0));
        let c = count.clone();
        (count, Rc::new(move || c.set(c.get() + 1)))
    }

    #[test]
    fn test_native_button_attributes() {
        let (doc, host) = setup();
        let el = doc.create_child(doc.body(), "button");
        let button = Button::new(host, ButtonConfig::default());
        let _binding = button.root(el).unwrap();

        assert_eq!(button.id(), "button-0");
        assert_eq!(doc.attribute(el, "type").as_deref(), Some("button"));
        assert_eq!(doc.attribute(el, "data-status").as_deref(), Some("idle"));
        assert_eq!(doc.attribute(el, "data-variant").as_deref(), Some("primary"));
        assert_eq!(doc.attribute(el, "data-size").as_deref(), Some("md"));
        assert!(!doc.has_attribute(el, "role"));
        assert!(!doc.has_attribute(el, "aria-pressed"));
    }

    #[test]
    fn test_click_calls_handler() {
        let (doc, host) = setup();
        let el = doc.create_child(doc.body(), "button");
        let (count, on_click) = counter();
        let button = Button::new(host, ButtonConfig { on_click: Some(on_click), ..Default::default() });
        let _binding = button.root(el).unwrap();

        doc.click(el);
        assert_eq!(count.get(), 1);
        assert!(button.click());
        assert_eq!(count.get(), 2);
    }

    #[test]
    fn test_disabled_and_loading_swallow_clicks() {
        let (doc, host) = setup();
        let el = doc.create_child(doc.body(), "button");
        let (count, on_click) = counter();
        let button = Button::new(host, ButtonConfig {
            disabled: true,
            on_click: Some(on_click),
            ..Default::default()
        });
        let _binding = button.root(el).unwrap();
        assert!(doc.is_disabled(el));
        assert!(doc.click(el));
        assert!(!button.click());

        button.set_disabled(false);
        button.set_loading(true);
        assert_eq!(doc.attribute(el, "aria-busy").as_deref(), Some("true"));
        assert_eq!(doc.attribute(el, "data-status").as_deref(), Some("loading"));
        doc.click(el);
        assert_eq!(count.get(), 0);

        button.set_loading(false);
        assert!(!doc.has_attribute(el, "aria-busy"));
        doc.click(el);
        assert_eq!(count.get(), 1);
    }

    #[test]
    fn test_toggle_mode() {
        let (doc, host) = setup();
        let el = doc.create_child(doc.body(), "button");
        let button = Button::new(host, ButtonConfig { toggle: true, ..Default::default() });
        let _binding = button.root(el).unwrap();
        assert_eq!(doc.attribute(el, "aria-pressed").as_deref(), Some("false"));

        doc.click(el);
        assert!(button.is_pressed());
        assert_eq!(doc.attribute(el, "aria-pressed").as_deref(), Some("true"));
        button.toggle();
        assert!(!button.is_pressed());
    }

    #[test]
    fn test_non_native_keyboard_activation() {
        let (doc, host) = setup();
        let el = doc.create_child(doc.body(), "div");
        let (count, on_click) = counter();
        let button = Button::new(host, ButtonConfig { on_click: Some(on_click), ..Default::default() });
        let _binding = button.root(el).unwrap();

        assert_eq!(doc.attribute(el, "role").as_deref(), Some("button"));
        assert_eq!(doc.attribute(el, "tabindex").as_deref(), Some("0"));
        assert!(doc.key_down(el, "Enter"));
        assert!(doc.key_down(el, " "));
        assert!(!doc.key_down(el, "a"));
        assert_eq!(count.get(), 2);
    }

    #[test]
    fn test_terminal_release_does_not_activate_twice() {
        use crate::state::input::convert_key_event;
        use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

        let (doc, host) = setup();
        let el = doc.create_child(doc.body(), "div");
        let button = Button::new(host, ButtonConfig { toggle: true, ..Default::default() });
        let _binding = button.root(el).unwrap();

        for kind in [KeyEventKind::Press, KeyEventKind::Release] {
            let key = KeyEvent::new_with_kind(KeyCode::Enter, KeyModifiers::NONE, kind);
            doc.key_down_with(el, convert_key_event(key));
        }
        assert!(button.is_pressed());
    }

    #[test]
    fn test_binding_destroy_reverses_attach() {
        let (doc, host) = setup();
        let el = doc.create_child(doc.body(), "div");
        let button = Button::new(host, ButtonConfig::default());
        let mut binding = button.root(el).unwrap();
        binding.destroy();
        assert_eq!(doc.listener_count(), 0);
        assert!(!doc.has_attribute(el, "role"));
        assert!(!doc.has_attribute(el, "data-variant"));
    }

    #[test]
    fn test_conflicting_binding() {
        let (doc, host) = setup();
        let el = doc.create_child(doc.body(), "button");
        let first = Button::new(host.clone(), ButtonConfig::default());
        let second = Button::new(host, ButtonConfig::default());
        let _binding = first.root(el).unwrap();
        assert!(second.root(el).is_err());
        // Rebinding to the same instance updates in place.
        let _again = first.root(el).unwrap();
        assert_eq!(doc.listener_count(), 1);
    }

    #[test]
    fn test_destroy_runs_hook_once() {
        let (doc, host) = setup();
        let el = doc.create_child(doc.body(), "button");
        let (count, hook) = counter();
        let button = Button::new(host, ButtonConfig { on_destroy: Some(hook), ..Default::default() });
        let _binding = button.root(el).unwrap();
        button.destroy();
        button.destroy();
        assert_eq!(count.get(), 1);
        assert_eq!(doc.listener_count(), 0);
    }

    #[test]
    fn test_config_from_json() {
        let config: ButtonConfig =
            serde_json::from_str(r#"{"toggle":true,"pressed":true,"variant":"ghost","type":"submit"}"#)
                .unwrap();
        assert!(config.toggle);
        assert_eq!(config.variant, "ghost");
        assert_eq!(config.button_type, "submit");
        assert_eq!(config.size, "md");
    }
}
