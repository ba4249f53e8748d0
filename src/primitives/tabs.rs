//! Tabs - Tab list with roving tabindex and linked panels.
//!
//! `activeTab` (alias `value`) names the selected tab. It changes on click,
//! on Home/End, and on arrow movement or focus when `activate_on_focus` is
//! set. With `activate_on_focus` off, arrows only move focus and Enter/Space
//! or a click selects.
//!
//! Tab and panel ids are derived from the value: `{id}-tab-{value}` and
//! `{id}-panel-{value}`.
//!
//! # Example
//!
//! ```ignore
//! let tabs = Tabs::new(host.clone(), TabsConfig::default());
//! let _list = tabs.list(list)?;
//! let _a = tabs.tab(general, TabOptions::new("general"))?;
//! let _b = tabs.tab(advanced, TabOptions::new("advanced"))?;
//! let _p = tabs.panel(general_panel, "general")?;
//! assert_eq!(tabs.value().as_deref(), Some("general"));
//! ```

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use serde::Deserialize;

use crate::dom::{ElementId, Event, EventKind, Host};
use crate::error::Result;
use crate::state::keyboard::{is_activation_key, navigation_direction_for, NavDirection};
use crate::state::navigation::{ListNavigator, NavigableItem};
use crate::state::store::StateStore;
use crate::types::Orientation;

use super::id::resolve_id;
use super::lifecycle::InstanceCore;
use super::types::{Binding, DestroyCallback, ValueCallback};

const LIST: &str = "tabs-list";
const TAB: &str = "tabs-tab";
const PANEL: &str = "tabs-panel";

const LIST_ATTRIBUTES: &[&str] = &["role", "aria-orientation"];
const TAB_ATTRIBUTES: &[&str] = &[
    "id",
    "role",
    "aria-selected",
    "aria-controls",
    "aria-disabled",
    "tabindex",
    "data-state",
    "data-disabled",
];
const PANEL_ATTRIBUTES: &[&str] = &["id", "role", "aria-labelledby", "tabindex", "data-state", "hidden"];

// =============================================================================
// CONFIG
// =============================================================================

#[derive(Clone, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TabsConfig {
    pub id: Option<String>,
    /// Initially selected tab.
    pub value: Option<String>,
    pub orientation: Orientation,
    #[serde(rename = "loop")]
    pub loop_focus: bool,
    /// Moving focus onto a tab selects it.
    pub activate_on_focus: bool,
    #[serde(skip)]
    pub on_value_change: Option<ValueCallback>,
    #[serde(skip)]
    pub on_destroy: Option<DestroyCallback>,
}

impl Default for TabsConfig {
    fn default() -> Self {
        Self {
            id: None,
            value: None,
            orientation: Orientation::Horizontal,
            loop_focus: true,
            activate_on_focus: true,
            on_value_change: None,
            on_destroy: None,
        }
    }
}

/// Per-tab parameters.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TabOptions {
    pub value: String,
    pub disabled: bool,
}

impl TabOptions {
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            disabled: false,
        }
    }

    pub fn disabled(mut self, disabled: bool) -> Self {
        self.disabled = disabled;
        self
    }
}

// =============================================================================
// TABS
// =============================================================================

struct TabsInner {
    core: InstanceCore,
    config: RefCell<TabsConfig>,
    state: StateStore,
    nav: ListNavigator,
    /// Tab values in registration order, parallel to the navigator's items.
    values: RefCell<Vec<(ElementId, String)>>,
    panels: RefCell<Vec<(ElementId, String)>>,
    list: Cell<Option<ElementId>>,
}

/// Headless tabs. Cloning shares the instance.
#[derive(Clone)]
pub struct Tabs {
    inner: Rc<TabsInner>,
}

impl Tabs {
    pub fn new(host: Host, config: TabsConfig) -> Self {
        let id = resolve_id(config.id.as_deref(), "tabs");
        let state = StateStore::builder()
            .field("activeTab", config.value.clone())
            .alias("activeTab", "value")
            .field("focusedIndex", -1)
            .build();
        let nav = ListNavigator::new(
            state.clone(),
            "focusedIndex",
            config.loop_focus,
            host.document().cloned(),
        );
        let core = InstanceCore::new(host, id, config.on_destroy.clone());

        let tabs = Self {
            inner: Rc::new(TabsInner {
                core,
                config: RefCell::new(config),
                state,
                nav,
                values: RefCell::new(Vec::new()),
                panels: RefCell::new(Vec::new()),
                list: Cell::new(None),
            }),
        };

        let weak = Rc::downgrade(&tabs.inner);
        tabs.inner.state.bind_dom_sync(move |_| {
            if let Some(tabs) = Self::upgrade(&weak) {
                tabs.sync_dom();
            }
        });
        tabs
    }

    fn upgrade(weak: &Weak<TabsInner>) -> Option<Self> {
        weak.upgrade().map(|inner| Self { inner })
    }

    fn weak(&self) -> Weak<TabsInner> {
        Rc::downgrade(&self.inner)
    }

    pub fn id(&self) -> &str {
        self.inner.core.id()
    }

    pub fn state(&self) -> &StateStore {
        &self.inner.state
    }

    /// The selected tab's value.
    pub fn value(&self) -> Option<String> {
        self.inner.state.get_str("activeTab").ok().flatten()
    }

    pub fn focused_index(&self) -> Option<usize> {
        self.inner.nav.current()
    }

    pub fn tab_id(&self, value: &str) -> String {
        self.inner.core.part_id(&format!("tab-{value}"))
    }

    pub fn panel_id(&self, value: &str) -> String {
        self.inner.core.part_id(&format!("panel-{value}"))
    }

    fn value_at(&self, index: usize) -> Option<String> {
        self.inner.values.borrow().get(index).map(|(_, value)| value.clone())
    }

    fn value_of(&self, element: ElementId) -> Option<String> {
        self.inner
            .values
            .borrow()
            .iter()
            .find(|(el, _)| *el == element)
            .map(|(_, value)| value.clone())
    }

    fn index_of_value(&self, value: &str) -> Option<usize> {
        self.inner.values.borrow().iter().position(|(_, v)| v == value)
    }

    // -------------------------------------------------------------------------
    // Parts
    // -------------------------------------------------------------------------

    /// The tablist container: keyboard navigation between tabs.
    pub fn list(&self, element: ElementId) -> Result<Binding> {
        let core = &self.inner.core;
        if core.bind_part(element, LIST)? {
            let weak = self.weak();
            core.listen_part(element, LIST, element, EventKind::KeyDown, move |event| {
                if let Some(tabs) = Self::upgrade(&weak) {
                    tabs.handle_key(event);
                }
            });
        }
        self.inner.list.set(Some(element));
        self.sync_dom();

        let weak = self.weak();
        Ok(Binding::from_destroy(move || {
            let Some(tabs) = Self::upgrade(&weak) else { return };
            tabs.inner.core.unbind_part(element, LIST, LIST_ATTRIBUTES);
            if tabs.inner.list.get() == Some(element) {
                tabs.inner.list.set(None);
            }
        }))
    }

    /// Register a tab. Binding the same element again updates it in place.
    pub fn tab(&self, element: ElementId, options: TabOptions) -> Result<Binding<TabOptions>> {
        let core = &self.inner.core;
        if core.bind_part(element, TAB)? {
            let weak = self.weak();
            core.listen_part(element, TAB, element, EventKind::Click, move |_| {
                let Some(tabs) = Self::upgrade(&weak) else { return };
                if let Some(value) = tabs.value_of(element) {
                    tabs.select(&value);
                }
            });
            let weak = self.weak();
            core.listen_part(element, TAB, element, EventKind::Focus, move |_| {
                if let Some(tabs) = Self::upgrade(&weak) {
                    tabs.handle_tab_focus(element);
                }
            });
        }
        self.register_tab(element, options);

        let on_update = self.weak();
        let on_destroy = self.weak();
        Ok(Binding::new(
            move |options: TabOptions| {
                if let Some(tabs) = Self::upgrade(&on_update) {
                    tabs.register_tab(element, options);
                }
            },
            move || {
                let Some(tabs) = Self::upgrade(&on_destroy) else { return };
                tabs.inner.nav.unregister(element);
                tabs.inner.values.borrow_mut().retain(|(el, _)| *el != element);
                tabs.inner.core.unbind_part(element, TAB, TAB_ATTRIBUTES);
                tabs.sync_dom();
            },
        ))
    }

    fn register_tab(&self, element: ElementId, options: TabOptions) {
        if self.inner.core.is_destroyed() {
            return;
        }
        let index = self
            .inner
            .nav
            .register(NavigableItem::new(element).disabled(options.disabled));
        {
            let mut values = self.inner.values.borrow_mut();
            match values.get_mut(index) {
                Some(entry) if entry.0 == element => entry.1 = options.value.clone(),
                _ => values.insert(index, (element, options.value.clone())),
            }
        }

        // First enabled tab becomes the default selection.
        if self.value().is_none() && !options.disabled {
            let _ = self.inner.state.set("activeTab", options.value.as_str());
        }
        self.sync_dom();
    }

    /// A panel shown while the tab with the same value is selected.
    pub fn panel(&self, element: ElementId, value: &str) -> Result<Binding<String>> {
        self.inner.core.bind_part(element, PANEL)?;
        self.register_panel(element, value.to_string());

        let on_update = self.weak();
        let on_destroy = self.weak();
        Ok(Binding::new(
            move |value: String| {
                if let Some(tabs) = Self::upgrade(&on_update) {
                    tabs.register_panel(element, value);
                }
            },
            move || {
                let Some(tabs) = Self::upgrade(&on_destroy) else { return };
                tabs.inner.panels.borrow_mut().retain(|(el, _)| *el != element);
                tabs.inner.core.unbind_part(element, PANEL, PANEL_ATTRIBUTES);
            },
        ))
    }

    fn register_panel(&self, element: ElementId, value: String) {
        {
            let mut panels = self.inner.panels.borrow_mut();
            match panels.iter_mut().find(|(el, _)| *el == element) {
                Some(entry) => entry.1 = value,
                None => panels.push((element, value)),
            }
        }
        self.sync_dom();
    }

    // -------------------------------------------------------------------------
    // Event handlers
    // -------------------------------------------------------------------------

    fn handle_key(&self, event: &Event) {
        let Some(key) = &event.key else { return };
        let (orientation, activate_on_focus) = {
            let config = self.inner.config.borrow();
            (config.orientation, config.activate_on_focus)
        };

        if is_activation_key(&key.key) {
            if let Some(value) = self.focused_index().and_then(|index| self.value_at(index)) {
                event.prevent_default();
                self.select(&value);
            }
            return;
        }

        let Some(direction) = navigation_direction_for(&key.key, orientation) else {
            return;
        };
        event.prevent_default();
        if self.focused_index().is_none() {
            self.sync_focus_from_active();
        }
        let Some(index) = self.inner.nav.move_by(direction) else {
            return;
        };
        let jumps = matches!(direction, NavDirection::First | NavDirection::Last);
        if jumps || activate_on_focus {
            if let Some(value) = self.value_at(index) {
                self.select(&value);
            }
        }
    }

    fn handle_tab_focus(&self, element: ElementId) {
        let Some(index) = self.inner.nav.index_of(element) else { return };
        if self.focused_index() != Some(index) {
            let _ = self.inner.state.set("focusedIndex", index as i64);
        }
        let disabled = self.inner.nav.item(index).is_some_and(|item| item.disabled);
        if self.inner.config.borrow().activate_on_focus && !disabled {
            if let Some(value) = self.value_at(index) {
                self.select(&value);
            }
        }
    }

    /// Arrow movement starts from the selected tab when nothing has focus yet.
    fn sync_focus_from_active(&self) {
        let active = self.value().and_then(|value| self.index_of_value(&value));
        if let Some(index) = active {
            let _ = self.inner.state.set("focusedIndex", index as i64);
        }
    }

    // -------------------------------------------------------------------------
    // Helpers
    // -------------------------------------------------------------------------

    /// Select the tab with `value`. Disabled and unknown tabs are ignored
    /// once any tab is registered.
    pub fn select(&self, value: &str) -> bool {
        if self.inner.core.is_destroyed() {
            return false;
        }
        if !self.inner.nav.is_empty() {
            let index = self.index_of_value(value);
            let disabled = index
                .and_then(|index| self.inner.nav.item(index))
                .is_none_or(|item| item.disabled);
            if disabled {
                tracing::warn!(id = %self.id(), value, "ignoring selection of missing or disabled tab");
                return false;
            }
        }
        if !self.inner.state.set("activeTab", value).unwrap_or(false) {
            return false;
        }
        tracing::debug!(id = %self.id(), value, "tab selected");
        let callback = self.inner.config.borrow().on_value_change.clone();
        if let Some(callback) = callback {
            callback(value);
        }
        true
    }

    /// Move focus to the tab at `index` without selecting it (unless
    /// `activate_on_focus` is set).
    pub fn focus_tab(&self, index: i64) -> bool {
        self.inner.nav.set_focused_index(index)
    }

    pub fn set_activate_on_focus(&self, enabled: bool) {
        self.inner.config.borrow_mut().activate_on_focus = enabled;
    }

    pub fn destroy(&self) {
        if self.inner.core.destroy() {
            self.inner.nav.clear();
            self.inner.values.borrow_mut().clear();
            self.inner.panels.borrow_mut().clear();
            self.inner.state.clear_subscribers();
        }
    }

    // -------------------------------------------------------------------------
    // DOM sync
    // -------------------------------------------------------------------------

    fn sync_dom(&self) {
        let Some(doc) = self.inner.core.document() else { return };
        let active = self.value();

        if let Some(list) = self.inner.list.get() {
            let orientation = self.inner.config.borrow().orientation;
            doc.set_attribute(list, "role", "tablist");
            doc.set_attribute(list, "aria-orientation", orientation.as_str());
        }

        let items = self.inner.nav.items();
        let values = self.inner.values.borrow().clone();
        for (item, (_, value)) in items.iter().zip(&values) {
            let element = item.element;
            let selected = active.as_deref() == Some(value.as_str());
            doc.set_attribute(element, "id", self.tab_id(value));
            doc.set_attribute(element, "role", "tab");
            doc.set_attribute(element, "aria-selected", selected.to_string());
            doc.set_attribute(element, "aria-controls", self.panel_id(value));
            doc.set_attribute(element, "data-state", if selected { "active" } else { "inactive" });
            doc.toggle_attribute(element, "aria-disabled", item.disabled.then(|| "true".to_string()));
            doc.toggle_attribute(element, "data-disabled", item.disabled.then(String::new));
        }
        let tabbable = self
            .focused_index()
            .or_else(|| active.as_deref().and_then(|value| self.index_of_value(value)));
        self.inner.nav.sync_roving_tabindex(tabbable);

        for (element, value) in self.inner.panels.borrow().iter() {
            let selected = active.as_deref() == Some(value.as_str());
            doc.set_attribute(*element, "id", self.panel_id(value));
            doc.set_attribute(*element, "role", "tabpanel");
            doc.set_attribute(*element, "aria-labelledby", self.tab_id(value));
            doc.set_attribute(*element, "tabindex", "0");
            doc.set_attribute(*element, "data-state", if selected { "active" } else { "inactive" });
            doc.toggle_attribute(*element, "hidden", (!selected).then(String::new));
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

    struct Fixture {
        doc: Document,
        tabs: Tabs,
        list: ElementId,
        tab_elements: Vec<ElementId>,
        panels: Vec<ElementId>,
        bindings: Vec<Binding<TabOptions>>,
    }

    fn setup(config: TabsConfig, values: &[(&str, bool)]) -> Fixture {
        reset_id_counter();
        let doc = Document::new();
        let host = Host::new(doc.clone());
        let tabs = Tabs::new(host, config);
        let list = doc.create_child(doc.body(), "div");
        let _ = tabs.list(list).unwrap();

        let mut tab_elements = Vec::new();
        let mut panels = Vec::new();
        let mut bindings = Vec::new();
        for (value, disabled) in values {
            let tab = doc.create_child(list, "button");
            bindings.push(tabs.tab(tab, TabOptions::new(*value).disabled(*disabled)).unwrap());
            let panel = doc.create_child(doc.body(), "div");
            let _ = tabs.panel(panel, value).unwrap();
            tab_elements.push(tab);
            panels.push(panel);
        }
        Fixture { doc, tabs, list, tab_elements, panels, bindings }
    }

    #[test]
    fn test_first_enabled_tab_is_default() {
        let f = setup(TabsConfig::default(), &[("a", true), ("b", false), ("c", false)]);
        assert_eq!(f.tabs.value().as_deref(), Some("b"));
        assert_eq!(f.tabs.state().get_str("value"), Ok(Some("b".into())));
        assert_eq!(f.doc.attribute(f.tab_elements[1], "aria-selected").as_deref(), Some("true"));
        assert_eq!(f.doc.attribute(f.tab_elements[1], "tabindex").as_deref(), Some("0"));
        assert_eq!(f.doc.attribute(f.tab_elements[2], "tabindex").as_deref(), Some("-1"));
        assert!(f.doc.has_attribute(f.panels[0], "hidden"));
        assert!(!f.doc.has_attribute(f.panels[1], "hidden"));
    }

    #[test]
    fn test_ids_link_tabs_and_panels() {
        let f = setup(TabsConfig::default(), &[("general", false)]);
        assert_eq!(f.doc.attribute(f.list, "role").as_deref(), Some("tablist"));
        assert_eq!(f.doc.attribute(f.list, "aria-orientation").as_deref(), Some("horizontal"));
        assert_eq!(f.doc.attribute(f.tab_elements[0], "id").as_deref(), Some("tabs-0-tab-general"));
        assert_eq!(
            f.doc.attribute(f.tab_elements[0], "aria-controls").as_deref(),
            Some("tabs-0-panel-general")
        );
        assert_eq!(f.doc.attribute(f.panels[0], "role").as_deref(), Some("tabpanel"));
        assert_eq!(
            f.doc.attribute(f.panels[0], "aria-labelledby").as_deref(),
            Some("tabs-0-tab-general")
        );
    }

    #[test]
    fn test_explicit_default_value() {
        let f = setup(
            TabsConfig { value: Some("c".into()), ..Default::default() },
            &[("a", false), ("b", false), ("c", false)],
        );
        assert_eq!(f.tabs.value().as_deref(), Some("c"));
    }

    #[test]
    fn test_click_selects() {
        let selected = Rc::new(RefCell::new(Vec::new()));
        let s = selected.clone();
        let f = setup(
            TabsConfig {
                on_value_change: Some(Rc::new(move |v: &str| s.borrow_mut().push(v.to_string()))),
                ..Default::default()
            },
            &[("a", false), ("b", false)],
        );
        f.doc.click(f.tab_elements[1]);
        assert_eq!(f.tabs.value().as_deref(), Some("b"));
        assert_eq!(*selected.borrow(), vec!["b".to_string()]);
    }

    #[test]
    fn test_arrows_select_with_activate_on_focus() {
        let f = setup(TabsConfig::default(), &[("a", false), ("b", false), ("c", false)]);
        f.doc.focus(f.tab_elements[0]);
        f.doc.key_down(f.tab_elements[0], "ArrowRight");
        assert_eq!(f.tabs.value().as_deref(), Some("b"));
        assert_eq!(f.doc.active_element(), Some(f.tab_elements[1]));
        f.doc.key_down(f.tab_elements[1], "ArrowLeft");
        f.doc.key_down(f.tab_elements[0], "ArrowLeft");
        assert_eq!(f.tabs.value().as_deref(), Some("c"));
    }

    #[test]
    fn test_manual_activation_moves_focus_only() {
        let f = setup(
            TabsConfig { activate_on_focus: false, ..Default::default() },
            &[("a", false), ("b", false), ("c", false)],
        );
        f.doc.focus(f.tab_elements[0]);
        f.doc.key_down(f.tab_elements[0], "ArrowRight");
        assert_eq!(f.tabs.focused_index(), Some(1));
        assert_eq!(f.tabs.value().as_deref(), Some("a"));

        f.doc.key_down(f.tab_elements[1], "Enter");
        assert_eq!(f.tabs.value().as_deref(), Some("b"));
    }

    #[test]
    fn test_home_end_always_select() {
        let f = setup(
            TabsConfig { activate_on_focus: false, ..Default::default() },
            &[("a", false), ("b", false), ("c", false)],
        );
        f.doc.focus(f.tab_elements[0]);
        f.doc.key_down(f.tab_elements[0], "End");
        assert_eq!(f.tabs.value().as_deref(), Some("c"));
        f.doc.key_down(f.tab_elements[2], "Home");
        assert_eq!(f.tabs.value().as_deref(), Some("a"));
    }

    #[test]
    fn test_vertical_orientation_ignores_horizontal_arrows() {
        let f = setup(
            TabsConfig { orientation: Orientation::Vertical, ..Default::default() },
            &[("a", false), ("b", false)],
        );
        f.doc.focus(f.tab_elements[0]);
        assert!(!f.doc.key_down(f.tab_elements[0], "ArrowRight"));
        assert_eq!(f.tabs.value().as_deref(), Some("a"));
        f.doc.key_down(f.tab_elements[0], "ArrowDown");
        assert_eq!(f.tabs.value().as_deref(), Some("b"));
    }

    #[test]
    fn test_disabled_tab_skipped_and_unselectable() {
        let f = setup(TabsConfig::default(), &[("a", false), ("b", true), ("c", false)]);
        f.doc.focus(f.tab_elements[0]);
        f.doc.key_down(f.tab_elements[0], "ArrowRight");
        assert_eq!(f.tabs.value().as_deref(), Some("c"));
        assert!(!f.tabs.select("b"));
        assert!(!f.tabs.select("missing"));
        assert_eq!(f.tabs.value().as_deref(), Some("c"));
    }

    #[test]
    fn test_tab_update_and_destroy() {
        let mut f = setup(TabsConfig::default(), &[("a", false), ("b", false)]);
        f.bindings[1].update(TabOptions::new("b").disabled(true));
        assert!(!f.tabs.select("b"));
        f.bindings[1].destroy();
        assert!(!f.doc.has_attribute(f.tab_elements[1], "role"));
        assert_eq!(f.doc.listener_count_for(f.tab_elements[1]), 0);
    }

    #[test]
    fn test_config_from_json() {
        let config: TabsConfig =
            serde_json::from_str(r#"{"value":"b","orientation":"vertical","activateOnFocus":false}"#)
                .unwrap();
        assert_eq!(config.value.as_deref(), Some("b"));
        assert_eq!(config.orientation, Orientation::Vertical);
        assert!(!config.activate_on_focus);
        assert!(config.loop_focus);
    }
}
