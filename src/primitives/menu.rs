//! Menu - Dropdown menu with roving focus, typeahead and placement.
//!
//! The trigger toggles the menu. While open:
//! - ArrowDown/ArrowUp move between enabled items (looping by default)
//! - Home/End jump to the first/last enabled item
//! - Enter/Space activate the focused item
//! - printable characters jump by typeahead
//! - Escape, Tab and pointer presses outside close the menu and send focus
//!   back to the trigger
//!
//! `focusedIndex` and `activeIndex` are the same field under two names.
//!
//! # Example
//!
//! ```ignore
//! let menu = Menu::new(host.clone(), MenuConfig::default());
//! let _t = menu.trigger(button)?;
//! let _c = menu.content(list)?;
//! let _i = menu.item(copy, ItemOptions::default().on_select(|| copy_selection()))?;
//! doc.key_down(button, "ArrowDown"); // opens with the first item focused
//! ```

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

use serde::Deserialize;

use crate::dom::{ElementId, Event, EventKind, EventTarget, Host, ListenerId};
use crate::error::Result;
use crate::layout::{PlacementResult, PositionOptions, DEFAULT_OFFSET};
use crate::state::focus::{focus_and_notify, FocusSnapshot};
use crate::state::keyboard::{is_activation_key, is_escape_key, is_tab_key, navigation_direction_for};
use crate::state::navigation::{ListNavigator, NavigableItem};
use crate::state::store::StateStore;
use crate::state::typeahead::{find_match, Typeahead};
use crate::types::{Orientation, Placement};

use super::floating::Floating;
use super::id::resolve_id;
use super::lifecycle::InstanceCore;
use super::types::{Binding, Callback, DestroyCallback, OpenChangeCallback};

const TRIGGER: &str = "menu-trigger";
const CONTENT: &str = "menu-content";
const ITEM: &str = "menu-item";

const FOCUS_FIRST_SLOT: &str = "focus-first";

const TRIGGER_ATTRIBUTES: &[&str] = &["id", "aria-haspopup", "aria-expanded", "aria-controls", "data-state"];
const CONTENT_ATTRIBUTES: &[&str] = &[
    "id",
    "role",
    "aria-labelledby",
    "aria-orientation",
    "tabindex",
    "data-state",
    "data-placement",
    "hidden",
];
const ITEM_ATTRIBUTES: &[&str] = &["role", "tabindex", "aria-disabled", "data-disabled", "data-active"];

// =============================================================================
// CONFIG
// =============================================================================

#[derive(Clone, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct MenuConfig {
    pub id: Option<String>,
    /// Wrap from the last item to the first and back.
    #[serde(rename = "loop")]
    pub loop_focus: bool,
    pub close_on_select: bool,
    pub placement: Placement,
    pub offset: f64,
    pub smart_positioning: bool,
    pub typeahead: bool,
    pub return_focus: bool,
    #[serde(skip)]
    pub on_open_change: Option<OpenChangeCallback>,
    #[serde(skip)]
    pub on_destroy: Option<DestroyCallback>,
}

impl Default for MenuConfig {
    fn default() -> Self {
        Self {
            id: None,
            loop_focus: true,
            close_on_select: true,
            placement: Placement::BOTTOM_START,
            offset: DEFAULT_OFFSET,
            smart_positioning: true,
            typeahead: true,
            return_focus: true,
            on_open_change: None,
            on_destroy: None,
        }
    }
}

impl MenuConfig {
    fn position_options(&self) -> PositionOptions {
        PositionOptions {
            placement: self.placement,
            offset: self.offset,
            smart_positioning: self.smart_positioning,
        }
    }
}

/// Per-item parameters. Passing new options through [`Binding::update`]
/// updates the item in place.
#[derive(Clone, Default)]
pub struct ItemOptions {
    pub disabled: bool,
    /// Text matched by typeahead instead of the element's text content.
    pub text_value: Option<String>,
    pub on_select: Option<Callback>,
}

impl fmt::Debug for ItemOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ItemOptions")
            .field("disabled", &self.disabled)
            .field("text_value", &self.text_value)
            .field("on_select", &self.on_select.is_some())
            .finish()
    }
}

impl ItemOptions {
    pub fn disabled(mut self, disabled: bool) -> Self {
        self.disabled = disabled;
        self
    }

    pub fn text_value(mut self, text: impl Into<String>) -> Self {
        self.text_value = Some(text.into());
        self
    }

    pub fn on_select(mut self, callback: impl Fn() + 'static) -> Self {
        self.on_select = Some(Rc::new(callback));
        self
    }

    fn into_item(self, element: ElementId) -> NavigableItem {
        NavigableItem {
            element,
            disabled: self.disabled,
            on_activate: self.on_select,
            text_value: self.text_value,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum InitialItem {
    First,
    Last,
}

// =============================================================================
// MENU
// =============================================================================

struct MenuInner {
    core: InstanceCore,
    config: RefCell<MenuConfig>,
    state: StateStore,
    nav: ListNavigator,
    typeahead: Typeahead,
    floating: Floating,
    trigger: Cell<Option<ElementId>>,
    content: Cell<Option<ElementId>>,
    snapshot: Cell<Option<FocusSnapshot>>,
    outside_listener: Cell<Option<ListenerId>>,
}

/// Headless dropdown menu. Cloning shares the instance.
#[derive(Clone)]
pub struct Menu {
    inner: Rc<MenuInner>,
}

impl Menu {
    pub fn new(host: Host, config: MenuConfig) -> Self {
        let id = resolve_id(config.id.as_deref(), "menu");
        let state = StateStore::builder()
            .field("open", false)
            .field("focusedIndex", -1)
            .alias("focusedIndex", "activeIndex")
            .field("placement", config.placement.to_string())
            .field("x", 0.0)
            .field("y", 0.0)
            .build();
        let nav = ListNavigator::new(
            state.clone(),
            "focusedIndex",
            config.loop_focus,
            host.document().cloned(),
        );
        let core = InstanceCore::new(host, id, config.on_destroy.clone());
        let typeahead = Typeahead::new(core.slots().clone());
        let floating = Floating::new(config.position_options());

        let menu = Self {
            inner: Rc::new(MenuInner {
                core,
                config: RefCell::new(config),
                state,
                nav,
                typeahead,
                floating,
                trigger: Cell::new(None),
                content: Cell::new(None),
                snapshot: Cell::new(None),
                outside_listener: Cell::new(None),
            }),
        };

        let weak = Rc::downgrade(&menu.inner);
        menu.inner.state.bind_dom_sync(move |_| {
            if let Some(menu) = Self::upgrade(&weak) {
                menu.sync_dom();
            }
        });
        menu
    }

    fn upgrade(weak: &Weak<MenuInner>) -> Option<Self> {
        weak.upgrade().map(|inner| Self { inner })
    }

    fn weak(&self) -> Weak<MenuInner> {
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

    /// Focused item index, `None` when nothing is focused.
    pub fn active_index(&self) -> Option<usize> {
        self.inner.nav.current()
    }

    pub fn item_count(&self) -> usize {
        self.inner.nav.len()
    }

    // -------------------------------------------------------------------------
    // Parts
    // -------------------------------------------------------------------------

    pub fn trigger(&self, element: ElementId) -> Result<Binding> {
        let core = &self.inner.core;
        if core.bind_part(element, TRIGGER)? {
            let weak = self.weak();
            core.listen_part(element, TRIGGER, element, EventKind::Click, move |_| {
                if let Some(menu) = Self::upgrade(&weak) {
                    menu.toggle();
                }
            });
            let weak = self.weak();
            core.listen_part(element, TRIGGER, element, EventKind::KeyDown, move |event| {
                if let Some(menu) = Self::upgrade(&weak) {
                    menu.handle_trigger_key(event);
                }
            });
        }
        self.inner.trigger.set(Some(element));
        self.sync_dom();

        let weak = self.weak();
        Ok(Binding::from_destroy(move || {
            let Some(menu) = Self::upgrade(&weak) else { return };
            menu.inner.core.unbind_part(element, TRIGGER, TRIGGER_ATTRIBUTES);
            if menu.inner.trigger.get() == Some(element) {
                menu.inner.trigger.set(None);
            }
        }))
    }

    pub fn content(&self, element: ElementId) -> Result<Binding> {
        let core = &self.inner.core;
        if core.bind_part(element, CONTENT)? {
            let weak = self.weak();
            core.listen_part(element, CONTENT, element, EventKind::KeyDown, move |event| {
                if let Some(menu) = Self::upgrade(&weak) {
                    menu.handle_content_key(event);
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
            let Some(menu) = Self::upgrade(&weak) else { return };
            menu.inner.core.unbind_part(element, CONTENT, CONTENT_ATTRIBUTES);
            if menu.inner.content.get() == Some(element) {
                menu.inner.content.set(None);
            }
        }))
    }

    /// Register a menu item. Binding the same element again updates it.
    pub fn item(&self, element: ElementId, options: ItemOptions) -> Result<Binding<ItemOptions>> {
        let core = &self.inner.core;
        if core.bind_part(element, ITEM)? {
            let weak = self.weak();
            core.listen_part(element, ITEM, element, EventKind::Click, move |event| {
                if let Some(menu) = Self::upgrade(&weak) {
                    menu.handle_item_click(element, event);
                }
            });
            let weak = self.weak();
            core.listen_part(element, ITEM, element, EventKind::PointerEnter, move |_| {
                if let Some(menu) = Self::upgrade(&weak) {
                    menu.handle_item_hover(element);
                }
            });
        }
        self.register_item(element, options);

        let on_update = self.weak();
        let on_destroy = self.weak();
        Ok(Binding::new(
            move |options: ItemOptions| {
                if let Some(menu) = Self::upgrade(&on_update) {
                    menu.register_item(element, options);
                }
            },
            move || {
                if let Some(menu) = Self::upgrade(&on_destroy) {
                    menu.inner.nav.unregister(element);
                    menu.inner.core.unbind_part(element, ITEM, ITEM_ATTRIBUTES);
                    menu.sync_dom();
                }
            },
        ))
    }

    fn register_item(&self, element: ElementId, options: ItemOptions) {
        if self.inner.core.is_destroyed() {
            return;
        }
        let index = self.inner.nav.register(options.into_item(element));
        tracing::trace!(id = %self.id(), %element, index, "menu item registered");
        self.sync_dom();
    }

    // -------------------------------------------------------------------------
    // Event handlers
    // -------------------------------------------------------------------------

    fn handle_trigger_key(&self, event: &Event) {
        let Some(key) = &event.key else { return };
        let initial = match key.key.as_str() {
            "ArrowDown" => InitialItem::First,
            "ArrowUp" => InitialItem::Last,
            k if is_activation_key(k) => InitialItem::First,
            _ => return,
        };
        event.prevent_default();
        if self.is_open() {
            match initial {
                InitialItem::First => self.inner.nav.focus_first(),
                InitialItem::Last => self.inner.nav.focus_last(),
            };
        } else {
            self.open_with(initial);
        }
    }

    fn handle_content_key(&self, event: &Event) {
        if !self.is_open() {
            return;
        }
        let Some(key) = &event.key else { return };

        if let Some(direction) = navigation_direction_for(&key.key, Orientation::Vertical) {
            event.prevent_default();
            self.inner.nav.move_by(direction);
            return;
        }
        if is_escape_key(&key.key) {
            event.prevent_default();
            event.stop_propagation();
            self.dismiss();
            return;
        }
        if is_tab_key(&key.key) {
            self.dismiss();
            return;
        }
        if is_activation_key(&key.key) {
            event.prevent_default();
            if let Some(index) = self.active_index() {
                self.activate(index);
            }
            return;
        }
        if let Some(ch) = key.printable_char() {
            if self.inner.config.borrow().typeahead {
                event.prevent_default();
                self.typeahead(ch);
            }
        }
    }

    fn handle_item_click(&self, element: ElementId, event: &Event) {
        let Some(index) = self.inner.nav.index_of(element) else { return };
        if self.inner.nav.item(index).is_some_and(|item| item.disabled) {
            event.prevent_default();
            return;
        }
        self.activate(index);
    }

    fn handle_item_hover(&self, element: ElementId) {
        if !self.is_open() {
            return;
        }
        let Some(index) = self.inner.nav.index_of(element) else { return };
        if self.active_index() != Some(index) {
            self.inner.nav.set_focused_index(index as i64);
        }
    }

    fn handle_outside_pointer(&self, event: &Event) {
        let Some(doc) = self.inner.core.document() else { return };
        let Some(target) = event.target_element() else { return };
        let inside = |part: Option<ElementId>| part.is_some_and(|el| doc.contains(el, target));
        if inside(self.inner.content.get()) || inside(self.inner.trigger.get()) {
            return;
        }
        self.dismiss();
    }

    fn typeahead(&self, ch: char) {
        let query = self.inner.typeahead.push(ch);
        let doc = self.inner.core.document();
        let candidates: Vec<(String, bool)> = self
            .inner
            .nav
            .items()
            .into_iter()
            .map(|item| {
                let text = item
                    .text_value
                    .or_else(|| doc.map(|doc| doc.text_content(item.element)))
                    .unwrap_or_default();
                (text, item.disabled)
            })
            .collect();
        if let Some(index) = find_match(&candidates, &query) {
            if Some(index) != self.active_index() {
                self.inner.nav.focus_index(index);
            }
        }
    }

    // -------------------------------------------------------------------------
    // Helpers
    // -------------------------------------------------------------------------

    /// Open with the first enabled item focused.
    pub fn open(&self) -> bool {
        self.open_with(InitialItem::First)
    }

    fn open_with(&self, initial: InitialItem) -> bool {
        if self.inner.core.is_destroyed() || self.is_open() {
            return false;
        }
        let config = self.inner.config.borrow().clone();
        if let Some(doc) = self.inner.core.document() {
            self.inner
                .snapshot
                .set(Some(FocusSnapshot::capture(doc, config.return_focus)));
        }

        self.inner.nav.reset();
        let _ = self.inner.state.set("open", true);
        self.update_position();

        let weak = self.weak();
        self.inner.floating.track(&self.inner.core, move || {
            if let Some(menu) = Self::upgrade(&weak) {
                menu.update_position();
            }
        });
        let weak = self.weak();
        let listener = self.inner.core.listen(EventTarget::Document, EventKind::PointerDown, move |event| {
            if let Some(menu) = Self::upgrade(&weak) {
                menu.handle_outside_pointer(event);
            }
        });
        self.inner.outside_listener.set(listener);

        if self.inner.nav.is_empty() {
            // Items may register right after open; try again next tick.
            let weak = self.weak();
            self.inner.core.slots().schedule(FOCUS_FIRST_SLOT, 0, move || {
                if let Some(menu) = Self::upgrade(&weak) {
                    menu.focus_initial(initial);
                }
            });
        } else {
            self.focus_initial(initial);
        }

        tracing::debug!(id = %self.id(), "menu opened");
        if let Some(callback) = config.on_open_change {
            callback(true);
        }
        true
    }

    fn focus_initial(&self, initial: InitialItem) {
        if !self.is_open() {
            return;
        }
        match initial {
            InitialItem::First => self.inner.nav.focus_first(),
            InitialItem::Last => self.inner.nav.focus_last(),
        };
    }

    /// Close, restoring focus to where it was before opening.
    pub fn close(&self) -> bool {
        let Some(snapshot) = self.close_silently() else {
            return false;
        };
        if let (Some(snapshot), Some(doc)) = (snapshot, self.inner.core.document()) {
            snapshot.restore(doc, self.inner.trigger.get());
        }
        self.notify_closed();
        true
    }

    /// Close and focus the trigger (Escape, Tab, outside press).
    fn dismiss(&self) {
        if self.close_silently().is_none() {
            return;
        }
        let return_focus = self.inner.config.borrow().return_focus;
        if let (true, Some(doc), Some(trigger)) =
            (return_focus, self.inner.core.document(), self.inner.trigger.get())
        {
            focus_and_notify(doc, trigger);
        }
        self.notify_closed();
    }

    /// Tear down the open session. `None` when already closed.
    fn close_silently(&self) -> Option<Option<FocusSnapshot>> {
        if self.inner.core.is_destroyed() || !self.is_open() {
            return None;
        }
        self.inner.core.slots().cancel(FOCUS_FIRST_SLOT);
        self.inner.typeahead.clear();
        self.inner.floating.untrack(&self.inner.core);
        if let Some(listener) = self.inner.outside_listener.take() {
            self.inner.core.unlisten([listener]);
        }
        let _ = self.inner.state.set("open", false);
        self.inner.nav.reset();
        Some(self.inner.snapshot.take())
    }

    fn notify_closed(&self) {
        tracing::debug!(id = %self.id(), "menu closed");
        let callback = self.inner.config.borrow().on_open_change.clone();
        if let Some(callback) = callback {
            callback(false);
        }
    }

    pub fn toggle(&self) {
        if self.is_open() {
            self.close();
        } else {
            self.open();
        }
    }

    /// Focus `index`. Out-of-range and disabled indices are ignored.
    pub fn set_active_index(&self, index: i64) -> bool {
        self.inner.nav.set_focused_index(index)
    }

    /// Activate the item at `index` as if it were clicked.
    pub fn select(&self, index: usize) -> bool {
        if self.inner.core.is_destroyed() {
            return false;
        }
        self.activate(index)
    }

    fn activate(&self, index: usize) -> bool {
        let Some(item) = self.inner.nav.item(index) else {
            return false;
        };
        if item.disabled {
            return false;
        }
        tracing::debug!(id = %self.id(), index, "menu item selected");
        if let Some(callback) = item.on_activate {
            callback();
        }
        if self.inner.config.borrow().close_on_select {
            self.close();
        }
        true
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

    pub fn set_loop(&self, looping: bool) {
        self.inner.config.borrow_mut().loop_focus = looping;
        self.inner.nav.set_looping(looping);
    }

    pub fn destroy(&self) {
        self.inner.snapshot.take();
        self.inner.typeahead.clear();
        if self.inner.core.destroy() {
            self.inner.nav.clear();
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
        let trigger_id = self.inner.core.part_id("trigger");
        let content_id = self.inner.core.part_id("content");

        if let Some(trigger) = self.inner.trigger.get() {
            doc.set_attribute(trigger, "id", trigger_id.as_str());
            doc.set_attribute(trigger, "aria-haspopup", "menu");
            doc.set_attribute(trigger, "aria-expanded", open.to_string());
            doc.set_attribute(trigger, "aria-controls", content_id.as_str());
            doc.set_attribute(trigger, "data-state", data_state);
        }
        if let Some(content) = self.inner.content.get() {
            doc.set_attribute(content, "id", content_id.as_str());
            doc.set_attribute(content, "role", "menu");
            doc.set_attribute(content, "aria-labelledby", trigger_id.as_str());
            doc.set_attribute(content, "aria-orientation", "vertical");
            doc.set_attribute(content, "tabindex", "-1");
            doc.set_attribute(content, "data-state", data_state);
            doc.toggle_attribute(content, "hidden", (!open).then(String::new));
        }

        let active = self.active_index();
        for (index, item) in self.inner.nav.items().iter().enumerate() {
            let element = item.element;
            doc.set_attribute(element, "role", "menuitem");
            doc.set_attribute(element, "tabindex", "-1");
            doc.toggle_attribute(element, "aria-disabled", item.disabled.then(|| "true".to_string()));
            doc.toggle_attribute(element, "data-disabled", item.disabled.then(String::new));
            doc.toggle_attribute(element, "data-active", (active == Some(index)).then(String::new));
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
    use crate::types::Rect;

    struct Fixture {
        doc: Document,
        host: Host,
        trigger: ElementId,
        content: ElementId,
        items: Vec<ElementId>,
    }

    fn setup(labels: &[&str]) -> Fixture {
        reset_id_counter();
        let doc = Document::new();
        let host = Host::new(doc.clone());
        let trigger = doc.create_child(doc.body(), "button");
        let content = doc.create_child(doc.body(), "div");
        let items = labels
            .iter()
            .map(|label| {
                let item = doc.create_child(content, "div");
                doc.set_text(item, *label);
                item
            })
            .collect();
        Fixture { doc, host, trigger, content, items }
    }

    fn bind(f: &Fixture, menu: &Menu, disabled: &[usize]) -> Vec<Binding<ItemOptions>> {
        let _ = menu.trigger(f.trigger).unwrap();
        let _ = menu.content(f.content).unwrap();
        f.items
            .iter()
            .enumerate()
            .map(|(i, &el)| menu.item(el, ItemOptions::default().disabled(disabled.contains(&i))).unwrap())
            .collect()
    }

    #[test]
    fn test_trigger_aria() {
        let f = setup(&["Cut", "Copy"]);
        let menu = Menu::new(f.host.clone(), MenuConfig::default());
        let _items = bind(&f, &menu, &[]);
        assert_eq!(f.doc.attribute(f.trigger, "aria-haspopup").as_deref(), Some("menu"));
        assert_eq!(f.doc.attribute(f.trigger, "aria-expanded").as_deref(), Some("false"));
        assert_eq!(f.doc.attribute(f.trigger, "aria-controls").as_deref(), Some("menu-0-content"));
        assert_eq!(f.doc.attribute(f.content, "role").as_deref(), Some("menu"));
        assert_eq!(f.doc.attribute(f.items[0], "role").as_deref(), Some("menuitem"));
        assert!(f.doc.has_attribute(f.content, "hidden"));
    }

    #[test]
    fn test_open_focuses_first_enabled() {
        let f = setup(&["Cut", "Copy", "Paste"]);
        let menu = Menu::new(f.host.clone(), MenuConfig::default());
        let _items = bind(&f, &menu, &[0]);
        f.doc.click(f.trigger);
        assert!(menu.is_open());
        assert_eq!(menu.active_index(), Some(1));
        assert_eq!(f.doc.active_element(), Some(f.items[1]));
        assert!(f.doc.has_attribute(f.items[1], "data-active"));
        assert_eq!(f.doc.attribute(f.items[0], "aria-disabled").as_deref(), Some("true"));
    }

    #[test]
    fn test_alias_stays_in_sync() {
        let f = setup(&["A", "B", "C"]);
        let menu = Menu::new(f.host.clone(), MenuConfig::default());
        let _items = bind(&f, &menu, &[]);
        menu.open();
        f.doc.key_down(f.items[0], "ArrowDown");
        assert_eq!(menu.state().get_int("focusedIndex"), Ok(1));
        assert_eq!(menu.state().get_int("activeIndex"), Ok(1));
    }

    #[test]
    fn test_arrow_up_on_trigger_opens_to_last() {
        let f = setup(&["A", "B", "C"]);
        let menu = Menu::new(f.host.clone(), MenuConfig::default());
        let _items = bind(&f, &menu, &[]);
        assert!(f.doc.key_down(f.trigger, "ArrowUp"));
        assert_eq!(menu.active_index(), Some(2));
    }

    #[test]
    fn test_no_loop_clamps() {
        let f = setup(&["A", "B"]);
        let menu = Menu::new(f.host.clone(), MenuConfig { loop_focus: false, ..Default::default() });
        let _items = bind(&f, &menu, &[]);
        menu.open();
        f.doc.key_down(f.items[0], "End");
        f.doc.key_down(f.items[1], "ArrowDown");
        assert_eq!(menu.active_index(), Some(1));
    }

    #[test]
    fn test_focus_first_deferred_until_items_register() {
        let f = setup(&["A", "B"]);
        let menu = Menu::new(f.host.clone(), MenuConfig::default());
        let _t = menu.trigger(f.trigger).unwrap();
        menu.open();
        assert_eq!(menu.active_index(), None);
        let _items: Vec<_> = f
            .items
            .iter()
            .map(|&el| menu.item(el, ItemOptions::default()).unwrap())
            .collect();
        f.host.scheduler().advance(0);
        assert_eq!(menu.active_index(), Some(0));
    }

    #[test]
    fn test_activation_runs_callback_and_closes() {
        let f = setup(&["A"]);
        let menu = Menu::new(f.host.clone(), MenuConfig::default());
        let _t = menu.trigger(f.trigger).unwrap();
        let _c = menu.content(f.content).unwrap();
        let hits = Rc::new(Cell::new(0));
        let h = hits.clone();
        let _i = menu
            .item(f.items[0], ItemOptions::default().on_select(move || h.set(h.get() + 1)))
            .unwrap();

        f.doc.focus(f.trigger);
        menu.open();
        f.doc.key_down(f.items[0], "Enter");
        assert_eq!(hits.get(), 1);
        assert!(!menu.is_open());
        assert_eq!(f.doc.active_element(), Some(f.trigger));
    }

    #[test]
    fn test_close_on_select_disabled_keeps_open() {
        let f = setup(&["A"]);
        let menu = Menu::new(f.host.clone(), MenuConfig { close_on_select: false, ..Default::default() });
        let _items = bind(&f, &menu, &[]);
        menu.open();
        f.doc.click(f.items[0]);
        assert!(menu.is_open());
    }

    #[test]
    fn test_item_update_in_place() {
        let f = setup(&["A", "B"]);
        let menu = Menu::new(f.host.clone(), MenuConfig::default());
        let items = bind(&f, &menu, &[]);
        let listeners = f.doc.listener_count();

        items[0].update(ItemOptions::default().disabled(true));
        let again = menu.item(f.items[1], ItemOptions::default()).unwrap();
        assert_eq!(menu.item_count(), 2);
        assert_eq!(f.doc.listener_count(), listeners);
        assert!(!menu.select(0));
        drop(again);
    }

    #[test]
    fn test_item_destroy_unregisters() {
        let f = setup(&["A", "B"]);
        let menu = Menu::new(f.host.clone(), MenuConfig::default());
        let mut items = bind(&f, &menu, &[]);
        items[0].destroy();
        assert_eq!(menu.item_count(), 1);
        assert!(!f.doc.has_attribute(f.items[0], "role"));
        assert_eq!(f.doc.listener_count_for(f.items[0]), 0);
    }

    #[test]
    fn test_escape_and_tab_return_focus_to_trigger() {
        for key in ["Escape", "Tab"] {
            let f = setup(&["A", "B"]);
            let menu = Menu::new(f.host.clone(), MenuConfig::default());
            let _items = bind(&f, &menu, &[]);
            menu.open();
            f.doc.key_down(f.items[0], key);
            assert!(!menu.is_open(), "{key}");
            assert_eq!(f.doc.active_element(), Some(f.trigger), "{key}");
        }
    }

    #[test]
    fn test_outside_press_closes() {
        let f = setup(&["A"]);
        let elsewhere = f.doc.create_child(f.doc.body(), "div");
        let menu = Menu::new(f.host.clone(), MenuConfig::default());
        let _items = bind(&f, &menu, &[]);
        menu.open();
        f.doc.pointer_down(f.items[0]);
        assert!(menu.is_open());
        f.doc.pointer_down(elsewhere);
        assert!(!menu.is_open());
        assert_eq!(f.doc.active_element(), Some(f.trigger));
    }

    #[test]
    fn test_typeahead_jumps_and_expires() {
        let f = setup(&["Apple", "Banana", "Blueberry", "Cherry"]);
        let menu = Menu::new(f.host.clone(), MenuConfig::default());
        let _items = bind(&f, &menu, &[]);
        menu.open();
        f.doc.key_down(f.items[0], "b");
        assert_eq!(menu.active_index(), Some(1));
        f.doc.key_down(f.items[1], "l");
        assert_eq!(menu.active_index(), Some(2));

        f.host.scheduler().advance(500);
        f.doc.key_down(f.items[2], "c");
        assert_eq!(menu.active_index(), Some(3));
    }

    #[test]
    fn test_typeahead_moves_to_first_match() {
        let f = setup(&["Apple", "Avocado"]);
        let menu = Menu::new(f.host.clone(), MenuConfig::default());
        let _items = bind(&f, &menu, &[]);
        menu.open();
        assert!(menu.set_active_index(1));
        f.doc.key_down(f.items[1], "a");
        assert_eq!(menu.active_index(), Some(0));
        assert_eq!(f.doc.active_element(), Some(f.items[0]));
    }

    #[test]
    fn test_hover_focuses_item() {
        let f = setup(&["A", "B"]);
        let menu = Menu::new(f.host.clone(), MenuConfig::default());
        let _items = bind(&f, &menu, &[]);
        menu.open();
        f.doc.pointer_enter(f.items[1]);
        assert_eq!(menu.active_index(), Some(1));
    }

    #[test]
    fn test_set_active_index_ignores_invalid() {
        let f = setup(&["A", "B"]);
        let menu = Menu::new(f.host.clone(), MenuConfig::default());
        let _items = bind(&f, &menu, &[1]);
        menu.open();
        assert!(!menu.set_active_index(5));
        assert!(!menu.set_active_index(1));
        assert_eq!(menu.active_index(), Some(0));
    }

    #[test]
    fn test_position_written_on_open() {
        let f = setup(&["A"]);
        f.doc.set_rect(f.trigger, Rect::new(100.0, 100.0, 80.0, 30.0));
        f.doc.set_rect(f.content, Rect::new(0.0, 0.0, 120.0, 60.0));
        let menu = Menu::new(f.host.clone(), MenuConfig::default());
        let _items = bind(&f, &menu, &[]);
        menu.open();
        assert_eq!(menu.state().get_float("x"), Ok(100.0));
        assert_eq!(menu.state().get_float("y"), Ok(138.0));
        assert_eq!(f.doc.attribute(f.content, "data-placement").as_deref(), Some("bottom-start"));

        f.doc.set_rect(f.trigger, Rect::new(200.0, 100.0, 80.0, 30.0));
        f.doc.scroll(EventTarget::Window);
        assert_eq!(menu.state().get_float("x"), Ok(200.0));
    }

    #[test]
    fn test_destroy_cancels_deferred_focus() {
        let f = setup(&[]);
        let menu = Menu::new(f.host.clone(), MenuConfig::default());
        menu.open();
        assert_eq!(f.host.scheduler().pending(), 1);
        menu.destroy();
        assert_eq!(f.host.scheduler().pending(), 0);
        assert_eq!(f.doc.listener_count(), 0);
        assert!(!menu.open());
    }

    #[test]
    fn test_double_open_close_single_callbacks() {
        let f = setup(&["A"]);
        let calls = Rc::new(RefCell::new(Vec::new()));
        let c = calls.clone();
        let menu = Menu::new(f.host.clone(), MenuConfig {
            on_open_change: Some(Rc::new(move |open: bool| c.borrow_mut().push(open))),
            ..Default::default()
        });
        let _items = bind(&f, &menu, &[]);
        assert!(menu.open());
        assert!(!menu.open());
        assert!(menu.close());
        assert!(!menu.close());
        assert_eq!(*calls.borrow(), vec![true, false]);
    }

    #[test]
    fn test_config_from_json() {
        let config: MenuConfig =
            serde_json::from_str(r#"{"loop":false,"placement":"top-end","closeOnSelect":false}"#).unwrap();
        assert!(!config.loop_focus);
        assert_eq!(config.placement, Placement::TOP_END);
        assert!(!config.close_on_select);
        assert!(config.typeahead);
    }
}
