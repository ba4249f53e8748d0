//! Navigation - Keyboard movement through a list of items
//!
//! Three layers:
//! - [`ItemRegistry`]: the ordered items a primitive has bound (registration order)
//! - pure index math ([`next_enabled`], [`first_enabled`], [`last_enabled`])
//!   implementing the loop/clamp policy and disabled-item skipping
//! - [`ListNavigator`]: writes the focused index into a [`StateStore`] and
//!   moves document focus to match
//!
//! An index of `-1` in state means nothing is focused.
//!
//! # Example
//!
//! ```ignore
//! let nav = ListNavigator::new(state.clone(), "focusedIndex", true, host.document().cloned());
//! nav.register(NavigableItem::new(first));
//! nav.register(NavigableItem::new(second));
//! nav.move_by(NavDirection::Last);
//! nav.move_by(NavDirection::Next); // loops back to 0
//! ```

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use super::focus::focus_and_notify;
use super::keyboard::NavDirection;
use super::store::StateStore;
use crate::dom::{Document, ElementId};

// =============================================================================
// ITEMS
// =============================================================================

/// Item activation callback.
pub type ActivateCallback = Rc<dyn Fn()>;

/// One navigable element.
#[derive(Clone)]
pub struct NavigableItem {
    pub element: ElementId,
    pub disabled: bool,
    pub on_activate: Option<ActivateCallback>,
    /// Text used for typeahead instead of the element's text content.
    pub text_value: Option<String>,
}

impl fmt::Debug for NavigableItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NavigableItem")
            .field("element", &self.element)
            .field("disabled", &self.disabled)
            .field("on_activate", &self.on_activate.is_some())
            .field("text_value", &self.text_value)
            .finish()
    }
}

impl NavigableItem {
    pub fn new(element: ElementId) -> Self {
        Self {
            element,
            disabled: false,
            on_activate: None,
            text_value: None,
        }
    }

    pub fn disabled(mut self, disabled: bool) -> Self {
        self.disabled = disabled;
        self
    }

    pub fn on_activate(mut self, callback: impl Fn() + 'static) -> Self {
        self.on_activate = Some(Rc::new(callback));
        self
    }

    pub fn text_value(mut self, text: impl Into<String>) -> Self {
        self.text_value = Some(text.into());
        self
    }
}

/// Ordered item list. Never holds two entries for the same element.
#[derive(Debug, Default)]
pub struct ItemRegistry {
    items: Vec<NavigableItem>,
}

impl ItemRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an item, or update the existing entry for the same element in
    /// place. Returns the item's ordinal index.
    pub fn register(&mut self, item: NavigableItem) -> usize {
        match self.index_of(item.element) {
            Some(index) => {
                self.items[index] = item;
                index
            }
            None => {
                self.items.push(item);
                self.items.len() - 1
            }
        }
    }

    /// Remove the entry for `element`, returning the index it had.
    pub fn unregister(&mut self, element: ElementId) -> Option<usize> {
        let index = self.index_of(element)?;
        self.items.remove(index);
        Some(index)
    }

    pub fn index_of(&self, element: ElementId) -> Option<usize> {
        self.items.iter().position(|item| item.element == element)
    }

    pub fn get(&self, index: usize) -> Option<&NavigableItem> {
        self.items.get(index)
    }

    pub fn items(&self) -> &[NavigableItem] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn disabled_flags(&self) -> Vec<bool> {
        self.items.iter().map(|item| item.disabled).collect()
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }
}

// =============================================================================
// INDEX MATH
// =============================================================================

/// First index whose item is enabled.
pub fn first_enabled(disabled: &[bool]) -> Option<usize> {
    disabled.iter().position(|&d| !d)
}

/// Last index whose item is enabled.
pub fn last_enabled(disabled: &[bool]) -> Option<usize> {
    disabled.iter().rposition(|&d| !d)
}

fn step(index: usize, len: usize, forward: bool, looping: bool) -> Option<usize> {
    if forward {
        if index + 1 < len {
            Some(index + 1)
        } else if looping {
            Some(0)
        } else {
            None
        }
    } else if index > 0 {
        Some(index - 1)
    } else if looping {
        Some(len - 1)
    } else {
        None
    }
}

/// The next enabled index from `current` in one direction.
///
/// Moving past either end wraps when `looping`, otherwise stops (`None`).
/// Disabled items are skipped under the same rule. With nothing focused,
/// forward lands on the first enabled item and backward on the last.
/// `None` means focus stays where it is.
pub fn next_enabled(
    disabled: &[bool],
    current: Option<usize>,
    forward: bool,
    looping: bool,
) -> Option<usize> {
    let len = disabled.len();
    if len == 0 {
        return None;
    }
    let Some(current) = current.filter(|&index| index < len) else {
        return if forward {
            first_enabled(disabled)
        } else {
            last_enabled(disabled)
        };
    };

    let mut index = current;
    for _ in 0..len {
        index = step(index, len, forward, looping)?;
        if !disabled[index] {
            return Some(index);
        }
    }
    None
}

/// Resolve a [`NavDirection`] against the disabled flags.
pub fn resolve_direction(
    disabled: &[bool],
    current: Option<usize>,
    direction: NavDirection,
    looping: bool,
) -> Option<usize> {
    match direction {
        NavDirection::Next => next_enabled(disabled, current, true, looping),
        NavDirection::Previous => next_enabled(disabled, current, false, looping),
        NavDirection::First => first_enabled(disabled),
        NavDirection::Last => last_enabled(disabled),
    }
}

// =============================================================================
// LIST NAVIGATOR
// =============================================================================

/// Focus movement over registered items, mirrored into a state field.
pub struct ListNavigator {
    registry: RefCell<ItemRegistry>,
    state: StateStore,
    field: &'static str,
    looping: Cell<bool>,
    document: Option<Document>,
}

impl fmt::Debug for ListNavigator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ListNavigator")
            .field("items", &self.registry.borrow().len())
            .field("field", &self.field)
            .field("looping", &self.looping.get())
            .finish()
    }
}

impl ListNavigator {
    pub fn new(
        state: StateStore,
        field: &'static str,
        looping: bool,
        document: Option<Document>,
    ) -> Self {
        Self {
            registry: RefCell::new(ItemRegistry::new()),
            state,
            field,
            looping: Cell::new(looping),
            document,
        }
    }

    pub fn set_looping(&self, looping: bool) {
        self.looping.set(looping);
    }

    pub fn looping(&self) -> bool {
        self.looping.get()
    }

    // -------------------------------------------------------------------------
    // Registry
    // -------------------------------------------------------------------------

    pub fn register(&self, item: NavigableItem) -> usize {
        self.registry.borrow_mut().register(item)
    }

    /// Remove an item, keeping the focused index pointing at the same item.
    pub fn unregister(&self, element: ElementId) -> Option<usize> {
        let removed = self.registry.borrow_mut().unregister(element)?;
        if let Some(current) = self.current() {
            let adjusted = match current.cmp(&removed) {
                std::cmp::Ordering::Less => Some(current as i64),
                std::cmp::Ordering::Equal => None,
                std::cmp::Ordering::Greater => Some(current as i64 - 1),
            };
            let _ = self.state.set(self.field, adjusted.unwrap_or(-1));
        }
        Some(removed)
    }

    pub fn len(&self) -> usize {
        self.registry.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.registry.borrow().is_empty()
    }

    pub fn index_of(&self, element: ElementId) -> Option<usize> {
        self.registry.borrow().index_of(element)
    }

    pub fn item(&self, index: usize) -> Option<NavigableItem> {
        self.registry.borrow().get(index).cloned()
    }

    pub fn items(&self) -> Vec<NavigableItem> {
        self.registry.borrow().items().to_vec()
    }

    pub fn elements(&self) -> Vec<ElementId> {
        self.registry
            .borrow()
            .items()
            .iter()
            .map(|item| item.element)
            .collect()
    }

    pub fn disabled_flags(&self) -> Vec<bool> {
        self.registry.borrow().disabled_flags()
    }

    pub fn clear(&self) {
        self.registry.borrow_mut().clear();
    }

    // -------------------------------------------------------------------------
    // Movement
    // -------------------------------------------------------------------------

    /// Focused index, `None` while the field holds `-1`.
    pub fn current(&self) -> Option<usize> {
        self.state
            .get_int(self.field)
            .ok()
            .filter(|&index| index >= 0)
            .map(|index| index as usize)
    }

    /// Move in `direction`. Returns the new index when focus moved.
    pub fn move_by(&self, direction: NavDirection) -> Option<usize> {
        let disabled = self.disabled_flags();
        let current = self.current();
        let target = resolve_direction(&disabled, current, direction, self.looping.get());
        tracing::trace!(?direction, ?current, ?target, "list navigation");
        let target = target?;
        self.focus_index(target);
        Some(target)
    }

    pub fn focus_next(&self) -> Option<usize> {
        self.move_by(NavDirection::Next)
    }

    pub fn focus_previous(&self) -> Option<usize> {
        self.move_by(NavDirection::Previous)
    }

    pub fn focus_first(&self) -> Option<usize> {
        self.move_by(NavDirection::First)
    }

    pub fn focus_last(&self) -> Option<usize> {
        self.move_by(NavDirection::Last)
    }

    /// Focus `index` if it names an enabled item; otherwise leave state alone.
    pub fn set_focused_index(&self, index: i64) -> bool {
        let valid = usize::try_from(index)
            .ok()
            .and_then(|index| self.item(index).map(|item| (index, item)))
            .filter(|(_, item)| !item.disabled);
        match valid {
            Some((index, _)) => {
                self.focus_index(index);
                true
            }
            None => {
                tracing::warn!(index, items = self.len(), "ignoring focus of missing or disabled item");
                false
            }
        }
    }

    /// Write the index, then move document focus to the item.
    pub fn focus_index(&self, index: usize) {
        let _ = self.state.set(self.field, index as i64);
        let element = self.item(index).map(|item| item.element);
        if let (Some(doc), Some(element)) = (&self.document, element) {
            focus_and_notify(doc, element);
        }
    }

    /// Clear the focused index without touching document focus.
    pub fn reset(&self) {
        let _ = self.state.set(self.field, -1);
    }

    /// Roving tabindex: `0` on `active` (or the first enabled item when
    /// nothing is active), `-1` everywhere else.
    pub fn sync_roving_tabindex(&self, active: Option<usize>) {
        let Some(doc) = &self.document else { return };
        let items = self.items();
        let disabled: Vec<bool> = items.iter().map(|item| item.disabled).collect();
        let tabbable = active
            .filter(|&index| index < items.len())
            .or_else(|| first_enabled(&disabled));
        for (index, item) in items.iter().enumerate() {
            let value = if Some(index) == tabbable { "0" } else { "-1" };
            doc.set_attribute(item.element, "tabindex", value);
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::EventKind;

    fn store() -> StateStore {
        StateStore::builder().field("focusedIndex", -1).build()
    }

    #[test]
    fn test_next_loops_and_clamps() {
        let flags = [false, false, false];
        assert_eq!(next_enabled(&flags, Some(2), true, true), Some(0));
        assert_eq!(next_enabled(&flags, Some(2), true, false), None);
        assert_eq!(next_enabled(&flags, Some(0), false, true), Some(2));
        assert_eq!(next_enabled(&flags, Some(0), false, false), None);
        assert_eq!(next_enabled(&flags, Some(1), true, false), Some(2));
    }

    #[test]
    fn test_skips_disabled() {
        let flags = [false, true, false, true];
        assert_eq!(next_enabled(&flags, Some(0), true, false), Some(2));
        assert_eq!(next_enabled(&flags, Some(2), true, true), Some(0));
        assert_eq!(next_enabled(&flags, Some(2), true, false), None);
        assert_eq!(first_enabled(&[true, false]), Some(1));
        assert_eq!(last_enabled(&[false, true]), Some(0));
    }

    #[test]
    fn test_all_disabled_and_empty() {
        assert_eq!(next_enabled(&[true, true], Some(0), true, true), None);
        assert_eq!(next_enabled(&[true, true], None, true, true), None);
        assert_eq!(next_enabled(&[], None, true, true), None);
        assert_eq!(first_enabled(&[]), None);
    }

    #[test]
    fn test_from_nothing_focused() {
        let flags = [true, false, false, true];
        assert_eq!(next_enabled(&flags, None, true, false), Some(1));
        assert_eq!(next_enabled(&flags, None, false, false), Some(2));
    }

    #[test]
    fn test_registry_updates_in_place() {
        let doc = Document::new();
        let a = doc.create_child(doc.body(), "li");
        let b = doc.create_child(doc.body(), "li");
        let mut registry = ItemRegistry::new();
        assert_eq!(registry.register(NavigableItem::new(a)), 0);
        assert_eq!(registry.register(NavigableItem::new(b)), 1);
        assert_eq!(registry.register(NavigableItem::new(a).disabled(true)), 0);
        assert_eq!(registry.len(), 2);
        assert!(registry.get(0).is_some_and(|item| item.disabled));
        assert_eq!(registry.unregister(a), Some(0));
        assert_eq!(registry.index_of(b), Some(0));
        assert_eq!(registry.unregister(a), None);
    }

    #[test]
    fn test_navigator_moves_document_focus() {
        let doc = Document::new();
        let state = store();
        let nav = ListNavigator::new(state.clone(), "focusedIndex", true, Some(doc.clone()));
        let items: Vec<_> = (0..3).map(|_| doc.create_child(doc.body(), "li")).collect();
        for &item in &items {
            nav.register(NavigableItem::new(item));
        }

        assert_eq!(nav.focus_last(), Some(2));
        assert_eq!(doc.active_element(), Some(items[2]));
        assert_eq!(nav.focus_next(), Some(0));
        assert_eq!(state.get_int("focusedIndex"), Ok(0));
        assert_eq!(doc.active_element(), Some(items[0]));
    }

    #[test]
    fn test_navigator_redispatches_focus_on_same_element() {
        let doc = Document::new();
        let state = store();
        let nav = ListNavigator::new(state, "focusedIndex", false, Some(doc.clone()));
        let only = doc.create_child(doc.body(), "li");
        nav.register(NavigableItem::new(only));
        let count = Rc::new(Cell::new(0));
        let c = count.clone();
        doc.add_listener(only, EventKind::Focus, move |_| c.set(c.get() + 1));

        nav.focus_first();
        nav.focus_first();
        assert_eq!(count.get(), 2);
    }

    #[test]
    fn test_set_focused_index_ignores_invalid() {
        let doc = Document::new();
        let state = store();
        let nav = ListNavigator::new(state.clone(), "focusedIndex", false, Some(doc.clone()));
        let a = doc.create_child(doc.body(), "li");
        let b = doc.create_child(doc.body(), "li");
        nav.register(NavigableItem::new(a));
        nav.register(NavigableItem::new(b).disabled(true));

        assert!(nav.set_focused_index(0));
        assert!(!nav.set_focused_index(1));
        assert!(!nav.set_focused_index(7));
        assert!(!nav.set_focused_index(-3));
        assert_eq!(state.get_int("focusedIndex"), Ok(0));
    }

    #[test]
    fn test_unregister_keeps_focus_on_same_item() {
        let doc = Document::new();
        let state = store();
        let nav = ListNavigator::new(state.clone(), "focusedIndex", false, None);
        let items: Vec<_> = (0..3).map(|_| doc.create_child(doc.body(), "li")).collect();
        for &item in &items {
            nav.register(NavigableItem::new(item));
        }
        nav.focus_index(2);
        nav.unregister(items[0]);
        assert_eq!(nav.current(), Some(1));
        nav.unregister(items[2]);
        assert_eq!(nav.current(), None);
    }

    #[test]
    fn test_roving_tabindex() {
        let doc = Document::new();
        let nav = ListNavigator::new(store(), "focusedIndex", false, Some(doc.clone()));
        let a = doc.create_child(doc.body(), "button");
        let b = doc.create_child(doc.body(), "button");
        nav.register(NavigableItem::new(a).disabled(true));
        nav.register(NavigableItem::new(b));

        nav.sync_roving_tabindex(None);
        assert_eq!(doc.attribute(a, "tabindex").as_deref(), Some("-1"));
        assert_eq!(doc.attribute(b, "tabindex").as_deref(), Some("0"));
    }
}
