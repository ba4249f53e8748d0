//! State Store - The reactive state container behind every primitive
//!
//! A fixed, enumerated set of named fields, each backed by a
//! `spark_signals::Signal<Value>` so hosts can build effects over state.
//!
//! Every `set` is synchronous and runs, in order:
//! 1. alias synchronization (declared alias fields receive the same value)
//! 2. change listeners, called with `(field, new, old)`
//! 3. the bound DOM-sync routine, if any
//!
//! Writing a value equal to the current one is a no-op: no listener runs
//! and DOM sync is skipped.
//!
//! # Example
//!
//! ```ignore
//! use spark_headless::state::store::StateStore;
//!
//! let state = StateStore::builder()
//!     .field("open", false)
//!     .field("focusedIndex", -1)
//!     .alias("focusedIndex", "activeIndex")
//!     .build();
//!
//! state.set("activeIndex", 2)?;
//! assert_eq!(state.get_int("focusedIndex")?, 2);
//! ```

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use spark_signals::{signal, Signal};

use crate::error::{Error, Result};

// =============================================================================
// VALUE
// =============================================================================

/// A state field value.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
}

impl Value {
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Floats and integers both read as floats.
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Float(f) => Some(*f),
            Value::Int(i) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Int(i) => write!(f, "{i}"),
            Value::Float(x) => write!(f, "{x}"),
            Value::Str(s) => write!(f, "{s}"),
        }
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Int(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Value::Int(value as i64)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Float(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Str(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Str(value)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(Value::Null)
    }
}

// =============================================================================
// STORE
// =============================================================================

/// Change listener: `(field, new_value, old_value)`.
pub type ChangeListener = Rc<dyn Fn(&str, &Value, &Value)>;

/// DOM-sync routine, called with the written field name.
pub type DomSync = Rc<dyn Fn(&str)>;

struct Field {
    name: &'static str,
    signal: Signal<Value>,
}

struct StoreInner {
    fields: Vec<Field>,
    aliases: Vec<(&'static str, &'static str)>,
    listeners: RefCell<Vec<(usize, ChangeListener)>>,
    next_listener: Cell<usize>,
    dom_sync: RefCell<Option<DomSync>>,
}

/// Shared handle to a primitive's state.
#[derive(Clone)]
pub struct StateStore {
    inner: Rc<StoreInner>,
}

impl fmt::Debug for StateStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut map = f.debug_map();
        for field in &self.inner.fields {
            map.entry(&field.name, &field.signal.get());
        }
        map.finish()
    }
}

/// Declares the field set and aliases of a [`StateStore`].
#[derive(Default)]
pub struct StateStoreBuilder {
    fields: Vec<(&'static str, Value)>,
    aliases: Vec<(&'static str, &'static str)>,
}

impl StateStoreBuilder {
    /// Declare a field with its initial value. Redeclaring replaces the initial value.
    pub fn field(mut self, name: &'static str, initial: impl Into<Value>) -> Self {
        let initial = initial.into();
        match self.fields.iter_mut().find(|(existing, _)| *existing == name) {
            Some(entry) => entry.1 = initial,
            None => self.fields.push((name, initial)),
        }
        self
    }

    /// Declare `alias` as another name for `field`. The alias becomes a field
    /// holding the same initial value.
    pub fn alias(mut self, field: &'static str, alias: &'static str) -> Self {
        let initial = self
            .fields
            .iter()
            .find(|(name, _)| *name == field)
            .map(|(_, value)| value.clone())
            .unwrap_or_default();
        self = self.field(alias, initial);
        self.aliases.push((field, alias));
        self
    }

    pub fn build(self) -> StateStore {
        let fields = self
            .fields
            .into_iter()
            .map(|(name, initial)| Field {
                name,
                signal: signal(initial),
            })
            .collect();
        StateStore {
            inner: Rc::new(StoreInner {
                fields,
                aliases: self.aliases,
                listeners: RefCell::new(Vec::new()),
                next_listener: Cell::new(0),
                dom_sync: RefCell::new(None),
            }),
        }
    }
}

impl StateStore {
    pub fn builder() -> StateStoreBuilder {
        StateStoreBuilder::default()
    }

    fn field(&self, name: &str) -> Result<&Field> {
        self.inner
            .fields
            .iter()
            .find(|field| field.name == name)
            .ok_or_else(|| Error::InvalidField {
                field: name.to_string(),
            })
    }

    /// Names that must hold the same value as `name` (excluding `name`).
    fn alias_group(&self, name: &str) -> Vec<&'static str> {
        let mut group: Vec<&'static str> = Vec::new();
        for &(a, b) in &self.inner.aliases {
            if a == name && !group.contains(&b) {
                group.push(b);
            } else if b == name && !group.contains(&a) {
                group.push(a);
            }
        }
        group
    }

    /// Declared field names, in declaration order.
    pub fn fields(&self) -> Vec<&'static str> {
        self.inner.fields.iter().map(|field| field.name).collect()
    }

    pub fn has_field(&self, name: &str) -> bool {
        self.field(name).is_ok()
    }

    pub fn get(&self, name: &str) -> Result<Value> {
        Ok(self.field(name)?.signal.get())
    }

    pub fn get_bool(&self, name: &str) -> Result<bool> {
        self.get(name)?.as_bool().ok_or_else(|| Error::FieldType {
            field: name.to_string(),
            expected: "bool",
        })
    }

    pub fn get_int(&self, name: &str) -> Result<i64> {
        self.get(name)?.as_int().ok_or_else(|| Error::FieldType {
            field: name.to_string(),
            expected: "integer",
        })
    }

    pub fn get_float(&self, name: &str) -> Result<f64> {
        self.get(name)?.as_float().ok_or_else(|| Error::FieldType {
            field: name.to_string(),
            expected: "number",
        })
    }

    /// String fields read as `None` while they hold `Null`.
    pub fn get_str(&self, name: &str) -> Result<Option<String>> {
        match self.get(name)? {
            Value::Str(s) => Ok(Some(s)),
            Value::Null => Ok(None),
            _ => Err(Error::FieldType {
                field: name.to_string(),
                expected: "string",
            }),
        }
    }

    /// The signal backing `name`, for building effects.
    pub fn signal(&self, name: &str) -> Result<Signal<Value>> {
        Ok(self.field(name)?.signal.clone())
    }

    /// Write a field and synchronously run alias sync, listeners and DOM sync.
    ///
    /// Returns `Ok(false)` when the value was unchanged.
    pub fn set(&self, name: &str, value: impl Into<Value>) -> Result<bool> {
        let value = value.into();
        let field = self.field(name)?;
        let old = field.signal.get();
        if old == value {
            return Ok(false);
        }

        // 1. write the field and every alias before anyone observes it
        field.signal.set(value.clone());
        let aliases = self.alias_group(name);
        for alias in &aliases {
            if let Ok(alias_field) = self.field(alias) {
                alias_field.signal.set(value.clone());
            }
        }

        // 2. listeners
        let listeners: Vec<ChangeListener> = self
            .inner
            .listeners
            .borrow()
            .iter()
            .map(|(_, listener)| listener.clone())
            .collect();
        for listener in &listeners {
            listener(name, &value, &old);
            for alias in &aliases {
                listener(alias, &value, &old);
            }
        }

        // 3. DOM sync
        let sync = self.inner.dom_sync.borrow().clone();
        if let Some(sync) = sync {
            sync(name);
            for alias in &aliases {
                sync(alias);
            }
        }

        Ok(true)
    }

    /// Subscribe to changes. Returns cleanup function.
    pub fn on_change<F>(&self, listener: F) -> impl FnOnce() + use<F>
    where
        F: Fn(&str, &Value, &Value) + 'static,
    {
        let id = self.inner.next_listener.get();
        self.inner.next_listener.set(id + 1);
        self.inner
            .listeners
            .borrow_mut()
            .push((id, Rc::new(listener)));

        let inner = Rc::downgrade(&self.inner);
        move || {
            if let Some(inner) = inner.upgrade() {
                inner
                    .listeners
                    .borrow_mut()
                    .retain(|(listener_id, _)| *listener_id != id);
            }
        }
    }

    pub fn listener_count(&self) -> usize {
        self.inner.listeners.borrow().len()
    }

    /// Bind the primitive's DOM-sync routine (replaces any previous one).
    pub fn bind_dom_sync(&self, sync: impl Fn(&str) + 'static) {
        *self.inner.dom_sync.borrow_mut() = Some(Rc::new(sync));
    }

    pub fn unbind_dom_sync(&self) {
        self.inner.dom_sync.borrow_mut().take();
    }

    /// Drop every listener and the DOM-sync routine.
    pub fn clear_subscribers(&self) {
        self.inner.listeners.borrow_mut().clear();
        self.unbind_dom_sync();
    }

    /// Current values of all fields, in declaration order.
    pub fn snapshot(&self) -> Vec<(&'static str, Value)> {
        self.inner
            .fields
            .iter()
            .map(|field| (field.name, field.signal.get()))
            .collect()
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell as StdRefCell;

    fn store() -> StateStore {
        StateStore::builder()
            .field("open", false)
            .field("focusedIndex", -1)
            .alias("focusedIndex", "activeIndex")
            .field("label", Value::Null)
            .build()
    }

    #[test]
    fn test_get_and_set() {
        let state = store();
        assert_eq!(state.get_bool("open"), Ok(false));
        assert_eq!(state.set("open", true), Ok(true));
        assert_eq!(state.get_bool("open"), Ok(true));
        assert_eq!(state.get_int("activeIndex"), Ok(-1));
    }

    #[test]
    fn test_unknown_field_is_error() {
        let state = store();
        assert!(matches!(state.get("nope"), Err(Error::InvalidField { .. })));
        assert!(matches!(state.set("nope", 1), Err(Error::InvalidField { .. })));
    }

    #[test]
    fn test_type_mismatch_is_error() {
        let state = store();
        assert!(matches!(state.get_int("open"), Err(Error::FieldType { .. })));
        assert_eq!(state.get_str("label"), Ok(None));
        state.set("label", "Hi").unwrap();
        assert_eq!(state.get_str("label"), Ok(Some("Hi".to_string())));
    }

    #[test]
    fn test_alias_write_through_both_ways() {
        let state = store();
        state.set("focusedIndex", 2).unwrap();
        assert_eq!(state.get_int("activeIndex"), Ok(2));
        state.set("activeIndex", 0).unwrap();
        assert_eq!(state.get_int("focusedIndex"), Ok(0));
    }

    #[test]
    fn test_alias_synced_before_listeners_and_sync() {
        let state = store();
        let seen = Rc::new(StdRefCell::new(Vec::new()));

        let probe = state.clone();
        let s = seen.clone();
        let _cleanup = state.on_change(move |field, new, old| {
            let alias = probe.get_int("activeIndex").unwrap();
            s.borrow_mut().push(format!("listener:{field}:{old}->{new}:alias={alias}"));
        });
        let probe = state.clone();
        let s = seen.clone();
        state.bind_dom_sync(move |field| {
            let focused = probe.get_int("focusedIndex").unwrap();
            s.borrow_mut().push(format!("sync:{field}:{focused}"));
        });

        state.set("focusedIndex", 1).unwrap();
        assert_eq!(
            *seen.borrow(),
            vec![
                "listener:focusedIndex:-1->1:alias=1",
                "listener:activeIndex:-1->1:alias=1",
                "sync:focusedIndex:1",
                "sync:activeIndex:1",
            ]
        );
    }

    #[test]
    fn test_unchanged_value_notifies_nobody() {
        let state = store();
        let count = Rc::new(Cell::new(0));
        let c = count.clone();
        let _cleanup = state.on_change(move |_, _, _| c.set(c.get() + 1));
        let syncs = Rc::new(Cell::new(0));
        let s = syncs.clone();
        state.bind_dom_sync(move |_| s.set(s.get() + 1));
        assert_eq!(state.set("open", false), Ok(false));
        assert_eq!(count.get(), 0);
        assert_eq!(syncs.get(), 0);
    }

    #[test]
    fn test_on_change_cleanup() {
        let state = store();
        let count = Rc::new(Cell::new(0));
        let c = count.clone();
        let cleanup = state.on_change(move |_, _, _| c.set(c.get() + 1));
        state.set("open", true).unwrap();
        cleanup();
        state.set("open", false).unwrap();
        assert_eq!(count.get(), 1);
        assert_eq!(state.listener_count(), 0);
    }

    #[test]
    fn test_listener_may_write_state() {
        let state = store();
        let writer = state.clone();
        let _cleanup = state.on_change(move |field, new, _| {
            if field == "open" && new == &Value::Bool(false) {
                let _ = writer.set("focusedIndex", -1);
            }
        });
        state.set("focusedIndex", 3).unwrap();
        state.set("open", true).unwrap();
        state.set("open", false).unwrap();
        assert_eq!(state.get_int("activeIndex"), Ok(-1));
    }

    #[test]
    fn test_signal_tracks_writes() {
        let state = store();
        let open = state.signal("open").unwrap();
        state.set("open", true).unwrap();
        assert_eq!(open.get(), Value::Bool(true));
    }

    #[test]
    fn test_snapshot_order() {
        let names: Vec<_> = store().snapshot().into_iter().map(|(n, _)| n).collect();
        assert_eq!(names, vec!["open", "focusedIndex", "activeIndex", "label"]);
    }
}
