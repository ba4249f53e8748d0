//! Primitive types - Bindings and callbacks.
//!
//! A [`Binding`] is what attaching a primitive part to an element returns:
//! the host keeps it for the element's lifetime, calls `update` when the
//! part's parameters change, and `destroy` on unmount.

use std::fmt;
use std::rc::Rc;

// =============================================================================
// Cleanup Function
// =============================================================================

/// Cleanup function returned by subscriptions.
pub type Cleanup = Box<dyn FnOnce()>;

// =============================================================================
// Callback Types
// =============================================================================

/// Plain notification (`on_click`, `on_select`, `on_load`).
pub type Callback = Rc<dyn Fn()>;

/// Open state changed.
pub type OpenChangeCallback = Rc<dyn Fn(bool)>;

/// Toggle button pressed state changed.
pub type PressedChangeCallback = Rc<dyn Fn(bool)>;

/// A string value changed (tab value, text field value, avatar status).
pub type ValueCallback = Rc<dyn Fn(&str)>;

/// Custom validator: `Some(message)` when the value is invalid.
pub type Validator = Rc<dyn Fn(&str) -> Option<String>>;

/// Destroy hook. Runs exactly once.
pub type DestroyCallback = Rc<dyn Fn()>;

// =============================================================================
// Binding
// =============================================================================

type UpdateFn<P> = Box<dyn Fn(P)>;
type DestroyFn = Box<dyn FnOnce()>;

/// Handle returned by every `*_part` / action method.
///
/// `destroy` reverses everything the attach did and is idempotent. Dropping
/// a binding does not detach it.
#[must_use = "keep the binding and call destroy() when the element unmounts"]
pub struct Binding<P = ()> {
    update: Option<UpdateFn<P>>,
    destroy: Option<DestroyFn>,
}

impl<P> fmt::Debug for Binding<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Binding")
            .field("updatable", &self.update.is_some())
            .field("destroyed", &self.destroy.is_none())
            .finish()
    }
}

impl<P> Binding<P> {
    pub fn new(update: impl Fn(P) + 'static, destroy: impl FnOnce() + 'static) -> Self {
        Self {
            update: Some(Box::new(update)),
            destroy: Some(Box::new(destroy)),
        }
    }

    /// A binding whose parameters never change.
    pub fn from_destroy(destroy: impl FnOnce() + 'static) -> Self {
        Self {
            update: None,
            destroy: Some(Box::new(destroy)),
        }
    }

    /// Apply new parameters in place. Ignored after `destroy`.
    pub fn update(&self, params: P) {
        if self.destroy.is_none() {
            return;
        }
        if let Some(update) = &self.update {
            update(params);
        }
    }

    /// Detach. Calling again does nothing.
    pub fn destroy(&mut self) {
        self.update = None;
        if let Some(destroy) = self.destroy.take() {
            destroy();
        }
    }

    pub fn is_destroyed(&self) -> bool {
        self.destroy.is_none()
    }
}
