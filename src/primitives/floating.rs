//! Floating content placement shared by Tooltip and Menu.
//!
//! While the content is open, its position is recomputed on window scroll
//! (capture phase, so scrolls of any ancestor count) and window resize.
//! Every computation re-reads both rectangles from the document.

use std::cell::{Cell, RefCell};

use crate::dom::{ElementId, EventKind, EventTarget, ListenerId};
use crate::layout::{compute_position, PlacementResult, PositionOptions};
use crate::state::store::StateStore;

use super::lifecycle::InstanceCore;

#[derive(Debug)]
pub(crate) struct Floating {
    options: Cell<PositionOptions>,
    tracking: RefCell<Vec<ListenerId>>,
}

impl Floating {
    pub(crate) fn new(options: PositionOptions) -> Self {
        Self {
            options: Cell::new(options),
            tracking: RefCell::new(Vec::new()),
        }
    }

    pub(crate) fn set_options(&self, options: PositionOptions) {
        self.options.set(options);
    }

    /// Compute and apply the position: state `x`/`y`/`placement`, inline
    /// `left`/`top` and `data-placement` on the content.
    ///
    /// `None` without a document or before both parts are bound.
    pub(crate) fn update(
        &self,
        core: &InstanceCore,
        state: &StateStore,
        trigger: Option<ElementId>,
        content: Option<ElementId>,
    ) -> Option<PlacementResult> {
        let doc = core.document()?;
        let (trigger, content) = (trigger?, content?);
        let trigger_rect = doc.bounding_rect(trigger)?;
        let floating = doc.bounding_rect(content)?.size();

        let result = compute_position(trigger_rect, floating, doc.viewport(), &self.options.get());

        let _ = state.set("x", result.x);
        let _ = state.set("y", result.y);
        let _ = state.set("placement", result.placement.to_string());

        doc.set_style(content, "position", "absolute");
        doc.set_style(content, "left", format!("{}px", result.x));
        doc.set_style(content, "top", format!("{}px", result.y));
        doc.set_attribute(content, "data-placement", result.placement.to_string());
        Some(result)
    }

    /// Start listening for window scroll and resize. Tracking twice is a no-op.
    pub(crate) fn track(&self, core: &InstanceCore, on_change: impl Fn() + Clone + 'static) {
        if !self.tracking.borrow().is_empty() {
            return;
        }
        let on_scroll = on_change.clone();
        let scroll = core.listen_with(EventTarget::Window, EventKind::Scroll, true, move |_| on_scroll());
        let resize = core.listen(EventTarget::Window, EventKind::Resize, move |_| on_change());
        self.tracking
            .borrow_mut()
            .extend(scroll.into_iter().chain(resize));
    }

    pub(crate) fn untrack(&self, core: &InstanceCore) {
        let ids: Vec<ListenerId> = self.tracking.borrow_mut().drain(..).collect();
        core.unlisten(ids);
    }
}
