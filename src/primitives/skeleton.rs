//! Skeleton - Loading placeholder with a visibility toggle.
//!
//! While visible the root is `aria-busy` and the real content is hidden.
//! Hiding the skeleton swaps them back.

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use serde::Deserialize;

use crate::dom::{ElementId, Host};
use crate::error::Result;
use crate::state::store::StateStore;

use super::id::resolve_id;
use super::lifecycle::InstanceCore;
use super::types::{Binding, DestroyCallback, OpenChangeCallback};

const ROOT: &str = "skeleton-root";
const CONTENT: &str = "skeleton-content";

const ROOT_ATTRIBUTES: &[&str] = &[
    "data-variant",
    "data-animation",
    "data-visible",
    "aria-busy",
    "aria-hidden",
];
const CONTENT_ATTRIBUTES: &[&str] = &["hidden"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SkeletonVariant {
    #[default]
    Text,
    Circular,
    Rectangular,
}

impl SkeletonVariant {
    pub fn as_str(self) -> &'static str {
        match self {
            SkeletonVariant::Text => "text",
            SkeletonVariant::Circular => "circular",
            SkeletonVariant::Rectangular => "rectangular",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SkeletonAnimation {
    #[default]
    Pulse,
    Wave,
    None,
}

impl SkeletonAnimation {
    pub fn as_str(self) -> &'static str {
        match self {
            SkeletonAnimation::Pulse => "pulse",
            SkeletonAnimation::Wave => "wave",
            SkeletonAnimation::None => "none",
        }
    }
}

#[derive(Clone, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SkeletonConfig {
    pub id: Option<String>,
    pub variant: SkeletonVariant,
    pub animation: SkeletonAnimation,
    pub visible: bool,
    /// CSS length written to the root's `width` style.
    pub width: Option<String>,
    pub height: Option<String>,
    #[serde(skip)]
    pub on_visible_change: Option<OpenChangeCallback>,
    #[serde(skip)]
    pub on_destroy: Option<DestroyCallback>,
}

impl Default for SkeletonConfig {
    fn default() -> Self {
        Self {
            id: None,
            variant: SkeletonVariant::Text,
            animation: SkeletonAnimation::Pulse,
            visible: true,
            width: None,
            height: None,
            on_visible_change: None,
            on_destroy: None,
        }
    }
}

struct SkeletonInner {
    core: InstanceCore,
    config: RefCell<SkeletonConfig>,
    state: StateStore,
    root: Cell<Option<ElementId>>,
    content: Cell<Option<ElementId>>,
}

#[derive(Clone)]
pub struct Skeleton {
    inner: Rc<SkeletonInner>,
}

impl Skeleton {
    pub fn new(host: Host, config: SkeletonConfig) -> Self {
        let id = resolve_id(config.id.as_deref(), "skeleton");
        let state = StateStore::builder()
            .field("visible", config.visible)
            .build();
        let core = InstanceCore::new(host, id, config.on_destroy.clone());

        let skeleton = Self {
            inner: Rc::new(SkeletonInner {
                core,
                config: RefCell::new(config),
                state,
                root: Cell::new(None),
                content: Cell::new(None),
            }),
        };

        let weak = Rc::downgrade(&skeleton.inner);
        skeleton.inner.state.bind_dom_sync(move |_| {
            if let Some(skeleton) = Self::upgrade(&weak) {
                skeleton.sync_dom();
            }
        });
        skeleton
    }

    fn upgrade(weak: &Weak<SkeletonInner>) -> Option<Self> {
        weak.upgrade().map(|inner| Self { inner })
    }

    pub fn id(&self) -> &str {
        self.inner.core.id()
    }

    pub fn state(&self) -> &StateStore {
        &self.inner.state
    }

    pub fn is_visible(&self) -> bool {
        self.inner.state.get_bool("visible").unwrap_or(false)
    }

    pub fn root(&self, element: ElementId) -> Result<Binding> {
        self.inner.core.bind_part(element, ROOT)?;
        self.inner.root.set(Some(element));
        self.sync_dom();
        let weak = Rc::downgrade(&self.inner);
        Ok(Binding::from_destroy(move || {
            let Some(skeleton) = Self::upgrade(&weak) else { return };
            skeleton.inner.core.unbind_part(element, ROOT, ROOT_ATTRIBUTES);
            if let Some(doc) = skeleton.inner.core.document() {
                doc.remove_style(element, "width");
                doc.remove_style(element, "height");
            }
            if skeleton.inner.root.get() == Some(element) {
                skeleton.inner.root.set(None);
            }
        }))
    }

    /// The real content, hidden while the skeleton shows.
    pub fn content(&self, element: ElementId) -> Result<Binding> {
        self.inner.core.bind_part(element, CONTENT)?;
        self.inner.content.set(Some(element));
        self.sync_dom();
        let weak = Rc::downgrade(&self.inner);
        Ok(Binding::from_destroy(move || {
            let Some(skeleton) = Self::upgrade(&weak) else { return };
            skeleton.inner.core.unbind_part(element, CONTENT, CONTENT_ATTRIBUTES);
            if skeleton.inner.content.get() == Some(element) {
                skeleton.inner.content.set(None);
            }
        }))
    }

    pub fn set_visible(&self, visible: bool) {
        if self.inner.core.is_destroyed() {
            return;
        }
        if !self.inner.state.set("visible", visible).unwrap_or(false) {
            return;
        }
        let callback = self.inner.config.borrow().on_visible_change.clone();
        if let Some(callback) = callback {
            callback(visible);
        }
    }

    pub fn show(&self) {
        self.set_visible(true);
    }

    pub fn hide(&self) {
        self.set_visible(false);
    }

    pub fn toggle(&self) {
        self.set_visible(!self.is_visible());
    }

    pub fn set_variant(&self, variant: SkeletonVariant) {
        self.inner.config.borrow_mut().variant = variant;
        self.sync_dom();
    }

    pub fn set_animation(&self, animation: SkeletonAnimation) {
        self.inner.config.borrow_mut().animation = animation;
        self.sync_dom();
    }

    pub fn set_dimensions(&self, width: Option<&str>, height: Option<&str>) {
        {
            let mut config = self.inner.config.borrow_mut();
            config.width = width.map(str::to_string);
            config.height = height.map(str::to_string);
        }
        self.sync_dom();
    }

    pub fn destroy(&self) {
        if self.inner.core.destroy() {
            self.inner.state.clear_subscribers();
        }
    }

    fn sync_dom(&self) {
        let Some(doc) = self.inner.core.document() else { return };
        let visible = self.is_visible();
        let config = self.inner.config.borrow();

        if let Some(root) = self.inner.root.get() {
            doc.set_attribute(root, "data-variant", config.variant.as_str());
            doc.set_attribute(root, "data-animation", config.animation.as_str());
            doc.set_attribute(root, "data-visible", visible.to_string());
            doc.set_attribute(root, "aria-busy", visible.to_string());
            doc.set_attribute(root, "aria-hidden", (!visible).to_string());
            for (property, value) in [("width", &config.width), ("height", &config.height)] {
                match value {
                    Some(value) => doc.set_style(root, property, value.as_str()),
                    None => doc.remove_style(root, property),
                }
            }
        }
        if let Some(content) = self.inner.content.get() {
            doc.toggle_attribute(content, "hidden", visible.then(String::new));
        }
    }
}
