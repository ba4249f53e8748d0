//! Avatar - Image with a loading status machine and a fallback.
//!
//! ```text
//! idle (no src) --set_src--> loading --Load--> loaded
//!                               |
//!                               +----Error--> error
//! ```
//!
//! The fallback shows while idle, after `fallback_delay` ms of loading, and
//! immediately on error.

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use serde::Deserialize;

use crate::dom::{ElementId, EventKind, Host};
use crate::error::Result;
use crate::state::store::StateStore;

use super::id::resolve_id;
use super::lifecycle::InstanceCore;
use super::types::{Binding, DestroyCallback, ValueCallback};

const ROOT: &str = "avatar-root";
const IMAGE: &str = "avatar-image";
const FALLBACK: &str = "avatar-fallback";

const FALLBACK_SLOT: &str = "fallback";

const ROOT_ATTRIBUTES: &[&str] = &["data-size", "data-shape", "data-status"];
const IMAGE_ATTRIBUTES: &[&str] = &["src", "alt", "data-status", "hidden"];
const FALLBACK_ATTRIBUTES: &[&str] = &["aria-hidden", "data-status", "hidden"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AvatarShape {
    #[default]
    Circle,
    Square,
}

impl AvatarShape {
    pub fn as_str(self) -> &'static str {
        match self {
            AvatarShape::Circle => "circle",
            AvatarShape::Square => "square",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AvatarStatus {
    Idle,
    Loading,
    Loaded,
    Error,
}

impl AvatarStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            AvatarStatus::Idle => "idle",
            AvatarStatus::Loading => "loading",
            AvatarStatus::Loaded => "loaded",
            AvatarStatus::Error => "error",
        }
    }

    fn parse(value: &str) -> Self {
        match value {
            "loading" => AvatarStatus::Loading,
            "loaded" => AvatarStatus::Loaded,
            "error" => AvatarStatus::Error,
            _ => AvatarStatus::Idle,
        }
    }
}

#[derive(Clone, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AvatarConfig {
    pub id: Option<String>,
    pub src: Option<String>,
    pub alt: String,
    /// Source of the initials shown by the fallback.
    pub name: Option<String>,
    /// Milliseconds of loading before the fallback appears.
    pub fallback_delay: u64,
    pub size: String,
    pub shape: AvatarShape,
    #[serde(skip)]
    pub on_status_change: Option<ValueCallback>,
    #[serde(skip)]
    pub on_destroy: Option<DestroyCallback>,
}

impl Default for AvatarConfig {
    fn default() -> Self {
        Self {
            id: None,
            src: None,
            alt: String::new(),
            name: None,
            fallback_delay: 0,
            size: "md".to_string(),
            shape: AvatarShape::Circle,
            on_status_change: None,
            on_destroy: None,
        }
    }
}

/// Initials of the first and last words, uppercased: "Ada King Lovelace" -> "AL".
pub fn initials(name: &str) -> String {
    let words: Vec<&str> = name.split_whitespace().collect();
    let initial = |word: &str| word.chars().next().map(|ch| ch.to_uppercase().collect::<String>());
    match words.as_slice() {
        [] => String::new(),
        [only] => initial(only).unwrap_or_default(),
        [first, .., last] => {
            let mut out = initial(first).unwrap_or_default();
            out.push_str(&initial(last).unwrap_or_default());
            out
        }
    }
}

/// Blank sources leave the avatar idle.
fn is_loadable(src: Option<&str>) -> bool {
    src.is_some_and(|src| !src.trim().is_empty())
}

#[derive(Debug, Clone, Copy, Default)]
struct AvatarParts {
    root: Option<ElementId>,
    image: Option<ElementId>,
    fallback: Option<ElementId>,
}

struct AvatarInner {
    core: InstanceCore,
    config: RefCell<AvatarConfig>,
    state: StateStore,
    parts: Cell<AvatarParts>,
}

/// Headless avatar. Cloning shares the instance.
#[derive(Clone)]
pub struct Avatar {
    inner: Rc<AvatarInner>,
}

impl Avatar {
    pub fn new(host: Host, config: AvatarConfig) -> Self {
        let id = resolve_id(config.id.as_deref(), "avatar");
        let src = config.src.clone();
        let loadable = is_loadable(src.as_deref());
        let state = StateStore::builder()
            .field("src", src)
            .field("status", AvatarStatus::Idle.as_str())
            .field("showFallback", true)
            .field("initials", initials(config.name.as_deref().unwrap_or_default()))
            .build();
        let core = InstanceCore::new(host, id, config.on_destroy.clone());

        let avatar = Self {
            inner: Rc::new(AvatarInner {
                core,
                config: RefCell::new(config),
                state,
                parts: Cell::new(AvatarParts::default()),
            }),
        };

        let weak = Rc::downgrade(&avatar.inner);
        avatar.inner.state.bind_dom_sync(move |_| {
            if let Some(avatar) = Self::upgrade(&weak) {
                avatar.sync_dom();
            }
        });
        if loadable {
            avatar.start_loading();
        }
        avatar
    }

    fn upgrade(weak: &Weak<AvatarInner>) -> Option<Self> {
        weak.upgrade().map(|inner| Self { inner })
    }

    fn weak(&self) -> Weak<AvatarInner> {
        Rc::downgrade(&self.inner)
    }

    pub fn id(&self) -> &str {
        self.inner.core.id()
    }

    pub fn state(&self) -> &StateStore {
        &self.inner.state
    }

    pub fn src(&self) -> Option<String> {
        self.inner.state.get_str("src").ok().flatten()
    }

    pub fn status(&self) -> AvatarStatus {
        self.inner
            .state
            .get_str("status")
            .ok()
            .flatten()
            .map(|status| AvatarStatus::parse(&status))
            .unwrap_or(AvatarStatus::Idle)
    }

    pub fn shows_fallback(&self) -> bool {
        self.inner.state.get_bool("showFallback").unwrap_or(true)
    }

    pub fn initials(&self) -> String {
        self.inner.state.get_str("initials").ok().flatten().unwrap_or_default()
    }

    fn update_parts(&self, update: impl FnOnce(&mut AvatarParts)) {
        let mut parts = self.inner.parts.get();
        update(&mut parts);
        self.inner.parts.set(parts);
    }

    // -------------------------------------------------------------------------
    // Parts
    // -------------------------------------------------------------------------

    pub fn root(&self, element: ElementId) -> Result<Binding> {
        self.inner.core.bind_part(element, ROOT)?;
        self.update_parts(|parts| parts.root = Some(element));
        self.sync_dom();
        Ok(self.unbind_on_destroy(element, ROOT, ROOT_ATTRIBUTES, |parts| &mut parts.root))
    }

    /// The `<img>`: Load and Error events drive the status.
    pub fn image(&self, element: ElementId) -> Result<Binding> {
        let core = &self.inner.core;
        if core.bind_part(element, IMAGE)? {
            let weak = self.weak();
            core.listen_part(element, IMAGE, element, EventKind::Load, move |_| {
                if let Some(avatar) = Self::upgrade(&weak) {
                    avatar.handle_load();
                }
            });
            let weak = self.weak();
            core.listen_part(element, IMAGE, element, EventKind::Error, move |_| {
                if let Some(avatar) = Self::upgrade(&weak) {
                    avatar.handle_error();
                }
            });
        }
        self.update_parts(|parts| parts.image = Some(element));
        self.sync_dom();
        Ok(self.unbind_on_destroy(element, IMAGE, IMAGE_ATTRIBUTES, |parts| &mut parts.image))
    }

    /// Shown instead of the image. Empty elements receive the initials.
    pub fn fallback(&self, element: ElementId) -> Result<Binding> {
        self.inner.core.bind_part(element, FALLBACK)?;
        if let Some(doc) = self.inner.core.document() {
            if doc.text_content(element).is_empty() {
                doc.set_text(element, self.initials());
            }
        }
        self.update_parts(|parts| parts.fallback = Some(element));
        self.sync_dom();
        Ok(self.unbind_on_destroy(element, FALLBACK, FALLBACK_ATTRIBUTES, |parts| &mut parts.fallback))
    }

    fn unbind_on_destroy(
        &self,
        element: ElementId,
        part: &'static str,
        attributes: &'static [&'static str],
        slot: fn(&mut AvatarParts) -> &mut Option<ElementId>,
    ) -> Binding {
        let weak = self.weak();
        Binding::from_destroy(move || {
            let Some(avatar) = Self::upgrade(&weak) else { return };
            avatar.inner.core.unbind_part(element, part, attributes);
            avatar.update_parts(|parts| {
                let current = slot(parts);
                if *current == Some(element) {
                    *current = None;
                }
            });
        })
    }

    fn handle_load(&self) {
        if self.status() != AvatarStatus::Loading {
            return;
        }
        self.inner.core.slots().cancel(FALLBACK_SLOT);
        let _ = self.inner.state.set("showFallback", false);
        self.set_status(AvatarStatus::Loaded);
    }

    fn handle_error(&self) {
        if self.status() != AvatarStatus::Loading {
            return;
        }
        self.inner.core.slots().cancel(FALLBACK_SLOT);
        let _ = self.inner.state.set("showFallback", true);
        self.set_status(AvatarStatus::Error);
    }

    fn set_status(&self, status: AvatarStatus) {
        if !self.inner.state.set("status", status.as_str()).unwrap_or(false) {
            return;
        }
        tracing::debug!(id = %self.id(), status = status.as_str(), "avatar status changed");
        let callback = self.inner.config.borrow().on_status_change.clone();
        if let Some(callback) = callback {
            callback(status.as_str());
        }
    }

    fn start_loading(&self) {
        let delay = self.inner.config.borrow().fallback_delay;
        let slots = self.inner.core.slots();
        slots.cancel(FALLBACK_SLOT);
        if delay == 0 {
            let _ = self.inner.state.set("showFallback", true);
        } else {
            let _ = self.inner.state.set("showFallback", false);
            let weak = self.weak();
            slots.schedule(FALLBACK_SLOT, delay, move || {
                let Some(avatar) = Self::upgrade(&weak) else { return };
                if avatar.status() == AvatarStatus::Loading {
                    let _ = avatar.inner.state.set("showFallback", true);
                }
            });
        }
        self.set_status(AvatarStatus::Loading);
    }

    // -------------------------------------------------------------------------
    // Helpers
    // -------------------------------------------------------------------------

    /// Change the image source, restarting the load.
    pub fn set_src(&self, src: Option<&str>) {
        if self.inner.core.is_destroyed() {
            return;
        }
        if !self.inner.state.set("src", src).unwrap_or(false) {
            return;
        }
        if is_loadable(src) {
            self.start_loading();
        } else {
            self.inner.core.slots().cancel(FALLBACK_SLOT);
            let _ = self.inner.state.set("showFallback", true);
            self.set_status(AvatarStatus::Idle);
        }
    }

    /// Load the current source again. Does nothing without a document or source.
    pub fn reload(&self) {
        let Some(doc) = self.inner.core.document() else { return };
        let Some(src) = self.src().filter(|src| is_loadable(Some(src))) else { return };
        self.start_loading();
        if let Some(image) = self.inner.parts.get().image {
            doc.set_attribute(image, "src", src);
        }
    }

    pub fn set_name(&self, name: &str) {
        self.inner.config.borrow_mut().name = Some(name.to_string());
        let _ = self.inner.state.set("initials", initials(name));
    }

    pub fn set_size(&self, size: impl Into<String>) {
        self.inner.config.borrow_mut().size = size.into();
        self.sync_dom();
    }

    pub fn set_shape(&self, shape: AvatarShape) {
        self.inner.config.borrow_mut().shape = shape;
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
        let parts = self.inner.parts.get();
        let status = self.status().as_str();
        let (size, shape, alt) = {
            let config = self.inner.config.borrow();
            (config.size.clone(), config.shape, config.alt.clone())
        };

        if let Some(root) = parts.root {
            doc.set_attribute(root, "data-size", size);
            doc.set_attribute(root, "data-shape", shape.as_str());
            doc.set_attribute(root, "data-status", status);
        }
        if let Some(image) = parts.image {
            doc.toggle_attribute(image, "src", self.src().filter(|src| is_loadable(Some(src))));
            doc.set_attribute(image, "alt", alt);
            doc.set_attribute(image, "data-status", status);
            let visible = self.status() == AvatarStatus::Loaded;
            doc.toggle_attribute(image, "hidden", (!visible).then(String::new));
        }
        if let Some(fallback) = parts.fallback {
            doc.set_attribute(fallback, "aria-hidden", "true");
            doc.set_attribute(fallback, "data-status", status);
            doc.toggle_attribute(fallback, "hidden", (!self.shows_fallback()).then(String::new));
        }
    }
}

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

    #[test]
    fn test_initials() {
        assert_eq!(initials("Ada King Lovelace"), "AL");
        assert_eq!(initials("  grace  "), "G");
        assert_eq!(initials(""), "");
        assert_eq!(initials("émile zola"), "ÉZ");
    }

    #[test]
    fn test_idle_without_src() {
        let avatar = Avatar::new(Host::headless(), AvatarConfig { src: Some("  ".into()), ..Default::default() });
        assert_eq!(avatar.status(), AvatarStatus::Idle);
        assert!(avatar.shows_fallback());
        assert_eq!(avatar.src().as_deref(), Some("  "));
    }

    #[test]
    fn test_load_hides_fallback() {
        let (doc, host) = setup();
        let root = doc.create_child(doc.body(), "span");
        let image = doc.create_child(root, "img");
        let fallback = doc.create_child(root, "span");
        let avatar = Avatar::new(host, AvatarConfig {
            src: Some("/ada.png".into()),
            name: Some("Ada Lovelace".into()),
            ..Default::default()
        });
        let _r = avatar.root(root).unwrap();
        let _i = avatar.image(image).unwrap();
        let _f = avatar.fallback(fallback).unwrap();

        assert_eq!(doc.attribute(root, "data-status").as_deref(), Some("loading"));
        assert_eq!(doc.attribute(image, "src").as_deref(), Some("/ada.png"));
        assert_eq!(doc.text_content(fallback), "AL");

        doc.load(image);
        assert_eq!(avatar.status(), AvatarStatus::Loaded);
        assert!(doc.has_attribute(fallback, "hidden"));
        assert!(!doc.has_attribute(image, "hidden"));
        assert_eq!(doc.attribute(root, "data-shape").as_deref(), Some("circle"));
        assert_eq!(doc.attribute(root, "data-size").as_deref(), Some("md"));
    }

    #[test]
    fn test_error_shows_fallback_immediately() {
        let (doc, host) = setup();
        let image = doc.create_child(doc.body(), "img");
        let avatar = Avatar::new(host.clone(), AvatarConfig {
            src: Some("/missing.png".into()),
            fallback_delay: 500,
            ..Default::default()
        });
        let _i = avatar.image(image).unwrap();
        assert!(!avatar.shows_fallback());
        doc.fail(image);
        assert_eq!(avatar.status(), AvatarStatus::Error);
        assert!(avatar.shows_fallback());
        assert_eq!(host.scheduler().pending(), 0);
    }

    #[test]
    fn test_fallback_delay() {
        let (_doc, host) = setup();
        let avatar = Avatar::new(host.clone(), AvatarConfig {
            src: Some("/slow.png".into()),
            fallback_delay: 600,
            ..Default::default()
        });
        host.scheduler().advance(599);
        assert!(!avatar.shows_fallback());
        host.scheduler().advance(1);
        assert!(avatar.shows_fallback());
        assert_eq!(avatar.status(), AvatarStatus::Loading);
    }

    #[test]
    fn test_set_src_round_trip_and_status_events() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let s = seen.clone();
        let avatar = Avatar::new(Host::headless(), AvatarConfig {
            on_status_change: Some(Rc::new(move |status: &str| s.borrow_mut().push(status.to_string()))),
            ..Default::default()
        });
        avatar.set_src(Some("/a.png"));
        assert_eq!(avatar.src().as_deref(), Some("/a.png"));
        avatar.set_src(None);
        assert_eq!(avatar.src(), None);
        assert_eq!(*seen.borrow(), vec!["loading".to_string(), "idle".to_string()]);
    }

    #[test]
    fn test_set_src_keeps_raw_value() {
        let avatar = Avatar::new(Host::headless(), AvatarConfig::default());
        avatar.set_src(Some(" a.png "));
        assert_eq!(avatar.src().as_deref(), Some(" a.png "));
        assert_eq!(avatar.status(), AvatarStatus::Loading);

        avatar.set_src(Some(""));
        assert_eq!(avatar.src().as_deref(), Some(""));
        assert_eq!(avatar.status(), AvatarStatus::Idle);
        assert!(avatar.shows_fallback());
    }

    #[test]
    fn test_reload_restarts_loading() {
        let (doc, host) = setup();
        let image = doc.create_child(doc.body(), "img");
        let avatar = Avatar::new(host, AvatarConfig { src: Some("/a.png".into()), ..Default::default() });
        let _i = avatar.image(image).unwrap();
        doc.fail(image);
        avatar.reload();
        assert_eq!(avatar.status(), AvatarStatus::Loading);
        doc.load(image);
        assert_eq!(avatar.status(), AvatarStatus::Loaded);
    }

    #[test]
    fn test_reload_headless_is_noop() {
        let avatar = Avatar::new(Host::headless(), AvatarConfig { src: Some("/a.png".into()), ..Default::default() });
        avatar.reload();
        assert_eq!(avatar.status(), AvatarStatus::Loading);
    }

    #[test]
    fn test_config_from_json() {
        let config: AvatarConfig =
            serde_json::from_str(r#"{"src":"/x.png","shape":"square","fallbackDelay":250}"#).unwrap();
        assert_eq!(config.shape, AvatarShape::Square);
        assert_eq!(config.fallback_delay, 250);
        assert_eq!(config.size, "md");
    }
}
