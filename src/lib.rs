//! # spark-headless
//!
//! Headless interaction primitives for Rust.
//!
//! Built on [spark-signals](https://github.com/RLabs-Inc/spark-signals) for
//! fine-grained reactive state. Nothing here renders: primitives bind to
//! elements of a host [`Document`], listen to its events and keep ARIA and
//! data attributes in sync, leaving all visuals to the host.
//!
//! ## Architecture
//!
//! ```text
//! host events -> Document dispatch -> primitive handlers -> StateStore
//!                                                              |
//!                      element attributes <- DOM sync <--------+
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Geometry and placement types
//! - [`dom`] - Document model, events, virtual clock, [`Host`]
//! - [`state`] - Store, keyboard, focus, scroll lock, navigation, typeahead
//! - [`layout`] - Floating element positioning with viewport flip
//! - [`primitives`] - Menu, Modal, Tabs, Tooltip, Button, TextField, Avatar, Skeleton
//!
//! ## Example
//!
//! ```ignore
//! use spark_headless::{Document, Host, Menu, MenuConfig};
//!
//! let doc = Document::new();
//! let host = Host::new(doc.clone());
//! let trigger = doc.create_child(doc.body(), "button");
//! let content = doc.create_child(doc.body(), "div");
//!
//! let menu = Menu::new(host.clone(), MenuConfig::default());
//! let _trigger = menu.trigger(trigger)?;
//! let _content = menu.content(content)?;
//!
//! doc.click(trigger);
//! assert!(menu.is_open());
//! ```

pub mod dom;
pub mod error;
pub mod layout;
pub mod primitives;
pub mod state;
pub mod types;

// Re-export commonly used items
pub use types::*;

pub use error::{Error, Result};

pub use dom::{
    Document, ElementId, Event, EventKind, EventTarget, Host, ListenerId, Scheduler, TaskSlots,
};

pub use layout::{compute_position, PlacementResult, PositionOptions};

pub use state::{
    FocusSnapshot, FocusTrap, KeyboardEvent, ListNavigator, NavDirection, ScrollLock,
    ScrollLockToken, StateStore, Typeahead, Value,
};

pub use primitives::{
    Avatar, AvatarConfig, Binding, Button, ButtonConfig, ItemOptions, Menu, MenuConfig, Modal,
    ModalConfig, Skeleton, SkeletonConfig, TabOptions, Tabs, TabsConfig, TextField,
    TextFieldConfig, Tooltip, TooltipConfig,
};
