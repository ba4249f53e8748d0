//! Primitives - Headless interaction components.
//!
//! Each primitive owns a [`StateStore`](crate::state::StateStore), binds to
//! host elements through part methods that return a [`Binding`], and keeps
//! the ARIA/data attributes of those elements in sync with its state.
//!
//! - [`menu`] - Dropdown menu with keyboard navigation and typeahead
//! - [`modal`] - Dialog with focus trap, scroll lock and close guards
//! - [`tabs`] - Tablist with roving tabindex and linked panels
//! - [`tooltip`] - Delayed, positioned hover/focus hint
//! - [`button`] - Button and toggle button
//! - [`text_field`] - Input value tracking and validation
//! - [`avatar`] - Image load status with a fallback
//! - [`skeleton`] - Loading placeholder
//!
//! # Lifecycle
//!
//! ```ignore
//! let menu = Menu::new(host.clone(), MenuConfig::default());
//! let mut trigger = menu.trigger(button)?;   // claim + listeners + attributes
//! trigger.destroy();                         // undo just that part
//! menu.destroy();                            // undo everything, idempotent
//! ```
//!
//! Binding an element that another instance already holds for the same
//! part fails with [`Error::ConflictingBinding`](crate::Error::ConflictingBinding).

pub mod avatar;
pub mod button;
pub mod id;
pub mod menu;
pub mod modal;
pub mod skeleton;
pub mod tabs;
pub mod text_field;
pub mod tooltip;
pub mod types;

pub(crate) mod floating;
pub(crate) mod lifecycle;

pub use avatar::{Avatar, AvatarConfig, AvatarShape, AvatarStatus};
pub use button::{Button, ButtonConfig};
pub use id::{generate_id, reset_id_counter};
pub use menu::{ItemOptions, Menu, MenuConfig};
pub use modal::{
    BeforeCloseCallback, CloseDecision, CloseOutcome, Modal, ModalConfig, ModalPhase, ModalRole,
    PendingClose,
};
pub use skeleton::{Skeleton, SkeletonAnimation, SkeletonConfig, SkeletonVariant};
pub use tabs::{TabOptions, Tabs, TabsConfig};
pub use text_field::{TextField, TextFieldConfig, ValidateOn};
pub use tooltip::{Tooltip, TooltipConfig, TooltipTrigger};
pub use types::*;
