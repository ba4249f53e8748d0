//! State Module - The interaction engine shared by every primitive
//!
//! - **Store** - Reactive state container with aliases and DOM sync
//! - **Keyboard** - Key events and the key classifier
//! - **Input** - crossterm key adapter for terminal hosts
//! - **Focus** - Focusable queries, focus trap, focus restoration
//! - **Scroll lock** - Reference-counted body scroll lock
//! - **Navigation** - Item registry, loop/clamp movement, roving tabindex
//! - **Typeahead** - Timed character buffer and item matching

pub mod focus;
pub mod input;
pub mod keyboard;
pub mod navigation;
pub mod scroll_lock;
pub mod store;
pub mod typeahead;

pub use focus::*;
pub use input::*;
pub use keyboard::*;
pub use navigation::*;
pub use scroll_lock::*;
pub use store::*;
pub use typeahead::*;
