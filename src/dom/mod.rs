//! Document model - The host environment the engine binds to.
//!
//! - [`Document`] - element arena, attributes, focus, event dispatch
//! - [`Event`] / [`EventKind`] - dispatched events and listener registry
//! - [`Scheduler`] / [`TaskSlots`] - virtual clock and per-instance timers
//! - [`Host`] - optional document + clock + scroll lock

mod document;
mod event;
mod host;
mod scheduler;

pub use document::*;
pub use event::*;
pub use host::*;
pub use scheduler::*;
