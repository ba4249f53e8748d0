//! Keyboard Module - Key events and the key classifier
//!
//! Key names follow the browser's `KeyboardEvent.key` values ("Enter", " ",
//! "ArrowDown", "Escape", ...). Terminal hosts get the same names through
//! [`crate::state::input::convert_key_event`].
//!
//! The classifier functions are pure: they map a key to a semantic action
//! independent of any one primitive.
//!
//! # Example
//!
//! ```ignore
//! use spark_headless::state::keyboard::{navigation_direction_for, NavDirection};
//! use spark_headless::Orientation;
//!
//! assert_eq!(
//!     navigation_direction_for("ArrowDown", Orientation::Vertical),
//!     Some(NavDirection::Next)
//! );
//! assert_eq!(navigation_direction_for("ArrowDown", Orientation::Horizontal), None);
//! ```

use crate::types::Orientation;

// =============================================================================
// TYPES
// =============================================================================

/// Keyboard modifier state
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Modifiers {
    pub ctrl: bool,
    pub alt: bool,
    pub shift: bool,
    pub meta: bool,
}

impl Modifiers {
    /// Create empty modifiers
    pub fn none() -> Self {
        Self::default()
    }

    /// Create modifiers with ctrl
    pub fn ctrl() -> Self {
        Self { ctrl: true, ..Self::default() }
    }

    /// Create modifiers with alt
    pub fn alt() -> Self {
        Self { alt: true, ..Self::default() }
    }

    /// Create modifiers with shift
    pub fn shift() -> Self {
        Self { shift: true, ..Self::default() }
    }

    /// Ctrl, Alt or Meta held (Shift alone still types characters).
    pub fn has_command(&self) -> bool {
        self.ctrl || self.alt || self.meta
    }
}

/// Key event state (press, repeat, release)
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum KeyState {
    #[default]
    Press,
    Repeat,
    Release,
}

/// Keyboard event
#[derive(Clone, Debug, PartialEq)]
pub struct KeyboardEvent {
    /// The key that was pressed (e.g., "a", "Enter", "ArrowUp")
    pub key: String,
    /// Modifier keys state
    pub modifiers: Modifiers,
    /// Press/repeat/release state
    pub state: KeyState,
}

impl KeyboardEvent {
    /// Create a simple key press event
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            modifiers: Modifiers::default(),
            state: KeyState::Press,
        }
    }

    /// Create a key press with modifiers
    pub fn with_modifiers(key: impl Into<String>, modifiers: Modifiers) -> Self {
        Self {
            key: key.into(),
            modifiers,
            state: KeyState::Press,
        }
    }

    /// Check if this is a press event
    pub fn is_press(&self) -> bool {
        self.state != KeyState::Release
    }

    /// The typed character, for a single printable key with no command modifier.
    pub fn printable_char(&self) -> Option<char> {
        if self.modifiers.has_command() {
            return None;
        }
        let mut chars = self.key.chars();
        let ch = chars.next()?;
        if chars.next().is_some() || ch.is_control() {
            return None;
        }
        Some(ch)
    }
}

/// Arrow key direction
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ArrowDirection {
    Up,
    Down,
    Left,
    Right,
}

/// Semantic movement inside a navigable list
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NavDirection {
    Next,
    Previous,
    First,
    Last,
}

// =============================================================================
// CLASSIFIER
// =============================================================================

/// Enter, Space, and the legacy "Spacebar" label.
pub const ACTIVATION_KEYS: [&str; 3] = ["Enter", " ", "Spacebar"];

/// Escape and the legacy "Esc" label.
pub const ESCAPE_KEYS: [&str; 2] = ["Escape", "Esc"];

pub fn is_activation_key(key: &str) -> bool {
    ACTIVATION_KEYS.contains(&key)
}

pub fn is_escape_key(key: &str) -> bool {
    ESCAPE_KEYS.contains(&key)
}

pub fn is_arrow_key(key: &str) -> bool {
    arrow_key_to_direction(key).is_some()
}

pub fn is_tab_key(key: &str) -> bool {
    key == "Tab"
}

pub fn arrow_key_to_direction(key: &str) -> Option<ArrowDirection> {
    match key {
        "ArrowUp" => Some(ArrowDirection::Up),
        "ArrowDown" => Some(ArrowDirection::Down),
        "ArrowLeft" => Some(ArrowDirection::Left),
        "ArrowRight" => Some(ArrowDirection::Right),
        _ => None,
    }
}

/// Map a key to list movement for the given orientation.
///
/// Vertical lists move with Down/Up, horizontal lists with Right/Left.
/// Home and End map to first/last regardless of orientation.
pub fn navigation_direction_for(key: &str, orientation: Orientation) -> Option<NavDirection> {
    match key {
        "Home" => return Some(NavDirection::First),
        "End" => return Some(NavDirection::Last),
        _ => {}
    }
    match (orientation, arrow_key_to_direction(key)?) {
        (Orientation::Vertical, ArrowDirection::Down) => Some(NavDirection::Next),
        (Orientation::Vertical, ArrowDirection::Up) => Some(NavDirection::Previous),
        (Orientation::Horizontal, ArrowDirection::Right) => Some(NavDirection::Next),
        (Orientation::Horizontal, ArrowDirection::Left) => Some(NavDirection::Previous),
        _ => None,
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_activation_keys() {
        assert!(is_activation_key("Enter"));
        assert!(is_activation_key(" "));
        assert!(is_activation_key("Spacebar"));
        assert!(!is_activation_key("Space"));
        assert!(!is_activation_key("a"));
    }

    #[test]
    fn test_escape_keys() {
        assert!(is_escape_key("Escape"));
        assert!(is_escape_key("Esc"));
        assert!(!is_escape_key("Enter"));
    }

    #[test]
    fn test_arrow_and_tab() {
        assert!(is_arrow_key("ArrowLeft"));
        assert!(!is_arrow_key("Left"));
        assert!(is_tab_key("Tab"));
        assert_eq!(arrow_key_to_direction("ArrowUp"), Some(ArrowDirection::Up));
        assert_eq!(arrow_key_to_direction("Home"), None);
    }

    #[test]
    fn test_vertical_navigation() {
        let v = Orientation::Vertical;
        assert_eq!(navigation_direction_for("ArrowDown", v), Some(NavDirection::Next));
        assert_eq!(navigation_direction_for("ArrowUp", v), Some(NavDirection::Previous));
        assert_eq!(navigation_direction_for("ArrowRight", v), None);
        assert_eq!(navigation_direction_for("Home", v), Some(NavDirection::First));
        assert_eq!(navigation_direction_for("End", v), Some(NavDirection::Last));
    }

    #[test]
    fn test_horizontal_navigation() {
        let h = Orientation::Horizontal;
        assert_eq!(navigation_direction_for("ArrowRight", h), Some(NavDirection::Next));
        assert_eq!(navigation_direction_for("ArrowLeft", h), Some(NavDirection::Previous));
        assert_eq!(navigation_direction_for("ArrowDown", h), None);
        assert_eq!(navigation_direction_for("Home", h), Some(NavDirection::First));
        assert_eq!(navigation_direction_for("End", h), Some(NavDirection::Last));
    }

    #[test]
    fn test_printable_char() {
        assert_eq!(KeyboardEvent::new("a").printable_char(), Some('a'));
        assert_eq!(KeyboardEvent::new("Z").printable_char(), Some('Z'));
        assert_eq!(KeyboardEvent::new("Enter").printable_char(), None);
        assert_eq!(
            KeyboardEvent::with_modifiers("a", Modifiers::ctrl()).printable_char(),
            None
        );
        assert_eq!(
            KeyboardEvent::with_modifiers("A", Modifiers::shift()).printable_char(),
            Some('A')
        );
    }
}
