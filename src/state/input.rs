//! Input Module - Terminal key adapter
//!
//! Bridges crossterm's key events into the engine's [`KeyboardEvent`] so a
//! terminal host can drive the same primitives a browser host does. Key names
//! match the browser's `KeyboardEvent.key` values.
//!
//! # Example
//!
//! ```ignore
//! use crossterm::event::{read, Event};
//! use spark_headless::state::input::convert_key_event;
//!
//! if let Event::Key(key) = read()? {
//!     let event = convert_key_event(key);
//!     document.key_down_with(focused, event);
//! }
//! ```

use crossterm::event::{KeyCode, KeyEvent as CrosstermKeyEvent, KeyEventKind, KeyModifiers};

use super::keyboard::{KeyState, KeyboardEvent, Modifiers};

// =============================================================================
// KEY EVENT CONVERSION
// =============================================================================

/// Convert crossterm KeyEvent to our KeyboardEvent
pub fn convert_key_event(event: CrosstermKeyEvent) -> KeyboardEvent {
    let mut modifiers = convert_modifiers(event.modifiers);

    let key = match event.code {
        KeyCode::Char(c) => c.to_string(),
        KeyCode::Enter => "Enter".to_string(),
        KeyCode::Tab => "Tab".to_string(),
        KeyCode::BackTab => {
            modifiers.shift = true;
            "Tab".to_string()
        }
        KeyCode::Backspace => "Backspace".to_string(),
        KeyCode::Delete => "Delete".to_string(),
        KeyCode::Esc => "Escape".to_string(),
        KeyCode::Up => "ArrowUp".to_string(),
        KeyCode::Down => "ArrowDown".to_string(),
        KeyCode::Left => "ArrowLeft".to_string(),
        KeyCode::Right => "ArrowRight".to_string(),
        KeyCode::Home => "Home".to_string(),
        KeyCode::End => "End".to_string(),
        KeyCode::PageUp => "PageUp".to_string(),
        KeyCode::PageDown => "PageDown".to_string(),
        KeyCode::F(n) => format!("F{}", n),
        KeyCode::Insert => "Insert".to_string(),
        _ => "Unidentified".to_string(),
    };

    let state = match event.kind {
        KeyEventKind::Press => KeyState::Press,
        KeyEventKind::Repeat => KeyState::Repeat,
        KeyEventKind::Release => KeyState::Release,
    };

    KeyboardEvent {
        key,
        modifiers,
        state,
    }
}

// =============================================================================
// MODIFIER CONVERSION
// =============================================================================

/// Convert crossterm KeyModifiers to our Modifiers
fn convert_modifiers(mods: KeyModifiers) -> Modifiers {
    Modifiers {
        ctrl: mods.contains(KeyModifiers::CONTROL),
        alt: mods.contains(KeyModifiers::ALT),
        shift: mods.contains(KeyModifiers::SHIFT),
        meta: mods.contains(KeyModifiers::SUPER) || mods.contains(KeyModifiers::META),
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::keyboard::{is_activation_key, is_escape_key};

    fn press(code: KeyCode, modifiers: KeyModifiers) -> CrosstermKeyEvent {
        CrosstermKeyEvent::new(code, modifiers)
    }

    #[test]
    fn test_convert_named_keys() {
        assert_eq!(convert_key_event(press(KeyCode::Down, KeyModifiers::NONE)).key, "ArrowDown");
        assert_eq!(convert_key_event(press(KeyCode::Home, KeyModifiers::NONE)).key, "Home");
        assert!(is_escape_key(&convert_key_event(press(KeyCode::Esc, KeyModifiers::NONE)).key));
        assert!(is_activation_key(&convert_key_event(press(KeyCode::Enter, KeyModifiers::NONE)).key));
    }

    #[test]
    fn test_space_is_activation() {
        let event = convert_key_event(press(KeyCode::Char(' '), KeyModifiers::NONE));
        assert_eq!(event.key, " ");
        assert!(is_activation_key(&event.key));
    }

    #[test]
    fn test_back_tab_becomes_shift_tab() {
        let event = convert_key_event(press(KeyCode::BackTab, KeyModifiers::NONE));
        assert_eq!(event.key, "Tab");
        assert!(event.modifiers.shift);
    }

    #[test]
    fn test_modifiers() {
        let event = convert_key_event(press(KeyCode::Char('c'), KeyModifiers::CONTROL));
        assert!(event.modifiers.ctrl);
        assert!(!event.modifiers.shift);
        assert_eq!(event.printable_char(), None);
        assert_eq!(event.state, KeyState::Press);
    }
}
