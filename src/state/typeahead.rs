//! Typeahead - Jump to an item by typing its leading characters
//!
//! Keypresses accumulate in a [`TypeaheadBuffer`] that clears itself
//! [`TYPEAHEAD_TIMEOUT_MS`] after the last keypress. Matching is
//! case-insensitive against each item's text and skips disabled items.

use std::cell::RefCell;
use std::rc::Rc;

use crate::dom::TaskSlots;

/// Idle time after which the buffer clears.
pub const TYPEAHEAD_TIMEOUT_MS: u64 = 500;

const SLOT: &str = "typeahead";

/// Characters typed so far and when they expire (virtual clock ms).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeaheadBuffer {
    pub characters: String,
    pub expires_at: u64,
}

/// Per-instance typeahead state.
#[derive(Clone)]
pub struct Typeahead {
    buffer: Rc<RefCell<Option<TypeaheadBuffer>>>,
    slots: TaskSlots,
    timeout_ms: u64,
}

impl Typeahead {
    pub fn new(slots: TaskSlots) -> Self {
        Self::with_timeout(slots, TYPEAHEAD_TIMEOUT_MS)
    }

    pub fn with_timeout(slots: TaskSlots, timeout_ms: u64) -> Self {
        Self {
            buffer: Rc::new(RefCell::new(None)),
            slots,
            timeout_ms,
        }
    }

    /// Append a character and restart the expiry timer. Returns the query.
    pub fn push(&self, ch: char) -> String {
        let expires_at = self.slots.scheduler().now() + self.timeout_ms;
        let query = {
            let mut buffer = self.buffer.borrow_mut();
            let entry = buffer.get_or_insert_with(|| TypeaheadBuffer {
                characters: String::new(),
                expires_at,
            });
            entry.characters.extend(ch.to_lowercase());
            entry.expires_at = expires_at;
            entry.characters.clone()
        };

        let buffer = Rc::downgrade(&self.buffer);
        self.slots.schedule(SLOT, self.timeout_ms, move || {
            if let Some(buffer) = buffer.upgrade() {
                buffer.borrow_mut().take();
                tracing::trace!("typeahead buffer expired");
            }
        });
        query
    }

    /// Drop the buffer and its pending expiry.
    pub fn clear(&self) {
        self.slots.cancel(SLOT);
        self.buffer.borrow_mut().take();
    }

    pub fn buffer(&self) -> Option<TypeaheadBuffer> {
        self.buffer.borrow().clone()
    }

    pub fn query(&self) -> Option<String> {
        self.buffer
            .borrow()
            .as_ref()
            .map(|buffer| buffer.characters.clone())
    }
}

/// First enabled item, in list order, whose text starts with `query`.
///
/// `candidates` holds `(text, disabled)` per item.
pub fn find_match(candidates: &[(String, bool)], query: &str) -> Option<usize> {
    if query.is_empty() {
        return None;
    }
    let query = query.to_lowercase();
    let matches = |(text, disabled): &(String, bool)| {
        !disabled && text.trim().to_lowercase().starts_with(&query)
    };
    candidates.iter().position(matches)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::Scheduler;

    fn candidates(items: &[(&str, bool)]) -> Vec<(String, bool)> {
        items.iter().map(|(text, d)| (text.to_string(), *d)).collect()
    }

    #[test]
    fn test_find_match_case_insensitive() {
        let items = candidates(&[("Apple", false), ("Banana", false), ("blueberry", false)]);
        assert_eq!(find_match(&items, "b"), Some(1));
        assert_eq!(find_match(&items, "BL"), Some(2));
        assert_eq!(find_match(&items, "z"), None);
        assert_eq!(find_match(&items, ""), None);
    }

    #[test]
    fn test_find_match_skips_disabled() {
        let items = candidates(&[("Copy", true), ("Cut", false)]);
        assert_eq!(find_match(&items, "c"), Some(1));
    }

    #[test]
    fn test_first_match_wins() {
        let items = candidates(&[("Apple", false), ("Avocado", false)]);
        assert_eq!(find_match(&items, "a"), Some(0));
        assert_eq!(find_match(&items, "av"), Some(1));
    }

    #[test]
    fn test_buffer_accumulates_and_expires() {
        let scheduler = Scheduler::new();
        let typeahead = Typeahead::new(TaskSlots::new(scheduler.clone()));

        assert_eq!(typeahead.push('B'), "b");
        scheduler.advance(400);
        assert_eq!(typeahead.push('a'), "ba");
        assert_eq!(typeahead.buffer().map(|b| b.expires_at), Some(900));

        scheduler.advance(499);
        assert_eq!(typeahead.query().as_deref(), Some("ba"));
        scheduler.advance(1);
        assert_eq!(typeahead.query(), None);
    }

    #[test]
    fn test_clear_cancels_timer() {
        let scheduler = Scheduler::new();
        let typeahead = Typeahead::new(TaskSlots::new(scheduler.clone()));
        typeahead.push('x');
        typeahead.clear();
        assert_eq!(typeahead.query(), None);
        assert_eq!(scheduler.pending(), 0);
    }
}
