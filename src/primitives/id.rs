//! Instance ids.
//!
//! Every primitive instance has a string id used as the prefix for its parts
//! (`menu-3-content`, `tabs-1-tab-settings`). Ids come from a per-thread
//! counter unless the config supplies one.

use std::cell::Cell;

thread_local! {
    /// Counter for generating unique IDs.
    static ID_COUNTER: Cell<usize> = const { Cell::new(0) };
}

/// Next id for `prefix`, e.g. `"tooltip-4"`.
pub fn generate_id(prefix: &str) -> String {
    ID_COUNTER.with(|counter| {
        let id = counter.get();
        counter.set(id + 1);
        format!("{prefix}-{id}")
    })
}

/// Use `explicit` when set, otherwise generate one.
pub(crate) fn resolve_id(explicit: Option<&str>, prefix: &str) -> String {
    match explicit {
        Some(id) if !id.is_empty() => id.to_string(),
        _ => generate_id(prefix),
    }
}

/// Reset the counter (for testing).
pub fn reset_id_counter() {
    ID_COUNTER.with(|counter| counter.set(0));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_id_is_monotonic() {
        reset_id_counter();
        assert_eq!(generate_id("menu"), "menu-0");
        assert_eq!(generate_id("tabs"), "tabs-1");
        assert_eq!(resolve_id(Some("settings"), "modal"), "settings");
        assert_eq!(resolve_id(Some(""), "modal"), "modal-2");
        assert_eq!(resolve_id(None, "modal"), "modal-3");
    }
}
