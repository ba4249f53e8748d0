//! TextField - Value tracking and validation for a text input.
//!
//! Validation failures are state (`error`, `valid`), never errors. Rules run
//! in a fixed order and stop at the first failure:
//!
//! 1. `required` (whitespace-only counts as empty)
//! 2. `min_length`
//! 3. `max_length`
//! 4. `pattern` (must match the whole value)
//! 5. the custom validator
//!
//! Length and pattern rules are skipped while the value is empty.
//!
//! # Example
//!
//! ```ignore
//! let field = TextField::new(host.clone(), TextFieldConfig {
//!     required: true,
//!     min_length: Some(3),
//!     ..Default::default()
//! });
//! let _input = field.input(input)?;
//! let _error = field.error(message)?;
//! doc.input(input, "ab");
//! assert!(!field.validate());
//! assert_eq!(doc.text_content(message), "Must be at least 3 characters");
//! ```

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use regex::Regex;
use serde::Deserialize;

use crate::dom::{ElementId, Event, EventKind, Host};
use crate::error::Result;
use crate::state::store::StateStore;

use super::id::resolve_id;
use super::lifecycle::InstanceCore;
use super::types::{Binding, DestroyCallback, Validator, ValueCallback};

const INPUT: &str = "text-field-input";
const LABEL: &str = "text-field-label";
const DESCRIPTION: &str = "text-field-description";
const ERROR: &str = "text-field-error";

const INPUT_ATTRIBUTES: &[&str] = &[
    "id",
    "aria-invalid",
    "aria-required",
    "aria-describedby",
    "readonly",
    "disabled",
    "data-dirty",
    "data-touched",
    "data-focused",
];
const LABEL_ATTRIBUTES: &[&str] = &["id", "for"];
const DESCRIPTION_ATTRIBUTES: &[&str] = &["id"];
const ERROR_ATTRIBUTES: &[&str] = &["id", "role", "aria-live", "hidden"];

pub const REQUIRED_MESSAGE: &str = "This field is required";
pub const PATTERN_MESSAGE: &str = "Invalid format";

// =============================================================================
// CONFIG
// =============================================================================

/// When validation runs on its own (it always runs on `validate()`/`submit()`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValidateOn {
    /// On every input once the field has been touched.
    Input,
    /// On blur, and on input while an error is showing.
    #[default]
    Blur,
    /// Only on `submit()`.
    Submit,
}

#[derive(Clone, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TextFieldConfig {
    pub id: Option<String>,
    /// Initial value, restored by `reset()`.
    pub value: String,
    pub required: bool,
    pub min_length: Option<usize>,
    pub max_length: Option<usize>,
    /// Regular expression the whole value must match.
    pub pattern: Option<String>,
    pub validate_on: ValidateOn,
    pub disabled: bool,
    pub read_only: bool,
    #[serde(skip)]
    pub validate: Option<Validator>,
    #[serde(skip)]
    pub on_value_change: Option<ValueCallback>,
    #[serde(skip)]
    pub on_destroy: Option<DestroyCallback>,
}

impl Default for TextFieldConfig {
    fn default() -> Self {
        Self {
            id: None,
            value: String::new(),
            required: false,
            min_length: None,
            max_length: None,
            pattern: None,
            validate_on: ValidateOn::Blur,
            disabled: false,
            read_only: false,
            validate: None,
            on_value_change: None,
            on_destroy: None,
        }
    }
}

// =============================================================================
// RULES
// =============================================================================

/// Compiled validation rules.
struct Rules {
    required: bool,
    min_length: Option<usize>,
    max_length: Option<usize>,
    pattern: Option<Regex>,
    custom: Option<Validator>,
}

impl Rules {
    fn from_config(config: &TextFieldConfig) -> Self {
        Self {
            required: config.required,
            min_length: config.min_length,
            max_length: config.max_length,
            pattern: config.pattern.as_deref().and_then(compile_pattern),
            custom: config.validate.clone(),
        }
    }

    /// First failing rule's message.
    fn check(&self, value: &str) -> Option<String> {
        let empty = value.trim().is_empty();
        if empty && self.required {
            return Some(REQUIRED_MESSAGE.to_string());
        }
        if !empty {
            let length = value.chars().count();
            if let Some(min) = self.min_length.filter(|&min| length < min) {
                return Some(format!("Must be at least {min} characters"));
            }
            if let Some(max) = self.max_length.filter(|&max| length > max) {
                return Some(format!("Must be at most {max} characters"));
            }
            if self.pattern.as_ref().is_some_and(|pattern| !pattern.is_match(value)) {
                return Some(PATTERN_MESSAGE.to_string());
            }
        }
        self.custom.as_ref().and_then(|custom| custom(value))
    }
}

/// Anchor `pattern` so it has to match the whole value. An invalid pattern
/// is logged and ignored.
fn compile_pattern(pattern: &str) -> Option<Regex> {
    match Regex::new(&format!("^(?:{pattern})$")) {
        Ok(regex) => Some(regex),
        Err(error) => {
            tracing::warn!(pattern, %error, "ignoring invalid text field pattern");
            None
        }
    }
}

// =============================================================================
// TEXT FIELD
// =============================================================================

#[derive(Debug, Clone, Copy, Default)]
struct FieldParts {
    input: Option<ElementId>,
    label: Option<ElementId>,
    description: Option<ElementId>,
    error: Option<ElementId>,
}

struct TextFieldInner {
    core: InstanceCore,
    config: RefCell<TextFieldConfig>,
    rules: RefCell<Rules>,
    state: StateStore,
    parts: Cell<FieldParts>,
}

/// Headless text field. Cloning shares the instance.
#[derive(Clone)]
pub struct TextField {
    inner: Rc<TextFieldInner>,
}

impl TextField {
    pub fn new(host: Host, config: TextFieldConfig) -> Self {
        let id = resolve_id(config.id.as_deref(), "text-field");
        let state = StateStore::builder()
            .field("value", config.value.as_str())
            .field("error", None::<String>)
            .field("valid", true)
            .field("dirty", false)
            .field("touched", false)
            .field("focused", false)
            .field("disabled", config.disabled)
            .field("readOnly", config.read_only)
            .build();
        let rules = Rules::from_config(&config);
        let core = InstanceCore::new(host, id, config.on_destroy.clone());

        let field = Self {
            inner: Rc::new(TextFieldInner {
                core,
                config: RefCell::new(config),
                rules: RefCell::new(rules),
                state,
                parts: Cell::new(FieldParts::default()),
            }),
        };

        let weak = Rc::downgrade(&field.inner);
        field.inner.state.bind_dom_sync(move |_| {
            if let Some(field) = Self::upgrade(&weak) {
                field.sync_dom();
            }
        });
        field
    }

    fn upgrade(weak: &Weak<TextFieldInner>) -> Option<Self> {
        weak.upgrade().map(|inner| Self { inner })
    }

    fn weak(&self) -> Weak<TextFieldInner> {
        Rc::downgrade(&self.inner)
    }

    pub fn id(&self) -> &str {
        self.inner.core.id()
    }

    pub fn state(&self) -> &StateStore {
        &self.inner.state
    }

    pub fn value(&self) -> String {
        self.inner.state.get_str("value").ok().flatten().unwrap_or_default()
    }

    pub fn error_message(&self) -> Option<String> {
        self.inner.state.get_str("error").ok().flatten()
    }

    pub fn is_valid(&self) -> bool {
        self.inner.state.get_bool("valid").unwrap_or(true)
    }

    pub fn is_dirty(&self) -> bool {
        self.inner.state.get_bool("dirty").unwrap_or(false)
    }

    pub fn is_touched(&self) -> bool {
        self.inner.state.get_bool("touched").unwrap_or(false)
    }

    pub fn input_id(&self) -> String {
        self.inner.core.part_id("input")
    }

    pub fn description_id(&self) -> String {
        self.inner.core.part_id("description")
    }

    pub fn error_id(&self) -> String {
        self.inner.core.part_id("error")
    }

    fn update_parts(&self, update: impl FnOnce(&mut FieldParts)) {
        let mut parts = self.inner.parts.get();
        update(&mut parts);
        self.inner.parts.set(parts);
    }

    // -------------------------------------------------------------------------
    // Parts
    // -------------------------------------------------------------------------

    /// The editable element.
    pub fn input(&self, element: ElementId) -> Result<Binding> {
        let core = &self.inner.core;
        if core.bind_part(element, INPUT)? {
            let weak = self.weak();
            core.listen_part(element, INPUT, element, EventKind::Input, move |event| {
                if let Some(field) = Self::upgrade(&weak) {
                    field.handle_input(event);
                }
            });
            let weak = self.weak();
            core.listen_part(element, INPUT, element, EventKind::Focus, move |_| {
                if let Some(field) = Self::upgrade(&weak) {
                    let _ = field.inner.state.set("focused", true);
                }
            });
            let weak = self.weak();
            core.listen_part(element, INPUT, element, EventKind::Blur, move |_| {
                if let Some(field) = Self::upgrade(&weak) {
                    field.handle_blur();
                }
            });
        }
        self.update_parts(|parts| parts.input = Some(element));
        if let Some(doc) = core.document() {
            doc.set_value(element, self.value());
        }
        self.sync_dom();
        Ok(self.unbind_on_destroy(element, INPUT, INPUT_ATTRIBUTES, |parts| &mut parts.input))
    }

    pub fn label(&self, element: ElementId) -> Result<Binding> {
        self.inner.core.bind_part(element, LABEL)?;
        self.update_parts(|parts| parts.label = Some(element));
        self.sync_dom();
        Ok(self.unbind_on_destroy(element, LABEL, LABEL_ATTRIBUTES, |parts| &mut parts.label))
    }

    /// Help text, referenced from the input's `aria-describedby`.
    pub fn description(&self, element: ElementId) -> Result<Binding> {
        self.inner.core.bind_part(element, DESCRIPTION)?;
        self.update_parts(|parts| parts.description = Some(element));
        self.sync_dom();
        Ok(self.unbind_on_destroy(element, DESCRIPTION, DESCRIPTION_ATTRIBUTES, |parts| {
            &mut parts.description
        }))
    }

    /// Error message container. Shows the current message, hidden when valid.
    pub fn error(&self, element: ElementId) -> Result<Binding> {
        self.inner.core.bind_part(element, ERROR)?;
        self.update_parts(|parts| parts.error = Some(element));
        self.sync_dom();
        Ok(self.unbind_on_destroy(element, ERROR, ERROR_ATTRIBUTES, |parts| &mut parts.error))
    }

    fn unbind_on_destroy(
        &self,
        element: ElementId,
        part: &'static str,
        attributes: &'static [&'static str],
        slot: fn(&mut FieldParts) -> &mut Option<ElementId>,
    ) -> Binding {
        let weak = self.weak();
        Binding::from_destroy(move || {
            let Some(field) = Self::upgrade(&weak) else { return };
            field.inner.core.unbind_part(element, part, attributes);
            field.update_parts(|parts| {
                let current = slot(parts);
                if *current == Some(element) {
                    *current = None;
                }
            });
            field.sync_dom();
        })
    }

    fn handle_input(&self, event: &Event) {
        let value = event.value.clone().unwrap_or_default();
        self.write_value(&value);

        let has_error = self.error_message().is_some();
        let validate = match self.inner.config.borrow().validate_on {
            ValidateOn::Input => self.is_touched() || has_error,
            ValidateOn::Blur => has_error,
            ValidateOn::Submit => false,
        };
        if validate {
            self.validate();
        }
    }

    fn handle_blur(&self) {
        let _ = self.inner.state.set("focused", false);
        let _ = self.inner.state.set("touched", true);
        if self.inner.config.borrow().validate_on != ValidateOn::Submit {
            self.validate();
        }
    }

    /// Store `value`, track dirtiness and notify. Returns `true` on change.
    fn write_value(&self, value: &str) -> bool {
        if !self.inner.state.set("value", value).unwrap_or(false) {
            return false;
        }
        let dirty = value != self.inner.config.borrow().value;
        let _ = self.inner.state.set("dirty", dirty);

        let callback = self.inner.config.borrow().on_value_change.clone();
        if let Some(callback) = callback {
            callback(value);
        }
        true
    }

    // -------------------------------------------------------------------------
    // Helpers
    // -------------------------------------------------------------------------

    /// Replace the value. A showing error is re-checked against the new value.
    pub fn set_value(&self, value: &str) {
        if self.inner.core.is_destroyed() {
            return;
        }
        if !self.write_value(value) {
            return;
        }
        if let (Some(doc), Some(input)) = (self.inner.core.document(), self.inner.parts.get().input) {
            doc.set_value(input, value);
        }
        if self.error_message().is_some() {
            self.validate();
        }
    }

    /// Run every rule now. Returns whether the value is valid.
    pub fn validate(&self) -> bool {
        let value = self.value();
        let error = self.inner.rules.borrow().check(&value);
        let valid = error.is_none();
        tracing::trace!(id = %self.id(), valid, "text field validated");
        let _ = self.inner.state.set("error", error);
        let _ = self.inner.state.set("valid", valid);
        valid
    }

    /// Mark touched and validate, as a form submit would.
    pub fn submit(&self) -> bool {
        let _ = self.inner.state.set("touched", true);
        self.validate()
    }

    pub fn set_touched(&self, touched: bool) {
        let _ = self.inner.state.set("touched", touched);
    }

    /// Back to the initial value with no error, clean and untouched.
    pub fn reset(&self) {
        let initial = self.inner.config.borrow().value.clone();
        let _ = self.inner.state.set("value", initial.as_str());
        let _ = self.inner.state.set("error", None::<String>);
        let _ = self.inner.state.set("valid", true);
        let _ = self.inner.state.set("dirty", false);
        let _ = self.inner.state.set("touched", false);
        if let (Some(doc), Some(input)) = (self.inner.core.document(), self.inner.parts.get().input) {
            doc.set_value(input, initial);
        }
    }

    pub fn set_disabled(&self, disabled: bool) {
        let _ = self.inner.state.set("disabled", disabled);
    }

    pub fn set_read_only(&self, read_only: bool) {
        let _ = self.inner.state.set("readOnly", read_only);
    }

    /// Change the pattern. An invalid pattern clears the rule.
    pub fn set_pattern(&self, pattern: Option<&str>) {
        self.inner.config.borrow_mut().pattern = pattern.map(str::to_string);
        self.inner.rules.borrow_mut().pattern = pattern.and_then(compile_pattern);
    }

    pub fn set_validator(&self, validator: Option<Validator>) {
        self.inner.config.borrow_mut().validate = validator.clone();
        self.inner.rules.borrow_mut().custom = validator;
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
        let error = self.error_message();
        let flag = |on: bool| on.then(|| "true".to_string());
        let presence = |on: bool| on.then(String::new);

        if let Some(input) = parts.input {
            let required = self.inner.config.borrow().required;
            let described_by: Vec<String> = [
                parts.description.map(|_| self.description_id()),
                error.as_ref().map(|_| self.error_id()),
            ]
            .into_iter()
            .flatten()
            .collect();

            doc.set_attribute(input, "id", self.input_id());
            doc.toggle_attribute(input, "aria-invalid", flag(error.is_some()));
            doc.toggle_attribute(input, "aria-required", flag(required));
            doc.toggle_attribute(
                input,
                "aria-describedby",
                (!described_by.is_empty()).then(|| described_by.join(" ")),
            );
            doc.set_disabled(input, self.inner.state.get_bool("disabled").unwrap_or(false));
            doc.toggle_attribute(input, "readonly", presence(self.inner.state.get_bool("readOnly").unwrap_or(false)));
            doc.toggle_attribute(input, "data-dirty", presence(self.is_dirty()));
            doc.toggle_attribute(input, "data-touched", presence(self.is_touched()));
            doc.toggle_attribute(
                input,
                "data-focused",
                presence(self.inner.state.get_bool("focused").unwrap_or(false)),
            );
        }
        if let Some(label) = parts.label {
            doc.set_attribute(label, "id", self.inner.core.part_id("label"));
            doc.set_attribute(label, "for", self.input_id());
        }
        if let Some(description) = parts.description {
            doc.set_attribute(description, "id", self.description_id());
        }
        if let Some(element) = parts.error {
            doc.set_attribute(element, "id", self.error_id());
            doc.set_attribute(element, "role", "alert");
            doc.set_attribute(element, "aria-live", "polite");
            doc.set_text(element, error.clone().unwrap_or_default());
            doc.toggle_attribute(element, "hidden", presence(error.is_none()));
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================

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

    fn headless(config: TextFieldConfig) -> TextField {
        TextField::new(Host::headless(), config)
    }

    #[test]
    fn test_whitespace_only_is_empty_when_required() {
        let field = headless(TextFieldConfig { required: true, ..Default::default() });
        field.set_value("   ");
        field.set_touched(true);
        assert!(!field.validate());
        assert_eq!(field.error_message().as_deref(), Some(REQUIRED_MESSAGE));
        assert!(!field.is_valid());
    }

    #[test]
    fn test_rule_order() {
        let field = headless(TextFieldConfig {
            min_length: Some(3),
            max_length: Some(5),
            pattern: Some("[a-z]+".into()),
            validate: Some(Rc::new(|v: &str| (v == "admin").then(|| "Reserved".to_string()))),
            ..Default::default()
        });
        let cases = [
            ("ab", Some("Must be at least 3 characters")),
            ("abcdef", Some("Must be at most 5 characters")),
            ("ab1", Some(PATTERN_MESSAGE)),
            ("admin", Some("Reserved")),
            ("abc", None),
        ];
        for (value, expected) in cases {
            field.set_value(value);
            field.validate();
            assert_eq!(field.error_message().as_deref(), expected, "{value}");
        }
    }

    #[test]
    fn test_pattern_must_match_whole_value() {
        let field = headless(TextFieldConfig { pattern: Some(r"\d{3}".into()), ..Default::default() });
        field.set_value("1234");
        assert!(!field.validate());
        field.set_value("123");
        assert!(field.validate());
    }

    #[test]
    fn test_empty_optional_skips_length_rules() {
        let field = headless(TextFieldConfig { min_length: Some(3), ..Default::default() });
        assert!(field.validate());
    }

    #[test]
    fn test_invalid_pattern_is_ignored() {
        let field = headless(TextFieldConfig { pattern: Some("(".into()), ..Default::default() });
        field.set_value("anything");
        assert!(field.validate());
    }

    #[test]
    fn test_set_value_round_trip_and_dirty() {
        let field = headless(TextFieldConfig { value: "start".into(), ..Default::default() });
        field.set_value("next");
        assert_eq!(field.value(), "next");
        assert!(field.is_dirty());
        field.set_value("start");
        assert!(!field.is_dirty());
    }

    #[test]
    fn test_blur_marks_touched_and_validates() {
        let (doc, host) = setup();
        let input = doc.create_child(doc.body(), "input");
        let field = TextField::new(host, TextFieldConfig { required: true, ..Default::default() });
        let _b = field.input(input).unwrap();

        doc.focus(input);
        assert_eq!(field.state().get_bool("focused"), Ok(true));
        doc.blur();
        assert!(field.is_touched());
        assert!(!field.is_valid());
        assert_eq!(doc.attribute(input, "aria-invalid").as_deref(), Some("true"));

        doc.input(input, "x");
        assert!(field.is_valid());
        assert!(!doc.has_attribute(input, "aria-invalid"));
    }

    #[test]
    fn test_submit_mode_waits() {
        let (doc, host) = setup();
        let input = doc.create_child(doc.body(), "input");
        let field = TextField::new(host, TextFieldConfig {
            required: true,
            validate_on: ValidateOn::Submit,
            ..Default::default()
        });
        let _b = field.input(input).unwrap();
        doc.focus(input);
        doc.blur();
        assert!(field.is_valid());
        assert!(!field.submit());
    }

    #[test]
    fn test_error_part_and_describedby() {
        let (doc, host) = setup();
        let input = doc.create_child(doc.body(), "input");
        let description = doc.create_child(doc.body(), "p");
        let message = doc.create_child(doc.body(), "p");
        let field = TextField::new(host, TextFieldConfig { min_length: Some(3), ..Default::default() });
        let _i = field.input(input).unwrap();
        let _d = field.description(description).unwrap();
        let _e = field.error(message).unwrap();

        assert_eq!(
            doc.attribute(input, "aria-describedby").as_deref(),
            Some("text-field-0-description")
        );
        assert!(doc.has_attribute(message, "hidden"));

        field.set_value("ab");
        field.validate();
        assert_eq!(doc.text_content(message), "Must be at least 3 characters");
        assert!(!doc.has_attribute(message, "hidden"));
        assert_eq!(doc.attribute(message, "role").as_deref(), Some("alert"));
        assert_eq!(
            doc.attribute(input, "aria-describedby").as_deref(),
            Some("text-field-0-description text-field-0-error")
        );
    }

    #[test]
    fn test_label_for() {
        let (doc, host) = setup();
        let label = doc.create_child(doc.body(), "label");
        let field = TextField::new(host, TextFieldConfig { id: Some("email".into()), ..Default::default() });
        let _l = field.label(label).unwrap();
        assert_eq!(doc.attribute(label, "for").as_deref(), Some("email-input"));
    }

    #[test]
    fn test_reset() {
        let field = headless(TextFieldConfig { required: true, ..Default::default() });
        field.set_value("x");
        field.set_value("");
        field.submit();
        field.reset();
        assert_eq!(field.value(), "");
        assert!(field.is_valid());
        assert!(!field.is_touched());
        assert!(!field.is_dirty());
        assert_eq!(field.error_message(), None);
    }

    #[test]
    fn test_value_change_callback() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let s = seen.clone();
        let field = headless(TextFieldConfig {
            on_value_change: Some(Rc::new(move |v: &str| s.borrow_mut().push(v.to_string()))),
            ..Default::default()
        });
        field.set_value("a");
        field.set_value("a");
        field.set_value("ab");
        assert_eq!(*seen.borrow(), vec!["a".to_string(), "ab".to_string()]);
    }

    #[test]
    fn test_config_from_json() {
        let config: TextFieldConfig = serde_json::from_str(
            r#"{"required":true,"minLength":2,"pattern":"[0-9]+","validateOn":"input"}"#,
        )
        .unwrap();
        assert!(config.required);
        assert_eq!(config.min_length, Some(2));
        assert_eq!(config.validate_on, ValidateOn::Input);
    }
}
