//! Error types.
//!
//! Only programmer errors surface as `Err`: unknown state fields, conflicting
//! bindings, references to elements that never existed, and failures raised
//! by host callbacks. Validation failures are state, never errors.

use thiserror::Error;

use crate::dom::ElementId;

/// Errors raised by the engine.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    /// A state field that the primitive never declared.
    #[error("invalid state field `{field}`")]
    InvalidField { field: String },

    /// A typed read of a field holding a different kind of value.
    #[error("state field `{field}` does not hold a {expected}")]
    FieldType { field: String, expected: &'static str },

    /// The element is already bound to the same part of another instance.
    #[error("element {element} is already bound as `{part}` by `{owner}`")]
    ConflictingBinding {
        element: ElementId,
        part: &'static str,
        owner: String,
    },

    /// The element id was never allocated by this document.
    #[error("unknown element {0}")]
    UnknownElement(ElementId),

    /// Appending would make an element its own ancestor.
    #[error("cannot append {child} inside {parent}")]
    InvalidHierarchy { parent: ElementId, child: ElementId },

    /// A placement string outside the twelve known placements.
    #[error("invalid placement `{0}`")]
    InvalidPlacement(String),

    /// A host-supplied callback reported a failure.
    #[error("callback failed: {0}")]
    Callback(String),
}

/// Crate result alias.
pub type Result<T, E = Error> = std::result::Result<T, E>;
