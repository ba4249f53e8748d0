//! Layout Module
//!
//! Viewport-aware placement of floating elements (tooltips, menus) relative
//! to their trigger.
//!
//! # Example
//!
//! ```ignore
//! use spark_headless::layout::{compute_position, PositionOptions};
//! use spark_headless::{Placement, Rect, Size, Viewport};
//!
//! let result = compute_position(
//!     Rect::from_edges(500.0, 500.0, 600.0, 550.0),
//!     Size::new(200.0, 100.0),
//!     Viewport::default(),
//!     &PositionOptions { placement: Placement::TOP, offset: 10.0, smart_positioning: true },
//! );
//! assert_eq!((result.x, result.y), (450.0, 390.0));
//! ```

mod position;

pub use position::*;
