//! Core types for spark-headless.
//!
//! Geometry and placement vocabulary shared by the positioning engine, the
//! document model and every primitive. Nothing here knows about rendering.

use std::fmt;
use std::str::FromStr;

use serde::Deserialize;

use crate::error::Error;

// =============================================================================
// Geometry
// =============================================================================

/// Axis-aligned rectangle in viewport coordinates (CSS pixels).
#[derive(Debug, Clone, Copy, PartialEq, Default, Deserialize)]
#[serde(default)]
pub struct Rect {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    /// Create a rectangle from its origin and size.
    pub const fn new(left: f64, top: f64, width: f64, height: f64) -> Self {
        Self { left, top, width, height }
    }

    /// Create a rectangle from its four edges, the way `getBoundingClientRect` reports them.
    pub fn from_edges(top: f64, left: f64, right: f64, bottom: f64) -> Self {
        Self {
            left,
            top,
            width: (right - left).max(0.0),
            height: (bottom - top).max(0.0),
        }
    }

    pub fn right(&self) -> f64 {
        self.left + self.width
    }

    pub fn bottom(&self) -> f64 {
        self.top + self.height
    }

    pub fn size(&self) -> Size {
        Size::new(self.width, self.height)
    }
}

/// Width and height of a floating element.
#[derive(Debug, Clone, Copy, PartialEq, Default, Deserialize)]
#[serde(default)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

impl Size {
    pub const fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }
}

/// Visible area of the host window.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct Viewport {
    pub width: f64,
    pub height: f64,
}

impl Viewport {
    pub const fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }
}

impl Default for Viewport {
    fn default() -> Self {
        Self::new(1024.0, 768.0)
    }
}

// =============================================================================
// Placement
// =============================================================================

/// The trigger edge a floating element is attached to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Top,
    Bottom,
    Left,
    Right,
}

impl Side {
    /// The side on the other end of the same axis.
    pub fn opposite(self) -> Self {
        match self {
            Side::Top => Side::Bottom,
            Side::Bottom => Side::Top,
            Side::Left => Side::Right,
            Side::Right => Side::Left,
        }
    }

    /// Top and bottom placements stack along the vertical axis.
    pub fn is_vertical(self) -> bool {
        matches!(self, Side::Top | Side::Bottom)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Side::Top => "top",
            Side::Bottom => "bottom",
            Side::Left => "left",
            Side::Right => "right",
        }
    }
}

/// Alignment along the edge the floating element is attached to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Alignment {
    #[default]
    Center,
    Start,
    End,
}

/// One of the twelve placements: `{top,bottom,left,right} x {center,-start,-end}`.
///
/// Parses from and prints as the familiar strings (`"top"`, `"bottom-start"`,
/// `"left-end"`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(try_from = "String")]
pub struct Placement {
    pub side: Side,
    pub align: Alignment,
}

impl Placement {
    pub const TOP: Self = Self::new(Side::Top, Alignment::Center);
    pub const TOP_START: Self = Self::new(Side::Top, Alignment::Start);
    pub const TOP_END: Self = Self::new(Side::Top, Alignment::End);
    pub const BOTTOM: Self = Self::new(Side::Bottom, Alignment::Center);
    pub const BOTTOM_START: Self = Self::new(Side::Bottom, Alignment::Start);
    pub const BOTTOM_END: Self = Self::new(Side::Bottom, Alignment::End);
    pub const LEFT: Self = Self::new(Side::Left, Alignment::Center);
    pub const LEFT_START: Self = Self::new(Side::Left, Alignment::Start);
    pub const LEFT_END: Self = Self::new(Side::Left, Alignment::End);
    pub const RIGHT: Self = Self::new(Side::Right, Alignment::Center);
    pub const RIGHT_START: Self = Self::new(Side::Right, Alignment::Start);
    pub const RIGHT_END: Self = Self::new(Side::Right, Alignment::End);

    /// All twelve placements, in declaration order.
    pub const ALL: [Self; 12] = [
        Self::TOP,
        Self::TOP_START,
        Self::TOP_END,
        Self::BOTTOM,
        Self::BOTTOM_START,
        Self::BOTTOM_END,
        Self::LEFT,
        Self::LEFT_START,
        Self::LEFT_END,
        Self::RIGHT,
        Self::RIGHT_START,
        Self::RIGHT_END,
    ];

    pub const fn new(side: Side, align: Alignment) -> Self {
        Self { side, align }
    }

    /// Same alignment, opposite side.
    pub fn flipped(self) -> Self {
        Self::new(self.side.opposite(), self.align)
    }
}

impl fmt::Display for Placement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.align {
            Alignment::Center => write!(f, "{}", self.side.as_str()),
            Alignment::Start => write!(f, "{}-start", self.side.as_str()),
            Alignment::End => write!(f, "{}-end", self.side.as_str()),
        }
    }
}

impl FromStr for Placement {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (side, align) = match s.split_once('-') {
            Some((side, "start")) => (side, Alignment::Start),
            Some((side, "end")) => (side, Alignment::End),
            Some(_) => return Err(Error::InvalidPlacement(s.to_string())),
            None => (s, Alignment::Center),
        };
        let side = match side {
            "top" => Side::Top,
            "bottom" => Side::Bottom,
            "left" => Side::Left,
            "right" => Side::Right,
            _ => return Err(Error::InvalidPlacement(s.to_string())),
        };
        Ok(Self::new(side, align))
    }
}

impl TryFrom<String> for Placement {
    type Error = Error;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl Default for Placement {
    fn default() -> Self {
        Self::BOTTOM
    }
}

// =============================================================================
// Orientation
// =============================================================================

/// Layout direction of a navigable list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Orientation {
    #[default]
    Vertical,
    Horizontal,
}

impl Orientation {
    pub fn as_str(self) -> &'static str {
        match self {
            Orientation::Vertical => "vertical",
            Orientation::Horizontal => "horizontal",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rect_from_edges() {
        let rect = Rect::from_edges(500.0, 500.0, 600.0, 550.0);
        assert_eq!(rect.width, 100.0);
        assert_eq!(rect.height, 50.0);
        assert_eq!(rect.right(), 600.0);
        assert_eq!(rect.bottom(), 550.0);
    }

    #[test]
    fn test_placement_parse_and_display() {
        for placement in Placement::ALL {
            let text = placement.to_string();
            assert_eq!(text.parse::<Placement>().ok(), Some(placement));
        }
        assert_eq!("right-start".parse::<Placement>().ok(), Some(Placement::RIGHT_START));
        assert!("middle".parse::<Placement>().is_err());
        assert!("top-center".parse::<Placement>().is_err());
    }

    #[test]
    fn test_flip_keeps_alignment() {
        assert_eq!(Placement::RIGHT_START.flipped(), Placement::LEFT_START);
        assert_eq!(Placement::TOP.flipped(), Placement::BOTTOM);
        assert_eq!(Placement::BOTTOM_END.flipped(), Placement::TOP_END);
    }

    #[test]
    fn test_placement_deserializes_from_string() {
        let placement: Placement = serde_json::from_str("\"left-end\"").unwrap();
        assert_eq!(placement, Placement::LEFT_END);
        assert!(serde_json::from_str::<Placement>("\"nowhere\"").is_err());
    }
}
