//! Positioning Engine
//!
//! Places a floating element (tooltip, menu content) next to its trigger.
//!
//! # Algorithm
//!
//! 1. **Base**: flush against the trigger edge named by the placement side,
//!    `offset` pixels away, aligned center/start/end along that edge
//! 2. **Horizontal check** (collision handling only): overflow past the
//!    left/right viewport edge, inside an 8px margin
//! 3. **Vertical check**: the same for top/bottom
//!
//! For each axis independently: overflow on the edge the placement points at
//! flips the side (right <-> left, top <-> bottom) and recomputes that axis;
//! overflow on any other edge clamps the coordinate inside the margin.
//!
//! Nothing is cached: callers pass fresh rectangles on every call.

use serde::Deserialize;

use crate::types::{Alignment, Placement, Rect, Side, Size, Viewport};

/// Distance kept from the viewport edges when checking for collisions.
pub const VIEWPORT_MARGIN: f64 = 8.0;

/// Default gap between trigger and floating element.
pub const DEFAULT_OFFSET: f64 = 8.0;

// =============================================================================
// TYPES
// =============================================================================

/// Inputs that stay fixed for a floating element.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PositionOptions {
    pub placement: Placement,
    pub offset: f64,
    pub smart_positioning: bool,
}

impl Default for PositionOptions {
    fn default() -> Self {
        Self {
            placement: Placement::BOTTOM,
            offset: DEFAULT_OFFSET,
            smart_positioning: true,
        }
    }
}

/// Absolute coordinates of the floating element and the placement actually used.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlacementResult {
    pub x: f64,
    pub y: f64,
    pub placement: Placement,
}

// =============================================================================
// BASE FORMULAS
// =============================================================================

fn align_along(start: f64, trigger_len: f64, floating_len: f64, align: Alignment) -> f64 {
    match align {
        Alignment::Center => start + (trigger_len - floating_len) / 2.0,
        Alignment::Start => start,
        Alignment::End => start + trigger_len - floating_len,
    }
}

/// Horizontal coordinate for `placement`.
fn base_x(trigger: &Rect, floating: Size, placement: Placement, offset: f64) -> f64 {
    match placement.side {
        Side::Left => trigger.left - offset - floating.width,
        Side::Right => trigger.right() + offset,
        Side::Top | Side::Bottom => {
            align_along(trigger.left, trigger.width, floating.width, placement.align)
        }
    }
}

/// Vertical coordinate for `placement`.
fn base_y(trigger: &Rect, floating: Size, placement: Placement, offset: f64) -> f64 {
    match placement.side {
        Side::Top => trigger.top - offset - floating.height,
        Side::Bottom => trigger.bottom() + offset,
        Side::Left | Side::Right => {
            align_along(trigger.top, trigger.height, floating.height, placement.align)
        }
    }
}

/// Keep `[value, value + len]` inside `[margin, limit - margin]`, favouring
/// the leading edge when the element is larger than the space.
fn clamp_into(value: f64, len: f64, limit: f64) -> f64 {
    value
        .min(limit - VIEWPORT_MARGIN - len)
        .max(VIEWPORT_MARGIN)
}

// =============================================================================
// COMPUTE
// =============================================================================

/// Compute the floating element's position.
pub fn compute_position(
    trigger: Rect,
    floating: Size,
    viewport: Viewport,
    options: &PositionOptions,
) -> PlacementResult {
    let mut placement = options.placement;
    let mut x = base_x(&trigger, floating, placement, options.offset);
    let mut y = base_y(&trigger, floating, placement, options.offset);

    if !options.smart_positioning {
        return PlacementResult { x, y, placement };
    }

    // Horizontal axis
    let overflow_left = x < VIEWPORT_MARGIN;
    let overflow_right = x + floating.width > viewport.width - VIEWPORT_MARGIN;
    if (placement.side == Side::Left && overflow_left)
        || (placement.side == Side::Right && overflow_right)
    {
        placement = placement.flipped();
        x = base_x(&trigger, floating, placement, options.offset);
    } else if overflow_left || overflow_right {
        x = clamp_into(x, floating.width, viewport.width);
    }

    // Vertical axis
    let overflow_top = y < VIEWPORT_MARGIN;
    let overflow_bottom = y + floating.height > viewport.height - VIEWPORT_MARGIN;
    if (placement.side == Side::Top && overflow_top)
        || (placement.side == Side::Bottom && overflow_bottom)
    {
        placement = placement.flipped();
        y = base_y(&trigger, floating, placement, options.offset);
    } else if overflow_top || overflow_bottom {
        y = clamp_into(y, floating.height, viewport.height);
    }

    if placement != options.placement {
        tracing::debug!(from = %options.placement, to = %placement, "placement flipped");
    }

    PlacementResult { x, y, placement }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn options(placement: Placement, offset: f64, smart: bool) -> PositionOptions {
        PositionOptions {
            placement,
            offset,
            smart_positioning: smart,
        }
    }

    fn trigger() -> Rect {
        Rect::from_edges(500.0, 500.0, 600.0, 550.0)
    }

    #[test]
    fn test_top_centered_above_trigger() {
        let result = compute_position(
            trigger(),
            Size::new(200.0, 100.0),
            Viewport::default(),
            &options(Placement::TOP, 10.0, true),
        );
        assert_eq!(result.x, 450.0);
        assert_eq!(result.y, 390.0);
        assert_eq!(result.placement, Placement::TOP);
    }

    #[test]
    fn test_base_formulas() {
        let size = Size::new(40.0, 20.0);
        let vp = Viewport::new(2000.0, 2000.0);
        let at = |placement| {
            let r = compute_position(trigger(), size, vp, &options(placement, 4.0, false));
            (r.x, r.y)
        };
        assert_eq!(at(Placement::BOTTOM), (530.0, 554.0));
        assert_eq!(at(Placement::BOTTOM_START), (500.0, 554.0));
        assert_eq!(at(Placement::BOTTOM_END), (560.0, 554.0));
        assert_eq!(at(Placement::TOP_END), (560.0, 476.0));
        assert_eq!(at(Placement::RIGHT), (604.0, 515.0));
        assert_eq!(at(Placement::RIGHT_START), (604.0, 500.0));
        assert_eq!(at(Placement::LEFT_END), (456.0, 530.0));
    }

    #[test]
    fn test_flips_right_to_left() {
        let trigger = Rect::new(900.0, 300.0, 100.0, 40.0);
        let result = compute_position(
            trigger,
            Size::new(150.0, 40.0),
            Viewport::new(1024.0, 768.0),
            &options(Placement::RIGHT, 8.0, true),
        );
        assert_eq!(result.placement, Placement::LEFT);
        assert_eq!(result.x, 900.0 - 8.0 - 150.0);
        assert_eq!(result.y, 300.0);
    }

    #[test]
    fn test_flips_bottom_to_top_keeping_alignment() {
        let trigger = Rect::new(100.0, 720.0, 80.0, 30.0);
        let result = compute_position(
            trigger,
            Size::new(120.0, 60.0),
            Viewport::new(1024.0, 768.0),
            &options(Placement::BOTTOM_START, 4.0, true),
        );
        assert_eq!(result.placement, Placement::TOP_START);
        assert_eq!(result.y, 720.0 - 4.0 - 60.0);
        assert_eq!(result.x, 100.0);
    }

    #[test]
    fn test_cross_axis_overflow_clamps() {
        // Centered top tooltip near the left edge: horizontal overflow is not
        // on the placement's side, so it clamps rather than flips.
        let trigger = Rect::new(0.0, 300.0, 20.0, 20.0);
        let result = compute_position(
            trigger,
            Size::new(200.0, 30.0),
            Viewport::new(1024.0, 768.0),
            &options(Placement::TOP, 8.0, true),
        );
        assert_eq!(result.placement, Placement::TOP);
        assert_eq!(result.x, VIEWPORT_MARGIN);
        assert_eq!(result.y, 300.0 - 8.0 - 30.0);
    }

    #[test]
    fn test_flip_one_axis_clamp_other() {
        // Right placement at the bottom-right corner: flips horizontally,
        // clamps vertically.
        let trigger = Rect::new(950.0, 740.0, 40.0, 20.0);
        let result = compute_position(
            trigger,
            Size::new(100.0, 100.0),
            Viewport::new(1024.0, 768.0),
            &options(Placement::RIGHT, 8.0, true),
        );
        assert_eq!(result.placement, Placement::LEFT);
        assert_eq!(result.x, 950.0 - 8.0 - 100.0);
        assert_eq!(result.y, 768.0 - VIEWPORT_MARGIN - 100.0);
    }

    #[test]
    fn test_disabled_collision_handling_never_moves() {
        let trigger = Rect::new(900.0, 300.0, 100.0, 40.0);
        let result = compute_position(
            trigger,
            Size::new(150.0, 40.0),
            Viewport::new(1024.0, 768.0),
            &options(Placement::RIGHT, 8.0, false),
        );
        assert_eq!(result.placement, Placement::RIGHT);
        assert_eq!(result.x, 1008.0);
    }

    #[test]
    fn test_options_deserialize() {
        let parsed: PositionOptions =
            serde_json::from_str(r#"{"placement":"left-start","smartPositioning":false}"#).unwrap();
        assert_eq!(parsed.placement, Placement::LEFT_START);
        assert_eq!(parsed.offset, DEFAULT_OFFSET);
        assert!(!parsed.smart_positioning);
    }
}
