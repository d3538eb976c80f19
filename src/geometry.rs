//! Tooltip geometry: where a hint goes relative to its target.
//!
//! Everything here is a pure function of its inputs. The tooltip body is
//! placed on the requested side of the target and then clamped into the
//! viewport; the arrow is computed from the target alone, so near a viewport
//! edge it keeps pointing at the target even when the body has been pushed
//! away from it.

use serde::{Deserialize, Serialize};

use crate::catalog::TooltipSide;

/// Space between the target edge and the tooltip body.
pub const TOOLTIP_GAP: f64 = 24.0;
/// Half of the arrow's width along the target edge.
pub const ARROW_HALF_WIDTH: f64 = 12.0;
/// Arrow length perpendicular to the target edge.
pub const ARROW_LENGTH: f64 = 16.0;
/// Minimum distance between the tooltip body and the viewport edge.
pub const VIEWPORT_MARGIN: f64 = 10.0;

/// Width and height in CSS pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

impl Size {
    pub const fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }
}

/// A bounding rectangle in viewport coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub const fn new(left: f64, top: f64, width: f64, height: f64) -> Self {
        Self {
            left,
            top,
            width,
            height,
        }
    }

    pub fn right(&self) -> f64 {
        self.left + self.width
    }

    pub fn bottom(&self) -> f64 {
        self.top + self.height
    }

    pub fn center_x(&self) -> f64 {
        self.left + self.width / 2.0
    }

    pub fn center_y(&self) -> f64 {
        self.top + self.height / 2.0
    }
}

/// Computed tooltip body and arrow coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Placement {
    pub side: TooltipSide,
    pub left: f64,
    pub top: f64,
    pub arrow_left: f64,
    pub arrow_top: f64,
}

/// Place a tooltip of `tooltip` size on `side` of `target`, clamped to `viewport`.
pub fn compute_placement(target: Rect, tooltip: Size, side: TooltipSide, viewport: Size) -> Placement {
    let (left, top) = match side {
        TooltipSide::Top => (
            target.center_x() - tooltip.width / 2.0,
            target.top - tooltip.height - TOOLTIP_GAP,
        ),
        TooltipSide::Bottom => (
            target.center_x() - tooltip.width / 2.0,
            target.bottom() + TOOLTIP_GAP,
        ),
        TooltipSide::Left => (
            target.left - tooltip.width - TOOLTIP_GAP,
            target.center_y() - tooltip.height / 2.0,
        ),
        TooltipSide::Right => (
            target.right() + TOOLTIP_GAP,
            target.center_y() - tooltip.height / 2.0,
        ),
    };

    let (arrow_left, arrow_top) = arrow_anchor(target, side);

    Placement {
        side,
        left: clamp_axis(left, tooltip.width, viewport.width),
        top: clamp_axis(top, tooltip.height, viewport.height),
        arrow_left,
        arrow_top,
    }
}

/// Same as [`compute_placement`] with the side given as free text.
pub fn compute_placement_for(target: Rect, tooltip: Size, side: &str, viewport: Size) -> Placement {
    compute_placement(target, tooltip, TooltipSide::parse(side), viewport)
}

/// Arrow anchor at the midpoint of the target edge facing the tooltip.
fn arrow_anchor(target: Rect, side: TooltipSide) -> (f64, f64) {
    match side {
        TooltipSide::Top => (target.center_x() - ARROW_HALF_WIDTH, target.top - ARROW_LENGTH),
        TooltipSide::Bottom => (target.center_x() - ARROW_HALF_WIDTH, target.bottom()),
        TooltipSide::Left => (target.left - ARROW_LENGTH, target.center_y() - ARROW_HALF_WIDTH),
        TooltipSide::Right => (target.right(), target.center_y() - ARROW_HALF_WIDTH),
    }
}

/// Clamp one coordinate into `[margin, viewport - extent - margin]`.
///
/// When the tooltip is larger than the viewport the upper bound falls below
/// the margin; the lower bound wins so the body's leading edge stays visible.
fn clamp_axis(position: f64, extent: f64, viewport: f64) -> f64 {
    let max = viewport - extent - VIEWPORT_MARGIN;
    position.min(max).max(VIEWPORT_MARGIN)
}

#[cfg(test)]
mod tests {
    use super::*;

    const VIEWPORT: Size = Size::new(1280.0, 800.0);
    const TOOLTIP: Size = Size::new(300.0, 100.0);

    fn centered_target() -> Rect {
        Rect::new(600.0, 400.0, 80.0, 40.0)
    }

    #[test]
    fn top_placement_centers_above_target() {
        let p = compute_placement(centered_target(), TOOLTIP, TooltipSide::Top, VIEWPORT);
        assert_eq!(p.left, 640.0 - 150.0);
        assert_eq!(p.top, 400.0 - 100.0 - 24.0);
        assert_eq!(p.arrow_left, 640.0 - 12.0);
        assert_eq!(p.arrow_top, 400.0 - 16.0);
    }

    #[test]
    fn bottom_placement_below_target() {
        let p = compute_placement(centered_target(), TOOLTIP, TooltipSide::Bottom, VIEWPORT);
        assert_eq!(p.left, 490.0);
        assert_eq!(p.top, 440.0 + 24.0);
        assert_eq!(p.arrow_top, 440.0);
    }

    #[test]
    fn left_and_right_center_vertically() {
        let left = compute_placement(centered_target(), TOOLTIP, TooltipSide::Left, VIEWPORT);
        assert_eq!(left.left, 600.0 - 300.0 - 24.0);
        assert_eq!(left.top, 420.0 - 50.0);
        assert_eq!(left.arrow_left, 600.0 - 16.0);
        assert_eq!(left.arrow_top, 420.0 - 12.0);

        let right = compute_placement(centered_target(), TOOLTIP, TooltipSide::Right, VIEWPORT);
        assert_eq!(right.left, 680.0 + 24.0);
        assert_eq!(right.top, 370.0);
        assert_eq!(right.arrow_left, 680.0);
    }

    #[test]
    fn unknown_side_defaults_to_top() {
        let by_name = compute_placement_for(centered_target(), TOOLTIP, "diagonal", VIEWPORT);
        let top = compute_placement(centered_target(), TOOLTIP, TooltipSide::Top, VIEWPORT);
        assert_eq!(by_name, top);
    }

    #[test]
    fn placement_is_deterministic() {
        let a = compute_placement(centered_target(), TOOLTIP, TooltipSide::Right, VIEWPORT);
        let b = compute_placement(centered_target(), TOOLTIP, TooltipSide::Right, VIEWPORT);
        assert_eq!(a, b);
    }

    #[test]
    fn body_is_clamped_but_arrow_tracks_target() {
        // Target hugging the top-left corner: a top placement would go off-screen.
        let target = Rect::new(0.0, 5.0, 40.0, 20.0);
        let p = compute_placement(target, TOOLTIP, TooltipSide::Top, VIEWPORT);
        assert_eq!(p.left, 10.0);
        assert_eq!(p.top, 10.0);
        assert_eq!(p.arrow_left, 20.0 - 12.0);
        assert_eq!(p.arrow_top, 5.0 - 16.0);
    }

    #[test]
    fn clamp_holds_on_every_side_near_every_edge() {
        let targets = [
            Rect::new(-50.0, -50.0, 30.0, 30.0),
            Rect::new(1270.0, 790.0, 40.0, 40.0),
            Rect::new(1250.0, 0.0, 20.0, 20.0),
            Rect::new(0.0, 780.0, 20.0, 20.0),
        ];
        let sides = [
            TooltipSide::Top,
            TooltipSide::Bottom,
            TooltipSide::Left,
            TooltipSide::Right,
        ];
        for target in targets {
            for side in sides {
                let p = compute_placement(target, TOOLTIP, side, VIEWPORT);
                assert!(p.left >= 10.0 && p.left <= VIEWPORT.width - TOOLTIP.width - 10.0);
                assert!(p.top >= 10.0 && p.top <= VIEWPORT.height - TOOLTIP.height - 10.0);
            }
        }
    }

    #[test]
    fn oversized_tooltip_keeps_leading_margin() {
        let p = compute_placement(
            centered_target(),
            Size::new(2000.0, 100.0),
            TooltipSide::Bottom,
            VIEWPORT,
        );
        assert_eq!(p.left, 10.0);
    }
}
