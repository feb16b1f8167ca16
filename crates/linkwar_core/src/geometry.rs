//! Planar geometry tests used for placement validity and line-of-sight.
//!
//! All tests operate on [`Fixed`] coordinates. Boundary conventions:
//! - circle overlap and point-in-circle are strict (touching does not count)
//! - segment intersection is inclusive at the endpoints, parallel segments
//!   never intersect
//! - rectangle overlap is strict on every side

use serde::{Deserialize, Serialize};

use crate::math::{fixed_serde, Fixed, Vec2Fixed};

/// Axis-aligned rectangle given by its top-left corner and size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rect {
    /// Top-left corner.
    pub origin: Vec2Fixed,
    /// Width.
    #[serde(with = "fixed_serde")]
    pub width: Fixed,
    /// Height.
    #[serde(with = "fixed_serde")]
    pub height: Fixed,
}

impl Rect {
    /// Create a rectangle from its top-left corner and size.
    #[must_use]
    pub const fn new(origin: Vec2Fixed, width: Fixed, height: Fixed) -> Self {
        Self {
            origin,
            width,
            height,
        }
    }

    /// Create a square.
    #[must_use]
    pub const fn square(origin: Vec2Fixed, size: Fixed) -> Self {
        Self::new(origin, size, size)
    }

    /// Right edge x coordinate.
    #[must_use]
    pub fn right(&self) -> Fixed {
        self.origin.x + self.width
    }

    /// Bottom edge y coordinate.
    #[must_use]
    pub fn bottom(&self) -> Fixed {
        self.origin.y + self.height
    }

    /// Center point.
    #[must_use]
    pub fn center(&self) -> Vec2Fixed {
        Vec2Fixed::new(
            self.origin.x + self.width / 2,
            self.origin.y + self.height / 2,
        )
    }

    /// The four edges in clockwise order starting at the top edge.
    #[must_use]
    pub fn edges(&self) -> [(Vec2Fixed, Vec2Fixed); 4] {
        let top_left = self.origin;
        let top_right = Vec2Fixed::new(self.right(), self.origin.y);
        let bottom_right = Vec2Fixed::new(self.right(), self.bottom());
        let bottom_left = Vec2Fixed::new(self.origin.x, self.bottom());
        [
            (top_left, top_right),
            (top_right, bottom_right),
            (bottom_right, bottom_left),
            (bottom_left, top_left),
        ]
    }
}

/// Distance between two points.
#[must_use]
pub fn distance(a: Vec2Fixed, b: Vec2Fixed) -> Fixed {
    a.distance(b)
}

/// Whether `point` lies strictly inside the circle.
#[must_use]
pub fn point_in_circle(point: Vec2Fixed, center: Vec2Fixed, radius: Fixed) -> bool {
    point.distance_squared(center) < radius * radius
}

/// Whether segment `p1 -> p2` intersects segment `p3 -> p4`.
///
/// Parallel and collinear segments are reported as non-intersecting.
#[must_use]
pub fn segments_intersect(p1: Vec2Fixed, p2: Vec2Fixed, p3: Vec2Fixed, p4: Vec2Fixed) -> bool {
    let denom = (p4.y - p3.y) * (p2.x - p1.x) - (p4.x - p3.x) * (p2.y - p1.y);
    if denom == Fixed::ZERO {
        return false;
    }

    let num_a = (p4.x - p3.x) * (p1.y - p3.y) - (p4.y - p3.y) * (p1.x - p3.x);
    let num_b = (p2.x - p1.x) * (p1.y - p3.y) - (p2.y - p1.y) * (p1.x - p3.x);

    let ua = num_a / denom;
    let ub = num_b / denom;

    let unit = Fixed::ZERO..=Fixed::ONE;
    unit.contains(&ua) && unit.contains(&ub)
}

/// Whether segment `a -> b` crosses any edge of `rect`.
#[must_use]
pub fn segment_intersects_rect(a: Vec2Fixed, b: Vec2Fixed, rect: &Rect) -> bool {
    rect.edges()
        .iter()
        .any(|&(e1, e2)| segments_intersect(a, b, e1, e2))
}

/// Whether a circle overlaps a rectangle.
#[must_use]
pub fn circle_intersects_rect(center: Vec2Fixed, radius: Fixed, rect: &Rect) -> bool {
    let closest = Vec2Fixed::new(
        center.x.clamp(rect.origin.x, rect.right()),
        center.y.clamp(rect.origin.y, rect.bottom()),
    );
    center.distance_squared(closest) < radius * radius
}

/// Axis-aligned overlap test between two rectangles.
#[must_use]
pub fn rects_overlap(a: &Rect, b: &Rect) -> bool {
    a.origin.x < b.right()
        && a.right() > b.origin.x
        && a.origin.y < b.bottom()
        && a.bottom() > b.origin.y
}

/// Squared distance from `point` to the segment `a -> b`.
#[must_use]
pub fn point_segment_distance_squared(point: Vec2Fixed, a: Vec2Fixed, b: Vec2Fixed) -> Fixed {
    let ab = b - a;
    let len_sq = ab.dot(ab);
    if len_sq == Fixed::ZERO {
        return point.distance_squared(a);
    }

    let t = ((point - a).dot(ab) / len_sq).clamp(Fixed::ZERO, Fixed::ONE);
    point.distance_squared(a.lerp(b, t))
}
