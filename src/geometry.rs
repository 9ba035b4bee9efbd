//! Plain 2D geometry over image-space rectangles.

use egui::{pos2, Pos2};
use serde::{Deserialize, Serialize};

/// A rectangle stored in the order its corners were drawn.
///
/// `x1` may exceed `x2` (and `y1` may exceed `y2`) when the user dragged
/// up or to the left. Every query here normalizes before comparing.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "[f32; 4]", into = "[f32; 4]")]
pub struct Rect {
    pub x1: f32,
    pub y1: f32,
    pub x2: f32,
    pub y2: f32,
}

impl TryFrom<[f32; 4]> for Rect {
    type Error = String;

    /// Coordinates out of `f32` range parse as infinity; those are refused.
    fn try_from(coords: [f32; 4]) -> Result<Self, Self::Error> {
        if coords.iter().any(|c| !c.is_finite()) {
            return Err(format!("rectangle coordinates must be finite, got {coords:?}"));
        }
        let [x1, y1, x2, y2] = coords;
        Ok(Self { x1, y1, x2, y2 })
    }
}

impl From<Rect> for [f32; 4] {
    fn from(r: Rect) -> Self {
        [r.x1, r.y1, r.x2, r.y2]
    }
}

impl Rect {
    pub fn new(x1: f32, y1: f32, x2: f32, y2: f32) -> Self {
        Self { x1, y1, x2, y2 }
    }

    pub fn from_corners(a: Pos2, b: Pos2) -> Self {
        Self::new(a.x, a.y, b.x, b.y)
    }

    /// Same rectangle with `x1 <= x2` and `y1 <= y2`.
    pub fn normalized(&self) -> Self {
        Self {
            x1: self.x1.min(self.x2),
            y1: self.y1.min(self.y2),
            x2: self.x1.max(self.x2),
            y2: self.y1.max(self.y2),
        }
    }

    pub fn width(&self) -> f32 {
        (self.x2 - self.x1).abs()
    }

    pub fn height(&self) -> f32 {
        (self.y2 - self.y1).abs()
    }

    pub fn area(&self) -> f32 {
        self.width() * self.height()
    }

    /// Inclusive point containment.
    pub fn contains_point(&self, p: Pos2) -> bool {
        let r = self.normalized();
        r.x1 <= p.x && p.x <= r.x2 && r.y1 <= p.y && p.y <= r.y2
    }

    /// True when `other` lies entirely inside `self`, edges included.
    pub fn contains_rect(&self, other: &Rect) -> bool {
        let p = self.normalized();
        let c = other.normalized();
        p.x1 <= c.x1 && c.x1 <= p.x2 && p.y1 <= c.y1 && c.y1 <= p.y2
            && p.x1 <= c.x2 && c.x2 <= p.x2 && p.y1 <= c.y2 && c.y2 <= p.y2
    }

    /// Interiors intersect. Rectangles that only share an edge do not overlap.
    pub fn overlaps(&self, other: &Rect) -> bool {
        let a = self.normalized();
        let b = other.normalized();
        a.x1 < b.x2 && b.x1 < a.x2 && a.y1 < b.y2 && b.y1 < a.y2
    }

    /// Integer midpoint, rounded toward negative infinity.
    pub fn center(&self) -> Pos2 {
        pos2(
            ((self.x1 + self.x2) / 2.0).floor(),
            ((self.y1 + self.y2) / 2.0).floor(),
        )
    }

    pub fn translated(&self, dx: f32, dy: f32) -> Self {
        Self::new(self.x1 + dx, self.y1 + dy, self.x2 + dx, self.y2 + dy)
    }

    /// The corner the draw gesture ended on.
    pub fn end_corner(&self) -> Pos2 {
        pos2(self.x2, self.y2)
    }
}

/// Distance from `p` to the segment `a..b` (not the infinite line).
pub fn point_to_segment_dist(p: Pos2, a: Pos2, b: Pos2) -> f32 {
    let ab = b - a;
    let ap = p - a;
    let len_sq = ab.dot(ab);
    if len_sq == 0.0 {
        return ap.length();
    }
    let t = (ap.dot(ab) / len_sq).clamp(0.0, 1.0);
    let closest = a + ab * t;
    (p - closest).length()
}
