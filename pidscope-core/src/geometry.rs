//! Axis-aligned bounding boxes and overlap measurement

use serde::{Deserialize, Serialize};

/// Box in source-frame pixel coordinates, corners `(x1, y1)` top-left and
/// `(x2, y2)` bottom-right.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x1: f32,
    pub y1: f32,
    pub x2: f32,
    pub y2: f32,
}

impl BoundingBox {
    pub const fn new(x1: f32, y1: f32, x2: f32, y2: f32) -> Self {
        Self { x1, y1, x2, y2 }
    }

    /// Build from a center point and size, as emitted by hosted detectors.
    pub fn from_center(cx: f32, cy: f32, width: f32, height: f32) -> Self {
        Self {
            x1: cx - width / 2.0,
            y1: cy - height / 2.0,
            x2: cx + width / 2.0,
            y2: cy + height / 2.0,
        }
    }

    pub fn from_array(coords: [f32; 4]) -> Self {
        Self::new(coords[0], coords[1], coords[2], coords[3])
    }

    pub fn to_array(&self) -> [f32; 4] {
        [self.x1, self.y1, self.x2, self.y2]
    }

    pub fn width(&self) -> f32 {
        self.x2 - self.x1
    }

    pub fn height(&self) -> f32 {
        self.y2 - self.y1
    }

    /// Area, zero for inverted or non-finite boxes.
    pub fn area(&self) -> f32 {
        if !self.is_finite() {
            return 0.0;
        }
        self.width().max(0.0) * self.height().max(0.0)
    }

    pub fn is_finite(&self) -> bool {
        self.x1.is_finite() && self.y1.is_finite() && self.x2.is_finite() && self.y2.is_finite()
    }

    /// Finite with strictly positive width and height.
    pub fn is_well_formed(&self) -> bool {
        self.is_finite() && self.x1 < self.x2 && self.y1 < self.y2
    }

    /// Inclusive point test, used for hit-testing clicks.
    pub fn contains(&self, x: f32, y: f32) -> bool {
        self.x1 <= x && x <= self.x2 && self.y1 <= y && y <= self.y2
    }

    pub fn iou(&self, other: &BoundingBox) -> f32 {
        iou(self, other)
    }
}

impl From<[f32; 4]> for BoundingBox {
    fn from(coords: [f32; 4]) -> Self {
        Self::from_array(coords)
    }
}

/// Intersection-over-Union of two boxes, in `[0, 1]`.
///
/// Disjoint boxes return `0.0` before any division. Degenerate or non-finite
/// input never panics: a zero union is treated as no overlap.
pub fn iou(a: &BoundingBox, b: &BoundingBox) -> f32 {
    if !a.is_finite() || !b.is_finite() {
        return 0.0;
    }

    let x_left = a.x1.max(b.x1);
    let y_top = a.y1.max(b.y1);
    let x_right = a.x2.min(b.x2);
    let y_bottom = a.y2.min(b.y2);

    if x_right < x_left || y_bottom < y_top {
        return 0.0;
    }

    let intersection = (x_right - x_left) * (y_bottom - y_top);
    let union = a.area() + b.area() - intersection;

    if union <= 0.0 || !union.is_finite() {
        return 0.0;
    }

    (intersection / union).clamp(0.0, 1.0)
}
