//! Collider geometry: axis-aligned rectangles and circles
//!
//! Overlap tests are inclusive, so shapes that merely touch count as
//! overlapping. All tests avoid square roots.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::{Result, SimError};

/// Axis-aligned rectangle given by its top-left corner and size
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RectF {
    pub pos: Vec2,
    pub size: Vec2,
}

impl RectF {
    pub fn new(x: f32, y: f32, w: f32, h: f32) -> Self {
        Self {
            pos: Vec2::new(x, y),
            size: Vec2::new(w, h),
        }
    }

    /// Rectangle of the given size centered on `center`
    pub fn centered(center: Vec2, size: Vec2) -> Self {
        Self {
            pos: center - size / 2.0,
            size,
        }
    }

    #[inline]
    pub fn min(&self) -> Vec2 {
        self.pos
    }

    #[inline]
    pub fn max(&self) -> Vec2 {
        self.pos + self.size
    }

    pub fn center(&self) -> Vec2 {
        self.pos + self.size / 2.0
    }

    /// Closest point inside the rectangle to `p`
    #[inline]
    pub fn clamp_point(&self, p: Vec2) -> Vec2 {
        p.clamp(self.min(), self.max())
    }
}

/// Circle given by center and radius
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Circle {
    pub center: Vec2,
    pub radius: f32,
}

impl Circle {
    pub fn new(x: f32, y: f32, radius: f32) -> Self {
        Self {
            center: Vec2::new(x, y),
            radius,
        }
    }
}

/// Axis-aligned bounding box used by the broad phase
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    pub min: Vec2,
    pub max: Vec2,
}

impl Aabb {
    pub fn intersects(&self, other: &Aabb) -> bool {
        self.min.x <= other.max.x
            && other.min.x <= self.max.x
            && self.min.y <= other.max.y
            && other.min.y <= self.max.y
    }
}

/// A collider shape
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Shape {
    Rect(RectF),
    Circle(Circle),
}

impl Shape {
    /// Reject non-finite coordinates and non-positive dimensions
    pub fn validate(&self) -> Result<()> {
        let ok = match self {
            Shape::Rect(r) => {
                r.pos.is_finite() && r.size.is_finite() && r.size.x > 0.0 && r.size.y > 0.0
            }
            Shape::Circle(c) => c.center.is_finite() && c.radius.is_finite() && c.radius > 0.0,
        };
        if ok {
            Ok(())
        } else {
            Err(SimError::InvalidArgument(format!(
                "shape needs finite coordinates and positive dimensions: {self:?}"
            )))
        }
    }

    pub fn center(&self) -> Vec2 {
        match self {
            Shape::Rect(r) => r.center(),
            Shape::Circle(c) => c.center,
        }
    }

    /// Same shape moved so its center sits at `center`
    pub fn with_center(&self, center: Vec2) -> Self {
        match *self {
            Shape::Rect(r) => Shape::Rect(RectF::centered(center, r.size)),
            Shape::Circle(c) => Shape::Circle(Circle {
                center,
                radius: c.radius,
            }),
        }
    }

    pub fn aabb(&self) -> Aabb {
        match self {
            Shape::Rect(r) => Aabb {
                min: r.min(),
                max: r.max(),
            },
            Shape::Circle(c) => Aabb {
                min: c.center - Vec2::splat(c.radius),
                max: c.center + Vec2::splat(c.radius),
            },
        }
    }

    /// Narrow-phase overlap test
    pub fn overlaps(&self, other: &Shape) -> bool {
        match (self, other) {
            (Shape::Rect(a), Shape::Rect(b)) => rect_rect(a, b),
            (Shape::Circle(a), Shape::Circle(b)) => circle_circle(a, b),
            (Shape::Rect(r), Shape::Circle(c)) | (Shape::Circle(c), Shape::Rect(r)) => {
                rect_circle(r, c)
            }
        }
    }
}

impl From<RectF> for Shape {
    fn from(r: RectF) -> Self {
        Shape::Rect(r)
    }
}

impl From<Circle> for Shape {
    fn from(c: Circle) -> Self {
        Shape::Circle(c)
    }
}

/// Interval overlap on both axes
#[inline]
pub fn rect_rect(a: &RectF, b: &RectF) -> bool {
    a.min().x <= b.max().x && b.min().x <= a.max().x && a.min().y <= b.max().y && b.min().y <= a.max().y
}

/// Squared center distance against squared radius sum
#[inline]
pub fn circle_circle(a: &Circle, b: &Circle) -> bool {
    let reach = a.radius + b.radius;
    a.center.distance_squared(b.center) <= reach * reach
}

/// Distance from the circle center to the closest point of the rectangle
#[inline]
pub fn rect_circle(r: &RectF, c: &Circle) -> bool {
    let closest = r.clamp_point(c.center);
    closest.distance_squared(c.center) <= c.radius * c.radius
}
