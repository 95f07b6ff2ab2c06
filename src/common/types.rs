//! Common types used throughout wheelly_brain

use nalgebra::Vector2;
use serde::{Deserialize, Serialize};

/// 2D point representation
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point2D {
    pub x: f64,
    pub y: f64,
}

impl Point2D {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn origin() -> Self {
        Self { x: 0.0, y: 0.0 }
    }

    pub fn distance(&self, other: &Point2D) -> f64 {
        self.distance_sq(other).sqrt()
    }

    pub fn distance_sq(&self, other: &Point2D) -> f64 {
        (self.x - other.x).powi(2) + (self.y - other.y).powi(2)
    }

    /// Bearing of `other` seen from `self` in degrees.
    ///
    /// 0° points along +x, angles grow counter-clockwise, result in (-180, 180].
    pub fn bearing_deg(&self, other: &Point2D) -> f64 {
        normalize_deg((other.y - self.y).atan2(other.x - self.x).to_degrees())
    }

    /// Point at `distance` meters from `self` along `direction_deg`
    pub fn project(&self, direction_deg: f64, distance: f64) -> Point2D {
        let rad = direction_deg.to_radians();
        let offset = Vector2::new(rad.cos(), rad.sin()) * distance;
        Point2D::from(self.to_vector() + offset)
    }

    pub fn to_vector(&self) -> Vector2<f64> {
        Vector2::new(self.x, self.y)
    }
}

impl From<(f64, f64)> for Point2D {
    fn from(tuple: (f64, f64)) -> Self {
        Self { x: tuple.0, y: tuple.1 }
    }
}

impl From<Vector2<f64>> for Point2D {
    fn from(v: Vector2<f64>) -> Self {
        Self { x: v[0], y: v[1] }
    }
}

/// Integer coordinates of a grid cell
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct GridCell {
    pub x: i32,
    pub y: i32,
}

impl GridCell {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Squared distance in cell units
    pub fn distance_sq(&self, other: &GridCell) -> f64 {
        let dx = (self.x - other.x) as f64;
        let dy = (self.y - other.y) as f64;
        dx * dx + dy * dy
    }

    pub fn offset(&self, dx: i32, dy: i32) -> GridCell {
        GridCell::new(self.x + dx, self.y + dy)
    }

    /// The 8 cells surrounding this one
    pub fn neighbours(&self) -> impl Iterator<Item = GridCell> {
        let center = *self;
        itertools::iproduct!(-1..=1, -1..=1)
            .filter(|&(dx, dy)| (dx, dy) != (0, 0))
            .map(move |(dx, dy)| center.offset(dx, dy))
    }
}

/// Path represented as a sequence of 2D points
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Path2D {
    pub points: Vec<Point2D>,
}

impl Path2D {
    pub fn new() -> Self {
        Self { points: Vec::new() }
    }

    pub fn from_points(points: Vec<Point2D>) -> Self {
        Self { points }
    }

    pub fn push(&mut self, point: Point2D) {
        self.points.push(point);
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn first(&self) -> Option<&Point2D> {
        self.points.first()
    }

    pub fn last(&self) -> Option<&Point2D> {
        self.points.last()
    }

    pub fn total_length(&self) -> f64 {
        if self.points.len() < 2 {
            return 0.0;
        }
        self.points.windows(2)
            .map(|w| w[0].distance(&w[1]))
            .sum()
    }
}

/// Normalize an angle in degrees to (-180, 180]
pub fn normalize_deg(angle: f64) -> f64 {
    let mut a = angle % 360.0;
    if a <= -180.0 {
        a += 360.0;
    } else if a > 180.0 {
        a -= 360.0;
    }
    a
}

/// Integer variant of [`normalize_deg`]
pub fn normalize_deg_i32(angle: i32) -> i32 {
    let mut a = angle % 360;
    if a <= -180 {
        a += 360;
    } else if a > 180 {
        a -= 360;
    }
    a
}
