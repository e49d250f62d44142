use serde::{Deserialize, Serialize};

use crate::SpatialError;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub x: f64,
    pub y: f64,
}

impl Coordinate {
    pub const ORIGIN: Self = Self { x: 0.0, y: 0.0 };

    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

impl From<[f64; 2]> for Coordinate {
    fn from(value: [f64; 2]) -> Self {
        Self::new(value[0], value[1])
    }
}

/// Axis-aligned box `[min x, min y, max x, max y]` in map units.
///
/// An extent with `min > max` on either axis is empty. Intersections of
/// disjoint extents produce [`Extent::EMPTY`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f64; 4]", into = "[f64; 4]")]
pub struct Extent {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl Extent {
    pub const EMPTY: Self = Self {
        min_x: f64::INFINITY,
        min_y: f64::INFINITY,
        max_x: f64::NEG_INFINITY,
        max_y: f64::NEG_INFINITY,
    };

    pub const fn new(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Self {
        Self {
            min_x,
            min_y,
            max_x,
            max_y,
        }
    }

    /// Builds an extent from a loosely typed slice, rejecting anything that
    /// is not four finite, ordered values.
    pub fn from_slice(values: &[f64]) -> Result<Self, SpatialError> {
        let [min_x, min_y, max_x, max_y] = values else {
            return Err(SpatialError::InvalidExtent {
                values: values.to_vec(),
            });
        };
        let extent = Self::new(*min_x, *min_y, *max_x, *max_y);
        if !extent.is_finite() || extent.min_x > extent.max_x || extent.min_y > extent.max_y {
            return Err(SpatialError::InvalidExtent {
                values: values.to_vec(),
            });
        }
        Ok(extent)
    }

    pub fn around(center: Coordinate, half_width: f64, half_height: f64) -> Self {
        Self::new(
            center.x - half_width,
            center.y - half_height,
            center.x + half_width,
            center.y + half_height,
        )
    }

    pub fn bounding(coordinates: impl IntoIterator<Item = Coordinate>) -> Self {
        coordinates
            .into_iter()
            .fold(Self::EMPTY, |extent, coordinate| extent.extend(coordinate))
    }

    pub fn to_array(self) -> [f64; 4] {
        [self.min_x, self.min_y, self.max_x, self.max_y]
    }

    pub fn is_finite(&self) -> bool {
        self.min_x.is_finite()
            && self.min_y.is_finite()
            && self.max_x.is_finite()
            && self.max_y.is_finite()
    }

    pub fn is_empty(&self) -> bool {
        self.min_x > self.max_x || self.min_y > self.max_y
    }

    pub fn width(&self) -> f64 {
        if self.is_empty() {
            0.0
        } else {
            self.max_x - self.min_x
        }
    }

    pub fn height(&self) -> f64 {
        if self.is_empty() {
            0.0
        } else {
            self.max_y - self.min_y
        }
    }

    pub fn center(&self) -> Coordinate {
        Coordinate::new(
            (self.min_x + self.max_x) / 2.0,
            (self.min_y + self.max_y) / 2.0,
        )
    }

    pub fn extend(self, coordinate: Coordinate) -> Self {
        Self::new(
            self.min_x.min(coordinate.x),
            self.min_y.min(coordinate.y),
            self.max_x.max(coordinate.x),
            self.max_y.max(coordinate.y),
        )
    }

    pub fn union(self, other: Self) -> Self {
        if self.is_empty() {
            return other;
        }
        if other.is_empty() {
            return self;
        }
        Self::new(
            self.min_x.min(other.min_x),
            self.min_y.min(other.min_y),
            self.max_x.max(other.max_x),
            self.max_y.max(other.max_y),
        )
    }

    pub fn intersects(&self, other: &Self) -> bool {
        self.min_x <= other.max_x
            && self.max_x >= other.min_x
            && self.min_y <= other.max_y
            && self.max_y >= other.min_y
    }

    pub fn intersection(&self, other: &Self) -> Self {
        if !self.intersects(other) {
            return Self::EMPTY;
        }
        Self::new(
            self.min_x.max(other.min_x),
            self.min_y.max(other.min_y),
            self.max_x.min(other.max_x),
            self.max_y.min(other.max_y),
        )
    }

    /// `true` when `other` lies fully inside `self` (borders included).
    pub fn contains_extent(&self, other: &Self) -> bool {
        self.min_x <= other.min_x
            && other.max_x <= self.max_x
            && self.min_y <= other.min_y
            && other.max_y <= self.max_y
    }

    pub fn contains_coordinate(&self, coordinate: Coordinate) -> bool {
        self.min_x <= coordinate.x
            && coordinate.x <= self.max_x
            && self.min_y <= coordinate.y
            && coordinate.y <= self.max_y
    }
}

impl From<[f64; 4]> for Extent {
    fn from(value: [f64; 4]) -> Self {
        Self::new(value[0], value[1], value[2], value[3])
    }
}

impl From<Extent> for [f64; 4] {
    fn from(value: Extent) -> Self {
        value.to_array()
    }
}
