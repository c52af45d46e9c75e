use serde::{Deserialize, Serialize};

use crate::error::{ModelError, ModelResult};

/// Axis-aligned box in pixel coordinates, stored as corners.
///
/// Serialized as `[x1, y1, x2, y2]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(into = "[f32; 4]", try_from = "[f32; 4]")]
pub struct BoundingBox {
    x1: f32,
    y1: f32,
    x2: f32,
    y2: f32,
}

impl BoundingBox {
    /// Create a bounding box, validating that corners are finite and ordered
    /// (`x2 >= x1`, `y2 >= y1`).
    pub fn new(x1: f32, y1: f32, x2: f32, y2: f32) -> ModelResult<Self> {
        let finite = x1.is_finite() && y1.is_finite() && x2.is_finite() && y2.is_finite();
        if !finite || x2 < x1 || y2 < y1 {
            return Err(ModelError::InvalidBoundingBox { x1, y1, x2, y2 });
        }
        Ok(Self { x1, y1, x2, y2 })
    }

    pub fn x1(&self) -> f32 {
        self.x1
    }

    pub fn y1(&self) -> f32 {
        self.y1
    }

    pub fn x2(&self) -> f32 {
        self.x2
    }

    pub fn y2(&self) -> f32 {
        self.y2
    }

    pub fn width(&self) -> f32 {
        self.x2 - self.x1
    }

    pub fn height(&self) -> f32 {
        self.y2 - self.y1
    }

    pub fn area(&self) -> f32 {
        self.width() * self.height()
    }

    /// Corners as `[x1, y1, x2, y2]`.
    pub fn to_array(&self) -> [f32; 4] {
        [self.x1, self.y1, self.x2, self.y2]
    }

    /// Map the box from a resized image back to the original one by dividing
    /// every coordinate by `scale`.
    ///
    /// A non-positive or non-finite scale leaves the box unchanged.
    pub fn unscale(&self, scale: f32) -> Self {
        if !(scale.is_finite() && scale > 0.0) {
            return *self;
        }
        Self {
            x1: self.x1 / scale,
            y1: self.y1 / scale,
            x2: self.x2 / scale,
            y2: self.y2 / scale,
        }
    }

    /// Map the box from original image coordinates into an image resized by `scale`.
    pub fn rescale(&self, scale: f32) -> Self {
        if !(scale.is_finite() && scale > 0.0) {
            return *self;
        }
        Self {
            x1: self.x1 * scale,
            y1: self.y1 * scale,
            x2: self.x2 * scale,
            y2: self.y2 * scale,
        }
    }
}

impl From<BoundingBox> for [f32; 4] {
    fn from(bbox: BoundingBox) -> Self {
        bbox.to_array()
    }
}

impl TryFrom<[f32; 4]> for BoundingBox {
    type Error = ModelError;

    fn try_from(value: [f32; 4]) -> Result<Self, Self::Error> {
        Self::new(value[0], value[1], value[2], value[3])
    }
}
