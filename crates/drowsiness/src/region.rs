//! Detected regions

use serde::{Deserialize, Serialize};

/// Axis-aligned rectangle in pixel coordinates.
///
/// Regions live for one frame only; there is no identity across frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Region {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Region {
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn area(&self) -> u64 {
        u64::from(self.width) * u64::from(self.height)
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Translate a region found inside `self` into the coordinates `self` lives in
    pub fn offset_into(&self, inner: &Region) -> Region {
        Region {
            x: self.x.saturating_add(inner.x),
            y: self.y.saturating_add(inner.y),
            ..*inner
        }
    }

    /// Clip to a `width` x `height` image
    pub fn clamp_to(&self, width: u32, height: u32) -> Region {
        let x = self.x.min(width);
        let y = self.y.min(height);
        Region {
            x,
            y,
            width: self.width.min(width - x),
            height: self.height.min(height - y),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_offset_into_face() {
        let face = Region::new(100, 50, 80, 80);
        let eye = Region::new(10, 20, 15, 6);
        assert_eq!(face.offset_into(&eye), Region::new(110, 70, 15, 6));
    }

    #[test]
    fn test_clamp_to_image() {
        let region = Region::new(600, 400, 100, 100);
        assert_eq!(region.clamp_to(640, 480), Region::new(600, 400, 40, 80));

        let outside = Region::new(700, 500, 10, 10);
        assert!(outside.clamp_to(640, 480).is_empty());
    }

    #[test]
    fn test_area() {
        assert_eq!(Region::new(0, 0, 4, 3).area(), 12);
        assert!(Region::new(0, 0, 0, 3).is_empty());
    }
}
