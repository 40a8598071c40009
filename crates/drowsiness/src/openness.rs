//! Eye openness from region geometry

use crate::region::Region;

/// Non-negative openness; larger means more open
pub type OpennessScore = f32;

/// Height-to-width ratio of an eye region, `0` for a zero-width region
pub fn estimate(eye: &Region) -> OpennessScore {
    if eye.width == 0 {
        return 0.0;
    }
    eye.height as f32 / eye.width as f32
}
