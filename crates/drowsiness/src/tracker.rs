//! Consecutive closed-eye tracking

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::DrowsinessConfig;
use crate::openness;
use crate::region::Region;

/// What one face's eye regions say about this frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EyeEvidence {
    /// Fewer than two eyes found; treated as "not closed"
    Ambiguous,
    /// At least one eye above the openness threshold
    Open,
    /// Every eye at or below the openness threshold
    Closed,
}

/// Counts consecutive closed-eye frames and raises the drowsy signal once
/// the count reaches the configured threshold.
///
/// The counter only ever grows by one per closed frame or resets to zero.
#[derive(Debug, Clone)]
pub struct DrowsinessTracker {
    openness_threshold: f32,
    closed_frame_threshold: u32,
    consecutive_closed_frames: u32,
}

impl DrowsinessTracker {
    pub fn new(config: &DrowsinessConfig) -> Self {
        Self::with_thresholds(config.openness_threshold, config.closed_frame_threshold)
    }

    pub fn with_thresholds(openness_threshold: f32, closed_frame_threshold: u32) -> Self {
        Self {
            openness_threshold,
            closed_frame_threshold,
            consecutive_closed_frames: 0,
        }
    }

    /// Classify one face's eye regions
    pub fn classify(&self, eyes: &[Region]) -> EyeEvidence {
        if eyes.len() < 2 {
            return EyeEvidence::Ambiguous;
        }
        // One open eye is enough
        if eyes
            .iter()
            .any(|eye| openness::estimate(eye) > self.openness_threshold)
        {
            EyeEvidence::Open
        } else {
            EyeEvidence::Closed
        }
    }

    /// Incorporate one frame's eye regions for the tracked face and return
    /// the drowsy signal
    pub fn update(&mut self, eyes: &[Region]) -> bool {
        match self.classify(eyes) {
            EyeEvidence::Ambiguous | EyeEvidence::Open => self.consecutive_closed_frames = 0,
            EyeEvidence::Closed => {
                self.consecutive_closed_frames = self.consecutive_closed_frames.saturating_add(1);
                debug!(
                    "Eyes closed for {} consecutive frames",
                    self.consecutive_closed_frames
                );
            }
        }
        self.is_drowsy()
    }

    /// Drowsy signal for the current counter
    pub fn is_drowsy(&self) -> bool {
        self.consecutive_closed_frames >= self.closed_frame_threshold
    }

    pub fn consecutive_closed_frames(&self) -> u32 {
        self.consecutive_closed_frames
    }

    pub fn closed_frame_threshold(&self) -> u32 {
        self.closed_frame_threshold
    }

    /// Forget accumulated evidence
    pub fn reset(&mut self) {
        self.consecutive_closed_frames = 0;
    }
}

impl Default for DrowsinessTracker {
    fn default() -> Self {
        Self::new(&DrowsinessConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn open_eyes() -> Vec<Region> {
        vec![Region::new(10, 10, 20, 10), Region::new(40, 10, 20, 10)]
    }

    fn closed_eyes() -> Vec<Region> {
        vec![Region::new(10, 10, 20, 2), Region::new(40, 10, 20, 3)]
    }

    #[test]
    fn test_classify() {
        let tracker = DrowsinessTracker::default();

        assert_eq!(tracker.classify(&[]), EyeEvidence::Ambiguous);
        assert_eq!(tracker.classify(&open_eyes()[..1]), EyeEvidence::Ambiguous);
        assert_eq!(tracker.classify(&open_eyes()), EyeEvidence::Open);
        assert_eq!(tracker.classify(&closed_eyes()), EyeEvidence::Closed);

        // Exactly at threshold is not open
        let at_threshold = vec![Region::new(0, 0, 20, 5), Region::new(30, 0, 20, 5)];
        assert_eq!(tracker.classify(&at_threshold), EyeEvidence::Closed);

        // A single open eye clears closure
        let one_open = vec![Region::new(0, 0, 20, 2), Region::new(30, 0, 20, 12)];
        assert_eq!(tracker.classify(&one_open), EyeEvidence::Open);
    }

    #[test]
    fn test_open_eyes_never_drowsy() {
        let mut tracker = DrowsinessTracker::default();
        for _ in 0..200 {
            assert!(!tracker.update(&open_eyes()));
            assert_eq!(tracker.consecutive_closed_frames(), 0);
        }
    }

    #[test]
    fn test_one_short_of_threshold() {
        let mut tracker = DrowsinessTracker::default();
        for frame in 1..=29 {
            assert!(!tracker.update(&closed_eyes()));
            assert_eq!(tracker.consecutive_closed_frames(), frame);
        }
        assert!(!tracker.update(&open_eyes()));
        assert_eq!(tracker.consecutive_closed_frames(), 0);
    }

    #[test]
    fn test_drowsy_from_threshold_until_open() {
        let mut tracker = DrowsinessTracker::default();
        for frame in 1..=30 {
            let drowsy = tracker.update(&closed_eyes());
            assert_eq!(drowsy, frame == 30);
        }
        for _ in 0..10 {
            assert!(tracker.update(&closed_eyes()));
        }
        assert_eq!(tracker.consecutive_closed_frames(), 40);

        assert!(!tracker.update(&open_eyes()));
        assert_eq!(tracker.consecutive_closed_frames(), 0);
    }

    #[test]
    fn test_ambiguous_evidence_resets() {
        let mut tracker = DrowsinessTracker::default();
        for _ in 0..35 {
            tracker.update(&closed_eyes());
        }
        assert!(tracker.is_drowsy());

        assert!(!tracker.update(&closed_eyes()[..1]));
        assert_eq!(tracker.consecutive_closed_frames(), 0);
    }

    #[test]
    fn test_counter_saturates() {
        let mut tracker = DrowsinessTracker::with_thresholds(0.25, 1);
        tracker.consecutive_closed_frames = u32::MAX;
        assert!(tracker.update(&closed_eyes()));
        assert_eq!(tracker.consecutive_closed_frames(), u32::MAX);
    }

    proptest! {
        #[test]
        fn counter_steps_by_one_or_resets(frames in proptest::collection::vec(0u8..3, 1..200)) {
            let mut tracker = DrowsinessTracker::default();
            for kind in frames {
                let before = tracker.consecutive_closed_frames();
                let eyes = match kind {
                    0 => open_eyes(),
                    1 => closed_eyes(),
                    _ => Vec::new(),
                };
                let drowsy = tracker.update(&eyes);
                let after = tracker.consecutive_closed_frames();

                prop_assert!(after == 0 || after == before + 1);
                prop_assert_eq!(drowsy, after >= 30);
            }
        }
    }
}
