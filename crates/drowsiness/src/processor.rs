//! Per-frame orchestration

use alerting::{EscalationController, Scheduler, SignalOutcome};
use camera_capture::VideoFrame;
use image::imageops;
use tracing::debug;

use crate::config::DrowsinessConfig;
use crate::detector::RegionDetector;
use crate::overlay;
use crate::region::Region;
use crate::tracker::{DrowsinessTracker, EyeEvidence};
use crate::DrowsinessError;

/// Result of processing one frame
#[derive(Debug, Clone)]
pub struct FrameAnalysis {
    /// Frame with face and eye overlays
    pub annotated: VideoFrame,
    /// Drowsy signal for this frame
    pub is_drowsy: bool,
    /// Faces found, frame coordinates
    pub faces: Vec<Region>,
    /// Eyes found in every face, frame coordinates
    pub eyes: Vec<Region>,
    /// Evidence from the tracked face; `None` when no face was visible
    pub evidence: Option<EyeEvidence>,
    /// What the escalation controller did with the signal
    pub escalation: SignalOutcome,
}

impl FrameAnalysis {
    pub fn face_detected(&self) -> bool {
        !self.faces.is_empty()
    }
}

/// Runs detection, tracking and escalation for one frame at a time
pub struct FrameProcessor<D: RegionDetector> {
    detector: D,
    tracker: DrowsinessTracker,
    frames_processed: u64,
}

impl<D: RegionDetector> FrameProcessor<D> {
    pub fn new(detector: D, config: &DrowsinessConfig) -> Self {
        Self {
            detector,
            tracker: DrowsinessTracker::new(config),
            frames_processed: 0,
        }
    }

    /// Process one frame and forward the drowsy signal to `escalation`.
    ///
    /// The largest face feeds the tracker; other faces are only annotated.
    /// With no face in view the tracker is left untouched and the frame
    /// reports awake.
    pub fn process<S: Scheduler>(
        &mut self,
        frame: &VideoFrame,
        escalation: &mut EscalationController<S>,
    ) -> Result<FrameAnalysis, DrowsinessError> {
        self.frames_processed += 1;

        let gray = frame.to_grayscale();
        let (width, height) = gray.dimensions();
        let faces: Vec<Region> = self
            .detector
            .detect_faces(&gray)?
            .iter()
            .map(|face| face.clamp_to(width, height))
            .collect();

        let tracked = primary_face(&faces);
        let mut eyes = Vec::new();
        let mut evidence = None;
        let mut is_drowsy = false;

        for (index, face) in faces.iter().enumerate() {
            let roi = imageops::crop_imm(&gray, face.x, face.y, face.width, face.height).to_image();
            let face_eyes = self.detector.detect_eyes(&roi)?;

            if Some(index) == tracked {
                evidence = Some(self.tracker.classify(&face_eyes));
                is_drowsy = self.tracker.update(&face_eyes);
            }
            eyes.extend(face_eyes.iter().map(|eye| face.offset_into(eye)));
        }

        debug!(
            "Frame {}: {} faces, {} eyes, evidence={:?}, closed_frames={}, drowsy={}",
            frame.sequence,
            faces.len(),
            eyes.len(),
            evidence,
            self.tracker.consecutive_closed_frames(),
            is_drowsy
        );

        let outcome = escalation.on_drowsy_signal(is_drowsy);
        let annotated = overlay::annotate(frame, &faces, &eyes);

        Ok(FrameAnalysis {
            annotated,
            is_drowsy,
            faces,
            eyes,
            evidence,
            escalation: outcome,
        })
    }

    pub fn detector(&self) -> &D {
        &self.detector
    }

    pub fn tracker(&self) -> &DrowsinessTracker {
        &self.tracker
    }

    pub fn frames_processed(&self) -> u64 {
        self.frames_processed
    }
}

/// Index of the largest face, earliest on ties
fn primary_face(faces: &[Region]) -> Option<usize> {
    faces
        .iter()
        .enumerate()
        .max_by_key(|(index, face)| (face.area(), std::cmp::Reverse(*index)))
        .map(|(index, _)| index)
}
