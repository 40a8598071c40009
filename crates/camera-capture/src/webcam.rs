//! Webcam and video file capture through OpenCV

use std::fmt;

use opencv::core::Mat;
use opencv::prelude::*;
use opencv::{imgproc, videoio};
use tracing::{debug, info, warn};

use crate::{CameraConfig, CameraError, DeviceKind, FrameSource, VideoFrame};

/// Empty reads tolerated from a live camera before the stream counts as lost
const MAX_EMPTY_READS: u32 = 5;

enum Target {
    Index(i32),
    Path(String),
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Target::Index(index) => write!(f, "camera {}", index),
            Target::Path(path) => write!(f, "{}", path),
        }
    }
}

/// Frames from an OpenCV `VideoCapture`.
///
/// A live camera yields frames until it fails; a video file ends with
/// `Ok(None)`.
pub struct OpenCvCamera {
    target: Target,
    capture: Option<videoio::VideoCapture>,
    frame_period_ns: u64,
    sequence: u32,
}

impl OpenCvCamera {
    pub fn new(kind: DeviceKind, config: &CameraConfig) -> Self {
        let target = match kind {
            DeviceKind::CameraIndex(index) => Target::Index(index),
            DeviceKind::ImageDirectory(path) => Target::Path(path.to_string_lossy().into_owned()),
            DeviceKind::VideoPath(path) => Target::Path(path),
        };
        Self {
            target,
            capture: None,
            frame_period_ns: config.frame_period_ns(),
            sequence: 0,
        }
    }

    fn is_live(&self) -> bool {
        matches!(self.target, Target::Index(_))
    }

    fn to_frame(&self, bgr: &Mat) -> Result<VideoFrame, CameraError> {
        let mut rgb = Mat::default();
        imgproc::cvt_color(bgr, &mut rgb, imgproc::COLOR_BGR2RGB, 0)
            .map_err(|e| CameraError::Format(e.to_string()))?;
        let data = rgb
            .data_bytes()
            .map_err(|e| CameraError::Format(e.to_string()))?
            .to_vec();

        Ok(VideoFrame::new(
            data,
            rgb.cols() as u32,
            rgb.rows() as u32,
            u64::from(self.sequence) * self.frame_period_ns,
            self.sequence,
        ))
    }
}

impl FrameSource for OpenCvCamera {
    fn open(&mut self) -> Result<(), CameraError> {
        let opened = match &self.target {
            Target::Index(index) => videoio::VideoCapture::new(*index, videoio::CAP_ANY),
            Target::Path(path) => videoio::VideoCapture::from_file(path, videoio::CAP_ANY),
        };
        let mut capture =
            opened.map_err(|e| CameraError::Open(format!("{}: {}", self.target, e)))?;

        let is_opened = capture
            .is_opened()
            .map_err(|e| CameraError::Open(format!("{}: {}", self.target, e)))?;
        if !is_opened {
            return Err(CameraError::Open(format!("{}: could not access device", self.target)));
        }

        if self.is_live() {
            // Keep latency low: only the newest frame matters
            if let Err(e) = capture.set(videoio::CAP_PROP_BUFFERSIZE, 1.0) {
                debug!("Capture buffer size not adjustable: {}", e);
            }
        }

        info!("Opened {}", self.target);
        self.capture = Some(capture);
        self.sequence = 0;
        Ok(())
    }

    fn read_frame(&mut self) -> Result<Option<VideoFrame>, CameraError> {
        let live = self.is_live();
        let capture = self.capture.as_mut().ok_or(CameraError::NotInitialized)?;

        let mut bgr = Mat::default();
        let mut empty_reads = 0;
        loop {
            let grabbed = capture
                .read(&mut bgr)
                .map_err(|e| CameraError::Stream(e.to_string()))?;
            if grabbed && !bgr.empty() {
                break;
            }
            if !live {
                return Ok(None);
            }
            empty_reads += 1;
            if empty_reads >= MAX_EMPTY_READS {
                return Err(CameraError::Stream(format!(
                    "{}: no frame after {} reads",
                    self.target, empty_reads
                )));
            }
            warn!("{} returned no frame, retrying", self.target);
        }

        let frame = self.to_frame(&bgr)?;
        self.sequence = self.sequence.wrapping_add(1);
        Ok(Some(frame))
    }

    fn release(&mut self) {
        if let Some(mut capture) = self.capture.take() {
            if let Err(e) = capture.release() {
                warn!("Failed to release {}: {}", self.target, e);
            }
            info!("Released {}", self.target);
        }
    }

    fn is_open(&self) -> bool {
        self.capture.is_some()
    }
}
