//! Camera Capture Library for Drowsiness Monitoring
//!
//! Provides the frame acquisition boundary used by the monitor:
//! - `VideoFrame`, an owned RGB frame with grayscale and mirror helpers
//! - `FrameSource`, anything that can be opened, read frame by frame and released
//! - `CaptureSession`, a scoped handle that releases its source on every exit path

pub mod frame;
pub mod source;
#[cfg(feature = "opencv")]
pub mod webcam;

pub use frame::VideoFrame;
pub use source::{CaptureSession, DeviceSource, FrameSource, ImageDirectorySource};
#[cfg(feature = "opencv")]
pub use webcam::OpenCvCamera;

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Camera error types
#[derive(Error, Debug)]
pub enum CameraError {
    #[error("Failed to open camera: {0}")]
    Open(String),

    #[error("Invalid format: {0}")]
    Format(String),

    #[error("Streaming error: {0}")]
    Stream(String),

    #[error("Camera not initialized")]
    NotInitialized,
}

/// Camera configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    /// Frame device: a camera index (`0`), a directory of still frames, or a
    /// video file or device path
    pub device: String,
    /// Nominal frame rate, used to stamp replayed frames
    pub fps: u32,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            device: "0".to_string(),
            fps: 15,
        }
    }
}

/// What `CameraConfig::device` refers to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeviceKind {
    /// Camera index, as opened by the platform capture backend
    CameraIndex(i32),
    /// Directory of still frames replayed in name order
    ImageDirectory(PathBuf),
    /// Video file or device node
    VideoPath(String),
}

impl CameraConfig {
    pub fn device_kind(&self) -> DeviceKind {
        let device = self.device.trim();
        if let Ok(index) = device.parse::<i32>() {
            return DeviceKind::CameraIndex(index);
        }
        if Path::new(device).is_dir() {
            return DeviceKind::ImageDirectory(PathBuf::from(device));
        }
        DeviceKind::VideoPath(device.to_string())
    }

    /// Nominal spacing between frames in nanoseconds
    pub fn frame_period_ns(&self) -> u64 {
        1_000_000_000 / u64::from(self.fps.max(1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_period() {
        let config = CameraConfig::default();
        assert_eq!(config.frame_period_ns(), 66_666_666);

        let zero = CameraConfig { fps: 0, ..Default::default() };
        assert_eq!(zero.frame_period_ns(), 1_000_000_000);
    }

    #[test]
    fn test_device_kind() {
        let device = |name: &str| CameraConfig {
            device: name.to_string(),
            ..Default::default()
        };

        assert_eq!(CameraConfig::default().device_kind(), DeviceKind::CameraIndex(0));
        assert_eq!(device(" 2 ").device_kind(), DeviceKind::CameraIndex(2));

        let dir = std::env::temp_dir();
        assert_eq!(
            device(dir.to_str().unwrap()).device_kind(),
            DeviceKind::ImageDirectory(dir.clone())
        );
        assert_eq!(
            device("/dev/video0").device_kind(),
            DeviceKind::VideoPath("/dev/video0".to_string())
        );
        assert_eq!(
            device("drive.mp4").device_kind(),
            DeviceKind::VideoPath("drive.mp4".to_string())
        );
    }
}
