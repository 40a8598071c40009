//! Drowsiness Inference
//!
//! Per-frame drowsiness estimation from face and eye regions:
//! - Eye openness from region aspect ratio
//! - Consecutive closed-eye frame tracking
//! - Frame orchestration feeding the escalation controller
//! - Overlay annotation of detected regions

#[cfg(feature = "opencv")]
pub mod cascade;
pub mod config;
pub mod detector;
pub mod openness;
pub mod overlay;
pub mod processor;
pub mod region;
pub mod tracker;

#[cfg(feature = "opencv")]
pub use cascade::CascadeRegionDetector;
pub use config::{DetectorBackend, DrowsinessConfig, Preset};
pub use detector::{ConfiguredDetector, OnnxRegionDetector, RegionDetector};
pub use openness::{estimate, OpennessScore};
pub use processor::{FrameAnalysis, FrameProcessor};
pub use region::Region;
pub use tracker::{DrowsinessTracker, EyeEvidence};

use thiserror::Error;

/// Drowsiness pipeline error types
#[derive(Error, Debug)]
pub enum DrowsinessError {
    #[error("Model loading failed: {0}")]
    ModelLoad(String),

    #[error("Inference failed: {0}")]
    Inference(String),

    #[error("Configuration error: {0}")]
    Config(String),
}
