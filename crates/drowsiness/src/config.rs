//! Drowsiness configuration

use serde::{Deserialize, Serialize};

use crate::DrowsinessError;

/// Named threshold sets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Preset {
    #[default]
    Standard,
    Strict,
    Lenient,
}

impl Preset {
    /// Configuration this preset starts from
    pub fn config(self) -> DrowsinessConfig {
        match self {
            Preset::Standard => DrowsinessConfig::default(),
            Preset::Strict => DrowsinessConfig::strict(),
            Preset::Lenient => DrowsinessConfig::lenient(),
        }
    }
}

/// Which detector finds faces and eyes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DetectorBackend {
    /// OpenCV Haar cascades
    #[default]
    Cascade,
    /// ONNX Runtime box models
    Onnx,
}

/// Drowsiness configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DrowsinessConfig {
    /// Threshold set the other values were started from
    pub preset: Preset,

    /// An eye whose openness exceeds this counts as open
    pub openness_threshold: f32,

    /// Consecutive closed-eye frames before the drowsy signal is raised
    /// (30 frames is roughly 2 seconds at 15 processed frames per second)
    pub closed_frame_threshold: u32,

    /// Detector backend
    pub detector: DetectorBackend,

    /// Haar cascade files, used by the cascade backend
    pub face_cascade_path: String,
    pub eye_cascade_path: String,

    /// Face detection confidence threshold (ONNX backend)
    pub face_confidence: f32,

    /// Eye detection confidence threshold (ONNX backend)
    pub eye_confidence: f32,

    /// Square input size of the detection models (pixels)
    pub model_input_size: u32,

    /// Model paths, required by the ONNX backend
    pub face_model_path: Option<String>,
    pub eye_model_path: Option<String>,
}

impl Default for DrowsinessConfig {
    fn default() -> Self {
        Self {
            preset: Preset::Standard,
            openness_threshold: 0.25,
            closed_frame_threshold: 30,
            detector: DetectorBackend::Cascade,
            face_cascade_path: "/usr/share/opencv4/haarcascades/haarcascade_frontalface_default.xml"
                .to_string(),
            eye_cascade_path: "/usr/share/opencv4/haarcascades/haarcascade_eye.xml".to_string(),
            face_confidence: 0.7,
            eye_confidence: 0.6,
            model_input_size: 128,
            face_model_path: None,
            eye_model_path: None,
        }
    }
}

impl DrowsinessConfig {
    /// Create strict config (flags drowsiness sooner)
    pub fn strict() -> Self {
        Self {
            preset: Preset::Strict,
            openness_threshold: 0.3,
            closed_frame_threshold: 15,
            ..Default::default()
        }
    }

    /// Create lenient config (tolerates longer closures)
    pub fn lenient() -> Self {
        Self {
            preset: Preset::Lenient,
            openness_threshold: 0.2,
            closed_frame_threshold: 45,
            ..Default::default()
        }
    }

    /// Reject values the tracker cannot work with
    pub fn validate(&self) -> Result<(), DrowsinessError> {
        if !self.openness_threshold.is_finite() || self.openness_threshold < 0.0 {
            return Err(DrowsinessError::Config(format!(
                "openness_threshold must be a non-negative number, got {}",
                self.openness_threshold
            )));
        }
        if self.closed_frame_threshold == 0 {
            return Err(DrowsinessError::Config(
                "closed_frame_threshold must be at least 1".into(),
            ));
        }
        for (name, value) in [
            ("face_confidence", self.face_confidence),
            ("eye_confidence", self.eye_confidence),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(DrowsinessError::Config(format!(
                    "{} must be within [0, 1], got {}",
                    name, value
                )));
            }
        }
        if self.model_input_size == 0 {
            return Err(DrowsinessError::Config("model_input_size must be non-zero".into()));
        }
        if self.detector == DetectorBackend::Onnx
            && (self.face_model_path.is_none() || self.eye_model_path.is_none())
        {
            return Err(DrowsinessError::Config(
                "the onnx detector needs face_model_path and eye_model_path".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = DrowsinessConfig::default();
        assert_eq!(config.openness_threshold, 0.25);
        assert_eq!(config.closed_frame_threshold, 30);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_presets_are_ordered() {
        let strict = DrowsinessConfig::strict();
        let lenient = DrowsinessConfig::lenient();
        assert!(strict.closed_frame_threshold < lenient.closed_frame_threshold);
        assert!(strict.validate().is_ok());
        assert!(lenient.validate().is_ok());
    }

    #[test]
    fn test_preset_selects_thresholds() {
        assert_eq!(Preset::Standard.config().closed_frame_threshold, 30);
        assert_eq!(Preset::Strict.config().closed_frame_threshold, 15);
        assert_eq!(Preset::Lenient.config().openness_threshold, 0.2);
        assert_eq!(Preset::Strict.config().preset, Preset::Strict);
    }

    #[test]
    fn test_onnx_backend_needs_models() {
        let mut config = DrowsinessConfig {
            detector: DetectorBackend::Onnx,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        config.face_model_path = Some("face.onnx".into());
        config.eye_model_path = Some("eye.onnx".into());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let zero_frames = DrowsinessConfig {
            closed_frame_threshold: 0,
            ..Default::default()
        };
        assert!(zero_frames.validate().is_err());

        let negative = DrowsinessConfig {
            openness_threshold: -0.1,
            ..Default::default()
        };
        assert!(negative.validate().is_err());

        let nan = DrowsinessConfig {
            openness_threshold: f32::NAN,
            ..Default::default()
        };
        assert!(nan.validate().is_err());

        let confidence = DrowsinessConfig {
            eye_confidence: 1.5,
            ..Default::default()
        };
        assert!(confidence.validate().is_err());
    }
}
