//! Face and eye region detection

use image::imageops::{self, FilterType};
use image::GrayImage;
use ndarray::Array4;
use ort::session::builder::GraphOptimizationLevel;
use ort::session::Session;
use tracing::{debug, error, info};

#[cfg(feature = "opencv")]
use crate::cascade::CascadeRegionDetector;
use crate::config::DetectorBackend;
use crate::region::Region;
use crate::{DrowsinessConfig, DrowsinessError};

/// Finds faces in a frame and eyes within a face.
///
/// Every call must return all regions meeting the detector's own
/// confidence criteria. Order is not significant.
pub trait RegionDetector {
    /// Face regions in frame coordinates
    fn detect_faces(&mut self, frame: &GrayImage) -> Result<Vec<Region>, DrowsinessError>;

    /// Eye regions relative to the top-left corner of `face`
    fn detect_eyes(&mut self, face: &GrayImage) -> Result<Vec<Region>, DrowsinessError>;
}

/// One ONNX box model.
///
/// Input is `1x3xSxS` float in `[0, 1]` (the gray channel repeated).
/// Output is any tensor whose last axis holds `[x1, y1, x2, y2, score]`
/// with coordinates normalised to the input.
struct BoxModel {
    name: &'static str,
    session: Session,
    input_size: u32,
    confidence_threshold: f32,
}

impl BoxModel {
    fn load(
        name: &'static str,
        path: &str,
        input_size: u32,
        confidence_threshold: f32,
    ) -> Result<Self, DrowsinessError> {
        info!("Loading {} model from {}", name, path);
        let session = Session::builder()
            .and_then(|builder| builder.with_optimization_level(GraphOptimizationLevel::Level3))
            .and_then(|builder| builder.commit_from_file(path))
            .map_err(|e| {
                error!("Failed to load {} model: {}", name, e);
                DrowsinessError::ModelLoad(format!("{}: {}", path, e))
            })?;

        Ok(Self {
            name,
            session,
            input_size,
            confidence_threshold,
        })
    }

    fn detect(&self, image: &GrayImage) -> Result<Vec<Region>, DrowsinessError> {
        let (width, height) = image.dimensions();
        if width == 0 || height == 0 {
            return Ok(Vec::new());
        }

        let size = self.input_size;
        let resized = imageops::resize(image, size, size, FilterType::Triangle);

        let mut input = Array4::<f32>::zeros((1, 3, size as usize, size as usize));
        for (x, y, pixel) in resized.enumerate_pixels() {
            let value = pixel[0] as f32 / 255.0;
            for channel in 0..3 {
                input[[0, channel, y as usize, x as usize]] = value;
            }
        }

        let inputs = ort::inputs![input].map_err(|e| DrowsinessError::Inference(e.to_string()))?;
        let outputs = self
            .session
            .run(inputs)
            .map_err(|e| DrowsinessError::Inference(e.to_string()))?;
        let boxes = outputs[0]
            .try_extract_tensor::<f32>()
            .map_err(|e| DrowsinessError::Inference(e.to_string()))?;

        if boxes.shape().last() != Some(&5) {
            return Err(DrowsinessError::Inference(format!(
                "{} model output shape {:?}, expected [.., 5]",
                self.name,
                boxes.shape()
            )));
        }

        let values: Vec<f32> = boxes.iter().copied().collect();
        let regions = decode_boxes(&values, self.confidence_threshold, width, height);
        debug!("{} model: {} regions", self.name, regions.len());
        Ok(regions)
    }
}

/// Turn `[x1, y1, x2, y2, score]` rows into regions of a `width` x `height` image
fn decode_boxes(values: &[f32], confidence_threshold: f32, width: u32, height: u32) -> Vec<Region> {
    values
        .chunks_exact(5)
        .filter(|row| row[4] >= confidence_threshold)
        .map(|row| {
            let scale = |v: f32, extent: u32| (v.clamp(0.0, 1.0) * extent as f32).round() as u32;
            let x1 = scale(row[0], width);
            let y1 = scale(row[1], height);
            let x2 = scale(row[2], width).max(x1);
            let y2 = scale(row[3], height).max(y1);
            Region::new(x1, y1, x2 - x1, y2 - y1)
        })
        .collect()
}

/// ONNX Runtime detector with separate face and eye models
pub struct OnnxRegionDetector {
    face_model: BoxModel,
    eye_model: BoxModel,
}

impl OnnxRegionDetector {
    pub fn new(config: &DrowsinessConfig) -> Result<Self, DrowsinessError> {
        let face_path = config
            .face_model_path
            .as_deref()
            .ok_or_else(|| DrowsinessError::Config("face_model_path is not set".into()))?;
        let eye_path = config
            .eye_model_path
            .as_deref()
            .ok_or_else(|| DrowsinessError::Config("eye_model_path is not set".into()))?;

        Ok(Self {
            face_model: BoxModel::load(
                "face",
                face_path,
                config.model_input_size,
                config.face_confidence,
            )?,
            eye_model: BoxModel::load(
                "eye",
                eye_path,
                config.model_input_size,
                config.eye_confidence,
            )?,
        })
    }
}

impl RegionDetector for OnnxRegionDetector {
    fn detect_faces(&mut self, frame: &GrayImage) -> Result<Vec<Region>, DrowsinessError> {
        self.face_model.detect(frame)
    }

    fn detect_eyes(&mut self, face: &GrayImage) -> Result<Vec<Region>, DrowsinessError> {
        self.eye_model.detect(face)
    }
}

/// Detector built from `DrowsinessConfig::detector`
pub enum ConfiguredDetector {
    Onnx(OnnxRegionDetector),
    #[cfg(feature = "opencv")]
    Cascade(CascadeRegionDetector),
}

impl ConfiguredDetector {
    pub fn from_config(config: &DrowsinessConfig) -> Result<Self, DrowsinessError> {
        match config.detector {
            DetectorBackend::Onnx => Ok(Self::Onnx(OnnxRegionDetector::new(config)?)),
            #[cfg(feature = "opencv")]
            DetectorBackend::Cascade => Ok(Self::Cascade(CascadeRegionDetector::new(config)?)),
            #[cfg(not(feature = "opencv"))]
            DetectorBackend::Cascade => Err(DrowsinessError::Config(
                "the cascade detector needs the `opencv` feature; \
                 rebuild with it or set drowsiness.detector = \"onnx\""
                    .into(),
            )),
        }
    }
}

impl RegionDetector for ConfiguredDetector {
    fn detect_faces(&mut self, frame: &GrayImage) -> Result<Vec<Region>, DrowsinessError> {
        match self {
            Self::Onnx(detector) => detector.detect_faces(frame),
            #[cfg(feature = "opencv")]
            Self::Cascade(detector) => detector.detect_faces(frame),
        }
    }

    fn detect_eyes(&mut self, face: &GrayImage) -> Result<Vec<Region>, DrowsinessError> {
        match self {
            Self::Onnx(detector) => detector.detect_eyes(face),
            #[cfg(feature = "opencv")]
            Self::Cascade(detector) => detector.detect_eyes(face),
        }
    }
}
