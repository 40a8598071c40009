//! Haar cascade face and eye detection through OpenCV

use image::GrayImage;
use opencv::core::{Mat, Rect, Size, Vector};
use opencv::objdetect::CascadeClassifier;
use opencv::prelude::*;
use tracing::{debug, error, info};

use crate::region::Region;
use crate::{DrowsinessConfig, DrowsinessError, RegionDetector};

/// Detection parameters for one cascade
struct ScanParams {
    scale_factor: f64,
    min_neighbors: i32,
}

const FACE_SCAN: ScanParams = ScanParams {
    scale_factor: 1.3,
    min_neighbors: 5,
};

const EYE_SCAN: ScanParams = ScanParams {
    scale_factor: 1.1,
    min_neighbors: 3,
};

fn load(name: &str, path: &str) -> Result<CascadeClassifier, DrowsinessError> {
    info!("Loading {} cascade from {}", name, path);
    let cascade = CascadeClassifier::new(path)
        .map_err(|e| DrowsinessError::ModelLoad(format!("{}: {}", path, e)))?;
    // OpenCV reports an unreadable file as an empty classifier
    if cascade.empty().unwrap_or(true) {
        error!("Failed to load {} cascade", name);
        return Err(DrowsinessError::ModelLoad(format!("{}: no cascade loaded", path)));
    }
    Ok(cascade)
}

fn scan(
    cascade: &mut CascadeClassifier,
    image: &GrayImage,
    params: &ScanParams,
) -> Result<Vec<Region>, DrowsinessError> {
    let (width, height) = image.dimensions();
    if width == 0 || height == 0 {
        return Ok(Vec::new());
    }

    let mat = Mat::from_slice_rows_cols(image.as_raw(), height as usize, width as usize)
        .map_err(|e| DrowsinessError::Inference(e.to_string()))?;
    let mut found = Vector::<Rect>::new();
    cascade
        .detect_multi_scale(
            &mat,
            &mut found,
            params.scale_factor,
            params.min_neighbors,
            0,
            Size::new(0, 0),
            Size::new(0, 0),
        )
        .map_err(|e| DrowsinessError::Inference(e.to_string()))?;

    Ok(found.iter().filter_map(to_region).collect())
}

fn to_region(rect: Rect) -> Option<Region> {
    Some(Region::new(
        u32::try_from(rect.x).ok()?,
        u32::try_from(rect.y).ok()?,
        u32::try_from(rect.width).ok()?,
        u32::try_from(rect.height).ok()?,
    ))
}

/// Face and eye detector backed by OpenCV Haar cascades
pub struct CascadeRegionDetector {
    face: CascadeClassifier,
    eye: CascadeClassifier,
}

impl CascadeRegionDetector {
    pub fn new(config: &DrowsinessConfig) -> Result<Self, DrowsinessError> {
        Ok(Self {
            face: load("face", &config.face_cascade_path)?,
            eye: load("eye", &config.eye_cascade_path)?,
        })
    }
}

impl RegionDetector for CascadeRegionDetector {
    fn detect_faces(&mut self, frame: &GrayImage) -> Result<Vec<Region>, DrowsinessError> {
        let faces = scan(&mut self.face, frame, &FACE_SCAN)?;
        debug!("Face cascade: {} regions", faces.len());
        Ok(faces)
    }

    fn detect_eyes(&mut self, face: &GrayImage) -> Result<Vec<Region>, DrowsinessError> {
        scan(&mut self.eye, face, &EYE_SCAN)
    }
}
