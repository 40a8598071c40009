//! Frame sources and scoped capture sessions

use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

#[cfg(feature = "opencv")]
use crate::webcam::OpenCvCamera;
use crate::{CameraConfig, CameraError, DeviceKind, VideoFrame};

/// Anything that produces frames for the monitor.
///
/// `open` failing means monitoring cannot begin; errors from `read_frame`
/// are mid-session failures. `Ok(None)` from `read_frame` means the stream
/// has ended.
pub trait FrameSource {
    fn open(&mut self) -> Result<(), CameraError>;

    fn read_frame(&mut self) -> Result<Option<VideoFrame>, CameraError>;

    fn release(&mut self);

    fn is_open(&self) -> bool;
}

/// Replays still images from a directory in file-name order
pub struct ImageDirectorySource {
    directory: PathBuf,
    frame_period_ns: u64,
    files: Vec<PathBuf>,
    position: usize,
    open: bool,
}

impl ImageDirectorySource {
    /// Create a source from camera configuration; `device` names the directory
    pub fn new(config: &CameraConfig) -> Self {
        Self {
            directory: PathBuf::from(&config.device),
            frame_period_ns: config.frame_period_ns(),
            files: Vec::new(),
            position: 0,
            open: false,
        }
    }

    /// Number of frames found when the source was opened
    pub fn frame_count(&self) -> usize {
        self.files.len()
    }

    fn is_image(path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| {
                matches!(
                    ext.to_ascii_lowercase().as_str(),
                    "png" | "jpg" | "jpeg" | "bmp"
                )
            })
            .unwrap_or(false)
    }
}

impl FrameSource for ImageDirectorySource {
    fn open(&mut self) -> Result<(), CameraError> {
        let entries = std::fs::read_dir(&self.directory).map_err(|e| {
            CameraError::Open(format!("{}: {}", self.directory.display(), e))
        })?;

        let mut files: Vec<PathBuf> = entries
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| Self::is_image(path))
            .collect();
        files.sort();

        if files.is_empty() {
            return Err(CameraError::Open(format!(
                "{}: no image frames found",
                self.directory.display()
            )));
        }

        info!("Opened frame directory {} ({} frames)", self.directory.display(), files.len());
        self.files = files;
        self.position = 0;
        self.open = true;
        Ok(())
    }

    fn read_frame(&mut self) -> Result<Option<VideoFrame>, CameraError> {
        if !self.open {
            return Err(CameraError::NotInitialized);
        }

        let Some(path) = self.files.get(self.position) else {
            return Ok(None);
        };

        let image = image::open(path)
            .map_err(|e| CameraError::Format(format!("{}: {}", path.display(), e)))?
            .to_rgb8();

        let sequence = self.position as u32;
        self.position += 1;
        debug!("Read frame {} from {}", sequence, path.display());

        Ok(Some(VideoFrame::from_rgb_image(
            image,
            u64::from(sequence) * self.frame_period_ns,
            sequence,
        )))
    }

    fn release(&mut self) {
        if self.open {
            info!("Released frame directory {}", self.directory.display());
        }
        self.files.clear();
        self.position = 0;
        self.open = false;
    }

    fn is_open(&self) -> bool {
        self.open
    }
}

/// Source chosen from `CameraConfig::device`
pub enum DeviceSource {
    Directory(ImageDirectorySource),
    #[cfg(feature = "opencv")]
    Camera(OpenCvCamera),
    /// Live or video capture requested without capture support compiled in
    Unsupported(String),
}

impl DeviceSource {
    pub fn from_config(config: &CameraConfig) -> Self {
        match config.device_kind() {
            DeviceKind::ImageDirectory(_) => Self::Directory(ImageDirectorySource::new(config)),
            #[cfg(feature = "opencv")]
            kind => Self::Camera(OpenCvCamera::new(kind, config)),
            #[cfg(not(feature = "opencv"))]
            _ => Self::Unsupported(config.device.clone()),
        }
    }
}

impl FrameSource for DeviceSource {
    fn open(&mut self) -> Result<(), CameraError> {
        match self {
            Self::Directory(source) => source.open(),
            #[cfg(feature = "opencv")]
            Self::Camera(source) => source.open(),
            Self::Unsupported(device) => Err(CameraError::Open(format!(
                "{}: camera and video capture need the `opencv` feature",
                device
            ))),
        }
    }

    fn read_frame(&mut self) -> Result<Option<VideoFrame>, CameraError> {
        match self {
            Self::Directory(source) => source.read_frame(),
            #[cfg(feature = "opencv")]
            Self::Camera(source) => source.read_frame(),
            Self::Unsupported(_) => Err(CameraError::NotInitialized),
        }
    }

    fn release(&mut self) {
        match self {
            Self::Directory(source) => source.release(),
            #[cfg(feature = "opencv")]
            Self::Camera(source) => source.release(),
            Self::Unsupported(_) => {}
        }
    }

    fn is_open(&self) -> bool {
        match self {
            Self::Directory(source) => source.is_open(),
            #[cfg(feature = "opencv")]
            Self::Camera(source) => source.is_open(),
            Self::Unsupported(_) => false,
        }
    }
}

/// Open frame source that is released when dropped
pub struct CaptureSession<S: FrameSource> {
    source: S,
}

impl<S: FrameSource> CaptureSession<S> {
    /// Open `source`. A failure here is fatal to starting a session.
    pub fn open(mut source: S) -> Result<Self, CameraError> {
        source.open()?;
        Ok(Self { source })
    }

    /// Read the next frame; `Ok(None)` once the stream has ended
    pub fn next_frame(&mut self) -> Result<Option<VideoFrame>, CameraError> {
        self.source.read_frame()
    }

    /// Borrow the underlying source
    pub fn source(&self) -> &S {
        &self.source
    }

    /// Release the source now instead of at drop
    pub fn close(mut self) {
        self.source.release();
    }
}

impl<S: FrameSource> Drop for CaptureSession<S> {
    fn drop(&mut self) {
        if self.source.is_open() {
            warn!("Capture session dropped while open, releasing source");
            self.source.release();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};
    use std::cell::Cell;
    use std::rc::Rc;

    fn frame_dir(name: &str, frames: usize) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("camera-capture-{}-{}", name, std::process::id()));
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();
        for i in 0..frames {
            let img = RgbImage::from_pixel(4, 3, Rgb([i as u8, 0, 0]));
            img.save(dir.join(format!("frame_{:03}.png", i))).unwrap();
        }
        std::fs::write(dir.join("notes.txt"), "not a frame").unwrap();
        dir
    }

    fn config_for(dir: &Path) -> CameraConfig {
        CameraConfig {
            device: dir.to_string_lossy().into_owned(),
            fps: 10,
        }
    }

    #[test]
    fn test_replay_in_order() {
        let dir = frame_dir("order", 3);
        let mut session = CaptureSession::open(ImageDirectorySource::new(&config_for(&dir))).unwrap();
        assert_eq!(session.source().frame_count(), 3);

        for i in 0..3u32 {
            let frame = session.next_frame().unwrap().unwrap();
            assert_eq!(frame.sequence, i);
            assert_eq!(frame.timestamp_ns, u64::from(i) * 100_000_000);
            assert_eq!(frame.get_pixel(0, 0), Some([i as u8, 0, 0]));
        }
        assert!(session.next_frame().unwrap().is_none());

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_missing_directory_fails_to_open() {
        let config = CameraConfig {
            device: "/nonexistent/drowsywatch/frames".to_string(),
            fps: 15,
        };
        let result = CaptureSession::open(ImageDirectorySource::new(&config));
        assert!(matches!(result, Err(CameraError::Open(_))));
    }

    #[test]
    fn test_empty_directory_fails_to_open() {
        let dir = frame_dir("empty", 0);
        let result = CaptureSession::open(ImageDirectorySource::new(&config_for(&dir)));
        assert!(matches!(result, Err(CameraError::Open(_))));
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_read_before_open() {
        let dir = frame_dir("unopened", 1);
        let mut source = ImageDirectorySource::new(&config_for(&dir));
        assert!(matches!(source.read_frame(), Err(CameraError::NotInitialized)));
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_device_source_replays_directory() {
        let dir = frame_dir("device", 2);
        let mut session = CaptureSession::open(DeviceSource::from_config(&config_for(&dir))).unwrap();
        assert!(matches!(session.source(), DeviceSource::Directory(_)));
        assert!(session.next_frame().unwrap().is_some());
        assert!(session.next_frame().unwrap().is_some());
        assert!(session.next_frame().unwrap().is_none());
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[cfg(not(feature = "opencv"))]
    #[test]
    fn test_camera_without_capture_support_fails_to_open() {
        let config = CameraConfig::default();
        let source = DeviceSource::from_config(&config);
        assert!(matches!(source, DeviceSource::Unsupported(_)));

        match CaptureSession::open(source) {
            Err(CameraError::Open(message)) => assert!(message.contains("opencv")),
            Err(e) => panic!("unexpected error {}", e),
            Ok(_) => panic!("camera opened without capture support"),
        }
    }

    struct CountingSource {
        releases: Rc<Cell<u32>>,
        open: bool,
    }

    impl FrameSource for CountingSource {
        fn open(&mut self) -> Result<(), CameraError> {
            self.open = true;
            Ok(())
        }

        fn read_frame(&mut self) -> Result<Option<VideoFrame>, CameraError> {
            Err(CameraError::Stream("device unplugged".into()))
        }

        fn release(&mut self) {
            if self.open {
                self.releases.set(self.releases.get() + 1);
            }
            self.open = false;
        }

        fn is_open(&self) -> bool {
            self.open
        }
    }

    #[test]
    fn test_release_on_error_path() {
        let releases = Rc::new(Cell::new(0));
        let run = || -> Result<(), CameraError> {
            let mut session = CaptureSession::open(CountingSource {
                releases: releases.clone(),
                open: false,
            })?;
            session.next_frame()?;
            Ok(())
        };

        assert!(matches!(run(), Err(CameraError::Stream(_))));
        assert_eq!(releases.get(), 1);
    }

    #[test]
    fn test_close_releases_once() {
        let releases = Rc::new(Cell::new(0));
        let session = CaptureSession::open(CountingSource {
            releases: releases.clone(),
            open: false,
        })
        .unwrap();
        session.close();
        assert_eq!(releases.get(), 1);
    }
}
