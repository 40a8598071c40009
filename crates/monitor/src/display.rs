//! Display boundary

use std::path::PathBuf;

use alerting::EscalationEvent;
use camera_capture::VideoFrame;
use tracing::{error, info, warn};

use crate::session::MonitorStatus;
use crate::MonitorError;

/// Receives every annotated frame with the current status, plus escalation events
pub trait DisplaySink {
    fn show(&mut self, frame: &VideoFrame, status: MonitorStatus) -> Result<(), MonitorError>;

    fn notify(&mut self, event: &EscalationEvent);
}

/// Logs status changes and escalation events; optionally writes annotated
/// frames as PNG files
pub struct LogDisplay {
    last_status: MonitorStatus,
    output_dir: Option<PathBuf>,
}

impl LogDisplay {
    pub fn new(output_dir: Option<&str>) -> Result<Self, MonitorError> {
        let output_dir = output_dir.map(PathBuf::from);
        if let Some(dir) = &output_dir {
            std::fs::create_dir_all(dir)
                .map_err(|e| MonitorError::Display(format!("{}: {}", dir.display(), e)))?;
            info!("Writing annotated frames to {}", dir.display());
        }
        Ok(Self {
            last_status: MonitorStatus::NotRunning,
            output_dir,
        })
    }

    pub fn last_status(&self) -> MonitorStatus {
        self.last_status
    }
}

impl DisplaySink for LogDisplay {
    fn show(&mut self, frame: &VideoFrame, status: MonitorStatus) -> Result<(), MonitorError> {
        if status != self.last_status {
            info!("{}", status);
            self.last_status = status;
        }

        if let Some(dir) = &self.output_dir {
            let path = dir.join(format!("frame_{:06}.png", frame.sequence));
            let image = frame
                .to_rgb_image()
                .ok_or_else(|| MonitorError::Display("frame data does not match its size".into()))?;
            image
                .save(&path)
                .map_err(|e| MonitorError::Display(format!("{}: {}", path.display(), e)))?;
        }
        Ok(())
    }

    fn notify(&mut self, event: &EscalationEvent) {
        match event {
            EscalationEvent::Warning { episode, delay } => warn!(
                "Drowsiness Detected! The system will initiate sleep mode in {} seconds (episode {})",
                delay.as_secs(),
                episode
            ),
            EscalationEvent::SuspendRequested { episode } => {
                info!("Sleep mode requested (episode {})", episode)
            }
            EscalationEvent::SuspendFailed { episode, reason } => error!(
                "Sleep mode failed (episode {}): {}. Monitoring continues",
                episode, reason
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_tracks_status_changes() {
        let mut display = LogDisplay::new(None).unwrap();
        let frame = VideoFrame::new(vec![0; 12], 2, 2, 0, 0);

        assert_eq!(display.last_status(), MonitorStatus::NotRunning);
        display.show(&frame, MonitorStatus::Awake).unwrap();
        assert_eq!(display.last_status(), MonitorStatus::Awake);
        display.show(&frame, MonitorStatus::Drowsy).unwrap();
        assert_eq!(display.last_status(), MonitorStatus::Drowsy);

        display.notify(&EscalationEvent::Warning {
            episode: 1,
            delay: Duration::from_secs(10),
        });
    }

    #[test]
    fn test_writes_frames() {
        let dir = std::env::temp_dir().join(format!("drowsywatch-display-{}", std::process::id()));
        let _ = std::fs::remove_dir_all(&dir);

        let mut display = LogDisplay::new(dir.to_str()).unwrap();
        let frame = VideoFrame::new(vec![10; 12], 2, 2, 0, 7);
        display.show(&frame, MonitorStatus::Awake).unwrap();

        let written = image::open(dir.join("frame_000007.png")).unwrap().to_rgb8();
        assert_eq!(written.dimensions(), (2, 2));
        assert_eq!(written.get_pixel(1, 1).0, [10, 10, 10]);

        let bad = VideoFrame::new(vec![0; 5], 2, 2, 0, 8);
        assert!(matches!(
            display.show(&bad, MonitorStatus::Awake),
            Err(MonitorError::Display(_))
        ));

        let _ = std::fs::remove_dir_all(&dir);
    }
}
