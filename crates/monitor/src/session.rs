//! Monitoring session lifecycle

use std::fmt;
use std::sync::Arc;

use alerting::{EscalationController, EscalationEvent, EscalationState, Scheduler, TerminalAction};
use camera_capture::{CaptureSession, FrameSource};
use drowsiness::{FrameAnalysis, FrameProcessor, RegionDetector};
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::settings::{AppConfig, MonitorSettings};
use crate::MonitorError;

/// Operator-facing status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MonitorStatus {
    #[default]
    NotRunning,
    Awake,
    Drowsy,
}

impl fmt::Display for MonitorStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MonitorStatus::NotRunning => write!(f, "Status: Not Running"),
            MonitorStatus::Awake => write!(f, "Status: Awake"),
            MonitorStatus::Drowsy => write!(f, "Status: DROWSY!"),
        }
    }
}

/// Result of one frame-loop tick
#[derive(Debug)]
pub enum TickOutcome {
    Frame(Box<FrameAnalysis>),
    /// Frame could not be analysed; monitoring continues
    Skipped,
    EndOfStream,
}

/// One monitoring run: an open frame source plus fresh tracker and
/// escalation state. Dropping the session releases the source.
pub struct MonitorSession<F, D, S>
where
    F: FrameSource,
    D: RegionDetector,
    S: Scheduler,
{
    capture: CaptureSession<F>,
    processor: FrameProcessor<D>,
    escalation: EscalationController<S>,
    settings: MonitorSettings,
    status: MonitorStatus,
}

impl<F, D, S> MonitorSession<F, D, S>
where
    F: FrameSource,
    D: RegionDetector,
    S: Scheduler,
{
    /// Open the source and build per-session state.
    ///
    /// A source that cannot be opened is reported as `SourceUnavailable`.
    pub fn start(
        source: F,
        detector: D,
        scheduler: S,
        action: Arc<dyn TerminalAction>,
        events: mpsc::UnboundedSender<EscalationEvent>,
        config: &AppConfig,
    ) -> Result<Self, MonitorError> {
        let capture = CaptureSession::open(source).map_err(MonitorError::SourceUnavailable)?;
        let processor = FrameProcessor::new(detector, &config.drowsiness);
        let escalation = EscalationController::new(config.escalation.clone(), scheduler, action)
            .with_events(events);

        info!("Monitoring started");
        Ok(Self {
            capture,
            processor,
            escalation,
            settings: config.monitor.clone(),
            status: MonitorStatus::Awake,
        })
    }

    /// Read and process the next frame
    pub fn tick(&mut self) -> Result<TickOutcome, MonitorError> {
        let frame = match self.capture.next_frame().map_err(MonitorError::Capture)? {
            Some(frame) => frame,
            None => return Ok(TickOutcome::EndOfStream),
        };
        let frame = if self.settings.mirror {
            frame.flip_horizontal()
        } else {
            frame
        };

        match self.processor.process(&frame, &mut self.escalation) {
            Ok(analysis) => {
                self.status = if analysis.is_drowsy {
                    MonitorStatus::Drowsy
                } else {
                    MonitorStatus::Awake
                };
                Ok(TickOutcome::Frame(Box::new(analysis)))
            }
            Err(e) => {
                warn!("Frame {} skipped: {}", frame.sequence, e);
                Ok(TickOutcome::Skipped)
            }
        }
    }

    pub fn status(&self) -> MonitorStatus {
        self.status
    }

    pub fn escalation(&self) -> &EscalationController<S> {
        &self.escalation
    }

    pub fn processor(&self) -> &FrameProcessor<D> {
        &self.processor
    }

    /// Whether a warned episode is still waiting on its terminal action
    pub fn escalation_pending(&self) -> bool {
        self.escalation.state() != EscalationState::Idle
    }

    /// Release the source.
    ///
    /// A scheduled terminal action is not cancelled here; it fires only if
    /// the runtime that owns it outlives the session.
    pub fn stop(self) -> MonitorStatus {
        if self.escalation_pending() {
            warn!(
                "Stopping while escalation is {}; the pending action is lost if the process exits first",
                self.escalation.state()
            );
        }
        info!(
            "Monitoring stopped after {} frames, {} episodes",
            self.processor.frames_processed(),
            self.escalation.episodes()
        );
        self.capture.close();
        MonitorStatus::NotRunning
    }
}
