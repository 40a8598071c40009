//! Drowsiness Monitor
//!
//! Wires frame acquisition, drowsiness inference and escalation into a
//! single frame-synchronous loop.

mod display;
mod session;
mod settings;

pub use display::{DisplaySink, LogDisplay};
pub use session::{MonitorSession, MonitorStatus, TickOutcome};
pub use settings::{AppConfig, MonitorSettings};

use alerting::{EscalationError, TokioScheduler};
use camera_capture::{CameraError, DeviceSource};
use drowsiness::{ConfiguredDetector, DrowsinessError};
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

/// Monitor error types
#[derive(Error, Debug)]
pub enum MonitorError {
    /// Monitoring could not begin
    #[error("Frame source unavailable: {0}")]
    SourceUnavailable(CameraError),

    /// The source failed after monitoring began
    #[error("Capture failed: {0}")]
    Capture(CameraError),

    #[error(transparent)]
    Drowsiness(#[from] DrowsinessError),

    #[error(transparent)]
    Escalation(#[from] EscalationError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Display error: {0}")]
    Display(String),
}

/// Initialize logging; `RUST_LOG` overrides the default `info` level
pub fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(true)
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
    }
}

/// Run one monitoring session until the stream ends, Ctrl-C, or a capture failure.
///
/// Needs a multi-threaded runtime: frame capture, inference and display run
/// on the loop's worker via `block_in_place`.
pub async fn run(config: AppConfig) -> Result<(), MonitorError> {
    let detector = ConfiguredDetector::from_config(&config.drowsiness)?;
    let action = config.escalation.terminal_action()?;
    let mut display = LogDisplay::new(config.monitor.output_dir.as_deref())?;
    let (events_tx, mut events_rx) = mpsc::unbounded_channel();

    let mut session = MonitorSession::start(
        DeviceSource::from_config(&config.camera),
        detector,
        TokioScheduler::current(),
        action,
        events_tx,
        &config,
    )?;

    let mut ticker = tokio::time::interval(config.monitor.frame_interval());
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    let result = loop {
        tokio::select! {
            _ = &mut shutdown => {
                info!("Interrupted");
                break Ok(());
            }
            Some(event) = events_rx.recv() => display.notify(&event),
            _ = ticker.tick() => match tokio::task::block_in_place(|| session.tick()) {
                Ok(TickOutcome::Frame(analysis)) => {
                    let status = session.status();
                    if let Err(e) =
                        tokio::task::block_in_place(|| display.show(&analysis.annotated, status))
                    {
                        error!("{}", e);
                    }
                }
                Ok(TickOutcome::Skipped) => {}
                Ok(TickOutcome::EndOfStream) => {
                    info!("Frame source exhausted");
                    break Ok(());
                }
                Err(e) => break Err(e),
            },
        }
    };

    let status = session.stop();
    // Pick up anything emitted on the last frame
    while let Ok(event) = events_rx.try_recv() {
        display.notify(&event);
    }
    info!("{}", status);
    result
}
