//! Alerting System
//!
//! Turns a sustained drowsy signal into a one-shot warning followed by a
//! delayed terminal action (system suspend).

mod escalation;
mod scheduler;
mod suspend;

pub use escalation::{
    EscalationConfig, EscalationController, EscalationEvent, EscalationState, SignalOutcome,
};
pub use scheduler::{DelayedTask, ManualScheduler, Scheduler, TokioScheduler};
pub use suspend::{LogOnlyAction, SystemSuspend, TerminalAction};

use thiserror::Error;

/// Escalation error types
#[derive(Error, Debug)]
pub enum EscalationError {
    #[error("Failed to launch {program}: {source}")]
    Launch {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Terminal action failed: {0}")]
    ActionFailed(String),

    #[error("Configuration error: {0}")]
    Config(String),
}
