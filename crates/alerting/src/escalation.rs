//! Escalation state machine
//!
//! `Idle` --drowsy--> `Warned` --delay elapses--> `Escalating` --> `Idle`
//!
//! While `Warned` or `Escalating` every signal is ignored, so one drowsy
//! episode yields exactly one warning and one scheduled terminal action.

use std::any::Any;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::scheduler::Scheduler;
use crate::suspend::{LogOnlyAction, SystemSuspend, TerminalAction};
use crate::EscalationError;

/// Escalation configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EscalationConfig {
    /// Delay between the warning and the terminal action (milliseconds)
    pub warning_delay_ms: u64,
    /// Log instead of suspending the host
    pub dry_run: bool,
    /// Override for the platform suspend command (program followed by arguments)
    pub suspend_command: Option<Vec<String>>,
}

impl Default for EscalationConfig {
    fn default() -> Self {
        Self {
            warning_delay_ms: 10_000,
            dry_run: false,
            suspend_command: None,
        }
    }
}

impl EscalationConfig {
    pub fn warning_delay(&self) -> Duration {
        Duration::from_millis(self.warning_delay_ms)
    }

    /// Build the terminal action this configuration selects
    pub fn terminal_action(&self) -> Result<Arc<dyn TerminalAction>, EscalationError> {
        if self.dry_run {
            return Ok(Arc::new(LogOnlyAction));
        }
        match &self.suspend_command {
            Some(line) => Ok(Arc::new(SystemSuspend::from_command_line(line)?)),
            None => Ok(Arc::new(SystemSuspend::platform_default())),
        }
    }
}

/// Escalation state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum EscalationState {
    /// No action pending
    #[default]
    Idle,
    /// Warning issued, terminal action scheduled
    Warned,
    /// Terminal action running
    Escalating,
}

impl fmt::Display for EscalationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EscalationState::Idle => write!(f, "idle"),
            EscalationState::Warned => write!(f, "warned"),
            EscalationState::Escalating => write!(f, "escalating"),
        }
    }
}

/// Notifications emitted to whoever is watching the session
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EscalationEvent {
    /// Drowsiness detected; the terminal action follows after `delay`
    Warning { episode: u64, delay: Duration },
    /// Terminal action completed
    SuspendRequested { episode: u64 },
    /// Terminal action failed; monitoring continues
    SuspendFailed { episode: u64, reason: String },
}

/// What a single drowsy signal did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalOutcome {
    /// Awake while idle
    NoAction,
    /// New episode: warning issued and terminal action scheduled
    Warned,
    /// Episode already in progress; signal ignored
    Suppressed,
}

/// Drives warnings and the delayed terminal action from the drowsy signal
pub struct EscalationController<S: Scheduler> {
    config: EscalationConfig,
    state: Arc<Mutex<EscalationState>>,
    scheduler: S,
    action: Arc<dyn TerminalAction>,
    events: Option<mpsc::UnboundedSender<EscalationEvent>>,
    episodes: u64,
}

impl<S: Scheduler> EscalationController<S> {
    /// Create a controller in `Idle`
    pub fn new(config: EscalationConfig, scheduler: S, action: Arc<dyn TerminalAction>) -> Self {
        info!(
            "Creating escalation controller: delay={}ms, action={}",
            config.warning_delay_ms,
            action.name()
        );
        Self {
            config,
            state: Arc::new(Mutex::new(EscalationState::Idle)),
            scheduler,
            action,
            events: None,
            episodes: 0,
        }
    }

    /// Deliver events to `sender`. A dropped receiver is ignored.
    pub fn with_events(mut self, sender: mpsc::UnboundedSender<EscalationEvent>) -> Self {
        self.events = Some(sender);
        self
    }

    /// Feed the drowsy signal for one processed frame
    pub fn on_drowsy_signal(&mut self, is_drowsy: bool) -> SignalOutcome {
        {
            let mut state = lock_state(&self.state);
            match (*state, is_drowsy) {
                (EscalationState::Idle, false) => return SignalOutcome::NoAction,
                (EscalationState::Warned | EscalationState::Escalating, _) => {
                    debug!("Drowsy signal ignored while {}", *state);
                    return SignalOutcome::Suppressed;
                }
                (EscalationState::Idle, true) => *state = EscalationState::Warned,
            }
        }

        self.episodes += 1;
        let episode = self.episodes;
        let delay = self.config.warning_delay();

        warn!(
            "Drowsiness detected (episode {}), {} in {:?}",
            episode,
            self.action.name(),
            delay
        );
        send_event(&self.events, EscalationEvent::Warning { episode, delay });

        let state = self.state.clone();
        let action = self.action.clone();
        let events = self.events.clone();
        self.scheduler.schedule(
            delay,
            Box::new(move || escalate(episode, &state, action.as_ref(), &events)),
        );

        SignalOutcome::Warned
    }

    /// Current state
    pub fn state(&self) -> EscalationState {
        *lock_state(&self.state)
    }

    /// Episodes started since construction
    pub fn episodes(&self) -> u64 {
        self.episodes
    }

    pub fn config(&self) -> &EscalationConfig {
        &self.config
    }
}

/// Body of the delayed task. Always ends in `Idle`, whatever the action does.
fn escalate(
    episode: u64,
    state: &Mutex<EscalationState>,
    action: &dyn TerminalAction,
    events: &Option<mpsc::UnboundedSender<EscalationEvent>>,
) {
    *lock_state(state) = EscalationState::Escalating;

    // A panicking action counts as a failure; the episode still closes
    let result = panic::catch_unwind(AssertUnwindSafe(|| action.execute())).unwrap_or_else(|payload| {
        Err(EscalationError::ActionFailed(format!(
            "{} panicked: {}",
            action.name(),
            panic_message(payload.as_ref())
        )))
    });

    let event = match result {
        Ok(()) => {
            info!("Episode {}: {} completed", episode, action.name());
            EscalationEvent::SuspendRequested { episode }
        }
        Err(e) => {
            error!("Episode {}: {} failed: {}", episode, action.name(), e);
            EscalationEvent::SuspendFailed {
                episode,
                reason: e.to_string(),
            }
        }
    };

    *lock_state(state) = EscalationState::Idle;
    debug!("Episode {} closed, escalation idle", episode);
    send_event(events, event);
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("unknown cause")
}

fn lock_state(state: &Mutex<EscalationState>) -> std::sync::MutexGuard<'_, EscalationState> {
    state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn send_event(events: &Option<mpsc::UnboundedSender<EscalationEvent>>, event: EscalationEvent) {
    if let Some(sender) = events {
        let _ = sender.send(event);
    }
}
