//! Terminal actions run when a warning goes unanswered

use std::process::Command;

use tracing::{info, warn};

use crate::EscalationError;

/// Zero-argument action invoked at most once per escalation episode
pub trait TerminalAction: Send + Sync {
    fn execute(&self) -> Result<(), EscalationError>;

    /// Short name for logs
    fn name(&self) -> &str;
}

/// Suspends (or hibernates) the host through a platform command
#[derive(Debug, Clone)]
pub struct SystemSuspend {
    program: String,
    args: Vec<String>,
}

impl SystemSuspend {
    /// Platform default: `shutdown /h` on Windows, `systemctl suspend` elsewhere
    pub fn platform_default() -> Self {
        if cfg!(target_os = "windows") {
            Self::command("shutdown", ["/h"])
        } else {
            Self::command("systemctl", ["suspend"])
        }
    }

    /// Use an explicit command line instead of the platform default
    pub fn command<I, A>(program: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator<Item = A>,
        A: Into<String>,
    {
        Self {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
        }
    }

    /// Build from a full command line where the first element is the program
    pub fn from_command_line(line: &[String]) -> Result<Self, EscalationError> {
        let (program, args) = line
            .split_first()
            .ok_or_else(|| EscalationError::Config("suspend command is empty".into()))?;
        Ok(Self::command(program.clone(), args.iter().cloned()))
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }
}

impl TerminalAction for SystemSuspend {
    fn execute(&self) -> Result<(), EscalationError> {
        info!("Requesting system suspend: {} {}", self.program, self.args.join(" "));

        let status = Command::new(&self.program)
            .args(&self.args)
            .status()
            .map_err(|source| EscalationError::Launch {
                program: self.program.clone(),
                source,
            })?;

        if status.success() {
            Ok(())
        } else {
            Err(EscalationError::ActionFailed(format!(
                "{} exited with {}",
                self.program, status
            )))
        }
    }

    fn name(&self) -> &str {
        "system-suspend"
    }
}

/// Logs instead of suspending; for dry runs and replays
#[derive(Debug, Clone, Default)]
pub struct LogOnlyAction;

impl TerminalAction for LogOnlyAction {
    fn execute(&self) -> Result<(), EscalationError> {
        warn!("Dry run: system suspend skipped");
        Ok(())
    }

    fn name(&self) -> &str {
        "log-only"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_platform_default() {
        let suspend = SystemSuspend::platform_default();
        if cfg!(target_os = "windows") {
            assert_eq!(suspend.program(), "shutdown");
            assert_eq!(suspend.args(), ["/h"]);
        } else {
            assert_eq!(suspend.program(), "systemctl");
            assert_eq!(suspend.args(), ["suspend"]);
        }
    }

    #[test]
    fn test_from_command_line() {
        let line = vec!["loginctl".to_string(), "suspend".to_string()];
        let suspend = SystemSuspend::from_command_line(&line).unwrap();
        assert_eq!(suspend.program(), "loginctl");
        assert_eq!(suspend.args(), ["suspend"]);

        assert!(matches!(
            SystemSuspend::from_command_line(&[]),
            Err(EscalationError::Config(_))
        ));
    }

    #[test]
    fn test_missing_program_is_launch_error() {
        let suspend = SystemSuspend::command("drowsywatch-no-such-program", Vec::<String>::new());
        assert!(matches!(
            suspend.execute(),
            Err(EscalationError::Launch { .. })
        ));
    }

    #[cfg(unix)]
    #[test]
    fn test_nonzero_exit_is_failure() {
        let suspend = SystemSuspend::command("false", Vec::<String>::new());
        assert!(matches!(suspend.execute(), Err(EscalationError::ActionFailed(_))));

        let ok = SystemSuspend::command("true", Vec::<String>::new());
        assert!(ok.execute().is_ok());
    }

    #[test]
    fn test_log_only() {
        assert!(LogOnlyAction.execute().is_ok());
        assert_eq!(LogOnlyAction.name(), "log-only");
    }
}
