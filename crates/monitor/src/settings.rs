//! Layered application settings

use std::time::Duration;

use alerting::EscalationConfig;
use camera_capture::CameraConfig;
use drowsiness::{DrowsinessConfig, Preset};
use serde::{Deserialize, Serialize};

use crate::MonitorError;

/// Default configuration file, looked up without extension
pub const DEFAULT_CONFIG_FILE: &str = "drowsywatch";
/// Environment variable naming an alternative configuration file
pub const CONFIG_PATH_ENV: &str = "DROWSYWATCH_CONFIG";
/// Prefix of per-key environment overrides, e.g. `DROWSYWATCH__CAMERA__DEVICE`
pub const ENV_PREFIX: &str = "DROWSYWATCH";

/// Frame loop settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorSettings {
    /// Polling interval of the frame loop (milliseconds)
    pub frame_interval_ms: u64,
    /// Mirror frames left to right before processing
    pub mirror: bool,
    /// Directory for annotated frames; nothing is written when unset
    pub output_dir: Option<String>,
}

impl Default for MonitorSettings {
    fn default() -> Self {
        Self {
            frame_interval_ms: 50,
            mirror: true,
            output_dir: None,
        }
    }
}

impl MonitorSettings {
    pub fn frame_interval(&self) -> Duration {
        Duration::from_millis(self.frame_interval_ms)
    }
}

/// Complete configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub camera: CameraConfig,
    pub drowsiness: DrowsinessConfig,
    pub escalation: EscalationConfig,
    pub monitor: MonitorSettings,
}

impl AppConfig {
    /// Preset defaults, then the configuration file, then environment overrides.
    ///
    /// The file is `path` if given, else `$DROWSYWATCH_CONFIG`, else
    /// `drowsywatch.{toml,yaml,json,...}` in the working directory. A missing
    /// default file is not an error; a missing explicit file is.
    /// `drowsiness.preset` picks the thresholds the other layers start from.
    pub fn load(path: Option<&str>) -> Result<Self, MonitorError> {
        let explicit = path
            .map(str::to_string)
            .or_else(|| std::env::var(CONFIG_PATH_ENV).ok());
        let required = explicit.is_some();
        let file = explicit.unwrap_or_else(|| DEFAULT_CONFIG_FILE.to_string());

        let file_source = || config::File::with_name(&file).required(required);
        let env_source = || {
            config::Environment::with_prefix(ENV_PREFIX)
                .separator("__")
                .try_parsing(true)
        };

        let overrides = config::Config::builder()
            .add_source(file_source())
            .add_source(env_source())
            .build()
            .map_err(config_error)?;
        let preset = match overrides.get::<Preset>("drowsiness.preset") {
            Ok(preset) => preset,
            Err(config::ConfigError::NotFound(_)) => Preset::default(),
            Err(e) => return Err(config_error(e)),
        };

        let defaults = AppConfig {
            drowsiness: preset.config(),
            ..Default::default()
        };
        config::Config::builder()
            .add_source(config::Config::try_from(&defaults).map_err(config_error)?)
            .add_source(file_source())
            .add_source(env_source())
            .build()
            .and_then(|settings| settings.try_deserialize())
            .map_err(config_error)
    }

    /// Reject settings monitoring cannot start with
    pub fn validate(&self) -> Result<(), MonitorError> {
        self.drowsiness.validate()?;
        if self.monitor.frame_interval_ms == 0 {
            return Err(MonitorError::Config("monitor.frame_interval_ms must be non-zero".into()));
        }
        if self.camera.fps == 0 {
            return Err(MonitorError::Config("camera.fps must be non-zero".into()));
        }
        if matches!(&self.escalation.suspend_command, Some(line) if line.is_empty()) {
            return Err(MonitorError::Config("escalation.suspend_command is empty".into()));
        }
        Ok(())
    }
}

fn config_error(e: config::ConfigError) -> MonitorError {
    MonitorError::Config(e.to_string())
}
