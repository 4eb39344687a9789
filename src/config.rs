//! Configuration for the presence simulator.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Randomized tick timing: each tick waits `base + U(0, jitter)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TickTiming {
    #[serde(with = "duration_ms")]
    pub base: Duration,
    #[serde(with = "duration_ms")]
    pub jitter: Duration,
}

impl TickTiming {
    pub const fn from_millis(base: u64, jitter: u64) -> Self {
        Self {
            base: Duration::from_millis(base),
            jitter: Duration::from_millis(jitter),
        }
    }

    /// Pick a delay for a uniform sample `unit` in [0, 1).
    pub fn delay(&self, unit: f64) -> Duration {
        self.base + self.jitter.mul_f64(unit.clamp(0.0, 1.0))
    }

    /// Longest delay this timing can produce.
    pub fn max_delay(&self) -> Duration {
        self.base + self.jitter
    }
}

/// Main configuration for the engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Synthetic typing cadence
    pub typing: TickTiming,

    /// Slow-path pointer recapture cadence
    pub capture: TickTiming,

    /// Probability that a typing tick appends a whole word
    pub word_probability: f64,

    /// Capacity used when the target declares no maximum length
    pub default_capacity: usize,

    /// Delay before re-requesting capture after an intercepted release key
    #[serde(with = "duration_ms")]
    pub recapture_delay: Duration,

    /// Interval of the fallback tier's synthetic activity pulse
    #[serde(with = "duration_ms")]
    pub activity_pulse_interval: Duration,

    /// Synthetic pointer movements use deltas in `[-jitter, jitter)`
    pub pointer_jitter: i32,

    /// Whether the orchestrator maintains the wake lock while active
    pub keep_awake: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            typing: TickTiming::from_millis(100, 150),
            capture: TickTiming::from_millis(500, 1000),
            word_probability: 0.2,
            default_capacity: 500,
            recapture_delay: Duration::from_millis(50),
            activity_pulse_interval: Duration::from_secs(60),
            pointer_jitter: 25,
            keep_awake: true,
        }
    }
}

impl Config {
    /// Load configuration from the default location.
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_path();

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            let config: Config = serde_json::from_str(&content)
                .map_err(|e| ConfigError::Parse(e.to_string()))?;
            config.validate()?;
            Ok(config)
        } else {
            Ok(Self::default())
        }
    }

    /// Save configuration to the default location.
    pub fn save(&self) -> Result<(), ConfigError> {
        let config_path = Self::config_path();

        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(self)
            .map_err(|e| ConfigError::Serialize(e.to_string()))?;
        std::fs::write(&config_path, content)?;

        Ok(())
    }

    /// Get the path to the configuration file.
    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("presence-sim")
            .join("config.json")
    }

    /// Reject settings that would stall or spin the loops.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.typing.base.is_zero() || self.capture.base.is_zero() {
            return Err(ConfigError::Invalid(
                "tick base interval must be non-zero".to_string(),
            ));
        }
        if self.activity_pulse_interval.is_zero() {
            return Err(ConfigError::Invalid(
                "activity pulse interval must be non-zero".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.word_probability) {
            return Err(ConfigError::Invalid(format!(
                "word probability {} is outside [0, 1]",
                self.word_probability
            )));
        }
        if self.default_capacity == 0 {
            return Err(ConfigError::Invalid(
                "default capacity must be at least 1".to_string(),
            ));
        }
        if self.pointer_jitter <= 0 {
            return Err(ConfigError::Invalid(
                "pointer jitter must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Serialize error: {0}")]
    Serialize(String),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Serde support for Duration as whole milliseconds.
mod duration_ms {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        (duration.as_millis() as u64).serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}
