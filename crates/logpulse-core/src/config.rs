use crate::error::LogPulseError;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Main configuration for LogPulse
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// General settings
    pub general: GeneralConfig,

    /// Rolling window capacities
    pub window: WindowConfig,

    /// Aggregator settings
    pub aggregator: AggregatorConfig,

    /// Periodic report settings
    pub report: ReportConfig,
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file(path: &Path) -> Result<Self, LogPulseError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| LogPulseError::Config(format!("Failed to read config file: {}", e)))?;
        Self::from_str(&content)
    }

    /// Parse configuration from a TOML string
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(content: &str) -> Result<Self, LogPulseError> {
        let config: Self = toml::from_str(content)
            .map_err(|e| LogPulseError::Config(format!("Failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize configuration to TOML string
    pub fn to_toml(&self) -> Result<String, LogPulseError> {
        toml::to_string_pretty(self)
            .map_err(|e| LogPulseError::Config(format!("Failed to serialize config: {}", e)))
    }

    /// Reject settings the pipeline cannot run with
    pub fn validate(&self) -> Result<(), LogPulseError> {
        if self.window.timestamp_capacity == 0 {
            return Err(LogPulseError::Config(
                "window.timestamp_capacity must be greater than zero".to_string(),
            ));
        }
        if self.window.line_capacity == 0 {
            return Err(LogPulseError::Config(
                "window.line_capacity must be greater than zero".to_string(),
            ));
        }
        if self.aggregator.poll_timeout_ms == 0 {
            return Err(LogPulseError::Config(
                "aggregator.poll_timeout_ms must be greater than zero".to_string(),
            ));
        }
        if self.report.interval_seconds == 0 {
            return Err(LogPulseError::Config(
                "report.interval_seconds must be greater than zero".to_string(),
            ));
        }
        ReportFormat::parse(&self.report.format)?;
        Ok(())
    }
}

/// General settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Instance name for identification
    pub instance_name: String,

    /// Internal log level: trace, debug, info, warn, error
    pub log_level: String,

    /// Stop once input is exhausted and the queue is drained.
    /// When false, reports keep coming until interrupted.
    pub exit_on_eof: bool,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            instance_name: "logpulse".to_string(),
            log_level: "warn".to_string(),
            exit_on_eof: true,
        }
    }
}

/// Capacities of the two rolling buffers
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowConfig {
    /// Most recent parsed timestamps kept for rate computation
    pub timestamp_capacity: usize,

    /// Most recent timestamped lines kept for error rate computation
    pub line_capacity: usize,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            timestamp_capacity: 10_000,
            line_capacity: 100_000,
        }
    }
}

/// Aggregator settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AggregatorConfig {
    /// How long a single queue poll waits before checking for shutdown
    pub poll_timeout_ms: u64,
}

impl AggregatorConfig {
    pub fn poll_timeout(&self) -> Duration {
        Duration::from_millis(self.poll_timeout_ms)
    }
}

impl Default for AggregatorConfig {
    fn default() -> Self {
        Self {
            poll_timeout_ms: 100,
        }
    }
}

/// Periodic report settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    /// Seconds between two reports
    pub interval_seconds: u64,

    /// Number of error patterns listed in each report
    pub top_errors: usize,

    /// Format: text, json
    pub format: String,

    /// Window length shown in the "Adaptive Window" line
    pub sliding_window_seconds: u64,

    /// Entries per second considered a burst. Not used by the core yet.
    pub burst_threshold: u64,
}

impl ReportConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_seconds)
    }
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            interval_seconds: 1,
            top_errors: 3,
            format: "text".to_string(),
            sliding_window_seconds: 60,
            burst_threshold: 100,
        }
    }
}

/// Rendering format for reports
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ReportFormat {
    /// Human-readable console block
    #[default]
    Text,
    /// Compact JSON (one line per report)
    Json,
}

impl ReportFormat {
    pub fn parse(format: &str) -> Result<Self, LogPulseError> {
        match format.to_lowercase().as_str() {
            "text" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            other => Err(LogPulseError::Config(format!(
                "Unknown report format '{}', expected text or json",
                other
            ))),
        }
    }
}
