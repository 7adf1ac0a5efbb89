//! Configuration schema definitions.
//!
//! Every section has `#[serde(default)]`, so a config file only needs the keys
//! it changes. The defaults reproduce the firmware's fixed console settings.

use crate::discovery::{DiscoveryRules, DEFAULT_DESCRIPTION_MARKER, DEFAULT_HWID_MARKER};
use crate::port::{PortConfiguration, DEFAULT_BAUD_RATE};
use crate::session::{SessionSettings, COMPLETION_MARKERS, IDLE_THRESHOLD};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Root configuration structure.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Serial link settings
    pub serial: SerialConfig,
    /// Test session settings
    pub session: SessionConfig,
    /// Port auto-detection settings
    pub discovery: DiscoveryConfig,
    /// Logging configuration
    pub logging: LoggingConfig,
}

impl Config {
    pub fn port_configuration(&self) -> PortConfiguration {
        PortConfiguration {
            baud_rate: self.serial.baud_rate,
            timeout: self.serial.read_timeout(),
        }
    }

    pub fn session_settings(&self) -> SessionSettings {
        let mut command = self.session.command.clone().into_bytes();
        if !command.ends_with(b"\n") {
            command.push(b'\n');
        }

        SessionSettings {
            command,
            poll_interval: self.serial.read_timeout(),
            settle_delay: Duration::from_millis(self.serial.settle_delay_ms),
            completion_pause: Duration::from_millis(self.session.completion_pause_ms),
            idle_threshold: self.session.idle_threshold,
            completion_markers: self.session.completion_markers.clone(),
        }
    }

    pub fn discovery_rules(&self) -> DiscoveryRules {
        DiscoveryRules {
            description_marker: self.discovery.description_marker.clone(),
            hwid_marker: self.discovery.hwid_marker.clone(),
        }
    }
}

/// Serial link section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SerialConfig {
    /// Baud rate of the device console
    pub baud_rate: u32,
    /// Per-read timeout, also the idle poll interval
    pub read_timeout_ms: u64,
    /// Wait after opening the port before any I/O
    pub settle_delay_ms: u64,
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            baud_rate: DEFAULT_BAUD_RATE,
            read_timeout_ms: 1000,
            settle_delay_ms: 1000,
        }
    }
}

impl SerialConfig {
    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }
}

/// Test session section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Command sent to the firmware; a trailing newline is added if missing
    pub command: String,
    /// Consecutive empty polls that end the session
    pub idle_threshold: u32,
    /// Grace period after a summary marker
    pub completion_pause_ms: u64,
    /// Substrings that mark the device's summary
    pub completion_markers: Vec<String>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            command: "TEST_ALL".to_string(),
            idle_threshold: IDLE_THRESHOLD,
            completion_pause_ms: 500,
            completion_markers: COMPLETION_MARKERS.iter().map(|m| m.to_string()).collect(),
        }
    }
}

/// Port auto-detection section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiscoveryConfig {
    /// Substring of the port description identifying the device
    pub description_marker: String,
    /// Substring of the hardware id (case-insensitive), usually the USB VID
    pub hwid_marker: String,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            description_marker: DEFAULT_DESCRIPTION_MARKER.to_string(),
            hwid_marker: DEFAULT_HWID_MARKER.to_string(),
        }
    }
}

/// Logging configuration section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: "trace", "debug", "info", "warn", "error"
    pub level: String,
    /// Log format: "pretty" or "compact"
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
            format: LogFormat::Compact,
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Multi-line format with colors
    Pretty,
    /// Single-line format
    #[default]
    Compact,
}
