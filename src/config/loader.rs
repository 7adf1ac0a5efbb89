//! Configuration loader with file resolution and environment override support.

use super::error::{ConfigError, ConfigResult};
use super::schema::{Config, LogFormat};
use directories::ProjectDirs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::debug;

/// Environment variable prefix for overrides
const ENV_PREFIX: &str = "PICO_TEST";

/// Config file name looked up in the working directory
const LOCAL_CONFIG_FILE_NAME: &str = "run_tests.toml";

/// Config file name inside the platform config directory
const CONFIG_FILE_NAME: &str = "config.toml";

/// Environment variable for explicit config path
const CONFIG_PATH_ENV: &str = "PICO_TEST_CONFIG";

/// Configuration loader with resolution and override logic.
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    /// Resolved config file path (if any)
    pub config_path: Option<PathBuf>,
    /// The loaded configuration
    pub config: Config,
}

impl ConfigLoader {
    /// Load configuration using standard resolution order.
    ///
    /// Resolution priority (highest to lowest):
    /// 1. `explicit` (the `--config` flag); it must exist
    /// 2. `PICO_TEST_CONFIG` environment variable
    /// 3. `./run_tests.toml`
    /// 4. `<platform config dir>/pico2-test-runner/config.toml`
    /// 5. Built-in defaults (no file required)
    ///
    /// Environment variables override file values, then the result is
    /// validated.
    pub fn load(explicit: Option<&Path>) -> ConfigResult<Self> {
        let config_path = match explicit {
            Some(path) if !path.exists() => return Err(ConfigError::NotFound(path.to_path_buf())),
            Some(path) => Some(path.to_path_buf()),
            None => resolve_config_path(),
        };

        let mut config = match config_path {
            Some(ref path) => load_from_file(path)?,
            None => Config::default(),
        };

        apply_env_overrides(&mut config)?;
        validate(&config)?;

        debug!(path = ?config_path, "configuration loaded");
        Ok(Self {
            config_path,
            config,
        })
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: impl AsRef<Path>) -> ConfigResult<Self> {
        Self::load(Some(path.as_ref()))
    }

    /// Create a loader with default configuration (no file, no environment).
    pub fn with_defaults() -> Self {
        Self {
            config_path: None,
            config: Config::default(),
        }
    }

    /// Get the loaded configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Consume the loader and return the configuration.
    pub fn into_config(self) -> Config {
        self.config
    }
}

/// Resolve the configuration file path using standard locations.
pub fn resolve_config_path() -> Option<PathBuf> {
    // 1. Explicit environment variable
    if let Ok(path) = std::env::var(CONFIG_PATH_ENV) {
        let path = PathBuf::from(path);
        if path.exists() {
            return Some(path);
        }
    }

    // 2. Current directory
    let cwd_config = PathBuf::from(LOCAL_CONFIG_FILE_NAME);
    if cwd_config.exists() {
        return Some(cwd_config);
    }

    // 3. Platform config directory
    get_default_config_path().filter(|path| path.exists())
}

/// Get the default config file path for creating new config files.
pub fn get_default_config_path() -> Option<PathBuf> {
    ProjectDirs::from("", "", "pico2-test-runner").map(|dirs| dirs.config_dir().join(CONFIG_FILE_NAME))
}

/// Load configuration from a file.
fn load_from_file(path: &Path) -> ConfigResult<Config> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
        path: path.to_path_buf(),
        source: e,
    })?;

    toml::from_str(&content).map_err(ConfigError::ParseError)
}

/// Apply environment variable overrides to the configuration.
///
/// Environment variables follow the pattern: `PICO_TEST_<SECTION>_<KEY>`
/// For example:
/// - `PICO_TEST_SERIAL_BAUD_RATE=921600`
/// - `PICO_TEST_SESSION_IDLE_THRESHOLD=5`
/// - `PICO_TEST_LOGGING_LEVEL=debug`
fn apply_env_overrides(config: &mut Config) -> ConfigResult<()> {
    apply_overrides_from(config, |var| std::env::var(var).ok())
}

/// Same as [`apply_env_overrides`] with an arbitrary variable source.
pub fn apply_overrides_from(
    config: &mut Config,
    lookup: impl Fn(&str) -> Option<String>,
) -> ConfigResult<()> {
    let var = |key: &str| format!("{ENV_PREFIX}_{key}");

    // Serial overrides
    if let Some(val) = lookup(&var("SERIAL_BAUD_RATE")) {
        config.serial.baud_rate = parse_var(&var("SERIAL_BAUD_RATE"), &val, "Invalid baud rate")?;
    }
    if let Some(val) = lookup(&var("SERIAL_READ_TIMEOUT_MS")) {
        config.serial.read_timeout_ms =
            parse_var(&var("SERIAL_READ_TIMEOUT_MS"), &val, "Invalid timeout")?;
    }
    if let Some(val) = lookup(&var("SERIAL_SETTLE_DELAY_MS")) {
        config.serial.settle_delay_ms =
            parse_var(&var("SERIAL_SETTLE_DELAY_MS"), &val, "Invalid delay")?;
    }

    // Session overrides
    if let Some(val) = lookup(&var("SESSION_COMMAND")) {
        config.session.command = val;
    }
    if let Some(val) = lookup(&var("SESSION_IDLE_THRESHOLD")) {
        config.session.idle_threshold =
            parse_var(&var("SESSION_IDLE_THRESHOLD"), &val, "Invalid poll count")?;
    }
    if let Some(val) = lookup(&var("SESSION_COMPLETION_PAUSE_MS")) {
        config.session.completion_pause_ms =
            parse_var(&var("SESSION_COMPLETION_PAUSE_MS"), &val, "Invalid pause")?;
    }

    // Discovery overrides
    if let Some(val) = lookup(&var("DISCOVERY_DESCRIPTION_MARKER")) {
        config.discovery.description_marker = val;
    }
    if let Some(val) = lookup(&var("DISCOVERY_HWID_MARKER")) {
        config.discovery.hwid_marker = val;
    }

    // Logging overrides
    if let Some(val) = lookup(&var("LOGGING_LEVEL")) {
        config.logging.level = val;
    }
    if let Some(val) = lookup(&var("LOGGING_FORMAT")) {
        config.logging.format = match val.to_lowercase().as_str() {
            "pretty" => LogFormat::Pretty,
            "compact" => LogFormat::Compact,
            _ => {
                return Err(ConfigError::env_parse(
                    var("LOGGING_FORMAT"),
                    "Expected 'pretty' or 'compact'",
                ))
            }
        };
    }

    Ok(())
}

fn parse_var<T: FromStr>(var: &str, value: &str, message: &str) -> ConfigResult<T> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::env_parse(var, message))
}

/// Reject values the session cannot run with.
pub fn validate(config: &Config) -> ConfigResult<()> {
    if config.serial.baud_rate == 0 {
        return Err(ConfigError::validation("serial.baud_rate", "must be non-zero"));
    }
    if config.serial.read_timeout_ms == 0 {
        return Err(ConfigError::validation(
            "serial.read_timeout_ms",
            "must be non-zero",
        ));
    }
    if config.session.idle_threshold == 0 {
        return Err(ConfigError::validation(
            "session.idle_threshold",
            "must be at least 1",
        ));
    }
    if config.session.command.trim().is_empty() {
        return Err(ConfigError::validation("session.command", "must not be empty"));
    }
    Ok(())
}
