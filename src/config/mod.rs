//! Configuration module for the test runner.
//!
//! Every setting has a built-in default matching the firmware's console, so
//! no file is required. A TOML file can adjust them, and environment
//! variables override the file.
//!
//! # Configuration Resolution
//!
//! 1. `--config <PATH>` on the command line
//! 2. `PICO_TEST_CONFIG` environment variable (explicit path)
//! 3. `./run_tests.toml` (current directory)
//! 4. `<platform config dir>/pico2-test-runner/config.toml`
//! 5. Built-in defaults
//!
//! # Environment Overrides
//!
//! The pattern is `PICO_TEST_<SECTION>_<KEY>`, e.g.
//! `PICO_TEST_SERIAL_BAUD_RATE=921600` or `PICO_TEST_LOGGING_LEVEL=debug`.
//!
//! # Example
//!
//! ```rust,ignore
//! use pico2_test_runner::config::ConfigLoader;
//!
//! let loader = ConfigLoader::load(None)?;
//! let settings = loader.config().session_settings();
//! ```

mod error;
mod loader;
mod schema;

pub use error::{ConfigError, ConfigResult};
pub use loader::{
    apply_overrides_from, get_default_config_path, resolve_config_path, validate, ConfigLoader,
};
pub use schema::{
    Config, DiscoveryConfig, LogFormat, LoggingConfig, SerialConfig, SessionConfig,
};
