//! pico2-swd-riscv test runner library
//!
//! Drives the firmware's on-device test suite over its USB serial console:
//! find the board, send `TEST_ALL`, relay the report to the terminal and
//! optionally to a transcript file until the device falls silent.
//!
//! # Modules
//!
//! - `port`: Serial port abstraction (real hardware and mock)
//! - `discovery`: Port enumeration and test-device selection
//! - `framing`: Byte stream to line splitting
//! - `transcript`: Output file with header and footer
//! - `session`: The command / relay loop
//! - `runner`: End-to-end flow and user-facing error reporting
//! - `signal`: Ctrl+C handling
//! - `config`: Configuration management with TOML support
//! - `logging`: Diagnostic log setup
//! - `error`: Top-level error taxonomy

pub mod config;
pub mod discovery;
pub mod error;
pub mod framing;
pub mod logging;
pub mod port;
pub mod runner;
pub mod session;
pub mod signal;
pub mod transcript;

// Re-export commonly used types for convenience
pub use config::{Config, ConfigError, ConfigLoader, ConfigResult};
pub use discovery::{DiscoveryRules, PortListing};
pub use error::RunnerError;
pub use framing::LineFramer;
pub use port::{
    MockController, MockSerialPort, PortConfiguration, PortError, SerialPortAdapter,
    SyncSerialPort,
};
pub use runner::{execute, Host, Invocation, SystemHost};
pub use session::{
    Pacer, Session, SessionError, SessionOutcome, SessionReport, SessionSettings, ThreadPacer,
    Verdict,
};
pub use signal::StopFlag;
pub use transcript::Transcript;
