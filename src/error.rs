//! Top-level error taxonomy of the runner.
//!
//! Each variant corresponds to one way a run can fail before or during a
//! session. All of them end the process with exit status 1; a user
//! interrupt is not an error and never reaches this type.

use crate::config::ConfigError;
use crate::discovery::PortListing;
use crate::port::PortError;
use crate::session::SessionError;
use std::error::Error as _;
use std::path::PathBuf;
use thiserror::Error;

/// Exit status for every failure.
pub const FAILURE_EXIT_CODE: u8 = 1;

#[derive(Debug, Error)]
pub enum RunnerError {
    #[error("invalid configuration")]
    Config(#[from] ConfigError),

    /// No enumerated port matched the discovery rules.
    #[error("could not find the test device")]
    PortNotFound { available: Vec<PortListing> },

    #[error("failed to open output file '{}'", path.display())]
    OutputFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to connect to {port}")]
    Connect {
        port: String,
        #[source]
        source: PortError,
    },

    #[error(transparent)]
    Session(#[from] SessionError),
}

impl RunnerError {
    pub fn exit_code(&self) -> u8 {
        FAILURE_EXIT_CODE
    }

    /// The error followed by every underlying cause, outermost first.
    pub fn chain(&self) -> Vec<String> {
        let mut messages = vec![self.to_string()];
        let mut source = self.source();
        while let Some(cause) = source {
            messages.push(cause.to_string());
            source = cause.source();
        }
        messages
    }
}
