//! Plain-text transcript of a test run.
//!
//! Layout:
//!
//! ```text
//! pico2-swd-riscv Test Suite Results
//! Date: 2026-01-31 14:02:11
//! Port: /dev/ttyACM0
//! ======================================================================
//!
//! <device lines>
//!
//! ======================================================================
//! Test completed at 2026-01-31 14:02:45
//! ```
//!
//! Every device line is flushed as soon as it is written so a partial log
//! survives a crash. The footer is written exactly once: by [`Transcript::finish`]
//! or, if that was never reached, when the transcript is dropped.

use chrono::Local;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;
use tracing::{debug, warn};

pub const TITLE: &str = "pico2-swd-riscv Test Suite Results";

/// Width of the `=` separator rules, shared with the console output.
pub const RULE_WIDTH: usize = 70;

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

pub fn rule() -> String {
    "=".repeat(RULE_WIDTH)
}

pub fn timestamp() -> String {
    Local::now().format(TIMESTAMP_FORMAT).to_string()
}

/// Transcript sink; files come from [`Transcript::create`].
pub struct Transcript {
    // `None` once the footer has been written.
    writer: Option<Box<dyn Write + Send>>,
}

impl Transcript {
    /// Create (or truncate) the file at `path`.
    ///
    /// Nothing is written yet; call [`Transcript::write_header`] once the
    /// connection is up.
    pub fn create(path: impl AsRef<Path>) -> io::Result<Self> {
        let file = File::create(path.as_ref())?;
        debug!(path = %path.as_ref().display(), "transcript file opened");
        Ok(Self::new(BufWriter::new(file)))
    }

    pub fn new(writer: impl Write + Send + 'static) -> Self {
        Self {
            writer: Some(Box::new(writer)),
        }
    }

    pub fn write_header(&mut self, port: &str) -> io::Result<()> {
        let w = self.writer()?;
        writeln!(w, "{TITLE}")?;
        writeln!(w, "Date: {}", timestamp())?;
        writeln!(w, "Port: {port}")?;
        writeln!(w, "{}", rule())?;
        writeln!(w)?;
        w.flush()
    }

    /// Append one device line and flush it.
    pub fn write_line(&mut self, line: &str) -> io::Result<()> {
        let w = self.writer()?;
        writeln!(w, "{line}")?;
        w.flush()
    }

    /// Write the footer and close the file.
    pub fn finish(mut self) -> io::Result<()> {
        let mut writer = self.writer.take().ok_or_else(closed)?;
        write_footer(&mut writer)
    }

    fn writer(&mut self) -> io::Result<&mut Box<dyn Write + Send>> {
        self.writer.as_mut().ok_or_else(closed)
    }
}

impl std::fmt::Debug for Transcript {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Transcript")
            .field("open", &self.writer.is_some())
            .finish()
    }
}

impl Drop for Transcript {
    fn drop(&mut self) {
        if let Some(mut writer) = self.writer.take() {
            if let Err(e) = write_footer(&mut writer) {
                warn!(error = %e, "failed to write transcript footer");
            }
        }
    }
}

fn write_footer<W: Write>(w: &mut W) -> io::Result<()> {
    writeln!(w)?;
    writeln!(w, "{}", rule())?;
    writeln!(w, "Test completed at {}", timestamp())?;
    w.flush()
}

fn closed() -> io::Error {
    io::Error::other("transcript already finished")
}
