//! Test session runner.
//!
//! A session sends the test-trigger command once and then relays the device
//! console until it goes quiet. The read loop alternates between two states:
//!
//! - **Draining**: bytes are waiting; read them all, reset the idle counter and
//!   emit every complete line.
//! - **Idle**: nothing waiting; sleep one poll interval and count it. After
//!   `idle_threshold` consecutive idle polls the session ends.
//!
//! A line containing one of the summary markers triggers a short grace pause
//! followed by a sweep of whatever arrived meanwhile. The loop keeps polling
//! afterwards; only silence or a user interrupt ends it.
//!
//! The serial port and the transcript are released on every exit path:
//! `run` consumes the session and tears both down before returning, and
//! `Transcript`'s `Drop` covers unwinding.

use crate::framing::LineFramer;
use crate::port::{PortError, SerialPortAdapter};
use crate::signal::StopFlag;
use crate::transcript::{rule, Transcript};
use std::io::{self, Write};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Command that makes the firmware run its whole suite.
pub const TEST_COMMAND: &[u8] = b"TEST_ALL\n";

/// Lines containing any of these end the device's report.
pub const COMPLETION_MARKERS: [&str; 3] = ["TEST SUMMARY", "ALL TESTS PASSED", "SOME TESTS FAILED"];

pub const IDLE_THRESHOLD: u32 = 20;

/// Delay after opening the port, for the device's USB stack to settle.
pub const SETTLE_DELAY: Duration = Duration::from_secs(1);

/// Grace period after a summary marker.
pub const COMPLETION_PAUSE: Duration = Duration::from_millis(500);

/// Timing source for the loop's waits.
pub trait Pacer {
    fn sleep(&mut self, duration: Duration);
}

impl<T: Pacer + ?Sized> Pacer for &mut T {
    fn sleep(&mut self, duration: Duration) {
        (**self).sleep(duration);
    }
}

/// Real-time pacer backed by `std::thread::sleep`.
#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadPacer;

impl Pacer for ThreadPacer {
    fn sleep(&mut self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

/// Tunables for one session. `Default` matches the firmware's expectations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSettings {
    /// Bytes written once after the stale-data guard.
    pub command: Vec<u8>,
    /// Sleep between idle polls.
    pub poll_interval: Duration,
    pub settle_delay: Duration,
    pub completion_pause: Duration,
    /// Consecutive idle polls that end the session.
    pub idle_threshold: u32,
    pub completion_markers: Vec<String>,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            command: TEST_COMMAND.to_vec(),
            poll_interval: crate::port::DEFAULT_READ_TIMEOUT,
            settle_delay: SETTLE_DELAY,
            completion_pause: COMPLETION_PAUSE,
            idle_threshold: IDLE_THRESHOLD,
            completion_markers: COMPLETION_MARKERS.iter().map(|m| m.to_string()).collect(),
        }
    }
}

impl SessionSettings {
    /// Command as printed in progress messages (`TEST_ALL`).
    pub fn command_label(&self) -> String {
        String::from_utf8_lossy(&self.command).trim_end().to_string()
    }

    /// The first marker contained in `line`, if any.
    pub fn completion_marker<'a>(&'a self, line: &str) -> Option<&'a str> {
        self.completion_markers
            .iter()
            .map(String::as_str)
            .find(|marker| !marker.is_empty() && line.contains(marker))
    }
}

/// How the read loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionOutcome {
    /// The device stayed silent for the idle threshold.
    Idle,
    /// The user interrupted the session.
    Interrupted,
}

/// What the device reported, judging by the markers seen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Passed,
    Failed,
    Unknown,
}

/// Counters collected while relaying.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionReport {
    pub outcome: Option<SessionOutcome>,
    pub lines_relayed: usize,
    pub bytes_received: usize,
    /// Number of pause-and-sweep rounds triggered by summary markers.
    pub soft_completions: usize,
    /// Markers in the order first seen, without repeats.
    pub markers_seen: Vec<String>,
    /// Idle polls counted when the loop ended.
    pub idle_polls: u32,
}

impl SessionReport {
    pub fn verdict(&self) -> Verdict {
        let seen = |marker: &str| self.markers_seen.iter().any(|m| m == marker);
        if seen("SOME TESTS FAILED") {
            Verdict::Failed
        } else if seen("ALL TESTS PASSED") {
            Verdict::Passed
        } else {
            Verdict::Unknown
        }
    }
}

/// Failures that abort a session after it has started.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("failed to discard stale input")]
    ClearInput(#[source] PortError),

    #[error("failed to send command to device")]
    Send(#[source] PortError),

    #[error("failed to read from serial port")]
    Read(#[source] PortError),

    #[error("failed to write to console")]
    Console(#[source] io::Error),

    #[error("failed to write transcript")]
    Transcript(#[source] io::Error),
}

/// One run of the test suite against an open port.
///
/// # Example
/// ```
/// use pico2_test_runner::port::MockSerialPort;
/// use pico2_test_runner::session::{Pacer, Session, SessionOutcome, SessionSettings};
/// use std::time::Duration;
///
/// struct NoWait;
/// impl Pacer for NoWait {
///     fn sleep(&mut self, _: Duration) {}
/// }
///
/// let port = MockSerialPort::new("MOCK0");
/// port.controller().respond_with(b"ALL TESTS PASSED\r\n");
///
/// let mut console = Vec::new();
/// let report = Session::new(port, &mut console, NoWait, SessionSettings::default())
///     .run()
///     .unwrap();
///
/// assert_eq!(report.outcome, Some(SessionOutcome::Idle));
/// assert!(String::from_utf8(console).unwrap().contains("ALL TESTS PASSED"));
/// ```
pub struct Session<P: SerialPortAdapter, O: Write, T: Pacer> {
    port: P,
    console: O,
    pacer: T,
    settings: SessionSettings,
    transcript: Option<Transcript>,
    stop: StopFlag,
    framer: LineFramer,
    report: SessionReport,
}

impl<P: SerialPortAdapter, O: Write, T: Pacer> Session<P, O, T> {
    pub fn new(port: P, console: O, pacer: T, settings: SessionSettings) -> Self {
        Self {
            port,
            console,
            pacer,
            settings,
            transcript: None,
            stop: StopFlag::new(),
            framer: LineFramer::new(),
            report: SessionReport::default(),
        }
    }

    /// Tee relayed lines into `transcript`.
    pub fn with_transcript(mut self, transcript: Transcript) -> Self {
        self.transcript = Some(transcript);
        self
    }

    /// End the loop cleanly once `stop` is raised.
    pub fn with_stop_flag(mut self, stop: StopFlag) -> Self {
        self.stop = stop;
        self
    }

    /// Drive the session to completion, then close the port and the
    /// transcript regardless of how the loop ended.
    pub fn run(mut self) -> Result<SessionReport, SessionError> {
        let result = self.drive();

        let Self {
            port,
            transcript,
            mut report,
            ..
        } = self;

        let port_name = port.name().to_string();
        drop(port);
        debug!(port = %port_name, "serial port closed");

        let footer = match transcript {
            Some(transcript) => transcript.finish().map_err(SessionError::Transcript),
            None => Ok(()),
        };

        let outcome = match result {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!(
                    port = %port_name,
                    lines = report.lines_relayed,
                    bytes = report.bytes_received,
                    "session aborted"
                );
                if let Err(footer_err) = footer {
                    warn!(error = %footer_err, "transcript footer not written");
                }
                return Err(e);
            }
        };
        footer?;

        report.outcome = Some(outcome);
        info!(
            port = %port_name,
            ?outcome,
            verdict = ?report.verdict(),
            lines = report.lines_relayed,
            bytes = report.bytes_received,
            "session finished"
        );
        Ok(report)
    }

    fn drive(&mut self) -> Result<SessionOutcome, SessionError> {
        self.pacer.sleep(self.settings.settle_delay);
        // An interrupt before the command goes out leaves the device untouched.
        if self.stop.is_raised() {
            return self.interrupted();
        }
        self.say("Connected!\n")?;

        if let Some(transcript) = self.transcript.as_mut() {
            transcript
                .write_header(self.port.name())
                .map_err(SessionError::Transcript)?;
        }

        self.port.clear_input().map_err(SessionError::ClearInput)?;

        self.say(&format!(
            "Sending {} command...\n",
            self.settings.command_label()
        ))?;
        self.say(&rule())?;

        if self.stop.is_raised() {
            return self.interrupted();
        }
        self.port
            .send_all(&self.settings.command)
            .map_err(SessionError::Send)?;
        debug!(bytes = self.settings.command.len(), "command sent");

        let outcome = self.relay()?;
        match outcome {
            SessionOutcome::Idle => {
                self.say("\n(No more data received, test complete)")?;
                self.say(&rule())?;
            }
            SessionOutcome::Interrupted => return self.interrupted(),
        }
        Ok(outcome)
    }

    fn interrupted(&mut self) -> Result<SessionOutcome, SessionError> {
        self.say("\n\nInterrupted by user")?;
        Ok(SessionOutcome::Interrupted)
    }

    fn relay(&mut self) -> Result<SessionOutcome, SessionError> {
        let mut idle_polls = 0;
        loop {
            if self.stop.is_raised() {
                self.report.idle_polls = idle_polls;
                return Ok(SessionOutcome::Interrupted);
            }

            let chunk = self.read_available()?;
            if !chunk.is_empty() {
                idle_polls = 0;
                self.framer.extend(&chunk);
                while let Some(line) = self.framer.next_line() {
                    self.emit(&line)?;
                    if let Some(marker) = self.settings.completion_marker(&line) {
                        let marker = marker.to_string();
                        self.soft_complete(marker)?;
                    }
                }
                continue;
            }

            self.pacer.sleep(self.settings.poll_interval);
            if self.stop.is_raised() {
                continue;
            }
            idle_polls += 1;
            if idle_polls >= self.settings.idle_threshold {
                self.report.idle_polls = idle_polls;
                return Ok(SessionOutcome::Idle);
            }
        }
    }

    // Pause, then sweep whatever arrived meanwhile, unterminated tail
    // included. The loop carries on polling afterwards.
    fn soft_complete(&mut self, marker: String) -> Result<(), SessionError> {
        debug!(%marker, "summary marker seen");
        self.report.soft_completions += 1;
        if !self.report.markers_seen.contains(&marker) {
            self.report.markers_seen.push(marker);
        }

        self.pacer.sleep(self.settings.completion_pause);
        if self.stop.is_raised() {
            return Ok(());
        }

        let chunk = self.read_available()?;
        if chunk.is_empty() {
            return Ok(());
        }
        self.framer.extend(&chunk);
        for line in self.framer.take_remainder() {
            self.emit(&line)?;
        }
        Ok(())
    }

    fn read_available(&mut self) -> Result<Vec<u8>, SessionError> {
        let available = self.port.bytes_to_read().map_err(SessionError::Read)?;
        if available == 0 {
            return Ok(Vec::new());
        }

        let mut buffer = vec![0u8; available];
        let n = match self.port.read_bytes(&mut buffer) {
            Ok(n) => n,
            Err(PortError::Io(e)) if e.kind() == io::ErrorKind::TimedOut => 0,
            Err(e) => return Err(SessionError::Read(e)),
        };
        buffer.truncate(n);
        self.report.bytes_received += n;
        Ok(buffer)
    }

    fn emit(&mut self, line: &str) -> Result<(), SessionError> {
        self.say(line)?;
        if let Some(transcript) = self.transcript.as_mut() {
            transcript
                .write_line(line)
                .map_err(SessionError::Transcript)?;
        }
        self.report.lines_relayed += 1;
        Ok(())
    }

    fn say(&mut self, text: &str) -> Result<(), SessionError> {
        writeln!(self.console, "{text}")
            .and_then(|()| self.console.flush())
            .map_err(SessionError::Console)
    }
}
