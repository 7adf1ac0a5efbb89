//! End-to-end run: pick the port, open the transcript and the connection,
//! then hand over to a [`Session`].
//!
//! Everything that touches the machine (port enumeration, opening the device,
//! waiting) goes through [`Host`], so the whole flow including exit codes can
//! be exercised against a mock device.

use crate::config::Config;
use crate::discovery::{self, PortListing};
use crate::error::RunnerError;
use crate::port::{PortConfiguration, PortError, SerialPortAdapter, SyncSerialPort};
use crate::session::{Pacer, Session, SessionReport, ThreadPacer};
use crate::signal::StopFlag;
use crate::transcript::Transcript;
use std::io::Write;
use std::path::PathBuf;
use tracing::{error, info, warn};

/// What the user asked for on the command line.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Invocation {
    /// Explicit port; `None` means auto-detect.
    pub port: Option<String>,
    /// Transcript destination, overwritten if it exists.
    pub output: Option<PathBuf>,
}

/// Access to serial hardware and wall-clock time.
pub trait Host {
    type Port: SerialPortAdapter;
    type Pacer: Pacer;

    fn list_ports(&self) -> Result<Vec<PortListing>, PortError>;

    fn open_port(&self, name: &str, config: &PortConfiguration) -> Result<Self::Port, PortError>;

    fn pacer(&self) -> Self::Pacer;
}

/// The machine we are running on.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemHost;

impl Host for SystemHost {
    type Port = SyncSerialPort;
    type Pacer = ThreadPacer;

    fn list_ports(&self) -> Result<Vec<PortListing>, PortError> {
        discovery::enumerate_ports()
    }

    fn open_port(&self, name: &str, config: &PortConfiguration) -> Result<SyncSerialPort, PortError> {
        SyncSerialPort::open(name, config)
    }

    fn pacer(&self) -> ThreadPacer {
        ThreadPacer
    }
}

/// Run the whole flow, print any failure, and return the process exit code.
pub fn execute<H: Host, O: Write>(
    host: &H,
    invocation: &Invocation,
    config: &Config,
    stop: StopFlag,
    console: &mut O,
) -> u8 {
    let result = run(host, invocation, config, stop, console);

    if let Err(ref e) = result {
        report_error(e, console);
    }

    let session_started = matches!(result, Ok(_) | Err(RunnerError::Session(_)));
    if session_started {
        if let Some(ref path) = invocation.output {
            let _ = writeln!(console, "\nResults saved to {}", path.display());
        }
    }

    match result {
        Ok(_) => 0,
        Err(e) => e.exit_code(),
    }
}

/// Run the whole flow without reporting; see [`execute`].
pub fn run<H: Host, O: Write>(
    host: &H,
    invocation: &Invocation,
    config: &Config,
    stop: StopFlag,
    console: &mut O,
) -> Result<SessionReport, RunnerError> {
    let port_name = match invocation.port {
        Some(ref port) => port.clone(),
        None => {
            let _ = writeln!(console, "Searching for Pico...");
            let port = find_port(host, config)?;
            let _ = writeln!(console, "Found Pico at {port}\n");
            port
        }
    };

    let transcript = match invocation.output {
        Some(ref path) => {
            let transcript =
                Transcript::create(path).map_err(|source| RunnerError::OutputFile {
                    path: path.clone(),
                    source,
                })?;
            let _ = writeln!(console, "Saving output to {}\n", path.display());
            Some(transcript)
        }
        None => None,
    };

    let _ = writeln!(console, "Connecting to {port_name}...");
    let port_config = config.port_configuration();
    // On failure `transcript` is dropped here, which closes the file.
    let port = host
        .open_port(&port_name, &port_config)
        .map_err(|source| RunnerError::Connect {
            port: port_name.clone(),
            source,
        })?;
    info!(port = %port_name, baud = port_config.baud_rate, "serial port opened");

    let mut session = Session::new(port, &mut *console, host.pacer(), config.session_settings())
        .with_stop_flag(stop);
    if let Some(transcript) = transcript {
        session = session.with_transcript(transcript);
    }

    Ok(session.run()?)
}

/// Auto-detect the device among the host's ports.
pub fn find_port<H: Host>(host: &H, config: &Config) -> Result<String, RunnerError> {
    let ports = host.list_ports().unwrap_or_else(|e| {
        warn!(error = %e, "port enumeration failed");
        Vec::new()
    });

    match config.discovery_rules().select(&ports) {
        Some(listing) => {
            info!(port = %listing.device, hwid = %listing.hwid, "test device detected");
            Ok(listing.device.clone())
        }
        None => Err(RunnerError::PortNotFound { available: ports }),
    }
}

/// Print `err` the way the user should see it.
pub fn report_error<O: Write>(err: &RunnerError, console: &mut O) {
    error!(error = %err, "run failed");

    let _ = match err {
        RunnerError::PortNotFound { available } => print_not_found(available, console),
        RunnerError::OutputFile { source, .. } => {
            writeln!(console, "ERROR: Failed to open output file: {source}")
        }
        RunnerError::Connect { source, .. } => writeln!(console, "ERROR: Failed to connect: {source}"),
        RunnerError::Config(_) => writeln!(console, "ERROR: {}", err.chain().join(": ")),
        RunnerError::Session(_) => print_trace(err, console),
    };
}

fn print_not_found<O: Write>(available: &[PortListing], console: &mut O) -> std::io::Result<()> {
    writeln!(console, "ERROR: Could not find Pico. Please specify port manually:")?;
    writeln!(console, "  run_tests <serial_port> [output_file]")?;
    writeln!(console, "\nAvailable ports:")?;
    if available.is_empty() {
        writeln!(console, "  (none)")?;
    }
    for listing in available {
        writeln!(console, "  {listing}")?;
    }
    Ok(())
}

fn print_trace<O: Write>(err: &RunnerError, console: &mut O) -> std::io::Result<()> {
    let chain = err.chain();
    writeln!(console, "\nERROR: {}", chain[0])?;
    for cause in &chain[1..] {
        writeln!(console, "  caused by: {cause}")?;
    }
    Ok(())
}
