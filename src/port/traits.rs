//! Core traits for serial port abstraction.
//!
//! Defines the `SerialPortAdapter` trait so the session runner can drive
//! either a real serial port or a scripted mock.

use super::error::PortError;
use std::time::Duration;

/// Baud rate the test firmware's USB CDC console is configured for.
pub const DEFAULT_BAUD_RATE: u32 = 115_200;

/// Per-read timeout, also used as the idle poll interval.
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(1);

/// Connection parameters for the device console.
///
/// The firmware speaks 8N1 without flow control, so only the rate and the
/// read timeout are configurable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortConfiguration {
    /// Baud rate (bits per second).
    pub baud_rate: u32,

    /// Per-read timeout.
    pub timeout: Duration,
}

impl Default for PortConfiguration {
    fn default() -> Self {
        Self {
            baud_rate: DEFAULT_BAUD_RATE,
            timeout: DEFAULT_READ_TIMEOUT,
        }
    }
}

/// Trait for serial port I/O operations.
///
/// Dropping an adapter closes the underlying handle.
pub trait SerialPortAdapter: Send + std::fmt::Debug {
    /// Write bytes to the serial port.
    ///
    /// Returns the number of bytes actually written.
    fn write_bytes(&mut self, data: &[u8]) -> Result<usize, PortError>;

    /// Push any buffered outgoing bytes onto the wire.
    fn flush(&mut self) -> Result<(), PortError>;

    /// Read bytes from the serial port into the provided buffer.
    ///
    /// Returns the number of bytes actually read.
    fn read_bytes(&mut self, buffer: &mut [u8]) -> Result<usize, PortError>;

    /// Number of bytes received and waiting to be read.
    fn bytes_to_read(&self) -> Result<usize, PortError>;

    /// Discard everything sitting in the receive buffer.
    fn clear_input(&mut self) -> Result<(), PortError>;

    /// Get the name/path of this serial port.
    fn name(&self) -> &str;

    /// Write the whole buffer, looping over short writes, then flush.
    fn send_all(&mut self, mut data: &[u8]) -> Result<(), PortError> {
        while !data.is_empty() {
            let written = self.write_bytes(data)?;
            if written == 0 {
                return Err(PortError::Io(std::io::Error::new(
                    std::io::ErrorKind::WriteZero,
                    "serial port accepted no bytes",
                )));
            }
            data = &data[written..];
        }
        self.flush()
    }
}
