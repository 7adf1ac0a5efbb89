//! Mock serial port implementation for testing.
//!
//! Provides a `MockSerialPort` that behaves like a device console without
//! requiring hardware. Incoming data is modelled as bursts: each burst becomes
//! visible to `bytes_to_read` only once the previous one has been consumed,
//! which mirrors how a USB CDC endpoint hands over one packet at a time.

use super::error::PortError;
use super::traits::SerialPortAdapter;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;

#[derive(Debug, Default)]
struct MockPortState {
    /// Bursts waiting to be read.
    read_queue: VecDeque<Vec<u8>>,
    /// Bursts released into `read_queue` by the next write.
    responses: VecDeque<Vec<u8>>,
    /// Every write, in order.
    write_log: Vec<Vec<u8>>,
    /// Error kind returned by the next read-side call.
    pending_error: Option<std::io::ErrorKind>,
    flush_count: usize,
    clear_count: usize,
    closed: bool,
}

/// Mock serial port implementation for testing.
///
/// The port itself is handed to the code under test; a [`MockController`]
/// obtained from [`MockSerialPort::controller`] keeps access to the shared
/// state so a test can feed data and inspect what happened, even after the
/// port has been dropped.
///
/// # Example
/// ```
/// use pico2_test_runner::port::{MockSerialPort, SerialPortAdapter};
///
/// let mut port = MockSerialPort::new("MOCK0");
/// let ctl = port.controller();
///
/// ctl.enqueue_read(b"READY\r\n");
/// assert_eq!(port.bytes_to_read().unwrap(), 7);
///
/// let mut buffer = [0u8; 16];
/// let n = port.read_bytes(&mut buffer).unwrap();
/// assert_eq!(&buffer[..n], b"READY\r\n");
///
/// port.send_all(b"TEST_ALL\n").unwrap();
/// assert_eq!(ctl.written(), b"TEST_ALL\n");
///
/// drop(port);
/// assert!(ctl.is_closed());
/// ```
pub struct MockSerialPort {
    name: String,
    state: Arc<Mutex<MockPortState>>,
}

/// Test-side handle onto a [`MockSerialPort`]'s shared state.
#[derive(Clone)]
pub struct MockController {
    state: Arc<Mutex<MockPortState>>,
}

impl MockSerialPort {
    /// Create a new mock serial port with the given name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            state: Arc::new(Mutex::new(MockPortState::default())),
        }
    }

    /// Get a controller sharing this port's state.
    pub fn controller(&self) -> MockController {
        MockController {
            state: Arc::clone(&self.state),
        }
    }

    fn take_error(state: &mut MockPortState) -> Result<(), PortError> {
        match state.pending_error.take() {
            Some(kind) => Err(PortError::Io(std::io::Error::new(
                kind,
                "injected mock failure",
            ))),
            None => Ok(()),
        }
    }
}

impl MockController {
    /// Queue a burst that is readable immediately.
    pub fn enqueue_read(&self, data: &[u8]) {
        self.state.lock().read_queue.push_back(data.to_vec());
    }

    /// Queue a burst that only arrives after the next write, the way the
    /// device answers a command.
    pub fn respond_with(&self, data: &[u8]) {
        self.state.lock().responses.push_back(data.to_vec());
    }

    /// Make the next `bytes_to_read` or `read_bytes` call fail.
    pub fn fail_next_read(&self, kind: std::io::ErrorKind) {
        self.state.lock().pending_error = Some(kind);
    }

    /// All writes concatenated.
    pub fn written(&self) -> Vec<u8> {
        self.state.lock().write_log.concat()
    }

    /// Get a copy of every individual write.
    pub fn write_log(&self) -> Vec<Vec<u8>> {
        self.state.lock().write_log.clone()
    }

    /// Number of bytes still waiting to be read.
    pub fn available_bytes(&self) -> usize {
        self.state.lock().read_queue.iter().map(Vec::len).sum()
    }

    /// How many times the input buffer was cleared.
    pub fn clear_count(&self) -> usize {
        self.state.lock().clear_count
    }

    /// How many times the port was flushed.
    pub fn flush_count(&self) -> usize {
        self.state.lock().flush_count
    }

    /// Whether the port handle has been dropped.
    pub fn is_closed(&self) -> bool {
        self.state.lock().closed
    }
}

impl SerialPortAdapter for MockSerialPort {
    fn write_bytes(&mut self, data: &[u8]) -> Result<usize, PortError> {
        let mut state = self.state.lock();
        state.write_log.push(data.to_vec());
        let released: Vec<_> = state.responses.drain(..).collect();
        state.read_queue.extend(released);
        Ok(data.len())
    }

    fn flush(&mut self) -> Result<(), PortError> {
        self.state.lock().flush_count += 1;
        Ok(())
    }

    fn read_bytes(&mut self, buffer: &mut [u8]) -> Result<usize, PortError> {
        let mut state = self.state.lock();
        Self::take_error(&mut state)?;

        let Some(front) = state.read_queue.front_mut() else {
            return Err(PortError::Io(std::io::Error::new(
                std::io::ErrorKind::TimedOut,
                "No data available",
            )));
        };

        let n = buffer.len().min(front.len());
        buffer[..n].copy_from_slice(&front[..n]);
        front.drain(..n);
        if front.is_empty() {
            state.read_queue.pop_front();
        }
        Ok(n)
    }

    fn bytes_to_read(&self) -> Result<usize, PortError> {
        let mut state = self.state.lock();
        Self::take_error(&mut state)?;
        Ok(state.read_queue.front().map_or(0, Vec::len))
    }

    fn clear_input(&mut self) -> Result<(), PortError> {
        let mut state = self.state.lock();
        state.read_queue.clear();
        state.clear_count += 1;
        Ok(())
    }

    fn name(&self) -> &str {
        &self.name
    }
}

impl Drop for MockSerialPort {
    fn drop(&mut self) {
        self.state.lock().closed = true;
    }
}

impl std::fmt::Debug for MockSerialPort {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockSerialPort")
            .field("name", &self.name)
            .field("queued_bursts", &self.state.lock().read_queue.len())
            .finish()
    }
}
