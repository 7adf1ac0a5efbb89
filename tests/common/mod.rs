//! Shared test utilities for the runner's integration tests.
//!
//! - `ScriptedPacer`: records every wait and runs hooks on chosen waits, so a
//!   test can make data "arrive" while the session sleeps
//! - `FakeHost`: a `Host` backed by a mock port and a synthetic port list
//! - helpers for device replies and console capture

#![allow(dead_code)]

use pico2_test_runner::discovery::PortListing;
use pico2_test_runner::port::{
    MockController, MockSerialPort, PortConfiguration, PortError,
};
use pico2_test_runner::runner::Host;
use pico2_test_runner::session::Pacer;
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;
use std::time::Duration;

type Hook = Box<dyn FnMut()>;

#[derive(Default)]
struct PacerState {
    sleeps: Vec<Duration>,
    hooks: HashMap<usize, Hook>,
}

/// Pacer that never blocks.
///
/// Clones share state, so a clone can be handed to a session while the test
/// keeps the original for assertions.
#[derive(Clone, Default)]
pub struct ScriptedPacer {
    state: Rc<RefCell<PacerState>>,
}

impl ScriptedPacer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `hook` during the `index`-th wait (0-based; wait 0 is the settle
    /// delay).
    pub fn on_sleep(self, index: usize, hook: impl FnMut() + 'static) -> Self {
        self.state.borrow_mut().hooks.insert(index, Box::new(hook));
        self
    }

    pub fn sleeps(&self) -> Vec<Duration> {
        self.state.borrow().sleeps.clone()
    }

    pub fn sleep_count(&self) -> usize {
        self.state.borrow().sleeps.len()
    }
}

impl Pacer for ScriptedPacer {
    fn sleep(&mut self, duration: Duration) {
        // Release the borrow before the hook runs.
        let hook = {
            let mut state = self.state.borrow_mut();
            state.sleeps.push(duration);
            let index = state.sleeps.len() - 1;
            state.hooks.remove(&index)
        };
        if let Some(mut hook) = hook {
            hook();
        }
    }
}

/// A mock device whose controller stays with the test.
pub fn mock_device(name: &str) -> (MockSerialPort, MockController) {
    let port = MockSerialPort::new(name);
    let ctl = port.controller();
    (port, ctl)
}

/// Decode captured console output.
pub fn console_text(console: Vec<u8>) -> String {
    String::from_utf8(console).expect("console output is UTF-8")
}

/// `Host` with a synthetic port list and a single mock device.
pub struct FakeHost {
    pub ports: Vec<PortListing>,
    pub pacer: ScriptedPacer,
    device: RefCell<Option<MockSerialPort>>,
    open_error: Option<std::io::ErrorKind>,
    pub list_calls: Cell<usize>,
    pub opened: RefCell<Vec<(String, PortConfiguration)>>,
}

impl FakeHost {
    pub fn new(device: MockSerialPort) -> Self {
        Self {
            ports: Vec::new(),
            pacer: ScriptedPacer::new(),
            device: RefCell::new(Some(device)),
            open_error: None,
            list_calls: Cell::new(0),
            opened: RefCell::new(Vec::new()),
        }
    }

    pub fn with_ports(mut self, ports: Vec<PortListing>) -> Self {
        self.ports = ports;
        self
    }

    pub fn with_pacer(mut self, pacer: ScriptedPacer) -> Self {
        self.pacer = pacer;
        self
    }

    /// Make `open_port` fail with `kind`.
    pub fn failing_open(mut self, kind: std::io::ErrorKind) -> Self {
        self.open_error = Some(kind);
        self
    }

    pub fn opened_ports(&self) -> Vec<String> {
        self.opened.borrow().iter().map(|(name, _)| name.clone()).collect()
    }
}

impl Host for FakeHost {
    type Port = MockSerialPort;
    type Pacer = ScriptedPacer;

    fn list_ports(&self) -> Result<Vec<PortListing>, PortError> {
        self.list_calls.set(self.list_calls.get() + 1);
        Ok(self.ports.clone())
    }

    fn open_port(&self, name: &str, config: &PortConfiguration) -> Result<MockSerialPort, PortError> {
        self.opened
            .borrow_mut()
            .push((name.to_string(), config.clone()));

        if let Some(kind) = self.open_error {
            return Err(PortError::Io(std::io::Error::new(kind, "Device or resource busy")));
        }
        self.device
            .borrow_mut()
            .take()
            .ok_or_else(|| PortError::config("mock device already opened"))
    }

    fn pacer(&self) -> ScriptedPacer {
        self.pacer.clone()
    }
}

/// Typical port list of a development machine with one Pico attached.
pub fn sample_ports() -> Vec<PortListing> {
    vec![
        PortListing::new("/dev/ttyS0", "ttyS0", "PCI"),
        PortListing::new(
            "/dev/ttyUSB0",
            "CP2102 USB to UART Bridge Controller",
            "USB VID:PID=10C4:EA60 SER=0001",
        ),
        PortListing::new(
            "/dev/ttyACM0",
            "Pico",
            "USB VID:PID=2E8A:0009 SER=E6614C311B4B7A28",
        ),
    ]
}
