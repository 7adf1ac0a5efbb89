//! Utility functions for hardware testing.
//!
//! Provides helpers for locating the device and timing utilities.

use pico2_test_runner::discovery::{enumerate_ports, DiscoveryRules, PortListing};
use pico2_test_runner::port::{PortConfiguration, DEFAULT_BAUD_RATE};
use std::env;
use std::time::{Duration, Instant};

/// Test port configuration from environment.
pub struct TestPortConfig {
    pub port_name: String,
    pub baud_rate: u32,
}

impl TestPortConfig {
    /// `TEST_PORT` if set, otherwise the auto-detected device.
    pub fn from_env() -> Option<Self> {
        let port_name = env::var("TEST_PORT").ok().or_else(detect_device)?;
        let baud_rate = env::var("TEST_BAUD")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(DEFAULT_BAUD_RATE);

        Some(TestPortConfig {
            port_name,
            baud_rate,
        })
    }

    pub fn to_port_config(&self) -> PortConfiguration {
        PortConfiguration {
            baud_rate: self.baud_rate,
            timeout: Duration::from_millis(1000),
        }
    }
}

/// Device path of the first port the default rules accept.
pub fn detect_device() -> Option<String> {
    let ports = enumerate_ports().ok()?;
    DiscoveryRules::default()
        .select(&ports)
        .map(|listing| listing.device.clone())
}

/// Print available ports for debugging.
pub fn print_available_ports() {
    let ports: Vec<PortListing> = enumerate_ports().unwrap_or_default();
    if ports.is_empty() {
        println!("No serial ports detected on this system");
        return;
    }

    println!("Available serial ports ({}):", ports.len());
    for (idx, port) in ports.iter().enumerate() {
        println!("  {}. {} [{}]", idx + 1, port, port.hwid);
    }
}

/// Skip test if hardware is not available.
pub fn skip_without_hardware() -> Option<TestPortConfig> {
    let config = TestPortConfig::from_env();
    if config.is_none() {
        println!("Skipping hardware test: TEST_PORT not set and no device detected");
        print_available_ports();
    }
    config
}

/// Timing helper for measuring operation duration.
pub struct TimingHelper {
    start: Instant,
    name: String,
}

impl TimingHelper {
    pub fn new(name: &str) -> Self {
        println!("Starting: {}", name);
        TimingHelper {
            start: Instant::now(),
            name: name.to_string(),
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }
}

impl Drop for TimingHelper {
    fn drop(&mut self) {
        println!("Completed: {} in {:?}", self.name, self.elapsed());
    }
}
