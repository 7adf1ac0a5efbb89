//! Tests against a real device.
//!
//! # Running Hardware Tests
//!
//! ```bash
//! export TEST_PORT=/dev/ttyACM0          # optional, auto-detected otherwise
//! export TEST_BAUD=115200                # optional
//!
//! cargo test --features hardware-tests -- --ignored --test-threads=1
//! ```

use super::utils::{skip_without_hardware, TimingHelper};
use pico2_test_runner::port::{SerialPortAdapter, SyncSerialPort};
use pico2_test_runner::session::{Session, SessionOutcome, SessionSettings, ThreadPacer};
use pico2_test_runner::transcript::Transcript;

#[test]
#[ignore]
fn test_device_open_and_clear() {
    let Some(config) = skip_without_hardware() else {
        return;
    };

    let mut port = SyncSerialPort::open(&config.port_name, &config.to_port_config())
        .expect("Failed to open device");
    port.clear_input().expect("Failed to clear input buffer");
    assert_eq!(port.name(), config.port_name);
}

#[test]
#[ignore]
fn test_full_suite_produces_summary() {
    let Some(config) = skip_without_hardware() else {
        return;
    };
    let _timer = TimingHelper::new("TEST_ALL session");

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("results.txt");
    let port = SyncSerialPort::open(&config.port_name, &config.to_port_config())
        .expect("Failed to open device");
    let mut console = Vec::new();

    let report = Session::new(port, &mut console, ThreadPacer, SessionSettings::default())
        .with_transcript(Transcript::create(&path).unwrap())
        .run()
        .expect("Session failed");

    assert_eq!(report.outcome, Some(SessionOutcome::Idle));
    assert!(report.lines_relayed > 0, "device sent nothing");
    assert!(
        !report.markers_seen.is_empty(),
        "no summary marker in:\n{}",
        String::from_utf8_lossy(&console)
    );
    println!("Verdict: {:?}", report.verdict());

    let text = std::fs::read_to_string(&path).unwrap();
    assert!(text.contains("TEST SUMMARY"));
}
