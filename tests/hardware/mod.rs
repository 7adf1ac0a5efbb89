//! Hardware-specific tests requiring a Pico running the test firmware.
//!
//! These tests are ignored by default and require actual hardware to run.
//! They should be run manually with the `--ignored` flag; set `TEST_PORT`
//! to skip auto-detection.

pub mod device_tests;
pub mod utils;
