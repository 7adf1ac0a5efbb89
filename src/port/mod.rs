//! Port abstraction layer for serial communication.
//!
//! Provides the adapter trait plus a real and a mock implementation, so the
//! session runner can be exercised without hardware.

pub mod error;
pub mod mock;
pub mod sync_port;
pub mod traits;

pub use error::PortError;
pub use mock::{MockController, MockSerialPort};
pub use sync_port::SyncSerialPort;
pub use traits::*;
