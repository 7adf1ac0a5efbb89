//! Serial port enumeration and test-device selection.
//!
//! The Pico 2 enumerates as a USB CDC device with vendor ID `2E8A`
//! (Raspberry Pi). Depending on the host, either the product string carries
//! "Pico" or only the VID is visible, so both are checked.

use crate::port::PortError;
use serialport::{SerialPortInfo, SerialPortType};
use std::fmt;
use tracing::debug;

/// Substring looked for in the port description.
pub const DEFAULT_DESCRIPTION_MARKER: &str = "Pico";

/// Raspberry Pi USB vendor ID, looked for in the hardware id.
pub const DEFAULT_HWID_MARKER: &str = "2E8A";

/// One enumerated serial port, flattened for display and matching.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortListing {
    /// OS identifier passed to `open` (`/dev/ttyACM0`, `COM5`, ...).
    pub device: String,
    /// Human-readable description.
    pub description: String,
    /// Hardware id, e.g. `USB VID:PID=2E8A:0009 SER=E6614C311B4B7A28`.
    pub hwid: String,
}

impl PortListing {
    pub fn new(
        device: impl Into<String>,
        description: impl Into<String>,
        hwid: impl Into<String>,
    ) -> Self {
        Self {
            device: device.into(),
            description: description.into(),
            hwid: hwid.into(),
        }
    }
}

impl From<&SerialPortInfo> for PortListing {
    fn from(info: &SerialPortInfo) -> Self {
        let (description, hwid) = match &info.port_type {
            SerialPortType::UsbPort(usb) => {
                let description = usb
                    .product
                    .clone()
                    .or_else(|| usb.manufacturer.clone())
                    .unwrap_or_else(|| info.port_name.clone());
                let mut hwid = format!("USB VID:PID={:04X}:{:04X}", usb.vid, usb.pid);
                if let Some(ref serial) = usb.serial_number {
                    hwid.push_str(" SER=");
                    hwid.push_str(serial);
                }
                (description, hwid)
            }
            SerialPortType::PciPort => (info.port_name.clone(), "PCI".to_string()),
            SerialPortType::BluetoothPort => (info.port_name.clone(), "BLUETOOTH".to_string()),
            SerialPortType::Unknown => ("n/a".to_string(), "n/a".to_string()),
        };

        Self {
            device: info.port_name.clone(),
            description,
            hwid,
        }
    }
}

impl fmt::Display for PortListing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.device, self.description)
    }
}

/// How the test device is recognised among enumerated ports.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveryRules {
    /// Matched case-sensitively against the description.
    pub description_marker: String,
    /// Matched case-insensitively against the hardware id.
    pub hwid_marker: String,
}

impl Default for DiscoveryRules {
    fn default() -> Self {
        Self {
            description_marker: DEFAULT_DESCRIPTION_MARKER.to_string(),
            hwid_marker: DEFAULT_HWID_MARKER.to_string(),
        }
    }
}

impl DiscoveryRules {
    pub fn matches(&self, listing: &PortListing) -> bool {
        let by_description = !self.description_marker.is_empty()
            && listing.description.contains(&self.description_marker);
        let by_hwid = !self.hwid_marker.is_empty()
            && listing
                .hwid
                .to_uppercase()
                .contains(&self.hwid_marker.to_uppercase());
        by_description || by_hwid
    }

    /// First listing that matches, in enumeration order.
    pub fn select<'a>(&self, ports: &'a [PortListing]) -> Option<&'a PortListing> {
        ports.iter().find(|listing| self.matches(listing))
    }
}

/// Enumerate every serial port the OS reports.
pub fn enumerate_ports() -> Result<Vec<PortListing>, PortError> {
    let ports = serialport::available_ports()?;
    debug!(count = ports.len(), "enumerated serial ports");
    Ok(ports.iter().map(PortListing::from).collect())
}
