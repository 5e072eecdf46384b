//! Byte transport between the driver and the display.
//!
//! [`Transport`] is the seam between the protocol engine and the OS.  The
//! daemon implements it for serial ports, USB bulk endpoints and USB HID
//! devices; tests use `mock::ScriptedTransport`, compiled for this crate's
//! tests and for dependents that enable the `test-support` feature.
//!
//! # Idle versus lost
//!
//! A transport distinguishes "nothing to read yet" from "the device is
//! gone":
//!
//! | Situation            | `read_bytes`              | `await_input`    |
//! |----------------------|---------------------------|------------------|
//! | data available       | `Ok(n)` with `n > 0`      | `Ok(true)`       |
//! | idle / timed out     | `Ok(0)`                   | `Ok(false)`      |
//! | device disconnected  | `Err(TransportError::Lost)` | `Err(Lost)`    |

pub mod channel;
pub mod identifier;
#[cfg(any(test, feature = "test-support"))]
pub mod mock;

use std::io;
use std::time::Duration;

use thiserror::Error;

pub use identifier::DeviceIdentifier;

/// Errors raised by a transport.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The link failed; the device is assumed disconnected.
    #[error("transport lost: {0}")]
    Lost(#[source] io::Error),

    /// The operation does not exist on this kind of link.
    #[error("operation not supported by this transport")]
    NotSupported,

    /// The device identifier names a transport kind that is not available.
    #[error("unsupported device identifier: {0}")]
    UnsupportedDevice(String),

    /// No device matched the identifier.
    #[error("no matching device found for {0}")]
    DeviceNotFound(String),

    /// The device exists but could not be opened or configured.
    #[error("failed to open {identifier}: {reason}")]
    Open { identifier: String, reason: String },
}

impl TransportError {
    /// Convenience constructor for [`TransportError::Lost`].
    pub fn lost(error: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        TransportError::Lost(io::Error::new(io::ErrorKind::Other, error))
    }
}

/// The physical kind of an opened link.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportKind {
    Serial,
    UsbBulk,
    UsbHid,
}

impl TransportKind {
    /// How often the whole display is rewritten even without changes.
    /// Serial lines may drop bytes silently; USB links do not.
    pub fn rewrite_interval(self) -> Option<Duration> {
        match self {
            TransportKind::Serial => Some(Duration::from_secs(10)),
            TransportKind::UsbBulk | TransportKind::UsbHid => None,
        }
    }
}

/// Tunables shared by every transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportOptions {
    /// Serial line speed.
    pub baud_rate: u32,
    /// How long to wait for each further byte of an in-progress packet.
    pub input_timeout: Duration,
    /// Timeout for USB control and output requests.
    pub request_timeout: Duration,
    /// Serial displays run the one-byte protocol of old ABT3 firmware.
    pub legacy_firmware: bool,
}

impl Default for TransportOptions {
    fn default() -> Self {
        Self {
            baud_rate: 9600,
            input_timeout: Duration::from_millis(100),
            request_timeout: Duration::from_millis(1000),
            legacy_firmware: false,
        }
    }
}

/// A bidirectional byte link to one display.
///
/// Implementations must be `Send` so that a connection can be moved onto
/// the control-loop thread.
#[cfg_attr(test, mockall::automock)]
pub trait Transport: Send {
    fn kind(&self) -> TransportKind;

    /// Restores the link to a known state (line settings, flushed buffers).
    fn reset(&mut self) -> Result<(), TransportError>;

    /// Releases the device.  Further calls fail with `Lost`.
    fn close(&mut self);

    /// Waits up to `timeout` for input.  `Ok(false)` means the link stayed idle.
    fn await_input(&mut self, timeout: Duration) -> Result<bool, TransportError>;

    /// Reads up to `buffer.len()` bytes.
    ///
    /// With `wait == false` only already-buffered bytes are returned; with
    /// `wait == true` the transport's short input timeout applies.
    /// `Ok(0)` means no data arrived in time.
    fn read_bytes(&mut self, buffer: &mut [u8], wait: bool) -> Result<usize, TransportError>;

    /// Writes one complete packet and adds the time the device needs to
    /// absorb it to `delay`.
    fn write_packet(&mut self, bytes: &[u8], delay: &mut Duration) -> Result<usize, TransportError>;

    /// Reads HID feature report `report` into `buffer` (byte 0 is the
    /// report id).
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::NotSupported`] on links that are not HID.
    fn get_feature_report(&mut self, report: u8, buffer: &mut [u8]) -> Result<usize, TransportError> {
        let _ = (report, buffer);
        Err(TransportError::NotSupported)
    }
}

/// Serial write delay: the time `length` bytes take on the wire, plus one
/// millisecond, at `chars_per_second`.
pub fn serial_write_delay(length: usize, chars_per_second: u32) -> Duration {
    let cps = u64::from(chars_per_second.max(1));
    Duration::from_millis(length as u64 * 1000 / cps + 1)
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serial_write_delay_at_9600_baud() {
        // 960 characters per second: 96 bytes take 100 ms, plus one.
        assert_eq!(serial_write_delay(96, 960), Duration::from_millis(101));
        assert_eq!(serial_write_delay(0, 960), Duration::from_millis(1));
    }

    #[test]
    fn test_rewrite_interval_only_on_serial() {
        assert_eq!(TransportKind::Serial.rewrite_interval(), Some(Duration::from_secs(10)));
        assert_eq!(TransportKind::UsbBulk.rewrite_interval(), None);
        assert_eq!(TransportKind::UsbHid.rewrite_interval(), None);
    }

    #[test]
    fn test_default_options() {
        let options = TransportOptions::default();
        assert_eq!(options.baud_rate, 9600);
        assert_eq!(options.input_timeout, Duration::from_millis(100));
        assert!(!options.legacy_firmware);
    }

    #[test]
    fn test_mock_transport_reports_lost_on_read() {
        // Arrange
        let mut transport = MockTransport::new();
        transport
            .expect_read_bytes()
            .returning(|_, _| Err(TransportError::lost("unplugged")));

        // Act
        let mut byte = [0u8; 1];
        let result = transport.read_bytes(&mut byte, false);

        // Assert
        assert!(matches!(result, Err(TransportError::Lost(_))));
    }
}
