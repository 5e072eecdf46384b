//! Serial-port transport (`serial:/dev/ttyS0`, `COM3`).
//!
//! The port is opened 8N1 without flow control.  Reads block for at most
//! the input timeout, so a silent display surfaces as `Ok(0)` rather than a
//! hung thread.

use std::io::{self, Read, Write};
use std::time::{Duration, Instant};

use brl_core::transport::serial_write_delay;
use brl_core::{Transport, TransportError, TransportKind, TransportOptions};
use serialport::{ClearBuffer, DataBits, FlowControl, Parity, SerialPort, StopBits};
use tracing::debug;

/// Granularity of [`SerialTransport::await_input`] polling.
const POLL_STEP: Duration = Duration::from_millis(5);

pub struct SerialTransport {
    path: String,
    port: Option<Box<dyn SerialPort>>,
    options: TransportOptions,
}

impl SerialTransport {
    /// Opens `path` at the configured baud rate.
    ///
    /// # Errors
    ///
    /// [`TransportError::DeviceNotFound`] if the port does not exist,
    /// [`TransportError::Open`] for any other failure.
    pub fn open(path: &str, options: &TransportOptions) -> Result<Self, TransportError> {
        let port = serialport::new(path, options.baud_rate)
            .data_bits(DataBits::Eight)
            .parity(Parity::None)
            .stop_bits(StopBits::One)
            .flow_control(FlowControl::None)
            .timeout(options.input_timeout)
            .open()
            .map_err(|e| match e.kind() {
                serialport::ErrorKind::NoDevice => TransportError::DeviceNotFound(path.to_string()),
                serialport::ErrorKind::Io(io::ErrorKind::NotFound) => TransportError::DeviceNotFound(path.to_string()),
                _ => TransportError::Open { identifier: path.to_string(), reason: e.to_string() },
            })?;

        debug!(path, baud = options.baud_rate, "serial port opened");
        Ok(Self { path: path.to_string(), port: Some(port), options: options.clone() })
    }

    fn port(&mut self) -> Result<&mut Box<dyn SerialPort>, TransportError> {
        self.port.as_mut().ok_or_else(|| TransportError::lost("serial port closed"))
    }

    fn chars_per_second(&self) -> u32 {
        // One start bit, eight data bits, one stop bit.
        self.options.baud_rate / 10
    }
}

fn is_idle(error: &io::Error) -> bool {
    matches!(error.kind(), io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock | io::ErrorKind::Interrupted)
}

impl Transport for SerialTransport {
    fn kind(&self) -> TransportKind {
        TransportKind::Serial
    }

    fn reset(&mut self) -> Result<(), TransportError> {
        let baud_rate = self.options.baud_rate;
        let port = self.port()?;
        port.set_baud_rate(baud_rate).map_err(TransportError::lost)?;
        port.clear(ClearBuffer::All).map_err(TransportError::lost)
    }

    fn close(&mut self) {
        if self.port.take().is_some() {
            debug!(path = %self.path, "serial port closed");
        }
    }

    fn await_input(&mut self, timeout: Duration) -> Result<bool, TransportError> {
        let deadline = Instant::now() + timeout;
        loop {
            if self.port()?.bytes_to_read().map_err(TransportError::lost)? > 0 {
                return Ok(true);
            }
            let now = Instant::now();
            if now >= deadline {
                return Ok(false);
            }
            std::thread::sleep(POLL_STEP.min(deadline - now));
        }
    }

    fn read_bytes(&mut self, buffer: &mut [u8], wait: bool) -> Result<usize, TransportError> {
        let port = self.port()?;
        if !wait && port.bytes_to_read().map_err(TransportError::lost)? == 0 {
            return Ok(0);
        }

        match port.read(buffer) {
            Ok(count) => Ok(count),
            Err(e) if is_idle(&e) => Ok(0),
            Err(e) => Err(TransportError::Lost(e)),
        }
    }

    fn write_packet(&mut self, bytes: &[u8], delay: &mut Duration) -> Result<usize, TransportError> {
        let chars_per_second = self.chars_per_second();
        let port = self.port()?;
        port.write_all(bytes).and_then(|()| port.flush()).map_err(TransportError::Lost)?;
        *delay += serial_write_delay(bytes.len(), chars_per_second);
        Ok(bytes.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeouts_count_as_idle() {
        assert!(is_idle(&io::Error::from(io::ErrorKind::TimedOut)));
        assert!(is_idle(&io::Error::from(io::ErrorKind::WouldBlock)));
        assert!(!is_idle(&io::Error::from(io::ErrorKind::BrokenPipe)));
    }

    #[test]
    fn test_missing_port_is_not_found_or_open_error() {
        let result = SerialTransport::open("/dev/brld-test-no-such-port", &TransportOptions::default());

        assert!(matches!(
            result,
            Err(TransportError::DeviceNotFound(_) | TransportError::Open { .. })
        ));
    }
}
