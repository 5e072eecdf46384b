//! USB HID transport for displays without a bulk output endpoint (BC6xx).
//!
//! Input reports are queued byte-wise so the HID framer sees the same byte
//! stream it would on any other link.  Output packets already start with
//! their report id.

use std::collections::VecDeque;
use std::time::Duration;

use brl_core::transport::channel::UsbChannelDefinition;
use brl_core::{Transport, TransportError, TransportKind, TransportOptions};
use hidapi::{HidApi, HidDevice};
use tracing::debug;

const REPORT_SIZE: usize = 64;

pub struct HidTransport {
    device: Option<HidDevice>,
    pending: VecDeque<u8>,
    options: TransportOptions,
}

fn hid_lost(error: hidapi::HidError) -> TransportError {
    TransportError::lost(error.to_string())
}

fn millis(duration: Duration) -> i32 {
    i32::try_from(duration.as_millis()).unwrap_or(i32::MAX)
}

impl HidTransport {
    /// Opens the first HID device matching `channel` and, when given,
    /// `serial_number`.
    ///
    /// # Errors
    ///
    /// [`TransportError::DeviceNotFound`] when nothing matches,
    /// [`TransportError::Open`] when the HID subsystem or device fails.
    pub fn open(
        channel: &UsbChannelDefinition,
        serial_number: Option<&str>,
        options: &TransportOptions,
    ) -> Result<Self, TransportError> {
        let identifier = format!("usb:{:04X}:{:04X}", channel.vendor, channel.product);
        let open_error = |e: hidapi::HidError| TransportError::Open { identifier: identifier.clone(), reason: e.to_string() };

        let api = HidApi::new().map_err(open_error)?;
        let info = api
            .device_list()
            .find(|d| {
                channel.matches(d.vendor_id(), d.product_id())
                    && serial_number.map_or(true, |wanted| d.serial_number() == Some(wanted))
            })
            .ok_or_else(|| TransportError::DeviceNotFound(identifier.clone()))?;
        let device = info.open_device(&api).map_err(open_error)?;

        debug!(device = %identifier, "HID device opened");
        Ok(Self { device: Some(device), pending: VecDeque::new(), options: options.clone() })
    }

    fn device(&self) -> Result<&HidDevice, TransportError> {
        self.device.as_ref().ok_or_else(|| TransportError::lost("HID device closed"))
    }

    /// Reads one input report into the pending queue.
    fn fill(&mut self, timeout: Duration) -> Result<usize, TransportError> {
        let mut report = [0u8; REPORT_SIZE];
        let count = self.device()?.read_timeout(&mut report, millis(timeout)).map_err(hid_lost)?;
        self.pending.extend(&report[..count]);
        Ok(count)
    }
}

impl Transport for HidTransport {
    fn kind(&self) -> TransportKind {
        TransportKind::UsbHid
    }

    fn reset(&mut self) -> Result<(), TransportError> {
        self.pending.clear();
        self.device().map(|_| ())
    }

    fn close(&mut self) {
        self.device = None;
        self.pending.clear();
    }

    fn await_input(&mut self, timeout: Duration) -> Result<bool, TransportError> {
        if !self.pending.is_empty() {
            return Ok(true);
        }
        Ok(self.fill(timeout)? > 0)
    }

    fn read_bytes(&mut self, buffer: &mut [u8], wait: bool) -> Result<usize, TransportError> {
        if self.pending.is_empty() {
            let timeout = if wait { self.options.input_timeout } else { Duration::ZERO };
            self.fill(timeout)?;
        }

        let count = buffer.len().min(self.pending.len());
        for (slot, byte) in buffer.iter_mut().zip(self.pending.drain(..count)) {
            *slot = byte;
        }
        Ok(count)
    }

    fn write_packet(&mut self, bytes: &[u8], _delay: &mut Duration) -> Result<usize, TransportError> {
        self.device()?.write(bytes).map_err(hid_lost)
    }

    fn get_feature_report(&mut self, report: u8, buffer: &mut [u8]) -> Result<usize, TransportError> {
        let Some(first) = buffer.first_mut() else {
            return Ok(0);
        };
        *first = report;
        self.device()?.get_feature_report(buffer).map_err(hid_lost)
    }
}
