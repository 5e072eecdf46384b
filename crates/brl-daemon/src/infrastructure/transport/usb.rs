//! USB bulk-endpoint transport (Alva 5nn) and USB device discovery.
//!
//! [`open_usb`] walks the bus, matches each device against the channel
//! table and the optional serial number, and opens either a bulk link or,
//! for channels without an output endpoint, an HID link.

use std::collections::VecDeque;
use std::time::Duration;

use brl_core::transport::channel::{find_channel, UsbChannelDefinition};
use brl_core::{Transport, TransportError, TransportKind, TransportOptions};
use rusb::{DeviceHandle, GlobalContext};
use tracing::{debug, warn};

use super::hid::HidTransport;

const ENDPOINT_IN: u8 = 0x80;
const CHUNK_SIZE: usize = 64;
/// Read timeout when only already-arrived data is wanted.
const NO_WAIT: Duration = Duration::from_millis(1);

/// A USB link plus the channel it was matched against.
pub struct OpenedUsb {
    pub transport: Box<dyn Transport>,
    pub channel: &'static UsbChannelDefinition,
}

pub struct UsbBulkTransport {
    handle: Option<DeviceHandle<GlobalContext>>,
    channel: &'static UsbChannelDefinition,
    output_endpoint: u8,
    pending: VecDeque<u8>,
    options: TransportOptions,
}

fn usb_lost(error: rusb::Error) -> TransportError {
    TransportError::lost(error)
}

/// Opens the first supported display on the bus.
///
/// # Errors
///
/// [`TransportError::DeviceNotFound`] when no supported device (with the
/// requested serial number) is present; [`TransportError::Open`] when one is
/// present but cannot be claimed.
pub fn open_usb(serial_number: Option<&str>, options: &TransportOptions) -> Result<OpenedUsb, TransportError> {
    let requested = format!("usb:{}", serial_number.unwrap_or(""));
    let devices = rusb::devices().map_err(|e| TransportError::Open { identifier: requested.clone(), reason: e.to_string() })?;

    for device in devices.iter() {
        let Ok(descriptor) = device.device_descriptor() else {
            continue;
        };
        let Some(channel) = find_channel(descriptor.vendor_id(), descriptor.product_id()) else {
            continue;
        };

        if channel.is_hid() {
            match HidTransport::open(channel, serial_number, options) {
                Ok(transport) => return Ok(OpenedUsb { transport: Box::new(transport), channel }),
                Err(TransportError::DeviceNotFound(_)) => continue,
                Err(e) => return Err(e),
            }
        }

        let handle = match device.open() {
            Ok(handle) => handle,
            Err(e) => {
                warn!("USB device {:04X}:{:04X} not accessible: {e}", channel.vendor, channel.product);
                continue;
            }
        };

        if let Some(wanted) = serial_number {
            if !serial_number_matches(handle.read_serial_number_string_ascii(&descriptor), wanted) {
                continue;
            }
        }

        let transport = UsbBulkTransport::claim(handle, channel, options)?;
        return Ok(OpenedUsb { transport: Box::new(transport), channel });
    }

    Err(TransportError::DeviceNotFound(requested))
}

/// Compares a device's serial number with the requested one.  A descriptor
/// that cannot be read never matches.
fn serial_number_matches(read: Result<String, rusb::Error>, wanted: &str) -> bool {
    match read {
        Ok(actual) if actual == wanted => true,
        Ok(actual) => {
            debug!(wanted, actual = %actual, "USB serial number mismatch");
            false
        }
        Err(e) => {
            debug!(wanted, "USB serial number unreadable: {e}");
            false
        }
    }
}

impl UsbBulkTransport {
    fn claim(
        mut handle: DeviceHandle<GlobalContext>,
        channel: &'static UsbChannelDefinition,
        options: &TransportOptions,
    ) -> Result<Self, TransportError> {
        let identifier = format!("usb:{:04X}:{:04X}", channel.vendor, channel.product);
        let open_error = |e: rusb::Error| TransportError::Open { identifier: identifier.clone(), reason: e.to_string() };
        let output_endpoint = channel
            .output_endpoint
            .ok_or_else(|| TransportError::UnsupportedDevice(identifier.clone()))?;

        // Not available on every platform; claiming reports the real problem.
        let _ = handle.set_auto_detach_kernel_driver(true);
        if handle.active_configuration().map_err(open_error)? != channel.configuration {
            handle.set_active_configuration(channel.configuration).map_err(open_error)?;
        }
        handle.claim_interface(channel.interface).map_err(open_error)?;
        if channel.alternative != 0 {
            handle.set_alternate_setting(channel.interface, channel.alternative).map_err(open_error)?;
        }

        debug!(device = %identifier, "USB bulk interface claimed");
        Ok(Self { handle: Some(handle), channel, output_endpoint, pending: VecDeque::new(), options: options.clone() })
    }

    fn handle(&self) -> Result<&DeviceHandle<GlobalContext>, TransportError> {
        self.handle.as_ref().ok_or_else(|| TransportError::lost("USB device closed"))
    }

    /// Reads one bulk chunk into the pending queue.
    fn fill(&mut self, timeout: Duration) -> Result<usize, TransportError> {
        let mut chunk = [0u8; CHUNK_SIZE];
        let endpoint = ENDPOINT_IN | self.channel.input_endpoint;
        let result = self.handle()?.read_bulk(endpoint, &mut chunk, timeout);
        match result {
            Ok(count) => {
                self.pending.extend(&chunk[..count]);
                Ok(count)
            }
            Err(rusb::Error::Timeout) => Ok(0),
            Err(e) => Err(usb_lost(e)),
        }
    }
}

impl Transport for UsbBulkTransport {
    fn kind(&self) -> TransportKind {
        TransportKind::UsbBulk
    }

    fn reset(&mut self) -> Result<(), TransportError> {
        self.pending.clear();
        self.handle().map(|_| ())
    }

    fn close(&mut self) {
        if let Some(mut handle) = self.handle.take() {
            let _ = handle.release_interface(self.channel.interface);
        }
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
            let timeout = if wait { self.options.input_timeout } else { NO_WAIT };
            self.fill(timeout)?;
        }

        let count = buffer.len().min(self.pending.len());
        for (slot, byte) in buffer.iter_mut().zip(self.pending.drain(..count)) {
            *slot = byte;
        }
        Ok(count)
    }

    fn write_packet(&mut self, bytes: &[u8], _delay: &mut Duration) -> Result<usize, TransportError> {
        let timeout = self.options.request_timeout;
        let written = self.handle()?.write_bulk(self.output_endpoint, bytes, timeout).map_err(usb_lost)?;
        if written != bytes.len() {
            warn!("partial USB write: {written} of {} bytes", bytes.len());
        }
        Ok(written)
    }
}

impl Drop for UsbBulkTransport {
    fn drop(&mut self) {
        self.close();
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
