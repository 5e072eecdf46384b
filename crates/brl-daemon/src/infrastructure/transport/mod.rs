//! OS-backed [`Transport`] implementations and the device opener.
//!
//! | Identifier            | Link                       | Protocol                    |
//! |-----------------------|----------------------------|-----------------------------|
//! | `serial:<path>`       | [`serial::SerialTransport`] | current, or legacy by option |
//! | `usb:` / `usb:<sn>`   | [`usb::UsbBulkTransport`]  | current                     |
//! | `usb:` (BC6xx)        | [`hid::HidTransport`]      | HID, model from product id  |

pub mod hid;
pub mod serial;
pub mod usb;

use brl_core::{ConnectParams, DeviceIdentifier, ProtocolVariant, Transport, TransportError, TransportOptions};
use tracing::debug;

/// An opened link and the connection parameters it implies.
pub struct OpenedTransport {
    pub transport: Box<dyn Transport>,
    pub params: ConnectParams,
}

/// Opens the device named by `identifier`.
///
/// # Errors
///
/// Whatever the serial or USB opener reports.
pub fn open_transport(identifier: &DeviceIdentifier, options: &TransportOptions) -> Result<OpenedTransport, TransportError> {
    match identifier {
        DeviceIdentifier::Serial { path } => {
            let transport = serial::SerialTransport::open(path, options)?;
            let kind = transport.kind();
            let params = ConnectParams::new(ProtocolVariant::for_serial(options.legacy_firmware))
                .with_rewrite_interval(kind.rewrite_interval());
            Ok(OpenedTransport { transport: Box::new(transport), params })
        }
        DeviceIdentifier::Usb { serial_number } => {
            let opened = usb::open_usb(serial_number.as_deref(), options)?;
            debug!(
                "USB channel {:04X}:{:04X} selected",
                opened.channel.vendor, opened.channel.product
            );
            let params = ConnectParams::new(ProtocolVariant::for_usb_channel(opened.channel))
                .with_model(opened.channel.model)
                .with_rewrite_interval(opened.transport.kind().rewrite_interval());
            Ok(OpenedTransport { transport: opened.transport, params })
        }
    }
}
