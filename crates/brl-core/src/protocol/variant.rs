//! Protocol variant selection.
//!
//! Which protocol a display speaks is decided once, when the link is opened:
//! serial links use the current protocol unless the legacy-firmware option
//! is set, and USB links follow their channel definition (bulk endpoints
//! speak the current protocol, HID-only devices the HID protocol).

use std::fmt;

use crate::transport::channel::UsbChannelDefinition;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProtocolVariant {
    /// Variable-length packets (ABT3 new firmware, Delphi, Satellite, BS40, 5nn).
    Current,
    /// One byte per packet (ABT3 old firmware).
    Legacy,
    /// HID reports (BC640, BC680).
    Hid,
}

impl ProtocolVariant {
    pub fn for_serial(legacy_firmware: bool) -> Self {
        if legacy_firmware {
            ProtocolVariant::Legacy
        } else {
            ProtocolVariant::Current
        }
    }

    pub fn for_usb_channel(channel: &UsbChannelDefinition) -> Self {
        if channel.is_hid() {
            ProtocolVariant::Hid
        } else {
            ProtocolVariant::Current
        }
    }
}

impl fmt::Display for ProtocolVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ProtocolVariant::Current => "current",
            ProtocolVariant::Legacy => "legacy",
            ProtocolVariant::Hid => "hid",
        };
        f.write_str(name)
    }
}
