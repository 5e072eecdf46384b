//! USB channel definitions of the supported displays.

use crate::domain::model::{DeviceModel, BC640, BC680};

/// One USB product the driver can talk to.
#[derive(Debug, PartialEq, Eq)]
pub struct UsbChannelDefinition {
    pub vendor: u16,
    pub product: u16,
    pub configuration: u8,
    pub interface: u8,
    pub alternative: u8,
    /// Endpoint number (without the direction bit).
    pub input_endpoint: u8,
    /// `None` means output goes through HID reports instead of an endpoint.
    pub output_endpoint: Option<u8>,
    /// Model implied by the product id, for devices that never announce one.
    pub model: Option<&'static DeviceModel>,
}

impl UsbChannelDefinition {
    /// Devices without an output endpoint speak the HID protocol.
    pub fn is_hid(&self) -> bool {
        self.output_endpoint.is_none()
    }

    pub fn matches(&self, vendor: u16, product: u16) -> bool {
        self.vendor == vendor && self.product == product
    }
}

pub static USB_CHANNELS: [UsbChannelDefinition; 3] = [
    // Alva 5nn
    UsbChannelDefinition {
        vendor: 0x06B0,
        product: 0x0001,
        configuration: 1,
        interface: 0,
        alternative: 0,
        input_endpoint: 1,
        output_endpoint: Some(2),
        model: None,
    },
    // Alva BC640
    UsbChannelDefinition {
        vendor: 0x0798,
        product: 0x0640,
        configuration: 1,
        interface: 0,
        alternative: 0,
        input_endpoint: 1,
        output_endpoint: None,
        model: Some(&BC640),
    },
    // Alva BC680
    UsbChannelDefinition {
        vendor: 0x0798,
        product: 0x0680,
        configuration: 1,
        interface: 0,
        alternative: 0,
        input_endpoint: 1,
        output_endpoint: None,
        model: Some(&BC680),
    },
];

/// Finds the channel definition for a vendor/product pair.
pub fn find_channel(vendor: u16, product: u16) -> Option<&'static UsbChannelDefinition> {
    USB_CHANNELS.iter().find(|channel| channel.matches(vendor, product))
}
