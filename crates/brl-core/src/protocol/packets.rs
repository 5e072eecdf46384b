//! Packet layouts.
//!
//! Host → display (current protocol):
//!
//! ```text
//! cells:      0D 1B 'B' start count cell... 0D
//! function:   1B 'F' 'U' 'N' code 0D
//! parameter:  1B 'P' 'A' 03 00 parameter value 0D
//! ```
//!
//! Host → display (HID protocol):
//!
//! ```text
//! cells:      02 start count cell...
//! ```
//!
//! Display → host packets are classified by [`CurrentPacket::classify`] and
//! [`HidReport::parse`].

/// First byte of a configuration packet.
pub const PACKET_CONFIGURATION: u8 = 0x7F;
/// First byte of an identification packet.
pub const PACKET_IDENTIFICATION: u8 = 0x1B;
/// Operating and status keys.
pub const PACKET_OPERATING_KEYS: u8 = 0x71;
/// Lower routing row.
pub const PACKET_PRIMARY_ROUTING: u8 = 0x72;
/// Upper routing row.
pub const PACKET_SECONDARY_ROUTING: u8 = 0x75;
/// Speech and braille pads.
pub const PACKET_PAD_KEYS: u8 = 0x77;

/// Every even offset ≥ 2 of a configuration packet holds this marker.
pub const CONFIG_MARKER: u8 = 0x7E;

/// `ESC 'I' 'D' '='` followed by the model identifier.
pub const ID_PREFIX: [u8; 4] = [0x1B, b'I', b'D', b'='];

/// Configuration codes (byte 1 of a configuration packet).
pub const CONFIG_CELLS_RECONFIGURED: u8 = 0x07;
pub const CONFIG_PARAMETERS_RECONFIGURED: u8 = 0x0B;

/// Function codes.
pub const FUNCTION_IDENTIFY: u8 = 0x06;
pub const FUNCTION_EXTENDED_STATUS: u8 = 0x07;
pub const FUNCTION_DISPLAY_PARAMETERS: u8 = 0x0B;

/// Parameter numbers.
pub const PARAMETER_FIRMNESS: u8 = 3;
pub const PARAMETER_FRONT_KEYS: u8 = 6;

/// Front-keys bit that turns PROG into a local menu key on the display.
pub const FRONT_KEYS_PROG: u8 = 0x02;

/// HID input report carrying one key transition.
pub const REPORT_KEYS: u8 = 0x04;
/// HID output report carrying cells.
pub const REPORT_CELLS: u8 = 0x02;
/// HID feature report describing the display.
pub const FEATURE_CONFIGURATION: u8 = 0x05;

/// HID release flag in the group byte.
pub const HID_RELEASE: u8 = 0x80;
/// HID routing group and its secondary-row flag.
pub const HID_GROUP_ROUTING: u8 = 0x74;
pub const HID_ROUTING_SECONDARY: u8 = 0x80;
/// HID group/key that announces a configuration change.
pub const HID_GROUP_SYSTEM: u8 = 0x01;
pub const HID_KEY_RECONFIGURED: u8 = 0x01;

// ── Builders ──────────────────────────────────────────────────────────────────

/// `1B 'F' 'U' 'N' code 0D`.
pub const fn function_packet(code: u8) -> [u8; 6] {
    [0x1B, b'F', b'U', b'N', code, b'\r']
}

/// `1B 'P' 'A' 03 00 parameter value 0D`.
pub const fn parameter_packet(parameter: u8, value: u8) -> [u8; 8] {
    [0x1B, b'P', b'A', 3, 0, parameter, value, b'\r']
}

/// Cells packet of the current protocol.
pub fn cells_packet(start: u8, cells: &[u8]) -> Vec<u8> {
    let mut packet = Vec::with_capacity(cells.len() + 6);
    packet.extend_from_slice(&[b'\r', 0x1B, b'B', start, cell_count(cells)]);
    packet.extend_from_slice(cells);
    packet.push(b'\r');
    packet
}

/// Cells report of the HID protocol.
pub fn hid_cells_packet(start: u8, cells: &[u8]) -> Vec<u8> {
    let mut packet = Vec::with_capacity(cells.len() + 3);
    packet.extend_from_slice(&[REPORT_CELLS, start, cell_count(cells)]);
    packet.extend_from_slice(cells);
    packet
}

fn cell_count(cells: &[u8]) -> u8 {
    u8::try_from(cells.len()).unwrap_or(u8::MAX)
}

// ── Parsers ───────────────────────────────────────────────────────────────────

/// Geometry fields of a `7F 07` notice.  Absent fields are `None`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CellConfiguration {
    pub status_cells: Option<u8>,
    pub text_columns: Option<u8>,
}

impl CellConfiguration {
    /// Element 3 (byte 9) is the status cell count, element 4 (byte 11)
    /// the text column count.
    pub fn parse(packet: &[u8]) -> Self {
        let count = packet.get(3).copied().unwrap_or(0);
        Self {
            status_cells: if count >= 3 { packet.get(9).copied() } else { None },
            text_columns: if count >= 4 { packet.get(11).copied() } else { None },
        }
    }
}

/// Front-keys setting from a `7F 0B` notice (element 8, byte 19).
pub fn front_keys(packet: &[u8]) -> Option<u8> {
    let count = packet.get(3).copied().unwrap_or(0);
    if count >= 8 {
        packet.get(19).copied()
    } else {
        None
    }
}

/// Model identifier of an identification packet.
pub fn identification(packet: &[u8]) -> Option<u8> {
    if packet.len() > ID_PREFIX.len() && packet.starts_with(&ID_PREFIX) {
        Some(packet[ID_PREFIX.len()])
    } else {
        None
    }
}

/// A classified current-protocol packet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CurrentPacket {
    OperatingKey(u8),
    PrimaryRouting(u8),
    SecondaryRouting(u8),
    PadKey(u8),
    CellsReconfigured(CellConfiguration),
    ParametersReconfigured { front_keys: Option<u8> },
    Identification(u8),
    Unexpected,
}

impl CurrentPacket {
    pub fn classify(packet: &[u8]) -> Self {
        let second = packet.get(1).copied();
        match (packet.first().copied(), second) {
            (Some(PACKET_OPERATING_KEYS), Some(code)) => CurrentPacket::OperatingKey(code),
            (Some(PACKET_PRIMARY_ROUTING), Some(code)) => CurrentPacket::PrimaryRouting(code),
            (Some(PACKET_SECONDARY_ROUTING), Some(code)) => CurrentPacket::SecondaryRouting(code),
            (Some(PACKET_PAD_KEYS), Some(code)) => CurrentPacket::PadKey(code),
            (Some(PACKET_CONFIGURATION), Some(CONFIG_CELLS_RECONFIGURED)) => {
                CurrentPacket::CellsReconfigured(CellConfiguration::parse(packet))
            }
            (Some(PACKET_CONFIGURATION), Some(CONFIG_PARAMETERS_RECONFIGURED)) => {
                CurrentPacket::ParametersReconfigured { front_keys: front_keys(packet) }
            }
            _ => match identification(packet) {
                Some(identifier) => CurrentPacket::Identification(identifier),
                None => CurrentPacket::Unexpected,
            },
        }
    }
}

/// A BC6xx key report `[04, key, group]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HidReport {
    pub key: u8,
    pub group: u8,
    pub release: bool,
}

impl HidReport {
    pub fn parse(packet: &[u8]) -> Option<Self> {
        match packet {
            [REPORT_KEYS, key, group, ..] => Some(Self {
                key: *key,
                group: group & !HID_RELEASE,
                release: group & HID_RELEASE != 0,
            }),
            _ => None,
        }
    }
}

/// Text column count from HID feature report 5 (byte 6).
pub fn hid_columns(report: &[u8]) -> Option<u8> {
    report.get(6).copied()
}

// ── Tests ─────────────────────────────────────────────────────────────────────
