//! The Alva model table.
//!
//! Models announce themselves with a one-byte identifier on the current
//! protocol.  The BC6xx family never announces itself; its model is implied
//! by the USB product id (see [`crate::transport::channel`]).

/// A device model entry.  All entries are `'static` and immutable.
#[derive(Debug, PartialEq, Eq)]
pub struct DeviceModel {
    /// `None` for models that never announce themselves.
    pub identifier: Option<u8>,
    pub name: &'static str,
    pub text_columns: u8,
    pub status_cells: u8,
    pub flags: u8,
    pub help_page: u8,
}

impl DeviceModel {
    /// Supports runtime reconfiguration (extended status, display
    /// parameters, firmness).
    pub const CONFIGURABLE: u8 = 0x01;

    /// Every model of this family has a single text row.
    pub const TEXT_ROWS: u8 = 1;

    pub const fn is_configurable(&self) -> bool {
        self.flags & Self::CONFIGURABLE != 0
    }

    /// Looks up an announced identifier.
    pub fn lookup(identifier: u8) -> Option<&'static DeviceModel> {
        MODELS.iter().find(|model| model.identifier == Some(identifier))
    }
}

const fn model(identifier: u8, name: &'static str, text_columns: u8, status_cells: u8, flags: u8, help_page: u8) -> DeviceModel {
    DeviceModel { identifier: Some(identifier), name, text_columns, status_cells, flags, help_page }
}

const C: u8 = DeviceModel::CONFIGURABLE;

/// Models that identify themselves on the wire, in identifier order.
pub static MODELS: [DeviceModel; 14] = [
    model(0x00, "ABT 320", 20, 3, 0, 0),
    model(0x01, "ABT 340", 40, 3, 0, 0),
    model(0x02, "ABT 340 Desktop", 40, 5, 0, 0),
    model(0x03, "ABT 380", 80, 5, 0, 0),
    model(0x04, "ABT 382 Twin Space", 80, 5, 0, 0),
    model(0x0A, "Delphi 420", 20, 3, 0, 0),
    model(0x0B, "Delphi 440", 40, 3, 0, 0),
    model(0x0C, "Delphi 440 Desktop", 40, 5, 0, 0),
    model(0x0D, "Delphi 480", 80, 5, 0, 0),
    model(0x0E, "Satellite 544", 40, 3, C, 1),
    model(0x0F, "Satellite 570 Pro", 66, 3, C, 1),
    model(0x10, "Satellite 584 Pro", 80, 3, C, 1),
    model(0x11, "Satellite 544 Traveller", 40, 3, C, 1),
    model(0x13, "Braille System 40", 40, 0, C, 1),
];

/// BC640, selected by USB product id 0x0640.
pub static BC640: DeviceModel = DeviceModel {
    identifier: None,
    name: "BC640",
    text_columns: 40,
    status_cells: 0,
    flags: 0,
    help_page: 2,
};

/// BC680, selected by USB product id 0x0680.
pub static BC680: DeviceModel = DeviceModel {
    identifier: None,
    name: "BC680",
    text_columns: 80,
    status_cells: 0,
    flags: 0,
    help_page: 2,
};

// ── Tests ─────────────────────────────────────────────────────────────────────
