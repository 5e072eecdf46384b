//! A connected Alva display.
//!
//! [`Connection::connect`] takes an opened transport, determines the model
//! (identification request, or the model fixed by the USB channel), reads
//! the real geometry of configurable models, and from then on turns input
//! packets into [`Command`]s and cell images into output packets.
//!
//! # Lifecycle
//!
//! ```text
//! connect ─► read_command / write_window / write_status ... ─► drop
//!                 │
//!                 └─ Err(Transport(Lost)) ─► caller restarts the driver
//! ```
//!
//! Dropping the connection closes the transport.

mod current;
mod decoder;
mod hid;
mod legacy;
mod link;
#[cfg(test)]
mod session_tests;

use std::time::Duration;

use thiserror::Error;
use tracing::debug;

use crate::command::Command;
use crate::domain::geometry::Geometry;
use crate::domain::model::DeviceModel;
use crate::protocol::packets::{parameter_packet, PARAMETER_FIRMNESS};
use crate::protocol::variant::ProtocolVariant;
use crate::transport::{Transport, TransportError};

use decoder::ProtocolDecoder;
use link::Link;

/// Identification requests sent before giving up.
pub const IDENTIFY_PROBES: usize = 3;
/// How long each probe waits for the display to answer.
pub const IDENTIFY_TIMEOUT: Duration = Duration::from_millis(200);

/// Errors of an established or starting connection.
#[derive(Debug, Error)]
pub enum DisplayError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("unknown Alva model with identifier {0:02X} (hex)")]
    UnknownModel(u8),

    #[error("display did not identify itself")]
    NoResponse,

    #[error("{0} does not support this setting")]
    NotSupported(&'static str),
}

impl DisplayError {
    /// `true` when the link itself is gone and the driver must restart.
    pub fn is_lost(&self) -> bool {
        matches!(self, DisplayError::Transport(TransportError::Lost(_)))
    }
}

/// Dot firmness levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum Firmness {
    Minimum = 0,
    Low = 1,
    #[default]
    Medium = 2,
    High = 3,
    Maximum = 4,
}

impl Firmness {
    pub const MAXIMUM_SETTING: u8 = Firmness::Maximum as u8;

    /// Maps a 0..=4 setting; larger values saturate at [`Firmness::Maximum`].
    pub fn from_setting(setting: u8) -> Self {
        match setting {
            0 => Firmness::Minimum,
            1 => Firmness::Low,
            2 => Firmness::Medium,
            3 => Firmness::High,
            _ => Firmness::Maximum,
        }
    }

    /// The value of the firmness parameter (0..=4 on the device's scale).
    pub fn parameter_value(self) -> u8 {
        (self as u8) * 4 / Self::MAXIMUM_SETTING
    }
}

/// How to talk to the display on a freshly opened transport.
#[derive(Debug, Clone, Copy)]
pub struct ConnectParams {
    pub variant: ProtocolVariant,
    /// Model implied by the link (HID channels); `None` means ask the display.
    pub fixed_model: Option<&'static DeviceModel>,
    /// Periodic full rewrite; serial links need it to recover from line noise.
    pub rewrite_interval: Option<Duration>,
}

impl ConnectParams {
    pub fn new(variant: ProtocolVariant) -> Self {
        Self { variant, fixed_model: None, rewrite_interval: None }
    }

    #[must_use]
    pub fn with_model(mut self, model: Option<&'static DeviceModel>) -> Self {
        self.fixed_model = model;
        self
    }

    #[must_use]
    pub fn with_rewrite_interval(mut self, interval: Option<Duration>) -> Self {
        self.rewrite_interval = interval;
        self
    }
}

/// An identified, configured display.
pub struct Connection {
    link: Link,
    decoder: ProtocolDecoder,
}

impl Connection {
    /// Resets the transport and brings up the display.
    ///
    /// # Errors
    ///
    /// - [`DisplayError::NoResponse`] when no identification arrives after
    ///   [`IDENTIFY_PROBES`] requests.
    /// - [`DisplayError::UnknownModel`] for an identifier not in the model table.
    /// - [`DisplayError::Transport`] when the link fails.
    ///
    /// The transport is closed on every error.
    pub fn connect(mut transport: Box<dyn Transport>, params: ConnectParams) -> Result<Self, DisplayError> {
        let mut decoder = ProtocolDecoder::new(params.variant);
        let mut write_delay = Duration::ZERO;

        let identified = transport
            .reset()
            .map_err(DisplayError::from)
            .and_then(|()| decoder.identify(transport.as_mut(), &mut write_delay, params.fixed_model));
        let model = match identified {
            Ok(model) => model,
            Err(error) => {
                transport.close();
                return Err(error);
            }
        };

        let mut link = Link::new(transport, params.variant, model, params.rewrite_interval);
        link.write_delay = write_delay;
        decoder.configure(&mut link)?;

        debug!(variant = %params.variant, model = model.name, "display connected");
        Ok(Self { link, decoder })
    }

    pub fn model(&self) -> &'static DeviceModel {
        self.link.model
    }

    pub fn geometry(&self) -> Geometry {
        self.link.geometry
    }

    pub fn variant(&self) -> ProtocolVariant {
        self.link.variant
    }

    /// Returns and clears the flag set when the display changed size.
    pub fn take_resize_required(&mut self) -> bool {
        std::mem::take(&mut self.link.resize_required)
    }

    /// Returns and clears the accumulated time the device needs to absorb
    /// the packets written so far.
    pub fn take_write_delay(&mut self) -> Duration {
        std::mem::take(&mut self.link.write_delay)
    }

    /// Handles pending input.  `Ok(None)` means no command is ready.
    ///
    /// # Errors
    ///
    /// Transport failures are returned as-is; the key state is cleared so
    /// a later reconnect starts without held keys.
    pub fn read_command(&mut self) -> Result<Option<Command>, DisplayError> {
        let result = self.decoder.read_command(&mut self.link);
        if result.is_err() {
            self.decoder.reset_keys();
        }
        result
    }

    /// Shows `cells` in the text window.
    pub fn write_window(&mut self, cells: &[u8]) -> Result<(), DisplayError> {
        self.link.write_window(cells)
    }

    /// Shows `cells` in the status cells (no-op on models without them).
    pub fn write_status(&mut self, cells: &[u8]) -> Result<(), DisplayError> {
        self.link.write_status(cells)
    }

    /// Sets the dot firmness.
    ///
    /// # Errors
    ///
    /// [`DisplayError::NotSupported`] unless the model is configurable.
    pub fn set_firmness(&mut self, firmness: Firmness) -> Result<(), DisplayError> {
        if !self.link.model.is_configurable() {
            return Err(DisplayError::NotSupported(self.link.model.name));
        }
        self.link.write(&parameter_packet(PARAMETER_FIRMNESS, firmness.parameter_value()))
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::{BlockCommand, CommandCode};
    use crate::domain::model::BC640;
    use crate::protocol::packets::{function_packet, FUNCTION_DISPLAY_PARAMETERS, FUNCTION_EXTENDED_STATUS, FUNCTION_IDENTIFY};
    use crate::transport::mock::{ScriptHandle, ScriptedTransport};
    use crate::transport::{MockTransport, TransportKind};

    const IDENTIFY: [u8; 6] = function_packet(FUNCTION_IDENTIFY);
    const PRESS_FLAGS: u32 = Command::FLG_REPEAT_INITIAL | Command::FLG_REPEAT_DELAY;

    fn id_packet(identifier: u8) -> Vec<u8> {
        vec![0x1B, b'I', b'D', b'=', identifier]
    }

    /// `7F 07` notice with the given status/column counts.
    fn cells_notice(status: u8, columns: u8) -> Vec<u8> {
        vec![0x7F, 0x07, 0x7E, 0x04, 0x7E, 0, 0x7E, 0, 0x7E, status, 0x7E, columns]
    }

    fn connect_serial(identifier: u8) -> (Connection, ScriptHandle) {
        let (transport, script) = ScriptedTransport::new(TransportKind::Serial);
        script.reply_to(&IDENTIFY, &id_packet(identifier));
        let params = ConnectParams::new(ProtocolVariant::Current);
        let connection = Connection::connect(Box::new(transport), params).expect("connect");
        script.clear_written();
        (connection, script)
    }

    fn read(connection: &mut Connection, script: &ScriptHandle, bytes: &[u8]) -> Option<Command> {
        script.push_bytes(bytes);
        connection.read_command().expect("read")
    }

    #[test]
    fn test_connect_identifies_abt_380() {
        // Arrange
        let (transport, script) = ScriptedTransport::new(TransportKind::Serial);
        script.reply_to(&IDENTIFY, &id_packet(0x03));

        // Act
        let connection = Connection::connect(Box::new(transport), ConnectParams::new(ProtocolVariant::Current))
            .expect("connect");

        // Assert
        assert_eq!(connection.model().name, "ABT 380");
        assert_eq!(connection.geometry().text_columns, 80);
        assert_eq!(connection.geometry().status_cells, 5);
        assert_eq!(script.written(), vec![IDENTIFY.to_vec()]);
        assert_eq!(script.resets(), 1);
    }

    #[test]
    fn test_connect_without_answer_probes_three_times() {
        let (transport, script) = ScriptedTransport::new(TransportKind::Serial);

        let result = Connection::connect(Box::new(transport), ConnectParams::new(ProtocolVariant::Current));

        assert!(matches!(result, Err(DisplayError::NoResponse)));
        assert_eq!(script.written().len(), IDENTIFY_PROBES);
        assert!(script.is_closed());
    }

    #[test]
    fn test_connect_rejects_unknown_identifier() {
        let (transport, script) = ScriptedTransport::new(TransportKind::Serial);
        script.reply_to(&IDENTIFY, &id_packet(0x42));

        let result = Connection::connect(Box::new(transport), ConnectParams::new(ProtocolVariant::Current));

        assert!(matches!(result, Err(DisplayError::UnknownModel(0x42))));
    }

    #[test]
    fn test_connect_skips_unrelated_packets_before_identification() {
        let (transport, script) = ScriptedTransport::new(TransportKind::Serial);
        let mut reply = vec![0x71, 0x01];
        reply.extend(id_packet(0x0B));
        script.reply_to(&IDENTIFY, &reply);

        let connection = Connection::connect(Box::new(transport), ConnectParams::new(ProtocolVariant::Current))
            .expect("connect");

        assert_eq!(connection.model().name, "Delphi 440");
    }

    #[test]
    fn test_configurable_model_reads_extended_status() {
        // Arrange: Satellite 544 reports 2 status cells and 40 columns.
        let (transport, script) = ScriptedTransport::new(TransportKind::Serial);
        script.reply_to(&IDENTIFY, &id_packet(0x0E));
        script.reply_to(&function_packet(FUNCTION_EXTENDED_STATUS), &cells_notice(2, 40));

        // Act
        let mut connection = Connection::connect(Box::new(transport), ConnectParams::new(ProtocolVariant::Current))
            .expect("connect");

        // Assert
        assert_eq!(connection.geometry().status_cells, 2);
        assert_eq!(connection.geometry().text_columns, 40);
        assert!(!connection.take_resize_required());
        assert_eq!(
            script.written(),
            vec![
                IDENTIFY.to_vec(),
                function_packet(FUNCTION_EXTENDED_STATUS).to_vec(),
                function_packet(FUNCTION_DISPLAY_PARAMETERS).to_vec(),
            ]
        );
    }

    #[test]
    fn test_press_then_release_chord() {
        // ABT 340: HOME+UP press is TOP; HOME alone on release is TOP_LEFT
        // but a released HOME+UP chord has no release binding.
        let (mut connection, script) = connect_serial(0x01);

        let first = read(&mut connection, &script, &[0x71, 0x01]);
        let second = read(&mut connection, &script, &[0x71, 0x03]);
        let third = read(&mut connection, &script, &[0x71, 0x83]);
        let fourth = read(&mut connection, &script, &[0x71, 0x81]);

        assert_eq!(first, Some(Command::NOOP.with_flags(PRESS_FLAGS)));
        assert_eq!(second, Some(Command::simple(CommandCode::Top).with_flags(PRESS_FLAGS)));
        assert_eq!(third, Some(Command::NOOP));
        assert_eq!(fourth, Some(Command::NOOP));
    }

    #[test]
    fn test_single_key_release_binding() {
        let (mut connection, script) = connect_serial(0x01);

        read(&mut connection, &script, &[0x71, 0x00]);
        let released = read(&mut connection, &script, &[0x71, 0x80]);

        assert_eq!(released, Some(Command::simple(CommandCode::Help)));
    }

    #[test]
    fn test_routing_press_carries_column() {
        let (mut connection, script) = connect_serial(0x01);

        let command = read(&mut connection, &script, &[0x72, 17]);

        assert_eq!(command, Some(Command::block(BlockCommand::Route, 17).with_flags(PRESS_FLAGS)));
    }

    #[test]
    fn test_cursor_release_forces_rewrite() {
        let (mut connection, script) = connect_serial(0x01);
        connection.write_window(&[0x11; 40]).expect("write");
        script.clear_written();

        read(&mut connection, &script, &[0x71, 0x02]);
        let command = read(&mut connection, &script, &[0x71, 0x82]);
        connection.write_window(&[0x11; 40]).expect("write");

        assert_eq!(command, Some(Command::simple(CommandCode::Return)));
        let written = script.written();
        assert_eq!(written.len(), 1);
        assert_eq!(written[0].len(), 40 + 6);
    }

    #[test]
    fn test_cells_notice_mid_session_requests_resize() {
        // Satellite 544 shrinks to 20 columns while running.
        let (transport, script) = ScriptedTransport::new(TransportKind::UsbBulk);
        script.reply_to(&IDENTIFY, &id_packet(0x0E));
        let mut connection = Connection::connect(Box::new(transport), ConnectParams::new(ProtocolVariant::Current))
            .expect("connect");

        let command = read(&mut connection, &script, &cells_notice(3, 20));

        assert_eq!(command, None);
        assert_eq!(connection.geometry().text_columns, 20);
        assert!(connection.take_resize_required());
        assert!(!connection.take_resize_required());
    }

    #[test]
    fn test_prog_front_key_setting_is_cleared() {
        let (mut connection, script) = connect_serial(0x0E);
        let mut notice = vec![0x7F, 0x0B, 0x7E, 0x08];
        notice.extend(std::iter::repeat(0x7E).take(16));
        notice[19] = 0x03;

        read(&mut connection, &script, &notice);

        assert_eq!(script.written(), vec![parameter_packet(6, 0x01).to_vec()]);
    }

    #[test]
    fn test_window_writes_only_changes_after_first_frame() {
        // ABT 340 has 3 status cells, so text starts at offset 3.
        let (mut connection, script) = connect_serial(0x01);
        let mut cells = [0u8; 40];
        connection.write_window(&cells).expect("first");

        cells[10] = 0xFF;
        cells[12] = 0x01;
        connection.write_window(&cells).expect("second");
        connection.write_window(&cells).expect("third");

        let written = script.written();
        assert_eq!(written.len(), 2);
        assert_eq!(written[1], vec![0x0D, 0x1B, b'B', 13, 3, 0xFF, 0x00, 0x01, 0x0D]);
    }

    #[test]
    fn test_status_cells_written_at_offset_zero() {
        let (mut connection, script) = connect_serial(0x01);

        connection.write_status(&[0x01, 0x02, 0x03]).expect("status");
        connection.write_status(&[0x01, 0x02, 0x03]).expect("status");

        assert_eq!(script.written(), vec![vec![0x0D, 0x1B, b'B', 0, 3, 0x01, 0x02, 0x03, 0x0D]]);
    }

    #[test]
    fn test_firmness_requires_configurable_model() {
        let (mut abt, _) = connect_serial(0x01);
        assert!(matches!(abt.set_firmness(Firmness::High), Err(DisplayError::NotSupported("ABT 340"))));

        let (mut satellite, script) = connect_serial(0x0E);
        satellite.set_firmness(Firmness::High).expect("firmness");
        assert_eq!(script.written(), vec![parameter_packet(PARAMETER_FIRMNESS, 3).to_vec()]);
    }

    #[test]
    fn test_lost_link_clears_held_keys() {
        let (mut connection, script) = connect_serial(0x01);
        read(&mut connection, &script, &[0x71, 0x01]);

        script.push_lost();
        let error = connection.read_command().expect_err("lost");

        assert!(error.is_lost());
    }

    #[test]
    fn test_serial_writes_accumulate_delay() {
        let (mut connection, _script) = connect_serial(0x01);
        connection.take_write_delay();

        connection.write_window(&[0u8; 40]).expect("write");

        assert!(connection.take_write_delay() > Duration::ZERO);
        assert_eq!(connection.take_write_delay(), Duration::ZERO);
    }

    #[test]
    fn test_hid_connection_uses_feature_report() {
        // Arrange
        let (transport, script) = ScriptedTransport::new(TransportKind::UsbHid);
        script.set_feature_report(0x05, &[0x05, 0, 0, 0, 0, 0, 40]);
        let params = ConnectParams::new(ProtocolVariant::Hid).with_model(Some(&BC640));

        // Act
        let mut connection = Connection::connect(Box::new(transport), params).expect("connect");
        connection.write_window(&[0x3F; 40]).expect("write");

        // Assert
        assert_eq!(connection.model().name, "BC640");
        let written = script.written();
        assert_eq!(written.len(), 1);
        assert_eq!(&written[0][..3], &[0x02, 0, 40]);
    }

    #[test]
    fn test_hid_routing_with_held_key() {
        let (transport, script) = ScriptedTransport::new(TransportKind::UsbHid);
        script.set_feature_report(0x05, &[0x05, 0, 0, 0, 0, 0, 40]);
        let params = ConnectParams::new(ProtocolVariant::Hid).with_model(Some(&BC640));
        let mut connection = Connection::connect(Box::new(transport), params).expect("connect");

        // SMARTPAD F1 (group 0x73, index 0) held, then routing key 5.
        let press = read(&mut connection, &script, &[0x04, 0x00, 0x73]);
        let routed = read(&mut connection, &script, &[0x04, 0x05, 0x74]);
        let release = read(&mut connection, &script, &[0x04, 0x00, 0xF3]);

        assert_eq!(press, Some(Command::simple(CommandCode::Help).with_flags(Command::FLG_REPEAT_DELAY)));
        assert_eq!(routed, Some(Command::block(BlockCommand::CutBegin, 5)));
        assert_eq!(release, None);
    }

    #[test]
    fn test_connect_failure_on_reset_closes_transport() {
        let mut transport = MockTransport::new();
        transport
            .expect_reset()
            .returning(|| Err(TransportError::lost("gone".to_string())));
        transport.expect_close().times(1).return_const(());

        let result = Connection::connect(Box::new(transport), ConnectParams::new(ProtocolVariant::Current));

        assert!(matches!(result, Err(DisplayError::Transport(TransportError::Lost(_)))));
    }
}
