//! Display session tests through the public API.
//!
//! # Purpose
//!
//! These tests drive a [`Connection`] over a [`ScriptedTransport`] the same
//! way the daemon does: connect, poll for commands, push cell images.  They
//! verify:
//!
//! - Identification of current-protocol, legacy-protocol and HID displays.
//! - Chord resolution across press and release packets, including routing
//!   keys and their column bounds.
//! - Geometry changes announced by the display while a session runs.
//! - Recovery from line noise between packets.
//! - Link loss surfacing as an error the caller can restart on.
//!
//! # Wire recap
//!
//! ```text
//! host → display   1B 'F' 'U' 'N' 06 0D          identify
//! display → host   1B 'I' 'D' '=' <id>           identification
//! display → host   71 <code>                     operating key
//! display → host   72 <code> / 75 <code>         routing rows
//! display → host   7F 07 7E <n> (7E <v>)*n       cell configuration
//! ```

use std::time::Duration;

use crate::command::{BlockCommand, Command, CommandCode};
use crate::display::{ConnectParams, Connection, DisplayError};
use crate::domain::model::BC680;
use crate::protocol::packets::{function_packet, FUNCTION_IDENTIFY};
use crate::protocol::variant::ProtocolVariant;
use crate::transport::mock::{ScriptHandle, ScriptedTransport};
use crate::transport::TransportKind;

const PRESS: u32 = Command::FLG_REPEAT_INITIAL | Command::FLG_REPEAT_DELAY;

fn identify_request() -> Vec<u8> {
    function_packet(FUNCTION_IDENTIFY).to_vec()
}

fn connect(kind: TransportKind, variant: ProtocolVariant, identifier: u8) -> (Connection, ScriptHandle) {
    let (transport, script) = ScriptedTransport::new(kind);
    script.reply_to(&identify_request(), &[0x1B, b'I', b'D', b'=', identifier]);
    let connection = Connection::connect(Box::new(transport), ConnectParams::new(variant)).expect("connect");
    script.clear_written();
    (connection, script)
}

/// Feeds `bytes` and collects every command until the input runs dry.
fn drain(connection: &mut Connection, script: &ScriptHandle, bytes: &[u8]) -> Vec<Command> {
    script.push_bytes(bytes);
    let mut commands = Vec::new();
    while script.pending_input() > 0 {
        if let Some(command) = connection.read_command().expect("read") {
            commands.push(command);
        }
    }
    commands
}

// ── Identification ────────────────────────────────────────────────────────────

#[test]
fn test_abt_380_identification_sets_eighty_columns() {
    // Arrange
    let (transport, script) = ScriptedTransport::new(TransportKind::Serial);
    script.reply_to(&identify_request(), &[0x1B, b'I', b'D', b'=', 0x03]);

    // Act
    let connection = Connection::connect(
        Box::new(transport),
        ConnectParams::new(ProtocolVariant::Current).with_rewrite_interval(TransportKind::Serial.rewrite_interval()),
    )
    .expect("connect");

    // Assert
    assert_eq!(connection.model().name, "ABT 380");
    assert_eq!(connection.geometry().text_columns, 80);
    assert_eq!(connection.geometry().text_cells(), 80);
}

#[test]
fn test_legacy_identification() {
    let (connection, _script) = connect(TransportKind::Serial, ProtocolVariant::Legacy, 0x01);

    assert_eq!(connection.model().name, "ABT 340");
    assert_eq!(connection.variant(), ProtocolVariant::Legacy);
}

#[test]
fn test_silent_display_is_reported() {
    let (transport, script) = ScriptedTransport::new(TransportKind::Serial);

    let result = Connection::connect(Box::new(transport), ConnectParams::new(ProtocolVariant::Current));

    assert!(matches!(result, Err(DisplayError::NoResponse)));
    assert!(script.is_closed());
}

// ── Chords ────────────────────────────────────────────────────────────────────

#[test]
fn test_growing_chord_reports_each_maximum() {
    // Arrange: Delphi 440 (page 0).
    let (mut connection, script) = connect(TransportKind::Serial, ProtocolVariant::Current, 0x0B);

    // Act: CURSOR, then CURSOR+UP, then release both.
    let commands = drain(&mut connection, &script, &[0x71, 0x02, 0x71, 0x03, 0x71, 0x83, 0x71, 0x82]);

    // Assert
    assert_eq!(
        commands,
        vec![
            // CURSOR alone has no press binding.
            Command::NOOP.with_flags(PRESS),
            Command::simple(CommandCode::AttrUp).with_flags(PRESS),
            // CURSOR+UP has no release binding either.
            Command::NOOP,
            Command::NOOP,
        ]
    );
}

#[test]
fn test_repeated_routing_press_resolves_on_release() {
    // PROG+HOME held, then two routing presses at different columns: the
    // second press repeats the mask, which resolves through the release
    // table with the latest column.
    let (mut connection, script) = connect(TransportKind::Serial, ProtocolVariant::Current, 0x01);

    let commands = drain(&mut connection, &script, &[0x71, 0x00, 0x71, 0x01, 0x72, 0x04, 0x72, 0x09]);

    assert_eq!(commands.last(), Some(&Command::block(BlockCommand::DescChar, 9)));
}

#[test]
fn test_routing_outside_text_window_is_dropped() {
    // ABT 320 has 20 columns; column 25 must not become a command.
    let (mut connection, script) = connect(TransportKind::Serial, ProtocolVariant::Current, 0x00);

    let commands = drain(&mut connection, &script, &[0x72, 25]);

    assert!(commands.is_empty());
}

#[test]
fn test_routing_at_first_and_last_column() {
    // ABT 340: 40 columns, so the window spans routing codes 0..=39.
    let (mut connection, script) = connect(TransportKind::Serial, ProtocolVariant::Current, 0x01);
    let last = connection.geometry().text_columns - 1;

    let first_commands = drain(&mut connection, &script, &[0x72, 0x00, 0x72, 0x80]);
    let last_commands = drain(&mut connection, &script, &[0x72, last, 0x72, 0x80 | last]);

    assert_eq!(first_commands, vec![Command::block(BlockCommand::Route, 0).with_flags(PRESS), Command::NOOP]);
    assert_eq!(first_commands[0].argument(), 0);
    assert_eq!(last_commands, vec![Command::block(BlockCommand::Route, last).with_flags(PRESS), Command::NOOP]);
    assert_eq!(last_commands[0].argument(), 39);
}

#[test]
fn test_legacy_routing_at_first_and_last_column() {
    // Legacy routing bytes start at 168; ABT 340 ends its window at 168 + 39.
    let (mut connection, script) = connect(TransportKind::Serial, ProtocolVariant::Legacy, 0x01);

    let first_commands = drain(&mut connection, &script, &[168, 0x00]);
    let last_commands = drain(&mut connection, &script, &[168 + 39, 0x00]);

    assert_eq!(first_commands[0], Command::block(BlockCommand::Route, 0).with_flags(PRESS));
    assert_eq!(first_commands[0].argument(), 0);
    assert_eq!(last_commands[0], Command::block(BlockCommand::Route, 39).with_flags(PRESS));
    assert_eq!(last_commands[0].argument(), 39);
}

#[test]
fn test_legacy_routing_then_state_byte() {
    // ABT 340 legacy: routing byte 168+3, then the all-up state byte.
    let (mut connection, script) = connect(TransportKind::Serial, ProtocolVariant::Legacy, 0x01);

    let commands = drain(&mut connection, &script, &[171, 0x00]);

    assert_eq!(
        commands,
        vec![Command::block(BlockCommand::Route, 3).with_flags(PRESS), Command::NOOP]
    );
}

// ── Geometry changes ──────────────────────────────────────────────────────────

#[test]
fn test_shrinking_display_resizes_buffers() {
    // Arrange: Satellite 570 Pro starts with 66 columns.
    let (mut connection, script) = connect(TransportKind::UsbBulk, ProtocolVariant::Current, 0x0F);
    connection.write_window(&[0x01; 66]).expect("initial frame");
    script.clear_written();

    // Act: the display reports 3 status cells and 40 columns.
    drain(&mut connection, &script, &[0x7F, 0x07, 0x7E, 0x04, 0x7E, 0, 0x7E, 0, 0x7E, 3, 0x7E, 40]);
    connection.write_window(&[0x01; 66]).expect("next frame");

    // Assert: a resize is pending and the next frame is a full 40-cell write.
    assert!(connection.take_resize_required());
    assert_eq!(connection.geometry().text_columns, 40);
    let written = script.written();
    assert_eq!(written.len(), 1);
    assert_eq!(written[0][4], 40);
    assert_eq!(written[0].len(), 40 + 6);
}

#[test]
fn test_identification_mid_session_switches_model() {
    let (mut connection, script) = connect(TransportKind::Serial, ProtocolVariant::Current, 0x01);

    drain(&mut connection, &script, &[0x1B, b'I', b'D', b'=', 0x0D]);

    assert_eq!(connection.model().name, "Delphi 480");
    assert_eq!(connection.geometry().text_columns, 80);
    assert!(connection.take_resize_required());
}

#[test]
fn test_cells_past_the_addressable_range_are_not_sent() {
    // Arrange: Satellite 570 Pro reconfigured to 10 status cells and 250
    // columns, so text columns from 246 on start beyond byte range.
    let (mut connection, script) = connect(TransportKind::UsbBulk, ProtocolVariant::Current, 0x0F);
    drain(&mut connection, &script, &[0x7F, 0x07, 0x7E, 0x04, 0x7E, 0, 0x7E, 0, 0x7E, 10, 0x7E, 250]);
    let mut cells = vec![0x01; 250];
    connection.write_window(&cells).expect("full frame");
    script.clear_written();

    // Act: only the last column changes.
    cells[249] = 0x02;
    let result = connection.write_window(&cells);

    // Assert: the write is dropped rather than aimed at column 255.
    assert!(result.is_ok());
    assert!(script.written().is_empty());
}

// ── Line noise and link loss ──────────────────────────────────────────────────

#[test]
fn test_garbage_between_packets_is_skipped() {
    // 0x20 and 0x9F cannot start a packet; "1B 'I' 'X'" is a broken
    // identification that must resynchronise on the following byte.
    let (mut connection, script) = connect(TransportKind::Serial, ProtocolVariant::Current, 0x01);

    let commands = drain(&mut connection, &script, &[0x20, 0x9F, 0x1B, b'I', b'X', 0x71, 0x03]);

    assert_eq!(commands, vec![Command::simple(CommandCode::LnUp).with_flags(PRESS)]);
}

#[test]
fn test_lost_link_is_an_error() {
    let (mut connection, script) = connect(TransportKind::Serial, ProtocolVariant::Current, 0x01);
    script.push_lost();

    let error = connection.read_command().expect_err("lost");

    assert!(error.is_lost());
    assert!(matches!(error, DisplayError::Transport(_)));
}

#[test]
fn test_dropping_connection_closes_transport() {
    let (connection, script) = connect(TransportKind::Serial, ProtocolVariant::Current, 0x01);

    drop(connection);

    assert!(script.is_closed());
}

// ── HID ───────────────────────────────────────────────────────────────────────

#[test]
fn test_hid_reconfiguration_rereads_feature_report() {
    // Arrange: BC680 reports 80 columns, then 40 after a system key.
    let (transport, script) = ScriptedTransport::new(TransportKind::UsbHid);
    script.set_feature_report(0x05, &[0x05, 0, 0, 0, 0, 0, 80]);
    let params = ConnectParams::new(ProtocolVariant::Hid).with_model(Some(&BC680));
    let mut connection = Connection::connect(Box::new(transport), params).expect("connect");
    assert!(!connection.take_resize_required());

    // Act
    script.set_feature_report(0x05, &[0x05, 0, 0, 0, 0, 0, 40]);
    let commands = drain(&mut connection, &script, &[0x04, 0x01, 0x01]);

    // Assert
    assert!(commands.is_empty());
    assert_eq!(connection.geometry().text_columns, 40);
    assert!(connection.take_resize_required());
}

#[test]
fn test_hid_plain_routing_key() {
    let (transport, script) = ScriptedTransport::new(TransportKind::UsbHid);
    script.set_feature_report(0x05, &[0x05, 0, 0, 0, 0, 0, 80]);
    let params = ConnectParams::new(ProtocolVariant::Hid).with_model(Some(&BC680));
    let mut connection = Connection::connect(Box::new(transport), params).expect("connect");

    let commands = drain(&mut connection, &script, &[0x04, 0x80 | 12, 0x74, 0x04, 0x80 | 12, 0xF4]);

    assert_eq!(commands, vec![Command::block(BlockCommand::DescChar, 12)]);
}

#[test]
fn test_write_delay_is_reported_for_serial_links() {
    let (mut connection, _script) = connect(TransportKind::Serial, ProtocolVariant::Current, 0x01);
    connection.take_write_delay();

    connection.write_window(&[0xFF; 40]).expect("write");

    assert!(connection.take_write_delay() >= Duration::from_millis(1));
}
