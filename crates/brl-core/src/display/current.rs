//! Key packets of the current protocol.

use tracing::warn;

use super::decoder::{ChordRules, PacketEvent};
use crate::domain::chord::KeyState;
use crate::domain::geometry::Geometry;
use crate::keymap::raw::{operating_key_action, pad_key_action, ROUTING_MAKE_LIMIT};
use crate::keymap::Key;
use crate::protocol::framer::CurrentRules;
use crate::protocol::hex;
use crate::protocol::packets::CurrentPacket;

impl ChordRules for CurrentRules {
    fn interpret(packet: &[u8], keys: &mut KeyState, geometry: &Geometry) -> PacketEvent {
        match CurrentPacket::classify(packet) {
            CurrentPacket::OperatingKey(code) => {
                operating_key_action(code).apply(&mut keys.pressed);
                PacketEvent::KeysChanged
            }
            CurrentPacket::PadKey(code) => {
                pad_key_action(code).apply(&mut keys.pressed);
                PacketEvent::KeysChanged
            }
            CurrentPacket::PrimaryRouting(code) => routing(keys, geometry, code, Key::Routing1),
            CurrentPacket::SecondaryRouting(code) => routing(keys, geometry, code, Key::Routing2),
            CurrentPacket::CellsReconfigured(configuration) => PacketEvent::CellsReconfigured(configuration),
            CurrentPacket::ParametersReconfigured { front_keys } => PacketEvent::ParametersReconfigured(front_keys),
            CurrentPacket::Identification(identifier) => PacketEvent::Identified(identifier),
            CurrentPacket::Unexpected => {
                warn!("unexpected packet: {}", hex(packet));
                PacketEvent::Ignored
            }
        }
    }
}

/// Codes up to 0x5F press the routing key over that column; higher codes
/// release it.
fn routing(keys: &mut KeyState, geometry: &Geometry, code: u8, key: Key) -> PacketEvent {
    if code <= ROUTING_MAKE_LIMIT {
        if code >= geometry.text_columns {
            warn!(column = code, columns = geometry.text_columns, "routing key beyond the text window");
            return PacketEvent::Ignored;
        }
        keys.routing_column = code;
        keys.pressed.insert(key);
    } else {
        keys.pressed.remove(key);
    }
    PacketEvent::KeysChanged
}
