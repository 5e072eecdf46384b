//! Key bytes of the legacy one-byte protocol.
//!
//! ```text
//! 0x00..=0x7F                        operating-key state (bit mask)
//! 168 ..  168+columns                routing key over column byte-168
//! 168+columns .. +status cells       status key
//! ```
//!
//! Routing and status bytes only ever report presses; the following
//! operating-key state byte replaces the whole mask and so releases them.

use tracing::warn;

use super::decoder::{ChordRules, PacketEvent};
use crate::domain::chord::KeyState;
use crate::domain::geometry::Geometry;
use crate::keymap::raw::{legacy_operating_keys, STATUS_KEYS_1};
use crate::keymap::Key;
use crate::protocol::framer::LegacyRules;
use crate::protocol::hex;
use crate::protocol::packets::identification;

/// First routing-key byte.
pub(crate) const ROUTING_BASE: usize = 168;

impl ChordRules for LegacyRules {
    fn interpret(packet: &[u8], keys: &mut KeyState, geometry: &Geometry) -> PacketEvent {
        if let Some(identifier) = identification(packet) {
            return PacketEvent::Identified(identifier);
        }

        if let [byte] = packet {
            let value = usize::from(*byte);
            let columns = usize::from(geometry.text_columns);
            let status_base = ROUTING_BASE + columns;

            if value >= status_base && value < status_base + usize::from(geometry.status_cells) {
                if let Some(&key) = STATUS_KEYS_1.get(value - status_base) {
                    keys.pressed.insert(key);
                    return PacketEvent::KeysChanged;
                }
            } else if value >= ROUTING_BASE && value < status_base {
                keys.routing_column = (value - ROUTING_BASE) as u8;
                keys.pressed.insert(Key::Routing1);
                return PacketEvent::KeysChanged;
            } else if byte & 0x80 == 0 {
                keys.pressed = legacy_operating_keys(*byte);
                return PacketEvent::KeysChanged;
            }
        }

        warn!("unexpected packet: {}", hex(packet));
        PacketEvent::Ignored
    }
}
