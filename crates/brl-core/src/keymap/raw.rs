//! Wire-code tables: what each raw key code means for the chord.
//!
//! The current protocol reports one key transition per packet (`make` or
//! `break`); codes outside the documented ranges clear the whole chord.
//! The legacy protocol reports the full operating-key state in one byte.
//! The HID protocol reports `(group, index)` pairs.

use super::{Key, KeyMask};

/// Effect of one raw key code on the pressed-key mask.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyAction {
    Make(Key),
    Break(Key),
    ClearAll,
}

impl KeyAction {
    /// Applies the action to `mask`.
    pub fn apply(self, mask: &mut KeyMask) {
        match self {
            KeyAction::Make(key) => mask.insert(key),
            KeyAction::Break(key) => mask.remove(key),
            KeyAction::ClearAll => mask.clear(),
        }
    }
}

/// Operating keys by make code `0x00..=0x0D` (packet type `0x71`).
pub const OPERATING_KEYS: [Key; 14] = [
    Key::Prog,
    Key::Home,
    Key::Cursor,
    Key::Up,
    Key::Left,
    Key::Right,
    Key::Down,
    Key::Cursor2,
    Key::Home2,
    Key::Prog2,
    Key::Tumbler1A,
    Key::Tumbler1B,
    Key::Tumbler2A,
    Key::Tumbler2B,
];

pub const STATUS_KEYS_1: [Key; 6] = [
    Key::Status1A,
    Key::Status1B,
    Key::Status1C,
    Key::Status1D,
    Key::Status1E,
    Key::Status1F,
];

pub const STATUS_KEYS_2: [Key; 6] = [
    Key::Status2A,
    Key::Status2B,
    Key::Status2C,
    Key::Status2D,
    Key::Status2E,
    Key::Status2F,
];

pub const SPEECH_PAD: [Key; 6] = [
    Key::SpeechF1,
    Key::SpeechUp,
    Key::SpeechLeft,
    Key::SpeechDown,
    Key::SpeechRight,
    Key::SpeechF2,
];

pub const BRAILLE_PAD: [Key; 6] = [
    Key::BrailleF1,
    Key::BrailleUp,
    Key::BrailleLeft,
    Key::BrailleDown,
    Key::BrailleRight,
    Key::BrailleF2,
];

pub const THUMB_KEYS: [Key; 5] = [Key::Thumb1, Key::Thumb2, Key::Thumb3, Key::Thumb4, Key::Thumb5];

pub const ETOUCH_KEYS: [Key; 4] = [Key::ETouch1, Key::ETouch2, Key::ETouch3, Key::ETouch4];

pub const SMARTPAD_KEYS: [Key; 9] = [
    Key::SmartpadF1,
    Key::SmartpadF2,
    Key::SmartpadLeft,
    Key::SmartpadEnter,
    Key::SmartpadUp,
    Key::SmartpadDown,
    Key::SmartpadRight,
    Key::SmartpadF3,
    Key::SmartpadF4,
];

/// Operating-key state bits of the legacy one-byte protocol.
pub const LEGACY_OPERATING_BITS: [(u8, Key); 7] = [
    (0x01, Key::Up),
    (0x02, Key::Cursor),
    (0x04, Key::Home),
    (0x08, Key::Prog),
    (0x10, Key::Left),
    (0x20, Key::Right),
    (0x40, Key::Down),
];

/// HID report groups (the release flag already stripped).
pub const HID_GROUP_THUMB: u8 = 0x71;
pub const HID_GROUP_ETOUCH: u8 = 0x72;
pub const HID_GROUP_SMARTPAD: u8 = 0x73;

/// Decodes the key code of an operating/status key packet (type `0x71`).
///
/// Only breaks `0x80..=0x89` exist for operating keys; the tumbler keys
/// have no individual break code and fall into the clear-all range.
pub fn operating_key_action(code: u8) -> KeyAction {
    match code {
        0x00..=0x0D => KeyAction::Make(OPERATING_KEYS[usize::from(code)]),
        0x80..=0x89 => KeyAction::Break(OPERATING_KEYS[usize::from(code - 0x80)]),
        0x20..=0x25 => KeyAction::Make(STATUS_KEYS_1[usize::from(code - 0x20)]),
        0xA0..=0xA5 => KeyAction::Break(STATUS_KEYS_1[usize::from(code - 0xA0)]),
        0x30..=0x35 => KeyAction::Make(STATUS_KEYS_2[usize::from(code - 0x30)]),
        0xB0..=0xB5 => KeyAction::Break(STATUS_KEYS_2[usize::from(code - 0xB0)]),
        _ => KeyAction::ClearAll,
    }
}

/// Decodes the key code of a speech/braille pad packet (type `0x77`).
pub fn pad_key_action(code: u8) -> KeyAction {
    match code {
        0x00..=0x05 => KeyAction::Make(SPEECH_PAD[usize::from(code)]),
        0x80..=0x85 => KeyAction::Break(SPEECH_PAD[usize::from(code - 0x80)]),
        0x20..=0x25 => KeyAction::Make(BRAILLE_PAD[usize::from(code - 0x20)]),
        0xA0..=0xA5 => KeyAction::Break(BRAILLE_PAD[usize::from(code - 0xA0)]),
        _ => KeyAction::ClearAll,
    }
}

/// Routing codes `0x00..=0x5F` are presses at that column; higher codes
/// release the row.
pub const ROUTING_MAKE_LIMIT: u8 = 0x5F;

/// Converts a legacy operating-key state byte (bit 7 clear) to a mask.
pub fn legacy_operating_keys(state: u8) -> KeyMask {
    LEGACY_OPERATING_BITS
        .iter()
        .filter(|(bit, _)| state & bit != 0)
        .fold(KeyMask::EMPTY, |mask, (_, key)| mask | *key)
}

/// Resolves a HID `(group, index)` pair to a key.
pub fn hid_key(group: u8, index: u8) -> Option<Key> {
    let keys: &[Key] = match group {
        HID_GROUP_THUMB => &THUMB_KEYS,
        HID_GROUP_ETOUCH => &ETOUCH_KEYS,
        HID_GROUP_SMARTPAD => &SMARTPAD_KEYS,
        _ => return None,
    };
    keys.get(usize::from(index)).copied()
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_operating_table_is_exhaustive_over_all_codes() {
        // Every make has exactly one matching break except the tumblers,
        // and every code outside the documented ranges clears the chord.
        let mut makes = HashSet::new();
        for code in 0..=u8::MAX {
            match operating_key_action(code) {
                KeyAction::Make(key) => {
                    assert!(makes.insert(key), "{key:?} made by two codes");
                    assert!(code <= 0x0D || (0x20..=0x25).contains(&code) || (0x30..=0x35).contains(&code));
                }
                KeyAction::Break(key) => {
                    assert_eq!(operating_key_action(code & 0x7F), KeyAction::Make(key));
                }
                KeyAction::ClearAll => {
                    assert!(!(code <= 0x0D || (0x80..=0x89).contains(&code)));
                }
            }
        }
        assert_eq!(makes.len(), 14 + 6 + 6);
    }

    #[test]
    fn test_tumbler_breaks_clear_the_chord() {
        for code in 0x8A..=0x8D {
            assert_eq!(operating_key_action(code), KeyAction::ClearAll);
        }
    }

    #[test]
    fn test_pad_table_is_exhaustive_over_all_codes() {
        let mut makes = HashSet::new();
        for code in 0..=u8::MAX {
            match pad_key_action(code) {
                KeyAction::Make(key) => assert!(makes.insert(key)),
                KeyAction::Break(key) => {
                    assert_eq!(pad_key_action(code & 0x7F), KeyAction::Make(key));
                }
                KeyAction::ClearAll => {}
            }
        }
        assert_eq!(makes.len(), 12);
    }

    #[test]
    fn test_legacy_state_byte_maps_each_bit() {
        let mask = legacy_operating_keys(0x08 | 0x04 | 0x40);
        assert_eq!(mask, Key::Prog | Key::Home | Key::Down);
        assert!(legacy_operating_keys(0).is_empty());
    }

    #[test]
    fn test_hid_groups_cover_documented_key_counts() {
        let counted = |group| (0..=u8::MAX).filter(|index| hid_key(group, *index).is_some()).count();
        assert_eq!(counted(HID_GROUP_THUMB), 5);
        assert_eq!(counted(HID_GROUP_ETOUCH), 4);
        assert_eq!(counted(HID_GROUP_SMARTPAD), 9);
        assert_eq!(hid_key(0x74, 0), None);
    }

    #[test]
    fn test_action_apply_updates_mask() {
        let mut mask = KeyMask::EMPTY;
        KeyAction::Make(Key::Home).apply(&mut mask);
        KeyAction::Make(Key::Up).apply(&mut mask);
        KeyAction::Break(Key::Home).apply(&mut mask);
        assert_eq!(mask, Key::Up.mask());
        KeyAction::ClearAll.apply(&mut mask);
        assert!(mask.is_empty());
    }
}
