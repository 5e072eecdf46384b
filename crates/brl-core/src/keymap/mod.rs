//! Logical keys of the Alva display family.
//!
//! Every physical key, whatever protocol reports it, maps to exactly one
//! [`Key`] and therefore to exactly one bit of a [`KeyMask`].  Chords are
//! plain masks, so "is this chord bound?" is a table lookup on the mask.
//!
//! Sub-modules:
//! - [`raw`] – per-protocol tables from wire codes to [`raw::KeyAction`]s.
//! - [`bindings`] – the chord → command tables of each help page.

pub mod bindings;
pub mod raw;

use std::fmt;
use std::ops::{BitOr, BitOrAssign};

/// A logical key.  The discriminant is the key's bit index in a [`KeyMask`].
///
/// The ordering follows the front panel: the operating keys occupy the low
/// bits so that on legacy firmware the raw state byte lines up with the
/// mask.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum Key {
    // Operating keys
    Up = 0,
    Cursor = 1,
    Home = 2,
    Prog = 3,
    Left = 4,
    Right = 5,
    Down = 6,
    Cursor2 = 7,
    Home2 = 8,
    Prog2 = 9,

    // Lower status row and primary routing row
    Status1A = 10,
    Status1B = 11,
    Status1C = 12,
    Status1D = 13,
    Status1E = 14,
    Status1F = 15,
    Routing1 = 16,

    // Upper status row and secondary routing row
    Status2A = 17,
    Status2B = 18,
    Status2C = 19,
    Status2D = 20,
    Status2E = 21,
    Status2F = 22,
    Routing2 = 23,

    // Satellite speech and braille pads
    SpeechF1 = 24,
    SpeechF2 = 25,
    BrailleF1 = 26,
    BrailleF2 = 27,
    SpeechUp = 28,
    SpeechDown = 29,
    SpeechLeft = 30,
    SpeechRight = 31,
    BrailleUp = 32,
    BrailleDown = 33,
    BrailleLeft = 34,
    BrailleRight = 35,

    // Satellite tumbler keys
    Tumbler1A = 36,
    Tumbler1B = 37,
    Tumbler2A = 38,
    Tumbler2B = 39,

    // BC6xx thumb keys
    Thumb1 = 40,
    Thumb2 = 41,
    Thumb3 = 42,
    Thumb4 = 43,
    Thumb5 = 44,

    // BC6xx eTouch keys
    ETouch1 = 45,
    ETouch2 = 46,
    ETouch3 = 47,
    ETouch4 = 48,

    // BC6xx smartpad
    SmartpadF1 = 49,
    SmartpadF2 = 50,
    SmartpadLeft = 51,
    SmartpadEnter = 52,
    SmartpadUp = 53,
    SmartpadDown = 54,
    SmartpadRight = 55,
    SmartpadF3 = 56,
    SmartpadF4 = 57,
}

impl Key {
    /// Every key, in bit order.
    pub const ALL: [Key; 58] = [
        Key::Up,
        Key::Cursor,
        Key::Home,
        Key::Prog,
        Key::Left,
        Key::Right,
        Key::Down,
        Key::Cursor2,
        Key::Home2,
        Key::Prog2,
        Key::Status1A,
        Key::Status1B,
        Key::Status1C,
        Key::Status1D,
        Key::Status1E,
        Key::Status1F,
        Key::Routing1,
        Key::Status2A,
        Key::Status2B,
        Key::Status2C,
        Key::Status2D,
        Key::Status2E,
        Key::Status2F,
        Key::Routing2,
        Key::SpeechF1,
        Key::SpeechF2,
        Key::BrailleF1,
        Key::BrailleF2,
        Key::SpeechUp,
        Key::SpeechDown,
        Key::SpeechLeft,
        Key::SpeechRight,
        Key::BrailleUp,
        Key::BrailleDown,
        Key::BrailleLeft,
        Key::BrailleRight,
        Key::Tumbler1A,
        Key::Tumbler1B,
        Key::Tumbler2A,
        Key::Tumbler2B,
        Key::Thumb1,
        Key::Thumb2,
        Key::Thumb3,
        Key::Thumb4,
        Key::Thumb5,
        Key::ETouch1,
        Key::ETouch2,
        Key::ETouch3,
        Key::ETouch4,
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

    /// The single-bit mask for this key.
    pub const fn mask(self) -> KeyMask {
        KeyMask(1 << self as u8)
    }
}

/// A set of keys held down together.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct KeyMask(u64);

impl KeyMask {
    pub const EMPTY: KeyMask = KeyMask(0);

    /// Builds a mask from a list of keys.  Usable in `const` tables.
    pub const fn of(keys: &[Key]) -> KeyMask {
        let mut bits = 0u64;
        let mut index = 0;
        while index < keys.len() {
            bits |= 1 << keys[index] as u8;
            index += 1;
        }
        KeyMask(bits)
    }

    /// The raw bit pattern.
    pub const fn bits(self) -> u64 {
        self.0
    }

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub const fn contains(self, key: Key) -> bool {
        self.0 & key.mask().0 != 0
    }

    /// Number of keys in the chord.
    pub const fn len(self) -> u32 {
        self.0.count_ones()
    }

    pub fn insert(&mut self, key: Key) {
        self.0 |= key.mask().0;
    }

    pub fn remove(&mut self, key: Key) {
        self.0 &= !key.mask().0;
    }

    pub fn clear(&mut self) {
        self.0 = 0;
    }

    /// Iterates the keys in bit order.
    pub fn keys(self) -> impl Iterator<Item = Key> {
        Key::ALL.into_iter().filter(move |key| self.contains(*key))
    }
}

impl From<Key> for KeyMask {
    fn from(key: Key) -> Self {
        key.mask()
    }
}

impl BitOr for KeyMask {
    type Output = KeyMask;

    fn bitor(self, rhs: KeyMask) -> KeyMask {
        KeyMask(self.0 | rhs.0)
    }
}

impl BitOr<Key> for KeyMask {
    type Output = KeyMask;

    fn bitor(self, rhs: Key) -> KeyMask {
        KeyMask(self.0 | rhs.mask().0)
    }
}

impl BitOr for Key {
    type Output = KeyMask;

    fn bitor(self, rhs: Key) -> KeyMask {
        self.mask() | rhs
    }
}

impl BitOrAssign<Key> for KeyMask {
    fn bitor_assign(&mut self, rhs: Key) {
        self.insert(rhs);
    }
}

impl fmt::Debug for KeyMask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.keys()).finish()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
