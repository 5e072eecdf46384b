//! Press/release chord tracking for the current and legacy protocols.
//!
//! # How chords become commands (for beginners)
//!
//! A user presses several keys one after another and then lets them go.
//! Only two moments are interesting:
//!
//! 1. **The chord grows** – a key was added, so the pressed set is a new
//!    maximum for this press cycle.  The *press* table is consulted for the
//!    whole pressed set.
//! 2. **The chord starts shrinking** – the first key of the chord was
//!    released.  The *release* table is consulted for the largest set seen,
//!    exactly once; further releases of the same chord do nothing.
//!
//! When every key is up the cycle ends and the next press starts a new one.

use crate::keymap::KeyMask;

/// Outcome of a chord update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChordEvent {
    /// The chord grew to this mask.
    Pressed(KeyMask),
    /// The chord that was held is being released.
    Released(KeyMask),
    /// A further release within a cycle that already reported its release.
    Unchanged,
}

/// Chord state of one connection.
///
/// `pressed` is edited by the packet decoder; [`KeyState::update`] then
/// advances `last` and `released`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct KeyState {
    pub pressed: KeyMask,
    last: KeyMask,
    released: KeyMask,
    /// Column of the most recent routing-key press.
    pub routing_column: u8,
}

impl KeyState {
    /// Advances the chord state after `pressed` was edited.
    ///
    /// A mask equal to the last one is treated as a release; this is how a
    /// repeated routing press on some firmware resolves to the release
    /// table with the corrected column.
    pub fn update(&mut self) -> ChordEvent {
        if self.pressed > self.last {
            self.last = self.pressed;
            self.released = KeyMask::EMPTY;
            return ChordEvent::Pressed(self.pressed);
        }

        let mut event = ChordEvent::Unchanged;
        if self.released.is_empty() {
            self.released = self.last;
            event = ChordEvent::Released(self.released);
        }

        self.last = self.pressed;
        if self.pressed.is_empty() {
            self.released = KeyMask::EMPTY;
        }
        event
    }

    /// Forgets everything, as after a restart.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn last(&self) -> KeyMask {
        self.last
    }

    pub fn released(&self) -> KeyMask {
        self.released
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
