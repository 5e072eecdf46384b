//! Packet framing.
//!
//! # How framing works (for beginners)
//!
//! Displays send an unbroken byte stream.  A [`Framer`] is fed one byte at a
//! time and decides, from the first byte of each packet, how long the packet
//! is.  Some packet kinds also constrain later bytes (fixed prefixes, marker
//! bytes).  When a byte breaks those rules the partial packet is abandoned
//! and the offending byte is looked at again as the possible start of a new
//! packet.  This "resync" is what lets the driver recover from line noise or
//! a cable plugged in mid-packet without losing the following good packet.
//!
//! The per-protocol rules live behind the [`FrameRules`] trait:
//!
//! | Rules            | First byte                 | Length                         |
//! |------------------|----------------------------|--------------------------------|
//! | [`CurrentRules`] | `0x7F` configuration       | 4, then `count*2+4` at offset 3 |
//! |                  | `0x7n` key                 | 2                              |
//! |                  | `0x1B` identification      | 5                              |
//! |                  | `0x00` keep-alive          | 2 (dropped when complete)      |
//! | [`LegacyRules`]  | `0x1B` identification      | 5                              |
//! |                  | anything else              | 1                              |
//! | [`HidRules`]     | `0x04` input report        | 3                              |

use tracing::{debug, warn};

use super::hex;
use super::packets::{CONFIG_MARKER, ID_PREFIX, PACKET_CONFIGURATION, PACKET_IDENTIFICATION, REPORT_KEYS};
use crate::transport::{Transport, TransportError};

/// Size of a configuration packet carrying `count` elements.
pub const fn packet_size(count: u8) -> usize {
    count as usize * 2 + 4
}

/// Largest packet any Alva protocol can produce.
pub const MAXIMUM_PACKET_SIZE: usize = packet_size(0xFF);

/// Verdict on a byte inside a packet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Next {
    Accept,
    /// Accept and fix the packet length.
    Length(usize),
    /// The byte cannot appear here; resynchronise.
    Unexpected,
}

/// Framing rules of one protocol.
pub trait FrameRules {
    /// Declared length of a packet starting with `byte`, or `None` when
    /// `byte` cannot start a packet.
    fn start(&self, byte: u8) -> Option<usize>;

    /// Checks `byte` at `offset` (≥ 1) of a packet that began with `first`.
    fn next(&self, first: u8, offset: usize, byte: u8) -> Next {
        let _ = (first, offset, byte);
        Next::Accept
    }

    /// Complete packets for which this returns `true` are dropped silently.
    fn discard(&self, packet: &[u8]) -> bool {
        let _ = packet;
        false
    }
}

/// The identification prefix may start a packet in every serial protocol.
fn next_in_identification(offset: usize, byte: u8) -> Next {
    if offset < ID_PREFIX.len() && byte != ID_PREFIX[offset] {
        Next::Unexpected
    } else {
        Next::Accept
    }
}

/// Current firmware (ABT3 new firmware, Delphi, Satellite, BS40, 5nn USB).
#[derive(Debug, Clone, Copy, Default)]
pub struct CurrentRules;

impl FrameRules for CurrentRules {
    fn start(&self, byte: u8) -> Option<usize> {
        match byte {
            PACKET_CONFIGURATION => Some(4),
            _ if byte & 0xF0 == 0x70 => Some(2),
            PACKET_IDENTIFICATION => Some(ID_PREFIX.len() + 1),
            0x00 => Some(2),
            _ => None,
        }
    }

    fn next(&self, first: u8, offset: usize, byte: u8) -> Next {
        match first {
            PACKET_CONFIGURATION => {
                if offset % 2 == 0 && byte != CONFIG_MARKER {
                    Next::Unexpected
                } else if offset == 3 {
                    Next::Length(packet_size(byte))
                } else {
                    Next::Accept
                }
            }
            PACKET_IDENTIFICATION => next_in_identification(offset, byte),
            0x00 if byte != 0x00 => Next::Unexpected,
            _ => Next::Accept,
        }
    }

    fn discard(&self, packet: &[u8]) -> bool {
        packet.first() == Some(&0x00)
    }
}

/// Old ABT3 firmware: every byte is a packet.
#[derive(Debug, Clone, Copy, Default)]
pub struct LegacyRules;

impl FrameRules for LegacyRules {
    fn start(&self, byte: u8) -> Option<usize> {
        match byte {
            PACKET_IDENTIFICATION => Some(ID_PREFIX.len() + 1),
            _ => Some(1),
        }
    }

    fn next(&self, first: u8, offset: usize, byte: u8) -> Next {
        match first {
            PACKET_IDENTIFICATION => next_in_identification(offset, byte),
            _ => Next::Accept,
        }
    }
}

/// BC6xx HID input reports.
#[derive(Debug, Clone, Copy, Default)]
pub struct HidRules;

impl FrameRules for HidRules {
    fn start(&self, byte: u8) -> Option<usize> {
        (byte == REPORT_KEYS).then_some(3)
    }
}

/// Result of feeding one byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Feed {
    /// The byte was stored; the packet is not complete yet.
    Pending,
    /// The byte cannot start a packet and was skipped.
    Ignored,
    /// A packet of this length is available through [`Framer::packet`].
    Complete(usize),
    /// A packet completed but was dropped (keep-alive or truncated).
    Dropped,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Idle,
    Accumulating { first: u8, offset: usize, length: usize },
}

/// Byte-at-a-time packet assembler.
#[derive(Debug)]
pub struct Framer<R> {
    rules: R,
    state: State,
    buffer: Vec<u8>,
    capacity: usize,
}

impl<R: FrameRules> Framer<R> {
    pub fn new(rules: R) -> Self {
        Self::with_capacity(rules, MAXIMUM_PACKET_SIZE)
    }

    /// A framer that keeps at most `capacity` bytes of each packet.
    pub fn with_capacity(rules: R, capacity: usize) -> Self {
        Self { rules, state: State::Idle, buffer: Vec::with_capacity(capacity), capacity }
    }

    /// `true` while a packet is partially assembled.
    pub fn in_progress(&self) -> bool {
        matches!(self.state, State::Accumulating { .. })
    }

    /// The most recently completed packet, or the partial bytes while a
    /// packet is in progress.
    pub fn packet(&self) -> &[u8] {
        &self.buffer
    }

    /// Abandons any partial packet.
    pub fn reset(&mut self) {
        self.state = State::Idle;
        self.buffer.clear();
    }

    /// Feeds one byte.
    pub fn feed(&mut self, byte: u8) -> Feed {
        match self.state {
            State::Idle => self.begin(byte),
            State::Accumulating { first, offset, length } => match self.rules.next(first, offset, byte) {
                Next::Unexpected => {
                    warn!("short packet: {}", hex(&self.buffer));
                    self.resync(byte)
                }
                Next::Length(declared) => self.store(byte, first, offset, declared),
                Next::Accept => self.store(byte, first, offset, length),
            },
        }
    }

    /// Abandons the partial packet and re-evaluates `byte` as a new start.
    pub fn resync(&mut self, byte: u8) -> Feed {
        self.reset();
        self.begin(byte)
    }

    fn begin(&mut self, byte: u8) -> Feed {
        self.buffer.clear();
        match self.rules.start(byte) {
            Some(length) => self.store(byte, byte, 0, length),
            None => {
                warn!("ignored byte: {byte:02X}");
                Feed::Ignored
            }
        }
    }

    fn store(&mut self, byte: u8, first: u8, offset: usize, length: usize) -> Feed {
        if offset < self.capacity {
            self.buffer.push(byte);
        } else {
            if offset == self.capacity {
                warn!("truncated packet: {}", hex(&self.buffer));
            }
            warn!("discarded byte: {byte:02X}");
        }

        let offset = offset + 1;
        if offset < length {
            self.state = State::Accumulating { first, offset, length };
            return Feed::Pending;
        }

        self.state = State::Idle;
        if offset > self.capacity || self.rules.discard(&self.buffer) {
            self.buffer.clear();
            return Feed::Dropped;
        }
        debug!("input packet: {}", hex(&self.buffer));
        Feed::Complete(offset)
    }
}

/// Reads one packet from `transport`.
///
/// The first byte is read without waiting; later bytes wait for the
/// transport's input timeout.  Returns `Ok(None)` when no complete packet
/// is available; a stall mid-packet is logged and the partial bytes are
/// discarded.
///
/// # Errors
///
/// Propagates [`TransportError::Lost`].
pub fn read_packet<R: FrameRules>(
    framer: &mut Framer<R>,
    transport: &mut dyn Transport,
) -> Result<Option<Vec<u8>>, TransportError> {
    loop {
        let started = framer.in_progress();
        let mut byte = [0u8; 1];

        if transport.read_bytes(&mut byte, started)? == 0 {
            if started {
                warn!("partial packet: {}", hex(framer.packet()));
                framer.reset();
            }
            return Ok(None);
        }

        if let Feed::Complete(_) = framer.feed(byte[0]) {
            return Ok(Some(framer.packet().to_vec()));
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
