//! Wire protocols of the Alva family.
//!
//! Sub-modules:
//! - [`framer`] – byte-driven packet framing with resynchronisation.
//! - [`packets`] – typed builders and parsers for every packet kind.
//! - [`variant`] – which protocol a given link speaks.

pub mod framer;
pub mod packets;
pub mod variant;

/// Formats bytes as space-separated hex for log lines.
pub fn hex(bytes: &[u8]) -> String {
    bytes.iter().map(|byte| format!("{byte:02X}")).collect::<Vec<_>>().join(" ")
}
