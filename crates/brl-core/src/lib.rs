//! # brl-core
//!
//! Driver engine for Alva refreshable braille displays: the transport
//! contract, the packet framers for each firmware generation, key/chord
//! decoding, the device model table, and the display [`Connection`] that
//! ties them together.
//!
//! This crate has no dependency on OS device APIs.  Concrete serial, USB
//! and HID links live in `brl-daemon` and are handed to a [`Connection`] as
//! `Box<dyn Transport>`.
//!
//! # Architecture overview
//!
//! ```text
//! Transport ──bytes──▶ Framer ──packets──▶ Decoder ──commands──▶ caller
//!     ▲                                       │
//!     └──────────── cell packets ◀────────────┘ (write_window / write_status)
//! ```
//!
//! - **`transport`** – the [`Transport`] trait, device identifiers and the
//!   USB channel table.  Idle links return `Ok(0)`; a disconnect is
//!   [`TransportError::Lost`].
//!
//! - **`protocol`** – byte-driven framers for the current, legacy and HID
//!   wire protocols, plus typed packet builders and parsers.
//!
//! - **`keymap`** – the logical [`Key`] enumeration, raw-code tables per
//!   protocol, and the command bindings of each help page.
//!
//! - **`domain`** – device models, display geometry and render buffers, and
//!   the chord state machine.
//!
//! - **`display`** – the [`Connection`]: model detection, configuration
//!   changes, command decoding and cell output.

pub mod command;
pub mod display;
pub mod domain;
pub mod keymap;
pub mod protocol;
pub mod transport;

pub use command::{BlockCommand, Command, CommandCode};
pub use display::{ConnectParams, Connection, DisplayError, Firmness};
pub use domain::geometry::Geometry;
pub use domain::model::DeviceModel;
pub use keymap::{Key, KeyMask};
pub use protocol::variant::ProtocolVariant;
pub use transport::{DeviceIdentifier, Transport, TransportError, TransportKind, TransportOptions};
