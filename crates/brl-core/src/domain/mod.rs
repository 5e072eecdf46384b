//! Device-independent state of a braille connection.
//!
//! Sub-modules:
//! - [`model`] – the static table of Alva models.
//! - [`geometry`] – display geometry and the render buffers sized from it.
//! - [`chord`] – the press/release chord state machine.

pub mod chord;
pub mod geometry;
pub mod model;
