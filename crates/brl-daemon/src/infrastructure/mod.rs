//! Infrastructure layer of the daemon.
//!
//! Contains the OS-facing adapters: device transports (serial ports, USB
//! bulk endpoints, HID devices), configuration storage and the driver
//! registries that bind driver codes to them.
//!
//! **Dependency rule**: this layer may depend on `application` and
//! `brl_core`, but MUST NOT be imported by the `application` layer.

pub mod drivers;
pub mod storage;
pub mod transport;
