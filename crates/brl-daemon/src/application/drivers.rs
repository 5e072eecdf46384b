//! Driver interfaces of the three driver classes and their no-op fallbacks.
//!
//! # What is a no-op driver? (for beginners)
//!
//! When no braille display is plugged in, the rest of the daemon must keep
//! running: the screen is still read, speech still works, and a display
//! may be plugged in later.  Instead of sprinkling `Option` checks through
//! the control loop, every class has a driver that satisfies the interface
//! while doing nothing.  Activation installs it whenever no real driver
//! can be started.

use std::time::Duration;

use brl_core::transport::DeviceIdentifier;
use brl_core::{Command, Firmness, Geometry};

use super::activation::{DriverClass, DriverError, DriverKind};

/// Driver codes autodetected on serial devices, in trial order.
pub const SERIAL_BRAILLE_DRIVERS: &[&str] = &["md", "pm", "ts", "ht", "bn", "al", "bm"];
/// Driver codes autodetected on USB devices, in trial order.
pub const USB_BRAILLE_DRIVERS: &[&str] = &["al", "bm", "fs", "ht", "pm", "vo"];

// ── Braille ───────────────────────────────────────────────────────────────────

/// A braille display driver.
#[cfg_attr(test, mockall::automock)]
pub trait BrailleDriver: Send {
    fn code(&self) -> &'static str;

    /// Human-readable name (the model for hardware drivers).
    fn name(&self) -> &'static str;

    fn geometry(&self) -> Geometry;

    /// Returns the next key command, if one is ready.  A lost link is
    /// reported as [`Command::RESTART_BRL`].
    fn read_command(&mut self) -> Option<Command>;

    fn write_window(&mut self, cells: &[u8]) -> Result<(), DriverError>;

    fn write_status(&mut self, cells: &[u8]) -> Result<(), DriverError>;

    fn set_firmness(&mut self, firmness: Firmness) -> Result<(), DriverError> {
        let _ = firmness;
        Err(DriverError::NotSupported("firmness"))
    }

    /// Returns and clears the "display changed size" flag.
    fn take_resize_required(&mut self) -> bool {
        false
    }

    /// Returns and clears the time the display needs to absorb the output
    /// written so far.  The caller waits at least this long before polling
    /// or writing again.
    fn take_write_delay(&mut self) -> Duration {
        Duration::ZERO
    }
}

#[derive(Debug, Default)]
pub struct NoBraille;

impl BrailleDriver for NoBraille {
    fn code(&self) -> &'static str {
        "no"
    }

    fn name(&self) -> &'static str {
        "No Braille"
    }

    fn geometry(&self) -> Geometry {
        Geometry::default()
    }

    fn read_command(&mut self) -> Option<Command> {
        None
    }

    fn write_window(&mut self, _cells: &[u8]) -> Result<(), DriverError> {
        Ok(())
    }

    fn write_status(&mut self, _cells: &[u8]) -> Result<(), DriverError> {
        Ok(())
    }
}

pub struct BrailleKind;

impl DriverKind for BrailleKind {
    type Driver = dyn BrailleDriver;
    const CLASS: DriverClass = DriverClass::Braille;

    fn no_op() -> Box<Self::Driver> {
        Box::new(NoBraille)
    }

    /// Serial devices and unqualified paths autodetect among the serial
    /// drivers, `usb:` devices among the USB drivers.
    fn autodetect_candidates(device: Option<&str>) -> &'static [&'static str] {
        match device.map(DeviceIdentifier::parse) {
            Some(Ok(DeviceIdentifier::Serial { .. })) => SERIAL_BRAILLE_DRIVERS,
            Some(Ok(DeviceIdentifier::Usb { .. })) => USB_BRAILLE_DRIVERS,
            Some(Err(_)) | None => &[],
        }
    }
}

// ── Speech ────────────────────────────────────────────────────────────────────

#[cfg_attr(test, mockall::automock)]
pub trait SpeechDriver: Send {
    fn code(&self) -> &'static str;
    fn say(&mut self, text: &str);
    fn mute(&mut self);
}

#[derive(Debug, Default)]
pub struct NoSpeech;

impl SpeechDriver for NoSpeech {
    fn code(&self) -> &'static str {
        "no"
    }

    fn say(&mut self, _text: &str) {}

    fn mute(&mut self) {}
}

pub struct SpeechKind;

impl DriverKind for SpeechKind {
    type Driver = dyn SpeechDriver;
    const CLASS: DriverClass = DriverClass::Speech;

    fn no_op() -> Box<Self::Driver> {
        Box::new(NoSpeech)
    }
}

// ── Screen ────────────────────────────────────────────────────────────────────

#[cfg_attr(test, mockall::automock)]
pub trait ScreenDriver: Send {
    fn code(&self) -> &'static str;

    /// Re-reads the screen; `false` when nothing could be read.
    fn refresh(&mut self) -> bool;

    /// `(columns, rows)`.
    fn size(&self) -> (u16, u16);

    /// The text of `row`, for speech.
    fn line(&self, row: u16) -> String;
}

#[derive(Debug, Default)]
pub struct NoScreen;

impl ScreenDriver for NoScreen {
    fn code(&self) -> &'static str {
        "no"
    }

    fn refresh(&mut self) -> bool {
        false
    }

    fn size(&self) -> (u16, u16) {
        (0, 0)
    }

    fn line(&self, _row: u16) -> String {
        String::new()
    }
}

pub struct ScreenKind;

impl DriverKind for ScreenKind {
    type Driver = dyn ScreenDriver;
    const CLASS: DriverClass = DriverClass::Screen;

    fn no_op() -> Box<Self::Driver> {
        Box::new(NoScreen)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
