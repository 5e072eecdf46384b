//! Driver registries wired to the real device openers.
//!
//! The braille registry knows the Alva driver (`al`).  Speech and screen
//! have no hardware drivers in this daemon, so their registries carry only
//! the no-op driver and `auto` resolves to it.

use brl_core::{Connection, DeviceIdentifier, TransportOptions};

use crate::application::activation::{DriverError, DriverRegistry};
use crate::application::braille::{AlvaDriver, ALVA_CODE};
use crate::application::drivers::{BrailleDriver, BrailleKind, ScreenKind, SpeechKind};
use crate::infrastructure::transport::open_transport;

/// Braille drivers, opening devices with `options`.
pub fn braille_registry(options: TransportOptions) -> DriverRegistry<BrailleKind> {
    let mut registry = DriverRegistry::new();
    registry.register(
        ALVA_CODE,
        Box::new(move |device: Option<&str>| -> Result<Box<dyn BrailleDriver>, DriverError> {
            let device = device.ok_or_else(|| DriverError::Construct("no device given".to_string()))?;
            let identifier = DeviceIdentifier::parse(device)?;
            let opened = open_transport(&identifier, &options)?;
            let connection = Connection::connect(opened.transport, opened.params)?;
            Ok(Box::new(AlvaDriver::new(connection)))
        }),
    );
    registry
}

pub fn speech_registry() -> DriverRegistry<SpeechKind> {
    DriverRegistry::new()
}

pub fn screen_registry() -> DriverRegistry<ScreenKind> {
    DriverRegistry::new()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::activation::NO_DRIVER;

    #[test]
    fn test_braille_registry_knows_alva() {
        let registry = braille_registry(TransportOptions::default());

        assert!(registry.has_driver(ALVA_CODE));
        assert!(registry.has_driver(NO_DRIVER));
    }

    #[test]
    fn test_alva_loader_rejects_unknown_qualifier() {
        let registry = braille_registry(TransportOptions::default());

        let result = registry.load(ALVA_CODE, Some("bluetooth:00:11:22"));

        assert!(matches!(result, Err(DriverError::Transport(_))));
    }

    #[test]
    fn test_alva_loader_needs_a_device() {
        let registry = braille_registry(TransportOptions::default());

        assert!(matches!(registry.load(ALVA_CODE, None), Err(DriverError::Construct(_))));
    }
}
