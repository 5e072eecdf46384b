//! The Alva braille driver: a [`Connection`] behind the [`BrailleDriver`]
//! interface.

use std::time::Duration;

use brl_core::{Command, Connection, Firmness, Geometry};
use tracing::warn;

use super::activation::DriverError;
use super::drivers::BrailleDriver;

/// Code under which the driver is registered.
pub const ALVA_CODE: &str = "al";

pub struct AlvaDriver {
    connection: Connection,
}

impl AlvaDriver {
    pub fn new(connection: Connection) -> Self {
        Self { connection }
    }
}

impl BrailleDriver for AlvaDriver {
    fn code(&self) -> &'static str {
        ALVA_CODE
    }

    fn name(&self) -> &'static str {
        self.connection.model().name
    }

    fn geometry(&self) -> Geometry {
        self.connection.geometry()
    }

    fn read_command(&mut self) -> Option<Command> {
        match self.connection.read_command() {
            Ok(command) => command,
            Err(e) => {
                warn!("{} input failed: {e}", self.name());
                Some(Command::RESTART_BRL)
            }
        }
    }

    fn write_window(&mut self, cells: &[u8]) -> Result<(), DriverError> {
        Ok(self.connection.write_window(cells)?)
    }

    fn write_status(&mut self, cells: &[u8]) -> Result<(), DriverError> {
        Ok(self.connection.write_status(cells)?)
    }

    fn set_firmness(&mut self, firmness: Firmness) -> Result<(), DriverError> {
        Ok(self.connection.set_firmness(firmness)?)
    }

    fn take_resize_required(&mut self) -> bool {
        self.connection.take_resize_required()
    }

    fn take_write_delay(&mut self) -> Duration {
        self.connection.take_write_delay()
    }
}

#[cfg(test)]
mod tests {
    use brl_core::protocol::packets::{function_packet, FUNCTION_IDENTIFY};
    use brl_core::transport::mock::{ScriptHandle, ScriptedTransport};
    use brl_core::{ConnectParams, ProtocolVariant, TransportKind};

    use super::*;

    fn alva(identifier: u8) -> (AlvaDriver, ScriptHandle) {
        let (transport, script) = ScriptedTransport::new(TransportKind::Serial);
        script.reply_to(&function_packet(FUNCTION_IDENTIFY), &[0x1B, b'I', b'D', b'=', identifier]);
        let connection =
            Connection::connect(Box::new(transport), ConnectParams::new(ProtocolVariant::Current)).expect("connect");
        (AlvaDriver::new(connection), script)
    }

    #[test]
    fn test_driver_reports_model_and_geometry() {
        let (driver, _script) = alva(0x0E);

        assert_eq!(driver.code(), "al");
        assert_eq!(driver.name(), "Satellite 544");
        assert_eq!(driver.geometry().text_columns, 40);
    }

    #[test]
    fn test_lost_link_becomes_restart_command() {
        // Arrange
        let (mut driver, script) = alva(0x01);
        script.push_lost();

        // Act
        let command = driver.read_command();

        // Assert
        assert_eq!(command, Some(Command::RESTART_BRL));
    }

    #[test]
    fn test_idle_link_has_no_command() {
        let (mut driver, _script) = alva(0x01);

        assert_eq!(driver.read_command(), None);
    }

    #[test]
    fn test_serial_write_delay_is_handed_out_once() {
        // Arrange
        let (mut driver, _script) = alva(0x01);
        driver.take_write_delay();

        // Act
        driver.write_window(&[0xFF; 40]).expect("write");

        // Assert: 46 bytes at 960 characters per second.
        assert_eq!(driver.take_write_delay(), Duration::from_millis(48));
        assert_eq!(driver.take_write_delay(), Duration::ZERO);
    }

    #[test]
    fn test_firmness_needs_configurable_model() {
        let (mut driver, _script) = alva(0x01);

        let result = driver.set_firmness(Firmness::High);

        assert!(matches!(result, Err(DriverError::Display(_))));
    }
}
