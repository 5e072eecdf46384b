//! Device identifier strings (`serial:/dev/ttyS0`, `usb:`, `usb:A1B2C3`).

use std::fmt;

use super::TransportError;

/// A parsed device identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeviceIdentifier {
    /// A serial device path.
    Serial { path: String },
    /// Any supported USB display, optionally restricted to one serial number.
    Usb { serial_number: Option<String> },
}

impl DeviceIdentifier {
    /// Parses an identifier.
    ///
    /// A string without a qualifier is a serial device path.  A qualifier
    /// is the text before the first `:` when it is at least two
    /// alphanumeric characters, so `COM3`, `C:\dev` and absolute paths are
    /// left alone.
    ///
    /// # Errors
    ///
    /// [`TransportError::UnsupportedDevice`] for an unknown qualifier.
    pub fn parse(identifier: &str) -> Result<Self, TransportError> {
        let Some((qualifier, rest)) = split_qualifier(identifier) else {
            return Ok(DeviceIdentifier::Serial { path: identifier.to_string() });
        };

        match qualifier.to_ascii_lowercase().as_str() {
            "serial" => Ok(DeviceIdentifier::Serial { path: rest.to_string() }),
            "usb" => Ok(DeviceIdentifier::Usb {
                serial_number: (!rest.is_empty()).then(|| rest.to_string()),
            }),
            _ => Err(TransportError::UnsupportedDevice(identifier.to_string())),
        }
    }
}

fn split_qualifier(identifier: &str) -> Option<(&str, &str)> {
    let (qualifier, rest) = identifier.split_once(':')?;
    let is_qualifier = qualifier.len() >= 2 && qualifier.chars().all(|c| c.is_ascii_alphanumeric());
    is_qualifier.then_some((qualifier, rest))
}

impl fmt::Display for DeviceIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeviceIdentifier::Serial { path } => write!(f, "serial:{path}"),
            DeviceIdentifier::Usb { serial_number: None } => write!(f, "usb:"),
            DeviceIdentifier::Usb { serial_number: Some(serial) } => write!(f, "usb:{serial}"),
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unqualified_string_is_serial() {
        let parsed = DeviceIdentifier::parse("/dev/ttyS0").expect("parse");
        assert_eq!(parsed, DeviceIdentifier::Serial { path: "/dev/ttyS0".to_string() });
    }

    #[test]
    fn test_serial_qualifier() {
        let parsed = DeviceIdentifier::parse("serial:/dev/ttyUSB1").expect("parse");
        assert_eq!(parsed, DeviceIdentifier::Serial { path: "/dev/ttyUSB1".to_string() });
    }

    #[test]
    fn test_usb_with_and_without_serial_number() {
        assert_eq!(
            DeviceIdentifier::parse("usb:").expect("parse"),
            DeviceIdentifier::Usb { serial_number: None }
        );
        assert_eq!(
            DeviceIdentifier::parse("usb:00A7").expect("parse"),
            DeviceIdentifier::Usb { serial_number: Some("00A7".to_string()) }
        );
    }

    #[test]
    fn test_drive_letter_is_not_a_qualifier() {
        let parsed = DeviceIdentifier::parse("C:\\ports\\alva").expect("parse");
        assert!(matches!(parsed, DeviceIdentifier::Serial { .. }));
    }

    #[test]
    fn test_unknown_qualifier_is_rejected() {
        let result = DeviceIdentifier::parse("bluetooth:00:11:22:33:44:55");
        assert!(matches!(result, Err(TransportError::UnsupportedDevice(_))));
    }

    #[test]
    fn test_display_round_trips_through_parse() {
        for text in ["serial:/dev/ttyS0", "usb:", "usb:1234"] {
            let parsed = DeviceIdentifier::parse(text).expect("parse");
            assert_eq!(parsed.to_string(), text);
        }
    }
}
